//! Property lists controlling how files are opened and created.

/// Whether the store accepts mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    ReadOnly,
    #[default]
    ReadWrite,
}

/// How element types are reconciled when the stored type differs from the
/// native type of a read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversionPolicy {
    /// Convert between any numeric types. Integers clamp to the target
    /// range, floats saturate when narrowed to integers.
    #[default]
    Numeric,
    /// Fail unless the stored and native element types match exactly.
    Exact,
}

/// File access properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAccessProps {
    pub mode: AccessMode,
    /// Write the file back when the last reference to it is dropped.
    pub flush_on_drop: bool,
    pub conversion: ConversionPolicy,
}

impl Default for FileAccessProps {
    fn default() -> Self {
        Self {
            mode: AccessMode::ReadWrite,
            flush_on_drop: true,
            conversion: ConversionPolicy::Numeric,
        }
    }
}

impl FileAccessProps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open without write access. Implies no flush on drop.
    pub fn read_only(mut self) -> Self {
        self.mode = AccessMode::ReadOnly;
        self.flush_on_drop = false;
        self
    }

    pub fn flush_on_drop(mut self, enabled: bool) -> Self {
        self.flush_on_drop = enabled;
        self
    }

    pub fn conversion(mut self, policy: ConversionPolicy) -> Self {
        self.conversion = policy;
        self
    }
}

/// File creation properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCreateProps {
    /// Replace an existing file. When false, creating over an existing
    /// path fails with `AlreadyExists`.
    pub truncate: bool,
}

impl Default for FileCreateProps {
    fn default() -> Self {
        Self { truncate: true }
    }
}

impl FileCreateProps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail instead of replacing an existing file.
    pub fn exclusive(mut self) -> Self {
        self.truncate = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_defaults() {
        let p = FileAccessProps::new();
        assert_eq!(p.mode, AccessMode::ReadWrite);
        assert!(p.flush_on_drop);
        assert_eq!(p.conversion, ConversionPolicy::Numeric);
    }

    #[test]
    fn read_only_disables_flush() {
        let p = FileAccessProps::new().read_only();
        assert_eq!(p.mode, AccessMode::ReadOnly);
        assert!(!p.flush_on_drop);
    }

    #[test]
    fn builder_chain() {
        let p = FileAccessProps::new()
            .flush_on_drop(false)
            .conversion(ConversionPolicy::Exact);
        assert!(!p.flush_on_drop);
        assert_eq!(p.conversion, ConversionPolicy::Exact);
        assert!(!FileCreateProps::new().exclusive().truncate);
    }
}
