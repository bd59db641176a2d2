//! Object header message type ids.

macro_rules! message_types {
    ($($variant:ident = $id:literal),* $(,)?) => {
        /// Header message kinds the codec interprets. Everything else is
        /// carried as [`MessageType::Unknown`] with its raw id.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum MessageType {
            $($variant,)*
            Unknown(u16),
        }

        impl MessageType {
            pub fn from_u16(raw: u16) -> MessageType {
                match raw {
                    $($id => MessageType::$variant,)*
                    other => MessageType::Unknown(other),
                }
            }

            pub fn to_u16(self) -> u16 {
                match self {
                    $(MessageType::$variant => $id,)*
                    MessageType::Unknown(raw) => raw,
                }
            }
        }
    };
}

message_types! {
    Nil = 0x0000,
    Dataspace = 0x0001,
    LinkInfo = 0x0002,
    Datatype = 0x0003,
    FillValue = 0x0005,
    Link = 0x0006,
    DataLayout = 0x0008,
    GroupInfo = 0x000A,
    Attribute = 0x000C,
    ObjectHeaderContinuation = 0x0010,
}
