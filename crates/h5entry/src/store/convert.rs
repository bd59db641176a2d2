//! Primitive element types and conversion between them.

use std::fmt;

use bytemuck::pod_read_unaligned;
use h5entry_format::datatype::{Datatype, DatatypeByteOrder};

use crate::error::StoreError;
use crate::props::ConversionPolicy;

/// Numeric element type of a dataset or attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl Primitive {
    pub fn size(self) -> usize {
        match self {
            Primitive::I8 | Primitive::U8 => 1,
            Primitive::I16 | Primitive::U16 => 2,
            Primitive::I32 | Primitive::U32 | Primitive::F32 => 4,
            Primitive::I64 | Primitive::U64 | Primitive::F64 => 8,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, Primitive::F32 | Primitive::F64)
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            Primitive::I8 | Primitive::I16 | Primitive::I32 | Primitive::I64
        )
    }

    /// The on-disk datatype describing this primitive in `order`.
    pub fn to_datatype(self, order: DatatypeByteOrder) -> Datatype {
        if self.is_float() {
            Datatype::float(self.size() as u32, order)
        } else {
            Datatype::integer(self.size() as u32, self.is_signed(), order)
        }
    }

    /// The primitive a stored datatype maps to. Padded integers and
    /// non-IEEE float layouts have none.
    pub fn from_datatype(dt: &Datatype) -> Option<Primitive> {
        match *dt {
            Datatype::FixedPoint {
                size,
                signed,
                bit_offset: 0,
                bit_precision,
                ..
            } if u32::from(bit_precision) == size * 8 => Some(match (size, signed) {
                (1, true) => Primitive::I8,
                (2, true) => Primitive::I16,
                (4, true) => Primitive::I32,
                (8, true) => Primitive::I64,
                (1, false) => Primitive::U8,
                (2, false) => Primitive::U16,
                (4, false) => Primitive::U32,
                (8, false) => Primitive::U64,
                _ => return None,
            }),
            Datatype::FloatingPoint {
                size: 4,
                exponent_size: 8,
                mantissa_size: 23,
                ..
            } => Some(Primitive::F32),
            Datatype::FloatingPoint {
                size: 8,
                exponent_size: 11,
                mantissa_size: 52,
                ..
            } => Some(Primitive::F64),
            _ => None,
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Primitive::I8 => "i8",
            Primitive::I16 => "i16",
            Primitive::I32 => "i32",
            Primitive::I64 => "i64",
            Primitive::U8 => "u8",
            Primitive::U16 => "u16",
            Primitive::U32 => "u32",
            Primitive::U64 => "u64",
            Primitive::F32 => "f32",
            Primitive::F64 => "f64",
        };
        f.write_str(name)
    }
}

/// One element widened to a lossless intermediate.
#[derive(Debug, Clone, Copy)]
enum Wide {
    Int(i128),
    Float(f64),
}

fn load(p: Primitive, b: &[u8]) -> Wide {
    match p {
        Primitive::I8 => Wide::Int(pod_read_unaligned::<i8>(b).into()),
        Primitive::I16 => Wide::Int(pod_read_unaligned::<i16>(b).into()),
        Primitive::I32 => Wide::Int(pod_read_unaligned::<i32>(b).into()),
        Primitive::I64 => Wide::Int(pod_read_unaligned::<i64>(b).into()),
        Primitive::U8 => Wide::Int(pod_read_unaligned::<u8>(b).into()),
        Primitive::U16 => Wide::Int(pod_read_unaligned::<u16>(b).into()),
        Primitive::U32 => Wide::Int(pod_read_unaligned::<u32>(b).into()),
        Primitive::U64 => Wide::Int(pod_read_unaligned::<u64>(b).into()),
        Primitive::F32 => Wide::Float(pod_read_unaligned::<f32>(b).into()),
        Primitive::F64 => Wide::Float(pod_read_unaligned::<f64>(b)),
    }
}

macro_rules! clamp_int {
    ($v:expr, $t:ty) => {
        <$t>::try_from($v.clamp(<$t>::MIN as i128, <$t>::MAX as i128)).unwrap_or_default()
    };
}

macro_rules! narrow {
    ($w:expr, $t:ty) => {
        match $w {
            Wide::Int(v) => clamp_int!(v, $t),
            // `as` saturates and maps NaN to zero
            Wide::Float(v) => v as $t,
        }
    };
}

fn store(p: Primitive, w: Wide, out: &mut Vec<u8>) {
    match p {
        Primitive::I8 => out.extend_from_slice(&narrow!(w, i8).to_ne_bytes()),
        Primitive::I16 => out.extend_from_slice(&narrow!(w, i16).to_ne_bytes()),
        Primitive::I32 => out.extend_from_slice(&narrow!(w, i32).to_ne_bytes()),
        Primitive::I64 => out.extend_from_slice(&narrow!(w, i64).to_ne_bytes()),
        Primitive::U8 => out.extend_from_slice(&narrow!(w, u8).to_ne_bytes()),
        Primitive::U16 => out.extend_from_slice(&narrow!(w, u16).to_ne_bytes()),
        Primitive::U32 => out.extend_from_slice(&narrow!(w, u32).to_ne_bytes()),
        Primitive::U64 => out.extend_from_slice(&narrow!(w, u64).to_ne_bytes()),
        Primitive::F32 => {
            let v = match w {
                Wide::Int(v) => v as f32,
                Wide::Float(v) => v as f32,
            };
            out.extend_from_slice(&v.to_ne_bytes());
        }
        Primitive::F64 => {
            let v = match w {
                Wide::Int(v) => v as f64,
                Wide::Float(v) => v,
            };
            out.extend_from_slice(&v.to_ne_bytes());
        }
    }
}

/// Convert native-endian elements of type `from` into elements of `to`.
pub(crate) fn convert(
    from: Primitive,
    to: Primitive,
    src: &[u8],
    policy: ConversionPolicy,
) -> Result<Vec<u8>, StoreError> {
    if from == to {
        return Ok(src.to_vec());
    }
    if policy == ConversionPolicy::Exact {
        return Err(StoreError::Conversion { from, to });
    }
    let mut out = Vec::with_capacity(src.len() / from.size() * to.size());
    for chunk in src.chunks_exact(from.size()) {
        store(to, load(from, chunk), &mut out);
    }
    Ok(out)
}

/// Reverse the bytes of every `size`-byte element in place.
pub(crate) fn swap_elements(data: &mut [u8], size: usize) {
    if size > 1 {
        for chunk in data.chunks_exact_mut(size) {
            chunk.reverse();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes<T: bytemuck::Pod>(v: &[T]) -> Vec<u8> {
        bytemuck::cast_slice(v).to_vec()
    }

    #[test]
    fn identity_is_copy() {
        let src = bytes(&[1.5f64, 2.5]);
        let out = convert(Primitive::F64, Primitive::F64, &src, ConversionPolicy::Exact).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn widen_int_to_float() {
        let out = convert(
            Primitive::I32,
            Primitive::F64,
            &bytes(&[-3i32, 7]),
            ConversionPolicy::Numeric,
        )
        .unwrap();
        assert_eq!(bytemuck::pod_collect_to_vec::<u8, f64>(&out), vec![-3.0, 7.0]);
    }

    #[test]
    fn narrowing_clamps() {
        let out = convert(
            Primitive::I64,
            Primitive::U8,
            &bytes(&[-5i64, 300, 42]),
            ConversionPolicy::Numeric,
        )
        .unwrap();
        assert_eq!(out, vec![0, 255, 42]);
    }

    #[test]
    fn float_to_int_saturates() {
        let out = convert(
            Primitive::F64,
            Primitive::I16,
            &bytes(&[1e9f64, -1e9, f64::NAN, 2.7]),
            ConversionPolicy::Numeric,
        )
        .unwrap();
        assert_eq!(
            bytemuck::pod_collect_to_vec::<u8, i16>(&out),
            vec![i16::MAX, i16::MIN, 0, 2]
        );
    }

    #[test]
    fn u64_max_survives_widening() {
        let out = convert(
            Primitive::U64,
            Primitive::I64,
            &bytes(&[u64::MAX]),
            ConversionPolicy::Numeric,
        )
        .unwrap();
        assert_eq!(bytemuck::pod_collect_to_vec::<u8, i64>(&out), vec![i64::MAX]);
    }

    #[test]
    fn exact_policy_rejects() {
        assert_eq!(
            convert(Primitive::F32, Primitive::F64, &[0; 4], ConversionPolicy::Exact),
            Err(StoreError::Conversion {
                from: Primitive::F32,
                to: Primitive::F64
            })
        );
    }

    #[test]
    fn datatype_mapping() {
        let all = [
            Primitive::I8,
            Primitive::U16,
            Primitive::I32,
            Primitive::U64,
            Primitive::F32,
            Primitive::F64,
        ];
        for p in all {
            let dt = p.to_datatype(DatatypeByteOrder::BigEndian);
            assert_eq!(Primitive::from_datatype(&dt), Some(p));
        }
        let padded = Datatype::FixedPoint {
            size: 4,
            byte_order: DatatypeByteOrder::LittleEndian,
            signed: true,
            bit_offset: 0,
            bit_precision: 24,
        };
        assert_eq!(Primitive::from_datatype(&padded), None);
    }

    #[test]
    fn swap_reverses_each_element() {
        let mut data = vec![1, 2, 3, 4, 5, 6];
        swap_elements(&mut data, 2);
        assert_eq!(data, vec![2, 1, 4, 3, 6, 5]);
    }
}
