//! Marshalling between native aggregates and whole-dataset raw buffers.
//!
//! A [`TypeMarshal`] implementation tells the dataset layer everything it
//! needs to store a value: how many dimensions the type has, the extents of
//! a particular value, the element type, and a contiguous row-major view
//! of the elements. Reading goes the other way: [`TypeMarshal::allocate`]
//! builds a zeroed value of the stored extents and the store fills
//! [`TypeMarshal::raw_view_mut`] in place.
//!
//! Implementations are provided for every [`Element`] as a scalar, for
//! `Vec<E>`, and for `ndarray` arrays of rank one through four. Other
//! aggregates plug in by implementing the trait.

use std::borrow::Cow;
use std::fmt::Debug;

use bytemuck::Pod;
use ndarray::{Array, Ix1, Ix2, Ix3, Ix4, IxDyn};

use crate::error::{Error, Result};
use crate::store::Primitive;

/// A primitive element the store can hold.
pub trait Element: Pod + Default + Debug + PartialEq + 'static {
    const PRIMITIVE: Primitive;
}

macro_rules! impl_element {
    ($($t:ty => $p:ident),* $(,)?) => {
        $(
            impl Element for $t {
                const PRIMITIVE: Primitive = Primitive::$p;
            }
        )*
    };
}

impl_element! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
}

/// Codec between a native aggregate and a fixed-shape raw buffer.
pub trait TypeMarshal: Sized {
    type Elem: Element;

    /// Rank of every value of this type. Zero for scalars.
    fn dimension_count() -> usize;

    /// Extents of this value, one per dimension, slowest-varying first.
    fn shape_of(&self) -> Vec<u64>;

    /// True when this value can be written in place over storage with
    /// `extents`.
    fn matching_extents(&self, extents: &[u64]) -> bool {
        extents.len() == Self::dimension_count() && self.shape_of() == extents
    }

    /// Element type to store this value as.
    fn datatype_of(&self) -> Primitive {
        Self::Elem::PRIMITIVE
    }

    /// A zeroed value with the given extents.
    fn allocate(extents: &[u64]) -> Result<Self>;

    /// The elements in row-major order.
    fn raw_view(&self) -> Cow<'_, [Self::Elem]>;

    /// Mutable row-major view of the elements, filled in by reads.
    fn raw_view_mut(&mut self) -> Result<&mut [Self::Elem]>;
}

fn check_rank<T: TypeMarshal>(extents: &[u64]) -> Result<()> {
    if extents.len() == T::dimension_count() {
        Ok(())
    } else {
        Err(Error::Marshal(format!(
            "{} needs {} extents, got {}",
            std::any::type_name::<T>(),
            T::dimension_count(),
            extents.len()
        )))
    }
}

fn to_usize(extent: u64) -> Result<usize> {
    usize::try_from(extent).map_err(|_| Error::Marshal(format!("extent {extent} does not fit in memory")))
}

/// Number of `E` elements a value of `extents` holds. Fails when the
/// buffer would exceed the largest possible allocation.
fn element_count<E>(extents: &[u64]) -> Result<usize> {
    let too_large = || Error::Marshal(format!("extents {extents:?} exceed the addressable size"));
    let count = extents
        .iter()
        .try_fold(1usize, |n, &dim| n.checked_mul(usize::try_from(dim).ok()?))
        .ok_or_else(too_large)?;
    match count.checked_mul(std::mem::size_of::<E>()) {
        Some(bytes) if bytes <= isize::MAX as usize => Ok(count),
        _ => Err(too_large()),
    }
}

macro_rules! impl_scalar {
    ($($t:ty),* $(,)?) => {
        $(
            impl TypeMarshal for $t {
                type Elem = $t;

                fn dimension_count() -> usize {
                    0
                }

                fn shape_of(&self) -> Vec<u64> {
                    Vec::new()
                }

                fn allocate(extents: &[u64]) -> Result<Self> {
                    check_rank::<Self>(extents)?;
                    Ok(<$t>::default())
                }

                fn raw_view(&self) -> Cow<'_, [$t]> {
                    Cow::Borrowed(std::slice::from_ref(self))
                }

                fn raw_view_mut(&mut self) -> Result<&mut [$t]> {
                    Ok(std::slice::from_mut(self))
                }
            }
        )*
    };
}

impl_scalar!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl<E: Element> TypeMarshal for Vec<E> {
    type Elem = E;

    fn dimension_count() -> usize {
        1
    }

    fn shape_of(&self) -> Vec<u64> {
        vec![self.len() as u64]
    }

    fn allocate(extents: &[u64]) -> Result<Self> {
        check_rank::<Self>(extents)?;
        Ok(vec![E::default(); element_count::<E>(extents)?])
    }

    fn raw_view(&self) -> Cow<'_, [E]> {
        Cow::Borrowed(self.as_slice())
    }

    fn raw_view_mut(&mut self) -> Result<&mut [E]> {
        Ok(self.as_mut_slice())
    }
}

macro_rules! impl_array {
    ($($dim:ty => $rank:expr),* $(,)?) => {
        $(
            impl<E: Element> TypeMarshal for Array<E, $dim> {
                type Elem = E;

                fn dimension_count() -> usize {
                    $rank
                }

                fn shape_of(&self) -> Vec<u64> {
                    self.shape().iter().map(|&n| n as u64).collect()
                }

                fn allocate(extents: &[u64]) -> Result<Self> {
                    check_rank::<Self>(extents)?;
                    let len = element_count::<E>(extents)?;
                    let shape = extents
                        .iter()
                        .map(|&n| to_usize(n))
                        .collect::<Result<Vec<_>>>()?;
                    // rejects shapes whose non-zero axes overflow isize
                    Array::from_shape_vec(IxDyn(&shape), vec![E::default(); len])
                        .map_err(|e| Error::Marshal(e.to_string()))?
                        .into_dimensionality::<$dim>()
                        .map_err(|e| Error::Marshal(e.to_string()))
                }

                // Views of non-standard layouts (transposed, sliced) are
                // gathered into row-major order.
                fn raw_view(&self) -> Cow<'_, [E]> {
                    match self.as_slice() {
                        Some(slice) => Cow::Borrowed(slice),
                        None => Cow::Owned(self.iter().copied().collect()),
                    }
                }

                fn raw_view_mut(&mut self) -> Result<&mut [E]> {
                    self.as_slice_mut()
                        .ok_or_else(|| Error::Marshal("array is not in standard layout".into()))
                }
            }
        )*
    };
}

impl_array! {
    Ix1 => 1,
    Ix2 => 2,
    Ix3 => 3,
    Ix4 => 4,
}
