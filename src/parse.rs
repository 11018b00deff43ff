//! Helper macros for parsing packed little-endian structs.
//!
//! Fields are laid out back to back with no padding, each read at an
//! absolute offset through a [`ByteCursor`], so a truncated buffer fails
//! with the offset of the first field that does not fit.
#![allow(unused_macros, dead_code)]

use std::convert::TryInto;

use crate::{cursor::ByteCursor, error::DecodeError};

/// Declare a [`Parseable`] struct.
///
/// Each field is `name => wire type` optionally followed by `as` a
/// converted type. Only simple structs without generics are supported.
macro_rules! declare_parseable_struct {
    (
        $(#[$smeta:meta])*
            $svis:vis struct $sname:ident {
                $($fvis:vis $name:ident => $ty:ty $(as $ty2:ty)? ),* $(,)?
            }
    ) => {
        $(#[$smeta])* #[allow(dead_code)]
            $svis struct $sname {
                $($fvis $name: declaration_type!($ty $(as $ty2)?)),*
            }

        impl crate::parse::Parseable for $sname {
            const SIZE: usize = 0 $(+ <$ty as crate::parse::Parseable>::SIZE)*;

            #[allow(unused_assignments)]
            fn parse(
                cursor: &crate::cursor::ByteCursor<'_>,
                offset: usize,
            ) -> Result<Self, crate::error::DecodeError> {
                let mut at = offset;
                $(
                    let $name = <$ty as crate::parse::Parseable>::parse(cursor, at)? $(as $ty2)?;
                    at += <$ty as crate::parse::Parseable>::SIZE;
                )*
                Ok($sname {
                    $( $name ),*
                })
            }
        }
    };
}

/// Declare multiple [`Parseable`] structs.
macro_rules! declare_parseable_structs {
    (
        $(
            $(#[$smeta:meta])*
                $svis:vis struct $sname:ident {
                    $($tt:tt)*
                }
        )*
    ) => {
        $(
            declare_parseable_struct! {
                $(#[$smeta])*
                    $svis struct $sname {
                        $($tt)*
                    }
            }
        )*
    };
}

/// Helper macro that expands to the parsed type or the
/// converted type.
macro_rules! declaration_type {
    ($ty:ty as $ty2:ty) => {
        $ty2
    };
    ($ty:ty) => {
        $ty
    };
}

pub(crate) trait Parseable: Sized {
    /// Bytes consumed on the wire.
    const SIZE: usize;
    fn parse(cursor: &ByteCursor<'_>, offset: usize) -> Result<Self, DecodeError>;
}

macro_rules! impl_parseable {
    ($ty:ty, $method:ident, $size:expr) => {
        impl Parseable for $ty {
            const SIZE: usize = $size;
            fn parse(cursor: &ByteCursor<'_>, offset: usize) -> Result<Self, DecodeError> {
                cursor.$method(offset)
            }
        }
    };
}

impl_parseable!(u8, read_u8, 1);
impl_parseable!(u16, read_u16, 2);
impl_parseable!(u32, read_u32, 4);
impl_parseable!(i64, read_i64, 8);
impl_parseable!(f32, read_f32, 4);

impl<const N: usize> Parseable for [u8; N] {
    const SIZE: usize = N;
    fn parse(cursor: &ByteCursor<'_>, offset: usize) -> Result<Self, DecodeError> {
        let slice = cursor.slice(offset, N)?;
        slice.try_into().map_err(|_| DecodeError::OutOfBounds {
            offset,
            len: N,
            available: cursor.len(),
        })
    }
}
