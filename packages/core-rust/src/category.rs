//! Normalization of declared key/value categories to canonical value types.
//!
//! A hash may be declared over plain values (`u32`), references (`&'a u32`),
//! owning pointers (`Box<u32>`, `Arc<u32>`, `Rc<u32>`) or nullable pointers
//! (`Option<u32>`). All of them store and return the same canonical type
//! (`u32`), selected at compile time through [`ValueCategory::Value`].

use std::rc::Rc;
use std::sync::Arc;

use bytes::Bytes;

use crate::codec::{Codec, Message};

/// Maps a declared category to its canonical value type.
pub trait ValueCategory {
    /// The canonical, pointer- and reference-stripped type.
    type Value: Codec;

    /// Borrows the canonical value, or `None` for an absent nullable pointer.
    fn canonical(&self) -> Option<&Self::Value>;
}

/// Canonical value type of a declared category.
pub type Canonical<T> = <T as ValueCategory>::Value;

/// Borrowed projection of a canonical value, as handed out by dereference-style accessors.
pub type CanonicalRef<'a, T> = &'a <T as ValueCategory>::Value;

macro_rules! canonical_identity {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ValueCategory for $ty {
                type Value = $ty;

                fn canonical(&self) -> Option<&$ty> {
                    Some(self)
                }
            }
        )*
    };
}

canonical_identity!(
    i8, u8, i16, u16, i32, u32, i64, u64, i128, u128, bool, f32, f64, String, Vec<u8>, Bytes,
);

impl<T> ValueCategory for Message<T>
where
    Message<T>: Codec,
{
    type Value = Message<T>;

    fn canonical(&self) -> Option<&Message<T>> {
        Some(self)
    }
}

impl<T: ValueCategory + ?Sized> ValueCategory for &T {
    type Value = T::Value;

    fn canonical(&self) -> Option<&T::Value> {
        (**self).canonical()
    }
}

impl<T: ValueCategory + ?Sized> ValueCategory for Box<T> {
    type Value = T::Value;

    fn canonical(&self) -> Option<&T::Value> {
        (**self).canonical()
    }
}

impl<T: ValueCategory + ?Sized> ValueCategory for Rc<T> {
    type Value = T::Value;

    fn canonical(&self) -> Option<&T::Value> {
        (**self).canonical()
    }
}

impl<T: ValueCategory + ?Sized> ValueCategory for Arc<T> {
    type Value = T::Value;

    fn canonical(&self) -> Option<&T::Value> {
        (**self).canonical()
    }
}

impl<T: ValueCategory> ValueCategory for Option<T> {
    type Value = T::Value;

    fn canonical(&self) -> Option<&T::Value> {
        self.as_ref().and_then(ValueCategory::canonical)
    }
}
