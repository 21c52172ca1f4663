//! Value codec: typed values to stored byte strings and back.
//!
//! Two strategies exist and exactly one applies to any given type:
//!
//! - **Generic**: the value converts to a [`Value`] and is rendered as
//!   text/bytes. Integral types additionally support a binary-safe mode
//!   (`binarize = true`) that writes the fixed-width big-endian
//!   representation. Width-1 types are written verbatim.
//! - **Structured message**: types wrapped in [`Message`] carry their own
//!   self-describing encoding (named-field `MsgPack`). The `binarize` flag is
//!   ignored.
//!
//! In every mode an empty byte string decodes to the type's default value.
//! Absence is not an error.

use std::io;
use std::ops::{Deref, DerefMut};

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::error::CodecError;
use crate::variant::{Value, VariantValue};

/// Serialization contract for canonical key and value types.
pub trait Codec: Sized + Default {
    /// Encodes the value as a stored byte string.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the value has no byte representation.
    fn serialize(&self, binarize: bool) -> Result<Bytes, CodecError>;

    /// Decodes a stored byte string. Empty input yields `Self::default()`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] on a width mismatch in binary mode or on
    /// malformed data.
    fn deserialize(data: &[u8], binarize: bool) -> Result<Self, CodecError>;
}

/// Encodes an optional value; `None` encodes as an empty byte string.
///
/// # Errors
///
/// Propagates the [`Codec::serialize`] error of a present value.
pub fn serialize_optional<V: Codec>(value: Option<&V>, binarize: bool) -> Result<Bytes, CodecError> {
    match value {
        Some(v) => v.serialize(binarize),
        None => Ok(Bytes::new()),
    }
}

/// Decodes an optional byte string; `None` decodes as the default value.
///
/// # Errors
///
/// Propagates the [`Codec::deserialize`] error of present data.
pub fn deserialize_optional<V: Codec>(data: Option<&[u8]>, binarize: bool) -> Result<V, CodecError> {
    match data {
        Some(d) => V::deserialize(d, binarize),
        None => Ok(V::default()),
    }
}

fn generic_serialize<V: VariantValue>(value: &V) -> Bytes {
    value.to_variant().to_bytes()
}

fn generic_deserialize<V: VariantValue>(data: &[u8]) -> Result<V, CodecError> {
    if data.is_empty() {
        return Ok(V::default());
    }
    V::from_variant(Value::Bytes(Bytes::copy_from_slice(data)))
}

macro_rules! integral_codec {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Codec for $ty {
                fn serialize(&self, binarize: bool) -> Result<Bytes, CodecError> {
                    if binarize {
                        // `to_be_bytes` on a 1-byte type is the byte itself.
                        Ok(Bytes::copy_from_slice(&self.to_be_bytes()))
                    } else {
                        Ok(generic_serialize(self))
                    }
                }

                fn deserialize(data: &[u8], binarize: bool) -> Result<Self, CodecError> {
                    if !binarize {
                        return generic_deserialize(data);
                    }
                    if data.is_empty() {
                        return Ok(Self::default());
                    }
                    let raw: [u8; std::mem::size_of::<$ty>()] =
                        data.try_into().map_err(|_| CodecError::WidthMismatch {
                            expected: std::mem::size_of::<$ty>(),
                            actual: data.len(),
                        })?;
                    Ok(<$ty>::from_be_bytes(raw))
                }
            }
        )*
    };
}

integral_codec!(i8, u8, i16, u16, i32, u32, i64, u64, i128, u128);

impl Codec for bool {
    fn serialize(&self, binarize: bool) -> Result<Bytes, CodecError> {
        if binarize {
            Ok(Bytes::copy_from_slice(&[u8::from(*self)]))
        } else {
            Ok(generic_serialize(self))
        }
    }

    fn deserialize(data: &[u8], binarize: bool) -> Result<Self, CodecError> {
        if !binarize {
            return generic_deserialize(data);
        }
        match data {
            [] => Ok(false),
            [b] => Ok(*b != 0),
            _ => Err(CodecError::WidthMismatch {
                expected: 1,
                actual: data.len(),
            }),
        }
    }
}

macro_rules! generic_codec {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Codec for $ty {
                fn serialize(&self, _binarize: bool) -> Result<Bytes, CodecError> {
                    Ok(generic_serialize(self))
                }

                fn deserialize(data: &[u8], _binarize: bool) -> Result<Self, CodecError> {
                    generic_deserialize(data)
                }
            }
        )*
    };
}

generic_codec!(f32, f64, String, Vec<u8>, Bytes);

/// Wrapper selecting the structured-message encoding for `T`.
///
/// Any serde type with a default value can be stored this way. The encoding
/// is named-field `MsgPack`, so fields may be added to `T` later without
/// breaking existing entries as long as they carry `#[serde(default)]`.
///
/// ```
/// use remote_hash_core::codec::{Codec, Message};
///
/// #[derive(Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
/// struct Profile {
///     name: String,
///     age: u32,
/// }
///
/// let msg = Message(Profile { name: "Ada".into(), age: 36 });
/// let bytes = msg.serialize(true).unwrap();
/// let back = Message::<Profile>::deserialize(&bytes, false).unwrap();
/// assert_eq!(back, msg);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Message<T>(pub T);

impl<T> Message<T> {
    /// Unwraps the inner value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Message<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Message<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T> From<T> for Message<T> {
    fn from(value: T) -> Self {
        Message(value)
    }
}

impl<T: serde::Serialize> Message<T> {
    /// Number of bytes the wire encoding occupies.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] if `T` cannot be serialized.
    pub fn encoded_len(&self) -> Result<usize, CodecError> {
        let mut counter = ByteCounter(0);
        rmp_serde::encode::write_named(&mut counter, &self.0)?;
        Ok(counter.0)
    }
}

impl<T> Codec for Message<T>
where
    T: serde::Serialize + DeserializeOwned + Default,
{
    fn serialize(&self, _binarize: bool) -> Result<Bytes, CodecError> {
        let reported = self.encoded_len()?;
        let mut buf = Vec::with_capacity(reported);
        rmp_serde::encode::write_named(&mut buf, &self.0)?;
        if buf.len() != reported {
            return Err(CodecError::LengthMismatch {
                reported,
                written: buf.len(),
            });
        }
        Ok(Bytes::from(buf))
    }

    fn deserialize(data: &[u8], _binarize: bool) -> Result<Self, CodecError> {
        if data.is_empty() {
            return Ok(Message(T::default()));
        }
        Ok(Message(rmp_serde::from_slice(data)?))
    }
}

/// Sink that only counts bytes.
struct ByteCounter(usize);

impl io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Profile {
        name: String,
        tags: Vec<String>,
        score: i64,
    }

    fn round_trip<V: Codec + PartialEq + std::fmt::Debug>(value: &V, binarize: bool) {
        let bytes = value.serialize(binarize).unwrap();
        let back = V::deserialize(&bytes, binarize).unwrap();
        assert_eq!(&back, value);
    }

    // ---- Binary mode ----

    #[test]
    fn u16_binary_is_big_endian() {
        let bytes = 0x0102_u16.serialize(true).unwrap();
        assert_eq!(&bytes[..], &[0x01, 0x02]);
    }

    #[test]
    fn i32_binary_is_big_endian() {
        let bytes = (-2_i32).serialize(true).unwrap();
        assert_eq!(&bytes[..], &[0xff, 0xff, 0xff, 0xfe]);
    }

    #[test]
    fn one_byte_types_are_verbatim() {
        assert_eq!(&0xab_u8.serialize(true).unwrap()[..], &[0xab]);
        assert_eq!(&(-1_i8).serialize(true).unwrap()[..], &[0xff]);
        assert_eq!(&true.serialize(true).unwrap()[..], &[0x01]);
    }

    #[test]
    fn binary_width_mismatch_is_error() {
        let err = u32::deserialize(&[0x00, 0x01, 0x02], true).unwrap_err();
        assert!(matches!(
            err,
            CodecError::WidthMismatch {
                expected: 4,
                actual: 3
            }
        ));

        let err = u16::deserialize(&[0, 0, 0, 1], true).unwrap_err();
        assert!(matches!(err, CodecError::WidthMismatch { expected: 2, .. }));

        let err = bool::deserialize(&[1, 1], true).unwrap_err();
        assert!(matches!(err, CodecError::WidthMismatch { expected: 1, .. }));
    }

    #[test]
    fn integral_extremes_round_trip_both_modes() {
        for binarize in [false, true] {
            round_trip(&i8::MIN, binarize);
            round_trip(&i8::MAX, binarize);
            round_trip(&u8::MAX, binarize);
            round_trip(&i16::MIN, binarize);
            round_trip(&u16::MAX, binarize);
            round_trip(&i32::MIN, binarize);
            round_trip(&u32::MAX, binarize);
            round_trip(&i64::MIN, binarize);
            round_trip(&u64::MAX, binarize);
            round_trip(&i128::MIN, binarize);
            round_trip(&u128::MAX, binarize);
            round_trip(&0_i64, binarize);
            round_trip(&true, binarize);
            round_trip(&false, binarize);
        }
    }

    // ---- Generic mode ----

    #[test]
    fn generic_integers_are_decimal_text() {
        assert_eq!(&(-17_i32).serialize(false).unwrap()[..], b"-17");
        assert_eq!(&258_u16.serialize(false).unwrap()[..], b"258");
    }

    #[test]
    fn binarize_is_ignored_for_non_integrals() {
        let s = "héllo".to_string();
        assert_eq!(s.serialize(true).unwrap(), s.serialize(false).unwrap());
        assert_eq!(&2.5_f64.serialize(true).unwrap()[..], b"2.5");
    }

    #[test]
    fn f32_is_written_as_its_shortest_text() {
        assert_eq!(&0.1_f32.serialize(false).unwrap()[..], b"0.1");
        assert_eq!(&(-2.75_f32).serialize(true).unwrap()[..], b"-2.75");
        assert_eq!(f32::deserialize(b"0.1", false).unwrap(), 0.1_f32);
    }

    #[test]
    fn floats_round_trip_exactly() {
        for v in [0.1_f64, -3.25, f64::MAX, f64::MIN_POSITIVE, 1e-300] {
            round_trip(&v, false);
        }
        round_trip(&0.1_f32, false);
        round_trip(&f32::MAX, false);
    }

    #[test]
    fn byte_strings_are_verbatim() {
        let raw = vec![0_u8, 0xff, b'\n', 7];
        assert_eq!(&raw.serialize(false).unwrap()[..], &raw[..]);
        round_trip(&raw, false);
        round_trip(&Bytes::from_static(b"\x00\x01"), true);
    }

    #[test]
    fn generic_malformed_text_is_error() {
        assert!(i32::deserialize(b"4x", false).is_err());
        assert!(u8::deserialize(b"-1", false).is_err());
    }

    // ---- Absence ----

    #[test]
    fn empty_input_yields_default_in_every_mode() {
        for binarize in [false, true] {
            assert_eq!(u64::deserialize(b"", binarize).unwrap(), 0);
            assert_eq!(i8::deserialize(b"", binarize).unwrap(), 0);
            assert!(!bool::deserialize(b"", binarize).unwrap());
            assert_eq!(String::deserialize(b"", binarize).unwrap(), "");
            assert_eq!(f64::deserialize(b"", binarize).unwrap(), 0.0);
            assert_eq!(
                Message::<Profile>::deserialize(b"", binarize).unwrap(),
                Message::default()
            );
        }
    }

    #[test]
    fn optional_helpers_map_none_to_empty_and_default() {
        assert!(serialize_optional::<u32>(None, true).unwrap().is_empty());
        assert_eq!(
            &serialize_optional(Some(&0x0a0b_u16), true).unwrap()[..],
            &[0x0a, 0x0b]
        );
        assert_eq!(deserialize_optional::<u32>(None, true).unwrap(), 0);
        assert_eq!(deserialize_optional::<u32>(Some(&b"12"[..]), false).unwrap(), 12);
    }

    // ---- Structured messages ----

    #[test]
    fn message_round_trip_ignores_binarize() {
        let msg = Message(Profile {
            name: "ada".to_string(),
            tags: vec!["admin".to_string(), "ops".to_string()],
            score: -9,
        });
        let a = msg.serialize(true).unwrap();
        let b = msg.serialize(false).unwrap();
        assert_eq!(a, b);
        round_trip(&msg, true);
        round_trip(&msg, false);
    }

    #[test]
    fn message_writes_exactly_encoded_len() {
        let msg = Message(Profile {
            name: "grace".to_string(),
            tags: Vec::new(),
            score: 1 << 40,
        });
        let bytes = msg.serialize(false).unwrap();
        assert_eq!(bytes.len(), msg.encoded_len().unwrap());
    }

    #[test]
    fn message_rejects_garbage() {
        let err = Message::<Profile>::deserialize(&[0xc1], false).unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }

    // ---- Properties ----

    macro_rules! binary_width_props {
        ($($name:ident: $ty:ty),* $(,)?) => {
            proptest! {
                $(
                    #[test]
                    fn $name(v in any::<$ty>()) {
                        let bytes = v.serialize(true).unwrap();
                        prop_assert_eq!(bytes.len(), std::mem::size_of::<$ty>());
                        prop_assert_eq!(<$ty>::deserialize(&bytes, true).unwrap(), v);
                    }
                )*
            }
        };
    }

    binary_width_props!(
        prop_i8_binary_width: i8,
        prop_u8_binary_width: u8,
        prop_i16_binary_width: i16,
        prop_u16_binary_width: u16,
        prop_i32_binary_width: i32,
        prop_u32_binary_width: u32,
        prop_i64_binary_width: i64,
        prop_u64_binary_width: u64,
        prop_i128_binary_width: i128,
        prop_u128_binary_width: u128,
        prop_bool_binary_width: bool,
    );

    proptest! {
        #[test]
        fn prop_i64_round_trips(v in any::<i64>(), binarize in any::<bool>()) {
            let bytes = v.serialize(binarize).unwrap();
            prop_assert_eq!(i64::deserialize(&bytes, binarize).unwrap(), v);
        }

        #[test]
        fn prop_strings_round_trip(s in ".*") {
            let bytes = s.serialize(false).unwrap();
            prop_assert_eq!(String::deserialize(&bytes, false).unwrap(), s);
        }

        #[test]
        fn prop_messages_round_trip(name in "[a-z]{0,12}", score in any::<i64>()) {
            let msg = Message(Profile { name, tags: vec![], score });
            let bytes = msg.serialize(false).unwrap();
            prop_assert_eq!(Message::<Profile>::deserialize(&bytes, false).unwrap(), msg);
        }
    }
}
