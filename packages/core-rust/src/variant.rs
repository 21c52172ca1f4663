//! Generic runtime value used by the generic codec path.
//!
//! Every non-structured canonical type converts to a [`Value`] before it is
//! rendered as bytes, and stored bytes come back as [`Value::Bytes`] before
//! being converted to the requested type. Numbers travel as decimal text,
//! which keeps values readable by other clients of the same collection.

use bytes::Bytes;

use crate::error::CodecError;

/// Generic runtime value for the textual/binary conversion path.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No value. Renders as an empty byte string.
    #[default]
    Null,
    /// Boolean, rendered as `true` / `false`.
    Bool(bool),
    /// Signed integer (up to 128 bits).
    Int(i128),
    /// Unsigned integer (up to 128 bits).
    UInt(u128),
    /// Single-precision floating-point number.
    Float32(f32),
    /// Floating-point number (64-bit IEEE 754).
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Raw bytes, as read back from the store.
    Bytes(Bytes),
}

impl Value {
    /// Short variant name used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::UInt(_) => "UInt",
            Value::Float32(_) => "Float32",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::Bytes(_) => "Bytes",
        }
    }

    /// Renders the value as the byte string written to the store.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Value::Null => Bytes::new(),
            Value::Bool(b) => Bytes::from_static(if *b { b"true" } else { b"false" }),
            Value::Int(i) => Bytes::from(i.to_string()),
            Value::UInt(u) => Bytes::from(u.to_string()),
            // `Display` for floats prints the shortest text that parses back exactly.
            Value::Float32(f) => Bytes::from(f.to_string()),
            Value::Float(f) => Bytes::from(f.to_string()),
            Value::String(s) => Bytes::copy_from_slice(s.as_bytes()),
            Value::Bytes(b) => b.clone(),
        }
    }

    /// Text form of the value, for parsing into numbers and booleans.
    fn text(&self, target: &'static str) -> Result<String, CodecError> {
        match self {
            Value::String(s) => Ok(s.clone()),
            Value::Bytes(b) => String::from_utf8(b.to_vec()).map_err(CodecError::from),
            other => Err(CodecError::Unrepresentable {
                variant: other.kind(),
                target,
            }),
        }
    }
}

/// Conversion between a canonical type and the generic [`Value`].
pub trait VariantValue: Sized + Default {
    /// Type name used in error messages.
    const TYPE_NAME: &'static str;

    /// Wraps the value in its natural variant.
    fn to_variant(&self) -> Value;

    /// Converts a variant back into the typed value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the variant cannot represent `Self`.
    fn from_variant(value: Value) -> Result<Self, CodecError>;
}

macro_rules! variant_int {
    ($variant:ident, $wide:ty; $($ty:ty),* $(,)?) => {
        $(
            impl VariantValue for $ty {
                const TYPE_NAME: &'static str = stringify!($ty);

                fn to_variant(&self) -> Value {
                    Value::$variant(<$wide>::from(*self))
                }

                fn from_variant(value: Value) -> Result<Self, CodecError> {
                    match value {
                        Value::Null => Ok(Self::default()),
                        Value::Int(i) => <$ty>::try_from(i).map_err(|_| CodecError::InvalidText {
                            text: i.to_string(),
                            target: Self::TYPE_NAME,
                        }),
                        Value::UInt(u) => <$ty>::try_from(u).map_err(|_| CodecError::InvalidText {
                            text: u.to_string(),
                            target: Self::TYPE_NAME,
                        }),
                        other => {
                            let text = other.text(Self::TYPE_NAME)?;
                            text.trim().parse::<$ty>().map_err(|_| CodecError::InvalidText {
                                text,
                                target: Self::TYPE_NAME,
                            })
                        }
                    }
                }
            }
        )*
    };
}

variant_int!(Int, i128; i8, i16, i32, i64, i128);
variant_int!(UInt, u128; u8, u16, u32, u64, u128);

macro_rules! variant_float {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl VariantValue for $ty {
                const TYPE_NAME: &'static str = stringify!($ty);

                fn to_variant(&self) -> Value {
                    Value::$variant(*self)
                }

                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_precision_loss,
                    clippy::cast_lossless,
                    clippy::unnecessary_cast
                )]
                fn from_variant(value: Value) -> Result<Self, CodecError> {
                    match value {
                        Value::Null => Ok(Self::default()),
                        Value::Float32(f) => Ok(f as $ty),
                        Value::Float(f) => Ok(f as $ty),
                        Value::Int(i) => Ok(i as $ty),
                        Value::UInt(u) => Ok(u as $ty),
                        other => {
                            let text = other.text(Self::TYPE_NAME)?;
                            text.trim().parse::<$ty>().map_err(|_| CodecError::InvalidText {
                                text,
                                target: Self::TYPE_NAME,
                            })
                        }
                    }
                }
            }
        )*
    };
}

variant_float!(Float32 => f32, Float => f64);

impl VariantValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn to_variant(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_variant(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Null => Ok(false),
            Value::Bool(b) => Ok(b),
            Value::Int(i) => Ok(i != 0),
            Value::UInt(u) => Ok(u != 0),
            other => {
                let text = other.text(Self::TYPE_NAME)?;
                match text.trim() {
                    "true" | "1" => Ok(true),
                    "false" | "0" => Ok(false),
                    _ => Err(CodecError::InvalidText {
                        text,
                        target: Self::TYPE_NAME,
                    }),
                }
            }
        }
    }
}

impl VariantValue for String {
    const TYPE_NAME: &'static str = "String";

    fn to_variant(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_variant(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Null => Ok(String::new()),
            Value::String(s) => Ok(s),
            Value::Bytes(b) => Ok(String::from_utf8(b.to_vec())?),
            other => Ok(String::from_utf8(other.to_bytes().to_vec())?),
        }
    }
}

impl VariantValue for Bytes {
    const TYPE_NAME: &'static str = "Bytes";

    fn to_variant(&self) -> Value {
        Value::Bytes(self.clone())
    }

    fn from_variant(value: Value) -> Result<Self, CodecError> {
        Ok(value.to_bytes())
    }
}

impl VariantValue for Vec<u8> {
    const TYPE_NAME: &'static str = "Vec<u8>";

    fn to_variant(&self) -> Value {
        Value::Bytes(Bytes::copy_from_slice(self))
    }

    fn from_variant(value: Value) -> Result<Self, CodecError> {
        Ok(value.to_bytes().to_vec())
    }
}
