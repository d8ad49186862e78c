//! Reduction of arbitrary `Serialize` values to a closed value tree.
//!
//! [`to_value`] runs a value through [`ValueSerializer`] and produces an
//! [`EncodedValue`]: the only shape the query encoder ever has to walk.
//!
//! | serde data model                     | [`EncodedValue`]                       |
//! |--------------------------------------|----------------------------------------|
//! | bool, integers, floats, char, str    | `Scalar`                               |
//! | `None`, `()`                         | `Nil`                                  |
//! | `Some(v)`, newtype struct            | whatever `v` reduces to                |
//! | unit variant                         | `Scalar(variant)`                      |
//! | seq, tuple, tuple struct, bytes      | `Indexed`                              |
//! | struct, map, unit struct             | `Keyed`                                |
//! | newtype/tuple/struct variant         | `Keyed([(variant, inner)])`            |

use std::fmt;

use derive_more::{Display, Error};
use serde::Serialize;
use serde::ser::{self, Serializer};

/// A node of a reduced value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedValue {
    /// Absent value (`None`, `()`).
    Nil,
    /// Leaf rendered to its canonical string form.
    Scalar(String),
    /// Named children in declaration order.
    Keyed(Vec<(String, EncodedValue)>),
    /// Positional children.
    Indexed(Vec<EncodedValue>),
}

impl EncodedValue {
    /// Build a scalar from anything printable.
    #[must_use]
    pub fn scalar(value: impl fmt::Display) -> Self {
        Self::Scalar(value.to_string())
    }

    /// Returns `true` for `Nil`.
    #[must_use]
    pub const fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Returns `true` for keyed and indexed containers.
    #[must_use]
    pub const fn is_container(&self) -> bool {
        matches!(self, Self::Keyed(_) | Self::Indexed(_))
    }
}

/// Failure while reducing a value to an [`EncodedValue`].
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("{message}")]
pub struct EncodeError {
    #[error(not(source))]
    message: String,
}

impl EncodeError {
    /// Create an encode error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl ser::Error for EncodeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self::new(msg.to_string())
    }
}

/// Reduce a value to an [`EncodedValue`].
///
/// # Errors
///
/// Returns an error if the value's `Serialize` implementation fails or if a
/// map key does not reduce to a scalar.
///
/// # Example
///
/// ```
/// use courier_core::{EncodedValue, to_value};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Page { number: u32, size: Option<u32> }
///
/// let value = to_value(&Page { number: 2, size: None }).expect("reduce");
/// assert_eq!(
///     value,
///     EncodedValue::Keyed(vec![
///         ("number".to_string(), EncodedValue::scalar(2)),
///         ("size".to_string(), EncodedValue::Nil),
///     ])
/// );
/// ```
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<EncodedValue, EncodeError> {
    value.serialize(ValueSerializer)
}

/// `serde` serializer producing an [`EncodedValue`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueSerializer;

type Reduced = Result<EncodedValue, EncodeError>;

impl Serializer for ValueSerializer {
    type Ok = EncodedValue;
    type Error = EncodeError;

    type SerializeSeq = SeqEncoder;
    type SerializeTuple = SeqEncoder;
    type SerializeTupleStruct = SeqEncoder;
    type SerializeTupleVariant = VariantSeqEncoder;
    type SerializeMap = MapEncoder;
    type SerializeStruct = StructEncoder;
    type SerializeStructVariant = VariantStructEncoder;

    fn serialize_bool(self, v: bool) -> Reduced {
        Ok(EncodedValue::scalar(v))
    }

    fn serialize_i8(self, v: i8) -> Reduced {
        Ok(EncodedValue::scalar(v))
    }

    fn serialize_i16(self, v: i16) -> Reduced {
        Ok(EncodedValue::scalar(v))
    }

    fn serialize_i32(self, v: i32) -> Reduced {
        Ok(EncodedValue::scalar(v))
    }

    fn serialize_i64(self, v: i64) -> Reduced {
        Ok(EncodedValue::scalar(v))
    }

    fn serialize_i128(self, v: i128) -> Reduced {
        Ok(EncodedValue::scalar(v))
    }

    fn serialize_u8(self, v: u8) -> Reduced {
        Ok(EncodedValue::scalar(v))
    }

    fn serialize_u16(self, v: u16) -> Reduced {
        Ok(EncodedValue::scalar(v))
    }

    fn serialize_u32(self, v: u32) -> Reduced {
        Ok(EncodedValue::scalar(v))
    }

    fn serialize_u64(self, v: u64) -> Reduced {
        Ok(EncodedValue::scalar(v))
    }

    fn serialize_u128(self, v: u128) -> Reduced {
        Ok(EncodedValue::scalar(v))
    }

    fn serialize_f32(self, v: f32) -> Reduced {
        Ok(EncodedValue::scalar(v))
    }

    fn serialize_f64(self, v: f64) -> Reduced {
        Ok(EncodedValue::scalar(v))
    }

    fn serialize_char(self, v: char) -> Reduced {
        Ok(EncodedValue::scalar(v))
    }

    fn serialize_str(self, v: &str) -> Reduced {
        Ok(EncodedValue::Scalar(v.to_owned()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Reduced {
        Ok(EncodedValue::Indexed(
            v.iter().map(|byte| EncodedValue::scalar(byte)).collect(),
        ))
    }

    fn serialize_none(self) -> Reduced {
        Ok(EncodedValue::Nil)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Reduced {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Reduced {
        Ok(EncodedValue::Nil)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Reduced {
        Ok(EncodedValue::Keyed(Vec::new()))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Reduced {
        Ok(EncodedValue::Scalar(variant.to_owned()))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Reduced {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Reduced {
        Ok(EncodedValue::Keyed(vec![(
            variant.to_owned(),
            value.serialize(self)?,
        )]))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqEncoder, EncodeError> {
        Ok(SeqEncoder::with_capacity(len.unwrap_or_default()))
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqEncoder, EncodeError> {
        Ok(SeqEncoder::with_capacity(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SeqEncoder, EncodeError> {
        Ok(SeqEncoder::with_capacity(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<VariantSeqEncoder, EncodeError> {
        Ok(VariantSeqEncoder {
            variant,
            inner: SeqEncoder::with_capacity(len),
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<MapEncoder, EncodeError> {
        Ok(MapEncoder {
            entries: Vec::with_capacity(len.unwrap_or_default()),
            pending_key: None,
        })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<StructEncoder, EncodeError> {
        Ok(StructEncoder::with_capacity(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<VariantStructEncoder, EncodeError> {
        Ok(VariantStructEncoder {
            variant,
            inner: StructEncoder::with_capacity(len),
        })
    }
}

/// Collects the elements of sequences and tuples.
#[derive(Debug)]
pub struct SeqEncoder {
    items: Vec<EncodedValue>,
}

impl SeqEncoder {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    fn push<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), EncodeError> {
        self.items.push(value.serialize(ValueSerializer)?);
        Ok(())
    }
}

impl ser::SerializeSeq for SeqEncoder {
    type Ok = EncodedValue;
    type Error = EncodeError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), EncodeError> {
        self.push(value)
    }

    fn end(self) -> Reduced {
        Ok(EncodedValue::Indexed(self.items))
    }
}

impl ser::SerializeTuple for SeqEncoder {
    type Ok = EncodedValue;
    type Error = EncodeError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), EncodeError> {
        self.push(value)
    }

    fn end(self) -> Reduced {
        Ok(EncodedValue::Indexed(self.items))
    }
}

impl ser::SerializeTupleStruct for SeqEncoder {
    type Ok = EncodedValue;
    type Error = EncodeError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), EncodeError> {
        self.push(value)
    }

    fn end(self) -> Reduced {
        Ok(EncodedValue::Indexed(self.items))
    }
}

/// Collects the fields of a tuple variant.
#[derive(Debug)]
pub struct VariantSeqEncoder {
    variant: &'static str,
    inner: SeqEncoder,
}

impl ser::SerializeTupleVariant for VariantSeqEncoder {
    type Ok = EncodedValue;
    type Error = EncodeError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), EncodeError> {
        self.inner.push(value)
    }

    fn end(self) -> Reduced {
        Ok(EncodedValue::Keyed(vec![(
            self.variant.to_owned(),
            EncodedValue::Indexed(self.inner.items),
        )]))
    }
}

/// Collects map entries; keys must reduce to scalars.
#[derive(Debug)]
pub struct MapEncoder {
    entries: Vec<(String, EncodedValue)>,
    pending_key: Option<String>,
}

fn map_key<T: ?Sized + Serialize>(key: &T) -> Result<String, EncodeError> {
    match key.serialize(ValueSerializer)? {
        EncodedValue::Scalar(key) => Ok(key),
        EncodedValue::Nil => Err(EncodeError::new("map key must not be nil")),
        EncodedValue::Keyed(_) | EncodedValue::Indexed(_) => {
            Err(EncodeError::new("map key must be a scalar"))
        }
    }
}

impl ser::SerializeMap for MapEncoder {
    type Ok = EncodedValue;
    type Error = EncodeError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), EncodeError> {
        self.pending_key = Some(map_key(key)?);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), EncodeError> {
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| EncodeError::new("map value serialized before its key"))?;
        self.entries.push((key, value.serialize(ValueSerializer)?));
        Ok(())
    }

    fn end(self) -> Reduced {
        Ok(EncodedValue::Keyed(self.entries))
    }
}

/// Collects struct fields in declaration order.
#[derive(Debug)]
pub struct StructEncoder {
    fields: Vec<(String, EncodedValue)>,
}

impl StructEncoder {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    fn push<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), EncodeError> {
        self.fields
            .push((key.to_owned(), value.serialize(ValueSerializer)?));
        Ok(())
    }
}

impl ser::SerializeStruct for StructEncoder {
    type Ok = EncodedValue;
    type Error = EncodeError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), EncodeError> {
        self.push(key, value)
    }

    fn end(self) -> Reduced {
        Ok(EncodedValue::Keyed(self.fields))
    }
}

/// Collects the fields of a struct variant.
#[derive(Debug)]
pub struct VariantStructEncoder {
    variant: &'static str,
    inner: StructEncoder,
}

impl ser::SerializeStructVariant for VariantStructEncoder {
    type Ok = EncodedValue;
    type Error = EncodeError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), EncodeError> {
        self.inner.push(key, value)
    }

    fn end(self) -> Reduced {
        Ok(EncodedValue::Keyed(vec![(
            self.variant.to_owned(),
            EncodedValue::Keyed(self.inner.fields),
        )]))
    }
}
