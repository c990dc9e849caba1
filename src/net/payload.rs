//! Structured JSON/XML payloads.
//!
//! A [`Payload`] keeps the caller's value behind a trait object so it can be
//! serialized when the request is encoded instead of when options are built.
//! Before serializing, the value is walked once by an inspecting serializer to catch what
//! the target format cannot represent:
//!
//! - JSON has no encoding for NaN or infinite floats. `serde_json` would silently
//!   write `null`; here the encode fails instead.
//! - XML needs a named root element. Maps, sequences and bare scalars have none.
use crate::errors::RequestError;
use serde::ser::{self, Serialize};
use std::fmt;
use std::sync::Arc;

trait Encodable: Send + Sync {
    fn to_json(&self) -> Result<Vec<u8>, RequestError>;
    fn to_xml(&self) -> Result<String, RequestError>;
}

impl<T: Serialize + Send + Sync> Encodable for T {
    fn to_json(&self) -> Result<Vec<u8>, RequestError> {
        let report = inspect(self);
        if let Some(value) = report.non_finite {
            return Err(RequestError::JsonEncodeError(format!(
                "unsupported value: {value} has no JSON representation"
            )));
        }
        serde_json::to_vec(self).map_err(|e| RequestError::JsonEncodeError(e.to_string()))
    }

    fn to_xml(&self) -> Result<String, RequestError> {
        let report = inspect(self);
        match report.root {
            Some(Shape::Struct) => {}
            Some(shape) => {
                return Err(RequestError::XmlEncodeError(format!(
                    "unsupported type: a {shape} has no XML element name"
                )))
            }
            None => {
                return Err(RequestError::XmlEncodeError(
                    report.error.unwrap_or_else(|| "value serialized to nothing".to_string()),
                ))
            }
        }
        quick_xml::se::to_string(self).map_err(|e| RequestError::XmlEncodeError(e.to_string()))
    }
}

/// A caller supplied value sent as a JSON or XML document.
#[derive(Clone)]
pub struct Payload(Arc<dyn Encodable>);

impl Payload {
    pub fn new<T: Serialize + Send + Sync + 'static>(value: T) -> Self {
        Payload(Arc::new(value))
    }

    /// Serializes the value as a JSON document.
    pub fn to_json(&self) -> Result<Vec<u8>, RequestError> {
        self.0.to_json()
    }

    /// Serializes the value as an XML document.
    pub fn to_xml(&self) -> Result<String, RequestError> {
        self.0.to_xml()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Payload(..)")
    }
}

/// Data model shape of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shape {
    Scalar,
    Unit,
    Sequence,
    Map,
    Struct,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Shape::Scalar => "scalar",
            Shape::Unit => "unit value",
            Shape::Sequence => "sequence",
            Shape::Map => "map",
            Shape::Struct => "struct",
        })
    }
}

#[derive(Debug, Default)]
pub(crate) struct Report {
    /// Shape of the outermost value
    pub root: Option<Shape>,
    /// First NaN or infinite float encountered
    pub non_finite: Option<f64>,
    /// Error raised by the value's own `Serialize` impl
    pub error: Option<String>,
}

pub(crate) fn inspect<T: Serialize + ?Sized>(value: &T) -> Report {
    let mut inspector = Inspector::default();
    if let Err(e) = value.serialize(&mut inspector) {
        inspector.report.error = Some(e.0);
    }
    inspector.report
}

#[derive(Debug)]
pub(crate) struct InspectError(String);

impl fmt::Display for InspectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InspectError {}

impl ser::Error for InspectError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        InspectError(msg.to_string())
    }
}

#[derive(Default)]
struct Inspector {
    depth: usize,
    report: Report,
}

impl Inspector {
    fn visit(&mut self, shape: Shape) {
        if self.depth == 0 && self.report.root.is_none() {
            self.report.root = Some(shape);
        }
    }

    fn float(&mut self, value: f64) {
        self.visit(Shape::Scalar);
        if !value.is_finite() && self.report.non_finite.is_none() {
            self.report.non_finite = Some(value);
        }
    }

    fn enter(&mut self, shape: Shape) -> &mut Self {
        self.visit(shape);
        self.depth += 1;
        self
    }

    fn leave(&mut self) -> Result<(), InspectError> {
        self.depth = self.depth.saturating_sub(1);
        Ok(())
    }
}

macro_rules! scalars {
    ($($method:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method(self, _v: $ty) -> Result<(), InspectError> {
                self.visit(Shape::Scalar);
                Ok(())
            }
        )*
    };
}

impl<'a> ser::Serializer for &'a mut Inspector {
    type Ok = ();
    type Error = InspectError;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    scalars! {
        serialize_bool: bool,
        serialize_i8: i8,
        serialize_i16: i16,
        serialize_i32: i32,
        serialize_i64: i64,
        serialize_u8: u8,
        serialize_u16: u16,
        serialize_u32: u32,
        serialize_u64: u64,
        serialize_char: char,
        serialize_str: &str,
        serialize_bytes: &[u8],
    }

    fn serialize_f32(self, v: f32) -> Result<(), InspectError> {
        self.float(f64::from(v));
        Ok(())
    }

    fn serialize_f64(self, v: f64) -> Result<(), InspectError> {
        self.float(v);
        Ok(())
    }

    fn serialize_none(self) -> Result<(), InspectError> {
        self.visit(Shape::Unit);
        Ok(())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<(), InspectError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), InspectError> {
        self.visit(Shape::Unit);
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<(), InspectError> {
        self.visit(Shape::Struct);
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<(), InspectError> {
        self.visit(Shape::Scalar);
        Ok(())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), InspectError> {
        self.enter(Shape::Struct);
        value.serialize(&mut *self)?;
        self.leave()
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Result<(), InspectError> {
        self.enter(Shape::Struct);
        value.serialize(&mut *self)?;
        self.leave()
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self, InspectError> {
        Ok(self.enter(Shape::Sequence))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self, InspectError> {
        Ok(self.enter(Shape::Sequence))
    }

    fn serialize_tuple_struct(self, _name: &'static str, _len: usize) -> Result<Self, InspectError> {
        Ok(self.enter(Shape::Sequence))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self, InspectError> {
        Ok(self.enter(Shape::Struct))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self, InspectError> {
        Ok(self.enter(Shape::Map))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self, InspectError> {
        Ok(self.enter(Shape::Struct))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self, InspectError> {
        Ok(self.enter(Shape::Struct))
    }
}

impl<'a> ser::SerializeSeq for &'a mut Inspector {
    type Ok = ();
    type Error = InspectError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), InspectError> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), InspectError> {
        self.leave()
    }
}

impl<'a> ser::SerializeTuple for &'a mut Inspector {
    type Ok = ();
    type Error = InspectError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), InspectError> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), InspectError> {
        self.leave()
    }
}

impl<'a> ser::SerializeTupleStruct for &'a mut Inspector {
    type Ok = ();
    type Error = InspectError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), InspectError> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), InspectError> {
        self.leave()
    }
}

impl<'a> ser::SerializeTupleVariant for &'a mut Inspector {
    type Ok = ();
    type Error = InspectError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), InspectError> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), InspectError> {
        self.leave()
    }
}

impl<'a> ser::SerializeMap for &'a mut Inspector {
    type Ok = ();
    type Error = InspectError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), InspectError> {
        key.serialize(&mut **self)
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), InspectError> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), InspectError> {
        self.leave()
    }
}

impl<'a> ser::SerializeStruct for &'a mut Inspector {
    type Ok = ();
    type Error = InspectError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> Result<(), InspectError> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), InspectError> {
        self.leave()
    }
}

impl<'a> ser::SerializeStructVariant for &'a mut Inspector {
    type Ok = ();
    type Error = InspectError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> Result<(), InspectError> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), InspectError> {
        self.leave()
    }
}
