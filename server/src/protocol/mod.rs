/*
 * This file is a part of a Thrift-compatible RPC runtime
 *
 * The protocol layer: a stateful cursor over typed tokens (struct/field/
 * container headers plus primitives) built on top of a transport. Grounded on
 * `protocol/element.rs`'s flat-enum-over-trait-object style and on the
 * cursor-based decode loop in the teacher's own `Parser`.
 */

pub mod json;
pub mod simple_json;

#[cfg(test)]
mod tests;

use crate::error::{ProtocolErrorKind, TProtocolException};
use crate::transport::TTransport;
use std::cell::Cell;

/// Wire type tag shared across every protocol encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TType {
    Stop = 0,
    Void = 1,
    Bool = 2,
    Byte = 3,
    Double = 4,
    I16 = 6,
    I32 = 8,
    I64 = 10,
    String = 11,
    Struct = 12,
    Map = 13,
    Set = 14,
    List = 15,
}

impl TType {
    pub fn from_u8(raw: u8) -> Result<Self, TProtocolException> {
        match raw {
            0 => Ok(Self::Stop),
            1 => Ok(Self::Void),
            2 => Ok(Self::Bool),
            3 => Ok(Self::Byte),
            4 => Ok(Self::Double),
            6 => Ok(Self::I16),
            8 => Ok(Self::I32),
            10 => Ok(Self::I64),
            11 => Ok(Self::String),
            12 => Ok(Self::Struct),
            13 => Ok(Self::Map),
            14 => Ok(Self::Set),
            15 => Ok(Self::List),
            other => Err(TProtocolException::invalid_data(format!(
                "unknown type code {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TMessageType {
    Call = 1,
    Reply = 2,
    Exception = 3,
    Oneway = 4,
}

impl TMessageType {
    pub fn from_i32(raw: i32) -> Result<Self, TProtocolException> {
        match raw {
            1 => Ok(Self::Call),
            2 => Ok(Self::Reply),
            3 => Ok(Self::Exception),
            4 => Ok(Self::Oneway),
            other => Err(TProtocolException::invalid_data(format!(
                "unknown message type {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TMessageIdentifier {
    pub name: String,
    pub message_type: TMessageType,
    pub sequence_id: i32,
}

impl TMessageIdentifier {
    pub fn new(name: impl Into<String>, message_type: TMessageType, sequence_id: i32) -> Self {
        Self {
            name: name.into(),
            message_type,
            sequence_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TFieldIdentifier {
    /// Not restored by every protocol's reader (JSON leaves this `None`); see
    /// the open-question note this implementation follows.
    pub name: Option<String>,
    pub field_type: TType,
    pub id: Option<i16>,
}

impl TFieldIdentifier {
    pub fn new(name: Option<String>, field_type: TType, id: Option<i16>) -> Self {
        Self {
            name,
            field_type,
            id,
        }
    }

    pub fn stop() -> Self {
        Self {
            name: None,
            field_type: TType::Stop,
            id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TListIdentifier {
    pub element_type: TType,
    pub size: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TSetIdentifier {
    pub element_type: TType,
    pub size: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TMapIdentifier {
    pub key_type: TType,
    pub value_type: TType,
    pub size: i32,
}

/// Write surface driven by generated serializers.
pub trait TOutputProtocol {
    fn write_message_begin(&mut self, id: &TMessageIdentifier) -> Result<(), TProtocolException>;
    fn write_message_end(&mut self) -> Result<(), TProtocolException>;
    fn write_struct_begin(&mut self, name: &str) -> Result<(), TProtocolException>;
    fn write_struct_end(&mut self) -> Result<(), TProtocolException>;
    fn write_field_begin(&mut self, field: &TFieldIdentifier) -> Result<(), TProtocolException>;
    fn write_field_end(&mut self) -> Result<(), TProtocolException>;
    fn write_field_stop(&mut self) -> Result<(), TProtocolException>;
    fn write_map_begin(&mut self, id: &TMapIdentifier) -> Result<(), TProtocolException>;
    fn write_map_end(&mut self) -> Result<(), TProtocolException>;
    fn write_list_begin(&mut self, id: &TListIdentifier) -> Result<(), TProtocolException>;
    fn write_list_end(&mut self) -> Result<(), TProtocolException>;
    fn write_set_begin(&mut self, id: &TSetIdentifier) -> Result<(), TProtocolException>;
    fn write_set_end(&mut self) -> Result<(), TProtocolException>;
    fn write_bool(&mut self, v: bool) -> Result<(), TProtocolException>;
    fn write_byte(&mut self, v: i8) -> Result<(), TProtocolException>;
    fn write_i16(&mut self, v: i16) -> Result<(), TProtocolException>;
    fn write_i32(&mut self, v: i32) -> Result<(), TProtocolException>;
    fn write_i64(&mut self, v: i64) -> Result<(), TProtocolException>;
    fn write_double(&mut self, v: f64) -> Result<(), TProtocolException>;
    fn write_string(&mut self, v: &str) -> Result<(), TProtocolException>;
    fn flush(&mut self) -> Result<(), TProtocolException>;
}

/// Read surface; structured readers return headers and rely on the caller to
/// consume the declared number of elements.
pub trait TInputProtocol {
    fn read_message_begin(&mut self) -> Result<TMessageIdentifier, TProtocolException>;
    fn read_message_end(&mut self) -> Result<(), TProtocolException>;
    fn read_struct_begin(&mut self) -> Result<(), TProtocolException>;
    fn read_struct_end(&mut self) -> Result<(), TProtocolException>;
    fn read_field_begin(&mut self) -> Result<TFieldIdentifier, TProtocolException>;
    fn read_field_end(&mut self) -> Result<(), TProtocolException>;
    fn read_map_begin(&mut self) -> Result<TMapIdentifier, TProtocolException>;
    fn read_map_end(&mut self) -> Result<(), TProtocolException>;
    fn read_list_begin(&mut self) -> Result<TListIdentifier, TProtocolException>;
    fn read_list_end(&mut self) -> Result<(), TProtocolException>;
    fn read_set_begin(&mut self) -> Result<TSetIdentifier, TProtocolException>;
    fn read_set_end(&mut self) -> Result<(), TProtocolException>;
    fn read_bool(&mut self) -> Result<bool, TProtocolException>;
    fn read_byte(&mut self) -> Result<i8, TProtocolException>;
    fn read_i16(&mut self) -> Result<i16, TProtocolException>;
    fn read_i32(&mut self) -> Result<i32, TProtocolException>;
    fn read_i64(&mut self) -> Result<i64, TProtocolException>;
    fn read_double(&mut self) -> Result<f64, TProtocolException>;
    fn read_string(&mut self) -> Result<String, TProtocolException>;
}

/// Skip a single well-formed value of the declared type without materializing
/// it, recursing into structs/containers. The workhorse of forward
/// compatibility: an unknown struct field is consumed this way.
pub fn skip(input: &mut dyn TInputProtocol, field_type: TType) -> Result<(), TProtocolException> {
    match field_type {
        TType::Stop | TType::Void => Ok(()),
        TType::Bool => input.read_bool().map(|_| ()),
        TType::Byte => input.read_byte().map(|_| ()),
        TType::I16 => input.read_i16().map(|_| ()),
        TType::I32 => input.read_i32().map(|_| ()),
        TType::I64 => input.read_i64().map(|_| ()),
        TType::Double => input.read_double().map(|_| ()),
        TType::String => input.read_string().map(|_| ()),
        TType::Struct => {
            input.read_struct_begin()?;
            loop {
                let field = input.read_field_begin()?;
                if field.field_type == TType::Stop {
                    break;
                }
                skip(input, field.field_type)?;
                input.read_field_end()?;
            }
            input.read_struct_end()
        }
        TType::List => {
            let header = input.read_list_begin()?;
            for _ in 0..header.size {
                skip(input, header.element_type)?;
            }
            input.read_list_end()
        }
        TType::Set => {
            let header = input.read_set_begin()?;
            for _ in 0..header.size {
                skip(input, header.element_type)?;
            }
            input.read_set_end()
        }
        TType::Map => {
            let header = input.read_map_begin()?;
            for _ in 0..header.size {
                skip(input, header.key_type)?;
                skip(input, header.value_type)?;
            }
            input.read_map_end()
        }
    }
}

/// Skip a value directly against a raw transport, for code paths without a
/// full protocol instance. Fixed-width primitives and length-prefixed
/// strings only; no JSON-specific escaping applies here.
pub fn skip_binary(input: &mut dyn TTransport, field_type: TType) -> Result<(), TProtocolException> {
    fn skip_bytes(input: &mut dyn TTransport, n: usize) -> Result<(), TProtocolException> {
        let mut buf = vec![0u8; n];
        input
            .read_all(&mut buf)
            .map_err(|e| TProtocolException::invalid_data(e.to_string()))
    }
    match field_type {
        TType::Stop | TType::Void => Ok(()),
        TType::Bool | TType::Byte => skip_bytes(input, 1),
        TType::I16 => skip_bytes(input, 2),
        TType::I32 => skip_bytes(input, 4),
        TType::I64 | TType::Double => skip_bytes(input, 8),
        TType::String => {
            let mut len_bytes = [0u8; 4];
            input
                .read_all(&mut len_bytes)
                .map_err(|e| TProtocolException::invalid_data(e.to_string()))?;
            let len = i32::from_be_bytes(len_bytes);
            if len < 0 {
                return Err(TProtocolException::new(
                    ProtocolErrorKind::NegativeSize,
                    format!("negative string length {}", len),
                ));
            }
            skip_bytes(input, len as usize)
        }
        TType::Struct => {
            loop {
                let mut header = [0u8; 1];
                input
                    .read_all(&mut header)
                    .map_err(|e| TProtocolException::invalid_data(e.to_string()))?;
                let ftype = TType::from_u8(header[0])?;
                if ftype == TType::Stop {
                    break;
                }
                skip_bytes(input, 2)?; // field id
                skip_binary(input, ftype)?;
            }
            Ok(())
        }
        TType::List | TType::Set => {
            let mut header = [0u8; 1];
            input
                .read_all(&mut header)
                .map_err(|e| TProtocolException::invalid_data(e.to_string()))?;
            let etype = TType::from_u8(header[0])?;
            let mut size_bytes = [0u8; 4];
            input
                .read_all(&mut size_bytes)
                .map_err(|e| TProtocolException::invalid_data(e.to_string()))?;
            let size = i32::from_be_bytes(size_bytes);
            for _ in 0..size {
                skip_binary(input, etype)?;
            }
            Ok(())
        }
        TType::Map => {
            let mut header = [0u8; 2];
            input
                .read_all(&mut header)
                .map_err(|e| TProtocolException::invalid_data(e.to_string()))?;
            let ktype = TType::from_u8(header[0])?;
            let vtype = TType::from_u8(header[1])?;
            let mut size_bytes = [0u8; 4];
            input
                .read_all(&mut size_bytes)
                .map_err(|e| TProtocolException::invalid_data(e.to_string()))?;
            let size = i32::from_be_bytes(size_bytes);
            for _ in 0..size {
                skip_binary(input, ktype)?;
                skip_binary(input, vtype)?;
            }
            Ok(())
        }
    }
}

/// JSON/SimpleJSON separator and numeric-quoting state. A plain enum rather
/// than a small object hierarchy, matching this codebase's preference for
/// flat tagged variants over trait objects for closed sets of cases.
#[derive(Debug)]
pub enum Context {
    Base,
    List {
        first: Cell<bool>,
    },
    Struct {
        first: Cell<bool>,
        expecting_key: Cell<bool>,
    },
    MapKey {
        first: Cell<bool>,
        expecting_key: Cell<bool>,
    },
}

impl Context {
    pub fn list() -> Self {
        Self::List {
            first: Cell::new(true),
        }
    }

    /// A list context whose first slot is already occupied (by a header
    /// entry written outside the context machinery), so every subsequent
    /// value — including the first real element — is preceded by a comma.
    pub fn list_continued() -> Self {
        Self::List {
            first: Cell::new(false),
        }
    }

    pub fn strct() -> Self {
        Self::Struct {
            first: Cell::new(true),
            expecting_key: Cell::new(true),
        }
    }

    pub fn map_key() -> Self {
        Self::MapKey {
            first: Cell::new(true),
            expecting_key: Cell::new(true),
        }
    }

    /// Called once per token (object key, object value, or list element)
    /// about to be written or read. Returns the separator to emit/expect
    /// before this token (`None` for none) and whether this token occupies
    /// a key position, which forces numeric values to be quoted.
    pub fn next(&self) -> (Option<char>, bool) {
        match self {
            Self::Base => (None, false),
            Self::List { first } => {
                let sep = if first.get() {
                    first.set(false);
                    None
                } else {
                    Some(',')
                };
                (sep, false)
            }
            Self::Struct {
                first,
                expecting_key,
            }
            | Self::MapKey {
                first,
                expecting_key,
            } => {
                let is_key = expecting_key.get();
                let sep = if is_key {
                    let s = if first.get() {
                        first.set(false);
                        None
                    } else {
                        Some(',')
                    };
                    expecting_key.set(false);
                    s
                } else {
                    expecting_key.set(true);
                    Some(':')
                };
                (sep, is_key)
            }
        }
    }

    pub fn is_map_key(&self) -> bool {
        matches!(self, Self::MapKey { .. })
    }
}
