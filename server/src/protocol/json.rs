/*
 * The JSON protocol: a bidirectional encoding where structs are objects
 * keyed by field id and each field value carries its own type tag, while
 * container elements share one tag from their header. Grounded on the
 * cursor/lookahead style of `protocol/mod.rs`'s `Parser` and on
 * `protocol/iter.rs`'s typed-token iteration idiom, built here over
 * `serde_json` for string escaping and number formatting per this crate's
 * JSON dependency (an enrichment the teacher itself does not need).
 */

use super::{
    Context, TFieldIdentifier, TInputProtocol, TListIdentifier, TMapIdentifier,
    TMessageIdentifier, TMessageType, TOutputProtocol, TSetIdentifier, TType,
};
use crate::error::TProtocolException;
use crate::transport::TTransport;

const VERSION: i64 = 1;

fn type_tag(t: TType) -> &'static str {
    match t {
        TType::Bool => "tf",
        TType::Byte => "i8",
        TType::I16 => "i16",
        TType::I32 => "i32",
        TType::I64 => "i64",
        TType::Double => "dbl",
        TType::String => "str",
        TType::Struct => "rec",
        TType::Map => "map",
        TType::List => "lst",
        TType::Set => "set",
        TType::Stop | TType::Void => "",
    }
}

fn tag_type(tag: &str) -> Result<TType, TProtocolException> {
    match tag {
        "tf" => Ok(TType::Bool),
        "i8" => Ok(TType::Byte),
        "i16" => Ok(TType::I16),
        "i32" => Ok(TType::I32),
        "i64" => Ok(TType::I64),
        "dbl" => Ok(TType::Double),
        "str" => Ok(TType::String),
        "rec" => Ok(TType::Struct),
        "map" => Ok(TType::Map),
        "lst" => Ok(TType::List),
        "set" => Ok(TType::Set),
        other => Err(TProtocolException::invalid_data(format!(
            "unknown type tag '{}'",
            other
        ))),
    }
}

fn parse_err(e: impl std::fmt::Display) -> TProtocolException {
    TProtocolException::invalid_data(e.to_string())
}

/// One-byte lookahead over a transport, used to detect JSON structural
/// characters (`}`, `]`) without consuming them.
struct ByteReader<T> {
    transport: T,
    peeked: Option<u8>,
}

impl<T: TTransport> ByteReader<T> {
    fn new(transport: T) -> Self {
        Self {
            transport,
            peeked: None,
        }
    }

    fn peek(&mut self) -> Result<u8, TProtocolException> {
        if let Some(b) = self.peeked {
            return Ok(b);
        }
        let mut buf = [0u8; 1];
        self.transport.read_all(&mut buf).map_err(parse_err)?;
        self.peeked = Some(buf[0]);
        Ok(buf[0])
    }

    fn next(&mut self) -> Result<u8, TProtocolException> {
        if let Some(b) = self.peeked.take() {
            return Ok(b);
        }
        let mut buf = [0u8; 1];
        self.transport.read_all(&mut buf).map_err(parse_err)?;
        Ok(buf[0])
    }

    fn skip_ws(&mut self) -> Result<(), TProtocolException> {
        loop {
            let b = self.peek()?;
            if b == b' ' || b == b'\t' || b == b'\n' || b == b'\r' {
                self.next()?;
            } else {
                break;
            }
        }
        Ok(())
    }

    fn expect(&mut self, ch: u8) -> Result<(), TProtocolException> {
        self.skip_ws()?;
        let b = self.next()?;
        if b != ch {
            return Err(TProtocolException::invalid_data(format!(
                "expected '{}', found '{}'",
                ch as char, b as char
            )));
        }
        Ok(())
    }

    fn read_string_literal(&mut self) -> Result<String, TProtocolException> {
        self.skip_ws()?;
        self.expect(b'"')?;
        let mut raw: Vec<u8> = vec![b'"'];
        loop {
            let b = self.next()?;
            raw.push(b);
            if b == b'\\' {
                let esc = self.next()?;
                raw.push(esc);
                if esc == b'u' {
                    for _ in 0..4 {
                        raw.push(self.next()?);
                    }
                }
            } else if b == b'"' {
                break;
            }
        }
        let s = String::from_utf8(raw).map_err(parse_err)?;
        serde_json::from_str::<String>(&s).map_err(parse_err)
    }

    /// Reads a bare or quoted numeric literal, stripping quotes if present
    /// (numbers are quoted when they occupy an object-key position).
    fn read_numeric_raw(&mut self) -> Result<String, TProtocolException> {
        self.skip_ws()?;
        if self.peek()? == b'"' {
            self.next()?;
            let mut s = String::new();
            loop {
                let b = self.next()?;
                if b == b'"' {
                    break;
                }
                s.push(b as char);
            }
            return Ok(s);
        }
        let mut s = String::new();
        loop {
            let b = self.peek()?;
            if b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.' | b'e' | b'E') {
                s.push(self.next()? as char);
            } else {
                break;
            }
        }
        Ok(s)
    }
}

pub struct TJsonOutputProtocol<T> {
    transport: T,
    contexts: Vec<Context>,
    buf: Vec<u8>,
}

impl<T: TTransport> TJsonOutputProtocol<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            contexts: vec![Context::Base],
            buf: Vec::new(),
        }
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    fn before_value(&mut self) -> bool {
        let (sep, is_key) = self.contexts.last().unwrap().next();
        if let Some(c) = sep {
            self.buf.push(c as u8);
        }
        is_key
    }

    fn write_raw(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
    }

    fn write_string_literal(&mut self, s: &str) {
        let encoded = serde_json::to_string(s).expect("string serialization cannot fail");
        self.write_raw(&encoded);
    }

    fn write_number_token(&mut self, s: &str) {
        let is_key = self.before_value();
        if is_key {
            self.buf.push(b'"');
            self.write_raw(s);
            self.buf.push(b'"');
        } else {
            self.write_raw(s);
        }
    }
}

impl<T: TTransport> TOutputProtocol for TJsonOutputProtocol<T> {
    fn write_message_begin(&mut self, id: &TMessageIdentifier) -> Result<(), TProtocolException> {
        self.write_raw(&format!("[{},", VERSION));
        self.write_string_literal(&id.name);
        self.write_raw(&format!(",{},{},", id.message_type as i32, id.sequence_id));
        self.contexts.push(Context::Base);
        Ok(())
    }

    fn write_message_end(&mut self) -> Result<(), TProtocolException> {
        self.contexts.pop();
        self.buf.push(b']');
        Ok(())
    }

    fn write_struct_begin(&mut self, _name: &str) -> Result<(), TProtocolException> {
        self.before_value();
        self.buf.push(b'{');
        self.contexts.push(Context::list());
        Ok(())
    }

    fn write_struct_end(&mut self) -> Result<(), TProtocolException> {
        self.contexts.pop();
        self.buf.push(b'}');
        Ok(())
    }

    fn write_field_begin(&mut self, field: &TFieldIdentifier) -> Result<(), TProtocolException> {
        if field.field_type == TType::Stop {
            return Ok(());
        }
        self.before_value();
        let id = field
            .id
            .ok_or_else(|| TProtocolException::invalid_data("field id required for JSON encoding"))?;
        self.write_raw(&format!("\"{}\":{{\"{}\":", id, type_tag(field.field_type)));
        self.contexts.push(Context::Base);
        Ok(())
    }

    fn write_field_end(&mut self) -> Result<(), TProtocolException> {
        self.contexts.pop();
        self.buf.push(b'}');
        Ok(())
    }

    fn write_field_stop(&mut self) -> Result<(), TProtocolException> {
        Ok(())
    }

    fn write_map_begin(&mut self, id: &TMapIdentifier) -> Result<(), TProtocolException> {
        self.before_value();
        self.write_raw(&format!(
            "[\"{}\",\"{}\",{},{{",
            type_tag(id.key_type),
            type_tag(id.value_type),
            id.size
        ));
        self.contexts.push(Context::map_key());
        Ok(())
    }

    fn write_map_end(&mut self) -> Result<(), TProtocolException> {
        self.contexts.pop();
        self.write_raw("}]");
        Ok(())
    }

    fn write_list_begin(&mut self, id: &TListIdentifier) -> Result<(), TProtocolException> {
        self.before_value();
        self.write_raw(&format!("[\"{}\",{}", type_tag(id.element_type), id.size));
        self.contexts.push(Context::list_continued());
        Ok(())
    }

    fn write_list_end(&mut self) -> Result<(), TProtocolException> {
        self.contexts.pop();
        self.buf.push(b']');
        Ok(())
    }

    fn write_set_begin(&mut self, id: &TSetIdentifier) -> Result<(), TProtocolException> {
        self.before_value();
        self.write_raw(&format!("[\"{}\",{}", type_tag(id.element_type), id.size));
        self.contexts.push(Context::list_continued());
        Ok(())
    }

    fn write_set_end(&mut self) -> Result<(), TProtocolException> {
        self.contexts.pop();
        self.buf.push(b']');
        Ok(())
    }

    fn write_bool(&mut self, v: bool) -> Result<(), TProtocolException> {
        self.write_number_token(if v { "1" } else { "0" });
        Ok(())
    }

    fn write_byte(&mut self, v: i8) -> Result<(), TProtocolException> {
        self.write_number_token(&v.to_string());
        Ok(())
    }

    fn write_i16(&mut self, v: i16) -> Result<(), TProtocolException> {
        self.write_number_token(&v.to_string());
        Ok(())
    }

    fn write_i32(&mut self, v: i32) -> Result<(), TProtocolException> {
        self.write_number_token(&v.to_string());
        Ok(())
    }

    fn write_i64(&mut self, v: i64) -> Result<(), TProtocolException> {
        self.write_number_token(&v.to_string());
        Ok(())
    }

    fn write_double(&mut self, v: f64) -> Result<(), TProtocolException> {
        let is_key = self.before_value();
        if v.is_nan() {
            self.write_raw("\"NaN\"");
        } else if v.is_infinite() {
            self.write_raw(if v > 0.0 { "\"Infinity\"" } else { "\"-Infinity\"" });
        } else {
            let rendered = serde_json::Number::from_f64(v)
                .map(|n| n.to_string())
                .unwrap_or_else(|| v.to_string());
            if is_key {
                self.buf.push(b'"');
                self.write_raw(&rendered);
                self.buf.push(b'"');
            } else {
                self.write_raw(&rendered);
            }
        }
        Ok(())
    }

    fn write_string(&mut self, v: &str) -> Result<(), TProtocolException> {
        self.before_value();
        self.write_string_literal(v);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TProtocolException> {
        let bytes = std::mem::take(&mut self.buf);
        self.transport.write(&bytes).map_err(|e| TProtocolException::invalid_data(e.to_string()))?;
        self.transport
            .flush()
            .map_err(|e| TProtocolException::invalid_data(e.to_string()))
    }
}

pub struct TJsonInputProtocol<T> {
    reader: ByteReader<T>,
    contexts: Vec<Context>,
}

impl<T: TTransport> TJsonInputProtocol<T> {
    pub fn new(transport: T) -> Self {
        Self {
            reader: ByteReader::new(transport),
            contexts: vec![Context::Base],
        }
    }

    fn before_value(&mut self) -> Result<(), TProtocolException> {
        let (sep, _) = self.contexts.last().unwrap().next();
        if let Some(c) = sep {
            self.reader.expect(c as u8)?;
        }
        Ok(())
    }
}

impl<T: TTransport> TInputProtocol for TJsonInputProtocol<T> {
    fn read_message_begin(&mut self) -> Result<TMessageIdentifier, TProtocolException> {
        self.reader.expect(b'[')?;
        let ver = self.reader.read_numeric_raw()?.parse::<i64>().map_err(parse_err)?;
        if ver != VERSION {
            return Err(TProtocolException::bad_version(format!(
                "expected version {}, found {}",
                VERSION, ver
            )));
        }
        self.reader.expect(b',')?;
        let name = self.reader.read_string_literal()?;
        self.reader.expect(b',')?;
        let mtype = TMessageType::from_i32(
            self.reader.read_numeric_raw()?.parse::<i32>().map_err(parse_err)?,
        )?;
        self.reader.expect(b',')?;
        let seqid = self.reader.read_numeric_raw()?.parse::<i32>().map_err(parse_err)?;
        self.reader.expect(b',')?;
        self.contexts.push(Context::Base);
        Ok(TMessageIdentifier::new(name, mtype, seqid))
    }

    fn read_message_end(&mut self) -> Result<(), TProtocolException> {
        self.contexts.pop();
        self.reader.expect(b']')
    }

    fn read_struct_begin(&mut self) -> Result<(), TProtocolException> {
        self.before_value()?;
        self.reader.expect(b'{')?;
        self.contexts.push(Context::list());
        Ok(())
    }

    fn read_struct_end(&mut self) -> Result<(), TProtocolException> {
        self.contexts.pop();
        self.reader.expect(b'}')
    }

    fn read_field_begin(&mut self) -> Result<TFieldIdentifier, TProtocolException> {
        self.reader.skip_ws()?;
        if self.reader.peek()? == b'}' {
            return Ok(TFieldIdentifier::stop());
        }
        self.before_value()?;
        let id_str = self.reader.read_string_literal()?;
        let id: i16 = id_str.parse().map_err(parse_err)?;
        self.reader.expect(b':')?;
        self.reader.expect(b'{')?;
        let tag = self.reader.read_string_literal()?;
        let ftype = tag_type(&tag)?;
        self.reader.expect(b':')?;
        self.contexts.push(Context::Base);
        Ok(TFieldIdentifier::new(None, ftype, Some(id)))
    }

    fn read_field_end(&mut self) -> Result<(), TProtocolException> {
        self.contexts.pop();
        self.reader.expect(b'}')
    }

    fn read_map_begin(&mut self) -> Result<TMapIdentifier, TProtocolException> {
        self.before_value()?;
        self.reader.expect(b'[')?;
        let ktag = self.reader.read_string_literal()?;
        self.reader.expect(b',')?;
        let vtag = self.reader.read_string_literal()?;
        self.reader.expect(b',')?;
        let size = self.reader.read_numeric_raw()?.parse::<i32>().map_err(parse_err)?;
        self.reader.expect(b',')?;
        self.reader.expect(b'{')?;
        self.contexts.push(Context::map_key());
        Ok(TMapIdentifier {
            key_type: tag_type(&ktag)?,
            value_type: tag_type(&vtag)?,
            size,
        })
    }

    fn read_map_end(&mut self) -> Result<(), TProtocolException> {
        self.contexts.pop();
        self.reader.expect(b'}')?;
        self.reader.expect(b']')
    }

    fn read_list_begin(&mut self) -> Result<TListIdentifier, TProtocolException> {
        self.before_value()?;
        self.reader.expect(b'[')?;
        let tag = self.reader.read_string_literal()?;
        self.reader.expect(b',')?;
        let size = self.reader.read_numeric_raw()?.parse::<i32>().map_err(parse_err)?;
        self.contexts.push(Context::list_continued());
        Ok(TListIdentifier {
            element_type: tag_type(&tag)?,
            size,
        })
    }

    fn read_list_end(&mut self) -> Result<(), TProtocolException> {
        self.contexts.pop();
        self.reader.expect(b']')
    }

    fn read_set_begin(&mut self) -> Result<TSetIdentifier, TProtocolException> {
        let l = self.read_list_begin()?;
        Ok(TSetIdentifier {
            element_type: l.element_type,
            size: l.size,
        })
    }

    fn read_set_end(&mut self) -> Result<(), TProtocolException> {
        self.read_list_end()
    }

    fn read_bool(&mut self) -> Result<bool, TProtocolException> {
        self.before_value()?;
        let raw = self.reader.read_numeric_raw()?;
        Ok(raw.parse::<i64>().map_err(parse_err)? != 0)
    }

    fn read_byte(&mut self) -> Result<i8, TProtocolException> {
        self.before_value()?;
        let raw = self.reader.read_numeric_raw()?;
        Ok(raw.parse::<i64>().map_err(parse_err)? as i8)
    }

    fn read_i16(&mut self) -> Result<i16, TProtocolException> {
        self.before_value()?;
        let raw = self.reader.read_numeric_raw()?;
        Ok(raw.parse::<i64>().map_err(parse_err)? as i16)
    }

    fn read_i32(&mut self) -> Result<i32, TProtocolException> {
        self.before_value()?;
        let raw = self.reader.read_numeric_raw()?;
        Ok(raw.parse::<i64>().map_err(parse_err)? as i32)
    }

    fn read_i64(&mut self) -> Result<i64, TProtocolException> {
        self.before_value()?;
        let raw = self.reader.read_numeric_raw()?;
        raw.parse::<i64>().map_err(parse_err)
    }

    fn read_double(&mut self) -> Result<f64, TProtocolException> {
        self.before_value()?;
        self.reader.skip_ws()?;
        if self.reader.peek()? == b'"' {
            let raw = self.reader.read_string_literal()?;
            return match raw.as_str() {
                "NaN" => Ok(f64::NAN),
                "Infinity" => Ok(f64::INFINITY),
                "-Infinity" => Ok(f64::NEG_INFINITY),
                other => other.parse::<f64>().map_err(parse_err),
            };
        }
        let raw = self.reader.read_numeric_raw()?;
        raw.parse::<f64>().map_err(parse_err)
    }

    fn read_string(&mut self) -> Result<String, TProtocolException> {
        self.before_value()?;
        self.reader.read_string_literal()
    }
}
