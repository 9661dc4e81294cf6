/*
 * The SimpleJSON protocol: a write-only, human-readable JSON rendering that
 * drops per-field type tags and field ids in favor of plain values keyed by
 * name. Every read method fails; this protocol exists for export/logging,
 * never for round-tripping. Grounded on the same `Context` machinery as
 * `protocol::json`, reused here without the struct/field type-tag wrapping.
 */

use super::{
    Context, TFieldIdentifier, TInputProtocol, TListIdentifier, TMapIdentifier,
    TMessageIdentifier, TMessageType, TOutputProtocol, TSetIdentifier, TType,
};
use crate::error::TProtocolException;
use crate::transport::TTransport;

fn container_type_name(t: TType) -> Option<&'static str> {
    match t {
        TType::Map => Some("map"),
        TType::Set => Some("set"),
        TType::List => Some("list"),
        _ => None,
    }
}

pub struct TSimpleJsonProtocol<T> {
    transport: T,
    contexts: Vec<Context>,
    buf: Vec<u8>,
}

impl<T: TTransport> TSimpleJsonProtocol<T> {
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

    fn not_implemented<R>() -> Result<R, TProtocolException> {
        Err(TProtocolException::not_implemented(
            "SimpleJSON is write-only; reading is not implemented",
        ))
    }
}

impl<T: TTransport> TOutputProtocol for TSimpleJsonProtocol<T> {
    fn write_message_begin(&mut self, id: &TMessageIdentifier) -> Result<(), TProtocolException> {
        self.write_raw("[");
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
        let name = field.name.as_deref().ok_or_else(|| {
            TProtocolException::invalid_data("SimpleJSON requires a field name to encode")
        })?;
        self.write_string_literal(name);
        self.buf.push(b':');
        self.contexts.push(Context::Base);
        Ok(())
    }

    fn write_field_end(&mut self) -> Result<(), TProtocolException> {
        self.contexts.pop();
        Ok(())
    }

    fn write_field_stop(&mut self) -> Result<(), TProtocolException> {
        Ok(())
    }

    fn write_map_begin(&mut self, id: &TMapIdentifier) -> Result<(), TProtocolException> {
        if let Some(name) = container_type_name(id.key_type) {
            return Err(TProtocolException::invalid_data(format!(
                "SimpleJSON map keys must be scalar, found container type '{}'",
                name
            )));
        }
        self.before_value();
        self.buf.push(b'{');
        self.contexts.push(Context::map_key());
        Ok(())
    }

    fn write_map_end(&mut self) -> Result<(), TProtocolException> {
        self.contexts.pop();
        self.buf.push(b'}');
        Ok(())
    }

    fn write_list_begin(&mut self, _id: &TListIdentifier) -> Result<(), TProtocolException> {
        self.before_value();
        self.buf.push(b'[');
        self.contexts.push(Context::list());
        Ok(())
    }

    fn write_list_end(&mut self) -> Result<(), TProtocolException> {
        self.contexts.pop();
        self.buf.push(b']');
        Ok(())
    }

    fn write_set_begin(&mut self, _id: &TSetIdentifier) -> Result<(), TProtocolException> {
        self.before_value();
        self.buf.push(b'[');
        self.contexts.push(Context::list());
        Ok(())
    }

    fn write_set_end(&mut self) -> Result<(), TProtocolException> {
        self.contexts.pop();
        self.buf.push(b']');
        Ok(())
    }

    fn write_bool(&mut self, v: bool) -> Result<(), TProtocolException> {
        self.write_number_token(if v { "true" } else { "false" });
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
        self.transport
            .write(&bytes)
            .map_err(|e| TProtocolException::invalid_data(e.to_string()))?;
        self.transport
            .flush()
            .map_err(|e| TProtocolException::invalid_data(e.to_string()))
    }
}

impl<T: TTransport> TInputProtocol for TSimpleJsonProtocol<T> {
    fn read_message_begin(&mut self) -> Result<TMessageIdentifier, TProtocolException> {
        Self::not_implemented()
    }
    fn read_message_end(&mut self) -> Result<(), TProtocolException> {
        Self::not_implemented()
    }
    fn read_struct_begin(&mut self) -> Result<(), TProtocolException> {
        Self::not_implemented()
    }
    fn read_struct_end(&mut self) -> Result<(), TProtocolException> {
        Self::not_implemented()
    }
    fn read_field_begin(&mut self) -> Result<TFieldIdentifier, TProtocolException> {
        Self::not_implemented()
    }
    fn read_field_end(&mut self) -> Result<(), TProtocolException> {
        Self::not_implemented()
    }
    fn read_map_begin(&mut self) -> Result<TMapIdentifier, TProtocolException> {
        Self::not_implemented()
    }
    fn read_map_end(&mut self) -> Result<(), TProtocolException> {
        Self::not_implemented()
    }
    fn read_list_begin(&mut self) -> Result<TListIdentifier, TProtocolException> {
        Self::not_implemented()
    }
    fn read_list_end(&mut self) -> Result<(), TProtocolException> {
        Self::not_implemented()
    }
    fn read_set_begin(&mut self) -> Result<TSetIdentifier, TProtocolException> {
        Self::not_implemented()
    }
    fn read_set_end(&mut self) -> Result<(), TProtocolException> {
        Self::not_implemented()
    }
    fn read_bool(&mut self) -> Result<bool, TProtocolException> {
        Self::not_implemented()
    }
    fn read_byte(&mut self) -> Result<i8, TProtocolException> {
        Self::not_implemented()
    }
    fn read_i16(&mut self) -> Result<i16, TProtocolException> {
        Self::not_implemented()
    }
    fn read_i32(&mut self) -> Result<i32, TProtocolException> {
        Self::not_implemented()
    }
    fn read_i64(&mut self) -> Result<i64, TProtocolException> {
        Self::not_implemented()
    }
    fn read_double(&mut self) -> Result<f64, TProtocolException> {
        Self::not_implemented()
    }
    fn read_string(&mut self) -> Result<String, TProtocolException> {
        Self::not_implemented()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mem::TMemoryBuffer;

    fn written_string(p: TSimpleJsonProtocol<TMemoryBuffer>) -> String {
        String::from_utf8(p.into_inner().written().to_vec()).unwrap()
    }

    #[test]
    fn struct_encodes_with_plain_field_names_and_no_type_tags() {
        let mem = TMemoryBuffer::new();
        let mut out = TSimpleJsonProtocol::new(mem);
        out.write_struct_begin("Point").unwrap();
        out.write_field_begin(&TFieldIdentifier::new(
            Some("x".into()),
            TType::I32,
            Some(1),
        ))
        .unwrap();
        out.write_i32(5).unwrap();
        out.write_field_end().unwrap();
        out.write_field_begin(&TFieldIdentifier::new(
            Some("y".into()),
            TType::I32,
            Some(2),
        ))
        .unwrap();
        out.write_i32(6).unwrap();
        out.write_field_end().unwrap();
        out.write_field_stop().unwrap();
        out.write_struct_end().unwrap();
        out.flush().unwrap();

        assert_eq!(written_string(out), "{\"x\":5,\"y\":6}");
    }

    #[test]
    fn list_drops_type_tag_and_size() {
        let mem = TMemoryBuffer::new();
        let mut out = TSimpleJsonProtocol::new(mem);
        out.write_list_begin(&TListIdentifier {
            element_type: TType::String,
            size: 2,
        })
        .unwrap();
        out.write_string("a").unwrap();
        out.write_string("b").unwrap();
        out.write_list_end().unwrap();
        out.flush().unwrap();

        assert_eq!(written_string(out), "[\"a\",\"b\"]");
    }

    #[test]
    fn map_with_scalar_keys_quotes_numeric_keys() {
        let mem = TMemoryBuffer::new();
        let mut out = TSimpleJsonProtocol::new(mem);
        out.write_map_begin(&TMapIdentifier {
            key_type: TType::I32,
            value_type: TType::String,
            size: 1,
        })
        .unwrap();
        out.write_i32(9).unwrap();
        out.write_string("nine").unwrap();
        out.write_map_end().unwrap();
        out.flush().unwrap();

        assert_eq!(written_string(out), "{\"9\":\"nine\"}");
    }

    #[test]
    fn map_rejects_container_typed_keys() {
        let mem = TMemoryBuffer::new();
        let mut out = TSimpleJsonProtocol::new(mem);
        let err = out
            .write_map_begin(&TMapIdentifier {
                key_type: TType::List,
                value_type: TType::String,
                size: 0,
            })
            .unwrap_err();
        assert!(err.message.contains("list"));
    }

    #[test]
    fn every_read_method_reports_not_implemented() {
        let mem = TMemoryBuffer::new();
        let mut p = TSimpleJsonProtocol::new(mem);
        let err = p.read_bool().unwrap_err();
        assert_eq!(err.kind, crate::error::ProtocolErrorKind::NotImplemented);
    }
}
