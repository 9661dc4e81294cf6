use super::*;

#[test]
fn ttype_round_trips_known_codes() {
    for code in [0u8, 1, 2, 3, 4, 6, 8, 10, 11, 12, 13, 14, 15] {
        let t = TType::from_u8(code).unwrap();
        assert_eq!(t as u8, code);
    }
}

#[test]
fn ttype_rejects_unknown_code() {
    assert!(TType::from_u8(5).is_err());
    assert!(TType::from_u8(200).is_err());
}

#[test]
fn tmessage_type_round_trips() {
    assert_eq!(TMessageType::from_i32(1).unwrap(), TMessageType::Call);
    assert_eq!(TMessageType::from_i32(4).unwrap(), TMessageType::Oneway);
    assert!(TMessageType::from_i32(99).is_err());
}

#[test]
fn list_context_never_requires_quoting() {
    let ctx = Context::list();
    let (sep0, key0) = ctx.next();
    assert_eq!(sep0, None);
    assert!(!key0);
    let (sep1, key1) = ctx.next();
    assert_eq!(sep1, Some(','));
    assert!(!key1);
}

#[test]
fn struct_context_alternates_key_and_value_with_colon_and_comma() {
    let ctx = Context::strct();
    let (sep, is_key) = ctx.next(); // first key
    assert_eq!(sep, None);
    assert!(is_key);
    let (sep, is_key) = ctx.next(); // its value
    assert_eq!(sep, Some(':'));
    assert!(!is_key);
    let (sep, is_key) = ctx.next(); // second key
    assert_eq!(sep, Some(','));
    assert!(is_key);
    let (sep, is_key) = ctx.next(); // its value
    assert_eq!(sep, Some(':'));
    assert!(!is_key);
}

#[test]
fn map_key_context_is_distinguishable_from_struct() {
    assert!(Context::map_key().is_map_key());
    assert!(!Context::strct().is_map_key());
    assert!(!Context::list().is_map_key());
    assert!(!Context::Base.is_map_key());
}

/// A minimal in-memory [`TInputProtocol`] over a flat list of pre-decoded
/// field types, used only to exercise [`skip`]'s recursion without a real
/// wire encoding.
struct FieldScript {
    fields: std::vec::IntoIter<TFieldIdentifier>,
}

impl TInputProtocol for FieldScript {
    fn read_message_begin(&mut self) -> Result<TMessageIdentifier, TProtocolException> {
        unreachable!()
    }
    fn read_message_end(&mut self) -> Result<(), TProtocolException> {
        unreachable!()
    }
    fn read_struct_begin(&mut self) -> Result<(), TProtocolException> {
        Ok(())
    }
    fn read_struct_end(&mut self) -> Result<(), TProtocolException> {
        Ok(())
    }
    fn read_field_begin(&mut self) -> Result<TFieldIdentifier, TProtocolException> {
        Ok(self.fields.next().unwrap_or_else(TFieldIdentifier::stop))
    }
    fn read_field_end(&mut self) -> Result<(), TProtocolException> {
        Ok(())
    }
    fn read_map_begin(&mut self) -> Result<TMapIdentifier, TProtocolException> {
        Ok(TMapIdentifier {
            key_type: TType::I32,
            value_type: TType::I32,
            size: 0,
        })
    }
    fn read_map_end(&mut self) -> Result<(), TProtocolException> {
        Ok(())
    }
    fn read_list_begin(&mut self) -> Result<TListIdentifier, TProtocolException> {
        Ok(TListIdentifier {
            element_type: TType::I32,
            size: 0,
        })
    }
    fn read_list_end(&mut self) -> Result<(), TProtocolException> {
        Ok(())
    }
    fn read_set_begin(&mut self) -> Result<TSetIdentifier, TProtocolException> {
        Ok(TSetIdentifier {
            element_type: TType::I32,
            size: 0,
        })
    }
    fn read_set_end(&mut self) -> Result<(), TProtocolException> {
        Ok(())
    }
    fn read_bool(&mut self) -> Result<bool, TProtocolException> {
        Ok(true)
    }
    fn read_byte(&mut self) -> Result<i8, TProtocolException> {
        Ok(0)
    }
    fn read_i16(&mut self) -> Result<i16, TProtocolException> {
        Ok(0)
    }
    fn read_i32(&mut self) -> Result<i32, TProtocolException> {
        Ok(5)
    }
    fn read_i64(&mut self) -> Result<i64, TProtocolException> {
        Ok(0)
    }
    fn read_double(&mut self) -> Result<f64, TProtocolException> {
        Ok(0.0)
    }
    fn read_string(&mut self) -> Result<String, TProtocolException> {
        Ok("x".into())
    }
}

#[test]
fn skip_struct_consumes_all_fields_up_to_stop() {
    let mut script = FieldScript {
        fields: vec![
            TFieldIdentifier::new(None, TType::I32, Some(1)),
            TFieldIdentifier::new(None, TType::String, Some(7)),
        ]
        .into_iter(),
    };
    skip(&mut script, TType::Struct).unwrap();
    assert!(script.fields.next().is_none());
}
