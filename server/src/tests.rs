//! End-to-end coverage driving the real `TSimpleServer` accept loop over a
//! loopback socket, rather than exercising protocol/transport layers in
//! isolation.

use crate::protocol::{self, TInputProtocol, TMessageIdentifier, TMessageType, TOutputProtocol, TType};

#[sky_macros::rpc_test]
fn ping_roundtrip((mut input, mut output): (Box<dyn TInputProtocol>, Box<dyn TOutputProtocol>)) {
    output
        .write_message_begin(&TMessageIdentifier::new("ping", TMessageType::Call, 1))
        .unwrap();
    output.write_struct_begin("ping_args").unwrap();
    output.write_field_stop().unwrap();
    output.write_struct_end().unwrap();
    output.write_message_end().unwrap();
    output.flush().unwrap();

    let ident = input.read_message_begin().unwrap();
    assert_eq!(ident.name, "ping");
    assert_eq!(ident.message_type, TMessageType::Reply);
    assert_eq!(ident.sequence_id, 1);

    input.read_struct_begin().unwrap();
    loop {
        let field = input.read_field_begin().unwrap();
        if field.field_type == TType::Stop {
            break;
        }
        protocol::skip(&mut *input, field.field_type).unwrap();
        input.read_field_end().unwrap();
    }
    input.read_struct_end().unwrap();
    input.read_message_end().unwrap();
}

#[sky_macros::rpc_test]
fn unknown_method_reports_exception((mut input, mut output): (Box<dyn TInputProtocol>, Box<dyn TOutputProtocol>)) {
    output
        .write_message_begin(&TMessageIdentifier::new("nosuchmethod", TMessageType::Call, 7))
        .unwrap();
    output.write_struct_begin("nosuchmethod_args").unwrap();
    output.write_field_stop().unwrap();
    output.write_struct_end().unwrap();
    output.write_message_end().unwrap();
    output.flush().unwrap();

    let ident = input.read_message_begin().unwrap();
    assert_eq!(ident.name, "nosuchmethod");
    assert_eq!(ident.message_type, TMessageType::Exception);
}
