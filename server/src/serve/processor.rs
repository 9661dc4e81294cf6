/*
 * This file is a part of a Thrift-compatible RPC runtime
 *
 * The processor contract and the one concrete, generic implementation this
 * crate ships: a name-keyed dispatch table. Real services generate their own
 * processor; `ApplicationHandler` exists for the test harness and examples.
 */

use std::collections::HashMap;

use crate::error::{ApplicationErrorKind, RpcError, TApplicationException};
use crate::protocol::{
    skip, TInputProtocol, TMessageIdentifier, TMessageType, TOutputProtocol, TType,
};

/// Reads one message, dispatches it, writes a reply, and reports whether the
/// connection loop should keep going.
pub trait TProcessor {
    fn process(
        &self,
        input: &mut dyn TInputProtocol,
        output: &mut dyn TOutputProtocol,
    ) -> Result<bool, RpcError>;
}

type MethodHandler =
    dyn Fn(i32, &mut dyn TInputProtocol, &mut dyn TOutputProtocol) -> Result<(), RpcError>;

/// A processor driven by a name-keyed table of handlers. Each handler is
/// responsible for reading its own argument struct (including
/// `read_struct_begin`/`read_struct_end`) and, for non-oneway calls, writing
/// its own reply message.
#[derive(Default)]
pub struct ApplicationHandler {
    handlers: HashMap<String, Box<MethodHandler>>,
}

impl ApplicationHandler {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register<F>(&mut self, method: impl Into<String>, handler: F)
    where
        F: Fn(i32, &mut dyn TInputProtocol, &mut dyn TOutputProtocol) -> Result<(), RpcError>
            + 'static,
    {
        self.handlers.insert(method.into(), Box::new(handler));
    }

    fn write_exception(
        &self,
        output: &mut dyn TOutputProtocol,
        name: &str,
        seqid: i32,
        exc: TApplicationException,
    ) -> Result<(), RpcError> {
        output.write_message_begin(&TMessageIdentifier::new(
            name,
            TMessageType::Exception,
            seqid,
        ))?;
        exc.write(output)?;
        output.write_message_end()?;
        output.flush()?;
        Ok(())
    }
}

impl TProcessor for ApplicationHandler {
    fn process(
        &self,
        input: &mut dyn TInputProtocol,
        output: &mut dyn TOutputProtocol,
    ) -> Result<bool, RpcError> {
        let msg = input.read_message_begin()?;
        if !matches!(msg.message_type, TMessageType::Call | TMessageType::Oneway) {
            return Err(TApplicationException::new(
                ApplicationErrorKind::InvalidMessageType,
                format!("unexpected message type {:?}", msg.message_type),
            )
            .into());
        }
        let oneway = msg.message_type == TMessageType::Oneway;

        match self.handlers.get(&msg.name) {
            Some(handler) => {
                if let Err(e) = handler(msg.sequence_id, input, output) {
                    if oneway {
                        log::warn!("oneway call to '{}' failed: {}", msg.name, e);
                    } else {
                        let exc = match e {
                            RpcError::Application(a) => a,
                            other => TApplicationException::internal_error(other.to_string()),
                        };
                        self.write_exception(output, &msg.name, msg.sequence_id, exc)?;
                    }
                }
            }
            None => {
                skip(input, TType::Struct)?;
                input.read_message_end()?;
                if !oneway {
                    self.write_exception(
                        output,
                        &msg.name,
                        msg.sequence_id,
                        TApplicationException::unknown_method(&msg.name),
                    )?;
                }
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::json::{TJsonInputProtocol, TJsonOutputProtocol};
    use crate::transport::mem::TMemoryBuffer;

    fn call(wire: &[u8], handler: &ApplicationHandler) -> String {
        let mut input = TJsonInputProtocol::new(TMemoryBuffer::with_data(wire.to_vec()));
        let mut out = TJsonOutputProtocol::new(TMemoryBuffer::new());
        handler.process(&mut input, &mut out).unwrap();
        String::from_utf8(out.into_inner().written().to_vec()).unwrap()
    }

    #[test]
    fn unknown_method_replies_with_application_exception() {
        let handler = ApplicationHandler::new();
        let wire = b"[1,\"nope\",1,7,{}]";
        let reply = call(wire, &handler);
        assert!(reply.contains("\"nope\""));

        let mut input = TJsonInputProtocol::new(TMemoryBuffer::with_data(reply.into_bytes()));
        let id = input.read_message_begin().unwrap();
        assert_eq!(id.message_type, TMessageType::Exception);
        assert_eq!(id.sequence_id, 7);
        let exc = TApplicationException::read(&mut input).unwrap();
        assert_eq!(exc.kind, ApplicationErrorKind::UnknownMethod);
        assert!(exc.message.contains("nope"));
    }

    #[test]
    fn registered_method_is_dispatched() {
        let mut handler = ApplicationHandler::new();
        handler.register("ping", |seqid, input, output| {
            input.read_struct_begin()?;
            let field = input.read_field_begin()?;
            assert_eq!(field.field_type, TType::Stop);
            input.read_struct_end()?;
            input.read_message_end()?;
            output.write_message_begin(&TMessageIdentifier::new(
                "ping",
                TMessageType::Reply,
                seqid,
            ))?;
            output.write_struct_begin("pingResult")?;
            output.write_field_stop()?;
            output.write_struct_end()?;
            output.write_message_end()?;
            output.flush()?;
            Ok(())
        });

        let wire = b"[1,\"ping\",1,42,{}]";
        let reply = call(wire, &handler);
        assert_eq!(reply, "[1,\"ping\",2,42,{}]");
    }
}
