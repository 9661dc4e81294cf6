/*
 * This file is a part of a Thrift-compatible RPC runtime
 *
 * Error taxonomy for the transport, protocol and application layers. Kept as
 * hand-rolled enums with manual `Display`/`Error`/`From` impls rather than a
 * derive crate, matching this codebase's general style.
 */

use std::fmt;
use std::io;

/// Error codes for [`TTransportException`], see the wire spec for exact semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Unknown = 0,
    NotOpen = 1,
    AlreadyOpen = 2,
    TimedOut = 3,
    EndOfFile = 4,
    NegativeSize = 5,
    SizeLimit = 6,
    InvalidClientType = 7,
    CorruptedData = 8,
}

/// An error raised by a transport: connection refused, timed out, short read,
/// a framing-size violation. Always fatal to the connection; a transport error
/// is never silently swallowed by a protocol.
#[derive(Debug)]
pub struct TTransportException {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TTransportException {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn end_of_file() -> Self {
        Self::new(TransportErrorKind::EndOfFile, "end of file")
    }

    pub fn timed_out() -> Self {
        Self::new(TransportErrorKind::TimedOut, "timed out")
    }

    pub fn size_limit(declared: u64, limit: u64) -> Self {
        Self::new(
            TransportErrorKind::SizeLimit,
            format!(
                "message size {} exceeds the configured limit of {} bytes",
                declared, limit
            ),
        )
    }

    pub fn negative_size(value: i64) -> Self {
        Self::new(
            TransportErrorKind::NegativeSize,
            format!("Invalid payload header length: {}", value),
        )
    }
}

impl fmt::Display for TTransportException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TTransportException {}

impl From<io::Error> for TTransportException {
    fn from(e: io::Error) -> Self {
        let kind = match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransportErrorKind::TimedOut,
            io::ErrorKind::UnexpectedEof => TransportErrorKind::EndOfFile,
            _ => TransportErrorKind::Unknown,
        };
        Self::new(kind, e.to_string())
    }
}

/// Error codes for [`TProtocolException`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolErrorKind {
    Unknown = 0,
    InvalidData = 1,
    NegativeSize = 2,
    SizeLimit = 3,
    BadVersion = 4,
    NotImplemented = 5,
    DepthLimit = 6,
}

/// An error raised by a protocol decoder: unknown type tag, missing required
/// syntax character, bad version, negative size. Fatal to the in-flight message.
#[derive(Debug)]
pub struct TProtocolException {
    pub kind: ProtocolErrorKind,
    pub message: String,
}

impl TProtocolException {
    pub fn new(kind: ProtocolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::new(ProtocolErrorKind::InvalidData, message)
    }

    pub fn bad_version(message: impl Into<String>) -> Self {
        Self::new(ProtocolErrorKind::BadVersion, message)
    }

    pub fn size_limit(message: impl Into<String>) -> Self {
        Self::new(ProtocolErrorKind::SizeLimit, message)
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(ProtocolErrorKind::NotImplemented, message)
    }
}

impl fmt::Display for TProtocolException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TProtocolException {}

/// Error codes for [`TApplicationException`], the self-describing Thrift
/// struct carried in `EXCEPTION`-typed reply messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationErrorKind {
    Unknown = 0,
    UnknownMethod = 1,
    InvalidMessageType = 2,
    WrongMethodName = 3,
    BadSequenceId = 4,
    MissingResult = 5,
    InternalError = 6,
    ProtocolError = 7,
    InvalidTransform = 8,
    InvalidProtocol = 9,
    UnsupportedClientType = 10,
}

impl ApplicationErrorKind {
    pub fn from_i32(v: i32) -> Self {
        match v {
            1 => Self::UnknownMethod,
            2 => Self::InvalidMessageType,
            3 => Self::WrongMethodName,
            4 => Self::BadSequenceId,
            5 => Self::MissingResult,
            6 => Self::InternalError,
            7 => Self::ProtocolError,
            8 => Self::InvalidTransform,
            9 => Self::InvalidProtocol,
            10 => Self::UnsupportedClientType,
            _ => Self::Unknown,
        }
    }
}

/// `TApplicationException` is itself a two-field Thrift struct: field `1` is
/// the message string, field `2` is the `type` code (note: the on-wire field
/// name is literally `type`, not `code`). It is serialized and deserialized
/// through the ordinary struct read/write path, not hand-rolled framing.
#[derive(Debug, Clone)]
pub struct TApplicationException {
    pub kind: ApplicationErrorKind,
    pub message: String,
}

impl TApplicationException {
    pub fn new(kind: ApplicationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unknown_method(name: &str) -> Self {
        Self::new(
            ApplicationErrorKind::UnknownMethod,
            format!("Unknown method '{}'", name),
        )
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ApplicationErrorKind::InternalError, message)
    }

    pub fn missing_result(method: &str) -> Self {
        Self::new(
            ApplicationErrorKind::MissingResult,
            format!("'{}' failed: unknown result", method),
        )
    }
}

impl fmt::Display for TApplicationException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TApplicationException {}

impl TApplicationException {
    /// Serializes as the two-field struct the wire format expects: field `1`
    /// is the message, field `2` is the `type` code.
    pub fn write(
        &self,
        out: &mut dyn crate::protocol::TOutputProtocol,
    ) -> Result<(), TProtocolException> {
        use crate::protocol::{TFieldIdentifier, TType};
        out.write_struct_begin("TApplicationException")?;
        out.write_field_begin(&TFieldIdentifier::new(
            Some("message".into()),
            TType::String,
            Some(1),
        ))?;
        out.write_string(&self.message)?;
        out.write_field_end()?;
        out.write_field_begin(&TFieldIdentifier::new(
            Some("type".into()),
            TType::I32,
            Some(2),
        ))?;
        out.write_i32(self.kind as i32)?;
        out.write_field_end()?;
        out.write_field_stop()?;
        out.write_struct_end()
    }

    pub fn read(input: &mut dyn crate::protocol::TInputProtocol) -> Result<Self, TProtocolException> {
        use crate::protocol::{skip, TType};
        let mut message = String::new();
        let mut kind = ApplicationErrorKind::Unknown;
        input.read_struct_begin()?;
        loop {
            let field = input.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match field.id {
                Some(1) => message = input.read_string()?,
                Some(2) => kind = ApplicationErrorKind::from_i32(input.read_i32()?),
                _ => skip(input, field.field_type)?,
            }
            input.read_field_end()?;
        }
        input.read_struct_end()?;
        Ok(Self::new(kind, message))
    }
}

/// Crate-wide error, unifying the three exception families the way this
/// codebase elsewhere unites an I/O error with a domain error in one enum
/// (see the teacher's `ActionError`) so `?` composes cleanly across layers.
#[derive(Debug)]
pub enum RpcError {
    Transport(TTransportException),
    Protocol(TProtocolException),
    Application(TApplicationException),
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport error: {}", e),
            Self::Protocol(e) => write!(f, "protocol error: {}", e),
            Self::Application(e) => write!(f, "application error: {}", e),
        }
    }
}

impl std::error::Error for RpcError {}

impl From<TTransportException> for RpcError {
    fn from(e: TTransportException) -> Self {
        Self::Transport(e)
    }
}

impl From<TProtocolException> for RpcError {
    fn from(e: TProtocolException) -> Self {
        Self::Protocol(e)
    }
}

impl From<TApplicationException> for RpcError {
    fn from(e: TApplicationException) -> Self {
        Self::Application(e)
    }
}

impl From<io::Error> for RpcError {
    fn from(e: io::Error) -> Self {
        Self::Transport(e.into())
    }
}

pub type RpcResult<T> = Result<T, RpcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_limit_message_matches_spec_example() {
        let e = TTransportException::negative_size(-1);
        assert_eq!(e.message, "Invalid payload header length: -1");
    }

    #[test]
    fn application_kind_roundtrips_known_codes() {
        for code in 0..=10 {
            let kind = ApplicationErrorKind::from_i32(code);
            assert_eq!(kind as i32, code);
        }
    }

    #[test]
    fn unknown_code_maps_to_unknown() {
        assert_eq!(ApplicationErrorKind::from_i32(99), ApplicationErrorKind::Unknown);
    }
}
