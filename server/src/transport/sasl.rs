/*
 * TSaslTransport: wraps another transport with a per-frame SASL status/
 * length header and, once negotiation completes, optional wrap/unwrap of
 * every payload under the negotiated quality of protection. Grounded on the
 * challenge/response negotiation loop in `engine/net/protocol/handshake.rs`
 * (alternating read-a-frame / produce-a-response until both sides report
 * completion) and on `engine/net/protocol/data_exchange.rs` for the
 * length-prefixed frame read loop that this reuses with an extra status byte.
 */

use super::{TTransport, TransportConfiguration, TransportResult};
use crate::error::TTransportException;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaslStatus {
    Start = 1,
    Ok = 2,
    Bad = 3,
    Error = 4,
    Complete = 5,
}

impl SaslStatus {
    fn from_u8(raw: u8) -> Result<Self, TTransportException> {
        match raw {
            1 => Ok(Self::Start),
            2 => Ok(Self::Ok),
            3 => Ok(Self::Bad),
            4 => Ok(Self::Error),
            5 => Ok(Self::Complete),
            other => Err(TTransportException::new(
                crate::error::TransportErrorKind::CorruptedData,
                format!("Invalid status {}", other as i8),
            )),
        }
    }
}

/// Quality of protection negotiated by the SASL mechanism. `Auth` leaves
/// payloads transparent; `AuthInt`/`AuthConf` route every payload through
/// `wrap`/`unwrap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qop {
    Auth,
    AuthInt,
    AuthConf,
}

/// A pluggable SASL mechanism. Credential verification (GSSAPI/Kerberos/
/// PLAIN) is explicitly out of scope (spec §1) and is left to the
/// implementation of this trait; the transport only drives the negotiation
/// frame format and the post-negotiation wrap/unwrap hook points.
pub trait SaslMechanism {
    /// Produce the next outbound token given the peer's last token (empty on
    /// the very first call for an initiating client).
    fn evaluate(&mut self, challenge: &[u8]) -> Vec<u8>;
    fn is_complete(&self) -> bool;
    fn qop(&self) -> Qop;
    fn wrap(&self, data: &[u8]) -> Vec<u8>;
    fn unwrap(&self, data: &[u8]) -> Vec<u8>;
}

/// A mechanism that never requires integrity/confidentiality wrapping and
/// completes after a single round trip. Useful for tests and for `PLAIN`-style
/// mechanisms where the credential check happens entirely inside `evaluate`.
pub struct NoOpMechanism {
    complete: bool,
}

impl NoOpMechanism {
    pub fn new() -> Self {
        Self { complete: false }
    }
}

impl Default for NoOpMechanism {
    fn default() -> Self {
        Self::new()
    }
}

impl SaslMechanism for NoOpMechanism {
    fn evaluate(&mut self, _challenge: &[u8]) -> Vec<u8> {
        self.complete = true;
        Vec::new()
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn qop(&self) -> Qop {
        Qop::Auth
    }

    fn wrap(&self, data: &[u8]) -> Vec<u8> {
        data.to_vec()
    }

    fn unwrap(&self, data: &[u8]) -> Vec<u8> {
        data.to_vec()
    }
}

fn read_header<T: TTransport>(
    inner: &mut T,
    config: &TransportConfiguration,
) -> TransportResult<(SaslStatus, u32)> {
    let mut status_byte = [0u8; 1];
    inner.read_all(&mut status_byte)?;
    let status = SaslStatus::from_u8(status_byte[0])?;
    let mut len_bytes = [0u8; 4];
    inner.read_all(&mut len_bytes)?;
    let raw_len = i32::from_be_bytes(len_bytes);
    if raw_len < 0 || raw_len as u64 > config.max_message_size {
        return Err(TTransportException::negative_size(raw_len as i64));
    }
    Ok((status, raw_len as u32))
}

fn write_frame<T: TTransport>(
    inner: &mut T,
    status: SaslStatus,
    payload: &[u8],
) -> TransportResult<()> {
    inner.write(&[status as u8])?;
    inner.write(&(payload.len() as i32).to_be_bytes())?;
    inner.write(payload)?;
    inner.flush()
}

pub struct TSaslTransport<T, M> {
    inner: T,
    mechanism: M,
    config: TransportConfiguration,
    read_buf: Vec<u8>,
    read_pos: usize,
}

impl<T: TTransport, M: SaslMechanism> TSaslTransport<T, M> {
    pub fn new(inner: T, mechanism: M) -> Self {
        Self::with_config(inner, mechanism, TransportConfiguration::default())
    }

    pub fn with_config(inner: T, mechanism: M, config: TransportConfiguration) -> Self {
        Self {
            inner,
            mechanism,
            config,
            read_buf: Vec::new(),
            read_pos: 0,
        }
    }

    /// Drive negotiation as the initiating (client) side: send a `START`
    /// frame, then alternate reading the peer's response and evaluating it
    /// until both sides report completion.
    pub fn client_handshake(&mut self) -> TransportResult<()> {
        let initial = self.mechanism.evaluate(&[]);
        write_frame(&mut self.inner, SaslStatus::Start, &initial)?;
        loop {
            let (status, len) = read_header(&mut self.inner, &self.config)?;
            let mut payload = vec![0u8; len as usize];
            self.inner.read_all(&mut payload)?;
            match status {
                SaslStatus::Complete => {
                    if !self.mechanism.is_complete() {
                        let response = self.mechanism.evaluate(&payload);
                        write_frame(&mut self.inner, SaslStatus::Complete, &response)?;
                    }
                    return Ok(());
                }
                SaslStatus::Ok => {
                    let response = self.mechanism.evaluate(&payload);
                    write_frame(&mut self.inner, SaslStatus::Ok, &response)?;
                }
                SaslStatus::Bad | SaslStatus::Error => {
                    return Err(TTransportException::new(
                        crate::error::TransportErrorKind::CorruptedData,
                        format!("peer rejected SASL negotiation: status {:?}", status),
                    ));
                }
                SaslStatus::Start => {
                    return Err(TTransportException::new(
                        crate::error::TransportErrorKind::CorruptedData,
                        "unexpected START from peer",
                    ));
                }
            }
        }
    }

    /// Drive negotiation as the accepting (server) side: wait for frames from
    /// the client and evaluate each until the mechanism reports completion.
    pub fn server_handshake(&mut self) -> TransportResult<()> {
        loop {
            let (_status, len) = read_header(&mut self.inner, &self.config)?;
            let mut payload = vec![0u8; len as usize];
            self.inner.read_all(&mut payload)?;
            let response = self.mechanism.evaluate(&payload);
            if self.mechanism.is_complete() {
                write_frame(&mut self.inner, SaslStatus::Complete, &response)?;
                return Ok(());
            }
            write_frame(&mut self.inner, SaslStatus::Ok, &response)?;
        }
    }

    fn fill(&mut self) -> TransportResult<()> {
        let (status, len) = read_header(&mut self.inner, &self.config)?;
        if status != SaslStatus::Ok && status != SaslStatus::Complete {
            return Err(TTransportException::new(
                crate::error::TransportErrorKind::CorruptedData,
                format!("Invalid status {:?} in data frame", status),
            ));
        }
        let mut payload = vec![0u8; len as usize];
        self.inner.read_all(&mut payload)?;
        self.read_buf = match self.mechanism.qop() {
            Qop::Auth => payload,
            Qop::AuthInt | Qop::AuthConf => self.mechanism.unwrap(&payload),
        };
        self.read_pos = 0;
        Ok(())
    }
}

impl<T: TTransport, M: SaslMechanism> TTransport for TSaslTransport<T, M> {
    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn open(&mut self) -> TransportResult<()> {
        self.inner.open()
    }

    fn close(&mut self) -> TransportResult<()> {
        self.inner.close()
    }

    fn read(&mut self, buf: &mut [u8]) -> TransportResult<usize> {
        if self.read_pos >= self.read_buf.len() {
            self.fill()?;
        }
        let remaining = self.read_buf.len() - self.read_pos;
        let n = remaining.min(buf.len());
        buf[..n].copy_from_slice(&self.read_buf[self.read_pos..self.read_pos + n]);
        self.read_pos += n;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> TransportResult<()> {
        let payload = match self.mechanism.qop() {
            Qop::Auth => buf.to_vec(),
            Qop::AuthInt | Qop::AuthConf => self.mechanism.wrap(buf),
        };
        write_frame(&mut self.inner, SaslStatus::Complete, &payload)
    }

    fn flush(&mut self) -> TransportResult<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mem::TMemoryBuffer;

    #[test]
    fn bad_status_byte_reports_signed_value() {
        let mem = TMemoryBuffer::with_data(vec![0xFF, 0x00, 0x00, 0x00, 0x05]);
        let config = TransportConfiguration::default();
        let mut mem = mem;
        let err = read_header(&mut mem, &config).unwrap_err();
        assert_eq!(err.message, "Invalid status -1");
    }

    #[test]
    fn negative_payload_length_is_rejected() {
        let mut mem = TMemoryBuffer::with_data(vec![0x01, 0xFF, 0xFF, 0xFF, 0xFF]);
        let config = TransportConfiguration::default();
        let err = read_header(&mut mem, &config).unwrap_err();
        assert_eq!(err.message, "Invalid payload header length: -1");
    }

    #[test]
    fn oversized_payload_length_is_rejected() {
        let mut mem = TMemoryBuffer::with_data(vec![0x01, 0x64, 0x00, 0x00, 0x00]);
        let config = TransportConfiguration::default();
        let err = read_header(&mut mem, &config).unwrap_err();
        assert_eq!(err.message, "Invalid payload header length: 1677721600");
    }

    #[test]
    fn handshake_completes_and_data_round_trips() {
        let mem = TMemoryBuffer::new();
        let mut server = TSaslTransport::new(mem, NoOpMechanism::new());
        // simulate a client by hand: write a START frame, then let the server
        // respond, then read the server's COMPLETE frame as the client would
        write_frame(&mut server.inner, SaslStatus::Start, b"").unwrap();
        server.server_handshake().unwrap();
        // the server wrote an immediate COMPLETE back onto the same memory buffer
        let written = server.inner.written();
        assert_eq!(written[0], SaslStatus::Complete as u8);
    }
}
