/*
 * Integration-level tests that compose transport layers, complementing the
 * per-submodule unit tests with coverage of the stacks these layers are
 * actually built for (framed-over-buffered, factories chained together).
 */

use super::buffered::{TBufferedTransport, TBufferedTransportFactory};
use super::framed::{TFramedTransport, TFramedTransportFactory};
use super::mem::TMemoryBuffer;
use super::{TTransport, TTransportFactory, TransportConfiguration};

#[test]
fn framed_over_buffered_round_trips_a_message() {
    let mem = TMemoryBuffer::new();
    let buffered = TBufferedTransport::with_capacity(mem, 16);
    let mut framed = TFramedTransport::new(buffered);
    framed.write(b"ping").unwrap();
    framed.flush().unwrap();

    let buffered = framed.into_inner();
    let mem = buffered.into_inner();
    assert_eq!(
        mem.written(),
        &[0x00, 0x00, 0x00, 0x04, b'p', b'i', b'n', b'g']
    );

    let buffered = TBufferedTransport::with_capacity(mem, 16);
    let mut framed = TFramedTransport::new(buffered);
    let mut out = [0u8; 4];
    framed.read_all(&mut out).unwrap();
    assert_eq!(&out, b"ping");
}

#[test]
fn factories_chain_the_same_way_server_setup_does() {
    let buffered_factory = TBufferedTransportFactory::new(8);
    let framed_factory = TFramedTransportFactory::new(TransportConfiguration::new(1024));

    let mem = TMemoryBuffer::new();
    let buffered = buffered_factory.get_transport(mem).unwrap();
    let mut framed = framed_factory.get_transport(buffered).unwrap();

    framed.write(b"hi").unwrap();
    framed.flush().unwrap();
    let buffered = framed.into_inner();
    let mem = buffered.into_inner();
    assert_eq!(mem.written(), &[0x00, 0x00, 0x00, 0x02, b'h', b'i']);
}

#[test]
fn two_messages_in_sequence_stay_independent() {
    let mem = TMemoryBuffer::new();
    let mut framed = TFramedTransport::new(mem);
    framed.write(b"one").unwrap();
    framed.flush().unwrap();
    framed.write(b"two").unwrap();
    framed.flush().unwrap();

    let mem = framed.into_inner();
    let mut framed = TFramedTransport::new(mem);
    let mut first = [0u8; 3];
    framed.read_all(&mut first).unwrap();
    assert_eq!(&first, b"one");
    let mut second = [0u8; 3];
    framed.read_all(&mut second).unwrap();
    assert_eq!(&second, b"two");
}
