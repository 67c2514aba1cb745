use anyhow::{anyhow, bail};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use bytes_varint::try_get_fixed::TryGetFixedSupport;
use num_enum::{IntoPrimitive, TryFromPrimitive};

pub const HANDSHAKE_RECORD_BYTES: usize = 16;
pub const TERMINATE_RECORD_BYTES: usize = 8;
pub const MEDIA_HEADER_BYTES: usize = 16;

const TERMINATE_CODE: u64 = 0x5;

/// Type code of a 16-byte handshake record.
///
/// NB: The delay request and the delay acknowledgment have no code of their own - they are
///  sent as `Sync`-shaped records and recognized by protocol phase only.
#[derive(Debug, Copy, Clone, Eq, PartialEq, TryFromPrimitive, IntoPrimitive)]
#[repr(u64)]
pub enum HandshakeKind {
    Sync = 0x1,
    DelayResponse = 0x3,
}

/// Decoded view of a datagram. The wire distinguishes the kinds by total length (8 bytes:
///  terminate, 16 bytes: handshake record, more: media frame), not by a frame header.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Datagram {
    Handshake { timestamp_ns: u64, kind: HandshakeKind },
    Terminate,
    MediaFrame(MediaFrame),
}

/// A media frame record. The payload is the compressed frame and must be non-empty: an empty
///  payload would make the record 16 bytes long and indistinguishable from a handshake record.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MediaFrame {
    pub index: u64,
    pub send_timestamp_ns: u64,
    pub payload: Bytes,
}

impl Datagram {
    pub fn sync(timestamp_ns: u64) -> Datagram {
        Datagram::Handshake { timestamp_ns, kind: HandshakeKind::Sync }
    }

    pub fn delay_response(timestamp_ns: u64) -> Datagram {
        Datagram::Handshake { timestamp_ns, kind: HandshakeKind::DelayResponse }
    }

    pub fn ser(&self, buf: &mut BytesMut) {
        match self {
            Datagram::Handshake { timestamp_ns, kind } => {
                buf.put_u64(*timestamp_ns);
                buf.put_u64((*kind).into());
            }
            Datagram::Terminate => {
                buf.put_u64(TERMINATE_CODE);
            }
            Datagram::MediaFrame(frame) => {
                buf.put_u64(frame.index);
                buf.put_u64(frame.send_timestamp_ns);
                buf.put_slice(&frame.payload);
            }
        }
    }

    pub fn deser(buf: &mut impl Buf) -> anyhow::Result<Datagram> {
        match buf.remaining() {
            TERMINATE_RECORD_BYTES => {
                let code = buf.try_get_u64()?;
                if code != TERMINATE_CODE {
                    bail!("8-byte record with unexpected code {:#x}", code);
                }
                Ok(Datagram::Terminate)
            }
            HANDSHAKE_RECORD_BYTES => {
                let timestamp_ns = buf.try_get_u64()?;
                let code = buf.try_get_u64()?;
                let kind = HandshakeKind::try_from(code)
                    .map_err(|_| anyhow!("unknown handshake type code {:#x}", code))?;
                Ok(Datagram::Handshake { timestamp_ns, kind })
            }
            n if n > MEDIA_HEADER_BYTES => Ok(Datagram::MediaFrame(MediaFrame::deser(buf)?)),
            n => {
                bail!("datagram of {} bytes matches no record shape", n);
            }
        }
    }
}

impl MediaFrame {
    pub fn deser(buf: &mut impl Buf) -> anyhow::Result<MediaFrame> {
        let index = buf.try_get_u64()?;
        let send_timestamp_ns = buf.try_get_u64()?;
        if !buf.has_remaining() {
            bail!("media frame record without payload");
        }
        let payload = buf.copy_to_bytes(buf.remaining());
        Ok(MediaFrame {
            index,
            send_timestamp_ns,
            payload,
        })
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;
    use super::*;

    fn ser_to_vec(datagram: &Datagram) -> Vec<u8> {
        let mut buf = BytesMut::new();
        datagram.ser(&mut buf);
        buf.to_vec()
    }

    #[rstest]
    #[case::sync(Datagram::sync(0x0102030405060708),
        b"\x01\x02\x03\x04\x05\x06\x07\x08\0\0\0\0\0\0\0\x01")]
    #[case::delay_response(Datagram::delay_response(0x10),
        b"\0\0\0\0\0\0\0\x10\0\0\0\0\0\0\0\x03")]
    #[case::terminate(Datagram::Terminate, b"\0\0\0\0\0\0\0\x05")]
    fn test_ser_exact_bytes(#[case] datagram: Datagram, #[case] expected: &[u8]) {
        assert_eq!(ser_to_vec(&datagram), expected);
    }

    #[rstest]
    #[case::sync(b"\0\0\0\0\0\0\x03\xe8\0\0\0\0\0\0\0\x01".as_slice(),
        Datagram::sync(1000))]
    #[case::delay_response(b"\0\0\0\0\0\0\0\x2a\0\0\0\0\0\0\0\x03".as_slice(),
        Datagram::delay_response(42))]
    #[case::terminate(b"\0\0\0\0\0\0\0\x05".as_slice(), Datagram::Terminate)]
    #[case::media_one_byte_payload(b"\0\0\0\0\0\0\0\x02\0\0\0\0\0\0\0\x07\xff".as_slice(),
        Datagram::MediaFrame(MediaFrame { index: 2, send_timestamp_ns: 7, payload: Bytes::from_static(b"\xff") }))]
    fn test_deser(#[case] mut buf: &[u8], #[case] expected: Datagram) {
        let actual = Datagram::deser(&mut buf).unwrap();
        assert_eq!(actual, expected);
        assert!(!buf.has_remaining());
    }

    /// a handshake record and a terminate record are told apart purely by length (16 vs 8)
    #[rstest]
    fn test_length_discrimination() {
        let sync = ser_to_vec(&Datagram::sync(1000));
        let terminate = ser_to_vec(&Datagram::Terminate);
        assert_eq!(sync.len(), HANDSHAKE_RECORD_BYTES);
        assert_eq!(terminate.len(), TERMINATE_RECORD_BYTES);

        assert_eq!(Datagram::deser(&mut sync.as_slice()).unwrap(), Datagram::sync(1000));
        assert_eq!(Datagram::deser(&mut terminate.as_slice()).unwrap(), Datagram::Terminate);
    }

    #[rstest]
    fn test_media_frame_roundtrip() {
        let frame = MediaFrame {
            index: 7,
            send_timestamp_ns: 123456789,
            payload: Bytes::from_static(b"\x12\x34\x56\x78\x9a"),
        };

        let encoded = ser_to_vec(&Datagram::MediaFrame(frame.clone()));
        assert_eq!(encoded.len(), MEDIA_HEADER_BYTES + 5);

        match Datagram::deser(&mut encoded.as_slice()).unwrap() {
            Datagram::MediaFrame(decoded) => {
                assert_eq!(decoded.index, frame.index);
                assert_eq!(decoded.send_timestamp_ns, frame.send_timestamp_ns);
                assert_eq!(decoded.payload, frame.payload);
            }
            other => panic!("decoded as {:?}", other),
        }
    }

    #[rstest]
    #[case::empty(b"".as_slice())]
    #[case::short(b"\x01\x02\x03".as_slice())]
    #[case::between_terminate_and_handshake(b"\0\0\0\0\0\0\0\x05\x01\x02\x03\x04".as_slice())]
    #[case::terminate_with_wrong_code(b"\0\0\0\0\0\0\0\x06".as_slice())]
    #[case::handshake_with_unknown_code(b"\0\0\0\0\0\0\0\x01\0\0\0\0\0\0\0\x07".as_slice())]
    fn test_deser_malformed(#[case] mut buf: &[u8]) {
        assert!(Datagram::deser(&mut buf).is_err());
    }
}
