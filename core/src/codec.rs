//! Wire framing codec.
//!
//! Every message is `HHHHHH` + payload, where `HHHHHH` is the lowercase
//! zero-padded hexadecimal payload length in bytes. Six digits cap a
//! payload at 2^24 - 1 bytes. The payload text is utf-8 by default;
//! latin-1 is available for clients configured with `iso-latin-1-unix`.

use bytes::{Buf, BufMut, BytesMut};
use std::io;
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

pub const HEADER_LEN: usize = 6;

/// Largest payload a 6-digit hex header can announce.
pub const MAX_PAYLOAD: usize = (1 << 24) - 1;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame header {0:?} is not six hex digits")]
    BadHeader(String),
    #[error("payload of {0} bytes exceeds the 24-bit frame limit")]
    MessageTooLarge(usize),
    #[error("payload is not valid {0} text")]
    BadPayload(&'static str),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Payload text encoding, selected by server configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Latin1,
}

impl Encoding {
    /// Accepts both the plain names and the SLIME coding-system names.
    pub fn from_name(name: &str) -> Option<Encoding> {
        match name {
            "utf-8" | "utf-8-unix" | "iso-utf-8-unix" => Some(Encoding::Utf8),
            "latin-1" | "iso-latin-1-unix" | "iso-8859-1" => Some(Encoding::Latin1),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Latin1 => "latin-1",
        }
    }

    fn decode_bytes(&self, bytes: &[u8]) -> Result<String, FrameError> {
        match self {
            Encoding::Utf8 => String::from_utf8(bytes.to_vec())
                .map_err(|_| FrameError::BadPayload("utf-8")),
            Encoding::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
        }
    }

    fn encode_str(&self, text: &str) -> Vec<u8> {
        match self {
            Encoding::Utf8 => text.as_bytes().to_vec(),
            // Characters outside latin-1 degrade to `?` rather than
            // poisoning the connection.
            Encoding::Latin1 => text
                .chars()
                .map(|c| if (c as u32) < 0x100 { c as u8 } else { b'?' })
                .collect(),
        }
    }
}

/// Length-prefixed frame codec for [`tokio_util::codec::Framed`].
#[derive(Debug, Default)]
pub struct SwankCodec {
    encoding: Encoding,
}

impl SwankCodec {
    pub fn new(encoding: Encoding) -> SwankCodec {
        SwankCodec { encoding }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }
}

impl Decoder for SwankCodec {
    type Item = String;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        let header = std::str::from_utf8(&src[..HEADER_LEN])
            .map_err(|_| FrameError::BadHeader(format!("{:?}", &src[..HEADER_LEN])))?;

        let payload_len = usize::from_str_radix(header, 16)
            .map_err(|_| FrameError::BadHeader(header.to_string()))?;

        if src.len() < HEADER_LEN + payload_len {
            return Ok(None);
        }

        src.advance(HEADER_LEN);
        let payload = src.split_to(payload_len);

        self.encoding.decode_bytes(&payload).map(Some)
    }
}

impl Encoder<String> for SwankCodec {
    type Error = FrameError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = self.encoding.encode_str(&item);
        if payload.len() > MAX_PAYLOAD {
            return Err(FrameError::MessageTooLarge(payload.len()));
        }
        let header = format!("{:06x}", payload.len());

        dst.reserve(HEADER_LEN + payload.len());
        dst.put_slice(header.as_bytes());
        dst.put_slice(&payload);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_ok_envelope() {
        let mut codec = SwankCodec::default();
        let mut buf = BytesMut::from("000015(:return (:ok nil) 1)");

        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some("(:return (:ok nil) 1)".to_string())
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_waits_for_full_header() {
        let mut codec = SwankCodec::default();
        let mut buf = BytesMut::from("00");

        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        // Nothing consumed until all six digits are in.
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_decode_waits_for_full_payload() {
        let mut codec = SwankCodec::default();
        // 0x15 bytes announced, 13 arrived so far.
        let mut buf = BytesMut::from("000015(:return (:ok");

        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_decode_bad_header() {
        let mut codec = SwankCodec::default();
        let mut buf = BytesMut::from("nothexpayload");

        assert!(matches!(
            codec.decode(&mut buf),
            Err(FrameError::BadHeader(_))
        ));
    }

    #[test]
    fn test_decode_back_to_back_frames() {
        let mut codec = SwankCodec::default();
        // A handshake frame with a reply queued right behind it.
        let mut buf =
            BytesMut::from("000018(:indentation-update ())000015(:return (:ok nil) 1)");

        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some("(:indentation-update ())".to_string())
        );
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some("(:return (:ok nil) 1)".to_string())
        );
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_encode_frames_an_envelope() {
        let mut codec = SwankCodec::default();
        let mut buf = BytesMut::new();

        codec
            .encode("(:return (:ok \"3\") 2)".to_string(), &mut buf)
            .unwrap();
        assert_eq!(&buf[..], b"000015(:return (:ok \"3\") 2)");
    }

    #[test]
    fn test_encode_zero_length_payload_keeps_header() {
        let mut codec = SwankCodec::default();
        let mut buf = BytesMut::new();

        codec.encode(String::new(), &mut buf).unwrap();
        assert_eq!(&buf[..], b"000000");
        assert_eq!(buf.len(), HEADER_LEN);
    }

    #[test]
    fn test_encode_header_is_lowercase_hex() {
        let mut codec = SwankCodec::default();
        let mut buf = BytesMut::new();

        codec.encode("x".repeat(0xabc), &mut buf).unwrap();
        assert_eq!(&buf[..HEADER_LEN], b"000abc");
    }

    #[test]
    fn test_encode_rejects_oversized_payload() {
        let mut codec = SwankCodec::default();
        let mut buf = BytesMut::new();

        let oversized = "x".repeat(MAX_PAYLOAD + 1);
        assert!(matches!(
            codec.encode(oversized, &mut buf),
            Err(FrameError::MessageTooLarge(_))
        ));
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let mut codec = SwankCodec::default();
        let mut buf = BytesMut::new();

        let payload = "(:emacs-rex (swank:connection-info) nil t 1)".to_string();
        codec.encode(payload.clone(), &mut buf).unwrap();
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(payload));
    }

    #[test]
    fn test_latin1_round_trip() {
        let mut codec = SwankCodec::new(Encoding::Latin1);
        let mut buf = BytesMut::new();

        let payload = "caf\u{e9}".to_string();
        codec.encode(payload.clone(), &mut buf).unwrap();
        // One byte per character on the wire.
        assert_eq!(&buf[..], b"000004caf\xe9");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(payload));
    }

    #[test]
    fn test_utf8_header_counts_bytes_not_chars() {
        let mut codec = SwankCodec::default();
        let mut buf = BytesMut::new();

        codec.encode("caf\u{e9}".to_string(), &mut buf).unwrap();
        assert_eq!(&buf[..HEADER_LEN], b"000005");
    }

    #[test]
    fn test_encoding_names() {
        assert_eq!(Encoding::from_name("utf-8"), Some(Encoding::Utf8));
        assert_eq!(Encoding::from_name("iso-utf-8-unix"), Some(Encoding::Utf8));
        assert_eq!(
            Encoding::from_name("iso-latin-1-unix"),
            Some(Encoding::Latin1)
        );
        assert_eq!(Encoding::from_name("ebcdic"), None);
    }
}
