//! pkt-line framing: encoding, whole-frame splitting, sentinel classification.
//!
//! The splitter deliberately yields whole frames (length header included)
//! rather than stripped payloads, so that a translator forwarding unmodified
//! packets can do so byte-for-byte without recomputing lengths.

use std::io::Read;

/// The flush sentinel, `0000`.
pub const FLUSH_PKT: &[u8] = b"0000";
/// The delimiter sentinel, `0001`.
pub const DELIM_PKT: &[u8] = b"0001";
/// The response-end sentinel, `0002`.
pub const RESPONSE_END_PKT: &[u8] = b"0002";

/// The largest payload a single pkt-line can carry: the four hex digits of
/// the length header cap the framed length at `0xFFFF`.
pub const MAX_PAYLOAD_LEN: usize = 0xFFFF - 4;

/// Errors arising from pkt-line framing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A generic I/O error on the underlying stream.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The payload does not fit in a single frame.
    #[error("payload of {len} bytes exceeds the pkt-line frame limit")]
    PayloadTooLarge {
        /// Length of the rejected payload.
        len: usize,
    },
    /// The four length bytes were not valid hex, or declared a length of 3.
    #[error("invalid pkt-line length header {header:?}")]
    InvalidLength {
        /// Lossy rendering of the offending header bytes.
        header: String,
    },
    /// The stream ended in the middle of a frame.
    #[error("pkt-line stream ended inside a frame")]
    TruncatedFrame,
}

/// Encode `payload` as a single pkt-line frame: 4-byte lowercase hex length
/// of `payload.len() + 4`, then the payload.
///
/// ```
/// let frame = gittuf_transport_core::pktline::encode(b"hello\n").unwrap();
/// assert_eq!(frame, b"000ahello\n");
/// ```
pub fn encode(payload: &[u8]) -> Result<Vec<u8>, Error> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(Error::PayloadTooLarge { len: payload.len() });
    }
    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(format!("{:04x}", payload.len() + 4).as_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Read one whole frame (header and payload) from `reader`.
///
/// Sentinels come back as their 4-byte forms. A clean EOF between frames
/// yields `None`; EOF inside a frame is [`Error::TruncatedFrame`].
pub fn read_frame(reader: &mut impl Read) -> Result<Option<Vec<u8>>, Error> {
    let mut header = [0u8; 4];
    let mut filled = 0;
    while filled < 4 {
        match reader.read(&mut header[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => return Err(Error::TruncatedFrame),
            Ok(n) => filled += n,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        }
    }

    let len = parse_length(&header)?;
    if len <= 2 {
        // flush, delim, response-end
        return Ok(Some(header.to_vec()));
    }

    let mut frame = vec![0u8; len];
    frame[..4].copy_from_slice(&header);
    reader.read_exact(&mut frame[4..]).map_err(|err| {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::TruncatedFrame
        } else {
            Error::Io(err)
        }
    })?;
    Ok(Some(frame))
}

fn parse_length(header: &[u8; 4]) -> Result<usize, Error> {
    let invalid = || Error::InvalidLength {
        header: String::from_utf8_lossy(header).into_owned(),
    };
    let text = std::str::from_utf8(header).map_err(|_| invalid())?;
    let len = usize::from_str_radix(text, 16).map_err(|_| invalid())?;
    // 3 is the one value with no meaning: too short for a header, not a sentinel.
    if len == 3 {
        return Err(invalid());
    }
    Ok(len)
}

/// Whether `frame` is the flush sentinel.
pub fn is_flush(frame: &[u8]) -> bool {
    frame == FLUSH_PKT
}

/// Whether `frame` is the delimiter sentinel.
pub fn is_delim(frame: &[u8]) -> bool {
    frame == DELIM_PKT
}

/// Whether `frame` is the response-end sentinel.
pub fn is_response_end(frame: &[u8]) -> bool {
    frame == RESPONSE_END_PKT
}

/// The payload of a data frame, or `None` for sentinels and empty frames.
pub fn payload(frame: &[u8]) -> Option<&[u8]> {
    if frame.len() > 4 {
        Some(&frame[4..])
    } else {
        None
    }
}

/// Iterator-style reader over a pkt-line framed stream.
pub struct FrameReader<R> {
    inner: R,
}

impl<R: Read> FrameReader<R> {
    /// Create a reader over `inner`.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Read the next whole frame, or `None` at a clean end of stream.
    pub fn read_frame(&mut self) -> Result<Option<Vec<u8>>, Error> {
        read_frame(&mut self.inner)
    }

    /// Mutable access to the underlying reader.
    pub fn inner_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Consume the reader, returning the underlying stream.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_prefixes_framed_length() {
        assert_eq!(encode(b"hello\n").unwrap(), b"000ahello\n");
        assert_eq!(encode(b"").unwrap(), b"0004");
    }

    #[test]
    fn encode_rejects_oversized_payload() {
        let payload = vec![b'x'; MAX_PAYLOAD_LEN + 1];
        assert!(matches!(
            encode(&payload),
            Err(Error::PayloadTooLarge { len }) if len == MAX_PAYLOAD_LEN + 1
        ));
    }

    #[test]
    fn sentinels_pass_through_whole() {
        let mut stream: &[u8] = b"000000010002";
        assert_eq!(read_frame(&mut stream).unwrap().unwrap(), FLUSH_PKT);
        assert_eq!(read_frame(&mut stream).unwrap().unwrap(), DELIM_PKT);
        assert_eq!(read_frame(&mut stream).unwrap().unwrap(), RESPONSE_END_PKT);
        assert_eq!(read_frame(&mut stream).unwrap(), None);
    }

    #[test]
    fn partial_frame_is_an_error() {
        let mut stream: &[u8] = b"000ahel";
        assert!(matches!(read_frame(&mut stream), Err(Error::TruncatedFrame)));

        let mut stream: &[u8] = b"00";
        assert!(matches!(read_frame(&mut stream), Err(Error::TruncatedFrame)));
    }

    #[test]
    fn bad_length_header_is_an_error() {
        let mut stream: &[u8] = b"zzzzpayload";
        assert!(matches!(read_frame(&mut stream), Err(Error::InvalidLength { .. })));

        let mut stream: &[u8] = b"0003";
        assert!(matches!(read_frame(&mut stream), Err(Error::InvalidLength { .. })));
    }

    #[test]
    fn payload_skips_sentinels() {
        assert_eq!(payload(b"000ahello\n"), Some(&b"hello\n"[..]));
        assert_eq!(payload(FLUSH_PKT), None);
        assert_eq!(payload(RESPONSE_END_PKT), None);
        assert_eq!(payload(b"0004"), None);
    }
}
