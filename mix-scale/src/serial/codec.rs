//! Line framing for scale output
//!
//! Scales terminate readings with CR/LF or a bare LF. A run of bytes with no
//! delimiter (wrong baud rate, a firmware dump) is skipped up to the next
//! delimiter instead of failing the stream.

use tokio_util::bytes::{Bytes, BytesMut};
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, Decoder};

/// Longest line kept before it is discarded as noise
pub const MAX_LINE_LEN: usize = 256;

pub struct ScaleLineCodec {
    inner: AnyDelimiterCodec,
}

impl ScaleLineCodec {
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_LEN)
    }

    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            inner: AnyDelimiterCodec::new_with_max_length(
                b"\r\n".to_vec(),
                b"\n".to_vec(),
                max_length,
            ),
        }
    }
}

impl Default for ScaleLineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ScaleLineCodec {
    type Item = Bytes;
    type Error = AnyDelimiterCodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Bytes>, Self::Error> {
        loop {
            match self.inner.decode(buf) {
                // the inner codec is now discarding up to the next delimiter
                Err(AnyDelimiterCodecError::MaxChunkLengthExceeded) => {
                    tracing::trace!("Dropping overlong serial line");
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(codec: &mut ScaleLineCodec, buf: &mut BytesMut) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(chunk) = codec.decode(buf).unwrap() {
            if !chunk.is_empty() {
                out.push(String::from_utf8_lossy(&chunk).into_owned());
            }
        }
        out
    }

    #[test]
    fn test_splits_on_crlf_and_lf() {
        let mut codec = ScaleLineCodec::new();
        let mut buf = BytesMut::from(&b"S S 1 g\r\nS S 2 g\nS S 3"[..]);
        assert_eq!(lines(&mut codec, &mut buf), vec!["S S 1 g", "S S 2 g"]);

        buf.extend_from_slice(b" g\r\n");
        assert_eq!(lines(&mut codec, &mut buf), vec!["S S 3 g"]);
    }

    #[test]
    fn test_overlong_run_is_skipped() {
        let mut codec = ScaleLineCodec::with_max_length(16);
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[b'#'; 40]);
        buf.extend_from_slice(b"\r\nST,GS,+  12.5 g\r\n");

        assert_eq!(lines(&mut codec, &mut buf), vec!["ST,GS,+  12.5 g"]);
    }

    #[test]
    fn test_noise_split_across_reads() {
        let mut codec = ScaleLineCodec::with_max_length(16);
        let mut buf = BytesMut::from(&[b'#'; 30][..]);
        assert!(lines(&mut codec, &mut buf).is_empty());

        buf.extend_from_slice(&[b'#'; 30]);
        buf.extend_from_slice(b"\nS S 7 g\n");
        assert_eq!(lines(&mut codec, &mut buf), vec!["S S 7 g"]);
    }
}
