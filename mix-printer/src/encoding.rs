//! Windows-1252 handling for legacy print streams
//!
//! Legacy Windows applications print with the ANSI code page, so raw
//! streams are always decoded one byte per character. Spool files may
//! come from newer tools and are checked for UTF-8 first.

use encoding_rs::{UTF_8, WINDOWS_1252};
use tracing::instrument;

/// Decode a raw print stream. Never fails; every byte maps to one char.
pub fn decode_windows_1252(bytes: &[u8]) -> String {
    let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
    text.into_owned()
}

/// Decode a spool file: UTF-8 (BOM stripped) when valid, Windows-1252 otherwise
pub fn decode_spool(bytes: &[u8]) -> String {
    let (text, had_errors) = UTF_8.decode_with_bom_removal(bytes);
    if had_errors {
        decode_windows_1252(bytes)
    } else {
        text.into_owned()
    }
}

/// Convert a captured job to the bytes a legacy application would send
///
/// Valid UTF-8 with non-ASCII characters is re-encoded to Windows-1252.
/// Anything else is passed through untouched.
#[instrument(skip(bytes), fields(len = bytes.len()))]
pub fn to_windows_1252(bytes: &[u8]) -> Vec<u8> {
    if bytes.is_ascii() {
        return bytes.to_vec();
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => {
            let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
            let (encoded, _, unmappable) = WINDOWS_1252.encode(text);
            if unmappable {
                tracing::warn!("Some characters have no Windows-1252 mapping");
            }
            encoded.into_owned()
        }
        Err(_) => bytes.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_windows_1252() {
        assert_eq!(decode_windows_1252(b"F\xF3rmula N\xBA: 12"), "Fórmula Nº: 12");
        assert_eq!(decode_windows_1252(b"\x80 5"), "€ 5");
        // one char per byte, even for bytes that would start UTF-8 sequences
        assert_eq!(decode_windows_1252(b"\xC3\xB3").chars().count(), 2);
    }

    #[test]
    fn test_decode_spool() {
        assert_eq!(decode_spool("Fórmula".as_bytes()), "Fórmula");
        assert_eq!(decode_spool(b"\xEF\xBB\xBFReceta"), "Receta");
        assert_eq!(decode_spool(b"F\xF3rmula"), "Fórmula");
    }

    #[test]
    fn test_to_windows_1252() {
        assert_eq!(to_windows_1252("Fórmula".as_bytes()), b"F\xF3rmula".to_vec());
        assert_eq!(to_windows_1252(b"plain"), b"plain".to_vec());
        // already 1252, not valid UTF-8
        assert_eq!(to_windows_1252(b"F\xF3rmula"), b"F\xF3rmula".to_vec());
    }
}
