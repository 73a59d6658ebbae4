//! Windows-1251 text codec.
//!
//! The roster file is shared with the reporting tool, which reads it as
//! Windows-1251. Uploaded rosters may arrive in either that encoding or UTF-8.

use encoding_rs::{EncoderResult, WINDOWS_1251};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub fn decode_cp1251(bytes: &[u8]) -> String {
    WINDOWS_1251
        .decode_without_bom_handling(bytes)
        .0
        .into_owned()
}

/// Encodes `text` as Windows-1251. Characters the code page lacks become `?`.
pub fn encode_cp1251(text: &str) -> Vec<u8> {
    let mut encoder = WINDOWS_1251.new_encoder();
    let mut out = Vec::with_capacity(text.len());
    let mut buf = [0u8; 1024];
    let mut rest = text;
    loop {
        let (result, read, written) =
            encoder.encode_from_utf8_without_replacement(rest, &mut buf, true);
        out.extend_from_slice(&buf[..written]);
        rest = &rest[read..];
        match result {
            EncoderResult::InputEmpty => return out,
            EncoderResult::OutputFull => {}
            EncoderResult::Unmappable(_) => out.push(b'?'),
        }
    }
}

/// Decodes text of unknown encoding: valid UTF-8 (with or without BOM) is
/// taken as is, anything else is read as Windows-1251.
pub fn decode_text(bytes: &[u8]) -> String {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(body) {
        Ok(text) => text.to_string(),
        Err(_) => decode_cp1251(bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cyrillic_round_trip() {
        let text = "Иванов Пётр;ЭСК;Ёжик №5 «склад»";
        let bytes = encode_cp1251(text);
        assert_eq!(bytes.len(), text.chars().count());
        assert_eq!(decode_cp1251(&bytes), text);
    }

    #[test]
    fn test_known_bytes() {
        assert_eq!(encode_cp1251("Аая"), vec![0xC0, 0xE0, 0xFF]);
        assert_eq!(encode_cp1251("Ёё№"), vec![0xA8, 0xB8, 0xB9]);
        assert_eq!(encode_cp1251("€"), vec![0x88]);
    }

    #[test]
    fn test_unmappable_becomes_question_mark() {
        assert_eq!(encode_cp1251("a😀ß"), b"a??".to_vec());
    }

    #[test]
    fn test_long_text_spans_encoder_buffers() {
        let text = "Ж".repeat(3000);
        let bytes = encode_cp1251(&text);
        assert_eq!(bytes.len(), 3000);
        assert!(bytes.iter().all(|&b| b == 0xC6));
        assert_eq!(decode_cp1251(&bytes), text);
    }

    #[test]
    fn test_decode_text_detects_encoding() {
        let utf8 = "код;компания".as_bytes();
        assert_eq!(decode_text(utf8), "код;компания");

        let mut with_bom = UTF8_BOM.to_vec();
        with_bom.extend_from_slice(utf8);
        assert_eq!(decode_text(&with_bom), "код;компания");

        let cp1251 = encode_cp1251("код;компания");
        assert_eq!(decode_text(&cp1251), "код;компания");
    }
}
