//! Write-value encoding.

use crate::error::{ErrorKind, Result};

/// Text encoding for [`encode_text`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextEncoding {
    #[default]
    Utf8,
    /// ISO-8859-1: one byte per scalar value, up to U+00FF.
    Latin1,
}

/// Encodes a string for a characteristic write. Latin-1 rejects any
/// character above U+00FF rather than mangling it.
pub fn encode_text(text: &str, encoding: TextEncoding) -> Result<Vec<u8>> {
    match encoding {
        TextEncoding::Utf8 => Ok(text.as_bytes().to_vec()),
        TextEncoding::Latin1 => text
            .chars()
            .map(|c| {
                let code = c as u32;
                if code <= 0xff {
                    Ok(code as u8)
                } else {
                    Err(ErrorKind::InvalidValue.into())
                }
            })
            .collect(),
    }
}

/// Parses a comma-separated list of byte literals, e.g. `"0x01,0x02"` or
/// `"1,2,255"`. Each entry may be hex (`0x` prefix) or decimal.
pub fn parse_byte_list(text: &str) -> Result<Vec<u8>> {
    text.split(',')
        .map(|entry| {
            let entry = entry.trim();
            let parsed = match entry.strip_prefix("0x").or_else(|| entry.strip_prefix("0X")) {
                Some(hex) => u8::from_str_radix(hex, 16),
                None => entry.parse(),
            };
            parsed.map_err(|_| ErrorKind::InvalidValue.into())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_round_trips() {
        assert_eq!(
            encode_text("héllo", TextEncoding::Utf8).unwrap(),
            "héllo".as_bytes()
        );
    }

    #[test]
    fn latin1_encodes_one_byte_per_char() {
        assert_eq!(
            encode_text("héllo", TextEncoding::Latin1).unwrap(),
            vec![0x68, 0xe9, 0x6c, 0x6c, 0x6f]
        );
    }

    #[test]
    fn latin1_rejects_wide_chars() {
        assert_eq!(
            encode_text("héllo €", TextEncoding::Latin1)
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidValue
        );
    }

    #[test]
    fn parses_mixed_byte_list() {
        assert_eq!(
            parse_byte_list("0x01, 0X0a, 255").unwrap(),
            vec![0x01, 0x0a, 0xff]
        );
    }

    #[test]
    fn rejects_out_of_range_byte() {
        assert!(parse_byte_list("256").is_err());
        assert!(parse_byte_list("0x1ff").is_err());
        assert!(parse_byte_list("").is_err());
    }
}
