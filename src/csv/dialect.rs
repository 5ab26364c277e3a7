//! Field quoting/escaping and raw line splitting shared by the reader and
//! writer.
//!
//! Double-quote-doubling only — no backslash escape option. The design
//! notes flag the upstream backslash-escape character as a latent conflict
//! with RFC-4180 quote-doubling; this port never offers it.

pub const QUOTE: u8 = b'"';

/// Delimiters tried by [`crate::csv::detect_delimiter`], in priority order.
pub const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Encodes one row as a single CSV line (no trailing newline) using
/// `delimiter`, double-quote quoting, and quote doubling.
pub fn encode_row(fields: &[String], delimiter: u8) -> Vec<u8> {
    let mut buffer = Vec::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            buffer.push(delimiter);
        }
        encode_field(field, delimiter, &mut buffer);
    }
    buffer
}

fn encode_field(field: &str, delimiter: u8, buffer: &mut Vec<u8>) {
    if needs_quoting(field, delimiter) {
        buffer.push(QUOTE);
        for byte in field.bytes() {
            if byte == QUOTE {
                buffer.push(QUOTE);
                buffer.push(QUOTE);
            } else {
                buffer.push(byte);
            }
        }
        buffer.push(QUOTE);
    } else {
        buffer.extend_from_slice(field.as_bytes());
    }
}

fn needs_quoting(field: &str, delimiter: u8) -> bool {
    field
        .bytes()
        .any(|b| b == delimiter || b == QUOTE || b == b'\n' || b == b'\r')
}

/// Splits one already-dequoted-boundary-aware logical CSV record (which may
/// itself contain embedded newlines inside quotes) into its fields.
pub fn parse_record(record: &str, delimiter: u8) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = record.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch as u32 == QUOTE as u32 {
            if in_quotes {
                if chars.peek() == Some(&(QUOTE as char)) {
                    current.push(QUOTE as char);
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                in_quotes = true;
            }
        } else if ch as u8 == delimiter && !in_quotes {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    fields.push(current);
    fields
}

/// Strips a leading UTF-8 BOM (`EF BB BF`) from `bytes`, if present.
pub fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_simple_row() {
        let fields = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(encode_row(&fields, b','), b"a,b,c");
    }

    #[test]
    fn quotes_fields_with_delimiter() {
        let fields = vec!["a,b".to_string(), "c".to_string()];
        assert_eq!(encode_row(&fields, b','), br#""a,b",c"#);
    }

    #[test]
    fn doubles_embedded_quotes() {
        let fields = vec![r#"Say "Hello""#.to_string(), "world".to_string()];
        assert_eq!(encode_row(&fields, b','), br#""Say ""Hello""",world"#);
    }

    #[test]
    fn parses_quoted_record_with_embedded_delimiter() {
        assert_eq!(parse_record(r#""a,b",c"#, b','), vec!["a,b", "c"]);
    }

    #[test]
    fn parses_escaped_quotes() {
        assert_eq!(
            parse_record(r#""Say ""Hello""",world"#, b','),
            vec![r#"Say "Hello""#, "world"]
        );
    }

    #[test]
    fn parses_custom_delimiter() {
        assert_eq!(parse_record(r#"a;"b;c";d"#, b';'), vec!["a", "b;c", "d"]);
    }

    #[test]
    fn strips_bom() {
        let bytes = [0xEF, 0xBB, 0xBF, b'a', b'b'];
        assert_eq!(strip_bom(&bytes), b"ab");
        assert_eq!(strip_bom(b"ab"), b"ab");
    }
}
