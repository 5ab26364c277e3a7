//! Removes code points that are not legal inside XML 1.0 text content.

/// Strips every code point outside the XML 1.0 legal character set from
/// `text`, leaving everything else untouched.
///
/// Legal ranges: `U+0009`, `U+000A`, `U+000D`, `U+0020..=U+D7FF`,
/// `U+E000..=U+FFFD`, `U+10000..=U+10FFFF`.
pub fn sanitize(text: &str) -> String {
    text.chars().filter(|&c| is_xml_legal(c)).collect()
}

/// Decodes `bytes` as UTF-8, dropping invalid sequences, then sanitizes the
/// result. Used on the write path when a CSV field's bytes aren't
/// guaranteed-valid UTF-8 by the caller.
pub fn sanitize_bytes(bytes: &[u8]) -> String {
    let lossy = String::from_utf8_lossy(bytes);
    sanitize(&lossy)
}

fn is_xml_legal(c: char) -> bool {
    matches!(c,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}'
    )
}
