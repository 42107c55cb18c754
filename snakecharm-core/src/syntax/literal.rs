//! Python literal helpers: quoting, escapes, identifiers and keywords.

use lazy_static::lazy_static;
use std::collections::HashSet;

lazy_static! {
    static ref KEYWORDS: HashSet<&'static str> = [
        "False", "None", "True", "and", "as", "assert", "async", "await", "break",
        "class", "continue", "def", "del", "elif", "else", "except", "finally",
        "for", "from", "global", "if", "import", "in", "is", "lambda", "nonlocal",
        "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
    ]
    .into_iter()
    .collect();
}

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(word)
}

pub fn is_identifier_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

pub fn is_identifier_continue(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '\u{203F}' | '\u{2040}' | '\u{FE33}' | '\u{FE34}' | '\u{FE4D}'..='\u{FE4F}' | '\u{FF3F}')
}

/// True for a non-keyword identifier.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_identifier_start(c) => chars.all(is_identifier_continue) && !is_keyword(s),
        _ => false,
    }
}

/// True for an identifier made only of ASCII characters.
pub fn is_ascii_identifier(s: &str) -> bool {
    s.is_ascii() && is_identifier(s)
}

/// Approximation of `str.isprintable` for a single character.
pub fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    if c.is_control() || c.is_whitespace() {
        return false;
    }
    !matches!(c as u32,
        0x00AD
        | 0x0600..=0x0605
        | 0x061C
        | 0x06DD
        | 0x070F
        | 0x180E
        | 0x200B..=0x200F
        | 0x202A..=0x202E
        | 0x2060..=0x206F
        | 0xD800..=0xF8FF
        | 0xFEFF
        | 0xFFF9..=0xFFFB
        | 0xE0001
        | 0xE0020..=0xE007F
        | 0xF0000..=0x10FFFF)
}

fn push_escaped(out: &mut String, c: char, quote: char) {
    match c {
        '\\' => out.push_str("\\\\"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        c if c == quote => {
            out.push('\\');
            out.push(c);
        }
        c if is_printable(c) => out.push(c),
        c => {
            let cp = c as u32;
            if cp < 0x100 {
                out.push_str(&format!("\\x{cp:02x}"));
            } else if cp < 0x10000 {
                out.push_str(&format!("\\u{cp:04x}"));
            } else {
                out.push_str(&format!("\\U{cp:08x}"));
            }
        }
    }
}

/// Quotes `s` with `quote`, escaping what a Python string literal needs.
pub fn quote_with(s: &str, quote: char) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        push_escaped(&mut out, c, quote);
    }
    out.push(quote);
    out
}

/// `repr(s)` as CPython prints it.
pub fn py_repr(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    quote_with(s, quote)
}

/// `repr(b)` for a bytes value.
pub fn bytes_repr(bytes: &[u8]) -> String {
    let quote = if bytes.contains(&b'\'') && !bytes.contains(&b'"') { b'"' } else { b'\'' };
    let mut out = String::from("b");
    out.push(quote as char);
    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            b if b == quote => {
                out.push('\\');
                out.push(b as char);
            }
            0x20..=0x7e => out.push(b as char),
            b => out.push_str(&format!("\\x{b:02x}")),
        }
    }
    out.push(quote as char);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repr_matches_python() {
        assert_eq!(py_repr("abc"), "'abc'");
        assert_eq!(py_repr("it's"), "\"it's\"");
        assert_eq!(py_repr("'\""), "'\\'\"'");
        assert_eq!(py_repr("\n"), "'\\n'");
        assert_eq!(py_repr("\u{13}"), "'\\x13'");
        assert_eq!(py_repr("\u{7f}"), "'\\x7f'");
        assert_eq!(py_repr("ߨ"), "'ߨ'");
        assert_eq!(py_repr("a\\b"), "'a\\\\b'");
    }

    #[test]
    fn bytes_repr_matches_python() {
        assert_eq!(bytes_repr(b"m"), "b'm'");
        assert_eq!(bytes_repr(b"'"), "b\"'\"");
        assert_eq!(bytes_repr(&[0, 255]), "b'\\x00\\xff'");
    }

    #[test]
    fn identifiers_and_keywords() {
        assert!(is_identifier("macr0phag3"));
        assert!(is_identifier("__import__"));
        assert!(is_identifier("𝒂bc"));
        assert!(!is_identifier("0abc"));
        assert!(!is_identifier("for"));
        assert!(!is_ascii_identifier("𝒂bc"));
        assert!(is_identifier("_\u{FF3F}import"));
    }
}
