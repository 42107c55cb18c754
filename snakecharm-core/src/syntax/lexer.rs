//! Lexer for the supported Python expression subset.
//!
//! Produces a flat token stream with byte offsets into the source. Newlines
//! inside brackets are implicit line joins and never reach the parser.

use crate::errors::ParseError;
use crate::syntax::literal::{is_identifier_continue, is_identifier_start};

/// Kinds of tokens the lexer can emit.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Identifier or keyword.
    Name(String),
    Int(i64),
    /// Integer literal outside the `i64` range, kept verbatim.
    BigInt,
    /// Float or imaginary literal, kept verbatim.
    Float,
    Str(String),
    Bytes(Vec<u8>),
    Op(&'static str),
    Newline,
    Eof,
}

/// A token with its byte span in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

const OPERATORS_3: &[&str] = &["..."];
const OPERATORS_2: &[&str] = &["**", "//", "<<", ">>", "<=", ">=", "==", "!=", "->", ":="];
const OPERATORS_1: &[&str] = &[
    "+", "-", "*", "/", "%", "@", "&", "|", "^", "~", "<", ">", "(", ")", "[", "]", "{", "}",
    ",", ":", ".", ";", "=",
];

pub struct Lexer<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
    depth: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().collect(),
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).map(|&(_, c)| c)
    }

    fn offset(&self) -> usize {
        self.chars.get(self.pos).map_or(self.source.len(), |&(i, _)| i)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens: Vec<Token> = Vec::new();
        loop {
            self.skip_trivia()?;
            let start = self.offset();
            let Some(c) = self.peek() else {
                tokens.push(Token { kind: TokenKind::Eof, start, end: start });
                return Ok(tokens);
            };

            if c == '\n' {
                self.advance();
                if self.depth == 0 && !matches!(tokens.last(), None | Some(Token { kind: TokenKind::Newline, .. })) {
                    tokens.push(Token { kind: TokenKind::Newline, start, end: self.offset() });
                }
                continue;
            }

            let token = if c.is_ascii_digit() || (c == '.' && self.peek_at(1).is_some_and(|n| n.is_ascii_digit())) {
                self.lex_number(start)?
            } else if c == '\'' || c == '"' {
                self.lex_string(start, "")?
            } else if is_identifier_start(c) {
                self.lex_name(start)?
            } else {
                self.lex_operator(start)?
            };
            tokens.push(token);
        }
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\x0c' | '\r' => {
                    self.advance();
                }
                '\n' if self.depth > 0 => {
                    self.advance();
                }
                '#' => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                }
                '\\' => {
                    if self.peek_at(1) == Some('\n') {
                        self.pos += 2;
                    } else if self.peek_at(1) == Some('\r') && self.peek_at(2) == Some('\n') {
                        self.pos += 3;
                    } else {
                        return Err(ParseError::new("unexpected character after line continuation", self.offset()));
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn lex_name(&mut self, start: usize) -> Result<Token, ParseError> {
        while self.peek().is_some_and(is_identifier_continue) {
            self.advance();
        }
        let end = self.offset();
        let word = &self.source[start..end];

        if matches!(self.peek(), Some('\'') | Some('"')) {
            let prefix = word.to_ascii_lowercase();
            if prefix.contains('f') && prefix.len() <= 2 && prefix.chars().all(|c| matches!(c, 'f' | 'r')) {
                return Err(ParseError::new("f-strings are not supported", start));
            }
            if matches!(prefix.as_str(), "r" | "u" | "b" | "br" | "rb") {
                return self.lex_string(start, &prefix);
            }
        }

        Ok(Token { kind: TokenKind::Name(word.to_string()), start, end })
    }

    fn lex_operator(&mut self, start: usize) -> Result<Token, ParseError> {
        let rest = &self.source[start..];
        for table in [OPERATORS_3, OPERATORS_2, OPERATORS_1] {
            if let Some(op) = table.iter().find(|op| rest.starts_with(**op)) {
                self.pos += op.chars().count();
                match *op {
                    "(" | "[" | "{" => self.depth += 1,
                    ")" | "]" | "}" => self.depth = self.depth.saturating_sub(1),
                    _ => {}
                }
                return Ok(Token { kind: TokenKind::Op(op), start, end: self.offset() });
            }
        }
        let c = rest.chars().next().unwrap_or('\0');
        Err(ParseError::new(format!("unexpected character {c:?}"), start))
    }

    fn lex_number(&mut self, start: usize) -> Result<Token, ParseError> {
        let radix = match (self.peek(), self.peek_at(1)) {
            (Some('0'), Some('x' | 'X')) => Some(16),
            (Some('0'), Some('o' | 'O')) => Some(8),
            (Some('0'), Some('b' | 'B')) => Some(2),
            _ => None,
        };

        if let Some(radix) = radix {
            self.pos += 2;
            let digits_start = self.offset();
            while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
                self.advance();
            }
            let end = self.offset();
            let digits: String = self.source[digits_start..end].chars().filter(|&c| c != '_').collect();
            if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
                return Err(ParseError::new("invalid integer literal", start));
            }
            let kind = i64::from_str_radix(&digits, radix).map_or(TokenKind::BigInt, TokenKind::Int);
            return Ok(Token { kind, start, end });
        }

        let mut is_float = false;
        self.eat_digits();
        if self.peek() == Some('.') && self.peek_at(1) != Some('.') {
            is_float = true;
            self.advance();
            self.eat_digits();
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let signed = matches!(self.peek_at(1), Some('+' | '-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.pos += digit_at;
                self.eat_digits();
            }
        }
        if matches!(self.peek(), Some('j' | 'J')) {
            is_float = true;
            self.advance();
        }
        let end = self.offset();
        if self.peek().is_some_and(is_identifier_start) {
            return Err(ParseError::new("invalid decimal literal", start));
        }
        if is_float {
            return Ok(Token { kind: TokenKind::Float, start, end });
        }

        let digits: String = self.source[start..end].chars().filter(|&c| c != '_').collect();
        if digits.len() > 1 && digits.starts_with('0') && digits.chars().any(|c| c != '0') {
            return Err(ParseError::new("leading zeros in decimal integer literals are not permitted", start));
        }
        let kind = digits.parse::<i64>().map_or(TokenKind::BigInt, TokenKind::Int);
        Ok(Token { kind, start, end })
    }

    fn eat_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '_') {
            self.advance();
        }
    }

    fn lex_string(&mut self, start: usize, prefix: &str) -> Result<Token, ParseError> {
        let raw = prefix.contains('r');
        let bytes = prefix.contains('b');
        let quote = self.advance().ok_or_else(|| ParseError::new("expected string quote", start))?;
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.pos += 2;
        }

        let mut value = String::new();
        loop {
            let Some(c) = self.advance() else {
                return Err(ParseError::new("unterminated string literal", start));
            };
            match c {
                c if c == quote => {
                    if !triple {
                        break;
                    }
                    if self.peek() == Some(quote) && self.peek_at(1) == Some(quote) {
                        self.pos += 2;
                        break;
                    }
                    value.push(c);
                }
                '\n' if !triple => return Err(ParseError::new("unterminated string literal", start)),
                '\\' if raw => {
                    value.push('\\');
                    if let Some(next) = self.advance() {
                        value.push(next);
                    }
                }
                '\\' => self.lex_escape(&mut value, bytes, start)?,
                c => value.push(c),
            }
        }

        let end = self.offset();
        if bytes {
            let mut out = Vec::with_capacity(value.len());
            for c in value.chars() {
                let cp = c as u32;
                if cp > 0xff {
                    return Err(ParseError::new("bytes can only contain ASCII literal characters", start));
                }
                out.push(cp as u8);
            }
            return Ok(Token { kind: TokenKind::Bytes(out), start, end });
        }
        Ok(Token { kind: TokenKind::Str(value), start, end })
    }

    fn lex_escape(&mut self, value: &mut String, bytes: bool, start: usize) -> Result<(), ParseError> {
        let Some(c) = self.advance() else {
            return Err(ParseError::new("unterminated string literal", start));
        };
        match c {
            '\n' => {}
            '\\' => value.push('\\'),
            '\'' => value.push('\''),
            '"' => value.push('"'),
            'a' => value.push('\x07'),
            'b' => value.push('\x08'),
            'f' => value.push('\x0c'),
            'n' => value.push('\n'),
            'r' => value.push('\r'),
            't' => value.push('\t'),
            'v' => value.push('\x0b'),
            '0'..='7' => {
                let mut code = c.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match self.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            code = code * 8 + d;
                            self.advance();
                        }
                        None => break,
                    }
                }
                if bytes && code > 0xff {
                    return Err(ParseError::new("octal escape value out of range for bytes", start));
                }
                value.push(self.code_point(code, start)?);
            }
            'x' => {
                let code = self.hex_digits(2, start)?;
                value.push(self.code_point(code, start)?);
            }
            'u' if !bytes => {
                let code = self.hex_digits(4, start)?;
                value.push(self.code_point(code, start)?);
            }
            'U' if !bytes => {
                let code = self.hex_digits(8, start)?;
                value.push(self.code_point(code, start)?);
            }
            'N' if !bytes => return Err(ParseError::new("named unicode escapes are not supported", start)),
            other => {
                value.push('\\');
                value.push(other);
            }
        }
        Ok(())
    }

    fn hex_digits(&mut self, count: usize, start: usize) -> Result<u32, ParseError> {
        let mut code = 0u32;
        for _ in 0..count {
            let digit = self
                .peek()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| ParseError::new("truncated hexadecimal escape", start))?;
            code = code * 16 + digit;
            self.advance();
        }
        Ok(code)
    }

    fn code_point(&self, code: u32, start: usize) -> Result<char, ParseError> {
        char::from_u32(code).ok_or_else(|| ParseError::new(format!("illegal code point {code:#x} in escape"), start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).tokenize().unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn numbers_in_every_base() {
        assert_eq!(
            kinds("10 0x1f 0o17 0b101 1_000"),
            vec![
                TokenKind::Int(10),
                TokenKind::Int(31),
                TokenKind::Int(15),
                TokenKind::Int(5),
                TokenKind::Int(1000),
                TokenKind::Eof
            ]
        );
        assert_eq!(kinds("1.5 2e3 3j"), vec![TokenKind::Float, TokenKind::Float, TokenKind::Float, TokenKind::Eof]);
    }

    #[test]
    fn integers_beyond_i64_stay_verbatim() {
        let tokens = Lexer::new("18446744073709551616 0xffffffffffffffffff").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::BigInt);
        assert_eq!((tokens[0].start, tokens[0].end), (0, 20));
        assert_eq!(tokens[1].kind, TokenKind::BigInt);
        assert_eq!(kinds("9223372036854775807")[0], TokenKind::Int(i64::MAX));
        assert!(Lexer::new("0x").tokenize().is_err());
        assert!(Lexer::new("0b12").tokenize().is_err());
    }

    #[test]
    fn leading_zero_is_rejected() {
        assert!(Lexer::new("010").tokenize().is_err());
        assert!(Lexer::new("000").tokenize().is_ok());
    }

    #[test]
    fn string_escapes_are_decoded() {
        assert_eq!(kinds(r"'\x41\né'")[0], TokenKind::Str("A\né".into()));
        assert_eq!(kinds(r"'\101'")[0], TokenKind::Str("A".into()));
        assert_eq!(kinds(r"r'\n'")[0], TokenKind::Str("\\n".into()));
        assert_eq!(kinds(r"'\q'")[0], TokenKind::Str("\\q".into()));
        assert_eq!(kinds(r"b'\x00m'")[0], TokenKind::Bytes(vec![0, b'm']));
        assert_eq!(kinds("'''a'b'''")[0], TokenKind::Str("a'b".into()));
    }

    #[test]
    fn fstrings_and_unterminated_strings_fail() {
        assert!(Lexer::new("f'{x}'").tokenize().is_err());
        assert!(Lexer::new("'abc").tokenize().is_err());
    }

    #[test]
    fn newlines_inside_brackets_are_joined() {
        assert_eq!(
            kinds("f(\n1)\n2"),
            vec![
                TokenKind::Name("f".into()),
                TokenKind::Op("("),
                TokenKind::Int(1),
                TokenKind::Op(")"),
                TokenKind::Newline,
                TokenKind::Int(2),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn unicode_identifiers() {
        assert_eq!(kinds("𝒄hr")[0], TokenKind::Name("𝒄hr".into()));
        assert_eq!(kinds("_\u{FF3F}import")[0], TokenKind::Name("_\u{FF3F}import".into()));
    }
}
