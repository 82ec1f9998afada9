//! Scanner for Cyrex source text

use crate::token::{Token, TokenKind};
use cyrex_common::CyrexError;

fn keyword(word: &str) -> Option<TokenKind> {
    let kind = match word {
        "function" => TokenKind::Function,
        "return" => TokenKind::Return,
        "while" => TokenKind::While,
        "if" => TokenKind::If,
        "then" => TokenKind::Then,
        "do" => TokenKind::Do,
        "else" => TokenKind::Else,
        "var" => TokenKind::Var,
        "const" => TokenKind::Const,
        "inline" => TokenKind::Inline,
        "void" => TokenKind::Void,
        "char" => TokenKind::Char,
        "short" => TokenKind::Short,
        "int" => TokenKind::Int,
        "long" => TokenKind::Long,
        _ => return None,
    };
    Some(kind)
}

// Two-character operators must be tried before their one-character prefixes.
fn punctuation(bytes: &[u8]) -> Option<(TokenKind, usize)> {
    if bytes.len() >= 2 {
        let kind = match &bytes[..2] {
            b"<=" => Some(TokenKind::LesserOrEqual),
            b">=" => Some(TokenKind::GreaterOrEqual),
            b"==" => Some(TokenKind::Equal),
            b"!=" => Some(TokenKind::NotEqual),
            _ => None,
        };
        if let Some(kind) = kind {
            return Some((kind, 2));
        }
    }

    let kind = match bytes.first()? {
        b'(' => TokenKind::LeftParen,
        b')' => TokenKind::RightParen,
        b'[' => TokenKind::LeftBracket,
        b']' => TokenKind::RightBracket,
        b'{' => TokenKind::LeftBrace,
        b'}' => TokenKind::RightBrace,
        b':' => TokenKind::Colon,
        b',' => TokenKind::Comma,
        b'=' => TokenKind::Assign,
        b'&' => TokenKind::And,
        b'|' => TokenKind::Or,
        b'^' => TokenKind::Xor,
        b'!' => TokenKind::Not,
        b'+' => TokenKind::Plus,
        b'-' => TokenKind::Minus,
        b'*' => TokenKind::Star,
        b'/' => TokenKind::Slash,
        b'<' => TokenKind::Lesser,
        b'>' => TokenKind::Greater,
        _ => return None,
    };
    Some((kind, 1))
}

fn is_identifier_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_identifier_continue(b: u8) -> bool {
    is_identifier_start(b) || b.is_ascii_digit()
}

/// Scan `source` into tokens, accumulating lexical errors.
pub fn tokenize(source: &str) -> Result<Vec<Token>, Vec<CyrexError>> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let b = bytes[pos];

        if b.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        if b.is_ascii_digit() {
            let start = pos;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            tokens.push(Token::new(TokenKind::Number, &source[start..pos]));
            continue;
        }

        if is_identifier_start(b) {
            let start = pos;
            while pos < bytes.len() && is_identifier_continue(bytes[pos]) {
                pos += 1;
            }
            let word = &source[start..pos];
            let kind = keyword(word).unwrap_or(TokenKind::Identifier);
            tokens.push(Token::new(kind, word));
            continue;
        }

        if b == b'"' {
            let start = pos + 1;
            let mut end = start;
            while end < bytes.len() && bytes[end] != b'"' {
                end += 1;
            }
            if end == bytes.len() {
                errors.push(CyrexError::lex("unterminated string"));
                break;
            }
            tokens.push(Token::new(TokenKind::Str, &source[start..end]));
            pos = end + 1;
            continue;
        }

        if let Some((kind, len)) = punctuation(&bytes[pos..]) {
            tokens.push(Token::new(kind, &source[pos..pos + len]));
            pos += len;
            continue;
        }

        errors.push(CyrexError::lex(format!(
            "unexpected character '{}'",
            bytes[pos] as char
        )));
        pos += 1;
    }

    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}
