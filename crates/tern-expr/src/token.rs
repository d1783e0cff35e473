//! One-pass scanner.

use crate::error::ExprError;
use std::fmt;

/// A lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Integer literal (decimal or `0x` hexadecimal).
    Int(i64),
    /// Bare identifier: alphanumerics plus `_`.
    Ident(String),
    /// Double-quoted string literal with `\\` and `\"` escapes.
    Str(String),
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    /// `<=`
    Le,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `!`
    Not,
    /// `(`
    LParen,
    /// `)`
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Ident(s) => write!(f, "{s}"),
            Self::Str(s) => write!(f, "\"{s}\""),
            Self::AndAnd => write!(f, "&&"),
            Self::OrOr => write!(f, "||"),
            Self::EqEq => write!(f, "=="),
            Self::NotEq => write!(f, "!="),
            Self::Le => write!(f, "<="),
            Self::Ge => write!(f, ">="),
            Self::Lt => write!(f, "<"),
            Self::Gt => write!(f, ">"),
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
            Self::Star => write!(f, "*"),
            Self::Slash => write!(f, "/"),
            Self::Not => write!(f, "!"),
            Self::LParen => write!(f, "("),
            Self::RParen => write!(f, ")"),
        }
    }
}

/// A token with its byte offset in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    /// The token.
    pub token: Token,
    /// Byte offset of the token's first character.
    pub position: usize,
}

/// Scan `input` into tokens. Whitespace separates tokens and is dropped.
pub fn lex(input: &str) -> Result<Vec<Spanned>, ExprError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        match c {
            b' ' | b'\t' | b'\n' | b'\r' => {
                pos += 1;
            }
            b'(' => {
                tokens.push(Spanned {
                    token: Token::LParen,
                    position: pos,
                });
                pos += 1;
            }
            b')' => {
                tokens.push(Spanned {
                    token: Token::RParen,
                    position: pos,
                });
                pos += 1;
            }
            b'+' => {
                tokens.push(Spanned {
                    token: Token::Plus,
                    position: pos,
                });
                pos += 1;
            }
            b'-' => {
                tokens.push(Spanned {
                    token: Token::Minus,
                    position: pos,
                });
                pos += 1;
            }
            b'*' => {
                tokens.push(Spanned {
                    token: Token::Star,
                    position: pos,
                });
                pos += 1;
            }
            b'/' => {
                tokens.push(Spanned {
                    token: Token::Slash,
                    position: pos,
                });
                pos += 1;
            }
            b'&' => {
                if bytes.get(pos + 1) == Some(&b'&') {
                    tokens.push(Spanned {
                        token: Token::AndAnd,
                        position: pos,
                    });
                    pos += 2;
                } else {
                    return Err(ExprError::Lex {
                        position: pos,
                        reason: "single `&`; did you mean `&&`?".to_string(),
                    });
                }
            }
            b'|' => {
                if bytes.get(pos + 1) == Some(&b'|') {
                    tokens.push(Spanned {
                        token: Token::OrOr,
                        position: pos,
                    });
                    pos += 2;
                } else {
                    return Err(ExprError::Lex {
                        position: pos,
                        reason: "single `|`; did you mean `||`?".to_string(),
                    });
                }
            }
            b'=' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    tokens.push(Spanned {
                        token: Token::EqEq,
                        position: pos,
                    });
                    pos += 2;
                } else {
                    return Err(ExprError::Lex {
                        position: pos,
                        reason: "single `=`; did you mean `==`?".to_string(),
                    });
                }
            }
            b'!' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    tokens.push(Spanned {
                        token: Token::NotEq,
                        position: pos,
                    });
                    pos += 2;
                } else {
                    tokens.push(Spanned {
                        token: Token::Not,
                        position: pos,
                    });
                    pos += 1;
                }
            }
            b'<' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    tokens.push(Spanned {
                        token: Token::Le,
                        position: pos,
                    });
                    pos += 2;
                } else {
                    tokens.push(Spanned {
                        token: Token::Lt,
                        position: pos,
                    });
                    pos += 1;
                }
            }
            b'>' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    tokens.push(Spanned {
                        token: Token::Ge,
                        position: pos,
                    });
                    pos += 2;
                } else {
                    tokens.push(Spanned {
                        token: Token::Gt,
                        position: pos,
                    });
                    pos += 1;
                }
            }
            b'"' => {
                let (literal, consumed) = lex_string(input, pos)?;
                tokens.push(Spanned {
                    token: Token::Str(literal),
                    position: pos,
                });
                pos += consumed;
            }
            b'0'..=b'9' => {
                let (value, consumed) = lex_int(input, pos)?;
                tokens.push(Spanned {
                    token: Token::Int(value),
                    position: pos,
                });
                pos += consumed;
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let start = pos;
                while pos < bytes.len()
                    && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_')
                {
                    pos += 1;
                }
                tokens.push(Spanned {
                    token: Token::Ident(input[start..pos].to_string()),
                    position: start,
                });
            }
            other => {
                return Err(ExprError::Lex {
                    position: pos,
                    reason: format!("unexpected character `{}`", other as char),
                });
            }
        }
    }

    Ok(tokens)
}

/// Scan a double-quoted string literal starting at `start`.
/// Returns the unescaped contents and the number of bytes consumed.
fn lex_string(input: &str, start: usize) -> Result<(String, usize), ExprError> {
    let bytes = input.as_bytes();
    let mut literal = String::new();
    let mut pos = start + 1;

    while pos < bytes.len() {
        match bytes[pos] {
            b'"' => return Ok((literal, pos - start + 1)),
            b'\\' => match bytes.get(pos + 1) {
                Some(b'\\') => {
                    literal.push('\\');
                    pos += 2;
                }
                Some(b'"') => {
                    literal.push('"');
                    pos += 2;
                }
                Some(other) => {
                    return Err(ExprError::Lex {
                        position: pos,
                        reason: format!("unknown escape `\\{}`", *other as char),
                    });
                }
                None => {
                    return Err(ExprError::Lex {
                        position: pos,
                        reason: "dangling escape at end of string".to_string(),
                    });
                }
            },
            _ => {
                // Multi-byte characters pass through untouched.
                let ch = input[pos..].chars().next().expect("in bounds");
                literal.push(ch);
                pos += ch.len_utf8();
            }
        }
    }

    Err(ExprError::Lex {
        position: start,
        reason: "unterminated string literal".to_string(),
    })
}

/// Scan a decimal or `0x` hexadecimal integer literal.
fn lex_int(input: &str, start: usize) -> Result<(i64, usize), ExprError> {
    let bytes = input.as_bytes();
    let mut pos = start;

    let radix = if bytes[pos] == b'0'
        && matches!(bytes.get(pos + 1), Some(b'x' | b'X'))
        && bytes.get(pos + 2).is_some_and(u8::is_ascii_hexdigit)
    {
        pos += 2;
        16
    } else {
        10
    };

    let digits_start = pos;
    while pos < bytes.len()
        && (bytes[pos].is_ascii_hexdigit() && radix == 16 || bytes[pos].is_ascii_digit())
    {
        pos += 1;
    }

    let text = &input[digits_start..pos];
    let value = i64::from_str_radix(text, radix).map_err(|_| ExprError::Lex {
        position: start,
        reason: format!("integer literal `{}` out of range", &input[start..pos]),
    })?;

    Ok((value, pos - start))
}
