//! Precedence-climbing parser.
//!
//! Precedence, low to high: `||`; `&&`; comparisons; additive;
//! multiplicative; unary.

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::ExprError;
use crate::token::{Spanned, Token, lex};

/// Parse `input` into an expression tree.
pub fn parse(input: &str) -> Result<Expr, ExprError> {
    let tokens = lex(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expression(0)?;
    match parser.peek() {
        None => Ok(expr),
        Some(tok) => Err(ExprError::Parse {
            expected: "end of expression".to_string(),
            got: tok.to_string(),
            position: parser.here(),
        }),
    }
}

/// Binding power of a binary operator, or `None` for non-operators.
fn binding_power(token: &Token) -> Option<(u8, BinaryOp)> {
    match token {
        Token::OrOr => Some((1, BinaryOp::Or)),
        Token::AndAnd => Some((2, BinaryOp::And)),
        Token::EqEq => Some((3, BinaryOp::Eq)),
        Token::NotEq => Some((3, BinaryOp::Ne)),
        Token::Lt => Some((3, BinaryOp::Lt)),
        Token::Le => Some((3, BinaryOp::Le)),
        Token::Gt => Some((3, BinaryOp::Gt)),
        Token::Ge => Some((3, BinaryOp::Ge)),
        Token::Plus => Some((4, BinaryOp::Add)),
        Token::Minus => Some((4, BinaryOp::Sub)),
        Token::Star => Some((5, BinaryOp::Mul)),
        Token::Slash => Some((5, BinaryOp::Div)),
        _ => None,
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    /// Byte offset of the current token, or of the input's end.
    fn here(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(0, |s| s.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).map(|s| s.token.clone());
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    /// Classic precedence climbing: parse a unary operand, then fold in
    /// binary operators whose binding power exceeds `min_power`.
    fn expression(&mut self, min_power: u8) -> Result<Expr, ExprError> {
        let mut lhs = self.unary()?;

        while let Some(tok) = self.peek() {
            let Some((power, op)) = binding_power(tok) else {
                break;
            };
            if power <= min_power {
                break;
            }
            self.advance();
            let rhs = self.expression(power)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }

        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        match self.peek() {
            Some(Token::Not) => {
                self.advance();
                Ok(Expr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(self.unary()?),
                })
            }
            Some(Token::Minus) => {
                self.advance();
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(self.unary()?),
                })
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let position = self.here();
        match self.advance() {
            Some(Token::Int(i)) => Ok(Expr::Int(i)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::Ident(name)) => Ok(Expr::Ident(name)),
            Some(Token::LParen) => {
                let inner = self.expression(0)?;
                let close_position = self.here();
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    Some(other) => Err(ExprError::Parse {
                        expected: "`)`".to_string(),
                        got: other.to_string(),
                        position: close_position,
                    }),
                    None => Err(ExprError::Parse {
                        expected: "`)`".to_string(),
                        got: "end of expression".to_string(),
                        position: close_position,
                    }),
                }
            }
            Some(other) => Err(ExprError::Parse {
                expected: "a literal, identifier, or `(`".to_string(),
                got: other.to_string(),
                position,
            }),
            None => Err(ExprError::Parse {
                expected: "a literal, identifier, or `(`".to_string(),
                got: "end of expression".to_string(),
                position,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ident(name: &str) -> Expr {
        Expr::Ident(name.to_string())
    }

    fn bin(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    #[test]
    fn parse_precedence_or_lowest() {
        // a || b && c  parses as  a || (b && c)
        let expr = parse("a || b && c").unwrap();
        assert_eq!(
            expr,
            bin(
                BinaryOp::Or,
                ident("a"),
                bin(BinaryOp::And, ident("b"), ident("c"))
            )
        );
    }

    #[test]
    fn parse_comparison_binds_tighter_than_and() {
        // a < 1 && b  parses as  (a < 1) && b
        let expr = parse("a < 1 && b").unwrap();
        assert_eq!(
            expr,
            bin(
                BinaryOp::And,
                bin(BinaryOp::Lt, ident("a"), Expr::Int(1)),
                ident("b")
            )
        );
    }

    #[test]
    fn parse_arithmetic_precedence() {
        // 1 + 2 * 3  parses as  1 + (2 * 3)
        let expr = parse("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            bin(
                BinaryOp::Add,
                Expr::Int(1),
                bin(BinaryOp::Mul, Expr::Int(2), Expr::Int(3))
            )
        );
    }

    #[test]
    fn parse_left_associative() {
        // 10 - 4 - 3  parses as  (10 - 4) - 3
        let expr = parse("10 - 4 - 3").unwrap();
        assert_eq!(
            expr,
            bin(
                BinaryOp::Sub,
                bin(BinaryOp::Sub, Expr::Int(10), Expr::Int(4)),
                Expr::Int(3)
            )
        );
    }

    #[test]
    fn parse_parens_override_precedence() {
        let expr = parse("(1 + 2) * 3").unwrap();
        assert_eq!(
            expr,
            bin(
                BinaryOp::Mul,
                bin(BinaryOp::Add, Expr::Int(1), Expr::Int(2)),
                Expr::Int(3)
            )
        );
    }

    #[test]
    fn parse_unary_stacking() {
        let expr = parse("!!a").unwrap();
        assert_eq!(
            expr,
            Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(Expr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(ident("a")),
                }),
            }
        );
    }

    #[test]
    fn parse_error_names_token_and_position() {
        let err = parse("a > )").unwrap_err();
        assert_eq!(
            err,
            ExprError::Parse {
                expected: "a literal, identifier, or `(`".to_string(),
                got: ")".to_string(),
                position: 4,
            }
        );
    }

    #[test]
    fn parse_error_on_trailing_tokens() {
        let err = parse("a b").unwrap_err();
        assert!(matches!(err, ExprError::Parse { position: 2, .. }));
    }

    #[test]
    fn parse_error_on_unclosed_paren() {
        let err = parse("(a").unwrap_err();
        assert_eq!(
            err,
            ExprError::Parse {
                expected: "`)`".to_string(),
                got: "end of expression".to_string(),
                position: 1,
            }
        );
    }

    #[test]
    fn identifiers_in_first_seen_order() {
        let expr = parse("B && A || B").unwrap();
        assert_eq!(expr.identifiers(), vec!["B", "A"]);
    }
}
