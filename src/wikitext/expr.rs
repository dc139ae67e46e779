//! A safe arithmetic/logical expression language for `{{#expr:}}` and
//! `{{#ifexpr:}}`.
//!
//! Supports `+ - * / % ^ mod`, parenthesised grouping, integer/float
//! literals, the comparisons `= ≠ < ≤ > ≥` (plus ASCII spellings `!= <= >=`),
//! and `and or not` with non-zero truthiness. This is a recursive-descent
//! evaluator rather than MediaWiki's shunting-yard `ExprParser.php`, but
//! implements the same small, total grammar.

use std::iter::Peekable;
use std::str::CharIndices;

/// An expression evaluation error.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected character '{0}' at {1}")]
    UnexpectedChar(char, usize),
    #[error("expected closing parenthesis")]
    MissingCloseParen,
    #[error("division by zero")]
    DivisionByZero,
    #[error("invalid number at {0}")]
    InvalidNumber(usize),
}

/// Evaluates `expr`, returning its numeric result.
pub fn evaluate(expr: &str) -> Result<f64, Error> {
    let mut parser = Parser {
        chars: expr.char_indices().peekable(),
        len: expr.len(),
    };
    let value = parser.parse_or()?;
    parser.skip_ws();
    if let Some((pos, c)) = parser.chars.peek().copied() {
        return Err(Error::UnexpectedChar(c, pos));
    }
    Ok(value)
}

/// Evaluates `expr` and renders it the way `{{#expr:}}` would: integers
/// without a trailing `.0`, other values with MediaWiki's default precision.
pub fn evaluate_to_string(expr: &str) -> Result<String, Error> {
    let value = evaluate(expr)?;
    Ok(format_number(value))
}

/// Formats a number the way wikitext expects: integral values print without
/// a decimal point.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let mut s = format!("{value:.10}");
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
        s
    }
}

struct Parser<'a> {
    chars: Peekable<CharIndices<'a>>,
    len: usize,
}

impl Parser<'_> {
    fn skip_ws(&mut self) {
        while matches!(self.chars.peek(), Some((_, c)) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn peek_pos(&mut self) -> usize {
        self.chars.peek().map_or(self.len, |(p, _)| *p)
    }

    /// Tries to consume `word` as a standalone identifier (not a prefix of a
    /// longer identifier), returning whether it matched.
    fn try_keyword(&mut self, word: &str) -> bool {
        self.skip_ws();
        let start = self.peek_pos();
        let rest: String = {
            let mut clone = self.chars.clone();
            let mut s = String::new();
            while let Some((_, c)) = clone.peek().copied() {
                if c.is_alphanumeric() {
                    s.push(c);
                    clone.next();
                } else {
                    break;
                }
            }
            s
        };
        if rest.eq_ignore_ascii_case(word) {
            for _ in 0..word.chars().count() {
                self.chars.next();
            }
            true
        } else {
            let _ = start;
            false
        }
    }

    fn try_symbol(&mut self, sym: &str) -> bool {
        self.skip_ws();
        let mut clone = self.chars.clone();
        for expected in sym.chars() {
            match clone.next() {
                Some((_, c)) if c == expected => {}
                _ => return false,
            }
        }
        self.chars = clone;
        true
    }

    fn parse_or(&mut self) -> Result<f64, Error> {
        let mut value = self.parse_and()?;
        loop {
            if self.try_keyword("or") {
                let rhs = self.parse_and()?;
                value = truthy(truthy(value) || truthy(rhs));
            } else {
                break;
            }
        }
        Ok(value)
    }

    fn parse_and(&mut self) -> Result<f64, Error> {
        let mut value = self.parse_not()?;
        loop {
            if self.try_keyword("and") {
                let rhs = self.parse_not()?;
                value = truthy(truthy(value) && truthy(rhs));
            } else {
                break;
            }
        }
        Ok(value)
    }

    fn parse_not(&mut self) -> Result<f64, Error> {
        if self.try_keyword("not") {
            let value = self.parse_not()?;
            return Ok(truthy(!truthy(value)));
        }
        self.parse_cmp()
    }

    fn parse_cmp(&mut self) -> Result<f64, Error> {
        let lhs = self.parse_add()?;
        let op = if self.try_symbol("!=") || self.try_symbol("≠") {
            Some("!=")
        } else if self.try_symbol("<=") || self.try_symbol("≤") {
            Some("<=")
        } else if self.try_symbol(">=") || self.try_symbol("≥") {
            Some(">=")
        } else if self.try_symbol("=") {
            Some("=")
        } else if self.try_symbol("<") {
            Some("<")
        } else if self.try_symbol(">") {
            Some(">")
        } else {
            None
        };

        let Some(op) = op else { return Ok(lhs) };
        let rhs = self.parse_add()?;
        let result = match op {
            "=" => lhs == rhs,
            "!=" => lhs != rhs,
            "<" => lhs < rhs,
            "<=" => lhs <= rhs,
            ">" => lhs > rhs,
            ">=" => lhs >= rhs,
            _ => unreachable!(),
        };
        Ok(truthy(result))
    }

    fn parse_add(&mut self) -> Result<f64, Error> {
        let mut value = self.parse_mul()?;
        loop {
            if self.try_symbol("+") {
                value += self.parse_mul()?;
            } else if self.try_symbol("-") {
                value -= self.parse_mul()?;
            } else {
                break;
            }
        }
        Ok(value)
    }

    fn parse_mul(&mut self) -> Result<f64, Error> {
        let mut value = self.parse_pow()?;
        loop {
            if self.try_symbol("*") {
                value *= self.parse_pow()?;
            } else if self.try_symbol("/") {
                let rhs = self.parse_pow()?;
                if rhs == 0.0 {
                    return Err(Error::DivisionByZero);
                }
                value /= rhs;
            } else if self.try_symbol("%") || self.try_keyword("mod") {
                let rhs = self.parse_pow()?;
                if rhs == 0.0 {
                    return Err(Error::DivisionByZero);
                }
                value %= rhs;
            } else {
                break;
            }
        }
        Ok(value)
    }

    fn parse_pow(&mut self) -> Result<f64, Error> {
        let base = self.parse_unary()?;
        if self.try_symbol("^") {
            let exponent = self.parse_pow()?;
            Ok(base.powf(exponent))
        } else {
            Ok(base)
        }
    }

    fn parse_unary(&mut self) -> Result<f64, Error> {
        if self.try_symbol("-") {
            return Ok(-self.parse_unary()?);
        }
        if self.try_symbol("+") {
            return self.parse_unary();
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<f64, Error> {
        self.skip_ws();
        if self.try_symbol("(") {
            let value = self.parse_or()?;
            if !self.try_symbol(")") {
                return Err(Error::MissingCloseParen);
            }
            return Ok(value);
        }
        self.parse_number()
    }

    fn parse_number(&mut self) -> Result<f64, Error> {
        self.skip_ws();
        let start = self.peek_pos();
        let mut text = String::new();
        while let Some((_, c)) = self.chars.peek().copied() {
            if c.is_ascii_digit() || c == '.' {
                text.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        if text.is_empty() {
            return match self.chars.peek().copied() {
                Some((pos, c)) => Err(Error::UnexpectedChar(c, pos)),
                None => Err(Error::UnexpectedEnd),
            };
        }
        text.parse().map_err(|_| Error::InvalidNumber(start))
    }
}

/// Converts a boolean to the expression language's `1`/`0` truthiness.
fn truthy_val(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

fn truthy(v: impl Into<Truthy>) -> f64 {
    match v.into() {
        Truthy::Bool(b) => truthy_val(b),
        Truthy::Num(n) => n,
    }
}

/// Helper allowing `truthy` to accept either a bool (from a comparison) or a
/// number (whose non-zero-ness is being tested).
enum Truthy {
    Bool(bool),
    Num(f64),
}

impl From<bool> for Truthy {
    fn from(b: bool) -> Self {
        Truthy::Bool(b)
    }
}

impl From<f64> for Truthy {
    fn from(n: f64) -> Self {
        Truthy::Num(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_arithmetic() {
        assert_eq!(evaluate("2 + 3 * 4"), Ok(14.0));
        assert_eq!(evaluate("(2 + 3) * 4"), Ok(20.0));
        assert_eq!(evaluate("2 ^ 10"), Ok(1024.0));
    }

    #[test]
    fn comparisons_and_logic() {
        assert_eq!(evaluate("1 < 2 and 2 < 3"), Ok(1.0));
        assert_eq!(evaluate("1 > 2 or 3 = 3"), Ok(1.0));
        assert_eq!(evaluate("not 0"), Ok(1.0));
    }

    #[test]
    fn division_by_zero_errors() {
        assert_eq!(evaluate("1 / 0"), Err(Error::DivisionByZero));
    }

    #[test]
    fn format_number_drops_trailing_zero() {
        assert_eq!(format_number(14.0), "14");
        assert_eq!(format_number(1.5), "1.5");
    }
}
