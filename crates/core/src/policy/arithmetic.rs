//! Closed-grammar calculator for the deterministic arithmetic shortcut.
//!
//! ```text
//! expression := term (('+' | '-') term)*
//! term       := factor (('*' | '/') factor)*
//! factor     := number | '(' expression ')'
//! number     := digit+ ('.' digit+)?
//! ```
//!
//! There is no unary minus. Callers must run [`is_arithmetic`] first: the
//! character-class check is the boundary, this parser only computes.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::errors::ArithmeticError;

const MAX_NESTING: usize = 64;

pub fn is_arithmetic(text: &str) -> bool {
    !text.is_empty()
        && text.chars().all(|character| {
            character.is_ascii_digit()
                || matches!(character, '+' | '-' | '*' | '/' | '(' | ')' | '.')
                || is_space(character)
        })
}

/// Shared by the guard and the parser so anything the guard admits as
/// spacing is skipped while parsing.
fn is_space(character: char) -> bool {
    character.is_whitespace()
}

pub fn evaluate(expression: &str) -> Result<Decimal, ArithmeticError> {
    let mut parser =
        Parser { source: expression, bytes: expression.as_bytes(), position: 0, depth: 0 };
    let value = parser.expression()?;
    parser.skip_whitespace();
    if parser.position != parser.bytes.len() {
        return Err(parser.malformed("unexpected trailing input"));
    }
    Ok(value.normalize())
}

struct Parser<'a> {
    source: &'a str,
    bytes: &'a [u8],
    position: usize,
    depth: usize,
}

impl Parser<'_> {
    fn expression(&mut self) -> Result<Decimal, ArithmeticError> {
        let mut value = self.term()?;
        loop {
            self.skip_whitespace();
            if self.eat(b'+') {
                value = value.checked_add(self.term()?).ok_or(ArithmeticError::Overflow)?;
            } else if self.eat(b'-') {
                value = value.checked_sub(self.term()?).ok_or(ArithmeticError::Overflow)?;
            } else {
                return Ok(value);
            }
        }
    }

    fn term(&mut self) -> Result<Decimal, ArithmeticError> {
        let mut value = self.factor()?;
        loop {
            self.skip_whitespace();
            if self.eat(b'*') {
                value = value.checked_mul(self.factor()?).ok_or(ArithmeticError::Overflow)?;
            } else if self.eat(b'/') {
                let divisor = self.factor()?;
                if divisor.is_zero() {
                    return Err(ArithmeticError::DivisionByZero);
                }
                value = value.checked_div(divisor).ok_or(ArithmeticError::Overflow)?;
            } else {
                return Ok(value);
            }
        }
    }

    fn factor(&mut self) -> Result<Decimal, ArithmeticError> {
        self.skip_whitespace();
        if !self.eat(b'(') {
            return self.number();
        }

        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.malformed("parentheses nested too deeply"));
        }
        let inner = self.expression()?;
        self.skip_whitespace();
        if !self.eat(b')') {
            return Err(self.malformed("missing ')'"));
        }
        self.depth -= 1;
        Ok(inner)
    }

    fn number(&mut self) -> Result<Decimal, ArithmeticError> {
        let start = self.position;
        let integer_digits = self.digits();
        if integer_digits == 0 {
            return Err(self.malformed("expected number"));
        }
        if self.eat(b'.') && self.digits() == 0 {
            return Err(self.malformed("expected digits after '.'"));
        }

        // Only ASCII digits and '.' were consumed, so the slice is valid UTF-8.
        let token = std::str::from_utf8(&self.bytes[start..self.position])
            .map_err(|_| ArithmeticError::Malformed { offset: start, detail: "bad number" })?;
        Decimal::from_str(token)
            .map_err(|_| ArithmeticError::Malformed { offset: start, detail: "number out of range" })
    }

    fn digits(&mut self) -> usize {
        let start = self.position;
        while self.bytes.get(self.position).is_some_and(u8::is_ascii_digit) {
            self.position += 1;
        }
        self.position - start
    }

    /// `position` only ever lands on char boundaries: tokens are ASCII and
    /// spacing is skipped a whole char at a time.
    fn skip_whitespace(&mut self) {
        let rest = self.source.get(self.position..).unwrap_or_default();
        for character in rest.chars().take_while(|character| is_space(*character)) {
            self.position += character.len_utf8();
        }
    }

    fn eat(&mut self, expected: u8) -> bool {
        if self.bytes.get(self.position) == Some(&expected) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn malformed(&self, detail: &'static str) -> ArithmeticError {
        ArithmeticError::Malformed { offset: self.position, detail }
    }
}
