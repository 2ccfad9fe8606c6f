//! Shorthand type strings.
//!
//! ```text
//! expr  := term ( '|' term )*
//! term  := ident ( '[' expr ( ',' expr )* ']' )?  |  '(' expr ')'
//! ```
//!
//! Recognised generic forms: `list[T]` / `array[T]`, `map[V]` / `map[K, V]`
//! (also `dict`), `optional[T]`, `union[A, B, ..]` and `ref[Name]`.

use crate::error::NormalizationError;
use crate::types::{CanonicalType, PrimitiveKind, SchemaId};

/// Parse a shorthand type string into an unconstrained canonical type.
pub fn parse(input: &str) -> Result<CanonicalType, NormalizationError> {
    let mut parser = Parser { input, pos: 0 };
    let ty = parser.expr()?;
    parser.skip_ws();
    if parser.pos != input.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(ty)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, reason: &str) -> NormalizationError {
        NormalizationError::Shorthand {
            input: self.input.to_string(),
            offset: self.pos,
            reason: reason.to_string(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, byte: u8) -> bool {
        self.skip_ws();
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), NormalizationError> {
        if self.eat(byte) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", byte as char)))
        }
    }

    fn ident(&mut self) -> Result<&'a str, NormalizationError> {
        self.skip_ws();
        let start = self.pos;
        if !self.peek().is_some_and(|b| b.is_ascii_alphabetic() || b == b'_') {
            return Err(self.error("expected a type name"));
        }
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-' | b':'))
        {
            self.pos += 1;
        }
        Ok(&self.input[start..self.pos])
    }

    fn expr(&mut self) -> Result<CanonicalType, NormalizationError> {
        let mut variants = vec![self.term()?];
        while self.eat(b'|') {
            variants.push(self.term()?);
        }
        Ok(if variants.len() == 1 {
            variants.remove(0)
        } else {
            make_union(variants)
        })
    }

    fn term(&mut self) -> Result<CanonicalType, NormalizationError> {
        if self.eat(b'(') {
            let inner = self.expr()?;
            self.expect(b')')?;
            return Ok(inner);
        }

        let name_start = self.pos;
        let name = self.ident()?;

        if name == "ref" {
            self.expect(b'[')?;
            let target = self.ident()?;
            self.expect(b']')?;
            return Ok(CanonicalType::SchemaRef(SchemaId::new(target)));
        }

        let args = if self.eat(b'[') {
            let mut args = vec![self.expr()?];
            while self.eat(b',') {
                args.push(self.expr()?);
            }
            self.expect(b']')?;
            args
        } else {
            Vec::new()
        };

        let arity_error = |this: &Self, expected: &str| {
            let mut err = this.error(&format!("'{name}' takes {expected}"));
            if let NormalizationError::Shorthand { offset, .. } = &mut err {
                *offset = name_start;
            }
            err
        };

        match (name, args.len()) {
            ("list" | "array", 0) => Ok(CanonicalType::array(any())),
            ("list" | "array", 1) => Ok(CanonicalType::array(single(args))),
            ("list" | "array", _) => Err(arity_error(self, "one type argument")),
            ("map" | "dict", 0) => Ok(CanonicalType::map(any())),
            ("map" | "dict", 1) => Ok(CanonicalType::map(single(args))),
            ("map" | "dict", 2) => {
                let mut it = args.into_iter();
                let (Some(key), Some(value)) = (it.next(), it.next()) else {
                    return Err(arity_error(self, "one or two type arguments"));
                };
                Ok(CanonicalType::Map {
                    key: Box::new(key),
                    value: Box::new(value),
                    constraints: Vec::new(),
                })
            }
            ("map" | "dict", _) => Err(arity_error(self, "one or two type arguments")),
            ("optional", 1) => Ok(make_union(vec![
                single(args),
                CanonicalType::primitive(PrimitiveKind::Null),
            ])),
            ("optional", _) => Err(arity_error(self, "one type argument")),
            ("union", n) if n >= 1 => Ok(make_union(args)),
            ("union", _) => Err(arity_error(self, "at least one type argument")),
            (ident, 0) => PrimitiveKind::from_identifier(ident)
                .map(CanonicalType::primitive)
                .ok_or_else(|| NormalizationError::UnknownType(ident.to_string())),
            (ident, _) => Err(NormalizationError::UnknownType(format!("{ident}[..]"))),
        }
    }
}

fn single(args: Vec<CanonicalType>) -> CanonicalType {
    args.into_iter().next().unwrap_or_else(any)
}

fn any() -> CanonicalType {
    CanonicalType::primitive(PrimitiveKind::Any)
}

/// Build a union, flattening nested unconstrained unions and dropping
/// duplicate variants.
fn make_union(variants: Vec<CanonicalType>) -> CanonicalType {
    let mut flat: Vec<CanonicalType> = Vec::with_capacity(variants.len());
    for v in variants {
        match v {
            CanonicalType::Union {
                variants: inner,
                constraints,
            } if constraints.is_empty() => {
                for i in inner {
                    if !flat.contains(&i) {
                        flat.push(i);
                    }
                }
            }
            other => {
                if !flat.contains(&other) {
                    flat.push(other);
                }
            }
        }
    }
    if flat.len() == 1 {
        flat.remove(0)
    } else {
        CanonicalType::union(flat)
    }
}
