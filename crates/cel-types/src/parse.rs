//! Parser for written type expressions
//!
//! Accepts the same spelling the checker prints: `int`, `list(int)`,
//! `map(string, dyn)`, `type(uint)`, `optional_type(string)`, `wrapper(int)`,
//! dotted message names, and type parameter names declared by the caller.

use crate::error::TypeError;
use crate::ty::Type;

/// Parse `input` into a [`Type`]; names listed in `type_params` become type parameters
pub fn parse_type(input: &str, type_params: &[&str]) -> Result<Type, TypeError> {
    let mut parser = TypeParser {
        input,
        pos: 0,
        type_params,
    };
    let ty = parser.parse()?;
    parser.skip_ws();
    if parser.pos < input.len() {
        return Err(TypeError::TrailingInput { offset: parser.pos });
    }
    Ok(ty)
}

struct TypeParser<'a> {
    input: &'a str,
    pos: usize,
    type_params: &'a [&'a str],
}

impl<'a> TypeParser<'a> {
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn name(&mut self) -> Result<&'a str, TypeError> {
        self.skip_ws();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '.' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        if start == self.pos {
            return match self.peek() {
                Some(ch) => Err(TypeError::UnexpectedChar { ch, offset: self.pos }),
                None => Err(TypeError::UnexpectedEnd { expected: "type name" }),
            };
        }
        Ok(&self.input[start..self.pos])
    }

    fn parameters(&mut self) -> Result<Vec<Type>, TypeError> {
        self.skip_ws();
        if self.peek() != Some('(') {
            return Ok(Vec::new());
        }
        self.pos += 1;
        let mut params = vec![self.parse()?];
        loop {
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                    params.push(self.parse()?);
                }
                Some(')') => {
                    self.pos += 1;
                    return Ok(params);
                }
                Some(ch) => return Err(TypeError::UnexpectedChar { ch, offset: self.pos }),
                None => return Err(TypeError::UnexpectedEnd { expected: "')'" }),
            }
        }
    }

    fn parse(&mut self) -> Result<Type, TypeError> {
        let name = self.name()?;
        let mut params = self.parameters()?;
        let arity = |expected: usize, params: &Vec<Type>| {
            if params.len() == expected {
                Ok(())
            } else {
                Err(TypeError::InvalidParameterCount {
                    name: name.to_string(),
                    expected,
                    actual: params.len(),
                })
            }
        };

        let ty = match name {
            "list" => {
                arity(1, &params)?;
                Type::list(params.remove(0))
            }
            "map" => {
                arity(2, &params)?;
                let value = params.remove(1);
                Type::map(params.remove(0), value)
            }
            "type" if params.is_empty() => Type::type_type(),
            "type" => {
                arity(1, &params)?;
                Type::type_of(params.remove(0))
            }
            "optional_type" | "optional" => {
                arity(1, &params)?;
                Type::optional(params.remove(0))
            }
            "wrapper" => {
                arity(1, &params)?;
                Type::nullable(params.remove(0))
            }
            _ if !params.is_empty() => Type::opaque(name, params),
            "bool" => Type::bool(),
            "bytes" => Type::bytes(),
            "double" => Type::double(),
            "int" => Type::int(),
            "uint" => Type::uint(),
            "string" => Type::string(),
            "dyn" => Type::dyn_type(),
            "any" => Type::any(),
            "error" => Type::error(),
            "null" | "null_type" => Type::null(),
            "duration" => Type::duration(),
            "timestamp" => Type::timestamp(),
            _ if self.type_params.contains(&name) => Type::type_param(name),
            _ => Type::object(name),
        };
        Ok(ty)
    }
}
