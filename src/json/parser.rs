//! Recursive descent JSON parser.
//!
//! Builds a [`JsonValue`] tree from the token stream with one token of
//! lookahead. The document form is always an object.
//!
//! A production that fails drops whatever it had built so far, nested
//! children included, before the error propagates. Duplicate keys replace
//! the earlier value in place.

use super::lexer::{Lexer, Token};
use super::limits::Limits;
use super::source::CharSource;
use super::types::{JsonObject, JsonValue};
use crate::alloc::{push_growing, reserve_entry, HostAllocator};
use crate::error::{ErrorCode, SkResult};

/// JSON parser over any character source.
pub struct Parser<'a, S> {
    lexer: Lexer<'a, S>,
    alloc: &'a dyn HostAllocator,
    limits: Limits,
    depth: u64,
}

impl<'a, S: CharSource> Parser<'a, S> {
    /// Create a new parser for the given source.
    pub fn new(source: S, alloc: &'a dyn HostAllocator, limits: Limits) -> SkResult<Self> {
        Ok(Self {
            lexer: Lexer::new(source, alloc, limits)?,
            alloc,
            limits,
            depth: 0,
        })
    }

    /// Parse a whole document: one object followed by end of input.
    pub fn parse_document(&mut self) -> SkResult<JsonObject> {
        if *self.lexer.peek_token() != Token::LeftBrace {
            return Err(self.unexpected("'{'"));
        }
        let object = self.parse_object()?;

        // Ensure no trailing content
        if *self.lexer.peek_token() != Token::Eof {
            return Err(self.unexpected("end of input"));
        }
        Ok(object)
    }

    fn unexpected(&self, expected: &'static str) -> ErrorCode {
        ErrorCode::UnexpectedToken {
            expected,
            found: self.lexer.peek_token().describe(),
        }
    }

    /// Consume the lookahead token if it equals `want`.
    fn expect(&mut self, want: &Token, expected: &'static str) -> SkResult<()> {
        if self.lexer.peek_token() != want {
            return Err(self.unexpected(expected));
        }
        self.lexer.next_token()?;
        Ok(())
    }

    fn enter(&mut self) -> SkResult<()> {
        self.depth += 1;
        if self.depth > self.limits.max_nesting_depth {
            return Err(ErrorCode::NestingTooDeep(
                self.depth,
                self.limits.max_nesting_depth,
            ));
        }
        Ok(())
    }

    /// Parse a single JSON value.
    fn parse_value(&mut self) -> SkResult<JsonValue> {
        match self.lexer.peek_token() {
            Token::LeftBrace => return self.parse_object().map(JsonValue::Object),
            Token::LeftBracket => return self.parse_array(),
            Token::Number(_) | Token::String(_) | Token::True | Token::False | Token::Null => {}
            _ => return Err(self.unexpected("value")),
        }
        match self.lexer.next_token()? {
            Token::Number(n) => Ok(JsonValue::Number(n)),
            Token::String(s) => Ok(JsonValue::String(s)),
            Token::True => Ok(JsonValue::Bool(true)),
            Token::False => Ok(JsonValue::Bool(false)),
            _ => Ok(JsonValue::Null),
        }
    }

    /// Parse a JSON object.
    fn parse_object(&mut self) -> SkResult<JsonObject> {
        self.enter()?;
        self.expect(&Token::LeftBrace, "'{'")?;

        let mut object = JsonObject::new();
        if *self.lexer.peek_token() != Token::RightBrace {
            loop {
                let key = match self.lexer.peek_token() {
                    Token::String(_) => match self.lexer.next_token()? {
                        Token::String(s) => s,
                        _ => return Err(self.unexpected("property name")),
                    },
                    _ => return Err(self.unexpected("property name")),
                };
                self.expect(&Token::Colon, "':'")?;
                let value = self.parse_value()?;

                if !object.contains_key(&key) {
                    reserve_entry(object.properties_mut(), self.alloc)?;
                }
                // A duplicate key drops the earlier value here.
                object.insert(key, value);

                if *self.lexer.peek_token() != Token::Comma {
                    break;
                }
                self.lexer.next_token()?;
            }
        }

        self.expect(&Token::RightBrace, "'}'")?;
        self.depth -= 1;
        Ok(object)
    }

    /// Parse a JSON array.
    fn parse_array(&mut self) -> SkResult<JsonValue> {
        self.enter()?;
        self.expect(&Token::LeftBracket, "'['")?;

        let mut elements = Vec::new();
        if *self.lexer.peek_token() != Token::RightBracket {
            loop {
                let value = self.parse_value()?;
                push_growing(&mut elements, value, self.alloc)?;

                if *self.lexer.peek_token() != Token::Comma {
                    break;
                }
                self.lexer.next_token()?;
            }
        }

        self.expect(&Token::RightBracket, "']'")?;
        self.depth -= 1;
        Ok(JsonValue::Array(elements))
    }
}

#[cfg(test)]
mod tests {
    use super::super::source::StrSource;
    use super::*;
    use crate::alloc::DefaultAllocator;

    fn parse(input: &str) -> SkResult<JsonObject> {
        Parser::new(StrSource::new(input), &DefaultAllocator, Limits::lenient())?.parse_document()
    }

    #[test]
    fn test_parse_empty_object() {
        assert!(parse("{}").unwrap().is_empty());
        assert!(parse("  { }  ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_scalars() {
        let obj = parse(r#"{"n": null, "t": true, "f": false, "x": -2.5, "s": "hi"}"#).unwrap();
        assert_eq!(obj.get("n"), Some(&JsonValue::Null));
        assert_eq!(obj.get("t"), Some(&JsonValue::Bool(true)));
        assert_eq!(obj.get("f"), Some(&JsonValue::Bool(false)));
        assert_eq!(obj.get("x"), Some(&JsonValue::Number(-2.5)));
        assert_eq!(obj.get("s"), Some(&JsonValue::String("hi".into())));
    }

    #[test]
    fn test_parse_array() {
        let obj = parse(r#"{"a": [1, [2, 3], {"b": []}]}"#).unwrap();
        let a = obj.get("a").unwrap();
        assert_eq!(a.array_len(), 3);
        assert_eq!(a.get_index(0), Some(&JsonValue::Number(1.0)));
        assert_eq!(a.get_index(1).unwrap().array_len(), 2);
        assert_eq!(a.get_index(2).unwrap().get("b").unwrap().array_len(), 0);
    }

    #[test]
    fn test_duplicate_key_replaces() {
        let obj = parse(r#"{"a": 1, "b": 0, "a": 2}"#).unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(obj.property(0), Some(("a", &JsonValue::Number(2.0))));
    }

    #[test]
    fn test_document_must_be_object() {
        assert!(matches!(parse("[1]"), Err(ErrorCode::UnexpectedToken { .. })));
        assert!(matches!(parse("1"), Err(ErrorCode::UnexpectedToken { .. })));
        assert!(matches!(parse(""), Err(ErrorCode::UnexpectedToken { .. })));
    }

    #[test]
    fn test_trailing_content_rejected() {
        assert!(matches!(parse("{} {}"), Err(ErrorCode::UnexpectedToken { .. })));
    }

    #[test]
    fn test_trailing_comma_rejected() {
        assert!(matches!(parse(r#"{"a": [1, 2,]}"#), Err(ErrorCode::UnexpectedToken { .. })));
        assert!(matches!(parse(r#"{"a": 1,}"#), Err(ErrorCode::UnexpectedToken { .. })));
    }

    #[test]
    fn test_missing_colon_and_key() {
        assert!(matches!(parse(r#"{"a" 1}"#), Err(ErrorCode::UnexpectedToken { .. })));
        assert!(matches!(parse(r#"{1: 1}"#), Err(ErrorCode::UnexpectedToken { .. })));
        assert!(matches!(parse(r#"{"a": @}"#), Err(ErrorCode::UnexpectedToken { .. })));
    }

    #[test]
    fn test_nesting_depth_limit() {
        let limits = Limits {
            max_nesting_depth: 3,
            ..Limits::manifest()
        };
        let ok = Parser::new(StrSource::new(r#"{"a": [[1]]}"#), &DefaultAllocator, limits)
            .unwrap()
            .parse_document();
        assert!(ok.is_ok());
        let deep = Parser::new(StrSource::new(r#"{"a": [[[1]]]}"#), &DefaultAllocator, limits)
            .unwrap()
            .parse_document();
        assert_eq!(deep, Err(ErrorCode::NestingTooDeep(4, 3)));
    }
}
