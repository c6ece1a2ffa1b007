//! JSON lexer/tokenizer.
//!
//! Converts the byte stream of a [`CharSource`] into tokens, skipping
//! whitespace and both comment forms (`// ...` to end of line and
//! `/* ... */`). Exactly one token of lookahead is buffered.
//!
//! Strings support the standard escapes. `\u` escapes are limited to code
//! points that fit in a single byte of UTF-8 output; anything above yields
//! [`ErrorCode::UnsupportedEscape`] rather than a parse error.
//!
//! Numbers are decoded incrementally into a double without an intermediate
//! string.

use super::limits::Limits;
use super::source::{CharSource, PeekBuffer, EOF_BYTE};
use crate::alloc::{copy_str, push_growing, HostAllocator};
use crate::error::{ErrorCode, SkResult};

/// Fraction digits stop accumulating once the divisor passes this.
const FRACTION_DIVISOR_LIMIT: f64 = 1e17;

/// Token types produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Left brace `{`
    LeftBrace,
    /// Right brace `}`
    RightBrace,
    /// Left bracket `[`
    LeftBracket,
    /// Right bracket `]`
    RightBracket,
    /// Colon `:`
    Colon,
    /// Comma `,`
    Comma,
    /// Null literal
    Null,
    /// True literal
    True,
    /// False literal
    False,
    /// String value (unescaped)
    String(String),
    /// Number value, decoded
    Number(f64),
    /// End of input
    Eof,
    /// A byte that starts no token. Whether this is fatal is up to the parser.
    Invalid(u8),
}

impl Token {
    /// Short description used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Token::LeftBrace => "'{'".to_string(),
            Token::RightBrace => "'}'".to_string(),
            Token::LeftBracket => "'['".to_string(),
            Token::RightBracket => "']'".to_string(),
            Token::Colon => "':'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Null => "null".to_string(),
            Token::True => "true".to_string(),
            Token::False => "false".to_string(),
            Token::String(s) => format!("string \"{s}\""),
            Token::Number(n) => format!("number {n}"),
            Token::Eof => "end of input".to_string(),
            Token::Invalid(b) => format!("invalid byte 0x{b:02X}"),
        }
    }
}

fn unexpected_end(expected: &'static str) -> ErrorCode {
    ErrorCode::UnexpectedToken {
        expected,
        found: Token::Eof.describe(),
    }
}

fn hex_value(b: u8) -> Option<u16> {
    match b {
        b'0'..=b'9' => Some((b - b'0') as u16),
        b'a'..=b'f' => Some((b - b'a' + 10) as u16),
        b'A'..=b'F' => Some((b - b'A' + 10) as u16),
        _ => None,
    }
}

/// JSON lexer with single-token lookahead.
pub struct Lexer<'a, S> {
    input: PeekBuffer<S>,
    current: Token,
    buffer: Vec<u8>,
    alloc: &'a dyn HostAllocator,
    limits: Limits,
}

impl<'a, S: CharSource> Lexer<'a, S> {
    /// Create a lexer over `source` and lex the first token.
    pub fn new(source: S, alloc: &'a dyn HostAllocator, limits: Limits) -> SkResult<Self> {
        let mut lexer = Self {
            input: PeekBuffer::new(source)?,
            current: Token::Eof,
            buffer: Vec::new(),
            alloc,
            limits,
        };
        lexer.current = lexer.lex()?;
        Ok(lexer)
    }

    /// The buffered lookahead token.
    pub fn peek_token(&self) -> &Token {
        &self.current
    }

    /// Return the lookahead token and lex the one after it.
    pub fn next_token(&mut self) -> SkResult<Token> {
        let next = self.lex()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn advance(&mut self) -> SkResult<()> {
        self.input.advance()
    }

    /// Skip whitespace and comments, in any interleaving.
    fn skip_trivia(&mut self) -> SkResult<()> {
        loop {
            match (self.input.current(), self.input.following()) {
                (b' ' | b'\t' | b'\n' | b'\r', _) => self.advance()?,
                (b'/', b'/') => {
                    self.advance()?;
                    self.advance()?;
                    while !matches!(self.input.current(), b'\n' | EOF_BYTE) {
                        self.advance()?;
                    }
                }
                (b'/', b'*') => {
                    self.advance()?;
                    self.advance()?;
                    loop {
                        match (self.input.current(), self.input.following()) {
                            (EOF_BYTE, _) => break,
                            (b'*', b'/') => {
                                self.advance()?;
                                self.advance()?;
                                break;
                            }
                            _ => self.advance()?,
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Read the next token from the input.
    fn lex(&mut self) -> SkResult<Token> {
        self.skip_trivia()?;

        let punct = match self.input.current() {
            EOF_BYTE => return Ok(Token::Eof),
            b'{' => Token::LeftBrace,
            b'}' => Token::RightBrace,
            b'[' => Token::LeftBracket,
            b']' => Token::RightBracket,
            b':' => Token::Colon,
            b',' => Token::Comma,
            b'"' => return self.read_string(),
            b'-' | b'0'..=b'9' => return self.read_number(),
            b if b.is_ascii_alphabetic() => return self.read_keyword(),
            b => {
                self.advance()?;
                return Ok(Token::Invalid(b));
            }
        };
        self.advance()?;
        Ok(punct)
    }

    fn push_byte(&mut self, b: u8) -> SkResult<()> {
        if self.buffer.len() as u64 >= self.limits.max_string_length {
            return Err(ErrorCode::StringTooLong(
                self.buffer.len() as u64 + 1,
                self.limits.max_string_length,
            ));
        }
        push_growing(&mut self.buffer, b, self.alloc)
    }

    /// Read a string token, handling escape sequences.
    fn read_string(&mut self) -> SkResult<Token> {
        // Consume opening quote
        self.advance()?;
        self.buffer.clear();

        loop {
            match self.input.current() {
                EOF_BYTE => return Err(unexpected_end("closing '\"'")),
                b'"' => {
                    self.advance()?;
                    break;
                }
                b'\\' => {
                    self.advance()?;
                    let b = self.read_escape_sequence()?;
                    self.push_byte(b)?;
                }
                b => {
                    self.push_byte(b)?;
                    self.advance()?;
                }
            }
        }

        let text = std::str::from_utf8(&self.buffer).map_err(|_| ErrorCode::InvalidUtf8)?;
        Ok(Token::String(copy_str(text, self.alloc)?))
    }

    /// Read an escape sequence after a backslash, consuming it.
    fn read_escape_sequence(&mut self) -> SkResult<u8> {
        let decoded = match self.input.current() {
            EOF_BYTE => return Err(unexpected_end("escape code")),
            b'"' => b'"',
            b'\\' => b'\\',
            b'/' => b'/',
            b'b' => 0x08,
            b'f' => 0x0C,
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            b'u' => return self.read_unicode_escape(),
            other => return Err(ErrorCode::InvalidEscapeCode(other)),
        };
        self.advance()?;
        Ok(decoded)
    }

    /// Read the four hex digits of a `\u` escape.
    fn read_unicode_escape(&mut self) -> SkResult<u8> {
        let mut value: u16 = 0;
        for _ in 0..4 {
            self.advance()?;
            let b = self.input.current();
            if b == EOF_BYTE {
                return Err(unexpected_end("hex digit"));
            }
            let digit = hex_value(b).ok_or(ErrorCode::InvalidEscapeCode(b))?;
            value = (value << 4) | digit;
        }
        self.advance()?;

        // High byte must be zero and the low byte must stay a single byte of
        // UTF-8 once stored.
        match u8::try_from(value) {
            Ok(b) if b.is_ascii() => Ok(b),
            _ => Err(ErrorCode::UnsupportedEscape(value)),
        }
    }

    fn digit(&self) -> Option<u8> {
        let b = self.input.current();
        b.is_ascii_digit().then(|| b - b'0')
    }

    /// Read a number token.
    fn read_number(&mut self) -> SkResult<Token> {
        let negative = self.input.current() == b'-';
        if negative {
            self.advance()?;
        }

        // Integer part
        let leading_zero = self.input.current() == b'0';
        let mut value = 0.0f64;
        let mut int_digits = 0usize;
        while let Some(d) = self.digit() {
            value = value * 10.0 + f64::from(d);
            int_digits += 1;
            self.advance()?;
        }
        if int_digits == 0 || (leading_zero && int_digits > 1) {
            return Err(ErrorCode::InvalidNumberFormat);
        }

        // Fractional part
        if self.input.current() == b'.' {
            self.advance()?;
            let mut numerator = 0.0f64;
            let mut divisor = 1.0f64;
            let mut frac_digits = 0usize;
            while let Some(d) = self.digit() {
                // Digits past double precision no longer change the value.
                if divisor < FRACTION_DIVISOR_LIMIT {
                    numerator = numerator * 10.0 + f64::from(d);
                    divisor *= 10.0;
                }
                frac_digits += 1;
                self.advance()?;
            }
            if frac_digits == 0 {
                return Err(ErrorCode::InvalidNumberFormat);
            }
            value += numerator / divisor;
        }

        // Exponent
        if matches!(self.input.current(), b'e' | b'E') {
            self.advance()?;
            let negative_exponent = match self.input.current() {
                b'-' => {
                    self.advance()?;
                    true
                }
                b'+' => {
                    self.advance()?;
                    false
                }
                _ => false,
            };
            let mut exponent = 0.0f64;
            let mut exp_digits = 0usize;
            while let Some(d) = self.digit() {
                exponent = exponent * 10.0 + f64::from(d);
                exp_digits += 1;
                self.advance()?;
            }
            if exp_digits == 0 {
                return Err(ErrorCode::InvalidNumberFormat);
            }
            if negative_exponent {
                exponent = -exponent;
            }
            value *= 10.0f64.powf(exponent);
        }

        Ok(Token::Number(if negative { -value } else { value }))
    }

    /// Read a bare word; it must be `true`, `false` or `null`.
    fn read_keyword(&mut self) -> SkResult<Token> {
        self.buffer.clear();
        while self.input.current().is_ascii_alphanumeric() {
            let b = self.input.current();
            self.push_byte(b)?;
            self.advance()?;
        }
        match self.buffer.as_slice() {
            b"true" => Ok(Token::True),
            b"false" => Ok(Token::False),
            b"null" => Ok(Token::Null),
            other => Err(ErrorCode::InvalidKeyword(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }
}
