// xp-parser - Lexer for XP
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Lexer (tokeniser) for XP source code.
//!
//! Converts a source string into a stream of tokens.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use thiserror::Error;

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Delimiters
    LParen, // (
    RParen, // )

    // Literals
    Number(f64),
    String(String),
    Symbol(String),

    // Special
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Number(n) => write!(f, "{}", n),
            Token::String(s) => write!(f, "\"{}\"", s),
            Token::Symbol(s) => write!(f, "{}", s),
            Token::Eof => write!(f, "EOF"),
        }
    }
}

/// Lexer error with position information.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Lexer error at {line}:{column}: {message}")]
pub struct LexerError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

/// The lexer converts source code into tokens.
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source code.
    pub fn new(source: &'a str) -> Self {
        Lexer {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    /// Get the next token from the source.
    pub fn next_token(&mut self) -> Result<Token, LexerError> {
        self.skip_whitespace_and_comments();

        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        match c {
            '(' => {
                self.advance();
                Ok(Token::LParen)
            }
            ')' => {
                self.advance();
                Ok(Token::RParen)
            }
            '"' => self.read_string(),
            '+' | '-' => self.read_number_or_symbol(),
            c if c.is_ascii_digit() => self.read_number(String::new()),
            c if is_symbol_char(c) => Ok(Token::Symbol(self.read_symbol_chars(String::new()))),
            _ => Err(self.error(format!("Unexpected character: '{}'", c))),
        }
    }

    /// Collect all tokens into a vector.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            if matches!(token, Token::Eof) {
                break;
            }
            tokens.push(token);
        }
        Ok(tokens)
    }

    /// Get the current line number (1-indexed).
    pub fn line(&self) -> usize {
        self.line
    }

    /// Get the current column number (1-indexed).
    pub fn column(&self) -> usize {
        self.column
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    /// Look one character past `peek`.
    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next();
        if let Some(ch) = c {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        c
    }

    fn error(&self, message: String) -> LexerError {
        LexerError {
            message,
            line: self.line,
            column: self.column,
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some(';') => self.skip_line(),
                Some('/') if self.peek_second() == Some('/') => self.skip_line(),
                _ => break,
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn read_string(&mut self) -> Result<Token, LexerError> {
        self.advance(); // opening "
        let mut s = String::new();

        loop {
            match self.advance() {
                Some('"') => break,
                Some('\\') => match self.advance() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('r') => s.push('\r'),
                    Some('\\') => s.push('\\'),
                    Some('"') => s.push('"'),
                    Some(c) => return Err(self.error(format!("Unknown escape sequence: \\{}", c))),
                    None => return Err(self.error("Unterminated string escape".to_string())),
                },
                Some(c) => s.push(c),
                None => return Err(self.error("Unterminated string".to_string())),
            }
        }

        Ok(Token::String(s))
    }

    fn read_symbol_chars(&mut self, mut name: String) -> String {
        while let Some(c) = self.peek() {
            if is_symbol_char(c) {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }
        name
    }

    fn read_number_or_symbol(&mut self) -> Result<Token, LexerError> {
        let Some(sign) = self.advance() else {
            return Err(self.error("Unexpected end of input".to_string()));
        };

        match self.peek() {
            Some(c) if c.is_ascii_digit() => self.read_number(sign.to_string()),
            // `+foo`, `->`, or a bare operator
            _ => Ok(Token::Symbol(self.read_symbol_chars(sign.to_string()))),
        }
    }

    fn read_number(&mut self, mut s: String) -> Result<Token, LexerError> {
        while let Some(c) = self.peek() {
            let exponent_sign = (c == '+' || c == '-') && s.ends_with(['e', 'E']);
            if c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || exponent_sign {
                s.push(c);
                self.advance();
            } else {
                break;
            }
        }

        if let Some(c) = self.peek()
            && is_symbol_char(c)
        {
            return Err(self.error(format!("Invalid number: {}{}", s, c)));
        }

        s.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| self.error(format!("Invalid number: {}", s)))
    }
}

/// Check if a character can appear in a symbol.
fn is_symbol_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | '"' | ';')
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(s: &str) -> Result<Vec<Token>, LexerError> {
        Lexer::new(s).tokenize()
    }

    fn sym(s: &str) -> Token {
        Token::Symbol(s.to_string())
    }

    #[test]
    fn test_delimiters() {
        assert_eq!(
            tokenize("( )").unwrap(),
            vec![Token::LParen, Token::RParen]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokenize("42 3.5 -7 +2 1e3 2.5E-1").unwrap(),
            vec![
                Token::Number(42.0),
                Token::Number(3.5),
                Token::Number(-7.0),
                Token::Number(2.0),
                Token::Number(1000.0),
                Token::Number(0.25),
            ]
        );
    }

    #[test]
    fn test_invalid_number() {
        let err = tokenize("12abc").unwrap_err();
        assert!(err.message.contains("Invalid number"));
        assert!(tokenize("1.2.3").is_err());
    }

    #[test]
    fn test_operators_are_symbols() {
        assert_eq!(
            tokenize("+ - * / < > == >= <= !=").unwrap(),
            vec![
                sym("+"),
                sym("-"),
                sym("*"),
                sym("/"),
                sym("<"),
                sym(">"),
                sym("=="),
                sym(">="),
                sym("<="),
                sym("!="),
            ]
        );
    }

    #[test]
    fn test_symbols() {
        assert_eq!(
            tokenize("native-square make-adder? -foo").unwrap(),
            vec![sym("native-square"), sym("make-adder?"), sym("-foo")]
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            tokenize(r#""hello" "a\nb" "q\"q""#).unwrap(),
            vec![
                Token::String("hello".to_string()),
                Token::String("a\nb".to_string()),
                Token::String("q\"q".to_string()),
            ]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("\"abc").unwrap_err();
        assert_eq!(err.message, "Unterminated string");
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            tokenize("1 ; comment\n2 // another\n3").unwrap(),
            vec![Token::Number(1.0), Token::Number(2.0), Token::Number(3.0)]
        );
    }

    #[test]
    fn test_division_is_not_a_comment() {
        assert_eq!(
            tokenize("(/ 1 2)").unwrap(),
            vec![
                Token::LParen,
                sym("/"),
                Token::Number(1.0),
                Token::Number(2.0),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_error_position() {
        let err = tokenize("(x\n  \"open").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_complex_expression() {
        let tokens = tokenize("(def square (x) (* x x))").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::LParen,
                sym("def"),
                sym("square"),
                Token::LParen,
                sym("x"),
                Token::RParen,
                Token::LParen,
                sym("*"),
                sym("x"),
                sym("x"),
                Token::RParen,
                Token::RParen,
            ]
        );
    }
}
