// xp-parser - Parser for XP
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Recursive descent parser for XP source code.
//!
//! Converts tokens into `Exp` nodes.

use thiserror::Error;

use crate::exp::Exp;
use crate::lexer::{Lexer, LexerError, Token};

/// Parser error with position information.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Parse error at {line}:{column}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl From<LexerError> for ParseError {
    fn from(e: LexerError) -> Self {
        ParseError {
            message: e.message,
            line: e.line,
            column: e.column,
        }
    }
}

/// The parser converts tokens into `Exp` nodes.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    line: usize,
    column: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given source code.
    pub fn new(source: &'a str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        // Capture position before first token
        let line = lexer.line();
        let column = lexer.column();
        let current = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current,
            line,
            column,
        })
    }

    /// Parse a single form from the source.
    /// Returns None if at end of input.
    pub fn parse(&mut self) -> Result<Option<Exp>, ParseError> {
        if matches!(self.current, Token::Eof) {
            return Ok(None);
        }
        let exp = self.parse_form()?;
        Ok(Some(exp))
    }

    /// Parse all forms from the source.
    pub fn parse_all(&mut self) -> Result<Vec<Exp>, ParseError> {
        let mut forms = Vec::new();
        while let Some(form) = self.parse()? {
            forms.push(form);
        }
        Ok(forms)
    }

    /// Parse a string and return the first form (convenience function).
    pub fn parse_str(source: &str) -> Result<Option<Exp>, ParseError> {
        let mut parser = Parser::new(source)?;
        parser.parse()
    }

    /// Parse a whole program: every top-level form wrapped in one `(begin ...)`.
    pub fn parse_program(source: &str) -> Result<Exp, ParseError> {
        let mut parser = Parser::new(source)?;
        let mut items = vec![Exp::symbol("begin")];
        items.extend(parser.parse_all()?);
        Ok(Exp::List(items))
    }

    // ========================================================================
    // Internal parsing methods
    // ========================================================================

    fn advance(&mut self) -> Result<Token, ParseError> {
        let prev = std::mem::replace(&mut self.current, Token::Eof);
        // Capture position of the next token before fetching it
        self.line = self.lexer.line();
        self.column = self.lexer.column();
        self.current = self.lexer.next_token()?;
        Ok(prev)
    }

    fn error(&self, message: String) -> ParseError {
        ParseError {
            message,
            line: self.line,
            column: self.column,
        }
    }

    fn parse_form(&mut self) -> Result<Exp, ParseError> {
        match self.advance()? {
            Token::Number(n) => Ok(Exp::Number(n)),
            Token::String(s) => Ok(Exp::String(s)),
            Token::Symbol(name) => Ok(Exp::Symbol(name)),
            Token::LParen => self.parse_list(),
            Token::RParen => Err(self.error("Unexpected ')'".to_string())),
            Token::Eof => Err(self.error("Unexpected end of input".to_string())),
        }
    }

    fn parse_list(&mut self) -> Result<Exp, ParseError> {
        let mut items = Vec::new();
        loop {
            match self.current {
                Token::RParen => {
                    self.advance()?;
                    return Ok(Exp::List(items));
                }
                Token::Eof => return Err(self.error("Unterminated list".to_string())),
                _ => items.push(self.parse_form()?),
            }
        }
    }
}

// ============================================================================
// Convenience functions
// ============================================================================

/// Read a single form from a string.
pub fn read(source: &str) -> Result<Option<Exp>, ParseError> {
    Parser::parse_str(source)
}

/// Read a program from a string, wrapped in `(begin ...)`.
pub fn read_program(source: &str) -> Result<Exp, ParseError> {
    Parser::parse_program(source)
}

// ============================================================================
// Tests
// ============================================================================
