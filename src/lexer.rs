//! SQL lexer (C6).
//!
//! Consumes a UTF-8 SQL string and yields a finite, restartable token
//! sequence. A hand-written character-at-a-time scanner, driven one
//! token at a time or fully drained with `tokenize`.

use crate::error::{DbError, Result, SourceLocation};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Id,
    IntLiteral(i64),
    FloatLiteral(f64),
    StringLiteral(String),

    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,

    Comma,
    Semicolon,
    LParen,
    RParen,
    Dot,
    Star,

    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub loc: SourceLocation,
}

impl Token {
    /// True if this token is the identifier/keyword `word` (case-insensitive).
    pub fn is_kw(&self, word: &str) -> bool {
        self.kind == TokenKind::Id && self.lexeme.eq_ignore_ascii_case(word)
    }
}

/// Restartable lexer: holds the whole source and a cursor.
pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer { src: src.as_bytes(), pos: 0, line: 1, column: 1 }
    }

    fn peek(&self) -> u8 {
        if self.pos < self.src.len() {
            self.src[self.pos]
        } else {
            0
        }
    }

    fn peek_at(&self, offset: usize) -> u8 {
        let p = self.pos + offset;
        if p < self.src.len() {
            self.src[p]
        } else {
            0
        }
    }

    fn advance(&mut self) -> u8 {
        let c = self.peek();
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    fn loc(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.advance();
                }
                b'-' if self.peek_at(1) == b'-' => {
                    while self.peek() != b'\n' && self.peek() != 0 {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    /// Read and return the next token, advancing the cursor past it.
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_trivia();
        let loc = self.loc();
        let c = self.peek();
        if c == 0 {
            return Ok(Token { kind: TokenKind::Eof, lexeme: String::new(), loc });
        }
        if c.is_ascii_alphabetic() || c == b'_' {
            return Ok(self.read_identifier(loc));
        }
        if c.is_ascii_digit() {
            return self.read_number(loc);
        }
        if c == b'\'' {
            return self.read_string(loc);
        }
        match c {
            b',' => { self.advance(); Ok(Token { kind: TokenKind::Comma, lexeme: ",".into(), loc }) }
            b';' => { self.advance(); Ok(Token { kind: TokenKind::Semicolon, lexeme: ";".into(), loc }) }
            b'(' => { self.advance(); Ok(Token { kind: TokenKind::LParen, lexeme: "(".into(), loc }) }
            b')' => { self.advance(); Ok(Token { kind: TokenKind::RParen, lexeme: ")".into(), loc }) }
            b'.' => { self.advance(); Ok(Token { kind: TokenKind::Dot, lexeme: ".".into(), loc }) }
            b'*' => { self.advance(); Ok(Token { kind: TokenKind::Star, lexeme: "*".into(), loc }) }
            b'=' => { self.advance(); Ok(Token { kind: TokenKind::Eq, lexeme: "=".into(), loc }) }
            b'!' if self.peek_at(1) == b'=' => {
                self.advance();
                self.advance();
                Ok(Token { kind: TokenKind::Ne, lexeme: "!=".into(), loc })
            }
            b'<' => {
                self.advance();
                if self.peek() == b'=' {
                    self.advance();
                    Ok(Token { kind: TokenKind::Le, lexeme: "<=".into(), loc })
                } else if self.peek() == b'>' {
                    self.advance();
                    Ok(Token { kind: TokenKind::Ne, lexeme: "<>".into(), loc })
                } else {
                    Ok(Token { kind: TokenKind::Lt, lexeme: "<".into(), loc })
                }
            }
            b'>' => {
                self.advance();
                if self.peek() == b'=' {
                    self.advance();
                    Ok(Token { kind: TokenKind::Ge, lexeme: ">=".into(), loc })
                } else {
                    Ok(Token { kind: TokenKind::Gt, lexeme: ">".into(), loc })
                }
            }
            other => Err(DbError::lex(
                format!("unknown character '{}'", other as char),
                loc,
            )),
        }
    }

    fn read_identifier(&mut self, loc: SourceLocation) -> Token {
        let start = self.pos;
        while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
            self.advance();
        }
        let lexeme = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
        Token { kind: TokenKind::Id, lexeme, loc }
    }

    fn read_number(&mut self, loc: SourceLocation) -> Result<Token> {
        let start = self.pos;
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        let mut is_float = false;
        if self.peek() == b'.' && self.peek_at(1).is_ascii_digit() {
            is_float = true;
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }
        let lexeme = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
        if is_float {
            let v: f64 = lexeme.parse().map_err(|_| DbError::lex("bad float literal", loc))?;
            Ok(Token { kind: TokenKind::FloatLiteral(v), lexeme, loc })
        } else {
            let v: i64 = lexeme.parse().map_err(|_| DbError::lex("bad integer literal", loc))?;
            Ok(Token { kind: TokenKind::IntLiteral(v), lexeme, loc })
        }
    }

    fn read_string(&mut self, loc: SourceLocation) -> Result<Token> {
        self.advance(); // opening quote
        let mut bytes = Vec::new();
        loop {
            match self.peek() {
                0 => return Err(DbError::lex("unterminated string literal", loc)),
                b'\'' => {
                    self.advance();
                    if self.peek() == b'\'' {
                        // '' escape -> literal quote
                        bytes.push(b'\'');
                        self.advance();
                    } else {
                        break;
                    }
                }
                _ => bytes.push(self.advance()),
            }
        }
        // Decode the whole body at once rather than byte-by-byte, so a
        // multi-byte UTF-8 sequence (e.g. inside 'café') is reassembled
        // correctly instead of reinterpreting each continuation byte.
        let s = String::from_utf8_lossy(&bytes).into_owned();
        Ok(Token { kind: TokenKind::StringLiteral(s.clone()), lexeme: s, loc })
    }
}

/// Drain the whole source into a token vector, terminated by one `Eof`.
pub fn tokenize(src: &str) -> Result<Vec<Token>> {
    let mut lexer = Lexer::new(src);
    let mut out = Vec::new();
    loop {
        let tok = lexer.next_token()?;
        let is_eof = tok.kind == TokenKind::Eof;
        out.push(tok);
        if is_eof {
            break;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_simple_select() {
        let toks = tokenize("SELECT * FROM t WHERE a = 1;").unwrap();
        assert_eq!(toks.last().unwrap().kind, TokenKind::Eof);
        assert!(toks.iter().any(|t| t.kind == TokenKind::Star));
        assert!(toks.iter().any(|t| t.kind == TokenKind::Eq));
    }

    #[test]
    fn string_escape() {
        let toks = tokenize("'it''s'").unwrap();
        assert_eq!(toks[0].kind, TokenKind::StringLiteral("it's".into()));
    }

    #[test]
    fn unterminated_string_is_lex_error() {
        assert!(tokenize("'abc").is_err());
    }

    #[test]
    fn line_comment_is_skipped() {
        let toks = tokenize("SELECT 1 -- comment\n;").unwrap();
        assert_eq!(toks.len(), 4); // SELECT, 1, ;, Eof
    }
}
