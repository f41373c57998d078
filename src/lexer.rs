use crate::diag::{Position, Span, SpannedError};
use enum_display::EnumDisplay;
use std::fmt::{Display, Formatter};
use std::iter::Peekable;
use std::str::Chars;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}

#[derive(Debug, Clone, PartialEq, EnumDisplay)]
pub enum TokenKind {
    // Identifiers
    #[display("Ident({0})")]
    Ident(String),

    // Literals
    #[display("IntLit({0})")]
    IntLit(i64),
    #[display("FloatLit({0})")]
    FloatLit(f64),
    #[display("StringLit({0})")]
    StringLit(String),

    // Keywords
    #[display("var")]
    KwVar,
    #[display("fun")]
    KwFun,
    #[display("extern")]
    KwExtern,

    // Quotes
    #[display("<")]
    QuoteOpen,
    #[display("vertex<")]
    VertexQuoteOpen,
    #[display("fragment<")]
    FragmentQuoteOpen,
    #[display(">")]
    QuoteClose,

    // Escapes
    #[display("[")]
    LBracket,
    #[display("%[")]
    PersistOpen,
    #[display("]")]
    RBracket,

    // Parentheses
    #[display("(")]
    LParen,
    #[display(")")]
    RParen,

    // Punctuation
    #[display(",")]
    Comma,
    #[display(":")]
    Colon,
    #[display(";")]
    Semicolon,
    #[display("->")]
    Arrow,

    // Operators
    #[display("+")]
    Plus,
    #[display("-")]
    Minus,
    #[display("*")]
    Star,
    #[display("/")]
    Slash,
    #[display("!")]
    Bang,

    // Assignment
    #[display("=")]
    Equals,
    #[display("+=")]
    PlusEquals,
    #[display("-=")]
    MinusEquals,
    #[display("*=")]
    StarEquals,
    #[display("/=")]
    SlashEquals,

    #[display("EOF")]
    Eof,
}

#[derive(Debug, Clone, Error)]
pub enum LexErrorKind {
    #[error("Unexpected character: {0}")]
    UnexpectedCharacter(char),

    #[error("Invalid number literal: {0}")]
    InvalidNumber(String),

    #[error("Invalid escape sequence: {0}")]
    InvalidEscapeSequence(String),

    #[error("Unterminated string literal")]
    UnterminatedString,
}

pub type LexError = SpannedError<LexErrorKind>;
pub use LexErrorKind as LEK;

impl LexErrorKind {
    pub fn at(self, span: Span) -> LexError {
        LexError::new(self, span)
    }
}

pub struct Lexer<'a> {
    source: Peekable<Chars<'a>>,
    pos: Position,
    at_eof: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            source: source.chars().peekable(),
            pos: Position {
                offset: 0,
                line: 1,
                column: 1,
            },
            at_eof: false,
        }
    }

    fn advance(&mut self) {
        match self.source.next() {
            Some(ch) => {
                self.pos.offset += 1;
                if ch == '\n' {
                    self.pos.line += 1;
                    self.pos.column = 1;
                } else {
                    self.pos.column += 1;
                }
            }
            None => {
                self.at_eof = true;
            }
        }
    }

    fn skip_whitespace(&mut self) {
        loop {
            while let Some(&ch) = self.source.peek()
                && ch.is_whitespace()
            {
                self.advance();
            }

            // `#` starts a comment that runs to the end of the line.
            if matches!(self.source.peek(), Some(&'#')) {
                while let Some(&ch) = self.source.peek()
                    && ch != '\n'
                {
                    self.advance();
                }
                continue;
            }

            break;
        }
    }

    fn lex_string_lit(&mut self, start: Position) -> Result<TokenKind, LexError> {
        self.advance(); // consume opening quote
        let mut buf = String::new();

        loop {
            let Some(&ch) = self.source.peek() else {
                return Err(LEK::UnterminatedString.at(Span::new(start, self.pos)));
            };
            self.advance();

            match ch {
                '"' => break,
                '\\' => {
                    let esc = self
                        .source
                        .peek()
                        .copied()
                        .ok_or_else(|| LEK::UnterminatedString.at(Span::new(start, self.pos)))?;
                    self.advance();
                    buf.push(match esc {
                        'n' => '\n',
                        't' => '\t',
                        '\\' => '\\',
                        '"' => '"',
                        _ => {
                            return Err(LEK::InvalidEscapeSequence(format!("\\{esc}"))
                                .at(Span::new(start, self.pos)));
                        }
                    });
                }
                _ => buf.push(ch),
            }
        }

        Ok(TokenKind::StringLit(buf))
    }

    fn lex_number(&mut self, start: Position) -> Result<TokenKind, LexError> {
        let mut text = String::new();
        let mut is_float = false;

        while let Some(&ch) = self.source.peek() {
            if ch.is_ascii_digit() {
                text.push(ch);
            } else if ch == '.' && !is_float {
                is_float = true;
                text.push(ch);
            } else if ch.is_ascii_alphabetic() || ch == '_' {
                // Reject trailing garbage such as `12abc` as one bad literal.
                text.push(ch);
                self.advance();
                while let Some(&ch) = self.source.peek()
                    && (ch.is_ascii_alphanumeric() || ch == '_')
                {
                    text.push(ch);
                    self.advance();
                }
                return Err(LEK::InvalidNumber(text).at(Span::new(start, self.pos)));
            } else {
                break;
            }
            self.advance();
        }

        let span = Span::new(start, self.pos);
        if is_float {
            text.parse::<f64>()
                .map(TokenKind::FloatLit)
                .map_err(|_| LEK::InvalidNumber(text).at(span))
        } else {
            text.parse::<i64>()
                .map(TokenKind::IntLit)
                .map_err(|_| LEK::InvalidNumber(text).at(span))
        }
    }

    fn lex_word(&mut self) -> TokenKind {
        let mut ident = String::new();
        while let Some(&ch) = self.source.peek()
            && (ch.is_alphanumeric() || ch == '_')
        {
            ident.push(ch);
            self.advance();
        }

        // Shader quotes are spelled as a stage name glued to `<`.
        if matches!(self.source.peek(), Some(&'<')) {
            let opener = match ident.as_str() {
                "vertex" => Some(TokenKind::VertexQuoteOpen),
                "fragment" => Some(TokenKind::FragmentQuoteOpen),
                _ => None,
            };
            if let Some(opener) = opener {
                self.advance();
                return opener;
            }
        }

        match ident.as_str() {
            "var" => TokenKind::KwVar,
            "fun" => TokenKind::KwFun,
            "extern" => TokenKind::KwExtern,
            _ => TokenKind::Ident(ident),
        }
    }

    /// Consume `ch`; if the next character is `=` consume it too and return
    /// `with_eq`, otherwise `plain`.
    fn lex_op(&mut self, plain: TokenKind, with_eq: TokenKind) -> TokenKind {
        self.advance();
        if matches!(self.source.peek(), Some(&'=')) {
            self.advance();
            with_eq
        } else {
            plain
        }
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();
        let start = self.pos;

        let kind = match self.source.peek().copied() {
            Some(ch) if ch.is_alphabetic() || ch == '_' => self.lex_word(),
            Some(ch) if ch.is_ascii_digit() => self.lex_number(start)?,
            Some('"') => self.lex_string_lit(start)?,
            Some('-') => {
                self.advance();
                match self.source.peek() {
                    Some(&'>') => {
                        self.advance();
                        TokenKind::Arrow
                    }
                    Some(&'=') => {
                        self.advance();
                        TokenKind::MinusEquals
                    }
                    _ => TokenKind::Minus,
                }
            }
            Some('+') => self.lex_op(TokenKind::Plus, TokenKind::PlusEquals),
            Some('*') => self.lex_op(TokenKind::Star, TokenKind::StarEquals),
            Some('/') => self.lex_op(TokenKind::Slash, TokenKind::SlashEquals),
            Some('%') => {
                self.advance();
                if matches!(self.source.peek(), Some(&'[')) {
                    self.advance();
                    TokenKind::PersistOpen
                } else {
                    return Err(LEK::UnexpectedCharacter('%').at(Span::new(start, self.pos)));
                }
            }
            Some(ch) => {
                self.advance();
                match ch {
                    '<' => TokenKind::QuoteOpen,
                    '>' => TokenKind::QuoteClose,
                    '[' => TokenKind::LBracket,
                    ']' => TokenKind::RBracket,
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    ',' => TokenKind::Comma,
                    ':' => TokenKind::Colon,
                    ';' => TokenKind::Semicolon,
                    '!' => TokenKind::Bang,
                    '=' => TokenKind::Equals,
                    other => {
                        return Err(LEK::UnexpectedCharacter(other).at(Span::new(start, self.pos)));
                    }
                }
            }
            None => {
                self.at_eof = true;
                TokenKind::Eof
            }
        };

        Ok(Token {
            kind,
            span: Span::new(start, self.pos),
        })
    }

    /// Tokenize the whole source. The final token is always `Eof`.
    pub fn tokenize(mut self) -> impl Iterator<Item = Result<Token, LexError>> + 'a {
        let mut done = false;
        std::iter::from_fn(move || {
            if done {
                return None;
            }
            let token = self.next_token();
            if matches!(&token, Ok(Token { kind: TokenKind::Eof, .. }) | Err(_)) {
                done = true;
            }
            Some(token)
        })
    }
}

#[cfg(test)]
#[path = "tests/t_lexer.rs"]
mod tests;
