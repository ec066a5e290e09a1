use std::{
    collections::{HashMap, HashSet},
    fmt,
    iter::Peekable,
    str::Chars,
};

use lazy_static::lazy_static;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum TokenKind {
    Defn,
    Extern,
    Identifier,
    Operator,
    ReservedSymbol,
    Number,
    End,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Defn => "DEFN",
            TokenKind::Extern => "EXTERN",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::Operator => "OPERATOR",
            TokenKind::ReservedSymbol => "RESERVED_SYMBOL",
            TokenKind::Number => "NUMBER",
            TokenKind::End => "END",
        };
        f.write_str(name)
    }
}

/// A lexed token. Equality only looks at the kind and the text, so tokens
/// built by hand compare equal to lexed ones regardless of position.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub col: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self::at(kind, text, 0, 0)
    }

    pub fn at(kind: TokenKind, text: impl Into<String>, line: usize, col: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
            col,
        }
    }

    pub fn is_symbol(&self, symbol: &str) -> bool {
        self.kind == TokenKind::ReservedSymbol && self.text == symbol
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.text == other.text
    }
}

impl Eq for Token {}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{}): {}", self.kind, self.line, self.col, self.text)
    }
}

#[derive(Debug, PartialEq, Clone, thiserror::Error)]
pub enum LexError {
    #[error("unrecognized symbol '{symbol}' at {line}:{col}")]
    UnrecognizedSymbol {
        symbol: String,
        line: usize,
        col: usize,
    },
}

const OPERATOR_CHARS: &[char] = &['<', '>', '+', '-', '*', '!', '@', '$', '%', '^', '&', '|'];

const MAX_SYMBOL_LEN: usize = 3;

lazy_static! {
    static ref KEYWORDS: HashMap<&'static str, TokenKind> = {
        let mut keywords = HashMap::new();
        keywords.insert("defn", TokenKind::Defn);
        keywords.insert("extern", TokenKind::Extern);
        keywords
    };
    static ref RESERVED_SYMBOLS: HashSet<&'static str> =
        ["(", ")", "{", "}", ",", ";", ":"].iter().copied().collect();
}

pub fn is_operator_char(ch: char) -> bool {
    OPERATOR_CHARS.contains(&ch)
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
            col: 1,
        }
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    /// Builds a token that ends at the current position; its column is
    /// found by walking back over its text.
    fn make_token(&self, kind: TokenKind, text: String) -> Token {
        let col = self.col - text.chars().count();
        Token::at(kind, text, self.line, col)
    }

    fn take_while(&mut self, text: &mut String, pred: impl Fn(char) -> bool) {
        while let Some(&ch) = self.chars.peek() {
            if !pred(ch) {
                break;
            }
            text.push(ch);
            self.advance();
        }
    }

    fn scan(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        while let Some(&ch) = self.chars.peek() {
            let token = if ch.is_whitespace() {
                self.advance();
                continue;
            } else if ch.is_alphabetic() {
                self.scan_identifier()
            } else if ch.is_ascii_digit() {
                self.scan_number()
            } else if ch == '#' {
                self.skip_comment();
                continue;
            } else if is_operator_char(ch) {
                self.scan_operator()
            } else if ch == '\0' {
                tokens.push(self.make_token(TokenKind::End, String::new()));
                break;
            } else {
                self.scan_reserved_symbol()?
            };
            tokens.push(token);
        }

        if tokens.last().map(|tok| tok.kind) != Some(TokenKind::End) {
            tokens.push(self.make_token(TokenKind::End, String::new()));
        }

        Ok(tokens)
    }

    fn scan_identifier(&mut self) -> Token {
        let mut ident = String::new();
        self.take_while(&mut ident, char::is_alphanumeric);

        let kind = KEYWORDS
            .get(ident.as_str())
            .copied()
            .unwrap_or(TokenKind::Identifier);
        self.make_token(kind, ident)
    }

    fn scan_number(&mut self) -> Token {
        let mut number = String::new();
        self.take_while(&mut number, |ch| ch.is_ascii_digit() || ch == '.');
        self.make_token(TokenKind::Number, number)
    }

    fn skip_comment(&mut self) {
        while let Some(&ch) = self.chars.peek() {
            if ch == '\n' || ch == '\r' {
                break;
            }
            self.advance();
        }
    }

    fn scan_operator(&mut self) -> Token {
        let mut op = String::new();
        self.take_while(&mut op, is_operator_char);
        self.make_token(TokenKind::Operator, op)
    }

    fn scan_reserved_symbol(&mut self) -> Result<Token, LexError> {
        let (line, col) = (self.line, self.col);
        let mut symbol = String::new();

        while let Some(&ch) = self.chars.peek() {
            if ch.is_whitespace() || symbol.chars().count() >= MAX_SYMBOL_LEN {
                break;
            }
            symbol.push(ch);
            self.advance();
            if RESERVED_SYMBOLS.contains(symbol.as_str()) {
                return Ok(self.make_token(TokenKind::ReservedSymbol, symbol));
            }
        }

        Err(LexError::UnrecognizedSymbol { symbol, line, col })
    }
}

/// Splits `input` into tokens. The result always ends with exactly one
/// `End` token.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(input).scan()
}
