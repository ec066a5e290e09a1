use std::num::ParseFloatError;

use crate::{
    ast::{ASTNode, Expression, Prototype},
    lexer::{tokenize, LexError, Token, TokenKind},
    operators::{BinOp, OperatorTable},
};

#[derive(Debug, PartialEq, Clone, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("{message} (found {})", describe(.token))]
    UnexpectedToken { token: Token, message: String },
    #[error("unknown operator `{}` at {}:{}", .token.text, .token.line, .token.col)]
    UnknownOperator { token: Token },
    #[error("invalid number `{}` at {}:{}: {source}", .token.text, .token.line, .token.col)]
    InvalidNumber {
        token: Token,
        source: ParseFloatError,
    },
    #[error("number `{}` at {}:{} is out of range", .token.text, .token.line, .token.col)]
    NumberOutOfRange { token: Token },
    #[error("expression nested too deeply (at {})", describe(.token))]
    TooDeep { token: Token },
}

/// Deepest expression nesting accepted before the parse is rejected, so
/// recursion stays well inside the stack.
pub const MAX_NESTING_DEPTH: usize = 256;

impl ParseError {
    /// The token the parser stopped at, if the failure happened after lexing.
    pub fn token(&self) -> Option<&Token> {
        match self {
            ParseError::Lex(_) => None,
            ParseError::UnexpectedToken { token, .. }
            | ParseError::UnknownOperator { token }
            | ParseError::InvalidNumber { token, .. }
            | ParseError::NumberOutOfRange { token }
            | ParseError::TooDeep { token } => Some(token),
        }
    }
}

fn describe(token: &Token) -> String {
    match token.kind {
        TokenKind::End => format!("end of input at {}:{}", token.line, token.col),
        _ => format!("`{}` at {}:{}", token.text, token.line, token.col),
    }
}

/// Result of parsing one buffer of source text.
#[must_use]
#[derive(Debug, PartialEq, Clone)]
pub enum ParseOutcome {
    /// The whole buffer parsed into these declarations.
    Parsed(Vec<ASTNode>),
    /// The buffer ended in the middle of a construct; append more text and
    /// parse the whole buffer again.
    NeedsMoreInput,
    /// The buffer can never parse; discard it.
    Rejected(ParseError),
}

impl ParseOutcome {
    pub fn is_parsed(&self) -> bool {
        matches!(self, ParseOutcome::Parsed(_))
    }
}

/// Why the parser stopped early.
#[derive(Debug)]
enum Halt {
    Incomplete,
    Error(ParseError),
}

impl From<ParseError> for Halt {
    fn from(err: ParseError) -> Self {
        Halt::Error(err)
    }
}

type PartialParseResult<T> = Result<T, Halt>;

#[derive(Debug, Clone, Default)]
pub struct Parser {
    operators: OperatorTable,
}

impl Parser {
    pub fn new(operators: OperatorTable) -> Self {
        Self { operators }
    }

    pub fn operators(&self) -> &OperatorTable {
        &self.operators
    }

    /// Adds or overrides a binary operator for every later call to `parse`.
    pub fn register_operator(&mut self, op: BinOp) -> Option<BinOp> {
        self.operators.insert(op)
    }

    /// Restores the default operator table.
    pub fn reset(&mut self) {
        self.operators = OperatorTable::default();
    }

    /// Tokenizes and parses `text` from scratch.
    pub fn parse(&self, text: &str) -> ParseOutcome {
        let tokens = match tokenize(text) {
            Ok(tokens) => tokens,
            Err(err) => return ParseOutcome::Rejected(err.into()),
        };

        let mut state = ParseState::new(tokens, &self.operators);
        let mut ast = Vec::new();

        while !state.at_end() {
            match state.parse_statement() {
                Ok(node) => ast.push(node),
                Err(Halt::Incomplete) => return ParseOutcome::NeedsMoreInput,
                Err(Halt::Error(err)) => return ParseOutcome::Rejected(err),
            }
        }

        ParseOutcome::Parsed(ast)
    }
}

/// Cursor over one call's tokens. The token list always ends with `End`
/// and the cursor never moves past it.
struct ParseState<'p> {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    operators: &'p OperatorTable,
}

impl<'p> ParseState<'p> {
    fn new(tokens: Vec<Token>, operators: &'p OperatorTable) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            operators,
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn at_end(&self) -> bool {
        self.peek().kind == TokenKind::End
    }

    fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.at_end() {
            self.pos += 1;
        }
        token
    }

    fn unexpected<T>(&self, message: impl Into<String>) -> PartialParseResult<T> {
        Err(Halt::Error(ParseError::UnexpectedToken {
            token: self.peek().clone(),
            message: message.into(),
        }))
    }

    fn accept_kind(&mut self, kind: TokenKind) -> PartialParseResult<Option<Token>> {
        if self.at_end() {
            Err(Halt::Incomplete)
        } else if self.peek().kind == kind {
            Ok(Some(self.bump()))
        } else {
            Ok(None)
        }
    }

    fn accept_symbol(&mut self, symbol: &str) -> PartialParseResult<bool> {
        if self.at_end() {
            Err(Halt::Incomplete)
        } else if self.peek().is_symbol(symbol) {
            self.bump();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect_kind(&mut self, kind: TokenKind, what: &str) -> PartialParseResult<Token> {
        match self.accept_kind(kind)? {
            Some(token) => Ok(token),
            None => self.unexpected(format!("expected {}", what)),
        }
    }

    fn expect_symbol(&mut self, symbol: &str) -> PartialParseResult<()> {
        if self.accept_symbol(symbol)? {
            Ok(())
        } else {
            self.unexpected(format!("expected `{}`", symbol))
        }
    }

    fn parse_statement(&mut self) -> PartialParseResult<ASTNode> {
        if self.accept_kind(TokenKind::Defn)?.is_some() {
            self.parse_defn()
        } else if self.accept_kind(TokenKind::Extern)?.is_some() {
            Ok(ASTNode::Extern(self.parse_prototype()?))
        } else {
            let body = self.parse_expr(0)?;
            Ok(ASTNode::function(Prototype::anonymous(), body))
        }
    }

    fn parse_defn(&mut self) -> PartialParseResult<ASTNode> {
        let prototype = self.parse_prototype()?;
        self.expect_symbol("{")?;
        let body = self.parse_expr(0)?;
        self.expect_symbol("}")?;
        Ok(ASTNode::function(prototype, body))
    }

    fn parse_prototype(&mut self) -> PartialParseResult<Prototype> {
        let name = self.expect_kind(TokenKind::Identifier, "function name")?.text;
        self.expect_symbol("(")?;

        let mut args = Vec::new();
        while let Some(arg) = self.accept_kind(TokenKind::Identifier)? {
            args.push(arg.text);
            self.accept_symbol(",")?;
        }

        self.expect_symbol(")")?;
        Ok(Prototype::new(name, args))
    }

    fn parse_expr(&mut self, min_precedence: u64) -> PartialParseResult<Expression> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParseError::TooDeep {
                token: self.peek().clone(),
            }
            .into());
        }

        self.depth += 1;
        let res = self.climb(min_precedence);
        self.depth -= 1;
        res
    }

    /// Precedence climbing: folds every operator binding at least as
    /// tightly as `min_precedence` onto the primary expression.
    fn climb(&mut self, min_precedence: u64) -> PartialParseResult<Expression> {
        let mut lhs = self.parse_primary()?;
        let operators = self.operators;

        loop {
            let token = self.peek();
            if token.kind != TokenKind::Operator {
                break;
            }

            let op = operators
                .get(&token.text)
                .ok_or_else(|| ParseError::UnknownOperator {
                    token: token.clone(),
                })?;
            if u64::from(op.precedence) < min_precedence {
                break;
            }
            self.bump();

            let rhs = self.parse_expr(op.rhs_precedence())?;
            lhs = Expression::binary(op.symbol.as_str(), lhs, rhs);
        }

        Ok(lhs)
    }

    fn parse_primary(&mut self) -> PartialParseResult<Expression> {
        if self.peek().is_symbol("(") {
            return self.parse_nested();
        }

        match self.peek().kind {
            TokenKind::Identifier => self.parse_identifier(),
            TokenKind::Number => self.parse_number(),
            TokenKind::End => Err(Halt::Incomplete),
            _ => self.unexpected("expected an expression"),
        }
    }

    fn parse_identifier(&mut self) -> PartialParseResult<Expression> {
        let name = self.expect_kind(TokenKind::Identifier, "identifier")?.text;

        // only a `(` directly after the name makes this a call, so a bare
        // variable at the end of the input is still complete
        if !self.peek().is_symbol("(") {
            return Ok(Expression::Variable(name));
        }
        self.bump();

        let mut args = Vec::new();
        while !self.accept_symbol(")")? {
            args.push(self.parse_expr(0)?);
            self.accept_symbol(",")?;
        }

        Ok(Expression::call(name, args))
    }

    fn parse_number(&mut self) -> PartialParseResult<Expression> {
        let token = self.expect_kind(TokenKind::Number, "number")?;
        match token.text.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Expression::Literal(value)),
            Ok(_) => Err(ParseError::NumberOutOfRange { token }.into()),
            Err(source) => Err(ParseError::InvalidNumber { token, source }.into()),
        }
    }

    fn parse_nested(&mut self) -> PartialParseResult<Expression> {
        self.expect_symbol("(")?;
        let res = self.parse_expr(0)?;
        self.expect_symbol(")")?;
        Ok(res)
    }
}
