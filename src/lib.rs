//! Front end for the guppy expression language: a lexer, a precedence
//! climbing parser driven by a configurable operator table, and a syntax
//! tree that consumers walk through visitor traits.

pub mod ast;
#[cfg(feature = "jit")]
pub mod codegen;
pub mod lexer;
pub mod operators;
pub mod parser;
pub mod printer;
pub mod repl;

pub use ast::{ASTNode, ExprVisitor, Expression, NodeVisitor};
pub use operators::{Associativity, BinOp, OperatorTable};
pub use parser::{ParseError, ParseOutcome, Parser};
