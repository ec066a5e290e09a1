use std::{collections::HashMap, fmt, str::FromStr};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Associativity {
    Left,
    Right,
}

impl fmt::Display for Associativity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Associativity::Left => f.write_str("left"),
            Associativity::Right => f.write_str("right"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct BinOp {
    pub symbol: String,
    pub precedence: u32,
    pub associativity: Associativity,
}

impl BinOp {
    pub fn new(symbol: impl Into<String>, precedence: u32, associativity: Associativity) -> Self {
        Self {
            symbol: symbol.into(),
            precedence,
            associativity,
        }
    }

    /// Minimum precedence for the right operand: one above our own for left
    /// associative operators so equal precedence folds to the left. Widened
    /// so `u32::MAX` still has a level above it.
    pub fn rhs_precedence(&self) -> u64 {
        let precedence = u64::from(self.precedence);
        match self.associativity {
            Associativity::Left => precedence + 1,
            Associativity::Right => precedence,
        }
    }
}

#[derive(Debug, PartialEq, Clone, thiserror::Error)]
pub enum BinOpParseError {
    #[error("expected SYMBOL:PRECEDENCE[:left|right], found `{0}`")]
    Malformed(String),
    #[error("`{0}` contains characters that can't form an operator")]
    InvalidSymbol(String),
    #[error("invalid precedence `{0}`")]
    InvalidPrecedence(String),
    #[error("invalid associativity `{0}`")]
    InvalidAssociativity(String),
}

/// Parses the `SYMBOL:PRECEDENCE[:left|right]` form used on the command line.
impl FromStr for BinOp {
    type Err = BinOpParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let (symbol, precedence, associativity) = match parts.as_slice() {
            [symbol, precedence] => (*symbol, *precedence, "left"),
            [symbol, precedence, associativity] => (*symbol, *precedence, *associativity),
            _ => return Err(BinOpParseError::Malformed(s.to_string())),
        };

        if symbol.is_empty() || !symbol.chars().all(crate::lexer::is_operator_char) {
            return Err(BinOpParseError::InvalidSymbol(symbol.to_string()));
        }

        let precedence = precedence
            .parse()
            .map_err(|_| BinOpParseError::InvalidPrecedence(precedence.to_string()))?;

        let associativity = match associativity.to_ascii_lowercase().as_str() {
            "left" | "l" => Associativity::Left,
            "right" | "r" => Associativity::Right,
            _ => {
                return Err(BinOpParseError::InvalidAssociativity(
                    associativity.to_string(),
                ))
            }
        };

        Ok(BinOp::new(symbol, precedence, associativity))
    }
}

#[derive(Debug, PartialEq, Clone, thiserror::Error)]
#[error("unknown operator {0}")]
pub struct UnknownOperator(pub String);

/// The binary operators a parser knows about, keyed by symbol.
#[derive(Debug, PartialEq, Clone)]
pub struct OperatorTable {
    operators: HashMap<String, BinOp>,
}

impl std::default::Default for OperatorTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.insert(BinOp::new("<", 10, Associativity::Left));
        table.insert(BinOp::new("+", 20, Associativity::Left));
        table.insert(BinOp::new("-", 20, Associativity::Left));
        table.insert(BinOp::new("*", 40, Associativity::Left));
        table.insert(BinOp::new("^", 50, Associativity::Right));
        table
    }
}

impl OperatorTable {
    pub fn empty() -> Self {
        Self {
            operators: HashMap::new(),
        }
    }

    /// Adds `op`, returning the entry it replaced if the symbol was taken.
    pub fn insert(&mut self, op: BinOp) -> Option<BinOp> {
        self.operators.insert(op.symbol.clone(), op)
    }

    pub fn get(&self, symbol: &str) -> Option<&BinOp> {
        self.operators.get(symbol)
    }

    pub fn lookup(&self, symbol: &str) -> Result<&BinOp, UnknownOperator> {
        self.get(symbol)
            .ok_or_else(|| UnknownOperator(symbol.to_string()))
    }

    pub fn precedence(&self, symbol: &str) -> Result<u32, UnknownOperator> {
        self.lookup(symbol).map(|op| op.precedence)
    }

    pub fn associativity(&self, symbol: &str) -> Result<Associativity, UnknownOperator> {
        self.lookup(symbol).map(|op| op.associativity)
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Entries ordered by precedence, then symbol.
    pub fn iter(&self) -> impl Iterator<Item = &BinOp> {
        let mut ops: Vec<&BinOp> = self.operators.values().collect();
        ops.sort_by(|a, b| {
            a.precedence
                .cmp(&b.precedence)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        ops.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let table = OperatorTable::default();
        assert_eq!(table.len(), 5);
        assert_eq!(table.precedence("<"), Ok(10));
        assert_eq!(table.precedence("+"), Ok(20));
        assert_eq!(table.precedence("-"), Ok(20));
        assert_eq!(table.precedence("*"), Ok(40));
        assert_eq!(table.precedence("^"), Ok(50));
        assert_eq!(table.associativity("^"), Ok(Associativity::Right));
        assert_eq!(table.associativity("-"), Ok(Associativity::Left));
    }

    #[test]
    fn unknown_symbol() {
        let table = OperatorTable::default();
        assert_eq!(table.precedence("<>"), Err(UnknownOperator("<>".to_string())));
        assert_eq!(
            table.associativity("/"),
            Err(UnknownOperator("/".to_string()))
        );
    }

    #[test]
    fn insert_replaces_by_symbol() {
        let mut table = OperatorTable::default();
        let old = table.insert(BinOp::new("+", 60, Associativity::Right));
        assert_eq!(old, Some(BinOp::new("+", 20, Associativity::Left)));
        assert_eq!(table.len(), 5);
        assert_eq!(table.precedence("+"), Ok(60));

        assert_eq!(table.insert(BinOp::new("&&", 5, Associativity::Left)), None);
        assert_eq!(table.len(), 6);
    }

    #[test]
    fn iter_is_ordered() {
        let table = OperatorTable::default();
        let symbols: Vec<&str> = table
            .iter()
            .map(|op| op.symbol.as_str())
            .collect();
        assert_eq!(symbols, vec!["<", "+", "-", "*", "^"]);
    }

    #[test]
    fn rhs_precedence_follows_associativity() {
        assert_eq!(BinOp::new("+", 20, Associativity::Left).rhs_precedence(), 21);
        assert_eq!(BinOp::new("^", 50, Associativity::Right).rhs_precedence(), 50);
        assert_eq!(
            BinOp::new("&", u32::MAX, Associativity::Left).rhs_precedence(),
            u64::from(u32::MAX) + 1
        );
    }

    #[test]
    fn parse_from_str() {
        assert_eq!(
            "%:30".parse::<BinOp>(),
            Ok(BinOp::new("%", 30, Associativity::Left))
        );
        assert_eq!(
            "**:60:right".parse::<BinOp>(),
            Ok(BinOp::new("**", 60, Associativity::Right))
        );
        assert_eq!(
            "/:40".parse::<BinOp>(),
            Err(BinOpParseError::InvalidSymbol("/".to_string()))
        );
        assert_eq!(
            "+:high".parse::<BinOp>(),
            Err(BinOpParseError::InvalidPrecedence("high".to_string()))
        );
        assert_eq!(
            "+:1:up".parse::<BinOp>(),
            Err(BinOpParseError::InvalidAssociativity("up".to_string()))
        );
        assert_eq!(
            "+".parse::<BinOp>(),
            Err(BinOpParseError::Malformed("+".to_string()))
        );
    }
}
