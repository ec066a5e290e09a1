//! Syntax tree produced by the parser.
//!
//! Both node families are closed enums. Consumers walk them through
//! [`NodeVisitor`] and [`ExprVisitor`]: `accept` picks the handler for the
//! node's variant, and the handler decides whether and when to recurse into
//! children. Adding a consumer never touches this module; adding a variant
//! means updating every visitor.

/// Name given to the function wrapping a bare top level expression.
pub const ANONYMOUS_FN: &str = "__ANON__";

#[derive(Debug, PartialEq, Clone)]
pub struct Prototype {
    pub name: String,
    pub args: Vec<String>,
}

impl Prototype {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS_FN, Vec::new())
    }

    pub fn is_anonymous(&self) -> bool {
        self.name == ANONYMOUS_FN && self.args.is_empty()
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct BinaryExpr {
    pub op: String,
    pub lhs: Box<Expression>,
    pub rhs: Box<Expression>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct CallExpr {
    pub callee: String,
    pub args: Vec<Expression>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    Literal(f64),
    Variable(String),
    Binary(BinaryExpr),
    Call(CallExpr),
}

impl Expression {
    pub fn binary(op: impl Into<String>, lhs: Expression, rhs: Expression) -> Self {
        Expression::Binary(BinaryExpr {
            op: op.into(),
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn call(callee: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::Call(CallExpr {
            callee: callee.into(),
            args,
        })
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Expression::Variable(name.into())
    }

    pub fn accept<V: ExprVisitor + ?Sized>(&self, visitor: &mut V) -> V::Output {
        match self {
            Expression::Literal(value) => visitor.visit_literal(*value),
            Expression::Variable(name) => visitor.visit_variable(name),
            Expression::Binary(expr) => visitor.visit_binary(expr),
            Expression::Call(expr) => visitor.visit_call(expr),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Function {
    pub prototype: Prototype,
    pub body: Expression,
}

#[derive(Debug, PartialEq, Clone)]
pub enum ASTNode {
    Extern(Prototype),
    Function(Function),
}

impl ASTNode {
    pub fn function(prototype: Prototype, body: Expression) -> Self {
        ASTNode::Function(Function { prototype, body })
    }

    pub fn prototype(&self) -> &Prototype {
        match self {
            ASTNode::Extern(proto) => proto,
            ASTNode::Function(func) => &func.prototype,
        }
    }

    pub fn accept<V: NodeVisitor + ?Sized>(&self, visitor: &mut V) -> V::Output {
        match self {
            ASTNode::Extern(proto) => visitor.visit_extern(proto),
            ASTNode::Function(func) => visitor.visit_function(func),
        }
    }
}

/// One handler per declaration variant.
pub trait NodeVisitor {
    type Output;

    fn visit_extern(&mut self, proto: &Prototype) -> Self::Output;
    fn visit_function(&mut self, func: &Function) -> Self::Output;
}

/// One handler per expression variant. Handlers for composite nodes are
/// responsible for visiting their own children.
pub trait ExprVisitor {
    type Output;

    fn visit_literal(&mut self, value: f64) -> Self::Output;
    fn visit_variable(&mut self, name: &str) -> Self::Output;
    fn visit_binary(&mut self, expr: &BinaryExpr) -> Self::Output;
    fn visit_call(&mut self, expr: &CallExpr) -> Self::Output;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Counts nodes and records operators in visiting order.
    #[derive(Default)]
    struct Census {
        nodes: usize,
        ops: Vec<String>,
        externs: Vec<String>,
    }

    impl ExprVisitor for Census {
        type Output = ();

        fn visit_literal(&mut self, _value: f64) {
            self.nodes += 1;
        }

        fn visit_variable(&mut self, _name: &str) {
            self.nodes += 1;
        }

        fn visit_binary(&mut self, expr: &BinaryExpr) {
            self.nodes += 1;
            expr.lhs.accept(self);
            self.ops.push(expr.op.clone());
            expr.rhs.accept(self);
        }

        fn visit_call(&mut self, expr: &CallExpr) {
            self.nodes += 1;
            for arg in &expr.args {
                arg.accept(self);
            }
        }
    }

    impl NodeVisitor for Census {
        type Output = ();

        fn visit_extern(&mut self, proto: &Prototype) {
            self.externs.push(proto.name.clone());
        }

        fn visit_function(&mut self, func: &Function) {
            func.body.accept(self);
        }
    }

    /// Folds an expression to a number, to show visitors can return values.
    struct Depth;

    impl ExprVisitor for Depth {
        type Output = usize;

        fn visit_literal(&mut self, _value: f64) -> usize {
            1
        }

        fn visit_variable(&mut self, _name: &str) -> usize {
            1
        }

        fn visit_binary(&mut self, expr: &BinaryExpr) -> usize {
            1 + expr.lhs.accept(self).max(expr.rhs.accept(self))
        }

        fn visit_call(&mut self, expr: &CallExpr) -> usize {
            1 + expr.args.iter().map(|arg| arg.accept(self)).max().unwrap_or(0)
        }
    }

    fn sample() -> Vec<ASTNode> {
        vec![
            ASTNode::Extern(Prototype::new("sin", vec!["x".to_string()])),
            ASTNode::function(
                Prototype::anonymous(),
                Expression::binary(
                    "+",
                    Expression::Literal(1.0),
                    Expression::call(
                        "sin",
                        vec![Expression::binary(
                            "*",
                            Expression::variable("x"),
                            Expression::Literal(2.0),
                        )],
                    ),
                ),
            ),
        ]
    }

    #[test]
    fn visits_depth_first_left_to_right() {
        let mut census = Census::default();
        for node in &sample() {
            node.accept(&mut census);
        }
        assert_eq!(census.nodes, 6);
        assert_eq!(census.ops, vec!["+".to_string(), "*".to_string()]);
        assert_eq!(census.externs, vec!["sin".to_string()]);
    }

    #[test]
    fn visitors_can_return_values() {
        let ast = sample();
        match &ast[1] {
            ASTNode::Function(func) => assert_eq!(func.body.accept(&mut Depth), 4),
            other => panic!("expected a function, found {:?}", other),
        }
    }

    #[test]
    fn anonymous_prototype() {
        assert!(Prototype::anonymous().is_anonymous());
        assert!(!Prototype::new(ANONYMOUS_FN, vec!["x".to_string()]).is_anonymous());
        assert_eq!(sample()[0].prototype().name, "sin");
    }
}
