//! Consumers that turn a syntax tree back into text.

use crate::ast::{
    ASTNode, BinaryExpr, CallExpr, ExprVisitor, Expression, Function, NodeVisitor, Prototype,
};

const INDENT: &str = "|  ";

/// Indented dump of the tree, one node per line.
#[derive(Debug, Default)]
pub struct AstPrinter {
    depth: usize,
    output: String,
}

impl AstPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns everything printed so far and clears the buffer.
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    pub fn print(ast: &[ASTNode]) -> String {
        let mut printer = Self::new();
        for node in ast {
            node.accept(&mut printer);
        }
        printer.take_output()
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.output.push_str(INDENT);
        }
        self.output.push_str(text);
        self.output.push('\n');
    }

    fn nested(&mut self, f: impl FnOnce(&mut Self)) {
        self.depth += 1;
        f(self);
        self.depth -= 1;
    }

    fn prototype(&mut self, proto: &Prototype) {
        self.line(&format!("FUNCTION NAME: {}", proto.name));
        self.line(&format!("FUNCTION ARGS: {}", proto.args.join(" ")));
    }
}

impl NodeVisitor for AstPrinter {
    type Output = ();

    fn visit_extern(&mut self, proto: &Prototype) {
        self.line("EXTERN:");
        self.nested(|p| p.prototype(proto));
        self.output.push('\n');
    }

    fn visit_function(&mut self, func: &Function) {
        self.line("DEFN:");
        self.nested(|p| {
            p.prototype(&func.prototype);
            p.line("BODY:");
            p.nested(|p| func.body.accept(p));
        });
        self.output.push('\n');
    }
}

impl ExprVisitor for AstPrinter {
    type Output = ();

    fn visit_literal(&mut self, value: f64) {
        self.line(&format!("DOUBLE: {}", value));
    }

    fn visit_variable(&mut self, name: &str) {
        self.line(&format!("VARIABLE: {}", name));
    }

    fn visit_binary(&mut self, expr: &BinaryExpr) {
        self.line(&format!("BINOP: {}", expr.op));
        self.nested(|p| {
            expr.lhs.accept(p);
            expr.rhs.accept(p);
        });
    }

    fn visit_call(&mut self, expr: &CallExpr) {
        self.line("CALL:");
        self.nested(|p| {
            p.line(&format!("FUNCTION: {}", expr.callee));
            p.line("ARGUMENTS:");
            p.nested(|p| {
                for (i, arg) in expr.args.iter().enumerate() {
                    p.line(&format!("ARG {}:", i + 1));
                    p.nested(|p| arg.accept(p));
                }
            });
        });
    }
}

/// Renders source text that parses back to an equal tree. Binary
/// expressions are fully parenthesised so the output doesn't depend on the
/// operator table's precedences.
#[derive(Debug, Default)]
pub struct SourcePrinter {
    output: String,
}

impl SourcePrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn print(ast: &[ASTNode]) -> String {
        let mut printer = Self::new();
        for node in ast {
            node.accept(&mut printer);
            printer.output.push('\n');
        }
        printer.output
    }

    fn prototype(&mut self, proto: &Prototype) {
        self.output.push_str(&proto.name);
        self.output.push('(');
        self.output.push_str(&proto.args.join(", "));
        self.output.push(')');
    }
}

impl NodeVisitor for SourcePrinter {
    type Output = ();

    fn visit_extern(&mut self, proto: &Prototype) {
        self.output.push_str("extern ");
        self.prototype(proto);
    }

    fn visit_function(&mut self, func: &Function) {
        if func.prototype.is_anonymous() {
            // a bare name followed by a parenthesised statement would read
            // back as a call
            if let Expression::Variable(name) = &func.body {
                self.output.push_str(&format!("({})", name));
            } else {
                func.body.accept(self);
            }
            return;
        }
        self.output.push_str("defn ");
        self.prototype(&func.prototype);
        self.output.push_str(" { ");
        func.body.accept(self);
        self.output.push_str(" }");
    }
}

impl ExprVisitor for SourcePrinter {
    type Output = ();

    fn visit_literal(&mut self, value: f64) {
        self.output.push_str(&value.to_string());
    }

    fn visit_variable(&mut self, name: &str) {
        self.output.push_str(name);
    }

    fn visit_binary(&mut self, expr: &BinaryExpr) {
        self.output.push('(');
        expr.lhs.accept(self);
        self.output.push(' ');
        self.output.push_str(&expr.op);
        self.output.push(' ');
        expr.rhs.accept(self);
        self.output.push(')');
    }

    fn visit_call(&mut self, expr: &CallExpr) {
        self.output.push_str(&expr.callee);
        self.output.push('(');
        for (i, arg) in expr.args.iter().enumerate() {
            if i > 0 {
                self.output.push_str(", ");
            }
            arg.accept(self);
        }
        self.output.push(')');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ParseOutcome, Parser};
    use pretty_assertions::assert_eq;

    fn parse(parser: &Parser, input: &str) -> Vec<ASTNode> {
        match parser.parse(input) {
            ParseOutcome::Parsed(ast) => ast,
            other => panic!("{:?} did not parse: {:?}", input, other),
        }
    }

    #[test]
    fn tree_dump() {
        let ast = parse(&Parser::default(), "extern sin(x)\ndefn f(a, b) { a + g(b, 2.5) }");
        let expected = "\
EXTERN:
|  FUNCTION NAME: sin
|  FUNCTION ARGS: x

DEFN:
|  FUNCTION NAME: f
|  FUNCTION ARGS: a b
|  BODY:
|  |  BINOP: +
|  |  |  VARIABLE: a
|  |  |  CALL:
|  |  |  |  FUNCTION: g
|  |  |  |  ARGUMENTS:
|  |  |  |  |  ARG 1:
|  |  |  |  |  |  VARIABLE: b
|  |  |  |  |  ARG 2:
|  |  |  |  |  |  DOUBLE: 2.5

";
        assert_eq!(AstPrinter::print(&ast), expected);
    }

    #[test]
    fn printer_output_is_taken() {
        let ast = parse(&Parser::default(), "1");
        let mut printer = AstPrinter::new();
        ast[0].accept(&mut printer);
        assert_eq!(
            printer.take_output(),
            "DEFN:\n|  FUNCTION NAME: __ANON__\n|  FUNCTION ARGS: \n|  BODY:\n|  |  DOUBLE: 1\n\n"
        );
        assert_eq!(printer.take_output(), "");
    }

    #[test]
    fn source_rendering() {
        let ast = parse(
            &Parser::default(),
            "extern atan2(y x) defn f(a) { 1 + 2 * a } f(3)^2^0.5",
        );
        assert_eq!(
            SourcePrinter::print(&ast),
            "extern atan2(y, x)\ndefn f(a) { (1 + (2 * a)) }\n(f(3) ^ (2 ^ 0.5))\n"
        );
    }

    #[test]
    fn rendering_round_trips() {
        let parser = Parser::default();
        let inputs = [
            "1 + 2 * 3",
            "2 ^ 3 ^ 2",
            "(1 - 2) - (3 - 4) - 5",
            "extern sin(x) extern pair(a, b)",
            "defn foo(x y) { x * (y + 1) < bar(x, 2.25, baz()) }",
            "defn zero() { 0 } zero() + 0.125",
            "a < b < c ^ (d ^ e) * f",
            "(x) (1 + 2) y",
        ];
        for input in inputs.iter() {
            let ast = parse(&parser, input);
            let rendered = SourcePrinter::print(&ast);
            assert_eq!(parse(&parser, &rendered), ast, "{}", rendered);
        }
    }

    #[test]
    fn extreme_literals_round_trip() {
        let parser = Parser::default();
        for value in [f64::MAX, f64::MIN_POSITIVE, 1e-300, 0.1].iter() {
            let ast = parse(&parser, &value.to_string());
            let rendered = SourcePrinter::print(&ast);
            assert_eq!(rendered, format!("{}\n", value));
            assert_eq!(parse(&parser, &rendered), ast);
        }

        let overflowing = format!("{}0", f64::MAX);
        assert!(matches!(
            parser.parse(&overflowing),
            ParseOutcome::Rejected(crate::parser::ParseError::NumberOutOfRange { .. })
        ));
    }
}
