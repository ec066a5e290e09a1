use std::collections::HashMap;

use inkwell::{
    builder::Builder,
    context::Context,
    module::Module,
    types::BasicTypeEnum,
    values::{BasicValueEnum, FloatValue, FunctionValue},
    FloatPredicate,
};

use crate::ast::{
    ASTNode, BinaryExpr, CallExpr, ExprVisitor, Function, NodeVisitor, Prototype, ANONYMOUS_FN,
};

const POW_INTRINSIC: &str = "llvm.pow.f64";

#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    #[error("unknown variable referenced {0}")]
    UnknownVariable(String),
    #[error("unknown operator {0}")]
    UnknownOperator(String),
    #[error("unknown function {0}")]
    UnknownFunction(String),
    #[error("invalid number of args in call {0} expected {1} found {2}")]
    InvalidCall(String, usize, usize),
    #[error("call to {0} produced no value")]
    VoidCall(String),
    #[error("failed to verify function {0}")]
    InvalidFunction(String),
}

type ExprResult<'a> = Result<FloatValue<'a>, CodegenError>;
type FnResult<'a> = Result<FunctionValue<'a>, CodegenError>;

pub struct Codegen<'a> {
    pub context: &'a Context,
    pub module: Module<'a>,
    pub builder: Builder<'a>,
    pub named_values: HashMap<String, FloatValue<'a>>,
    anonymous: Vec<String>,
}

impl<'a> Codegen<'a> {
    pub fn new(context: &'a Context) -> Codegen<'a> {
        let module = context.create_module("guppy");
        let builder = context.create_builder();

        Codegen {
            context,
            module,
            builder,
            named_values: HashMap::new(),
            anonymous: Vec::new(),
        }
    }

    /// Names given to the top level expressions compiled so far, in order.
    pub fn anonymous_functions(&self) -> &[String] {
        &self.anonymous
    }

    fn compile_proto(&self, name: &str, proto: &Prototype) -> FnResult<'a> {
        let args_types = std::iter::repeat(self.context.f64_type())
            .take(proto.args.len())
            .map(|f| f.into())
            .collect::<Vec<BasicTypeEnum>>();
        let args_types = args_types.as_slice();

        let fn_type = self.context.f64_type().fn_type(args_types, false);
        let fn_val = self.module.add_function(name, fn_type, None);

        for (i, arg) in fn_val.get_param_iter().enumerate() {
            arg.into_float_value().set_name(proto.args[i].as_str());
        }

        Ok(fn_val)
    }

    fn pow_intrinsic(&self) -> FunctionValue<'a> {
        match self.module.get_function(POW_INTRINSIC) {
            Some(func) => func,
            None => {
                let f64_type = self.context.f64_type();
                let fn_type = f64_type.fn_type(&[f64_type.into(), f64_type.into()], false);
                self.module.add_function(POW_INTRINSIC, fn_type, None)
            }
        }
    }

    fn call_float(
        &self,
        func: FunctionValue<'a>,
        args: &[FloatValue<'a>],
        name: &str,
    ) -> ExprResult<'a> {
        let argsv: Vec<BasicValueEnum> = args.iter().map(|&val| val.into()).collect();

        self.builder
            .build_call(func, argsv.as_slice(), "tmp")
            .try_as_basic_value()
            .left()
            .map(|value| value.into_float_value())
            .ok_or_else(|| CodegenError::VoidCall(name.to_string()))
    }

    pub fn codegen(&mut self, ast_nodes: &[ASTNode]) -> Result<(), CodegenError> {
        for node in ast_nodes {
            node.accept(self)?;
        }

        Ok(())
    }
}

impl<'a> NodeVisitor for Codegen<'a> {
    type Output = FnResult<'a>;

    fn visit_extern(&mut self, proto: &Prototype) -> FnResult<'a> {
        match self.module.get_function(&proto.name) {
            Some(func) => Ok(func),
            None => self.compile_proto(&proto.name, proto),
        }
    }

    fn visit_function(&mut self, function: &Function) -> FnResult<'a> {
        let Function {
            prototype: proto,
            body,
        } = function;

        // every top level expression gets its own name so they can share a
        // module
        let name = if proto.is_anonymous() {
            format!("{}{}", ANONYMOUS_FN, self.anonymous.len())
        } else {
            proto.name.clone()
        };
        let llvm_func = self.compile_proto(&name, proto)?;

        let entry = self.context.append_basic_block(llvm_func, "entry");

        self.builder.position_at_end(entry);

        self.named_values.clear();
        self.named_values.reserve(proto.args.len());

        for (i, arg) in llvm_func.get_param_iter().enumerate() {
            self.named_values
                .insert(proto.args[i].clone(), arg.into_float_value());
        }

        let body = match body.accept(self) {
            Ok(body) => body,
            Err(err) => {
                unsafe {
                    llvm_func.delete();
                }
                return Err(err);
            }
        };

        self.builder.build_return(Some(&body));

        if llvm_func.verify(true) {
            if proto.is_anonymous() {
                self.anonymous.push(name);
            }
            Ok(llvm_func)
        } else {
            unsafe {
                llvm_func.delete();
            }

            Err(CodegenError::InvalidFunction(proto.name.clone()))
        }
    }
}

impl<'a> ExprVisitor for Codegen<'a> {
    type Output = ExprResult<'a>;

    fn visit_literal(&mut self, value: f64) -> ExprResult<'a> {
        Ok(self.context.f64_type().const_float(value))
    }

    fn visit_variable(&mut self, name: &str) -> ExprResult<'a> {
        match self.named_values.get(name) {
            Some(var) => Ok(*var),
            None => Err(CodegenError::UnknownVariable(name.to_string())),
        }
    }

    fn visit_binary(&mut self, expr: &BinaryExpr) -> ExprResult<'a> {
        let lhs = expr.lhs.accept(self)?;
        let rhs = expr.rhs.accept(self)?;

        match expr.op.as_str() {
            "+" => Ok(self.builder.build_float_add(lhs, rhs, "tmpadd")),
            "-" => Ok(self.builder.build_float_sub(lhs, rhs, "tmpsub")),
            "*" => Ok(self.builder.build_float_mul(lhs, rhs, "tmpmul")),
            "<" => {
                let cmp = self
                    .builder
                    .build_float_compare(FloatPredicate::ULT, lhs, rhs, "tmpcmp");
                Ok(self
                    .builder
                    .build_unsigned_int_to_float(cmp, self.context.f64_type(), "tmpbool"))
            }
            "^" => {
                let pow = self.pow_intrinsic();
                self.call_float(pow, &[lhs, rhs], POW_INTRINSIC)
            }
            _ => Err(CodegenError::UnknownOperator(expr.op.clone())),
        }
    }

    fn visit_call(&mut self, expr: &CallExpr) -> ExprResult<'a> {
        let CallExpr { callee, args } = expr;
        let func = match self.module.get_function(callee) {
            Some(func) => func,
            None => return Err(CodegenError::UnknownFunction(callee.clone())),
        };

        if func.get_params().len() != args.len() {
            return Err(CodegenError::InvalidCall(
                callee.clone(),
                func.get_params().len(),
                args.len(),
            ));
        }

        let mut gened_args = Vec::with_capacity(args.len());

        for arg in args {
            gened_args.push(arg.accept(self)?);
        }

        self.call_float(func, &gened_args, callee)
    }
}

#[cfg(test)]
mod tests {
    use inkwell::context::Context;

    use super::*;
    use crate::parser::{ParseOutcome, Parser};

    fn parse(input: &str) -> Vec<ASTNode> {
        match Parser::default().parse(input) {
            ParseOutcome::Parsed(ast) => ast,
            other => panic!("{:?} did not parse: {:?}", input, other),
        }
    }

    #[test]
    fn codegen_works() {
        let ast = parse("extern sin(x) defn thing(x) { sin(x) * x + 1 } thing(2) ^ 2 < 3");
        let context = Context::create();
        let mut codegen = Codegen::new(&context);
        codegen.codegen(&ast).unwrap();

        let ir = codegen.module.print_to_string().to_string();
        assert!(ir.contains("declare double @sin(double"));
        assert!(ir.contains("define double @thing(double"));
        assert!(ir.contains("fmul"));
        assert!(ir.contains("fadd"));
        assert!(ir.contains("@llvm.pow.f64"));
        assert!(ir.contains("fcmp ult"));
        assert_eq!(codegen.anonymous_functions(), ["__ANON__0".to_string()]);
    }

    #[test]
    fn anonymous_functions_get_unique_names() {
        let ast = parse("1 2 3");
        let context = Context::create();
        let mut codegen = Codegen::new(&context);
        codegen.codegen(&ast).unwrap();
        assert_eq!(
            codegen.anonymous_functions(),
            ["__ANON__0", "__ANON__1", "__ANON__2"]
        );
    }

    #[test]
    fn argument_count_is_checked() {
        let context = Context::create();
        let mut codegen = Codegen::new(&context);
        let err = codegen.codegen(&parse("extern f(a b) f(1)")).unwrap_err();
        assert!(matches!(err, CodegenError::InvalidCall(name, 2, 1) if name == "f"));
    }

    #[test]
    fn unknown_names_are_errors() {
        let context = Context::create();
        let mut codegen = Codegen::new(&context);
        assert!(matches!(
            codegen.codegen(&parse("defn f(x) { y }")),
            Err(CodegenError::UnknownVariable(_))
        ));
        assert!(matches!(
            codegen.codegen(&parse("g(1)")),
            Err(CodegenError::UnknownFunction(_))
        ));
        let mut parser = Parser::default();
        parser.register_operator("%:40".parse().unwrap());
        match parser.parse("1 % 2") {
            ParseOutcome::Parsed(ast) => assert!(matches!(
                codegen.codegen(&ast),
                Err(CodegenError::UnknownOperator(_))
            )),
            other => panic!("unexpected {:?}", other),
        }
    }
}
