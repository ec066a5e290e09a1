use std::{fs, io};

use anyhow::{anyhow, Context as _};
use clap::{App, Arg, ArgMatches};
use guppy::{
    lexer::tokenize,
    printer::{AstPrinter, SourcePrinter},
    repl::Repl,
    BinOp, OperatorTable, ParseOutcome, Parser,
};

#[cfg(feature = "jit")]
use guppy::{codegen::Codegen, ASTNode};
#[cfg(feature = "jit")]
use inkwell::{context::Context, execution_engine::JitFunction};

#[cfg(feature = "jit")]
type EntryFunc = unsafe extern "C" fn() -> f64;

fn app() -> App<'static, 'static> {
    let app = App::new("guppy")
        .version(clap::crate_version!())
        .about("parses guppy source and prints its syntax tree")
        .arg(
            Arg::with_name("FILE")
                .help("source file to parse, starts an interactive shell when omitted")
                .index(1),
        )
        .arg(
            Arg::with_name("tokens")
                .short("t")
                .long("tokens")
                .help("print the token stream before the tree"),
        )
        .arg(
            Arg::with_name("source")
                .short("s")
                .long("source")
                .help("print canonical source instead of the tree"),
        )
        .arg(
            Arg::with_name("operator")
                .short("o")
                .long("operator")
                .value_name("SYM:PREC[:left|right]")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .help("register or override a binary operator"),
        );

    #[cfg(feature = "jit")]
    let app = app.arg(
        Arg::with_name("jit")
            .long("jit")
            .requires("FILE")
            .help("compile FILE and evaluate its top level expressions"),
    );

    app
}

fn operator_table(matches: &ArgMatches) -> anyhow::Result<OperatorTable> {
    let mut table = OperatorTable::default();
    for arg in matches.values_of("operator").into_iter().flatten() {
        let op = arg
            .parse::<BinOp>()
            .with_context(|| format!("invalid operator `{}`", arg))?;
        table.insert(op);
    }
    Ok(table)
}

fn run_file(parser: &Parser, path: &str, matches: &ArgMatches) -> anyhow::Result<()> {
    let source = fs::read_to_string(path).with_context(|| format!("failed to read {}", path))?;
    println!("Source:");
    println!("{}\n", source.trim_end());

    if matches.is_present("tokens") {
        println!("Tokens:");
        for token in tokenize(&source).with_context(|| format!("failed to lex {}", path))? {
            println!("{}", token);
        }
        println!();
    }

    let ast = match parser.parse(&source) {
        ParseOutcome::Parsed(ast) => ast,
        ParseOutcome::NeedsMoreInput => {
            return Err(anyhow!("{} ends in the middle of a statement", path))
        }
        ParseOutcome::Rejected(err) => {
            return Err(err).with_context(|| format!("failed to parse {}", path))
        }
    };

    println!("AST:");
    if matches.is_present("source") {
        print!("{}", SourcePrinter::print(&ast));
    } else {
        print!("{}", AstPrinter::print(&ast));
    }

    #[cfg(feature = "jit")]
    {
        if matches.is_present("jit") {
            run_jit(&ast)?;
        }
    }

    Ok(())
}

#[cfg(feature = "jit")]
fn run_jit(ast: &[ASTNode]) -> anyhow::Result<()> {
    let context = Context::create();

    let mut codegen = Codegen::new(&context);
    codegen.codegen(ast)?;
    println!("IR:");
    println!("{}", codegen.module.print_to_string().to_str()?);

    let ee = codegen
        .module
        .create_jit_execution_engine(inkwell::OptimizationLevel::None)
        .map_err(|e| anyhow!("{}", e.to_string_lossy()))?;

    println!("Result:");
    for name in codegen.anonymous_functions() {
        let entry: JitFunction<EntryFunc> = unsafe { ee.get_function(name) }?;
        unsafe {
            println!("{}", entry.call());
        }
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let matches = app().get_matches();
    let parser = Parser::new(operator_table(&matches)?);

    match matches.value_of("FILE") {
        Some(path) => run_file(&parser, path, &matches),
        None => {
            let stdin = io::stdin();
            let stdout = io::stdout();
            let mut repl = Repl::new(parser)
                .show_tokens(matches.is_present("tokens"))
                .render_source(matches.is_present("source"));
            repl.run(stdin.lock(), stdout.lock())?;
            Ok(())
        }
    }
}
