use std::io::{self, BufRead, Write};

use crate::{
    lexer::tokenize,
    parser::{ParseOutcome, Parser},
    printer::{AstPrinter, SourcePrinter},
};

pub const PROMPT: &str = "guppy> ";
pub const CONTINUATION_PROMPT: &str = "  ...> ";
const QUIT: &str = ":q";

/// Line buffering shell. Lines accumulate until the buffer parses or is
/// rejected; every attempt re-parses the whole buffer.
#[derive(Debug, Default)]
pub struct Repl {
    parser: Parser,
    buffer: String,
    show_tokens: bool,
    render_source: bool,
}

impl Repl {
    pub fn new(parser: Parser) -> Self {
        Self {
            parser,
            ..Self::default()
        }
    }

    pub fn show_tokens(mut self, show_tokens: bool) -> Self {
        self.show_tokens = show_tokens;
        self
    }

    pub fn render_source(mut self, render_source: bool) -> Self {
        self.render_source = render_source;
        self
    }

    /// Text waiting for more input.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Appends `line` to the buffer and parses everything buffered so far.
    /// The buffer is kept only when more input is needed.
    pub fn feed(&mut self, line: &str) -> ParseOutcome {
        let outcome = self.append_and_parse(line);
        self.settle(&outcome);
        outcome
    }

    fn append_and_parse(&mut self, line: &str) -> ParseOutcome {
        self.buffer.push_str(line);
        self.buffer.push('\n');
        self.parser.parse(&self.buffer)
    }

    fn settle(&mut self, outcome: &ParseOutcome) {
        if *outcome != ParseOutcome::NeedsMoreInput {
            self.buffer.clear();
        }
    }

    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        let mut lines = input.lines();

        loop {
            let prompt = if self.buffer.is_empty() {
                PROMPT
            } else {
                CONTINUATION_PROMPT
            };
            write!(output, "{}", prompt)?;
            output.flush()?;

            let line = match lines.next() {
                Some(line) => line?,
                None => break,
            };
            if line.trim() == QUIT {
                break;
            }

            let outcome = self.append_and_parse(&line);
            match &outcome {
                ParseOutcome::Parsed(ast) => {
                    if self.show_tokens {
                        self.print_tokens(&mut output)?;
                    }
                    if self.render_source {
                        write!(output, "{}", SourcePrinter::print(ast))?;
                    } else {
                        write!(output, "{}", AstPrinter::print(ast))?;
                    }
                }
                ParseOutcome::NeedsMoreInput => (),
                ParseOutcome::Rejected(err) => writeln!(output, "error: {}", err)?,
            }
            self.settle(&outcome);
        }

        writeln!(output)?;
        Ok(())
    }

    fn print_tokens<W: Write>(&self, output: &mut W) -> io::Result<()> {
        match tokenize(&self.buffer) {
            Ok(tokens) => {
                for token in tokens {
                    writeln!(output, "{}", token)?;
                }
            }
            Err(err) => writeln!(output, "error: {}", err)?,
        }
        Ok(())
    }
}
