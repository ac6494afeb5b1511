use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;
use std::time::Instant;

use log::info;

use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;

/// Orchestrates scan → parse → resolve → interpret.  Owns the interpreter
/// (so globals and resolver distances persist across REPL lines) and the
/// diagnostics sink with its error flags.
pub struct Driver {
    interpreter: Interpreter,
    diagnostics: Diagnostics,
}

impl Driver {
    pub fn new() -> Self {
        Driver {
            interpreter: Interpreter::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Run one source unit through the full pipeline.
    pub fn run(&mut self, source: Vec<u8>) {
        let scanner = Scanner::new(source);

        let mut parser = Parser::new(scanner, &mut self.diagnostics);
        let statements = parser.parse();

        if self.diagnostics.had_error() {
            info!("Skipping execution: parse stage reported errors");
            return;
        }

        let mut resolver = Resolver::new(&mut self.interpreter);
        if let Err(e) = resolver.resolve(&statements) {
            self.diagnostics.report(&e);
        }

        if self.diagnostics.had_error() {
            info!("Skipping execution: resolve stage reported errors");
            return;
        }

        if let Err(e) = self.interpreter.interpret(&statements) {
            self.diagnostics.report(&e);
        }
    }

    /// Execute a script file and return the process exit code: 70 after a
    /// runtime error, 65 after compile-stage errors, otherwise 0 (printing
    /// the elapsed milliseconds).
    pub fn run_file(&mut self, path: &Path) -> Result<i32> {
        info!("Running file {}", path.display());

        let mut buf: Vec<u8> = Vec::new();
        let mut reader: BufReader<File> = BufReader::new(File::open(path)?);
        reader.read_to_end(&mut buf)?;

        let start = Instant::now();

        self.run(buf);

        if self.diagnostics.had_runtime_error() {
            return Ok(70);
        }

        if self.diagnostics.had_error() {
            return Ok(65);
        }

        println!("{}", start.elapsed().as_millis());

        Ok(0)
    }

    /// Interactive prompt.  Each line runs as a single source string (with a
    /// `;` appended when missing) against the persistent interpreter; error
    /// flags reset between lines so one mistake does not poison the session.
    pub fn run_prompt(&mut self) -> Result<()> {
        info!("Starting REPL");

        let stdin = io::stdin();

        loop {
            print!("> ");
            io::stdout().flush()?;

            let mut line = String::new();
            if stdin.read_line(&mut line)? == 0 {
                break;
            }

            let mut source = line.trim_end().to_string();
            if source.is_empty() {
                continue;
            }

            if !source.ends_with(';') {
                source.push(';');
            }

            self.run(source.into_bytes());

            self.diagnostics.reset();
        }

        Ok(())
    }
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}
