use log::debug;

use crate::error::RillError;

/// Sink for compile-time and runtime diagnostics.  Renders each error to
/// standard error, records the rendered message, and tracks the flags the
/// driver consults before and after execution.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<String>,
    had_error: bool,
    had_runtime_error: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, error: &RillError) {
        let rendered = error.to_string();

        debug!("Reporting diagnostic: {}", rendered);

        eprintln!("{}", rendered);

        match error {
            RillError::Runtime { .. } | RillError::Io(_) => self.had_runtime_error = true,
            _ => self.had_error = true,
        }

        self.errors.push(rendered);
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// Rendered messages, in report order.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Clear state between REPL lines.
    pub fn reset(&mut self) {
        self.errors.clear();
        self.had_error = false;
        self.had_runtime_error = false;
    }
}
