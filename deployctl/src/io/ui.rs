//! User-facing output sink.
//!
//! Tracing is for developer diagnostics; anything the user is meant to read
//! goes through [`Ui`].

/// Minimal terminal contract used by the init phase and the dispatcher.
pub trait Ui {
    /// Status or result line.
    fn output(&self, message: &str);
    /// Error line, shown once at the point of failure.
    fn error(&self, message: &str);
}

/// Writes status to stdout and errors to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleUi {
    plain: bool,
}

impl ConsoleUi {
    pub fn new(plain: bool) -> Self {
        Self { plain }
    }

    fn decorate(&self, marker: &str, message: &str) -> String {
        if self.plain {
            message.to_string()
        } else {
            format!("{marker} {message}")
        }
    }
}

impl Ui for ConsoleUi {
    fn output(&self, message: &str) {
        println!("{}", self.decorate("==>", message));
    }

    fn error(&self, message: &str) {
        eprintln!("{}", self.decorate("!", message));
    }
}
