//! Operator-facing console narration.
//!
//! Every operation logs through `tracing` unconditionally; this type decides what
//! is additionally echoed to stdout. It is passed into the operations explicitly
//! instead of living in module-level state.

use std::fmt::Display;
use std::io::Write;

/// How much narration reaches stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Nothing is printed.
    Quiet,
    /// Connection status and per-query headings.
    #[default]
    Normal,
    /// Everything, including cursor and per-row progress.
    Verbose,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Console {
    verbosity: Verbosity,
}

impl Console {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    /// A console that prints nothing (tests, embedding).
    pub fn quiet() -> Self {
        Self::new(Verbosity::Quiet)
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    /// Print a status line unless quiet.
    pub fn status(&self, message: impl Display) {
        if self.verbosity != Verbosity::Quiet {
            println!("{message}");
        }
    }

    /// Like [`Console::status`] but leaves the cursor on the same line.
    pub fn status_inline(&self, message: impl Display) {
        if self.verbosity != Verbosity::Quiet {
            print!("{message} ");
            let _ = std::io::stdout().flush();
        }
    }

    /// Print a progress line only in verbose mode.
    pub fn progress(&self, message: impl Display) {
        if self.is_verbose() {
            println!("{message}");
        }
    }

    /// Print an empty separator line in verbose mode.
    pub fn blank(&self) {
        self.progress("");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_normal() {
        let console = Console::default();
        assert_eq!(console.verbosity(), Verbosity::Normal);
        assert!(!console.is_verbose());
    }

    #[test]
    fn test_quiet() {
        assert_eq!(Console::quiet().verbosity(), Verbosity::Quiet);
        assert!(Console::new(Verbosity::Verbose).is_verbose());
    }
}
