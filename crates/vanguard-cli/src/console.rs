//! CLI console utilities

use colored::*;
use console::Term;
use vanguard_core::{UserFriendlyError, VanguardError};

/// CLI console for formatted output
pub struct CliConsole {
    verbose: bool,
    term: Term,
}

impl CliConsole {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            term: Term::stdout(),
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        println!("{} {}", "ℹ".blue().bold(), message);
    }

    /// Print only with `--verbose`
    pub fn detail(&self, message: &str) {
        if self.verbose {
            println!("{}", message.dimmed());
        }
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", "✓".green().bold(), message.green());
    }

    pub fn warn(&self, message: &str) {
        println!("{} {}", "⚠".yellow().bold(), message.yellow());
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red().bold(), message.red());
    }

    pub fn print_header(&self, title: &str) {
        println!();
        println!("{}", title.bold().underline());
        println!("{}", "=".repeat(title.len()).dimmed());
    }

    /// Write streamed text without a newline
    pub fn stream_text(&self, text: &str) {
        // A broken stdout pipe is not worth aborting a stream for
        let _ = self.term.write_str(text);
        let _ = self.term.flush();
    }

    /// Render a core error with its category and suggestions
    pub fn print_error(&self, error: &VanguardError) {
        let friendly = UserFriendlyError::from(error);
        self.error(&friendly.title);
        eprintln!("{}", friendly.format_display().dimmed());
    }
}
