//! Operator interaction surface.
//!
//! The sync engine never touches the terminal directly; everything goes
//! through the [`Console`] trait so silent runs and tests can substitute a
//! headless double.

use colored::Colorize;
use dialoguer::{Confirm, Input};

/// Interactive capabilities the engine consumes.
pub trait Console: Send + Sync {
    /// Plain output line.
    fn line(&self, message: &str);

    /// Highlighted notice (policy skips, per-item problems).
    fn notice(&self, message: &str);

    /// Error surfaced to the operator, with the underlying message.
    fn error(&self, message: &str);

    /// Announce a long-running phase.
    fn status(&self, message: &str);

    /// Yes/no prompt. Callers bypass this entirely in silent mode.
    fn confirm(&self, prompt: &str) -> bool;

    /// Free-form prompt for a missing option value.
    fn ask(&self, prompt: &str) -> String;

    /// Render a small table.
    fn table(&self, headers: &[&str], rows: &[Vec<String>]);
}

/// Terminal implementation.
#[derive(Debug, Default)]
pub struct TermConsole;

impl TermConsole {
    pub fn new() -> Self {
        Self
    }
}

impl Console for TermConsole {
    fn line(&self, message: &str) {
        println!("{message}");
    }

    fn notice(&self, message: &str) {
        println!("{}", message.yellow());
    }

    fn error(&self, message: &str) {
        eprintln!("{}: {}", "error".red().bold(), message);
    }

    fn status(&self, message: &str) {
        println!("{}", message.cyan());
    }

    fn confirm(&self, prompt: &str) -> bool {
        Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()
            .unwrap_or(false)
    }

    fn ask(&self, prompt: &str) -> String {
        Input::<String>::new()
            .with_prompt(prompt)
            .interact_text()
            .unwrap_or_default()
    }

    fn table(&self, headers: &[&str], rows: &[Vec<String>]) {
        let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
        for row in rows {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(cell.len());
                }
            }
        }

        let render = |cells: Vec<String>| {
            let padded: Vec<String> = cells
                .iter()
                .zip(&widths)
                .map(|(c, &w)| format!("{c:<w$}"))
                .collect();
            format!("| {} |", padded.join(" | "))
        };

        let separator = format!(
            "+{}+",
            widths
                .iter()
                .map(|w| "-".repeat(w + 2))
                .collect::<Vec<_>>()
                .join("+")
        );

        println!("{separator}");
        println!(
            "{}",
            render(headers.iter().map(|h| h.to_string()).collect()).bold()
        );
        println!("{separator}");
        for row in rows {
            println!("{}", render(row.clone()));
        }
        println!("{separator}");
    }
}
