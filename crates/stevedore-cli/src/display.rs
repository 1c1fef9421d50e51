//! Terminal output helpers

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use stevedore_builder::Progress;

/// Spinner that prints each build step as it starts
pub struct StepProgress {
    bar: ProgressBar,
}

impl StepProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(spinner) = ProgressStyle::default_spinner().template("{spinner} {msg}") {
            bar.set_style(
                spinner.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"]),
            );
        }
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Progress for StepProgress {
    fn next_step(&self, message: &str) {
        self.bar
            .println(format!("{} {}", style("*").cyan().bold(), message));
        self.bar.set_message(message.to_string());
    }
}

/// Print a `Label: value` line
pub fn field(label: &str, value: impl std::fmt::Display) {
    println!("  {} {}", style(format!("{}:", label)).dim(), value);
}
