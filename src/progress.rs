//! Progress display for a run

use std::io::IsTerminal;
use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

/// Spinner showing the step in progress
///
/// Hidden when stderr is not a terminal so piped output stays clean.
pub struct StepProgress {
    bar: ProgressBar,
}

impl StepProgress {
    pub fn new() -> Self {
        if !std::io::stderr().is_terminal() {
            return Self::hidden();
        }

        let style = ProgressStyle::with_template("{spinner:.cyan} [{pos}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let bar = ProgressBar::new_spinner();
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Show `label` as the step in progress
    pub fn start_step(&self, label: &str) {
        self.bar.set_message(label.to_string());
    }

    /// Print the outcome line of a step above the spinner
    pub fn finish_step(&self, label: &str, success: bool, detail: Option<&str>) {
        self.bar.inc(1);
        self.bar.suspend(|| {
            if success {
                println!("{} {label}", Style::new().green().apply_to("✔"));
            } else {
                println!("{} {label}", Style::new().red().apply_to("✘"));
                if let Some(detail) = detail {
                    eprintln!("  {}", Style::new().red().apply_to(detail));
                }
            }
        });
    }

    /// Run `f` with the spinner out of the way (prompts, child output)
    pub fn suspend<T>(&self, f: impl FnOnce() -> T) -> T {
        self.bar.suspend(f)
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Drop for StepProgress {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
