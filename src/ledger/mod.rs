//! Run ledger
//!
//! Append-only record of step outcomes for one run, rendered as the final
//! summary.

use console::Style;

/// Recorded result of one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub label: String,
    pub success: bool,
    /// Failure message, for the error stream
    pub detail: Option<String>,
}

impl StepOutcome {
    pub fn succeeded(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            success: true,
            detail: None,
        }
    }

    pub fn failed(label: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            success: false,
            detail: Some(detail.into()),
        }
    }
}

/// Ordered step outcomes of one run
#[derive(Debug, Default)]
pub struct RunLedger {
    entries: Vec<StepOutcome>,
}

impl RunLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: StepOutcome) {
        tracing::debug!(label = %outcome.label, success = outcome.success, "step recorded");
        self.entries.push(outcome);
    }

    #[cfg(test)]
    pub fn entries(&self) -> &[StepOutcome] {
        &self.entries
    }

    /// Successes and failures, each in recording order
    pub fn partition(&self) -> (Vec<&StepOutcome>, Vec<&StepOutcome>) {
        self.entries.iter().partition(|o| o.success)
    }

    pub fn has_failures(&self) -> bool {
        self.entries.iter().any(|o| !o.success)
    }

    /// Summary text: successes, then failures, "None" for an empty group
    pub fn render(&self) -> String {
        let (succeeded, failed) = self.partition();
        let mut out = String::new();

        out.push_str(&format!(
            "{}\n",
            Style::new().bold().green().apply_to("Succeeded:")
        ));
        push_group(&mut out, &succeeded, Style::new().green());

        out.push_str(&format!(
            "{}\n",
            Style::new().bold().red().apply_to("Failed:")
        ));
        push_group(&mut out, &failed, Style::new().red());

        out
    }

    pub fn print_summary(&self) {
        println!();
        print!("{}", self.render());
        if self.has_failures() {
            println!(
                "\n{}",
                Style::new()
                    .dim()
                    .apply_to("Failed steps need manual follow-up; see the errors above.")
            );
        }
    }
}

fn push_group(out: &mut String, group: &[&StepOutcome], style: Style) {
    if group.is_empty() {
        out.push_str(&format!("  {}\n", Style::new().dim().apply_to("None")));
        return;
    }
    for outcome in group {
        out.push_str(&format!("  - {}\n", style.apply_to(&outcome.label)));
    }
}
