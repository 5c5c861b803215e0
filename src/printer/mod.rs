//! Printers: JSON record and colored summary (owo-colors).

use anyhow::Result;
use owo_colors::OwoColorize;

use crate::execution::ExecutionOutcome;

pub struct JsonPrinter;

impl JsonPrinter {
    pub fn render(&self, outcome: &ExecutionOutcome) -> Result<String> {
        Ok(serde_json::to_string(outcome)?)
    }

    pub fn print(&self, outcome: &ExecutionOutcome) -> Result<()> {
        println!("{}", self.render(outcome)?);
        Ok(())
    }
}

pub struct SummaryPrinter {
    pub color: bool,
}

impl SummaryPrinter {
    pub fn print(&self, outcome: &ExecutionOutcome) {
        let header = format!("exit code: {}", outcome.returncode);
        if !self.color {
            println!("{}", header);
        } else if outcome.is_success() {
            println!("{}", header.green());
        } else if outcome.is_timeout() {
            println!("{}", header.yellow());
        } else {
            println!("{}", header.red());
        }

        if !outcome.stdout.is_empty() {
            println!("{}", outcome.stdout);
        }
        if !outcome.stderr.is_empty() {
            if self.color {
                eprintln!("{}", outcome.stderr.magenta());
            } else {
                eprintln!("{}", outcome.stderr);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_keeps_field_names() {
        let out = ExecutionOutcome::new(0, "hi", "");
        assert_eq!(
            JsonPrinter.render(&out).unwrap(),
            r#"{"returncode":0,"stdout":"hi","stderr":""}"#
        );
    }
}
