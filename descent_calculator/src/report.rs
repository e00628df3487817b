//! Evaluation reports for the CLI

use crate::Calculator;
use descent_engine::{Diagnostic, PipelineError, PipelineResult, TokenModel};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;

/// Outcome of evaluating one expression
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub input: String,
    /// `None` when the engine refused to parse
    pub value: Option<f64>,
    pub diagnostics: Vec<Diagnostic>,
    /// Diagnostics rendered against the input, in the same order
    pub rendered: Vec<String>,
    pub error: Option<String>,
    pub duration_us: u128,
}

impl EvaluationReport {
    pub fn new(input: &str, outcome: Result<PipelineResult<f64>, PipelineError>, model: &TokenModel) -> Self {
        match outcome {
            Ok(result) => {
                let diagnostics: Vec<Diagnostic> = result.diagnostics().cloned().collect();
                let rendered = diagnostics
                    .iter()
                    .map(|diagnostic| diagnostic.render(input, model))
                    .collect();
                Self {
                    input: input.to_string(),
                    value: Some(result.value),
                    diagnostics,
                    rendered,
                    error: None,
                    duration_us: result.processing_duration.as_micros(),
                }
            }
            Err(err) => Self {
                input: input.to_string(),
                value: None,
                diagnostics: Vec::new(),
                rendered: Vec::new(),
                error: Some(format!("[{}] {}", err.error_code(), err)),
                duration_us: 0,
            },
        }
    }

    pub fn is_clean(&self) -> bool {
        self.error.is_none() && self.diagnostics.is_empty()
    }

    pub fn to_text(&self) -> String {
        let mut text = match (&self.value, &self.error) {
            (_, Some(error)) => format!("{} => error: {}\n", self.input, error),
            (Some(value), None) => format!("{} => {}\n", self.input, value),
            (None, None) => format!("{} => no value\n", self.input),
        };
        for rendered in &self.rendered {
            text.push_str(rendered);
        }
        text
    }
}

/// Non-blank lines of `path`, trimmed
pub fn read_expressions(path: &Path) -> io::Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Evaluate `inputs` on up to `jobs` threads; reports keep input order
pub fn evaluate_all(calculator: &Calculator, inputs: &[String], jobs: usize) -> Vec<EvaluationReport> {
    let model = calculator.engine().tokenizer().model();
    let evaluate = |input: &String| EvaluationReport::new(input, calculator.evaluate(input), model);

    let jobs = jobs.clamp(1, inputs.len().max(1));
    if jobs == 1 {
        return inputs.iter().map(evaluate).collect();
    }

    let chunk_size = inputs.len().div_ceil(jobs);
    std::thread::scope(|scope| {
        let handles: Vec<_> = inputs
            .chunks(chunk_size)
            .map(|chunk| scope.spawn(move || chunk.iter().map(evaluate).collect::<Vec<_>>()))
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_expressions_skips_blank_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1 + 2").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "   (3 * 4)  ").unwrap();

        let expressions = read_expressions(file.path()).unwrap();
        assert_eq!(expressions, vec!["1 + 2", "(3 * 4)"]);
    }

    #[test]
    fn test_evaluate_all_keeps_input_order() {
        let calc = Calculator::new().unwrap();
        let inputs: Vec<String> = (1..=7).map(|n| format!("{} * 2", n)).collect();

        let reports = evaluate_all(&calc, &inputs, 3);
        let values: Vec<_> = reports.iter().map(|report| report.value).collect();
        assert_eq!(values, (1..=7).map(|n| Some(f64::from(n) * 2.0)).collect::<Vec<_>>());
        assert!(reports.iter().all(EvaluationReport::is_clean));
    }

    #[test]
    fn test_report_renders_diagnostics() {
        let calc = Calculator::new().unwrap();
        let reports = evaluate_all(&calc, &["(2 + 3".to_string()], 4);

        let report = &reports[0];
        assert_eq!(report.value, Some(5.0));
        assert_eq!(report.rendered.len(), 1);
        assert!(report.to_text().starts_with("(2 + 3 => 5\n"));

        let json = serde_json::to_string(report).unwrap();
        assert!(json.contains("\"value\":5.0"));
        assert!(json.contains("inserted"));
    }
}
