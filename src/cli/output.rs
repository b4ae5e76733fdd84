//! Output formatting for CLI commands.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::cli::args::{DocseekArgs, OutputFormat};
use crate::error::Result;
use crate::index::store::StoreStats;
use crate::ingest::pipeline::IngestReport;
use crate::service::handler::{QueryResponse, QueryResult};

/// Result structure for search operations.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed: Option<String>,
    pub hits: Vec<QueryResult>,
    pub total_hits: usize,
    pub duration_ms: u64,
}

/// Result structure for index verification.
#[derive(Debug, Serialize, Deserialize)]
pub struct VerificationResult {
    pub location: String,
    pub version: u64,
    pub documents: usize,
    pub terms: usize,
    pub verified: bool,
}

/// Values with a human-readable rendering.
pub trait HumanOutput: Serialize {
    fn write_human(&self, out: &mut dyn Write) -> io::Result<()>;
}

impl HumanOutput for SearchResults {
    fn write_human(&self, out: &mut dyn Write) -> io::Result<()> {
        if let Some(parsed) = &self.parsed {
            writeln!(out, "Parsed query: {parsed}")?;
            writeln!(out)?;
        }
        write_results(out, &self.hits)?;
        writeln!(out)?;
        writeln!(out, "Total hits: {}", self.total_hits)?;
        writeln!(out, "Search time: {}ms", self.duration_ms)
    }
}

impl HumanOutput for QueryResponse {
    fn write_human(&self, out: &mut dyn Write) -> io::Result<()> {
        if !self.annotations.is_empty() {
            let entities: Vec<String> = self
                .annotations
                .iter()
                .map(|a| format!("{} ({})", a.text, a.label))
                .collect();
            writeln!(out, "Entities: {}", entities.join(", "))?;
        }
        if let Some(source) = &self.source {
            writeln!(out, "Documentation: {source}")?;
        }
        if let Some(message) = &self.message {
            writeln!(out, "{message}")?;
        }
        if !self.results.is_empty() {
            writeln!(out)?;
            write_results(out, &self.results)?;
        }
        Ok(())
    }
}

impl HumanOutput for IngestReport {
    fn write_human(&self, out: &mut dyn Write) -> io::Result<()> {
        for entry in &self.ingested {
            writeln!(out, "{}: {}", entry.locator, entry.outcome)?;
        }
        for failure in &self.failures {
            writeln!(out, "{}: FAILED: {}", failure.locator, failure.error)?;
        }
        writeln!(out)?;
        writeln!(
            out,
            "{} ingested, {} failed, {} documents written in {}ms",
            self.ingested.len(),
            self.failures.len(),
            self.documents_indexed(),
            self.elapsed_ms
        )
    }
}

impl HumanOutput for StoreStats {
    fn write_human(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "Index Statistics:")?;
        writeln!(out, "════════════════")?;
        write_generic(out, &serde_json::to_value(self).map_err(io::Error::other)?)
    }
}

impl HumanOutput for VerificationResult {
    fn write_human(&self, out: &mut dyn Write) -> io::Result<()> {
        write_generic(out, &serde_json::to_value(self).map_err(io::Error::other)?)
    }
}

fn write_results(out: &mut dyn Write, results: &[QueryResult]) -> io::Result<()> {
    for (i, result) in results.iter().enumerate() {
        writeln!(out, "Result {}: (Score: {:.3})", i + 1, result.score)?;
        writeln!(out, "─────────────")?;
        if result.subtitle.is_empty() {
            writeln!(out, "{}", result.title)?;
        } else {
            writeln!(out, "{} / {}", result.title, result.subtitle)?;
        }
        writeln!(out, "{}", result.content)?;
        writeln!(out, "Source: {}", result.source)?;
        writeln!(out)?;
    }
    Ok(())
}

/// Output a result in the format selected on the command line.
pub fn output_result<T: HumanOutput>(message: &str, result: &T, args: &DocseekArgs) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.output_format {
        OutputFormat::Human => {
            if args.verbosity() > 1 {
                writeln!(out, "{message}")?;
                writeln!(out)?;
            }
            result.write_human(&mut out)?;
        }
        OutputFormat::Json => write_json(&mut out, result, args.pretty)?,
    }
    Ok(())
}

/// Output in JSON format.
fn write_json<T: Serialize>(out: &mut dyn Write, result: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    writeln!(out, "{json}")?;
    Ok(())
}

/// Output generic data as `key: value` lines.
fn write_generic(out: &mut dyn Write, value: &serde_json::Value) -> io::Result<()> {
    match value {
        serde_json::Value::Object(obj) => {
            for (key, val) in obj {
                let formatted_val = format_value(val);
                writeln!(out, "{key}: {formatted_val}")?;
            }
            Ok(())
        }
        _ => writeln!(out, "{}", format_value(value)),
    }
}

/// Format a JSON value for display.
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Array(arr) => {
            let formatted_values = arr.iter().map(format_value).collect::<Vec<_>>().join(", ");
            format!("[{formatted_values}]")
        }
        serde_json::Value::Object(_) => "[object]".to_string(),
        serde_json::Value::Null => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::pipeline::{IngestEntry, IngestFailure, IngestOutcome};
    use crate::service::annotator::Annotation;

    fn render<T: HumanOutput>(value: &T) -> String {
        let mut buf = Vec::new();
        value.write_human(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn result() -> QueryResult {
        QueryResult {
            title: "Sources".into(),
            subtitle: "Setup".into(),
            content: "Create a source.".into(),
            source: "docs/segment".into(),
            score: 1.5,
        }
    }

    #[test]
    fn test_search_results_human() {
        let text = render(&SearchResults {
            query: "source".into(),
            parsed: Some("source".into()),
            hits: vec![result()],
            total_hits: 1,
            duration_ms: 3,
        });

        assert!(text.contains("Parsed query: source"));
        assert!(text.contains("Result 1: (Score: 1.500)"));
        assert!(text.contains("Sources / Setup"));
        assert!(text.contains("Source: docs/segment"));
        assert!(text.ends_with("Search time: 3ms\n"));
    }

    #[test]
    fn test_query_response_human() {
        let text = render(&QueryResponse {
            results: Vec::new(),
            annotations: vec![Annotation {
                text: "Segment".into(),
                label: "ORG".into(),
            }],
            source: Some("docs/segment".into()),
            message: Some("No relevant content found for your query.".into()),
        });

        assert_eq!(
            text,
            "Entities: Segment (ORG)\nDocumentation: docs/segment\nNo relevant content found for your query.\n"
        );
    }

    #[test]
    fn test_ingest_report_human() {
        let text = render(&IngestReport {
            ingested: vec![IngestEntry {
                locator: "a.md".into(),
                outcome: IngestOutcome::Indexed {
                    version: 2,
                    documents: 3,
                },
            }],
            failures: vec![IngestFailure {
                locator: "b.md".into(),
                error: "no such file".into(),
            }],
            elapsed_ms: 7,
        });

        assert!(text.contains("a.md: indexed 3 passages (version 2)"));
        assert!(text.contains("b.md: FAILED: no such file"));
        assert!(text.contains("1 ingested, 1 failed, 3 documents written in 7ms"));
    }

    #[test]
    fn test_json_output() {
        let mut buf = Vec::new();
        write_json(&mut buf, &result(), false).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["title"], "Sources");
        assert_eq!(value["score"], 1.5);
    }

    #[test]
    fn test_format_value() {
        assert_eq!(
            format_value(&serde_json::Value::String("test".to_string())),
            "test"
        );
        assert_eq!(
            format_value(&serde_json::Value::Number(serde_json::Number::from(42))),
            "42"
        );
        assert_eq!(format_value(&serde_json::Value::Bool(false)), "false");
        assert_eq!(format_value(&serde_json::Value::Null), "-");
    }
}
