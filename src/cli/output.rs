// Output formatting for CLI

use std::io::Write;

use anyhow::Result;

use super::config::OutputFormat;

/// Format and output data
pub struct OutputFormatter {
    format: OutputFormat,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    /// Output metadata
    pub fn output_metadata(&self, metadata: &serde_json::Value, writer: &mut impl Write) -> Result<()> {
        match self.format {
            OutputFormat::Pretty => {
                writeln!(writer, "{}", serde_json::to_string_pretty(metadata)?)?;
            }
            OutputFormat::Json => {
                writeln!(writer, "{}", serde_json::to_string(metadata)?)?;
            }
            OutputFormat::KeyValue => {
                self.output_key_value(metadata, writer)?;
            }
            OutputFormat::Table => {
                self.output_table(metadata, writer)?;
            }
        }
        Ok(())
    }

    /// Output as key-value pairs, skipping nulls
    fn output_key_value(&self, metadata: &serde_json::Value, writer: &mut impl Write) -> Result<()> {
        if let Some(obj) = metadata.as_object() {
            let mut items: Vec<_> = obj.iter().filter(|(_, value)| !value.is_null()).collect();
            items.sort_by(|a, b| a.0.cmp(b.0));

            for (key, value) in items {
                writeln!(writer, "{}={}", key, self.format_value(value))?;
            }
        }
        Ok(())
    }

    /// Output as table
    fn output_table(&self, metadata: &serde_json::Value, writer: &mut impl Write) -> Result<()> {
        if let Some(obj) = metadata.as_object() {
            let max_key_len = obj.keys().map(|k| k.len()).max().unwrap_or(0);

            writeln!(writer, "{}", "=".repeat(max_key_len + 30))?;

            for (key, value) in obj {
                writeln!(
                    writer,
                    "{:<width$} {}",
                    format!("{}:", key),
                    self.format_value(value),
                    width = max_key_len + 1
                )?;
            }

            writeln!(writer, "{}", "=".repeat(max_key_len + 30))?;
        }
        Ok(())
    }

    /// Format a JSON value for display
    fn format_value(&self, value: &serde_json::Value) -> String {
        match value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => "(null)".to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Array(arr) => {
                if arr.iter().all(|v| v.is_string()) {
                    arr.iter()
                        .filter_map(|v| v.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                } else {
                    format!("[{} items]", arr.len())
                }
            }
            serde_json::Value::Object(obj) => {
                if obj.is_empty() {
                    "{}".to_string()
                } else {
                    format!("{{{} items}}", obj.len())
                }
            }
        }
    }

    /// Print success message
    pub fn print_success(&self, message: &str) {
        if !self.quiet {
            println!("✓ {}", message);
        }
    }

    /// Print error message
    pub fn print_error(&self, message: &str) {
        eprintln!("✗ {}", message);
    }

    /// Print info message
    pub fn print_info(&self, message: &str) {
        if !self.quiet {
            println!("  {}", message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(format: OutputFormat, value: &serde_json::Value) -> String {
        let mut out = Vec::new();
        OutputFormatter::new(format, true)
            .output_metadata(value, &mut out)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_key_value_sorted_without_nulls() {
        let value = json!({"title": "Song", "album": null, "frames": ["TIT2", "TPE1"], "vbr": false});
        assert_eq!(
            render(OutputFormat::KeyValue, &value),
            "frames=TIT2, TPE1\ntitle=Song\nvbr=false\n"
        );
    }

    #[test]
    fn test_json_compact() {
        let value = json!({"duration_ms": 1000});
        assert_eq!(render(OutputFormat::Json, &value), "{\"duration_ms\":1000}\n");
    }

    #[test]
    fn test_table_aligns_keys() {
        let value = json!({"a": 1, "long": "x"});
        let table = render(OutputFormat::Table, &value);
        assert!(table.contains("a:    1\n"));
        assert!(table.contains("long: x\n"));
    }
}
