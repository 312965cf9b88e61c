//! Render streamed key-value results as raw keys, JSON, or YAML.

use anyhow::Result;
use clap::ValueEnum;
use kectl_core::{KeyValue, MediaType};
use kectl_encoding::{convert, detect};
use std::io::Write;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Key,
    Json,
    Yaml,
    None,
}

pub struct Printer<W: Write> {
    writer: W,
    format: OutputFormat,
}

impl<W: Write> Printer<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self { writer, format }
    }

    pub fn print(&mut self, kv: &KeyValue) -> Result<()> {
        match self.format {
            OutputFormat::None => Ok(()),
            OutputFormat::Key => {
                writeln!(self.writer, "{}", kv.key)?;
                Ok(())
            }
            OutputFormat::Json => self.print_converted(kv, MediaType::Json),
            OutputFormat::Yaml => self.print_converted(kv, MediaType::Yaml),
        }
    }

    // A value that cannot be decoded is surfaced as a commented diagnostic
    // and the stream keeps going.
    fn print_converted(&mut self, kv: &KeyValue, to: MediaType) -> Result<()> {
        let Some(payload) = kv.payload() else { return Ok(()) };
        let rendered = detect(payload)
            .map_err(anyhow::Error::from)
            .and_then(|media| Ok((media, convert(media, to, payload)?)));
        match rendered {
            Ok((media, data)) => {
                if to == MediaType::Yaml {
                    write!(self.writer, "---\n# {} | {}\n", kv.key, media)?;
                }
                self.writer.write_all(&data)?;
                if !data.ends_with(b"\n") {
                    self.writer.write_all(b"\n")?;
                }
                Ok(())
            }
            Err(err) => {
                writeln!(self.writer, "---\n# {} | raw | {}\n# {}", kv.key, err, hex(payload))?;
                Ok(())
            }
        }
    }
}

fn hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kv(key: &str, value: &[u8]) -> KeyValue {
        KeyValue { key: key.into(), value: Some(value.to_vec()), prev_value: None, revision: 1 }
    }

    #[test]
    fn key_mode_prints_keys_only() {
        let mut out = Vec::new();
        let mut printer = Printer::new(&mut out, OutputFormat::Key);
        printer.print(&kv("/registry/pods/default/a", b"ignored")).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "/registry/pods/default/a\n");
    }

    #[test]
    fn yaml_mode_adds_diagnostic_header() {
        let value = serde_json::to_vec(&json!({ "kind": "Pod", "metadata": { "name": "a" } })).unwrap();
        let mut out = Vec::new();
        let mut printer = Printer::new(&mut out, OutputFormat::Yaml);
        printer.print(&kv("/registry/pods/default/a", &value)).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("---\n# /registry/pods/default/a | application/json\n"));
        assert!(text.contains("kind: Pod"));
    }

    #[test]
    fn json_mode_round_trips_stored_json() {
        let value = br#"{"kind":"Pod"}"#;
        let mut out = Vec::new();
        let mut printer = Printer::new(&mut out, OutputFormat::Json);
        printer.print(&kv("/registry/pods/default/a", value)).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\"kind\":\"Pod\"}\n");
    }

    #[test]
    fn undecodable_values_become_raw_comments() {
        let mut out = Vec::new();
        let mut printer = Printer::new(&mut out, OutputFormat::Yaml);
        printer.print(&kv("/registry/x/y", &[0xff, 0x00])).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("---\n# /registry/x/y | raw | "));
        assert!(text.trim_end().ends_with("# ff00"));
    }

    #[test]
    fn none_mode_is_silent() {
        let mut out = Vec::new();
        let mut printer = Printer::new(&mut out, OutputFormat::None);
        printer.print(&kv("/registry/pods/default/a", b"{}")).unwrap();
        assert!(out.is_empty());
    }
}
