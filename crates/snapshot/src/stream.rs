//! The timeline stream: a concatenation of YAML documents. The encoder
//! writes one document per object or patch; the decoder iterates them and
//! supports pushing one document back for the replay phase.

use anyhow::{Context, Result};
use kectl_core::Error;
use serde::Deserialize;
use serde_json::Value;
use std::io::{Read, Write};

pub struct Encoder<W: Write> {
    writer: W,
}

impl<W: Write> Encoder<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn encode<T: serde::Serialize>(&mut self, doc: &T) -> Result<()> {
        let text = serde_yaml::to_string(doc).context("serializing YAML document")?;
        self.writer.write_all(b"---\n").context("writing document separator")?;
        self.writer.write_all(text.as_bytes()).context("writing YAML document")?;
        if !text.ends_with('\n') {
            self.writer.write_all(b"\n").context("writing YAML document")?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("flushing stream")
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

pub struct Decoder {
    documents: serde_yaml::Deserializer<'static>,
    pushback: Option<Value>,
}

impl Decoder {
    pub fn new<R: Read + 'static>(reader: R) -> Self {
        Self { documents: serde_yaml::Deserializer::from_reader(reader), pushback: None }
    }

    /// Next document as object JSON. `None` at end of stream; a malformed
    /// document yields `StreamMalformed` and the stream stays usable.
    pub fn next_document(&mut self) -> Option<Result<Value>> {
        if let Some(doc) = self.pushback.take() {
            return Some(Ok(doc));
        }
        let document = self.documents.next()?;
        Some(
            Value::deserialize(document)
                .map_err(|err| Error::StreamMalformed { reason: err.to_string() }.into()),
        )
    }

    /// Return a decoded document so the next call yields it again. Holds at
    /// most one document.
    pub fn push_back(&mut self, doc: Value) {
        self.pushback = Some(doc);
    }
}
