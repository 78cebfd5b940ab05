//! Record stream writer.

use super::record::{
    HintKind, RecordTag, StreamHeader, FOOTER_MARKER, HINT_MARKER, LINE_TERMINATOR,
};
use crate::codec::{CodecError, Value, ValueCodec};
use crate::error::{Error, Result};
use std::io::Write;
use std::sync::Arc;

/// Writes one export stream: header, optional hints, data records, footer.
///
/// The writer counts data records itself so the footer always agrees with
/// what was actually written.
pub struct RecordWriter<W: Write> {
    inner: W,
    codec: Arc<dyn ValueCodec>,
    records_written: u64,
    hints_written: bool,
    scratch: Vec<u8>,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(inner: W, codec: Arc<dyn ValueCodec>) -> Self {
        Self {
            inner,
            codec,
            records_written: 0,
            hints_written: false,
            scratch: Vec::new(),
        }
    }

    /// Number of data records written so far.
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Whether the type hints have been written.
    pub fn has_hints(&self) -> bool {
        self.hints_written
    }

    /// Write the header record.
    pub fn write_header(&mut self, region_path: &str, timestamp: u64) -> Result<()> {
        let header = StreamHeader::new(timestamp, region_path);
        self.write_line(RecordTag::Header, &header.to_line())
    }

    /// Write the key and value type hints.
    ///
    /// A missing sample value produces an empty value hint.
    pub fn write_type_hints(&mut self, key: &Value, value: Option<&Value>) -> Result<()> {
        let key_type = self.codec.type_name(key);
        let value_type = value.map(|v| self.codec.type_name(v)).unwrap_or_default();

        self.write_line(RecordTag::HintKey, &hint_line(HintKind::Key, &key_type))?;
        self.write_line(
            RecordTag::HintValue,
            &hint_line(HintKind::Value, &value_type),
        )?;
        self.hints_written = true;
        Ok(())
    }

    /// Write one data record. Hints are written first if this is the first record.
    pub fn write_data(&mut self, key: Option<&Value>, value: Option<&Value>) -> Result<()> {
        let key = key.ok_or_else(|| Error::Encoding("key is absent".into()))?;
        let value = value.ok_or_else(|| {
            Error::Encoding(format!("value for key {} is absent", key))
        })?;

        if !self.hints_written {
            self.write_type_hints(key, Some(value))?;
        }

        // Encode both halves before touching the stream so a failed value
        // never leaves a dangling key behind.
        self.scratch.clear();
        self.scratch.push(RecordTag::Data.as_byte());
        self.codec
            .encode(key, &mut self.scratch)
            .map_err(encoding_error)?;
        self.codec
            .encode(value, &mut self.scratch)
            .map_err(encoding_error)?;

        self.inner.write_all(&self.scratch)?;
        self.records_written += 1;
        Ok(())
    }

    /// Write the footer record.
    pub fn write_footer(&mut self) -> Result<()> {
        let line = format!("{},{}", FOOTER_MARKER, self.records_written);
        self.write_line(RecordTag::Footer, &line)
    }

    /// Flush and return the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }

    fn write_line(&mut self, tag: RecordTag, line: &str) -> Result<()> {
        self.inner.write_all(&[tag.as_byte()])?;
        self.inner.write_all(line.as_bytes())?;
        self.inner.write_all(LINE_TERMINATOR)?;
        Ok(())
    }
}

fn hint_line(kind: HintKind, type_name: &str) -> String {
    format!("{},{},{}", HINT_MARKER, kind.label(), type_name)
}

fn encoding_error(e: CodecError) -> Error {
    match e {
        CodecError::Io(io) => Error::Io(io),
        other => Error::Encoding(other.to_string()),
    }
}
