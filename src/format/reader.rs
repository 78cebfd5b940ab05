//! Record stream reader.

use super::record::{
    FormatError, HintKind, RecordTag, StreamHeader, FOOTER_MARKER, HINT_MARKER,
    LINE_TERMINATOR, MAX_LINE_LEN,
};
use crate::codec::{CodecError, Value, ValueCodec, ValueKind};
use crate::error::{Error, Result};
use std::io::{ErrorKind, Read};
use std::sync::Arc;

/// Reads one export stream.
///
/// Tags are read one byte ahead: a tag that does not match what the caller
/// asked for is kept and handed to the next call, which is how the optional
/// hints and the open-ended run of data records are delimited.
pub struct RecordReader<R: Read> {
    inner: R,
    codec: Arc<dyn ValueCodec>,
    peeked: Option<u8>,
    key_kind: Option<ValueKind>,
    value_kind: Option<ValueKind>,
    records_read: u64,
}

impl<R: Read> RecordReader<R> {
    pub fn new(inner: R, codec: Arc<dyn ValueCodec>) -> Self {
        Self {
            inner,
            codec,
            peeked: None,
            key_kind: None,
            value_kind: None,
            records_read: 0,
        }
    }

    /// Number of data records decoded so far.
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Read the header record.
    pub fn read_header(&mut self) -> Result<StreamHeader> {
        match self.next_tag()? {
            Some(tag) if tag == RecordTag::Header.as_byte() => {}
            _ => return Err(FormatError::MissingHeader.into()),
        }

        let line = self.read_line()?.ok_or(FormatError::IncompleteHeader)?;
        Ok(StreamHeader::parse_line(&line)?)
    }

    /// Read a type hint if the next record is one.
    ///
    /// Returns `None` without consuming anything when the next tag is not the
    /// requested hint, and also for an empty type name.
    pub fn read_optional_hint(&mut self, kind: HintKind) -> Result<Option<ValueKind>> {
        match self.peek_tag()? {
            Some(tag) if tag == kind.tag().as_byte() => {
                self.peeked = None;
            }
            _ => return Ok(None),
        }

        let line = self
            .read_line()?
            .ok_or(FormatError::IncompleteHint(kind))?;

        let mut parts = line.splitn(3, ',');
        let (marker, label, type_name) = match (parts.next(), parts.next(), parts.next()) {
            (Some(m), Some(l), Some(t)) => (m, l, t),
            _ => return Err(FormatError::MalformedHint(kind, line.clone()).into()),
        };
        if marker != HINT_MARKER || label != kind.label() {
            return Err(FormatError::MalformedHint(kind, line.clone()).into());
        }

        if type_name.is_empty() {
            return Ok(None);
        }

        let resolved = self
            .codec
            .resolve(type_name)
            .ok_or_else(|| Error::TypeResolution {
                hint: kind.label().to_string(),
                type_name: type_name.to_string(),
            })?;

        match kind {
            HintKind::Key => self.key_kind = Some(resolved),
            HintKind::Value => self.value_kind = Some(resolved),
        }
        Ok(Some(resolved))
    }

    /// Read the next data record, or `None` once a non-data tag is reached.
    pub fn read_data(&mut self) -> Result<Option<(Value, Value)>> {
        match self.peek_tag()? {
            Some(tag) if tag == RecordTag::Data.as_byte() => {
                self.peeked = None;
            }
            _ => return Ok(None),
        }

        let key = self
            .codec
            .decode(self.key_kind, &mut self.inner)
            .map_err(decoding_error)?;
        let value = self
            .codec
            .decode(self.value_kind, &mut self.inner)
            .map_err(decoding_error)?;

        self.records_read += 1;
        Ok(Some((key, value)))
    }

    /// Read the footer record and return the record count it carries.
    pub fn read_footer(&mut self) -> Result<u64> {
        match self.next_tag()? {
            Some(tag) if tag == RecordTag::Footer.as_byte() => {}
            _ => return Err(FormatError::MissingFooter.into()),
        }

        let line = self.read_line()?.ok_or(FormatError::IncompleteFooter)?;
        let count = line
            .strip_prefix(FOOTER_MARKER)
            .and_then(|rest| rest.strip_prefix(','))
            .and_then(|n| n.trim().parse::<u64>().ok())
            .ok_or_else(|| FormatError::MalformedFooter(line.clone()))?;

        if count != self.records_read {
            tracing::warn!(
                footer = count,
                records = self.records_read,
                "Footer record count differs from records read"
            );
        }
        Ok(count)
    }

    fn peek_tag(&mut self) -> Result<Option<u8>> {
        if self.peeked.is_none() {
            self.peeked = self.read_byte()?;
        }
        Ok(self.peeked)
    }

    fn next_tag(&mut self) -> Result<Option<u8>> {
        match self.peeked.take() {
            Some(tag) => Ok(Some(tag)),
            None => self.read_byte(),
        }
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut buf = [0u8; 1];
        loop {
            match self.inner.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(FormatError::Io(e).into()),
            }
        }
    }

    /// Read one text line. `None` if the terminator is not found within
    /// [`MAX_LINE_LEN`] bytes or before end of stream.
    fn read_line(&mut self) -> Result<Option<String>> {
        let first = LINE_TERMINATOR[0];
        let mut line = Vec::new();

        loop {
            let byte = match self.read_byte()? {
                Some(b) => b,
                None => return Ok(None),
            };
            if byte == first {
                break;
            }
            if line.len() == MAX_LINE_LEN {
                return Ok(None);
            }
            line.push(byte);
        }

        for _ in 1..LINE_TERMINATOR.len() {
            if self.read_byte()?.is_none() {
                return Ok(None);
            }
        }

        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }
}

fn decoding_error(e: CodecError) -> Error {
    match e {
        CodecError::Io(io) if io.kind() == ErrorKind::UnexpectedEof => FormatError::Truncated.into(),
        CodecError::Io(io) => FormatError::Io(io).into(),
        other => FormatError::CorruptRecord(other.to_string()).into(),
    }
}
