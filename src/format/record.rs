//! Record stream layout.
//!
//! # Stream Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │ HEADER     : tag 0, "#SOF,<timestamp>,<path>" EOL    │
//! ├──────────────────────────────────────────────────────┤
//! │ HINT_KEY   : tag 1, "#HINT,KEY,<type>" EOL           │  only when at least
//! │ HINT_VALUE : tag 2, "#HINT,VALUE,<type or empty>" EOL│  one DATA follows
//! ├──────────────────────────────────────────────────────┤
//! │ DATA       : tag 4, codec(key), codec(value)         │  zero or more
//! ├──────────────────────────────────────────────────────┤
//! │ FOOTER     : tag 8, "#EOF,<records written>" EOL     │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! EOL is the platform line terminator. Readers scan for its first byte and
//! then consume the rest, so a stream written on one platform is only
//! guaranteed readable on a platform with the same terminator.

use std::fmt;
use std::str::FromStr;

/// Line terminator written after every text record.
#[cfg(windows)]
pub const LINE_TERMINATOR: &[u8] = b"\r\n";

/// Line terminator written after every text record.
#[cfg(not(windows))]
pub const LINE_TERMINATOR: &[u8] = b"\n";

/// Longest text line a reader accepts, terminator excluded.
pub const MAX_LINE_LEN: usize = 1000;

pub const HEADER_MARKER: &str = "#SOF";
pub const HINT_MARKER: &str = "#HINT";
pub const FOOTER_MARKER: &str = "#EOF";

/// One-byte tag that opens every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordTag {
    Header = 0,
    HintKey = 1,
    HintValue = 2,
    Data = 4,
    Footer = 8,
}

impl RecordTag {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(RecordTag::Header),
            1 => Some(RecordTag::HintKey),
            2 => Some(RecordTag::HintValue),
            4 => Some(RecordTag::Data),
            8 => Some(RecordTag::Footer),
            _ => None,
        }
    }
}

/// Which of the two type hints a hint record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintKind {
    Key,
    Value,
}

impl HintKind {
    pub fn tag(self) -> RecordTag {
        match self {
            HintKind::Key => RecordTag::HintKey,
            HintKind::Value => RecordTag::HintValue,
        }
    }

    /// Label used inside the hint line.
    pub fn label(self) -> &'static str {
        match self {
            HintKind::Key => "KEY",
            HintKind::Value => "VALUE",
        }
    }
}

impl fmt::Display for HintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// On-disk format, selected by file suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FileType {
    #[default]
    Adp,
}

impl FileType {
    /// Suffix used in file names.
    pub fn suffix(self) -> &'static str {
        match self {
            FileType::Adp => "adp",
        }
    }
}

impl FromStr for FileType {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case(FileType::Adp.suffix()) {
            Ok(FileType::Adp)
        } else {
            Err(FormatError::UnsupportedFileType(s.to_string()))
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Parsed header record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    /// Export start time, milliseconds since the Unix epoch.
    pub timestamp: u64,

    /// Full path of the exported dataset.
    pub region_path: String,
}

impl StreamHeader {
    pub fn new(timestamp: u64, region_path: impl Into<String>) -> Self {
        Self {
            timestamp,
            region_path: region_path.into(),
        }
    }

    /// Text of the header line, terminator excluded.
    pub fn to_line(&self) -> String {
        format!("{},{},{}", HEADER_MARKER, self.timestamp, self.region_path)
    }

    /// Parse a header line. The path may itself contain commas.
    pub fn parse_line(line: &str) -> Result<Self, FormatError> {
        let mut parts = line.splitn(3, ',');
        let marker = parts.next().unwrap_or_default();
        let timestamp = parts.next().and_then(|t| t.trim().parse::<u64>().ok());
        let path = parts.next();

        match (marker, timestamp, path) {
            (HEADER_MARKER, Some(timestamp), Some(path)) => Ok(Self::new(timestamp, path)),
            _ => Err(FormatError::MalformedHeader(line.to_string())),
        }
    }
}

/// Format-related errors.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("missing header")]
    MissingHeader,

    #[error("incomplete header")]
    IncompleteHeader,

    #[error("malformed header: {0}")]
    MalformedHeader(String),

    #[error("malformed {0} hint: {1}")]
    MalformedHint(HintKind, String),

    #[error("incomplete {0} hint")]
    IncompleteHint(HintKind),

    #[error("missing footer")]
    MissingFooter,

    #[error("incomplete footer")]
    IncompleteFooter,

    #[error("malformed footer: {0}")]
    MalformedFooter(String),

    #[error("stream truncated inside a data record")]
    Truncated,

    #[error("corrupt data record: {0}")]
    CorruptRecord(String),

    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_are_distinct() {
        let tags = [
            RecordTag::Header,
            RecordTag::HintKey,
            RecordTag::HintValue,
            RecordTag::Data,
            RecordTag::Footer,
        ];
        for tag in tags {
            assert_eq!(RecordTag::from_byte(tag.as_byte()), Some(tag));
        }
        assert_eq!(RecordTag::from_byte(3), None);
    }

    #[test]
    fn test_header_line() {
        let header = StreamHeader::new(1700000000000, "/orders");
        assert_eq!(header.to_line(), "#SOF,1700000000000,/orders");
        assert_eq!(StreamHeader::parse_line(&header.to_line()).unwrap(), header);

        assert!(StreamHeader::parse_line("#SOF,abc,/orders").is_err());
        assert!(StreamHeader::parse_line("#EOF,1").is_err());
    }

    #[test]
    fn test_file_type_suffix() {
        assert_eq!("adp".parse::<FileType>().unwrap(), FileType::Adp);
        assert_eq!("ADP".parse::<FileType>().unwrap(), FileType::Adp);
        assert!(matches!(
            "csv".parse::<FileType>(),
            Err(FormatError::UnsupportedFileType(_))
        ));
    }
}
