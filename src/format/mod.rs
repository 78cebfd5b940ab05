//! Record stream format for export files.
//!
//! An export file is a single stream of tagged records: a text header, two
//! optional type hints, any number of codec-encoded data records and a text
//! footer carrying the record count.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                     Transfer engine                    │
//! │   ┌──────────────┐                ┌──────────────┐    │
//! │   │ RecordWriter │                │ RecordReader │    │
//! │   └──────┬───────┘                └──────┬───────┘    │
//! │          │        ┌────────────┐         │            │
//! │          └───────►│ ValueCodec │◄────────┘            │
//! │                   └────────────┘                      │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use adp_transfer::codec::{BincodeCodec, Value};
//! use adp_transfer::format::{HintKind, RecordReader, RecordWriter};
//! use std::sync::Arc;
//!
//! let codec = Arc::new(BincodeCodec::new());
//! let mut writer = RecordWriter::new(Vec::new(), codec.clone());
//! writer.write_header("/orders", 1).unwrap();
//! writer.write_data(Some(&Value::Int(1)), Some(&Value::from("x"))).unwrap();
//! writer.write_footer().unwrap();
//! let bytes = writer.finish().unwrap();
//!
//! let mut reader = RecordReader::new(&bytes[..], codec);
//! reader.read_header().unwrap();
//! reader.read_optional_hint(HintKind::Key).unwrap();
//! reader.read_optional_hint(HintKind::Value).unwrap();
//! assert!(reader.read_data().unwrap().is_some());
//! assert_eq!(reader.read_footer().unwrap(), 1);
//! ```

mod naming;
mod reader;
mod record;
mod writer;

pub use naming::ExportFileName;
pub use reader::RecordReader;
pub use record::{
    FileType, FormatError, HintKind, RecordTag, StreamHeader, LINE_TERMINATOR, MAX_LINE_LEN,
};
pub use writer::RecordWriter;
