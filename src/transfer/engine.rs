//! Batched movement of entries between a dataset and a record stream.

use crate::codec::{Value, ValueCodec};
use crate::error::Result;
use crate::format::{HintKind, RecordReader, RecordWriter, StreamHeader};
use crate::metrics::TransferMetrics;
use crate::store::{KeyScope, Region};
use std::io::{Read, Write};
use std::sync::Arc;

/// Running counts for one file. Kept outside the call so a failed transfer
/// still reports how far it got.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferCounts {
    pub records_read: u64,
    pub records_written: u64,
}

/// Moves one dataset to or from one stream, `block_size` entries at a time.
///
/// Export holds the full key set plus one block of values in memory. Import
/// holds at most one block.
#[derive(Debug, Clone)]
pub struct TransferEngine {
    codec: Arc<dyn ValueCodec>,
    block_size: usize,
    metrics: Option<Arc<TransferMetrics>>,
}

impl TransferEngine {
    pub fn new(codec: Arc<dyn ValueCodec>, block_size: usize) -> Self {
        Self {
            codec,
            block_size: block_size.max(1),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<TransferMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Write `region` to `out` and return the writer once the footer is flushed.
    pub async fn export<W: Write + Send>(
        &self,
        region: &dyn Region,
        scope: KeyScope,
        out: W,
        timestamp: u64,
        counts: &mut TransferCounts,
    ) -> Result<W> {
        let mut writer = RecordWriter::new(out, Arc::clone(&self.codec));
        writer.write_header(&region.full_path(), timestamp)?;

        let keys = region.key_set(scope).await?;
        tracing::debug!(
            region = %region.full_path(),
            keys = keys.len(),
            block_size = self.block_size,
            "Key set enumerated"
        );

        for block in keys.chunks(self.block_size) {
            let entries = region.get_all(block).await?;
            self.record_batch(block.len());

            for (key, value) in &entries {
                counts.records_read += 1;
                writer.write_data(Some(key), value.as_ref())?;
                counts.records_written += 1;
            }
        }

        writer.write_footer()?;
        writer.finish()
    }

    /// Read a stream from `input` into `region`.
    pub async fn import<R: Read + Send>(
        &self,
        region: &dyn Region,
        input: R,
        counts: &mut TransferCounts,
    ) -> Result<StreamHeader> {
        let mut reader = RecordReader::new(input, Arc::clone(&self.codec));
        let header = reader.read_header()?;
        if header.region_path != region.full_path() {
            tracing::debug!(
                exported_from = %header.region_path,
                region = %region.full_path(),
                "Importing into a different dataset than was exported"
            );
        }

        reader.read_optional_hint(HintKind::Key)?;
        reader.read_optional_hint(HintKind::Value)?;

        let mut block = Vec::with_capacity(self.block_size);
        while let Some(entry) = reader.read_data()? {
            counts.records_read += 1;
            block.push(entry);

            if block.len() >= self.block_size {
                let full = std::mem::replace(&mut block, Vec::with_capacity(self.block_size));
                self.put_block(region, full, counts).await?;
            }
        }
        if !block.is_empty() {
            self.put_block(region, block, counts).await?;
        }

        reader.read_footer()?;
        Ok(header)
    }

    async fn put_block(
        &self,
        region: &dyn Region,
        block: Vec<(Value, Value)>,
        counts: &mut TransferCounts,
    ) -> Result<()> {
        let n = block.len();
        region.put_all(block).await?;
        self.record_batch(n);
        counts.records_written += n as u64;
        Ok(())
    }

    fn record_batch(&self, entries: usize) {
        if let Some(metrics) = &self.metrics {
            metrics.record_batch(entries);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{BincodeCodec, Value};
    use crate::error::Error;
    use crate::format::{FormatError, RecordTag};
    use crate::store::MemoryRegion;

    fn engine(block_size: usize) -> TransferEngine {
        TransferEngine::new(Arc::new(BincodeCodec::new()), block_size)
    }

    fn orders() -> MemoryRegion {
        let region = MemoryRegion::new("orders");
        region.insert(1i64, "x");
        region.insert(2i64, "y");
        region
    }

    #[tokio::test]
    async fn test_round_trip_across_block_sizes() {
        let source = MemoryRegion::new("orders");
        for i in 0..25i64 {
            source.insert(i, format!("order-{}", i));
        }

        for block_size in [1, 7, 10000] {
            let mut counts = TransferCounts::default();
            let bytes = engine(block_size)
                .export(&source, KeyScope::Server, Vec::<u8>::new(), 9, &mut counts)
                .await
                .unwrap();
            assert_eq!(counts.records_read, 25);
            assert_eq!(counts.records_written, 25);

            let target = MemoryRegion::new("orders");
            let mut counts = TransferCounts::default();
            let header = engine(block_size)
                .import(&target, &bytes[..], &mut counts)
                .await
                .unwrap();
            assert_eq!(header.timestamp, 9);
            assert_eq!(counts.records_written, 25);
            assert_eq!(target.snapshot(), source.snapshot());
        }
    }

    #[tokio::test]
    async fn test_empty_region_writes_header_and_footer_only() {
        let source = MemoryRegion::new("empty");
        let mut counts = TransferCounts::default();
        let bytes = engine(10)
            .export(&source, KeyScope::Server, Vec::<u8>::new(), 1, &mut counts)
            .await
            .unwrap();

        assert_eq!(bytes[0], RecordTag::Header.as_byte());
        let tags: Vec<u8> = bytes
            .iter()
            .copied()
            .filter(|b| {
                [RecordTag::HintKey, RecordTag::HintValue, RecordTag::Data]
                    .iter()
                    .any(|t| t.as_byte() == *b)
            })
            .collect();
        assert!(tags.is_empty());

        let target = MemoryRegion::new("empty");
        let mut counts = TransferCounts::default();
        engine(10).import(&target, &bytes[..], &mut counts).await.unwrap();
        assert_eq!(counts, TransferCounts::default());
        assert!(target.is_empty());
    }

    #[tokio::test]
    async fn test_import_is_idempotent() {
        let mut counts = TransferCounts::default();
        let bytes = engine(1)
            .export(&orders(), KeyScope::Server, Vec::<u8>::new(), 1, &mut counts)
            .await
            .unwrap();

        let target = MemoryRegion::new("orders");
        target.insert(1i64, "stale");
        for _ in 0..2 {
            let mut counts = TransferCounts::default();
            engine(1).import(&target, &bytes[..], &mut counts).await.unwrap();
        }
        assert_eq!(target.snapshot(), orders().snapshot());
    }

    #[tokio::test]
    async fn test_partial_import_keeps_flushed_blocks() {
        let mut counts = TransferCounts::default();
        let mut bytes = engine(1)
            .export(&orders(), KeyScope::Server, Vec::<u8>::new(), 1, &mut counts)
            .await
            .unwrap();
        // Cut into the second data record.
        let footer_len = 1 + "#EOF,2".len() + crate::format::LINE_TERMINATOR.len();
        bytes.truncate(bytes.len() - footer_len - 3);

        let target = MemoryRegion::new("orders");
        let mut counts = TransferCounts::default();
        let err = engine(1)
            .import(&target, &bytes[..], &mut counts)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Format(FormatError::Truncated)));
        assert_eq!(counts.records_written, 1);
        assert_eq!(target.len(), 1);
    }

    #[tokio::test]
    async fn test_metrics_count_batches() {
        let metrics = Arc::new(TransferMetrics::new());
        let engine = engine(1).with_metrics(metrics.clone());

        let mut counts = TransferCounts::default();
        engine
            .export(&orders(), KeyScope::Server, Vec::<u8>::new(), 1, &mut counts)
            .await
            .unwrap();
        assert_eq!(metrics.snapshot().batches, 2);
        assert_eq!(
            orders().snapshot().get(&Value::Int(1)),
            Some(&Value::from("x"))
        );
    }
}
