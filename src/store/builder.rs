//! Store builder - ingests an embedding source into a backend

use indicatif::ProgressBar;
use tracing::{debug, info, warn};

use super::codec;
use super::source::{EmbeddingSource, MAX_PREALLOC_COMPONENTS};
use crate::backend::KvWriter;
use crate::error::{Result, StoreError};

/// Default number of records between durability commits
pub const DEFAULT_COMMIT_INTERVAL: usize = 10_000;

/// Outcome of ingesting a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildSummary {
    /// Word count declared by the header
    pub declared_words: usize,
    /// Embedding width declared by the header
    pub dimension: usize,
    /// Records written, duplicates included
    pub records_written: usize,
    /// Distinct words persisted
    pub distinct_words: usize,
}

/// Ingest settings
#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    pub commit_interval: usize,
    /// Fail when the record count differs from the header; warn otherwise
    pub strict_word_count: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            commit_interval: DEFAULT_COMMIT_INTERVAL,
            strict_word_count: true,
        }
    }
}

/// Write every record of `source` into `writer`
///
/// Commits every `commit_interval` records and once more at the end.
pub fn ingest<W: KvWriter + ?Sized>(
    source: EmbeddingSource,
    writer: &mut W,
    options: IngestOptions,
    progress: &ProgressBar,
) -> Result<BuildSummary> {
    let header = source.header();
    let path = source.path().to_path_buf();
    let commit_interval = options.commit_interval.max(1);

    info!(
        "Ingesting {:?}: {} words declared, {} dimensions",
        path, header.word_count, header.dimension
    );
    progress.set_length(header.word_count as u64);

    let mut written = 0usize;
    let mut value = Vec::with_capacity(
        header.dimension.min(MAX_PREALLOC_COMPONENTS) * codec::BYTES_PER_COMPONENT,
    );

    for record in source {
        let record = record?;

        value.clear();
        codec::encode_into(&record.vector, &mut value);
        writer.put(&record.word, &value)?;

        written += 1;
        progress.inc(1);

        if written % commit_interval == 0 {
            writer.commit()?;
            debug!("Committed {} records", written);
        }
    }

    writer.commit()?;
    progress.finish_and_clear();

    if written != header.word_count {
        let reason = format!(
            "header declares {} words but {} records were read",
            header.word_count, written
        );
        if options.strict_word_count {
            return Err(StoreError::format(&path, None, reason));
        }
        warn!("{}: {}", path.display(), reason);
    }

    let summary = BuildSummary {
        declared_words: header.word_count,
        dimension: header.dimension,
        records_written: written,
        distinct_words: writer.count(),
    };
    info!(
        "Ingested {} of {} declared records ({} distinct words)",
        summary.records_written, summary.declared_words, summary.distinct_words
    );
    Ok(summary)
}
