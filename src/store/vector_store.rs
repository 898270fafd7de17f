//! Vector store - build-or-open lifecycle and read-only queries

use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use super::builder::{ingest, BuildSummary, IngestOptions, DEFAULT_COMMIT_INTERVAL};
use super::codec;
use super::meta::StoreMeta;
use super::origin::{FsEnv, StoreEnv, StoreOrigin};
use super::source::{canonicalize, EmbeddingSource};
use crate::backend::{KvReader, MemoryBackend, SegmentReader, SegmentWriter};
use crate::error::{Result, StoreError};

/// Default bounded wait for the directory lock
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(1000);

/// Construction parameters for a [`VectorStore`]
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Embedding source; required only when the store has to be built
    pub source: Option<PathBuf>,
    /// Target store directory
    pub dir: PathBuf,
    /// Open an existing directory as-is instead of redirecting
    pub reuse: bool,
    pub commit_interval: usize,
    pub lock_timeout: Duration,
    pub strict_word_count: bool,
    /// Show a progress bar while building
    pub progress: bool,
}

impl StoreOptions {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            source: None,
            dir: dir.into(),
            reuse: true,
            commit_interval: DEFAULT_COMMIT_INTERVAL,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            strict_word_count: true,
            progress: false,
        }
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_reuse(mut self, reuse: bool) -> Self {
        self.reuse = reuse;
        self
    }

    pub fn with_commit_interval(mut self, interval: usize) -> Self {
        self.commit_interval = interval;
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_strict_word_count(mut self, strict: bool) -> Self {
        self.strict_word_count = strict;
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            commit_interval: self.commit_interval,
            strict_word_count: self.strict_word_count,
        }
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        let progress = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} words ({eta})")
        {
            progress.set_style(style.progress_chars("#>-"));
        }
        progress
    }
}

/// Read-only word -> vector store
///
/// Queries take `&self` and never mutate, so a store can be shared across
/// threads once constructed.
pub struct VectorStore {
    reader: Box<dyn KvReader>,
    origin: Option<StoreOrigin>,
    word_count: usize,
    dimension: usize,
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore")
            .field("origin", &self.origin)
            .field("word_count", &self.word_count)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl VectorStore {
    /// Build or open the store described by `options`
    pub fn open(options: &StoreOptions) -> Result<Self> {
        Self::open_with_env(options, &FsEnv)
    }

    /// Build or open a store, probing the filesystem through `env`
    pub fn open_with_env(options: &StoreOptions, env: &dyn StoreEnv) -> Result<Self> {
        let origin = StoreOrigin::resolve(env, &options.dir, options.reuse)?;

        // Check the source before creating anything on disk
        let source = if origin.needs_build() {
            let path = options.source.as_deref().ok_or_else(|| {
                StoreError::configuration(
                    origin.dir(),
                    "no store exists here and no embedding source was given to build one",
                )
            })?;
            Some(EmbeddingSource::open(path)?)
        } else {
            None
        };

        origin.prepare(env)?;
        let dir = origin.dir().to_path_buf();

        let captured = match source {
            Some(source) => Some(build_dir(&dir, source, options)?),
            None => {
                info!("Reusing store at {:?}", dir);
                None
            }
        };

        let reader = SegmentReader::open(&dir, options.lock_timeout)?;
        let persisted = reader.meta().cloned();
        Self::from_reader(Box::new(reader), Some(origin), captured, persisted.as_ref(), &dir)
    }

    /// Build a store held entirely in memory from `source`
    pub fn in_memory(source: &Path, options: &StoreOptions) -> Result<Self> {
        let mut backend = MemoryBackend::new();
        let embedding_source = EmbeddingSource::open(source)?;
        let summary = ingest(
            embedding_source,
            &mut backend,
            options.ingest_options(),
            &options.progress_bar(),
        )?;
        Self::from_reader(Box::new(backend), None, Some(summary), None, source)
    }

    /// Populate metadata from the build summary, persisted metadata, or the
    /// records themselves, in that order of preference
    fn from_reader(
        reader: Box<dyn KvReader>,
        origin: Option<StoreOrigin>,
        captured: Option<BuildSummary>,
        persisted: Option<&StoreMeta>,
        location: &Path,
    ) -> Result<Self> {
        let word_count = captured
            .map(|s| s.distinct_words)
            .or_else(|| persisted.and_then(|m| m.word_count))
            .unwrap_or_else(|| {
                debug!("Word count unknown for {:?}, counting records", location);
                reader.count()
            });
        if word_count != reader.count() {
            return Err(StoreError::format(
                location,
                None,
                format!(
                    "metadata records {} words but the store holds {}",
                    word_count,
                    reader.count()
                ),
            ));
        }

        let declared = captured
            .map(|s| s.dimension)
            .or_else(|| persisted.and_then(|m| m.dimension));

        let dimension = match reader.any_value() {
            Some(bytes) => {
                let inferred = codec::component_count(bytes).ok_or_else(|| {
                    StoreError::format(
                        location,
                        None,
                        format!("stored vector has {} bytes, not a multiple of 4", bytes.len()),
                    )
                })?;
                match declared {
                    Some(d) if d != inferred => {
                        return Err(StoreError::format(
                            location,
                            None,
                            format!("declared dimension {} but stored vectors have {}", d, inferred),
                        ));
                    }
                    Some(d) => d,
                    None => {
                        debug!("Dimension unknown for {:?}, inferred {}", location, inferred);
                        inferred
                    }
                }
            }
            None => declared.unwrap_or(0),
        };

        Ok(Self {
            reader,
            origin,
            word_count,
            dimension,
        })
    }

    /// Check whether `word` has an embedding
    pub fn contains(&self, word: &str) -> bool {
        self.reader.contains_key(&canonicalize(word))
    }

    /// Embedding for `word`, `None` if absent
    pub fn vector_for(&self, word: &str) -> Option<Vec<f32>> {
        let bytes = self.reader.get(&canonicalize(word))?;
        codec::decode(bytes)
    }

    /// Number of distinct words
    pub fn word_count(&self) -> usize {
        self.word_count
    }

    /// Embedding width
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// How the store directory was obtained; `None` for in-memory stores
    pub fn origin(&self) -> Option<&StoreOrigin> {
        self.origin.as_ref()
    }

    /// Directory actually holding the store
    pub fn dir(&self) -> Option<&Path> {
        self.origin.as_ref().map(StoreOrigin::dir)
    }
}

/// Ingest `source` into a new record log in `dir`
fn build_dir(dir: &Path, source: EmbeddingSource, options: &StoreOptions) -> Result<BuildSummary> {
    let source_name = source
        .path()
        .file_name()
        .map(|n| n.to_string_lossy().to_string());
    let meta = StoreMeta::new(source.header().dimension, source_name);

    let mut writer = SegmentWriter::create(dir, meta, options.lock_timeout)?;
    let summary = ingest(source, &mut writer, options.ingest_options(), &options.progress_bar())?;
    writer.finish()?;

    info!(
        "Built store at {:?}: {} words, {} dimensions",
        dir, summary.distinct_words, summary.dimension
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::origin::tests::FakeEnv;

    const EXAMPLE: &str = "2 3\ncat 1.0 2.0 3.0\ndog 4.0 5.0 6.0\n";

    fn write_source(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    fn options(dir: &Path) -> StoreOptions {
        StoreOptions::new(dir).with_lock_timeout(Duration::from_millis(200))
    }

    fn dir_listing(dir: &Path) -> Vec<(String, Vec<u8>)> {
        let mut entries: Vec<(String, Vec<u8>)> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| {
                let e = e.unwrap();
                (
                    e.file_name().to_string_lossy().to_string(),
                    std::fs::read(e.path()).unwrap(),
                )
            })
            .collect();
        entries.sort();
        entries
    }

    #[test]
    fn test_end_to_end_example() {
        let tmp = tempfile::tempdir().unwrap();
        let source = write_source(tmp.path(), "vectors.txt", EXAMPLE);
        let store_dir = tmp.path().join("store");

        let store = VectorStore::open(&options(&store_dir).with_source(&source)).unwrap();

        assert_eq!(store.word_count(), 2);
        assert_eq!(store.dimension(), 3);
        assert_eq!(store.vector_for("cat"), Some(vec![1.0, 2.0, 3.0]));
        assert!(store.contains("dog"));
        assert!(!store.contains("bird"));
        assert_eq!(store.vector_for("bird"), None);
        assert_eq!(store.origin().map(StoreOrigin::label), Some("fresh"));
        assert_eq!(store.dir(), Some(store_dir.as_path()));
    }

    #[test]
    fn test_casing_is_folded() {
        let tmp = tempfile::tempdir().unwrap();
        let source = write_source(tmp.path(), "vectors.txt", "1 2\nApple 0.1 0.2\n");

        let store = VectorStore::open(&options(&tmp.path().join("store")).with_source(&source)).unwrap();

        assert!(store.contains("apple"));
        assert!(store.contains("Apple"));
        assert!(store.contains("APPLE"));
        assert_eq!(store.vector_for("Apple"), Some(vec![0.1, 0.2]));
    }

    #[test]
    fn test_round_trip_is_bit_exact() {
        let tmp = tempfile::tempdir().unwrap();
        let source = write_source(
            tmp.path(),
            "vectors.txt",
            "2 3\nodd NaN inf -0.0\nnum 0.1 -1e-39 3.4028235e38\n",
        );

        let store = VectorStore::open(&options(&tmp.path().join("store")).with_source(&source)).unwrap();

        for line in ["odd NaN inf -0.0", "num 0.1 -1e-39 3.4028235e38"] {
            let expected = crate::store::source::parse_record(line, 3).unwrap();
            let actual = store.vector_for(&expected.word).unwrap();
            let expected_bits: Vec<u32> = expected.vector.iter().map(|f| f.to_bits()).collect();
            let actual_bits: Vec<u32> = actual.iter().map(|f| f.to_bits()).collect();
            assert_eq!(actual_bits, expected_bits);
        }
    }

    #[test]
    fn test_reuse_does_not_read_source() {
        let tmp = tempfile::tempdir().unwrap();
        let source = write_source(tmp.path(), "vectors.txt", EXAMPLE);
        let store_dir = tmp.path().join("store");

        let first = VectorStore::open(&options(&store_dir).with_source(&source)).unwrap();
        let first_vectors = (first.vector_for("cat"), first.vector_for("dog"));
        drop(first);

        std::fs::remove_file(&source).unwrap();

        let second = VectorStore::open(&options(&store_dir).with_source(&source).with_reuse(true)).unwrap();
        assert_eq!(second.origin().map(StoreOrigin::label), Some("reused"));
        assert_eq!(second.word_count(), 2);
        assert_eq!(second.dimension(), 3);
        assert_eq!((second.vector_for("cat"), second.vector_for("dog")), first_vectors);
        assert!(!second.contains("bird"));
    }

    #[test]
    fn test_reuse_infers_missing_counts() {
        let tmp = tempfile::tempdir().unwrap();
        let source = write_source(tmp.path(), "vectors.txt", EXAMPLE);
        let store_dir = tmp.path().join("store");

        drop(VectorStore::open(&options(&store_dir).with_source(&source)).unwrap());
        std::fs::remove_file(StoreMeta::path_for(&store_dir)).unwrap();

        let store = VectorStore::open(&options(&store_dir)).unwrap();
        assert_eq!(store.word_count(), 2);
        assert_eq!(store.dimension(), 3);
    }

    #[test]
    fn test_redirect_leaves_existing_store_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let source = write_source(tmp.path(), "vectors.txt", EXAMPLE);
        let store_dir = tmp.path().join("store");

        drop(VectorStore::open(&options(&store_dir).with_source(&source)).unwrap());
        let before = dir_listing(&store_dir);

        let other = write_source(tmp.path(), "other.txt", "1 3\nbird 7.0 8.0 9.0\n");
        let store = VectorStore::open(&options(&store_dir).with_source(&other).with_reuse(false)).unwrap();

        assert_eq!(store.origin().map(StoreOrigin::label), Some("redirected"));
        let new_dir = store.dir().unwrap().to_path_buf();
        assert_ne!(new_dir, store_dir);
        assert_eq!(new_dir.parent(), Some(tmp.path()));
        assert!(new_dir.join("words.log").exists());

        assert!(store.contains("bird"));
        assert!(!store.contains("cat"));
        assert_eq!(store.word_count(), 1);

        drop(store);
        assert_eq!(dir_listing(&store_dir), before);
    }

    #[test]
    fn test_malformed_source_fails_construction() {
        let tmp = tempfile::tempdir().unwrap();
        let source = write_source(tmp.path(), "vectors.txt", "2 3\ncat 1.0 2.0 3.0\ndog 4.0 5.0\n");

        let err = VectorStore::open(&options(&tmp.path().join("store")).with_source(&source)).unwrap_err();
        assert!(err.is_format());
        assert!(err.to_string().contains("vectors.txt"));
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_failed_build_is_not_reused() {
        let tmp = tempfile::tempdir().unwrap();
        let bad = write_source(tmp.path(), "bad.txt", "2 3\ncat 1.0 2.0 3.0\ndog 4.0 5.0\n");
        let good = write_source(tmp.path(), "good.txt", EXAMPLE);
        let store_dir = tmp.path().join("store");

        let err = VectorStore::open(&options(&store_dir).with_source(&bad)).unwrap_err();
        assert!(err.is_format());

        let err = VectorStore::open(&options(&store_dir).with_source(&good)).unwrap_err();
        assert!(err.is_storage());
        assert!(err.to_string().contains("did not finish"));
        assert!(err.to_string().contains(&store_dir.display().to_string()));

        std::fs::remove_dir_all(&store_dir).unwrap();
        let store = VectorStore::open(&options(&store_dir).with_source(&good)).unwrap();
        assert_eq!(store.word_count(), 2);
        assert!(store.contains("cat"));
    }

    #[test]
    fn test_huge_header_dimension_fails_construction() {
        let tmp = tempfile::tempdir().unwrap();
        for header in ["1 18446744073709551615", "1 100000000000000"] {
            let source = write_source(tmp.path(), "vectors.txt", &format!("{}\ncat 1.0\n", header));
            let err = VectorStore::open(&options(&tmp.path().join("store")).with_source(&source)).unwrap_err();
            assert!(err.is_format());
            assert!(err.to_string().contains("line 1"));
        }
        assert!(!tmp.path().join("store").exists());
    }

    #[test]
    fn test_word_count_mismatch_in_meta_is_format_error() {
        let tmp = tempfile::tempdir().unwrap();
        let source = write_source(tmp.path(), "vectors.txt", EXAMPLE);
        let store_dir = tmp.path().join("store");

        drop(VectorStore::open(&options(&store_dir).with_source(&source)).unwrap());
        let mut meta = StoreMeta::load(&store_dir).unwrap().unwrap();
        meta.word_count = Some(5);
        meta.save(&store_dir).unwrap();

        let err = VectorStore::open(&options(&store_dir)).unwrap_err();
        assert!(err.is_format());
        assert!(err.to_string().contains("metadata records 5 words but the store holds 2"));
    }

    #[test]
    fn test_bad_header_fails_construction() {
        let tmp = tempfile::tempdir().unwrap();
        let source = write_source(tmp.path(), "vectors.txt", "many three\ncat 1 2 3\n");

        let err = VectorStore::open(&options(&tmp.path().join("store")).with_source(&source)).unwrap_err();
        assert!(err.is_format());
    }

    #[test]
    fn test_missing_source_is_storage_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = VectorStore::open(&options(&tmp.path().join("store")).with_source(tmp.path().join("nope.txt")))
            .unwrap_err();
        assert!(err.is_storage());
        assert!(err.to_string().contains("nope.txt"));
        assert!(!tmp.path().join("store").exists());
    }

    #[test]
    fn test_build_without_source_is_configuration_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = VectorStore::open(&options(&tmp.path().join("store"))).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_reuse_of_empty_dir_is_storage_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store_dir = tmp.path().join("store");
        std::fs::create_dir(&store_dir).unwrap();

        let err = VectorStore::open(&options(&store_dir)).unwrap_err();
        assert!(err.is_storage());
    }

    #[test]
    fn test_reuse_of_file_is_configuration_error() {
        let tmp = tempfile::tempdir().unwrap();
        let not_dir = write_source(tmp.path(), "store", "not a directory");

        let err = VectorStore::open(&options(&not_dir)).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_empty_store_keeps_declared_dimension() {
        let tmp = tempfile::tempdir().unwrap();
        let source = write_source(tmp.path(), "vectors.txt", "0 50\n");
        let store_dir = tmp.path().join("store");

        let store = VectorStore::open(&options(&store_dir).with_source(&source)).unwrap();
        assert_eq!(store.word_count(), 0);
        assert_eq!(store.dimension(), 50);
        assert!(!store.contains("anything"));
        drop(store);

        std::fs::remove_file(StoreMeta::path_for(&store_dir)).unwrap();
        let reopened = VectorStore::open(&options(&store_dir)).unwrap();
        assert_eq!(reopened.word_count(), 0);
        assert_eq!(reopened.dimension(), 0);
    }

    #[test]
    fn test_duplicate_words_last_write_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let source = write_source(tmp.path(), "vectors.txt", "3 1\nCat 1\ndog 2\ncat 3\n");

        let store = VectorStore::open(&options(&tmp.path().join("store")).with_source(&source)).unwrap();
        assert_eq!(store.word_count(), 2);
        assert_eq!(store.vector_for("cat"), Some(vec![3.0]));
    }

    #[test]
    fn test_small_commit_interval() {
        let tmp = tempfile::tempdir().unwrap();
        let mut text = String::from("25 2\n");
        for i in 0..25 {
            text.push_str(&format!("w{} {} {}\n", i, i, -(i as i32)));
        }
        let source = write_source(tmp.path(), "vectors.txt", &text);

        let store = VectorStore::open(
            &options(&tmp.path().join("store"))
                .with_source(&source)
                .with_commit_interval(4),
        )
        .unwrap();
        assert_eq!(store.word_count(), 25);
        assert_eq!(store.vector_for("w24"), Some(vec![24.0, -24.0]));
    }

    #[test]
    fn test_every_vector_has_store_dimension() {
        let tmp = tempfile::tempdir().unwrap();
        let source = write_source(tmp.path(), "vectors.txt", EXAMPLE);
        let store = VectorStore::open(&options(&tmp.path().join("store")).with_source(&source)).unwrap();

        for word in ["cat", "dog"] {
            assert_eq!(store.vector_for(word).unwrap().len(), store.dimension());
        }
    }

    #[test]
    fn test_concurrent_readers() {
        let tmp = tempfile::tempdir().unwrap();
        let source = write_source(tmp.path(), "vectors.txt", EXAMPLE);
        let store = VectorStore::open(&options(&tmp.path().join("store")).with_source(&source)).unwrap();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        assert!(store.contains("cat"));
                        assert_eq!(store.vector_for("dog"), Some(vec![4.0, 5.0, 6.0]));
                    }
                });
            }
        });
    }

    #[test]
    fn test_in_memory_store() {
        let tmp = tempfile::tempdir().unwrap();
        let source = write_source(tmp.path(), "vectors.txt", EXAMPLE);

        let store = VectorStore::in_memory(&source, &StoreOptions::new(tmp.path())).unwrap();
        assert_eq!(store.word_count(), 2);
        assert_eq!(store.dimension(), 3);
        assert!(store.origin().is_none());
        assert_eq!(store.vector_for("dog"), Some(vec![4.0, 5.0, 6.0]));
    }

    #[test]
    fn test_env_create_failure_is_storage_error() {
        let tmp = tempfile::tempdir().unwrap();
        let source = write_source(tmp.path(), "vectors.txt", EXAMPLE);
        let env = FakeEnv {
            fail_create: true,
            ..Default::default()
        };

        let err = VectorStore::open_with_env(
            &options(&tmp.path().join("store")).with_source(&source),
            &env,
        )
        .unwrap_err();
        assert!(err.is_storage());
    }
}
