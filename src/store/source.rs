//! Embedding source reader - GloVe/word2vec style text dumps
//!
//! Line 1 is `<word count> <dimension>`, every following line is a word and
//! its components separated by whitespace. Files whose name marks them as
//! gzip-compressed are decompressed on the fly.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;

use super::codec::BYTES_PER_COMPONENT;
use crate::error::{Result, StoreError};

/// Filename suffixes treated as gzip-compressed
const GZIP_SUFFIXES: &[&str] = &[".gz", ".tgz", ".z", "-gz", "-z", "_z"];

/// Upper bound on buffer capacity reserved from a header value
pub const MAX_PREALLOC_COMPONENTS: usize = 4096;

/// A single parsed source line
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord {
    pub word: String,
    pub vector: Vec<f32>,
}

/// Header of an embedding source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceHeader {
    pub word_count: usize,
    pub dimension: usize,
}

/// Fold a word to the single casing used for storage and lookups
pub fn canonicalize(word: &str) -> String {
    word.to_lowercase()
}

/// Check whether a file name marks gzip compression
pub fn is_gzip_path(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    GZIP_SUFFIXES
        .iter()
        .any(|suffix| name.len() > suffix.len() && name.ends_with(suffix))
}

/// Streaming reader over the records of an embedding source
pub struct EmbeddingSource {
    path: PathBuf,
    lines: std::io::Lines<Box<dyn BufRead>>,
    header: SourceHeader,
    line_no: usize,
}

impl std::fmt::Debug for EmbeddingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingSource")
            .field("path", &self.path)
            .field("header", &self.header)
            .field("line_no", &self.line_no)
            .finish()
    }
}

impl EmbeddingSource {
    /// Open a source file and parse its header
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| StoreError::storage(path, "cannot open embedding source", e))?;

        let inner: Box<dyn Read> = if is_gzip_path(path) {
            Box::new(MultiGzDecoder::new(file))
        } else {
            Box::new(file)
        };

        Self::from_reader(path, Box::new(BufReader::new(inner)))
    }

    /// Parse a source from an already opened reader; `path` is used for errors
    pub fn from_reader(path: &Path, reader: Box<dyn BufRead>) -> Result<Self> {
        let mut lines = reader.lines();

        let first = match lines.next() {
            Some(line) => line.map_err(|e| read_error(path, 1, e))?,
            None => return Err(StoreError::format(path, Some(1), "missing header line")),
        };
        let header = parse_header(&first).map_err(|reason| StoreError::format(path, Some(1), reason))?;

        Ok(Self {
            path: path.to_path_buf(),
            lines,
            header,
            line_no: 1,
        })
    }

    pub fn header(&self) -> SourceHeader {
        self.header
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Iterator for EmbeddingSource {
    type Item = Result<EmbeddingRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_no += 1;

            let line = match line {
                Ok(line) => line,
                Err(e) => return Some(Err(read_error(&self.path, self.line_no, e))),
            };

            if line.trim().is_empty() {
                continue;
            }

            return Some(
                parse_record(&line, self.header.dimension)
                    .map_err(|reason| StoreError::format(&self.path, Some(self.line_no), reason)),
            );
        }
    }
}

fn read_error(path: &Path, line_no: usize, err: std::io::Error) -> StoreError {
    if err.kind() == std::io::ErrorKind::InvalidData {
        StoreError::format(path, Some(line_no), format!("not valid UTF-8 text: {}", err))
    } else {
        StoreError::storage(path, format!("read failed at line {}", line_no), err)
    }
}

/// Parse `<word count> <dimension>`
pub fn parse_header(line: &str) -> std::result::Result<SourceHeader, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 2 {
        return Err(format!(
            "header must be '<word count> <dimension>', got {} field(s)",
            fields.len()
        ));
    }

    let word_count = fields[0]
        .parse::<usize>()
        .map_err(|e| format!("invalid word count '{}': {}", fields[0], e))?;
    let dimension = fields[1]
        .parse::<usize>()
        .map_err(|e| format!("invalid dimension '{}': {}", fields[1], e))?;

    // Encoded vectors are stored with a u32 length prefix
    let fits = dimension
        .checked_mul(BYTES_PER_COMPONENT)
        .is_some_and(|bytes| u32::try_from(bytes).is_ok());
    if !fits {
        return Err(format!("dimension {} is too large", dimension));
    }

    Ok(SourceHeader {
        word_count,
        dimension,
    })
}

/// Parse `<word> <f1> ... <f_dimension>`, folding the word to lowercase
pub fn parse_record(line: &str, dimension: usize) -> std::result::Result<EmbeddingRecord, String> {
    let mut tokens = line.split_whitespace();

    let word = match tokens.next() {
        Some(word) => canonicalize(word),
        None => return Err("empty record".to_string()),
    };

    let mut vector = Vec::with_capacity(dimension.min(MAX_PREALLOC_COMPONENTS));
    for token in tokens {
        if vector.len() == dimension {
            // Count the rest for a useful message
            let extra = line.split_whitespace().count();
            return Err(format!("expected {} tokens, got {}", dimension + 1, extra));
        }
        let value = token
            .parse::<f32>()
            .map_err(|e| format!("invalid component '{}' for '{}': {}", token, word, e))?;
        vector.push(value);
    }

    if vector.len() != dimension {
        return Err(format!(
            "expected {} tokens, got {}",
            dimension + 1,
            vector.len() + 1
        ));
    }

    Ok(EmbeddingRecord { word, vector })
}
