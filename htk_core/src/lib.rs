//! Reader and writer for HTK-style binary feature files.
//!
//! A feature file is a 12-byte big-endian header followed by fixed-size rows
//! of 32-bit floats, or of 16-bit integers with a per-column de-quantization
//! table when the compressed flag is set.

pub mod error;
pub mod format;
pub mod reader;
pub mod writer;

use std::fs::File;
use std::path::Path;
use std::str::FromStr;

pub use error::{HtkError, Result};
pub use format::{
    needs_byte_swap, BaseKind, ByteOrder, CompressionTable, FileHeader, ParamKind, HEADER_SIZE,
};
pub use reader::{Reader, Vectors};
pub use writer::{Writer, WriterOptions};

/// Whether [`open`] reads an existing file or creates a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Read,
    Write,
}

impl FromStr for Mode {
    type Err = HtkError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "r" | "rb" => Ok(Mode::Read),
            "w" | "wb" => Ok(Mode::Write),
            other => Err(HtkError::InvalidMode(other.to_string())),
        }
    }
}

/// A file opened through [`open`].
pub enum FeatureFile {
    Reader(Reader<File>),
    Writer(Writer<File>),
}

/// Open `path` for reading or writing.
///
/// `vector_length` only applies to [`Mode::Write`]; readers take the length
/// from the file header.
pub fn open(path: impl AsRef<Path>, mode: Mode, vector_length: usize) -> Result<FeatureFile> {
    match mode {
        Mode::Read => Ok(FeatureFile::Reader(Reader::open(path)?)),
        Mode::Write => Ok(FeatureFile::Writer(Writer::create(
            path,
            WriterOptions::new(vector_length),
        )?)),
    }
}
