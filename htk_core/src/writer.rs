use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{HtkError, Result};
use crate::format::{
    ByteOrder, FileHeader, ParamKind, DEFAULT_SAMPLE_PERIOD, DEFAULT_VECTOR_LENGTH,
};

/// Shape and labelling of the rows a [`Writer`] emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    /// Coefficients per row.
    pub vector_length: usize,
    /// Sampling period in 100-ns units.
    pub sample_period: u32,
    pub param_kind: ParamKind,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            vector_length: DEFAULT_VECTOR_LENGTH,
            sample_period: DEFAULT_SAMPLE_PERIOD,
            param_kind: ParamKind::default(),
        }
    }
}

impl WriterOptions {
    pub fn new(vector_length: usize) -> Self {
        Self {
            vector_length,
            ..Self::default()
        }
    }
}

/// Streaming writer for uncompressed HTK feature files.
///
/// # Write contract
/// A placeholder header with a zero row count is written on construction.
/// Each [`write_vector`](Self::write_vector) appends one row of 32-bit floats.
/// [`close`](Self::close) patches the row count into the header and may be
/// called any number of times. If rows were written since the last close,
/// dropping the writer patches the header too, including during unwinding.
///
/// # Format layout written
/// ```text
/// [HEADER: 12 bytes, nSamples = 0 until closed]
/// [ROW 0] [ROW 1] ... [ROW N-1]      ← vector_length × f32 BE each
/// ← seek back to 0, overwrite header with N
/// ```
pub struct Writer<W: Write + Seek = File> {
    inner: W,
    options: WriterOptions,
    sample_size: u16,
    rows: u32,
    /// Rows were appended since the header was last patched.
    dirty: bool,
    order: ByteOrder,
}

impl Writer<File> {
    /// Create a new feature file at `path`, overwriting any existing file.
    pub fn create(path: impl AsRef<Path>, options: WriterOptions) -> Result<Self> {
        let file = File::create(path)?;
        Self::new(file, options)
    }
}

impl<W: Write + Seek> Writer<W> {
    pub fn new(inner: W, options: WriterOptions) -> Result<Self> {
        Self::with_host_order(inner, options, ByteOrder::native())
    }

    /// Build a writer that encodes rows as a host with byte order `order` would.
    pub fn with_host_order(mut inner: W, options: WriterOptions, order: ByteOrder) -> Result<Self> {
        let sample_size = options
            .vector_length
            .checked_mul(4)
            .and_then(|size| u16::try_from(size).ok())
            .filter(|&size| size > 0)
            .ok_or_else(|| {
                HtkError::format(format!(
                    "vector length {} does not give a valid sample size",
                    options.vector_length
                ))
            })?;

        let placeholder = FileHeader {
            sample_count: 0,
            sample_period: options.sample_period,
            sample_size,
            param_kind: options.param_kind,
        };
        inner.seek(SeekFrom::Start(0))?;
        inner.write_all(&placeholder.to_bytes())?;

        Ok(Self {
            inner,
            options,
            sample_size,
            rows: 0,
            dirty: false,
            order,
        })
    }

    /// Header as it will be written by the next [`close`](Self::close).
    pub fn header(&self) -> FileHeader {
        FileHeader {
            sample_count: self.rows,
            sample_period: self.options.sample_period,
            sample_size: self.sample_size,
            param_kind: self.options.param_kind,
        }
    }

    #[inline]
    pub fn rows_written(&self) -> u32 {
        self.rows
    }

    #[inline]
    pub fn vector_length(&self) -> usize {
        self.options.vector_length
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Append one row. Rejects rows whose length differs from the configured one.
    pub fn write_vector(&mut self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.options.vector_length {
            return Err(HtkError::Validation {
                expected: self.options.vector_length,
                actual: vector.len(),
            });
        }
        let rows = self
            .rows
            .checked_add(1)
            .ok_or_else(|| HtkError::format("row count exceeds the header's 32-bit field"))?;

        let mut buf = Vec::with_capacity(self.sample_size as usize);
        for &value in vector {
            buf.extend_from_slice(&self.order.write_f32(value));
        }
        let start = self.inner.stream_position()?;
        if let Err(e) = self.inner.write_all(&buf) {
            // Drop the partial row so later rows stay aligned.
            if let Err(rewind) = self.inner.seek(SeekFrom::Start(start)) {
                warn!(error = %rewind, "failed to rewind after partial row write");
            }
            return Err(e.into());
        }

        self.rows = rows;
        self.dirty = true;
        Ok(())
    }

    /// Append rows in order, stopping at the first invalid one.
    ///
    /// Rows written before the failure stay in the file.
    pub fn write_all<I, V>(&mut self, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = V>,
        V: AsRef<[f32]>,
    {
        for row in rows {
            self.write_vector(row.as_ref())?;
        }
        Ok(())
    }

    /// Patch the row count into the header. Safe to call repeatedly.
    pub fn close(&mut self) -> Result<()> {
        let header = self.header();
        let pos = self.inner.stream_position()?;
        self.inner.seek(SeekFrom::Start(0))?;
        self.inner.write_all(&header.to_bytes())?;
        // Later rows continue after the last row, never over the header.
        self.inner.seek(SeekFrom::Start(pos))?;
        self.inner.flush()?;
        self.dirty = false;
        debug!(sample_count = header.sample_count, "patched feature file header");
        Ok(())
    }

    /// Close and consume the writer, returning the number of rows written.
    pub fn finish(mut self) -> Result<u32> {
        self.close()?;
        Ok(self.rows)
    }
}

impl<W: Write + Seek> Drop for Writer<W> {
    fn drop(&mut self) {
        if self.dirty {
            if let Err(e) = self.close() {
                warn!(error = %e, rows = self.rows, "failed to patch header on drop");
            }
        }
    }
}
