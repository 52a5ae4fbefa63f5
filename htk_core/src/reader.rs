use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{HtkError, Result};
use crate::format::{decode_rows, ByteOrder, CompressionTable, FileHeader, HEADER_SIZE};

/// Sequential and positional reader for HTK feature files.
///
/// # Open sequence
/// 1. Read the 12-byte header and derive the vector length from `sampSize`
///    and the compressed flag.
/// 2. If the file is compressed, load the A/B table that follows the header
///    (or use the implicit IREFC table, which occupies no bytes).
/// 3. Remember where row data starts; every row is `sampSize` bytes from there.
///
/// # Access pattern
/// [`seek`](Self::seek) jumps straight to a row, [`read_next`](Self::read_next)
/// and [`vectors`](Self::vectors) walk forward from the cursor, and
/// [`read_all`](Self::read_all) decodes every row in one pass.
pub struct Reader<R = File> {
    inner: R,
    header: FileHeader,
    table: Option<CompressionTable>,
    vector_length: usize,
    data_offset: u64,
    order: ByteOrder,
}

impl Reader<File> {
    /// Open an HTK feature file for reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(file)
    }
}

impl<R: Read + Seek> Reader<R> {
    /// Parse the header of `inner`, decoding elements in this host's byte order.
    pub fn new(inner: R) -> Result<Self> {
        Self::with_host_order(inner, ByteOrder::native())
    }

    /// Parse the header of `inner` as a host with byte order `order` would.
    pub fn with_host_order(mut inner: R, order: ByteOrder) -> Result<Self> {
        inner.seek(SeekFrom::Start(0))?;

        // ── Header ──────────────────────────────────────────────────────────
        let mut header_buf = [0u8; HEADER_SIZE as usize];
        inner
            .read_exact(&mut header_buf)
            .map_err(|e| HtkError::truncated("header", e))?;
        let header = FileHeader::from_bytes(&header_buf)?;
        let vector_length = header.vector_length()?;

        // ── Compression table ───────────────────────────────────────────────
        let table = if header.has_compression_table() {
            let mut table_buf = vec![0u8; 8 * vector_length];
            inner
                .read_exact(&mut table_buf)
                .map_err(|e| HtkError::truncated("compression table", e))?;
            Some(CompressionTable::from_bytes(&table_buf, vector_length, order)?)
        } else if header.param_kind.is_compressed() {
            Some(CompressionTable::irefc(vector_length))
        } else {
            None
        };

        let data_offset = inner.stream_position()?;
        debug!(
            sample_count = header.sample_count,
            sample_period = header.sample_period,
            sample_size = header.sample_size,
            param_kind = %header.param_kind,
            vector_length,
            data_offset,
            "opened feature file"
        );

        Ok(Self {
            inner,
            header,
            table,
            vector_length,
            data_offset,
            order,
        })
    }

    #[inline]
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Coefficients per row, derived from the header.
    #[inline]
    pub fn vector_length(&self) -> usize {
        self.vector_length
    }

    /// Byte offset of the first row.
    #[inline]
    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }

    /// The de-quantization table, present only for compressed files.
    pub fn compression(&self) -> Option<&CompressionTable> {
        self.table.as_ref()
    }

    /// Move the cursor to row `row`.
    ///
    /// Not checked against `sampleCount`; a seek past the end shows up as
    /// `Ok(None)` from the next [`read_next`](Self::read_next). A row whose
    /// byte offset overflows `u64` parks the cursor at end-of-file.
    pub fn seek(&mut self, row: u64) -> Result<()> {
        let target = row
            .checked_mul(self.header.sample_size as u64)
            .and_then(|offset| offset.checked_add(self.data_offset))
            .map_or(SeekFrom::End(0), SeekFrom::Start);
        self.inner.seek(target)?;
        Ok(())
    }

    /// Read the row under the cursor, or `None` once no full row remains.
    pub fn read_next(&mut self) -> Result<Option<Vec<f32>>> {
        let mut buf = vec![0u8; self.header.sample_size as usize];
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => return Ok(None),
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(decode_rows(&buf, self.vector_length, self.table.as_ref(), self.order).pop())
    }

    /// Forward iterator over rows starting at the current cursor.
    pub fn vectors(&mut self) -> Vectors<'_, R> {
        Vectors { reader: self }
    }

    /// Decode every full row from the start of the data section.
    ///
    /// The cursor is left at end-of-file.
    pub fn read_all(&mut self) -> Result<Vec<Vec<f32>>> {
        self.seek(0)?;
        let mut data = Vec::new();
        self.inner.read_to_end(&mut data)?;

        let sample_size = self.header.sample_size as usize;
        if data.len() % sample_size != 0 {
            warn!(
                trailing_bytes = data.len() % sample_size,
                "ignoring partial trailing row"
            );
        }
        let rows = decode_rows(&data, self.vector_length, self.table.as_ref(), self.order);
        if rows.len() != self.header.sample_count as usize {
            warn!(
                header_rows = self.header.sample_count,
                available_rows = rows.len(),
                "row count differs from header"
            );
        }
        Ok(rows)
    }

    /// Number of full rows present on disk, independent of `sampleCount`.
    ///
    /// Leaves the cursor after the last full row.
    pub fn count_rows(&mut self) -> Result<u64> {
        self.seek(0)?;
        let mut rows = 0;
        while self.read_next()?.is_some() {
            rows += 1;
        }
        Ok(rows)
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Iterator returned by [`Reader::vectors`]; ends at the first missing row.
pub struct Vectors<'a, R> {
    reader: &'a mut Reader<R>,
}

impl<R: Read + Seek> Iterator for Vectors<'_, R> {
    type Item = Result<Vec<f32>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read_next().transpose()
    }
}

impl<'a, R: Read + Seek> IntoIterator for &'a mut Reader<R> {
    type Item = Result<Vec<f32>>;
    type IntoIter = Vectors<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.vectors()
    }
}
