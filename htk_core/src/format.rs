use std::fmt;
use std::str::FromStr;

use crate::error::{HtkError, Result};

/// Fixed size of the HTK feature file header in bytes.
///   nSamples:u32 + sampPeriod:u32 + sampSize:u16 + parmKind:u16
///   = 4 + 4 + 2 + 2 = 12
pub const HEADER_SIZE: u64 = 12;

/// Default sample period: 10 ms in 100-ns units.
pub const DEFAULT_SAMPLE_PERIOD: u32 = 100_000;

/// Default vector length used by the writer (12 cepstra plus C0).
pub const DEFAULT_VECTOR_LENGTH: usize = 13;

/// Scale applied to every column of an IREFC compressed file.
pub const IREFC_SCALE: f32 = 32767.0;

const BASE_MASK: u16 = 0x3f;

// ── Byte order ─────────────────────────────────────────────────────────────

/// Byte order of the host that reads or writes a feature file.
///
/// Files are always big-endian on disk. A reader or writer holds the host
/// order and swaps each element when the host is not big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Big,
    Little,
}

impl ByteOrder {
    /// Byte order of the machine this process runs on.
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }

    /// Whether elements read natively on this host must be byte-swapped.
    pub const fn needs_swap(self) -> bool {
        matches!(self, ByteOrder::Little)
    }

    /// Interpret 4 on-disk bytes the way a host of this order does: native
    /// load followed by a swap when the host is not big-endian.
    pub fn read_u32(self, bytes: [u8; 4]) -> u32 {
        let raw = match self {
            ByteOrder::Big => u32::from_be_bytes(bytes),
            ByteOrder::Little => u32::from_le_bytes(bytes),
        };
        if self.needs_swap() {
            raw.swap_bytes()
        } else {
            raw
        }
    }

    pub fn read_u16(self, bytes: [u8; 2]) -> u16 {
        let raw = match self {
            ByteOrder::Big => u16::from_be_bytes(bytes),
            ByteOrder::Little => u16::from_le_bytes(bytes),
        };
        if self.needs_swap() {
            raw.swap_bytes()
        } else {
            raw
        }
    }

    /// Inverse of [`read_u32`](Self::read_u32): swap if needed, then store natively.
    pub fn write_u32(self, value: u32) -> [u8; 4] {
        let value = if self.needs_swap() {
            value.swap_bytes()
        } else {
            value
        };
        match self {
            ByteOrder::Big => value.to_be_bytes(),
            ByteOrder::Little => value.to_le_bytes(),
        }
    }

    pub fn read_f32(self, bytes: [u8; 4]) -> f32 {
        f32::from_bits(self.read_u32(bytes))
    }

    pub fn write_f32(self, value: f32) -> [u8; 4] {
        self.write_u32(value.to_bits())
    }
}

/// True when the running host is not big-endian.
pub const fn needs_byte_swap() -> bool {
    ByteOrder::native().needs_swap()
}

// ── Parameter kind ─────────────────────────────────────────────────────────

/// Base feature kinds stored in the low 6 bits of `parmKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum BaseKind {
    Lpc = 1,
    LpcRefc = 2,
    LpCepstra = 3,
    LpDelCep = 4,
    IRefc = 5,
    Mfcc = 6,
    Fbank = 7,
    MelSpec = 8,
    User = 9,
    Discrete = 10,
    Plp = 11,
}

const BASE_KINDS: [(BaseKind, &str); 11] = [
    (BaseKind::Lpc, "LPC"),
    (BaseKind::LpcRefc, "LPCREFC"),
    (BaseKind::LpCepstra, "LPCEPSTRA"),
    (BaseKind::LpDelCep, "LPCDELCEP"),
    (BaseKind::IRefc, "IREFC"),
    (BaseKind::Mfcc, "MFCC"),
    (BaseKind::Fbank, "FBANK"),
    (BaseKind::MelSpec, "MELSPEC"),
    (BaseKind::User, "USER"),
    (BaseKind::Discrete, "DISCRETE"),
    (BaseKind::Plp, "PLP"),
];

impl BaseKind {
    pub fn from_code(code: u16) -> Option<Self> {
        BASE_KINDS
            .iter()
            .map(|&(kind, _)| kind)
            .find(|kind| *kind as u16 == code)
    }

    pub fn name(self) -> &'static str {
        BASE_KINDS
            .iter()
            .find(|(kind, _)| *kind == self)
            .map(|&(_, name)| name)
            .unwrap_or("?")
    }
}

/// The `parmKind` header field: a base kind OR'd with qualifier flags.
///
/// Renders as the conventional `BASE_QUALIFIERS` string, e.g. `MFCC_E_D_A_0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamKind(pub u16);

impl ParamKind {
    /// Has energy.
    pub const ENERGY: u16 = 0o100;
    /// Absolute energy suppressed.
    pub const NO_ENERGY: u16 = 0o200;
    /// Has delta coefficients.
    pub const DELTA: u16 = 0o400;
    /// Has acceleration (delta-delta) coefficients.
    pub const ACCEL: u16 = 0o1000;
    /// Rows are stored as quantized 16-bit integers.
    pub const COMPRESSED: u16 = 0o2000;
    /// Has zero-mean static coefficients.
    pub const ZERO_MEAN: u16 = 0o4000;
    /// Has CRC checksum. Carried only; never generated or verified.
    pub const CHECKSUM: u16 = 0o10000;
    /// Has 0th cepstral coefficient.
    pub const C0: u16 = 0o20000;
    /// Has VQ data.
    pub const VQ: u16 = 0o40000;
    /// Has third differential coefficients.
    pub const THIRD_DIFF: u16 = 0o100000;

    const QUALIFIERS: [(u16, char); 10] = [
        (Self::ENERGY, 'E'),
        (Self::NO_ENERGY, 'N'),
        (Self::DELTA, 'D'),
        (Self::ACCEL, 'A'),
        (Self::COMPRESSED, 'C'),
        (Self::ZERO_MEAN, 'Z'),
        (Self::CHECKSUM, 'K'),
        (Self::C0, '0'),
        (Self::VQ, 'V'),
        (Self::THIRD_DIFF, 'T'),
    ];

    pub const fn new(base: BaseKind, flags: u16) -> Self {
        ParamKind(base as u16 | flags)
    }

    /// Raw base kind value (`parmKind & 0x3f`).
    pub const fn base_code(self) -> u16 {
        self.0 & BASE_MASK
    }

    pub fn base(self) -> Option<BaseKind> {
        BaseKind::from_code(self.base_code())
    }

    pub const fn has_flag(self, flag: u16) -> bool {
        self.0 & flag != 0
    }

    pub const fn is_compressed(self) -> bool {
        self.has_flag(Self::COMPRESSED)
    }

    pub const fn has_checksum(self) -> bool {
        self.has_flag(Self::CHECKSUM)
    }
}

impl Default for ParamKind {
    fn default() -> Self {
        ParamKind::new(BaseKind::Mfcc, ParamKind::C0)
    }
}

impl From<u16> for ParamKind {
    fn from(raw: u16) -> Self {
        ParamKind(raw)
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.base() {
            Some(base) => f.write_str(base.name())?,
            None => write!(f, "KIND{}", self.base_code())?,
        }
        for (flag, letter) in Self::QUALIFIERS {
            if self.has_flag(flag) {
                write!(f, "_{letter}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for ParamKind {
    type Err = HtkError;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        let mut parts = upper.split('_');
        let base_name = parts.next().unwrap_or_default();
        let base = BASE_KINDS
            .iter()
            .find(|(_, name)| *name == base_name)
            .map(|&(kind, _)| kind)
            .ok_or_else(|| HtkError::format(format!("unknown parameter kind '{base_name}'")))?;

        let mut flags = 0u16;
        for part in parts {
            let mut chars = part.chars();
            let flag = match (chars.next(), chars.next()) {
                (Some(letter), None) => Self::QUALIFIERS
                    .iter()
                    .find(|(_, q)| *q == letter)
                    .map(|&(flag, _)| flag),
                _ => None,
            }
            .ok_or_else(|| HtkError::format(format!("unknown parameter kind qualifier '_{part}'")))?;
            flags |= flag;
        }
        Ok(ParamKind::new(base, flags))
    }
}

// ── Header ─────────────────────────────────────────────────────────────────

/// Decoded representation of the 12-byte big-endian file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Number of rows; zero while a writer still has the file open.
    pub sample_count: u32,
    /// Sampling period in 100-ns units.
    pub sample_period: u32,
    /// Bytes per stored row.
    pub sample_size: u16,
    pub param_kind: ParamKind,
}

impl FileHeader {
    /// Serialize to exactly `HEADER_SIZE` bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE as usize] {
        let mut buf = [0u8; HEADER_SIZE as usize];
        buf[0..4].copy_from_slice(&self.sample_count.to_be_bytes());
        buf[4..8].copy_from_slice(&self.sample_period.to_be_bytes());
        buf[8..10].copy_from_slice(&self.sample_size.to_be_bytes());
        buf[10..12].copy_from_slice(&self.param_kind.0.to_be_bytes());
        buf
    }

    /// Deserialize from the first `HEADER_SIZE` bytes of `buf`.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE as usize {
            return Err(HtkError::format(format!(
                "header needs {} bytes, got {}",
                HEADER_SIZE,
                buf.len()
            )));
        }
        Ok(Self {
            sample_count: u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
            sample_period: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
            sample_size: u16::from_be_bytes([buf[8], buf[9]]),
            param_kind: ParamKind(u16::from_be_bytes([buf[10], buf[11]])),
        })
    }

    /// Bytes per stored element: 2 for compressed rows, 4 for float rows.
    pub fn element_width(&self) -> usize {
        if self.param_kind.is_compressed() {
            2
        } else {
            4
        }
    }

    /// Number of coefficients per row, derived from `sample_size`.
    pub fn vector_length(&self) -> Result<usize> {
        let width = self.element_width();
        let size = self.sample_size as usize;
        if size == 0 {
            return Err(HtkError::format("sample size is zero"));
        }
        if size % width != 0 {
            return Err(HtkError::format(format!(
                "sample size {} is not a multiple of the {}-byte element width",
                size, width
            )));
        }
        Ok(size / width)
    }

    /// Whether an explicit A/B table follows the header.
    pub fn has_compression_table(&self) -> bool {
        self.param_kind.is_compressed() && self.param_kind.base() != Some(BaseKind::IRefc)
    }
}

// ── Compression table ──────────────────────────────────────────────────────

/// Per-column linear de-quantization: `value = (raw + bias) / scale`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionTable {
    /// A: per-column scale.
    pub scale: Vec<f32>,
    /// B: per-column bias.
    pub bias: Vec<f32>,
}

impl CompressionTable {
    /// The implicit table of IREFC files, which occupies no file bytes.
    pub fn irefc(vector_length: usize) -> Self {
        Self {
            scale: vec![IREFC_SCALE; vector_length],
            bias: vec![0.0; vector_length],
        }
    }

    /// Decode an on-disk table of `2 * vector_length` floats (A then B).
    pub fn from_bytes(buf: &[u8], vector_length: usize, order: ByteOrder) -> Result<Self> {
        if buf.len() != 8 * vector_length {
            return Err(HtkError::format(format!(
                "compression table needs {} bytes, got {}",
                8 * vector_length,
                buf.len()
            )));
        }
        let mut floats = buf
            .chunks_exact(4)
            .map(|c| order.read_f32([c[0], c[1], c[2], c[3]]));
        let scale = floats.by_ref().take(vector_length).collect();
        let bias = floats.collect();
        Ok(Self { scale, bias })
    }

    pub fn dequantize(&self, raw: &[i16]) -> Vec<f32> {
        raw.iter()
            .zip(self.scale.iter().zip(&self.bias))
            .map(|(&r, (&a, &b))| (r as f32 + b) / a)
            .collect()
    }
}

/// Decode whole rows from `bytes`, shared by the single-row and bulk read
/// paths. Trailing bytes that do not form a full row are ignored.
pub(crate) fn decode_rows(
    bytes: &[u8],
    vector_length: usize,
    table: Option<&CompressionTable>,
    order: ByteOrder,
) -> Vec<Vec<f32>> {
    let width = if table.is_some() { 2 } else { 4 };
    bytes
        .chunks_exact(vector_length * width)
        .map(|row| match table {
            Some(table) => {
                let raw: Vec<i16> = row
                    .chunks_exact(2)
                    .map(|c| order.read_u16([c[0], c[1]]) as i16)
                    .collect();
                table.dequantize(&raw)
            }
            None => row
                .chunks_exact(4)
                .map(|c| order.read_f32([c[0], c[1], c[2], c[3]]))
                .collect(),
        })
        .collect()
}
