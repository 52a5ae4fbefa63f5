/// Integration tests: write feature files to disk, reopen them, and check the
/// header and rows that come back.
use std::path::PathBuf;

use htk_core::{
    open, BaseKind, FeatureFile, FileHeader, HtkError, Mode, ParamKind, Reader, Writer,
    WriterOptions,
};
use tempfile::TempDir;

/// Generate `rows` deterministic vectors of length `len` using a simple LCG.
fn pseudo_random_rows(rows: usize, len: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = seed;
    (0..rows)
        .map(|_| {
            (0..len)
                .map(|_| {
                    rng = rng
                        .wrapping_mul(6364136223846793005)
                        .wrapping_add(1442695040888963407);
                    ((rng >> 40) as f32 / (1u64 << 24) as f32) * 40.0 - 20.0
                })
                .collect()
        })
        .collect()
}

// ── helpers ───────────────────────────────────────────────────────────────

fn temp_path(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join(format!("{}.fea", name))
}

// ── tests ──────────────────────────────────────────────────────────────────

/// Three MFCC rows of length five survive a write/read cycle with the
/// expected header fields.
#[test]
fn test_mfcc_scenario() {
    let dir = TempDir::new().unwrap();
    let path = temp_path(&dir, "mfcc");
    let rows = vec![
        vec![1.0f32, 2.0, 3.0, 4.0, 5.0],
        vec![-0.5, 0.25, 1e-3, 7.5, -12.0],
        vec![0.0, 0.0, 0.0, 0.0, 1.0],
    ];

    let options = WriterOptions {
        vector_length: 5,
        sample_period: 100_000,
        param_kind: ParamKind::new(BaseKind::Mfcc, 0),
    };
    let mut w = Writer::create(&path, options).unwrap();
    w.write_all(&rows).unwrap();
    w.close().unwrap();
    drop(w);

    let mut r = Reader::open(&path).unwrap();
    let header = *r.header();
    assert_eq!(header.sample_count, 3);
    assert_eq!(header.sample_size, 20);
    assert_eq!(header.param_kind.0, 6);
    assert_eq!(header.sample_period, 100_000);
    assert_eq!(r.read_all().unwrap(), rows);
}

/// Uncompressed round-trip is bit-exact.
#[test]
fn test_roundtrip_bit_exact() {
    let dir = TempDir::new().unwrap();
    let path = temp_path(&dir, "roundtrip");
    let rows = pseudo_random_rows(200, 39, 0xDEAD_BEEF);

    let mut w = Writer::create(&path, WriterOptions::new(39)).unwrap();
    w.write_all(&rows).unwrap();
    assert_eq!(w.finish().unwrap(), 200);

    let mut r = Reader::open(&path).unwrap();
    assert_eq!(r.vector_length(), 39);
    let back = r.read_all().unwrap();
    assert_eq!(back.len(), rows.len());
    for (a, b) in back.iter().zip(&rows) {
        let a_bits: Vec<u32> = a.iter().map(|v| v.to_bits()).collect();
        let b_bits: Vec<u32> = b.iter().map(|v| v.to_bits()).collect();
        assert_eq!(a_bits, b_bits);
    }
}

/// Seeking to row N and iterating yields rows N.. without reading earlier ones.
#[test]
fn test_seek_then_iterate() {
    let dir = TempDir::new().unwrap();
    let path = temp_path(&dir, "seek");
    let rows = pseudo_random_rows(10, 4, 7);

    let mut w = Writer::create(&path, WriterOptions::new(4)).unwrap();
    w.write_all(&rows).unwrap();
    w.finish().unwrap();

    let mut r = Reader::open(&path).unwrap();
    r.seek(6).unwrap();
    let tail: Vec<Vec<f32>> = r.vectors().collect::<Result<_, _>>().unwrap();
    assert_eq!(tail, rows[6..].to_vec());

    // Restartable: seek back and iterate again.
    r.seek(0).unwrap();
    assert_eq!(r.vectors().count(), 10);
    assert!(r.read_next().unwrap().is_none());
}

/// Dropping a writer without closing still leaves a correct row count.
#[test]
fn test_drop_finalizes_header() {
    let dir = TempDir::new().unwrap();
    let path = temp_path(&dir, "drop");
    {
        let mut w = Writer::create(&path, WriterOptions::new(2)).unwrap();
        w.write_vector(&[1.0, 2.0]).unwrap();
        w.write_vector(&[3.0, 4.0]).unwrap();
        w.write_vector(&[5.0, 6.0]).unwrap();
    }
    let r = Reader::open(&path).unwrap();
    assert_eq!(r.header().sample_count, 3);
}

/// Closing twice rewrites the same header bytes.
#[test]
fn test_close_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = temp_path(&dir, "close_twice");
    let mut w = Writer::create(&path, WriterOptions::new(3)).unwrap();
    w.write_vector(&[1.0, 2.0, 3.0]).unwrap();
    w.close().unwrap();
    let first = std::fs::read(&path).unwrap();
    w.close().unwrap();
    let second = std::fs::read(&path).unwrap();
    assert_eq!(first[..12], second[..12]);
    assert_eq!(first, second);
}

/// A hand-built compressed file decodes to `(raw + B) / A` per column.
#[test]
fn test_compressed_file_dequantization() {
    let dir = TempDir::new().unwrap();
    let path = temp_path(&dir, "compressed");

    let scale = [100.0f32, 50.0, 4.0];
    let bias = [0.0f32, 10.0, -2.0];
    let raw: [[i16; 3]; 2] = [[100, -10, 2], [-250, 40, 10]];

    let header = FileHeader {
        sample_count: 2,
        sample_period: 100_000,
        sample_size: 6,
        param_kind: ParamKind::new(BaseKind::Plp, ParamKind::COMPRESSED | ParamKind::DELTA),
    };
    let mut bytes = header.to_bytes().to_vec();
    for v in scale.iter().chain(&bias) {
        bytes.extend_from_slice(&v.to_be_bytes());
    }
    for row in &raw {
        for r in row {
            bytes.extend_from_slice(&r.to_be_bytes());
        }
    }
    std::fs::write(&path, &bytes).unwrap();

    let mut r = Reader::open(&path).unwrap();
    assert_eq!(r.vector_length(), 3);
    assert_eq!(r.data_offset(), 12 + 24);
    let rows = r.read_all().unwrap();
    assert_eq!(rows, vec![vec![1.0, 0.0, 0.0], vec![-2.5, 1.0, 2.0]]);
}

/// A header claiming zero bytes per row is rejected at open time.
#[test]
fn test_zero_sample_size_rejected() {
    let dir = TempDir::new().unwrap();
    let path = temp_path(&dir, "zero");
    let header = FileHeader {
        sample_count: 1,
        sample_period: 100_000,
        sample_size: 0,
        param_kind: ParamKind(6),
    };
    std::fs::write(&path, header.to_bytes()).unwrap();

    let result = Reader::open(&path);
    assert!(matches!(result, Err(HtkError::Format(_))));
}

/// A missing file surfaces as an I/O error.
#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let result = Reader::open(temp_path(&dir, "absent"));
    assert!(matches!(result, Err(HtkError::Io(_))));
}

/// Mode strings dispatch to the reader or writer.
#[test]
fn test_open_by_mode() {
    let dir = TempDir::new().unwrap();
    let path = temp_path(&dir, "mode");

    let mode: Mode = "wb".parse().unwrap();
    match open(&path, mode, 4).unwrap() {
        FeatureFile::Writer(mut w) => w.write_vector(&[1.0, 2.0, 3.0, 4.0]).unwrap(),
        FeatureFile::Reader(_) => panic!("expected a writer"),
    }

    match open(&path, "r".parse().unwrap(), 99).unwrap() {
        FeatureFile::Reader(mut r) => {
            assert_eq!(r.vector_length(), 4);
            assert_eq!(r.read_all().unwrap(), vec![vec![1.0, 2.0, 3.0, 4.0]]);
        }
        FeatureFile::Writer(_) => panic!("expected a reader"),
    }

    let err = "a+".parse::<Mode>().unwrap_err();
    assert!(matches!(err, HtkError::InvalidMode(_)));
}
