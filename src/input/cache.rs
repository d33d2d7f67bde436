//! Shared binary count cache (`*kira-organelle.bin`, KORG v1).
//!
//! Layout: a 256-byte little-endian header guarded by CRC64, two string
//! tables (features, barcodes) and the CSC arrays `col_ptr: u64`,
//! `row_idx: u32`, `values: u32`. Sections start on 64-byte boundaries.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crc::{CRC_64_ECMA_182, Crc};
use memmap2::Mmap;
use thiserror::Error;

use crate::expr::csc::CscMatrix;
use crate::input::InputError;

const MAGIC: &[u8; 4] = b"KORG";
const ENDIAN_TAG: u32 = 0x1234_5678;
const HEADER_SIZE: usize = 256;
const CRC_FIELD: std::ops::Range<usize> = 120..128;
const SECTION_ALIGN: usize = 64;
const CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_ECMA_182);

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid cache magic")]
    InvalidMagic,
    #[error("unsupported cache version: {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },
    #[error("invalid cache format: {0}")]
    InvalidFormat(String),
    #[error("invalid cache matrix: {0}")]
    Matrix(#[from] InputError),
}

fn invalid(msg: impl Into<String>) -> CacheError {
    CacheError::InvalidFormat(msg.into())
}

/// Byte range of one section inside the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Section {
    offset: usize,
    len: usize,
}

impl Section {
    fn slice<'a>(&self, bytes: &'a [u8], label: &str) -> Result<&'a [u8], CacheError> {
        if self.offset < HEADER_SIZE {
            return Err(invalid(format!("{label} overlaps header")));
        }
        let end = self
            .offset
            .checked_add(self.len)
            .ok_or_else(|| invalid(format!("{label} bounds overflow")))?;
        bytes
            .get(self.offset..end)
            .ok_or_else(|| invalid(format!("{label} out of file bounds")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHeader {
    pub n_features: usize,
    pub n_cells: usize,
    pub nnz: usize,
    features: Section,
    barcodes: Section,
    col_ptr_offset: usize,
    row_idx_offset: usize,
    values_offset: usize,
    file_bytes: usize,
}

/// Sequential little-endian field reader over the header bytes.
struct Fields<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Fields<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut buf = [0u8; N];
        buf.copy_from_slice(&self.bytes[self.pos..self.pos + N]);
        self.pos += N;
        buf
    }

    fn u16(&mut self) -> u16 {
        u16::from_le_bytes(self.take())
    }

    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take())
    }

    fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.take())
    }

    fn usize(&mut self) -> usize {
        self.u64() as usize
    }
}

impl CacheHeader {
    fn parse(bytes: &[u8]) -> Result<Self, CacheError> {
        if bytes.len() < HEADER_SIZE {
            return Err(invalid("file smaller than header"));
        }
        let raw = &bytes[..HEADER_SIZE];
        let mut f = Fields::new(raw);
        if &f.take::<4>() != MAGIC {
            return Err(CacheError::InvalidMagic);
        }
        let (major, minor) = (f.u16(), f.u16());
        if (major, minor) != (1, 0) {
            return Err(CacheError::UnsupportedVersion { major, minor });
        }
        if f.u32() != ENDIAN_TAG {
            return Err(invalid("invalid endian tag"));
        }
        if f.u32() as usize != HEADER_SIZE {
            return Err(invalid("invalid header size"));
        }

        let n_features = f.usize();
        let n_cells = f.usize();
        let nnz = f.usize();
        let features = Section {
            offset: f.usize(),
            len: f.usize(),
        };
        let barcodes = Section {
            offset: f.usize(),
            len: f.usize(),
        };
        let col_ptr_offset = f.usize();
        let row_idx_offset = f.usize();
        let values_offset = f.usize();
        let n_blocks = f.u64();
        let blocks_offset = f.u64();
        let file_bytes = f.usize();
        let stored_crc = f.u64();

        if n_blocks != 0 || blocks_offset != 0 {
            return Err(invalid("optional blocks are not supported in v1"));
        }
        if file_bytes != bytes.len() {
            return Err(invalid("file_bytes does not match file length"));
        }
        if header_crc(raw) != stored_crc {
            return Err(invalid("header CRC64 mismatch"));
        }

        Ok(Self {
            n_features,
            n_cells,
            nnz,
            features,
            barcodes,
            col_ptr_offset,
            row_idx_offset,
            values_offset,
            file_bytes,
        })
    }

    fn col_ptr(&self) -> Result<Section, CacheError> {
        array_section(self.col_ptr_offset, self.n_cells.saturating_add(1), 8, "col_ptr")
    }

    fn row_idx(&self) -> Result<Section, CacheError> {
        array_section(self.row_idx_offset, self.nnz, 4, "row_idx")
    }

    fn values(&self) -> Result<Section, CacheError> {
        array_section(self.values_offset, self.nnz, 4, "values")
    }
}

fn array_section(
    offset: usize,
    count: usize,
    width: usize,
    label: &str,
) -> Result<Section, CacheError> {
    let len = count
        .checked_mul(width)
        .ok_or_else(|| invalid(format!("{label} size overflow")))?;
    Ok(Section { offset, len })
}

fn header_crc(header: &[u8]) -> u64 {
    let mut copy = header[..HEADER_SIZE].to_vec();
    copy[CRC_FIELD].fill(0);
    CRC64.checksum(&copy)
}

/// Read-only view of a mapped cache file.
pub struct SharedCache {
    mmap: Mmap,
    pub header: CacheHeader,
    pub features: Vec<String>,
    pub barcodes: Vec<String>,
}

impl SharedCache {
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        let file = File::open(path)?;
        // SAFETY: the mapping is read-only and owned by the returned value.
        let mmap = unsafe { Mmap::map(&file)? };
        let header = CacheHeader::parse(&mmap)?;
        let features = read_string_table(
            header.features.slice(&mmap, "features table")?,
            header.n_features,
            "features",
        )?;
        let barcodes = read_string_table(
            header.barcodes.slice(&mmap, "barcodes table")?,
            header.n_cells,
            "barcodes",
        )?;
        Ok(Self {
            mmap,
            header,
            features,
            barcodes,
        })
    }

    /// Copies the CSC arrays out of the mapping into an owned count matrix.
    pub fn counts(&self) -> Result<CscMatrix<u32>, CacheError> {
        let h = &self.header;
        let col_ptr = h
            .col_ptr()?
            .slice(&self.mmap, "col_ptr")?
            .chunks_exact(8)
            .map(|c| u64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect();
        let row_idx = read_u32_array(h.row_idx()?.slice(&self.mmap, "row_idx")?);
        let values = read_u32_array(h.values()?.slice(&self.mmap, "values")?);
        Ok(CscMatrix::from_parts(
            h.n_features,
            h.n_cells,
            col_ptr,
            row_idx,
            values,
        )?)
    }

    pub fn file_bytes(&self) -> usize {
        self.header.file_bytes
    }
}

fn read_u32_array(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// `count: u32`, `count + 1` u32 offsets, then the UTF-8 blob.
fn read_string_table(table: &[u8], expected: usize, label: &str) -> Result<Vec<String>, CacheError> {
    if table.len() < 4 {
        return Err(invalid(format!("{label} table too small")));
    }
    let count = u32::from_le_bytes([table[0], table[1], table[2], table[3]]) as usize;
    if count != expected {
        return Err(invalid(format!(
            "{label} table has {count} entries, expected {expected}"
        )));
    }
    let offsets_end = (count + 1)
        .checked_mul(4)
        .and_then(|n| n.checked_add(4))
        .ok_or_else(|| invalid(format!("{label} offsets overflow")))?;
    if table.len() < offsets_end {
        return Err(invalid(format!("{label} table missing offsets")));
    }
    let offsets: Vec<usize> = read_u32_array(&table[4..offsets_end])
        .into_iter()
        .map(|v| v as usize)
        .collect();
    let blob = &table[offsets_end..];
    if offsets.windows(2).any(|w| w[1] < w[0]) {
        return Err(invalid(format!("{label} offsets not monotonic")));
    }
    if offsets.last().copied() != Some(blob.len()) {
        return Err(invalid(format!("{label} terminal offset mismatch")));
    }

    offsets
        .windows(2)
        .map(|w| {
            std::str::from_utf8(&blob[w[0]..w[1]])
                .map(str::to_string)
                .map_err(|_| invalid(format!("{label} contains invalid UTF-8")))
        })
        .collect()
}

fn encode_string_table(values: &[String]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(values.len() as u32).to_le_bytes());
    let mut offset = 0u32;
    out.extend_from_slice(&offset.to_le_bytes());
    for v in values {
        offset += v.len() as u32;
        out.extend_from_slice(&offset.to_le_bytes());
    }
    for v in values {
        out.extend_from_slice(v.as_bytes());
    }
    out
}

fn align(x: usize) -> usize {
    x.div_ceil(SECTION_ALIGN) * SECTION_ALIGN
}

/// Writes `counts` with feature and barcode names as a KORG v1 cache.
pub fn write_shared_cache(
    path: &Path,
    counts: &CscMatrix<u32>,
    features: &[String],
    barcodes: &[String],
) -> Result<(), CacheError> {
    if features.len() != counts.n_rows || barcodes.len() != counts.n_cols {
        return Err(invalid("names do not match matrix dimensions"));
    }
    let features_table = encode_string_table(features);
    let barcodes_table = encode_string_table(barcodes);

    let features_off = align(HEADER_SIZE);
    let barcodes_off = align(features_off + features_table.len());
    let col_ptr_off = align(barcodes_off + barcodes_table.len());
    let row_idx_off = align(col_ptr_off + counts.col_ptr.len() * 8);
    let values_off = align(row_idx_off + counts.row_idx.len() * 4);
    let file_bytes = values_off + counts.values.len() * 4;

    let mut header = Vec::with_capacity(HEADER_SIZE);
    header.extend_from_slice(MAGIC);
    header.extend_from_slice(&1u16.to_le_bytes());
    header.extend_from_slice(&0u16.to_le_bytes());
    header.extend_from_slice(&ENDIAN_TAG.to_le_bytes());
    header.extend_from_slice(&(HEADER_SIZE as u32).to_le_bytes());
    for v in [
        counts.n_rows,
        counts.n_cols,
        counts.nnz(),
        features_off,
        features_table.len(),
        barcodes_off,
        barcodes_table.len(),
        col_ptr_off,
        row_idx_off,
        values_off,
        0,
        0,
        file_bytes,
        0,
    ] {
        header.extend_from_slice(&(v as u64).to_le_bytes());
    }
    header.resize(HEADER_SIZE, 0);
    let crc = header_crc(&header);
    header[CRC_FIELD].copy_from_slice(&crc.to_le_bytes());

    let mut out = Vec::with_capacity(file_bytes);
    out.extend_from_slice(&header);
    let place = |out: &mut Vec<u8>, offset: usize, bytes: &[u8]| {
        out.resize(offset, 0);
        out.extend_from_slice(bytes);
    };
    place(&mut out, features_off, &features_table);
    place(&mut out, barcodes_off, &barcodes_table);
    let col_ptr: Vec<u8> = counts.col_ptr.iter().flat_map(|v| v.to_le_bytes()).collect();
    place(&mut out, col_ptr_off, &col_ptr);
    let row_idx: Vec<u8> = counts.row_idx.iter().flat_map(|v| v.to_le_bytes()).collect();
    place(&mut out, row_idx_off, &row_idx);
    let values: Vec<u8> = counts.values.iter().flat_map(|v| v.to_le_bytes()).collect();
    place(&mut out, values_off, &values);

    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&out)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/cache.rs"]
mod tests;
