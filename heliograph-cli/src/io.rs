//! On-disk formats for payloads, slot matrices, and event streams.
//!
//! These layouts exist for test and replay workflows only; none of them is
//! an interoperability contract.

use std::path::Path;

use color_eyre::eyre::{eyre, Context, Result};
use heliograph_core::ndarray::Array2;

/// Read a payload file as a bit stream (bytes expanded MSB first).
pub fn read_payload_bits(path: &Path) -> Result<Vec<u8>> {
    let bytes =
        std::fs::read(path).wrap_err_with(|| format!("reading payload {}", path.display()))?;
    Ok(heliograph_core::utils::bytes_to_bitstream(&bytes))
}

/// Pack decoded bits back into bytes and write them out.
pub fn write_payload_bits(path: &Path, bits: &[u8]) -> Result<()> {
    let bytes = heliograph_core::utils::pack_bits(bits);
    std::fs::write(path, bytes).wrap_err_with(|| format!("writing payload {}", path.display()))
}

/// Slot matrix dump: `rows: u32 | cols: u32 | row-major u8 cells`.
pub fn write_slot_matrix(path: &Path, matrix: &Array2<u8>) -> Result<()> {
    let mut bytes = Vec::with_capacity(8 + matrix.len());
    bytes.extend((matrix.nrows() as u32).to_le_bytes());
    bytes.extend((matrix.ncols() as u32).to_le_bytes());
    for row in matrix.rows() {
        bytes.extend(row.iter());
    }
    std::fs::write(path, bytes).wrap_err_with(|| format!("writing slots {}", path.display()))
}

pub fn read_slot_matrix(path: &Path) -> Result<Array2<u8>> {
    let bytes =
        std::fs::read(path).wrap_err_with(|| format!("reading slots {}", path.display()))?;
    if bytes.len() < 8 {
        return Err(eyre!("slot matrix file {} has no header", path.display()));
    }
    let rows = u32::from_le_bytes(bytes[0..4].try_into().expect("length checked")) as usize;
    let cols = u32::from_le_bytes(bytes[4..8].try_into().expect("length checked")) as usize;
    let cells = &bytes[8..];
    if cells.len() != rows * cols {
        return Err(eyre!(
            "slot matrix file {} holds {} cells, header says {}x{}",
            path.display(),
            cells.len(),
            rows,
            cols
        ));
    }
    Array2::from_shape_vec((rows, cols), cells.to_vec())
        .wrap_err("assembling slot matrix")
}

/// Event stream: little-endian f64 seconds, ascending.
pub fn read_timestamps(path: &Path) -> Result<Vec<f64>> {
    let bytes =
        std::fs::read(path).wrap_err_with(|| format!("reading events {}", path.display()))?;
    if bytes.len() % 8 != 0 {
        return Err(eyre!(
            "event file {} length {} is not a multiple of 8",
            path.display(),
            bytes.len()
        ));
    }
    Ok(bytes
        .chunks_exact(8)
        .map(|c| f64::from_le_bytes(c.try_into().expect("chunks are 8 bytes")))
        .collect())
}

pub fn write_timestamps(path: &Path, times: &[f64]) -> Result<()> {
    let mut bytes = Vec::with_capacity(times.len() * 8);
    for t in times {
        bytes.extend(t.to_le_bytes());
    }
    std::fs::write(path, bytes).wrap_err_with(|| format!("writing events {}", path.display()))
}
