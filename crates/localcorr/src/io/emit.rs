//! Result artifact writers.
//!
//! ## Purpose
//!
//! This module writes a [`LocalCorrResult`] to a directory as three parallel
//! artifacts: `x`, `y` and `corr`. All three are produced from the same
//! collected result, so the i-th entry of each belongs to the same pixel.
//!
//! ## Key concepts
//!
//! * **text**: one value per line, NaN as `NaN`.
//! * **json**: a JSON array, NaN as `null`.
//! * **mat**: Level 5 MAT-file with one `n × 1` double column named after the
//!   artifact, little-endian.

use num_traits::Float;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::engine::result::LocalCorrResult;
use crate::primitives::errors::LocalCorrError;

/// Artifact names, in write order.
pub const ARTIFACTS: [&str; 3] = ["x", "y", "corr"];

/// On-disk format of the artifacts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text, one value per line.
    Text,
    /// JSON array.
    Json,
    /// Level 5 MAT-file.
    #[default]
    Mat,
}

impl OutputFormat {
    /// File extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Json => "json",
            Self::Mat => "mat",
        }
    }
}

/// Write the x, y and corr artifacts of `result` under `dir`, creating it if needed.
///
/// Returns the written paths in [`ARTIFACTS`] order.
pub fn emit<T: Float>(
    result: &LocalCorrResult<T>,
    dir: &Path,
    format: OutputFormat,
) -> Result<Vec<PathBuf>, LocalCorrError> {
    fs::create_dir_all(dir).map_err(|e| LocalCorrError::io(dir, e))?;

    let x: Vec<f64> = result.coordinates.iter().map(|c| c.x as f64).collect();
    let y: Vec<f64> = result.coordinates.iter().map(|c| c.y as f64).collect();
    let corr: Vec<f64> = result
        .correlations
        .iter()
        .map(|r| r.to_f64().unwrap_or(f64::NAN))
        .collect();

    let paths = ARTIFACTS
        .iter()
        .zip([&x, &y, &corr])
        .map(|(name, values)| write_column(dir, name, values, format))
        .collect::<Result<Vec<_>, _>>()?;

    info!(
        dir = %dir.display(),
        records = result.len(),
        format = format.extension(),
        "wrote result artifacts"
    );
    Ok(paths)
}

/// Write one named numeric column to `dir/<name>.<ext>`.
pub fn write_column(
    dir: &Path,
    name: &str,
    values: &[f64],
    format: OutputFormat,
) -> Result<PathBuf, LocalCorrError> {
    let path = dir.join(format!("{name}.{}", format.extension()));
    let file = File::create(&path).map_err(|e| LocalCorrError::io(&path, e))?;
    let mut writer = BufWriter::new(file);

    match format {
        OutputFormat::Text => write_text(&mut writer, values),
        OutputFormat::Json => {
            serde_json::to_writer(&mut writer, values)?;
            Ok(())
        }
        OutputFormat::Mat => write_mat(&mut writer, name, values),
    }
    .map_err(|e| LocalCorrError::io(&path, e))?;

    writer.flush().map_err(|e| LocalCorrError::io(&path, e))?;
    Ok(path)
}

fn write_text<W: Write>(writer: &mut W, values: &[f64]) -> io::Result<()> {
    for v in values {
        writeln!(writer, "{v}")?;
    }
    Ok(())
}

// ============================================================================
// Level 5 MAT-file
// ============================================================================

const MI_INT8: u32 = 1;
const MI_INT32: u32 = 5;
const MI_UINT32: u32 = 6;
const MI_DOUBLE: u32 = 9;
const MI_MATRIX: u32 = 14;
const MX_DOUBLE_CLASS: u32 = 6;

fn padded(len: usize) -> usize {
    len.div_ceil(8) * 8
}

fn too_large(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, format!("{what} too large for a MAT-file"))
}

fn write_tag<W: Write>(writer: &mut W, data_type: u32, bytes: u32) -> io::Result<()> {
    writer.write_all(&data_type.to_le_bytes())?;
    writer.write_all(&bytes.to_le_bytes())
}

/// Write `values` as an `n × 1` double matrix called `name`.
fn write_mat<W: Write>(writer: &mut W, name: &str, values: &[f64]) -> io::Result<()> {
    let mut header = format!(
        "MATLAB 5.0 MAT-file, Platform: {}, Created by: localcorr {}",
        std::env::consts::OS,
        env!("CARGO_PKG_VERSION")
    )
    .into_bytes();
    header.resize(116, b' ');
    writer.write_all(&header)?;
    writer.write_all(&[0u8; 8])?;
    writer.write_all(&0x0100u16.to_le_bytes())?;
    writer.write_all(b"IM")?;

    let rows = i32::try_from(values.len()).map_err(|_| too_large("column"))?;
    let name_bytes = name.as_bytes();
    let name_len = u32::try_from(name_bytes.len()).map_err(|_| too_large("name"))?;
    let data_len = u32::try_from(values.len() * 8).map_err(|_| too_large("column"))?;
    let payload = 16 + 16 + 8 + padded(name_bytes.len()) + 8 + values.len() * 8;
    let payload = u32::try_from(payload).map_err(|_| too_large("column"))?;

    write_tag(writer, MI_MATRIX, payload)?;

    write_tag(writer, MI_UINT32, 8)?;
    writer.write_all(&MX_DOUBLE_CLASS.to_le_bytes())?;
    writer.write_all(&0u32.to_le_bytes())?;

    write_tag(writer, MI_INT32, 8)?;
    writer.write_all(&rows.to_le_bytes())?;
    writer.write_all(&1i32.to_le_bytes())?;

    write_tag(writer, MI_INT8, name_len)?;
    writer.write_all(name_bytes)?;
    writer.write_all(&vec![0u8; padded(name_bytes.len()) - name_bytes.len()])?;

    write_tag(writer, MI_DOUBLE, data_len)?;
    for v in values {
        writer.write_all(&v.to_le_bytes())?;
    }
    Ok(())
}
