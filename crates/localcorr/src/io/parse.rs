//! Text record parser.
//!
//! ## Purpose
//!
//! This module turns one line of whitespace-separated numbers into a
//! (coordinate, series) record. The leading tokens hold the key, the rest are
//! samples.
//!
//! ## Key concepts
//!
//! * **xyz keys**: the first three tokens are x, y and z.
//! * **linear keys**: the first token is a 1-based index into a
//!   `max_x × max_y × planes` volume, x varying fastest.
//! * **Preprocessing**: optional per-series transform applied after parsing.
//!
//! ## Invariants
//!
//! * Key tokens must be integral; `3` and `3.0` are both accepted.
//! * A record carries at least one sample.
//! * Blank lines yield no record.

use num_traits::Float;

use crate::primitives::coordinate::Coordinate;
use crate::primitives::errors::LocalCorrError;
use crate::primitives::series::TimeSeries;

/// Offset added to the baseline in [`Preprocess::DeltaF`] to avoid division by zero.
pub const DFF_BASELINE_OFFSET: f64 = 0.1;

/// How the leading key tokens of a line are read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyFormat {
    /// Three tokens: x, y, z.
    #[default]
    Xyz,
    /// One 1-based linear index over a volume with the given x and y extents.
    Linear {
        /// Extent along x.
        max_x: i64,
        /// Extent along y.
        max_y: i64,
    },
}

impl KeyFormat {
    fn key_tokens(&self) -> usize {
        match self {
            Self::Xyz => 3,
            Self::Linear { .. } => 1,
        }
    }
}

/// Per-series transform applied at parse time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Preprocess {
    /// Keep samples as read.
    #[default]
    Raw,
    /// Subtract the series mean.
    SubtractMean,
    /// `(v - mean) / (mean + 0.1)`.
    DeltaF,
}

/// Converts text lines into records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordParser {
    key_format: KeyFormat,
    preprocess: Preprocess,
}

impl RecordParser {
    /// Parser for xyz keys with raw samples.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the key layout.
    pub fn key_format(mut self, key_format: KeyFormat) -> Self {
        self.key_format = key_format;
        self
    }

    /// Set the preprocessing step.
    pub fn preprocess(mut self, preprocess: Preprocess) -> Self {
        self.preprocess = preprocess;
        self
    }

    /// Parse one line. Blank lines give `Ok(None)`.
    pub fn parse_line<T: Float>(
        &self,
        line: &str,
    ) -> Result<Option<(Coordinate, TimeSeries<T>)>, LocalCorrError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            return Ok(None);
        }

        let key_len = self.key_format.key_tokens();
        if tokens.len() <= key_len {
            return Err(LocalCorrError::parse(
                line,
                format!("expected {key_len} key values followed by at least one sample"),
            ));
        }

        let (key_tokens, sample_tokens) = tokens.split_at(key_len);
        let keys = key_tokens
            .iter()
            .map(|t| parse_key(t))
            .collect::<Result<Vec<i64>, String>>()
            .map_err(|reason| LocalCorrError::parse(line, reason))?;

        let coord = match self.key_format {
            KeyFormat::Xyz => Coordinate::new(keys[0], keys[1], keys[2]),
            KeyFormat::Linear { max_x, max_y } => linear_to_coordinate(keys[0], max_x, max_y)
                .map_err(|reason| LocalCorrError::parse(line, reason))?,
        };

        let samples = sample_tokens
            .iter()
            .map(|t| parse_sample(t))
            .collect::<Result<Vec<T>, String>>()
            .map_err(|reason| LocalCorrError::parse(line, reason))?;

        Ok(Some((coord, self.apply_preprocess(TimeSeries::new(samples)))))
    }

    fn apply_preprocess<T: Float>(&self, series: TimeSeries<T>) -> TimeSeries<T> {
        match self.preprocess {
            Preprocess::Raw => series,
            Preprocess::SubtractMean => {
                let mean = series.mean();
                series.map_values(|v| v - mean)
            }
            Preprocess::DeltaF => {
                let mean = series.mean();
                let offset = T::from(DFF_BASELINE_OFFSET).unwrap_or_else(T::zero);
                series.map_values(|v| (v - mean) / (mean + offset))
            }
        }
    }
}

/// Map a 1-based linear index to a coordinate, x fastest.
pub fn linear_to_coordinate(index: i64, max_x: i64, max_y: i64) -> Result<Coordinate, String> {
    if max_x < 1 || max_y < 1 {
        return Err(format!("linear keys need positive extents, got {max_x}x{max_y}"));
    }
    if index < 1 {
        return Err(format!("linear index must be at least 1, got {index}"));
    }
    let k = index - 1;
    Ok(Coordinate::new(
        k % max_x + 1,
        (k / max_x) % max_y + 1,
        k / max_x.saturating_mul(max_y) + 1,
    ))
}

fn parse_key(token: &str) -> Result<i64, String> {
    if let Ok(v) = token.parse::<i64>() {
        return Ok(v);
    }
    match token.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 => Ok(v as i64),
        _ => Err(format!("key '{token}' is not an integer")),
    }
}

fn parse_sample<T: Float>(token: &str) -> Result<T, String> {
    token
        .parse::<f64>()
        .ok()
        .and_then(T::from)
        .ok_or_else(|| format!("sample '{token}' is not a number"))
}
