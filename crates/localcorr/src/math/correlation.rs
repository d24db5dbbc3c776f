//! Pearson correlation coefficient.
//!
//! The coefficient is the off-diagonal entry of the 2×2 correlation matrix of
//! two equal-length series, `cov(a, b) / (std(a) · std(b))`, clipped to
//! `[-1, 1]`. A zero-variance input gives `0 / 0`, which is returned as NaN.

use ndarray::ArrayView1;
use num_traits::Float;

use crate::primitives::errors::LocalCorrError;
use crate::primitives::series::TimeSeries;

/// Pearson correlation of two sample views.
///
/// The computation is symmetric in its arguments down to the bit.
pub fn pearson<T: Float>(a: ArrayView1<'_, T>, b: ArrayView1<'_, T>) -> Result<T, LocalCorrError> {
    if a.len() != b.len() {
        return Err(LocalCorrError::ShapeMismatch {
            expected: a.len(),
            found: b.len(),
        });
    }

    let n = T::from(a.len()).unwrap_or_else(T::nan);
    let mean_a = a.fold(T::zero(), |acc, &v| acc + v) / n;
    let mean_b = b.fold(T::zero(), |acc, &v| acc + v) / n;

    let (sab, saa, sbb) = a.iter().zip(b.iter()).fold(
        (T::zero(), T::zero(), T::zero()),
        |(sab, saa, sbb), (&va, &vb)| {
            let da = va - mean_a;
            let db = vb - mean_b;
            (sab + da * db, saa + da * da, sbb + db * db)
        },
    );

    let r = sab / (saa.sqrt() * sbb.sqrt());
    Ok(clip_unit(r))
}

/// Correlation between two time series.
pub fn correlate_series<T: Float>(
    a: &TimeSeries<T>,
    b: &TimeSeries<T>,
) -> Result<T, LocalCorrError> {
    pearson(a.view(), b.view())
}

// NaN passes through; `Float::max` would swallow it.
fn clip_unit<T: Float>(r: T) -> T {
    if r.is_nan() {
        r
    } else {
        r.max(-T::one()).min(T::one())
    }
}
