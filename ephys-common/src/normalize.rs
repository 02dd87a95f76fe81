//! Min/max normalization of numeric arrays
//!
//! Constant arrays are treated as spanning `[max - 1, max]` so the division
//! is always well defined.

/// Normalization output range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeTarget {
    /// Map to [-1, +1]
    Float,
    /// Map to [0, 255], rounded
    Uint8,
}

/// Normalized values, typed by target
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Float(Vec<f64>),
    Uint8(Vec<u8>),
}

/// Normalize `values` into the requested target range
pub fn normalize(values: &[f64], target: NormalizeTarget) -> Normalized {
    match target {
        NormalizeTarget::Float => Normalized::Float(normalize_float(values)),
        NormalizeTarget::Uint8 => Normalized::Uint8(normalize_u8(values)),
    }
}

/// Normalize into [-1, +1]
pub fn normalize_float(values: &[f64]) -> Vec<f64> {
    let Some((m, big_m)) = range(values) else {
        return Vec::new();
    };
    values
        .iter()
        .map(|v| -1.0 + 2.0 * (v - m) / (big_m - m))
        .collect()
}

/// Normalize into [0, 255]
pub fn normalize_u8(values: &[f64]) -> Vec<u8> {
    let Some((m, big_m)) = range(values) else {
        return Vec::new();
    };
    values
        .iter()
        .map(|v| (255.0 * (v - m) / (big_m - m)).round().clamp(0.0, 255.0) as u8)
        .collect()
}

/// Finite min/max of `values`, widened to unit width when degenerate
fn range(values: &[f64]) -> Option<(f64, f64)> {
    let mut finite = values.iter().copied().filter(|v| v.is_finite());
    let first = finite.next()?;
    let (mut m, big_m) = finite.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if m == big_m {
        m = big_m - 1.0;
    }
    Some((m, big_m))
}
