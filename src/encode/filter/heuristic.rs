// src/encode/filter/heuristic.rs

//! Whole-plane filtering with fixed or per-row adaptive filter choice.

use super::{filter_into, unfilter_into, FilterError, FilterType};
use crate::image::raster::ChannelPlane;
use log::debug;

/// Scoring rule used to pick a filter per row. Lower scores win; ties go to
/// the lowest filter type number, so the choice is deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterHeuristic {
    /// Sum of residuals read as signed bytes, in absolute value.
    #[default]
    MinimumSumAbsolute,
    /// Order-0 Shannon estimate of the residual row, in 1/256 bit units.
    EntropyEstimate,
}

impl FilterHeuristic {
    pub fn score(self, residuals: &[u8]) -> u64 {
        match self {
            FilterHeuristic::MinimumSumAbsolute => residuals
                .iter()
                .map(|&r| (r as i8).unsigned_abs() as u64)
                .sum(),
            FilterHeuristic::EntropyEstimate => entropy_score(residuals),
        }
    }
}

fn entropy_score(residuals: &[u8]) -> u64 {
    let mut counts = [0u32; 256];
    for &r in residuals {
        counts[r as usize] += 1;
    }
    let n = residuals.len() as f64;
    let bits: f64 = counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let c = c as f64;
            c * (n / c).log2()
        })
        .sum();
    (bits * 256.0).round() as u64
}

/// How filter types are assigned to rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStrategy {
    /// Every row uses the same type; no per-row tag is recorded.
    Fixed(FilterType),
    /// Each row takes the best-scoring type and records it.
    Adaptive(FilterHeuristic),
}

/// Residuals of a whole plane plus the filter type used on each row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredPlane {
    pub width: usize,
    pub height: usize,
    /// One entry per row.
    pub filter_types: Vec<FilterType>,
    /// Row-major residuals, `width * height` bytes.
    pub residuals: Vec<u8>,
    /// Whether the row tags must travel with the data.
    pub tagged: bool,
}

impl FilteredPlane {
    /// Row tags as raw bytes.
    pub fn tag_bytes(&self) -> Vec<u8> {
        self.filter_types.iter().map(|t| t.as_u8()).collect()
    }

    /// PNG-style layout: each row prefixed with its tag when tagged, the bare
    /// residuals otherwise.
    pub fn to_interleaved(&self) -> Vec<u8> {
        if !self.tagged {
            return self.residuals.clone();
        }
        let mut out = Vec::with_capacity(self.residuals.len() + self.height);
        for (y, t) in self.filter_types.iter().enumerate() {
            out.push(t.as_u8());
            out.extend_from_slice(&self.residuals[y * self.width..(y + 1) * self.width]);
        }
        out
    }

    /// Splits a tagged, interleaved stream back into tags and residuals.
    pub fn from_interleaved(width: usize, height: usize, stream: &[u8]) -> Result<Self, FilterError> {
        let expected = (width + 1) * height;
        if stream.len() != expected {
            return Err(FilterError::LengthMismatch {
                expected,
                actual: stream.len(),
            });
        }
        let mut filter_types = Vec::with_capacity(height);
        let mut residuals = Vec::with_capacity(width * height);
        for line in stream.chunks_exact(width + 1) {
            filter_types.push(FilterType::try_from(line[0])?);
            residuals.extend_from_slice(&line[1..]);
        }
        Ok(Self {
            width,
            height,
            filter_types,
            residuals,
            tagged: true,
        })
    }

    /// Number of rows using each filter type, indexed by type number.
    pub fn histogram(&self) -> [usize; 5] {
        let mut counts = [0usize; 5];
        for t in &self.filter_types {
            counts[t.as_u8() as usize] += 1;
        }
        counts
    }
}

/// Filters every row of `plane`, top to bottom.
pub fn filter_plane(plane: &ChannelPlane, strategy: FilterStrategy) -> FilteredPlane {
    let width = plane.width() as usize;
    let height = plane.height() as usize;
    let zero_row = vec![0u8; width];
    let mut residuals = vec![0u8; width * height];
    let mut filter_types = Vec::with_capacity(height);
    let mut candidate = vec![0u8; width];

    for y in 0..height {
        let raw = plane.row(y);
        let prev = if y == 0 { &zero_row[..] } else { plane.row(y - 1) };
        let out = &mut residuals[y * width..(y + 1) * width];

        let chosen = match strategy {
            FilterStrategy::Fixed(t) => {
                filter_into(t, raw, prev, out);
                t
            }
            FilterStrategy::Adaptive(heuristic) => {
                let mut best: Option<(u64, FilterType)> = None;
                for t in FilterType::ALL {
                    filter_into(t, raw, prev, &mut candidate);
                    let score = heuristic.score(&candidate);
                    // Strict comparison keeps the lowest type number on ties.
                    if best.is_none_or(|(s, _)| score < s) {
                        best = Some((score, t));
                        out.copy_from_slice(&candidate);
                    }
                }
                let t = best.map_or(FilterType::None, |(_, t)| t);
                #[cfg(feature = "debug-logging")]
                log::trace!("row {}: {} (score {:?})", y, t, best.map(|(s, _)| s));
                t
            }
        };
        filter_types.push(chosen);
    }

    let filtered = FilteredPlane {
        width,
        height,
        filter_types,
        residuals,
        tagged: matches!(strategy, FilterStrategy::Adaptive(_)),
    };
    if filtered.tagged {
        let h = filtered.histogram();
        debug!(
            "filter counts: None={} Sub={} Up={} Average={} Paeth={}",
            h[0], h[1], h[2], h[3], h[4]
        );
    }
    filtered
}

/// Rebuilds a plane from residuals and one filter type per row.
pub fn unfilter_plane(
    width: usize,
    height: usize,
    residuals: &[u8],
    filter_types: &[FilterType],
) -> Result<Vec<u8>, FilterError> {
    if residuals.len() != width * height {
        return Err(FilterError::LengthMismatch {
            expected: width * height,
            actual: residuals.len(),
        });
    }
    if filter_types.len() != height {
        return Err(FilterError::LengthMismatch {
            expected: height,
            actual: filter_types.len(),
        });
    }

    let mut out = vec![0u8; width * height];
    let zero_row = vec![0u8; width];
    for y in 0..height {
        let (done, rest) = out.split_at_mut(y * width);
        let prev = if y == 0 {
            &zero_row[..]
        } else {
            &done[(y - 1) * width..]
        };
        unfilter_into(
            filter_types[y],
            &residuals[y * width..(y + 1) * width],
            prev,
            &mut rest[..width],
        );
    }
    Ok(out)
}
