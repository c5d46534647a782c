// src/encode/filter/mod.rs

//! PNG scanline filters over single-channel planes.
//!
//! Every predictor reads its neighbours from the *reconstructed* image: the
//! raw row to the left and the raw row above. Unfiltering therefore needs the
//! previous row as it was rebuilt, never the previous filtered row, and rows
//! must be rebuilt top to bottom. All arithmetic wraps modulo 256.

pub mod heuristic;

pub use heuristic::{filter_plane, unfilter_plane, FilterHeuristic, FilterStrategy, FilteredPlane};

use crate::image::raster::ChannelPlane;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FilterError {
    #[error("Invalid filter type: {0}")]
    InvalidFilter(u8),
    #[error("Row {row} out of range for plane of height {height}")]
    RowOutOfRange { row: usize, height: usize },
    #[error("Row length {actual} does not match width {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("Need {needed} reconstructed bytes above row {row}, have {available}")]
    MissingPriorRow {
        row: usize,
        needed: usize,
        available: usize,
    },
}

/// The five PNG filter types, numbered as in the PNG specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum FilterType {
    #[default]
    None = 0,
    Sub = 1,
    Up = 2,
    Average = 3,
    Paeth = 4,
}

impl FilterType {
    pub const ALL: [FilterType; 5] = [
        FilterType::None,
        FilterType::Sub,
        FilterType::Up,
        FilterType::Average,
        FilterType::Paeth,
    ];

    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for FilterType {
    type Error = FilterError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FilterType::None),
            1 => Ok(FilterType::Sub),
            2 => Ok(FilterType::Up),
            3 => Ok(FilterType::Average),
            4 => Ok(FilterType::Paeth),
            other => Err(FilterError::InvalidFilter(other)),
        }
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterType::None => "None",
            FilterType::Sub => "Sub",
            FilterType::Up => "Up",
            FilterType::Average => "Average",
            FilterType::Paeth => "Paeth",
        };
        f.write_str(name)
    }
}

/// Paeth predictor. Ties prefer `left`, then `up`, then `upper_left`.
#[inline]
pub fn paeth_predictor(left: u8, up: u8, upper_left: u8) -> u8 {
    let p = left as i16 + up as i16 - upper_left as i16;
    let p_left = (p - left as i16).abs();
    let p_up = (p - up as i16).abs();
    let p_upper_left = (p - upper_left as i16).abs();

    if p_left <= p_up && p_left <= p_upper_left {
        left
    } else if p_up <= p_upper_left {
        up
    } else {
        upper_left
    }
}

/// Filters `raw` against the reconstructed row above it (`prev`, all zeros for
/// the first row), writing residuals into `out`.
pub fn filter_into(filter: FilterType, raw: &[u8], prev: &[u8], out: &mut [u8]) {
    debug_assert_eq!(raw.len(), prev.len());
    debug_assert_eq!(raw.len(), out.len());

    for x in 0..raw.len() {
        let left = if x > 0 { raw[x - 1] } else { 0 };
        let up = prev[x];
        let upper_left = if x > 0 { prev[x - 1] } else { 0 };
        out[x] = raw[x].wrapping_sub(predict(filter, left, up, upper_left));
    }
}

/// Inverse of [`filter_into`]. `prev` must be the reconstructed row above.
pub fn unfilter_into(filter: FilterType, filtered: &[u8], prev: &[u8], out: &mut [u8]) {
    debug_assert_eq!(filtered.len(), prev.len());
    debug_assert_eq!(filtered.len(), out.len());

    for x in 0..filtered.len() {
        // `out[x - 1]` is already reconstructed.
        let left = if x > 0 { out[x - 1] } else { 0 };
        let up = prev[x];
        let upper_left = if x > 0 { prev[x - 1] } else { 0 };
        out[x] = filtered[x].wrapping_add(predict(filter, left, up, upper_left));
    }
}

#[inline]
fn predict(filter: FilterType, left: u8, up: u8, upper_left: u8) -> u8 {
    match filter {
        FilterType::None => 0,
        FilterType::Sub => left,
        FilterType::Up => up,
        FilterType::Average => ((left as u16 + up as u16) / 2) as u8,
        FilterType::Paeth => paeth_predictor(left, up, upper_left),
    }
}

/// Filters row `row_index` of `plane` with `filter`.
pub fn filter(plane: &ChannelPlane, row_index: usize, filter: FilterType) -> Result<Vec<u8>, FilterError> {
    let height = plane.height() as usize;
    if row_index >= height {
        return Err(FilterError::RowOutOfRange {
            row: row_index,
            height,
        });
    }
    let width = plane.width() as usize;
    let zero_row = vec![0u8; width];
    let prev = if row_index == 0 {
        &zero_row[..]
    } else {
        plane.row(row_index - 1)
    };
    let mut out = vec![0u8; width];
    filter_into(filter, plane.row(row_index), prev, &mut out);
    Ok(out)
}

/// Rebuilds row `row_index` from its residuals.
///
/// `reconstructed_rows` holds the rows above `row_index`, already rebuilt,
/// row-major with the same width as `filtered_row`. Only the last of them is
/// read.
pub fn unfilter(
    filtered_row: &[u8],
    row_index: usize,
    filter: FilterType,
    reconstructed_rows: &[u8],
) -> Result<Vec<u8>, FilterError> {
    let width = filtered_row.len();
    let zero_row = vec![0u8; width];
    let prev = if row_index == 0 {
        &zero_row[..]
    } else {
        let needed = row_index * width;
        if reconstructed_rows.len() < needed {
            return Err(FilterError::MissingPriorRow {
                row: row_index,
                needed,
                available: reconstructed_rows.len(),
            });
        }
        &reconstructed_rows[needed - width..needed]
    };
    let mut out = vec![0u8; width];
    unfilter_into(filter, filtered_row, prev, &mut out);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane(width: u32, height: u32, data: &[u8]) -> ChannelPlane {
        ChannelPlane::new(width, height, data.to_vec()).unwrap()
    }

    #[test]
    fn test_filter_type_from_u8() {
        for t in FilterType::ALL {
            assert_eq!(FilterType::try_from(t.as_u8()).unwrap(), t);
        }
        assert_eq!(FilterType::try_from(5), Err(FilterError::InvalidFilter(5)));
        assert_eq!(FilterType::try_from(255), Err(FilterError::InvalidFilter(255)));
    }

    #[test]
    fn test_paeth_tie_breaking() {
        // All distances equal: left wins.
        assert_eq!(paeth_predictor(7, 7, 7), 7);
        // p = 0 + 1 - 0 = 1, up is exact.
        assert_eq!(paeth_predictor(0, 1, 0), 1);
        // p = 20: left and up tie at 10, upper-left is farthest; left wins.
        assert_eq!(paeth_predictor(10, 10, 0), 10);
        // p = 5 + 0 - 10 = -5: |p-left|=10, |p-up|=5, |p-ul|=15 -> up.
        assert_eq!(paeth_predictor(5, 0, 10), 0);
        // p = 9 + 2 - 5 = 6: |p-left|=3, |p-up|=4, |p-ul|=1 -> upper-left.
        assert_eq!(paeth_predictor(9, 2, 5), 5);
    }

    #[test]
    fn test_sub_scenario_2x2() {
        let p = plane(2, 2, &[10, 12, 9, 11]);
        assert_eq!(filter(&p, 0, FilterType::Sub).unwrap(), vec![10, 2]);
        assert_eq!(filter(&p, 1, FilterType::Sub).unwrap(), vec![9, 2]);
    }

    #[test]
    fn test_wrapping_residuals() {
        let p = plane(3, 2, &[200, 10, 250, 5, 255, 0]);
        assert_eq!(filter(&p, 0, FilterType::Sub).unwrap(), vec![200, 66, 240]);
        assert_eq!(filter(&p, 1, FilterType::Up).unwrap(), vec![61, 245, 6]);
        // Average with left + up > 255 must not overflow: (5 + 10) / 2 = 7.
        assert_eq!(filter(&p, 1, FilterType::Average).unwrap()[1], 255u8.wrapping_sub(7));
    }

    #[test]
    fn test_average_first_column_uses_half_up() {
        let p = plane(1, 2, &[9, 20]);
        assert_eq!(filter(&p, 1, FilterType::Average).unwrap(), vec![20 - 4]);
    }

    #[test]
    fn test_every_filter_inverts() {
        let data: Vec<u8> = (0..48u32).map(|i| (i * 37 + (i / 6) * 91) as u8).collect();
        let p = plane(6, 8, &data);
        for t in FilterType::ALL {
            let mut rebuilt: Vec<u8> = Vec::new();
            for y in 0..8 {
                let filtered = filter(&p, y, t).unwrap();
                let row = unfilter(&filtered, y, t, &rebuilt).unwrap();
                assert_eq!(row, p.row(y), "filter {} row {}", t, y);
                rebuilt.extend_from_slice(&row);
            }
            assert_eq!(rebuilt, data);
        }
    }

    #[test]
    fn test_unfilter_needs_prior_row() {
        let err = unfilter(&[1, 2], 2, FilterType::Up, &[0, 0]).unwrap_err();
        assert!(matches!(err, FilterError::MissingPriorRow { row: 2, .. }));
    }

    #[test]
    fn test_row_out_of_range() {
        let p = plane(2, 1, &[1, 2]);
        assert!(matches!(
            filter(&p, 1, FilterType::None),
            Err(FilterError::RowOutOfRange { row: 1, height: 1 })
        ));
    }
}
