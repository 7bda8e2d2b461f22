//! Tolerance-band comparator
//!
//! Compares an observed farm value with a variety's tolerance band. Inside
//! the band scores 1.0; outside, the score decays linearly to 0 at `margin`
//! beyond the nearest edge.

use serde::Serialize;

use crate::model::ToleranceRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BandFit {
    BelowBand,
    WithinBand,
    AboveBand,
}

impl BandFit {
    pub fn display_text(&self) -> &'static str {
        match self {
            BandFit::BelowBand => "below tolerance",
            BandFit::WithinBand => "within tolerance",
            BandFit::AboveBand => "above tolerance",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BandComparison {
    pub fit: BandFit,
    pub value: f64,
    pub band: ToleranceRange,
    /// Distance from the nearest edge (0 inside)
    pub distance: f64,
    pub margin: f64,
    /// Match score in [0, 1]
    pub score: f64,
}

impl BandComparison {
    pub fn is_within(&self) -> bool {
        self.fit == BandFit::WithinBand
    }

    /// E.g. "soil pH 5.8 (tolerance 6.0-7.5, below tolerance)"
    pub fn format_with_context(&self, label: &str, unit: &str) -> String {
        format!(
            "{} {:.1}{} (tolerance {:.1}-{:.1}{}, {})",
            label,
            self.value,
            unit,
            self.band.min,
            self.band.max,
            unit,
            self.fit.display_text()
        )
    }
}

pub fn compare_to_band(value: f64, band: ToleranceRange, margin: f64) -> BandComparison {
    let (fit, distance) = if value < band.min {
        (BandFit::BelowBand, band.min - value)
    } else if value > band.max {
        (BandFit::AboveBand, value - band.max)
    } else {
        (BandFit::WithinBand, 0.0)
    };

    let score = if distance == 0.0 {
        1.0
    } else if margin > 0.0 {
        (1.0 - distance / margin).clamp(0.0, 1.0)
    } else {
        0.0
    };

    BandComparison {
        fit,
        value,
        band,
        distance,
        margin,
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_inside_band_scores_one() {
        let c = compare_to_band(6.2, ToleranceRange::new(5.5, 6.5), 1.0);
        assert!(c.is_within());
        assert_eq!(c.score, 1.0);
        // Edges are inside
        assert_eq!(compare_to_band(5.5, ToleranceRange::new(5.5, 6.5), 1.0).score, 1.0);
    }

    #[test]
    fn test_linear_decay_outside() {
        let band = ToleranceRange::new(22.0, 32.0);
        let c = compare_to_band(35.0, band, 6.0);
        assert_eq!(c.fit, BandFit::AboveBand);
        assert_relative_eq!(c.score, 0.5, epsilon = 1e-9);
        let c = compare_to_band(19.0, band, 6.0);
        assert_eq!(c.fit, BandFit::BelowBand);
        assert_relative_eq!(c.score, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_clamped_beyond_margin() {
        let c = compare_to_band(10.0, ToleranceRange::new(5.5, 6.5), 1.0);
        assert_eq!(c.score, 0.0);
    }

    #[test]
    fn test_format() {
        let c = compare_to_band(5.8, ToleranceRange::new(6.0, 7.5), 1.0);
        assert_eq!(
            c.format_with_context("soil pH", ""),
            "soil pH 5.8 (tolerance 6.0-7.5, below tolerance)"
        );
    }
}
