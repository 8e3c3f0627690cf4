//! Threshold matching

use crate::catalog::ColorRange;

/// First range in declared order containing `value`.
///
/// When nothing matches, including for an empty `ranges` or a `NaN` value,
/// the result is a synthetic range `[value, value]` with no color and no
/// override. Callers tell the two apart by the empty color.
pub fn match_color(ranges: &[ColorRange], value: f64) -> ColorRange {
    ranges
        .iter()
        .find(|range| range.contains(value))
        .cloned()
        .unwrap_or_else(|| ColorRange {
            min: value,
            max: value,
            color: String::new(),
            value_override: String::new(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_range() {
        let colors = vec![
            ColorRange::new(0.0, 10.0, "blue").with_override("low"),
            ColorRange::new(11.0, 20.0, "green").with_override("medium"),
            ColorRange::new(21.0, 30.0, "red").with_override("high"),
        ];

        assert_eq!(
            match_color(&colors, 15.0),
            ColorRange::new(11.0, 20.0, "green").with_override("medium")
        );
    }

    #[test]
    fn test_exact_boundary_first_match_wins() {
        let colors = vec![
            ColorRange::new(0.0, 10.0, "blue"),
            ColorRange::new(10.0, 20.0, "green"),
        ];

        assert_eq!(match_color(&colors, 10.0), ColorRange::new(0.0, 10.0, "blue"));
        assert_eq!(match_color(&colors, 20.0), ColorRange::new(10.0, 20.0, "green"));
    }

    #[test]
    fn test_no_match() {
        let colors = vec![
            ColorRange::new(0.0, 10.0, "blue"),
            ColorRange::new(11.0, 20.0, "green"),
        ];

        assert_eq!(match_color(&colors, 25.0), ColorRange::new(25.0, 25.0, ""));
        assert_eq!(match_color(&colors, -5.0), ColorRange::new(-5.0, -5.0, ""));
        // Gap between ranges
        assert_eq!(match_color(&colors, 10.5), ColorRange::new(10.5, 10.5, ""));
    }

    #[test]
    fn test_empty_colors() {
        assert_eq!(match_color(&[], 10.0), ColorRange::new(10.0, 10.0, ""));
    }

    #[test]
    fn test_nan_never_matches() {
        let colors = vec![ColorRange::new(f64::NEG_INFINITY, f64::INFINITY, "blue")];
        let matched = match_color(&colors, f64::NAN);

        assert!(matched.color.is_empty());
        assert!(matched.min.is_nan());
    }

    #[test]
    fn test_infinite_bounds() {
        let colors = vec![ColorRange::new(100.0, f64::INFINITY, "red")];
        assert_eq!(match_color(&colors, f64::INFINITY).color, "red");
    }
}
