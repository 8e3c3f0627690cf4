//! Symbolic color names to badge hex colors.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Used for empty, unknown or malformed colors.
pub const DEFAULT_COLOR: &str = "#9f9f9f";

/// shields.io named colors and their aliases.
static NAMED_COLORS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("brightgreen", "#4c1"),
        ("green", "#97ca00"),
        ("yellowgreen", "#a4a61d"),
        ("yellow", "#dfb317"),
        ("orange", "#fe7d37"),
        ("red", "#e05d44"),
        ("blue", "#007ec6"),
        ("grey", "#555"),
        ("gray", "#555"),
        ("lightgrey", "#9f9f9f"),
        ("lightgray", "#9f9f9f"),
        ("success", "#4c1"),
        ("important", "#fe7d37"),
        ("critical", "#e05d44"),
        ("informational", "#007ec6"),
        ("inactive", "#9f9f9f"),
    ])
});

/// Resolve a configured color to a hex literal for SVG output.
///
/// Named colors go through the table, `#RGB` / `#RRGGBB` literals pass
/// through unchanged and everything else maps to [`DEFAULT_COLOR`].
pub fn resolve_hex(color: &str) -> &str {
    if is_hex_literal(color) {
        return color;
    }
    NAMED_COLORS
        .get(color.to_ascii_lowercase().as_str())
        .copied()
        .unwrap_or(DEFAULT_COLOR)
}

fn is_hex_literal(color: &str) -> bool {
    match color.strip_prefix('#') {
        Some(digits) => {
            matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_colors() {
        assert_eq!(resolve_hex("green"), "#97ca00");
        assert_eq!(resolve_hex("red"), "#e05d44");
        assert_eq!(resolve_hex("brightgreen"), "#4c1");
        assert_eq!(resolve_hex("Green"), "#97ca00");
    }

    #[test]
    fn test_aliases_share_values() {
        assert_eq!(resolve_hex("grey"), resolve_hex("gray"));
        assert_eq!(resolve_hex("critical"), resolve_hex("red"));
        assert_eq!(resolve_hex("success"), resolve_hex("brightgreen"));
    }

    #[test]
    fn test_hex_literals_pass_through() {
        assert_eq!(resolve_hex("#ff00aa"), "#ff00aa");
        assert_eq!(resolve_hex("#ABC"), "#ABC");
    }

    #[test]
    fn test_unknown_and_empty_default() {
        assert_eq!(resolve_hex(""), DEFAULT_COLOR);
        assert_eq!(resolve_hex("chartreuse"), DEFAULT_COLOR);
        assert_eq!(resolve_hex("#12345"), DEFAULT_COLOR);
        assert_eq!(resolve_hex("#gggggg"), DEFAULT_COLOR);
    }
}
