//! SVG Badge Adapter
//!
//! Implements the `BadgeRenderer` port with shields-style two-segment SVG
//! badges. Text width is estimated from a per-glyph advance table measured
//! for Verdana at 11px and scaled to the configured font size, so output is
//! deterministic and needs no font files at runtime.

use std::fmt::Write as _;

use crate::config::BadgeConfig;
use crate::domain::ports::{BadgeRenderer, BadgeSpec, BadgeStyle};
use crate::error::{Error, Result};

/// Font size the advance table was measured at.
const REFERENCE_FONT_SIZE: f32 = 11.0;

/// Horizontal padding on each side of a text segment.
const HORIZONTAL_PADDING: f32 = 5.0;

/// Left-hand segment background.
const TITLE_BACKGROUND: &str = "#555";

/// Renders badges as SVG documents
#[derive(Debug, Clone)]
pub struct SvgBadgeRenderer {
    font_family: String,
    font_size: u32,
}

impl SvgBadgeRenderer {
    pub fn new(font_family: impl Into<String>, font_size: u32) -> Self {
        Self {
            font_family: font_family.into(),
            font_size,
        }
    }

    pub fn from_config(config: &BadgeConfig) -> Self {
        Self::new(config.font.clone(), config.size)
    }

    /// Estimated rendered width of `text` in pixels.
    pub fn text_width(&self, text: &str) -> f32 {
        let scale = self.font_size as f32 / REFERENCE_FONT_SIZE;
        text.chars().map(glyph_advance).sum::<f32>() * scale
    }

    fn segment_width(&self, text: &str) -> f32 {
        (self.text_width(text) + 2.0 * HORIZONTAL_PADDING).round()
    }

    fn write_svg(&self, badge: &BadgeSpec<'_>, out: &mut String) -> std::fmt::Result {
        let geometry = StyleGeometry::for_style(badge.style);
        let title_width = self.segment_width(badge.title);
        let message_width = self.segment_width(badge.message);
        let total_width = title_width + message_width;
        let height = geometry.height;

        let title = xml_escape(badge.title);
        let message = xml_escape(badge.message);
        let font = xml_escape(&self.font_family);
        let message_text_color = text_color_for(badge.color);

        write!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" role="img" aria-label="{t}: {m}">"#,
            w = total_width,
            h = height,
            t = title,
            m = message
        )?;
        write!(out, "<title>{}: {}</title>", title, message)?;

        if !geometry.gradient.is_empty() {
            out.push_str(r#"<linearGradient id="s" x2="0" y2="100%">"#);
            for stop in geometry.gradient {
                out.push_str(stop);
            }
            out.push_str("</linearGradient>");
        }

        write!(
            out,
            r##"<clipPath id="r"><rect width="{w}" height="{h}" rx="{rx}" fill="#fff"/></clipPath>"##,
            w = total_width,
            h = height,
            rx = geometry.radius
        )?;

        write!(
            out,
            r#"<g clip-path="url(#r)"{crisp}><rect width="{tw}" height="{h}" fill="{tb}"/><rect x="{tw}" width="{mw}" height="{h}" fill="{c}"/>"#,
            crisp = if geometry.crisp { r#" shape-rendering="crispEdges""# } else { "" },
            tw = title_width,
            mw = message_width,
            h = height,
            tb = TITLE_BACKGROUND,
            c = badge.color
        )?;
        if !geometry.gradient.is_empty() {
            write!(
                out,
                r#"<rect width="{w}" height="{h}" fill="url(#s)"/>"#,
                w = total_width,
                h = height
            )?;
        }
        out.push_str("</g>");

        write!(
            out,
            r#"<g text-anchor="middle" font-family="{f}" font-size="{s}">"#,
            f = font,
            s = self.font_size
        )?;
        let title_x = title_width / 2.0;
        let message_x = title_width + message_width / 2.0;
        write_text(out, &geometry, title_x, &title, "#fff")?;
        write_text(out, &geometry, message_x, &message, message_text_color)?;
        out.push_str("</g></svg>");

        Ok(())
    }
}

impl Default for SvgBadgeRenderer {
    fn default() -> Self {
        Self::from_config(&BadgeConfig::default())
    }
}

impl BadgeRenderer for SvgBadgeRenderer {
    fn render(&self, badge: &BadgeSpec<'_>) -> Result<Vec<u8>> {
        let mut out = String::with_capacity(1024);
        self.write_svg(badge, &mut out)
            .map_err(|e| Error::BadgeRender(e.to_string()))?;
        Ok(out.into_bytes())
    }
}

// =============================================================================
// Style Geometry
// =============================================================================

struct StyleGeometry {
    height: u32,
    radius: u32,
    text_y: f32,
    shadow: bool,
    crisp: bool,
    gradient: &'static [&'static str],
}

const FLAT_GRADIENT: &[&str] = &[
    r##"<stop offset="0" stop-color="#bbb" stop-opacity=".1"/>"##,
    r#"<stop offset="1" stop-opacity=".1"/>"#,
];

const PLASTIC_GRADIENT: &[&str] = &[
    r##"<stop offset="0" stop-color="#fff" stop-opacity=".7"/>"##,
    r##"<stop offset=".1" stop-color="#aaa" stop-opacity=".1"/>"##,
    r#"<stop offset=".9" stop-opacity=".3"/>"#,
    r#"<stop offset="1" stop-opacity=".5"/>"#,
];

impl StyleGeometry {
    fn for_style(style: BadgeStyle) -> Self {
        match style {
            BadgeStyle::Flat => Self {
                height: 20,
                radius: 3,
                text_y: 14.0,
                shadow: true,
                crisp: false,
                gradient: FLAT_GRADIENT,
            },
            BadgeStyle::FlatSquare => Self {
                height: 20,
                radius: 0,
                text_y: 14.0,
                shadow: false,
                crisp: true,
                gradient: &[],
            },
            BadgeStyle::Plastic => Self {
                height: 18,
                radius: 4,
                text_y: 13.0,
                shadow: true,
                crisp: false,
                gradient: PLASTIC_GRADIENT,
            },
        }
    }
}

fn write_text(
    out: &mut String,
    geometry: &StyleGeometry,
    x: f32,
    text: &str,
    fill: &str,
) -> std::fmt::Result {
    if geometry.shadow {
        write!(
            out,
            r##"<text x="{x:.1}" y="{y:.1}" fill="#010101" fill-opacity=".3">{t}</text>"##,
            x = x,
            y = geometry.text_y + 1.0,
            t = text
        )?;
    }
    write!(
        out,
        r#"<text x="{x:.1}" y="{y:.1}" fill="{fill}">{t}</text>"#,
        x = x,
        y = geometry.text_y,
        fill = fill,
        t = text
    )
}

// =============================================================================
// Text Helpers
// =============================================================================

/// Approximate Verdana 11px advance width of a glyph.
fn glyph_advance(c: char) -> f32 {
    match c {
        'i' | 'l' | 'j' | 'I' | '.' | ',' | ':' | ';' | '\'' | '|' | '!' => 3.5,
        ' ' | 'f' | 't' | 'r' | '(' | ')' | '[' | ']' | '-' | '/' => 4.3,
        'm' | 'w' | 'M' | 'W' | '%' | '@' => 10.5,
        '0'..='9' | '+' | '=' | '<' | '>' | '#' | '$' => 7.0,
        'A'..='Z' => 7.5,
        'a'..='z' => 6.8,
        _ => 7.5,
    }
}

fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Dark text on light backgrounds, white otherwise.
fn text_color_for(hex: &str) -> &'static str {
    match hex_brightness(hex) {
        Some(brightness) if brightness > 0.65 => "#333",
        _ => "#fff",
    }
}

/// Perceived brightness in `0.0..=1.0` of a `#RGB` / `#RRGGBB` color.
fn hex_brightness(hex: &str) -> Option<f32> {
    let digits = hex.strip_prefix('#').filter(|d| d.is_ascii())?;
    let (r, g, b) = match digits.len() {
        3 => {
            let expand = |i: usize| u8::from_str_radix(&digits[i..=i].repeat(2), 16).ok();
            (expand(0)?, expand(1)?, expand(2)?)
        }
        6 => (
            u8::from_str_radix(&digits[0..2], 16).ok()?,
            u8::from_str_radix(&digits[2..4], 16).ok()?,
            u8::from_str_radix(&digits[4..6], 16).ok()?,
        ),
        _ => return None,
    };
    Some((0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32) / 255.0)
}
