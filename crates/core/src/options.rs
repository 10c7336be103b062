// Render options
//
// Clients send options with the familiar camelCase print-to-PDF names. They
// are parsed into a fixed structure and validated before a worker is
// borrowed; unknown fields are ignored.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid render option
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OptionsError {
    #[error("unknown paper format '{0}'")]
    UnknownFormat(String),

    #[error("invalid length '{0}': expected a number with px, in, cm or mm")]
    InvalidLength(String),

    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),

    #[error("scale must be between 0.1 and 2, got {0}")]
    Scale(f64),

    #[error("invalid page ranges '{0}'")]
    PageRanges(String),

    #[error("timeout must be greater than zero")]
    Timeout,
}

/// Named paper sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PaperFormat {
    #[default]
    Letter,
    Legal,
    Tabloid,
    Ledger,
    A0,
    A1,
    A2,
    A3,
    A4,
    A5,
    A6,
}

impl PaperFormat {
    /// Width and height in inches, portrait orientation
    pub fn size_inches(&self) -> (f64, f64) {
        match self {
            Self::Letter => (8.5, 11.0),
            Self::Legal => (8.5, 14.0),
            Self::Tabloid => (11.0, 17.0),
            Self::Ledger => (17.0, 11.0),
            Self::A0 => (33.1, 46.8),
            Self::A1 => (23.4, 33.1),
            Self::A2 => (16.54, 23.4),
            Self::A3 => (11.7, 16.54),
            Self::A4 => (8.27, 11.7),
            Self::A5 => (5.83, 8.27),
            Self::A6 => (4.13, 5.83),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Letter => "Letter",
            Self::Legal => "Legal",
            Self::Tabloid => "Tabloid",
            Self::Ledger => "Ledger",
            Self::A0 => "A0",
            Self::A1 => "A1",
            Self::A2 => "A2",
            Self::A3 => "A3",
            Self::A4 => "A4",
            Self::A5 => "A5",
            Self::A6 => "A6",
        }
    }
}

impl fmt::Display for PaperFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaperFormat {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "letter" => Ok(Self::Letter),
            "legal" => Ok(Self::Legal),
            "tabloid" => Ok(Self::Tabloid),
            "ledger" => Ok(Self::Ledger),
            "a0" => Ok(Self::A0),
            "a1" => Ok(Self::A1),
            "a2" => Ok(Self::A2),
            "a3" => Ok(Self::A3),
            "a4" => Ok(Self::A4),
            "a5" => Ok(Self::A5),
            "a6" => Ok(Self::A6),
            _ => Err(OptionsError::UnknownFormat(s.to_string())),
        }
    }
}

impl TryFrom<String> for PaperFormat {
    type Error = OptionsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PaperFormat> for String {
    fn from(format: PaperFormat) -> Self {
        format.as_str().to_string()
    }
}

const PX_PER_INCH: f64 = 96.0;
const CM_PER_INCH: f64 = 2.54;
const MM_PER_INCH: f64 = 25.4;

/// A non-negative CSS length, stored in inches.
///
/// Accepts JSON numbers (pixels) or strings such as `"10px"`, `"1in"`,
/// `"2.5cm"` and `"20mm"`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "RawLength", into = "String")]
pub struct CssLength(f64);

impl CssLength {
    pub fn from_inches(inches: f64) -> Self {
        Self(inches)
    }

    pub fn inches(&self) -> f64 {
        self.0
    }
}

impl FromStr for CssLength {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim().to_ascii_lowercase();
        let invalid = || OptionsError::InvalidLength(s.to_string());

        let (number, per_inch) = if let Some(n) = text.strip_suffix("px") {
            (n, PX_PER_INCH)
        } else if let Some(n) = text.strip_suffix("in") {
            (n, 1.0)
        } else if let Some(n) = text.strip_suffix("cm") {
            (n, CM_PER_INCH)
        } else if let Some(n) = text.strip_suffix("mm") {
            (n, MM_PER_INCH)
        } else {
            (text.as_str(), PX_PER_INCH)
        };

        let value: f64 = number.trim().parse().map_err(|_| invalid())?;
        if !value.is_finite() || value < 0.0 {
            return Err(invalid());
        }
        Ok(Self(value / per_inch))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLength {
    Pixels(f64),
    Text(String),
}

impl TryFrom<RawLength> for CssLength {
    type Error = OptionsError;

    fn try_from(raw: RawLength) -> Result<Self, Self::Error> {
        match raw {
            RawLength::Pixels(px) if px.is_finite() && px >= 0.0 => Ok(Self(px / PX_PER_INCH)),
            RawLength::Pixels(px) => Err(OptionsError::InvalidLength(px.to_string())),
            RawLength::Text(text) => text.parse(),
        }
    }
}

impl From<CssLength> for String {
    fn from(length: CssLength) -> Self {
        format!("{}in", length.0)
    }
}

/// Page margins; missing sides use the engine default
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default)]
pub struct Margin {
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, example = "10mm"))]
    pub top: Option<CssLength>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub right: Option<CssLength>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub bottom: Option<CssLength>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub left: Option<CssLength>,
}

/// Options controlling document export
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct RenderOptions {
    /// Named paper size; ignored when both width and height are given
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, example = "A4"))]
    pub format: Option<PaperFormat>,

    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, example = "210mm"))]
    pub width: Option<CssLength>,

    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, example = "297mm"))]
    pub height: Option<CssLength>,

    pub landscape: bool,

    pub print_background: bool,

    /// Rendering scale, 0.1 to 2
    pub scale: Option<f64>,

    pub margin: Margin,

    /// Pages to print, e.g. `1-5, 8, 11-13`
    pub page_ranges: Option<String>,

    pub display_header_footer: bool,

    pub header_template: Option<String>,

    pub footer_template: Option<String>,

    /// Prefer page size declared by CSS `@page` rules
    #[serde(rename = "preferCSSPageSize")]
    pub prefer_css_page_size: bool,

    /// Export time bound in milliseconds
    pub timeout: Option<u64>,
}

impl RenderOptions {
    /// Check every value is usable by the engine
    pub fn validate(&self) -> Result<(), OptionsError> {
        if let Some(scale) = self.scale {
            if !(0.1..=2.0).contains(&scale) {
                return Err(OptionsError::Scale(scale));
            }
        }
        if self.width.is_some_and(|w| w.inches() == 0.0) {
            return Err(OptionsError::NotPositive("width"));
        }
        if self.height.is_some_and(|h| h.inches() == 0.0) {
            return Err(OptionsError::NotPositive("height"));
        }
        if let Some(ranges) = &self.page_ranges {
            validate_page_ranges(ranges)?;
        }
        if self.timeout == Some(0) {
            return Err(OptionsError::Timeout);
        }
        Ok(())
    }

    /// Paper width and height in inches, portrait orientation.
    ///
    /// Explicit width/height take precedence over the named format.
    pub fn paper_size(&self) -> (f64, f64) {
        let (width, height) = self.format.unwrap_or_default().size_inches();
        (
            self.width.map(|w| w.inches()).unwrap_or(width),
            self.height.map(|h| h.inches()).unwrap_or(height),
        )
    }

    /// Per-job export bound, if the client asked for one
    pub fn export_timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_millis)
    }
}

fn validate_page_ranges(ranges: &str) -> Result<(), OptionsError> {
    let invalid = || OptionsError::PageRanges(ranges.to_string());

    if ranges.trim().is_empty() {
        return Err(invalid());
    }

    for part in ranges.split(',') {
        let part = part.trim();
        let bounds: Vec<&str> = part.split('-').map(str::trim).collect();
        let valid = match bounds.as_slice() {
            [page] => is_page_number(page),
            // open ranges such as "3-" and "-4" are accepted by the engine
            [from, to] => {
                (from.is_empty() || is_page_number(from))
                    && (to.is_empty() || is_page_number(to))
                    && !(from.is_empty() && to.is_empty())
            }
            _ => false,
        };
        if !valid {
            return Err(invalid());
        }
    }
    Ok(())
}

fn is_page_number(s: &str) -> bool {
    s.parse::<u32>().is_ok_and(|n| n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Result<RenderOptions, serde_json::Error> {
        serde_json::from_value(value)
    }

    #[test]
    fn test_defaults() {
        let options = parse(json!({})).unwrap();
        assert_eq!(options, RenderOptions::default());
        assert_eq!(options.paper_size(), (8.5, 11.0));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_camel_case_fields() {
        let options = parse(json!({
            "format": "a4",
            "landscape": true,
            "printBackground": true,
            "displayHeaderFooter": true,
            "headerTemplate": "<span class=title></span>",
            "preferCSSPageSize": true,
            "pageRanges": "1-3, 5",
            "margin": { "top": "1in", "left": 96 },
            "timeout": 5000
        }))
        .unwrap();

        assert_eq!(options.format, Some(PaperFormat::A4));
        assert!(options.landscape);
        assert!(options.print_background);
        assert!(options.display_header_footer);
        assert!(options.prefer_css_page_size);
        assert_eq!(options.margin.top, Some(CssLength::from_inches(1.0)));
        assert_eq!(options.margin.left, Some(CssLength::from_inches(1.0)));
        assert_eq!(options.export_timeout(), Some(Duration::from_secs(5)));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let options = parse(json!({ "path": "/tmp/out.pdf", "omitBackground": true })).unwrap();
        assert_eq!(options, RenderOptions::default());
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(parse(json!({ "format": "postcard" })).is_err());
    }

    #[test]
    fn test_css_lengths() {
        assert_eq!("96px".parse::<CssLength>().unwrap().inches(), 1.0);
        assert_eq!("2.54cm".parse::<CssLength>().unwrap().inches(), 1.0);
        assert_eq!("25.4mm".parse::<CssLength>().unwrap().inches(), 1.0);
        assert_eq!(" 2IN ".parse::<CssLength>().unwrap().inches(), 2.0);
        assert_eq!("192".parse::<CssLength>().unwrap().inches(), 2.0);

        assert!("ten px".parse::<CssLength>().is_err());
        assert!("-1in".parse::<CssLength>().is_err());
        assert!("".parse::<CssLength>().is_err());
    }

    #[test]
    fn test_explicit_size_overrides_format() {
        let options = parse(json!({ "format": "A4", "width": "4in" })).unwrap();
        assert_eq!(options.paper_size(), (4.0, 11.7));
    }

    #[test]
    fn test_scale_bounds() {
        let options = parse(json!({ "scale": 2.5 })).unwrap();
        assert_eq!(options.validate(), Err(OptionsError::Scale(2.5)));

        let options = parse(json!({ "scale": 0.5 })).unwrap();
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_page_ranges() {
        assert!(validate_page_ranges("1").is_ok());
        assert!(validate_page_ranges("1-5, 8, 11-13").is_ok());
        assert!(validate_page_ranges("3-").is_ok());
        assert!(validate_page_ranges("-").is_err());
        assert!(validate_page_ranges("0").is_err());
        assert!(validate_page_ranges("a-b").is_err());
        assert!(validate_page_ranges("").is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let options = parse(json!({ "timeout": 0 })).unwrap();
        assert_eq!(options.validate(), Err(OptionsError::Timeout));
    }

    #[test]
    fn test_zero_width_rejected() {
        let options = parse(json!({ "width": 0 })).unwrap();
        assert_eq!(options.validate(), Err(OptionsError::NotPositive("width")));
    }
}
