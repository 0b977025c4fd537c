use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageFormat {
    A3,
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
}

impl PageFormat {
    /// Paper width and height in inches, as the print protocol expects them.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageFormat::A3 => (11.7, 16.54),
            PageFormat::A4 => (8.27, 11.7),
            PageFormat::A5 => (5.83, 8.27),
            PageFormat::Letter => (8.5, 11.0),
            PageFormat::Legal => (8.5, 14.0),
            PageFormat::Tabloid => (11.0, 17.0),
        }
    }
}

impl FromStr for PageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a3" => Ok(PageFormat::A3),
            "a4" => Ok(PageFormat::A4),
            "a5" => Ok(PageFormat::A5),
            "letter" => Ok(PageFormat::Letter),
            "legal" => Ok(PageFormat::Legal),
            "tabloid" => Ok(PageFormat::Tabloid),
            other => Err(format!("unsupported page format '{}'", other)),
        }
    }
}

impl fmt::Display for PageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PageFormat::A3 => "A3",
            PageFormat::A4 => "A4",
            PageFormat::A5 => "A5",
            PageFormat::Letter => "Letter",
            PageFormat::Legal => "Legal",
            PageFormat::Tabloid => "Tabloid",
        };
        write!(f, "{}", name)
    }
}

/// Parses a CSS-like length ("1cm", "10mm", "0.5in", "80px", "40") into inches.
/// Bare numbers are pixels at 96 dpi.
pub fn parse_length(raw: &str) -> Result<f64, String> {
    let value = raw.trim().to_ascii_lowercase();
    let (number, divisor) = if let Some(n) = value.strip_suffix("cm") {
        (n, 2.54)
    } else if let Some(n) = value.strip_suffix("mm") {
        (n, 25.4)
    } else if let Some(n) = value.strip_suffix("in") {
        (n, 1.0)
    } else if let Some(n) = value.strip_suffix("px") {
        (n, 96.0)
    } else {
        (value.as_str(), 96.0)
    };

    let number: f64 = number
        .trim()
        .parse()
        .map_err(|_| format!("invalid length '{}'", raw))?;

    if !number.is_finite() || number < 0.0 {
        return Err(format!("invalid length '{}'", raw));
    }

    Ok(number / divisor)
}

/// Page margins in inches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margin {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Default for Margin {
    fn default() -> Self {
        Margin::uniform(1.0 / 2.54)
    }
}

impl Margin {
    pub fn uniform(size: f64) -> Self {
        Margin {
            top: size,
            bottom: size,
            left: size,
            right: size,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PdfOptions {
    pub format: PageFormat,
    pub landscape: bool,
    pub print_background: bool,
    pub margin: Margin,
    pub scale: f64,
    pub display_header_footer: bool,
    pub header_template: Option<String>,
    pub footer_template: Option<String>,
}

impl Default for PdfOptions {
    fn default() -> Self {
        PdfOptions {
            format: PageFormat::A4,
            landscape: false,
            print_background: true,
            margin: Margin::default(),
            scale: 1.0,
            display_header_footer: false,
            header_template: None,
            footer_template: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarginOverride {
    pub top: Option<String>,
    pub bottom: Option<String>,
    pub left: Option<String>,
    pub right: Option<String>,
}

/// Per-request overrides of the configured PDF defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfOptionsOverride {
    pub format: Option<String>,
    pub landscape: Option<bool>,
    pub print_background: Option<bool>,
    pub margin: Option<MarginOverride>,
    pub scale: Option<f64>,
    pub display_header_footer: Option<bool>,
    pub header_template: Option<String>,
    pub footer_template: Option<String>,
}

impl PdfOptionsOverride {
    pub fn apply(&self, base: &PdfOptions) -> Result<PdfOptions, String> {
        let mut options = base.clone();

        if let Some(format) = &self.format {
            options.format = format.parse::<PageFormat>()?;
        }
        if let Some(landscape) = self.landscape {
            options.landscape = landscape;
        }
        if let Some(print_background) = self.print_background {
            options.print_background = print_background;
        }
        if let Some(margin) = &self.margin {
            let side = |raw: &Option<String>, current: f64| -> Result<f64, String> {
                raw.as_deref().map(parse_length).unwrap_or(Ok(current))
            };
            options.margin = Margin {
                top: side(&margin.top, options.margin.top)?,
                bottom: side(&margin.bottom, options.margin.bottom)?,
                left: side(&margin.left, options.margin.left)?,
                right: side(&margin.right, options.margin.right)?,
            };
        }
        if let Some(scale) = self.scale {
            // same range Chrome accepts
            if !(0.1..=2.0).contains(&scale) {
                return Err(format!("scale {} outside 0.1..=2.0", scale));
            }
            options.scale = scale;
        }
        if self.header_template.is_some() {
            options.header_template = self.header_template.clone();
        }
        if self.footer_template.is_some() {
            options.footer_template = self.footer_template.clone();
        }
        if let Some(display) = self.display_header_footer {
            options.display_header_footer = display;
        } else if self.header_template.is_some() || self.footer_template.is_some() {
            options.display_header_footer = true;
        }

        Ok(options)
    }
}

#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub chrome_path: Option<String>,
    pub idle_timeout: Duration,
    pub session_timeout: Duration,
    /// How long past `session_timeout` a request waits for the blocking
    /// render task before answering with a timeout.
    pub teardown_grace: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        BrowserConfig {
            chrome_path: None,
            idle_timeout: Duration::from_millis(30_000),
            session_timeout: Duration::from_millis(120_000),
            teardown_grace: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            bucket: "pdf-pw-templates".to_string(),
            endpoint_url: None,
            force_path_style: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
    /// 0 disables the render concurrency bound.
    pub max_concurrent_renders: usize,
    pub storage: StorageConfig,
    pub browser: BrowserConfig,
    pub pdf: PdfOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_body_bytes: 52_428_800, // 50MB
            max_concurrent_renders: 0,
            storage: StorageConfig::default(),
            browser: BrowserConfig::default(),
            pdf: PdfOptions::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, falling back to defaults
    /// for absent keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();

        let parsed = |key: &str| -> Result<Option<u64>> {
            lookup(key)
                .map(|v| {
                    v.trim()
                        .parse::<u64>()
                        .with_context(|| format!("invalid {}: '{}'", key, v))
                })
                .transpose()
        };
        let flag = |key: &str| -> Result<Option<bool>> {
            lookup(key)
                .map(|v| {
                    v.trim()
                        .parse::<bool>()
                        .with_context(|| format!("invalid {}: '{}'", key, v))
                })
                .transpose()
        };
        let millis = |key: &str, default: Duration| -> Result<Duration> {
            Ok(parsed(key)?.map(Duration::from_millis).unwrap_or(default))
        };

        let port = match lookup("PORT") {
            Some(v) => v
                .trim()
                .parse::<u16>()
                .with_context(|| format!("invalid PORT: '{}'", v))?,
            None => defaults.port,
        };

        let storage = StorageConfig {
            bucket: lookup("BUCKET_NAME").unwrap_or(defaults.storage.bucket),
            endpoint_url: lookup("STORAGE_ENDPOINT_URL").filter(|v| !v.trim().is_empty()),
            force_path_style: flag("STORAGE_FORCE_PATH_STYLE")?
                .unwrap_or(defaults.storage.force_path_style),
        };

        let browser = BrowserConfig {
            chrome_path: lookup("CHROME_PATH").filter(|v| !v.trim().is_empty()),
            idle_timeout: millis("RENDER_IDLE_TIMEOUT_MS", defaults.browser.idle_timeout)?,
            session_timeout: millis("RENDER_SESSION_TIMEOUT_MS", defaults.browser.session_timeout)?,
            teardown_grace: defaults.browser.teardown_grace,
        };

        let mut pdf = defaults.pdf.clone();
        if let Some(format) = lookup("PDF_FORMAT") {
            pdf.format = format
                .parse::<PageFormat>()
                .map_err(|e: String| anyhow::anyhow!("invalid PDF_FORMAT: {}", e))?;
        }
        if let Some(margin) = lookup("PDF_MARGIN") {
            pdf.margin = Margin::uniform(
                parse_length(&margin).map_err(|e| anyhow::anyhow!("invalid PDF_MARGIN: {}", e))?,
            );
        }
        if let Some(background) = flag("PDF_PRINT_BACKGROUND")? {
            pdf.print_background = background;
        }
        pdf.header_template = lookup("PDF_HEADER_TEMPLATE");
        pdf.footer_template = lookup("PDF_FOOTER_TEMPLATE");
        pdf.display_header_footer =
            pdf.header_template.is_some() || pdf.footer_template.is_some();

        Ok(AppConfig {
            host: lookup("HOST").unwrap_or(defaults.host),
            port,
            max_body_bytes: parsed("MAX_BODY_BYTES")?
                .map(|v| v as usize)
                .unwrap_or(defaults.max_body_bytes),
            max_concurrent_renders: parsed("MAX_CONCURRENT_RENDERS")?
                .map(|v| v as usize)
                .unwrap_or(defaults.max_concurrent_renders),
            storage,
            browser,
            pdf,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.storage.bucket, "pdf-pw-templates");
        assert_eq!(config.pdf.format, PageFormat::A4);
        assert!(config.pdf.print_background);
        assert!(!config.pdf.display_header_footer);
        assert_eq!(config.max_concurrent_renders, 0);
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            ("BUCKET_NAME", "reports"),
            ("PORT", "9090"),
            ("PDF_FORMAT", "letter"),
            ("PDF_MARGIN", "10mm"),
            ("PDF_FOOTER_TEMPLATE", "<span class=\"pageNumber\"></span>"),
            ("RENDER_IDLE_TIMEOUT_MS", "1500"),
        ]))
        .unwrap();

        assert_eq!(config.storage.bucket, "reports");
        assert_eq!(config.port, 9090);
        assert_eq!(config.pdf.format, PageFormat::Letter);
        assert!((config.pdf.margin.left - 10.0 / 25.4).abs() < 1e-9);
        assert!(config.pdf.display_header_footer);
        assert_eq!(config.browser.idle_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn invalid_port_names_the_variable() {
        let err = AppConfig::from_lookup(lookup(&[("PORT", "http")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn lengths_convert_to_inches() {
        assert!((parse_length("1cm").unwrap() - 1.0 / 2.54).abs() < 1e-9);
        assert!((parse_length("80px").unwrap() - 80.0 / 96.0).abs() < 1e-9);
        assert!((parse_length("40").unwrap() - 40.0 / 96.0).abs() < 1e-9);
        assert_eq!(parse_length("0.5in").unwrap(), 0.5);
        assert!(parse_length("wide").is_err());
        assert!(parse_length("-1cm").is_err());
    }

    #[test]
    fn override_replaces_only_given_fields() {
        let base = PdfOptions::default();
        let request = PdfOptionsOverride {
            format: Some("A3".into()),
            margin: Some(MarginOverride {
                top: Some("80px".into()),
                ..Default::default()
            }),
            footer_template: Some("<div>footer</div>".into()),
            ..Default::default()
        };

        let options = request.apply(&base).unwrap();
        assert_eq!(options.format, PageFormat::A3);
        assert!((options.margin.top - 80.0 / 96.0).abs() < 1e-9);
        assert_eq!(options.margin.left, base.margin.left);
        assert!(options.display_header_footer);
        assert!(options.print_background);
    }

    #[test]
    fn override_rejects_unknown_format() {
        let request = PdfOptionsOverride {
            format: Some("B7".into()),
            ..Default::default()
        };
        assert!(request.apply(&PdfOptions::default()).is_err());
    }
}
