//! Branding profiles applied to printable exports.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Accent color used when no valid branding color is configured.
pub const DEFAULT_ACCENT_COLOR: &str = "#1f2937";

lazy_static! {
    static ref HEX_COLOR: Regex = Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").unwrap();
}

/// Stored branding profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandingProfile {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub logo_url: Option<String>,
    pub primary_color: Option<String>,
}

/// Branding override passed to the HTML builder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Branding {
    pub logo_url: Option<String>,
    pub primary_color: Option<String>,
}

impl Branding {
    /// Accent color for headings, falling back to the default when the
    /// configured value is not a hex color. Only hex colors reach the
    /// stylesheet.
    pub fn accent_color(&self) -> &str {
        match self.primary_color.as_deref() {
            Some(color) if HEX_COLOR.is_match(color) => color,
            _ => DEFAULT_ACCENT_COLOR,
        }
    }

    /// Logo URL when it uses an http(s) scheme.
    pub fn logo(&self) -> Option<&str> {
        self.logo_url
            .as_deref()
            .filter(|url| url.starts_with("https://") || url.starts_with("http://"))
    }
}

impl From<&BrandingProfile> for Branding {
    fn from(profile: &BrandingProfile) -> Self {
        Self {
            logo_url: profile.logo_url.clone(),
            primary_color: profile.primary_color.clone(),
        }
    }
}
