use std::fmt::Display;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Matches `<scheme>:track:<id>` in any letter case
    static ref TRACK_URI_REGEX: Regex =
        Regex::new(r"(?i)^([a-z][a-z0-9]*):track:([a-z0-9]+)$").unwrap();
}

/// Describes the streaming service whose links and URIs are understood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    /// The domain sharing links are served from, without the `open.` prefix.
    pub domain: String,
    /// The scheme used in canonical URIs, such as `spotify` in `spotify:track:<id>`.
    pub scheme: String,
}

impl Provider {
    pub fn new(domain: impl Into<String>, scheme: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            scheme: scheme.into(),
        }
    }

    pub fn spotify() -> Self {
        Self::new("spotify.com", "spotify")
    }
}

impl Default for Provider {
    fn default() -> Self {
        Self::spotify()
    }
}

/// A single track, identified by its service-assigned id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackRef {
    id: String,
    uri: String,
}

impl TrackRef {
    /// Creates a track reference from a bare id.
    /// Returns `None` if the id is empty or contains anything but ASCII alphanumerics.
    pub fn new(provider: &Provider, id: &str) -> Option<Self> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }

        Some(Self {
            id: id.to_string(),
            uri: format!("{}:track:{}", provider.scheme.to_ascii_lowercase(), id),
        })
    }

    /// Parses a stored URI into its canonical form.
    ///
    /// Surrounding whitespace and the letter case of the scheme and `track` segment
    /// are tolerated. URIs of another scheme, or of anything but a track, are rejected.
    pub fn from_uri(provider: &Provider, uri: &str) -> Option<Self> {
        let captures = TRACK_URI_REGEX.captures(uri.trim())?;

        if !captures[1].eq_ignore_ascii_case(&provider.scheme) {
            return None;
        }

        Self::new(provider, &captures[2])
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The canonical `<scheme>:track:<id>` form, used for all equality checks.
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl Display for TrackRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.uri)
    }
}
