use regex::Regex;

use crate::{Provider, TrackRef};

/// Finds track sharing links in free-form text.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    provider: Provider,
    pattern: Regex,
}

impl LinkExtractor {
    pub fn new(provider: &Provider) -> Self {
        // Matches http(s)://open.<domain>/[intl-xx/]track/<id>
        let pattern = format!(
            r"(?i:https?://open\.{}/(?:intl-[a-z]{{2}}(?:[-_][a-z]{{2}})?/)?track/)([A-Za-z0-9]+)",
            regex::escape(&provider.domain)
        );

        Self {
            provider: provider.clone(),
            pattern: Regex::new(&pattern).expect("escaped domain yields a valid pattern"),
        }
    }

    /// Returns the track of the first sharing link in the text, if any.
    pub fn detect(&self, text: &str) -> Option<TrackRef> {
        let captures = self.pattern.captures(text)?;
        TrackRef::new(&self.provider, &captures[1])
    }
}

impl Default for LinkExtractor {
    fn default() -> Self {
        Self::new(&Provider::spotify())
    }
}
