//! Place name autocomplete
//!
//! Suggestions come from the primary geocoder; the fallback geocoder is asked
//! only when the primary has nothing. Results are ordered so that places
//! whose name starts with the typed text come first.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::geodata::{Geocoder, PlaceSuggestion};

/// Default number of suggestions returned
pub const DEFAULT_LIMIT: usize = 8;

/// Match quality of a suggestion, 1 (best) to 5
#[must_use]
pub fn match_priority(display_name: &str, query: &str) -> u8 {
    let query = query.trim().to_lowercase();
    let name = display_name.to_lowercase();
    let place = name.split(',').next().unwrap_or_default().trim();

    let Some(first) = query.chars().next() else {
        return 5;
    };
    let head: String = place.chars().take(query.chars().count() + 3).collect();

    if place.starts_with(&query) {
        1
    } else if head.contains(&query) {
        2
    } else if place.starts_with(first) {
        3
    } else if name.contains(&query) {
        4
    } else {
        5
    }
}

/// Stable sort by [`match_priority`]
#[must_use]
pub fn rank_suggestions(mut suggestions: Vec<PlaceSuggestion>, query: &str) -> Vec<PlaceSuggestion> {
    suggestions.sort_by_key(|s| match_priority(&s.display_name, query));
    suggestions
}

pub struct Autocompleter {
    primary: Arc<dyn Geocoder>,
    fallback: Arc<dyn Geocoder>,
}

impl Autocompleter {
    #[must_use]
    pub fn new(primary: Arc<dyn Geocoder>, fallback: Arc<dyn Geocoder>) -> Self {
        Self { primary, fallback }
    }

    /// Ranked suggestions for `query`. Provider failures yield an empty list.
    pub async fn complete(&self, query: &str, limit: usize) -> Vec<PlaceSuggestion> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let mut suggestions = match self.primary.suggest(query, limit).await {
            Ok(suggestions) => suggestions,
            Err(e) => {
                warn!("Primary autocomplete failed: {}", e);
                Vec::new()
            }
        };

        if suggestions.is_empty() {
            debug!("No primary suggestions for '{}', asking fallback", query);
            suggestions = match self.fallback.suggest(query, limit).await {
                Ok(suggestions) => suggestions,
                Err(e) => {
                    warn!("Fallback autocomplete failed: {}", e);
                    Vec::new()
                }
            };
        }

        let mut ranked = rank_suggestions(suggestions, query);
        ranked.truncate(limit);
        ranked
    }
}
