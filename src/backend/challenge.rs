//! Weekly drawing challenge.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Id of the challenge shown when none can be fetched.
pub const PLACEHOLDER_ID: &str = "placeholder";
/// Prompt of the placeholder challenge.
pub const PLACEHOLDER_PROMPT: &str = "A mystical dragon is gardening in a crystal cave";
/// Placeholder challenges run for a week from the moment they are built.
pub const PLACEHOLDER_DAYS: i64 = 7;

/// A community challenge and its submissions, best voted first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    /// Backend id, or [`PLACEHOLDER_ID`].
    pub id: String,
    /// Prompt everyone draws.
    pub prompt: String,
    /// When submissions close.
    pub end_date: DateTime<Utc>,
    /// Artwork submitted so far.
    pub submissions: Vec<Submission>,
}

impl Challenge {
    /// Stand-in challenge ending a week after `now`.
    #[must_use]
    pub fn placeholder(now: DateTime<Utc>) -> Self {
        Self {
            id: PLACEHOLDER_ID.to_string(),
            prompt: PLACEHOLDER_PROMPT.to_string(),
            end_date: now + Duration::days(PLACEHOLDER_DAYS),
            submissions: Vec::new(),
        }
    }

}

/// One submitted artwork.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// Backend id.
    pub id: String,
    /// Public image URL.
    pub image_url: String,
    /// Title, `Untitled` when none was given.
    pub title: String,
    /// Author id.
    pub user_id: String,
    /// Vote count.
    pub votes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_ends_in_a_week() {
        let now = Utc::now();
        let challenge = Challenge::placeholder(now);
        assert_eq!(challenge.id, PLACEHOLDER_ID);
        assert_eq!(challenge.prompt, PLACEHOLDER_PROMPT);
        assert_eq!(challenge.end_date - now, Duration::days(7));
    }
}
