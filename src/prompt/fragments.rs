//! Editable prompt fragments and their sentence template.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which part of a prompt a fragment fills.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    /// Who is in the picture.
    Character,
    /// What they are doing.
    Action,
    /// Where, starting with a preposition.
    Location,
}

impl FragmentKind {
    /// All kinds in sentence order.
    pub const ALL: [Self; 3] = [Self::Character, Self::Action, Self::Location];

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Character => "character",
            Self::Action => "action",
            Self::Location => "location",
        }
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three editable parts of a prompt. All empty means "no prompt yet".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptFragments {
    /// Character phrase.
    pub character: String,
    /// Action phrase.
    pub action: String,
    /// Location phrase.
    pub location: String,
}

impl PromptFragments {
    /// Build fragments from their parts.
    #[must_use]
    pub fn new(
        character: impl Into<String>,
        action: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            character: character.into(),
            action: action.into(),
            location: location.into(),
        }
    }

    /// True when no fragment is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.character.is_empty() && self.action.is_empty() && self.location.is_empty()
    }

    /// True when every fragment is set.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.character.is_empty() && !self.action.is_empty() && !self.location.is_empty()
    }

    /// Read one fragment.
    #[must_use]
    pub fn get(&self, kind: FragmentKind) -> &str {
        match kind {
            FragmentKind::Character => &self.character,
            FragmentKind::Action => &self.action,
            FragmentKind::Location => &self.location,
        }
    }

    /// Replace one fragment, leaving the others untouched.
    pub fn set(&mut self, kind: FragmentKind, value: impl Into<String>) {
        let slot = match kind {
            FragmentKind::Character => &mut self.character,
            FragmentKind::Action => &mut self.action,
            FragmentKind::Location => &mut self.location,
        };
        *slot = value.into();
    }

    /// Compose the sentence `A {character} is {action} {location}.`
    #[must_use]
    pub fn compose(&self) -> String {
        let location = self.location.trim_end_matches('.');
        format!("A {} is {} {location}.", self.character, self.action)
    }
}
