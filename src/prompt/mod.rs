//! Prompt corpus, parsing and generation.
//!
//! A prompt is a single drawable sentence `A {character} is {action} {location}.`
//! This module provides:
//! - The local fragment corpus and the abstract-word filter
//! - Sentence decomposition into editable fragments
//! - Full prompt generation with remote retries and corpus fallback
//! - Duplicate avoidance for the lifetime of a generator

pub mod cache;
pub mod corpus;
pub mod fragments;
pub mod generator;
pub mod parser;

pub use cache::PromptCache;
pub use corpus::{is_too_abstract, normalize};
pub use fragments::{FragmentKind, PromptFragments};
pub use generator::{
    AttemptOutcome, GeneratedPrompt, GenerationResult, PromptGenerator, PromptSource,
};
pub use parser::{PromptParser, parse_prompt};
