//! Prompt generation with bounded remote retries and corpus fallback.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{GeneratorConfig, LlmConfig};
use crate::llm::{
    CompletionRequest, ImageGenerator, ImageRequest, LlmError, TextGenerator,
};

use super::cache::PromptCache;
use super::corpus::{is_too_abstract, normalize, sample};
use super::fragments::{FragmentKind, PromptFragments};

/// System instruction sent with every remote completion.
pub const SYSTEM_INSTRUCTION: &str = "Generate a unique, singular character (2 to 6 words) \
that is visually drawable and concrete. The character must be a single individual (not a \
group or team). Avoid collective nouns. Use clear and familiar language, no vague or \
abstract pairings. Then, combine it with a concrete, visually clear action, and a vivid \
location. Result must be under 25 words. Output a single sentence in this format: \
\"A [character] is [action] in [location].\"";

/// User instruction sent with every remote completion.
pub const USER_INSTRUCTION: &str = "Generate a new character, action, and location prompt.";

/// Style appended to every image prompt.
pub const IMAGE_STYLE_SUFFIX: &str = "flat vector cartoon style, clean outlines, vibrant color \
palette, detailed background, centered composition";

/// Requested image size.
pub const IMAGE_SIZE: &str = "512x512";

/// Which path produced a sentence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptSource {
    /// Accepted from the remote text service.
    Remote,
    /// Synthesized from the local corpus.
    Fallback,
}

/// A full prompt sentence and where it came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GeneratedPrompt {
    /// The sentence, trimmed.
    pub sentence: String,
    /// Origin of the sentence.
    pub source: PromptSource,
}

/// What one generation request produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenerationResult {
    /// A full sentence.
    Sentence(GeneratedPrompt),
    /// A single fragment.
    Fragment {
        /// Which fragment.
        kind: FragmentKind,
        /// Its new text.
        text: String,
    },
}

/// Result of screening one remote attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// Usable, previously unseen sentence.
    Accepted(String),
    /// Already handed out by this generator.
    Duplicate,
    /// Contains a banned abstract word.
    Abstract,
    /// The service failed or returned nothing usable.
    ServiceError(LlmError),
}

enum GenerationPhase {
    Remote { attempt: u32 },
    Local { attempt: u32, last: Option<String> },
    Done(GeneratedPrompt),
}

/// Produces prompts, fragments and images.
///
/// Owns its duplicate cache, so two generators never see each other's prompts.
pub struct PromptGenerator {
    text: Arc<dyn TextGenerator>,
    images: Arc<dyn ImageGenerator>,
    llm: LlmConfig,
    config: GeneratorConfig,
    cache: PromptCache,
}

impl PromptGenerator {
    /// Create a generator over the given services.
    #[must_use]
    pub fn new(
        text: Arc<dyn TextGenerator>,
        images: Arc<dyn ImageGenerator>,
        llm: LlmConfig,
        config: GeneratorConfig,
    ) -> Self {
        let cache = PromptCache::new(config.cache_capacity);
        Self {
            text,
            images,
            llm,
            config,
            cache,
        }
    }

    /// Duplicate cache of this generator.
    #[must_use]
    pub const fn cache(&self) -> &PromptCache {
        &self.cache
    }

    /// Produce a full prompt sentence. Never fails: once the remote budget is
    /// spent the sentence is synthesized from the local corpus.
    pub async fn generate_full_prompt(&self) -> GeneratedPrompt {
        let mut phase = GenerationPhase::Remote { attempt: 1 };

        loop {
            phase = match phase {
                GenerationPhase::Remote { attempt } if attempt > self.config.max_remote_attempts => {
                    warn!(
                        attempts = self.config.max_remote_attempts,
                        "Falling back to local prompt after remote retries"
                    );
                    GenerationPhase::Local {
                        attempt: 1,
                        last: None,
                    }
                }
                GenerationPhase::Remote { attempt } => match self.remote_attempt().await {
                    AttemptOutcome::Accepted(sentence) => {
                        let seen = self.cache.len().await;
                        info!(attempt, seen, "Remote prompt accepted");
                        GenerationPhase::Done(GeneratedPrompt {
                            sentence,
                            source: PromptSource::Remote,
                        })
                    }
                    AttemptOutcome::Duplicate => {
                        debug!(attempt, "Duplicate prompt received, retrying");
                        GenerationPhase::Remote {
                            attempt: attempt + 1,
                        }
                    }
                    AttemptOutcome::Abstract => {
                        debug!(attempt, "Abstract prompt received, retrying");
                        GenerationPhase::Remote {
                            attempt: attempt + 1,
                        }
                    }
                    AttemptOutcome::ServiceError(e) => {
                        warn!(attempt, error = %e, retryable = e.is_retryable(), "Prompt generation failed");
                        GenerationPhase::Remote {
                            attempt: attempt + 1,
                        }
                    }
                },
                GenerationPhase::Local { attempt, last } if attempt > self.config.max_local_attempts => {
                    let sentence = last.unwrap_or_else(synthesize_sentence);
                    debug!("Local attempts exhausted, returning last synthesized prompt");
                    GenerationPhase::Done(GeneratedPrompt {
                        sentence,
                        source: PromptSource::Fallback,
                    })
                }
                GenerationPhase::Local { attempt, .. } => {
                    let sentence = synthesize_sentence();
                    if self.screen(&sentence).await {
                        GenerationPhase::Done(GeneratedPrompt {
                            sentence,
                            source: PromptSource::Fallback,
                        })
                    } else {
                        GenerationPhase::Local {
                            attempt: attempt + 1,
                            last: Some(sentence),
                        }
                    }
                }
                GenerationPhase::Done(prompt) => return prompt,
            };
        }
    }

    /// Generate a full sentence, or one fragment when `target` names it.
    pub async fn generate(&self, target: Option<FragmentKind>) -> GenerationResult {
        match target {
            None => GenerationResult::Sentence(self.generate_full_prompt().await),
            Some(kind) => GenerationResult::Fragment {
                kind,
                text: self.generate_fragment(kind),
            },
        }
    }

    /// Run and screen a single remote completion.
    pub async fn remote_attempt(&self) -> AttemptOutcome {
        let request = CompletionRequest {
            system: SYSTEM_INSTRUCTION.to_string(),
            user: USER_INSTRUCTION.to_string(),
            model: self.llm.text_model.clone(),
            temperature: self.llm.temperature,
        };

        let raw = match self.text.complete(request).await {
            Ok(raw) => raw,
            Err(e) => return AttemptOutcome::ServiceError(e),
        };

        let sentence = clean_completion(&raw);
        if sentence.is_empty() {
            return AttemptOutcome::ServiceError(LlmError::MalformedResponse(
                "empty completion".to_string(),
            ));
        }
        if is_too_abstract(&sentence) {
            return AttemptOutcome::Abstract;
        }
        if !self.cache.remember(normalize(&sentence)).await {
            return AttemptOutcome::Duplicate;
        }
        AttemptOutcome::Accepted(sentence)
    }

    async fn screen(&self, sentence: &str) -> bool {
        !is_too_abstract(sentence) && self.cache.remember(normalize(sentence)).await
    }

    /// One random character from the corpus.
    #[must_use]
    pub fn generate_character(&self) -> String {
        self.generate_fragment(FragmentKind::Character)
    }

    /// One random action from the corpus.
    #[must_use]
    pub fn generate_action(&self) -> String {
        self.generate_fragment(FragmentKind::Action)
    }

    /// One random location from the corpus.
    #[must_use]
    pub fn generate_location(&self) -> String {
        self.generate_fragment(FragmentKind::Location)
    }

    /// One random fragment of the given kind.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn generate_fragment(&self, kind: FragmentKind) -> String {
        sample(kind, &mut rand::thread_rng()).to_string()
    }

    /// Render an image for a prompt. Any failure is logged and yields `None`.
    pub async fn generate_image(&self, prompt: &str) -> Option<String> {
        let request = ImageRequest {
            prompt: styled_image_prompt(prompt),
            model: self.llm.image_model.clone(),
            count: 1,
            size: IMAGE_SIZE.to_string(),
        };

        match self.images.generate_images(request).await {
            Ok(urls) => {
                let url = urls.into_iter().next();
                if url.is_none() {
                    warn!("Image service returned no image");
                }
                url
            }
            Err(e) => {
                warn!(error = %e, "Error generating image");
                None
            }
        }
    }
}

/// Append the image style to a prompt.
#[must_use]
pub fn styled_image_prompt(prompt: &str) -> String {
    let prompt = prompt.trim().trim_end_matches('.');
    format!("{prompt}, in a {IMAGE_STYLE_SUFFIX}")
}

fn clean_completion(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}

fn synthesize_sentence() -> String {
    let mut rng = rand::thread_rng();
    PromptFragments::new(
        sample(FragmentKind::Character, &mut rng),
        sample(FragmentKind::Action, &mut rng),
        sample(FragmentKind::Location, &mut rng),
    )
    .compose()
}
