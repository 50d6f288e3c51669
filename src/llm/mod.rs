//! Remote text and image generation services.
//!
//! The prompt generator only sees the [`TextGenerator`] and [`ImageGenerator`]
//! traits; [`OpenAiClient`] is the production implementation of both.

pub mod error;
pub mod openai;

pub use error::{LlmError, LlmResult};
pub use openai::OpenAiClient;

use std::future::Future;
use std::pin::Pin;

/// Boxed future type for generation service calls.
pub type LlmFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A single-turn chat completion request.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    /// System instruction constraining the output.
    pub system: String,
    /// User instruction.
    pub user: String,
    /// Model id.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
}

/// An image generation request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageRequest {
    /// Full prompt, style suffix included.
    pub prompt: String,
    /// Model id.
    pub model: String,
    /// Number of images requested.
    pub count: u32,
    /// Image size, e.g. `512x512`.
    pub size: String,
}

/// Text completion service.
pub trait TextGenerator: Send + Sync {
    /// Run one completion and return the generated text.
    ///
    /// # Errors
    /// Returns an error on transport failure, timeout, non-success status or
    /// a response without usable content.
    fn complete(&self, request: CompletionRequest) -> LlmFuture<'_, LlmResult<String>>;
}

/// Image generation service.
pub trait ImageGenerator: Send + Sync {
    /// Generate images and return their URLs in service order.
    ///
    /// # Errors
    /// Returns an error on transport failure, timeout or non-success status.
    fn generate_images(&self, request: ImageRequest) -> LlmFuture<'_, LlmResult<Vec<String>>>;
}
