pub mod calm;
pub mod config;
pub mod context_format;
pub mod dashboard;
pub mod document;
pub mod engine;
pub mod error;
pub mod generation;
pub mod prompt;
pub mod quit_plan;
pub mod retriever;
pub mod sanitize;
pub mod signals;
pub mod speech;

pub use calm::{breathing_exercise, calm_message, DEFAULT_CALM_MINUTES, EMERGENCY_MESSAGE};
pub use config::*;
pub use context_format::{format_context, ContextStyle};
pub use dashboard::build_dashboard;
pub use document::{
    analysis_context, DefaultExtractor, DocumentAnalysis, DocumentExtractor, ImportantValue,
};
pub use engine::*;
pub use error::*;
pub use generation::{GenerationClient, GenerationProfile, DEFAULT_MODEL};
pub use prompt::{compose, DocumentInput, PromptBuilder, PromptInputs};
pub use quit_plan::default_quit_plan;
pub use retriever::{rank, retrieve, DEFAULT_RETRIEVAL_K};
pub use sanitize::sanitize;
pub use speech::{voice_for_style, SpeechService};
