use std::env;

/// Default maximum chunk length in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 500;
/// Default trailing/leading overlap between consecutive chunks, in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;
/// Default vocabulary cap for the TF-IDF index.
pub const DEFAULT_MAX_FEATURES: usize = 1000;
/// Results at or below this cosine similarity are discarded.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.1;
/// Default section excerpt length in characters.
pub const DEFAULT_EXCERPT_LENGTH: usize = 150;
/// Default budget for an assembled context string, in characters.
pub const DEFAULT_CONTEXT_LENGTH: usize = 2000;

/// Tunables for the retrieval engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Target maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters of context carried over between consecutive chunks.
    pub chunk_overlap: usize,
    /// Maximum vocabulary size of the lexical index.
    pub max_features: usize,
    /// Minimum cosine similarity for a chunk to count as relevant.
    pub similarity_threshold: f32,
    /// Maximum length of a section excerpt.
    pub excerpt_length: usize,
    /// Default budget for assembled query context.
    pub context_length: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            max_features: DEFAULT_MAX_FEATURES,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            excerpt_length: DEFAULT_EXCERPT_LENGTH,
            context_length: DEFAULT_CONTEXT_LENGTH,
        }
    }
}

impl EngineConfig {
    /// Create a configuration from environment variables, falling back to
    /// the documented defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        EngineConfig {
            chunk_size: env_usize("CV_CHUNK_SIZE", DEFAULT_CHUNK_SIZE),
            chunk_overlap: env_usize("CV_CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP),
            max_features: env_usize("CV_MAX_FEATURES", DEFAULT_MAX_FEATURES),
            similarity_threshold: env::var("CV_SIMILARITY_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SIMILARITY_THRESHOLD),
            excerpt_length: env_usize("CV_EXCERPT_LENGTH", DEFAULT_EXCERPT_LENGTH),
            context_length: env_usize("CV_CONTEXT_LENGTH", DEFAULT_CONTEXT_LENGTH),
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
