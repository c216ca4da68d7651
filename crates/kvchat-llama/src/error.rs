//! Error types for llama.cpp startup.

use thiserror::Error;

/// Errors that can occur while acquiring llama.cpp resources.
#[derive(Debug, Error)]
pub enum LlamaError {
    /// The ggml backend could not be initialized.
    #[error("Failed to initialize llama.cpp backend: {0}")]
    BackendInit(String),

    /// Model file does not exist.
    #[error("Model '{0}' not found")]
    ModelNotFound(String),

    /// Model file exists but could not be loaded.
    #[error("Failed to load model {path}: {reason}")]
    ModelLoad { path: String, reason: String },

    /// Context creation failed.
    #[error("Failed to initialize context: {0}")]
    ContextCreate(String),
}
