//! llama.cpp engine for kvchat.
//!
//! [`LlamaRuntime`] owns the backend and the loaded model. Each
//! [`LlamaEngine`] borrows it and owns one context, so the borrow checker
//! guarantees contexts are released before the model they point into.
//!
//! ```ignore
//! let runtime = LlamaRuntime::load(Path::new("model.gguf"), false)?;
//! let engine = runtime.create_engine(&config.context)?;
//! let mut session = Session::new(engine, GreedySampler::new(), config);
//! ```

mod engine;
mod error;
mod runtime;
mod sampler;

pub use engine::LlamaEngine;
pub use error::LlamaError;
pub use runtime::LlamaRuntime;
pub use sampler::GreedySampler;
