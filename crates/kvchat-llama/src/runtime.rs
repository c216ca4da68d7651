//! llama.cpp backend and model ownership.

use std::num::NonZeroU32;
use std::path::Path;

use llama_cpp_2::context::params::LlamaContextParams;
use llama_cpp_2::llama_backend::LlamaBackend;
use llama_cpp_2::model::params::LlamaModelParams;
use llama_cpp_2::model::LlamaModel;
use tracing::{debug, info};

use kvchat_core::ContextParams;

use crate::engine::LlamaEngine;
use crate::error::LlamaError;

/// Loaded model plus the backend it runs on.
///
/// Engines borrow the runtime, so every context is released before the model
/// and backend.
pub struct LlamaRuntime {
    // Declared before `backend` so it is freed first.
    model: LlamaModel,
    backend: LlamaBackend,
}

impl LlamaRuntime {
    /// Initialize the backend and load the model at `path`.
    ///
    /// llama.cpp logging is silenced unless `verbose` is set.
    pub fn load(path: &Path, verbose: bool) -> Result<Self, LlamaError> {
        if !path.exists() {
            return Err(LlamaError::ModelNotFound(path.display().to_string()));
        }

        let mut backend =
            LlamaBackend::init().map_err(|e| LlamaError::BackendInit(e.to_string()))?;
        if !verbose {
            backend.void_logs();
        }

        info!("Loading model {}", path.display());
        let model = LlamaModel::load_from_file(&backend, path, &LlamaModelParams::default())
            .map_err(|e| LlamaError::ModelLoad {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        debug!(n_ctx_train = model.n_ctx_train(), "model loaded");

        Ok(Self { model, backend })
    }

    pub fn model(&self) -> &LlamaModel {
        &self.model
    }

    /// Create a context with the given window, batch and thread settings.
    pub fn create_engine(&self, params: &ContextParams) -> Result<LlamaEngine<'_>, LlamaError> {
        let n_ctx = NonZeroU32::new(params.window_capacity)
            .ok_or_else(|| LlamaError::ContextCreate("context size must be non-zero".to_string()))?;
        let threads = i32::try_from(params.thread_count)
            .map_err(|_| LlamaError::ContextCreate("thread count out of range".to_string()))?;

        let ctx_params = LlamaContextParams::default()
            .with_n_ctx(Some(n_ctx))
            .with_n_batch(params.batch_size)
            .with_n_threads(threads)
            .with_n_threads_batch(threads);

        let ctx = self
            .model
            .new_context(&self.backend, ctx_params)
            .map_err(|e| LlamaError::ContextCreate(e.to_string()))?;

        info!(
            n_ctx = ctx.n_ctx(),
            n_batch = ctx.n_batch(),
            threads,
            "context created"
        );
        Ok(LlamaEngine::new(&self.model, ctx))
    }
}
