//! Session configuration.

use crate::engine::ContextParams;
use crate::error::ConfigError;
use crate::response::DEFAULT_RESPONSE_CAPACITY;

/// Configuration for a chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Engine context parameters
    pub context: ContextParams,
    /// Reply bytes kept in the transcript per turn
    pub response_capacity: usize,
    /// Optional cap on generated tokens per turn
    pub max_new_tokens: Option<usize>,
    /// Keep the session going after errors raised before prefill
    pub recover_turn_errors: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            context: ContextParams::default(),
            response_capacity: DEFAULT_RESPONSE_CAPACITY,
            max_new_tokens: None,
            recover_turn_errors: true,
        }
    }
}

impl SessionConfig {
    /// Create config from environment variables.
    ///
    /// Unset or unparsable variables keep their default. The batch size
    /// follows the window capacity unless `KVCHAT_BATCH` is set.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let window_capacity = env_parse("KVCHAT_CTX").unwrap_or(defaults.context.window_capacity);
        let batch_size = env_parse("KVCHAT_BATCH").unwrap_or(window_capacity);
        let thread_count = env_parse("KVCHAT_THREADS").unwrap_or(defaults.context.thread_count);

        let response_capacity =
            env_parse("KVCHAT_RESPONSE_CAPACITY").unwrap_or(defaults.response_capacity);
        let max_new_tokens = env_parse("KVCHAT_N_PREDICT");

        Self {
            context: ContextParams {
                window_capacity,
                batch_size,
                thread_count,
            },
            response_capacity,
            max_new_tokens,
            recover_turn_errors: defaults.recover_turn_errors,
        }
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ContextParams {
            window_capacity,
            batch_size,
            thread_count,
        } = self.context;

        if window_capacity == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if batch_size == 0 {
            return Err(ConfigError::ZeroBatch);
        }
        if batch_size > window_capacity {
            return Err(ConfigError::BatchExceedsWindow {
                batch: batch_size,
                window: window_capacity,
            });
        }
        if thread_count == 0 {
            return Err(ConfigError::ZeroThreads);
        }
        if self.response_capacity == 0 {
            return Err(ConfigError::ZeroResponseCapacity);
        }
        if self.max_new_tokens == Some(0) {
            return Err(ConfigError::ZeroTokenCap);
        }
        Ok(())
    }

    /// Create a builder for configuration.
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Builder for session configuration.
#[derive(Debug, Default)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    /// Start from an existing configuration, e.g. [`SessionConfig::from_env`].
    pub fn from_config(config: SessionConfig) -> Self {
        Self { config }
    }

    pub fn window_capacity(mut self, n_ctx: u32) -> Self {
        self.config.context.window_capacity = n_ctx;
        self
    }

    pub fn batch_size(mut self, n_batch: u32) -> Self {
        self.config.context.batch_size = n_batch;
        self
    }

    pub fn thread_count(mut self, threads: u32) -> Self {
        self.config.context.thread_count = threads;
        self
    }

    pub fn response_capacity(mut self, bytes: usize) -> Self {
        self.config.response_capacity = bytes;
        self
    }

    pub fn max_new_tokens(mut self, tokens: Option<usize>) -> Self {
        self.config.max_new_tokens = tokens;
        self
    }

    pub fn recover_turn_errors(mut self, recover: bool) -> Self {
        self.config.recover_turn_errors = recover;
        self
    }

    pub fn build(self) -> SessionConfig {
        self.config
    }
}
