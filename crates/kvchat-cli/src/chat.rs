//! Chat command - load the model and talk to it.

use std::io::Write;
use std::path::Path;

use kvchat_core::{Engine, LineSource, Sampler, Session, SessionConfig};
use tracing::{debug, info};

/// Load the model, create the session and run it to completion.
#[cfg(feature = "llama")]
pub(crate) fn run(
    model: &Path,
    prompt: Option<&str>,
    config: SessionConfig,
    verbose: bool,
    lines: &mut dyn LineSource,
    out: &mut dyn Write,
) -> miette::Result<()> {
    use kvchat_llama::{GreedySampler, LlamaRuntime};

    let runtime =
        LlamaRuntime::load(model, verbose).map_err(|e| miette::miette!("{}", e))?;
    let engine = runtime
        .create_engine(&config.context)
        .map_err(|e| miette::miette!("{}", e))?;

    let mut session = Session::new(engine, GreedySampler::new(), config);
    drive(&mut session, prompt, lines, out)
}

#[cfg(not(feature = "llama"))]
pub(crate) fn run(
    model: &Path,
    _prompt: Option<&str>,
    _config: SessionConfig,
    _verbose: bool,
    _lines: &mut dyn LineSource,
    _out: &mut dyn Write,
) -> miette::Result<()> {
    Err(miette::miette!(
        "Cannot load {}: kvchat was built without the llama.cpp engine. Rebuild with `--features llama`",
        model.display()
    ))
}

/// Run a single turn for `prompt`, or the interactive loop when there is none.
#[cfg_attr(not(feature = "llama"), allow(dead_code))]
pub(crate) fn drive<E, S>(
    session: &mut Session<E, S>,
    prompt: Option<&str>,
    lines: &mut dyn LineSource,
    out: &mut dyn Write,
) -> miette::Result<()>
where
    E: Engine,
    S: Sampler<E>,
{
    match prompt {
        Some(text) => {
            let report = session
                .turn(text, out)
                .map_err(|e| miette::miette!("Turn failed: {}", e))?;
            debug!(?report, "one-shot turn finished");
        }
        None => {
            let end = session
                .run(lines, out)
                .map_err(|e| miette::miette!("Session failed: {}", e))?;
            info!(?end, transcript_len = session.transcript().len(), "session ended");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvchat_core::{EngineError, TokenId};
    use std::io;

    /// Engine that fails the test if the session touches it.
    struct UntouchedEngine;

    impl Engine for UntouchedEngine {
        fn size_tokenize(&self, _: &str, _: bool) -> Result<usize, EngineError> {
            panic!("tokenized")
        }

        fn fill_tokenize(&self, _: &str, _: bool, _: &mut [TokenId]) -> Result<usize, EngineError> {
            panic!("tokenized")
        }

        fn decode(&mut self, _: &[TokenId]) -> Result<(), EngineError> {
            panic!("decoded")
        }

        fn token_to_piece(&self, _: TokenId) -> Result<Vec<u8>, EngineError> {
            panic!("converted")
        }

        fn is_end_of_generation(&self, _: TokenId) -> bool {
            panic!("sampled")
        }

        fn cached_len(&self) -> usize {
            panic!("budget checked")
        }

        fn window_capacity(&self) -> usize {
            panic!("budget checked")
        }
    }

    struct NoSampler;

    impl Sampler<UntouchedEngine> for NoSampler {
        fn sample(&mut self, _: &UntouchedEngine) -> TokenId {
            panic!("sampled")
        }
    }

    struct Script(Vec<&'static str>);

    impl LineSource for Script {
        fn read_line(&mut self) -> io::Result<Option<String>> {
            if self.0.is_empty() {
                Ok(None)
            } else {
                Ok(Some(self.0.remove(0).to_string()))
            }
        }
    }

    #[test]
    fn test_exit_ends_session_without_turn() {
        let mut session = Session::new(UntouchedEngine, NoSampler, SessionConfig::default());
        let mut lines = Script(vec!["\n", "exit\n", "never read\n"]);
        let mut out = Vec::new();

        drive(&mut session, None, &mut lines, &mut out).unwrap();

        assert!(session.transcript().is_empty());
        assert_eq!(lines.0, vec!["never read\n"]);
        assert!(out.is_empty());
    }

    #[test]
    fn test_end_of_input_is_clean_exit() {
        let mut session = Session::new(UntouchedEngine, NoSampler, SessionConfig::default());
        let mut lines = Script(vec![]);
        let mut out = Vec::new();

        assert!(drive(&mut session, None, &mut lines, &mut out).is_ok());
    }
}
