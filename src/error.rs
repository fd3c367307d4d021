use thiserror::Error;

use crate::engine::ReadState;

/// A raw line that does not match the recognized log-line grammar.
///
/// Recoverable by design: the caller drops the line and keeps reading.
/// One bad line never terminates the stream or touches buffered traces.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("malformed log line: {line:?}")]
pub struct MalformedLine {
    pub line: String,
}

/// Errors surfaced synchronously by the engine's control surface.
#[derive(Debug, Error)]
pub enum EngineError {
    /// `start`/`stop`/`restart` invoked from a state that does not allow
    /// the transition. Engine state is left untouched.
    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: ReadState,
    },
}
