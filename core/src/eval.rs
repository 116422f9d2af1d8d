//! Evaluator capability behind the evaluation handlers.
//!
//! The dispatcher treats evaluation as opaque: hand it a source string, get
//! back display text or an error message. The trait also supplies the
//! identity block for `connection-info` and the candidates for
//! `simple-completions`, so the protocol layer stays host-agnostic.

use parking_lot::Mutex;
use rhai::{Dynamic, Engine, Scope};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct EvalError {
    pub message: String,
}

impl EvalError {
    pub fn new(message: impl Into<String>) -> EvalError {
        EvalError {
            message: message.into(),
        }
    }
}

impl From<String> for EvalError {
    fn from(message: String) -> EvalError {
        EvalError { message }
    }
}

/// Identity the backend reports in `connection-info`.
#[derive(Debug, Clone)]
pub struct ImplementationInfo {
    /// `:lisp-implementation :type`, conventionally uppercase.
    pub kind: String,
    pub name: String,
    pub version: String,
    /// `:lisp-implementation :program`; `nil` when unset.
    pub program: Option<String>,
    /// `:package :name`.
    pub package: String,
    /// REPL prompt, also sent as `:package :prompt`.
    pub prompt: String,
}

pub trait Evaluator: Send + Sync {
    /// Execute `source` and return display text for the client.
    fn eval(&self, source: &str) -> Result<String, EvalError>;

    /// Completion candidates for `prefix`.
    fn complete(&self, prefix: &str) -> Vec<String>;

    fn implementation(&self) -> ImplementationInfo;
}

/// Language keywords offered to completion alongside scope contents.
const RHAI_KEYWORDS: &[&str] = &[
    "break", "catch", "const", "continue", "do", "else", "export", "false", "fn", "for", "if",
    "import", "in", "let", "loop", "private", "return", "switch", "throw", "true", "try", "until",
    "while",
];

/// Evaluator backed by an embedded rhai engine.
///
/// One engine and one scope live for the whole process, so definitions
/// persist across requests and are visible to every connection and to the
/// console REPL. The scope lock serialises concurrent evaluations.
pub struct RhaiEvaluator {
    engine: Engine,
    scope: Mutex<Scope<'static>>,
}

impl RhaiEvaluator {
    pub fn new() -> RhaiEvaluator {
        RhaiEvaluator {
            engine: Engine::new(),
            scope: Mutex::new(Scope::new()),
        }
    }
}

impl Default for RhaiEvaluator {
    fn default() -> RhaiEvaluator {
        RhaiEvaluator::new()
    }
}

impl Evaluator for RhaiEvaluator {
    fn eval(&self, source: &str) -> Result<String, EvalError> {
        let mut scope = self.scope.lock();
        match self.engine.eval_with_scope::<Dynamic>(&mut scope, source) {
            Ok(value) if value.is_unit() => Ok("()".to_string()),
            Ok(value) => Ok(value.to_string()),
            Err(err) => {
                debug!("evaluation failed: {err}");
                Err(EvalError::new(err.to_string()))
            }
        }
    }

    fn complete(&self, prefix: &str) -> Vec<String> {
        let scope = self.scope.lock();
        let mut matches: Vec<String> = scope
            .iter_raw()
            .map(|(name, _, _)| name.to_string())
            .chain(RHAI_KEYWORDS.iter().map(|kw| kw.to_string()))
            .filter(|candidate| candidate.starts_with(prefix))
            .collect();
        matches.sort();
        matches.dedup();
        matches
    }

    fn implementation(&self) -> ImplementationInfo {
        ImplementationInfo {
            kind: "RHAI".to_string(),
            name: "rhai".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            program: None,
            package: "rhai".to_string(),
            prompt: "rhai> ".to_string(),
        }
    }
}
