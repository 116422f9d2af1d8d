//! Name-to-handler table for SWANK operations.
//!
//! Keys are the dispatcher's canonical method names: the operation symbol
//! with `:` and `-` replaced by `_` (`swank:simple-completions` becomes
//! `swank_simple_completions`). The table is built once at startup and
//! treated as immutable afterwards; it is enumerable so the daemon can log
//! what it serves.

use std::collections::HashMap;

use thiserror::Error;

use crate::eval::EvalError;
use crate::handlers;
use crate::protocol::Session;
use crate::value::Value;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error("operation is missing argument {0}")]
    MissingArgument(usize),
    #[error("operation expects a {1} for argument {0}")]
    BadArgument(usize, &'static str),
}

pub type HandlerResult = Result<Value, HandlerError>;

/// Handlers take the connection session and the already-decoded, unquoted
/// arguments of the operation form.
pub type Handler = Box<dyn Fn(&Session, &[Value]) -> HandlerResult + Send + Sync>;

pub struct HandlerRegistry {
    handlers: HashMap<String, Handler>,
}

impl HandlerRegistry {
    pub fn new() -> HandlerRegistry {
        HandlerRegistry {
            handlers: HashMap::new(),
        }
    }

    /// Registry with the full default surface: connection-info, the
    /// evaluation family, simple-completions, and `nil` stubs for the rest
    /// of the SWANK operations a SLIME client may issue.
    pub fn with_defaults() -> HandlerRegistry {
        let mut registry = HandlerRegistry::new();

        registry.register("swank_connection_info", handlers::connection_info);
        registry.register("swank_interactive_eval", handlers::interactive_eval);
        registry.register("swank_interactive_eval_region", handlers::interactive_eval);
        registry.register("swank_pprint_eval", handlers::interactive_eval);
        registry.register("swank_eval", handlers::interactive_eval);
        registry.register("swank_simple_completions", handlers::simple_completions);

        for op in handlers::STUB_OPS {
            registry.register(op, |_session: &Session, _args: &[Value]| Ok(Value::Nil));
        }

        registry
    }

    pub fn register<F>(&mut self, name: &str, handler: F)
    where
        F: Fn(&Session, &[Value]) -> HandlerResult + Send + Sync + 'static,
    {
        self.handlers.insert(name.to_string(), Box::new(handler));
    }

    pub fn get(&self, name: &str) -> Option<&Handler> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered method names, sorted for stable diagnostics.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for HandlerRegistry {
    fn default() -> HandlerRegistry {
        HandlerRegistry::with_defaults()
    }
}
