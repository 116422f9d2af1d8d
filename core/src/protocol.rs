//! SWANK request dispatch and response envelopes.
//!
//! One `SwankProtocol` per connection. `dispatch` takes a de-framed payload
//! and produces the payload of exactly one response frame: an ok envelope
//! `(:return (:ok VALUE) ID)` on success, a minimal SLDB debug envelope
//! `(:debug 0 1 (MESSAGE nil) () () ID)` on failure. Framing itself is the
//! codec's job on the connection.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::eval::Evaluator;
use crate::reader::Reader;
use crate::registry::HandlerRegistry;
use crate::value::Value;
use crate::writer::write;

/// Protocol version date reported by `connection-info`.
pub const PROTOCOL_VERSION: &str = "2012-07-13";

/// Coding systems offered to the client, in preference order.
pub const CODING_SYSTEMS: [&str; 2] = ["utf-8-unix", "iso-latin-1-unix"];

/// Indentation hints pushed to the client before anything else.
const INDENTATION: [(&str, i64); 9] = [
    ("def", 1),
    ("class", 1),
    ("if", 1),
    ("else", 1),
    ("while", 1),
    ("for", 1),
    ("try", 1),
    ("except", 1),
    ("finally", 1),
];

/// Per-connection state. `package`, `thread` and `id` are whatever the last
/// request carried; the protocol only echoes them, it does not interpret
/// package semantics.
pub struct Session {
    pub package: Value,
    pub thread: Value,
    pub id: i64,
    /// Server-side address of the connection, for `connection-info`.
    pub local_addr: Option<SocketAddr>,
    pub evaluator: Arc<dyn Evaluator>,
}

impl Session {
    pub fn new(evaluator: Arc<dyn Evaluator>) -> Session {
        Session {
            package: Value::Nil,
            thread: Value::T,
            id: 0,
            local_addr: None,
            evaluator,
        }
    }
}

/// What the connection loop should do with a dispatch result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Send the payload; the connection stays open.
    Reply(String),
    /// Send the payload, then close the connection.
    Final(String),
}

impl DispatchOutcome {
    pub fn payload(&self) -> &str {
        match self {
            DispatchOutcome::Reply(p) | DispatchOutcome::Final(p) => p,
        }
    }

    pub fn into_payload(self) -> String {
        match self {
            DispatchOutcome::Reply(p) | DispatchOutcome::Final(p) => p,
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, DispatchOutcome::Final(_))
    }
}

pub struct SwankProtocol {
    session: Session,
    registry: HandlerRegistry,
}

impl SwankProtocol {
    pub fn new(evaluator: Arc<dyn Evaluator>) -> SwankProtocol {
        SwankProtocol::with_registry(evaluator, HandlerRegistry::with_defaults())
    }

    pub fn with_registry(evaluator: Arc<dyn Evaluator>, registry: HandlerRegistry) -> SwankProtocol {
        SwankProtocol {
            session: Session::new(evaluator),
            registry,
        }
    }

    pub fn set_local_addr(&mut self, addr: SocketAddr) {
        self.session.local_addr = Some(addr);
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The unsolicited first frame of every connection.
    pub fn indentation_update() -> String {
        let entries = INDENTATION
            .iter()
            .map(|(name, indent)| Value::cons(Value::symbol(*name), Value::Int(*indent)))
            .collect();
        write(&Value::List(vec![
            Value::symbol(":indentation-update"),
            Value::List(entries),
        ]))
    }

    /// Decode one `:emacs-rex` payload, run its handler, and produce the
    /// response payload. An unreadable payload gets a debug envelope and
    /// closes the connection; every other failure answers in-band and
    /// leaves the connection usable.
    pub fn dispatch(&mut self, payload: &str) -> DispatchOutcome {
        let mut reader = Reader::new(payload);
        let form = match reader.read() {
            Ok(form) => form,
            Err(err) => {
                warn!("unreadable request: {err}");
                return DispatchOutcome::Final(debug_envelope(
                    &format!("request could not be read: {err}"),
                    0,
                ));
            }
        };
        match self.destructure_rex(form) {
            Ok((op, args, package, thread, id)) => {
                self.session.package = package;
                self.session.thread = thread;
                self.session.id = id;
                DispatchOutcome::Reply(self.invoke(&op, &args, id))
            }
            Err((message, id)) => {
                warn!("malformed request: {message}");
                DispatchOutcome::Reply(debug_envelope(&message, id))
            }
        }
    }

    fn invoke(&self, op: &str, args: &[Value], id: i64) -> String {
        let method = op.replace([':', '-'], "_");
        match self.registry.get(&method) {
            Some(handler) => {
                debug!("dispatching {op} as {method}");
                match handler(&self.session, args) {
                    Ok(result) => ok_envelope(result, id),
                    Err(err) => {
                        warn!("{op} failed: {err}");
                        debug_envelope(&err.to_string(), id)
                    }
                }
            }
            None => {
                debug!("unknown operation {op}, answering nil");
                ok_envelope(Value::Nil, id)
            }
        }
    }

    /// Split `( :emacs-rex (OP ARG*) PACKAGE THREAD ID )` into its parts,
    /// unquoting arguments one level. Errors carry the message for the
    /// debug envelope and the best id that could be salvaged (0 otherwise).
    fn destructure_rex(
        &self,
        form: Value,
    ) -> Result<(String, Vec<Value>, Value, Value, i64), (String, i64)> {
        let Value::List(mut items) = form else {
            return Err(("request is not a list".to_string(), 0));
        };
        let salvaged_id = items.last().and_then(Value::as_int).unwrap_or(0);
        if items.len() != 5 {
            return Err((
                format!("expected a five-element :emacs-rex form, got {}", items.len()),
                salvaged_id,
            ));
        }
        let id_value = items.pop().unwrap();
        let thread = items.pop().unwrap();
        let package = items.pop().unwrap();
        let op_form = items.pop().unwrap();
        let tag = items.pop().unwrap();

        if tag.as_symbol() != Some(":emacs-rex") {
            return Err((format!("unexpected request tag {tag}"), salvaged_id));
        }
        let Some(id) = id_value.as_int() else {
            return Err((format!("request id {id_value} is not an integer"), 0));
        };
        let Value::List(mut op_items) = op_form else {
            return Err((format!("operation form {op_form} is not a list"), id));
        };
        if op_items.is_empty() {
            return Err(("operation form is empty".to_string(), id));
        }
        let head = op_items.remove(0);
        let Some(op) = head.as_symbol() else {
            return Err((format!("operation name {head} is not a symbol"), id));
        };
        let op = op.to_string();
        let args = op_items.into_iter().map(Value::unquote).collect();
        Ok((op, args, package, thread, id))
    }
}

/// `(:return (:ok RESULT) ID)`
pub fn ok_envelope(result: Value, id: i64) -> String {
    write(&Value::List(vec![
        Value::symbol(":return"),
        Value::List(vec![Value::symbol(":ok"), result]),
        Value::Int(id),
    ]))
}

/// `(:debug 0 1 (MESSAGE nil) () () ID)`, the smallest SLDB frame a
/// client will render.
pub fn debug_envelope(message: &str, id: i64) -> String {
    write(&Value::List(vec![
        Value::symbol(":debug"),
        Value::Int(0),
        Value::Int(1),
        Value::List(vec![Value::string(message), Value::Nil]),
        Value::List(vec![]),
        Value::List(vec![]),
        Value::Int(id),
    ]))
}
