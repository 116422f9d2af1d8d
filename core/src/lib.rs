// swank-core: server side of the SWANK wire protocol.
// Reader, writer, framing codec, and request dispatch for driving a
// scriptable host runtime from a SLIME client.

pub mod codec;
pub mod eval;
pub mod handlers;
pub mod protocol;
pub mod reader;
pub mod registry;
pub mod value;
pub mod writer;

// Re-export commonly used types
pub use codec::{Encoding, FrameError, SwankCodec};
pub use eval::{EvalError, Evaluator, ImplementationInfo, RhaiEvaluator};
pub use protocol::{
    debug_envelope, ok_envelope, DispatchOutcome, Session, SwankProtocol, CODING_SYSTEMS,
    PROTOCOL_VERSION,
};
pub use reader::{read_str, ReadError, Reader};
pub use registry::{Handler, HandlerError, HandlerRegistry, HandlerResult};
pub use value::Value;
pub use writer::{escape, plist, unescape, write};
