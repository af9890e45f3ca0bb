//! Base vocabulary for the weft toolchain: canonical tag identifiers, parsed
//! document events, the open-ancestor path, and the document lexer that
//! produces the event stream.

pub mod lexer;
pub mod types;

pub use lexer::{LexError, Lexer};
pub use types::{Event, EventKind, Path, TagId, TagResolver};
