//! Core types for Courier.

pub mod message;
pub mod payload;
pub mod run;
pub mod stream;
pub mod turn;

pub use message::*;
pub use payload::{split_structured, FileReference, StructuredPayload, BLOCK_SENTINEL, DELTA_SENTINEL};
pub use run::*;
pub use stream::*;
pub use turn::*;
