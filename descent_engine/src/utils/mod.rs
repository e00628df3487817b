//! Shared primitive types used by the tokenizer, runtime and diagnostics.

pub mod span;

pub use span::{Position, SourceMap, Span};
