//! Combinator runtime
//!
//! Rule bodies drive a [`ParseSession`] through its combinators:
//!
//! ```ignore
//! registry.define_rule("parenthesis", move |s| {
//!     s.consume(1, lparen)?;
//!     let value = s.subrule(1, "expression")?;
//!     s.consume(1, rparen)?;
//!     Ok(value)
//! })?;
//! ```
//!
//! Every combinator call carries an occurrence index that is unique per kind
//! within its rule, so repeated calls stay distinct decision points. Failures
//! travel as [`RuleFailure`] through `?` and are turned into diagnostics by the
//! recovery controller; `parse` itself only fails when it cannot start.

pub mod error;
mod output;
mod recovery;
mod session;

pub use error::{EngineError, RuleFailure, RuleResult};
pub use output::ParseOutput;
pub use session::{Alt, ParseSession};
