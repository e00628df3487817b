//! Grammar definition
//!
//! - [`Registry`] holds named rule bodies and caches the grammar analysis
//! - [`gast`] is the recorded form of a rule body that analysis works on

pub mod gast;
pub(crate) mod recorder;
pub mod registry;

pub use gast::{Alternative, DecisionKey, DecisionKind, Production, RuleGast, RuleId};
pub use registry::{InsertionPolicy, Registry, RegistryError, RuleBody};
