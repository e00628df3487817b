// Internal modules
pub mod analysis;
pub mod config;
pub mod diagnostics;
pub mod grammar;
pub mod lexical;
#[macro_use]
pub mod logging;
pub mod pipeline;
pub mod syntax;
pub mod tokens;
pub mod utils;

// Re-export key types for library consumers
pub use analysis::{GrammarAnalysis, StructuralError};
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSeverity, RecoveryAction};
pub use grammar::{Registry, RegistryError, RuleId};
pub use lexical::{TokenizeOutput, Tokenizer, TokenizerError};
pub use pipeline::{Engine, PipelineError, PipelineResult};
pub use syntax::{Alt, EngineError, ParseOutput, ParseSession, RuleFailure, RuleResult};
pub use tokens::{CategoryId, Group, Token, TokenModel, TokenModelError, TokenPattern, TokenStream};
