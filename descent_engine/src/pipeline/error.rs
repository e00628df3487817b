use crate::analysis::StructuralError;
use crate::lexical::TokenizerError;
use crate::logging::{codes, Code};
use crate::syntax::EngineError;

/// Pipeline processing errors
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Tokenizer setup failed: {0}")]
    Tokenizer(#[from] TokenizerError),

    #[error("Grammar analysis failed: {0}")]
    Structural(#[from] StructuralError),

    #[error("Parse could not start: {0}")]
    Engine(#[from] EngineError),

    #[error("Tokenizer and registry were built from different token models")]
    ModelMismatch,
}

impl PipelineError {
    pub fn error_code(&self) -> Code {
        match self {
            Self::Tokenizer(err) => err.error_code(),
            Self::Structural(err) => err.error_code(),
            Self::Engine(err) => err.error_code(),
            Self::ModelMismatch => codes::system::CONFIGURATION_ERROR,
        }
    }
}
