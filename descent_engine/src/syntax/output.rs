use crate::diagnostics::Diagnostic;

/// Best-effort value of a parse plus everything that went wrong on the way
#[derive(Debug, Clone)]
pub struct ParseOutput<V> {
    pub value: V,
    pub lexical_diagnostics: Vec<Diagnostic>,
    pub syntactic_diagnostics: Vec<Diagnostic>,
    /// Syntax diagnostics dropped after the cap was reached
    pub suppressed_diagnostics: usize,
}

impl<V> ParseOutput<V> {
    /// No diagnostics of either kind
    pub fn is_clean(&self) -> bool {
        self.lexical_diagnostics.is_empty() && self.syntactic_diagnostics.is_empty()
    }

    /// Lexical diagnostics first, then syntactic
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.lexical_diagnostics
            .iter()
            .chain(self.syntactic_diagnostics.iter())
    }

    pub fn diagnostic_count(&self) -> usize {
        self.lexical_diagnostics.len() + self.syntactic_diagnostics.len()
    }
}
