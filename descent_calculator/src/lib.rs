//! # Descent Calculator
//!
//! Arithmetic expressions over `+ - * /` and parentheses, evaluated while
//! parsing. Operator precedence comes from the rule chain:
//!
//! ```text
//! expression               := additionExpression
//! additionExpression       := multiplicationExpression (AdditionOperator multiplicationExpression)*
//! multiplicationExpression := atomicExpression (MultiplicationOperator atomicExpression)*
//! atomicExpression         := parenthesisExpression | NumberLiteral
//! parenthesisExpression    := LParen expression RParen
//! ```

pub mod log_bridge;
pub mod report;

use descent_engine::config::{ParserPreferences, RuntimeConfig, TokenizerPreferences};
use descent_engine::logging::Code;
use descent_engine::{
    Alt, CategoryId, Engine, Group, PipelineError, PipelineResult, Registry, RegistryError, TokenModel,
    TokenModelError, TokenPattern, Tokenizer,
};
use std::sync::Arc;

/// Start rule of the calculator grammar
pub const START_RULE: &str = "expression";

#[derive(Debug, thiserror::Error)]
pub enum CalculatorError {
    #[error("Token model error: {0}")]
    Model(#[from] TokenModelError),

    #[error("Rule registration failed: {0}")]
    Registry(#[from] RegistryError),

    #[error("Engine setup failed: {0}")]
    Pipeline(#[from] PipelineError),
}

impl CalculatorError {
    pub fn error_code(&self) -> Code {
        match self {
            Self::Model(err) => err.error_code(),
            Self::Registry(err) => err.error_code(),
            Self::Pipeline(err) => err.error_code(),
        }
    }
}

/// Category handles of the calculator token model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalculatorTokens {
    pub addition_operator: CategoryId,
    pub plus: CategoryId,
    pub minus: CategoryId,
    pub multiplication_operator: CategoryId,
    pub multi: CategoryId,
    pub div: CategoryId,
    pub lparen: CategoryId,
    pub rparen: CategoryId,
    pub number_literal: CategoryId,
    pub white_space: CategoryId,
}

/// Build the calculator token model.
///
/// The model is returned unfrozen so callers can add categories before
/// handing it to [`Calculator::from_model`].
pub fn token_model() -> Result<(TokenModel, CalculatorTokens), TokenModelError> {
    let mut model = TokenModel::new();

    let white_space = model.define_category("WhiteSpace", None, TokenPattern::regex(r"\s+"), Group::Skipped)?;

    let addition_operator = model.define_category("AdditionOperator", None, TokenPattern::Abstract, Group::Normal)?;
    let plus = model.define_category("Plus", Some(addition_operator), TokenPattern::literal("+"), Group::Normal)?;
    let minus = model.define_category("Minus", Some(addition_operator), TokenPattern::literal("-"), Group::Normal)?;

    let multiplication_operator =
        model.define_category("MultiplicationOperator", None, TokenPattern::Abstract, Group::Normal)?;
    let multi = model.define_category("Multi", Some(multiplication_operator), TokenPattern::literal("*"), Group::Normal)?;
    let div = model.define_category("Div", Some(multiplication_operator), TokenPattern::literal("/"), Group::Normal)?;

    let lparen = model.define_category("LParen", None, TokenPattern::literal("("), Group::Normal)?;
    let rparen = model.define_category("RParen", None, TokenPattern::literal(")"), Group::Normal)?;
    let number_literal = model.define_category("NumberLiteral", None, TokenPattern::regex(r"[1-9]\d*|0"), Group::Normal)?;

    Ok((
        model,
        CalculatorTokens {
            addition_operator,
            plus,
            minus,
            multiplication_operator,
            multi,
            div,
            lparen,
            rparen,
            number_literal,
            white_space,
        },
    ))
}

/// Register the calculator rules
pub fn define_rules(registry: &mut Registry<f64>, t: CalculatorTokens) -> Result<(), RegistryError> {
    registry.define_rule(START_RULE, |s| s.subrule(1, "additionExpression"))?;

    registry.define_rule("additionExpression", move |s| {
        let mut value = s.subrule(1, "multiplicationExpression")?;
        let operations = s.many(1, |s| {
            let op = s.consume(1, t.addition_operator)?;
            let rhs = s.subrule(2, "multiplicationExpression")?;
            Ok((op.category(), rhs))
        })?;
        for (op, rhs) in operations {
            if op == t.plus {
                value += rhs;
            } else {
                value -= rhs;
            }
        }
        Ok(value)
    })?;

    registry.define_rule("multiplicationExpression", move |s| {
        let mut value = s.subrule(1, "atomicExpression")?;
        let operations = s.many(1, |s| {
            let op = s.consume(1, t.multiplication_operator)?;
            let rhs = s.subrule(2, "atomicExpression")?;
            Ok((op.category(), rhs))
        })?;
        for (op, rhs) in operations {
            if op == t.multi {
                value *= rhs;
            } else {
                value /= rhs;
            }
        }
        Ok(value)
    })?;

    registry.define_rule("atomicExpression", move |s| {
        s.or_expecting(
            1,
            "a number or parenthesis expression",
            vec![
                Alt::new(|s| s.subrule(1, "parenthesisExpression")),
                Alt::new(move |s| {
                    let literal = s.consume(1, t.number_literal)?;
                    Ok(s.action(|| literal.image().parse::<f64>().unwrap_or_default()))
                }),
            ],
        )
    })?;

    registry.define_rule("parenthesisExpression", move |s| {
        s.consume(1, t.lparen)?;
        let value = s.subrule(1, START_RULE)?;
        s.consume(1, t.rparen)?;
        Ok(value)
    })?;

    // A number has too many plausible values to invent one
    registry.set_insertion_policy(move |category| category != t.number_literal);

    Ok(())
}

/// Finalized calculator grammar; shareable across threads
#[derive(Debug)]
pub struct Calculator {
    engine: Engine<f64>,
    tokens: CalculatorTokens,
}

impl Calculator {
    pub fn new() -> Result<Self, CalculatorError> {
        Self::with_preferences(TokenizerPreferences::default(), ParserPreferences::default())
    }

    pub fn with_preferences(
        tokenizer_preferences: TokenizerPreferences,
        parser_preferences: ParserPreferences,
    ) -> Result<Self, CalculatorError> {
        let (model, tokens) = token_model()?;
        Self::from_model(model, tokens, tokenizer_preferences, parser_preferences)
    }

    /// Build with the tokenizer and parser sections of a runtime configuration
    pub fn from_config(config: &RuntimeConfig) -> Result<Self, CalculatorError> {
        Self::with_preferences(config.tokenizer.clone(), config.parser.clone())
    }

    /// Build over a model derived from [`token_model`], possibly extended
    pub fn from_model(
        model: TokenModel,
        tokens: CalculatorTokens,
        tokenizer_preferences: TokenizerPreferences,
        parser_preferences: ParserPreferences,
    ) -> Result<Self, CalculatorError> {
        let model = Arc::new(model);
        let tokenizer = Tokenizer::with_preferences(model.clone(), tokenizer_preferences).map_err(PipelineError::from)?;

        let mut registry = Registry::with_preferences(model, parser_preferences);
        define_rules(&mut registry, tokens)?;

        let engine = Engine::new(tokenizer, registry)?;
        Ok(Self { engine, tokens })
    }

    /// Tokenize and evaluate `text`
    pub fn evaluate(&self, text: &str) -> Result<PipelineResult<f64>, PipelineError> {
        self.engine.parse_text(START_RULE, text)
    }

    pub fn engine(&self) -> &Engine<f64> {
        &self.engine
    }

    pub fn tokens(&self) -> &CalculatorTokens {
        &self.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use descent_engine::logging::codes;
    use descent_engine::{DiagnosticSeverity, RecoveryAction, StructuralError};

    fn calculator() -> Calculator {
        Calculator::new().unwrap()
    }

    #[test]
    fn test_evaluates_with_precedence() {
        let calc = calculator();

        for (input, expected) in [("2 * (3 + 4)", 14.0), ("(1 + 3) * 5", 20.0), ("8 / 4 - 1", 1.0), ("0", 0.0)] {
            let result = calc.evaluate(input).unwrap();
            assert_eq!(result.value, expected, "input: {}", input);
            assert!(result.is_clean(), "input: {}", input);
        }
    }

    #[test]
    fn test_precedence_examples() {
        let calc = calculator();
        assert_eq!(calc.evaluate("2 + 3 * 4").unwrap().value, 14.0);
        assert_eq!(calc.evaluate("(2 + 3) * 4").unwrap().value, 20.0);
    }

    #[test]
    fn test_parse_order_independent() {
        let calc = calculator();
        let summarize = |input: &str| {
            let result = calc.evaluate(input).unwrap();
            (result.value, result.syntactic_diagnostics)
        };

        let add_first = (summarize("1+1"), summarize("2*2"), summarize("(3 *"));
        let mul_first = (summarize("2*2"), summarize("(3 *"), summarize("1+1"));

        assert_eq!(add_first.0, mul_first.2);
        assert_eq!(add_first.1, mul_first.0);
        assert_eq!(add_first.2, mul_first.1);
        assert_eq!(add_first.0.0, 2.0);
        assert_eq!(add_first.1.0, 4.0);
        assert!(!add_first.2.1.is_empty());
    }

    #[test]
    fn test_hierarchy_distinguishes_operators() {
        let calc = calculator();
        assert_eq!(calc.evaluate("10 - 2 - 3").unwrap().value, 5.0);
        assert_eq!(calc.evaluate("12 / 2 * 3").unwrap().value, 18.0);
    }

    #[test]
    fn test_unmatched_character_is_lexical() {
        let calc = calculator();
        let result = calc.evaluate("2 + # 3").unwrap();

        assert_eq!(result.value, 5.0);
        assert_eq!(result.lexical_diagnostics.len(), 1);
        assert_eq!(result.lexical_diagnostics[0].code, codes::lexical::UNMATCHED_INPUT);
        assert_eq!(result.lexical_diagnostics[0].offset(), 4);
        assert!(result.syntactic_diagnostics.is_empty());
    }

    #[test]
    fn test_unrelated_token_is_deleted_at_choice() {
        let (mut model, tokens) = token_model().unwrap();
        model
            .define_category("Hash", None, TokenPattern::literal("#"), Group::Normal)
            .unwrap();
        let calc =
            Calculator::from_model(model, tokens, TokenizerPreferences::default(), ParserPreferences::default())
                .unwrap();

        let result = calc.evaluate("2 + # 3").unwrap();
        assert_eq!(result.value, 5.0);
        assert!(result.lexical_diagnostics.is_empty());
        assert_eq!(result.syntactic_diagnostics.len(), 1);
        let diagnostic = &result.syntactic_diagnostics[0];
        assert_eq!(diagnostic.code, codes::syntax::NO_VIABLE_ALTERNATIVE);
        assert_eq!(diagnostic.recovery, RecoveryAction::Deleted);
        assert_eq!(diagnostic.actual.as_ref().unwrap().image(), "#");
    }

    #[test]
    fn test_missing_paren_is_inserted() {
        let calc = calculator();
        let result = calc.evaluate("(2 + 3").unwrap();

        assert_eq!(result.value, 5.0);
        assert_eq!(result.syntactic_diagnostics.len(), 1);
        assert_eq!(result.syntactic_diagnostics[0].recovery, RecoveryAction::Inserted);
        assert_eq!(result.syntactic_diagnostics[0].expected, vec![calc.tokens().rparen]);
    }

    #[test]
    fn test_missing_operand_resyncs() {
        let calc = calculator();
        let result = calc.evaluate("(2 + )").unwrap();

        assert_eq!(result.value, 2.0);
        assert_eq!(result.syntactic_diagnostics.len(), 1);
        let diagnostic = &result.syntactic_diagnostics[0];
        assert_eq!(diagnostic.code, codes::syntax::NO_VIABLE_ALTERNATIVE);
        assert_eq!(diagnostic.severity, DiagnosticSeverity::FatalForAlternative);
        assert_eq!(diagnostic.recovery, RecoveryAction::Resynced { skipped: 0 });
        assert!(diagnostic.message.contains("a number or parenthesis expression"));
    }

    #[test]
    fn test_number_literal_is_never_inserted() {
        let calc = calculator();
        let registry = calc.engine().registry();
        assert!(!registry.can_insert(calc.tokens().number_literal));
        assert!(registry.can_insert(calc.tokens().rparen));
    }

    #[test]
    fn test_left_recursive_grammar_is_rejected() {
        let (model, t) = token_model().unwrap();
        let model = Arc::new(model);
        let mut registry: Registry<f64> = Registry::new(model.clone());
        registry
            .define_rule("additionExpression", move |s| {
                s.or(
                    1,
                    vec![
                        Alt::new(move |s| {
                            let lhs = s.subrule(1, "additionExpression")?;
                            s.consume(1, t.plus)?;
                            let rhs = s.subrule(2, "additionExpression")?;
                            Ok(lhs + rhs)
                        }),
                        Alt::new(move |s| {
                            let literal = s.consume(1, t.number_literal)?;
                            Ok(s.action(|| literal.image().parse::<f64>().unwrap_or_default()))
                        }),
                    ],
                )
            })
            .unwrap();

        let err = Engine::new(Tokenizer::new(model).unwrap(), registry).unwrap_err();
        assert_matches!(
            err,
            PipelineError::Structural(StructuralError::LeftRecursion { ref rule, .. }) if rule == "additionExpression"
        );
        assert_eq!(err.error_code(), codes::analysis::LEFT_RECURSION);
    }

    #[test]
    fn test_decision_tables_are_deterministic() {
        let first = calculator().engine().analysis().unwrap().decision_tables_json().unwrap();
        let second = calculator().engine().analysis().unwrap().decision_tables_json().unwrap();
        assert_eq!(first, second);
        assert!(first.contains("additionExpression.many#1"));
        assert!(first.contains("atomicExpression.or#1"));
    }

    #[test]
    fn test_strict_tokenizer_accepts_calculator_model() {
        let preferences = TokenizerPreferences {
            ensure_optimizations: true,
            ..TokenizerPreferences::default()
        };
        let calc = Calculator::with_preferences(preferences, ParserPreferences::default()).unwrap();
        assert!(calc.engine().tokenizer().is_optimized());
        assert_eq!(calc.evaluate("1 + 1").unwrap().value, 2.0);
    }

    #[test]
    fn test_runtime_config_file_drives_calculator() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            b"[tokenizer]\nensure_optimizations = true\n\n[parser]\nrecovery_enabled = false\nmax_lookahead = 2\n",
        )
        .unwrap();

        let config = RuntimeConfig::load(file.path()).unwrap();
        let calc = Calculator::from_config(&config).unwrap();
        assert!(calc.engine().tokenizer().is_optimized());
        assert_eq!(calc.engine().registry().preferences().max_lookahead, 2);

        let result = calc.evaluate("(2 + 3").unwrap();
        assert_eq!(result.syntactic_diagnostics.len(), 1);
        assert_eq!(result.syntactic_diagnostics[0].code, codes::syntax::MISMATCHED_TOKEN);
        assert_eq!(result.syntactic_diagnostics[0].recovery, RecoveryAction::None);
    }

    #[test]
    fn test_shared_calculator_across_threads() {
        let calc = calculator();
        let inputs = ["1 + 2", "(3 * 4", "5 / )", "6 - 7 * 8"];

        let summarize = |result: PipelineResult<f64>| (result.value, result.syntactic_diagnostics.len());
        let sequential: Vec<_> = inputs
            .iter()
            .map(|input| summarize(calc.evaluate(input).unwrap()))
            .collect();

        let parallel: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = inputs
                .iter()
                .map(|input| {
                    let calc = &calc;
                    scope.spawn(move || summarize(calc.evaluate(input).unwrap()))
                })
                .collect();
            handles.into_iter().map(|handle| handle.join().unwrap()).collect()
        });

        assert_eq!(sequential, parallel);
    }
}
