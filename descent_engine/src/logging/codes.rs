//! Consolidated diagnostic and event codes
//!
//! Single source of truth for every code emitted by the engine together with
//! its behavioral metadata.

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// CODE WRAPPER TYPE
// ============================================================================

/// Universal code wrapper for error, warning and success codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Code(&'static str);

impl Code {
    pub const fn new(code: &'static str) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl serde::Serialize for Code {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

// ============================================================================
// CLASSIFICATION TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Critical = 0,
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

/// Complete metadata for a code
#[derive(Debug, Clone)]
pub struct ErrorMetadata {
    pub code: &'static str,
    pub category: &'static str,
    pub severity: Severity,
    pub recoverable: bool,
    pub requires_halt: bool,
    pub description: &'static str,
    pub recommended_action: &'static str,
}

impl ErrorMetadata {
    pub fn new(
        code: &'static str,
        category: &'static str,
        severity: Severity,
        recoverable: bool,
        requires_halt: bool,
        description: &'static str,
        recommended_action: &'static str,
    ) -> Self {
        Self {
            code,
            category,
            severity,
            recoverable,
            requires_halt,
            description,
            recommended_action,
        }
    }
}

// ============================================================================
// CODE CONSTANTS
// ============================================================================

pub mod system {
    use super::Code;

    pub const INTERNAL_ERROR: Code = Code::new("ERR001");
    pub const INITIALIZATION_FAILURE: Code = Code::new("ERR002");
    pub const CONFIGURATION_ERROR: Code = Code::new("ERR003");
}

/// Token model definition errors
pub mod model {
    use super::Code;

    pub const DUPLICATE_CATEGORY: Code = Code::new("E010");
    pub const INVALID_HIERARCHY: Code = Code::new("E011");
    pub const INVALID_PATTERN: Code = Code::new("E012");
    pub const ABSTRACT_WITHOUT_DESCENDANT: Code = Code::new("E013");
}

/// Tokenizer codes
pub mod lexical {
    use super::Code;

    pub const UNMATCHED_INPUT: Code = Code::new("E020");
    pub const OPTIMIZATION_UNAVAILABLE: Code = Code::new("E021");
    pub const TOO_MANY_TOKENS: Code = Code::new("E027");
}

/// Rule registry and runtime codes
pub mod syntax {
    use super::Code;

    pub const TOO_MANY_RULES: Code = Code::new("E038");
    pub const DUPLICATE_RULE: Code = Code::new("E039");
    pub const MISMATCHED_TOKEN: Code = Code::new("E040");
    pub const NO_VIABLE_ALTERNATIVE: Code = Code::new("E041");
    pub const EARLY_EXIT: Code = Code::new("E042");
    pub const NOT_ALL_INPUT_PARSED: Code = Code::new("E045");
    pub const RECURSION_LIMIT: Code = Code::new("E047");
    pub const NOT_FINALIZED: Code = Code::new("E048");
    pub const UNKNOWN_RULE_NAME: Code = Code::new("E049");
}

/// Self-analysis codes
pub mod analysis {
    use super::Code;

    pub const LEFT_RECURSION: Code = Code::new("E060");
    pub const UNKNOWN_RULE: Code = Code::new("E061");
    pub const DUPLICATE_OCCURRENCE: Code = Code::new("E062");
    pub const UNRESOLVED_HIERARCHY: Code = Code::new("E063");
    pub const RECORDING_FAILED: Code = Code::new("E064");

    pub const AMBIGUOUS_DECISION: Code = Code::new("W050");
    pub const PATH_LIMIT_REACHED: Code = Code::new("W051");
}

pub mod success {
    use super::Code;

    pub const SYSTEM_INITIALIZATION_COMPLETED: Code = Code::new("I001");
    pub const TOKENIZER_READY: Code = Code::new("I010");
    pub const TOKENIZATION_COMPLETE: Code = Code::new("I020");
    pub const ANALYSIS_COMPLETE: Code = Code::new("I030");
    pub const PARSE_COMPLETE: Code = Code::new("I040");
    pub const PIPELINE_COMPLETE: Code = Code::new("I050");
}

// ============================================================================
// METADATA REGISTRY
// ============================================================================

static ERROR_REGISTRY: OnceLock<HashMap<&'static str, ErrorMetadata>> = OnceLock::new();

fn get_error_registry() -> &'static HashMap<&'static str, ErrorMetadata> {
    ERROR_REGISTRY.get_or_init(|| {
        let mut registry = HashMap::new();
        let mut add = |metadata: ErrorMetadata| {
            registry.insert(metadata.code, metadata);
        };

        // System
        add(ErrorMetadata::new(
            "ERR001",
            "System",
            Severity::Critical,
            false,
            true,
            "Critical internal engine error",
            "File a bug report with the grammar and input that triggered it",
        ));
        add(ErrorMetadata::new(
            "ERR002",
            "System",
            Severity::Critical,
            false,
            true,
            "Logging or engine initialization failure",
            "Check that initialization runs once per process",
        ));
        add(ErrorMetadata::new(
            "ERR003",
            "System",
            Severity::High,
            false,
            true,
            "Runtime configuration could not be loaded",
            "Check the configuration file and DESCENT_* environment variables",
        ));

        // Token model
        add(ErrorMetadata::new(
            "E010",
            "TokenModel",
            Severity::High,
            false,
            true,
            "Token category name registered twice",
            "Give every token category a unique name",
        ));
        add(ErrorMetadata::new(
            "E011",
            "TokenModel",
            Severity::High,
            false,
            true,
            "Token category parent is unknown or forms a cycle",
            "Define parent categories before their children",
        ));
        add(ErrorMetadata::new(
            "E012",
            "TokenModel",
            Severity::High,
            false,
            true,
            "Token category pattern is not a valid regular expression",
            "Fix the pattern syntax",
        ));
        add(ErrorMetadata::new(
            "E013",
            "TokenModel",
            Severity::High,
            false,
            true,
            "Abstract token category has no concrete descendant",
            "Add a category with a real pattern below the abstract one",
        ));

        // Lexical
        add(ErrorMetadata::new(
            "E020",
            "Lexical",
            Severity::Medium,
            true,
            false,
            "Input text matched no token category",
            "Remove the character or add a category that matches it",
        ));
        add(ErrorMetadata::new(
            "E021",
            "Lexical",
            Severity::High,
            false,
            true,
            "First-character dispatch table could not be built in strict mode",
            "Attach explicit leading characters to the listed categories",
        ));
        add(ErrorMetadata::new(
            "E027",
            "Lexical",
            Severity::High,
            false,
            false,
            "Token count limit exceeded; tokenization stopped",
            "Split the input or raise max_token_count in the build profile",
        ));

        // Syntax
        add(ErrorMetadata::new(
            "E038",
            "Syntax",
            Severity::High,
            false,
            true,
            "Registry holds the maximum number of rules",
            "Raise max_rules in the build profile or split the grammar",
        ));
        add(ErrorMetadata::new(
            "E039",
            "Syntax",
            Severity::High,
            false,
            true,
            "Grammar rule name registered twice",
            "Remove the existing rule before redefining it",
        ));
        add(ErrorMetadata::new(
            "E040",
            "Syntax",
            Severity::Medium,
            true,
            false,
            "Token did not match the expected category",
            "Check the input near the reported position",
        ));
        add(ErrorMetadata::new(
            "E041",
            "Syntax",
            Severity::Medium,
            true,
            false,
            "No alternative of a choice matches the lookahead",
            "Check the input near the reported position",
        ));
        add(ErrorMetadata::new(
            "E042",
            "Syntax",
            Severity::Medium,
            true,
            false,
            "Repetition requiring at least one iteration found none",
            "Check the input near the reported position",
        ));
        add(ErrorMetadata::new(
            "E045",
            "Syntax",
            Severity::Medium,
            true,
            false,
            "Start rule finished before the end of input",
            "Remove trailing input or extend the start rule",
        ));
        add(ErrorMetadata::new(
            "E047",
            "Syntax",
            Severity::High,
            false,
            false,
            "Rule call depth limit exceeded",
            "Reduce input nesting or raise max_parse_depth in the build profile",
        ));
        add(ErrorMetadata::new(
            "E048",
            "Syntax",
            Severity::High,
            false,
            true,
            "Parse attempted on a registry that is not finalized",
            "Call finalize() after defining rules",
        ));
        add(ErrorMetadata::new(
            "E049",
            "Syntax",
            Severity::High,
            false,
            true,
            "Rule name is not defined in the registry",
            "Check the rule name or define the rule first",
        ));

        // Analysis
        add(ErrorMetadata::new(
            "E060",
            "Analysis",
            Severity::Critical,
            false,
            true,
            "Grammar rule is left recursive",
            "Rewrite the rule with a repetition instead of left recursion",
        ));
        add(ErrorMetadata::new(
            "E061",
            "Analysis",
            Severity::Critical,
            false,
            true,
            "Grammar rule calls an undefined rule",
            "Define the called rule or fix the name",
        ));
        add(ErrorMetadata::new(
            "E062",
            "Analysis",
            Severity::Critical,
            false,
            true,
            "Two productions in one rule share a kind and occurrence index",
            "Give each repeated production its own occurrence index",
        ));
        add(ErrorMetadata::new(
            "E063",
            "Analysis",
            Severity::Critical,
            false,
            true,
            "Token category hierarchy is unresolved",
            "Give abstract categories concrete descendants",
        ));
        add(ErrorMetadata::new(
            "E064",
            "Analysis",
            Severity::Critical,
            false,
            true,
            "A rule body failed while its structure was being recorded",
            "Keep semantic actions inside action() so recording does not run them",
        ));
        add(ErrorMetadata::new(
            "W050",
            "Analysis",
            Severity::Low,
            true,
            false,
            "Decision alternatives overlap at the lookahead ceiling; first alternative wins",
            "Reorder alternatives, add a gate, or raise max_lookahead",
        ));
        add(ErrorMetadata::new(
            "W051",
            "Analysis",
            Severity::Low,
            true,
            false,
            "Lookahead path limit reached for a decision",
            "Simplify the decision or raise max_paths_per_decision",
        ));

        registry
    })
}

// ============================================================================
// CLASSIFICATION FUNCTIONS
// ============================================================================

pub fn get_error_metadata(code: &str) -> Option<&'static ErrorMetadata> {
    get_error_registry().get(code)
}

pub fn get_severity(code: &str) -> Severity {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.severity)
        .unwrap_or(Severity::Medium)
}

pub fn is_recoverable(code: &str) -> bool {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.recoverable)
        .unwrap_or(true)
}

pub fn requires_halt(code: &str) -> bool {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.requires_halt)
        .unwrap_or(false)
}

/// Get human-readable description for a code
pub fn get_description(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.description)
        .unwrap_or("Unknown error")
}

pub fn get_action(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.recommended_action)
        .unwrap_or("No specific action available")
}

pub fn get_category(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.category)
        .unwrap_or("Unknown")
}
