use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Responses longer than this must carry a medical disclaimer.
const DISCLAIMER_MIN_LEN: usize = 200;

const EMPTY_INPUT_REASON: &str = "Empty input";
const EMPTY_OUTPUT_REASON: &str = "Empty output";
const HARMFUL_INPUT_REASON: &str = "Input contains potentially harmful content";
const HARMFUL_OUTPUT_REASON: &str = "Output contains potentially harmful content";
const MISSING_DISCLAIMER_REASON: &str = "Response missing appropriate medical disclaimer";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

/// One content-policy rule: a named regex predicate with the reason surfaced
/// when it fires. Rules are independently testable and applied in order.
struct PolicyRule {
    name: &'static str,
    pattern: Regex,
}

fn harmful_rules() -> &'static [PolicyRule] {
    static RULES: OnceLock<Vec<PolicyRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            ("hacking", r"(?i)\b(hack|exploit|bypass|steal)\b"),
            (
                "illegal_drugs",
                r"(?i)\b(illegal|unlawful)\b.*\b(drugs?|substances?)\b",
            ),
            ("self_harm", r"(?i)\b(suicide|self-harm)\b"),
            (
                "weapons",
                r"(?i)\b(instructions|how to).*\b(weapons?|bombs?|explosives?)\b",
            ),
            (
                "exploitation",
                r"(?i)\b(child|minor).*\b(explicit|pornography|sexual)\b",
            ),
        ]
        .into_iter()
        .map(|(name, pattern)| PolicyRule {
            name,
            pattern: Regex::new(pattern).expect("hardcoded regex"),
        })
        .collect()
    })
}

fn disclaimer_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)not (a|an).*substitute for.*medical.*advice",
            r"(?i)consult.*healthcare.*provider",
            r"(?i)for educational purposes",
        ]
        .into_iter()
        .map(|pattern| Regex::new(pattern).expect("hardcoded regex"))
        .collect()
    })
}

fn first_harmful_match(text: &str) -> Option<&'static str> {
    harmful_rules()
        .iter()
        .find(|rule| rule.pattern.is_match(text))
        .map(|rule| rule.name)
}

fn has_disclaimer(text: &str) -> bool {
    disclaimer_patterns()
        .iter()
        .any(|pattern| pattern.is_match(text))
}

/// Stateless regex gate applied to both user input and generated output.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafetyValidator;

impl SafetyValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_input(&self, text: &str) -> ValidationResult {
        if text.trim().is_empty() {
            return ValidationResult::invalid(EMPTY_INPUT_REASON);
        }

        if let Some(rule) = first_harmful_match(text) {
            tracing::warn!(rule, "Harmful content detected in input: {:.50}", text);
            return ValidationResult::invalid(HARMFUL_INPUT_REASON);
        }

        ValidationResult::valid()
    }

    pub fn validate_output(&self, text: &str) -> ValidationResult {
        if text.trim().is_empty() {
            return ValidationResult::invalid(EMPTY_OUTPUT_REASON);
        }

        if text.chars().count() > DISCLAIMER_MIN_LEN && !has_disclaimer(text) {
            tracing::warn!("Response missing appropriate medical disclaimer");
            return ValidationResult::invalid(MISSING_DISCLAIMER_REASON);
        }

        if let Some(rule) = first_harmful_match(text) {
            tracing::warn!(rule, "Harmful content detected in output: {:.50}", text);
            return ValidationResult::invalid(HARMFUL_OUTPUT_REASON);
        }

        ValidationResult::valid()
    }
}
