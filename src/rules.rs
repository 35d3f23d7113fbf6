//! Pattern rules and the AND-combining rule engine.
//!
//! A [`Rule`] pairs a compiled matcher with a [`MatchSemantics`] flag that
//! says which direction a match points. A [`RuleEngine`] evaluates its rules
//! in insertion order and stops at the first rule that reports a value as
//! invalid.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::RuleError;

/// Direction of a rule: does a pattern match make the value valid or invalid?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchSemantics {
    MatchMeansValid,
    MatchMeansInvalid,
}

impl MatchSemantics {
    /// Short keyword used by config files and `--show-config`.
    pub fn keyword(self) -> &'static str {
        match self {
            MatchSemantics::MatchMeansValid => "accept",
            MatchSemantics::MatchMeansInvalid => "reject",
        }
    }
}

impl fmt::Display for MatchSemantics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for MatchSemantics {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accept" | "valid" | "match-means-valid" => Ok(MatchSemantics::MatchMeansValid),
            "reject" | "invalid" | "match-means-invalid" => Ok(MatchSemantics::MatchMeansInvalid),
            other => Err(RuleError::UnknownSemantics(other.to_string())),
        }
    }
}

/// Anything that can answer "does this value match?".
///
/// Implementations must be pure: the engine is shared across worker threads
/// without locking and relies on repeated calls giving the same answer.
pub trait Matcher: Send + Sync {
    fn is_match(&self, value: &str) -> bool;

    /// Source text of the pattern, for diagnostics.
    fn pattern(&self) -> &str;
}

impl Matcher for Regex {
    fn is_match(&self, value: &str) -> bool {
        Regex::is_match(self, value)
    }

    fn pattern(&self) -> &str {
        self.as_str()
    }
}

/// A single pattern test plus its match semantics. Immutable once built.
pub struct Rule {
    matcher: Box<dyn Matcher>,
    semantics: MatchSemantics,
}

impl Rule {
    pub fn new<M: Matcher + 'static>(matcher: M, semantics: MatchSemantics) -> Self {
        Self {
            matcher: Box::new(matcher),
            semantics,
        }
    }

    /// Compile `pattern` as a regex. Bad patterns fail here, never at evaluation.
    pub fn from_pattern(pattern: &str, semantics: MatchSemantics) -> Result<Self, RuleError> {
        let regex = Regex::new(pattern).map_err(|source| RuleError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self::new(regex, semantics))
    }

    pub fn semantics(&self) -> MatchSemantics {
        self.semantics
    }

    pub fn pattern(&self) -> &str {
        self.matcher.pattern()
    }

    /// Contribution of this rule to the verdict for `value`.
    ///
    /// | matched | semantics         | result  |
    /// |---------|-------------------|---------|
    /// | true    | MatchMeansValid   | valid   |
    /// | true    | MatchMeansInvalid | invalid |
    /// | false   | MatchMeansValid   | invalid |
    /// | false   | MatchMeansInvalid | valid   |
    pub fn evaluate(&self, value: &str) -> bool {
        let matched = self.matcher.is_match(value);
        match self.semantics {
            MatchSemantics::MatchMeansValid => matched,
            MatchSemantics::MatchMeansInvalid => !matched,
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("pattern", &self.pattern())
            .field("semantics", &self.semantics)
            .finish()
    }
}

/// Configuration form of a rule, before compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleSpec {
    pub pattern: String,
    pub semantics: MatchSemantics,
}

impl RuleSpec {
    pub fn accept(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            semantics: MatchSemantics::MatchMeansValid,
        }
    }

    pub fn reject(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            semantics: MatchSemantics::MatchMeansInvalid,
        }
    }

    pub fn compile(&self) -> Result<Rule, RuleError> {
        Rule::from_pattern(&self.pattern, self.semantics)
    }
}

/// Ordered AND-combination of rules.
///
/// Built once at startup and then shared read-only (typically behind an
/// `Arc`) by every validation worker.
#[derive(Debug, Default)]
pub struct RuleEngine {
    rules: Vec<Rule>,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Compile every spec in order, failing on the first bad pattern.
    pub fn from_specs(specs: &[RuleSpec]) -> Result<Self, RuleError> {
        let mut engine = Self::new();
        for spec in specs {
            engine.add(spec.compile()?);
        }
        Ok(engine)
    }

    /// Append a rule. No dedup, no cap.
    pub fn add(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// True when every rule considers `value` valid. Stops at the first
    /// rule that does not. An engine with no rules accepts everything.
    pub fn is_valid(&self, value: &str) -> bool {
        self.rules.iter().all(|rule| rule.evaluate(value))
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Matcher that counts how often it was consulted.
    struct CountingMatcher {
        inner: Regex,
        calls: Arc<AtomicUsize>,
    }

    impl Matcher for CountingMatcher {
        fn is_match(&self, value: &str) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.is_match(value)
        }

        fn pattern(&self) -> &str {
            self.inner.as_str()
        }
    }

    fn counting(pattern: &str) -> (CountingMatcher, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let matcher = CountingMatcher {
            inner: Regex::new(pattern).unwrap(),
            calls: Arc::clone(&calls),
        };
        (matcher, calls)
    }

    #[test]
    fn test_semantics_table() {
        let valid_on_match = Rule::from_pattern("^A", MatchSemantics::MatchMeansValid).unwrap();
        let invalid_on_match = Rule::from_pattern("^A", MatchSemantics::MatchMeansInvalid).unwrap();

        assert!(valid_on_match.evaluate("ABC"));
        assert!(!invalid_on_match.evaluate("ABC"));
        assert!(!valid_on_match.evaluate("XBC"));
        // Exclusion rule: no match counts as valid
        assert!(invalid_on_match.evaluate("XBC"));
    }

    #[test]
    fn test_evaluate_mirrors_pattern() {
        let regex = Regex::new(r"^\d{3}$").unwrap();
        let accept = Rule::new(regex.clone(), MatchSemantics::MatchMeansValid);
        let reject = Rule::new(regex.clone(), MatchSemantics::MatchMeansInvalid);

        for value in ["123", "12", "abc", "", "1234", "999"] {
            assert_eq!(accept.evaluate(value), regex.is_match(value), "{}", value);
            assert_eq!(reject.evaluate(value), !regex.is_match(value), "{}", value);
        }
    }

    #[test]
    fn test_invalid_pattern_rejected_at_construction() {
        let err = Rule::from_pattern("(unclosed", MatchSemantics::MatchMeansValid).unwrap_err();
        match err {
            RuleError::InvalidPattern { pattern, .. } => assert_eq!(pattern, "(unclosed"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_group_and_combination() {
        let engine = RuleEngine::from_specs(&[RuleSpec::accept("^A"), RuleSpec::reject("X$")]).unwrap();

        assert!(!engine.is_valid("AXX"));
        assert!(engine.is_valid("AYY"));
        assert!(!engine.is_valid("BYY"));
    }

    #[test]
    fn test_short_circuit_stops_at_first_invalid() {
        let (first, first_calls) = counting("^A");
        let (second, second_calls) = counting("X$");

        let mut engine = RuleEngine::new();
        engine.add(Rule::new(first, MatchSemantics::MatchMeansValid));
        engine.add(Rule::new(second, MatchSemantics::MatchMeansInvalid));

        assert!(!engine.is_valid("BXX"));
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);

        assert!(engine.is_valid("AYY"));
        assert_eq!(first_calls.load(Ordering::SeqCst), 2);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_engine_accepts_everything() {
        let engine = RuleEngine::new();
        assert!(engine.is_empty());
        assert!(engine.is_valid(""));
        assert!(engine.is_valid("anything at all"));
    }

    #[test]
    fn test_rule_order_does_not_change_verdict() {
        let forward = RuleEngine::from_specs(&[
            RuleSpec::accept("^[A-Z]"),
            RuleSpec::reject("Q"),
            RuleSpec::reject(r"\d{3}"),
        ])
        .unwrap();
        let reversed = RuleEngine::from_specs(&[
            RuleSpec::reject(r"\d{3}"),
            RuleSpec::reject("Q"),
            RuleSpec::accept("^[A-Z]"),
        ])
        .unwrap();

        for value in ["ABC", "AQC", "A123", "abc", "", "Z9"] {
            assert_eq!(forward.is_valid(value), reversed.is_valid(value), "{}", value);
        }
    }

    #[test]
    fn test_revalidation_is_idempotent() {
        let engine = RuleEngine::from_specs(&[RuleSpec::accept("^A"), RuleSpec::reject("X$")]).unwrap();
        for value in ["AXX", "AYY", "ZZZ"] {
            assert_eq!(engine.is_valid(value), engine.is_valid(value));
        }
    }

    #[test]
    fn test_add_preserves_insertion_order() {
        let mut engine = RuleEngine::new();
        engine.add(Rule::from_pattern("one", MatchSemantics::MatchMeansValid).unwrap());
        engine.add(Rule::from_pattern("two", MatchSemantics::MatchMeansInvalid).unwrap());
        engine.add(Rule::from_pattern("one", MatchSemantics::MatchMeansValid).unwrap());

        let patterns: Vec<&str> = engine.rules().iter().map(|r| r.pattern()).collect();
        assert_eq!(patterns, vec!["one", "two", "one"]);
        assert_eq!(engine.len(), 3);
    }

    #[test]
    fn test_from_specs_fails_on_first_bad_pattern() {
        let result = RuleEngine::from_specs(&[RuleSpec::accept("ok"), RuleSpec::reject("[bad")]);
        assert!(matches!(result, Err(RuleError::InvalidPattern { .. })));
    }

    #[test]
    fn test_semantics_parsing() {
        assert_eq!(
            "accept".parse::<MatchSemantics>().unwrap(),
            MatchSemantics::MatchMeansValid
        );
        assert_eq!(
            " Match-Means-Invalid ".parse::<MatchSemantics>().unwrap(),
            MatchSemantics::MatchMeansInvalid
        );
        assert!(matches!(
            "maybe".parse::<MatchSemantics>(),
            Err(RuleError::UnknownSemantics(_))
        ));
    }
}
