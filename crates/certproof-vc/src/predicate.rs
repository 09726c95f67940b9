//! # Typed Predicates
//!
//! One small expression, `(field, condition)`, serves both admission
//! criteria in presentation requests and the threshold checks a proof
//! generator enforces. The same predicate is evaluated against the true
//! credential (before any proof is produced) and against the revealed
//! mapping (when a verifier checks requirements).
//!
//! Predicates here are evaluated in the clear by whoever holds the value.
//! They are not zero-knowledge range proofs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use certproof_core::{CertError, Score};

use crate::credential::{AttributeValue, Credential, RevealedAttributes};

/// Condition on a single attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum Condition {
    /// Value >= threshold (inclusive).
    Gte(Score),
    /// Value <= threshold (inclusive).
    Lte(Score),
    /// lower <= value <= upper.
    InRange(Score, Score),
    /// Text value is one of the listed options.
    OneOf(Vec<String>),
}

impl Condition {
    /// Comparator symbol for messages.
    pub fn comparator(&self) -> &'static str {
        match self {
            Self::Gte(_) => ">=",
            Self::Lte(_) => "<=",
            Self::InRange(..) | Self::OneOf(_) => "in",
        }
    }

    /// Required value, rendered.
    pub fn required(&self) -> String {
        match self {
            Self::Gte(t) | Self::Lte(t) => t.to_string(),
            Self::InRange(lo, hi) => format!("[{lo}, {hi}]"),
            Self::OneOf(options) => format!("{{{}}}", options.join(", ")),
        }
    }

    /// Whether the condition is well-formed.
    pub fn validate(&self) -> bool {
        match self {
            Self::Gte(_) | Self::Lte(_) => true,
            Self::InRange(lo, hi) => lo <= hi,
            Self::OneOf(options) => !options.is_empty(),
        }
    }

    /// Check a score.
    pub fn is_satisfied_by_score(&self, value: Score) -> bool {
        match self {
            Self::Gte(t) => value >= *t,
            Self::Lte(t) => value <= *t,
            Self::InRange(lo, hi) => value >= *lo && value <= *hi,
            Self::OneOf(options) => options.iter().any(|o| *o == value.to_string()),
        }
    }

    /// Check any scalar attribute.
    pub fn is_satisfied_by(&self, value: &AttributeValue) -> bool {
        match (self, value) {
            (_, AttributeValue::Score(s)) => self.is_satisfied_by_score(*s),
            (Self::OneOf(options), other) => other
                .as_text()
                .map(|t| options.contains(&t))
                .unwrap_or(false),
            _ => false,
        }
    }
}

/// A condition bound to an attribute path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
    /// Dotted attribute path.
    pub field: String,
    /// Condition on the value at `field`.
    pub condition: Condition,
}

/// Outcome of checking a predicate against revealed attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateCheck {
    /// The predicate's field.
    pub field: String,
    /// Whether it held.
    pub satisfied: bool,
    /// Why it did not hold; empty on success.
    pub reason: String,
}

impl Predicate {
    /// Minimum-score predicate.
    pub fn at_least(field: impl Into<String>, threshold: Score) -> Self {
        Self {
            field: field.into(),
            condition: Condition::Gte(threshold),
        }
    }

    fn unmet(&self) -> CertError {
        CertError::Threshold {
            field: self.field.clone(),
            comparator: self.condition.comparator().to_string(),
            required: self.condition.required(),
        }
    }

    /// Evaluate against the true credential value.
    ///
    /// A field the credential does not carry fails the predicate.
    pub fn evaluate(&self, credential: &Credential) -> Result<(), CertError> {
        if !self.condition.validate() {
            return Err(CertError::Validation(format!(
                "ill-formed condition on {}",
                self.field
            )));
        }
        match credential.attribute(&self.field) {
            Some(value) if self.condition.is_satisfied_by(&value) => Ok(()),
            _ => Err(self.unmet()),
        }
    }

    /// Check against a revealed mapping only. An unrevealed field is unmet.
    pub fn check_revealed(&self, revealed: &RevealedAttributes) -> PredicateCheck {
        let outcome = |satisfied: bool, reason: String| PredicateCheck {
            field: self.field.clone(),
            satisfied,
            reason,
        };
        let Some(value) = revealed.get(&self.field) else {
            return outcome(false, format!("{} not revealed", self.field));
        };
        let satisfied = match (&self.condition, value) {
            (Condition::OneOf(options), Value::String(s)) => options.contains(s),
            (condition, value) => match Score::deserialize(value) {
                Ok(score) => condition.is_satisfied_by_score(score),
                Err(_) => false,
            },
        };
        if satisfied {
            outcome(true, String::new())
        } else {
            outcome(
                false,
                format!(
                    "{} does not satisfy {} {}",
                    self.field,
                    self.condition.comparator(),
                    self.condition.required()
                ),
            )
        }
    }

    /// Signed margin of the true value over a `Gte` threshold, in hundredths.
    pub fn margin(&self, credential: &Credential) -> Option<i64> {
        let Condition::Gte(threshold) = self.condition else {
            return None;
        };
        credential
            .attribute(&self.field)
            .and_then(|v| v.as_score())
            .map(|score| score.margin_over(threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::fixtures::credential;
    use certproof_core::ErrorKind;

    fn score(s: &str) -> Score {
        Score::parse(s).unwrap()
    }

    #[test]
    fn test_gte_is_inclusive() {
        let c = credential("8.0");
        assert!(Predicate::at_least("scores.overall", score("7.0")).evaluate(&c).is_ok());
        assert!(Predicate::at_least("scores.overall", score("8.0")).evaluate(&c).is_ok());
        let err = Predicate::at_least("scores.overall", score("8.5"))
            .evaluate(&c)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Threshold);
        assert!(err.to_string().contains("scores.overall"));
    }

    #[test]
    fn test_missing_field_fails() {
        let c = credential("8.0");
        let err = Predicate::at_least("scores.speaking", score("1.0"))
            .evaluate(&c)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Threshold);
    }

    #[test]
    fn test_range_and_set_conditions() {
        let c = credential("8.0");
        let in_range = Predicate {
            field: "scores.reading".into(),
            condition: Condition::InRange(score("7.0"), score("7.5")),
        };
        assert!(in_range.evaluate(&c).is_ok());

        let one_of = Predicate {
            field: "testName".into(),
            condition: Condition::OneOf(vec!["Academic English".into(), "General".into()]),
        };
        assert!(one_of.evaluate(&c).is_ok());

        let inverted = Predicate {
            field: "scores.reading".into(),
            condition: Condition::InRange(score("9.0"), score("1.0")),
        };
        assert_eq!(inverted.evaluate(&c).unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_revealed_check_uses_only_revealed_values() {
        let c = credential("8.0");
        let p = Predicate::at_least("scores.overall", score("7.5"));

        let hidden = c.project(&["name".to_string()]).unwrap();
        let check = p.check_revealed(&hidden);
        assert!(!check.satisfied);
        assert!(check.reason.contains("not revealed"));

        let shown = c.project(&["scores.overall".to_string()]).unwrap();
        assert!(p.check_revealed(&shown).satisfied);

        let mut numeric = RevealedAttributes::new();
        numeric.insert("scores.overall".into(), serde_json::json!(7));
        assert!(!p.check_revealed(&numeric).satisfied);
    }

    #[test]
    fn test_margin_over_threshold() {
        let c = credential("8.0");
        assert_eq!(Predicate::at_least("scores.overall", score("7.5")).margin(&c), Some(50));
        let lte = Predicate {
            field: "scores.overall".into(),
            condition: Condition::Lte(score("9.0")),
        };
        assert_eq!(lte.margin(&c), None);
    }

    #[test]
    fn test_serde_shape() {
        let p = Predicate::at_least("scores.overall", score("7.0"));
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["condition"]["op"], "gte");
        assert_eq!(json["condition"]["value"], "7.0");
        let back: Predicate = serde_json::from_value(json).unwrap();
        assert_eq!(back, p);
    }
}
