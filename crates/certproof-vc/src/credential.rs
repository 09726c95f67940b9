//! # Test-Certification Credentials
//!
//! A [`Credential`] is the immutable attribute set an issuer certifies: who
//! the holder is, which test they sat, when, and the scores they achieved.
//!
//! ## Attribute paths
//!
//! Every attribute has a dotted path used for disclosure, predicates, and
//! signing. The order below is fixed and is the order in which attributes
//! are committed and signed:
//!
//! `id`, `holder`, `credentialType`, `name`, `testName`, `serialNumber`,
//! `certificationDate`, `expiryDate`, then `scores.<key>` in key order.
//!
//! `scores` on its own addresses the whole score group.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use certproof_core::{CanonicalBytes, CertError, CredentialId, HolderId, Score, Timestamp};
use certproof_crypto::Committable;

/// Type tag given to credentials when the issuer does not set one.
pub const DEFAULT_CREDENTIAL_TYPE: &str = "TestCertificationCredential";

/// Key of the overall score inside the score group.
pub const OVERALL_SCORE: &str = "overall";

/// Path of the score group.
pub const SCORES_PATH: &str = "scores";

const FIXED_PATHS: [&str; 8] = [
    "id",
    "holder",
    "credentialType",
    "name",
    "testName",
    "serialNumber",
    "certificationDate",
    "expiryDate",
];

/// Revealed attributes: path to JSON value, as disclosed to a verifier.
pub type RevealedAttributes = BTreeMap<String, Value>;

/// A certified test result. Immutable once issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Credential {
    /// Credential identifier.
    pub id: CredentialId,
    /// The test taker.
    pub holder: HolderId,
    /// Credential type tag, matched against presentation requests.
    pub credential_type: String,
    /// Holder's name as printed on the certificate.
    pub name: String,
    /// Name of the test.
    pub test_name: String,
    /// Certificate serial number.
    pub serial_number: String,
    /// When the test result was certified.
    pub certification_date: Timestamp,
    /// When the certificate stops being valid.
    pub expiry_date: Timestamp,
    /// Score group; must contain [`OVERALL_SCORE`].
    pub scores: BTreeMap<String, Score>,
}

/// Attribute set handed to an issuer. Anything but `id` and
/// `credential_type` must be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialAttributes {
    pub id: Option<CredentialId>,
    pub holder: Option<HolderId>,
    pub credential_type: Option<String>,
    pub name: Option<String>,
    pub test_name: Option<String>,
    pub serial_number: Option<String>,
    pub certification_date: Option<Timestamp>,
    pub expiry_date: Option<Timestamp>,
    pub scores: Option<BTreeMap<String, Score>>,
}

impl CredentialAttributes {
    /// Build the credential, generating an id when none was given.
    pub fn into_credential(self, default_type: &str) -> Result<Credential, CertError> {
        fn required<T>(field: &str, value: Option<T>) -> Result<T, CertError> {
            value.ok_or_else(|| CertError::Validation(format!("malformed credential: missing {field}")))
        }

        let credential = Credential {
            id: self.id.unwrap_or_else(CredentialId::generate),
            holder: required("holder", self.holder)?,
            credential_type: self
                .credential_type
                .unwrap_or_else(|| default_type.to_string()),
            name: required("name", self.name)?,
            test_name: required("testName", self.test_name)?,
            serial_number: required("serialNumber", self.serial_number)?,
            certification_date: required("certificationDate", self.certification_date)?,
            expiry_date: required("expiryDate", self.expiry_date)?,
            scores: required("scores", self.scores)?,
        };
        credential.validate()?;
        Ok(credential)
    }
}

/// The value at an attribute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Text(String),
    Date(Timestamp),
    Score(Score),
    Group(BTreeMap<String, Score>),
}

impl AttributeValue {
    /// JSON form used in revealed-attribute mappings.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(s) => Value::String(s.clone()),
            Self::Date(ts) => Value::String(ts.to_iso8601()),
            Self::Score(s) => Value::String(s.to_string()),
            Self::Group(scores) => Value::Object(
                scores
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.to_string())))
                    .collect(),
            ),
        }
    }

    /// The score, if this is a score attribute.
    pub fn as_score(&self) -> Option<Score> {
        match self {
            Self::Score(s) => Some(*s),
            _ => None,
        }
    }

    /// Text rendering, if this is a scalar attribute.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Date(ts) => Some(ts.to_iso8601()),
            Self::Score(s) => Some(s.to_string()),
            Self::Group(_) => None,
        }
    }
}

/// Render a revealed JSON value the way attribute messages render it.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => CanonicalBytes::from_value(other.clone())
            .ok()
            .and_then(|cb| String::from_utf8(cb.as_bytes().to_vec()).ok())
            .unwrap_or_else(|| other.to_string()),
    }
}

/// The signed/committed message for one attribute.
pub fn attribute_message(path: &str, value: &Value) -> String {
    format!("{path}={}", render_value(value))
}

impl Credential {
    /// Check the structural requirements a holder enforces on storage.
    pub fn validate(&self) -> Result<(), CertError> {
        let malformed = |why: String| CertError::Validation(format!("malformed credential: {why}"));
        for (field, value) in [
            ("id", self.id.as_str()),
            ("holder", self.holder.as_str()),
            ("credentialType", self.credential_type.as_str()),
            ("name", self.name.as_str()),
            ("testName", self.test_name.as_str()),
            ("serialNumber", self.serial_number.as_str()),
        ] {
            if value.trim().is_empty() {
                return Err(malformed(format!("{field} is empty")));
            }
        }
        if !self.scores.contains_key(OVERALL_SCORE) {
            return Err(malformed(format!("scores.{OVERALL_SCORE} is missing")));
        }
        if let Some(bad) = self
            .scores
            .keys()
            .find(|k| k.is_empty() || k.contains('.') || k.contains('='))
        {
            return Err(malformed(format!("invalid score key {bad:?}")));
        }
        if self.expiry_date < self.certification_date {
            return Err(malformed("expiryDate precedes certificationDate".to_string()));
        }
        Ok(())
    }

    /// Every leaf attribute path, in commitment order.
    pub fn attribute_paths(&self) -> Vec<String> {
        FIXED_PATHS
            .iter()
            .map(|p| p.to_string())
            .chain(self.scores.keys().map(|k| format!("{SCORES_PATH}.{k}")))
            .collect()
    }

    /// Position of a leaf path in [`attribute_paths`](Self::attribute_paths).
    pub fn message_index(&self, path: &str) -> Option<usize> {
        if let Some(i) = FIXED_PATHS.iter().position(|p| *p == path) {
            return Some(i);
        }
        let key = path.strip_prefix("scores.")?;
        self.scores
            .keys()
            .position(|k| k == key)
            .map(|i| FIXED_PATHS.len() + i)
    }

    /// Look up an attribute by dotted path.
    pub fn attribute(&self, path: &str) -> Option<AttributeValue> {
        let text = |s: &str| Some(AttributeValue::Text(s.to_string()));
        match path {
            "id" => text(self.id.as_str()),
            "holder" => text(self.holder.as_str()),
            "credentialType" => text(&self.credential_type),
            "name" => text(&self.name),
            "testName" => text(&self.test_name),
            "serialNumber" => text(&self.serial_number),
            "certificationDate" => Some(AttributeValue::Date(self.certification_date)),
            "expiryDate" => Some(AttributeValue::Date(self.expiry_date)),
            SCORES_PATH => Some(AttributeValue::Group(self.scores.clone())),
            _ => path
                .strip_prefix("scores.")
                .and_then(|key| self.scores.get(key))
                .map(|s| AttributeValue::Score(*s)),
        }
    }

    /// Project the given paths into a revealed mapping. The result holds
    /// exactly the requested keys.
    pub fn project(&self, paths: &[String]) -> Result<RevealedAttributes, CertError> {
        paths
            .iter()
            .map(|path| {
                self.attribute(path)
                    .map(|v| (path.clone(), v.to_json()))
                    .ok_or_else(|| CertError::Validation(format!("unknown attribute path {path:?}")))
            })
            .collect()
    }

    /// The overall score.
    pub fn overall_score(&self) -> Option<Score> {
        self.scores.get(OVERALL_SCORE).copied()
    }

    /// Whether the credential has expired at `at`.
    pub fn is_expired_at(&self, at: &Timestamp) -> bool {
        self.expiry_date < *at
    }
}

impl Committable for Credential {
    fn messages(&self) -> Vec<String> {
        self.attribute_paths()
            .iter()
            .filter_map(|path| {
                self.attribute(path)
                    .map(|v| attribute_message(path, &v.to_json()))
            })
            .collect()
    }
}
