//! # Fixed-Point Scores
//!
//! Test scores (overall band, section bands) are stored as integer
//! hundredths. They serialize as decimal strings (`"7.5"`, `"8.25"`) so
//! they pass through canonical serialization, which rejects floats.
//! Deserialization also accepts JSON numbers for convenience at the edges.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CertError;

/// A non-negative score with two decimal places of precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Score(u32);

impl Score {
    /// Construct from integer hundredths (`750` is 7.5).
    pub const fn from_hundredths(hundredths: u32) -> Self {
        Self(hundredths)
    }

    /// Construct from a float, rounding to the nearest hundredth.
    pub fn from_f64(value: f64) -> Result<Self, CertError> {
        if !value.is_finite() || value < 0.0 {
            return Err(CertError::Validation(format!(
                "score must be a finite non-negative number, got {value}"
            )));
        }
        let scaled = (value * 100.0).round();
        if scaled > f64::from(u32::MAX) {
            return Err(CertError::Validation(format!("score {value} out of range")));
        }
        Ok(Self(scaled as u32))
    }

    /// Parse a decimal string with at most two fractional digits.
    pub fn parse(s: &str) -> Result<Self, CertError> {
        let s = s.trim();
        let invalid = || CertError::Validation(format!("invalid score {s:?}"));
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() || frac.len() > 2 {
            return Err(invalid());
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        let whole: u32 = whole.parse().map_err(|_| invalid())?;
        let frac: u32 = match frac.len() {
            0 => 0,
            1 => frac.parse::<u32>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };
        whole
            .checked_mul(100)
            .and_then(|w| w.checked_add(frac))
            .map(Self)
            .ok_or_else(invalid)
    }

    /// The raw hundredths value.
    pub fn hundredths(&self) -> u32 {
        self.0
    }

    /// Lossy float view, for display and reporting only.
    pub fn as_f64(&self) -> f64 {
        f64::from(self.0) / 100.0
    }

    /// Signed margin `self - other` in hundredths.
    pub fn margin_over(&self, other: Score) -> i64 {
        i64::from(self.0) - i64::from(other.0)
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac % 10 == 0 {
            write!(f, "{whole}.{}", frac / 10)
        } else {
            write!(f, "{whole}.{frac:02}")
        }
    }
}

impl std::str::FromStr for Score {
    type Err = CertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Score {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScoreVisitor;

        impl<'de> Visitor<'de> for ScoreVisitor {
            type Value = Score;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a decimal score string or number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Score, E> {
                Score::parse(v).map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Score, E> {
                u32::try_from(v)
                    .ok()
                    .and_then(|v| v.checked_mul(100))
                    .map(Score)
                    .ok_or_else(|| E::custom(format!("score {v} out of range")))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Score, E> {
                u64::try_from(v)
                    .map_err(|_| E::custom(format!("score {v} is negative")))
                    .and_then(|v| self.visit_u64(v))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Score, E> {
                Score::from_f64(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(ScoreVisitor)
    }
}
