//! Label selectors.
//!
//! ```text
//! app=web            label equals value (`==` is accepted too)
//! tier!=cache        label absent or different
//! managed            label present
//! !legacy            label absent
//! app=web,!legacy    all requirements must hold
//! ```
//!
//! The empty selector matches everything.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("empty label key in requirement {0:?}")]
    EmptyKey(String),

    #[error("invalid character in requirement {0:?}")]
    InvalidCharacter(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Op {
    Equals(String),
    NotEquals(String),
    Exists,
    DoesNotExist,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Requirement {
    key: String,
    op: Op,
}

impl Requirement {
    fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        let value = labels.get(&self.key);
        match &self.op {
            Op::Equals(v) => value == Some(v),
            Op::NotEquals(v) => value != Some(v),
            Op::Exists => value.is_some(),
            Op::DoesNotExist => value.is_none(),
        }
    }

    fn parse(raw: &str) -> Result<Self, SelectorError> {
        let term = raw.trim();

        let (key, op) = if let Some((k, v)) = term.split_once("!=") {
            (k, Op::NotEquals(v.trim().to_string()))
        } else if let Some((k, v)) = term.split_once("==") {
            (k, Op::Equals(v.trim().to_string()))
        } else if let Some((k, v)) = term.split_once('=') {
            (k, Op::Equals(v.trim().to_string()))
        } else if let Some(k) = term.strip_prefix('!') {
            (k, Op::DoesNotExist)
        } else {
            (term, Op::Exists)
        };

        let key = key.trim();
        if key.is_empty() {
            return Err(SelectorError::EmptyKey(raw.to_string()));
        }
        let bad = |s: &str| s.chars().any(|c| c.is_whitespace() || "!=,".contains(c));
        let value_is_bad = match &op {
            Op::Equals(v) | Op::NotEquals(v) => bad(v),
            _ => false,
        };
        if bad(key) || value_is_bad {
            return Err(SelectorError::InvalidCharacter(raw.to_string()));
        }

        Ok(Self {
            key: key.to_string(),
            op,
        })
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.op {
            Op::Equals(v) => write!(f, "{}={}", self.key, v),
            Op::NotEquals(v) => write!(f, "{}!={}", self.key, v),
            Op::Exists => write!(f, "{}", self.key),
            Op::DoesNotExist => write!(f, "!{}", self.key),
        }
    }
}

/// A conjunction of label requirements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    requirements: Vec<Requirement>,
}

impl Selector {
    /// The selector that matches every object.
    pub fn everything() -> Self {
        Self::default()
    }

    /// Parses a comma-separated list of requirements.
    pub fn parse(s: &str) -> Result<Self, SelectorError> {
        let requirements = s
            .split(',')
            .filter(|t| !t.trim().is_empty())
            .map(Requirement::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { requirements })
    }

    /// Selector requiring every `(key, value)` pair.
    pub fn from_labels<'a, I>(labels: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self {
            requirements: labels
                .into_iter()
                .map(|(k, v)| Requirement {
                    key: k.to_string(),
                    op: Op::Equals(v.to_string()),
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements.iter().all(|r| r.matches(labels))
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, r) in self.requirements.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{r}")?;
        }
        Ok(())
    }
}
