//! Tag types stored as strings in the catalog tables.
//!
//! Each tag has a stable textual code used in the database and in snapshot JSON.
//! Parsing is strict: unknown codes surface as [`Error::InvalidStatus`].

use crate::errors::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// Returns true when `key` denotes an extraordinary concept (leading `E`, any case).
#[must_use]
pub fn is_extraordinary(key: &str) -> bool {
    key.chars()
        .next()
        .is_some_and(|c| c.eq_ignore_ascii_case(&'e'))
}

/// Approval status of one catalog concept row.
///
/// Codes: `E` elaboration, `R<n>` revision number `n` (bare `R` is revision 0),
/// `A` approved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConceptStatus {
    /// Draft, not yet submitted
    Elaboration,
    /// Under review; the number counts revisions
    Revision(u32),
    /// Final
    Approved,
}

impl ConceptStatus {
    /// Parses an optional stored code, treating a missing status as approved.
    pub fn from_stored(value: Option<&str>) -> Result<Self> {
        value.map_or(Ok(Self::Approved), str::parse)
    }

    /// True for elaboration and revision states.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Elaboration | Self::Revision(_))
    }
}

impl fmt::Display for ConceptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Elaboration => f.write_str("E"),
            Self::Revision(0) => f.write_str("R"),
            Self::Revision(n) => write!(f, "R{n}"),
            Self::Approved => f.write_str("A"),
        }
    }
}

impl FromStr for ConceptStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        match trimmed {
            "E" => Ok(Self::Elaboration),
            "A" => Ok(Self::Approved),
            "R" => Ok(Self::Revision(0)),
            _ => trimmed
                .strip_prefix('R')
                .and_then(|n| n.parse::<u32>().ok())
                .map(Self::Revision)
                .ok_or_else(|| Error::InvalidStatus {
                    value: s.to_string(),
                }),
        }
    }
}

impl Serialize for ConceptStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ConceptStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// State of an extraordinary concept's approval record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApprovalState {
    Elaboration,
    Revision,
    Approved,
}

impl ApprovalState {
    /// Stored code
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Elaboration => "elaboration",
            Self::Revision => "revision",
            Self::Approved => "approved",
        }
    }
}

impl fmt::Display for ApprovalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApprovalState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "elaboration" => Ok(Self::Elaboration),
            "revision" => Ok(Self::Revision),
            "approved" => Ok(Self::Approved),
            _ => Err(Error::InvalidStatus {
                value: s.to_string(),
            }),
        }
    }
}

/// Classification of one pre-settlement detail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeType {
    /// Present on both sides with a different price or quantity
    Modified,
    /// Present on both sides with equal values, or only on the original side
    Unchanged,
    /// Present only on the updated side
    New,
}

impl ChangeType {
    /// Stored code
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Modified => "modified",
            Self::Unchanged => "unchanged",
            Self::New => "new",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "modified" => Ok(Self::Modified),
            "unchanged" => Ok(Self::Unchanged),
            "new" => Ok(Self::New),
            _ => Err(Error::InvalidStatus {
                value: s.to_string(),
            }),
        }
    }
}

/// Kind of a catalog version.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VersionKind {
    /// First upload of the contract
    Original,
    /// Any later upload
    Amended,
}

impl VersionKind {
    /// Stored code
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Amended => "amended",
        }
    }

    /// Display name given to versions of this kind
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Original => "Catalog Original",
            Self::Amended => "Catalog Amended",
        }
    }
}

impl fmt::Display for VersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContractState {
    Open,
    Closed,
}

impl ContractState {
    /// Stored code
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ContractState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(Error::InvalidStatus {
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_is_extraordinary_case_insensitive() {
        assert!(is_extraordinary("E1"));
        assert!(is_extraordinary("ext-04"));
        assert!(!is_extraordinary("A1"));
        assert!(!is_extraordinary(""));
    }

    #[test]
    fn test_concept_status_codes() {
        assert_eq!("E".parse::<ConceptStatus>().unwrap(), ConceptStatus::Elaboration);
        assert_eq!("A".parse::<ConceptStatus>().unwrap(), ConceptStatus::Approved);
        assert_eq!("R3".parse::<ConceptStatus>().unwrap(), ConceptStatus::Revision(3));
        assert_eq!("R".parse::<ConceptStatus>().unwrap(), ConceptStatus::Revision(0));
        assert_eq!(ConceptStatus::Revision(2).to_string(), "R2");
        assert!(matches!(
            "X9".parse::<ConceptStatus>(),
            Err(Error::InvalidStatus { value: _ })
        ));
    }

    #[test]
    fn test_missing_status_defaults_to_approved() {
        assert_eq!(
            ConceptStatus::from_stored(None).unwrap(),
            ConceptStatus::Approved
        );
        assert!(ConceptStatus::Revision(1).is_pending());
        assert!(!ConceptStatus::Approved.is_pending());
    }

    #[test]
    fn test_concept_status_serializes_as_code() {
        let json = serde_json::to_string(&ConceptStatus::Revision(4)).unwrap();
        assert_eq!(json, "\"R4\"");
        let parsed: ConceptStatus = serde_json::from_str("\"A\"").unwrap();
        assert_eq!(parsed, ConceptStatus::Approved);
    }
}
