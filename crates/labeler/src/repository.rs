//! Repository identifiers.
//!
//! A [`RepositoryRef`] is parsed once from an `owner/name` string and never
//! changes afterwards. Everything downstream (queries, corpus keys, skip sets)
//! works from the parsed form.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors produced while parsing an `owner/name` identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryRefError {
    #[error("repository identifier is empty")]
    Empty,

    #[error("repository identifier '{0}' must have the form owner/name")]
    Malformed(String),
}

/// A GitHub repository identified by owner and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepositoryRef {
    owner: String,
    name: String,
}

impl RepositoryRef {
    /// Parse an `owner/name` identifier.
    ///
    /// Surrounding whitespace is ignored. Both halves must be non-empty and
    /// there must be exactly one `/`.
    pub fn parse(input: &str) -> Result<Self, RepositoryRefError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(RepositoryRefError::Empty);
        }

        let mut parts = trimmed.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => {
                Ok(Self {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(RepositoryRefError::Malformed(trimmed.to_string())),
        }
    }

    /// Repository owner (user or organization).
    #[inline]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether `other` names this repository, ignoring ASCII case.
    ///
    /// Corpus keys only carry the repository name, so this is how entries are
    /// attributed back to a repository.
    #[inline]
    pub fn matches_name(&self, other: &str) -> bool {
        self.name.eq_ignore_ascii_case(other)
    }

    /// Default corpus file prefix: `owner-name`.
    pub fn file_prefix(&self) -> String {
        format!("{}-{}", self.owner, self.name)
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepositoryRef {
    type Err = RepositoryRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_owner_and_name() {
        let repo = RepositoryRef::parse("octo/widgets").unwrap();
        assert_eq!(repo.owner(), "octo");
        assert_eq!(repo.name(), "widgets");
        assert_eq!(repo.to_string(), "octo/widgets");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let repo: RepositoryRef = "  Azure/azure-sdk-for-net \n".parse().unwrap();
        assert_eq!(repo.owner(), "Azure");
        assert_eq!(repo.name(), "azure-sdk-for-net");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(RepositoryRef::parse(""), Err(RepositoryRefError::Empty));
        assert_eq!(RepositoryRef::parse("   "), Err(RepositoryRefError::Empty));

        for bad in ["octo", "octo/", "/widgets", "a/b/c", "/"] {
            assert!(
                matches!(
                    RepositoryRef::parse(bad),
                    Err(RepositoryRefError::Malformed(_))
                ),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_matches_name_ignores_case() {
        let repo = RepositoryRef::parse("octo/Widgets").unwrap();
        assert!(repo.matches_name("widgets"));
        assert!(repo.matches_name("WIDGETS"));
        assert!(!repo.matches_name("gadgets"));
    }

    #[test]
    fn test_file_prefix() {
        let repo = RepositoryRef::parse("octo/widgets").unwrap();
        assert_eq!(repo.file_prefix(), "octo-widgets");
    }
}
