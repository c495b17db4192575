//! Label classification by color.
//!
//! Labels reach the pipeline in several shapes: REST labels from octocrab,
//! GraphQL label nodes, and loosely typed JSON. Each shape exposes its color
//! through the [`LabelColor`] capability; an [`InterestFilter`] only ever looks
//! at that color.
//!
//! # Example
//!
//! ```
//! use labeler::label::{InterestFilter, LabelType};
//! use serde_json::json;
//!
//! let filter = InterestFilter::any_type(LabelType::defaults());
//! assert!(filter.accept(&json!({ "name": "Storage", "color": "E99695" })).unwrap());
//! assert!(!filter.accept(&json!({ "name": "bug", "color": "00ff00" })).unwrap());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use crate::platform::LabelSummary;

/// Color of labels that name an owning service.
pub const SERVICE_COLOR: &str = "e99695";

/// Color of labels that name an item category.
pub const CATEGORY_COLOR: &str = "ffeb77";

/// Errors raised while classifying a label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// The value has no color member the filter can read.
    #[error("label type '{type_name}' does not have a '{member}' member")]
    MissingCapability {
        type_name: &'static str,
        member: &'static str,
    },
}

/// Read-only access to a label's color code.
///
/// Implement this for any label representation that should be classifiable.
/// Representations without an implementation cannot be passed to the filter
/// at all; representations that are only structurally typed (JSON) report
/// [`FilterError::MissingCapability`] when the color member is absent.
pub trait LabelColor {
    /// The label's hex color code, without a leading `#`.
    fn color(&self) -> Result<&str, FilterError>;
}

impl<T: LabelColor + ?Sized> LabelColor for &T {
    fn color(&self) -> Result<&str, FilterError> {
        (**self).color()
    }
}

#[cfg(feature = "github")]
impl LabelColor for octocrab::models::Label {
    fn color(&self) -> Result<&str, FilterError> {
        Ok(&self.color)
    }
}

impl LabelColor for LabelSummary {
    fn color(&self) -> Result<&str, FilterError> {
        Ok(&self.color)
    }
}

impl LabelColor for serde_json::Value {
    /// Looks for a `Color` member first, then `color`.
    fn color(&self) -> Result<&str, FilterError> {
        ["Color", "color"]
            .iter()
            .find_map(|member| self.get(member).and_then(|v| v.as_str()))
            .ok_or(FilterError::MissingCapability {
                type_name: std::any::type_name::<serde_json::Value>(),
                member: "Color",
            })
    }
}

/// A named label category recognized by its color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelType {
    name: String,
    color: String,
}

impl LabelType {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        let color = color.into();
        Self {
            name: name.into(),
            color: color.trim_start_matches('#').to_string(),
        }
    }

    /// Service labels.
    pub fn service() -> Self {
        Self::new("Service", SERVICE_COLOR)
    }

    /// Category labels.
    pub fn category() -> Self {
        Self::new("Category", CATEGORY_COLOR)
    }

    /// The built-in label types: service, then category.
    pub fn defaults() -> Vec<Self> {
        vec![Self::service(), Self::category()]
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    /// Whether `label` carries this type's color (ASCII case-insensitive).
    pub fn accepts<L: LabelColor + ?Sized>(&self, label: &L) -> Result<bool, FilterError> {
        let color = label.color()?;
        Ok(color.trim_start_matches('#').eq_ignore_ascii_case(&self.color))
    }
}

/// How an [`InterestFilter`] combines its label types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Accept when at least one label type accepts.
    #[default]
    Any,
    /// Accept only when every label type accepts independently.
    All,
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::All => f.write_str("all"),
        }
    }
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "any" => Ok(Self::Any),
            "all" => Ok(Self::All),
            other => Err(format!("unknown match mode '{other}' (expected any or all)")),
        }
    }
}

/// Decides whether a label is of interest for the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterestFilter {
    types: Vec<LabelType>,
    mode: MatchMode,
}

impl InterestFilter {
    pub fn new(types: Vec<LabelType>, mode: MatchMode) -> Self {
        Self { types, mode }
    }

    /// Accepts a label only if every type accepts it. With no types
    /// registered, every label is accepted.
    pub fn all_types(types: Vec<LabelType>) -> Self {
        Self::new(types, MatchMode::All)
    }

    /// Accepts a label if any type accepts it.
    pub fn any_type(types: Vec<LabelType>) -> Self {
        Self::new(types, MatchMode::Any)
    }

    pub fn types(&self) -> &[LabelType] {
        &self.types
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Classify a single label.
    ///
    /// Every registered type examines the label on its own. A label whose
    /// color cannot be read is an error, not a rejection.
    pub fn accept<L: LabelColor + ?Sized>(&self, label: &L) -> Result<bool, FilterError> {
        // Resolve once so a missing capability surfaces even with no types.
        label.color()?;

        match self.mode {
            MatchMode::All => {
                for ty in &self.types {
                    if !ty.accepts(label)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            MatchMode::Any => {
                for ty in &self.types {
                    if ty.accepts(label)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    /// Keep the labels this filter accepts, preserving order.
    pub fn select<'a, L: LabelColor>(&self, labels: &'a [L]) -> Result<Vec<&'a L>, FilterError> {
        let mut selected = Vec::new();
        for label in labels {
            if self.accept(label)? {
                selected.push(label);
            }
        }
        Ok(selected)
    }
}

impl Default for InterestFilter {
    fn default() -> Self {
        Self::any_type(LabelType::defaults())
    }
}
