//! Focus-point taxonomy.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// One label the engine is permitted to emit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusPoint {
    /// Label as it must appear between `<tag>` delimiters
    pub name: String,

    /// Human explanation of what belongs under this label
    #[serde(default)]
    pub explanation: String,
}

impl FocusPoint {
    pub fn new(name: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            explanation: explanation.into(),
        }
    }
}

/// The set of focus points for one run, unique by name.
///
/// Built once and shared read-only (usually behind an `Arc`) by every call
/// in a batch. Insertion order is kept for prompt rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FocusPoint>", into = "Vec<FocusPoint>")]
pub struct Taxonomy {
    points: IndexMap<String, FocusPoint>,
}

impl Taxonomy {
    /// Build a taxonomy, rejecting empty and duplicate names.
    pub fn new(points: impl IntoIterator<Item = FocusPoint>) -> Result<Self> {
        let mut map = IndexMap::new();
        for point in points {
            if point.name.trim().is_empty() {
                return Err(EngineError::InvalidTaxonomy {
                    reason: "focus point name is empty".to_string(),
                });
            }
            if map.contains_key(&point.name) {
                return Err(EngineError::InvalidTaxonomy {
                    reason: format!("duplicate focus point: {}", point.name),
                });
            }
            map.insert(point.name.clone(), point);
        }
        Ok(Self { points: map })
    }

    /// Exact, case-sensitive membership test.
    pub fn contains(&self, name: &str) -> bool {
        self.points.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&FocusPoint> {
        self.points.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.points.keys().map(String::as_str)
    }

    pub fn points(&self) -> impl Iterator<Item = &FocusPoint> {
        self.points.values()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Newline-separated focus names.
    pub fn focus_list(&self) -> String {
        self.names().collect::<Vec<_>>().join("\n")
    }

    /// Render the focus statement: one `<tag>name</tag>explanation` line per
    /// point that has an explanation.
    pub fn focus_statement(&self) -> String {
        self.points()
            .filter(|p| !p.explanation.trim().is_empty())
            .map(|p| format!("<tag>{}</tag>{}", p.name, p.explanation))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl TryFrom<Vec<FocusPoint>> for Taxonomy {
    type Error = EngineError;

    fn try_from(points: Vec<FocusPoint>) -> Result<Self> {
        Self::new(points)
    }
}

impl From<Taxonomy> for Vec<FocusPoint> {
    fn from(taxonomy: Taxonomy) -> Self {
        taxonomy.points.into_values().collect()
    }
}
