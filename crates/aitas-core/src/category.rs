//! Task categories.
//!
//! Categories carry a scaling weight that feeds the display scoring
//! engine. Exactly one category is flagged as the default catch-all;
//! classification falls back to it whenever inference cannot confidently
//! assign another, and pipeline logic never deletes it.

use serde::{Deserialize, Serialize};

/// How aggressively a category's tasks should be prioritized.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScalingWeight {
    /// +20 display score
    Strict,
    /// +10 display score
    Normal,
    /// +0 display score
    Relaxed,
}

impl ScalingWeight {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalingWeight::Strict => "strict",
            ScalingWeight::Normal => "normal",
            ScalingWeight::Relaxed => "relaxed",
        }
    }

    pub fn parse(s: &str) -> ScalingWeight {
        match s {
            "strict" => ScalingWeight::Strict,
            "relaxed" => ScalingWeight::Relaxed,
            _ => ScalingWeight::Normal,
        }
    }
}

impl Default for ScalingWeight {
    fn default() -> Self {
        ScalingWeight::Normal
    }
}

/// A task category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Display name
    pub name: String,
    /// Icon identifier for display
    pub icon: String,
    /// Display color (hex)
    pub color: String,
    /// Sort order in category lists
    pub sort_order: i32,
    /// The single catch-all fallback category
    pub is_default: bool,
    /// Prioritization aggressiveness
    pub scaling_weight: ScalingWeight,
    /// Optional parent category
    pub parent_id: Option<String>,
}

impl Category {
    /// Create a category with display defaults.
    pub fn new(name: impl Into<String>) -> Self {
        Category {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            icon: "folder-outline".to_string(),
            color: "#9CA3AF".to_string(),
            sort_order: 0,
            is_default: false,
            scaling_weight: ScalingWeight::Normal,
            parent_id: None,
        }
    }

    pub fn with_scaling(mut self, weight: ScalingWeight) -> Self {
        self.scaling_weight = weight;
        self
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

/// Find the fallback category: the one flagged default, or the first
/// category when no default is flagged.
pub fn fallback_category(categories: &[Category]) -> Option<&Category> {
    categories
        .iter()
        .find(|c| c.is_default)
        .or_else(|| categories.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_prefers_default_flag() {
        let cats = vec![
            Category::new("Work").with_scaling(ScalingWeight::Strict),
            Category::new("Misc").as_default(),
        ];
        assert_eq!(fallback_category(&cats).unwrap().name, "Misc");
    }

    #[test]
    fn fallback_uses_first_when_no_default() {
        let cats = vec![Category::new("Work"), Category::new("Hobby")];
        assert_eq!(fallback_category(&cats).unwrap().name, "Work");
        assert!(fallback_category(&[]).is_none());
    }
}
