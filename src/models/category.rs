use serde::{Deserialize, Serialize};

/// Categories every fresh install starts with: (id, name, color).
pub const DEFAULT_CATEGORIES: &[(&str, &str, &str)] = &[
    ("1", "Work", "#FF5722"),
    ("2", "Personal", "#2196F3"),
    ("3", "Family", "#4CAF50"),
    ("4", "Other", "#9C27B0"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    /// Hex color, `#RRGGBB` or `#RGB`.
    pub color: String,
}

impl Category {
    pub fn new(id: &str, name: &str, color: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            color: color.to_string(),
        }
    }

    pub fn defaults() -> Vec<Self> {
        DEFAULT_CATEGORIES
            .iter()
            .map(|(id, name, color)| Self::new(id, name, color))
            .collect()
    }

    /// Find a category by its ID.
    pub fn find<'a>(categories: &'a [Self], id: &str) -> Option<&'a Self> {
        categories.iter().find(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_has_four_categories() {
        let categories = Category::defaults();
        assert_eq!(categories.len(), 4);
        assert!(categories.iter().any(|c| c.name == "Work" && c.color == "#FF5722"));
    }

    #[test]
    fn test_find() {
        let categories = Category::defaults();
        assert_eq!(Category::find(&categories, "2").map(|c| c.name.as_str()), Some("Personal"));
        assert!(Category::find(&categories, "99").is_none());
    }

    #[test]
    fn test_serializes_as_plain_record() {
        let json = serde_json::to_string(&Category::new("1", "Work", "#FF5722")).unwrap();
        assert_eq!(json, r##"{"id":"1","name":"Work","color":"#FF5722"}"##);
    }
}
