//! UI element trees and queries over them.
//!
//! Hierarchies arrive in two shapes: flat elements carrying their fields
//! directly, and rich elements nesting them under an `attributes` object.
//! Accessors check `attributes` first so callers never care which shape
//! they got.

use crate::error::Result;
use crate::geometry::Bounds;
use serde::{Deserialize, Serialize};

/// One node of a device UI hierarchy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiElement {
    #[serde(
        default,
        alias = "resourceId",
        alias = "resource-id",
        skip_serializing_if = "Option::is_none"
    )]
    resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(
        default,
        alias = "accessibilityText",
        alias = "hintText",
        skip_serializing_if = "Option::is_none"
    )]
    accessibility_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bounds: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    focused: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<UiElement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attributes: Option<Box<UiElement>>,
}

impl UiElement {
    fn attr<'a, T, F>(&'a self, get: F) -> Option<T>
    where
        F: Fn(&'a UiElement) -> Option<T>,
    {
        self.attributes
            .as_deref()
            .and_then(&get)
            .or_else(|| get(self))
    }

    pub fn resource_id(&self) -> Option<&str> {
        self.attr(|e| e.resource_id.as_deref())
    }

    pub fn text(&self) -> Option<&str> {
        self.attr(|e| e.text.as_deref())
    }

    pub fn accessibility_text(&self) -> Option<&str> {
        self.attr(|e| e.accessibility_text.as_deref())
    }

    pub fn is_focused(&self) -> bool {
        self.attr(|e| e.focused).unwrap_or(false)
    }

    /// Parsed bounds, if the element carries a well-formed bounds string.
    pub fn bounds(&self) -> Result<Option<Bounds>> {
        match self.attr(|e| e.bounds.as_deref()) {
            Some(raw) => Ok(Some(Bounds::parse(raw)?)),
            None => Ok(None),
        }
    }
}

/// Find an element by resource id, depth-first. `index` skips that many
/// earlier matches.
pub fn find_by_resource_id<'a>(
    elements: &'a [UiElement],
    resource_id: &str,
    index: Option<usize>,
) -> Option<&'a UiElement> {
    let mut skip = index.unwrap_or(0);
    find_recursive(elements, &mut skip, &|element| {
        element.resource_id() == Some(resource_id)
    })
}

/// Find an element by visible text (case-insensitive exact match),
/// depth-first. `index` skips that many earlier matches.
pub fn find_by_text<'a>(
    elements: &'a [UiElement],
    text: &str,
    index: Option<usize>,
) -> Option<&'a UiElement> {
    let needle = text.to_lowercase();
    let mut skip = index.unwrap_or(0);
    find_recursive(elements, &mut skip, &|element| {
        element
            .text()
            .map(|t| t.to_lowercase() == needle)
            .unwrap_or(false)
    })
}

fn find_recursive<'a>(
    elements: &'a [UiElement],
    skip: &mut usize,
    matches: &dyn Fn(&UiElement) -> bool,
) -> Option<&'a UiElement> {
    for element in elements {
        if matches(element) {
            if *skip == 0 {
                return Some(element);
            }
            *skip -= 1;
            continue;
        }
        if let Some(found) = find_recursive(&element.children, skip, matches) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Vec<UiElement> {
        serde_json::from_value(json!([
            {
                "resourceId": "com.app:id/root",
                "bounds": "[0,0][1080,1920]",
                "children": [
                    {"resourceId": "com.app:id/row", "text": "Coffee", "bounds": "[0,0][1080,200]"},
                    {"resourceId": "com.app:id/row", "text": "Tea", "bounds": "[0,200][1080,400]"},
                    {
                        "attributes": {
                            "resourceId": "com.app:id/input",
                            "text": "Search",
                            "focused": true,
                            "bounds": "[0,400][1080,520]"
                        }
                    }
                ]
            }
        ]))
        .unwrap()
    }

    #[test]
    fn test_find_by_resource_id_with_index() {
        let tree = sample();
        let first = find_by_resource_id(&tree, "com.app:id/row", None).unwrap();
        assert_eq!(first.text(), Some("Coffee"));
        let second = find_by_resource_id(&tree, "com.app:id/row", Some(1)).unwrap();
        assert_eq!(second.text(), Some("Tea"));
        assert!(find_by_resource_id(&tree, "com.app:id/row", Some(2)).is_none());
    }

    #[test]
    fn test_find_by_text_is_case_insensitive_exact() {
        let tree = sample();
        assert!(find_by_text(&tree, "coffee", None).is_some());
        assert!(find_by_text(&tree, "coff", None).is_none());
    }

    #[test]
    fn test_rich_hierarchy_attributes_take_precedence() {
        let tree = sample();
        let input = find_by_resource_id(&tree, "com.app:id/input", None).unwrap();
        assert!(input.is_focused());
        let bounds = input.bounds().unwrap().unwrap();
        assert_eq!(bounds.center().y, 460);
    }
}
