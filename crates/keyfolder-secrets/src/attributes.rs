//! Attribute maps that namespace items under an application folder.
//!
//! The Secret Service has no notion of a key: items are found by exact
//! attribute match. Every item written here carries `appFolder` and `key`
//! attributes; searching with only `appFolder` enumerates the folder.

use std::collections::HashMap;

/// Attribute holding the application folder.
pub const FOLDER_ATTRIBUTE: &str = "appFolder";

/// Attribute holding the item key.
pub const KEY_ATTRIBUTE: &str = "key";

/// Attribute map used both to tag new items and as a search predicate.
pub type Attributes = HashMap<String, String>;

/// Build the attribute map for `folder`, scoped to `key` when one is given.
pub fn attributes_for(folder: &str, key: Option<&str>) -> Attributes {
    let mut attributes = HashMap::with_capacity(2);
    attributes.insert(FOLDER_ATTRIBUTE.to_string(), folder.to_string());
    if let Some(key) = key {
        attributes.insert(KEY_ATTRIBUTE.to_string(), key.to_string());
    }
    attributes
}

/// Display label for an item. Never used for lookup.
pub fn label_for(folder: &str, key: &str) -> String {
    format!("{folder}/{key}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_with_key() {
        let attrs = attributes_for("MyApp", Some("token"));
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[FOLDER_ATTRIBUTE], "MyApp");
        assert_eq!(attrs[KEY_ATTRIBUTE], "token");
    }

    #[test]
    fn test_attributes_folder_only() {
        let attrs = attributes_for("MyApp", None);
        assert_eq!(attrs.len(), 1);
        assert!(!attrs.contains_key(KEY_ATTRIBUTE));
    }

    #[test]
    fn test_label() {
        assert_eq!(label_for("MyApp", "db/password"), "MyApp/db/password");
    }
}
