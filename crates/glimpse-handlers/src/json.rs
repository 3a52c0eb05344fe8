//! JSON tree view for files and values.

use std::io::BufReader;
use std::path::Path;

use glimpse_core::{
    ExtensionHandler, ExtensionSet, FileHandler, FocusKind, FocusTarget, HandlerConfig, HandlerError,
    ObjectHandler, Preview, PreviewContent, PreviewObject, TreeNode, TypeKey,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::open_checked;

/// Options accepted by the JSON handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct JsonOptions {
    /// Depth below which containers are collapsed into a summary leaf.
    pub max_depth: usize,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self { max_depth: 32 }
    }
}

/// Shows `.json` files as a tree.
#[derive(Debug, Clone, Default)]
pub struct JsonTreeHandler {
    options: JsonOptions,
}

impl JsonTreeHandler {
    pub const ID: &'static str = "json-tree";

    /// Build from a configuration.
    pub fn from_config(config: &HandlerConfig) -> Result<Self, HandlerError> {
        Ok(Self {
            options: config.options()?,
        })
    }
}

impl ExtensionHandler for JsonTreeHandler {
    fn extensions(&self) -> ExtensionSet {
        ExtensionSet::of(&["json"])
    }
}

impl FileHandler for JsonTreeHandler {
    fn create(&self, path: &Path) -> Result<Preview, HandlerError> {
        let reader = BufReader::new(open_checked(path)?);
        let value: Value = serde_json::from_reader(reader)
            .map_err(|e| HandlerError::render(format!("Invalid JSON in {}: {e}", path.display())))?;
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "root".to_string());
        Ok(tree_preview(&label, &value, self.options.max_depth))
    }
}

/// Shows in-memory `serde_json::Value`s as a tree.
#[derive(Debug, Clone, Default)]
pub struct JsonValueHandler {
    options: JsonOptions,
}

impl JsonValueHandler {
    pub const ID: &'static str = "json-value";

    /// Build from a configuration.
    pub fn from_config(config: &HandlerConfig) -> Result<Self, HandlerError> {
        Ok(Self {
            options: config.options()?,
        })
    }
}

impl ObjectHandler for JsonValueHandler {
    fn can_handle(&self, ty: TypeKey) -> bool {
        ty.is::<Value>()
    }

    fn create(&self, object: &dyn PreviewObject) -> Result<Preview, HandlerError> {
        let value = object
            .as_any()
            .downcast_ref::<Value>()
            .ok_or_else(|| HandlerError::render(format!("Not a JSON value: {}", object.type_key())))?;
        Ok(tree_preview("root", value, self.options.max_depth))
    }
}

fn tree_preview(label: &str, value: &Value, max_depth: usize) -> Preview {
    Preview::new(PreviewContent::Tree {
        root: to_tree(label, value, max_depth),
    })
    .with_focus(FocusTarget::new(FocusKind::Tree))
}

/// Convert a JSON value into a labelled tree.
pub fn to_tree(label: &str, value: &Value, depth: usize) -> TreeNode {
    match value {
        Value::Object(map) if depth == 0 => TreeNode::leaf(format!("{label}: {{{} keys}}", map.len())),
        Value::Array(items) if depth == 0 => TreeNode::leaf(format!("{label}: [{} items]", items.len())),
        Value::Object(map) => TreeNode::branch(
            label,
            map.iter().map(|(k, v)| to_tree(k, v, depth - 1)).collect(),
        ),
        Value::Array(items) => TreeNode::branch(
            label,
            items
                .iter()
                .enumerate()
                .map(|(i, v)| to_tree(&format!("[{i}]"), v, depth - 1))
                .collect(),
        ),
        scalar => TreeNode::leaf(format!("{label}: {scalar}")),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_tree_shape() {
        let value = json!({"name": "glimpse", "tags": ["a", "b"]});
        let tree = to_tree("root", &value, 8);
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].label, "name: \"glimpse\"");
        assert_eq!(tree.children[1].children[1].label, "[1]: \"b\"");
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn test_depth_limit_summarizes() {
        let value = json!({"outer": {"inner": {"x": 1}}});
        let tree = to_tree("root", &value, 1);
        assert_eq!(tree.children[0].label, "outer: {1 keys}");
    }

    #[test]
    fn test_invalid_json_is_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ nope").unwrap();
        let err = JsonTreeHandler::default().create(&path).unwrap_err();
        assert!(matches!(err, HandlerError::Render { .. }));
    }

    #[test]
    fn test_value_handler_only_accepts_values() {
        let handler = JsonValueHandler::default();
        assert!(handler.can_handle(TypeKey::of::<Value>()));
        assert!(!handler.can_handle(TypeKey::of::<String>()));

        let value = json!([1, 2]);
        let preview = ObjectHandler::create(&handler, &value).unwrap();
        assert!(matches!(preview.content(), PreviewContent::Tree { root } if root.children.len() == 2));
    }
}
