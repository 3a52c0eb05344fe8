//! The preview artifact returned by handlers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Hook run once when a preview is discarded.
pub type CleanupHook = Box<dyn FnOnce() + Send>;

/// Transient and fallback states shown instead of rendered content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Placeholder {
    /// A render is in progress.
    Creating,
    /// No handler can render the selection.
    NoPreview,
    /// The handler failed.
    Failed { message: String },
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Creating => write!(f, "Creating view..."),
            Self::NoPreview => write!(f, "No preview available"),
            Self::Failed { message } => write!(f, "Failed to create preview: {message}"),
        }
    }
}

/// A node of a tree view.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TreeNode {
    pub label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Create a leaf node.
    pub fn leaf(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            children: Vec::new(),
        }
    }

    /// Create a node with children.
    pub fn branch(label: impl Into<String>, children: Vec<TreeNode>) -> Self {
        Self {
            label: label.into(),
            children,
        }
    }

    /// Number of nodes in this subtree, including itself.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(TreeNode::len).sum::<usize>()
    }

    /// Always false; a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Content that a preview displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PreviewContent {
    /// Plain or formatted text lines.
    Text {
        lines: Vec<String>,
        total_lines: usize,
    },
    /// Hex dump lines.
    Hex {
        lines: Vec<String>,
        total_bytes: u64,
    },
    /// Hierarchical view.
    Tree { root: TreeNode },
    /// Tabular view.
    Table {
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    /// Placeholder state.
    Placeholder(Placeholder),
}

impl Default for PreviewContent {
    fn default() -> Self {
        Self::Placeholder(Placeholder::NoPreview)
    }
}

/// Kind of sub-view that receives focus and search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusKind {
    #[default]
    Text,
    Tree,
    Table,
}

/// A search carried from one preview to the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    pub regex: bool,
}

impl SearchQuery {
    /// A plain-text search.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            regex: false,
        }
    }
}

/// The focusable, searchable part of a preview.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FocusTarget {
    pub kind: FocusKind,
    pub search: Option<SearchQuery>,
}

impl FocusTarget {
    /// A focus target without an active search.
    pub fn new(kind: FocusKind) -> Self {
        Self { kind, search: None }
    }
}

/// A rendered preview: content, an optional focus target and an optional
/// cleanup hook.
///
/// The cleanup hook runs exactly once, when the preview is dropped. A
/// handler that rebuilds a preview during reuse can move the hook over with
/// [`Preview::take_cleanup`].
pub struct Preview {
    content: PreviewContent,
    focus: Option<FocusTarget>,
    cleanup: Option<CleanupHook>,
}

impl Preview {
    /// Create a preview showing `content`.
    pub fn new(content: PreviewContent) -> Self {
        Self {
            content,
            focus: None,
            cleanup: None,
        }
    }

    /// Create a placeholder preview.
    pub fn placeholder(placeholder: Placeholder) -> Self {
        Self::new(PreviewContent::Placeholder(placeholder))
    }

    /// The transient "creating" placeholder.
    pub fn creating() -> Self {
        Self::placeholder(Placeholder::Creating)
    }

    /// The "no preview" placeholder.
    pub fn no_preview() -> Self {
        Self::placeholder(Placeholder::NoPreview)
    }

    /// The "failed" placeholder.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::placeholder(Placeholder::Failed {
            message: message.into(),
        })
    }

    /// Attach a focus target.
    pub fn with_focus(mut self, focus: FocusTarget) -> Self {
        self.focus = Some(focus);
        self
    }

    /// Attach a cleanup hook, replacing (and running) any previous one.
    pub fn with_cleanup(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        if let Some(previous) = self.cleanup.replace(Box::new(hook)) {
            previous();
        }
        self
    }

    /// The displayed content.
    pub fn content(&self) -> &PreviewContent {
        &self.content
    }

    /// Replace the displayed content.
    pub fn set_content(&mut self, content: PreviewContent) {
        self.content = content;
    }

    /// The focus target, if any.
    pub fn focus(&self) -> Option<&FocusTarget> {
        self.focus.as_ref()
    }

    /// Mutable access to the focus target.
    pub fn focus_mut(&mut self) -> Option<&mut FocusTarget> {
        self.focus.as_mut()
    }

    /// The placeholder shown, if this preview is one.
    pub fn as_placeholder(&self) -> Option<&Placeholder> {
        match &self.content {
            PreviewContent::Placeholder(p) => Some(p),
            _ => None,
        }
    }

    /// Whether this preview is a placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.as_placeholder().is_some()
    }

    /// Detach the cleanup hook without running it.
    pub fn take_cleanup(&mut self) -> Option<CleanupHook> {
        self.cleanup.take()
    }

    /// Discard the preview, running its cleanup hook.
    pub fn clean_up(self) {
        drop(self);
    }
}

impl Drop for Preview {
    fn drop(&mut self) {
        if let Some(hook) = self.cleanup.take() {
            hook();
        }
    }
}

impl fmt::Debug for Preview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Preview")
            .field("content", &self.content)
            .field("focus", &self.focus)
            .field("cleanup", &self.cleanup.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_cleanup_runs_once_on_drop() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let preview = Preview::new(PreviewContent::Text {
            lines: vec!["a".into()],
            total_lines: 1,
        })
        .with_cleanup(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(count.load(Ordering::SeqCst), 0);
        preview.clean_up();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_take_cleanup_transfers_hook() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let mut old = Preview::no_preview().with_cleanup(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        let hook = old.take_cleanup().unwrap();
        drop(old);
        assert_eq!(count.load(Ordering::SeqCst), 0);

        let new = Preview::creating().with_cleanup(hook);
        drop(new);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_placeholders() {
        assert!(Preview::creating().is_placeholder());
        assert_eq!(
            Preview::failed("boom").as_placeholder(),
            Some(&Placeholder::Failed {
                message: "boom".into()
            })
        );
        assert_eq!(Placeholder::NoPreview.to_string(), "No preview available");
    }

    #[test]
    fn test_tree_len() {
        let tree = TreeNode::branch("root", vec![TreeNode::leaf("a"), TreeNode::branch("b", vec![TreeNode::leaf("c")])]);
        assert_eq!(tree.len(), 4);
    }
}
