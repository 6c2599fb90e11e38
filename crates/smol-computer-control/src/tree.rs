//! UI tree capture.
//!
//! A capture walks the provider depth-first from the active root and copies
//! every node into an owned [`UiSnapshot`]. The snapshot is what the planner
//! sees; it is immutable and dropped at the end of the iteration that made it.

use serde::Serialize;
use tracing::debug;

use crate::error::ControlError;
use crate::types::{NodeAttributes, NodeHandle};
use crate::UiProvider;

/// Nodes nested deeper than this are not walked.
const MAX_CAPTURE_DEPTH: usize = 64;

/// One element of a captured tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UiNode {
    #[serde(skip)]
    pub handle: NodeHandle,
    pub class_name: String,
    pub text: Option<String>,
    pub description: Option<String>,
    pub visible: bool,
    pub clickable: bool,
    pub children: Vec<UiNode>,
}

impl UiNode {
    fn from_attributes(handle: NodeHandle, attrs: NodeAttributes) -> Self {
        Self {
            handle,
            class_name: attrs.class_name,
            text: attrs.text,
            description: attrs.description,
            visible: attrs.visible,
            clickable: attrs.clickable,
            children: Vec::new(),
        }
    }

    /// Last segment of the fully qualified class name.
    pub fn leaf_class_name(&self) -> &str {
        match self.class_name.rsplit('.').next() {
            Some(leaf) if !leaf.is_empty() => leaf,
            _ => "Unknown",
        }
    }

    /// Text shown for this node: its text, else its content description.
    pub fn label(&self) -> &str {
        self.text
            .as_deref()
            .or(self.description.as_deref())
            .unwrap_or("")
    }

    /// Exact match on text, falling back to the content description.
    pub fn matches_text(&self, target: &str) -> bool {
        self.text.as_deref() == Some(target) || self.description.as_deref() == Some(target)
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        if self.visible {
            let indent = "  ".repeat(depth);
            out.push_str(&format!(
                "{}[{}] {} (Clickable: {})\n",
                indent,
                self.leaf_class_name(),
                self.label(),
                self.clickable
            ));
        }

        // Hidden containers can still hold visible descendants.
        for child in &self.children {
            child.render_into(out, depth + 1);
        }
    }

    fn find<'a>(&'a self, target: &str) -> Option<&'a UiNode> {
        if self.visible && self.matches_text(target) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(target))
    }

    fn count(&self) -> usize {
        1 + self.children.iter().map(UiNode::count).sum::<usize>()
    }
}

/// An immutable capture of the element hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UiSnapshot {
    pub root: UiNode,
}

impl UiSnapshot {
    /// Flattened projection sent to the planner: one line per visible node,
    /// indented two spaces per level.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.root.render_into(&mut out, 0);
        out
    }

    /// First visible node, depth-first, whose text (or description) equals
    /// `target`.
    pub fn find_by_text(&self, target: &str) -> Option<&UiNode> {
        self.root.find(target)
    }

    pub fn node_count(&self) -> usize {
        self.root.count()
    }
}

/// Snapshot the active window.
pub fn capture(ui: &dyn UiProvider) -> Result<UiSnapshot, ControlError> {
    let root = ui.root().ok_or(ControlError::NoActiveWindow)?;
    let root = capture_node(ui, root)?;
    Ok(UiSnapshot { root })
}

/// Copy the subtree rooted at `handle`.
pub fn capture_node(ui: &dyn UiProvider, handle: NodeHandle) -> Result<UiNode, ControlError> {
    let attrs = ui.attributes(handle)?;
    let mut node = UiNode::from_attributes(handle, attrs);
    fill_children(ui, &mut node, 0);
    Ok(node)
}

fn fill_children(ui: &dyn UiProvider, node: &mut UiNode, depth: usize) {
    if depth >= MAX_CAPTURE_DEPTH {
        debug!("Capture depth limit reached at {}", node.handle);
        return;
    }

    let children = match ui.children(node.handle) {
        Ok(children) => children,
        Err(e) => {
            debug!("Skipping children of {}: {}", node.handle, e);
            return;
        }
    };

    for handle in children {
        // Nodes can disappear while we walk; drop them rather than the capture.
        match ui.attributes(handle) {
            Ok(attrs) => {
                let mut child = UiNode::from_attributes(handle, attrs);
                fill_children(ui, &mut child, depth + 1);
                node.children.push(child);
            }
            Err(e) => debug!("Skipping node {}: {}", handle, e),
        }
    }
}
