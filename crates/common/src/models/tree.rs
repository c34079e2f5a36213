//! Arena-style section tree for report structures
//!
//! Nodes are stored in a flat map addressed by id, with parent/children kept
//! as id references. Mutation happens through targeted lookups instead of
//! recursive deep copies of the whole structure.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::Reference;

/// One entry in the outline tree being turned into prose
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionNode {
    pub id: Uuid,

    pub title: String,

    /// 0 = synthetic root, 1 = section, 2 = subsection
    pub level: usize,

    pub parent_id: Option<Uuid>,

    /// Child ids in document order
    pub children: Vec<Uuid>,

    /// References reconciled from this node's generated prose
    pub references: Vec<Reference>,

    /// Generated prose; populated once, then memoized
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// The report structure: a tree of sections and subsections rooted at a
/// synthetic level-0 node.
///
/// Generation templates bound the depth at 2 (root, section, subsection)
/// but the structure itself carries no artificial depth limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionTree {
    pub root: Uuid,
    pub nodes: HashMap<Uuid, SectionNode>,
}

impl SectionTree {
    /// Create a tree holding only the synthetic root
    pub fn new() -> Self {
        let root = Uuid::new_v4();
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            SectionNode {
                id: root,
                title: String::new(),
                level: 0,
                parent_id: None,
                children: Vec::new(),
                references: Vec::new(),
                content: None,
            },
        );
        Self { root, nodes }
    }

    /// Add a child under `parent`, returning the fresh node id.
    ///
    /// Ids are generated, never derived from title text, so sections with
    /// identical titles stay distinct. Returns `None` when the parent is
    /// not part of this tree.
    pub fn add_child(&mut self, parent: Uuid, title: impl Into<String>) -> Option<Uuid> {
        let parent_level = self.nodes.get(&parent)?.level;
        let id = Uuid::new_v4();
        self.nodes.insert(
            id,
            SectionNode {
                id,
                title: title.into(),
                level: parent_level + 1,
                parent_id: Some(parent),
                children: Vec::new(),
                references: Vec::new(),
                content: None,
            },
        );
        // Parent existence was checked above
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.push(id);
        }
        Some(id)
    }

    pub fn get(&self, id: Uuid) -> Option<&SectionNode> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut SectionNode> {
        self.nodes.get_mut(&id)
    }

    /// Immediate children of the root, in document order
    pub fn top_level(&self) -> Vec<Uuid> {
        self.nodes
            .get(&self.root)
            .map(|root| root.children.clone())
            .unwrap_or_default()
    }

    /// Node ids in document order (depth-first, children in insertion
    /// order), root excluded
    pub fn document_order(&self) -> Vec<Uuid> {
        let mut order = Vec::with_capacity(self.nodes.len().saturating_sub(1));
        let mut stack: Vec<Uuid> = self.top_level().into_iter().rev().collect();
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(&id) {
                order.push(id);
                for child in node.children.iter().rev() {
                    stack.push(*child);
                }
            }
        }
        order
    }

    /// Number of nodes excluding the synthetic root
    pub fn section_count(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    /// Populate a node's content and references exactly once.
    ///
    /// Returns false without touching the node when content is already
    /// present; re-expanding a populated node is a no-op.
    pub fn populate(&mut self, id: Uuid, content: String, references: Vec<Reference>) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) if node.content.is_none() => {
                node.content = Some(content);
                node.references = references;
                true
            }
            _ => false,
        }
    }

    /// Check structural invariants: every non-root parent_id resolves
    /// within the tree and child level equals parent level + 1
    pub fn is_consistent(&self) -> bool {
        self.nodes.values().all(|node| {
            if node.id == self.root {
                return node.parent_id.is_none() && node.level == 0;
            }
            match node.parent_id.and_then(|pid| self.nodes.get(&pid)) {
                Some(parent) => {
                    parent.children.contains(&node.id) && node.level == parent.level + 1
                }
                None => false,
            }
        })
    }
}

impl Default for SectionTree {
    fn default() -> Self {
        Self::new()
    }
}

/// A linear outline entry used by the simpler outline flow.
///
/// Distinct from the tree: sections here support an explicit edit/update
/// action, while populated tree nodes are never edited back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineSection {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub references: Vec<Reference>,
}

impl OutlineSection {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            content: content.into(),
            references: Vec::new(),
        }
    }
}
