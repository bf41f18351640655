//! # Hierarchy: Parent/Child Relationships
//!
//! Every entity has exactly one hierarchy node: a parent, an ordered list of
//! children and a display name. Nodes live beside the archetype storage so
//! moving an entity between archetypes never touches the tree.
//!
//! There is exactly one root. It is its own parent, has no transform of its
//! own, and can be neither destroyed nor reparented. Every other node hangs
//! off it, directly or through other nodes, with no cycles.
//!
//! ```text
//! Root
//! ├── Ground
//! │   └── Wall
//! └── Camera
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use super::entity::Entity;
use crate::error::WorldError;

/// Where a node sits in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Root,
    Attached(Entity),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Entity,
    children: Vec<Entity>,
    name: String,
}

/// The scene tree, keyed by entity.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    root: Entity,
    nodes: HashMap<Entity, Node>,
}

impl Hierarchy {
    pub(crate) fn new(root: Entity, name: &str) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            Node {
                parent: root,
                children: Vec::new(),
                name: name.to_string(),
            },
        );
        Self { root, nodes }
    }

    pub fn root(&self) -> Entity {
        self.root
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.nodes.contains_key(&entity)
    }

    fn node(&self, entity: Entity) -> Result<&Node, WorldError> {
        self.nodes.get(&entity).ok_or(WorldError::NoHierarchyNode(entity))
    }

    fn node_mut(&mut self, entity: Entity) -> Result<&mut Node, WorldError> {
        self.nodes
            .get_mut(&entity)
            .ok_or(WorldError::NoHierarchyNode(entity))
    }

    /// Register `entity` as the last child of `parent`.
    pub(crate) fn attach(&mut self, entity: Entity, parent: Entity, name: &str) -> Result<(), WorldError> {
        self.node_mut(parent)?.children.push(entity);
        self.nodes.insert(
            entity,
            Node {
                parent,
                children: Vec::new(),
                name: name.to_string(),
            },
        );
        Ok(())
    }

    /// The root's parent is the root itself.
    pub fn parent(&self, entity: Entity) -> Result<Entity, WorldError> {
        Ok(self.node(entity)?.parent)
    }

    pub fn state(&self, entity: Entity) -> Result<NodeState, WorldError> {
        let node = self.node(entity)?;
        Ok(if entity == self.root {
            NodeState::Root
        } else {
            NodeState::Attached(node.parent)
        })
    }

    /// Children in insertion order.
    pub fn children(&self, entity: Entity) -> Result<&[Entity], WorldError> {
        Ok(&self.node(entity)?.children)
    }

    pub fn name(&self, entity: Entity) -> Result<&str, WorldError> {
        Ok(&self.node(entity)?.name)
    }

    pub(crate) fn rename(&mut self, entity: Entity, name: &str) -> Result<(), WorldError> {
        self.node_mut(entity)?.name = name.to_string();
        Ok(())
    }

    /// Parent chain from `entity` (exclusive) up to the root (inclusive).
    ///
    /// The walk is bounded by the node count, so a corrupted chain fails with
    /// `HierarchyCycle` instead of spinning.
    pub fn ancestors(&self, entity: Entity) -> Result<Vec<Entity>, WorldError> {
        let mut chain = Vec::new();
        let mut current = entity;
        self.node(entity)?;
        while current != self.root {
            if chain.len() >= self.nodes.len() {
                return Err(WorldError::HierarchyCycle(entity));
            }
            let parent = self.node(current)?.parent;
            if !self.nodes.contains_key(&parent) {
                return Err(WorldError::Orphan {
                    entity: current,
                    parent,
                });
            }
            chain.push(parent);
            current = parent;
        }
        Ok(chain)
    }

    /// Distance from the root. The root is at depth 0.
    pub fn depth(&self, entity: Entity) -> Result<usize, WorldError> {
        Ok(self.ancestors(entity)?.len())
    }

    /// Whether `ancestor` appears on `entity`'s parent chain.
    pub fn is_ancestor(&self, ancestor: Entity, entity: Entity) -> Result<bool, WorldError> {
        Ok(self.ancestors(entity)?.contains(&ancestor))
    }

    /// Move `entity` to the end of `new_parent`'s children.
    pub(crate) fn reparent(&mut self, entity: Entity, new_parent: Entity) -> Result<(), WorldError> {
        if entity == self.root {
            return Err(WorldError::RootProtected);
        }
        self.node(new_parent)?;
        if entity == new_parent || self.is_ancestor(entity, new_parent)? {
            return Err(WorldError::HierarchyCycle(entity));
        }
        let old_parent = self.node(entity)?.parent;
        self.node_mut(old_parent)?.children.retain(|&c| c != entity);
        self.node_mut(new_parent)?.children.push(entity);
        self.node_mut(entity)?.parent = new_parent;
        Ok(())
    }

    /// `entity` followed by its whole subtree, parents before children,
    /// siblings in insertion order.
    pub fn descendants_pre_order(&self, entity: Entity) -> Result<Vec<Entity>, WorldError> {
        self.node(entity)?;
        let mut out = Vec::new();
        let mut stack = vec![entity];
        while let Some(current) = stack.pop() {
            if out.len() > self.nodes.len() {
                return Err(WorldError::HierarchyCycle(entity));
            }
            out.push(current);
            let node = self.node(current)?;
            stack.extend(node.children.iter().rev());
        }
        Ok(out)
    }

    /// Every node, pre-order from the root.
    pub fn pre_order(&self) -> Result<Vec<Entity>, WorldError> {
        self.descendants_pre_order(self.root)
    }

    /// Drop `entity` and its subtree from the tree. Returns the removed
    /// entities in pre-order.
    pub(crate) fn remove_subtree(&mut self, entity: Entity) -> Result<Vec<Entity>, WorldError> {
        if entity == self.root {
            return Err(WorldError::RootProtected);
        }
        let removed = self.descendants_pre_order(entity)?;
        let parent = self.node(entity)?.parent;
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.retain(|&c| c != entity);
        }
        for e in &removed {
            self.nodes.remove(e);
        }
        Ok(removed)
    }

    /// Full integrity check: root is its own parent, parent and child links
    /// agree, and every node is reachable from the root exactly once.
    pub fn validate(&self) -> Result<(), WorldError> {
        let root = self.node(self.root)?;
        if root.parent != self.root {
            return Err(WorldError::Orphan {
                entity: self.root,
                parent: root.parent,
            });
        }

        let mut seen = HashSet::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                return Err(WorldError::HierarchyCycle(current));
            }
            for &child in &self.node(current)?.children {
                let node = self.node(child)?;
                if node.parent != current || child == self.root {
                    return Err(WorldError::Orphan {
                        entity: child,
                        parent: node.parent,
                    });
                }
                stack.push(child);
            }
        }

        // Anything not reached from the root is either orphaned or sits on
        // a detached loop.
        if let Some((&entity, node)) = self.nodes.iter().find(|(e, _)| !seen.contains(*e)) {
            return Err(if self.nodes.contains_key(&node.parent) {
                WorldError::HierarchyCycle(entity)
            } else {
                WorldError::Orphan {
                    entity,
                    parent: node.parent,
                }
            });
        }
        Ok(())
    }

    /// Indented pre-order dump, one line per node.
    pub fn format_tree(&self) -> Result<String, WorldError> {
        let mut out = String::new();
        let mut stack = vec![(self.root, 0usize)];
        while let Some((entity, depth)) = stack.pop() {
            let node = self.node(entity)?;
            let _ = writeln!(out, "{:indent$}{} ({})", "", node.name, entity, indent = depth * 2);
            if depth > self.nodes.len() {
                return Err(WorldError::HierarchyCycle(entity));
            }
            stack.extend(node.children.iter().rev().map(|&c| (c, depth + 1)));
        }
        Ok(out)
    }

    #[cfg(test)]
    pub(crate) fn force_parent(&mut self, entity: Entity, parent: Entity) {
        if let Some(node) = self.nodes.get_mut(&entity) {
            node.parent = parent;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(index: u32) -> Entity {
        Entity {
            index,
            generation: 0,
        }
    }

    /// Root(0) -> A(1) -> B(2), Root -> C(3)
    fn sample() -> Hierarchy {
        let mut h = Hierarchy::new(e(0), "Root");
        h.attach(e(1), e(0), "A").unwrap();
        h.attach(e(2), e(1), "B").unwrap();
        h.attach(e(3), e(0), "C").unwrap();
        h
    }

    #[test]
    fn root_is_its_own_parent() {
        let h = sample();
        assert_eq!(h.parent(e(0)).unwrap(), e(0));
        assert_eq!(h.state(e(0)).unwrap(), NodeState::Root);
        assert_eq!(h.state(e(2)).unwrap(), NodeState::Attached(e(1)));
        h.validate().unwrap();
    }

    #[test]
    fn children_keep_insertion_order() {
        let h = sample();
        assert_eq!(h.children(e(0)).unwrap(), &[e(1), e(3)]);
        assert_eq!(h.depth(e(2)).unwrap(), 2);
        assert_eq!(h.depth(e(0)).unwrap(), 0);
    }

    #[test]
    fn pre_order_visits_parents_first() {
        let h = sample();
        assert_eq!(h.pre_order().unwrap(), vec![e(0), e(1), e(2), e(3)]);
        assert_eq!(h.descendants_pre_order(e(1)).unwrap(), vec![e(1), e(2)]);
    }

    #[test]
    fn reparent_moves_to_end() {
        let mut h = sample();
        h.reparent(e(1), e(3)).unwrap();
        assert_eq!(h.children(e(0)).unwrap(), &[e(3)]);
        assert_eq!(h.children(e(3)).unwrap(), &[e(1)]);
        assert_eq!(h.depth(e(2)).unwrap(), 3);
        h.validate().unwrap();
    }

    #[test]
    fn reparent_rejects_cycles() {
        let mut h = sample();
        assert_eq!(h.reparent(e(1), e(2)), Err(WorldError::HierarchyCycle(e(1))));
        assert_eq!(h.reparent(e(1), e(1)), Err(WorldError::HierarchyCycle(e(1))));
        assert_eq!(h.reparent(e(0), e(1)), Err(WorldError::RootProtected));
        h.validate().unwrap();
    }

    #[test]
    fn remove_subtree_detaches_from_parent() {
        let mut h = sample();
        let removed = h.remove_subtree(e(1)).unwrap();
        assert_eq!(removed, vec![e(1), e(2)]);
        assert_eq!(h.children(e(0)).unwrap(), &[e(3)]);
        assert!(!h.contains(e(2)));
        assert_eq!(h.len(), 2);
        h.validate().unwrap();
    }

    #[test]
    fn corrupted_chain_is_reported() {
        let mut h = sample();
        h.force_parent(e(1), e(2));
        assert_eq!(h.depth(e(2)), Err(WorldError::HierarchyCycle(e(2))));
        assert!(h.validate().is_err());

        let mut h = sample();
        h.force_parent(e(3), e(9));
        assert_eq!(
            h.ancestors(e(3)),
            Err(WorldError::Orphan {
                entity: e(3),
                parent: e(9)
            })
        );
    }

    #[test]
    fn tree_dump_is_indented() {
        let h = sample();
        let dump = h.format_tree().unwrap();
        assert_eq!(dump, "Root (0v0)\n  A (1v0)\n    B (2v0)\n  C (3v0)\n");
    }
}
