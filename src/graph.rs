//! Conversation tree: nodes on the canvas and the parent links between them

use crate::constants::*;
use crate::types::{Author, NodeId};
use chrono::{DateTime, Local};
use egui::{Pos2, Rect, Vec2};
use std::collections::HashSet;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GraphError {
    #[error("parent node {0} does not exist")]
    UnknownParent(NodeId),
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),
}

/// A single turn of the conversation
#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeId,
    pub pos: Pos2, // top-left, world space
    pub size: Vec2,
    pub text: String,
    pub author: Author,
    pub parent: Option<NodeId>,
    pub created_at: DateTime<Local>,
    pub streaming: bool,
}

impl Node {
    pub fn rect(&self) -> Rect {
        Rect::from_min_size(self.pos, self.size)
    }

    /// Bottom-right grip used to resize the node
    pub fn resize_handle(&self, handle: f32) -> Rect {
        let max = self.rect().max;
        Rect::from_min_max(max - Vec2::splat(handle), max)
    }
}

/// Nodes are kept in z-order: the last node is drawn on top.
#[derive(Default)]
pub struct ChatGraph {
    nodes: Vec<Node>,
    next_id: u64,
}

impl ChatGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(
        &mut self,
        author: Author,
        text: impl Into<String>,
        parent: Option<NodeId>,
        pos: Pos2,
    ) -> Result<NodeId, GraphError> {
        if let Some(p) = parent {
            if !self.contains(p) {
                return Err(GraphError::UnknownParent(p));
            }
        }
        self.next_id += 1;
        let id = NodeId(self.next_id);
        self.nodes.push(Node {
            id,
            pos,
            size: Vec2::new(NODE_DEFAULT_WIDTH, NODE_MIN_HEIGHT),
            text: text.into(),
            author,
            parent,
            created_at: Local::now(),
            streaming: false,
        });
        Ok(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Bottom-most node first
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.iter_mut()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Children in creation order
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut kids: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|n| n.parent == Some(id))
            .map(|n| n.id)
            .collect();
        kids.sort();
        kids
    }

    /// Derived (parent, child) pairs
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        self.nodes
            .iter()
            .filter_map(|n| n.parent.map(|p| (p, n.id)))
            .collect()
    }

    /// Path from the root down to `id`, inclusive
    pub fn ancestry(&self, id: NodeId) -> Result<Vec<&Node>, GraphError> {
        let mut path = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.get(current).ok_or(GraphError::UnknownNode(current))?;
            path.push(node);
            cursor = node.parent;
        }
        path.reverse();
        Ok(path)
    }

    /// Remove a node and every descendant. Returns the removed ids.
    pub fn remove_subtree(&mut self, id: NodeId) -> Vec<NodeId> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut doomed: HashSet<NodeId> = HashSet::from([id]);
        // Children always have larger ids than their parents, so one pass in id order suffices
        let mut ordered: Vec<(NodeId, Option<NodeId>)> =
            self.nodes.iter().map(|n| (n.id, n.parent)).collect();
        ordered.sort_by_key(|(nid, _)| *nid);
        for (nid, parent) in ordered {
            if parent.is_some_and(|p| doomed.contains(&p)) {
                doomed.insert(nid);
            }
        }
        let mut removed: Vec<NodeId> = doomed.into_iter().collect();
        removed.sort();
        self.nodes.retain(|n| removed.binary_search(&n.id).is_err());
        removed
    }

    pub fn bring_to_front(&mut self, id: NodeId) {
        if let Some(idx) = self.nodes.iter().position(|n| n.id == id) {
            let node = self.nodes.remove(idx);
            self.nodes.push(node);
        }
    }

    /// Topmost node containing the world-space point
    pub fn hit_test(&self, world: Pos2) -> Option<NodeId> {
        self.nodes
            .iter()
            .rev()
            .find(|n| n.rect().contains(world))
            .map(|n| n.id)
    }

    /// Node whose resize grip is under the point, if that node is the topmost hit
    pub fn hit_resize_handle(&self, world: Pos2, handle: f32) -> Option<NodeId> {
        let id = self.hit_test(world)?;
        let node = self.get(id)?;
        node.resize_handle(handle).contains(world).then_some(id)
    }

    pub fn bounds(&self) -> Option<Rect> {
        self.nodes
            .iter()
            .map(Node::rect)
            .reduce(|acc, r| acc.union(r))
    }

    /// Where to place a new child: below the parent, right of its rightmost existing child
    pub fn child_position(&self, parent: NodeId) -> Option<Pos2> {
        let node = self.get(parent)?;
        let x = self
            .nodes
            .iter()
            .filter(|n| n.parent == Some(parent))
            .map(|n| n.rect().max.x + NODE_GAP_X)
            .reduce(f32::max)
            .unwrap_or(node.pos.x);
        Some(Pos2::new(x, node.pos.y + node.size.y + NODE_GAP_Y))
    }

    /// Where to place a new root: to the right of everything on the canvas
    pub fn next_root_position(&self) -> Pos2 {
        match self.bounds() {
            Some(b) => Pos2::new(b.max.x + NODE_GAP_X * 2.0, b.min.y),
            None => Pos2::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (ChatGraph, NodeId, NodeId, NodeId) {
        let mut g = ChatGraph::new();
        let root = g.add_node(Author::User, "hi", None, Pos2::ZERO).unwrap();
        let reply = g
            .add_node(Author::Assistant, "hello", Some(root), Pos2::new(0.0, 200.0))
            .unwrap();
        let follow = g
            .add_node(Author::User, "more", Some(reply), Pos2::new(0.0, 400.0))
            .unwrap();
        (g, root, reply, follow)
    }

    #[test]
    fn rejects_missing_parent() {
        let mut g = ChatGraph::new();
        let err = g.add_node(Author::User, "x", Some(NodeId(99)), Pos2::ZERO);
        assert_eq!(err, Err(GraphError::UnknownParent(NodeId(99))));
        assert!(g.is_empty());
    }

    #[test]
    fn ancestry_runs_root_to_leaf() {
        let (g, root, reply, follow) = sample();
        let path: Vec<NodeId> = g.ancestry(follow).unwrap().iter().map(|n| n.id).collect();
        assert_eq!(path, vec![root, reply, follow]);
        assert_eq!(g.edges().len(), 2);
    }

    #[test]
    fn remove_subtree_leaves_no_dangling_parents() {
        let (mut g, root, reply, follow) = sample();
        let side = g
            .add_node(Author::Assistant, "alt", Some(root), Pos2::new(400.0, 200.0))
            .unwrap();
        let removed = g.remove_subtree(reply);
        assert_eq!(removed, vec![reply, follow]);
        assert!(g.contains(root) && g.contains(side));
        assert!(g.iter().all(|n| n.parent.map_or(true, |p| g.contains(p))));
    }

    #[test]
    fn hit_test_prefers_topmost() {
        let mut g = ChatGraph::new();
        let a = g.add_node(Author::User, "a", None, Pos2::ZERO).unwrap();
        let b = g.add_node(Author::User, "b", None, Pos2::new(50.0, 10.0)).unwrap();
        let overlap = Pos2::new(60.0, 20.0);
        assert_eq!(g.hit_test(overlap), Some(b));
        g.bring_to_front(a);
        assert_eq!(g.hit_test(overlap), Some(a));
        assert_eq!(g.hit_test(Pos2::new(-5.0, -5.0)), None);
    }

    #[test]
    fn resize_handle_only_at_corner() {
        let mut g = ChatGraph::new();
        let a = g.add_node(Author::User, "a", None, Pos2::ZERO).unwrap();
        let corner = g.get(a).unwrap().rect().max - Vec2::splat(2.0);
        assert_eq!(g.hit_resize_handle(corner, RESIZE_HANDLE), Some(a));
        assert_eq!(g.hit_resize_handle(Pos2::new(5.0, 5.0), RESIZE_HANDLE), None);
    }

    #[test]
    fn siblings_are_placed_side_by_side() {
        let (mut g, root, _, _) = sample();
        let second = g.child_position(root).unwrap();
        assert_eq!(second.x, NODE_DEFAULT_WIDTH + NODE_GAP_X);
        g.add_node(Author::Assistant, "", Some(root), second).unwrap();
        let third = g.child_position(root).unwrap();
        assert!(third.x > second.x);
    }

    fn overlaps_any(g: &ChatGraph, pos: Pos2, width: f32) -> bool {
        let rect = Rect::from_min_size(pos, Vec2::new(width, NODE_MIN_HEIGHT));
        g.iter().any(|n| n.rect().intersects(rect))
    }

    #[test]
    fn children_of_narrow_parent_do_not_overlap() {
        let mut g = ChatGraph::new();
        let root = g.add_node(Author::User, "hi", None, Pos2::ZERO).unwrap();
        g.get_mut(root).unwrap().size.x = NODE_MIN_WIDTH;

        let wide = 600.0;
        for _ in 0..3 {
            let pos = g.child_position(root).unwrap();
            assert!(!overlaps_any(&g, pos, wide));
            let id = g.add_node(Author::Assistant, "", Some(root), pos).unwrap();
            g.get_mut(id).unwrap().size.x = wide;
        }
    }

    #[test]
    fn placement_after_deleting_middle_sibling_is_free() {
        let (mut g, root, reply, _) = sample();
        let mut siblings = vec![reply];
        for _ in 0..2 {
            let pos = g.child_position(root).unwrap();
            siblings.push(g.add_node(Author::Assistant, "", Some(root), pos).unwrap());
        }
        g.remove_subtree(siblings[1]);

        let pos = g.child_position(root).unwrap();
        assert!(!overlaps_any(&g, pos, NODE_DEFAULT_WIDTH));
    }
}
