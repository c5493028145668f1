//! Node arena
//!
//! Nodes live in a `Vec` and link to each other by [`NodeId`]. Slot 0 is the
//! header: its `parent` is the root, `left` the leftmost node and `right` the
//! rightmost node. An empty tree has no root and both extremes point back at
//! the header. Removed slots are recycled through a free-slot list.

/// Node color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Red,
    Black,
}

/// Index into the node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The header slot.
pub(crate) const HEADER: NodeId = NodeId(0);

#[derive(Debug, Clone)]
pub(crate) struct Node<V> {
    pub(crate) color: Color,
    pub(crate) parent: Option<NodeId>,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
    /// `None` for the header and for vacant slots.
    pub(crate) value: Option<V>,
}

impl<V> Node<V> {
    fn header() -> Self {
        Self {
            color: Color::Red,
            parent: None,
            left: Some(HEADER),
            right: Some(HEADER),
            value: None,
        }
    }

    fn leaf(value: V) -> Self {
        Self {
            color: Color::Red,
            parent: None,
            left: None,
            right: None,
            value: Some(value),
        }
    }

    fn vacant() -> Self {
        Self {
            color: Color::Black,
            parent: None,
            left: None,
            right: None,
            value: None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Arena<V> {
    nodes: Vec<Node<V>>,
    free_slots: Vec<NodeId>,
}

impl<V> Arena<V> {
    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![Node::header()],
            free_slots: Vec::new(),
        }
    }

    /// Drops every value and returns to the empty-tree shape.
    pub(crate) fn reset(&mut self) {
        self.nodes.truncate(1);
        self.nodes[HEADER.index()] = Node::header();
        self.free_slots.clear();
    }

    /// Stores `value` in a fresh unlinked red node.
    ///
    /// # Panics
    /// When the arena would exceed `u32::MAX` slots.
    pub(crate) fn alloc(&mut self, value: V) -> NodeId {
        if let Some(id) = self.free_slots.pop() {
            self.nodes[id.index()] = Node::leaf(value);
            return id;
        }

        let Ok(id) = u32::try_from(self.nodes.len()) else {
            panic!("tree node arena exceeds u32::MAX slots");
        };
        self.nodes.push(Node::leaf(value));
        NodeId(id)
    }

    /// Takes the value out of an already unlinked node and recycles its slot.
    pub(crate) fn release(&mut self, id: NodeId) -> Option<V> {
        debug_assert_ne!(id, HEADER);
        let slot = self.nodes.get_mut(id.index())?;
        let value = core::mem::replace(slot, Node::vacant()).value;
        if value.is_some() {
            self.free_slots.push(id);
        }
        value
    }

    /// Moves the values of `order` out in that order, leaving an empty tree.
    pub(crate) fn take_values_in(&mut self, order: &[NodeId]) -> Vec<V> {
        let values = order
            .iter()
            .filter_map(|id| self.nodes[id.index()].value.take())
            .collect();
        self.reset();
        values
    }

    /// Slots in use, header and vacant ones included.
    #[inline]
    pub(crate) fn slots(&self) -> usize {
        self.nodes.len()
    }

    // ----- accessors -----

    #[inline]
    pub(crate) fn node(&self, id: NodeId) -> &Node<V> {
        &self.nodes[id.index()]
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node<V> {
        &mut self.nodes[id.index()]
    }

    /// `true` for a slot that currently holds a value.
    #[inline]
    pub(crate) fn is_live(&self, id: NodeId) -> bool {
        self.nodes
            .get(id.index())
            .is_some_and(|node| node.value.is_some())
    }

    #[inline]
    pub(crate) fn value(&self, id: NodeId) -> Option<&V> {
        self.nodes.get(id.index())?.value.as_ref()
    }

    #[inline]
    pub(crate) fn color(&self, id: NodeId) -> Color {
        self.node(id).color
    }

    #[inline]
    pub(crate) fn set_color(&mut self, id: NodeId, color: Color) {
        self.node_mut(id).color = color;
    }

    /// Null links count as black.
    #[inline]
    pub(crate) fn is_red(&self, id: Option<NodeId>) -> bool {
        id.is_some_and(|id| self.color(id) == Color::Red)
    }

    #[inline]
    pub(crate) fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    #[inline]
    pub(crate) fn left(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).left
    }

    #[inline]
    pub(crate) fn right(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).right
    }

    #[inline]
    pub(crate) fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) {
        self.node_mut(id).parent = parent;
    }

    #[inline]
    pub(crate) fn set_left(&mut self, id: NodeId, left: Option<NodeId>) {
        self.node_mut(id).left = left;
    }

    #[inline]
    pub(crate) fn set_right(&mut self, id: NodeId, right: Option<NodeId>) {
        self.node_mut(id).right = right;
    }

    // ----- header -----

    #[inline]
    pub(crate) fn root(&self) -> Option<NodeId> {
        self.parent(HEADER)
    }

    #[inline]
    pub(crate) fn set_root(&mut self, root: Option<NodeId>) {
        self.set_parent(HEADER, root);
    }

    #[inline]
    pub(crate) fn leftmost(&self) -> NodeId {
        self.left(HEADER).unwrap_or(HEADER)
    }

    #[inline]
    pub(crate) fn set_leftmost(&mut self, id: NodeId) {
        self.set_left(HEADER, Some(id));
    }

    #[inline]
    pub(crate) fn rightmost(&self) -> NodeId {
        self.right(HEADER).unwrap_or(HEADER)
    }

    #[inline]
    pub(crate) fn set_rightmost(&mut self, id: NodeId) {
        self.set_right(HEADER, Some(id));
    }

    /// The header is the only red node that is its own grandparent: the
    /// root's parent is the header and the header's parent is the root. With
    /// no root, it is the node whose leftmost link points at itself.
    pub(crate) fn is_header(&self, id: NodeId) -> bool {
        let node = self.node(id);
        node.color == Color::Red
            && match node.parent {
                Some(root) => self.parent(root) == Some(id),
                None => node.left == Some(id),
            }
    }

    // ----- navigation -----

    pub(crate) fn minimum(&self, mut id: NodeId) -> NodeId {
        while let Some(left) = self.left(id) {
            id = left;
        }
        id
    }

    pub(crate) fn maximum(&self, mut id: NodeId) -> NodeId {
        while let Some(right) = self.right(id) {
            id = right;
        }
        id
    }

    /// In-order successor; the header after the rightmost node. The header
    /// itself has no successor and maps to itself.
    pub(crate) fn successor(&self, id: NodeId) -> NodeId {
        if self.is_header(id) {
            return id;
        }

        if let Some(right) = self.right(id) {
            return self.minimum(right);
        }

        let mut node = id;
        loop {
            let Some(parent) = self.parent(node) else {
                return HEADER;
            };
            if parent == HEADER || self.right(parent) != Some(node) {
                return parent;
            }
            node = parent;
        }
    }

    /// In-order predecessor; the rightmost node before the header. The
    /// leftmost node has no predecessor and maps to the header.
    pub(crate) fn predecessor(&self, id: NodeId) -> NodeId {
        if self.is_header(id) {
            return self.rightmost();
        }

        if let Some(left) = self.left(id) {
            return self.maximum(left);
        }

        let mut node = id;
        loop {
            let Some(parent) = self.parent(node) else {
                return HEADER;
            };
            if parent == HEADER || self.left(parent) != Some(node) {
                return parent;
            }
            node = parent;
        }
    }
}
