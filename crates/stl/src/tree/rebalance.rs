//! Rotations and red-black fixups
//!
//! All routines work on arena links only and never touch stored values, so
//! positions of nodes that stay in the tree remain valid.

use super::node::{Arena, Color, HEADER, NodeId};

impl<V> Arena<V> {
    /// Points whatever referenced `old` (its parent's child link, or the
    /// header's root link) at `new`.
    fn replace_child(&mut self, old: NodeId, new: Option<NodeId>) {
        if self.root() == Some(old) {
            self.set_root(new);
            return;
        }

        let Some(parent) = self.parent(old) else {
            return;
        };
        if self.left(parent) == Some(old) {
            self.set_left(parent, new);
        } else {
            self.set_right(parent, new);
        }
    }

    /// Left rotation at `x`; `x` must have a right child.
    pub(crate) fn rotate_left(&mut self, x: NodeId) {
        let Some(y) = self.right(x) else {
            return;
        };

        let y_left = self.left(y);
        self.set_right(x, y_left);
        if let Some(child) = y_left {
            self.set_parent(child, Some(x));
        }

        self.set_parent(y, self.parent(x));
        self.replace_child(x, Some(y));

        self.set_left(y, Some(x));
        self.set_parent(x, Some(y));
    }

    /// Right rotation at `x`; `x` must have a left child.
    pub(crate) fn rotate_right(&mut self, x: NodeId) {
        let Some(y) = self.left(x) else {
            return;
        };

        let y_right = self.right(y);
        self.set_left(x, y_right);
        if let Some(child) = y_right {
            self.set_parent(child, Some(x));
        }

        self.set_parent(y, self.parent(x));
        self.replace_child(x, Some(y));

        self.set_right(y, Some(x));
        self.set_parent(x, Some(y));
    }

    /// Restores the red-black properties after `x` was linked in as a leaf.
    pub(crate) fn rebalance_after_insert(&mut self, mut x: NodeId) {
        self.set_color(x, Color::Red);

        while self.root() != Some(x) {
            let Some(parent) = self.parent(x) else { break };
            if self.color(parent) != Color::Red {
                break;
            }
            // A red parent is never the root, so the grandparent is a real node.
            let Some(grandparent) = self.parent(parent) else {
                break;
            };

            if self.left(grandparent) == Some(parent) {
                let uncle = self.right(grandparent);
                if let Some(uncle) = uncle.filter(|&u| self.color(u) == Color::Red) {
                    self.set_color(parent, Color::Black);
                    self.set_color(uncle, Color::Black);
                    self.set_color(grandparent, Color::Red);
                    x = grandparent;
                } else {
                    if self.right(parent) == Some(x) {
                        x = parent;
                        self.rotate_left(x);
                    }
                    let (parent, grandparent) = self.parent_and_grandparent(x);
                    self.set_color(parent, Color::Black);
                    self.set_color(grandparent, Color::Red);
                    self.rotate_right(grandparent);
                }
            } else {
                let uncle = self.left(grandparent);
                if let Some(uncle) = uncle.filter(|&u| self.color(u) == Color::Red) {
                    self.set_color(parent, Color::Black);
                    self.set_color(uncle, Color::Black);
                    self.set_color(grandparent, Color::Red);
                    x = grandparent;
                } else {
                    if self.left(parent) == Some(x) {
                        x = parent;
                        self.rotate_right(x);
                    }
                    let (parent, grandparent) = self.parent_and_grandparent(x);
                    self.set_color(parent, Color::Black);
                    self.set_color(grandparent, Color::Red);
                    self.rotate_left(grandparent);
                }
            }
        }

        if let Some(root) = self.root() {
            self.set_color(root, Color::Black);
        }
    }

    fn parent_and_grandparent(&self, x: NodeId) -> (NodeId, NodeId) {
        let parent = self.parent(x).unwrap_or(HEADER);
        let grandparent = self.parent(parent).unwrap_or(HEADER);
        (parent, grandparent)
    }

    /// Detaches `z` from the tree and restores the red-black properties.
    ///
    /// A node with two children is replaced by its in-order successor, which
    /// is relinked into `z`'s place and takes over its color; values never
    /// move between nodes. Leftmost/rightmost caches are updated.
    pub(crate) fn unlink(&mut self, z: NodeId) {
        let (z_left, z_right) = (self.left(z), self.right(z));

        // `y` is the node physically removed from its position, `x` the child
        // that moves up into it.
        let (y, x) = match (z_left, z_right) {
            (None, right) => (z, right),
            (left @ Some(_), None) => (z, left),
            (Some(_), Some(right)) => {
                let successor = self.minimum(right);
                (successor, self.right(successor))
            }
        };

        let x_parent;
        let removed_color;

        if y != z {
            // Two children: relink the successor `y` in place of `z`.
            if let Some(left) = z_left {
                self.set_parent(left, Some(y));
            }
            self.set_left(y, z_left);

            if Some(y) == z_right {
                x_parent = y;
            } else {
                x_parent = self.parent(y).unwrap_or(HEADER);
                if let Some(x) = x {
                    self.set_parent(x, Some(x_parent));
                }
                // The successor was a left child.
                self.set_left(x_parent, x);
                self.set_right(y, z_right);
                if let Some(right) = z_right {
                    self.set_parent(right, Some(y));
                }
            }

            self.replace_child(z, Some(y));
            self.set_parent(y, self.parent(z));

            let y_color = self.color(y);
            self.set_color(y, self.color(z));
            removed_color = y_color;
        } else {
            x_parent = self.parent(z).unwrap_or(HEADER);
            if let Some(x) = x {
                self.set_parent(x, Some(x_parent));
            }
            self.replace_child(z, x);

            if self.leftmost() == z {
                let leftmost = match (z_right, x) {
                    (Some(_), Some(x)) => self.minimum(x),
                    _ => x_parent,
                };
                self.set_leftmost(leftmost);
            }
            if self.rightmost() == z {
                let rightmost = match (z_left, x) {
                    (Some(_), Some(x)) => self.maximum(x),
                    _ => x_parent,
                };
                self.set_rightmost(rightmost);
            }
            removed_color = self.color(z);
        }

        if removed_color == Color::Black {
            self.rebalance_after_erase(x, x_parent);
        }

        let node = self.node_mut(z);
        node.parent = None;
        node.left = None;
        node.right = None;
    }

    /// Deletion fixup: `x` (possibly null) carries an extra black at
    /// `x_parent`.
    fn rebalance_after_erase(&mut self, mut x: Option<NodeId>, mut x_parent: NodeId) {
        while x != self.root() && !self.is_red(x) {
            if x == self.left(x_parent) {
                let Some(mut w) = self.right(x_parent) else { break };
                if self.color(w) == Color::Red {
                    self.set_color(w, Color::Black);
                    self.set_color(x_parent, Color::Red);
                    self.rotate_left(x_parent);
                    let Some(sibling) = self.right(x_parent) else { break };
                    w = sibling;
                }

                if !self.is_red(self.left(w)) && !self.is_red(self.right(w)) {
                    self.set_color(w, Color::Red);
                    x = Some(x_parent);
                    x_parent = self.parent(x_parent).unwrap_or(HEADER);
                } else {
                    if !self.is_red(self.right(w)) {
                        if let Some(near) = self.left(w) {
                            self.set_color(near, Color::Black);
                        }
                        self.set_color(w, Color::Red);
                        self.rotate_right(w);
                        let Some(sibling) = self.right(x_parent) else { break };
                        w = sibling;
                    }
                    self.set_color(w, self.color(x_parent));
                    self.set_color(x_parent, Color::Black);
                    if let Some(far) = self.right(w) {
                        self.set_color(far, Color::Black);
                    }
                    self.rotate_left(x_parent);
                    break;
                }
            } else {
                let Some(mut w) = self.left(x_parent) else { break };
                if self.color(w) == Color::Red {
                    self.set_color(w, Color::Black);
                    self.set_color(x_parent, Color::Red);
                    self.rotate_right(x_parent);
                    let Some(sibling) = self.left(x_parent) else { break };
                    w = sibling;
                }

                if !self.is_red(self.right(w)) && !self.is_red(self.left(w)) {
                    self.set_color(w, Color::Red);
                    x = Some(x_parent);
                    x_parent = self.parent(x_parent).unwrap_or(HEADER);
                } else {
                    if !self.is_red(self.left(w)) {
                        if let Some(near) = self.right(w) {
                            self.set_color(near, Color::Black);
                        }
                        self.set_color(w, Color::Red);
                        self.rotate_left(w);
                        let Some(sibling) = self.left(x_parent) else { break };
                        w = sibling;
                    }
                    self.set_color(w, self.color(x_parent));
                    self.set_color(x_parent, Color::Black);
                    if let Some(far) = self.left(w) {
                        self.set_color(far, Color::Black);
                    }
                    self.rotate_right(x_parent);
                    break;
                }
            }
        }

        if let Some(x) = x {
            self.set_color(x, Color::Black);
        }
    }
}
