//! Structural self-check for red-black trees

use thiserror::Error;

#[cfg(feature = "logging")]
use tracing::debug;

use super::compare::{Compare, KeyOfValue};
use super::node::{Color, HEADER, NodeId};
use super::rb_tree::RbTree;
use crate::error::MemoryError;

/// First broken invariant found by [`RbTree::verify`].
///
/// Node numbers are arena slot indices.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeViolation {
    #[error("header slot is not shaped as a header")]
    Header,

    #[error("root node {node} is red")]
    RedRoot { node: usize },

    #[error("red node {node} has a red child")]
    RedRed { node: usize },

    #[error("black height {found} on a path, expected {expected}")]
    BlackHeight { expected: usize, found: usize },

    #[error("node {node} is out of order")]
    Order { node: usize },

    #[error("node {node} has a broken parent link")]
    ParentLink { node: usize },

    #[error("node {node} is linked but holds no value")]
    DanglingLink { node: usize },

    #[error("leftmost link does not point at the minimum")]
    Leftmost,

    #[error("rightmost link does not point at the maximum")]
    Rightmost,

    #[error("tree holds {found} nodes, length says {expected}")]
    Count { expected: usize, found: usize },
}

impl From<TreeViolation> for MemoryError {
    fn from(violation: TreeViolation) -> Self {
        Self::corruption("rb_tree", &violation.to_string())
    }
}

impl<V, X, C> RbTree<V, X, C>
where
    X: KeyOfValue<V>,
    C: Compare<X::Key>,
{
    /// Checks every red-black and bookkeeping invariant.
    ///
    /// Intended for tests and debugging; walks the whole tree.
    pub fn verify(&self) -> Result<(), TreeViolation> {
        let result = self.check_structure();

        #[cfg(feature = "logging")]
        if let Err(violation) = &result {
            debug!(%violation, len = self.len, "red-black verification failed");
        }

        result
    }

    /// `true` when [`RbTree::verify`] finds nothing wrong.
    pub fn rb_verify(&self) -> bool {
        self.verify().is_ok()
    }

    fn check_structure(&self) -> Result<(), TreeViolation> {
        let arena = &self.arena;
        if !arena.is_header(HEADER) {
            return Err(TreeViolation::Header);
        }

        let Some(root) = arena.root() else {
            if self.len != 0 {
                return Err(TreeViolation::Count {
                    expected: self.len,
                    found: 0,
                });
            }
            if arena.leftmost() != HEADER {
                return Err(TreeViolation::Leftmost);
            }
            if arena.rightmost() != HEADER {
                return Err(TreeViolation::Rightmost);
            }
            return Ok(());
        };

        if arena.parent(root) != Some(HEADER) {
            return Err(TreeViolation::ParentLink { node: root.index() });
        }
        if arena.color(root) == Color::Red {
            return Err(TreeViolation::RedRoot { node: root.index() });
        }

        let mut walk = Walk {
            leaf_blacks: None,
            count: 0,
        };
        self.check_subtree(root, 0, &mut walk)?;
        if walk.count != self.len {
            return Err(TreeViolation::Count {
                expected: self.len,
                found: walk.count,
            });
        }

        if arena.leftmost() != arena.minimum(root) {
            return Err(TreeViolation::Leftmost);
        }
        if arena.rightmost() != arena.maximum(root) {
            return Err(TreeViolation::Rightmost);
        }

        // Global order: each element must not sort before its predecessor.
        let order = self.in_order();
        for pair in order.windows(2) {
            if self.compare.less(self.node_key(pair[1]), self.node_key(pair[0])) {
                return Err(TreeViolation::Order {
                    node: pair[1].index(),
                });
            }
        }

        Ok(())
    }

    fn check_subtree(
        &self,
        node: NodeId,
        blacks_above: usize,
        walk: &mut Walk,
    ) -> Result<(), TreeViolation> {
        let arena = &self.arena;
        if !arena.is_live(node) {
            return Err(TreeViolation::DanglingLink { node: node.index() });
        }

        walk.count += 1;
        // More nodes than slots means the links form a cycle.
        if walk.count > arena.slots() {
            return Err(TreeViolation::Count {
                expected: self.len,
                found: walk.count,
            });
        }

        let blacks = blacks_above + usize::from(arena.color(node) == Color::Black);

        for (child, on_left) in [(arena.left(node), true), (arena.right(node), false)] {
            let Some(child) = child else {
                match walk.leaf_blacks {
                    None => walk.leaf_blacks = Some(blacks),
                    Some(expected) if expected != blacks => {
                        return Err(TreeViolation::BlackHeight {
                            expected,
                            found: blacks,
                        });
                    }
                    Some(_) => {}
                }
                continue;
            };

            if arena.parent(child) != Some(node) {
                return Err(TreeViolation::ParentLink {
                    node: child.index(),
                });
            }
            if arena.color(node) == Color::Red && arena.color(child) == Color::Red {
                return Err(TreeViolation::RedRed { node: node.index() });
            }

            let out_of_order = if on_left {
                self.compare.less(self.node_key(node), self.node_key(child))
            } else {
                self.compare.less(self.node_key(child), self.node_key(node))
            };
            if out_of_order {
                return Err(TreeViolation::Order {
                    node: child.index(),
                });
            }

            self.check_subtree(child, blacks, walk)?;
        }

        Ok(())
    }
}

struct Walk {
    leaf_blacks: Option<usize>,
    count: usize,
}
