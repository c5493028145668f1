//! Red-black tree
//!
//! The ordered core behind [`TreeSet`](crate::set::TreeSet) and any map built
//! as `RbTree<(K, T), First, C>`.
//!
//! Nodes live in an index arena owned by the tree; slot 0 is a header whose
//! links cache the root, the leftmost and the rightmost node. Iteration is an
//! in-order walk through parent links, with the header as the end position:
//! stepping back from it lands on the largest element.
//!
//! ```
//! use nebula_stl::tree::{First, RbTree};
//!
//! let mut map: RbTree<(&str, u32), First> = RbTree::default();
//! map.insert_unique(("b", 2));
//! map.insert_unique(("a", 1));
//!
//! let end = map.end();
//! assert_eq!(map.value(map.prev(end)), Some(&("b", 2)));
//! assert_eq!(map.get(&"a"), Some(&("a", 1)));
//! ```

mod compare;
mod iter;
mod node;
mod rb_tree;
mod rebalance;
mod verify;

pub use compare::{Compare, First, Greater, Identity, KeyOfValue, Less};
pub use iter::{IntoIter, Iter, Range};
pub use node::{Color, NodeId};
pub use rb_tree::{Position, RbTree};
pub use verify::TreeViolation;
