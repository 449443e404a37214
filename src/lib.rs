//! Persistent (purely functional) container data structures.
//!
//! Every container here is immutable: an update returns a new value and
//! shares whatever structure did not change with the old one. There is no
//! mutation exposed anywhere in this crate's public surface.
//!
//! - [`List`] — a singly-linked cons list (C2).
//! - [`Text`] — a finger tree of UTF-8 byte fragments, codepoint-indexed (C5).
//! - [`Vector`] — a finger tree of typed element fragments (C6).
//! - [`Set`] / [`Map`] — ordered façades over a 2-3-4 tree (C7).
//!
//! `tree` and `spine` hold the ordered-tree and finger-tree engines the
//! containers above are built from and are not part of the public
//! surface; they stay crate-private so the only way to reach a tree or a
//! spine from outside this crate is through one of the container types.
//! `carrier` is public: it is a standalone primitive in its own right (a
//! one-word slot / closed tagged union), independent of any container.

pub mod carrier;
pub mod list;
pub mod map;
pub mod set;
pub(crate) mod spine;
pub mod string;
pub(crate) mod tree;
pub mod vector;

pub use list::List;
pub use map::Map;
pub use set::Set;
pub use string::Text;
pub use vector::Vector;

#[cfg(test)]
mod tests {}
