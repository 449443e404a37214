//! C7 — Set, a zero-cost façade over the C3 tree.
//!
//! A `Set<T>` is exactly a tree keyed on `T` with the user's total order
//! as the comparator, no extra bookkeeping of its own.

use std::cmp::Ordering;
use std::fmt;

use crate::tree::{self, Tree};

/// A persistent ordered set.
pub struct Set<T> {
    tree: Tree<T>,
}

impl<T> Clone for Set<T> {
    fn clone(&self) -> Self {
        Set { tree: self.tree.clone() }
    }
}

impl<T> Default for Set<T> {
    fn default() -> Self {
        Set::empty()
    }
}

impl<T> Set<T> {
    /// `empty()`.
    pub fn empty() -> Self {
        Set { tree: tree::empty() }
    }

    /// `size(s)`.
    pub fn size(&self) -> usize {
        tree::size(&self.tree)
    }

    pub fn is_empty(&self) -> bool {
        tree::is_empty(&self.tree)
    }
}

impl<T: Ord> Set<T> {
    /// `contains(s, k)`.
    pub fn contains(&self, key: &T) -> bool {
        tree::search(&self.tree, key).is_some()
    }
}

impl<T: Ord + Clone> Set<T> {
    /// `from_list(xs)`.
    pub fn from_list(xs: impl IntoIterator<Item = T>) -> Self {
        Set { tree: tree::from_list(xs) }
    }

    /// `insert(s, k)`.
    pub fn insert(&self, key: T) -> Self {
        Set { tree: tree::insert(&self.tree, key) }
    }

    /// `erase(s, k)`: a no-op if `k` is absent.
    pub fn erase(&self, key: &T) -> Self {
        Set { tree: tree::delete(&self.tree, key) }
    }

    /// `union(s, t)`.
    pub fn union(&self, other: &Self) -> Self {
        Set { tree: tree::union(&self.tree, &other.tree) }
    }

    /// `intersect(s, t)`.
    pub fn intersect(&self, other: &Self) -> Self {
        Set { tree: tree::intersect(&self.tree, &other.tree) }
    }

    /// `diff(s, t)`.
    pub fn diff(&self, other: &Self) -> Self {
        Set { tree: tree::diff(&self.tree, &other.tree) }
    }

    /// `fold_l(s, init, f)`.
    pub fn fold_l<A>(&self, init: A, f: &mut impl FnMut(A, &T) -> A) -> A {
        tree::fold_l(&self.tree, init, f)
    }

    /// `fold_r(s, init, f)`.
    pub fn fold_r<A>(&self, init: A, f: impl FnMut(&T, A) -> A) -> A {
        tree::fold_r(&self.tree, init, f)
    }

    pub fn to_list(&self) -> Vec<T> {
        tree::to_list(&self.tree)
    }

    pub fn iter(&self) -> tree::Iter<T> {
        self.tree.iter()
    }
}

impl<T: Ord> Set<T> {
    /// `compare(s, t)`.
    pub fn compare(&self, other: &Self) -> Ordering {
        tree::compare(&self.tree, &other.tree)
    }

    /// `verify(s)`.
    pub fn verify(&self) -> bool {
        tree::verify(&self.tree)
    }
}

impl<T: fmt::Debug> fmt::Debug for Set<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.tree, f)
    }
}

impl<T: Ord + Clone> FromIterator<T> for Set<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Set::from_list(iter)
    }
}

impl<T: Ord> PartialEq for Set<T> {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn scenario_5_sets() {
        let s: Set<i32> = Set::from_list((0..100).map(|i| 2 * i));
        assert!(s.contains(&64));
        assert!(!s.contains(&63));
        let with67 = s.insert(67);
        assert_eq!(s.intersect(&with67).compare(&s), Ordering::Equal);
        let erased22 = s.erase(&22);
        let d = s.diff(&erased22);
        assert_eq!(d.to_list(), vec![22]);
        assert!(s.verify());
    }

    proptest! {
        #[test]
        fn union_is_commutative(a: Vec<i32>, b: Vec<i32>) {
            let sa: Set<i32> = Set::from_list(a);
            let sb: Set<i32> = Set::from_list(b);
            prop_assert_eq!(sa.union(&sb), sb.union(&sa));
        }

        #[test]
        fn diff_then_union_with_intersect_recovers(a: Vec<i32>, b: Vec<i32>) {
            let sa: Set<i32> = Set::from_list(a);
            let sb: Set<i32> = Set::from_list(b);
            let rebuilt = sa.diff(&sb).union(&sa.intersect(&sb));
            prop_assert_eq!(rebuilt, sa);
        }
    }
}
