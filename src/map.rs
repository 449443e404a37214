//! C7 — Map, a key-only-ordered façade over the C3 tree.
//!
//! A `Map<K,V>` is a tree of `(K,V)` pairs whose comparator is lifted from
//! `K` alone, so the value component rides along without being compared.
//! `Entry<K,V>` below exists only to carry that lifted comparator.

use std::cmp::Ordering;
use std::fmt;

use crate::tree::{self, Tree};

struct Entry<K, V>(K, V);

impl<K: Clone, V: Clone> Clone for Entry<K, V> {
    fn clone(&self) -> Self {
        Entry(self.0.clone(), self.1.clone())
    }
}

impl<K: PartialEq, V> PartialEq for Entry<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl<K: Eq, V> Eq for Entry<K, V> {}

impl<K: PartialOrd, V> PartialOrd for Entry<K, V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.0.partial_cmp(&other.0)
    }
}
impl<K: Ord, V> Ord for Entry<K, V> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

/// A persistent ordered map, keyed on `K`.
pub struct Map<K, V> {
    tree: Tree<Entry<K, V>>,
}

impl<K: Clone, V: Clone> Clone for Map<K, V> {
    fn clone(&self) -> Self {
        Map { tree: self.tree.clone() }
    }
}

impl<K, V> Default for Map<K, V> {
    fn default() -> Self {
        Map { tree: tree::empty() }
    }
}

impl<K, V> Map<K, V> {
    /// `empty()`.
    pub fn empty() -> Self {
        Map { tree: tree::empty() }
    }

    /// `size(m)`.
    pub fn size(&self) -> usize {
        tree::size(&self.tree)
    }

    pub fn is_empty(&self) -> bool {
        tree::is_empty(&self.tree)
    }
}

impl<K: Ord + Clone, V: Clone> Map<K, V> {
    /// `insert(m, k, v)`: replace-if-present.
    pub fn insert(&self, key: K, value: V) -> Self {
        Map { tree: tree::insert(&self.tree, Entry(key, value)) }
    }

    /// `find(m, k) -> Option<(&K, &V)>`. Searches by the bare key via
    /// `tree::search_by`, rather than building a dummy `Entry<K,V>` probe.
    pub fn find(&self, key: &K) -> Option<(&K, &V)> {
        tree::search_by(&self.tree, key, &|e, k| e.0.cmp(k)).map(|e| (&e.0, &e.1))
    }

    /// `erase(m, k)`: a no-op if `k` is absent.
    pub fn erase(&self, key: &K) -> Self {
        Map { tree: tree::delete_by(&self.tree, key, &|e, k| e.0.cmp(k)) }
    }

    /// `split(m, k) -> (less, greater)`.
    pub fn split(&self, key: &K) -> (Self, Self) {
        let (l, g) = tree::split_by(&self.tree, key, &|e, k| e.0.cmp(k));
        (Map { tree: l }, Map { tree: g })
    }

    /// `merge(m, other)`: union, `other`'s value wins on a key clash.
    pub fn merge(&self, other: &Self) -> Self {
        Map { tree: tree::union(&other.tree, &self.tree) }
    }

    pub fn keys(&self) -> Vec<K> {
        tree::to_list(&self.tree).into_iter().map(|e| e.0).collect()
    }

    pub fn values(&self) -> Vec<V> {
        tree::to_list(&self.tree).into_iter().map(|e| e.1).collect()
    }

    /// `fold_l(m, init, f)`.
    pub fn fold_l<A>(&self, init: A, mut f: impl FnMut(A, &K, &V) -> A) -> A {
        tree::fold_l(&self.tree, init, &mut |acc, e| f(acc, &e.0, &e.1))
    }

    /// `fold_r(m, init, f)`.
    pub fn fold_r<A>(&self, init: A, mut f: impl FnMut(&K, &V, A) -> A) -> A {
        tree::fold_r(&self.tree, init, |e, acc| f(&e.0, &e.1, acc))
    }

    /// `map(m, f)`: transforms every value, keeping every key.
    pub fn map<W: Clone>(&self, mut f: impl FnMut(&K, &V) -> W) -> Map<K, W> {
        Map {
            tree: tree::map(&self.tree, &mut |e| Entry(e.0.clone(), f(&e.0, &e.1))),
        }
    }

    pub fn to_vec(&self) -> Vec<(K, V)> {
        tree::to_list(&self.tree).into_iter().map(|e| (e.0, e.1)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, V)> {
        self.tree.iter().map(|e| (e.0, e.1))
    }
}

impl<K: Ord + Clone, V: Clone> FromIterator<(K, V)> for Map<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut t = tree::empty();
        for (k, v) in iter {
            t = tree::insert(&t, Entry(k, v));
        }
        Map { tree: t }
    }
}

impl<K: Ord, V> Map<K, V> {
    /// `verify(m)`.
    pub fn verify(&self) -> bool {
        tree::verify(&self.tree)
    }

    /// `compare(m, other)`: lexicographic over `(key, value)` pairs;
    /// unlike the tree's own ordering (key-only), this additionally
    /// orders by value to break ties.
    pub fn compare(&self, other: &Self) -> Ordering
    where
        V: Ord,
    {
        let a: Vec<(&K, &V)> = tree::fold_l(&self.tree, Vec::new(), &mut |mut acc, e| {
            acc.push((&e.0, &e.1));
            acc
        });
        let b: Vec<(&K, &V)> = tree::fold_l(&other.tree, Vec::new(), &mut |mut acc, e| {
            acc.push((&e.0, &e.1));
            acc
        });
        a.cmp(&b)
    }
}

impl<K: fmt::Debug + Clone, V: fmt::Debug + Clone> fmt::Debug for Map<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, e) in tree::to_list(&self.tree).into_iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{:?}: {:?}", e.0, e.1)?;
        }
        f.write_str("}")
    }
}

impl<K: Ord, V: Ord> PartialEq for Map<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_4_maps_via_pairs() {
        let m: Map<i32, i32> = (0..200).map(|i| (i, 2 * i)).collect();
        assert_eq!(m.size(), 200);
        assert_eq!(m.find(&25).map(|(_, v)| *v), Some(50));
        assert!(m.find(&203).is_none());
        let (less, greater) = m.split(&123);
        let merged = less.merge(&greater);
        let erased = m.erase(&123);
        assert_eq!(merged.compare(&erased), Ordering::Equal);
        assert!(m.verify());
    }

    #[test]
    fn insert_replaces_value_for_existing_key() {
        let m: Map<&str, i32> = Map::empty();
        let m = m.insert("a", 1).insert("a", 2);
        assert_eq!(m.size(), 1);
        assert_eq!(m.find(&"a").map(|(_, v)| *v), Some(2));
    }

    #[test]
    fn map_transforms_values_keeps_keys() {
        let m: Map<i32, i32> = (0..10).map(|i| (i, i)).collect();
        let doubled = m.map(|_, v| v * 2);
        assert_eq!(doubled.keys(), m.keys());
        assert_eq!(doubled.find(&5).map(|(_, v)| *v), Some(10));
    }
}
