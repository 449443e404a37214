//! C3 — 2-3-4 Tree Engine.
//!
//! `Tree<K>` is an ordered, persistent 2-3-4 tree (every node has 1, 2 or 3
//! keys and one more child than it has keys; every leaf is at equal depth;
//! every node caches its subtree size). It backs `Set<T>` and `Map<K,V>`
//! (the latter via a key-only-ordered `Entry` wrapper in `map.rs`).
//!
//! Follows a top-down insert-with-eager-splitting/concat-3/split/
//! divide-and-conquer-union-intersect-diff catalogue, with nodes shared via
//! `Arc`-backed reference counting rather than a hand-rolled tagged
//! pointer, since a general-purpose balanced tree has far more node shapes
//! than a trie's fixed branching factors and a hand-rolled refcount here
//! would be a much larger unsafe surface for comparatively little benefit.
//!
//! Insertion and deletion are implemented as a bottom-up
//! overflow/underflow propagation (an `InsertResult::Split` signal for
//! insert, a `DelOutcome::Under` signal for delete) rather than literally
//! mutating nodes on the way down, because persistent trees rebuild every
//! node on the path anyway; the two are behaviourally identical to the
//! classic top-down fixup techniques — same node shapes, same rebalancing
//! transitions — just phrased as "fix up on the way back" for a recursive,
//! allocate-new-nodes implementation.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

struct TwoNode<K> {
    size: usize,
    key: K,
    left: Tree<K>,
    right: Tree<K>,
}

struct ThreeNode<K> {
    size: usize,
    k1: K,
    k2: K,
    c1: Tree<K>,
    c2: Tree<K>,
    c3: Tree<K>,
}

struct FourNode<K> {
    size: usize,
    k1: K,
    k2: K,
    k3: K,
    c1: Tree<K>,
    c2: Tree<K>,
    c3: Tree<K>,
    c4: Tree<K>,
}

/// A persistent 2-3-4 tree over keys `K`.
pub enum Tree<K> {
    Empty,
    Two(Arc<TwoNode<K>>),
    Three(Arc<ThreeNode<K>>),
    Four(Arc<FourNode<K>>),
}

impl<K> Clone for Tree<K> {
    fn clone(&self) -> Self {
        match self {
            Tree::Empty => Tree::Empty,
            Tree::Two(n) => Tree::Two(Arc::clone(n)),
            Tree::Three(n) => Tree::Three(Arc::clone(n)),
            Tree::Four(n) => Tree::Four(Arc::clone(n)),
        }
    }
}

impl<K> Default for Tree<K> {
    fn default() -> Self {
        Tree::Empty
    }
}

/// `size(t)`: O(1), cached.
pub fn size<K>(t: &Tree<K>) -> usize {
    match t {
        Tree::Empty => 0,
        Tree::Two(n) => n.size,
        Tree::Three(n) => n.size,
        Tree::Four(n) => n.size,
    }
}

/// `depth(t)`: O(depth). All children of a node share one depth by the
/// balance invariant, so following any single child suffices.
pub fn depth<K>(t: &Tree<K>) -> usize {
    match t {
        Tree::Empty => 0,
        Tree::Two(n) => 1 + depth(&n.left),
        Tree::Three(n) => 1 + depth(&n.c1),
        Tree::Four(n) => 1 + depth(&n.c1),
    }
}

pub fn is_empty<K>(t: &Tree<K>) -> bool {
    matches!(t, Tree::Empty)
}

/// `empty()`.
pub fn empty<K>() -> Tree<K> {
    Tree::Empty
}

/// `singleton(k)`.
pub fn singleton<K>(key: K) -> Tree<K> {
    Tree::Two(Arc::new(TwoNode {
        size: 1,
        key,
        left: Tree::Empty,
        right: Tree::Empty,
    }))
}

/// `search(t, k) -> Option<&K>`.
pub fn search<'a, K: Ord>(t: &'a Tree<K>, key: &K) -> Option<&'a K> {
    match t {
        Tree::Empty => None,
        Tree::Two(n) => match key.cmp(&n.key) {
            Ordering::Less => search(&n.left, key),
            Ordering::Equal => Some(&n.key),
            Ordering::Greater => search(&n.right, key),
        },
        Tree::Three(n) => {
            if *key < n.k1 {
                search(&n.c1, key)
            } else if *key == n.k1 {
                Some(&n.k1)
            } else if *key < n.k2 {
                search(&n.c2, key)
            } else if *key == n.k2 {
                Some(&n.k2)
            } else {
                search(&n.c3, key)
            }
        }
        Tree::Four(n) => {
            if *key < n.k1 {
                search(&n.c1, key)
            } else if *key == n.k1 {
                Some(&n.k1)
            } else if *key < n.k2 {
                search(&n.c2, key)
            } else if *key == n.k2 {
                Some(&n.k2)
            } else if *key < n.k3 {
                search(&n.c3, key)
            } else if *key == n.k3 {
                Some(&n.k3)
            } else {
                search(&n.c4, key)
            }
        }
    }
}

/// `search_by(t, key, cmp) -> Option<&K>`: like `search`, but compares
/// against a `key` of any type `Q` via `cmp(node_key, key)` instead of
/// requiring `key`'s type to match the tree's own element type. Lets a
/// caller search on part of a composite element (e.g. `map.rs`'s
/// key-only-ordered `Entry<K,V>`) without constructing a full dummy
/// element to search with.
pub fn search_by<'a, K, Q>(t: &'a Tree<K>, key: &Q, cmp: &impl Fn(&K, &Q) -> Ordering) -> Option<&'a K> {
    match t {
        Tree::Empty => None,
        Tree::Two(n) => match cmp(&n.key, key) {
            Ordering::Greater => search_by(&n.left, key, cmp),
            Ordering::Equal => Some(&n.key),
            Ordering::Less => search_by(&n.right, key, cmp),
        },
        Tree::Three(n) => match cmp(&n.k1, key) {
            Ordering::Greater => search_by(&n.c1, key, cmp),
            Ordering::Equal => Some(&n.k1),
            Ordering::Less => match cmp(&n.k2, key) {
                Ordering::Greater => search_by(&n.c2, key, cmp),
                Ordering::Equal => Some(&n.k2),
                Ordering::Less => search_by(&n.c3, key, cmp),
            },
        },
        Tree::Four(n) => match cmp(&n.k1, key) {
            Ordering::Greater => search_by(&n.c1, key, cmp),
            Ordering::Equal => Some(&n.k1),
            Ordering::Less => match cmp(&n.k2, key) {
                Ordering::Greater => search_by(&n.c2, key, cmp),
                Ordering::Equal => Some(&n.k2),
                Ordering::Less => match cmp(&n.k3, key) {
                    Ordering::Greater => search_by(&n.c3, key, cmp),
                    Ordering::Equal => Some(&n.k3),
                    Ordering::Less => search_by(&n.c4, key, cmp),
                },
            },
        },
    }
}

fn is_leaf<K>(children: &[Tree<K>]) -> bool {
    children.iter().all(is_empty)
}

/// Flattens a node into its raw keys/children (cloning `K` and bumping
/// `Arc` refcounts on children). `Tree::Empty` flattens to `([], [])`.
fn raw<K: Clone>(t: &Tree<K>) -> (Vec<K>, Vec<Tree<K>>) {
    match t {
        Tree::Empty => (Vec::new(), Vec::new()),
        Tree::Two(n) => (vec![n.key.clone()], vec![n.left.clone(), n.right.clone()]),
        Tree::Three(n) => (
            vec![n.k1.clone(), n.k2.clone()],
            vec![n.c1.clone(), n.c2.clone(), n.c3.clone()],
        ),
        Tree::Four(n) => (
            vec![n.k1.clone(), n.k2.clone(), n.k3.clone()],
            vec![n.c1.clone(), n.c2.clone(), n.c3.clone(), n.c4.clone()],
        ),
    }
}

/// Rebuilds a node from raw keys/children. `keys.len()` must be 1, 2 or 3
/// and `children.len()` must be `keys.len() + 1`.
fn build<K>(mut keys: Vec<K>, mut children: Vec<Tree<K>>) -> Tree<K> {
    debug_assert_eq!(children.len(), keys.len() + 1, "build: arity mismatch");
    let total = keys.len() + children.iter().map(size).sum::<usize>();
    match keys.len() {
        1 => {
            let right = children.pop().unwrap();
            let left = children.pop().unwrap();
            Tree::Two(Arc::new(TwoNode {
                size: total,
                key: keys.pop().unwrap(),
                left,
                right,
            }))
        }
        2 => {
            let c3 = children.pop().unwrap();
            let c2 = children.pop().unwrap();
            let c1 = children.pop().unwrap();
            let k2 = keys.pop().unwrap();
            let k1 = keys.pop().unwrap();
            Tree::Three(Arc::new(ThreeNode {
                size: total,
                k1,
                k2,
                c1,
                c2,
                c3,
            }))
        }
        3 => {
            let c4 = children.pop().unwrap();
            let c3 = children.pop().unwrap();
            let c2 = children.pop().unwrap();
            let c1 = children.pop().unwrap();
            let k3 = keys.pop().unwrap();
            let k2 = keys.pop().unwrap();
            let k1 = keys.pop().unwrap();
            Tree::Four(Arc::new(FourNode {
                size: total,
                k1,
                k2,
                k3,
                c1,
                c2,
                c3,
                c4,
            }))
        }
        n => panic!("build: invalid key count {n}"),
    }
}

/// Builds a single tree from an already-ordered chain of `children.len() ==
/// keys.len() + 1` siblings, folding them together with `concat3`.
fn build_chain<K: Ord + Clone>(children: &[Tree<K>], keys: &[K]) -> Tree<K> {
    let mut acc = children[0].clone();
    for (i, key) in keys.iter().enumerate() {
        acc = concat3(&acc, key.clone(), &children[i + 1]);
    }
    acc
}

enum InsertResult<K> {
    Done(Tree<K>),
    /// The subtree at this position grew by one level; `Split(l, p, r)`
    /// must be absorbed into the parent as an extra key/child pair.
    Split(Tree<K>, K, Tree<K>),
}

/// Splices `(l, p, r)` into `keys`/`children` at `idx` (replacing
/// `children[idx]`), splitting the node again if it now holds 4 keys.
fn absorb_split<K>(
    mut keys: Vec<K>,
    mut children: Vec<Tree<K>>,
    idx: usize,
    l: Tree<K>,
    p: K,
    r: Tree<K>,
) -> InsertResult<K> {
    keys.insert(idx, p);
    children.splice(idx..=idx, [l, r]);
    if keys.len() <= 3 {
        InsertResult::Done(build(keys, children))
    } else {
        let right_keys = keys.split_off(3);
        let promoted = keys.pop().unwrap();
        let right_children = children.split_off(3);
        InsertResult::Split(build(keys, children), promoted, build(right_keys, right_children))
    }
}

fn insert_rec<K: Ord + Clone>(t: &Tree<K>, key: K) -> InsertResult<K> {
    match t {
        Tree::Empty => InsertResult::Done(singleton(key)),
        _ => {
            let (mut keys, children) = raw(t);
            let mut idx = 0;
            while idx < keys.len() {
                match key.cmp(&keys[idx]) {
                    Ordering::Equal => {
                        keys[idx] = key;
                        return InsertResult::Done(build(keys, children));
                    }
                    Ordering::Less => break,
                    Ordering::Greater => idx += 1,
                }
            }
            match insert_rec(&children[idx], key) {
                InsertResult::Done(new_child) => {
                    let mut children = children;
                    children[idx] = new_child;
                    InsertResult::Done(build(keys, children))
                }
                InsertResult::Split(l, p, r) => absorb_split(keys, children, idx, l, p, r),
            }
        }
    }
}

/// `insert(t, k)`: replace-if-present (mapping semantics).
pub fn insert<K: Ord + Clone>(t: &Tree<K>, key: K) -> Tree<K> {
    match insert_rec(t, key) {
        InsertResult::Done(n) => n,
        InsertResult::Split(l, p, r) => build(vec![p], vec![l, r]),
    }
}

enum DelOutcome<K> {
    Done(Tree<K>),
    /// `keys.len() == children.len() - 1`, one key short of the 1-key
    /// minimum (i.e. `keys` is empty with exactly one child).
    Under(Vec<K>, Vec<Tree<K>>),
}

fn delete_min_rec<K: Ord + Clone>(t: &Tree<K>) -> (K, DelOutcome<K>) {
    let (mut keys, mut children) = raw(t);
    if is_leaf(&children) {
        let min = keys.remove(0);
        children.pop();
        if keys.is_empty() {
            (min, DelOutcome::Under(Vec::new(), vec![Tree::Empty]))
        } else {
            (min, DelOutcome::Done(build(keys, children)))
        }
    } else {
        let (min, outcome) = delete_min_rec(&children[0]);
        let result = match outcome {
            DelOutcome::Done(new_first) => {
                children[0] = new_first;
                DelOutcome::Done(build(keys, children))
            }
            DelOutcome::Under(ukeys, uchildren) => fixup_merge(keys, children, 0, ukeys, uchildren),
        };
        (min, result)
    }
}

fn delete_max_rec<K: Ord + Clone>(t: &Tree<K>) -> (K, DelOutcome<K>) {
    let (mut keys, mut children) = raw(t);
    if is_leaf(&children) {
        let max = keys.pop().unwrap();
        children.pop();
        if keys.is_empty() {
            (max, DelOutcome::Under(Vec::new(), vec![Tree::Empty]))
        } else {
            (max, DelOutcome::Done(build(keys, children)))
        }
    } else {
        let last = children.len() - 1;
        let (max, outcome) = delete_max_rec(&children[last]);
        let result = match outcome {
            DelOutcome::Done(new_last) => {
                children[last] = new_last;
                DelOutcome::Done(build(keys, children))
            }
            DelOutcome::Under(ukeys, uchildren) => {
                fixup_merge(keys, children, last, ukeys, uchildren)
            }
        };
        (max, result)
    }
}

/// Resolves a deficient child at `idx` (represented as `(ukeys, uchildren)`
/// with `uchildren.len() == ukeys.len() + 1`, the deficient case being
/// `ukeys` empty) by borrowing a key from an adjacent sibling, or merging
/// with one when no sibling can spare a key.
fn fixup_merge<K: Ord + Clone>(
    mut keys: Vec<K>,
    mut children: Vec<Tree<K>>,
    idx: usize,
    ukeys: Vec<K>,
    uchildren: Vec<Tree<K>>,
) -> DelOutcome<K> {
    let has_right = idx + 1 < children.len();
    let has_left = idx > 0;

    if has_right {
        let (sib_keys, sib_children) = raw(&children[idx + 1]);
        if sib_keys.len() >= 2 {
            let mut sib_keys = sib_keys;
            let mut sib_children = sib_children;
            let mut ukeys = ukeys;
            let mut uchildren = uchildren;
            ukeys.push(keys[idx].clone());
            uchildren.push(sib_children.remove(0));
            keys[idx] = sib_keys.remove(0);
            children[idx] = build(ukeys, uchildren);
            children[idx + 1] = build(sib_keys, sib_children);
            return DelOutcome::Done(build(keys, children));
        }
    } else if has_left {
        let (sib_keys, sib_children) = raw(&children[idx - 1]);
        if sib_keys.len() >= 2 {
            let mut sib_keys = sib_keys;
            let mut sib_children = sib_children;
            let mut ukeys = ukeys;
            let mut uchildren = uchildren;
            ukeys.insert(0, keys[idx - 1].clone());
            uchildren.insert(0, sib_children.pop().unwrap());
            keys[idx - 1] = sib_keys.pop().unwrap();
            children[idx - 1] = build(sib_keys, sib_children);
            children[idx] = build(ukeys, uchildren);
            return DelOutcome::Done(build(keys, children));
        }
    }

    if has_right {
        let (sib_keys, sib_children) = raw(&children[idx + 1]);
        let mut merged_keys = ukeys;
        merged_keys.push(keys.remove(idx));
        merged_keys.extend(sib_keys);
        let mut merged_children = uchildren;
        merged_children.extend(sib_children);
        let merged = build(merged_keys, merged_children);
        children.splice(idx..=idx + 1, [merged]);
    } else {
        let (sib_keys, sib_children) = raw(&children[idx - 1]);
        let mut merged_keys = sib_keys;
        merged_keys.push(keys.remove(idx - 1));
        merged_keys.extend(ukeys);
        let mut merged_children = sib_children;
        merged_children.extend(uchildren);
        let merged = build(merged_keys, merged_children);
        children.splice(idx - 1..=idx, [merged]);
    }

    if keys.is_empty() {
        DelOutcome::Under(Vec::new(), children)
    } else {
        DelOutcome::Done(build(keys, children))
    }
}

fn delete_rec<K: Ord + Clone>(t: &Tree<K>, key: &K) -> DelOutcome<K> {
    match t {
        Tree::Empty => DelOutcome::Done(Tree::Empty),
        _ => {
            let (mut keys, mut children) = raw(t);
            let mut idx = 0;
            while idx < keys.len() && *key > keys[idx] {
                idx += 1;
            }
            if idx < keys.len() && *key == keys[idx] {
                if is_leaf(&children) {
                    keys.remove(idx);
                    children.remove(idx);
                    if keys.is_empty() {
                        DelOutcome::Under(Vec::new(), vec![Tree::Empty])
                    } else {
                        DelOutcome::Done(build(keys, children))
                    }
                } else {
                    let (succ, outcome) = delete_min_rec(&children[idx + 1]);
                    keys[idx] = succ;
                    match outcome {
                        DelOutcome::Done(new_child) => {
                            children[idx + 1] = new_child;
                            DelOutcome::Done(build(keys, children))
                        }
                        DelOutcome::Under(ukeys, uchildren) => {
                            fixup_merge(keys, children, idx + 1, ukeys, uchildren)
                        }
                    }
                }
            } else if matches!(children[idx], Tree::Empty) {
                DelOutcome::Done(t.clone())
            } else {
                match delete_rec(&children[idx], key) {
                    DelOutcome::Done(new_child) => {
                        children[idx] = new_child;
                        DelOutcome::Done(build(keys, children))
                    }
                    DelOutcome::Under(ukeys, uchildren) => {
                        fixup_merge(keys, children, idx, ukeys, uchildren)
                    }
                }
            }
        }
    }
}

/// `delete(t, k)`: a no-op if `k` is absent.
pub fn delete<K: Ord + Clone>(t: &Tree<K>, key: &K) -> Tree<K> {
    match delete_rec(t, key) {
        DelOutcome::Done(n) => n,
        DelOutcome::Under(_, mut children) => children.pop().unwrap(),
    }
}

/// Like `delete_rec`, but locates `key: &Q` via `cmp` instead of `K: Ord`
/// directly — see `search_by`.
fn delete_rec_by<K: Ord + Clone, Q>(t: &Tree<K>, key: &Q, cmp: &impl Fn(&K, &Q) -> Ordering) -> DelOutcome<K> {
    match t {
        Tree::Empty => DelOutcome::Done(Tree::Empty),
        _ => {
            let (mut keys, mut children) = raw(t);
            let mut idx = 0;
            while idx < keys.len() && cmp(&keys[idx], key) == Ordering::Less {
                idx += 1;
            }
            if idx < keys.len() && cmp(&keys[idx], key) == Ordering::Equal {
                if is_leaf(&children) {
                    keys.remove(idx);
                    children.remove(idx);
                    if keys.is_empty() {
                        DelOutcome::Under(Vec::new(), vec![Tree::Empty])
                    } else {
                        DelOutcome::Done(build(keys, children))
                    }
                } else {
                    let (succ, outcome) = delete_min_rec(&children[idx + 1]);
                    keys[idx] = succ;
                    match outcome {
                        DelOutcome::Done(new_child) => {
                            children[idx + 1] = new_child;
                            DelOutcome::Done(build(keys, children))
                        }
                        DelOutcome::Under(ukeys, uchildren) => {
                            fixup_merge(keys, children, idx + 1, ukeys, uchildren)
                        }
                    }
                }
            } else if matches!(children[idx], Tree::Empty) {
                DelOutcome::Done(t.clone())
            } else {
                match delete_rec_by(&children[idx], key, cmp) {
                    DelOutcome::Done(new_child) => {
                        children[idx] = new_child;
                        DelOutcome::Done(build(keys, children))
                    }
                    DelOutcome::Under(ukeys, uchildren) => {
                        fixup_merge(keys, children, idx, ukeys, uchildren)
                    }
                }
            }
        }
    }
}

/// `delete_by(t, key, cmp)`: like `delete`, but via a `Q`-typed `key` and
/// `cmp` rather than requiring a full dummy `K` to search/delete with.
pub fn delete_by<K: Ord + Clone, Q>(t: &Tree<K>, key: &Q, cmp: &impl Fn(&K, &Q) -> Ordering) -> Tree<K> {
    match delete_rec_by(t, key, cmp) {
        DelOutcome::Done(n) => n,
        DelOutcome::Under(_, mut children) => children.pop().unwrap(),
    }
}

fn extract_min<K: Ord + Clone>(t: &Tree<K>) -> (K, Tree<K>) {
    let (k, outcome) = delete_min_rec(t);
    let tree = match outcome {
        DelOutcome::Done(n) => n,
        DelOutcome::Under(_, mut children) => children.pop().unwrap(),
    };
    (k, tree)
}

fn extract_max<K: Ord + Clone>(t: &Tree<K>) -> (K, Tree<K>) {
    let (k, outcome) = delete_max_rec(t);
    let tree = match outcome {
        DelOutcome::Done(n) => n,
        DelOutcome::Under(_, mut children) => children.pop().unwrap(),
    };
    (k, tree)
}

fn concat3_right<K: Ord + Clone>(t: &Tree<K>, k: K, u: &Tree<K>, target_depth: usize) -> InsertResult<K> {
    let (keys, children) = raw(t);
    let last = children.len() - 1;
    if depth(&children[last]) == target_depth {
        let l = children[last].clone();
        let r = u.clone();
        absorb_split(keys, children, last, l, k, r)
    } else {
        match concat3_right(&children[last], k, u, target_depth) {
            InsertResult::Done(new_last) => {
                let mut children = children;
                children[last] = new_last;
                InsertResult::Done(build(keys, children))
            }
            InsertResult::Split(l, p, r) => absorb_split(keys, children, last, l, p, r),
        }
    }
}

fn concat3_left<K: Ord + Clone>(u: &Tree<K>, k: K, t: &Tree<K>, target_depth: usize) -> InsertResult<K> {
    let (keys, children) = raw(u);
    if depth(&children[0]) == target_depth {
        let l = t.clone();
        let r = children[0].clone();
        absorb_split(keys, children, 0, l, k, r)
    } else {
        match concat3_left(&children[0], k, t, target_depth) {
            InsertResult::Done(new_first) => {
                let mut children = children;
                children[0] = new_first;
                InsertResult::Done(build(keys, children))
            }
            InsertResult::Split(l, p, r) => absorb_split(keys, children, 0, l, p, r),
        }
    }
}

/// `concat3(t, k, u)`: requires `max(t) < k < min(u)`.
pub fn concat3<K: Ord + Clone>(t: &Tree<K>, k: K, u: &Tree<K>) -> Tree<K> {
    if t.is_empty_tree() {
        return insert(u, k);
    }
    if u.is_empty_tree() {
        return insert(t, k);
    }
    let dt = depth(t);
    let du = depth(u);
    match dt.cmp(&du) {
        Ordering::Equal => build(vec![k], vec![t.clone(), u.clone()]),
        Ordering::Greater => match concat3_right(t, k, u, du) {
            InsertResult::Done(n) => n,
            InsertResult::Split(l, p, r) => build(vec![p], vec![l, r]),
        },
        Ordering::Less => match concat3_left(u, k, t, dt) {
            InsertResult::Done(n) => n,
            InsertResult::Split(l, p, r) => build(vec![p], vec![l, r]),
        },
    }
}

/// `concat(t, u)`: requires `max(t) < min(u)`, no pivot.
pub fn concat<K: Ord + Clone>(t: &Tree<K>, u: &Tree<K>) -> Tree<K> {
    if t.is_empty_tree() {
        return u.clone();
    }
    if u.is_empty_tree() {
        return t.clone();
    }
    if depth(t) <= depth(u) {
        let (max_key, t2) = extract_max(t);
        concat3(&t2, max_key, u)
    } else {
        let (min_key, u2) = extract_min(u);
        concat3(t, min_key, &u2)
    }
}

/// `split(t, k) -> (less, greater)`; `k` itself is excluded from both.
pub fn split<K: Ord + Clone>(t: &Tree<K>, key: &K) -> (Tree<K>, Tree<K>) {
    match t {
        Tree::Empty => (Tree::Empty, Tree::Empty),
        _ => {
            let (keys, children) = raw(t);
            let mut idx = 0;
            while idx < keys.len() && *key > keys[idx] {
                idx += 1;
            }
            if idx < keys.len() && *key == keys[idx] {
                let less = build_chain(&children[..=idx], &keys[..idx]);
                let greater = build_chain(&children[idx + 1..], &keys[idx + 1..]);
                (less, greater)
            } else {
                let (l, g) = split(&children[idx], key);
                let left_chain = build_chain(&children[..=idx], &keys[..idx]);
                let less = concat(&left_chain, &l);
                let greater = if idx < keys.len() {
                    let right_chain = build_chain(&children[idx + 1..], &keys[idx + 1..]);
                    concat3(&g, keys[idx].clone(), &right_chain)
                } else {
                    // idx == keys.len(): no key/sibling to the right at this level
                    g
                };
                (less, greater)
            }
        }
    }
}

/// `split_by(t, key, cmp)`: like `split`, but via a `Q`-typed `key` and
/// `cmp` rather than requiring a full dummy `K` to search/split with.
pub fn split_by<K: Ord + Clone, Q>(t: &Tree<K>, key: &Q, cmp: &impl Fn(&K, &Q) -> Ordering) -> (Tree<K>, Tree<K>) {
    match t {
        Tree::Empty => (Tree::Empty, Tree::Empty),
        _ => {
            let (keys, children) = raw(t);
            let mut idx = 0;
            while idx < keys.len() && cmp(&keys[idx], key) == Ordering::Less {
                idx += 1;
            }
            if idx < keys.len() && cmp(&keys[idx], key) == Ordering::Equal {
                let less = build_chain(&children[..=idx], &keys[..idx]);
                let greater = build_chain(&children[idx + 1..], &keys[idx + 1..]);
                (less, greater)
            } else {
                let (l, g) = split_by(&children[idx], key, cmp);
                let left_chain = build_chain(&children[..=idx], &keys[..idx]);
                let less = concat(&left_chain, &l);
                let greater = if idx < keys.len() {
                    let right_chain = build_chain(&children[idx + 1..], &keys[idx + 1..]);
                    concat3(&g, keys[idx].clone(), &right_chain)
                } else {
                    g
                };
                (less, greater)
            }
        }
    }
}

/// Picks one key off `u`'s root and returns `(key, left-of-key, rest)`.
fn peel_root<K: Ord + Clone>(u: &Tree<K>) -> (K, Tree<K>, Tree<K>) {
    let (keys, children) = raw(u);
    let key = keys[0].clone();
    let left = children[0].clone();
    let rest = build_chain(&children[1..], &keys[1..]);
    (key, left, rest)
}

/// `union(t, u)`.
pub fn union<K: Ord + Clone>(t: &Tree<K>, u: &Tree<K>) -> Tree<K> {
    if t.is_empty_tree() {
        return u.clone();
    }
    if u.is_empty_tree() {
        return t.clone();
    }
    let (k, ul, ur) = peel_root(u);
    let (tl, tr) = split(t, &k);
    let left = union(&tl, &ul);
    let right = union(&tr, &ur);
    concat3(&left, k, &right)
}

/// `intersect(t, u)`.
pub fn intersect<K: Ord + Clone>(t: &Tree<K>, u: &Tree<K>) -> Tree<K> {
    if t.is_empty_tree() || u.is_empty_tree() {
        return Tree::Empty;
    }
    let (k, ul, ur) = peel_root(u);
    let (tl, tr) = split(t, &k);
    let left = intersect(&tl, &ul);
    let right = intersect(&tr, &ur);
    if search(t, &k).is_some() {
        concat3(&left, k, &right)
    } else {
        concat(&left, &right)
    }
}

/// `diff(t, u)`: elements of `t` not in `u`.
pub fn diff<K: Ord + Clone>(t: &Tree<K>, u: &Tree<K>) -> Tree<K> {
    if t.is_empty_tree() {
        return Tree::Empty;
    }
    if u.is_empty_tree() {
        return t.clone();
    }
    let (k, ul, ur) = peel_root(u);
    let (tl, tr) = split(t, &k);
    let left = diff(&tl, &ul);
    let right = diff(&tr, &ur);
    concat(&left, &right)
}

impl<K> Tree<K> {
    fn is_empty_tree(&self) -> bool {
        matches!(self, Tree::Empty)
    }
}

/// `fold_l(t, init, f)`: ascending order.
pub fn fold_l<K, A>(t: &Tree<K>, init: A, f: &mut impl FnMut(A, &K) -> A) -> A {
    match t {
        Tree::Empty => init,
        Tree::Two(n) => {
            let a = fold_l(&n.left, init, f);
            let a = f(a, &n.key);
            fold_l(&n.right, a, f)
        }
        Tree::Three(n) => {
            let a = fold_l(&n.c1, init, f);
            let a = f(a, &n.k1);
            let a = fold_l(&n.c2, a, f);
            let a = f(a, &n.k2);
            fold_l(&n.c3, a, f)
        }
        Tree::Four(n) => {
            let a = fold_l(&n.c1, init, f);
            let a = f(a, &n.k1);
            let a = fold_l(&n.c2, a, f);
            let a = f(a, &n.k2);
            let a = fold_l(&n.c3, a, f);
            let a = f(a, &n.k3);
            fold_l(&n.c4, a, f)
        }
    }
}

/// `fold_r(t, init, f)`: via array materialisation, so stack depth is
/// `O(depth)` not `O(size)`.
pub fn fold_r<K, A>(t: &Tree<K>, init: A, mut f: impl FnMut(&K, A) -> A) -> A {
    let items = to_vec(t);
    let mut acc = init;
    for key in items.iter().rev() {
        acc = f(key, acc);
    }
    acc
}

fn to_vec<K>(t: &Tree<K>) -> Vec<&K> {
    let mut out = Vec::with_capacity(size(t));
    fn go<'a, K>(t: &'a Tree<K>, out: &mut Vec<&'a K>) {
        match t {
            Tree::Empty => {}
            Tree::Two(n) => {
                go(&n.left, out);
                out.push(&n.key);
                go(&n.right, out);
            }
            Tree::Three(n) => {
                go(&n.c1, out);
                out.push(&n.k1);
                go(&n.c2, out);
                out.push(&n.k2);
                go(&n.c3, out);
            }
            Tree::Four(n) => {
                go(&n.c1, out);
                out.push(&n.k1);
                go(&n.c2, out);
                out.push(&n.k2);
                go(&n.c3, out);
                out.push(&n.k3);
                go(&n.c4, out);
            }
        }
    }
    go(t, &mut out);
    out
}

/// `map(t, f)`: transforms every key in place, preserving shape.
pub fn map<K, U>(t: &Tree<K>, f: &mut impl FnMut(&K) -> U) -> Tree<U> {
    match t {
        Tree::Empty => Tree::Empty,
        Tree::Two(n) => {
            let left = map(&n.left, f);
            let key = f(&n.key);
            let right = map(&n.right, f);
            Tree::Two(Arc::new(TwoNode {
                size: n.size,
                key,
                left,
                right,
            }))
        }
        Tree::Three(n) => {
            let c1 = map(&n.c1, f);
            let k1 = f(&n.k1);
            let c2 = map(&n.c2, f);
            let k2 = f(&n.k2);
            let c3 = map(&n.c3, f);
            Tree::Three(Arc::new(ThreeNode {
                size: n.size,
                k1,
                k2,
                c1,
                c2,
                c3,
            }))
        }
        Tree::Four(n) => {
            let c1 = map(&n.c1, f);
            let k1 = f(&n.k1);
            let c2 = map(&n.c2, f);
            let k2 = f(&n.k2);
            let c3 = map(&n.c3, f);
            let k3 = f(&n.k3);
            let c4 = map(&n.c4, f);
            Tree::Four(Arc::new(FourNode {
                size: n.size,
                k1,
                k2,
                k3,
                c1,
                c2,
                c3,
                c4,
            }))
        }
    }
}

/// `to_list(t)`: ascending order.
pub fn to_list<K: Clone>(t: &Tree<K>) -> Vec<K> {
    to_vec(t).into_iter().cloned().collect()
}

/// `from_list(xs)`: via successive insertion.
pub fn from_list<K: Ord + Clone>(xs: impl IntoIterator<Item = K>) -> Tree<K> {
    let mut t = Tree::Empty;
    for key in xs {
        t = insert(&t, key);
    }
    t
}

/// `compare(t, u)`: lexicographic over the ascending sequences.
pub fn compare<K: Ord>(t: &Tree<K>, u: &Tree<K>) -> Ordering {
    to_vec(t).cmp(&to_vec(u))
}

/// `verify(t)`: balance, ordering and cached-size checks.
pub fn verify<K: Ord>(t: &Tree<K>) -> bool {
    fn go<K: Ord>(t: &Tree<K>) -> Option<(usize, usize)> {
        // returns (depth, size) if valid
        match t {
            Tree::Empty => Some((0, 0)),
            Tree::Two(n) => {
                let (dl, sl) = go(&n.left)?;
                let (dr, sr) = go(&n.right)?;
                if dl != dr {
                    return None;
                }
                if !ordered_below(&n.left, &n.key) || !ordered_above(&n.right, &n.key) {
                    return None;
                }
                if n.size != sl + sr + 1 {
                    return None;
                }
                Some((dl + 1, n.size))
            }
            Tree::Three(n) => {
                if n.k1 >= n.k2 {
                    return None;
                }
                let (d1, s1) = go(&n.c1)?;
                let (d2, s2) = go(&n.c2)?;
                let (d3, s3) = go(&n.c3)?;
                if d1 != d2 || d2 != d3 {
                    return None;
                }
                if !ordered_below(&n.c1, &n.k1)
                    || !ordered_above(&n.c2, &n.k1)
                    || !ordered_below(&n.c2, &n.k2)
                    || !ordered_above(&n.c3, &n.k2)
                {
                    return None;
                }
                if n.size != s1 + s2 + s3 + 2 {
                    return None;
                }
                Some((d1 + 1, n.size))
            }
            Tree::Four(n) => {
                if n.k1 >= n.k2 || n.k2 >= n.k3 {
                    return None;
                }
                let (d1, s1) = go(&n.c1)?;
                let (d2, s2) = go(&n.c2)?;
                let (d3, s3) = go(&n.c3)?;
                let (d4, s4) = go(&n.c4)?;
                if d1 != d2 || d2 != d3 || d3 != d4 {
                    return None;
                }
                if !ordered_below(&n.c1, &n.k1)
                    || !ordered_above(&n.c2, &n.k1)
                    || !ordered_below(&n.c2, &n.k2)
                    || !ordered_above(&n.c3, &n.k2)
                    || !ordered_below(&n.c3, &n.k3)
                    || !ordered_above(&n.c4, &n.k3)
                {
                    return None;
                }
                if n.size != s1 + s2 + s3 + s4 + 3 {
                    return None;
                }
                Some((d1 + 1, n.size))
            }
        }
    }
    fn ordered_below<K: Ord>(t: &Tree<K>, bound: &K) -> bool {
        to_vec(t).iter().all(|k| *k < bound)
    }
    fn ordered_above<K: Ord>(t: &Tree<K>, bound: &K) -> bool {
        to_vec(t).iter().all(|k| *k > bound)
    }
    go(t).is_some()
}

impl<K: fmt::Debug> fmt::Debug for Tree<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, key) in to_vec(self).into_iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{:?}", key)?;
        }
        f.write_str("}")
    }
}

enum Frame<K> {
    Node(Tree<K>),
    Key(K),
}

/// In-order iterator. Holds an explicit stack of pending nodes/keys and
/// expands one node at a time on `next()`, rather than materialising the
/// whole sequence up front; the stack never holds more than O(depth) frames
/// since each node pushes a bounded (≤ 4-ary) number of children/keys.
pub struct Iter<K> {
    stack: Vec<Frame<K>>,
}

impl<K: Clone> Iterator for Iter<K> {
    type Item = K;
    fn next(&mut self) -> Option<K> {
        while let Some(frame) = self.stack.pop() {
            match frame {
                Frame::Key(k) => return Some(k),
                Frame::Node(Tree::Empty) => {}
                Frame::Node(Tree::Two(n)) => {
                    self.stack.push(Frame::Node(n.right.clone()));
                    self.stack.push(Frame::Key(n.key.clone()));
                    self.stack.push(Frame::Node(n.left.clone()));
                }
                Frame::Node(Tree::Three(n)) => {
                    self.stack.push(Frame::Node(n.c3.clone()));
                    self.stack.push(Frame::Key(n.k2.clone()));
                    self.stack.push(Frame::Node(n.c2.clone()));
                    self.stack.push(Frame::Key(n.k1.clone()));
                    self.stack.push(Frame::Node(n.c1.clone()));
                }
                Frame::Node(Tree::Four(n)) => {
                    self.stack.push(Frame::Node(n.c4.clone()));
                    self.stack.push(Frame::Key(n.k3.clone()));
                    self.stack.push(Frame::Node(n.c3.clone()));
                    self.stack.push(Frame::Key(n.k2.clone()));
                    self.stack.push(Frame::Node(n.c2.clone()));
                    self.stack.push(Frame::Key(n.k1.clone()));
                    self.stack.push(Frame::Node(n.c1.clone()));
                }
            }
        }
        None
    }
}

impl<K: Clone> Tree<K> {
    pub fn iter(&self) -> Iter<K> {
        Iter { stack: vec![Frame::Node(self.clone())] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn of(values: &[i32]) -> Tree<i32> {
        from_list(values.iter().copied())
    }

    #[test]
    fn empty_tree_basics() {
        let t: Tree<i32> = empty();
        assert_eq!(size(&t), 0);
        assert!(verify(&t));
        assert!(search(&t, &1).is_none());
    }

    #[test]
    fn insert_search_delete_roundtrip() {
        let t = of(&[5, 3, 8, 1, 4, 7, 9, 2, 6, 0]);
        assert!(verify(&t));
        assert_eq!(size(&t), 10);
        for x in 0..10 {
            assert_eq!(search(&t, &x), Some(&x));
        }
        let t2 = delete(&t, &5);
        assert!(verify(&t2));
        assert_eq!(size(&t2), 9);
        assert!(search(&t2, &5).is_none());
        // original unaffected
        assert!(search(&t, &5).is_some());
    }

    #[test]
    fn delete_absent_key_is_noop() {
        let t = of(&[1, 2, 3]);
        let t2 = delete(&t, &99);
        assert_eq!(size(&t2), 3);
        assert!(verify(&t2));
    }

    #[test]
    fn scenario_5_sets() {
        let s = of(&(0..100).map(|i| 2 * i).collect::<Vec<_>>());
        assert!(search(&s, &64).is_some());
        assert!(search(&s, &63).is_none());
        let with67 = insert(&s, 67);
        assert!(compare(&intersect(&s, &with67), &s) == Ordering::Equal);
        let erased22 = delete(&s, &22);
        let d = diff(&s, &erased22);
        assert_eq!(to_list(&d), vec![22]);
    }

    #[test]
    fn scenario_4_maps_via_pairs() {
        #[derive(Clone, Debug)]
        struct Entry(i32, i32);
        impl PartialEq for Entry {
            fn eq(&self, other: &Self) -> bool {
                self.0 == other.0
            }
        }
        impl Eq for Entry {}
        impl PartialOrd for Entry {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }
        impl Ord for Entry {
            fn cmp(&self, other: &Self) -> Ordering {
                self.0.cmp(&other.0)
            }
        }
        let m = of_entries(&(0..200).map(|i| Entry(i, 2 * i)).collect::<Vec<_>>());
        assert_eq!(size(&m), 200);
        assert!(search(&m, &Entry(25, 0)).map(|e| e.1) == Some(50));
        assert!(search(&m, &Entry(203, 0)).is_none());
        let (less, greater) = split(&m, &Entry(123, 0));
        let merged = union(&less, &greater);
        let erased = delete(&m, &Entry(123, 0));
        assert_eq!(compare(&merged, &erased), Ordering::Equal);

        fn of_entries(values: &[Entry]) -> Tree<Entry> {
            from_list(values.iter().cloned())
        }
    }

    proptest! {
        #[test]
        fn verify_holds_after_random_inserts(xs: Vec<i32>) {
            let t = of(&xs);
            prop_assert!(verify(&t));
        }

        #[test]
        fn insert_twice_same_key_replaces(xs: Vec<i32>, k: i32) {
            let base = of(&xs);
            let once = insert(&base, k);
            let twice = insert(&once, k);
            prop_assert_eq!(compare(&once, &twice), Ordering::Equal);
        }

        #[test]
        fn union_self_is_identity(xs: Vec<i32>) {
            let t = of(&xs);
            prop_assert_eq!(compare(&union(&t, &t), &t), Ordering::Equal);
        }

        #[test]
        fn intersect_self_is_identity(xs: Vec<i32>) {
            let t = of(&xs);
            prop_assert_eq!(compare(&intersect(&t, &t), &t), Ordering::Equal);
        }

        #[test]
        fn diff_self_is_empty(xs: Vec<i32>) {
            let t = of(&xs);
            prop_assert!(diff(&t, &t).is_empty_tree());
        }

        #[test]
        fn split_then_union_recovers(xs: Vec<i32>, k: i32) {
            let t = of(&xs);
            let (l, g) = split(&t, &k);
            let rebuilt = if search(&t, &k).is_some() { insert(&union(&l, &g), k) } else { union(&l, &g) };
            prop_assert_eq!(compare(&rebuilt, &t), Ordering::Equal);
        }

        #[test]
        fn contains_after_insert_and_erase(xs: Vec<i32>, x: i32) {
            let t = of(&xs);
            let inserted = insert(&t, x);
            prop_assert!(search(&inserted, &x).is_some());
            let erased = delete(&inserted, &x);
            prop_assert!(search(&erased, &x).is_none());
        }
    }
}
