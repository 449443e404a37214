//! C6 — Vector: a spine of small contiguous element runs.
//!
//! Fragment shape: an element count plus inline storage, sharing the
//! merge-on-push / split-at-offset pattern used in `string.rs` through the
//! common `spine.rs` seam.

use std::cmp::Ordering;
use std::fmt;

use crate::list::List;
use crate::spine::{self, Fragment, Spine};
use crate::string::Text;

/// `floor((16 - header) / sizeof(T))`, at least 1, using
/// `size_of::<usize>()` as the stand-in "header" cost.
fn frag_capacity<T>() -> usize {
    let elem = std::mem::size_of::<T>().max(1);
    (16usize.saturating_sub(std::mem::size_of::<usize>()) / elem).max(1)
}

#[derive(Clone)]
pub(crate) struct VecFrag<T> {
    items: Vec<T>,
}

impl<T: Clone> Fragment for VecFrag<T> {
    fn frag_len(&self) -> usize {
        self.items.len()
    }
}

impl<T: Clone> VecFrag<T> {
    fn split_at(&self, i: usize) -> (VecFrag<T>, VecFrag<T>) {
        let (l, r) = self.items.split_at(i);
        (VecFrag { items: l.to_vec() }, VecFrag { items: r.to_vec() })
    }
}

/// A persistent, index-addressable vector.
#[derive(Clone)]
pub struct Vector<T> {
    spine: Spine<VecFrag<T>>,
}

impl<T> Default for Vector<T> {
    fn default() -> Self {
        Vector { spine: Spine::default() }
    }
}

impl<T: Clone> Vector<T> {
    /// `empty()`.
    pub fn empty() -> Self {
        Vector { spine: spine::empty() }
    }

    /// `from_list(xs)`.
    pub fn from_list(xs: &List<T>) -> Self {
        let mut v = Vector::empty();
        for x in xs.iter() {
            v = v.push_back(x.clone());
        }
        v
    }

    /// Construction from a raw slice.
    pub fn from_slice(xs: &[T]) -> Self {
        let mut v = Vector::empty();
        for x in xs {
            v = v.push_back(x.clone());
        }
        v
    }

    pub fn len(&self) -> usize {
        spine::length(&self.spine)
    }

    pub fn is_empty(&self) -> bool {
        spine::is_empty(&self.spine)
    }

    /// `push_back(v, x)`: merges into the back fragment if it still has
    /// room, else starts a new one.
    pub fn push_back(&self, value: T) -> Self {
        if spine::is_empty(&self.spine) {
            return Vector {
                spine: spine::push_back(&spine::empty(), VecFrag { items: vec![value] }),
            };
        }
        let cap = frag_capacity::<T>();
        let back = spine::peek_back(&self.spine);
        if back.items.len() < cap {
            let mut merged = back.clone();
            merged.items.push(value);
            Vector { spine: spine::replace_back(&self.spine, merged) }
        } else {
            Vector { spine: spine::push_back(&self.spine, VecFrag { items: vec![value] }) }
        }
    }

    /// `push_front(v, x)`.
    pub fn push_front(&self, value: T) -> Self {
        if spine::is_empty(&self.spine) {
            return Vector {
                spine: spine::push_front(&spine::empty(), VecFrag { items: vec![value] }),
            };
        }
        let cap = frag_capacity::<T>();
        let front = spine::peek_front(&self.spine);
        if front.items.len() < cap {
            let mut merged = VecFrag { items: vec![value] };
            merged.items.extend(front.items.iter().cloned());
            Vector { spine: spine::replace_front(&self.spine, merged) }
        } else {
            Vector { spine: spine::push_front(&self.spine, VecFrag { items: vec![value] }) }
        }
    }

    /// `pop_back(v)`.
    pub fn pop_back(&self) -> Option<(T, Self)> {
        let (frag, rest) = spine::pop_back(&self.spine)?;
        let mut items = frag.items.clone();
        let value = items.pop().expect("fragment invariant: non-empty");
        let new_spine = if items.is_empty() {
            rest
        } else {
            spine::push_back(&rest, VecFrag { items })
        };
        Some((value, Vector { spine: new_spine }))
    }

    /// `pop_front(v)`.
    pub fn pop_front(&self) -> Option<(T, Self)> {
        let (frag, rest) = spine::pop_front(&self.spine)?;
        let mut items = frag.items.clone();
        let value = items.remove(0);
        let new_spine = if items.is_empty() {
            rest
        } else {
            spine::push_front(&rest, VecFrag { items })
        };
        Some((value, Vector { spine: new_spine }))
    }

    /// `append(v, w)`.
    pub fn append(&self, other: &Self) -> Self {
        Vector { spine: spine::append(&self.spine, &other.spine) }
    }

    /// `at(v, i)`.
    pub fn at(&self, i: usize) -> T {
        let (frag, offset) = spine::lookup(&self.spine, i);
        frag.items[offset].clone()
    }

    /// `front(v)`. Panics if empty.
    pub fn front(&self) -> T {
        self.at(0)
    }

    /// `back(v)`. Panics if empty.
    pub fn back(&self) -> T {
        self.at(self.len() - 1)
    }

    /// `split(v, i) -> (left, right)`.
    pub fn split(&self, i: usize) -> (Self, Self) {
        if i == 0 {
            return (Vector::empty(), self.clone());
        }
        if i == self.len() {
            return (self.clone(), Vector::empty());
        }
        let (left_spine, frag, offset, right_spine) = spine::split(&self.spine, i);
        let (frag_l, frag_r) = frag.split_at(offset);
        let left = if frag_l.frag_len() > 0 {
            spine::push_back(&left_spine, frag_l)
        } else {
            left_spine
        };
        let right = if frag_r.frag_len() > 0 {
            spine::push_front(&right_spine, frag_r)
        } else {
            right_spine
        };
        (Vector { spine: left }, Vector { spine: right })
    }

    /// `left(v, i)`.
    pub fn left(&self, i: usize) -> Self {
        self.split(i).0
    }

    /// `right(v, i)`.
    pub fn right(&self, i: usize) -> Self {
        self.split(i).1
    }

    /// `between(v, i, j)`: elements `[i, j)`.
    pub fn between(&self, i: usize, j: usize) -> Self {
        assert!(i <= j && j <= self.len(), "between: index out of range");
        self.right(i).left(j - i)
    }

    /// `insert(v, i, w)`: splices a whole vector `w` into `v` at index `i`,
    /// the same split/append/append shape `Text::insert` uses for splicing
    /// a substring in at a codepoint index.
    pub fn insert(&self, i: usize, other: &Self) -> Self {
        let (left, right) = self.split(i);
        left.append(other).append(&right)
    }

    /// `erase(v, i, j)`: removes elements `[i, j)`.
    pub fn erase(&self, i: usize, j: usize) -> Self {
        assert!(i <= j && j <= self.len(), "erase: index out of range");
        let (left, _) = self.split(i);
        let (_, right) = self.split(j);
        left.append(&right)
    }

    /// `fold_l(v, init, f)`.
    pub fn fold_l<A>(&self, init: A, mut f: impl FnMut(A, &T) -> A) -> A {
        spine::fold_l(&self.spine, init, |acc, frag| {
            frag.items.iter().fold(acc, |a, x| f(a, x))
        })
    }

    /// `fold_r(v, init, f)`.
    pub fn fold_r<A>(&self, init: A, mut f: impl FnMut(&T, A) -> A) -> A {
        spine::fold_r(&self.spine, init, |frag, acc| {
            frag.items.iter().rev().fold(acc, |a, x| f(x, a))
        })
    }

    /// `map<U>(v, f)`.
    pub fn map<U: Clone>(&self, mut f: impl FnMut(&T) -> U) -> Vector<U> {
        Vector {
            spine: spine::map(&self.spine, &mut |frag: &VecFrag<T>| VecFrag {
                items: frag.items.iter().map(|x| f(x)).collect(),
            }),
        }
    }

    /// `filter(v, pred)`.
    pub fn filter(&self, mut pred: impl FnMut(&T) -> bool) -> Self {
        let mut out = Vector::empty();
        for frag in self.spine.iter() {
            for x in frag.items.into_iter() {
                if pred(&x) {
                    out = out.push_back(x);
                }
            }
        }
        out
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.fold_l(Vec::with_capacity(self.len()), |mut acc, x| {
            acc.push(x.clone());
            acc
        })
    }

    /// Materialising element iterator.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.spine.iter().flat_map(|frag| frag.items.into_iter())
    }

    /// `verify(v)`.
    pub fn verify(&self) -> bool {
        let cap = frag_capacity::<T>();
        spine::verify(&self.spine) && self.spine.iter().all(|f| f.frag_len() >= 1 && f.items.len() <= cap)
    }
}

impl Vector<char> {
    /// Construction from a string's codepoints.
    pub fn from_codepoints(text: &Text) -> Self {
        let mut v = Vector::empty();
        for c in text.to_string().chars() {
            v = v.push_back(c);
        }
        v
    }
}

impl<T: Clone + Ord> Vector<T> {
    /// `compare(v, w)`: paired fragment traversal via the spine's
    /// `frag_cmp_at` seam.
    pub fn compare(&self, other: &Self) -> Ordering {
        spine::compare(&self.spine, &other.spine, |a, ia, b, ib| a.items[ia].cmp(&b.items[ib]))
    }
}

impl<T: Clone + Ord> PartialEq for Vector<T> {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Vector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, x) in self.to_vec().into_iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{:?}", x)?;
        }
        f.write_str("]")
    }
}

impl<T: Clone> FromIterator<T> for Vector<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut v = Vector::empty();
        for x in iter {
            v = v.push_back(x);
        }
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn push_back_and_at_round_trip() {
        let v: Vector<i32> = (0..100).collect();
        assert_eq!(v.len(), 100);
        assert!(v.verify());
        for i in 0..100 {
            assert_eq!(v.at(i), i as i32);
        }
    }

    #[test]
    fn push_front_prepends() {
        let v: Vector<i32> = Vector::empty().push_front(2).push_front(1).push_front(0);
        assert_eq!(v.to_vec(), vec![0, 1, 2]);
    }

    #[test]
    fn pop_back_and_pop_front_are_inverse_of_push() {
        let v: Vector<i32> = (0..20).collect();
        let (last, rest) = v.pop_back().unwrap();
        assert_eq!(last, 19);
        assert_eq!(rest.len(), 19);
        let (first, rest2) = rest.pop_front().unwrap();
        assert_eq!(first, 0);
        assert_eq!(rest2.to_vec(), (1..19).collect::<Vec<_>>());
    }

    #[test]
    fn split_append_round_trips() {
        let v: Vector<i32> = (0..50).collect();
        for i in 0..=50 {
            let (l, r) = v.split(i);
            assert_eq!(l.append(&r).to_vec(), v.to_vec());
        }
    }

    #[test]
    fn insert_erase_is_identity() {
        let v: Vector<i32> = (0..30).collect();
        let single = Vector::empty().push_back(999);
        let inserted = v.insert(10, &single);
        assert_eq!(inserted.at(10), 999);
        let erased = inserted.erase(10, 11);
        assert_eq!(erased.to_vec(), v.to_vec());
    }

    #[test]
    fn insert_self_then_between_recovers_original() {
        let v: Vector<i32> = (0..300).collect();
        let inserted = v.insert(10, &v);
        assert_eq!(inserted.len(), 2 * v.len());
        let recovered = inserted.between(10, 10 + v.len());
        assert_eq!(recovered.to_vec(), v.to_vec());
    }

    #[test]
    fn map_and_filter() {
        let v: Vector<i32> = (0..10).collect();
        let doubled = v.map(|x| x * 2);
        assert_eq!(doubled.to_vec(), (0..10).map(|x| x * 2).collect::<Vec<_>>());
        let evens = v.filter(|x| x % 2 == 0);
        assert_eq!(evens.to_vec(), vec![0, 2, 4, 6, 8]);
    }

    #[test]
    fn from_codepoints_matches_string_contents() {
        let t = Text::from_cstring("hello");
        let v = Vector::from_codepoints(&t);
        assert_eq!(v.to_vec(), vec!['h', 'e', 'l', 'l', 'o']);
    }

    proptest! {
        #[test]
        fn fold_l_matches_to_vec_sum(xs: Vec<i32>) {
            let v: Vector<i32> = xs.iter().copied().collect();
            let via_fold = v.fold_l(0i64, |a, x| a + *x as i64);
            let via_vec: i64 = xs.iter().map(|&x| x as i64).sum();
            prop_assert_eq!(via_fold, via_vec);
        }

        #[test]
        fn verify_holds_after_random_pushes(xs: Vec<i32>) {
            let v: Vector<i32> = xs.into_iter().collect();
            prop_assert!(v.verify());
        }
    }
}
