//! C2 — Cons List.
//!
//! `List<T>` is a singly-linked immutable list: empty, or a node holding a
//! value and a shared tail. Updates only ever allocate along the modified
//! prefix; the tail is shared (`Arc`-refcounted owning pointers) rather
//! than copied.
//!
//! Same empty/cons shape as a classic persistent cons list, with an
//! array-materialising `foldr`/`sort` to avoid linear stack recursion, and
//! the Rust idiom of a thin persistent wrapper around a shared node
//! generalized to a plain linked list instead of a trie.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

enum Node<T> {
    Nil,
    Cons(T, List<T>),
}

/// A persistent, singly-linked list.
pub struct List<T> {
    node: Arc<Node<T>>,
}

impl<T> Clone for List<T> {
    fn clone(&self) -> Self {
        List {
            node: Arc::clone(&self.node),
        }
    }
}

impl<T> List<T> {
    /// `empty()`.
    pub fn empty() -> Self {
        List {
            node: Arc::new(Node::Nil),
        }
    }

    /// `cons(x, xs)`.
    pub fn cons(value: T, tail: List<T>) -> Self {
        List {
            node: Arc::new(Node::Cons(value, tail)),
        }
    }

    /// `is_empty(xs)`.
    pub fn is_empty(&self) -> bool {
        matches!(*self.node, Node::Nil)
    }

    /// `head(xs)`. Panics on an empty list.
    pub fn head(&self) -> &T {
        match &*self.node {
            Node::Cons(value, _) => value,
            Node::Nil => panic!("head: empty list"),
        }
    }

    /// `tail(xs)`. Panics on an empty list.
    pub fn tail(&self) -> List<T> {
        match &*self.node {
            Node::Cons(_, tail) => tail.clone(),
            Node::Nil => panic!("tail: empty list"),
        }
    }

    /// `last(xs)`. Panics on an empty list. O(n).
    pub fn last(&self) -> &T {
        let mut cur = self;
        loop {
            match &*cur.node {
                Node::Cons(value, tail) if tail.is_empty() => return value,
                Node::Cons(_, tail) => cur = tail,
                Node::Nil => panic!("last: empty list"),
            }
        }
    }

    /// `length(xs)`. O(n).
    pub fn length(&self) -> usize {
        let mut n = 0;
        let mut cur = self;
        loop {
            match &*cur.node {
                Node::Nil => return n,
                Node::Cons(_, tail) => {
                    n += 1;
                    cur = tail;
                }
            }
        }
    }

    /// An iterator over references to each element, head to tail.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { cur: self }
    }
}

impl<T: Clone> List<T> {
    /// `append(xs, ys)`: O(|xs|). `xs` is copied; `ys` is shared as the new
    /// tail of the rebuilt prefix.
    pub fn append(&self, ys: &List<T>) -> List<T> {
        let buf: Vec<T> = self.iter().cloned().collect();
        let mut out = ys.clone();
        for value in buf.into_iter().rev() {
            out = List::cons(value, out);
        }
        out
    }

    /// `reverse(xs)`. O(n).
    pub fn reverse(&self) -> List<T> {
        let mut out = List::empty();
        for value in self.iter() {
            out = List::cons(value.clone(), out);
        }
        out
    }

    /// `take(xs, n)`: the first `n` elements (or fewer, if `xs` is shorter).
    pub fn take(&self, n: usize) -> List<T> {
        let buf: Vec<T> = self.iter().take(n).cloned().collect();
        let mut out = List::empty();
        for value in buf.into_iter().rev() {
            out = List::cons(value, out);
        }
        out
    }

    /// `take_while(xs, pred)`.
    pub fn take_while(&self, mut pred: impl FnMut(&T) -> bool) -> List<T> {
        let mut buf = Vec::new();
        for value in self.iter() {
            if !pred(value) {
                break;
            }
            buf.push(value.clone());
        }
        let mut out = List::empty();
        for value in buf.into_iter().rev() {
            out = List::cons(value, out);
        }
        out
    }

    /// `map(xs, f)`.
    pub fn map<U: Clone>(&self, mut f: impl FnMut(&T) -> U) -> List<U> {
        let buf: Vec<U> = self.iter().map(|v| f(v)).collect();
        let mut out = List::empty();
        for value in buf.into_iter().rev() {
            out = List::cons(value, out);
        }
        out
    }

    /// `filter(xs, pred)`.
    pub fn filter(&self, mut pred: impl FnMut(&T) -> bool) -> List<T> {
        let buf: Vec<T> = self.iter().filter(|v| pred(v)).cloned().collect();
        let mut out = List::empty();
        for value in buf.into_iter().rev() {
            out = List::cons(value, out);
        }
        out
    }

    /// `zip(xs, ys)`: stops at the shorter list.
    pub fn zip<U: Clone>(&self, ys: &List<U>) -> List<(T, U)> {
        let buf: Vec<(T, U)> = self
            .iter()
            .cloned()
            .zip(ys.iter().cloned())
            .collect();
        let mut out = List::empty();
        for pair in buf.into_iter().rev() {
            out = List::cons(pair, out);
        }
        out
    }

    /// `fold_l(xs, init, f)`.
    pub fn fold_l<A>(&self, init: A, mut f: impl FnMut(A, &T) -> A) -> A {
        let mut acc = init;
        for value in self.iter() {
            acc = f(acc, value);
        }
        acc
    }

    /// `fold_r(xs, init, f)`. Materialises to an array first so stack depth
    /// does not grow with `n`.
    pub fn fold_r<A>(&self, init: A, mut f: impl FnMut(&T, A) -> A) -> A {
        let buf: Vec<&T> = self.iter().collect();
        let mut acc = init;
        for value in buf.into_iter().rev() {
            acc = f(value, acc);
        }
        acc
    }
}

impl<T: Clone + Ord> List<T> {
    /// `sort(xs)`: stable, via array materialisation.
    pub fn sort(&self) -> List<T> {
        let mut buf: Vec<T> = self.iter().cloned().collect();
        buf.sort();
        let mut out = List::empty();
        for value in buf.into_iter().rev() {
            out = List::cons(value, out);
        }
        out
    }
}

impl<T: Ord> List<T> {
    /// `compare(xs, ys)`: lexicographic.
    pub fn compare(&self, other: &List<T>) -> Ordering {
        let mut a = self.iter();
        let mut b = other.iter();
        loop {
            match (a.next(), b.next()) {
                (None, None) => return Ordering::Equal,
                (None, Some(_)) => return Ordering::Less,
                (Some(_), None) => return Ordering::Greater,
                (Some(x), Some(y)) => match x.cmp(y) {
                    Ordering::Equal => continue,
                    other => return other,
                },
            }
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for List<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, value) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{:?}", value)?;
        }
        f.write_str("]")
    }
}

impl<T> Default for List<T> {
    fn default() -> Self {
        List::empty()
    }
}

impl<T: PartialEq> PartialEq for List<T> {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

pub struct Iter<'a, T> {
    cur: &'a List<T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        match &*self.cur.node {
            Node::Nil => None,
            Node::Cons(value, tail) => {
                self.cur = tail;
                Some(value)
            }
        }
    }
}

impl<T> FromIterator<T> for List<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let buf: Vec<T> = iter.into_iter().collect();
        let mut out = List::empty();
        for value in buf.into_iter().rev() {
            out = List::cons(value, out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn of(values: &[i32]) -> List<i32> {
        values.iter().copied().collect()
    }

    #[test]
    fn empty_list_basics() {
        let xs: List<i32> = List::empty();
        assert!(xs.is_empty());
        assert_eq!(xs.length(), 0);
    }

    #[test]
    #[should_panic(expected = "head: empty list")]
    fn head_of_empty_panics() {
        let xs: List<i32> = List::empty();
        xs.head();
    }

    #[test]
    #[should_panic(expected = "tail: empty list")]
    fn tail_of_empty_panics() {
        let xs: List<i32> = List::empty();
        xs.tail();
    }

    #[test]
    fn scenario_1_from_spec() {
        let mut xs = List::empty();
        for i in (0..=30).rev() {
            xs = List::cons(i, xs);
        }
        assert_eq!(xs.length(), 31);
        assert_eq!(*xs.head(), 0);
        assert_eq!(*xs.last(), 30);
        assert_eq!(xs.tail().length(), 30);
        assert_eq!(*xs.reverse().head(), 30);
        assert_eq!(xs.fold_l(0, |acc, x| acc + x), 465);
    }

    #[test]
    fn append_preserves_order() {
        let xs = of(&[1, 2, 3]);
        let ys = of(&[4, 5]);
        let zs = xs.append(&ys);
        assert_eq!(zs.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn persistence_append_does_not_mutate_inputs() {
        let xs = of(&[1, 2, 3]);
        let ys = of(&[4, 5]);
        let _ = xs.append(&ys);
        assert_eq!(xs.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(ys.iter().copied().collect::<Vec<_>>(), vec![4, 5]);
    }

    #[test]
    fn fold_l_and_fold_r_agree_for_sum() {
        let xs = of(&[1, 2, 3, 4, 5]);
        assert_eq!(xs.fold_l(0, |a, x| a + x), xs.fold_r(0, |x, a| a + x));
    }

    #[test]
    fn sort_is_stable_and_correct() {
        let xs = of(&[5, 3, 1, 4, 1, 2]);
        let sorted = xs.sort();
        assert_eq!(sorted.iter().copied().collect::<Vec<_>>(), vec![1, 1, 2, 3, 4, 5]);
    }

    proptest! {
        #[test]
        fn reverse_reverse_is_identity(v: Vec<i32>) {
            let xs = of(&v);
            prop_assert_eq!(xs.reverse().reverse(), xs);
        }

        #[test]
        fn append_length_is_additive(a: Vec<i32>, b: Vec<i32>) {
            let xs = of(&a);
            let ys = of(&b);
            prop_assert_eq!(xs.append(&ys).length(), xs.length() + ys.length());
        }

        #[test]
        fn take_never_exceeds_n(v: Vec<i32>, n: usize) {
            let xs = of(&v);
            prop_assert!(xs.take(n).length() <= n);
        }
    }
}
