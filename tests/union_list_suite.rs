//! Drives every container through its concrete usage scenario, with a
//! small custom list built directly on the `Union2` tagged-union carrier
//! to exercise C1 end to end rather than through a container façade.
//!
//! No public surface of its own; failures are ordinary `assert!`/
//! `assert_eq!` panics, naming the failing expression.

use std::fmt;
use std::sync::Arc;

use persistable::carrier::Union2;
use persistable::{List, Map, Set, Text, Vector};

struct Node<T> {
    value: T,
    tail: Arc<CustomList<T>>,
}

/// A list built directly on the carrier: empty is alternative 0, a cons
/// cell is alternative 1.
type CustomList<T> = Union2<(), Node<T>>;

fn custom_empty<T>() -> CustomList<T> {
    CustomList::new_a(())
}

fn custom_cons<T>(value: T, tail: CustomList<T>) -> CustomList<T> {
    CustomList::new_b(Node { value, tail: Arc::new(tail) })
}

fn custom_to_vec<T: Clone>(xs: &CustomList<T>) -> Vec<T> {
    let mut out = Vec::new();
    let mut cur = xs;
    while cur.tag() != 0 {
        let node = cur.as_b();
        out.push(node.value.clone());
        cur = node.tail.as_ref();
    }
    out
}

fn custom_reverse<T: Clone>(xs: &CustomList<T>) -> CustomList<T> {
    let mut out = custom_empty();
    let mut cur = xs;
    while cur.tag() != 0 {
        let node = cur.as_b();
        out = custom_cons(node.value.clone(), out);
        cur = node.tail.as_ref();
    }
    out
}

fn custom_show<T: fmt::Display>(xs: &CustomList<T>) -> String {
    let mut parts = Vec::new();
    let mut cur = xs;
    while cur.tag() != 0 {
        let node = cur.as_b();
        parts.push(format!("{}", node.value));
        cur = node.tail.as_ref();
    }
    format!("[{}]", parts.join(","))
}

#[test]
fn scenario_1_list() {
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
fn scenario_2_string() {
    let mut s = Text::from_cstring("Hello World!\n");
    s = s.append_cstring("ABCDEFGHIJKLMNOP");
    s = s.append_cstring("QRSTUVWXYZ");
    s = s.append_cstring("1234567890\n");
    for c in 'a'..='z' {
        s = s.append_char(c);
    }
    assert_eq!(s.len_chars(), 76);
    assert_eq!(s.lookup(3), 'l');

    let (left, right) = s.split(27);
    assert_eq!(left.append_string(&right), s);

    assert_eq!(s.between(13, 39).to_string(), "ABCDEFGHIJKLMNOPQRSTUVWXYZ");
}

#[test]
fn scenario_3_vector() {
    let mut v = Vector::empty();
    for i in 0..300 {
        v = v.push_back(i);
    }
    assert_eq!(v.len(), 300);
    assert_eq!(v.at(100), 100);
    let sum = v.fold_l(0i64, |acc, x| acc + *x);
    assert_eq!(sum, 150 * 299);

    let inserted = v.insert(10, &v);
    assert_eq!(inserted.len(), 2 * v.len());
    assert_eq!(inserted.between(10, 10 + v.len()).to_vec(), v.to_vec());
}

#[test]
fn scenario_4_map() {
    let m: Map<i32, i32> = (0..200).map(|i| (i, 2 * i)).collect();
    assert_eq!(m.size(), 200);
    assert_eq!(m.find(&25).map(|(_, v)| *v), Some(50));
    assert!(m.find(&203).is_none());
    let (less, greater) = m.split(&123);
    assert_eq!(less.merge(&greater), m.erase(&123));
    let key_sum = m.fold_l(0i64, |acc, k, _| acc + *k as i64);
    assert_eq!(key_sum, 199 * 100);
}

#[test]
fn scenario_5_set() {
    let s: Set<i32> = Set::from_list((0..100).map(|i| 2 * i));
    assert!(s.contains(&64));
    assert!(!s.contains(&63));
    assert_eq!(s.intersect(&s.insert(67)), s);
    assert_eq!(s.diff(&s.erase(&22)).to_list(), vec![22]);
}

#[test]
fn scenario_6_union_backed_list() {
    let mut xs = custom_empty::<i32>();
    for i in 0..10 {
        xs = custom_cons(i, xs);
    }
    assert_eq!(custom_show(&xs), "[9,8,7,6,5,4,3,2,1,0]");
    assert_eq!(custom_show(&custom_reverse(&xs)), "[0,1,2,3,4,5,6,7,8,9]");
    assert_eq!(xs.tag(), 1);
    assert_eq!(custom_to_vec(&xs), (0..10).rev().collect::<Vec<_>>());
}
