//! Differential tests: random operation sequences replayed against `im`'s
//! matching persistent structures, checked for the same observable content.
//!
//! Uses `im` as a comparison oracle the way it's already used for timing
//! comparisons elsewhere in this crate, here for correctness instead.

use im::{OrdMap, OrdSet, Vector as ImVector};
use proptest::prelude::*;

use persistable::{Map, Set, Vector};

proptest! {
    #[test]
    fn vector_push_back_matches_im(xs: Vec<i32>) {
        let mut ours = Vector::empty();
        let mut theirs = ImVector::new();
        for &x in &xs {
            ours = ours.push_back(x);
            theirs.push_back(x);
        }
        prop_assert_eq!(ours.to_vec(), theirs.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn vector_split_matches_im(xs: Vec<i32>, i in 0usize..200) {
        let ours: Vector<i32> = xs.iter().copied().collect();
        let theirs: ImVector<i32> = xs.iter().copied().collect();
        let i = i.min(ours.len());

        let (ours_l, ours_r) = ours.split(i);
        let mut theirs_l = theirs.clone();
        let theirs_r = theirs_l.split_off(i);

        prop_assert_eq!(ours_l.to_vec(), theirs_l.into_iter().collect::<Vec<_>>());
        prop_assert_eq!(ours_r.to_vec(), theirs_r.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn set_membership_matches_im(xs: Vec<i32>, probe: i32) {
        let ours: Set<i32> = Set::from_list(xs.iter().copied());
        let theirs: OrdSet<i32> = xs.iter().copied().collect();
        prop_assert_eq!(ours.contains(&probe), theirs.contains(&probe));
        prop_assert_eq!(ours.size(), theirs.len());
    }

    #[test]
    fn set_union_matches_im(a: Vec<i32>, b: Vec<i32>) {
        let our_a: Set<i32> = Set::from_list(a.iter().copied());
        let our_b: Set<i32> = Set::from_list(b.iter().copied());
        let their_a: OrdSet<i32> = a.iter().copied().collect();
        let their_b: OrdSet<i32> = b.iter().copied().collect();

        let our_union = our_a.union(&our_b).to_list();
        let their_union: Vec<i32> = their_a.union(their_b).into_iter().collect();
        prop_assert_eq!(our_union, their_union);
    }

    #[test]
    fn map_lookup_matches_im(pairs: Vec<(i32, i32)>, probe: i32) {
        let ours: Map<i32, i32> = pairs.iter().copied().collect();
        let theirs: OrdMap<i32, i32> = pairs.into_iter().collect();
        prop_assert_eq!(ours.size(), theirs.len());
        prop_assert_eq!(ours.find(&probe).map(|(_, v)| *v), theirs.get(&probe).copied());
    }
}
