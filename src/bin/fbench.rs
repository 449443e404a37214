//! Benchmark runner: times a named `<container>-<op>` workload over a
//! range of sizes and prints `<n> <elapsed-ms>` pairs to stdout.
//!
//! Catalogue and CLI shape (`<name> <start> <end> <step>`, one dry run
//! before the timed run, `exit(1)` on an unknown name or unparsable
//! integer) mirror a small C benchmark harness that timed the same
//! container family the same way: one function per `<container>-<op>`
//! name, called in a loop over `start..=end` by `step`.

use std::collections::BTreeMap as StdMap;
use std::time::Instant;

use anyhow::{bail, Context, Result};

use persistable::{List, Map, Set, Vector};

fn usage(program: &str) -> String {
    format!("usage: {program} <name> <start> <end> <step>")
}

fn run(name: &str, n: usize) -> Result<u128> {
    let start = Instant::now();
    match name {
        "vector-build" => {
            let mut v = Vector::empty();
            for i in 0..n {
                v = v.push_back(i as i64);
            }
            assert_eq!(v.len(), n);
        }
        "vector-sum-fold" => {
            let v: Vector<i64> = (0..n as i64).collect();
            let sum = v.fold_l(0i64, |acc, x| acc + *x);
            assert_eq!(sum, expected_sum(n));
        }
        "vector-sum-iter" => {
            let v: Vector<i64> = (0..n as i64).collect();
            let sum: i64 = v.iter().sum();
            assert_eq!(sum, expected_sum(n));
        }
        "list-build" => {
            let mut l = List::empty();
            for i in 0..n {
                l = List::cons(i as i64, l);
            }
            assert_eq!(l.length(), n);
        }
        "list-sum-fold" => {
            let l: List<i64> = (0..n as i64).collect();
            let sum = l.fold_l(0i64, |acc, x| acc + *x);
            assert_eq!(sum, expected_sum(n));
        }
        "list-sum-iter" => {
            let l: List<i64> = (0..n as i64).collect();
            let sum: i64 = l.iter().sum();
            assert_eq!(sum, expected_sum(n));
        }
        "map-build" => {
            let m: Map<i64, i64> = (0..n as i64).map(|i| (i, i)).collect();
            assert_eq!(m.size(), n);
        }
        "set-build" => {
            let s: Set<i64> = Set::from_list(0..n as i64);
            assert_eq!(s.size(), n);
        }
        "std-vector-build" => {
            let mut v = Vec::with_capacity(n);
            for i in 0..n {
                v.push(i as i64);
            }
            assert_eq!(v.len(), n);
        }
        "std-map-build" => {
            let mut m = StdMap::new();
            for i in 0..n as i64 {
                m.insert(i, i);
            }
            assert_eq!(m.len(), n);
        }
        _ => bail!("unknown benchmark \"{name}\""),
    }
    Ok(start.elapsed().as_micros())
}

fn expected_sum(n: usize) -> i64 {
    let n = n as i64;
    (n - 1) * n / 2
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("fbench");
    if args.len() != 5 {
        eprintln!("{}", usage(program));
        std::process::exit(1);
    }
    let name = &args[1];
    let start: usize = args[2].parse().context("bad <start>")?;
    let end: usize = args[3].parse().context("bad <end>")?;
    let step: usize = args[4].parse().context("bad <step>")?;
    if step == 0 {
        bail!("<step> must be non-zero");
    }

    // Dry run: warms allocators/caches before the measured pass, same as
    // the benchmark this mirrors running once against /dev/null first.
    let mut n = start;
    while n <= end {
        run(name, n)?;
        n += step;
    }

    let mut n = start;
    while n <= end {
        let micros = run(name, n)?;
        println!("{n} {micros}");
        n += step;
    }
    Ok(())
}
