#![allow(dead_code)]

use std::collections::BTreeMap;

use orzra::reg_alloc::{Assignment, Coloring, InterferenceGraph};

/// Baseline allocator: the first `registers` variables in input order get
/// registers `0..registers`, the rest are spilled. Interference is ignored.
pub fn naive_allocate(
    live_ranges: &[(String, i64, i64)],
    registers: usize,
) -> BTreeMap<String, Assignment> {
    live_ranges
        .iter()
        .enumerate()
        .map(|(i, (name, _, _))| {
            let assignment = if i < registers {
                Assignment::Assigned(i)
            } else {
                Assignment::Spilled
            };
            (name.clone(), assignment)
        })
        .collect()
}

/// Name the ranges `v0`, `v1`, ...
pub fn named(ranges: &[(i64, i64)]) -> Vec<(String, i64, i64)> {
    ranges
        .iter()
        .enumerate()
        .map(|(i, &(start, end))| (format!("v{}", i), start, end))
        .collect()
}

/// Panic if two interfering variables share a color.
pub fn assert_valid_coloring(graph: &InterferenceGraph, coloring: &Coloring) {
    for var in graph.vars() {
        for other in graph.neighbors(var) {
            if let (Some(a), Some(b)) = (coloring.color(var), coloring.color(other)) {
                assert_ne!(
                    a,
                    b,
                    "{:?} and {:?} interfere but share color {}",
                    graph.name(var),
                    graph.name(other),
                    a
                );
            }
        }
    }
}

/// Panic if the interference relation is not symmetric.
pub fn assert_symmetric(graph: &InterferenceGraph) {
    assert!(graph.check_invariants());
    for var in graph.vars() {
        for other in graph.neighbors(var) {
            assert!(
                graph.neighbors(other).any(|back| back == var),
                "{:?} lists {:?} but not the other way around",
                graph.name(var),
                graph.name(other)
            );
        }
    }
}
