use common::{assert_symmetric, assert_valid_coloring, naive_allocate, named};
use orzra::reg_alloc::{
    allocate,
    AllocConfig,
    Assignment,
    ColoringStrategy,
    GraphColoring,
    InterferenceGraph,
    LiveRangeSplitting,
    Range,
    RegisterAllocator,
    RegisterCoalescing,
    SpillHandler,
    DEFAULT_MAX_ATTEMPTS,
};
use proptest::prelude::*;

mod common;

fn live_ranges() -> impl Strategy<Value = Vec<(String, i64, i64)>> {
    prop::collection::vec((0i64..100, 0i64..30), 0..24).prop_map(|ranges| {
        named(
            &ranges
                .into_iter()
                .map(|(start, len)| (start, start + len))
                .collect::<Vec<_>>(),
        )
    })
}

proptest! {
    #[test]
    fn prop_interference_is_symmetric(ranges in live_ranges()) {
        let graph = InterferenceGraph::build_from_live_ranges(&ranges).unwrap();
        assert_symmetric(&graph);

        for (i, (a, sa, ea)) in ranges.iter().enumerate() {
            for (b, sb, eb) in ranges.iter().skip(i + 1) {
                let (va, vb) = (graph.lookup(a).unwrap(), graph.lookup(b).unwrap());
                let overlap = Range::new(*sa, *ea).overlaps(&Range::new(*sb, *eb));
                prop_assert_eq!(graph.interferes(va, vb), overlap);
            }
        }
    }

    #[test]
    fn prop_coloring_is_valid(ranges in live_ranges(), registers in 1usize..6) {
        let graph = InterferenceGraph::build_from_live_ranges(&ranges).unwrap();
        let coloring = GraphColoring::new(registers).color(&graph);

        assert_valid_coloring(&graph, &coloring);
        prop_assert!(coloring.colors.values().all(|&color| color < registers));
        for var in graph.vars() {
            let colored = coloring.color(var).is_some();
            let candidate = coloring.spill_candidates.contains(&var);
            prop_assert!(colored != candidate || !coloring.success);
        }
    }

    #[test]
    fn prop_allocation_is_total_and_valid(ranges in live_ranges(), registers in 1usize..6) {
        let allocation = allocate(&ranges, registers).unwrap();

        prop_assert_eq!(allocation.len(), ranges.len());
        prop_assert!(allocation.attempts() <= DEFAULT_MAX_ATTEMPTS);
        for (name, _, _) in &ranges {
            prop_assert!(allocation.get(name).is_some());
        }
        for (i, (a, sa, ea)) in ranges.iter().enumerate() {
            for (b, sb, eb) in ranges.iter().skip(i + 1) {
                if !Range::new(*sa, *ea).overlaps(&Range::new(*sb, *eb)) {
                    continue;
                }
                if let (Some(Assignment::Assigned(ra)), Some(Assignment::Assigned(rb))) =
                    (allocation.get(a), allocation.get(b))
                {
                    prop_assert_ne!(ra, rb, "{} and {} overlap", a, b);
                }
            }
        }
    }

    #[test]
    fn prop_spills_no_more_than_baseline(ranges in live_ranges(), registers in 1usize..6) {
        let allocation = allocate(&ranges, registers).unwrap();
        let baseline = naive_allocate(&ranges, registers);
        let baseline_spills = baseline.values().filter(|a| a.is_spilled()).count();

        prop_assert!(allocation.spill_count() <= baseline_spills);
    }

    #[test]
    fn prop_spill_isolates(ranges in live_ranges(), pick in any::<prop::sample::Index>()) {
        prop_assume!(!ranges.is_empty());
        let mut graph = InterferenceGraph::build_from_live_ranges(&ranges).unwrap();
        let name = ranges[pick.index(ranges.len())].0.clone();

        SpillHandler::handle_spills(&mut graph, [name.as_str()]).unwrap();

        let var = graph.lookup(&name).unwrap();
        prop_assert!(graph.variable(var).unwrap().is_spilled());
        prop_assert_eq!(graph.degree(var), 0);
        prop_assert!(graph.vars().all(|other| !graph.neighbors(other).any(|n| n == var)));
        assert_symmetric(&graph);
    }

    #[test]
    fn prop_coalesce_keeps_interferences(
        ranges in live_ranges(),
        first in any::<prop::sample::Index>(),
        second in any::<prop::sample::Index>(),
    ) {
        prop_assume!(ranges.len() >= 2);
        let mut graph = InterferenceGraph::build_from_live_ranges(&ranges).unwrap();
        let a = &ranges[first.index(ranges.len())];
        let b = &ranges[second.index(ranges.len())];
        let (va, vb) = (graph.lookup(&a.0).unwrap(), graph.lookup(&b.0).unwrap());
        let before = graph
            .neighbors(va)
            .chain(graph.neighbors(vb))
            .filter(|&var| var != va && var != vb)
            .collect::<Vec<_>>();

        if RegisterCoalescing::coalesce(&mut graph, &a.0, &b.0).is_ok() {
            prop_assert!(!graph.contains(&b.0));
            let range = graph.variable(va).unwrap().range();
            prop_assert_eq!(range, Range::new(a.1.min(b.1), a.2.max(b.2)));
            for var in before {
                prop_assert!(graph.interferes(va, var));
            }
        } else {
            prop_assert!(graph.contains(&b.0));
        }
        assert_symmetric(&graph);
    }

    #[test]
    fn prop_split_preserves_length(
        ranges in live_ranges(),
        pick in any::<prop::sample::Index>(),
        offset in 0i64..30,
    ) {
        prop_assume!(!ranges.is_empty());
        let mut graph = InterferenceGraph::build_from_live_ranges(&ranges).unwrap();
        let (name, start, end) = &ranges[pick.index(ranges.len())];
        let point = start + offset;

        match LiveRangeSplitting::split_range(&mut graph, name, point) {
            Ok(tail) => {
                let head = graph.variable(graph.lookup(name).unwrap()).unwrap().range();
                let tail = graph.variable(tail).unwrap().range();
                prop_assert_eq!(head, Range::new(*start, point));
                prop_assert_eq!(tail, Range::new(point, *end));
                prop_assert_eq!(head.length() + tail.length(), end - start);
            }
            Err(_) => prop_assert!(point <= *start || point >= *end),
        }
        assert_symmetric(&graph);
    }

    #[test]
    fn prop_passes_then_allocate_is_total(
        ranges in live_ranges(),
        registers in 1usize..4,
        merges in prop::collection::vec(
            (any::<prop::sample::Index>(), any::<prop::sample::Index>()),
            0..4,
        ),
    ) {
        prop_assume!(!ranges.is_empty());
        let mut graph = InterferenceGraph::build_from_live_ranges(&ranges).unwrap();
        let pairs = merges
            .iter()
            .map(|(a, b)| {
                (
                    ranges[a.index(ranges.len())].0.clone(),
                    ranges[b.index(ranges.len())].0.clone(),
                )
            })
            .collect::<Vec<_>>();
        RegisterCoalescing::coalesce_all(&mut graph, &pairs);
        assert_symmetric(&graph);

        let config = AllocConfig::new(registers).unwrap();
        let mut allocator = RegisterAllocator::new(graph, config);
        let allocation = allocator.run();

        prop_assert_eq!(allocation.len(), ranges.len());
        let graph = allocator.graph();
        for var in graph.vars() {
            let data = graph.variable(var).unwrap();
            prop_assert!(data.is_spilled() != data.register().is_some());
            for other in graph.neighbors(var) {
                prop_assert_ne!(data.register(), graph.variable(other).unwrap().register());
            }
        }
    }
}
