//! Chaitin-style graph coloring.
//!
//! The simplify phase removes nodes with fewer than `k` remaining neighbors
//! and pushes them on a stack. When every remaining node has at least `k`
//! neighbors, the node with the highest degree is taken out as a spill
//! candidate instead. The select phase then pops the stack and gives each
//! node the smallest color not used by its already colored neighbors.

use rustc_hash::{FxHashMap, FxHashSet};

use super::interference_graph::{InterferenceGraph, Var};

/// Output of one coloring attempt.
#[derive(Debug, Clone, Default)]
pub struct Coloring {
    /// Whether every node popped in the select phase received a color.
    pub success: bool,
    /// Colors in `[0, k)`, only for variables that were colored.
    pub colors: FxHashMap<Var, usize>,
    /// Nodes picked during simplify because the graph was saturated, in the
    /// order they were picked. Present even on success.
    pub spill_candidates: Vec<Var>,
}

impl Coloring {
    pub fn color(&self, var: Var) -> Option<usize> { self.colors.get(&var).copied() }

    /// Spill candidates that did not receive a color, i.e. the real spills.
    pub fn uncolored_candidates(&self) -> Vec<Var> {
        self.spill_candidates
            .iter()
            .copied()
            .filter(|var| !self.colors.contains_key(var))
            .collect()
    }
}

/// Something that can color an interference graph with a fixed number of
/// registers.
pub trait ColoringStrategy {
    /// The number of available colors.
    fn registers(&self) -> usize;

    /// Run one coloring attempt on the graph. The graph is not modified.
    fn color(&mut self, graph: &InterferenceGraph) -> Coloring;
}

#[derive(Debug, Clone, Copy)]
pub struct GraphColoring {
    registers: usize,
}

impl GraphColoring {
    pub fn new(registers: usize) -> Self { Self { registers } }

    /// Simplify phase. Returns the select stack and the spill candidates.
    ///
    /// Nodes are visited in name order, so among simplifiable nodes the one
    /// with the lowest name goes first, and among equally saturated nodes
    /// the one with the lowest name is spilled.
    fn simplify(&self, graph: &InterferenceGraph) -> (Vec<Var>, Vec<Var>) {
        let k = self.registers;
        let order = graph
            .vars_by_name()
            .into_iter()
            .filter(|&var| graph.variable(var).is_some_and(|data| !data.is_spilled()))
            .collect::<Vec<_>>();

        let mut remaining = order.iter().copied().collect::<FxHashSet<_>>();
        let mut degrees = order
            .iter()
            .map(|&var| {
                let degree = graph
                    .neighbors(var)
                    .filter(|other| remaining.contains(other))
                    .count();
                (var, degree)
            })
            .collect::<FxHashMap<_, _>>();

        let mut stack = Vec::with_capacity(order.len());
        let mut spill_candidates = Vec::new();

        while !remaining.is_empty() {
            let simplifiable = order
                .iter()
                .copied()
                .find(|var| remaining.contains(var) && degrees[var] < k);

            let node = if let Some(var) = simplifiable {
                log::trace!("simplify: push {:?} (degree {})", var, degrees[&var]);
                stack.push(var);
                var
            } else {
                let mut spill: Option<(Var, usize)> = None;
                for &var in order.iter().filter(|var| remaining.contains(*var)) {
                    let degree = degrees[&var];
                    if spill.map_or(true, |(_, max_degree)| degree > max_degree) {
                        spill = Some((var, degree));
                    }
                }
                let Some((var, degree)) = spill else {
                    break;
                };
                log::trace!("simplify: spill candidate {:?} (degree {})", var, degree);
                spill_candidates.push(var);
                var
            };

            remaining.remove(&node);
            for neighbor in graph.neighbors(node) {
                if remaining.contains(&neighbor) {
                    if let Some(degree) = degrees.get_mut(&neighbor) {
                        *degree -= 1;
                    }
                }
            }
        }

        (stack, spill_candidates)
    }
}

impl ColoringStrategy for GraphColoring {
    fn registers(&self) -> usize { self.registers }

    fn color(&mut self, graph: &InterferenceGraph) -> Coloring {
        let (mut stack, spill_candidates) = self.simplify(graph);

        let mut colors = FxHashMap::default();
        let mut success = true;
        while let Some(node) = stack.pop() {
            let used = graph
                .neighbors(node)
                .filter_map(|other| colors.get(&other).copied())
                .collect::<FxHashSet<usize>>();

            if let Some(color) = (0..self.registers).find(|color| !used.contains(color)) {
                log::trace!("select: {:?} -> {}", node, color);
                colors.insert(node, color);
            } else {
                log::trace!("select: no color left for {:?}", node);
                success = false;
                break;
            }
        }

        Coloring {
            success,
            colors,
            spill_candidates,
        }
    }
}
