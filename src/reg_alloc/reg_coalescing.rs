use rustc_hash::FxHashSet;

use super::{
    error::{CoalesceBlocker, RegAllocError, RegAllocResult},
    interference_graph::{InterferenceGraph, Var},
};

/// Merges non-interfering variables so that they end up in one register.
///
/// Coalescing changes the graph the coloring works on, so it has to run
/// before allocation starts.
pub struct RegisterCoalescing;

impl RegisterCoalescing {
    /// Check whether `b` can be merged into `a`.
    pub fn can_coalesce(graph: &InterferenceGraph, a: &str, b: &str) -> RegAllocResult<()> {
        Self::eligible(graph, a, b).map(|_| ())
    }

    fn eligible(graph: &InterferenceGraph, a: &str, b: &str) -> RegAllocResult<(Var, Var)> {
        let var_a = graph.require(a)?;
        let var_b = graph.require(b)?;
        match Self::blocker(graph, var_a, var_b) {
            Some(reason) => Err(RegAllocError::IneligibleCoalesce {
                a: a.to_string(),
                b: b.to_string(),
                reason,
            }),
            None => Ok((var_a, var_b)),
        }
    }

    fn blocker(graph: &InterferenceGraph, a: Var, b: Var) -> Option<CoalesceBlocker> {
        if a == b {
            return Some(CoalesceBlocker::SameVariable);
        }
        if graph.interferes(a, b) {
            return Some(CoalesceBlocker::Interfere);
        }
        let combined = graph
            .neighbors(a)
            .chain(graph.neighbors(b))
            .collect::<FxHashSet<_>>()
            .len();
        let total = graph.len();
        if combined >= total {
            return Some(CoalesceBlocker::DegreeTooHigh { combined, total });
        }
        None
    }

    /// Merge `b` into `a`.
    ///
    /// `a` takes the union of both ranges and every interference of `b`, then
    /// `b` is removed. The name `b` keeps resolving to `a` through
    /// [InterferenceGraph::resolve_alias]. On error nothing is changed.
    pub fn coalesce(graph: &mut InterferenceGraph, a: &str, b: &str) -> RegAllocResult<()> {
        let (var_a, var_b) = Self::eligible(graph, a, b)?;

        let (Some(data_a), Some(data_b)) = (graph.variable(var_a), graph.variable(var_b)) else {
            return Err(RegAllocError::UnknownVariable(b.to_string()));
        };
        let merged = data_a.range().union(&data_b.range());
        let absorbed = graph.neighbors(var_b).collect::<Vec<_>>();

        graph.record_alias(var_b, b.to_string(), var_a);
        graph.remove_variable(var_b);
        if let Some(data) = graph.slot_mut(var_a) {
            data.range = merged;
        }
        for other in absorbed {
            graph.add_edge(var_a, other);
        }

        log::debug!("coalesced {} into {}, range {}", b, a, merged);
        Ok(())
    }

    /// Apply a batch of coalescing requests in order.
    ///
    /// Names are resolved through earlier merges, so `(a, b), (b, c)` merges
    /// both `b` and `c` into `a`. Ineligible pairs are skipped. Returns the
    /// number of merges performed.
    pub fn coalesce_all<S>(graph: &mut InterferenceGraph, pairs: &[(S, S)]) -> usize
    where
        S: AsRef<str>,
    {
        let mut merged = 0;
        for (a, b) in pairs {
            let (a, b): (&str, &str) = (a.as_ref(), b.as_ref());
            let (Some(var_a), Some(var_b)) = (graph.resolve_alias(a), graph.resolve_alias(b))
            else {
                log::debug!("skip coalescing {} and {}: unknown variable", a, b);
                continue;
            };
            if var_a == var_b {
                continue;
            }
            let (Some(name_a), Some(name_b)) = (graph.name(var_a), graph.name(var_b)) else {
                continue;
            };
            let (name_a, name_b) = (name_a.to_string(), name_b.to_string());
            match Self::coalesce(graph, &name_a, &name_b) {
                Ok(()) => merged += 1,
                Err(err) => log::debug!("skip coalescing: {}", err),
            }
        }
        merged
    }
}
