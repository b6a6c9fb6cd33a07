use super::{
    error::{RegAllocError, RegAllocResult},
    interference_graph::{InterferenceGraph, Range, Var},
};

/// Splits a live range in two at a program point.
pub struct LiveRangeSplitting;

impl LiveRangeSplitting {
    /// Name of the variable created by splitting `name` at `point`.
    pub fn split_name(name: &str, point: i64) -> String { format!("{}_split_{}", name, point) }

    /// Split `name` at `point`.
    ///
    /// The original variable keeps `[start, point]` and a new variable
    /// `{name}_split_{point}` takes `[point, end]`. The new variable interferes
    /// with those neighbors of the original whose range still overlaps
    /// `[point, end]`. The original's edges are kept as they are.
    pub fn split_range(
        graph: &mut InterferenceGraph,
        name: &str,
        point: i64,
    ) -> RegAllocResult<Var> {
        let var = graph.require(name)?;
        let Some(data) = graph.variable(var) else {
            return Err(RegAllocError::UnknownVariable(name.to_string()));
        };
        let range = data.range();
        if !range.contains_strictly(point) {
            return Err(RegAllocError::InvalidSplitPoint {
                name: name.to_string(),
                point,
                range,
            });
        }

        let tail = Range::new(point, range.end);
        let overlapping = graph
            .neighbors(var)
            .filter(|&other| {
                graph
                    .variable(other)
                    .is_some_and(|data| data.range().overlaps(&tail))
            })
            .collect::<Vec<_>>();

        let new_var = graph.add_variable(Self::split_name(name, point), tail.start, tail.end)?;
        if let Some(data) = graph.slot_mut(var) {
            data.range.end = point;
        }
        for other in overlapping {
            graph.add_edge(new_var, other);
        }

        log::debug!(
            "split {} at {}: {} and {}",
            name,
            point,
            Range::new(range.start, point),
            tail
        );
        Ok(new_var)
    }
}
