use super::{
    error::RegAllocResult,
    interference_graph::{InterferenceGraph, Var},
};

/// Takes variables out of the coloring problem.
///
/// A spilled variable keeps its slot in the graph, but loses all its edges
/// and its register, so later coloring attempts ignore it.
pub struct SpillHandler;

impl SpillHandler {
    /// Spill variables by name.
    ///
    /// All names are resolved before anything is modified, so an unknown name
    /// leaves the graph untouched. Returns the number of removed edges.
    pub fn handle_spills<'a, I>(graph: &mut InterferenceGraph, names: I) -> RegAllocResult<usize>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let vars = names
            .into_iter()
            .map(|name| graph.require(name))
            .collect::<RegAllocResult<Vec<_>>>()?;
        Ok(Self::spill_vars(graph, &vars))
    }

    /// Spill variables by handle, skipping handles not in the graph.
    pub fn spill_vars(graph: &mut InterferenceGraph, vars: &[Var]) -> usize {
        let mut removed = 0;
        for &var in vars {
            let Some(data) = graph.slot_mut(var) else {
                continue;
            };
            data.spilled = true;
            data.register = None;
            removed += graph.isolate(var);
            log::debug!("spilled {}", graph.name(var).unwrap_or("?"));
        }
        removed
    }
}
