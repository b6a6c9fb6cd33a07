//! The allocation driver.
//!
//! [RegisterAllocator] is a small state machine:
//!
//! ```text
//!            success
//! Coloring ----------> Done
//!   |   ^
//!   |   | spill candidates removed
//!   v   |
//! Spilling
//!
//! Coloring with the attempt budget used up ----> Failed (everything spilled)
//! ```
//!
//! Running out of attempts is not an error: the result is still total, with
//! every variable spilled.

use std::{collections::BTreeMap, fmt, mem};

use super::{
    error::{RegAllocError, RegAllocResult},
    graph_coloring::{ColoringStrategy, GraphColoring},
    interference_graph::{InterferenceGraph, Var},
    spill_handler::SpillHandler,
};

/// Number of coloring attempts before giving up.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocConfig {
    registers: usize,
    max_attempts: usize,
}

impl AllocConfig {
    pub fn new(registers: usize) -> RegAllocResult<Self> {
        if registers == 0 {
            return Err(RegAllocError::InvalidRegisterCount);
        }
        Ok(Self {
            registers,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        })
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn registers(&self) -> usize { self.registers }

    pub fn max_attempts(&self) -> usize { self.max_attempts }
}

/// Final location of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Assignment {
    Assigned(usize),
    Spilled,
}

impl Assignment {
    pub fn register(self) -> Option<usize> {
        match self {
            Assignment::Assigned(register) => Some(register),
            Assignment::Spilled => None,
        }
    }

    pub fn is_spilled(self) -> bool { matches!(self, Assignment::Spilled) }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Assignment::Assigned(register) => write!(f, "{}", register),
            Assignment::Spilled => write!(f, "spilled"),
        }
    }
}

/// Total mapping from variable names to their assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allocation {
    assignments: BTreeMap<String, Assignment>,
    attempts: usize,
    exhausted: bool,
}

impl Allocation {
    pub fn get(&self, name: &str) -> Option<Assignment> { self.assignments.get(name).copied() }

    /// Assignments sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Assignment)> + '_ {
        self.assignments
            .iter()
            .map(|(name, assignment)| (name.as_str(), *assignment))
    }

    pub fn as_map(&self) -> &BTreeMap<String, Assignment> { &self.assignments }

    pub fn len(&self) -> usize { self.assignments.len() }

    pub fn is_empty(&self) -> bool { self.assignments.is_empty() }

    /// Spilled names, sorted.
    pub fn spilled(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, assignment)| assignment.is_spilled())
            .map(|(name, _)| name)
            .collect()
    }

    pub fn spill_count(&self) -> usize { self.spilled().len() }

    /// Names grouped by register, `registers` groups, each sorted.
    pub fn by_register(&self, registers: usize) -> Vec<Vec<&str>> {
        let mut groups = vec![Vec::new(); registers];
        for (name, assignment) in self.iter() {
            if let Assignment::Assigned(register) = assignment {
                if let Some(group) = groups.get_mut(register) {
                    group.push(name);
                }
            }
        }
        groups
    }

    /// Number of coloring attempts it took.
    pub fn attempts(&self) -> usize { self.attempts }

    /// Whether the attempt budget ran out and everything was spilled.
    pub fn exhausted(&self) -> bool { self.exhausted }

    /// Turn the all-spilled fallback into an error, for callers that prefer
    /// to treat it as one.
    pub fn ensure_allocated(&self) -> RegAllocResult<()> {
        if self.exhausted {
            Err(RegAllocError::AllocationExhausted {
                attempts: self.attempts,
            })
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocState {
    Coloring,
    /// Spill the candidates of the last failed attempt, then color again.
    Spilling(Vec<Var>),
    Done,
    Failed,
}

impl AllocState {
    pub fn is_terminal(&self) -> bool { matches!(self, AllocState::Done | AllocState::Failed) }
}

pub struct RegisterAllocator<C = GraphColoring>
where
    C: ColoringStrategy,
{
    graph: InterferenceGraph,
    strategy: C,
    max_attempts: usize,
    attempts: usize,
    state: AllocState,
}

impl RegisterAllocator<GraphColoring> {
    pub fn new(graph: InterferenceGraph, config: AllocConfig) -> Self {
        Self::with_strategy(
            graph,
            GraphColoring::new(config.registers()),
            config.max_attempts(),
        )
    }
}

impl<C> RegisterAllocator<C>
where
    C: ColoringStrategy,
{
    pub fn with_strategy(graph: InterferenceGraph, strategy: C, max_attempts: usize) -> Self {
        Self {
            graph,
            strategy,
            max_attempts,
            attempts: 0,
            state: AllocState::Coloring,
        }
    }

    pub fn graph(&self) -> &InterferenceGraph { &self.graph }

    pub fn into_graph(self) -> InterferenceGraph { self.graph }

    pub fn state(&self) -> &AllocState { &self.state }

    pub fn attempts(&self) -> usize { self.attempts }

    /// Advance the state machine by one transition. Terminal states stay put.
    pub fn step(&mut self) -> &AllocState {
        self.state = match mem::replace(&mut self.state, AllocState::Coloring) {
            AllocState::Coloring => self.color(),
            AllocState::Spilling(candidates) => {
                let removed = SpillHandler::spill_vars(&mut self.graph, &candidates);
                log::debug!(
                    "spilled {} candidates, {} edges removed",
                    candidates.len(),
                    removed
                );
                AllocState::Coloring
            }
            AllocState::Done => AllocState::Done,
            AllocState::Failed => AllocState::Failed,
        };
        &self.state
    }

    fn color(&mut self) -> AllocState {
        if self.attempts >= self.max_attempts {
            log::warn!(
                "no valid coloring with {} registers after {} attempts, spilling all {} variables",
                self.strategy.registers(),
                self.attempts,
                self.graph.len()
            );
            let everything = self.graph.vars().collect::<Vec<_>>();
            SpillHandler::spill_vars(&mut self.graph, &everything);
            return AllocState::Failed;
        }

        self.attempts += 1;
        let coloring = self.strategy.color(&self.graph);
        if !coloring.success {
            log::debug!(
                "attempt {} failed, {} spill candidates",
                self.attempts,
                coloring.spill_candidates.len()
            );
            return AllocState::Spilling(coloring.spill_candidates);
        }

        let mut uncolored = Vec::new();
        for var in self.graph.vars().collect::<Vec<_>>() {
            if let Some(data) = self.graph.slot_mut(var) {
                data.register = if data.spilled {
                    None
                } else {
                    coloring.color(var)
                };
                if !data.spilled && data.register.is_none() {
                    uncolored.push(var);
                }
            }
        }
        // optimistic candidates that found no color are the real spills
        SpillHandler::spill_vars(&mut self.graph, &uncolored);

        log::debug!(
            "attempt {} succeeded, {} colored, {} spilled",
            self.attempts,
            coloring.colors.len(),
            uncolored.len()
        );
        AllocState::Done
    }

    /// Run until a terminal state is reached and return the allocation.
    pub fn run(&mut self) -> Allocation {
        while !self.state.is_terminal() {
            self.step();
        }
        self.allocation()
    }

    /// The allocation as currently recorded in the graph.
    ///
    /// Coalesced names report the assignment of the variable that absorbed
    /// them.
    pub fn allocation(&self) -> Allocation {
        let assignment_of = |var: Var| match self.graph.variable(var) {
            Some(data) if !data.is_spilled() => data
                .register()
                .map_or(Assignment::Spilled, Assignment::Assigned),
            _ => Assignment::Spilled,
        };

        let mut assignments = BTreeMap::new();
        for var in self.graph.vars() {
            if let Some(name) = self.graph.name(var) {
                assignments.insert(name.to_string(), assignment_of(var));
            }
        }
        for (name, var) in self.graph.aliases() {
            assignments.insert(name.to_string(), assignment_of(var));
        }

        Allocation {
            assignments,
            attempts: self.attempts,
            exhausted: self.state == AllocState::Failed,
        }
    }
}

/// Allocate `registers` registers to the given `(name, start, end)` live
/// ranges.
pub fn allocate<S>(live_ranges: &[(S, i64, i64)], registers: usize) -> RegAllocResult<Allocation>
where
    S: AsRef<str>,
{
    let config = AllocConfig::new(registers)?;
    let graph = InterferenceGraph::build_from_live_ranges(live_ranges)?;
    Ok(RegisterAllocator::new(graph, config).run())
}
