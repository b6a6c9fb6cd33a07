use std::fmt::{self, Display};

use rustc_hash::{FxHashMap, FxHashSet};

use super::error::{RegAllocError, RegAllocResult};

/// Closed range of program points
/// [start, end]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    pub start: i64,
    pub end: i64,
}

impl Range {
    pub fn new(start: i64, end: i64) -> Self { Self { start, end } }

    /// Check if two ranges overlap. Touching endpoints overlap, so `[0, 10]`
    /// and `[10, 20]` interfere.
    pub fn overlaps(&self, other: &Range) -> bool {
        !(self.end < other.start || other.end < self.start)
    }

    /// Check if `point` lies inside the range and is not one of its endpoints.
    pub fn contains_strictly(&self, point: i64) -> bool { self.start < point && point < self.end }

    /// The smallest range covering both.
    pub fn union(&self, other: &Range) -> Range {
        Range::new(self.start.min(other.start), self.end.max(other.end))
    }

    pub fn length(&self) -> i64 { self.end - self.start }
}

impl Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Handle of a variable in the [InterferenceGraph].
///
/// Handles are never reused, a removed variable leaves a vacant slot behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(u32);

impl Var {
    pub fn index(self) -> usize { self.0 as usize }
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub(super) name: String,
    pub(super) range: Range,
    pub(super) spilled: bool,
    pub(super) register: Option<usize>,
    pub(super) interferences: FxHashSet<Var>,
}

impl Variable {
    fn new(name: String, range: Range) -> Self {
        Self {
            name,
            range,
            spilled: false,
            register: None,
            interferences: FxHashSet::default(),
        }
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn range(&self) -> Range { self.range }

    pub fn is_spilled(&self) -> bool { self.spilled }

    pub fn register(&self) -> Option<usize> { self.register }

    pub fn interferences(&self) -> &FxHashSet<Var> { &self.interferences }
}

/// The interference graph.
///
/// Variables live in an arena indexed by [Var]. Every edge is stored twice:
/// once in the edge relation in both orientations, and once in the
/// interference set of each endpoint. All mutations keep the two in sync.
#[derive(Debug, Clone, Default)]
pub struct InterferenceGraph {
    vars: Vec<Option<Variable>>,
    names: FxHashMap<String, Var>,
    edges: FxHashSet<(Var, Var)>,
    /// Names removed by coalescing, mapped to the variable that absorbed them.
    aliases: FxHashMap<String, Var>,
}

impl InterferenceGraph {
    pub fn new() -> Self { Self::default() }

    /// Build the graph from `(name, start, end)` triples.
    ///
    /// All variables are added before any interference is computed. An
    /// invalid triple rejects the whole input.
    pub fn build_from_live_ranges<S>(live_ranges: &[(S, i64, i64)]) -> RegAllocResult<Self>
    where
        S: AsRef<str>,
    {
        let mut graph = Self::new();
        let mut added = Vec::with_capacity(live_ranges.len());
        for (name, start, end) in live_ranges {
            let var = graph.add_variable(name.as_ref(), *start, *end)?;
            added.push((var, Range::new(*start, *end)));
        }

        for i in 0..added.len() {
            let (var, range) = added[i];
            for (other, other_range) in added.iter().skip(i + 1) {
                if range.overlaps(other_range) {
                    graph.add_edge(var, *other);
                }
            }
        }

        log::debug!(
            "built interference graph: {} variables, {} edges",
            graph.len(),
            graph.edge_count()
        );

        Ok(graph)
    }

    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        start: i64,
        end: i64,
    ) -> RegAllocResult<Var> {
        let name = name.into();
        if start > end {
            return Err(RegAllocError::InvalidRange { name, start, end });
        }
        if self.names.contains_key(&name) || self.aliases.contains_key(&name) {
            return Err(RegAllocError::DuplicateVariable(name));
        }

        let var = Var(self.vars.len() as u32);
        self.names.insert(name.clone(), var);
        self.vars.push(Some(Variable::new(name, Range::new(start, end))));
        Ok(var)
    }

    /// Add an interference between two named variables.
    ///
    /// Returns `Ok(false)` if the edge already exists or both names are the
    /// same variable.
    pub fn add_interference(&mut self, a: &str, b: &str) -> RegAllocResult<bool> {
        let a = self.require(a)?;
        let b = self.require(b)?;
        Ok(self.add_edge(a, b))
    }

    pub fn add_edge(&mut self, a: Var, b: Var) -> bool {
        if a == b
            || !self.contains_var(a)
            || !self.contains_var(b)
            || self.edges.contains(&(a, b))
        {
            return false;
        }
        self.edges.insert((a, b));
        self.edges.insert((b, a));
        if let Some(data) = self.slot_mut(a) {
            data.interferences.insert(b);
        }
        if let Some(data) = self.slot_mut(b) {
            data.interferences.insert(a);
        }
        true
    }

    pub fn remove_edge(&mut self, a: Var, b: Var) -> bool {
        if !self.edges.remove(&(a, b)) {
            return false;
        }
        self.edges.remove(&(b, a));
        if let Some(data) = self.slot_mut(a) {
            data.interferences.remove(&b);
        }
        if let Some(data) = self.slot_mut(b) {
            data.interferences.remove(&a);
        }
        true
    }

    /// Remove every edge incident to `var`, returning how many were removed.
    pub fn isolate(&mut self, var: Var) -> usize {
        let neighbors = self.neighbors(var).collect::<Vec<_>>();
        neighbors
            .into_iter()
            .filter(|&other| self.remove_edge(var, other))
            .count()
    }

    /// Remove a variable together with all its edges.
    pub fn remove_variable(&mut self, var: Var) -> Option<Variable> {
        if !self.contains_var(var) {
            return None;
        }
        self.isolate(var);
        let data = self.vars.get_mut(var.index())?.take()?;
        self.names.remove(&data.name);
        self.aliases.retain(|_, target| *target != var);
        Some(data)
    }

    /// Record that `merged` was absorbed into `into`.
    ///
    /// Aliases previously pointing at `merged` are redirected as well.
    pub(super) fn record_alias(&mut self, merged: Var, merged_name: String, into: Var) {
        for target in self.aliases.values_mut() {
            if *target == merged {
                *target = into;
            }
        }
        self.aliases.insert(merged_name, into);
    }

    pub fn lookup(&self, name: &str) -> Option<Var> { self.names.get(name).copied() }

    /// Look up a name, following coalescing aliases.
    pub fn resolve_alias(&self, name: &str) -> Option<Var> {
        self.lookup(name).or_else(|| self.aliases.get(name).copied())
    }

    pub fn aliases(&self) -> impl Iterator<Item = (&str, Var)> + '_ {
        self.aliases.iter().map(|(name, var)| (name.as_str(), *var))
    }

    pub(super) fn require(&self, name: &str) -> RegAllocResult<Var> {
        self.lookup(name)
            .ok_or_else(|| RegAllocError::UnknownVariable(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool { self.names.contains_key(name) }

    pub fn contains_var(&self, var: Var) -> bool { self.variable(var).is_some() }

    pub fn variable(&self, var: Var) -> Option<&Variable> {
        self.vars.get(var.index()).and_then(Option::as_ref)
    }

    pub(super) fn slot_mut(&mut self, var: Var) -> Option<&mut Variable> {
        self.vars.get_mut(var.index()).and_then(Option::as_mut)
    }

    pub fn name(&self, var: Var) -> Option<&str> { self.variable(var).map(Variable::name) }

    pub fn len(&self) -> usize { self.names.len() }

    pub fn is_empty(&self) -> bool { self.names.is_empty() }

    pub fn edge_count(&self) -> usize { self.edges.len() / 2 }

    /// All live variables in creation order.
    pub fn vars(&self) -> impl Iterator<Item = Var> + '_ {
        self.vars
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(index, _)| Var(index as u32))
    }

    /// All live variables sorted by name.
    pub fn vars_by_name(&self) -> Vec<Var> {
        let mut named = self.names.iter().collect::<Vec<_>>();
        named.sort_unstable_by(|a, b| a.0.cmp(b.0));
        named.into_iter().map(|(_, var)| *var).collect()
    }

    pub fn neighbors(&self, var: Var) -> impl Iterator<Item = Var> + '_ {
        self.variable(var)
            .into_iter()
            .flat_map(|data| data.interferences.iter().copied())
    }

    pub fn degree(&self, var: Var) -> usize {
        self.variable(var)
            .map(|data| data.interferences.len())
            .unwrap_or(0)
    }

    pub fn interferes(&self, a: Var, b: Var) -> bool { self.edges.contains(&(a, b)) }

    /// Check that the edge relation and the interference sets agree.
    pub fn check_invariants(&self) -> bool {
        let edges_ok = self.edges.iter().all(|&(a, b)| {
            a != b
                && self.edges.contains(&(b, a))
                && self
                    .variable(a)
                    .is_some_and(|data| data.interferences.contains(&b))
        });
        let sets_ok = self.vars().all(|var| {
            self.neighbors(var)
                .all(|other| self.edges.contains(&(var, other)))
        });
        let names_ok = self
            .names
            .iter()
            .all(|(name, var)| self.name(*var) == Some(name.as_str()));
        edges_ok && sets_ok && names_ok
    }

    pub fn to_mermaid(&self) -> String {
        let mut s = String::new();
        s.push_str("graph LR;\n");
        for var in self.vars_by_name() {
            let name = self.name(var).unwrap_or_default();
            let mut others = self
                .neighbors(var)
                .filter_map(|other| self.name(other))
                .filter(|other| *other > name)
                .collect::<Vec<_>>();
            if others.is_empty() && self.degree(var) == 0 {
                s.push_str(&format!("{};\n", name));
            }
            others.sort_unstable();
            for other in others {
                s.push_str(&format!("{} --- {};\n", name, other));
            }
        }
        s
    }
}
