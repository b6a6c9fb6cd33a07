//! # Graph Coloring Register Allocation
//!
//! This module implements a Chaitin-style graph coloring register allocator
//! over abstract live ranges.
//!
//! - `interference_graph`: Variables, live ranges and the interference graph.
//! - `graph_coloring`: Simplify/select coloring with highest-degree spilling.
//! - `spill_handler`: Takes spilled variables out of the coloring problem.
//! - `reg_coalescing`: Merges non-interfering variables.
//! - `live_range_splitting`: Splits a live range at a program point.
//! - `allocator`: Drives color, spill and retry to a total allocation.

pub mod allocator;
pub mod error;
pub mod graph_coloring;
pub mod interference_graph;
pub mod live_range_splitting;
pub mod reg_coalescing;
pub mod spill_handler;

pub use allocator::{
    allocate,
    AllocConfig,
    AllocState,
    Allocation,
    Assignment,
    RegisterAllocator,
    DEFAULT_MAX_ATTEMPTS,
};
pub use error::{CoalesceBlocker, RegAllocError, RegAllocResult};
pub use graph_coloring::{Coloring, ColoringStrategy, GraphColoring};
pub use interference_graph::{InterferenceGraph, Range, Var, Variable};
pub use live_range_splitting::LiveRangeSplitting;
pub use reg_coalescing::RegisterCoalescing;
pub use spill_handler::SpillHandler;
