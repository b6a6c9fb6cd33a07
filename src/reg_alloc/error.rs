use thiserror::Error;

use super::interference_graph::Range;

/// Why two variables cannot be coalesced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CoalesceBlocker {
    #[error("a variable cannot be coalesced with itself")]
    SameVariable,

    #[error("the variables interfere")]
    Interfere,

    #[error("merged node would have {combined} neighbors in a graph of {total} variables")]
    DegreeTooHigh { combined: usize, total: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegAllocError {
    #[error("unknown variable `{0}`")]
    UnknownVariable(String),

    #[error("variable `{0}` already exists")]
    DuplicateVariable(String),

    #[error("invalid live range [{start}, {end}] for `{name}`")]
    InvalidRange { name: String, start: i64, end: i64 },

    #[error("split point {point} is not strictly inside {range} of `{name}`")]
    InvalidSplitPoint {
        name: String,
        point: i64,
        range: Range,
    },

    #[error("cannot coalesce `{a}` and `{b}`: {reason}")]
    IneligibleCoalesce {
        a: String,
        b: String,
        reason: CoalesceBlocker,
    },

    #[error("register count must be positive")]
    InvalidRegisterCount,

    #[error("no valid coloring after {attempts} attempts, every variable spilled")]
    AllocationExhausted { attempts: usize },
}

pub type RegAllocResult<T> = Result<T, RegAllocError>;
