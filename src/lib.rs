#![forbid(unsafe_code)]
#![warn(clippy::wildcard_enum_match_arm)]

pub mod reg_alloc;
