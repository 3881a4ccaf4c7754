// Allow some clippy lints shared with the harness crates
#![allow(clippy::module_inception)]
#![allow(clippy::upper_case_acronyms)]

pub mod api;
pub mod config;
pub mod crypto;
pub mod transaction;
pub mod utils;
