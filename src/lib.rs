//! Library facade - re-export internal modules so integration
//! tests or external code can use `netprobe::...`.

pub mod cli;
pub mod echo;
pub mod engine;
pub mod error;
pub mod formatter;
pub mod resolve;
pub mod stats;
pub mod trace;
