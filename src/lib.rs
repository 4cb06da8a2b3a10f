//! An in-memory job intake and dispatch engine.
//!
//! Producers submit jobs, consumers claim them, perform the work elsewhere,
//! and report back. Time-critical jobs are always handed out before ordinary
//! ones; see [`queue::PriorityQueue`].
pub mod config;
pub mod error;
pub mod line_reader;
pub mod parser;
pub mod queue;
pub mod server;
pub mod util;

pub mod types {
    pub mod job;
    pub mod protocol;
    pub mod serialisable;
    pub mod states;
}
