pub mod config;
pub mod logging;

pub mod args;
pub mod artifacts;
pub mod broadcast;
pub mod error;
pub mod job;
pub mod parser;
pub mod process;
pub mod scheduler;
