pub mod agent;
pub mod collectors;
pub mod config;
pub mod daemon;
pub mod logging;
pub mod payload;
pub mod sched;
pub mod sink;
