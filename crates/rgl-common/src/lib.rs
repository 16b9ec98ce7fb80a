pub mod counters;
pub mod logging;
