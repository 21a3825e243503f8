//! Runtime — stimulus schedule and the fixed-step driver that sequences
//! scheduler, binder and memory once per tick.

pub mod driver;
pub mod scheduler;
