mod driver;
mod engine;

pub(crate) use driver::wait_for;
pub use driver::{spawn, spawn_with_remaining, TimerCommand, TimerHandle};
pub use engine::{validate_duration, CountdownEngine, TimerPhase, TimerSnapshot, TICK};
