//! The coffee machine controller and its domain types.

mod brew;
mod controller;
mod id;
mod job;
mod state;

pub use brew::{FixedBrewTime, MAX_BREW_SECONDS, MIN_BREW_SECONDS, RandomBrewTime};
pub use controller::Machine;
pub use job::{Job, Product};
pub use state::MachineState;
