pub mod engine;
pub mod slot;
pub mod worker;

pub use engine::{Miner, Solution};
pub use slot::{Claim, SlotError, WinnerSlot};

const LOG_TARGET: &str = "pow_chain::mining";
