//! Route handlers

mod health;
mod intents;
mod orders;
mod verify;

pub use health::*;
pub use intents::*;
pub use orders::*;
pub use verify::*;
