//! Domain layer: checkout entities, their state machine, and the ports the
//! application layer talks to.

pub mod intent;
pub mod money;
pub mod order;
pub mod ports;
pub mod session;
