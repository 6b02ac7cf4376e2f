//! Application layer: the reconciliation workflow built on the domain ports.
//!
//! `intents` opens purchases and gateway sessions, `verifier` consumes signed
//! gateway claims, `ledger` is the only writer of orders and terminal intent
//! states, and `correlator` serves the delivery tracker's read path.
//! `sweeper` fails sessions whose callback never arrived; `checkout` drives
//! the client side of a purchase end to end.

pub mod checkout;
pub mod correlator;
pub mod intents;
pub mod ledger;
pub mod sweeper;
pub mod verifier;
