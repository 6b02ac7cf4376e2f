//! REST surface for the checkout client, the gateway callback relay and the
//! delivery tracker.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::create_router;
pub use state::AppState;
