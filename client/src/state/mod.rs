//! Client-side state controllers.
//!
//! DESIGN
//! ======
//! State is split by concern (`session`, `listing`, `compose`, `profile`) so
//! each surface depends on a small focused model. Controllers publish
//! snapshots; callers never reach into their internals.

pub mod compose;
pub mod criteria;
pub mod listing;
pub mod profile;
pub mod session;
