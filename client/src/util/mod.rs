//! Utility helpers shared across client modules.
//!
//! SYSTEM CONTEXT
//! ==============
//! Pure helpers with no I/O of their own beyond `images::load_attachment`:
//! form validation, route guards, and image reference handling.

pub mod guard;
pub mod images;
pub mod validation;
