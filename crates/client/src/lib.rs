//! Conversation orchestration for the three-capability chat app.
//!
//! Ties the per-surface conversation state machine, the history windowing
//! policy, the credential store and the backend client together behind a
//! single controller. Rendering, routing and styling live elsewhere.

pub mod controller;
pub mod conversation;
pub mod history;
pub mod preferences;
pub mod store_fs;
