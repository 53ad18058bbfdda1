//! Core runtime plumbing
//!
//! - [`event`]: machine events and the broadcast dispatcher

pub mod event;
