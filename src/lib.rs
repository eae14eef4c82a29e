//! Intcode library.
//!
//! Provides an Intcode interpreter and a feedback-connected network of
//! interpreters ("amplifiers") that pass signals to each other in a ring.

pub mod network;
pub mod utils;
pub mod virtual_machine;
