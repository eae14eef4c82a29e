//! Networks of interpreters connected by channels.
//!
//! [`link`] provides the channel-backed streams, [`amplifier`] wires them into
//! a ring and runs it, and [`search`] tries every phase ordering.

pub mod amplifier;
pub mod link;
pub mod search;
