//! Session implementations.

pub mod memory;
