//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod range_server;
pub mod socket_guard;
pub mod stall_server;
