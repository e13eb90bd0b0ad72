//! # binscan-server
//!
//! HTTP server library for binscan.
//!
//! This library provides the API handlers and state management; the
//! `binscan-server` binary wires them to a listener.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod api;
pub mod logging;
pub mod state;
