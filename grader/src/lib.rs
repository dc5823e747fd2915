//! # Grader
//!
//! A grading server that lets a remote client run one simulation session
//! through a Redis broker instead of a direct API.
//!
//! ## Overview
//!
//! The client pushes JSON commands onto the service's command queue
//! (`osim-rl::<service-id>::commands`) and waits for the reply on a queue of
//! its own choosing. The server pops one command at a time, applies it to the
//! single environment it owns, and pushes exactly one reply back. A session
//! runs `create → (step… → reset)… → submit`; the submit reply carries the
//! cumulative reward averaged over the configured number of episodes, and
//! the process exits after sending it.
//!
//! ## The Crates
//!
//! -   **`grader`:** this crate. Command-line parsing, logging setup, broker
//!     connection and the final report.
//! -   **[`dispatch`]:** the wire protocol and the command loop.
//! -   **[`session`]:** the seed sequence and the one-environment session
//!     with its reward bookkeeping.
//! -   **[`sim`]:** the environment capability contract and the obstacle
//!     course environment served by default.
//! -   **[`transport`]:** blocking pop / push over Redis, plus an in-memory
//!     stand-in for tests.

pub mod app;
pub mod cli;

pub use dispatch;
pub use session;
pub use sim;
pub use transport;
