//! WordCount - distributed word counter
//!
//! One process elects itself controller, the rest become workers, and they
//! coordinate only through a shared document store. The controller carves
//! the source into line-range jobs while a background task is still counting
//! its lines, then hands out one merge job per word prefix once every range
//! has been counted.
//!
//! # Modules
//!
//! - [`controller`] - line counting, job carving, two-phase scheduling
//! - [`worker`] - poll loop and job executors
//! - [`counting`] - tokenizing, prefix sharding, shard merging
//! - [`state`] - actor owning the coordination store
//! - [`domain`] - status vocabulary and stored records
//! - [`role`] - controller/worker election at startup
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod controller;
pub mod counting;
pub mod domain;
pub mod report;
pub mod role;
pub mod source;
pub mod state;
pub mod worker;

pub use config::Config;
pub use controller::{Controller, ControllerError, RunSummary};
pub use state::StateManager;
pub use worker::{Worker, WorkerError, WorkerSummary};
