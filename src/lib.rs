//! # job-broker
//!
//! In-memory work-distribution broker. Producers submit jobs keyed by a
//! caller-supplied id; workers claim them one at a time in FIFO order and
//! report back; producers poll for results, which are consumed on read.
//! A periodic sweep reclaims jobs whose worker or producer went away.

pub mod broker;
pub mod config;
pub mod error;
pub mod http;
pub mod model;
pub mod store;
pub mod telemetry;
