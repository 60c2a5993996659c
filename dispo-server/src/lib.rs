//! Dispatch planner for a rail signalling simulation.
//!
//! Replays simulator snapshots, keeps a corrected schedule for every train
//! and propagates delays across replacement, coupling and splitting links.
//! An HTTP layer exposes the planned delays and accepts dispatcher overrides.

pub mod config;
pub mod domain;
pub mod feed;
pub mod planning;
pub mod web;
