//! Core library for the athlete registration platform.
//!
//! The interesting part lives in [`workflows::registration`]: the lifecycle
//! engine that takes a candidate from a mutable draft, through a mandatory
//! coach-evaluated trial, to an admin approval that materializes a player
//! record. Identity, binary storage, notification delivery, and team rosters
//! are external collaborators reached through the boundary traits in
//! [`workflows::registration::repository`].

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
