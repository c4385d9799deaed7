//! Hatflow: mission orchestration for a small team of generative agents.
//!
//! A Storyteller produces content, a Critic reviews it, and the orchestrator
//! drives the produce→review→revise cycle until approval, escalation to
//! manual review, or abandonment, then finalizes the mission with a debrief,
//! awards, reflections, and an archival record.

pub mod archive;
pub mod capability;
pub mod config;
pub mod engine;
pub mod errors;
pub mod gates;
pub mod mission;
pub mod profile;
pub mod qa;
pub mod ui;
pub mod verdict;

pub use errors::{ArchiveError, CapabilityFault, MissionError};
