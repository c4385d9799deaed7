//! Typed error hierarchy for the Hatflow orchestrator.
//!
//! Three enums cover the three failure surfaces:
//! - `CapabilityFault` — generation/review engine failures (always converted
//!   to an escalation at the QA-engine boundary, never retried)
//! - `ArchiveError` — mission record persistence failures
//! - `MissionError` — fatal orchestrator failures reported to the caller

use crate::mission::MissionRecord;
use crate::profile::AgentRole;
use thiserror::Error;

/// A failure of the external generation engine while producing or reviewing.
///
/// Faults are terminal for a QA session: the engine escalates instead of
/// retrying, so a crashing capability can never spin the revise loop.
#[derive(Debug, Error)]
pub enum CapabilityFault {
    #[error("Failed to spawn engine process '{cmd}': {source}")]
    SpawnFailed {
        cmd: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Engine exited with non-zero code {exit_code}")]
    NonZeroExit { exit_code: i32 },

    #[error("Engine call timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Engine produced no output")]
    EmptyOutput,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors from the archive writer.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Mission {mission_id} is already archived")]
    AlreadyArchived { mission_id: uuid::Uuid },

    #[error("Failed to serialize mission record: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Failed to write mission record at {path}: {source}")]
    WriteFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Fatal mission failures reported to the caller.
///
/// Everything else either resolves inside the QA loop or surfaces as an
/// escalation to the manual reviewer.
#[derive(Debug, Error)]
pub enum MissionError {
    #[error("No profile bound for required role {role}")]
    TeamAssembly { role: AgentRole },

    #[error("Failed to load profile '{id}': {source}")]
    ProfileLoad {
        id: String,
        #[source]
        source: anyhow::Error,
    },

    /// Archival failed after the record was computed. The record is carried
    /// here so the caller still receives the result of the mission.
    #[error("Failed to archive mission record: {source}")]
    Archive {
        record: Box<MissionRecord>,
        #[source]
        source: ArchiveError,
    },
}
