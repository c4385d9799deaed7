//! Mission state, the append-only event history, and the archival record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::qa::EscalationReason;
use crate::verdict::VerdictRecord;
use crate::capability::Output;

/// Where a mission currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionState {
    Assembling,
    Producing,
    InQa,
    AwaitingManualReview,
    Finalizing,
    Archived,
}

/// Terminal outcome recorded for a mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    /// Approved by the QA loop.
    Approved,
    /// Approved by a human reviewer after escalation.
    ApprovedByOverride,
    /// Abandoned after manual review (or cancellation while awaiting it).
    Abandoned,
}

impl MissionStatus {
    pub fn is_approved(&self) -> bool {
        matches!(self, MissionStatus::Approved | MissionStatus::ApprovedByOverride)
    }
}

impl std::fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissionStatus::Approved => write!(f, "approved"),
            MissionStatus::ApprovedByOverride => write!(f, "approved (override)"),
            MissionStatus::Abandoned => write!(f, "abandoned"),
        }
    }
}

/// One timestamped entry in a mission's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionEvent {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: MissionEventKind,
}

impl MissionEvent {
    pub fn now(kind: MissionEventKind) -> Self {
        Self {
            at: Utc::now(),
            kind,
        }
    }
}

/// What happened. Events are appended in strict causal order: produce before
/// review, review before the next produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MissionEventKind {
    Started { goal: String },
    Produced { agent_id: String, revision: u32 },
    Reviewed { agent_id: String, revision: u32, verdict: String },
    Escalated { reason: EscalationReason },
    ManualDecision { decision: String },
    Finalized { status: MissionStatus },
    Archived,
}

/// One end-to-end orchestration run, from goal to archive.
///
/// Mutated only by the mission runner; immutable once archived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mission {
    pub id: Uuid,
    pub goal: String,
    /// Profile ids in roster order.
    pub team: Vec<String>,
    pub state: MissionState,
    pub history: Vec<MissionEvent>,
    pub started_at: DateTime<Utc>,
}

impl Mission {
    pub fn new(goal: &str, team: Vec<String>) -> Self {
        let started_at = Utc::now();
        let mut mission = Self {
            id: Uuid::new_v4(),
            goal: goal.to_string(),
            team,
            state: MissionState::Assembling,
            history: Vec::new(),
            started_at,
        };
        mission.record(MissionEventKind::Started {
            goal: goal.to_string(),
        });
        mission
    }

    /// Append an event. History is append-only; nothing is ever removed or
    /// reordered.
    pub fn record(&mut self, kind: MissionEventKind) {
        self.history.push(MissionEvent::now(kind));
    }

    pub fn set_state(&mut self, state: MissionState) {
        self.state = state;
    }
}

/// An award handed out at the finalize ceremony.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Award {
    pub title: String,
    /// Name of the receiving agent.
    pub recipient: String,
}

impl Award {
    pub fn new(title: &str, recipient: &str) -> Self {
        Self {
            title: title.to_string(),
            recipient: recipient.to_string(),
        }
    }
}

/// One team member's free-text reflection on the mission. May be empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    pub agent_id: String,
    pub agent_name: String,
    pub text: String,
}

/// The archival record of a completed mission. Created once at finalize
/// time, never mutated after archival.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionRecord {
    pub mission_id: Uuid,
    pub goal: String,
    pub status: MissionStatus,
    /// The last output considered; for approved missions, the approved one.
    pub final_output: Output,
    pub verdict_trail: Vec<VerdictRecord>,
    /// Empty for abandoned missions.
    pub debrief: String,
    /// Empty for abandoned missions.
    pub awards: Vec<Award>,
    /// Empty for abandoned missions.
    pub reflections: Vec<Reflection>,
    pub history: Vec<MissionEvent>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verdict::Verdict;

    #[test]
    fn test_mission_new_records_started_event() {
        let mission = Mission::new("write a story", vec!["s".into(), "c".into()]);
        assert_eq!(mission.state, MissionState::Assembling);
        assert_eq!(mission.history.len(), 1);
        assert!(matches!(
            mission.history[0].kind,
            MissionEventKind::Started { .. }
        ));
    }

    #[test]
    fn test_history_is_append_only_in_order() {
        let mut mission = Mission::new("goal", vec![]);
        mission.record(MissionEventKind::Produced {
            agent_id: "s".into(),
            revision: 0,
        });
        mission.record(MissionEventKind::Reviewed {
            agent_id: "c".into(),
            revision: 0,
            verdict: "approved".into(),
        });

        let kinds: Vec<&MissionEventKind> = mission.history.iter().map(|e| &e.kind).collect();
        assert_eq!(kinds.len(), 3);
        assert!(matches!(kinds[1], MissionEventKind::Produced { revision: 0, .. }));
        assert!(matches!(kinds[2], MissionEventKind::Reviewed { .. }));
        // Timestamps never go backwards.
        assert!(mission.history[0].at <= mission.history[1].at);
        assert!(mission.history[1].at <= mission.history[2].at);
    }

    #[test]
    fn test_status_is_approved() {
        assert!(MissionStatus::Approved.is_approved());
        assert!(MissionStatus::ApprovedByOverride.is_approved());
        assert!(!MissionStatus::Abandoned.is_approved());
    }

    #[test]
    fn test_record_serde_roundtrip() {
        let record = MissionRecord {
            mission_id: Uuid::new_v4(),
            goal: "goal".into(),
            status: MissionStatus::Approved,
            final_output: Output::new("story", "s", 1),
            verdict_trail: vec![VerdictRecord::new(0, Verdict::Approved)],
            debrief: "debrief".into(),
            awards: vec![Award::new("MVP (Most Valuable Agent)", "Storyteller")],
            reflections: vec![],
            history: vec![MissionEvent::now(MissionEventKind::Archived)],
            started_at: Utc::now(),
            finished_at: Utc::now(),
        };

        let json = serde_json::to_string_pretty(&record).unwrap();
        let parsed: MissionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.mission_id, record.mission_id);
        assert_eq!(parsed.status, MissionStatus::Approved);
        assert_eq!(parsed.awards.len(), 1);
    }
}
