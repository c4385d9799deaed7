//! The finalize sequence: debrief, awards ceremony, reflections.
//!
//! Everything here is deterministic apart from the reflections, which come
//! from an external collaborator and are allowed to be empty.

use async_trait::async_trait;

use crate::mission::record::{Award, MissionStatus, Reflection};
use crate::profile::{AgentProfile, Team};
use crate::verdict::VerdictRecord;

/// Build the mission debrief: a plain-text summary of goal, revision work,
/// and the verdict trail.
pub fn build_debrief(
    goal: &str,
    status: MissionStatus,
    retries_used: u32,
    verdict_trail: &[VerdictRecord],
) -> String {
    let status_line = match (status, retries_used) {
        (MissionStatus::Approved, 0) => "Mission Status: SUCCESS",
        (MissionStatus::Approved, _) => "Mission Status: PARTIAL SUCCESS (after revisions)",
        (MissionStatus::ApprovedByOverride, _) => {
            "Mission Status: APPROVED BY MANUAL REVIEW"
        }
        (MissionStatus::Abandoned, _) => "Mission Status: ABANDONED",
    };

    let mut lines = vec![
        status_line.to_string(),
        String::new(),
        format!("Goal: {goal}"),
        format!(
            "Revisions: {retries_used} ({} review{} performed)",
            verdict_trail.len(),
            if verdict_trail.len() == 1 { "" } else { "s" }
        ),
        String::new(),
        "Verdict trail:".to_string(),
    ];
    for record in verdict_trail {
        lines.push(format!("  revision {}: {}", record.revision, record.verdict));
    }
    lines.join("\n")
}

/// Compute award assignments from participation.
///
/// Deterministic: the Storyteller always receives a contribution award, the
/// Critic always receives a review award, and the MVP goes to the member
/// with the most contributions (ties broken by team order).
pub fn compute_awards(team: &Team, produce_count: u32, review_count: u32) -> Vec<Award> {
    let mut awards = vec![
        Award::new("Storyteller Contribution", &team.storyteller.name),
        Award::new("Critic Review", &team.critic.name),
    ];

    let contributions = [
        (&team.storyteller.name, produce_count),
        (&team.critic.name, review_count),
    ];
    // max_by_key keeps the last maximum, so scan in reverse to let the
    // storyteller win ties.
    let mvp = contributions
        .iter()
        .rev()
        .max_by_key(|(_, count)| *count)
        .map(|(name, _)| name.as_str())
        .unwrap_or(&team.storyteller.name);
    awards.push(Award::new("MVP (Most Valuable Agent)", mvp));

    let runner_up = contributions
        .iter()
        .find(|(name, _)| name.as_str() != mvp)
        .map(|(name, _)| name.as_str());
    if let Some(name) = runner_up {
        awards.push(Award::new("Outstanding Contributor", name));
    }

    awards
}

/// External collaborator supplying one free-text reflection per team member.
#[async_trait]
pub trait ReflectionSource: Send + Sync {
    /// A failure here is tolerated by the caller as an empty reflection.
    async fn reflect(&self, profile: &AgentProfile, goal: &str) -> anyhow::Result<String>;
}

/// Reflection source that always returns an empty entry.
pub struct NullReflections;

#[async_trait]
impl ReflectionSource for NullReflections {
    async fn reflect(&self, _profile: &AgentProfile, _goal: &str) -> anyhow::Result<String> {
        Ok(String::new())
    }
}

/// Collect one reflection per team member, tolerating source failures.
pub async fn collect_reflections(
    source: &dyn ReflectionSource,
    team: &Team,
    goal: &str,
) -> Vec<Reflection> {
    let mut reflections = Vec::new();
    for profile in team.members() {
        let text = source.reflect(profile, goal).await.unwrap_or_default();
        reflections.push(Reflection {
            agent_id: profile.id.clone(),
            agent_name: profile.name.clone(),
            text,
        });
    }
    reflections
}
