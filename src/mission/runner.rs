//! The mission orchestrator: assembly, production, QA, manual review,
//! finalize, archive.
//!
//! One `run_mission` call is one sequential logical flow; produce and review
//! never overlap. The only suspension point that can outlive the capabilities
//! is the manual review wait, which races against the cancel handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::archive::ArchiveWriter;
use crate::capability::{Critic, Output, ProduceContext, Storyteller};
use crate::errors::MissionError;
use crate::gates::{EscalationContext, ManualReviewer, ReviewDecision};
use crate::mission::finalize::{ReflectionSource, build_debrief, collect_reflections, compute_awards};
use crate::mission::record::{
    Mission, MissionEventKind, MissionRecord, MissionState, MissionStatus,
};
use crate::profile::{AgentProfile, Team};
use crate::qa::{EscalationReason, QaEngine, QaOutcome, QaSessionResult};

const DEFAULT_PRODUCE_TIMEOUT: Duration = Duration::from_secs(120);

/// Cancellation handle for a running mission.
///
/// Cancelling while the mission waits on manual review resolves the wait to
/// Abandon. Cloned handles share the same flag.
#[derive(Clone)]
pub struct MissionCancel {
    inner: Arc<CancelInner>,
}

struct CancelInner {
    notify: Notify,
    cancelled: AtomicBool,
}

impl MissionCancel {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CancelInner {
                notify: Notify::new(),
                cancelled: AtomicBool::new(false),
            }),
        }
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        // Register before checking the flag so a cancel between the check
        // and the await is not missed.
        let notified = self.inner.notify.notified();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

impl Default for MissionCancel {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives one mission from goal to archived record.
pub struct MissionRunner<'a> {
    qa: QaEngine,
    produce_timeout: Duration,
    reviewer: &'a dyn ManualReviewer,
    reflections: &'a dyn ReflectionSource,
    archive: &'a dyn ArchiveWriter,
    cancel: MissionCancel,
}

impl<'a> MissionRunner<'a> {
    pub fn new(
        qa: QaEngine,
        reviewer: &'a dyn ManualReviewer,
        reflections: &'a dyn ReflectionSource,
        archive: &'a dyn ArchiveWriter,
    ) -> Self {
        Self {
            qa,
            produce_timeout: DEFAULT_PRODUCE_TIMEOUT,
            reviewer,
            reflections,
            archive,
            cancel: MissionCancel::new(),
        }
    }

    pub fn with_produce_timeout(mut self, timeout: Duration) -> Self {
        self.produce_timeout = timeout;
        self
    }

    /// Handle callers can use to cancel this runner's missions.
    pub fn cancel_handle(&self) -> MissionCancel {
        self.cancel.clone()
    }

    /// Run one mission to completion.
    ///
    /// Returns the archived record, or `MissionError::Archive` carrying the
    /// computed record when persistence fails.
    pub async fn run_mission(
        &self,
        goal: &str,
        roster: &[AgentProfile],
        storyteller: &dyn Storyteller,
        critic: &dyn Critic,
    ) -> Result<MissionRecord, MissionError> {
        let mut mission = Mission::new(goal, roster.iter().map(|p| p.id.clone()).collect());
        let team = Team::assemble(roster)?;
        info!(
            mission_id = %mission.id,
            storyteller = %team.storyteller.id,
            critic = %team.critic.id,
            "team assembled"
        );

        mission.set_state(MissionState::Producing);
        let initial = tokio::time::timeout(
            self.produce_timeout,
            storyteller.produce(&ProduceContext::initial(goal)),
        )
        .await;

        let qa_result = match initial {
            Ok(Ok(mut output)) => {
                // The session owns revision numbering from here on.
                output.revision = 0;
                mission.record(MissionEventKind::Produced {
                    agent_id: team.storyteller.id.clone(),
                    revision: 0,
                });
                mission.set_state(MissionState::InQa);
                let result = self
                    .qa
                    .run_session(goal, output, storyteller, critic)
                    .await;
                self.record_session_events(&mut mission, &team, &result);
                result
            }
            Ok(Err(fault)) => {
                warn!(%fault, "initial production failed, escalating");
                Self::failed_start(&team)
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.produce_timeout.as_secs(),
                    "initial production timed out, escalating"
                );
                Self::failed_start(&team)
            }
        };

        let status = match qa_result.outcome {
            QaOutcome::Approved => MissionStatus::Approved,
            QaOutcome::Escalated { reason } => {
                mission.record(MissionEventKind::Escalated { reason });
                mission.set_state(MissionState::AwaitingManualReview);
                let decision = self.await_manual_review(goal, &qa_result, reason).await;
                mission.record(MissionEventKind::ManualDecision {
                    decision: decision.as_str().to_string(),
                });
                match decision {
                    ReviewDecision::ApproveOverride => MissionStatus::ApprovedByOverride,
                    ReviewDecision::Abandon => MissionStatus::Abandoned,
                }
            }
        };

        mission.set_state(MissionState::Finalizing);
        mission.record(MissionEventKind::Finalized { status });
        let record = self.finalize(mission.clone(), &team, status, qa_result).await;

        match self.archive.store(&record) {
            Ok(path) => {
                mission.record(MissionEventKind::Archived);
                mission.set_state(MissionState::Archived);
                info!(mission_id = %mission.id, path = %path.display(), "mission complete");
                Ok(record)
            }
            Err(source) => Err(MissionError::Archive {
                record: Box::new(record),
                source,
            }),
        }
    }

    /// Session stand-in for a mission whose first draft never materialized.
    fn failed_start(team: &Team) -> QaSessionResult {
        QaSessionResult {
            outcome: QaOutcome::Escalated {
                reason: EscalationReason::CriticUnusable,
            },
            output: Output::new("", &team.storyteller.id, 0),
            revisions: Vec::new(),
            verdicts: Vec::new(),
            retries_used: 0,
        }
    }

    /// Replay a QA session into the mission history in causal order:
    /// each revision's Produced entry lands before its Reviewed entry.
    fn record_session_events(
        &self,
        mission: &mut Mission,
        team: &Team,
        result: &QaSessionResult,
    ) {
        // Revision 0 was recorded when the initial draft landed.
        let mut produced = result.revisions.iter().skip(1).peekable();
        for verdict in &result.verdicts {
            while let Some(output) = produced.peek() {
                if output.revision <= verdict.revision {
                    mission.record(MissionEventKind::Produced {
                        agent_id: team.storyteller.id.clone(),
                        revision: output.revision,
                    });
                    produced.next();
                } else {
                    break;
                }
            }
            mission.record(MissionEventKind::Reviewed {
                agent_id: team.critic.id.clone(),
                revision: verdict.revision,
                verdict: verdict.verdict.to_string(),
            });
        }
    }

    async fn await_manual_review(
        &self,
        goal: &str,
        result: &QaSessionResult,
        reason: EscalationReason,
    ) -> ReviewDecision {
        let ctx = EscalationContext {
            goal,
            output: &result.output,
            verdict_trail: &result.verdicts,
            reason,
        };
        tokio::select! {
            decision = self.reviewer.review(ctx) => decision,
            _ = self.cancel.cancelled() => {
                info!("mission cancelled while awaiting manual review");
                ReviewDecision::Abandon
            }
        }
    }

    async fn finalize(
        &self,
        mission: Mission,
        team: &Team,
        status: MissionStatus,
        qa_result: QaSessionResult,
    ) -> MissionRecord {
        let (debrief, awards, reflections) = if status.is_approved() {
            let debrief = build_debrief(
                &mission.goal,
                status,
                qa_result.retries_used,
                &qa_result.verdicts,
            );
            let awards = compute_awards(
                team,
                qa_result.revisions.len() as u32,
                qa_result.verdicts.len() as u32,
            );
            let reflections =
                collect_reflections(self.reflections, team, &mission.goal).await;
            (debrief, awards, reflections)
        } else {
            // Abandoned missions keep their trail but skip the ceremony.
            (String::new(), Vec::new(), Vec::new())
        };

        MissionRecord {
            mission_id: mission.id,
            goal: mission.goal.clone(),
            status,
            final_output: qa_result.output,
            verdict_trail: qa_result.verdicts,
            debrief,
            awards,
            reflections,
            history: mission.history,
            started_at: mission.started_at,
            finished_at: Utc::now(),
        }
    }
}
