//! QA loop engine: drives Critic review and Storyteller revision for one
//! output artifact until approval, escalation, or retry exhaustion.
//!
//! Per-session state machine: {Reviewing, Producing, Approved, Escalated}.
//! The session starts in Reviewing — the first draft is reviewed immediately.
//! Transitions:
//! - Reviewing → Approved on an approved verdict
//! - Reviewing → Escalated on NoVerdict, a capability fault, or an exhausted
//!   retry budget
//! - Reviewing → Producing on NeedsRevision with budget remaining
//! - Producing → Reviewing once the revision lands
//!
//! The engine has no side effects beyond invoking the two capabilities and
//! extending the session's revision chain; persistence and manual review
//! belong to the mission orchestrator.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use crate::capability::{Critic, Output, ProduceContext, Storyteller};
use crate::verdict::{Verdict, VerdictRecord};

/// Why a session was handed to manual review.
///
/// The two branches stay distinct because the human reviewer needs to know
/// whether the critic was unusable or the budget simply ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationReason {
    /// The critic produced no usable tag, or a capability call faulted.
    CriticUnusable,
    /// Every retry was consumed without an approval.
    RetriesExhausted,
}

impl fmt::Display for EscalationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EscalationReason::CriticUnusable => write!(f, "no tag/error"),
            EscalationReason::RetriesExhausted => write!(f, "retries exhausted"),
        }
    }
}

/// Terminal outcome of a QA session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum QaOutcome {
    Approved,
    Escalated { reason: EscalationReason },
}

impl QaOutcome {
    pub fn is_approved(&self) -> bool {
        matches!(self, QaOutcome::Approved)
    }
}

/// Result of one QA session: the terminal outcome plus the full trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaSessionResult {
    pub outcome: QaOutcome,
    /// The last output considered, approved or not.
    pub output: Output,
    /// Every revision in order, the initial draft first.
    pub revisions: Vec<Output>,
    /// Every verdict in order, one per review call. Faulted review calls are
    /// recorded as NoVerdict so the trail still covers them.
    pub verdicts: Vec<VerdictRecord>,
    pub retries_used: u32,
}

impl QaSessionResult {
    /// Number of review calls the session performed.
    pub fn reviews_performed(&self) -> usize {
        self.verdicts.len()
    }
}

/// Drives the revise loop with a bounded retry budget.
#[derive(Debug, Clone, Copy)]
pub struct QaEngine {
    max_retries: u32,
}

impl QaEngine {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Run one session over `initial` (which must be revision 0).
    ///
    /// Capability faults — from either role, including timeouts — are
    /// terminal: they escalate with `CriticUnusable` and are never retried,
    /// so a crashing engine cannot spin the loop. Only substantive
    /// `NeedsRevision` feedback consumes retry budget.
    pub async fn run_session(
        &self,
        goal: &str,
        initial: Output,
        storyteller: &dyn Storyteller,
        critic: &dyn Critic,
    ) -> QaSessionResult {
        debug_assert_eq!(initial.revision, 0, "initial output must be revision 0");

        let mut retry_count: u32 = 0;
        let mut ctx = ProduceContext::initial(goal);
        let mut current = initial;
        let mut revisions = vec![current.clone()];
        let mut verdicts: Vec<VerdictRecord> = Vec::new();

        loop {
            debug!(revision = current.revision, retry_count, "reviewing output");

            let verdict = match critic.review(&current).await {
                Ok(v) => v,
                Err(fault) => {
                    warn!(%fault, "critic capability faulted, escalating");
                    verdicts.push(VerdictRecord::new(current.revision, Verdict::NoVerdict));
                    return QaSessionResult {
                        outcome: QaOutcome::Escalated {
                            reason: EscalationReason::CriticUnusable,
                        },
                        output: current,
                        revisions,
                        verdicts,
                        retries_used: retry_count,
                    };
                }
            };

            verdicts.push(VerdictRecord::new(current.revision, verdict.clone()));

            match verdict {
                Verdict::Approved => {
                    info!(revision = current.revision, retries = retry_count, "output approved");
                    return QaSessionResult {
                        outcome: QaOutcome::Approved,
                        output: current,
                        revisions,
                        verdicts,
                        retries_used: retry_count,
                    };
                }
                Verdict::NoVerdict => {
                    warn!(revision = current.revision, "critic produced no usable tag");
                    return QaSessionResult {
                        outcome: QaOutcome::Escalated {
                            reason: EscalationReason::CriticUnusable,
                        },
                        output: current,
                        revisions,
                        verdicts,
                        retries_used: retry_count,
                    };
                }
                Verdict::NeedsRevision { feedback } => {
                    if retry_count == self.max_retries {
                        info!(retries = retry_count, "retry budget exhausted, escalating");
                        return QaSessionResult {
                            outcome: QaOutcome::Escalated {
                                reason: EscalationReason::RetriesExhausted,
                            },
                            output: current,
                            revisions,
                            verdicts,
                            retries_used: retry_count,
                        };
                    }

                    retry_count += 1;
                    ctx = ctx.revise(current.clone(), &feedback);
                    debug!(revision = ctx.revision, retry_count, "requesting revision");

                    let mut revised = match storyteller.produce(&ctx).await {
                        Ok(o) => o,
                        Err(fault) => {
                            warn!(%fault, "storyteller capability faulted, escalating");
                            return QaSessionResult {
                                outcome: QaOutcome::Escalated {
                                    reason: EscalationReason::CriticUnusable,
                                },
                                output: current,
                                revisions,
                                verdicts,
                                retries_used: retry_count,
                            };
                        }
                    };
                    // Revision numbering is owned by the session, not the
                    // capability: strictly previous + 1.
                    revised.revision = current.revision + 1;
                    revisions.push(revised.clone());
                    current = revised;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CapabilityFault;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Storyteller that emits canned drafts and counts produce calls.
    struct ScriptedStoryteller {
        calls: AtomicU32,
    }

    impl ScriptedStoryteller {
        fn new() -> Self {
            Self {
                calls: AtomicU32::new(0),
            }
        }

        fn produce_calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Storyteller for ScriptedStoryteller {
        async fn produce(&self, ctx: &ProduceContext) -> Result<Output, CapabilityFault> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Output::new(
                format!("draft {}", n + 1),
                "storyteller_01",
                ctx.revision,
            ))
        }
    }

    /// Storyteller whose every call faults.
    struct FaultingStoryteller;

    #[async_trait]
    impl Storyteller for FaultingStoryteller {
        async fn produce(&self, _ctx: &ProduceContext) -> Result<Output, CapabilityFault> {
            Err(CapabilityFault::Timeout { secs: 1 })
        }
    }

    /// Critic that replays a fixed verdict script.
    struct ScriptedCritic {
        script: Mutex<Vec<Result<Verdict, CapabilityFault>>>,
        calls: AtomicU32,
    }

    impl ScriptedCritic {
        fn new(script: Vec<Result<Verdict, CapabilityFault>>) -> Self {
            let mut script = script;
            script.reverse();
            Self {
                script: Mutex::new(script),
                calls: AtomicU32::new(0),
            }
        }

        fn review_calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Critic for ScriptedCritic {
        async fn review(&self, _output: &Output) -> Result<Verdict, CapabilityFault> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop()
                .expect("critic script exhausted")
        }
    }

    fn needs_revision(feedback: &str) -> Result<Verdict, CapabilityFault> {
        Ok(Verdict::NeedsRevision {
            feedback: feedback.to_string(),
        })
    }

    fn first_draft() -> Output {
        Output::new("first draft", "storyteller_01", 0)
    }

    // =========================================
    // Spec scenarios
    // =========================================

    #[tokio::test]
    async fn test_scenario_approved_after_two_retries() {
        // maxRetries=2, verdicts [NeedsRevision, NeedsRevision, Approved]
        let storyteller = ScriptedStoryteller::new();
        let critic = ScriptedCritic::new(vec![
            needs_revision("expand the middle"),
            needs_revision("fix the ending"),
            Ok(Verdict::Approved),
        ]);

        let result = QaEngine::new(2)
            .run_session("goal", first_draft(), &storyteller, &critic)
            .await;

        assert!(result.outcome.is_approved());
        assert_eq!(result.retries_used, 2);
        assert_eq!(critic.review_calls(), 3);
        assert_eq!(storyteller.produce_calls(), 2);
        assert_eq!(result.output.revision, 2);
    }

    #[tokio::test]
    async fn test_scenario_retries_exhausted() {
        // maxRetries=1, verdicts [NeedsRevision, NeedsRevision]
        let storyteller = ScriptedStoryteller::new();
        let critic = ScriptedCritic::new(vec![
            needs_revision("weak opening"),
            needs_revision("still weak"),
        ]);

        let result = QaEngine::new(1)
            .run_session("goal", first_draft(), &storyteller, &critic)
            .await;

        assert_eq!(
            result.outcome,
            QaOutcome::Escalated {
                reason: EscalationReason::RetriesExhausted
            }
        );
        assert_eq!(critic.review_calls(), 2);
        assert_eq!(result.retries_used, 1);
    }

    #[tokio::test]
    async fn test_scenario_no_verdict_escalates_immediately() {
        // maxRetries=5, first verdict unusable
        let storyteller = ScriptedStoryteller::new();
        let critic = ScriptedCritic::new(vec![Ok(Verdict::NoVerdict)]);

        let result = QaEngine::new(5)
            .run_session("goal", first_draft(), &storyteller, &critic)
            .await;

        assert_eq!(
            result.outcome,
            QaOutcome::Escalated {
                reason: EscalationReason::CriticUnusable
            }
        );
        assert_eq!(result.retries_used, 0);
        assert_eq!(storyteller.produce_calls(), 0);
        assert_eq!(critic.review_calls(), 1);
    }

    // =========================================
    // Properties
    // =========================================

    #[tokio::test]
    async fn test_always_needs_revision_reviews_exactly_budget_plus_one() {
        for max_retries in 0..4u32 {
            let storyteller = ScriptedStoryteller::new();
            let script = (0..=max_retries)
                .map(|_| needs_revision("again"))
                .collect();
            let critic = ScriptedCritic::new(script);

            let result = QaEngine::new(max_retries)
                .run_session("goal", first_draft(), &storyteller, &critic)
                .await;

            assert_eq!(
                critic.review_calls(),
                max_retries + 1,
                "maxRetries={max_retries}: must review initial + each retry, never more"
            );
            assert_eq!(
                result.outcome,
                QaOutcome::Escalated {
                    reason: EscalationReason::RetriesExhausted
                }
            );
        }
    }

    #[tokio::test]
    async fn test_first_review_approval_is_single_review() {
        let storyteller = ScriptedStoryteller::new();
        let critic = ScriptedCritic::new(vec![Ok(Verdict::Approved)]);

        let result = QaEngine::new(3)
            .run_session("goal", first_draft(), &storyteller, &critic)
            .await;

        assert!(result.outcome.is_approved());
        assert_eq!(critic.review_calls(), 1);
        assert_eq!(storyteller.produce_calls(), 0);
        assert_eq!(result.retries_used, 0);
        assert_eq!(result.revisions.len(), 1);
    }

    #[tokio::test]
    async fn test_revision_numbers_strictly_increase() {
        let storyteller = ScriptedStoryteller::new();
        let critic = ScriptedCritic::new(vec![
            needs_revision("1"),
            needs_revision("2"),
            needs_revision("3"),
            Ok(Verdict::Approved),
        ]);

        let result = QaEngine::new(3)
            .run_session("goal", first_draft(), &storyteller, &critic)
            .await;

        let revisions: Vec<u32> = result.revisions.iter().map(|o| o.revision).collect();
        assert_eq!(revisions, vec![0, 1, 2, 3]);
        let verdict_revisions: Vec<u32> = result.verdicts.iter().map(|v| v.revision).collect();
        assert_eq!(verdict_revisions, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_critic_fault_escalates_without_retry() {
        let storyteller = ScriptedStoryteller::new();
        let critic = ScriptedCritic::new(vec![Err(CapabilityFault::Timeout { secs: 30 })]);

        let result = QaEngine::new(4)
            .run_session("goal", first_draft(), &storyteller, &critic)
            .await;

        assert_eq!(
            result.outcome,
            QaOutcome::Escalated {
                reason: EscalationReason::CriticUnusable
            }
        );
        // The faulted call still appears in the trail as NoVerdict.
        assert_eq!(result.verdicts.len(), 1);
        assert_eq!(result.verdicts[0].verdict, Verdict::NoVerdict);
        assert_eq!(storyteller.produce_calls(), 0);
    }

    #[tokio::test]
    async fn test_storyteller_fault_escalates() {
        let critic = ScriptedCritic::new(vec![needs_revision("try again")]);

        let result = QaEngine::new(2)
            .run_session("goal", first_draft(), &FaultingStoryteller, &critic)
            .await;

        assert_eq!(
            result.outcome,
            QaOutcome::Escalated {
                reason: EscalationReason::CriticUnusable
            }
        );
        // The last output considered is still the first draft.
        assert_eq!(result.output.revision, 0);
        assert_eq!(critic.review_calls(), 1);
    }

    #[tokio::test]
    async fn test_zero_retry_budget_escalates_on_first_revision_request() {
        let storyteller = ScriptedStoryteller::new();
        let critic = ScriptedCritic::new(vec![needs_revision("anything")]);

        let result = QaEngine::new(0)
            .run_session("goal", first_draft(), &storyteller, &critic)
            .await;

        assert_eq!(
            result.outcome,
            QaOutcome::Escalated {
                reason: EscalationReason::RetriesExhausted
            }
        );
        assert_eq!(storyteller.produce_calls(), 0);
        assert_eq!(critic.review_calls(), 1);
    }

    #[test]
    fn test_escalation_reason_display() {
        assert_eq!(EscalationReason::CriticUnusable.to_string(), "no tag/error");
        assert_eq!(
            EscalationReason::RetriesExhausted.to_string(),
            "retries exhausted"
        );
    }
}
