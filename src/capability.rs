//! Capability interfaces the agent roles must satisfy.
//!
//! The orchestrator treats "produce output" and "review output" as calls
//! through these traits; the generation engine behind them is external
//! (see `engine` for the process-backed adapter, or the scripted
//! implementations in tests).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::CapabilityFault;
use crate::verdict::Verdict;

/// One artifact produced by the Storyteller.
///
/// Never mutated in place: each retry yields a new instance with the next
/// revision number, and the session keeps the chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub content: String,
    /// Profile id of the producing agent.
    pub produced_by: String,
    /// 0 for the first draft, +1 per retry within a session.
    pub revision: u32,
}

impl Output {
    pub fn new(content: impl Into<String>, produced_by: &str, revision: u32) -> Self {
        Self {
            content: content.into(),
            produced_by: produced_by.to_string(),
            revision,
        }
    }
}

/// Immutable context handed to each produce call.
///
/// Revisions carry the prior output and the accumulated critic feedback so
/// the Storyteller improves the draft instead of starting over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProduceContext {
    pub goal: String,
    /// Revision number the produced output must carry.
    pub revision: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prior: Option<Output>,
    /// Critic feedback accumulated over the session, oldest first.
    #[serde(default)]
    pub feedback: Vec<String>,
}

impl ProduceContext {
    /// Context for the first draft of a mission.
    pub fn initial(goal: &str) -> Self {
        Self {
            goal: goal.to_string(),
            revision: 0,
            prior: None,
            feedback: Vec::new(),
        }
    }

    /// Context for the next revision, extending the feedback accumulator.
    pub fn revise(&self, prior: Output, feedback: &str) -> Self {
        let mut accumulated = self.feedback.clone();
        accumulated.push(feedback.to_string());
        Self {
            goal: self.goal.clone(),
            revision: prior.revision + 1,
            prior: Some(prior),
            feedback: accumulated,
        }
    }

    pub fn is_revision(&self) -> bool {
        self.revision > 0
    }

    /// Latest piece of critic feedback, if any.
    pub fn latest_feedback(&self) -> Option<&str> {
        self.feedback.last().map(String::as_str)
    }
}

/// Generator role: produces an Output for a context.
#[async_trait]
pub trait Storyteller: Send + Sync {
    async fn produce(&self, ctx: &ProduceContext) -> Result<Output, CapabilityFault>;
}

/// Reviewer role: judges an Output.
#[async_trait]
pub trait Critic: Send + Sync {
    async fn review(&self, output: &Output) -> Result<Verdict, CapabilityFault>;
}
