//! Manual review gate for escalated missions.
//!
//! When the QA loop cannot resolve a session on its own, the mission suspends
//! here until a human (or an auto-approve policy) decides its fate.

use async_trait::async_trait;
use console::style;
use dialoguer::{Select, theme::ColorfulTheme};
use tracing::warn;

use crate::capability::Output;
use crate::qa::EscalationReason;
use crate::verdict::VerdictRecord;

/// Everything the reviewer needs to judge an escalated session.
#[derive(Debug)]
pub struct EscalationContext<'a> {
    pub goal: &'a str,
    /// The last output considered by the QA loop.
    pub output: &'a Output,
    pub verdict_trail: &'a [VerdictRecord],
    pub reason: EscalationReason,
}

/// The reviewer's ruling on an escalated mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    /// Accept the current output despite the escalation.
    ApproveOverride,
    /// Stop the mission without an approved output.
    Abandon,
}

impl ReviewDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewDecision::ApproveOverride => "approve_override",
            ReviewDecision::Abandon => "abandon",
        }
    }
}

/// Collaborator consulted when a QA session escalates.
///
/// The wait may be indefinite; the mission runner races it against the
/// cancel handle.
#[async_trait]
pub trait ManualReviewer: Send + Sync {
    async fn review(&self, ctx: EscalationContext<'_>) -> ReviewDecision;
}

/// Interactive gate on the terminal.
pub struct ConsoleGate {
    auto_approve: bool,
}

impl ConsoleGate {
    pub fn new(auto_approve: bool) -> Self {
        Self { auto_approve }
    }

    fn print_context(ctx: &EscalationContext<'_>) {
        println!();
        println!(
            "{} {}",
            style("⚠ Manual review required:").yellow().bold(),
            style(ctx.reason).yellow()
        );
        println!("  Goal: {}", ctx.goal);
        for record in ctx.verdict_trail {
            println!("  revision {}: {}", record.revision, record.verdict);
        }
        println!();
        println!("{}", style("Last output:").bold());
        println!("{}", ctx.output.content);
        println!();
    }
}

#[async_trait]
impl ManualReviewer for ConsoleGate {
    async fn review(&self, ctx: EscalationContext<'_>) -> ReviewDecision {
        Self::print_context(&ctx);

        if self.auto_approve {
            println!("{}", style("Auto-approve enabled, accepting output").dim());
            return ReviewDecision::ApproveOverride;
        }

        let selection = tokio::task::spawn_blocking(|| {
            Select::with_theme(&ColorfulTheme::default())
                .with_prompt("How should this mission proceed?")
                .items(&["Approve the current output", "Abandon the mission"])
                .default(0)
                .interact()
        })
        .await;

        match selection {
            Ok(Ok(0)) => ReviewDecision::ApproveOverride,
            Ok(Ok(_)) => ReviewDecision::Abandon,
            Ok(Err(e)) => {
                // No usable terminal. Abandoning is the only safe ruling.
                warn!(error = %e, "manual review prompt failed, abandoning");
                ReviewDecision::Abandon
            }
            Err(e) => {
                warn!(error = %e, "manual review task failed, abandoning");
                ReviewDecision::Abandon
            }
        }
    }
}
