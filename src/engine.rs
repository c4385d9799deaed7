//! Process-backed capability adapter.
//!
//! `CliAgent` turns an agent profile into working Storyteller/Critic
//! capabilities by shelling out to an external generation CLI: prompt in on
//! stdin, generated text out on stdout, bounded by a timeout.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::capability::{Critic, Output, ProduceContext, Storyteller};
use crate::errors::CapabilityFault;
use crate::profile::AgentProfile;
use crate::verdict::Verdict;

/// Default engine invocation timeout.
const DEFAULT_ENGINE_TIMEOUT_SECS: u64 = 120;

/// Default engine command.
const DEFAULT_ENGINE_CMD: &str = "claude";

/// Configuration for the external generation engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Engine CLI command (default: "claude").
    pub engine_cmd: String,
    /// Extra arguments passed to every invocation.
    pub engine_args: Vec<String>,
    /// Timeout for a single engine call.
    pub timeout: Duration,
    /// Verbose output for debugging.
    pub verbose: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            engine_cmd: DEFAULT_ENGINE_CMD.to_string(),
            engine_args: vec!["--print".to_string()],
            timeout: Duration::from_secs(DEFAULT_ENGINE_TIMEOUT_SECS),
            verbose: false,
        }
    }
}

impl EngineConfig {
    pub fn with_engine_cmd(mut self, cmd: &str) -> Self {
        self.engine_cmd = cmd.to_string();
        self
    }

    pub fn with_engine_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.engine_args = args.into_iter().collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// One profile bound to the external engine. Implements both capability
/// traits; the mission runner decides which side it plays.
pub struct CliAgent {
    config: EngineConfig,
    profile: AgentProfile,
    /// Mission goal, needed by the critic prompt (the review call itself
    /// only carries the output under judgment).
    goal: String,
}

impl CliAgent {
    pub fn new(config: EngineConfig, profile: AgentProfile, goal: &str) -> Self {
        Self {
            config,
            profile,
            goal: goal.to_string(),
        }
    }

    /// Run one engine call with the prompt on stdin.
    async fn run_engine(&self, prompt: &str) -> Result<String, CapabilityFault> {
        if self.config.verbose {
            eprintln!(
                "[engine] Invoking {} for agent {}",
                self.config.engine_cmd, self.profile.id
            );
        }

        let mut cmd = Command::new(&self.config.engine_cmd);
        cmd.args(&self.config.engine_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        let mut child = cmd.spawn().map_err(|source| CapabilityFault::SpawnFailed {
            cmd: self.config.engine_cmd.clone(),
            source,
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(prompt.as_bytes())
                .await
                .map_err(|e| CapabilityFault::Other(e.into()))?;
            stdin
                .shutdown()
                .await
                .map_err(|e| CapabilityFault::Other(e.into()))?;
        }

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CapabilityFault::Other(anyhow::anyhow!("engine stdout unavailable")))?;
        let reader = BufReader::new(stdout);
        let mut lines = reader.lines();
        let mut output = String::new();

        let collect = async {
            while let Ok(Some(line)) = lines.next_line().await {
                output.push_str(&line);
                output.push('\n');
            }
            child.wait().await
        };

        let status = match tokio::time::timeout(self.config.timeout, collect).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => return Err(CapabilityFault::Other(e.into())),
            Err(_) => {
                let _ = child.kill().await;
                return Err(CapabilityFault::Timeout {
                    secs: self.config.timeout.as_secs(),
                });
            }
        };

        if !status.success() {
            return Err(CapabilityFault::NonZeroExit {
                exit_code: status.code().unwrap_or(-1),
            });
        }

        let output = output.trim().to_string();
        if output.is_empty() {
            return Err(CapabilityFault::EmptyOutput);
        }

        debug!(agent = %self.profile.id, bytes = output.len(), "engine call complete");
        Ok(output)
    }
}

#[async_trait]
impl Storyteller for CliAgent {
    async fn produce(&self, ctx: &ProduceContext) -> Result<Output, CapabilityFault> {
        let prompt = build_story_prompt(&self.profile, ctx);
        let content = self.run_engine(&prompt).await?;
        Ok(Output::new(content, &self.profile.id, ctx.revision))
    }
}

#[async_trait]
impl Critic for CliAgent {
    async fn review(&self, output: &Output) -> Result<Verdict, CapabilityFault> {
        let prompt = build_review_prompt(&self.profile, &self.goal, output);
        let text = self.run_engine(&prompt).await?;
        Ok(Verdict::parse(&text))
    }
}

/// Reflection source backed by the same external engine.
pub struct CliReflections {
    config: EngineConfig,
}

impl CliReflections {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl crate::mission::ReflectionSource for CliReflections {
    async fn reflect(&self, profile: &AgentProfile, goal: &str) -> anyhow::Result<String> {
        let agent = CliAgent::new(self.config.clone(), profile.clone(), goal);
        let mut prompt = build_agent_preamble(profile);
        prompt.push_str(&format!(
            "\nThe mission \"{goal}\" has concluded. Share a short reflection \
             (two or three sentences) on your contribution and what you would \
             do differently next time.\n",
        ));
        let text = agent.run_engine(&prompt).await?;
        Ok(text)
    }
}

/// Shared preamble naming the agent, its role, and its toolkit.
fn build_agent_preamble(profile: &AgentProfile) -> String {
    let mut preamble = format!(
        "You are {name}, acting as the team's {role}.\n",
        name = profile.name,
        role = profile.role,
    );
    if !profile.instructions.is_empty() {
        preamble.push_str(&format!("\nInstructions: {}\n", profile.instructions));
    }
    if !profile.tools.is_empty() {
        let tools: Vec<&str> = profile.tools.iter().map(String::as_str).collect();
        preamble.push_str(&format!("Available tools: {}\n", tools.join(", ")));
    }
    if !profile.relationships.is_empty() {
        let peers: Vec<&str> = profile.relationships.iter().map(String::as_str).collect();
        preamble.push_str(&format!("You collaborate with: {}\n", peers.join(", ")));
    }
    preamble
}

/// Prompt for a produce call, first draft or revision.
fn build_story_prompt(profile: &AgentProfile, ctx: &ProduceContext) -> String {
    let mut prompt = build_agent_preamble(profile);
    prompt.push_str(&format!("\nMission goal: {}\n", ctx.goal));

    if let Some(prior) = &ctx.prior {
        prompt.push_str(&format!(
            "\nYour previous draft (revision {}):\n{}\n",
            prior.revision, prior.content
        ));
        prompt.push_str("\nCritic feedback to address, oldest first:\n");
        for (i, feedback) in ctx.feedback.iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", i + 1, feedback));
        }
        prompt.push_str(
            "\nRevise your draft to address every point of feedback. \
             Improve the existing draft rather than starting over.\n",
        );
    } else {
        prompt.push_str("\nWrite your best response to the mission goal.\n");
    }

    prompt
}

/// Prompt for a review call, carrying the scoring rubric and the tag
/// protocol the verdict parser understands.
fn build_review_prompt(profile: &AgentProfile, goal: &str, output: &Output) -> String {
    let mut prompt = build_agent_preamble(profile);
    prompt.push_str(&format!(
        r#"
Mission goal: {goal}

Review the following output (revision {revision}):

---
{content}
---

Score each category from 1 to 10:
- Goal Coverage: does the output fulfil the mission goal?
- Language Clarity: is the writing clear and well structured?
- Creativity: is the approach original and engaging?

Then give a short summary of your judgment, and end your review with
exactly one of these tags on its own line:
- #APPROVED if the output meets the bar
- #REVISION_REQUIRED if specific, fixable problems remain
- #REJECTED if the output is fundamentally unsalvageable
"#,
        goal = goal,
        revision = output.revision,
        content = output.content,
    ));
    prompt
}
