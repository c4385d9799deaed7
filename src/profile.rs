//! Agent profiles ("hats") and team assembly.
//!
//! A profile is an immutable description of one team member, owned by the
//! external configuration store. The orchestrator holds read-only snapshots
//! for the mission's duration and never edits them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::errors::MissionError;

/// The roles a mission requires.
///
/// `Agent` covers hats with auxiliary roles (planner, researcher, ...) that
/// may appear in a roster but are not bound by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentRole {
    Storyteller,
    Critic,
    Agent,
}

impl Serialize for AgentRole {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AgentRole {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        // FromStr is infallible: unrecognised roles map to Agent.
        Ok(s.parse().unwrap_or(AgentRole::Agent))
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentRole::Storyteller => write!(f, "storyteller"),
            AgentRole::Critic => write!(f, "critic"),
            AgentRole::Agent => write!(f, "agent"),
        }
    }
}

impl FromStr for AgentRole {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "storyteller" => AgentRole::Storyteller,
            "critic" => AgentRole::Critic,
            _ => AgentRole::Agent,
        })
    }
}

impl Default for AgentRole {
    fn default() -> Self {
        AgentRole::Agent
    }
}

/// Immutable description of one team member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Unique identifier, doubles as the profile's file stem in the store.
    pub id: String,
    pub name: String,
    /// Reference to the generation model backing this agent.
    pub model: String,
    pub instructions: String,
    #[serde(default)]
    pub role: AgentRole,
    /// Tool identifiers available to this agent.
    #[serde(default)]
    pub tools: BTreeSet<String>,
    /// Peer profile ids this agent collaborates with.
    #[serde(default)]
    pub relationships: BTreeSet<String>,
}

impl AgentProfile {
    /// Create a minimal profile; used by tests and the scripted backends.
    pub fn new(id: &str, name: &str, role: AgentRole) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            model: "gpt-3.5-turbo".to_string(),
            instructions: String::new(),
            role,
            tools: BTreeSet::new(),
            relationships: BTreeSet::new(),
        }
    }

    pub fn with_instructions(mut self, instructions: &str) -> Self {
        self.instructions = instructions.to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_tools(mut self, tools: impl IntoIterator<Item = String>) -> Self {
        self.tools = tools.into_iter().collect();
        self
    }

    pub fn with_relationships(mut self, peers: impl IntoIterator<Item = String>) -> Self {
        self.relationships = peers.into_iter().collect();
        self
    }
}

/// Read access to the external configuration store.
pub trait ProfileStore {
    fn get_profile(&self, id: &str) -> Result<AgentProfile>;

    /// List all profile ids known to the store.
    fn list_profiles(&self) -> Result<Vec<String>>;
}

/// Profile store backed by a directory of `<id>.json` files.
pub struct DirProfileStore {
    hats_dir: PathBuf,
}

impl DirProfileStore {
    pub fn new(hats_dir: &Path) -> Self {
        Self {
            hats_dir: hats_dir.to_path_buf(),
        }
    }

    fn profile_path(&self, id: &str) -> PathBuf {
        self.hats_dir.join(format!("{id}.json"))
    }
}

impl ProfileStore for DirProfileStore {
    fn get_profile(&self, id: &str) -> Result<AgentProfile> {
        let path = self.profile_path(id);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read profile file {}", path.display()))?;
        let profile: AgentProfile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse profile file {}", path.display()))?;
        Ok(profile)
    }

    fn list_profiles(&self) -> Result<Vec<String>> {
        if !self.hats_dir.exists() {
            return Ok(Vec::new());
        }
        let mut ids: Vec<String> = std::fs::read_dir(&self.hats_dir)
            .context("Failed to read hats directory")?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|e| e == "json").unwrap_or(false))
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        ids.sort();
        Ok(ids)
    }
}

/// The bound role assignments for one mission.
#[derive(Debug, Clone)]
pub struct Team {
    pub storyteller: AgentProfile,
    pub critic: AgentProfile,
}

impl Team {
    /// Bind each required role to a profile from the roster.
    ///
    /// The first profile carrying each role wins, so roster order is
    /// significant. Fails before any capability call if a role is unbound.
    pub fn assemble(roster: &[AgentProfile]) -> Result<Self, MissionError> {
        let storyteller = roster
            .iter()
            .find(|p| p.role == AgentRole::Storyteller)
            .cloned()
            .ok_or(MissionError::TeamAssembly {
                role: AgentRole::Storyteller,
            })?;
        let critic = roster
            .iter()
            .find(|p| p.role == AgentRole::Critic)
            .cloned()
            .ok_or(MissionError::TeamAssembly {
                role: AgentRole::Critic,
            })?;
        Ok(Self {
            storyteller,
            critic,
        })
    }

    /// Team members in roster order (storyteller first, as produced).
    pub fn members(&self) -> Vec<&AgentProfile> {
        vec![&self.storyteller, &self.critic]
    }
}
