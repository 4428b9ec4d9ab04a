//! Agent configuration: which scripted agents the server streams.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config (JSON): {0}")]
    Parse(#[from] serde_json::Error),

    #[error("config has no agents")]
    NoAgents,

    #[error("agent id must not be empty")]
    EmptyAgentId,

    #[error("duplicate agent id: {0}")]
    DuplicateAgent(String),
}

/// One scripted agent: the text it streams and how it is paced.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AgentSpec {
    pub id: String,
    /// Thread used when the run request names none.
    #[serde(default)]
    pub thread_id: Option<String>,
    pub text: String,
    /// Delay before each chunk; falls back to the server-wide setting.
    #[serde(default)]
    pub chunk_delay_ms: Option<u64>,
}

impl AgentSpec {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            thread_id: None,
            text: text.into(),
            chunk_delay_ms: None,
        }
    }

    #[must_use]
    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    #[must_use]
    pub fn with_chunk_delay_ms(mut self, ms: u64) -> Self {
        self.chunk_delay_ms = Some(ms);
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub agents: Vec<AgentSpec>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let cfg: Config = serde_json::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agents.is_empty() {
            return Err(ConfigError::NoAgents);
        }
        let mut seen = HashSet::new();
        for agent in &self.agents {
            if agent.id.is_empty() {
                return Err(ConfigError::EmptyAgentId);
            }
            if !seen.insert(agent.id.as_str()) {
                return Err(ConfigError::DuplicateAgent(agent.id.clone()));
            }
        }
        Ok(())
    }

    /// Agents keyed by id.
    pub fn into_agent_map(self) -> HashMap<String, AgentSpec> {
        self.agents
            .into_iter()
            .map(|a| (a.id.clone(), a))
            .collect()
    }
}

impl Default for Config {
    /// The three demo backends: LangChain, Mastra, CrewAI.
    fn default() -> Self {
        Self {
            agents: vec![
                AgentSpec::new(
                    "langchain",
                    "LangChain adapter active. Simulating reasoning chain execution.",
                )
                .with_thread_id("langchain-thread")
                .with_chunk_delay_ms(80),
                AgentSpec::new(
                    "mastra",
                    "Mastra adapter active. Executing structured workflow simulation.",
                )
                .with_thread_id("mastra-thread")
                .with_chunk_delay_ms(60),
                AgentSpec::new(
                    "crewai",
                    "CrewAI adapter active. Coordinating multiple agents simulation.",
                )
                .with_thread_id("crewai-thread")
                .with_chunk_delay_ms(80),
            ],
        }
    }
}
