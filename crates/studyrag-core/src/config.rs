//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates nested keys). Retrieval profiles are
//! validated into an immutable `intent -> (priorities, limit)` table at load.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::types::{GenerationParams, Intent};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    /// Defaults overlaid with an inline TOML document. No files or env vars.
    pub fn from_toml_str(document: &str) -> anyhow::Result<Self> {
        let figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::string(document));
        let config = Self { figment };
        config.validate_for_env("test")?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        let settings = self.settings()?;
        settings.retrieval_profiles()?;
        if matches!(env, "prod" | "production") && settings.llm.base_url.trim().is_empty() {
            return Err(Error::InvalidConfig("llm.base_url must be set in production".into()).into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub retrieval: RetrievalSettings,
    pub generation: GenerationSettings,
    pub stream: StreamSettings,
    pub llm: LlmSettings,
    pub data: DataSettings,
}

impl Settings {
    /// Validate the raw profile table into the typed, immutable form.
    pub fn retrieval_profiles(&self) -> Result<RetrievalProfiles> {
        let threshold = self.retrieval.similarity_threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(Error::InvalidConfig(format!("retrieval.similarity_threshold must be >= 0, got {threshold}")));
        }
        if self.retrieval.overfetch_factor == 0 {
            return Err(Error::InvalidConfig("retrieval.overfetch_factor must be >= 1".into()));
        }
        let mut profiles = BTreeMap::new();
        for (key, raw) in &self.retrieval.profiles {
            let intent: Intent = key
                .parse()
                .map_err(|_| Error::InvalidConfig(format!("retrieval.profiles: unknown intent '{key}'")))?;
            if raw.limit == 0 {
                return Err(Error::InvalidConfig(format!("retrieval.profiles.{key}.limit must be >= 1")));
            }
            profiles.insert(intent, RetrievalProfile { priorities: raw.priorities.clone(), default_limit: raw.limit });
        }
        Ok(RetrievalProfiles { profiles })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub similarity_threshold: f32,
    /// Candidates requested from search per result kept.
    pub overfetch_factor: usize,
    pub profiles: BTreeMap<String, ProfileSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSettings {
    pub priorities: Vec<String>,
    pub limit: usize,
}

fn profile(priorities: &[&str], limit: usize) -> ProfileSettings {
    ProfileSettings { priorities: priorities.iter().map(|s| s.to_string()).collect(), limit }
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        let profiles = BTreeMap::from([
            (Intent::AnswerGeneration.as_str().to_string(), profile(&["marking_scheme", "notes", "question_paper"], 10)),
            (Intent::AnswerEvaluation.as_str().to_string(), profile(&["marking_scheme"], 5)),
            (Intent::DoubtClarification.as_str().to_string(), profile(&["notes", "marking_scheme"], 8)),
            (Intent::QuestionGeneration.as_str().to_string(), profile(&["notes", "question_paper"], 10)),
            (Intent::ExamPaperGeneration.as_str().to_string(), profile(&["notes", "question_paper", "marking_scheme"], 15)),
        ]);
        Self { similarity_threshold: 0.7, overfetch_factor: 2, profiles }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalProfile {
    pub priorities: Vec<String>,
    pub default_limit: usize,
}

/// Immutable per-intent retrieval table.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalProfiles {
    profiles: BTreeMap<Intent, RetrievalProfile>,
}

/// Limit used when an intent has no profile.
pub const FALLBACK_RETRIEVAL_LIMIT: usize = 10;

impl RetrievalProfiles {
    pub fn get(&self, intent: Intent) -> Option<&RetrievalProfile> {
        self.profiles.get(&intent)
    }

    pub fn priorities(&self, intent: Intent) -> &[String] {
        self.profiles.get(&intent).map(|p| p.priorities.as_slice()).unwrap_or(&[])
    }

    pub fn default_limit(&self, intent: Intent) -> usize {
        self.profiles.get(&intent).map(|p| p.default_limit).unwrap_or(FALLBACK_RETRIEVAL_LIMIT)
    }

    pub fn covers(&self, intent: Intent) -> bool {
        self.profiles.contains_key(&intent)
    }
}

impl Default for RetrievalProfiles {
    fn default() -> Self {
        let mut profiles = BTreeMap::new();
        for (key, raw) in RetrievalSettings::default().profiles {
            if let Ok(intent) = key.parse::<Intent>() {
                profiles.insert(intent, RetrievalProfile { priorities: raw.priorities, default_limit: raw.limit });
            }
        }
        Self { profiles }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub answer: GenerationParams,
    pub evaluation: GenerationParams,
    pub doubt_notes: GenerationParams,
    pub doubt_general: GenerationParams,
    pub questions: GenerationParams,
    pub classification: GenerationParams,
    pub stream: GenerationParams,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            answer: GenerationParams::new(0.3, 2000),
            evaluation: GenerationParams::new(0.2, 1500),
            doubt_notes: GenerationParams::new(0.7, 1500),
            doubt_general: GenerationParams::new(0.8, 1500),
            questions: GenerationParams::new(0.7, 2500),
            classification: GenerationParams::new(0.1, 200),
            stream: GenerationParams::new(0.7, 1500),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    pub history_limit: usize,
    pub channel_capacity: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self { history_limit: 10, channel_capacity: 32 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self { base_url: "http://localhost:11434".to_string(), model: "qwen2.5:14b".to_string(), timeout_secs: 120 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub index_dir: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { index_dir: "./data/index".to_string() }
    }
}

impl DataSettings {
    pub fn index_path(&self) -> PathBuf {
        expand_path(&self.index_dir)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
