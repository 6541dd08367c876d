use descent_syntax::{CompileOptions, Grammar, GrammarDescriptor, GrammarError, Veto};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to read grammar descriptor at {grammar_path}: {source}")]
    DescriptorReadError {
        grammar_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse grammar descriptor at {grammar_path}: {source}")]
    DescriptorParseError {
        grammar_path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid grammar: {0}")]
    Grammar(#[from] GrammarError),
}

/// Where to find a grammar descriptor and how to compile it.
///
/// ```toml
/// grammar_path = "~/grammars/select.json"
/// start_rule = "query"
/// lookahead_round_cap = 64
///
/// [[vetoes]]
/// rule = "selectStatement"
/// token = 2
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub grammar_path: PathBuf,

    /// Overrides the descriptor's start rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_rule: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookahead_round_cap: Option<usize>,

    /// Added to the descriptor's own vetoes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vetoes: Vec<Veto>,
}

impl Config {
    pub fn new(grammar_path: impl Into<PathBuf>) -> Self {
        Self {
            grammar_path: grammar_path.into(),
            start_rule: None,
            lookahead_round_cap: None,
            vetoes: Vec::new(),
        }
    }

    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        config.grammar_path =
            Self::expand_path(&config.grammar_path).unwrap_or(config.grammar_path);

        log::info!("Loaded config from {}", config_path.display());
        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/descent");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Read the JSON grammar descriptor at `grammar_path` and apply this
    /// config's start rule override and extra vetoes to it.
    pub fn load_descriptor(&self) -> Result<GrammarDescriptor, ConfigError> {
        let grammar_path = &self.grammar_path;
        let content = std::fs::read_to_string(grammar_path).map_err(|source| {
            ConfigError::DescriptorReadError {
                grammar_path: grammar_path.clone(),
                source,
            }
        })?;

        let mut descriptor: GrammarDescriptor =
            serde_json::from_str(&content).map_err(|source| {
                ConfigError::DescriptorParseError {
                    grammar_path: grammar_path.clone(),
                    source,
                }
            })?;

        if let Some(start_rule) = &self.start_rule {
            descriptor.start_rule = Some(start_rule.clone());
        }
        for veto in &self.vetoes {
            if !descriptor.vetoes.contains(veto) {
                descriptor.vetoes.push(veto.clone());
            }
        }

        log::info!(
            "Loaded grammar descriptor from {} ({} rules)",
            grammar_path.display(),
            descriptor.rules_names.len()
        );
        Ok(descriptor)
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            lookahead_round_cap: self.lookahead_round_cap,
        }
    }

    pub fn compile_grammar(&self) -> Result<Grammar, ConfigError> {
        let descriptor = self.load_descriptor()?;
        Ok(Grammar::compile_with(descriptor, &self.compile_options())?)
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}
