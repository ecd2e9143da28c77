//! Build configuration
//!
//! Defaults can be overridden from the environment, and the CLI overrides both.

use crate::common::error::{Error, Result};
use crate::common::identifier::BuildIdentifier;
use crate::consts::{DEFAULT_PROJECT_NAME, ENV_INJECT, ENV_PROJECT, ENV_UNIQUE_IDENTIFIER};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Fixed identifier; a fresh one is generated when absent
    pub unique_identifier: Option<String>,
    /// Project name embedded in generated identifiers
    pub project_name: String,
    /// Whether support classes are injected into the output
    pub inject_injectables: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            unique_identifier: None,
            project_name: DEFAULT_PROJECT_NAME.to_string(),
            inject_injectables: true,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `EXPECT_PLATFORM_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like `from_env`, reading variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(identifier) = lookup(ENV_UNIQUE_IDENTIFIER).filter(|s| !s.is_empty()) {
            config.unique_identifier = Some(identifier);
        }
        if let Some(project) = lookup(ENV_PROJECT).filter(|s| !s.is_empty()) {
            config.project_name = project;
        }
        if let Some(inject) = lookup(ENV_INJECT) {
            config.inject_injectables = parse_flag(ENV_INJECT, &inject)?;
        }
        Ok(config)
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.unique_identifier = Some(identifier.into());
        self
    }

    pub fn with_project_name(mut self, project_name: impl Into<String>) -> Self {
        self.project_name = project_name.into();
        self
    }

    pub fn inject_injectables(mut self, enabled: bool) -> Self {
        self.inject_injectables = enabled;
        self
    }

    /// Resolve the identifier for this build
    pub fn build_context(&self) -> Result<BuildContext> {
        let identifier = match &self.unique_identifier {
            Some(value) => BuildIdentifier::new(value.clone())?,
            None => BuildIdentifier::generate(&self.project_name),
        };
        Ok(BuildContext { identifier, inject_injectables: self.inject_injectables })
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::config_error(format!("{} must be a boolean, got '{}'", key, other))),
    }
}

/// Per-build values shared by the rewriter and the injector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    pub identifier: BuildIdentifier,
    pub inject_injectables: bool,
}

impl BuildContext {
    pub fn new(identifier: BuildIdentifier, inject_injectables: bool) -> Self {
        Self { identifier, inject_injectables }
    }
}
