use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DeployerError, Result};
use crate::provider::Provider;

pub const DEFAULT_CONFIG_FILE: &str = "serverless.yml";

/// Project configuration persisted as `serverless.yml`.
///
/// The file is the sole source of truth and is rewritten wholesale on every
/// mutation. Single user, single process; no locking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub project: String,
    pub provider: Provider,
    pub created_at: String,
    #[serde(default)]
    pub functions: Vec<FunctionSpec>,
    #[serde(default)]
    pub deployments: Vec<DeploymentRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_file: Option<String>,
    /// Per-function provider override, informational for `list`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provider>,
    /// Vercel deployment target; defaults to "production".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// One entry of the append-only deployment history, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub id: String,
    pub timestamp: String,
    pub provider: Provider,
    pub functions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<DeployedArtifact>,
}

/// Provider-reported identifiers for one deployed function. AWS fills
/// `version`/`arn`, Vercel fills `url`/`deployment_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployedArtifact {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<String>,
}

impl Config {
    pub fn load(config_file: &Path) -> Result<Self> {
        if !config_file.exists() {
            return Err(DeployerError::ConfigNotFound(
                config_file.display().to_string(),
            ));
        }
        let content = std::fs::read_to_string(config_file)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    pub fn save(&self, config_file: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(config_file, content)?;
        Ok(())
    }

    /// Build a fresh configuration with one example function and no history.
    pub fn init(name: &str, provider: Provider) -> Self {
        Config {
            project: name.to_string(),
            provider,
            created_at: chrono::Utc::now().to_rfc3339(),
            functions: vec![FunctionSpec {
                name: "example-function".to_string(),
                path: "./src/handler.py".to_string(),
                handler: None,
                memory: Some(128),
                timeout: Some(30),
                runtime: None,
                env_file: Some(".env".to_string()),
                provider: None,
                target: None,
            }],
            deployments: Vec::new(),
        }
    }

    /// Record a deployment at the head of the history and persist the whole
    /// config immediately.
    ///
    /// The id is `deploy-N` where N is the list length at insertion time, not
    /// a durable counter, so deleting or reordering entries renumbers later
    /// ones. Known quirk, kept as documented behavior.
    pub fn add_deployment_record(
        &mut self,
        config_file: &Path,
        provider: Provider,
        function_name: Option<&str>,
        artifacts: Vec<DeployedArtifact>,
    ) -> Result<String> {
        let functions = match function_name {
            Some(name) => vec![name.to_string()],
            None => self.functions.iter().map(|f| f.name.clone()).collect(),
        };

        let record = DeploymentRecord {
            id: format!("deploy-{}", self.deployments.len() + 1),
            timestamp: chrono::Utc::now().to_rfc3339(),
            provider,
            functions,
            artifacts,
        };

        let id = record.id.clone();
        self.deployments.insert(0, record);
        self.save(config_file)?;
        Ok(id)
    }
}
