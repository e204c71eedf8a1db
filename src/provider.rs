use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{Config, FunctionSpec};
use crate::error::{DeployerError, Result};
use crate::{aws_client, vercel_client};

/// The closed set of deployment targets. Adding a provider means adding a
/// variant here and an arm in [`Provider::deploy`]; call sites stay untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aws,
    Vercel,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Aws => write!(f, "aws"),
            Provider::Vercel => write!(f, "vercel"),
        }
    }
}

impl Provider {
    /// Deploy the configured functions (optionally filtered to one by name)
    /// to this provider. Returns `Ok(true)` when at least one function was
    /// deployed and recorded, `Ok(false)` when none succeeded.
    pub async fn deploy(
        self,
        config: &mut Config,
        config_file: &Path,
        function_name: Option<&str>,
        env_file: Option<&Path>,
    ) -> Result<bool> {
        match self {
            Provider::Aws => {
                aws_client::deploy(config, config_file, function_name, env_file).await
            }
            Provider::Vercel => {
                vercel_client::deploy(config, config_file, function_name, env_file).await
            }
        }
    }
}

/// Environment variables for one function: its own `env_file` when
/// configured, else the deploy-wide one, else nothing.
pub(crate) fn function_env(
    func: &FunctionSpec,
    env_file: Option<&Path>,
) -> std::collections::HashMap<String, String> {
    func.env_file
        .as_deref()
        .map(Path::new)
        .or(env_file)
        .map(crate::env::read_env_file)
        .unwrap_or_default()
}

/// Pick the functions a deploy run should touch. A filter that matches
/// nothing aborts the whole run before any packaging happens.
pub(crate) fn select_functions(
    config: &Config,
    function_name: Option<&str>,
) -> Result<Vec<FunctionSpec>> {
    match function_name {
        Some(name) => {
            let selected: Vec<FunctionSpec> = config
                .functions
                .iter()
                .filter(|f| f.name == name)
                .cloned()
                .collect();
            if selected.is_empty() {
                return Err(DeployerError::FunctionNotFound(name.to_string()));
            }
            Ok(selected)
        }
        None => Ok(config.functions.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_matching_nothing_is_an_error() {
        let config = Config::init("demo", Provider::Aws);
        let err = select_functions(&config, Some("missing")).unwrap_err();
        assert!(matches!(err, DeployerError::FunctionNotFound(_)));
    }

    #[test]
    fn filter_selects_named_function_only() {
        let mut config = Config::init("demo", Provider::Aws);
        let mut extra = config.functions[0].clone();
        extra.name = "second".to_string();
        config.functions.push(extra);

        let selected = select_functions(&config, Some("second")).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "second");

        let all = select_functions(&config, None).unwrap();
        assert_eq!(all.len(), 2);
    }
}
