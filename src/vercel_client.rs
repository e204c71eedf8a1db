use std::collections::HashMap;
use std::path::Path;

use reqwest::{Method, Response, multipart};
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::config::{Config, DeployedArtifact, FunctionSpec};
use crate::env;
use crate::error::{DeployerError, Result};
use crate::packaging;
use crate::provider::{Provider, function_env, select_functions};

const VERCEL_API_URL: &str = "https://api.vercel.com";
const DEFAULT_TARGET: &str = "production";

/// Deploy functions to Vercel.
///
/// Requires a bearer token; the project is resolved from `VERCEL_PROJECT_ID`
/// or looked up (and created if absent) by project name. Per-function
/// failures are logged and skipped; a deployment record is written only if
/// at least one function succeeded.
pub async fn deploy(
    config: &mut Config,
    config_file: &Path,
    function_name: Option<&str>,
    env_file: Option<&Path>,
) -> Result<bool> {
    let env_vars = env::load_env_vars(env_file);

    let Some(token) = env_vars.get("VERCEL_TOKEN").cloned() else {
        return Err(DeployerError::CredentialsMissing(
            "Vercel token not found. Set VERCEL_TOKEN environment variable.".to_string(),
        ));
    };

    let api = VercelApi {
        http: reqwest::Client::new(),
        token,
        org_id: env_vars.get("VERCEL_ORG_ID").cloned(),
        base_url: env_vars
            .get("VERCEL_API_URL")
            .cloned()
            .unwrap_or_else(|| VERCEL_API_URL.to_string()),
    };

    if config.functions.is_empty() {
        error!("No functions defined in configuration");
        return Ok(false);
    }
    let functions = select_functions(config, function_name)?;

    let project_id = match env_vars.get("VERCEL_PROJECT_ID").cloned() {
        Some(id) => id,
        None => api.ensure_project(&config.project).await?,
    };

    let mut deployed = Vec::new();
    for func in &functions {
        match deploy_function(&api, &project_id, func, env_file).await {
            Ok(artifact) => {
                info!("Successfully deployed function '{}' to Vercel", func.name);
                deployed.push(artifact);
            }
            Err(err) => error!("Failed to deploy function '{}': {}", func.name, err),
        }
    }

    if deployed.is_empty() {
        return Ok(false);
    }
    config.add_deployment_record(config_file, Provider::Vercel, function_name, deployed)?;
    Ok(true)
}

async fn deploy_function(
    api: &VercelApi,
    project_id: &str,
    func: &FunctionSpec,
    env_file: Option<&Path>,
) -> Result<DeployedArtifact> {
    let func_env = function_env(func, env_file);

    info!("Creating deployment package for '{}'", func.name);
    let zip_path = packaging::create_deployment_package(
        Path::new(&func.path),
        packaging::DEFAULT_EXCLUDES,
    )?;

    info!("Deploying '{}' to Vercel", func.name);
    // Env var propagation is best effort and never blocks the deployment.
    if let Err(err) = api.set_environment_variables(project_id, &func_env).await {
        warn!("Failed to set environment variables: {}", err);
    }

    let outcome = api.create_deployment(func, project_id, &zip_path).await;

    // The artifact is removed whether or not the provider call succeeded.
    if let Err(err) = std::fs::remove_file(&zip_path) {
        warn!(
            "Failed to remove deployment package {}: {}",
            zip_path.display(),
            err
        );
    }
    outcome
}

struct VercelApi {
    http: reqwest::Client,
    token: String,
    org_id: Option<String>,
    base_url: String,
}

impl VercelApi {
    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token);
        if let Some(org_id) = &self.org_id {
            builder = builder.header("X-Vercel-Org-Id", org_id);
        }
        builder
    }

    /// Look the project up by name among the account's projects, creating it
    /// when no match exists. Returns the project id.
    async fn ensure_project(&self, project_name: &str) -> Result<String> {
        let response = self.request(Method::GET, "/v9/projects").send().await?;
        let response = check_status(response, "list projects").await?;
        let body: Value = response.json().await?;

        if let Some(projects) = body.get("projects").and_then(Value::as_array) {
            for project in projects {
                if project.get("name").and_then(Value::as_str) == Some(project_name) {
                    if let Some(id) = project.get("id").and_then(Value::as_str) {
                        return Ok(id.to_string());
                    }
                }
            }
        }

        info!("Creating Vercel project '{}'", project_name);
        let response = self
            .request(Method::POST, "/v9/projects")
            .json(&json!({ "name": project_name, "framework": null }))
            .send()
            .await?;
        let response = check_status(response, "create project").await?;
        let body: Value = response.json().await?;
        body.get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                DeployerError::ProviderRequest("project creation response missing id".to_string())
            })
    }

    /// Upsert the project's environment variables: keys that already exist
    /// are patched in place, new keys are created for all three targets.
    async fn set_environment_variables(
        &self,
        project_id: &str,
        env_vars: &HashMap<String, String>,
    ) -> Result<()> {
        if env_vars.is_empty() {
            return Ok(());
        }

        let env_path = format!("/v9/projects/{project_id}/env");
        let response = self.request(Method::GET, &env_path).send().await?;
        let response = check_status(response, "list environment variables").await?;
        let body: Value = response.json().await?;

        let existing: Vec<(String, String)> = body
            .get("envs")
            .and_then(Value::as_array)
            .map(|envs| {
                envs.iter()
                    .filter_map(|env| {
                        Some((
                            env.get("key")?.as_str()?.to_string(),
                            env.get("id")?.as_str()?.to_string(),
                        ))
                    })
                    .collect()
            })
            .unwrap_or_default();

        for (key, value) in env_vars {
            if let Some((_, env_id)) = existing.iter().find(|(k, _)| k == key) {
                let response = self
                    .request(Method::PATCH, &format!("{env_path}/{env_id}"))
                    .json(&json!({ "value": value }))
                    .send()
                    .await?;
                check_status(response, "update environment variable").await?;
            } else {
                let response = self
                    .request(Method::POST, &env_path)
                    .json(&json!({
                        "key": key,
                        "value": value,
                        "target": ["production", "preview", "development"],
                    }))
                    .send()
                    .await?;
                check_status(response, "create environment variable").await?;
            }
        }
        Ok(())
    }

    /// Multipart upload of the archive plus deployment metadata.
    async fn create_deployment(
        &self,
        func: &FunctionSpec,
        project_id: &str,
        zip_path: &Path,
    ) -> Result<DeployedArtifact> {
        let zip_bytes = std::fs::read(zip_path)?;
        let file_name = zip_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "deployment.zip".to_string());

        let meta = json!({
            "name": func.name,
            "projectId": project_id,
            "target": func.target.clone().unwrap_or_else(|| DEFAULT_TARGET.to_string()),
        });
        let part = multipart::Part::bytes(zip_bytes)
            .file_name(file_name)
            .mime_str("application/zip")?;
        let form = multipart::Form::new()
            .text("meta", meta.to_string())
            .part("file", part);

        let response = self
            .http
            .post(format!("{}/v13/deployments", self.base_url))
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await?;
        let response = check_status(response, "create deployment").await?;
        let body: Value = response.json().await?;

        Ok(DeployedArtifact {
            name: func.name.clone(),
            version: None,
            arn: None,
            url: body.get("url").and_then(Value::as_str).map(str::to_string),
            deployment_id: body.get("id").and_then(Value::as_str).map(str::to_string),
        })
    }
}

async fn check_status(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(DeployerError::ProviderRequest(format!(
        "{what} returned {status}: {body}"
    )))
}
