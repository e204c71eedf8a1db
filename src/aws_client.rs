use std::collections::HashMap;
use std::path::Path;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_lambda::Client;
use aws_sdk_lambda::config::Credentials;
use aws_sdk_lambda::error::DisplayErrorContext;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::{Environment, FunctionCode, Runtime};
use tracing::{error, info, warn};

use crate::config::{Config, DeployedArtifact, FunctionSpec};
use crate::env;
use crate::error::{DeployerError, Result};
use crate::packaging;
use crate::provider::{Provider, function_env, select_functions};

const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_HANDLER: &str = "handler.lambda_handler";
const DEFAULT_RUNTIME: &str = "python3.9";
const DEFAULT_TIMEOUT: i32 = 30;
const DEFAULT_MEMORY: i32 = 128;

/// Deploy functions to AWS Lambda.
///
/// Credentials are resolved from the merged environment before anything is
/// packaged; a missing key pair aborts the whole run. Each function is then
/// packaged and pushed in turn, with per-function failures logged and
/// skipped. A deployment record is written only if at least one succeeded.
pub async fn deploy(
    config: &mut Config,
    config_file: &Path,
    function_name: Option<&str>,
    env_file: Option<&Path>,
) -> Result<bool> {
    let env_vars = env::load_env_vars(env_file);

    let access_key = env_vars.get("AWS_ACCESS_KEY_ID").cloned();
    let secret_key = env_vars.get("AWS_SECRET_ACCESS_KEY").cloned();
    let (Some(access_key), Some(secret_key)) = (access_key, secret_key) else {
        return Err(DeployerError::CredentialsMissing(
            "AWS credentials not found. Set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY \
             environment variables."
                .to_string(),
        ));
    };
    let region = env_vars
        .get("AWS_REGION")
        .cloned()
        .unwrap_or_else(|| DEFAULT_REGION.to_string());
    let role = env_vars
        .get("AWS_LAMBDA_ROLE_ARN")
        .cloned()
        .unwrap_or_default();

    if config.functions.is_empty() {
        error!("No functions defined in configuration");
        return Ok(false);
    }
    let functions = select_functions(config, function_name)?;

    let credentials = Credentials::new(access_key, secret_key, None, None, "serverless-deployer");
    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region))
        .credentials_provider(credentials)
        .load()
        .await;
    let client = Client::new(&sdk_config);

    let mut deployed = Vec::new();
    for func in &functions {
        match deploy_function(&client, func, &role, env_file).await {
            Ok(artifact) => {
                info!("Successfully deployed function '{}'", func.name);
                deployed.push(artifact);
            }
            Err(err) => error!("Failed to deploy function '{}': {}", func.name, err),
        }
    }

    if deployed.is_empty() {
        return Ok(false);
    }
    config.add_deployment_record(config_file, Provider::Aws, function_name, deployed)?;
    Ok(true)
}

async fn deploy_function(
    client: &Client,
    func: &FunctionSpec,
    role: &str,
    env_file: Option<&Path>,
) -> Result<DeployedArtifact> {
    let func_env = function_env(func, env_file);

    info!("Creating deployment package for '{}'", func.name);
    let zip_path = packaging::create_deployment_package(
        Path::new(&func.path),
        packaging::DEFAULT_EXCLUDES,
    )?;

    let outcome = push_function(client, func, role, &zip_path, func_env).await;

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

/// Create the function if Lambda has never seen it, otherwise publish new
/// code and push the configuration fields separately.
async fn push_function(
    client: &Client,
    func: &FunctionSpec,
    role: &str,
    zip_path: &Path,
    func_env: HashMap<String, String>,
) -> Result<DeployedArtifact> {
    let zip_bytes = std::fs::read(zip_path)?;
    // Lambda wants env vars nested as {"Variables": {...}}.
    let environment = Environment::builder().set_variables(Some(func_env)).build();

    let handler = func
        .handler
        .clone()
        .unwrap_or_else(|| DEFAULT_HANDLER.to_string());
    let runtime = func
        .runtime
        .clone()
        .unwrap_or_else(|| DEFAULT_RUNTIME.to_string());
    let timeout = func.timeout.unwrap_or(DEFAULT_TIMEOUT);
    let memory = func.memory.unwrap_or(DEFAULT_MEMORY);

    match client.get_function().function_name(&func.name).send().await {
        Ok(_) => {
            info!("Updating existing function '{}'", func.name);
            let output = client
                .update_function_code()
                .function_name(&func.name)
                .zip_file(Blob::new(zip_bytes))
                .publish(true)
                .send()
                .await
                .map_err(provider_err)?;
            client
                .update_function_configuration()
                .function_name(&func.name)
                .handler(handler)
                .timeout(timeout)
                .memory_size(memory)
                .environment(environment)
                .send()
                .await
                .map_err(provider_err)?;
            Ok(DeployedArtifact {
                name: func.name.clone(),
                version: output.version().map(str::to_string),
                arn: output.function_arn().map(str::to_string),
                url: None,
                deployment_id: None,
            })
        }
        Err(err) => {
            let err = err.into_service_error();
            if !err.is_resource_not_found_exception() {
                return Err(provider_err(err));
            }
            info!("Creating new function '{}'", func.name);
            let output = client
                .create_function()
                .function_name(&func.name)
                .runtime(Runtime::from(runtime.as_str()))
                .role(role)
                .handler(handler)
                .code(FunctionCode::builder().zip_file(Blob::new(zip_bytes)).build())
                .timeout(timeout)
                .memory_size(memory)
                .environment(environment)
                .send()
                .await
                .map_err(provider_err)?;
            Ok(DeployedArtifact {
                name: func.name.clone(),
                version: output.version().map(str::to_string),
                arn: output.function_arn().map(str::to_string),
                url: None,
                deployment_id: None,
            })
        }
    }
}

fn provider_err<E>(err: E) -> DeployerError
where
    E: std::error::Error + Send + Sync + 'static,
{
    DeployerError::ProviderRequest(DisplayErrorContext(err).to_string())
}
