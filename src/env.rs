use std::collections::HashMap;
use std::path::Path;

/// Environment keys the deploy paths care about. Anything else in the
/// process environment is left alone.
const CREDENTIAL_KEYS: &[&str] = &[
    "AWS_ACCESS_KEY_ID",
    "AWS_SECRET_ACCESS_KEY",
    "AWS_REGION",
    "AWS_LAMBDA_ROLE_ARN",
    "VERCEL_TOKEN",
    "VERCEL_ORG_ID",
    "VERCEL_PROJECT_ID",
    "VERCEL_API_URL",
];

/// Read a `.env` file into a map.
///
/// Lines are `KEY=VALUE`; blank lines and `#` comments are skipped, and
/// surrounding single or double quotes around the value are stripped. A
/// missing or unreadable file yields an empty map.
pub fn read_env_file(env_file: &Path) -> HashMap<String, String> {
    let mut env_vars = HashMap::new();
    let Ok(content) = std::fs::read_to_string(env_file) else {
        return env_vars;
    };

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            env_vars.insert(key.trim().to_string(), value.to_string());
        }
    }

    env_vars
}

/// Resolve provider credentials from an optional `.env` file merged over the
/// process environment. Values from the file win over inherited ones.
pub fn load_env_vars(env_file: Option<&Path>) -> HashMap<String, String> {
    let file_vars = env_file.map(read_env_file).unwrap_or_default();

    let mut merged = HashMap::new();
    for key in CREDENTIAL_KEYS {
        let value = file_vars
            .get(*key)
            .cloned()
            .or_else(|| std::env::var(key).ok());
        if let Some(value) = value {
            merged.insert((*key).to_string(), value);
        }
    }

    merged
}
