use std::fs::File;
use std::io::Write;
use std::path::Path;

use clap::Parser;
use serverless_deployer::CLI;
use serverless_deployer::cli::Command;
use serverless_deployer::config::{Config, FunctionSpec};
use serverless_deployer::error::DeployerError;
use serverless_deployer::provider::Provider;
use serverless_deployer::{aws_client, vercel_client};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn write_function_source(dir: &Path, name: &str) -> String {
    let root = dir.join(name);
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("handler.py"), b"def handler(event, ctx): pass\n").unwrap();
    root.display().to_string()
}

fn write_env_file(path: &Path, lines: &[&str]) {
    let mut file = File::create(path).unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
}

#[test]
fn cli_parses_deploy_flags() {
    let cli = CLI::parse_from([
        "serverless-deployer",
        "deploy",
        "--provider",
        "vercel",
        "-f",
        "my-fn",
        "--env-file",
        "custom.env",
    ]);
    match cli.command {
        Command::Deploy {
            provider,
            function,
            env_file,
        } => {
            assert_eq!(provider, Some(Provider::Vercel));
            assert_eq!(function.as_deref(), Some("my-fn"));
            assert_eq!(env_file.as_deref(), Some(Path::new("custom.env")));
        }
        _ => panic!("expected deploy subcommand"),
    }
}

#[tokio::test]
async fn aws_deploy_with_unmatched_filter_aborts_before_packaging() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("serverless.yml");
    let env_path = dir.path().join(".env");
    write_env_file(
        &env_path,
        &[
            "AWS_ACCESS_KEY_ID=AKIATEST",
            "AWS_SECRET_ACCESS_KEY=secret",
        ],
    );

    let mut config = Config::init("filter-test", Provider::Aws);
    config.functions[0].name = "filter-test-fn".to_string();
    config.functions[0].path = write_function_source(dir.path(), "filter-test-fn");
    config.save(&config_path).unwrap();

    let err = aws_client::deploy(&mut config, &config_path, Some("missing"), Some(&env_path))
        .await
        .unwrap_err();
    assert!(matches!(err, DeployerError::FunctionNotFound(_)));

    // Nothing was packaged and no record was written.
    assert!(!Path::new("filter-test-fn-deployment.zip").exists());
    let reloaded = Config::load(&config_path).unwrap();
    assert!(reloaded.deployments.is_empty());
}

#[tokio::test]
async fn aws_deploy_without_credentials_fails_before_packaging() {
    unsafe {
        std::env::remove_var("AWS_ACCESS_KEY_ID");
        std::env::remove_var("AWS_SECRET_ACCESS_KEY");
    }
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("serverless.yml");
    let env_path = dir.path().join(".env");
    write_env_file(&env_path, &["# no credentials here"]);

    let mut config = Config::init("creds-test", Provider::Aws);
    config.save(&config_path).unwrap();

    let err = aws_client::deploy(&mut config, &config_path, None, Some(&env_path))
        .await
        .unwrap_err();
    assert!(matches!(err, DeployerError::CredentialsMissing(_)));
}

/// Minimal canned Vercel API: reads one request per connection and answers
/// by path, closing the connection after each response.
async fn serve_vercel_stub(listener: TcpListener) {
    loop {
        let Ok((mut stream, _)) = listener.accept().await else {
            return;
        };
        tokio::spawn(async move {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            // Read headers.
            let header_end = loop {
                let Ok(n) = stream.read(&mut chunk).await else {
                    return;
                };
                if n == 0 {
                    return;
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };

            let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
            let content_length = head
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    if name.eq_ignore_ascii_case("content-length") {
                        value.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
                .unwrap_or(0);

            // Drain the body so the client never sees a broken pipe.
            while buf.len() < header_end + content_length {
                let Ok(n) = stream.read(&mut chunk).await else {
                    return;
                };
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }

            let request_line = head.lines().next().unwrap_or_default();
            // Deployments for fn-b hit a server error; everything else is fine.
            let for_fn_b = buf.windows(4).any(|w| w == b"fn-b");
            let (status, body) = if request_line.contains("/v13/deployments") {
                if for_fn_b {
                    (
                        "500 Internal Server Error",
                        r#"{"error":{"message":"internal error"}}"#,
                    )
                } else {
                    ("200 OK", r#"{"id":"dpl_1","url":"fn-a.vercel.app"}"#)
                }
            } else if request_line.contains("/env") && request_line.starts_with("GET") {
                ("200 OK", r#"{"envs":[]}"#)
            } else if request_line.starts_with("GET /v9/projects") {
                ("200 OK", r#"{"projects":[]}"#)
            } else {
                ("200 OK", "{}")
            };
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        });
    }
}

#[tokio::test]
async fn vercel_deploy_records_partial_success() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(serve_vercel_stub(listener));

    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("serverless.yml");
    let env_path = dir.path().join(".env");
    write_env_file(
        &env_path,
        &[
            "VERCEL_TOKEN=test-token",
            "VERCEL_PROJECT_ID=proj_123",
            &format!("VERCEL_API_URL={base_url}"),
        ],
    );

    // Both functions package fine; the stub rejects fn-b's deployment with
    // a 500, so only fn-a survives.
    let mut config = Config::init("partial-test", Provider::Vercel);
    config.functions.clear();
    for name in ["fn-a", "fn-b"] {
        config.functions.push(FunctionSpec {
            name: name.to_string(),
            path: write_function_source(dir.path(), name),
            handler: None,
            memory: None,
            timeout: None,
            runtime: None,
            env_file: None,
            provider: None,
            target: None,
        });
    }
    config.save(&config_path).unwrap();

    let succeeded = vercel_client::deploy(&mut config, &config_path, None, Some(&env_path))
        .await
        .unwrap();
    assert!(succeeded);

    let reloaded = Config::load(&config_path).unwrap();
    assert_eq!(reloaded.deployments.len(), 1);
    let record = &reloaded.deployments[0];
    assert_eq!(record.id, "deploy-1");
    assert_eq!(record.provider, Provider::Vercel);
    assert_eq!(record.artifacts.len(), 1);
    assert_eq!(record.artifacts[0].name, "fn-a");
    assert_eq!(record.artifacts[0].deployment_id.as_deref(), Some("dpl_1"));
    assert_eq!(record.artifacts[0].url.as_deref(), Some("fn-a.vercel.app"));

    // Both archives were cleaned up, including the one whose deploy failed.
    assert!(!Path::new("fn-a-deployment.zip").exists());
    assert!(!Path::new("fn-b-deployment.zip").exists());
}

#[tokio::test]
async fn vercel_deploy_without_token_fails_fast() {
    unsafe {
        std::env::remove_var("VERCEL_TOKEN");
    }
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("serverless.yml");
    let env_path = dir.path().join(".env");
    write_env_file(&env_path, &["# empty"]);

    let mut config = Config::init("token-test", Provider::Vercel);
    config.save(&config_path).unwrap();

    let err = vercel_client::deploy(&mut config, &config_path, None, Some(&env_path))
        .await
        .unwrap_err();
    assert!(matches!(err, DeployerError::CredentialsMissing(_)));
}
