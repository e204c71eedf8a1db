use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    serverless_deployer::run().await
}
