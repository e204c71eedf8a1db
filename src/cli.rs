use std::io::Write as _;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::config::{self, Config};
use crate::error::Result;
use crate::provider::Provider;

#[derive(Parser)]
#[command(
    name = "serverless-deployer",
    version,
    about = "Serverless Deployer - Simplify your serverless deployments."
)]
pub struct CLI {
    #[arg(short, long, action = clap::ArgAction::Count, help = "Increase verbosity (-v, -vv, etc.)")]
    pub verbose: u8,
    #[arg(
        long,
        default_value = config::DEFAULT_CONFIG_FILE,
        help = "Path to the project configuration file"
    )]
    pub config_file: PathBuf,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize a new serverless project with configuration.
    Init {
        #[arg(long, help = "Name of your serverless project")]
        name: Option<String>,
        #[arg(long, value_enum, help = "Default deployment provider")]
        provider: Option<Provider>,
    },
    /// Deploy functions to the specified provider.
    Deploy {
        #[arg(long, value_enum, help = "Provider to deploy to (overrides config default)")]
        provider: Option<Provider>,
        #[arg(
            short = 'f',
            long = "function",
            help = "Deploy specific function instead of all functions"
        )]
        function: Option<String>,
        #[arg(long, help = "Path to .env file for environment variables")]
        env_file: Option<PathBuf>,
    },
    /// List all configured functions.
    List,
    /// Show deployment history.
    History,
    /// Roll back to a previous deployment.
    Rollback {
        #[arg(long, help = "ID of the deployment to roll back to")]
        deployment_id: String,
    },
}

pub async fn execute(cli: CLI) -> Result<()> {
    let CLI {
        config_file,
        command,
        ..
    } = cli;

    match command {
        Command::Init { name, provider } => init(&config_file, name, provider),
        Command::Deploy {
            provider,
            function,
            env_file,
        } => deploy(&config_file, provider, function.as_deref(), env_file.as_deref()).await,
        Command::List => list(&config_file),
        Command::History => {
            println!("Deployment history feature coming soon!");
            Ok(())
        }
        Command::Rollback { deployment_id: _ } => {
            println!("Rollback feature coming soon!");
            Ok(())
        }
    }
}

fn init(config_file: &Path, name: Option<String>, provider: Option<Provider>) -> Result<()> {
    if config_file.exists() {
        let overwrite = confirm(&format!(
            "{} already exists. Overwrite?",
            config_file.display()
        ))?;
        if !overwrite {
            println!("Aborted.");
            return Ok(());
        }
    }

    let name = match name {
        Some(name) => name,
        None => prompt("Project name")?,
    };
    let provider = match provider {
        Some(provider) => provider,
        None => prompt_provider()?,
    };

    let config = Config::init(&name, provider);
    config.save(config_file)?;

    println!("✅ Initialized serverless project: {name}");
    println!();
    println!("Next steps:");
    println!(
        "  1. Edit {} to configure your functions",
        config_file.display()
    );
    println!("  2. Run 'serverless-deployer deploy' to deploy your functions");
    Ok(())
}

async fn deploy(
    config_file: &Path,
    provider: Option<Provider>,
    function: Option<&str>,
    env_file: Option<&Path>,
) -> Result<()> {
    let mut config = Config::load(config_file)?;
    // Provider from the command line wins over the config default.
    let provider = provider.unwrap_or(config.provider);

    println!("Deploying to {provider}...");
    let succeeded = provider
        .deploy(&mut config, config_file, function, env_file)
        .await?;

    if succeeded {
        println!("✅ Deployment completed successfully!");
    } else {
        println!("❌ Deployment failed. Check logs for details.");
    }
    Ok(())
}

fn list(config_file: &Path) -> Result<()> {
    let config = Config::load(config_file)?;

    if config.functions.is_empty() {
        println!("No functions configured in {}", config_file.display());
        return Ok(());
    }

    println!("Configured Functions");
    for (idx, func) in config.functions.iter().enumerate() {
        println!("{}. {}", idx + 1, func.name);
        println!("  Path: {}", func.path);
        println!("  Provider: {}", func.provider.unwrap_or(config.provider));
        if let Some(memory) = func.memory {
            println!("  Memory: {memory}MB");
        }
        if let Some(timeout) = func.timeout {
            println!("  Timeout: {timeout}s");
        }
        println!();
    }
    Ok(())
}

fn prompt(message: &str) -> Result<String> {
    loop {
        print!("{message}: ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if std::io::stdin().read_line(&mut line)? == 0 {
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
        }
        let value = line.trim().to_string();
        if !value.is_empty() {
            return Ok(value);
        }
    }
}

fn prompt_provider() -> Result<Provider> {
    loop {
        match prompt("Default provider (aws/vercel)")?.to_lowercase().as_str() {
            "aws" => return Ok(Provider::Aws),
            "vercel" => return Ok(Provider::Vercel),
            _ => println!("Please answer 'aws' or 'vercel'."),
        }
    }
}

fn confirm(message: &str) -> Result<bool> {
    print!("{message} [y/N]: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(matches!(
        line.trim().to_lowercase().as_str(),
        "y" | "yes"
    ))
}
