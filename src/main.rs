use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use steward::api::{serve, AppState};
use steward::environment::ProcessEnvironment;
use steward::observability::init_tracing;
use steward::plugins::PluginRegistry;
use steward::skills::SkillDiscovery;
use steward::Config;

#[derive(Parser)]
#[command(name = "steward")]
#[command(about = "Control plane for an AI agent runtime", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP control plane
    Serve {
        #[arg(long, help = "Config file (.toml, .yaml or .yml)")]
        config: Option<PathBuf>,
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        bind: Option<String>,
    },
    /// Print the plugin catalog with validation results
    Plugins {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print skills discovered on disk
    Skills {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, port, bind } => {
            let mut config = Config::load(config.as_deref());
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            let state = AppState::builder(config).build().await;
            serve(state).await?;
        }
        Commands::Plugins { config } => print_plugins(&Config::load(config.as_deref())),
        Commands::Skills { config } => print_skills(&Config::load(config.as_deref())).await?,
    }

    Ok(())
}

fn print_plugins(config: &Config) {
    let mut registry =
        PluginRegistry::from_manifest(&config.plugins.manifest, Arc::new(ProcessEnvironment));
    let plugins = registry.list(None);
    if plugins.is_empty() {
        println!("No plugins declared in {}", config.plugins.manifest.display());
        return;
    }

    for plugin in plugins {
        println!(
            "{:<24} {:<14} {}",
            plugin.id,
            plugin.category.as_str(),
            if plugin.configured {
                "configured"
            } else {
                "not configured"
            }
        );
        for issue in &plugin.validation_errors {
            println!("    error   {}: {}", issue.field, issue.message);
        }
        for issue in &plugin.validation_warnings {
            println!("    warning {}: {}", issue.field, issue.message);
        }
    }
}

async fn print_skills(config: &Config) -> Result<()> {
    let discovery = SkillDiscovery::new(config.skills.clone());
    let skills = discovery.discover(&config.workspace_dir(), None).await?;
    if skills.is_empty() {
        println!("No skills found");
        return Ok(());
    }

    for skill in skills {
        let marker = if skill.enabled { "+" } else { "-" };
        println!("{} {:<24} {}", marker, skill.id, skill.description);
    }
    Ok(())
}
