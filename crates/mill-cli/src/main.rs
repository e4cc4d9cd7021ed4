//! mill CLI - builds the projects of a JSON manifest in dependency order.

mod collaborators;
mod manifest;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use mill_core::app::{App, AppBuilder};
use mill_core::config::{DEFAULT_CONFIG_FILE, MillConfig};
use mill_core::domain::{BuildToolKind, ProjectId};

use collaborators::{CommandExecutor, DirectoryCheckout, LogNotifier};
use manifest::Manifest;

#[derive(Debug, Parser)]
#[command(name = "mill", version, about = "Continuous-build orchestration")]
struct Cli {
    /// Project manifest (JSON)
    #[arg(long, default_value = "mill.json")]
    manifest: PathBuf,

    /// Configuration file (TOML); `MILL_*` environment variables override it
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the dependency-respecting build order
    Order,
    /// Build one project
    Build {
        name: String,
        /// Build even if a build was requested moments ago
        #[arg(long)]
        force: bool,
    },
    /// Build every project in dependency order
    BuildAll {
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = MillConfig::load_from(&cli.config).context("loading configuration")?;
    let app = build_app(config)?;

    let manifest = Manifest::load(&cli.manifest).await?;
    let ids = manifest.register(&app.orchestrator()).await?;
    let names: Vec<(ProjectId, String)> = ids.into_iter().map(|(n, id)| (id, n)).collect();

    match cli.command {
        Commands::Order => {
            for id in app.orchestrator().build_order().await? {
                println!("{}", name_of(&names, id));
            }
        }
        Commands::Build { name, force } => {
            let id = names
                .iter()
                .find(|(_, n)| *n == name)
                .map(|(id, _)| *id)
                .with_context(|| format!("no project named `{name}` in the manifest"))?;
            app.orchestrator().enqueue_build(id, force).await?;
            run_to_completion(&app).await?;
            report(&app, &[id], &names).await?;
        }
        Commands::BuildAll { force } => {
            app.orchestrator().enqueue_all_builds(force).await?;
            run_to_completion(&app).await?;
            let order = app.orchestrator().build_order().await?;
            report(&app, &order, &names).await?;
        }
    }
    Ok(())
}

fn build_app(config: MillConfig) -> Result<App> {
    let mut builder = AppBuilder::new(config)
        .checkout(Arc::new(DirectoryCheckout))
        .notifications(Arc::new(LogNotifier));
    for kind in BuildToolKind::ALL {
        builder = builder.register_executor(kind, Arc::new(CommandExecutor::new(kind)))?;
    }
    Ok(builder.expect_tools(&BuildToolKind::ALL).build()?)
}

/// Start the workers and wait until nothing is queued or running.
async fn run_to_completion(app: &App) -> Result<()> {
    let workers = app.start_workers();
    loop {
        let counts = app.orchestrator().queue_counts().await;
        if counts.queued == 0 && counts.active == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    workers.shutdown_and_join().await;
    Ok(())
}

fn name_of(names: &[(ProjectId, String)], id: ProjectId) -> &str {
    names
        .iter()
        .find(|(candidate, _)| *candidate == id)
        .map(|(_, name)| name.as_str())
        .unwrap_or("?")
}

async fn report(app: &App, projects: &[ProjectId], names: &[(ProjectId, String)]) -> Result<()> {
    let orchestrator = app.orchestrator();
    for id in projects {
        let project = orchestrator.get_project(*id).await?;
        match orchestrator.latest_build_result(*id).await {
            Ok(result) => println!(
                "{:<24} {:<12} {:?} (exit {}, {})",
                name_of(names, *id),
                format!("{:?}", project.state),
                result.outcome,
                result.exit_code,
                result.id
            ),
            Err(e) if e.is_not_found() => println!("{:<24} not built", name_of(names, *id)),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
