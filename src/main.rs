use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use colored::*;
use repo_showcase::actors::{RefreshSupervisor, RefreshSupervisorArgs, RefreshSupervisorMessage};
use repo_showcase::catalog::{self, ProfileSummary, ViewState};
use repo_showcase::cli::{Cli, Command, ListArgs};
use repo_showcase::display;
use repo_showcase::refresher::Refresher;
use repo_showcase::server::{start_snapshot_server, ServerState};
use repo_showcase::store::SnapshotStore;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Some(Command::Refresh) => run_refresh(&cli).await,
        Some(Command::List(args)) => run_list(&cli, args).await,
        None => run_server(&cli).await,
    }
}

async fn run_refresh(cli: &Cli) -> anyhow::Result<()> {
    let refresher = Refresher::new(cli.refresh_config()?)?;
    let report = refresher
        .run()
        .await
        .with_context(|| format!("refresh for '{}' failed, snapshot left untouched", cli.owner))?;

    println!(
        "✅ Wrote {} ({} repositories, {} maintainers) in {} ms",
        cli.snapshot.display(),
        report.repo_count,
        report.maintainers_resolved,
        report.elapsed_ms
    );
    Ok(())
}

async fn run_list(cli: &Cli, args: &ListArgs) -> anyhow::Result<()> {
    let store = SnapshotStore::new(&cli.snapshot);
    let snapshot = store
        .load()
        .await
        .with_context(|| format!("could not read snapshot at {}", cli.snapshot.display()))?;
    let pinned = catalog::load_pinned(&args.pinned).await;

    let mut state = ViewState::default()
        .with_search(args.search.clone())
        .with_sort(args.sort)
        .with_link(args.link);
    if let Some(tag) = &args.tag {
        state = state.with_tag(tag.clone());
    }

    let now = Utc::now();
    display::print_profile(&ProfileSummary::from_snapshot(&snapshot), snapshot.generated_at, now);
    let view = catalog::render(&snapshot.repos, &pinned, &state);
    display::print_view(&view, state.link, &cli.owner, now);
    Ok(())
}

async fn run_server(cli: &Cli) -> anyhow::Result<()> {
    let port = cli.serve.port()?;
    let schedule = cli.serve.schedule()?;
    let refresher = Refresher::new(cli.refresh_config()?)?;
    let store = refresher.store().clone();

    println!("{}", "Repository Showcase Server".bold().green());
    println!("{}\n", "=".repeat(50).dimmed());

    let supervisor = RefreshSupervisor::spawn_scheduled(RefreshSupervisorArgs {
        job: Arc::new(refresher),
        schedule,
        run_on_start: true,
    })
    .await
    .context("failed to start refresh supervisor")?;

    println!(
        "✅ Refreshing '{}' ({:?}, every {}s)",
        cli.owner,
        schedule.policy(),
        schedule.period().as_secs()
    );
    println!("📡 Serving {} on port {}", cli.snapshot.display(), port);
    println!("\nPress Ctrl+C to stop the server\n");

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        println!("\n🛑 Shutting down server...");
    };

    let served = start_snapshot_server(ServerState { store }, port, shutdown).await;

    match supervisor
        .call(
            RefreshSupervisorMessage::GetStats,
            Some(std::time::Duration::from_secs(5)),
        )
        .await
    {
        Ok(ractor::rpc::CallResult::Success(stats)) => {
            println!("\n📊 Final Statistics:");
            println!("Refresh runs: {} started, {} succeeded, {} failed", stats.runs_started, stats.runs_succeeded, stats.runs_failed);
            println!("Overlapping triggers skipped: {}", stats.overlaps_skipped);
            if let Some(error) = &stats.last_error {
                println!("Last error: {}", error.red());
            }
        }
        Ok(_) => eprintln!("Timeout getting final statistics"),
        Err(e) => eprintln!("Failed to get final statistics: {}", e),
    }

    let _ = supervisor.send_message(RefreshSupervisorMessage::Shutdown);
    served.context("snapshot server failed")?;

    println!("✅ Server stopped");
    Ok(())
}
