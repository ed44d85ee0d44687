use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::Context;
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use blogmap_core::{
    CheckpointStore, DiscoveryEngine, DiscoveryReport, EngineConfig, ProgressEvent, RunSummary,
    StateError, StopReason, Strategy, load_seeds, print_banner,
};
use blogmap_crawler::{Fetcher, FetcherConfig};

mod commands;

#[tokio::main]
async fn main() {
    let cmd = commands::command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    if !quiet {
        print_banner();
    }

    if chosen_command.subcommand().is_none() {
        return;
    }

    tracing_subscriber::fmt::init();

    let outcome = match chosen_command.subcommand() {
        Some(("discover", sub_matches)) => handle_discover(sub_matches, quiet).await,
        Some(("export", sub_matches)) => handle_export(sub_matches),
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if let Err(err) = outcome {
        eprintln!("{} {err:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

async fn handle_discover(args: &ArgMatches, quiet: bool) -> anyhow::Result<()> {
    let seeds_path = args.get_one::<PathBuf>("seeds").expect("has default");
    let max_blogs = *args.get_one::<u64>("max-blogs").expect("has default");
    let strategy: Strategy = args
        .get_one::<String>("strategy")
        .expect("has default")
        .parse()?;
    let data_dir = expand_dir(args.get_one::<String>("data-dir").expect("has default"));
    let results_path = data_dir.join("results.json");

    let config = EngineConfig {
        max_blogs,
        strategy,
        requeue_errors: args.get_flag("requeue-errors"),
        ..Default::default()
    };
    let store = CheckpointStore::new(&data_dir);

    if args.get_flag("fresh")
        && let Some(archived) = store.archive(Some(&results_path))?
        && !quiet
    {
        println!("archived previous crawl to {}", archived.display());
    }

    let fetcher = Fetcher::new(FetcherConfig::default())?;

    let mut engine = if let Some(path) = args.get_one::<PathBuf>("checkpoint") {
        let state = CheckpointStore::load_exact(path)
            .with_context(|| format!("loading checkpoint {}", path.display()))?;
        DiscoveryEngine::resume(fetcher, config, store, state)
    } else if let Some(target) = args.get_one::<u64>("resume-near") {
        let path = store
            .find_nearest(*target)?
            .with_context(|| format!("no checkpoint to resume from in {}", data_dir.display()))?;
        if !quiet {
            println!("resuming from {}", path.display());
        }
        let state = CheckpointStore::load_exact(&path)?;
        DiscoveryEngine::resume(fetcher, config, store, state)
    } else if store.exists() {
        match store.load() {
            Ok(state) => {
                if !quiet {
                    println!(
                        "resuming crawl: {} accepted, {} queued",
                        state.total_accepted,
                        state.queue.len()
                    );
                }
                DiscoveryEngine::resume(fetcher, config, store, state)
            }
            Err(StateError::Corrupt { path, .. }) => {
                eprintln!(
                    "{} checkpoint {} unusable and no valid archive found, starting fresh",
                    "warning:".yellow().bold(),
                    path.display()
                );
                DiscoveryEngine::new(fetcher, config, store)
            }
            Err(err) => return Err(err.into()),
        }
    } else {
        DiscoveryEngine::new(fetcher, config, store)
    };

    let seeds = load_seeds(seeds_path)?;
    engine.seed(&seeds);

    // First ctrl-c stops the run cleanly after the in-flight candidate.
    let cancel = engine.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nstopping after current candidate...");
            cancel.store(true, Ordering::Relaxed);
        }
    });

    let spinner = if quiet {
        None
    } else {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("static template"),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));

        let progress = spinner.clone();
        engine.set_progress(Box::new(move |event| match event {
            ProgressEvent::Processing { domain, depth, queued } => {
                progress.set_message(format!("probing {domain} (depth {depth}, {queued} queued)"));
            }
            ProgressEvent::Accepted { domain, name, total_accepted } => {
                progress.println(format!(
                    "  {} {} {} [{}]",
                    "+".green().bold(),
                    domain.bright_white(),
                    name.dimmed(),
                    total_accepted
                ));
            }
            ProgressEvent::Rejected { .. } => {}
            ProgressEvent::Checkpointed { total_accepted } => {
                progress.set_message(format!("checkpoint written at {total_accepted} accepted"));
            }
        }));
        Some(spinner)
    };

    let summary = engine.run().await?;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let report = DiscoveryReport::from_state(engine.state());
    report.write_json(&results_path)?;

    print_summary(&summary, &results_path, quiet);
    Ok(())
}

fn handle_export(args: &ArgMatches) -> anyhow::Result<()> {
    let data_dir = expand_dir(args.get_one::<String>("data-dir").expect("has default"));
    let output = expand_dir(args.get_one::<String>("output").expect("has default"));

    let store = CheckpointStore::new(&data_dir);
    let state = store
        .load()
        .with_context(|| format!("no crawl to export in {}", data_dir.display()))?;

    let report = DiscoveryReport::from_state(&state);
    report.write_json(&output)?;
    println!(
        "exported {} blogs and {} edges to {}",
        report.blogs.len().to_string().green(),
        report.edges.len(),
        output.display()
    );
    Ok(())
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

fn expand_dir(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

fn print_summary(summary: &RunSummary, results_path: &std::path::Path, quiet: bool) {
    if quiet {
        return;
    }
    let reason = match summary.stop_reason {
        StopReason::TargetReached => "target reached".green(),
        StopReason::QueueExhausted => "frontier exhausted".yellow(),
        StopReason::Cancelled => "cancelled".red(),
    };
    println!("\n{} ({})", "discovery complete".bright_white().bold(), reason);
    println!("  processed: {}", summary.total_processed);
    println!("  accepted:  {}", summary.total_accepted.to_string().green());
    println!("  queued:    {}", summary.queued_remaining);
    println!("  results:   {}", results_path.display());
}
