use std::fs;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use colored::Colorize;
use oss_store::{FsObjectStore, VersionedStore};
use oss_sync::{Cancellation, Reconciler, SyncAction, SyncError, SyncPlan, SyncReport};

use crate::cli::*;
use crate::config::AppConfig;

pub fn run_command(cli: Cli, config: &AppConfig) -> anyhow::Result<()> {
    match cli.command {
        Command::Put(args) => cmd_put(config, args),
        Command::Get(args) => cmd_get(config, args),
        Command::Log(args) => cmd_log(config, args),
        Command::Ls(args) => cmd_ls(config, args),
        Command::Plan(args) => cmd_plan(config, args),
        Command::Sync(args) => cmd_sync(config, args),
    }
}

fn open_side(config: &AppConfig, side: Side) -> anyhow::Result<Arc<VersionedStore>> {
    let section = config.side(side);
    let raw = FsObjectStore::open(&section.root)
        .with_context(|| format!("opening {side} store at {}", section.root.display()))?;
    let store = VersionedStore::open(Arc::new(raw), section.prefix.clone())
        .with_context(|| format!("loading {side} perspective"))?;
    Ok(Arc::new(store))
}

fn open_reconciler(config: &AppConfig) -> anyhow::Result<Reconciler> {
    let source = open_side(config, Side::Source)?;
    let destination = open_side(config, Side::Destination)?;
    Ok(Reconciler::new(source, destination)?)
}

fn cmd_put(config: &AppConfig, args: PutArgs) -> anyhow::Result<()> {
    let store = open_side(config, args.side)?;
    let data =
        fs::read(&args.file).with_context(|| format!("reading {}", args.file.display()))?;
    let entry = match args.version {
        Some(version) => store.put_version(&args.key, version, &data)?,
        None => store.put(&args.key, &data)?,
    };
    println!(
        "{} Stored {} v{} ({}) on {}",
        "✓".green().bold(),
        entry.object_key.bold(),
        entry.version.to_string().yellow(),
        entry.hash.short_hex().dimmed(),
        args.side
    );
    Ok(())
}

fn cmd_get(config: &AppConfig, args: GetArgs) -> anyhow::Result<()> {
    let store = open_side(config, args.side)?;
    let data = match args.version {
        Some(version) => store.get_version(&args.key, version)?,
        None => store.get(&args.key)?,
    };
    match &args.out {
        Some(path) => {
            fs::write(path, &data).with_context(|| format!("writing {}", path.display()))?;
            println!("{} Wrote {} bytes to {}", "✓".green().bold(), data.len(), path.display());
        }
        None => std::io::stdout().write_all(&data)?,
    }
    Ok(())
}

fn cmd_log(config: &AppConfig, args: LogArgs) -> anyhow::Result<()> {
    let store = open_side(config, args.side)?;
    let history = store.history(&args.key)?;
    for (i, entry) in history.iter().enumerate().rev() {
        let version = format!("v{}", entry.version);
        if i + 1 == history.len() {
            println!("{}  {}  ({})", version.yellow().bold(), entry.hash, "latest".green());
        } else {
            println!("{}  {}", version.yellow(), entry.hash.to_string().dimmed());
        }
    }
    Ok(())
}

fn cmd_ls(config: &AppConfig, args: LsArgs) -> anyhow::Result<()> {
    let store = open_side(config, args.side)?;
    let mut count = 0usize;
    for entry in store.perspective().iter_latest() {
        println!(
            "{}  {}  {}",
            format!("v{}", entry.version).yellow(),
            entry.hash.short_hex().dimmed(),
            entry.object_key
        );
        count += 1;
    }
    if count == 0 {
        println!("No objects on {}.", args.side);
    }
    Ok(())
}

fn cmd_plan(config: &AppConfig, args: PlanArgs) -> anyhow::Result<()> {
    let reconciler = open_reconciler(config)?;
    let plan = reconciler.plan();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&plan);
    }
    Ok(())
}

fn print_plan(plan: &SyncPlan) {
    if plan.is_empty() {
        println!("{} Replicas agree.", "✓".green().bold());
        return;
    }
    for action in &plan.actions {
        match action {
            SyncAction::CopyToDestination { object_key, entries } => {
                println!("  {} {} {}", "→".green(), object_key, versions(entries).dimmed());
            }
            SyncAction::CopyToSource { object_key, entries } => {
                println!("  {} {} {}", "←".cyan(), object_key, versions(entries).dimmed());
            }
            SyncAction::Conflict(conflict) => {
                println!("  {} {}", "✗".red().bold(), conflict);
            }
        }
    }
}

fn versions(entries: &[oss_types::Entry]) -> String {
    let list: Vec<String> = entries.iter().map(|e| format!("v{}", e.version)).collect();
    list.join(", ")
}

fn cmd_sync(config: &AppConfig, args: SyncArgs) -> anyhow::Result<()> {
    let reconciler = open_reconciler(config)?;
    let cancel = match args.timeout {
        Some(secs) => Cancellation::with_timeout(Duration::from_secs(secs)),
        None => Cancellation::new(),
    };
    match reconciler.sync_with(&cancel) {
        Ok(report) => {
            if report.copied() == 0 {
                println!("{} Replicas already agree.", "✓".green().bold());
            } else {
                print_report(&report);
                println!("{} Synchronized.", "✓".green().bold());
            }
            Ok(())
        }
        Err(SyncError::Unresolved(report)) => {
            print_report(&report);
            bail!(
                "{} conflict(s) and {} failed transfer(s) left unresolved",
                report.conflicts.len(),
                report.failures.len()
            )
        }
        Err(SyncError::Cancelled(report)) => {
            print_report(&report);
            bail!("sync timed out with {} object(s) not attempted", report.skipped.len())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_report(report: &SyncReport) {
    for entry in &report.copied_to_destination {
        println!("  {} {}", "→".green(), entry);
    }
    for entry in &report.copied_to_source {
        println!("  {} {}", "←".cyan(), entry);
    }
    for conflict in &report.conflicts {
        println!("  {} {}", "✗ conflict".red().bold(), conflict);
    }
    for failure in &report.failures {
        println!("  {} {}", "✗ failed".red(), failure);
    }
    for key in &report.skipped {
        println!("  {} {}", "- skipped".yellow(), key);
    }
}
