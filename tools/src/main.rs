use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use glob::Pattern;
use scenepack_tools::{format_report, inspect_container, measure_container, InspectReport};
use tracing::info;
use tracing_subscriber::EnvFilter;
use wire::Limits;

#[derive(Parser)]
#[command(
    name = "scenepack-tools",
    version,
    about = "scenepack container inspection tools"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Inspect container layout and per-entity sizes.
    Inspect {
        /// Path to a container, or a directory of containers.
        path: PathBuf,
        /// Optional glob filter when inspecting a directory.
        #[arg(long)]
        glob: Option<String>,
        /// Sort inspected containers.
        #[arg(long, value_enum)]
        sort: Option<InspectSort>,
        /// Limit the number of inspected containers (after sorting).
        #[arg(long)]
        limit: Option<usize>,
        /// Print reports as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print per-entity logical sizes after parsing.
    Measure {
        /// Path to the container.
        path: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum InspectSort {
    Size,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let limits = Limits::default();
    match cli.command {
        Command::Inspect {
            path,
            glob,
            sort,
            limit,
            json,
        } => {
            if path.is_dir() {
                let entries = collect_container_entries(&path, glob.as_deref())?;
                let mut entries = maybe_sort_entries(entries, sort);
                let limit = limit.or(sort.map(|InspectSort::Size| 10));
                if let Some(limit) = limit {
                    entries.truncate(limit);
                }
                info!(containers = entries.len(), dir = %path.display(), "inspecting");
                for entry in entries {
                    let report = inspect_path(&entry.path, &limits)?;
                    if !json {
                        println!("== {} ({} bytes) ==", entry.path.display(), entry.size);
                    }
                    print_report(&report, json)?;
                }
            } else {
                let report = inspect_path(&path, &limits)?;
                print_report(&report, json)?;
            }
        }
        Command::Measure { path } => {
            let bytes =
                fs::read(&path).with_context(|| format!("read container {}", path.display()))?;
            let sizes = measure_container(&bytes, &limits)?;
            let total: usize = sizes.iter().map(|(_, size)| size).sum();
            for (name, size) in &sizes {
                println!("{name}: {size} bytes");
            }
            println!("total: {total} bytes");
        }
    }
    Ok(())
}

fn inspect_path(path: &Path, limits: &Limits) -> Result<InspectReport> {
    let bytes = fs::read(path).with_context(|| format!("read container {}", path.display()))?;
    inspect_container(&bytes, limits).with_context(|| format!("inspect {}", path.display()))
}

fn print_report(report: &InspectReport, json: bool) -> Result<()> {
    if json {
        let json = serde_json::to_string_pretty(report).context("serialize json")?;
        println!("{json}");
    } else {
        print!("{}", format_report(report));
    }
    Ok(())
}

struct ContainerEntry {
    path: PathBuf,
    size: u64,
}

fn collect_container_entries(dir: &Path, glob: Option<&str>) -> Result<Vec<ContainerEntry>> {
    let mut entries = Vec::new();
    let pattern = match glob {
        Some(value) => Some(Pattern::new(value).context("invalid glob pattern")?),
        None => None,
    };

    for entry in fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(pattern) = &pattern {
            let matches_path = pattern.matches_path(&path);
            let matches_name = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| pattern.matches(name));
            if !matches_path && !matches_name {
                continue;
            }
        }
        let size = entry.metadata()?.len();
        entries.push(ContainerEntry { path, size });
    }
    Ok(entries)
}

fn maybe_sort_entries(
    mut entries: Vec<ContainerEntry>,
    sort: Option<InspectSort>,
) -> Vec<ContainerEntry> {
    match sort {
        Some(InspectSort::Size) => {
            entries.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));
        }
        None => {
            entries.sort_by(|a, b| a.path.cmp(&b.path));
        }
    }
    entries
}
