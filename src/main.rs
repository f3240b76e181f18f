use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use roster_chronicle::{
    diff, enrich, render_diff, render_history, write_json_atomic, write_text_atomic, AnimalId,
    DiffArtifact, JsonOutcomeSource, Snapshot, SnapshotStore, StoreConfig,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "roster-chronicle", version)]
#[command(about = "Diff shelter roster snapshots and reconstruct animal histories")]
struct Cli {
    /// Directory holding snapshot and diff files
    #[arg(long, global = true, env = "SNAPSHOT_DIR", default_value = "snapshots")]
    snapshot_dir: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Md,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare two snapshots
    Diff {
        /// Older snapshot file
        #[arg(required_unless_present = "latest")]
        old: Option<PathBuf>,

        /// Newer snapshot file
        #[arg(required_unless_present = "latest")]
        new: Option<PathBuf>,

        /// Diff the two most recent snapshots in the snapshot directory
        #[arg(long, conflicts_with_all = ["old", "new"])]
        latest: bool,

        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,

        /// Output path, or "-" for stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show one animal's history across all snapshots
    History {
        animal_id: String,

        #[arg(long, value_enum, default_value_t = Format::Md)]
        format: Format,

        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Include bio text for bio changes
        #[arg(long)]
        show_bio: bool,
    },

    /// Attach adoption/transfer outcomes to a diff's removed animals
    Enrich {
        /// Diff artifact to enrich in place (default: latest in the snapshot directory)
        diff: Option<PathBuf>,

        /// JSON array of outcome rows
        #[arg(long)]
        outcomes: PathBuf,
    },

    /// Render a diff artifact as a Markdown report
    Render {
        diff: PathBuf,

        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "roster_chronicle=debug"
    } else {
        "roster_chronicle=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn is_stdout(path: &Path) -> bool {
    path == Path::new("-")
}

/// Write to `output`, or to stdout when it is absent or "-".
fn emit(text: &str, output: Option<&Path>) -> Result<()> {
    match output.filter(|p| !is_stdout(p)) {
        Some(path) => {
            write_text_atomic(path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "Wrote output");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            if !text.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
        }
    }
    Ok(())
}

fn load_snapshot(path: &Path) -> Result<Snapshot> {
    Snapshot::load(path).with_context(|| format!("Failed to load snapshot {}", path.display()))
}

fn open_store(dir: &Path) -> Result<SnapshotStore> {
    SnapshotStore::open(StoreConfig {
        path: dir.to_path_buf(),
    })
    .with_context(|| format!("Failed to open snapshot directory {}", dir.display()))
}

fn run_diff(
    snapshot_dir: &Path,
    old: Option<PathBuf>,
    new: Option<PathBuf>,
    latest: bool,
    format: Format,
    output: Option<PathBuf>,
) -> Result<()> {
    let (old, new) = if latest {
        let store = open_store(snapshot_dir)?;
        match store.latest_pair()? {
            Some((old, new)) => (old.path, new.path),
            None => bail!(
                "Need at least two snapshots in {} to diff",
                snapshot_dir.display()
            ),
        }
    } else {
        match (old, new) {
            (Some(old), Some(new)) => (old, new),
            _ => bail!("Both OLD and NEW snapshot paths are required"),
        }
    };

    let old_snapshot = load_snapshot(&old)?;
    let new_snapshot = load_snapshot(&new)?;
    let pair = diff(&old_snapshot, &new_snapshot);
    info!(
        old = %pair.old_snapshot,
        new = %pair.new_snapshot,
        added = pair.summary.animals_added,
        removed = pair.summary.animals_removed,
        changed = pair.summary.animals_changed,
        "Diff complete"
    );

    let artifact = DiffArtifact::new(pair, chrono::Local::now().naive_local());
    match format {
        Format::Json => match output {
            Some(path) if is_stdout(&path) => {
                let text = serde_json::to_string_pretty(&artifact)?;
                emit(&text, None)
            }
            output => {
                let path = output.unwrap_or_else(|| SnapshotStore::diff_artifact_path(&old, &new));
                write_json_atomic(&path, &artifact)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!(path = %path.display(), "Saved diff artifact");
                Ok(())
            }
        },
        Format::Md => emit(&render_diff(&artifact), output.as_deref()),
    }
}

fn run_history(
    snapshot_dir: &Path,
    animal_id: &str,
    format: Format,
    output: Option<PathBuf>,
    show_bio: bool,
) -> Result<()> {
    let Some(identity) = AnimalId::parse(animal_id) else {
        bail!("Animal id must not be empty");
    };
    let store = open_store(snapshot_dir)?;
    let chain = store.history(&identity)?;
    if chain.is_empty() {
        warn!(animal_id = %identity, "No snapshots contained this animal");
    }

    let text = match format {
        Format::Json => serde_json::to_string_pretty(&chain)?,
        Format::Md => render_history(&chain, show_bio),
    };
    emit(&text, output.as_deref())
}

fn run_enrich(snapshot_dir: &Path, diff: Option<PathBuf>, outcomes: PathBuf) -> Result<()> {
    let path = match diff {
        Some(path) => path,
        None => match open_store(snapshot_dir)?.latest_diff()? {
            Some(path) => path,
            None => bail!("No diff artifacts found in {}", snapshot_dir.display()),
        },
    };
    if !outcomes.is_file() {
        bail!("Outcomes file not found: {}", outcomes.display());
    }

    let mut artifact = DiffArtifact::load(&path)
        .with_context(|| format!("Failed to load diff artifact {}", path.display()))?;
    let summary = enrich(&mut artifact, &JsonOutcomeSource::new(&outcomes))
        .with_context(|| format!("Failed to enrich {}", path.display()))?;

    write_json_atomic(&path, &artifact)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(
        path = %path.display(),
        removed = summary.total_removed,
        with_outcome = summary.with_outcome,
        without_outcome = summary.without_outcome,
        "Enriched diff artifact"
    );
    Ok(())
}

fn run_render(diff: &Path, output: Option<PathBuf>) -> Result<()> {
    let artifact = DiffArtifact::load(diff)
        .with_context(|| format!("Failed to load diff artifact {}", diff.display()))?;
    emit(&render_diff(&artifact), output.as_deref())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Diff {
            old,
            new,
            latest,
            format,
            output,
        } => run_diff(&cli.snapshot_dir, old, new, latest, format, output),
        Command::History {
            animal_id,
            format,
            output,
            show_bio,
        } => run_history(&cli.snapshot_dir, &animal_id, format, output, show_bio),
        Command::Enrich { diff, outcomes } => run_enrich(&cli.snapshot_dir, diff, outcomes),
        Command::Render { diff, output } => run_render(&diff, output),
    }
}
