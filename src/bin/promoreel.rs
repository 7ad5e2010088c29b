use std::{
    fs::File,
    io::{BufReader, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "promoreel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record a project end to end against the simulated capture platform.
    Simulate(SimulateArgs),
    /// Print the advisory video length for each scene.
    Estimate(EstimateArgs),
}

#[derive(Parser, Debug)]
struct SimulateArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Laid-out height of one screenshot, in pixels.
    #[arg(long, default_value_t = 615.0)]
    shot_height: f64,

    /// Visible height of the phone screen, in pixels.
    #[arg(long, default_value_t = 584.0)]
    viewport_height: f64,

    /// Directory to write `app-promo.<ext>` into.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Give up if the recording is still running after this many virtual seconds.
    #[arg(long, default_value_t = 3600)]
    limit_secs: u64,
}

#[derive(Parser, Debug)]
struct EstimateArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    #[arg(long, default_value_t = 615.0)]
    shot_height: f64,

    #[arg(long, default_value_t = 584.0)]
    viewport_height: f64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Simulate(args) => cmd_simulate(args),
        Command::Estimate(args) => cmd_estimate(args),
    }
}

fn read_project_json(path: &Path) -> anyhow::Result<promoreel::ProjectFile> {
    let f = File::open(path).with_context(|| format!("open project '{}'", path.display()))?;
    let project = promoreel::ProjectFile::from_reader(BufReader::new(f))
        .with_context(|| format!("parse project '{}'", path.display()))?;
    Ok(project)
}

fn make_director(
    path: &Path,
    shot_height: f64,
    viewport_height: f64,
) -> anyhow::Result<promoreel::Director> {
    if !(shot_height > 0.0 && viewport_height > 0.0) {
        anyhow::bail!("shot and viewport heights must be positive");
    }
    let project = read_project_json(path)?;
    let probe = promoreel::UniformProbe {
        shot_height,
        viewport_height,
    };
    Ok(promoreel::Director::new(project, Box::new(probe))?)
}

fn cmd_simulate(args: SimulateArgs) -> anyhow::Result<()> {
    let mut director = make_director(&args.in_path, args.shot_height, args.viewport_height)?;
    let mut backend = promoreel::SimulatedBackend::new();

    director
        .start_recording(&mut backend)
        .context("start recording")?;
    let limit = promoreel::Millis(args.limit_secs.saturating_mul(1000));
    let finished_at = director.run_until_idle(limit)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for entry in director.timeline() {
        serde_json::to_writer(&mut out, entry).context("serialize timeline entry")?;
        writeln!(out).context("write timeline")?;
    }
    out.flush().context("flush timeline")?;

    let Some(artifact) = director.take_artifact() else {
        anyhow::bail!("recording finished without an artifact");
    };
    tracing::info!(
        %finished_at,
        bytes = artifact.len(),
        chunks = artifact.chunk_count,
        "recording finished"
    );

    if let Some(dir) = &args.out {
        let path = artifact.write_to(dir)?;
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

fn cmd_estimate(args: EstimateArgs) -> anyhow::Result<()> {
    let director = make_director(&args.in_path, args.shot_height, args.viewport_height)?;
    for (scene, secs) in director.scene_estimates() {
        println!("{scene}\t{secs:.1}s");
    }
    Ok(())
}
