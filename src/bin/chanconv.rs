use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chanconv", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply a JSON recipe of channel operations to an image.
    Apply(ApplyArgs),
    /// List the built-in kernel presets.
    Presets,
}

#[derive(Parser, Debug)]
struct ApplyArgs {
    /// Input PNG or JPEG.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Recipe JSON.
    #[arg(long)]
    recipe: PathBuf,

    /// Output image path. Defaults to `<input stem>-modified.<ext>` next to the input.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Engine config JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write every transition frame as a numbered PNG into this directory.
    #[arg(long)]
    frames_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Apply(args) => cmd_apply(args),
        Command::Presets => cmd_presets(),
    }
}

fn cmd_apply(args: ApplyArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => chanconv::EngineConfig::from_json_path(path)?,
        None => chanconv::EngineConfig::default(),
    };
    // Without a frame directory nobody watches the animation.
    if args.frames_dir.is_none() {
        config.transition.enabled = false;
    }

    let recipe = chanconv::Recipe::from_json_path(&args.recipe)?;
    let mut editor = chanconv::Editor::new(config)?;

    let mut sink: Box<dyn chanconv::FrameSink> = match &args.frames_dir {
        Some(dir) => Box::new(chanconv::PngSequenceSink::new(dir.clone())?),
        None => Box::new(chanconv::LatestFrameSink::new()),
    };

    editor.load_path(&args.in_path, sink.as_mut())?;
    let report = recipe
        .apply(&mut editor, sink.as_mut())
        .with_context(|| format!("apply recipe '{}'", args.recipe.display()))?;

    let out = match args.out {
        Some(out) => {
            editor.save_to(&out)?;
            out
        }
        None => {
            let dir = args.in_path.parent().unwrap_or_else(|| Path::new("."));
            editor.save_to_dir(dir)?
        }
    };

    eprintln!(
        "applied {} step(s), skipped {}, {} frame(s)",
        report.applied, report.skipped, report.frames
    );
    eprintln!("wrote {}", out.display());
    Ok(())
}

fn cmd_presets() -> anyhow::Result<()> {
    for name in chanconv::PRESET_NAMES {
        let kernel = chanconv::preset(name)?;
        println!("{name} ({}x{})", kernel.rows(), kernel.cols());
    }
    Ok(())
}
