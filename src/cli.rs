//! Command-line entry points: run a job file or place instances directly.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::job::{ScatterJobSpec, ScatterReport};
use crate::selection::ScatterMode;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    /// One instance per target vertex
    Vertex,
    /// One instance per target face
    Explode,
}

impl From<ModeArg> for ScatterMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Vertex => ScatterMode::VertexPlacement,
            ModeArg::Explode => ScatterMode::Explode,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scatter job described by a JSON file
    Run {
        /// Job specification file
        #[arg(long)]
        job: PathBuf,

        /// Override the report output path
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Scatter instances onto a target mesh
    Place {
        /// Target mesh (OBJ)
        #[arg(long)]
        target: PathBuf,

        /// Source object geometry (OBJ)
        #[arg(long)]
        source: Option<PathBuf>,

        /// Name of the source object
        #[arg(long, default_value = "source")]
        source_name: String,

        #[arg(long, value_enum, default_value_t = ModeArg::Vertex)]
        mode: ModeArg,

        #[arg(long, default_value_t = 1.0)]
        scale_min: f64,

        #[arg(long, default_value_t = 1.0)]
        scale_max: f64,

        /// Fixed seed for a reproducible layout
        #[arg(long)]
        seed: Option<u64>,

        /// Comma-separated vertex indices to target, 0-based in OBJ `v` line order
        #[arg(long, value_delimiter = ',')]
        vertices: Option<Vec<usize>>,

        /// Comma-separated face indices to target, 0-based in OBJ `f` line order
        #[arg(long, value_delimiter = ',')]
        faces: Option<Vec<usize>>,

        /// Report output path (JSON)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let spec = match cli.command {
        Commands::Run { job, out } => {
            let mut spec = ScatterJobSpec::from_file(&job)?;
            if out.is_some() {
                spec.report_path = out;
            }
            spec
        }
        Commands::Place {
            target,
            source,
            source_name,
            mode,
            scale_min,
            scale_max,
            seed,
            vertices,
            faces,
            out,
        } => ScatterJobSpec {
            target_path: target,
            source_path: source,
            source_name,
            mode: mode.into(),
            scale_min,
            scale_max,
            seed,
            vertices,
            faces,
            report_path: out,
        },
    };

    let report = spec.execute()?;
    print_summary(&report);

    if let Some(path) = &spec.report_path {
        report.save(path)?;
        log::info!("Wrote report to {:?}", path);
    }

    match &report.error {
        Some(error) => Err(anyhow::anyhow!("{}", error)),
        None => Ok(()),
    }
}

fn print_summary(report: &ScatterReport) {
    println!(
        "{}: {} of {} instances placed (seed {})",
        report.job.mode, report.created, report.requested, report.seed
    );
    if let Some(group) = &report.group_name {
        println!("Group: {}", group);
    }
}
