//! StaticPress CLI
//!
//! Commands: build
//! Outputs a JSON build report to stdout; logs go to stderr
//! Returns non-zero on fatal build errors

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use staticpress_core::{BuildConfig, BuildMode, BuildPipeline};

#[derive(Parser)]
#[command(name = "staticpress-cli")]
#[command(about = "StaticPress CLI - Static Asset Build Pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile the entry points into the output directory
    Build {
        /// Source directory containing the entry points
        #[arg(short, long, default_value = "src")]
        src: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "dist")]
        out: PathBuf,

        /// Build mode: development or production
        #[arg(short, long, default_value = "development")]
        mode: BuildMode,

        /// Public path prefix for manifest entries
        #[arg(long, default_value = "/")]
        public_path: String,

        /// JSON build config file; overrides the flags above
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            src,
            out,
            mode,
            public_path,
            config,
        } => {
            let config = match load_config(src, out, mode, public_path, config) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!(r#"{{"success": false, "error": "Invalid config: {}"}}"#, e);
                    return ExitCode::FAILURE;
                }
            };

            match BuildPipeline::new().build(&config) {
                Ok(report) => {
                    let output = serde_json::json!({
                        "success": true,
                        "report": report,
                    });
                    println!("{}", serde_json::to_string_pretty(&output).unwrap());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    let output = serde_json::json!({
                        "success": false,
                        "error": e.to_string(),
                    });
                    println!("{}", serde_json::to_string(&output).unwrap());
                    ExitCode::FAILURE
                }
            }
        }
    }
}

fn load_config(
    src: PathBuf,
    out: PathBuf,
    mode: BuildMode,
    public_path: String,
    config_file: Option<PathBuf>,
) -> anyhow::Result<BuildConfig> {
    match config_file {
        Some(path) => {
            let content = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&content)?)
        }
        None => {
            let mut config = BuildConfig::new(&src, &out, mode);
            config.public_path = public_path;
            Ok(config)
        }
    }
}
