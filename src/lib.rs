pub mod cli;
pub mod config;
pub mod error;
pub mod frame;
pub mod inspect;
pub mod io_utils;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod table;
pub mod yaml_provider;

use std::{env, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info, warn};

use crate::{
    cli::{BuildArgs, Cli, Commands, ConfigCommand},
    config::PipelineConfig,
    error::BuildError,
    pipeline::{BuildRequest, TrialTableBuilder},
    report::Presentation,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("trial_merge", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Build(args) => handle_build(&args),
        Commands::Inspect(args) => {
            let config = load_config(args.config.as_deref())?;
            inspect::execute(&args, &config)
        }
        Commands::Config(ConfigCommand::Init(args)) => {
            let config = PipelineConfig::default();
            match &args.output {
                Some(path) => {
                    config
                        .save(path)
                        .with_context(|| format!("Writing configuration to {path:?}"))?;
                    info!("Default configuration written to {:?}", path);
                }
                None => print!("{}", config.to_yaml()?),
            }
            Ok(())
        }
        Commands::Config(ConfigCommand::Show(args)) => {
            let config = load_config(args.config.as_deref())?;
            print!("{}", config.to_yaml()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => {
            let config = PipelineConfig::load(path)
                .map_err(|err| BuildError::InvalidConfig(format!("{err:#}")))?;
            debug!("Loaded pipeline configuration from {:?}", path);
            Ok(config)
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn handle_build(args: &BuildArgs) -> Result<()> {
    let presentation = match execute_build(args) {
        Ok(presentation) => presentation,
        Err(err) => {
            let build_err = err.downcast::<BuildError>()?;
            present(args, &Presentation::from_error(&build_err))?;
            if build_err.is_cancellation() {
                return Ok(());
            }
            return Err(build_err.into());
        }
    };
    present(args, &presentation)
}

fn present(args: &BuildArgs, presentation: &Presentation) -> Result<()> {
    if args.json {
        println!("{}", presentation.to_json()?);
    } else if presentation.cancelled {
        warn!("{presentation}");
    } else if presentation.success {
        info!("{presentation}");
    }
    Ok(())
}

fn execute_build(args: &BuildArgs) -> Result<Presentation> {
    // Configuration problems abort before any file is read.
    let output_path = output::resolve_output_path(&args.output, args.output_dir.as_deref())?;
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())
        .map_err(|err| BuildError::InvalidConfig(format!("{err:#}")))?;
    let config = load_config(args.config.as_deref())?;
    let builder = TrialTableBuilder::new(config)?;

    info!(
        "--- Mode: {} --- Output: {} ---",
        args.mode,
        output_path.display()
    );
    let request = BuildRequest {
        directory: args.dir.clone(),
        mode: args.mode,
        encoding,
        exclude: Some(output_path.clone()),
    };
    let report = builder.build(&request)?;

    if let Some(limit) = args.preview {
        print!("{}", table::render_frame(&report.table, limit));
        return Ok(Presentation {
            output_path: None,
            message: format!(
                "Previewed {} of {} row(s)",
                limit.min(report.row_count()),
                report.row_count()
            ),
            ..Presentation::written(&report, output_path, report.row_count())
        });
    }

    let rows_written = output::persist(&report.table, &output_path)?;
    Ok(Presentation::written(&report, output_path, rows_written))
}
