//! `cellseg` CLI - run pretrained cell segmentation models on microscopy images.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ndarray::Axis;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cellseg::app::{Application, Compartment, ModelContract, SuppliedOptions};
use cellseg::image::{save_mask, squeeze};
use cellseg::prepare::{prepare_input, MesmerInput, RoleSpec};
use cellseg::validate::validate_input;

/// Run pretrained cell segmentation models on multiplexed microscopy images.
#[derive(Parser, Debug)]
#[command(name = "cellseg")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run Mesmer on nuclear + membrane data.
    Mesmer {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        mesmer: MesmerArgs,
    },
}

/// Options shared by every application.
#[derive(clap::Args, Debug)]
struct CommonArgs {
    /// Directory where application outputs are saved.
    #[arg(long, short = 'o', default_value = "output", value_name = "DIR")]
    output_directory: PathBuf,

    /// Name of the output file.
    #[arg(long, short = 'f', default_value = "mask.tif", value_name = "NAME")]
    output_name: String,

    /// Only log the given level and above.
    #[arg(long, short = 'L', value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Squeeze the output tensor before saving.
    #[arg(long)]
    squeeze: bool,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(clap::Args, Debug)]
struct MesmerArgs {
    /// Path to the nuclear image file.
    #[arg(long, short = 'n', value_name = "FILE")]
    nuclear_image: PathBuf,

    /// Channel(s) to use of the nuclear image. If more than one channel is
    /// passed, all channels will be summed.
    #[arg(long, num_args = 1.., default_value = "0", value_name = "INT")]
    nuclear_channel: Vec<usize>,

    /// Path to the membrane image file. Optional. If not provided, the
    /// membrane channel input to the network is blank.
    #[arg(long, short = 'm', value_name = "FILE")]
    membrane_image: Option<PathBuf>,

    /// Channel(s) to use of the membrane image. If more than one channel is
    /// passed, all channels will be summed.
    #[arg(long, num_args = 1.., default_value = "0", value_name = "INT")]
    membrane_channel: Vec<usize>,

    /// Input image resolution in microns-per-pixel. The default value of 0.5
    /// corresponds to a 20x zoom.
    #[arg(long, default_value = "0.5", value_name = "FLOAT")]
    image_mpp: f32,

    /// Batch size for prediction.
    #[arg(long, short = 'b', default_value = "4", value_name = "INT")]
    batch_size: usize,

    /// The cellular compartment to segment.
    #[arg(long, short = 'c', value_enum, default_value_t = Compartment::WholeCell)]
    compartment: Compartment,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let Command::Mesmer { ref common, .. } = cli.command;
    let log_level = common.log_level.as_str();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("cellseg={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(err) = run(&cli) {
        tracing::error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Command::Mesmer { common, mesmer } => run_mesmer(common, mesmer),
    }
}

fn run_mesmer(common: &CommonArgs, mesmer: &MesmerArgs) -> Result<()> {
    let start = Instant::now();
    let app = Application::Mesmer;

    if !common.output_directory.is_dir() {
        anyhow::bail!(
            "{} is not a valid directory",
            common.output_directory.display()
        );
    }

    // Check that the output path does not exist already
    let outfile = common.output_directory.join(&common.output_name);
    if outfile.exists() {
        anyhow::bail!("{} already exists!", outfile.display());
    }

    if !mesmer.nuclear_image.exists() {
        anyhow::bail!("{} does not exist.", mesmer.nuclear_image.display());
    }
    if let Some(membrane) = &mesmer.membrane_image {
        if !membrane.exists() {
            anyhow::bail!("{} does not exist.", membrane.display());
        }
    }

    let mut model = app.load_model().context("Failed to load model")?;
    let contract = ModelContract::from_image_shape(model.model_image_shape());

    // load the input image
    let input = MesmerInput {
        nuclear: RoleSpec::new(
            Some(&mesmer.nuclear_image),
            mesmer.nuclear_channel.clone(),
        ),
        membrane: RoleSpec::new(
            mesmer.membrane_image.as_ref(),
            mesmer.membrane_channel.clone(),
        ),
        ..MesmerInput::default()
    };
    let img = prepare_input(app.name(), &input, contract.expected_rank)
        .context("Failed to prepare input")?;

    // make sure the input image is compatible with the app
    validate_input(app, &contract, &img)?;

    // the model expects a batch dimension
    let batched = img.insert_axis(Axis(0));

    let supplied = SuppliedOptions {
        image_mpp: Some(mesmer.image_mpp),
        batch_size: Some(mesmer.batch_size),
        compartment: Some(mesmer.compartment),
        ..SuppliedOptions::default()
    };
    let options = app.predict_options(&supplied)?;

    // run the prediction
    let output = model
        .predict(&batched, &options)
        .context("Failed to run prediction")?;

    // Optionally squeeze the output
    let output = if common.squeeze { squeeze(output) } else { output };

    save_mask(&output, &outfile)?;

    tracing::info!(
        "Wrote output file {} in {:.2} s.",
        outfile.display(),
        start.elapsed().as_secs_f64()
    );

    Ok(())
}
