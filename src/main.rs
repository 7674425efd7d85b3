use std::process;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use kms_present::backend::kms::{set_mode, Card};
use kms_present::cli::Cli;
use kms_present::config::SessionConfig;
use kms_present::render::{self, Animation, Bars, ContextSetup, SoftwareContext};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "kms_present=info";

fn main() -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(env_filter)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // --help and --version.
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => {
            let _ = err.print();
            process::exit(1);
        }
    };
    let Some(config) = SessionConfig::load(&cli)? else {
        eprintln!("{}", Cli::command().render_usage());
        process::exit(1);
    };

    info!("starting kms-present {}", env!("CARGO_PKG_VERSION"));

    let device = Card::open(&config.device)
        .with_context(|| format!("error opening DRM device {:?}", config.device))?;
    info!("using DRM device {:?}", device.path());

    let output = set_mode(&device, config.mode)?;
    let (width, height) = (u32::from(output.width), u32::from(output.height));

    let mut surface = SoftwareContext.setup(&device, output, config.mode.hdr)?;
    let mut animation = Bars::default();
    animation.init(width, height);

    render::run(&mut surface, &mut animation)
}
