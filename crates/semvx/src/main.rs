//! semvx CLI
#![deny(unsafe_code)]

use anyhow::Context;
use clap::Parser;
use semvx::{Cli, Commands, commands};
use semvx_core::config::ConfigLoader;
use tracing::debug;

mod observability;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.color.apply();

    if let Some(ref dir) = cli.chdir {
        std::env::set_current_dir(dir)
            .with_context(|| format!("failed to change directory to {}", dir.display()))?;
    }

    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    let cwd = camino::Utf8PathBuf::try_from(cwd).map_err(|e| {
        anyhow::anyhow!(
            "current directory is not valid UTF-8: {}",
            e.into_path_buf().display()
        )
    })?;
    let mut loader = ConfigLoader::new().with_project_search(&cwd);
    if let Some(ref config_path) = cli.config {
        let config_path = camino::Utf8PathBuf::try_from(config_path.clone()).map_err(|e| {
            anyhow::anyhow!(
                "config path is not valid UTF-8: {}",
                e.into_path_buf().display()
            )
        })?;
        loader = loader.with_file(&config_path);
    }
    let config = loader.load().context("failed to load configuration")?;

    let log_settings = observability::LogSettings::from_env(config.log_dir.clone());
    let filter = observability::env_filter(cli.quiet, cli.verbose, config.log_level.as_str());
    let _guard =
        observability::init(&log_settings, filter).context("failed to initialize logging")?;

    debug!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        json = cli.json,
        color = ?cli.color,
        chdir = ?cli.chdir,
        "CLI initialized"
    );

    let result = match cli.command {
        Commands::Detect(args) => commands::detect::cmd_detect(args, cli.json, &config, &cwd),
        Commands::Status(args) => commands::status::cmd_status(args, cli.json, &config, &cwd),
        Commands::Next(args) => commands::next::cmd_next(args, cli.json, &config, &cwd),
        Commands::Sync(args) => commands::sync::cmd_sync(args, cli.json, &config, &cwd),
        Commands::Validate(args) => {
            commands::validate::cmd_validate(args, cli.json, &config, &cwd)
        }
        Commands::Tags(args) => commands::tags::cmd_tags(args, cli.json, &config, &cwd),
        Commands::Build(args) => commands::build::cmd_build(args, cli.json, &config, &cwd),
        Commands::BuildCount(args) => {
            commands::build::cmd_build_count(args, cli.json, &config, &cwd)
        }
    };
    if let Err(ref err) = result {
        tracing::error!(error = %err, "fatal error");
    }
    result
}
