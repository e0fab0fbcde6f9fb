//! Detect command: list every version-bearing file.

use clap::Args;
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use semvx_core::config::Config;
use semvx_core::detect;

/// Arguments for the `detect` subcommand.
#[derive(Args, Debug, Default)]
pub struct DetectArgs {
    // Uses global --json flag for structured output
}

/// Detect version sources under `cwd` and print them.
#[instrument(name = "cmd_detect", skip_all, fields(json_output))]
pub fn cmd_detect(
    _args: DetectArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing detect command");

    let detection = detect::detect(cwd, &config.detect);

    if global_json {
        println!("{}", serde_json::to_string_pretty(&detection)?);
        return Ok(());
    }

    println!("{}", "Version Sources".bold().underline());
    if detection.sources.is_empty() {
        println!("  {} {}", "○".yellow(), "No version sources found".yellow());
    }
    let width = detection
        .sources
        .iter()
        .map(|s| s.path.as_str().len())
        .max()
        .unwrap_or_default();
    for source in &detection.sources {
        println!(
            "  {:<width$}  {}  {}",
            source.path.as_str().cyan(),
            source.version.to_string().green(),
            format!("({})", source.kind).dimmed(),
        );
    }
    super::print_problems(&detection.problems);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_empty_dir_succeeds() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cwd = camino::Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        assert!(cmd_detect(DetectArgs::default(), false, &Config::default(), &cwd).is_ok());
        assert!(cmd_detect(DetectArgs::default(), true, &Config::default(), &cwd).is_ok());
    }
}
