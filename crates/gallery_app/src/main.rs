mod config;
mod platform;

use std::path::PathBuf;

use clap::Parser;
use gallery_core::FilterKind;
use gallery_logging::gallery_info;

use config::{GalleryConfig, DEFAULT_CONFIG_FILE};
use platform::logging::{self, LogDestination};

/// Lazy-loading photo gallery, driven by a simulated scrolling viewport.
#[derive(Parser, Debug)]
#[command(name = "gallery", version, about)]
struct Cli {
    /// Path to the RON config file.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Simulated connection type (slow-2g, 2g, 3g, 4g).
    #[arg(long)]
    effective_type: Option<String>,

    /// Step at which the connection drops for a while.
    #[arg(long)]
    offline_at: Option<usize>,

    /// Number of scroll steps to simulate.
    #[arg(long)]
    steps: Option<usize>,

    /// Filter selected half-way through (none, grayscale, sepia, blur, brightness, contrast).
    #[arg(long)]
    filter: Option<FilterKind>,

    /// Directory for exports and saved preferences.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Export the first loaded photo half-way through.
    #[arg(long)]
    export: bool,

    /// Where log records go; the terminal shares stdout with the status lines.
    #[arg(long, value_enum, default_value_t = LogDestination::File)]
    log_to: LogDestination,

    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(self, mut config: GalleryConfig) -> GalleryConfig {
        if let Some(effective_type) = self.effective_type {
            config.effective_type = effective_type;
        }
        if self.offline_at.is_some() {
            config.offline_at = self.offline_at;
        }
        if let Some(steps) = self.steps {
            config.steps = steps;
        }
        if self.filter.is_some() {
            config.filter = self.filter;
        }
        if let Some(output) = self.output {
            config.output_dir = output;
        }
        config.auto_export |= self.export;
        config
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::initialize(cli.log_to, cli.verbose);
    gallery_info!("Gallery starting");

    let path = cli.config.clone();
    let config = cli.apply(GalleryConfig::load_or_default(&path));
    platform::run_app(config)
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use gallery_core::FilterKind;
    use pretty_assertions::assert_eq;

    use super::{Cli, GalleryConfig};

    #[test]
    fn flags_override_file_values() {
        let cli = Cli::parse_from([
            "gallery",
            "--effective-type",
            "3g",
            "--filter",
            "sepia",
            "--steps",
            "7",
            "--export",
        ]);
        let config = cli.apply(GalleryConfig {
            steps: 100,
            offline_at: Some(4),
            ..GalleryConfig::default()
        });
        assert_eq!(config.effective_type, "3g");
        assert_eq!(config.filter, Some(FilterKind::Sepia));
        assert_eq!(config.steps, 7);
        assert_eq!(config.offline_at, Some(4));
        assert!(config.auto_export);
    }

    #[test]
    fn unknown_filter_is_rejected() {
        assert!(Cli::try_parse_from(["gallery", "--filter", "vintage"]).is_err());
    }
}
