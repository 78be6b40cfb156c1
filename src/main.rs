use clap::Parser;
use lightlab::settings::LabSettings;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lightlab")]
#[command(about = "Light Lab scene configurator", long_about = None)]
struct Cli {
    /// JSON settings file; missing fields fall back to defaults
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Directory for saved presets and likes
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Directory for downloaded renders and exported configurations
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let mut settings = match LabSettings::load(cli.settings.as_deref()) {
        Ok(settings) => settings,
        Err(err) => {
            log::error!("{}", err);
            std::process::exit(1);
        }
    };
    if let Some(dir) = cli.data_dir {
        settings.data_dir = dir;
    }
    if let Some(dir) = cli.output_dir {
        settings.output_dir = dir;
    }

    if let Err(err) = lightlab::app::run(settings) {
        log::error!("{}", err);
        std::process::exit(1);
    }
}
