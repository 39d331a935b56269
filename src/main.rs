use clap::Parser;
use env_logger::Builder;
use env_logger::Env;
use log::{error, info, Level};
use std::io::Write;

use shelfscan::color_utils::{colors, init_color_config, symbols};
use shelfscan::config::{GlobalArgs, IdentifyCommand, IdentifyConfig};
use shelfscan::identify::run_identification;

#[derive(clap::Subcommand)]
enum Commands {
    /// Identify packaged products in photos
    Identify(IdentifyCommand),

    /// Show version information
    Version,
}

#[derive(Parser)]
#[command(name = "shelfscan")]
#[command(about = "Identify packaged grocery products in photos")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

fn get_log_level_from_verbosity(verbosity: &clap_verbosity_flag::Verbosity) -> log::LevelFilter {
    let base_level = verbosity.log_level_filter();
    // Shift the scale so the default shows warnings and each -v adds a level
    let adjusted_level = match base_level {
        log::LevelFilter::Off => log::LevelFilter::Off,
        log::LevelFilter::Error => log::LevelFilter::Warn,
        log::LevelFilter::Warn => log::LevelFilter::Info,
        log::LevelFilter::Info => log::LevelFilter::Debug,
        log::LevelFilter::Debug => log::LevelFilter::Trace,
        log::LevelFilter::Trace => log::LevelFilter::Trace,
    };

    if verbosity.is_silent() {
        log::LevelFilter::Error
    } else {
        adjusted_level
    }
}

fn main() {
    let cli = Cli::parse();

    init_color_config(cli.global.no_color);

    // If user didn't pass -v/-q and RUST_LOG is set, honor the env var.
    let use_env = !cli.global.verbosity.is_present() && std::env::var_os("RUST_LOG").is_some();

    let mut logger = if use_env {
        Builder::from_env(Env::default())
    } else {
        let mut b = Builder::new();
        b.filter_level(get_log_level_from_verbosity(&cli.global.verbosity));
        b
    };

    logger
        .format(|buf, record| {
            let level_str = match record.level() {
                Level::Error => colors::error_level("ERROR"),
                Level::Warn => colors::warning_level("WARN"),
                Level::Info => colors::info_level("INFO"),
                Level::Debug => colors::debug_level("DEBUG"),
                Level::Trace => colors::trace_level("TRACE"),
            };
            writeln!(buf, "[{}] {}", level_str, record.args())
        })
        .init();

    match &cli.command {
        Some(Commands::Identify(identify_cmd)) => {
            let sources_desc = if identify_cmd.sources.len() == 1 {
                identify_cmd.sources[0].clone()
            } else {
                format!("{} inputs", identify_cmd.sources.len())
            };

            let backend = match &identify_cmd.endpoint {
                Some(endpoint) => format!("remote: {endpoint}"),
                None => format!("local, device: {}", cli.global.device),
            };
            info!(
                "{} Product identification: {} | conf: {} | {}",
                symbols::identify_start(),
                sources_desc,
                identify_cmd.confidence,
                backend
            );

            let config = match IdentifyConfig::from_args(cli.global.clone(), identify_cmd.clone())
            {
                Ok(config) => config,
                Err(e) => {
                    error!("{} Invalid arguments: {e}", symbols::operation_failed());
                    std::process::exit(2);
                }
            };

            match run_identification(config) {
                Ok(_) => {}
                Err(e) => {
                    error!("{} Identification failed: {e}", symbols::operation_failed());
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Version) => {
            println!("shelfscan v{}", env!("CARGO_PKG_VERSION"));
        }
        None => {
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            cmd.print_help().unwrap();
        }
    }
}
