mod print_config;
mod run;

use {
    crate::{
        config::{ConfigError, DisplayConfig},
        logger::Logger,
        utils::errorfmt::ErrorFmt,
    },
    ::log::Level,
    clap::{Args, Parser, Subcommand, ValueEnum},
    std::path::{Path, PathBuf},
};

/// Drives the composition layer against a simulated display engine.
#[derive(Parser, Debug)]
#[command(name = "hwc-sim")]
struct HwcSim {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// The log level.
    #[arg(value_enum, long, global = true, default_value_t)]
    pub log_level: CliLogLevel,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Run validate/present cycles on a simulated display.
    Run(RunArgs),
    /// Print the effective display configuration as JSON.
    PrintConfig(PrintConfigArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// A JSON file with the display configuration.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// The number of frames to present.
    #[arg(long, default_value_t = 3)]
    pub frames: u64,
    /// The number of application layers.
    #[arg(long, default_value_t = 2)]
    pub layers: u32,
}

#[derive(Args, Debug)]
pub struct PrintConfigArgs {
    /// A JSON file with the display configuration.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Copy, Clone, Hash, Default)]
pub enum CliLogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<CliLogLevel> for Level {
    fn from(level: CliLogLevel) -> Self {
        match level {
            CliLogLevel::Trace => Level::Trace,
            CliLogLevel::Debug => Level::Debug,
            CliLogLevel::Info => Level::Info,
            CliLogLevel::Warn => Level::Warn,
            CliLogLevel::Error => Level::Error,
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<DisplayConfig, ConfigError> {
    match path {
        Some(path) => DisplayConfig::load(path),
        None => Ok(DisplayConfig::default()),
    }
}

pub fn main() {
    let cli = HwcSim::parse();
    if let Err(e) = Logger::install_stderr(cli.global.log_level.into()) {
        eprintln!("Error: {}", ErrorFmt(e));
        std::process::exit(1);
    }
    let res = match cli.command {
        Cmd::Run(a) => run::main(a).map_err(|e| ErrorFmt(e).to_string()),
        Cmd::PrintConfig(a) => print_config::main(a).map_err(|e| ErrorFmt(e).to_string()),
    };
    if let Err(e) = res {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
