use std::path::PathBuf;

use clap::Parser;

use crate::io::format::crysym_output;

const VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

/// Logs a nicely formatted `crysym` heading to the `crysym-output` logger.
pub fn log_heading() {
    let version = if let Some(ver) = VERSION {
        format!("v{ver}")
    } else {
        "v unknown".to_string()
    };
    crysym_output!("╭──────────────────────────────────────────────────────────────╮");
    crysym_output!("│                                                              │");
    crysym_output!("│    ██████ ██████  ██    ██ ███████ ██    ██ ███    ███       │");
    crysym_output!("│   ██      ██   ██  ██  ██  ██       ██  ██  ████  ████       │");
    crysym_output!("│   ██      ██████    ████   ███████   ████   ██ ████ ██       │");
    crysym_output!("│   ██      ██   ██    ██         ██    ██    ██  ██  ██       │");
    crysym_output!("│    ██████ ██   ██    ██    ███████    ██    ██      ██       │");
    crysym_output!("│                                                              │");
    crysym_output!("│   Space-group detection for periodic structures {version:>12} │");
    crysym_output!("╰──────────────────────────────────────────────────────────────╯");
    crysym_output!("");
}

/// Command-line arguments of the `crysym` binary.
#[derive(Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// The YAML input file. If absent, a template input file is written out instead.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// The file to which the output is additionally written.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Increases the verbosity of the diagnostic log. May be given twice.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
