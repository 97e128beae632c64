use std::process;

use anyhow::{self, format_err};
use clap::Parser;
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;

use crysym::interfaces::cli::{log_heading, Cli};
use crysym::interfaces::input::{write_input_template, Input};
use crysym::interfaces::InputHandle;
use crysym::io::read_crysym_yaml;

const OUTPUT_TARGET: &str = "crysym-output";
const TEMPLATE_NAME: &str = "crysym_template";

/// Sets up `log4rs` with a console appender for the main output, an optional file appender that
/// receives the same output, and a diagnostic root logger whose level follows the verbosity.
fn configure_logging(cli: &Cli) -> Result<(), anyhow::Error> {
    let root_level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    let output_console = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{m}{n}")))
        .build();
    let diagnostic_console = ConsoleAppender::builder()
        .target(log4rs::append::console::Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("[{l}] {t}: {m}{n}")))
        .build();

    let mut builder = Config::builder()
        .appender(Appender::builder().build("output_console", Box::new(output_console)))
        .appender(Appender::builder().build("diagnostic_console", Box::new(diagnostic_console)));
    let mut output_appenders = vec!["output_console"];

    if let Some(path) = cli.output.as_ref() {
        let output_file = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new("{m}{n}")))
            .append(false)
            .build(path)
            .map_err(|err| format_err!("Unable to open {}: {err}", path.display()))?;
        builder = builder.appender(Appender::builder().build("output_file", Box::new(output_file)));
        output_appenders.push("output_file");
    }

    let config = builder
        .logger(
            Logger::builder()
                .appenders(output_appenders)
                .additive(false)
                .build(OUTPUT_TARGET, LevelFilter::Info),
        )
        .build(
            Root::builder()
                .appender("diagnostic_console")
                .build(root_level),
        )
        .map_err(|err| format_err!("Invalid logging configuration: {err}"))?;
    log4rs::init_config(config).map_err(|err| format_err!("Unable to set up logging: {err}"))?;
    Ok(())
}

fn run(cli: &Cli) -> Result<(), anyhow::Error> {
    configure_logging(cli)?;
    log_heading();

    match cli.config.as_ref() {
        Some(config) => {
            let input: Input = read_crysym_yaml(config)?;
            input.handle()
        }
        None => {
            write_input_template(TEMPLATE_NAME)?;
            log::info!(
                target: OUTPUT_TARGET,
                "No input file given. A template input has been written to {TEMPLATE_NAME}.yml."
            );
            Ok(())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        log::error!(target: OUTPUT_TARGET, "{err:#}");
        eprintln!("{err:#}");
        process::exit(1);
    }
}
