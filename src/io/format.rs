//! Formatting helpers for the main `crysym` output.

use std::fmt;

use log;

/// Width of the section banners written to the output log.
const CRYSYM_BANNER_LENGTH: usize = 96;

/// Logs an error to the `crysym-output` logger as well as to the default logger.
macro_rules! crysym_error {
    ($fmt:expr $(, $($arg:tt)*)?) => {
        log::error!($fmt, $($($arg)*)?);
        log::error!(target: "crysym-output", $fmt, $($($arg)*)?);
    }
}

/// Logs a warning to the `crysym-output` logger.
macro_rules! crysym_warn {
    ($fmt:expr $(, $($arg:tt)*)?) => { log::warn!(target: "crysym-output", $fmt, $($($arg)*)?); }
}

/// Logs a main output line to the `crysym-output` logger.
macro_rules! crysym_output {
    ($fmt:expr $(, $($arg:tt)*)?) => { log::info!(target: "crysym-output", $fmt, $($($arg)*)?); }
}

pub(crate) use {crysym_error, crysym_output, crysym_warn};

/// Logs a boxed section title to the `crysym-output` logger.
pub(crate) fn log_title(title: &str) {
    let length = title.chars().count().max(CRYSYM_BANNER_LENGTH - 6);
    let bar = "─".repeat(length);
    crysym_output!("┌──{bar}──┐");
    crysym_output!("│  {title:^length$}  │");
    crysym_output!("└──{bar}──┘");
}

/// Logs an underlined subtitle to the `crysym-output` logger.
pub(crate) fn log_subtitle(subtitle: &str) {
    let bar = "═".repeat(subtitle.chars().count());
    crysym_output!("{}", subtitle);
    crysym_output!("{}", bar);
}

/// Logs the beginning of a named block of work (*e.g.* one structural step).
pub(crate) fn log_block_begin(name: &str) {
    let width = CRYSYM_BANNER_LENGTH - 14;
    let padded = name.to_string() + " ";
    crysym_output!("‹‹‹‹‹ [Begin] {padded:‹<width$}");
}

/// Logs the end of a named block of work.
pub(crate) fn log_block_end(name: &str) {
    let width = CRYSYM_BANNER_LENGTH - 14;
    let padded = name.to_string() + " ";
    crysym_output!("››››› [ End ] {padded:›<width$}");
}

/// Turns a boolean into `yes` or `no`.
pub(crate) fn nice_bool(b: bool) -> String {
    if b {
        "yes".to_string()
    } else {
        "no".to_string()
    }
}

/// A trait for logging any displayable value line by line to the `crysym-output` logger.
pub(crate) trait CrysymOutput: fmt::Debug + fmt::Display {
    /// Logs the [`fmt::Display`] output.
    fn log_output_display(&self) {
        self.to_string().lines().for_each(|line| {
            crysym_output!("{line}");
        })
    }
}

impl<T> CrysymOutput for T where T: fmt::Debug + fmt::Display {}
