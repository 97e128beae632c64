//! Persistence of `crysym` results and inputs.
//!
//! Detection results are stored with `bincode` under a [`CrysymFileType`] extension. Inputs and
//! templates are YAML.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{self, Context};
use serde::{de::DeserializeOwned, Serialize};

pub(crate) mod format;

#[cfg(test)]
#[path = "io_tests.rs"]
mod io_tests;

/// The kinds of file `crysym` writes itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrysymFileType {
    /// Serialised [`SpaceGroupDetectionResult`](crate::drivers::space_group_detection::SpaceGroupDetectionResult)s.
    Sym,
}

impl CrysymFileType {
    /// The extension, without the leading dot, that replaces any extension of a base name.
    pub fn ext(&self) -> String {
        match self {
            CrysymFileType::Sym => "crysym.sym".to_string(),
        }
    }
}

/// Attaches `ext` to `name`, replacing its last extension if it has one.
fn crysym_path<P: AsRef<Path>>(name: P, ext: &str) -> PathBuf {
    name.as_ref().with_extension(ext)
}

fn open_reader(path: &Path) -> Result<BufReader<File>, anyhow::Error> {
    let file = File::open(path).with_context(|| format!("Cannot open `{}`.", path.display()))?;
    Ok(BufReader::new(file))
}

fn create_writer(path: &Path) -> Result<BufWriter<File>, anyhow::Error> {
    let file =
        File::create(path).with_context(|| format!("Cannot create `{}`.", path.display()))?;
    Ok(BufWriter::new(file))
}

/// Loads a value saved by [`write_crysym_binary`].
///
/// # Arguments
///
/// * `name` - The base name. The extension of `file_type` is attached to it.
/// * `file_type` - The kind of file expected.
///
/// # Errors
///
/// Errors if the file cannot be opened or does not decode into `T`.
pub fn read_crysym_binary<T, P: AsRef<Path>>(
    name: P,
    file_type: CrysymFileType,
) -> Result<T, anyhow::Error>
where
    T: DeserializeOwned,
{
    let path = crysym_path(name, &file_type.ext());
    let mut reader = open_reader(&path)?;
    bincode::deserialize_from(&mut reader)
        .with_context(|| format!("`{}` is not a valid `crysym` file.", path.display()))
}

/// Saves `value` with `bincode` under `name` and the extension of `file_type`.
///
/// # Errors
///
/// Errors if the file cannot be created or written.
pub fn write_crysym_binary<T, P: AsRef<Path>>(
    name: P,
    file_type: CrysymFileType,
    value: &T,
) -> Result<(), anyhow::Error>
where
    T: Serialize,
{
    let path = crysym_path(name, &file_type.ext());
    let mut writer = create_writer(&path)?;
    bincode::serialize_into(&mut writer, value)
        .with_context(|| format!("Cannot serialise into `{}`.", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Cannot flush `{}`.", path.display()))
}

/// Parses a YAML file. `name` is used as given, extension included.
///
/// # Errors
///
/// Errors if the file cannot be opened or is not valid YAML for `T`.
pub fn read_crysym_yaml<T, P: AsRef<Path>>(name: P) -> Result<T, anyhow::Error>
where
    T: DeserializeOwned,
{
    let path = name.as_ref();
    let reader = open_reader(path)?;
    serde_yaml::from_reader(reader)
        .with_context(|| format!("Cannot parse `{}` as a `crysym` YAML file.", path.display()))
}

/// Writes `value` as YAML to `name` with a `.yml` extension.
///
/// # Errors
///
/// Errors if the file cannot be created or written.
pub fn write_crysym_yaml<T, P: AsRef<Path>>(name: P, value: &T) -> Result<(), anyhow::Error>
where
    T: Serialize,
{
    let path = crysym_path(name, "yml");
    let mut writer = create_writer(&path)?;
    serde_yaml::to_writer(&mut writer, value)
        .with_context(|| format!("Cannot write YAML to `{}`.", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Cannot flush `{}`.", path.display()))
}
