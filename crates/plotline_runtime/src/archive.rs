//! Saving and loading the block tree.
//!
//! An [`Archive`] holds a version tag, an opaque caller payload and every
//! block keyed by id. It is written as JSON or `MessagePack`; reading
//! detects which.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use plotline_block::{Block, BlockId};
use plotline_foundation::{Error, ErrorKind, Result};

use crate::config::{ARCHIVE_VERSION, ArchiveFormat};

/// The persisted form of a whole tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Archive {
    /// Version tag.
    pub archive_version: String,
    /// Caller payload, round-tripped untouched.
    #[serde(default)]
    pub blind_storage: serde_json::Value,
    /// Every block by id.
    #[serde(default)]
    pub blocks: BTreeMap<BlockId, Block>,
}

impl Default for Archive {
    fn default() -> Self {
        Self {
            archive_version: ARCHIVE_VERSION.to_string(),
            blind_storage: serde_json::Value::Null,
            blocks: BTreeMap::new(),
        }
    }
}

fn serialization(e: impl std::fmt::Display) -> Error {
    Error::new(ErrorKind::Serialization(e.to_string()))
}

fn io(action: &str, path: &Path, e: &std::io::Error) -> Error {
    Error::new(ErrorKind::Io(format!("failed to {action} '{}': {e}", path.display())))
}

/// Guesses the encoding: JSON if the first non-whitespace byte is `{`.
#[must_use]
pub fn detect_format(bytes: &[u8]) -> ArchiveFormat {
    match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{') => ArchiveFormat::Json,
        _ => ArchiveFormat::MessagePack,
    }
}

/// Serializes an archive.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_bytes(archive: &Archive, format: ArchiveFormat) -> Result<Vec<u8>> {
    match format {
        ArchiveFormat::Json => serde_json::to_vec_pretty(archive).map_err(serialization),
        ArchiveFormat::MessagePack => rmp_serde::to_vec_named(archive).map_err(serialization),
    }
}

/// Deserializes an archive in either encoding.
///
/// # Errors
///
/// Returns an error if the bytes are not a valid archive.
pub fn from_bytes(bytes: &[u8]) -> Result<Archive> {
    match detect_format(bytes) {
        ArchiveFormat::Json => serde_json::from_slice(bytes).map_err(serialization),
        ArchiveFormat::MessagePack => rmp_serde::from_slice(bytes).map_err(serialization),
    }
}

/// Writes an archive to a writer.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_to<W: Write>(archive: &Archive, format: ArchiveFormat, mut writer: W) -> Result<()> {
    let bytes = to_bytes(archive, format)?;
    writer
        .write_all(&bytes)
        .and_then(|()| writer.flush())
        .map_err(|e| Error::new(ErrorKind::Io(format!("failed to write archive: {e}"))))
}

/// Reads an archive from a reader.
///
/// # Errors
///
/// Returns an error if reading fails or the bytes are not a valid archive.
pub fn read_from<R: Read>(mut reader: R) -> Result<Archive> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| Error::new(ErrorKind::Io(format!("failed to read archive: {e}"))))?;
    from_bytes(&bytes)
}

/// Saves an archive to a file, creating or truncating it.
///
/// # Errors
///
/// Returns an error if the file cannot be written or serialization fails.
pub fn save_to_file<P: AsRef<Path>>(archive: &Archive, format: ArchiveFormat, path: P) -> Result<()> {
    let path = path.as_ref();
    let bytes = to_bytes(archive, format)?;
    let file = File::create(path).map_err(|e| io("create file", path, &e))?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&bytes).map_err(|e| io("write to file", path, &e))?;
    writer.flush().map_err(|e| io("flush file", path, &e))?;
    Ok(())
}

/// Loads an archive from a file in either encoding.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid archive.
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Archive> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| io("open file", path, &e))?;
    let mut bytes = Vec::new();
    BufReader::new(file)
        .read_to_end(&mut bytes)
        .map_err(|e| io("read file", path, &e))?;
    from_bytes(&bytes)
}
