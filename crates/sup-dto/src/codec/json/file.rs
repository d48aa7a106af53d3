//! File-backed JSON input and output.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::debug;

use super::writer::JsonOutput;
use crate::error::{Error, Result};

/// Reads a whole file as UTF-8 text.
pub(crate) fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|err| {
        debug!(path = %path.display(), error = %err, "cannot read JSON file");
        Error::ReadFile {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    })
}

fn write_error(path: &Path, err: impl std::fmt::Display) -> Error {
    debug!(path = %path.display(), error = %err, "cannot write JSON file");
    Error::WriteFile {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

/// Creates `path` and streams JSON into it through `write`.
pub(crate) fn write_json_file(
    path: &Path,
    pretty: bool,
    write: impl FnOnce(&mut JsonOutput<BufWriter<fs::File>>) -> Result<()>,
) -> Result<()> {
    let file = fs::File::create(path).map_err(|err| write_error(path, err))?;
    let mut out = JsonOutput::new(BufWriter::new(file), pretty);
    write(&mut out).map_err(|err| match err {
        Error::Output(message) => write_error(path, message),
        other => other,
    })?;
    out.into_inner()
        .flush()
        .map_err(|err| write_error(path, err))
}
