//! Utilities (snippet input resolution, executable lookup).

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};

/// Picks the snippet from the positional argument, a file, or piped stdin, in that order.
pub fn resolve_code(
    positional: Option<String>,
    file: Option<&Path>,
    stdin: Option<String>,
) -> Result<String> {
    if let Some(code) = positional.filter(|c| !c.trim().is_empty()) {
        return Ok(code);
    }
    if let Some(path) = file {
        return read_snippet(path);
    }
    match stdin {
        Some(code) if !code.trim().is_empty() => Ok(code),
        _ => bail!("Provide code as an argument, with --file, or via stdin"),
    }
}

pub fn read_snippet(path: &Path) -> Result<String> {
    if !path.is_file() {
        bail!("'{}' is not a file", path.display());
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read file '{}'", path.display()))
}

/// Where `program` resolves on `PATH`, for diagnostics. Paths with a separator are left alone.
pub fn locate_executable(program: &str) -> Option<PathBuf> {
    if program.contains(std::path::MAIN_SEPARATOR) {
        let path = PathBuf::from(program);
        return path.is_file().then_some(path);
    }
    which::which(program).ok()
}
