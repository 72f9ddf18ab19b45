//! Locate the tool (or its interpreter) before spawning.

use std::env;
use std::path::{Path, PathBuf};

use crate::error::ExecError;

/// Resolves `program` to an existing file.
///
/// A path with more than one component must exist as given. A bare name is
/// looked up on `PATH`. On failure the error lists every location tried.
pub fn resolve_program(program: &Path) -> Result<PathBuf, ExecError> {
    let name = program.display().to_string();
    if program.is_absolute() || program.components().count() > 1 {
        if program.is_file() {
            return Ok(program.to_path_buf());
        }
        return Err(ExecError::Resolution {
            name,
            searched: vec![program.display().to_string()],
        });
    }

    let Some(path_var) = env::var_os("PATH") else {
        return Err(ExecError::Resolution {
            name,
            searched: vec!["PATH (unset)".to_string()],
        });
    };
    let mut searched = Vec::new();
    for dir in env::split_paths(&path_var) {
        for candidate in candidates(&dir, program) {
            if is_executable(&candidate) {
                return Ok(candidate);
            }
            searched.push(candidate.display().to_string());
        }
    }
    Err(ExecError::Resolution { name, searched })
}

#[cfg(windows)]
fn candidates(dir: &Path, program: &Path) -> Vec<PathBuf> {
    let plain = dir.join(program);
    let exe = plain.with_extension("exe");
    vec![plain, exe]
}

#[cfg(not(windows))]
fn candidates(dir: &Path, program: &Path) -> Vec<PathBuf> {
    vec![dir.join(program)]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
