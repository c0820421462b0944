//! Predefined-script execution.
//!
//! Resolves a named executable inside the configured scripts directory
//! and runs it; the script's stdout is a JavaScript snippet later sent to
//! the extension via `content.execute_script`.
//!
//! # Security Contract
//!
//! Every rule is a hard precondition checked in order; a failing check
//! prevents the child process from being spawned:
//!
//! 1. The scripts directory is configured (`FOXMCP_EXT_SCRIPTS`).
//! 2. The name contains only `[A-Za-z0-9._-]`.
//! 3. The name contains no `..` substring.
//! 4. The resolved real path is still contained in the directory's real
//!    path (symlink escapes fail here).
//! 5. The path is a regular, executable file.
//! 6. Arguments are a JSON array of strings (empty string means `[]`).

// ============================================================================
// Imports
// ============================================================================

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde_json::Value;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::config::SCRIPTS_DIR_ENV;
use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Wall-clock limit for one script run; the child is killed on expiry.
const SCRIPT_WALL_CLOCK: Duration = Duration::from_secs(30);

// ============================================================================
// ScriptExecutor
// ============================================================================

/// Resolves and runs predefined scripts from a configured directory.
///
/// The directory is read-only from the bridge's perspective; no locking
/// beyond filesystem semantics is involved.
#[derive(Debug, Clone)]
pub struct ScriptExecutor {
    /// Configured scripts directory; `None` disables the feature.
    dir: Option<PathBuf>,
}

impl ScriptExecutor {
    /// Creates an executor over an optional scripts directory.
    #[inline]
    #[must_use]
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    /// Returns `true` when a scripts directory is configured.
    #[inline]
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.dir.is_some()
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Resolves a script name to its real executable path.
    ///
    /// Applies preconditions 1-5 of the security contract, in order.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConfigured`] without a (valid) scripts directory
    /// - [`Error::InvalidName`] on charset, `..`, or containment violation
    /// - [`Error::ScriptNotFound`] if the path is missing or not a file
    /// - [`Error::NotExecutable`] if the file lacks execute permission
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let dir = self
            .dir
            .as_ref()
            .ok_or_else(|| Error::not_configured(format!("{SCRIPTS_DIR_ENV} is not set")))?;

        validate_name(name)?;

        let dir = std::fs::canonicalize(dir).map_err(|_| {
            Error::not_configured(format!(
                "scripts directory does not exist: {}",
                dir.display()
            ))
        })?;

        let resolved = std::fs::canonicalize(dir.join(name)).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::script_not_found(name)
            } else {
                Error::Io(e)
            }
        })?;

        // Real-path containment: a symlink pointing outside the directory
        // resolves past this boundary.
        if !resolved.starts_with(&dir) {
            return Err(Error::invalid_name(name));
        }

        let metadata = std::fs::metadata(&resolved)?;
        if !metadata.is_file() {
            return Err(Error::script_not_found(name));
        }
        ensure_executable(&resolved, &metadata)?;

        Ok(resolved)
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Runs a script and returns its stdout as the produced JavaScript.
    ///
    /// The child runs with the decoded argument vector, no stdin, the
    /// scripts directory as working directory, and an inherited
    /// environment, bounded by a 30-second wall clock.
    ///
    /// # Errors
    ///
    /// Resolution and argument errors as in [`ScriptExecutor::resolve`]
    /// and [`decode_args`]; [`Error::ExecutionFailed`] on spawn failure,
    /// timeout, nonzero exit (carrying stderr), or non-UTF-8 stdout.
    pub async fn execute(&self, name: &str, raw_args: &str) -> Result<String> {
        let path = self.resolve(name)?;
        let args = decode_args(raw_args)?;
        let cwd = path.parent().map(Path::to_path_buf).unwrap_or_default();

        debug!(script = name, ?args, "Executing predefined script");

        let mut command = Command::new(&path);
        command
            .args(&args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command
            .spawn()
            .map_err(|e| Error::execution_failed(format!("failed to spawn '{name}': {e}")))?;

        let output = match timeout(SCRIPT_WALL_CLOCK, child.wait_with_output()).await {
            Ok(result) => result.map_err(Error::Io)?,
            // Dropping the future kills the child (kill_on_drop).
            Err(_) => {
                return Err(Error::execution_failed(format!(
                    "script '{name}' exceeded the {}s wall clock",
                    SCRIPT_WALL_CLOCK.as_secs()
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::execution_failed(format!(
                "script '{name}' exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|_| Error::execution_failed(format!("script '{name}' stdout is not valid UTF-8")))
    }
}

// ============================================================================
// Name & Argument Validation
// ============================================================================

/// Applies preconditions 2 and 3: charset, then `..` rejection.
fn validate_name(name: &str) -> Result<()> {
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(Error::invalid_name(name));
    }

    if name.contains("..") {
        return Err(Error::invalid_name(name));
    }

    Ok(())
}

/// Decodes the raw argument string into an argument vector.
///
/// An empty (or whitespace-only) string is equivalent to `[]`; anything
/// else must parse as a JSON array of strings.
///
/// # Errors
///
/// Returns [`Error::InvalidArgs`] for any other shape.
pub fn decode_args(raw: &str) -> Result<Vec<String>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_str(trimmed)
        .map_err(|e| Error::invalid_args(format!("not valid JSON: {e}")))?;

    let Value::Array(items) = value else {
        return Err(Error::invalid_args("expected a JSON array of strings"));
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(s),
            other => Err(Error::invalid_args(format!(
                "array elements must be strings, got: {other}"
            ))),
        })
        .collect()
}

#[cfg(unix)]
fn ensure_executable(path: &Path, metadata: &std::fs::Metadata) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    if metadata.permissions().mode() & 0o111 == 0 {
        return Err(Error::not_executable(path));
    }
    Ok(())
}

#[cfg(not(unix))]
fn ensure_executable(_path: &Path, _metadata: &std::fs::Metadata) -> Result<()> {
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
