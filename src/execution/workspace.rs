//! Disposable per-call workspace for isolated runs.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tempfile::{Builder, TempDir};

use super::{ExecutionOutcome, RuntimeProfile};
use crate::process::{self, install};

pub const METADATA_FILE: &str = "package.json";
/// Declares ES-module semantics so snippets can use `import` and top-level await.
pub const METADATA_CONTENT: &str = r#"{"type": "module"}"#;

/// Fresh directory owned by one isolated run. Removed on drop, whatever the exit path.
#[derive(Debug)]
pub struct DisposableWorkspace {
    dir: TempDir,
}

impl DisposableWorkspace {
    pub fn create(root: Option<&Path>) -> Result<Self> {
        let mut builder = Builder::new();
        builder.prefix("codexec-");
        let dir = match root {
            Some(root) => builder
                .tempdir_in(root)
                .with_context(|| format!("creating workspace in {}", root.display()))?,
            None => builder.tempdir().context("creating workspace in temp dir")?,
        };
        log::debug!("created workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_runtime_metadata(&self) -> Result<PathBuf> {
        self.write_file(METADATA_FILE, METADATA_CONTENT)
    }

    pub fn write_script(&self, name: &str, code: &str) -> Result<PathBuf> {
        self.write_file(name, code)
    }

    fn write_file(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }

    /// Deletes the directory now. Failures are logged, not returned, so they never
    /// replace an outcome that was already computed.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => log::debug!("removed workspace {}", path.display()),
            Err(e) => log::warn!("failed to remove workspace {}: {}", path.display(), e),
        }
    }
}

/// Runs `code` as a script file inside a fresh workspace, installing `packages` there first.
pub async fn run_isolated(
    profile: &RuntimeProfile,
    code: &str,
    packages: Option<&[String]>,
) -> Result<ExecutionOutcome> {
    let workspace = DisposableWorkspace::create(profile.temp_root.as_deref())?;
    // On `Err` the workspace is still dropped, which removes it.
    let outcome = run_in(&workspace, profile, code, packages).await?;
    workspace.close();
    Ok(outcome)
}

async fn run_in(
    workspace: &DisposableWorkspace,
    profile: &RuntimeProfile,
    code: &str,
    packages: Option<&[String]>,
) -> Result<ExecutionOutcome> {
    workspace.write_runtime_metadata()?;

    let installed = install::install(
        packages,
        &profile.package_manager,
        Some(workspace.path()),
        profile.timeout,
    )
    .await;
    if !installed.is_success() {
        return Ok(installed.into_install_failure());
    }

    let script = workspace.write_script(&profile.script_name, code)?;
    let cmd = profile.script_command(&script);
    Ok(process::run(&cmd, Some(workspace.path()), profile.timeout).await)
}
