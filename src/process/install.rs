//! Package installation through the configured package manager.

use std::{path::Path, time::Duration};

use crate::execution::ExecutionOutcome;

/// Runs `<manager> install <packages...>` in `cwd`.
///
/// No packages means nothing to do: returns a success outcome without spawning.
/// Names are passed through as given; the package manager rejects bad ones.
pub async fn install(
    packages: Option<&[String]>,
    manager: &str,
    cwd: Option<&Path>,
    limit: Duration,
) -> ExecutionOutcome {
    let packages = match packages {
        Some(p) if !p.is_empty() => p,
        _ => return ExecutionOutcome::success(),
    };

    log::info!(
        "installing {} package(s) with {}: {}",
        packages.len(),
        manager,
        packages.join(" ")
    );
    super::run(&install_command(manager, packages), cwd, limit).await
}

pub fn install_command(manager: &str, packages: &[String]) -> Vec<String> {
    let mut cmd = Vec::with_capacity(packages.len() + 2);
    cmd.push(manager.to_string());
    cmd.push("install".to_string());
    cmd.extend(packages.iter().cloned());
    cmd
}
