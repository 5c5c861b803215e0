//! Execution engine: request/outcome types, runtime profile and the facade.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    process::{self, install},
};

pub mod workspace;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const INSTALL_FAILURE_PREFIX: &str = "Dependency install failed:\n";

/// One snippet to run. `isolated` is also accepted as `use_temp_dir`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub code: String,
    #[serde(default)]
    pub packages: Option<Vec<String>>,
    #[serde(default, alias = "use_temp_dir")]
    pub isolated: bool,
}

impl ExecutionRequest {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Default::default()
        }
    }

    pub fn with_packages(mut self, packages: Vec<String>) -> Self {
        self.packages = Some(packages);
        self
    }

    pub fn isolated(mut self, isolated: bool) -> Self {
        self.isolated = isolated;
        self
    }
}

/// Uniform result of every pipeline stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub returncode: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionOutcome {
    /// Builds an outcome from captured streams, trimming both.
    pub fn new(returncode: i32, stdout: &str, stderr: &str) -> Self {
        Self {
            returncode,
            stdout: stdout.trim().to_string(),
            stderr: stderr.trim().to_string(),
        }
    }

    pub fn success() -> Self {
        Self::default()
    }

    pub fn failure(returncode: i32, stderr: impl Into<String>) -> Self {
        Self {
            returncode,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn timed_out() -> Self {
        Self::failure(process::TIMEOUT_EXIT_CODE, process::TIMEOUT_MESSAGE)
    }

    pub fn is_success(&self) -> bool {
        self.returncode == 0
    }

    pub fn is_timeout(&self) -> bool {
        self.returncode == process::TIMEOUT_EXIT_CODE
    }

    /// Rewrites a failed install result so callers can tell it apart from a failed run.
    /// Exit code and stdout are kept as the package manager reported them.
    pub fn into_install_failure(self) -> Self {
        Self {
            stderr: format!("{}{}", INSTALL_FAILURE_PREFIX, self.stderr),
            ..self
        }
    }

    pub fn is_install_failure(&self) -> bool {
        self.returncode != 0 && self.stderr.starts_with(INSTALL_FAILURE_PREFIX)
    }
}

/// Which executables to call and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeProfile {
    pub interpreter: String,
    pub inline_flag: String,
    pub package_manager: String,
    pub script_name: String,
    pub timeout: Duration,
    /// Parent directory for disposable workspaces; system temp dir when unset.
    pub temp_root: Option<PathBuf>,
}

impl Default for RuntimeProfile {
    fn default() -> Self {
        Self {
            interpreter: "node".into(),
            inline_flag: "-e".into(),
            package_manager: "npm".into(),
            script_name: "script.js".into(),
            timeout: DEFAULT_TIMEOUT,
            temp_root: None,
        }
    }
}

impl RuntimeProfile {
    pub fn from_config(cfg: &Config) -> Self {
        let defaults = Self::default();
        Self {
            interpreter: cfg.get("CODEXEC_NODE_PATH").unwrap_or(defaults.interpreter),
            inline_flag: cfg
                .get("CODEXEC_INLINE_FLAG")
                .unwrap_or(defaults.inline_flag),
            package_manager: cfg
                .get("CODEXEC_NPM_PATH")
                .unwrap_or(defaults.package_manager),
            script_name: cfg
                .get("CODEXEC_SCRIPT_NAME")
                .unwrap_or(defaults.script_name),
            timeout: cfg
                .get_u64("CODEXEC_TIMEOUT")
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            temp_root: cfg.get_path("CODEXEC_TEMP_ROOT"),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `<interpreter> <inline_flag> <code>`
    pub fn inline_command(&self, code: &str) -> Vec<String> {
        vec![
            self.interpreter.clone(),
            self.inline_flag.clone(),
            code.to_string(),
        ]
    }

    /// `<interpreter> <script>`
    pub fn script_command(&self, script: &Path) -> Vec<String> {
        vec![
            self.interpreter.clone(),
            script.to_string_lossy().into_owned(),
        ]
    }
}

/// Single entry point for running snippets. Stateless; clone it or share it across tasks.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    profile: RuntimeProfile,
}

impl Executor {
    pub fn new(profile: RuntimeProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &RuntimeProfile {
        &self.profile
    }

    /// Installs requested packages, then runs the snippet.
    ///
    /// Only workspace setup failures surface as `Err`; everything else, including a
    /// missing interpreter, comes back as an [`ExecutionOutcome`].
    pub async fn execute(&self, req: &ExecutionRequest) -> Result<ExecutionOutcome> {
        if req.isolated {
            return workspace::run_isolated(&self.profile, &req.code, req.packages.as_deref())
                .await;
        }

        let installed = install::install(
            req.packages.as_deref(),
            &self.profile.package_manager,
            None,
            self.profile.timeout,
        )
        .await;
        if !installed.is_success() {
            return Ok(installed.into_install_failure());
        }

        let cmd = self.profile.inline_command(&req.code);
        Ok(process::run(&cmd, None, self.profile.timeout).await)
    }
}
