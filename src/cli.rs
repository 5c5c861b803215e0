use std::path::PathBuf;

use clap::{ArgGroup, Parser};

#[derive(Parser, Debug, Clone)]
#[command(name = "codexec", about = "Run a Node.js snippet and report what happened", version)]
#[command(group(ArgGroup::new("source").args(["code", "file", "tool_call", "print_tool_schema"]).multiple(false)))]
pub struct Cli {
    /// Code to run. Read from stdin when omitted.
    #[arg(value_name = "CODE")]
    pub code: Option<String>,

    /// Read the snippet from a file.
    #[arg(short = 'f', long)]
    pub file: Option<PathBuf>,

    /// npm package to install before running (repeatable).
    #[arg(short = 'p', long = "package", action = clap::ArgAction::Append, conflicts_with = "tool_call")]
    pub packages: Vec<String>,

    /// Run in a disposable directory; packages are installed there too.
    #[arg(short = 'i', long, visible_alias = "temp-dir", conflicts_with = "tool_call")]
    pub isolated: bool,

    /// Run inline even when CODEXEC_USE_TEMP_DIR is set.
    #[arg(long = "no-isolated", visible_alias = "inline", conflicts_with_all = ["isolated", "tool_call"])]
    pub no_isolated: bool,

    /// Wall-clock limit per child process, in seconds.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Interpreter executable.
    #[arg(long = "node")]
    pub node: Option<String>,

    /// Package manager executable.
    #[arg(long = "npm")]
    pub npm: Option<String>,

    /// Print a colored summary instead of JSON.
    #[arg(long)]
    pub pretty: bool,

    /// Run tool-call arguments given as JSON (`code`, `packages`, `use_temp_dir`).
    #[arg(long = "tool-call", value_name = "JSON")]
    pub tool_call: Option<String>,

    /// Print the agent tool definition and exit.
    #[arg(long = "print-tool-schema")]
    pub print_tool_schema: bool,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

/// `--isolated`/`--no-isolated` win over the configured default.
pub fn resolve_isolated(cli: &Cli, configured: bool) -> bool {
    if cli.no_isolated {
        false
    } else {
        cli.isolated || configured
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_packages_and_flags() {
        let cli = Cli::try_parse_from([
            "codexec", "-p", "lodash", "--package", "chalk", "--temp-dir", "--timeout", "5",
            "console.log(1)",
        ])
        .unwrap();
        assert_eq!(cli.packages, vec!["lodash", "chalk"]);
        assert!(cli.isolated);
        assert_eq!(cli.timeout, Some(5));
        assert_eq!(cli.code.as_deref(), Some("console.log(1)"));
    }

    #[test]
    fn code_and_file_conflict() {
        assert!(Cli::try_parse_from(["codexec", "--file", "a.js", "1+1"]).is_err());
    }

    #[test]
    fn tool_call_rejects_request_flags() {
        let args = r#"{"code":"1"}"#;
        let extras: [&[&str]; 4] = [
            &["-p", "lodash"],
            &["--isolated"],
            &["--file", "a.js"],
            &["--no-isolated"],
        ];
        for extra in extras {
            let mut argv = vec!["codexec", "--tool-call", args];
            argv.extend_from_slice(extra);
            assert!(Cli::try_parse_from(argv).is_err(), "accepted {:?}", extra);
        }
    }

    #[test]
    fn no_isolated_conflicts_with_isolated() {
        assert!(Cli::try_parse_from(["codexec", "--isolated", "--no-isolated", "1"]).is_err());
        let cli = Cli::try_parse_from(["codexec", "--inline", "1"]).unwrap();
        assert!(cli.no_isolated && !cli.isolated);
    }

    #[test]
    fn isolation_flags_override_config() {
        let parse = |argv: &[&str]| Cli::try_parse_from(argv).unwrap();
        assert!(!resolve_isolated(&parse(&["codexec", "--no-isolated", "1"]), true));
        assert!(resolve_isolated(&parse(&["codexec", "1"]), true));
        assert!(resolve_isolated(&parse(&["codexec", "-i", "1"]), false));
        assert!(!resolve_isolated(&parse(&["codexec", "1"]), false));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(Cli::try_parse_from(["codexec", "--timeout", "0", "1"]).is_err());
    }
}
