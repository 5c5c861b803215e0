mod cli;

use std::{
    io::{self, Read},
    time::Duration,
};

use anyhow::Result;
use codexec::{
    config::Config,
    functions,
    printer::{JsonPrinter, SummaryPrinter},
    utils, ExecutionRequest, Executor, RuntimeProfile,
};
use is_terminal::IsTerminal;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = cli::Cli::parse();

    if args.print_tool_schema {
        println!("{}", serde_json::to_string_pretty(&functions::tool_definition())?);
        return Ok(());
    }

    // Load config; CLI flags override it
    let cfg = Config::load();
    let mut profile = RuntimeProfile::from_config(&cfg);
    if let Some(node) = args.node.clone() {
        profile.interpreter = node;
    }
    if let Some(npm) = args.npm.clone() {
        profile.package_manager = npm;
    }
    if let Some(secs) = args.timeout {
        profile = profile.with_timeout(Duration::from_secs(secs));
    }
    for program in [&profile.interpreter, &profile.package_manager] {
        match utils::locate_executable(program) {
            Some(path) => log::debug!("{} -> {}", program, path.display()),
            None => log::warn!("{} not found; runs that need it will fail", program),
        }
    }
    let executor = Executor::new(profile);

    let outcome = if let Some(json) = args.tool_call.as_deref() {
        functions::execute_tool_call(&executor, json).await?
    } else {
        let needs_stdin = args.code.is_none() && args.file.is_none();
        let stdin = if !needs_stdin || io::stdin().is_terminal() {
            None
        } else {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Some(buf)
        };
        let isolated = cli::resolve_isolated(&args, cfg.get_bool("CODEXEC_USE_TEMP_DIR"));
        let code = utils::resolve_code(args.code, args.file.as_deref(), stdin)?;
        let packages = (!args.packages.is_empty()).then_some(args.packages);
        let req = ExecutionRequest {
            code,
            packages,
            isolated,
        };
        executor.execute(&req).await?
    };

    if args.pretty {
        SummaryPrinter {
            color: io::stdout().is_terminal(),
        }
        .print(&outcome);
    } else {
        JsonPrinter.print(&outcome)?;
    }
    Ok(())
}
