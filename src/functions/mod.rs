//! Agent tool definition and tool-call dispatch for `code_exec_node`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::execution::{ExecutionOutcome, ExecutionRequest, Executor};

pub const TOOL_NAME: &str = "code_exec_node";

const TOOL_DESCRIPTION: &str = "Executes a Node.js code snippet with optional npm dependencies.\n\n\
The Node.js runtime has access to networking, the filesystem, and can use top-level await.\n\
A non-zero exit code is an error and should be fixed.\n\n\
Returns JSON containing 'returncode' (exit status of the execution), 'stdout' (captured \
standard output) and 'stderr' (captured standard error or install failure messages).";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSchema {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub r#type: String,
    pub function: FunctionSchema,
}

pub fn tool_definition() -> ToolSchema {
    ToolSchema {
        r#type: "function".into(),
        function: FunctionSchema {
            name: TOOL_NAME.into(),
            description: Some(TOOL_DESCRIPTION.into()),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "code": {
                        "type": "string",
                        "description": "The Node.js code to execute as a string."
                    },
                    "packages": {
                        "type": ["array", "null"],
                        "items": { "type": "string" },
                        "description": "Optional list of npm package names to install before execution."
                    },
                    "use_temp_dir": {
                        "type": "boolean",
                        "default": false,
                        "description": "Use a temporary working directory for code execution and npm installs."
                    }
                },
                "required": ["code"]
            }),
        },
    }
}

/// Parses tool-call arguments and runs them. Malformed arguments are an `Err`.
pub async fn execute_tool_call(executor: &Executor, args_json: &str) -> Result<ExecutionOutcome> {
    let req: ExecutionRequest = serde_json::from_str(args_json)
        .with_context(|| format!("invalid tool args json: {}", args_json))?;
    executor.execute(&req).await
}
