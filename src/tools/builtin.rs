//! Built-in tools.
//!
//! A small arithmetic tool and a text echo, both constructed via
//! [`FnTool::new`] and returned as `Arc<dyn Tool>`.

use std::sync::Arc;

use crate::error::ColloquyError;
use crate::tools::tool::{FnTool, Tool};
use crate::tools::types::ToolParameters;

/// Create the `calculator` tool — basic arithmetic on two operands.
pub fn calculator_tool() -> Arc<dyn Tool> {
    Arc::new(FnTool::new(
        "calculator",
        "Perform basic arithmetic on two numbers",
        ToolParameters::object()
            .string_enum(
                "op",
                "Operation to perform",
                &["add", "sub", "mul", "div"],
                true,
            )
            .number("a", "First operand", true)
            .number("b", "Second operand", true)
            .build(),
        |args| async move {
            let op = args.get_str("op")?.to_string();
            let a = args.get_f64("a")?;
            let b = args.get_f64("b")?;
            let result = match op.as_str() {
                "add" => a + b,
                "sub" => a - b,
                "mul" => a * b,
                "div" => {
                    if b == 0.0 {
                        return Err(ColloquyError::ToolExecution {
                            tool_name: "calculator".into(),
                            message: "division by zero".into(),
                        });
                    }
                    a / b
                }
                other => {
                    return Err(ColloquyError::ToolExecution {
                        tool_name: "calculator".into(),
                        message: format!("unknown operation {other:?}"),
                    });
                }
            };
            // Render integers without a trailing ".0" so "2 + 3" comes back as "5".
            if result.fract() == 0.0 && result.abs() < 1e15 {
                Ok(format!("{}", result as i64))
            } else {
                Ok(result.to_string())
            }
        },
    ))
}

/// Create the `echo` tool — returns its input prefixed, useful for wiring checks.
pub fn echo_tool() -> Arc<dyn Tool> {
    Arc::new(FnTool::new(
        "echo",
        "Echo the given text back",
        ToolParameters::object()
            .string("text", "Text to echo", true)
            .build(),
        |args| async move { Ok(format!("Processed: {}", args.get_str("text")?)) },
    ))
}
