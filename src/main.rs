//! FEM Result Agent
//!
//! Interactive front end over the FEM tools. Each line is a tool name
//! followed by its JSON parameters, e.g.
//!
//! ```text
//! get_multi_node_results {"result_file": "/data/door.odb", "result_category": "Mises", "ids_per_case": {"1": [100, 200]}}
//! ```
//!
//! With arguments, runs a single call and exits.

use anyhow::{Context, Result};
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use femres_agent::{EngineConfig, FemToolkit, ToolCall, ToolOutput, ToolRegistry};

fn parse_call(line: &str) -> Result<ToolCall> {
    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };
    let parameters = if rest.is_empty() {
        serde_json::json!({})
    } else {
        serde_json::from_str(rest).with_context(|| format!("parameters for {} are not valid JSON", name))?
    };
    Ok(ToolCall {
        name: name.to_string(),
        parameters,
    })
}

fn print_output(output: &ToolOutput) {
    if output.success {
        println!("\n{}\n", output.summary);
    } else {
        println!("\n❌ {}\n", output.summary);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    let level = std::env::var("FEM_LOG_LEVEL")
        .ok()
        .and_then(|l| Level::from_str(&l).ok())
        .unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")?;

    let config = EngineConfig::from_env();
    info!("Engine: {} (elevated: {})", config.engine_path.display(), config.elevate);
    let toolkit = Arc::new(FemToolkit::from_config(config)?);
    let registry = ToolRegistry::with_fem_tools(toolkit).await;

    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        let call = parse_call(&args.join(" "))?;
        let output = registry.execute(&call).await;
        print_output(&output);
        if !output.success {
            std::process::exit(1);
        }
        return Ok(());
    }

    println!("\n{}", "═".repeat(60));
    println!("FEM Result Agent v{}", env!("CARGO_PKG_VERSION"));
    println!("{}", "═".repeat(60));
    println!("Commands: 'tools' | 'schema' | 'quit' | <tool_name> <json parameters>\n");

    loop {
        print!("fem> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        match line.to_lowercase().as_str() {
            "quit" | "exit" | "q" => break,
            "tools" => {
                for name in registry.tool_names().await {
                    println!("  {}", name);
                }
                continue;
            }
            "schema" => {
                println!("{}", registry.generate_tools_prompt().await);
                continue;
            }
            _ => {}
        }

        match parse_call(line) {
            Ok(call) => print_output(&registry.execute(&call).await),
            Err(e) => println!("\n❌ {:#}\n", e),
        }
    }

    Ok(())
}
