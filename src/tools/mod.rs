//! Tool System Module
//!
//! Structured tool calling with JSON schema definitions. Each FEM operation
//! is exposed as one tool; typed errors from the engine layer are flattened
//! into a failed [`ToolOutput`] here and nowhere else.

mod capture;
mod entity_results;
mod export;
mod max_result;
mod model_info;
mod targets;

pub use capture::CaptureScreenshotsTool;
pub use entity_results::EntityResultsTool;
pub use export::ExportAllResultsTool;
pub use max_result::MaxResultTool;
pub use model_info::ModelInfoTool;
pub use targets::{FileTarget, Target, TargetParams};

use anyhow::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::engine::{EntityKind, FemToolkit, ResultLocation};

/// Output from a tool execution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolOutput {
    /// Whether the tool execution was successful
    pub success: bool,
    /// The output data (can be string, JSON object, etc.)
    pub data: Value,
    /// Human-readable summary of the output
    pub summary: String,
    /// Optional error message if success is false
    pub error: Option<String>,
}

impl ToolOutput {
    /// Create a successful output
    pub fn success(data: impl Into<Value>, summary: impl Into<String>) -> Self {
        Self {
            success: true,
            data: data.into(),
            summary: summary.into(),
            error: None,
        }
    }

    /// Create a successful output with string data
    pub fn success_str(content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            success: true,
            summary: content.clone(),
            data: Value::String(content),
            error: None,
        }
    }

    /// Create a failed output
    pub fn failure(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            data: Value::Null,
            summary: format!("Error: {}", error),
            error: Some(error),
        }
    }
}

/// A tool call request parsed from LLM output
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub struct ToolCall {
    /// Name of the tool to call
    pub name: String,
    /// Parameters for the tool
    pub parameters: Value,
}

/// Trait for tools that can be executed by agents
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the unique name of the tool
    fn name(&self) -> String;

    /// Get a description of what the tool does
    fn description(&self) -> String;

    /// Get the JSON schema for the tool's parameters
    fn parameters(&self) -> Value;

    /// Execute the tool with the given parameters
    async fn execute(&self, params: Value) -> Result<ToolOutput>;
}

/// JSON schema of a parameter struct, as advertised to the LLM
pub(crate) fn schema_of<T: JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or_default()
}

/// Deserialize tool parameters, or explain why they are unusable
pub(crate) fn parse_params<T: serde::de::DeserializeOwned>(params: Value) -> std::result::Result<T, ToolOutput> {
    serde_json::from_value(params).map_err(|e| ToolOutput::failure(format!("Invalid parameters: {}", e)))
}

/// Registry for available tools
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
        }
    }

    /// A registry holding every FEM tool, all sharing one toolkit
    pub async fn with_fem_tools(toolkit: Arc<FemToolkit>) -> Self {
        let registry = Self::new();
        for kind in EntityKind::ALL {
            registry
                .register_instance(EntityResultsTool::new(toolkit.clone(), *kind))
                .await;
        }
        registry.register_instance(MaxResultTool::new(toolkit.clone())).await;
        registry.register_instance(ModelInfoTool::new(toolkit.clone())).await;
        registry
            .register_instance(CaptureScreenshotsTool::new(toolkit.clone()))
            .await;
        for location in ResultLocation::ALL {
            registry
                .register_instance(ExportAllResultsTool::new(toolkit.clone(), *location))
                .await;
        }
        registry
    }

    /// Register a tool instance
    pub async fn register_instance<T: Tool + 'static>(&self, tool: T) {
        let mut tools = self.tools.write().await;
        tools.insert(tool.name(), Arc::new(tool));
    }

    /// Get all tool names, sorted
    pub async fn tool_names(&self) -> Vec<String> {
        let tools = self.tools.read().await;
        let mut names: Vec<String> = tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Generate a combined schema for all tools (for LLM prompt)
    pub async fn generate_tools_prompt(&self) -> String {
        let tools = self.tools.read().await;
        if tools.is_empty() {
            return "No tools available.\n".to_string();
        }

        let mut names: Vec<_> = tools.keys().collect();
        names.sort();

        let mut prompt = String::from("Available Tools:\n\n");
        for name in names {
            let tool = &tools[name];
            prompt.push_str(&format!(
                "- {}: {} (params: {})\n",
                name,
                tool.description(),
                serde_json::to_string(&tool.parameters()).unwrap_or_default()
            ));
        }
        prompt
    }

    /// Get a specific tool by name
    pub async fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        let tools = self.tools.read().await;
        tools.get(name).cloned()
    }

    /// Execute a tool call; unknown tools and tool errors become failed outputs
    pub async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let tool = self.get_tool(&call.name).await;

        match tool {
            Some(tool) => match tool.execute(call.parameters.clone()).await {
                Ok(output) => output,
                Err(e) => {
                    tracing::warn!("Tool {} failed: {}", call.name, e);
                    ToolOutput::failure(e.to_string())
                }
            },
            None => ToolOutput::failure(format!("Unknown tool: {}", call.name)),
        }
    }

    /// Execute multiple tool calls in parallel
    pub async fn execute_parallel(&self, calls: &[ToolCall]) -> Vec<ToolOutput> {
        let futures = calls.iter().map(|call| self.execute(call));
        futures_util::future::join_all(futures).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
