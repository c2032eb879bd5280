//! Whole-model CSV exports (`get_all_node_results`, `get_all_element_results`)

use anyhow::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

use super::{parse_params, schema_of, Tool, ToolOutput};
use crate::engine::{ExportQuery, FemToolkit, ResultCategory, ResultLocation};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExportParams {
    /// Path to a .h3d or .odb result file
    pub result_file: PathBuf,
    /// Displacement, Mises, Strain or PlasticStrain
    pub result_category: ResultCategory,
}

/// Every node or element result over all load cases, written to CSV
pub struct ExportAllResultsTool {
    toolkit: Arc<FemToolkit>,
    location: ResultLocation,
}

impl ExportAllResultsTool {
    pub fn new(toolkit: Arc<FemToolkit>, location: ResultLocation) -> Self {
        Self { toolkit, location }
    }
}

#[async_trait]
impl Tool for ExportAllResultsTool {
    fn name(&self) -> String {
        format!("get_all_{}_results", self.location)
    }

    fn description(&self) -> String {
        format!(
            "Export the results of all {}s in every load case to a CSV file next to the result file \
             and describe its columns.",
            self.location
        )
    }

    fn parameters(&self) -> Value {
        schema_of::<ExportParams>()
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput> {
        let p: ExportParams = match parse_params(params) {
            Ok(p) => p,
            Err(out) => return Ok(out),
        };
        let request = ExportQuery {
            result_file: p.result_file,
            category: p.result_category,
            location: self.location,
        };

        match self.toolkit.export_all_results(&request).await {
            Ok(export) => Ok(ToolOutput::success(
                json!({
                    "csv_path": export.csv_path.to_string_lossy(),
                    "schema": export.schema,
                }),
                export.describe(),
            )),
            Err(e) => Ok(ToolOutput::failure(e.to_string())),
        }
    }
}
