//! Extreme result over groups of the model (`get_max_result_for_entities`)

use anyhow::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::targets::{run_batch, TargetParams};
use super::{parse_params, schema_of, Tool, ToolOutput};
use crate::engine::selector::{IdsPerCase, NamesPerCase};
use crate::engine::{EmptyPolicy, FemToolkit, GroupKind, MaxResultQuery, ResultLocation, Selection};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MaxResultParams {
    #[serde(flatten)]
    pub target: TargetParams,
    /// Group to evaluate: material, property or ansapart
    pub entity_type: GroupKind,
    /// Load case ID -> group IDs (ansapart has no IDs)
    pub ids_per_case: Option<IdsPerCase>,
    /// Load case ID -> group names
    pub names_per_case: Option<NamesPerCase>,
    /// Evaluate on nodes (default) or elements
    #[serde(default)]
    pub node_or_element_result: ResultLocation,
    pub query: Option<String>,
}

/// Extreme values over groups, or over the whole model when no selector is given
pub struct MaxResultTool {
    toolkit: Arc<FemToolkit>,
}

impl MaxResultTool {
    pub fn new(toolkit: Arc<FemToolkit>) -> Self {
        Self { toolkit }
    }
}

#[async_trait]
impl Tool for MaxResultTool {
    fn name(&self) -> String {
        "get_max_result_for_entities".to_string()
    }

    fn description(&self) -> String {
        "Report the maximum result over selected materials, properties or ANSA parts per load case. \
         Without ids_per_case or names_per_case the whole unloaded model (case 0) is evaluated."
            .to_string()
    }

    fn parameters(&self) -> Value {
        schema_of::<MaxResultParams>()
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput> {
        let p: MaxResultParams = match parse_params(params) {
            Ok(p) => p,
            Err(out) => return Ok(out),
        };
        let targets = match p.target.targets(None) {
            Ok(t) => t,
            Err(e) => return Ok(ToolOutput::failure(e)),
        };
        let selection = match Selection::from_parts(p.ids_per_case, p.names_per_case, EmptyPolicy::SelectAll) {
            Ok(s) => s,
            Err(e) => return Ok(ToolOutput::failure(e.to_string())),
        };

        let group = p.entity_type;
        let location = p.node_or_element_result;
        let toolkit = &self.toolkit;
        let selection = &selection;
        let query = p.query.as_deref();
        let prefix = format!("{} max result query log:\n", group);

        Ok(run_batch(targets, |t| {
            let prefix = prefix.clone();
            async move {
                let request = MaxResultQuery {
                    result_file: t.result_file,
                    category: t.category,
                    group,
                    location,
                    selection: selection.clone(),
                    query: query.map(str::to_string),
                };
                toolkit
                    .max_result_for_entities(&request)
                    .await
                    .map(|text| format!("{}{}", prefix, text))
                    .map_err(|e| format!("{}{}", prefix, e))
            }
        })
        .await)
    }
}
