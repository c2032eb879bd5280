//! Per-entity result queries (`get_multi_<kind>_results`)

use anyhow::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::targets::{run_batch, TargetParams};
use super::{parse_params, schema_of, Tool, ToolOutput};
use crate::engine::selector::{IdsPerCase, NamesPerCase};
use crate::engine::{EmptyPolicy, EntityKind, EntityQuery, FemToolkit, Selection};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EntityResultsParams {
    #[serde(flatten)]
    pub target: TargetParams,
    /// Load case ID -> entity IDs in that case
    pub ids_per_case: Option<IdsPerCase>,
    /// Load case ID -> entity names in that case (used only without IDs)
    pub names_per_case: Option<NamesPerCase>,
    /// What to extract from the engine log; omit to get the whole log
    pub query: Option<String>,
}

pub struct EntityResultsTool {
    toolkit: Arc<FemToolkit>,
    kind: EntityKind,
}

impl EntityResultsTool {
    pub fn new(toolkit: Arc<FemToolkit>, kind: EntityKind) -> Self {
        Self { toolkit, kind }
    }

    fn noun(&self) -> &'static str {
        match self.kind {
            EntityKind::Node => "node",
            EntityKind::Element => "element",
            EntityKind::Part => "property",
            EntityKind::Material => "material",
            EntityKind::Set => "set",
        }
    }
}

#[async_trait]
impl Tool for EntityResultsTool {
    fn name(&self) -> String {
        format!("get_multi_{}_results", self.kind)
    }

    fn description(&self) -> String {
        format!(
            "Query results of one or more {noun}s per load case, by ID or by name, and extract the \
             part of the engine log that answers `query`. Give either result_file + result_category \
             or file_category_map for several files.",
            noun = self.noun()
        )
    }

    fn parameters(&self) -> Value {
        schema_of::<EntityResultsParams>()
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput> {
        let p: EntityResultsParams = match parse_params(params) {
            Ok(p) => p,
            Err(out) => return Ok(out),
        };
        let targets = match p.target.targets(None) {
            Ok(t) => t,
            Err(e) => return Ok(ToolOutput::failure(e)),
        };
        let selection = match Selection::from_parts(p.ids_per_case, p.names_per_case, EmptyPolicy::Reject) {
            Ok(s) => s,
            Err(e) => return Ok(ToolOutput::failure(e.to_string())),
        };

        let kind = self.kind;
        let toolkit = &self.toolkit;
        let selection = &selection;
        let query = p.query.as_deref();
        let prefix = format!("{} multi-result query log:\n", kind);

        Ok(run_batch(targets, |t| {
            let prefix = prefix.clone();
            async move {
                let request = EntityQuery {
                    result_file: t.result_file,
                    category: t.category,
                    kind,
                    selection: selection.clone(),
                    query: query.map(str::to_string),
                };
                toolkit
                    .entity_results(&request)
                    .await
                    .map(|text| format!("{}{}", prefix, text))
                    .map_err(|e| format!("{}{}", prefix, e))
            }
        })
        .await)
    }
}
