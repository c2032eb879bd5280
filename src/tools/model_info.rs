//! Model attribute listings (`get_model_info`)

use anyhow::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use super::targets::{run_batch, Target};
use super::{parse_params, schema_of, Tool, ToolOutput};
use crate::engine::selector::{IdsPerCase, NamesPerCase};
use crate::engine::{EmptyPolicy, FemToolkit, InfoType, ModelInfoQuery, ResultCategory, Selection};

/// One labelled file and the attributes to list from it
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FileInfoTarget {
    pub result_file: PathBuf,
    /// loads, spc, ansapart, property, material or set
    pub info_types: Vec<InfoType>,
    /// Only decides which results are loaded alongside the model (default Mises)
    #[serde(default)]
    pub result_category: ResultCategory,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ModelInfoParams {
    pub result_file: Option<PathBuf>,
    #[serde(default)]
    pub info_types: Vec<InfoType>,
    pub result_category: Option<ResultCategory>,
    /// Several files at once: label -> {result_file, info_types, result_category}
    pub file_info_map: Option<BTreeMap<String, FileInfoTarget>>,
    /// Load case ID -> entity IDs; case 0 is the unloaded model
    pub ids_per_case: Option<IdsPerCase>,
    pub names_per_case: Option<NamesPerCase>,
    pub query: Option<String>,
}

impl ModelInfoParams {
    /// One target per (file, info type), labelled when more than one results
    fn jobs(&self) -> Result<Vec<(Target, InfoType)>, String> {
        let files: Vec<(Option<String>, FileInfoTarget)> = match self.file_info_map.as_ref().filter(|m| !m.is_empty()) {
            Some(map) => map.iter().map(|(l, t)| (Some(l.clone()), t.clone())).collect(),
            None => {
                let result_file = self
                    .result_file
                    .clone()
                    .ok_or("either result_file or file_info_map must be provided")?;
                vec![(
                    None,
                    FileInfoTarget {
                        result_file,
                        info_types: self.info_types.clone(),
                        result_category: self.result_category.unwrap_or_default(),
                    },
                )]
            }
        };

        let mut jobs = Vec::new();
        for (label, file) in files {
            if file.info_types.is_empty() {
                return Err(format!(
                    "info_types must list at least one of: {}",
                    InfoType::supported()
                ));
            }
            for info in &file.info_types {
                jobs.push((
                    Target {
                        label: label.clone(),
                        result_file: file.result_file.clone(),
                        category: file.result_category,
                    },
                    *info,
                ));
            }
        }

        if jobs.len() > 1 {
            for (target, info) in jobs.iter_mut() {
                let base = target.label.clone().unwrap_or_else(|| "model".to_string());
                target.label = Some(format!("{} / {}", base, info));
            }
        }
        Ok(jobs)
    }
}

/// Loads, constraints, parts, properties, materials or sets of a model
pub struct ModelInfoTool {
    toolkit: Arc<FemToolkit>,
}

impl ModelInfoTool {
    pub fn new(toolkit: Arc<FemToolkit>) -> Self {
        Self { toolkit }
    }
}

#[async_trait]
impl Tool for ModelInfoTool {
    fn name(&self) -> String {
        "get_model_info".to_string()
    }

    fn description(&self) -> String {
        "List model information (loads, spc, ansapart, property, material, set) for the whole model \
         or for selected IDs or names per load case, then extract what `query` asks for."
            .to_string()
    }

    fn parameters(&self) -> Value {
        schema_of::<ModelInfoParams>()
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput> {
        let p: ModelInfoParams = match parse_params(params) {
            Ok(p) => p,
            Err(out) => return Ok(out),
        };
        let jobs = match p.jobs() {
            Ok(j) => j,
            Err(e) => return Ok(ToolOutput::failure(e)),
        };
        let selection = match Selection::from_parts(p.ids_per_case.clone(), p.names_per_case.clone(), EmptyPolicy::SelectAll) {
            Ok(s) => s,
            Err(e) => return Ok(ToolOutput::failure(e.to_string())),
        };

        let info_by_label: BTreeMap<Option<String>, InfoType> =
            jobs.iter().map(|(t, i)| (t.label.clone(), *i)).collect();
        let targets: Vec<Target> = jobs.into_iter().map(|(t, _)| t).collect();

        let toolkit = &self.toolkit;
        let selection = &selection;
        let info_by_label = &info_by_label;
        let query = p.query.as_deref();

        Ok(run_batch(targets, |t| async move {
            let prefix = "Model info query log:\n";
            let Some(&info) = info_by_label.get(&t.label) else {
                return Err(format!("{}no info type for {}", prefix, t.result_file.display()));
            };
            let request = ModelInfoQuery {
                result_file: t.result_file,
                category: t.category,
                info,
                selection: selection.clone(),
                query: query.map(str::to_string),
            };
            toolkit
                .model_info(&request)
                .await
                .map(|text| format!("{}{}", prefix, text))
                .map_err(|e| format!("{}{}", prefix, e))
        })
        .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_file_one_job_per_info_type() {
        let p: ModelInfoParams = serde_json::from_value(json!({
            "result_file": "m.odb",
            "info_types": ["loads", "spc"]
        }))
        .unwrap();
        let jobs = p.jobs().unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].0.category, ResultCategory::Mises);
        assert_eq!(jobs[0].0.label.as_deref(), Some("model / loads"));
        assert_eq!(jobs[1].1, InfoType::Spc);
    }

    #[test]
    fn test_single_job_stays_unlabelled() {
        let p: ModelInfoParams = serde_json::from_value(json!({
            "result_file": "m.odb",
            "info_types": ["set"]
        }))
        .unwrap();
        let jobs = p.jobs().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].0.label, None);
    }

    #[test]
    fn test_info_types_required() {
        let p: ModelInfoParams = serde_json::from_value(json!({ "result_file": "m.odb" })).unwrap();
        assert!(p.jobs().unwrap_err().contains("loads, spc, ansapart, property, material, set"));
    }

    #[test]
    fn test_unknown_info_type_is_rejected_by_schema() {
        let parsed = serde_json::from_value::<ModelInfoParams>(json!({
            "result_file": "m.odb",
            "info_types": ["stiffness"]
        }));
        assert!(parsed.is_err());
    }
}
