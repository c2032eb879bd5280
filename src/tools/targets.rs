//! Result-file targets shared by the query tools.
//!
//! A call names either one `result_file` or a `file_category_map` of
//! labelled files. Each file becomes its own complete operation; the
//! outputs are joined under one heading per label.

use futures_util::future::join_all;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;

use super::ToolOutput;
use crate::engine::ResultCategory;

/// One labelled result file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, JsonSchema)]
pub struct FileTarget {
    /// Path to a .h3d or .odb result file
    pub result_file: PathBuf,
    /// Result category to load: Displacement, Mises, Strain or PlasticStrain
    pub result_category: ResultCategory,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct TargetParams {
    /// Path to a .h3d or .odb result file
    pub result_file: Option<PathBuf>,
    /// Result category to load: Displacement, Mises, Strain or PlasticStrain
    pub result_category: Option<ResultCategory>,
    /// Several result files at once: label -> {result_file, result_category}
    pub file_category_map: Option<BTreeMap<String, FileTarget>>,
}

/// A resolved unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// `None` for a single-file call.
    pub label: Option<String>,
    pub result_file: PathBuf,
    pub category: ResultCategory,
}

impl TargetParams {
    /// Expand into targets; the map wins over a single file when both are given
    pub fn targets(&self, default_category: Option<ResultCategory>) -> Result<Vec<Target>, String> {
        if let Some(map) = self.file_category_map.as_ref().filter(|m| !m.is_empty()) {
            return Ok(map
                .iter()
                .map(|(label, t)| Target {
                    label: Some(label.clone()),
                    result_file: t.result_file.clone(),
                    category: t.result_category,
                })
                .collect());
        }

        let result_file = self
            .result_file
            .clone()
            .ok_or("either result_file or file_category_map must be provided")?;
        let category = self
            .result_category
            .or(default_category)
            .ok_or("result_category is required")?;
        Ok(vec![Target {
            label: None,
            result_file,
            category,
        }])
    }
}

/// Run `op` for every target concurrently and merge the outputs in target order
pub async fn run_batch<F, Fut>(targets: Vec<Target>, op: F) -> ToolOutput
where
    F: Fn(Target) -> Fut,
    Fut: Future<Output = Result<String, String>>,
{
    if targets.len() == 1 && targets[0].label.is_none() {
        let target = targets.into_iter().next();
        return match target {
            Some(t) => match op(t).await {
                Ok(text) => ToolOutput::success_str(text),
                Err(e) => ToolOutput::failure(e),
            },
            None => ToolOutput::failure("no result file given"),
        };
    }

    let outcomes = join_all(targets.iter().cloned().map(&op)).await;

    let mut sections = Vec::with_capacity(targets.len());
    let mut entries = Vec::with_capacity(targets.len());
    let mut first_error = None;
    for (target, outcome) in targets.iter().zip(outcomes) {
        let label = target.label.clone().unwrap_or_default();
        let (ok, text) = match outcome {
            Ok(text) => (true, text),
            Err(e) => {
                first_error.get_or_insert_with(|| format!("{}: {}", label, e));
                (false, format!("Error: {}", e))
            }
        };
        sections.push(format!("===== {} ({}) =====\n{}", label, target.result_file.display(), text));
        entries.push(json!({
            "label": label,
            "result_file": target.result_file.to_string_lossy(),
            "success": ok,
            "output": text,
        }));
    }

    ToolOutput {
        success: first_error.is_none(),
        data: json!({ "results": entries }),
        summary: sections.join("\n\n"),
        error: first_error,
    }
}
