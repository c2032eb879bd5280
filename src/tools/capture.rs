//! Seven-view contour captures (`capture_screenshots`)

use anyhow::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use super::{parse_params, schema_of, Tool, ToolOutput};
use crate::engine::selector::{IdsPerCase, NamesPerCase};
use crate::engine::{CaptureQuery, EmptyPolicy, FemToolkit, GroupKind, ResultCategory, ResultLocation, Selection};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CaptureParams {
    /// Path to a .h3d or .odb result file
    pub result_file: PathBuf,
    pub result_category: ResultCategory,
    /// Group to display: material, property or ansapart
    pub entity_type: GroupKind,
    pub ids_per_case: Option<IdsPerCase>,
    pub names_per_case: Option<NamesPerCase>,
    /// Directory for the images; defaults to the configured images directory
    pub output_dir: Option<PathBuf>,
    /// Fringe on nodes (default) or elements
    #[serde(default)]
    pub node_or_element_result: ResultLocation,
    /// Accepted for symmetry with the query tools; captures do not read the log
    pub query: Option<String>,
}

/// Contour plots from seven fixed views, stitched into one image per load case
pub struct CaptureScreenshotsTool {
    toolkit: Arc<FemToolkit>,
}

impl CaptureScreenshotsTool {
    pub fn new(toolkit: Arc<FemToolkit>) -> Self {
        Self { toolkit }
    }
}

#[async_trait]
impl Tool for CaptureScreenshotsTool {
    fn name(&self) -> String {
        "capture_screenshots".to_string()
    }

    fn description(&self) -> String {
        "Capture contour plots of the selected materials, properties or ANSA parts per load case \
         from the isometric, top, front, left, bottom, back and right views, stitch each case into \
         one captioned image and return HTML referencing the images. Without a selector the whole \
         model is captured in case 0."
            .to_string()
    }

    fn parameters(&self) -> Value {
        schema_of::<CaptureParams>()
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput> {
        let p: CaptureParams = match parse_params(params) {
            Ok(p) => p,
            Err(out) => return Ok(out),
        };
        if let Some(q) = &p.query {
            debug!("Ignoring query for capture: {}", q);
        }
        let selection = match Selection::from_parts(p.ids_per_case, p.names_per_case, EmptyPolicy::SelectAll) {
            Ok(s) => s,
            Err(e) => return Ok(ToolOutput::failure(e.to_string())),
        };

        let request = CaptureQuery {
            result_file: p.result_file,
            category: p.result_category,
            group: p.entity_type,
            location: p.node_or_element_result,
            selection,
            output_dir: p.output_dir,
        };

        match self.toolkit.capture_screenshots(&request).await {
            Ok(artifact) => {
                let html = artifact.to_html(&self.toolkit.config().image_url_prefix);
                let images: Vec<String> = artifact
                    .images()
                    .map(|i| i.path.to_string_lossy().to_string())
                    .collect();
                Ok(ToolOutput::success(json!({ "html": html, "images": images }), html))
            }
            Err(e) => Ok(ToolOutput::failure(e.to_string())),
        }
    }
}
