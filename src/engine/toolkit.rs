//! FEM Toolkit
//!
//! The context object behind every public operation. It owns the command
//! tables, the executor, the log interpreter and the stitcher, and is built
//! once per process from an [`EngineConfig`].

use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::capture::{self, CaptureArtifact, CaptureSpec, CaseOutcome};
use super::executor::{BatchEngine, MetaBatchEngine, ScriptExecutor};
use super::export::{self, TabularExport};
use super::family::{file_stem, ResultCategory};
use super::interpreter::LogInterpreter;
use super::loader;
use super::script::CommandScript;
use super::selector::{self, EntityKind, GroupKind, InfoType, ResultLocation, Selection};
use super::stitcher::Stitcher;
use super::tables::{CommandTables, TableError};
use crate::agent::OpenAICompatibleProvider;
use crate::config::EngineConfig;
use crate::error::{ArtifactError, ExecutionError, FemError, FemResult};

/// Per-case results for one entity kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityQuery {
    pub result_file: PathBuf,
    pub category: ResultCategory,
    pub kind: EntityKind,
    pub selection: Selection,
    pub query: Option<String>,
}

/// Extreme values over selected groups, or the whole model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaxResultQuery {
    pub result_file: PathBuf,
    pub category: ResultCategory,
    pub group: GroupKind,
    pub location: ResultLocation,
    pub selection: Selection,
    pub query: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfoQuery {
    pub result_file: PathBuf,
    pub category: ResultCategory,
    pub info: InfoType,
    pub selection: Selection,
    pub query: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureQuery {
    pub result_file: PathBuf,
    pub category: ResultCategory,
    pub group: GroupKind,
    pub location: ResultLocation,
    pub selection: Selection,
    /// Overrides the configured images directory.
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportQuery {
    pub result_file: PathBuf,
    pub category: ResultCategory,
    pub location: ResultLocation,
}

/// Anchor a caller path at the process working directory.
///
/// The engine runs inside its own scratch directory, so every path placed in
/// a script or checked afterwards must be absolute.
pub(crate) fn anchored(path: &Path) -> FemResult<PathBuf> {
    std::path::absolute(path).map_err(|e| {
        FemError::from(ExecutionError::Workspace(format!(
            "cannot make {} absolute: {}",
            path.display(),
            e
        )))
    })
}

pub struct FemToolkit {
    config: EngineConfig,
    tables: CommandTables,
    executor: ScriptExecutor,
    interpreter: LogInterpreter,
    stitcher: Arc<Stitcher>,
}

impl FemToolkit {
    /// Assemble a toolkit around any engine; fails if the command tables are incomplete
    pub fn new(
        config: EngineConfig,
        engine: Arc<dyn BatchEngine>,
        interpreter: LogInterpreter,
    ) -> Result<Self, TableError> {
        let tables = CommandTables::standard();
        tables.validate()?;
        let executor = ScriptExecutor::new(engine).keep_workdirs(config.keep_workdirs);
        let stitcher = Arc::new(Stitcher::with_font_file(config.font_path.as_deref()));
        Ok(Self {
            config,
            tables,
            executor,
            interpreter,
            stitcher,
        })
    }

    /// The production toolkit: the META batch engine plus the configured LLM, if any
    pub fn from_config(config: EngineConfig) -> anyhow::Result<Self> {
        let engine = MetaBatchEngine::new(&config.engine_path).with_elevation(config.elevate);
        let interpreter = match &config.llm {
            Some(llm) => {
                info!("Log interpreter: {} at {}", llm.model, llm.base_url);
                LogInterpreter::new(
                    Arc::new(OpenAICompatibleProvider::new(llm.base_url.clone(), llm.api_key.clone())),
                    llm.model.clone(),
                )
            }
            None => {
                warn!("FEM_LLM_BASE_URL not set; queries will return full engine logs");
                LogInterpreter::passthrough()
            }
        };
        Ok(Self::new(config, Arc::new(engine), interpreter)?)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tables(&self) -> &CommandTables {
        &self.tables
    }

    /// Load prefix + body, one invocation, then interpretation
    async fn query(
        &self,
        result_file: &Path,
        category: ResultCategory,
        body: CommandScript,
        query: Option<&str>,
    ) -> FemResult<String> {
        let result_file = anchored(result_file)?;
        let mut script = loader::build(&self.tables, &result_file, category).script;
        script.append(body);
        let log = self.executor.execute(script.finish()).await?;
        Ok(self.interpreter.interpret(&log.text, query).await?)
    }

    /// Results of the selected entities across their load cases
    pub async fn entity_results(&self, request: &EntityQuery) -> FemResult<String> {
        info!("Querying {} results in {}", request.kind, request.result_file.display());
        let body = selector::compile_entity_filters(&self.tables, request.kind, &request.selection)?;
        self.query(&request.result_file, request.category, body, request.query.as_deref())
            .await
    }

    /// Maximum values over selected materials, properties or parts
    pub async fn max_result_for_entities(&self, request: &MaxResultQuery) -> FemResult<String> {
        info!(
            "Querying {} max {} result in {}",
            request.group,
            request.location,
            request.result_file.display()
        );
        let body = selector::compile_max_result(&self.tables, request.group, request.location, &request.selection)?;
        self.query(&request.result_file, request.category, body, request.query.as_deref())
            .await
    }

    /// Loads, constraints, parts, properties, materials or sets of the model
    pub async fn model_info(&self, request: &ModelInfoQuery) -> FemResult<String> {
        info!("Querying model {} info in {}", request.info, request.result_file.display());
        let body = selector::compile_model_info(&self.tables, request.info, &request.selection)?;
        self.query(&request.result_file, request.category, body, request.query.as_deref())
            .await
    }

    /// Seven-view contour captures, stitched into one image per case
    pub async fn capture_screenshots(&self, request: &CaptureQuery) -> FemResult<CaptureArtifact> {
        let result_file = anchored(&request.result_file)?;
        let output_dir = anchored(request.output_dir.as_deref().unwrap_or(&self.config.images_dir))?;
        tokio::fs::create_dir_all(&output_dir)
            .await
            .map_err(|e| ArtifactError::Io {
                path: output_dir.clone(),
                message: e.to_string(),
            })?;

        let meta_defaults = self.config.meta_defaults.as_deref().map(anchored).transpose()?;
        let stem = file_stem(&result_file);
        let token = Uuid::new_v4().simple().to_string();
        let stamp = format!("{}_{}", Local::now().format("%Y%m%d_%H%M%S"), &token[..8]);
        let plan = capture::compile_capture(
            &self.tables,
            &CaptureSpec {
                stem: &stem,
                category: request.category,
                group: request.group,
                location: request.location,
                selection: &request.selection,
                output_dir: &output_dir,
                meta_defaults: meta_defaults.as_deref(),
                stamp: &stamp,
            },
        )?;
        info!(
            "Capturing {} case(s) of {} into {}",
            plan.cases.len(),
            result_file.display(),
            output_dir.display()
        );

        let mut script = loader::build(&self.tables, &result_file, request.category).script;
        script.append(plan.script);

        // Images are the artifact; a missing log is reported but does not stop stitching.
        let note = match self.executor.execute(script.finish()).await {
            Ok(_) => None,
            Err(e @ ExecutionError::LogFileNotFound(_)) => {
                warn!("Capture run left no log: {}", e);
                Some(e.to_string())
            }
            Err(e) => return Err(e.into()),
        };

        let mut cases = Vec::with_capacity(plan.cases.len());
        for planned in plan.cases {
            let stitcher = Arc::clone(&self.stitcher);
            let views = planned.views;
            let image = tokio::task::spawn_blocking(move || stitcher.stitch(&views, None))
                .await
                .unwrap_or_else(|e| Err(ArtifactError::Image(format!("stitch task failed: {}", e))));
            if let Err(e) = &image {
                warn!("Case {} could not be stitched: {}", planned.case, e);
            }
            cases.push(CaseOutcome {
                case: planned.case,
                whole_model: planned.whole_model,
                image,
            });
        }

        Ok(CaptureArtifact { cases, note })
    }

    /// Every node or element result across all cases, written to CSV
    pub async fn export_all_results(&self, request: &ExportQuery) -> FemResult<TabularExport> {
        let result_file = anchored(&request.result_file)?;
        let csv_path = export::csv_path(&result_file, request.location, request.category);
        info!("Exporting all {} results to {}", request.location, csv_path.display());

        let mut script = loader::build(&self.tables, &result_file, request.category).script;
        script.append(export::compile_export(request.location, &csv_path));

        match self.executor.execute(script.finish()).await {
            Ok(_) => {}
            Err(e @ ExecutionError::LogFileNotFound(_)) => warn!("Export run left no log: {}", e),
            Err(e) => return Err(e.into()),
        }

        if !tokio::fs::try_exists(&csv_path).await.unwrap_or(false) {
            return Err(ArtifactError::OutputNotGenerated(csv_path).into());
        }
        Ok(TabularExport {
            csv_path,
            schema: export::schema(request.location),
        })
    }
}
