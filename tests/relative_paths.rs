//! Runs with a relative result file and the default `./images` directory.
//! The process working directory is changed here, so this file holds a
//! single test and runs as its own binary.

use async_trait::async_trait;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;
use tokio::sync::Mutex;

use femres_agent::engine::executor::LOG_FILE_NAME;
use femres_agent::engine::{BatchEngine, EngineExit, LogInterpreter, Script};
use femres_agent::error::ExecutionError;
use femres_agent::{EngineConfig, FemToolkit, ToolCall, ToolRegistry};

/// Writes every quoted target relative to its own working directory, the way
/// the post-processor resolves paths.
#[derive(Default)]
struct ScratchDirEngine {
    written: Mutex<Vec<std::path::PathBuf>>,
}

#[async_trait]
impl BatchEngine for ScratchDirEngine {
    async fn run(&self, script: &Script, workdir: &Path) -> Result<EngineExit, ExecutionError> {
        for command in script.commands() {
            let target = command
                .strip_prefix("write png ")
                .or_else(|| command.split_once(" lres all ").map(|(_, r)| r))
                .and_then(|r| r.strip_prefix('"')?.strip_suffix('"'));
            if let Some(target) = target {
                let target = workdir.join(target);
                if target.extension().is_some_and(|e| e == "png") {
                    image::RgbImage::new(20, 10).save(&target).unwrap();
                } else {
                    std::fs::write(&target, "Id,FunctionTop\n1,0.5\n").unwrap();
                }
                self.written.lock().await.push(target);
            }
        }
        std::fs::write(workdir.join(LOG_FILE_NAME), script.listing()).unwrap();
        Ok(EngineExit::default())
    }
}

fn call(name: &str, parameters: serde_json::Value) -> ToolCall {
    ToolCall {
        name: name.to_string(),
        parameters,
    }
}

#[tokio::test]
async fn test_relative_paths_resolve_against_caller_cwd() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("model.odb"), b"").unwrap();
    std::env::set_current_dir(dir.path()).unwrap();
    let cwd = std::env::current_dir().unwrap();

    let engine = Arc::new(ScratchDirEngine::default());
    let config = EngineConfig {
        font_path: None,
        ..EngineConfig::default()
    };
    let toolkit = FemToolkit::new(config, engine.clone(), LogInterpreter::passthrough()).unwrap();
    let registry = ToolRegistry::with_fem_tools(Arc::new(toolkit)).await;

    let out = registry
        .execute(&call(
            "get_all_node_results",
            json!({ "result_file": "model.odb", "result_category": "Mises" }),
        ))
        .await;
    assert!(out.success, "{}", out.summary);
    assert!(cwd.join("model_all_node_Mises_results.csv").exists());

    let out = registry
        .execute(&call(
            "capture_screenshots",
            json!({ "result_file": "model.odb", "result_category": "Mises", "entity_type": "material" }),
        ))
        .await;
    assert!(out.success, "{}", out.summary);
    let images = out.data["images"].as_array().unwrap();
    assert_eq!(images.len(), 1);
    let stitched = Path::new(images[0].as_str().unwrap());
    assert!(stitched.starts_with(cwd.join("images")));
    assert!(stitched.exists());

    let log = registry
        .execute(&call(
            "get_multi_node_results",
            json!({ "result_file": "model.odb", "result_category": "Mises", "ids_per_case": {"1": [7]} }),
        ))
        .await;
    assert!(log.success, "{}", log.summary);
    assert!(log
        .summary
        .contains(&format!("read geom AUTO {}", cwd.join("model.odb").display())));

    assert!(engine.written.lock().await.iter().all(|p| p.starts_with(&cwd)));
}
