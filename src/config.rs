//! Process configuration, read once from the environment.

use std::path::PathBuf;

pub const DEFAULT_ENGINE: &str = "meta_post64.sh";
pub const DEFAULT_IMAGES_DIR: &str = "./images";
pub const DEFAULT_FONT: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";
pub const DEFAULT_IMAGE_URL_PREFIX: &str = "/images";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

/// Connection to the OpenAI-compatible endpoint used for log interpretation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Post-processor launcher script
    pub engine_path: PathBuf,
    /// Run the engine through `sudo -E`
    pub elevate: bool,
    /// Where captured views and stitched images are written
    pub images_dir: PathBuf,
    pub font_path: Option<PathBuf>,
    /// Engine defaults file read before capturing
    pub meta_defaults: Option<PathBuf>,
    pub image_url_prefix: String,
    pub keep_workdirs: bool,
    pub llm: Option<LlmConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            engine_path: PathBuf::from(DEFAULT_ENGINE),
            elevate: true,
            images_dir: PathBuf::from(DEFAULT_IMAGES_DIR),
            font_path: Some(PathBuf::from(DEFAULT_FONT)),
            meta_defaults: None,
            image_url_prefix: DEFAULT_IMAGE_URL_PREFIX.to_string(),
            keep_workdirs: false,
            llm: None,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let llm = get("FEM_LLM_BASE_URL").map(|base_url| LlmConfig {
            base_url,
            api_key: get("FEM_LLM_API_KEY"),
            model: get("FEM_LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
        });

        Self {
            engine_path: get("METABAT_PATH").map(PathBuf::from).unwrap_or(defaults.engine_path),
            elevate: get("FEM_ENGINE_ELEVATE").map(|v| parse_flag(&v)).unwrap_or(defaults.elevate),
            images_dir: get("IMAGES_PATH").map(PathBuf::from).unwrap_or(defaults.images_dir),
            font_path: get("FONT_PATH").map(PathBuf::from).or(defaults.font_path),
            meta_defaults: get("FEM_META_DEFAULTS").map(PathBuf::from),
            image_url_prefix: get("FEM_IMAGE_URL_PREFIX").unwrap_or(defaults.image_url_prefix),
            keep_workdirs: get("FEM_KEEP_WORKDIRS").map(|v| parse_flag(&v)).unwrap_or(defaults.keep_workdirs),
            llm,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> EngineConfig {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        EngineConfig::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(config(&[]), EngineConfig::default());
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("METABAT_PATH", "/opt/meta/meta_post64.sh"),
            ("FEM_ENGINE_ELEVATE", "false"),
            ("IMAGES_PATH", "/srv/images"),
            ("FEM_KEEP_WORKDIRS", "YES"),
            ("FEM_LLM_BASE_URL", "http://localhost:8000/v1"),
            ("FEM_LLM_API_KEY", "  "),
        ]);
        assert_eq!(cfg.engine_path, PathBuf::from("/opt/meta/meta_post64.sh"));
        assert!(!cfg.elevate);
        assert!(cfg.keep_workdirs);
        assert_eq!(cfg.images_dir, PathBuf::from("/srv/images"));

        let llm = cfg.llm.unwrap();
        assert_eq!(llm.base_url, "http://localhost:8000/v1");
        assert_eq!(llm.api_key, None);
        assert_eq!(llm.model, DEFAULT_LLM_MODEL);
    }
}
