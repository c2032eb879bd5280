//! Query-to-command compiler and result-artifact assembly for the META
//! post-processor.
//!
//! Requests are compiled into one ordered script (load prefix, then the
//! operation body), run as a single batch invocation, and the engine's side
//! effects (log, PNGs, CSV) are turned into text or artifacts.

pub mod capture;
pub mod executor;
pub mod export;
pub mod family;
pub mod interpreter;
pub mod loader;
pub mod script;
pub mod selector;
pub mod stitcher;
pub mod tables;
pub mod toolkit;

pub use capture::{CameraView, CaptureArtifact, CapturedView};
pub use executor::{BatchEngine, EngineExit, EngineLog, MetaBatchEngine, ScriptExecutor};
pub use export::TabularExport;
pub use family::{ResultCategory, ResultFamily, ResultFile};
pub use interpreter::LogInterpreter;
pub use script::{CommandScript, Script};
pub use selector::{EmptyPolicy, EntityKind, GroupKind, InfoType, LoadCase, ResultLocation, Selection};
pub use stitcher::{StitchedImage, Stitcher};
pub use toolkit::{CaptureQuery, EntityQuery, ExportQuery, FemToolkit, MaxResultQuery, ModelInfoQuery};
