//! Result-Load Prefix
//!
//! Builds the commands that open the geometry and read the requested result
//! functions. Every script starts with this prefix.

use std::path::Path;
use tracing::warn;

use super::family::{ResultCategory, ResultFile};
use super::script::CommandScript;
use super::tables::{self, CommandTables};
use crate::error::ResolutionError;

/// Load prefix for an already resolved result file
pub fn load_prefix(tables: &CommandTables, file: &ResultFile, category: ResultCategory) -> CommandScript {
    let mut script = CommandScript::new();
    let geometry = file.geometry.to_string_lossy();
    script.push(tables::fill(tables::READ_GEOMETRY, &[("geometry", &*geometry)]));

    let path = file.path.to_string_lossy();
    for template in tables.load_templates(file.family, category) {
        script.push(tables::fill(template, &[("file", &*path)]));
    }
    script
}

/// Outcome of building a prefix straight from a path
#[derive(Debug, Clone)]
pub struct LoadPrefix {
    pub script: CommandScript,
    /// The resolved file, or why resolution failed.
    pub file: Result<ResultFile, ResolutionError>,
}

/// Resolve `result_file` and build its prefix.
///
/// Resolution failures do not abort: the prefix degrades to one harmless
/// `echo` carrying the error, so the batch run still produces a log.
pub fn build(tables: &CommandTables, result_file: &Path, category: ResultCategory) -> LoadPrefix {
    match ResultFile::resolve(result_file) {
        Ok(file) => LoadPrefix {
            script: load_prefix(tables, &file, category),
            file: Ok(file),
        },
        Err(e) => {
            warn!("Result file resolution failed: {}", e);
            let mut script = CommandScript::new();
            let message = e.to_string().replace('\'', "");
            script.push(tables::fill(tables::DIAGNOSTIC_ECHO, &[("message", message.as_str())]));
            LoadPrefix {
                script,
                file: Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::family::ResultFamily;
    use tempfile::tempdir;

    #[test]
    fn test_every_defined_pair_has_one_geometry_load() {
        let tables = CommandTables::standard();
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("m.fem"), b"").unwrap();

        for (name, family) in [("m.h3d", ResultFamily::Hypermesh), ("m.odb", ResultFamily::Abaqus)] {
            let file = ResultFile::resolve(dir.path().join(name)).unwrap();
            for category in ResultCategory::ALL {
                let script = load_prefix(&tables, &file, category);
                let commands = script.commands();
                let expected = tables.load_templates(family, category).len();

                assert_eq!(commands.iter().filter(|c| c.starts_with("read geom")).count(), 1);
                assert!(commands[0].starts_with("read geom AUTO "));
                assert_eq!(commands.len(), 1 + expected);
            }
        }
    }

    #[test]
    fn test_abaqus_mises_prefix() {
        let tables = CommandTables::standard();
        let dir = tempdir().unwrap();
        let odb = dir.path().join("model.odb");
        let prefix = build(&tables, &odb, ResultCategory::Mises);
        let commands = prefix.script.commands();

        assert!(prefix.file.is_ok());
        assert_eq!(commands[0], format!("read geom AUTO {}", odb.display()));
        assert_eq!(commands[1], format!("read dis Abaqus {} all Displacements", odb.display()));
        assert!(commands[2].contains("Stresscomponents,VonMises"));
    }

    #[test]
    fn test_hypermesh_strain_is_geometry_only() {
        let tables = CommandTables::standard();
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("m.fem"), b"").unwrap();
        let prefix = build(&tables, &dir.path().join("m.h3d"), ResultCategory::Strain);
        assert_eq!(prefix.script.len(), 1);
    }

    #[test]
    fn test_resolution_failure_degrades_to_echo() {
        let tables = CommandTables::standard();
        let dir = tempdir().unwrap();
        let prefix = build(&tables, &dir.path().join("m.h3d"), ResultCategory::Mises);

        assert!(matches!(prefix.file, Err(ResolutionError::MissingGeometryFile(_))));
        assert_eq!(prefix.script.len(), 1);
        assert!(prefix.script.commands()[0].starts_with("echo '"));
        assert!(prefix.script.commands()[0].contains("m.fem"));
    }
}
