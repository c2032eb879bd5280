//! Result Families and Geometry Resolution
//!
//! A result file belongs to a family decided by its extension. The family
//! fixes where the geometry comes from and which read grammar the engine uses.

use schemars::JsonSchema;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

use crate::error::{ResolutionError, SelectionError};

/// Analysis tool that produced a result file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResultFamily {
    /// `.h3d` results; geometry lives in a sibling `.fem` deck that must exist.
    Hypermesh,
    /// `.odb` results; self-describing, a sibling `.inp` deck is preferred when present.
    Abaqus,
}

impl ResultFamily {
    pub const ALL: [ResultFamily; 2] = [ResultFamily::Hypermesh, ResultFamily::Abaqus];

    /// Infer the family from a path's extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "h3d" => Some(ResultFamily::Hypermesh),
            "odb" => Some(ResultFamily::Abaqus),
            _ => None,
        }
    }

    /// Reader name used by the engine's `read` commands
    pub fn reader(&self) -> &'static str {
        match self {
            ResultFamily::Hypermesh => "Hypermesh",
            ResultFamily::Abaqus => "Abaqus",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ResultFamily::Hypermesh => ".h3d",
            ResultFamily::Abaqus => ".odb",
        }
    }

    fn geometry_extension(&self) -> &'static str {
        match self {
            ResultFamily::Hypermesh => "fem",
            ResultFamily::Abaqus => "inp",
        }
    }
}

impl fmt::Display for ResultFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reader())
    }
}

/// Which result functions to load on top of the geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, JsonSchema)]
pub enum ResultCategory {
    Displacement,
    Mises,
    Strain,
    PlasticStrain,
}

impl ResultCategory {
    pub const ALL: [ResultCategory; 4] = [
        ResultCategory::Displacement,
        ResultCategory::Mises,
        ResultCategory::Strain,
        ResultCategory::PlasticStrain,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResultCategory::Displacement => "Displacement",
            ResultCategory::Mises => "Mises",
            ResultCategory::Strain => "Strain",
            ResultCategory::PlasticStrain => "PlasticStrain",
        }
    }
}

impl Default for ResultCategory {
    fn default() -> Self {
        ResultCategory::Mises
    }
}

impl fmt::Display for ResultCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultCategory {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResultCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SelectionError::UnsupportedCategory(s.to_string()))
    }
}

impl<'de> Deserialize<'de> for ResultCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// A result file with its family and the file the geometry is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultFile {
    pub path: PathBuf,
    pub family: ResultFamily,
    /// Equal to `path` when the family carries its own geometry.
    pub geometry: PathBuf,
}

impl ResultFile {
    /// Resolve the family and geometry file for `path`.
    ///
    /// Touches the filesystem only to check whether the companion deck exists.
    pub fn resolve(path: impl AsRef<Path>) -> Result<Self, ResolutionError> {
        let path = path.as_ref();
        let family =
            ResultFamily::from_path(path).ok_or_else(|| ResolutionError::unsupported(path))?;
        let companion = path.with_extension(family.geometry_extension());

        let geometry = match family {
            ResultFamily::Hypermesh => {
                if !companion.exists() {
                    return Err(ResolutionError::MissingGeometryFile(companion));
                }
                companion
            }
            ResultFamily::Abaqus => {
                if companion.exists() {
                    companion
                } else {
                    path.to_path_buf()
                }
            }
        };

        debug!("Resolved {} ({}) geometry -> {}", path.display(), family, geometry.display());
        Ok(Self {
            path: path.to_path_buf(),
            family,
            geometry,
        })
    }

    /// File name without directory or any extension, as used in generated names
    pub fn stem(&self) -> String {
        file_stem(&self.path)
    }

    /// Path with its final extension removed, as used for sibling outputs
    pub fn base_path(&self) -> PathBuf {
        self.path.with_extension("")
    }
}

/// File name up to its first dot
pub fn file_stem(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy())
        .and_then(|n| n.split('.').next().map(str::to_string))
        .unwrap_or_default()
}
