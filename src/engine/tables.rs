//! Command Tables
//!
//! Every engine command the compiler can emit is spelled out here as a
//! template, keyed by the enums that select it. Operations look templates up
//! instead of branching on strings, and `validate` checks the tables once at
//! startup so a missing row fails fast rather than mid-script.

use std::collections::BTreeMap;
use thiserror::Error;

use super::family::{ResultCategory, ResultFamily};
use super::selector::{EntityKind, GroupKind, InfoType};

/// Geometry load, always the first command of a script.
pub const READ_GEOMETRY: &str = "read geom AUTO {geometry}";
/// Emitted in place of the load prefix when resolution fails.
pub const DIAGNOSTIC_ECHO: &str = "echo '{message}'";

pub const MESSAGE: &str = r#"options message "{text}""#;
pub const SET_STATE: &str = r#"options state "{case}""#;

pub const FILTER_BY_ID: &str = "identify advfilter {output} add:{entity}:{id_field}:{range}:Keep All";
pub const FILTER_BY_NAME: &str = "identify advfilter {output} add:{entity}:{name_field}:{range}:Keep All";

pub const ERASE_ALL: &str = "erase all";
pub const ERASE_NONE: &str = "erase none";

pub const FUNCTION_INFO_NODAL: &str = "function info nodal visible";
pub const FUNCTION_INFO_ELEMENT: &str = "function info visible";
pub const FRINGE_ON_NODE: &str = "grstyle scalarfringe onnode";
pub const FRINGE_ON_ELEMENT: &str = "grstyle scalarfringe onelement";

pub const INFO_ALL: &str = "{base} all";
pub const INFO_BY_ID: &str = "{base} {range}";
pub const INFO_BY_NAME: &str = "{base} name {range}";

/// How one entity kind is addressed by the advanced filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityChannel {
    /// Entity name inside the filter expression (e.g. `Nodes`).
    pub internal: &'static str,
    /// Output channel the filter is attached to (e.g. `nodeoutput`).
    pub output: &'static str,
    pub id_field: &'static str,
    pub name_field: &'static str,
}

/// Display-selection commands for one group kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupCommands {
    /// `None` when the engine has no ID grammar for this kind.
    pub add_by_id: Option<&'static str>,
    pub add_by_name: &'static str,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("no filter channel for entity kind {0}")]
    MissingEntity(EntityKind),
    #[error("no selection commands for group kind {0}")]
    MissingGroup(GroupKind),
    #[error("no identify command for info type {0}")]
    MissingInfo(InfoType),
    #[error("load template for {family}/{category} does not reference {{file}}: {template}")]
    BadLoadTemplate {
        family: ResultFamily,
        category: ResultCategory,
        template: &'static str,
    },
}

/// All lookup tables used to compile scripts
#[derive(Debug, Clone)]
pub struct CommandTables {
    loads: BTreeMap<(ResultFamily, ResultCategory), &'static [&'static str]>,
    entities: BTreeMap<EntityKind, EntityChannel>,
    groups: BTreeMap<GroupKind, GroupCommands>,
    info: BTreeMap<InfoType, &'static str>,
}

impl CommandTables {
    /// The tables for the META post-processor grammar
    pub fn standard() -> Self {
        let mut loads: BTreeMap<(ResultFamily, ResultCategory), &'static [&'static str]> = BTreeMap::new();
        loads.insert(
            (ResultFamily::Hypermesh, ResultCategory::Displacement),
            &[
                "read dis Hypermesh {file} all Displacement",
                "read onlyfun Hypermesh {file} all Displacement,Magnitude",
            ],
        );
        loads.insert(
            (ResultFamily::Hypermesh, ResultCategory::Mises),
            &[
                "read dis Hypermesh {file} all Displacement",
                "read onlyfun Hypermesh {file} all ElementStresses(2D&3D),VonMises,Max",
            ],
        );
        loads.insert(
            (ResultFamily::Abaqus, ResultCategory::Displacement),
            &[
                "read dis Abaqus {file} all Displacements",
                "read onlyfun Abaqus {file} all Displacements,Magnitude",
            ],
        );
        loads.insert(
            (ResultFamily::Abaqus, ResultCategory::Mises),
            &[
                "read dis Abaqus {file} all Displacements",
                "read onlyfun Abaqus {file} all Stresscomponents,VonMises,MaxofInOut/AllLayers,Centroid",
            ],
        );
        loads.insert(
            (ResultFamily::Abaqus, ResultCategory::Strain),
            &[
                "read dis Abaqus {file} all Displacements",
                "read onlyfun Abaqus {file} all Straincomponents,Triaxiality,MaxofInOut/AllLayers,Centroid",
            ],
        );
        loads.insert(
            (ResultFamily::Abaqus, ResultCategory::PlasticStrain),
            &[
                "read dis Abaqus {file} all Displacements",
                "read onlyfun Abaqus {file} all Equivalentplasticstrain,MaxofInOut/AllLayers,Centroid",
            ],
        );

        let channel = |internal, output| EntityChannel {
            internal,
            output,
            id_field: "id.range",
            name_field: "name",
        };
        let entities = BTreeMap::from([
            (EntityKind::Node, channel("Nodes", "nodeoutput")),
            (EntityKind::Element, channel("Elements", "elemoutput")),
            (EntityKind::Part, channel("Parts", "partoutput")),
            (EntityKind::Material, channel("Materials", "matoutput")),
            (EntityKind::Set, channel("Groups", "nodeoutput")),
        ]);

        let groups = BTreeMap::from([
            (
                GroupKind::Material,
                GroupCommands {
                    add_by_id: Some("add mid {range}"),
                    add_by_name: "add mid name {range}",
                },
            ),
            (
                GroupKind::Property,
                GroupCommands {
                    add_by_id: Some("add pid {range}"),
                    add_by_name: "add pid name {range}",
                },
            ),
            (
                GroupKind::AnsaPart,
                GroupCommands {
                    add_by_id: None,
                    add_by_name: "add ansapart name {range}",
                },
            ),
        ]);

        let info = BTreeMap::from([
            (InfoType::Loads, "identify loads"),
            (InfoType::Spc, "identify spc"),
            (InfoType::AnsaPart, "identify ansapart"),
            (InfoType::Property, "identify part"),
            (InfoType::Material, "identify mid"),
            (InfoType::Set, "identify set"),
        ]);

        Self {
            loads,
            entities,
            groups,
            info,
        }
    }

    /// Check that every enum variant has a row and every template is usable
    pub fn validate(&self) -> Result<(), TableError> {
        for &kind in EntityKind::ALL {
            if !self.entities.contains_key(&kind) {
                return Err(TableError::MissingEntity(kind));
            }
        }
        for &kind in GroupKind::ALL {
            if !self.groups.contains_key(&kind) {
                return Err(TableError::MissingGroup(kind));
            }
        }
        for &info in InfoType::ALL {
            if !self.info.contains_key(&info) {
                return Err(TableError::MissingInfo(info));
            }
        }
        for (&(family, category), templates) in &self.loads {
            if let Some(&template) = templates.iter().find(|t| !t.contains("{file}")) {
                return Err(TableError::BadLoadTemplate {
                    family,
                    category,
                    template,
                });
            }
        }
        Ok(())
    }

    /// Result-load templates; empty for combinations the engine has no recipe for
    pub fn load_templates(&self, family: ResultFamily, category: ResultCategory) -> &[&'static str] {
        self.loads.get(&(family, category)).copied().unwrap_or(&[])
    }

    pub fn entity(&self, kind: EntityKind) -> Option<&EntityChannel> {
        self.entities.get(&kind)
    }

    pub fn group(&self, kind: GroupKind) -> Option<&GroupCommands> {
        self.groups.get(&kind)
    }

    pub fn info(&self, info: InfoType) -> Option<&'static str> {
        self.info.get(&info).copied()
    }
}

impl Default for CommandTables {
    fn default() -> Self {
        Self::standard()
    }
}

/// Substitute `{key}` placeholders in a template
pub fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{}}}", key), value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_tables_are_complete() {
        assert_eq!(CommandTables::standard().validate(), Ok(()));
    }

    #[test]
    fn test_undefined_combinations_are_empty() {
        let tables = CommandTables::standard();
        assert!(tables.load_templates(ResultFamily::Hypermesh, ResultCategory::Strain).is_empty());
        assert!(tables.load_templates(ResultFamily::Hypermesh, ResultCategory::PlasticStrain).is_empty());
        assert_eq!(tables.load_templates(ResultFamily::Abaqus, ResultCategory::Strain).len(), 2);
    }

    #[test]
    fn test_validate_reports_missing_rows() {
        let mut tables = CommandTables::standard();
        tables.info.remove(&InfoType::Spc);
        assert_eq!(tables.validate(), Err(TableError::MissingInfo(InfoType::Spc)));
    }

    #[test]
    fn test_fill_replaces_every_occurrence() {
        let out = fill("{a}-{b}-{a}", &[("a", "x"), ("b", "y")]);
        assert_eq!(out, "x-y-x");
    }
}
