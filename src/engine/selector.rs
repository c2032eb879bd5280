//! Entity Selector Compiler
//!
//! Turns per-load-case entity selectors into the commands that switch the
//! engine to each case and restrict output or display to those entities.
//!
//! A selection is always one of three modes, decided once when the request
//! is parsed:
//! - by ID: integer IDs per case
//! - by name: entity names per case
//! - all: no selector at all, meaning the whole model in the pristine case 0
//!
//! Cases are emitted in ascending case order. A case whose list is empty is
//! skipped; it never blocks the other cases.

use schemars::JsonSchema;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use super::script::CommandScript;
use super::tables::{self, CommandTables};
use crate::error::SelectionError;

/// Load case (analysis state) identifier; `0` is the unloaded model
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct LoadCase(pub u32);

impl LoadCase {
    pub const PRISTINE: LoadCase = LoadCase(0);

    pub fn is_pristine(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for LoadCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for LoadCase {
    fn from(id: u32) -> Self {
        LoadCase(id)
    }
}

macro_rules! keyword_enum {
    (@err entity, $given:expr, $supported:expr) => {
        SelectionError::UnsupportedEntityKind { given: $given.to_string(), supported: $supported }
    };
    (@err info, $given:expr, $supported:expr) => {
        SelectionError::UnsupportedInfoType { given: $given.to_string(), supported: $supported }
    };
    (@err location, $given:expr, $supported:expr) => {
        SelectionError::UnsupportedLocation($given.to_string())
    };
    ($(#[$meta:meta])* $name:ident, $label:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, JsonSchema)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub fn supported() -> String {
                Self::ALL.iter().map(|k| k.as_str()).collect::<Vec<_>>().join(", ")
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = SelectionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_ascii_lowercase();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|k| k.as_str() == wanted)
                    .ok_or_else(|| keyword_enum!(@err $label, s, Self::supported()))
            }
        }

        // Parameters go through `FromStr` so JSON keywords are case-insensitive too.
        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(de::Error::custom)
            }
        }
    };
}

keyword_enum!(
    /// Queryable model entity for result filtering
    EntityKind, entity {
        Node => "node",
        Element => "element",
        Part => "part",
        Material => "material",
        Set => "set",
    }
);

keyword_enum!(
    /// Entity grouping used to select what is displayed for max results and captures
    GroupKind, entity {
        Material => "material",
        Property => "property",
        AnsaPart => "ansapart",
    }
);

keyword_enum!(
    /// Model attribute listed by the info query
    InfoType, info {
        Loads => "loads",
        Spc => "spc",
        AnsaPart => "ansapart",
        Property => "property",
        Material => "material",
        Set => "set",
    }
);

keyword_enum!(
    /// Whether scalar results are evaluated on nodes or element centroids
    ResultLocation, location {
        Node => "node",
        Element => "element",
    }
);

impl Default for ResultLocation {
    fn default() -> Self {
        ResultLocation::Node
    }
}

impl ResultLocation {
    /// Command that prints the extreme values of the visible entities
    pub fn info_command(&self) -> &'static str {
        match self {
            ResultLocation::Node => tables::FUNCTION_INFO_NODAL,
            ResultLocation::Element => tables::FUNCTION_INFO_ELEMENT,
        }
    }

    /// Fringe mode switch used before capturing contour plots
    pub fn fringe_command(&self) -> &'static str {
        match self {
            ResultLocation::Node => tables::FRINGE_ON_NODE,
            ResultLocation::Element => tables::FRINGE_ON_ELEMENT,
        }
    }
}

/// Tag for the three ways a request can select entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectionMode {
    ById,
    ByName,
    All,
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionMode::ById => write!(f, "by ID"),
            SelectionMode::ByName => write!(f, "by name"),
            SelectionMode::All => write!(f, "as a whole model"),
        }
    }
}

/// What an absent selector means for an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyPolicy {
    /// Absent selectors are a caller error.
    Reject,
    /// Absent selectors mean the whole model in case 0.
    SelectAll,
}

pub type IdsPerCase = BTreeMap<LoadCase, Vec<u64>>;
pub type NamesPerCase = BTreeMap<LoadCase, Vec<String>>;

/// Per-case entity selection in exactly one mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    ById(IdsPerCase),
    ByName(NamesPerCase),
    All,
}

/// One case that survived filtering, with its entities joined for the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseSelection {
    pub case: LoadCase,
    /// Comma-separated IDs or names; empty in `All` mode.
    pub range: String,
}

impl Selection {
    /// Decide the mode from the two optional maps.
    ///
    /// IDs win when both are given. Whether "neither" is an error or means
    /// the whole model is up to the operation.
    pub fn from_parts(
        ids: Option<IdsPerCase>,
        names: Option<NamesPerCase>,
        empty: EmptyPolicy,
    ) -> Result<Self, SelectionError> {
        let ids = ids.filter(|m| !m.is_empty());
        let names = names.filter(|m| !m.is_empty());

        match (ids, names) {
            (Some(ids), _) => Ok(Selection::ById(ids)),
            (None, Some(names)) => {
                if let Some(bad) = names.values().flatten().find(|n| n.contains([';', '"'])) {
                    return Err(SelectionError::InvalidName(bad.clone()));
                }
                Ok(Selection::ByName(names))
            }
            (None, None) => match empty {
                EmptyPolicy::Reject => Err(SelectionError::NoSelectorProvided),
                EmptyPolicy::SelectAll => Ok(Selection::All),
            },
        }
    }

    pub fn mode(&self) -> SelectionMode {
        match self {
            Selection::ById(_) => SelectionMode::ById,
            Selection::ByName(_) => SelectionMode::ByName,
            Selection::All => SelectionMode::All,
        }
    }

    /// Cases to emit, in order, with empty per-case lists dropped
    pub fn cases(&self) -> Vec<CaseSelection> {
        fn collect<T: ToString>(map: &BTreeMap<LoadCase, Vec<T>>) -> Vec<CaseSelection> {
            map.iter()
                .filter_map(|(case, entities)| {
                    if entities.is_empty() {
                        debug!("Skipping case {} with an empty selector", case);
                        return None;
                    }
                    let range = entities.iter().map(ToString::to_string).collect::<Vec<_>>().join(",");
                    Some(CaseSelection { case: *case, range })
                })
                .collect()
        }

        match self {
            Selection::ById(map) => collect(map),
            Selection::ByName(map) => collect(map),
            Selection::All => vec![CaseSelection {
                case: LoadCase::PRISTINE,
                range: String::new(),
            }],
        }
    }
}

pub(crate) fn message(text: &str) -> String {
    let text = text.replace('"', "'");
    tables::fill(tables::MESSAGE, &[("text", text.as_str())])
}

pub(crate) fn set_state(case: LoadCase) -> String {
    let case = case.to_string();
    tables::fill(tables::SET_STATE, &[("case", case.as_str())])
}

/// Marker, state switch and advanced filter for each selected case
pub fn compile_entity_filters(
    tables: &CommandTables,
    kind: EntityKind,
    selection: &Selection,
) -> Result<CommandScript, SelectionError> {
    let channel = tables.entity(kind).ok_or_else(|| SelectionError::UnsupportedEntityKind {
        given: kind.to_string(),
        supported: EntityKind::supported(),
    })?;
    let (template, label) = match selection.mode() {
        SelectionMode::ById => (tables::FILTER_BY_ID, "ID"),
        SelectionMode::ByName => (tables::FILTER_BY_NAME, "name"),
        SelectionMode::All => return Err(SelectionError::NoSelectorProvided),
    };

    let mut script = CommandScript::new();
    for CaseSelection { case, range } in selection.cases() {
        script.push(message(&format!(
            "----- querying case {} {} {} list [{}] results -----",
            case, kind, label, range
        )));
        script.push(set_state(case));
        script.push(tables::fill(
            template,
            &[
                ("output", channel.output),
                ("entity", channel.internal),
                ("id_field", channel.id_field),
                ("name_field", channel.name_field),
                ("range", range.as_str()),
            ],
        ));
    }
    Ok(script)
}

/// Display-selection command for one case of a group selection.
///
/// `None` in `All` mode, where the whole model stays visible.
pub fn group_add_command(
    tables: &CommandTables,
    group: GroupKind,
    mode: SelectionMode,
    range: &str,
) -> Result<Option<String>, SelectionError> {
    let commands = tables.group(group).ok_or_else(|| SelectionError::UnsupportedEntityKind {
        given: group.to_string(),
        supported: GroupKind::supported(),
    })?;
    let template = match mode {
        SelectionMode::All => return Ok(None),
        SelectionMode::ByName => commands.add_by_name,
        SelectionMode::ById => commands.add_by_id.ok_or(SelectionError::UnsupportedSelector {
            kind: group.to_string(),
            mode,
        })?,
    };
    Ok(Some(tables::fill(template, &[("range", range)])))
}

/// Extreme-value report for the selected groups in each case
pub fn compile_max_result(
    tables: &CommandTables,
    group: GroupKind,
    location: ResultLocation,
    selection: &Selection,
) -> Result<CommandScript, SelectionError> {
    let mode = selection.mode();
    // Fail before emitting anything if the grammar is missing.
    group_add_command(tables, group, mode, "")?;

    let mut script = CommandScript::new();
    script.push(tables::ERASE_ALL);
    for CaseSelection { case, range } in selection.cases() {
        script.push(message(&format!("----- querying case {} {} max result -----", case, group)));
        script.push(set_state(case));
        match group_add_command(tables, group, mode, &range)? {
            Some(add) => script.push(add),
            None => script.push(tables::ERASE_NONE),
        }
        script.push(location.info_command());
    }
    Ok(script)
}

/// Attribute listing for the unloaded model or selected cases
pub fn compile_model_info(
    tables: &CommandTables,
    info: InfoType,
    selection: &Selection,
) -> Result<CommandScript, SelectionError> {
    let base = tables.info(info).ok_or_else(|| SelectionError::UnsupportedInfoType {
        given: info.to_string(),
        supported: InfoType::supported(),
    })?;
    let template = match selection.mode() {
        SelectionMode::All => tables::INFO_ALL,
        SelectionMode::ById => tables::INFO_BY_ID,
        SelectionMode::ByName => tables::INFO_BY_NAME,
    };

    let mut script = CommandScript::new();
    for CaseSelection { case, range } in selection.cases() {
        if !case.is_pristine() {
            script.push(set_state(case));
        }
        script.push(message(&format!("----- querying case {} model {} info -----", case, info)));
        script.push(tables::fill(template, &[("base", base), ("range", range.as_str())]));
    }
    Ok(script)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_deserialize_case_insensitively() {
        let group: GroupKind = serde_json::from_value(serde_json::json!("Material")).unwrap();
        assert_eq!(group, GroupKind::Material);
        let kind: EntityKind = serde_json::from_value(serde_json::json!(" NODE ")).unwrap();
        assert_eq!(kind, EntityKind::Node);
        let location: ResultLocation = serde_json::from_value(serde_json::json!("Element")).unwrap();
        assert_eq!(location, ResultLocation::Element);

        let err = serde_json::from_value::<GroupKind>(serde_json::json!("beam")).unwrap_err();
        assert!(err.to_string().contains("unsupported entity kind: beam"));
        assert_eq!(serde_json::to_value(GroupKind::Material).unwrap(), serde_json::json!("material"));
    }

    fn ids(entries: &[(u32, &[u64])]) -> Option<IdsPerCase> {
        Some(entries.iter().map(|(c, v)| (LoadCase(*c), v.to_vec())).collect())
    }

    fn names(entries: &[(u32, &[&str])]) -> Option<NamesPerCase> {
        Some(
            entries
                .iter()
                .map(|(c, v)| (LoadCase(*c), v.iter().map(|s| s.to_string()).collect()))
                .collect(),
        )
    }

    #[test]
    fn test_empty_case_is_skipped() {
        let tables = CommandTables::standard();
        let selection = Selection::from_parts(ids(&[(1, &[10, 20]), (2, &[])]), None, EmptyPolicy::Reject).unwrap();
        let script = compile_entity_filters(&tables, EntityKind::Node, &selection).unwrap();
        let commands = script.commands();

        assert_eq!(commands.len(), 3);
        assert!(commands[0].starts_with("options message"));
        assert_eq!(commands[1], r#"options state "1""#);
        assert_eq!(commands[2], "identify advfilter nodeoutput add:Nodes:id.range:10,20:Keep All");
        assert!(!commands.iter().any(|c| c.contains(r#"state "2""#)));
    }

    #[test]
    fn test_id_and_name_filters_differ() {
        let tables = CommandTables::standard();
        let by_id = Selection::from_parts(ids(&[(1, &[7])]), None, EmptyPolicy::Reject).unwrap();
        let by_name = Selection::from_parts(None, names(&[(1, &["7"])]), EmptyPolicy::Reject).unwrap();

        let a = compile_entity_filters(&tables, EntityKind::Part, &by_id).unwrap();
        let b = compile_entity_filters(&tables, EntityKind::Part, &by_name).unwrap();

        assert_eq!(a.commands()[2], "identify advfilter partoutput add:Parts:id.range:7:Keep All");
        assert_eq!(b.commands()[2], "identify advfilter partoutput add:Parts:name:7:Keep All");
        assert_ne!(a.commands()[2], b.commands()[2]);
    }

    #[test]
    fn test_sets_filter_through_node_output() {
        let tables = CommandTables::standard();
        let selection = Selection::from_parts(None, names(&[(3, &["LAC-51010131"])]), EmptyPolicy::Reject).unwrap();
        let script = compile_entity_filters(&tables, EntityKind::Set, &selection).unwrap();
        assert_eq!(
            script.commands()[2],
            "identify advfilter nodeoutput add:Groups:name:LAC-51010131:Keep All"
        );
    }

    #[test]
    fn test_missing_selector_is_rejected_or_means_all() {
        assert_eq!(
            Selection::from_parts(None, Some(BTreeMap::new()), EmptyPolicy::Reject),
            Err(SelectionError::NoSelectorProvided)
        );
        assert_eq!(Selection::from_parts(None, None, EmptyPolicy::SelectAll), Ok(Selection::All));
    }

    #[test]
    fn test_ids_win_over_names() {
        let selection = Selection::from_parts(ids(&[(1, &[1])]), names(&[(1, &["a"])]), EmptyPolicy::Reject).unwrap();
        assert_eq!(selection.mode(), SelectionMode::ById);
    }

    #[test]
    fn test_reserved_characters_in_names_are_rejected() {
        let err = Selection::from_parts(None, names(&[(1, &["a;erase all"])]), EmptyPolicy::Reject).unwrap_err();
        assert_eq!(err, SelectionError::InvalidName("a;erase all".to_string()));
    }

    #[test]
    fn test_cases_follow_ascending_order() {
        let selection = Selection::from_parts(ids(&[(5, &[1]), (2, &[2]), (9, &[3])]), None, EmptyPolicy::Reject).unwrap();
        let order: Vec<u32> = selection.cases().iter().map(|c| c.case.0).collect();
        assert_eq!(order, vec![2, 5, 9]);
    }

    #[test]
    fn test_max_result_select_all() {
        let tables = CommandTables::standard();
        let selection = Selection::from_parts(None, None, EmptyPolicy::SelectAll).unwrap();
        let script = compile_max_result(&tables, GroupKind::Property, ResultLocation::Element, &selection).unwrap();
        let commands = script.commands();

        assert_eq!(commands[0], "erase all");
        assert_eq!(commands[2], r#"options state "0""#);
        assert_eq!(commands[3], "erase none");
        assert_eq!(commands[4], "function info visible");
        assert!(!commands.iter().any(|c| c.starts_with("add ")));
    }

    #[test]
    fn test_max_result_by_name_and_id() {
        let tables = CommandTables::standard();
        let by_name = Selection::from_parts(None, names(&[(2, &["HC340LAD+Z"])]), EmptyPolicy::SelectAll).unwrap();
        let script = compile_max_result(&tables, GroupKind::Material, ResultLocation::Node, &by_name).unwrap();
        assert!(script.commands().contains(&"add mid name HC340LAD+Z".to_string()));
        assert_eq!(script.commands().last().unwrap(), "function info nodal visible");

        let by_id = Selection::from_parts(ids(&[(2, &[11, 12])]), None, EmptyPolicy::SelectAll).unwrap();
        let script = compile_max_result(&tables, GroupKind::Property, ResultLocation::Node, &by_id).unwrap();
        assert!(script.commands().contains(&"add pid 11,12".to_string()));
    }

    #[test]
    fn test_ansapart_has_no_id_grammar() {
        let tables = CommandTables::standard();
        let by_id = Selection::from_parts(ids(&[(1, &[4])]), None, EmptyPolicy::SelectAll).unwrap();
        let err = compile_max_result(&tables, GroupKind::AnsaPart, ResultLocation::Node, &by_id).unwrap_err();
        assert!(matches!(err, SelectionError::UnsupportedSelector { .. }));
    }

    #[test]
    fn test_model_info_forms() {
        let tables = CommandTables::standard();

        let all = compile_model_info(&tables, InfoType::Loads, &Selection::All).unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.commands()[0].starts_with("options message"));
        assert_eq!(all.commands()[1], "identify loads all");

        let by_id = Selection::from_parts(ids(&[(3, &[1, 2])]), None, EmptyPolicy::SelectAll).unwrap();
        let script = compile_model_info(&tables, InfoType::Property, &by_id).unwrap();
        assert_eq!(script.commands()[0], r#"options state "3""#);
        assert_eq!(script.commands()[2], "identify part 1,2");

        let by_name = Selection::from_parts(None, names(&[(0, &["SPC_1"])]), EmptyPolicy::SelectAll).unwrap();
        let script = compile_model_info(&tables, InfoType::Set, &by_name).unwrap();
        assert_eq!(script.commands().last().unwrap(), "identify set name SPC_1");
    }

    #[test]
    fn test_keywords_parse_case_insensitively() {
        assert_eq!("Node".parse::<EntityKind>().unwrap(), EntityKind::Node);
        assert_eq!("ANSAPART".parse::<GroupKind>().unwrap(), GroupKind::AnsaPart);
        assert!(matches!(
            "beam".parse::<EntityKind>(),
            Err(SelectionError::UnsupportedEntityKind { .. })
        ));
        assert!(matches!("surface".parse::<ResultLocation>(), Err(SelectionError::UnsupportedLocation(_))));
    }

    #[test]
    fn test_case_keys_deserialize_from_json_strings() {
        let parsed: IdsPerCase = serde_json::from_str(r#"{"1": [100, 200], "4": []}"#).unwrap();
        assert_eq!(parsed.get(&LoadCase(1)), Some(&vec![100, 200]));
        assert_eq!(parsed.len(), 2);
    }
}
