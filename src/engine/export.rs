//! Tabular Export
//!
//! Dumps the result of every node or every element across all load cases
//! into one CSV file next to the result file.

use std::path::{Path, PathBuf};

use super::family::ResultCategory;
use super::script::CommandScript;
use super::selector::ResultLocation;

const MULTISTATE_OPTIONS: [&str; 5] = [
    "identify outopts multistates enable",
    "identify outopts multilabels include disp all",
    "identify outopts multilabels include scalar all",
    "identify outopts multistates include all",
    "identify outopts multistates exclude 0",
];

/// Output columns switched on or off for node listings, in engine order
const NODE_COLUMNS: &[(&str, bool)] = &[
    ("origposx", true),
    ("origposy", true),
    ("origposz", true),
    ("posx", false),
    ("posy", false),
    ("posz", false),
    ("comment", false),
    ("ldispx", false),
    ("ldispy", false),
    ("ldispz", false),
    ("name", false),
    ("scalartop", false),
    ("scalarbot", false),
    ("functop", true),
    ("funcbot", false),
    ("udispx", false),
    ("udispy", false),
    ("udispz", false),
    ("vectorbot", false),
    ("vectortop", false),
    ("xfunctop", false),
    ("xfuncbot", false),
    ("yfunctop", false),
    ("yfuncbot", false),
    ("zfunctop", false),
    ("zfuncbot", false),
];

const ELEMENT_COLUMNS: &[(&str, bool)] = &[
    ("cog", false),
    ("cornbot", false),
    ("corntop", false),
    ("elemname", false),
    ("comment", false),
    ("scalartop", false),
    ("scalarbot", false),
    ("funcbot", false),
    ("functop", true),
    ("funccorn", false),
    ("vectormagtop", false),
    ("vectormagbot", false),
    ("vectortop", false),
    ("vectorbottom", false),
    ("vectorcomponents", false),
    ("nodes", false),
    ("principaltensor", false),
];

const NODE_SCHEMA: &str = "\
The CSV holds one block per load case. Each block starts with a line naming the case \
(beginning with STEP or Subcase), followed by a header line and one row per node.
Columns:
- Id: node ID
- Pid: ID of the property the node belongs to
- Dispx, Dispy, Dispz: displacement components
- Disptotal: displacement magnitude
- origPosx, origPosy, origPosz: undeformed node coordinates
- FunctionTop: value of the loaded result function at the node";

const ELEMENT_SCHEMA: &str = "\
The CSV holds one block per load case. Each block starts with a line naming the case \
(beginning with STEP or Subcase), followed by a header line and one row per element.
Columns:
- Id: element ID
- Pid: ID of the property the element belongs to
- PidName: name of that property
- FunctionTop: value of the loaded result function at the element";

/// A CSV the engine wrote, with a description of its layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabularExport {
    pub csv_path: PathBuf,
    pub schema: &'static str,
}

impl TabularExport {
    pub fn describe(&self) -> String {
        format!("Results exported to {}\n\n{}", self.csv_path.display(), self.schema)
    }
}

pub fn schema(location: ResultLocation) -> &'static str {
    match location {
        ResultLocation::Node => NODE_SCHEMA,
        ResultLocation::Element => ELEMENT_SCHEMA,
    }
}

/// `<result file without extension>_all_<node|element>_<category>_results.csv`
pub fn csv_path(result_file: &Path, location: ResultLocation, category: ResultCategory) -> PathBuf {
    let base = result_file.with_extension("");
    let mut name = base.as_os_str().to_os_string();
    name.push(format!("_all_{}_{}_results.csv", location, category));
    PathBuf::from(name)
}

/// Output options and the listing command writing `csv`
pub fn compile_export(location: ResultLocation, csv: &Path) -> CommandScript {
    let mut script = CommandScript::new();
    script.extend(MULTISTATE_OPTIONS);

    let (entity, columns) = match location {
        ResultLocation::Node => ("node", NODE_COLUMNS),
        ResultLocation::Element => ("element", ELEMENT_COLUMNS),
    };
    for (column, enabled) in columns {
        script.push(format!(
            "identify {} outopts {} {}",
            entity,
            column,
            if *enabled { "on" } else { "off" }
        ));
    }
    script.push(format!(r#"identify {} lres all "{}""#, entity, csv.display()));
    script
}
