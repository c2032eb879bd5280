//! Multi-View Capture
//!
//! Compiles the display setup and, per load case, the selection, state switch
//! and seven fixed camera views, each written to its own PNG. The whole plan
//! runs as a single engine invocation; the records of what was written are
//! then handed to the stitcher directly.

use std::fmt;
use std::path::{Path, PathBuf};

use super::family::ResultCategory;
use super::script::CommandScript;
use super::selector::{self, CaseSelection, GroupKind, LoadCase, ResultLocation, Selection, SelectionMode};
use super::stitcher::StitchedImage;
use super::tables::{self, CommandTables};
use crate::error::{ArtifactError, SelectionError};

/// Fixed camera positions, in capture order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraView {
    Isometric,
    Top,
    Front,
    Left,
    Bottom,
    Back,
    Right,
}

impl CameraView {
    pub const ALL: [CameraView; 7] = [
        CameraView::Isometric,
        CameraView::Top,
        CameraView::Front,
        CameraView::Left,
        CameraView::Bottom,
        CameraView::Back,
        CameraView::Right,
    ];

    /// Argument of the engine's `view` command
    pub fn engine_name(&self) -> &'static str {
        match self {
            CameraView::Isometric => "default isometric",
            CameraView::Top => "default top",
            CameraView::Front => "default front",
            CameraView::Left => "default left",
            CameraView::Bottom => "default btm",
            CameraView::Back => "default back",
            CameraView::Right => "default right",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CameraView::Isometric => "isometric",
            CameraView::Top => "top",
            CameraView::Front => "front",
            CameraView::Left => "left",
            CameraView::Bottom => "bottom",
            CameraView::Back => "back",
            CameraView::Right => "right",
        }
    }

    fn file_token(&self) -> String {
        self.engine_name().replace(' ', "_")
    }
}

impl fmt::Display for CameraView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One PNG the script asks the engine to write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedView {
    pub case: LoadCase,
    pub view: CameraView,
    pub path: PathBuf,
}

/// Display configuration applied once before any case is captured
pub fn display_setup(meta_defaults: Option<&Path>) -> CommandScript {
    let mut script = CommandScript::new();
    script.push("grstyle scalarfringe enable");
    if let Some(defaults) = meta_defaults {
        script.push(format!("options metadefaults read {}", defaults.display()));
    }
    script.extend([
        "identify showres format fixed",
        "identify showres format digits 1",
        "identify showres enable",
        "identify showres showfunc on",
        "identify showres showtopscalar on",
        "identify showres showbotscalar on",
        "!function info filter max on",
        "!function info filter min off",
        "identify showres showtot off",
        "identify showres showz off",
        "identify showres showy off",
        "identify showres showx off",
        "identify showres showposz off",
        "identify showres showposy off",
        "identify showres showposx off",
        r#"identify font "SimSun,30,-1,5,50,0,0,0,0,0,Regular""#,
        "write options transparent enable",
        "identify options drawfunclabel disable",
        "options fringebar format enabled Fixed",
        "options fringebar format enabled digits 1",
        r#"color delete "255""#,
        r#"color new "255" 255,255,255,255"#,
        r#"color fringebar update "default" "255_85_0_255,255_242_53_255,Yellow,170_255_0_255,85_255_0_255,Green,0_255_85_255,0_255_170_255,Cyan,0_170_255_255,236_230_230_255,255""#,
    ]);
    script
}

/// Everything needed to plan a capture run
#[derive(Debug, Clone)]
pub struct CaptureSpec<'a> {
    /// Result file name up to its first dot.
    pub stem: &'a str,
    pub category: ResultCategory,
    pub group: GroupKind,
    pub location: ResultLocation,
    pub selection: &'a Selection,
    pub output_dir: &'a Path,
    pub meta_defaults: Option<&'a Path>,
    /// Shared by every file of one run.
    pub stamp: &'a str,
}

/// The views one case is expected to produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCase {
    pub case: LoadCase,
    pub whole_model: bool,
    pub views: Vec<CapturedView>,
}

#[derive(Debug, Clone)]
pub struct CapturePlan {
    /// Display setup plus every case; the load prefix goes in front.
    pub script: CommandScript,
    pub cases: Vec<PlannedCase>,
}

fn view_path(spec: &CaptureSpec<'_>, case: LoadCase, view: CameraView) -> PathBuf {
    let subject = match spec.selection.mode() {
        SelectionMode::All => "entire_model".to_string(),
        _ => spec.group.to_string(),
    };
    let suffix = match spec.selection.mode() {
        SelectionMode::ByName => "_by_name",
        _ => "",
    };
    spec.output_dir.join(format!(
        "{}_{}_{}_{}_{}_{}{}.png",
        spec.stem,
        spec.category,
        subject,
        case,
        view.file_token(),
        spec.stamp,
        suffix
    ))
}

/// Plan the capture commands and the files they will produce
pub fn compile_capture(tables: &CommandTables, spec: &CaptureSpec<'_>) -> Result<CapturePlan, SelectionError> {
    let mode = spec.selection.mode();
    selector::group_add_command(tables, spec.group, mode, "")?;

    let mut script = display_setup(spec.meta_defaults);
    let mut cases = Vec::new();

    for CaseSelection { case, range } in spec.selection.cases() {
        match selector::group_add_command(tables, spec.group, mode, &range)? {
            None => {
                script.push(selector::message(&format!("----- capturing case {} whole model -----", case)));
                script.push(tables::ERASE_NONE);
            }
            Some(add) => {
                script.push(tables::ERASE_ALL);
                script.push(selector::message(&format!(
                    "----- capturing case {} {} {} list [{}] -----",
                    case, spec.group, mode, range
                )));
                script.push(add);
            }
        }
        script.push(selector::set_state(case));
        script.push("identify reset");
        script.push(spec.location.fringe_command());
        script.push(spec.location.info_command());
        script.push("view center");

        let mut views = Vec::with_capacity(CameraView::ALL.len());
        for view in CameraView::ALL {
            let path = view_path(spec, case, view);
            script.push(format!("view {}", view.engine_name()));
            script.push(format!(r#"write png "{}""#, path.display()));
            views.push(CapturedView { case, view, path });
        }

        cases.push(PlannedCase {
            case,
            whole_model: mode == SelectionMode::All,
            views,
        });
    }

    Ok(CapturePlan { script, cases })
}

/// Outcome of stitching one case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseOutcome {
    pub case: LoadCase,
    pub whole_model: bool,
    pub image: Result<StitchedImage, ArtifactError>,
}

/// All stitched cases of a capture run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureArtifact {
    pub cases: Vec<CaseOutcome>,
    /// Engine trouble worth showing next to the images.
    pub note: Option<String>,
}

impl CaptureArtifact {
    pub fn images(&self) -> impl Iterator<Item = &StitchedImage> {
        self.cases.iter().filter_map(|c| c.image.as_ref().ok())
    }

    /// One titled image per case, wrapped in a single `<div>`
    pub fn to_html(&self, url_prefix: &str) -> String {
        let mut html = String::from("<div>");
        if let Some(note) = &self.note {
            html.push_str(&format!("<p>{}</p>", html_escape::encode_text(note)));
        }
        for outcome in &self.cases {
            let title = if outcome.whole_model {
                format!("Case {} whole model result", outcome.case)
            } else {
                format!("Case {} result", outcome.case)
            };
            html.push_str(&format!("<h3>{}</h3>", title));
            match &outcome.image {
                Ok(image) => html.push_str(&image.to_html(url_prefix)),
                Err(e) => html.push_str(&format!("<p>{}</p>", html_escape::encode_text(&e.to_string()))),
            }
        }
        html.push_str("</div>");
        html
    }
}
