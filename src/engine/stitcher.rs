//! Screenshot Stitcher
//!
//! Stacks the views captured for one load case into a single tall image,
//! with a caption band under each view. Source images are removed once the
//! combined image is written.

use chrono::Local;
use image::{GenericImage, Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use rusttype::{Font, Scale};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::capture::CapturedView;
use crate::error::ArtifactError;

/// Height of the caption band under every view
pub const CAPTION_BAND: u32 = 50;
const CAPTION_PX: f32 = 30.0;
const CAPTION_TOP_PAD: i32 = 10;

/// The combined image for one case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StitchedImage {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Caption text in drawing order.
    pub captions: Vec<String>,
}

impl StitchedImage {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// `<img>` reference served from `url_prefix`
    pub fn to_html(&self, url_prefix: &str) -> String {
        format!(
            "<img src='{}/{}' style='max-width: 100%; height: auto;'>",
            url_prefix.trim_end_matches('/'),
            self.file_name()
        )
    }
}

pub struct Stitcher {
    font: Option<Font<'static>>,
}

impl Stitcher {
    /// Stitcher that records captions but draws no text
    pub fn without_font() -> Self {
        Self { font: None }
    }

    /// Load the caption font; a missing or unreadable font only disables text
    pub fn with_font_file(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::without_font();
        };
        let font = std::fs::read(path)
            .ok()
            .and_then(Font::try_from_vec);
        if font.is_none() {
            warn!("Caption font unavailable at {}; views will be stitched without captions", path.display());
        }
        Self { font }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Stack `views` top to bottom into one image.
    ///
    /// The canvas is as wide as the widest view and as tall as all views plus
    /// one caption band each. Without `output`, the image lands beside the
    /// first view under a timestamped name.
    pub fn stitch(&self, views: &[CapturedView], output: Option<&Path>) -> Result<StitchedImage, ArtifactError> {
        if views.is_empty() {
            return Err(ArtifactError::EmptySelection);
        }
        if let Some(missing) = views.iter().find(|v| !v.path.exists()) {
            return Err(ArtifactError::MissingImageFile(missing.path.clone()));
        }

        let images = views
            .iter()
            .map(|v| image::open(&v.path).map_err(|e| ArtifactError::Image(format!("{}: {}", v.path.display(), e))))
            .collect::<Result<Vec<_>, _>>()?;

        let width = images.iter().map(|i| i.width()).max().unwrap_or(0);
        let height: u32 = images.iter().map(|i| i.height() + CAPTION_BAND).sum();
        debug!("Stitching {} views into a {}x{} canvas", views.len(), width, height);

        let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
        let mut captions = Vec::with_capacity(views.len());
        let mut y = 0u32;
        for (view, img) in views.iter().zip(&images) {
            canvas
                .copy_from(&img.to_rgb8(), 0, y)
                .map_err(|e| ArtifactError::Image(e.to_string()))?;

            let caption = format!("View: {}", view.view.label());
            self.draw_caption(&mut canvas, &caption, width, (y + img.height()) as i32 + CAPTION_TOP_PAD);
            captions.push(caption);
            y += img.height() + CAPTION_BAND;
        }

        let path = match output {
            Some(p) => p.to_path_buf(),
            None => default_output(&views[0].path),
        };
        canvas
            .save(&path)
            .map_err(|e| ArtifactError::Image(format!("{}: {}", path.display(), e)))?;
        info!("Stitched image saved to {}", path.display());

        for view in views {
            if let Err(e) = std::fs::remove_file(&view.path) {
                warn!("Could not delete {}: {}", view.path.display(), e);
            }
        }

        Ok(StitchedImage {
            path,
            width,
            height,
            captions,
        })
    }

    fn draw_caption(&self, canvas: &mut RgbImage, text: &str, width: u32, y: i32) {
        let Some(font) = &self.font else {
            return;
        };
        let scale = Scale::uniform(CAPTION_PX);
        let (text_width, _) = text_size(scale, font, text);
        let x = ((width as i32 - text_width) / 2).max(0);
        draw_text_mut(canvas, Rgb([0, 0, 0]), x, y, scale, font, text);
    }
}

fn default_output(first: &Path) -> PathBuf {
    let dir = first.parent().unwrap_or_else(|| Path::new("."));
    let token = Uuid::new_v4().simple().to_string();
    dir.join(format!(
        "stitched_image_{}_{}.png",
        Local::now().format("%Y%m%d_%H%M%S"),
        &token[..8]
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::capture::CameraView;
    use crate::engine::selector::LoadCase;
    use tempfile::tempdir;

    fn write_view(dir: &Path, name: &str, w: u32, h: u32, view: CameraView) -> CapturedView {
        let path = dir.join(name);
        RgbImage::from_pixel(w, h, Rgb([10, 20, 30])).save(&path).unwrap();
        CapturedView {
            case: LoadCase(1),
            view,
            path,
        }
    }

    #[test]
    fn test_canvas_size_and_source_cleanup() {
        let dir = tempdir().unwrap();
        let views = vec![
            write_view(dir.path(), "a.png", 40, 30, CameraView::Isometric),
            write_view(dir.path(), "b.png", 60, 20, CameraView::Top),
            write_view(dir.path(), "c.png", 50, 10, CameraView::Bottom),
        ];

        let out = dir.path().join("combined.png");
        let stitched = Stitcher::without_font().stitch(&views, Some(&out)).unwrap();

        assert_eq!(stitched.width, 60);
        assert_eq!(stitched.height, 30 + 20 + 10 + 3 * CAPTION_BAND);
        assert_eq!(stitched.captions, vec!["View: isometric", "View: top", "View: bottom"]);
        assert!(out.exists());
        assert!(views.iter().all(|v| !v.path.exists()));

        let saved = image::open(&out).unwrap();
        assert_eq!((saved.width(), saved.height()), (60, 210));
        // Padding right of the narrow first view stays white.
        assert_eq!(saved.to_rgb8().get_pixel(55, 5), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_default_output_lands_beside_first_view() {
        let dir = tempdir().unwrap();
        let views = vec![write_view(dir.path(), "only.png", 8, 8, CameraView::Front)];
        let stitched = Stitcher::without_font().stitch(&views, None).unwrap();

        assert_eq!(stitched.path.parent(), Some(dir.path()));
        assert!(stitched.file_name().starts_with("stitched_image_"));
        assert_eq!(
            stitched.to_html("/images/"),
            format!("<img src='/images/{}' style='max-width: 100%; height: auto;'>", stitched.file_name())
        );
    }

    #[test]
    fn test_missing_view_is_reported() {
        let dir = tempdir().unwrap();
        let mut views = vec![write_view(dir.path(), "a.png", 4, 4, CameraView::Left)];
        views.push(CapturedView {
            case: LoadCase(1),
            view: CameraView::Right,
            path: dir.path().join("never_written.png"),
        });

        let err = Stitcher::without_font().stitch(&views, None).unwrap_err();
        assert_eq!(err, ArtifactError::MissingImageFile(dir.path().join("never_written.png")));
        // Nothing is deleted when stitching fails.
        assert!(views[0].path.exists());
    }

    #[test]
    fn test_empty_selection() {
        assert_eq!(Stitcher::without_font().stitch(&[], None), Err(ArtifactError::EmptySelection));
    }

    #[test]
    fn test_unreadable_font_disables_captions() {
        let dir = tempdir().unwrap();
        let bogus = dir.path().join("font.ttf");
        std::fs::write(&bogus, b"not a font").unwrap();
        assert!(!Stitcher::with_font_file(Some(&bogus)).has_font());
        assert!(!Stitcher::with_font_file(None).has_font());
    }
}
