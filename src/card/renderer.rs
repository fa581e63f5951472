//! Membership card renderer
//!
//! Composites header numbers, the left-column member fields, the wrapped
//! address, the member photo and the signature overlay onto the card
//! template. Later steps draw over earlier ones.
//!
//! Only the template is required. A missing or unreadable photo becomes a
//! placeholder box, a missing overlay is skipped, and missing fonts fall back
//! to the built-in face. Each outcome is reported in [`RenderReport`].

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use image::{imageops, imageops::FilterType, DynamicImage, ImageFormat, RgbImage, RgbaImage};
use uuid::Uuid;

use crate::config::{CardConfig, PathsConfig};
use crate::db::MemberRecord;

use super::canvas::{self, draw_text, fill_rect, outline_rect, TextAnchor};
use super::font::{FontSet, FontSource};
use super::layout::{CardLayout, Scale};
use super::wrap::wrap_text;
use super::RenderError;

const CARD_FILE_PREFIX: &str = "bsp_membership_card_";

/// The three header values printed on the card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderValues {
    pub id_number: String,
    pub membership_number: String,
    pub active_number: String,
}

impl HeaderValues {
    /// Header values for a record, generating the missing ones now
    pub fn for_record(record: &MemberRecord) -> Self {
        Self::generate(record, Utc::now(), Uuid::new_v4())
    }

    /// Header values with explicit clock and randomness
    pub fn generate(record: &MemberRecord, now: DateTime<Utc>, random: Uuid) -> Self {
        let random = random.simple().to_string().to_uppercase();

        let id_number = match record.known_id() {
            Some(id) => format!("TN{:06}", id),
            None => format!("TN{}{}", now.format("%y"), &random[..6]),
        };

        let active_number = record
            .active_no
            .clone()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| format!("ACT{}{}", now.format("%m%y"), &random[6..10]));

        Self {
            id_number,
            membership_number: record.membership_no.clone().unwrap_or_default(),
            active_number,
        }
    }
}

/// How the photo step ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoOutcome {
    Pasted,
    Missing,
    Failed(String),
}

/// How the overlay step ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayOutcome {
    Composited,
    Absent,
    Failed(String),
}

/// Degradations that happened during a render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderReport {
    pub photo: PhotoOutcome,
    pub overlay: OverlayOutcome,
    pub fonts: (FontSource, FontSource, FontSource),
}

/// A rendered, opaque card
pub struct RenderedCard {
    pub image: RgbImage,
    pub report: RenderReport,
}

/// A card persisted to disk
#[derive(Debug, Clone)]
pub struct SavedCard {
    pub path: PathBuf,
    pub report: RenderReport,
}

/// Renders membership cards from the template and overlay assets
#[derive(Debug, Clone)]
pub struct CardRenderer {
    layout: CardLayout,
    template_path: PathBuf,
    overlay_path: PathBuf,
    cards_dir: PathBuf,
    font_regular: PathBuf,
    font_bold: PathBuf,
}

impl CardRenderer {
    pub fn new(paths: &PathsConfig, fonts: &CardConfig) -> Self {
        Self {
            layout: CardLayout::default(),
            template_path: paths.template_path(),
            overlay_path: paths.overlay_path(),
            cards_dir: paths.cards_dir.clone(),
            font_regular: fonts.font_regular.clone(),
            font_bold: fonts.font_bold.clone(),
        }
    }

    pub fn cards_dir(&self) -> &Path {
        &self.cards_dir
    }

    /// Render a card and save it as PNG in the cards directory
    pub fn render_to_file(
        &self,
        record: &MemberRecord,
        header: &HeaderValues,
    ) -> Result<SavedCard, RenderError> {
        let card = self.render(record, header)?;

        std::fs::create_dir_all(&self.cards_dir)?;
        let path = self.cards_dir.join(card_file_name(record));
        card.image
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|e| RenderError::Save(e.to_string()))?;

        tracing::info!(
            member_id = record.id,
            path = %path.display(),
            photo = ?card.report.photo,
            overlay = ?card.report.overlay,
            "Membership card saved"
        );

        Ok(SavedCard {
            path,
            report: card.report,
        })
    }

    /// Load the template and render a card in memory
    pub fn render(
        &self,
        record: &MemberRecord,
        header: &HeaderValues,
    ) -> Result<RenderedCard, RenderError> {
        if !self.template_path.is_file() {
            return Err(RenderError::TemplateMissing(self.template_path.clone()));
        }

        let template = image::open(&self.template_path)
            .map_err(|e| RenderError::TemplateDecode(e.to_string()))?
            .to_rgba8();

        Ok(self.compose(template, record, header))
    }

    /// Composite every card element onto an RGBA template
    pub fn compose(
        &self,
        template: RgbaImage,
        record: &MemberRecord,
        header: &HeaderValues,
    ) -> RenderedCard {
        let mut card = template;
        let layout = &self.layout;
        let scale = layout.scale_for(card.width());

        let fonts = FontSet::load(
            &self.font_regular,
            &self.font_bold,
            scale.font_px(layout.text_font_px),
            scale.font_px(layout.small_font_px),
        );

        self.draw_header(&mut card, &fonts, scale, header);
        self.draw_fields(&mut card, &fonts, scale, record);
        let photo = self.draw_photo(&mut card, &fonts, scale, record.photo_path.as_deref());
        let overlay = self.draw_overlay(&mut card, scale);

        RenderedCard {
            image: DynamicImage::ImageRgba8(card).to_rgb8(),
            report: RenderReport {
                photo,
                overlay,
                fonts: fonts.sources(),
            },
        }
    }

    fn draw_header(
        &self,
        card: &mut RgbaImage,
        fonts: &FontSet,
        scale: Scale,
        header: &HeaderValues,
    ) {
        let layout = &self.layout;
        let y = scale.pos(layout.header_values_y);
        let margin = layout.after_colon_margin;

        let values = [
            (layout.id_colon_x, &header.id_number),
            (layout.membership_colon_x, &header.membership_number),
            (layout.active_colon_x, &header.active_number),
        ];
        for (colon_x, value) in values {
            let x = scale.pos(colon_x + margin);
            draw_text(card, &fonts.small, (x, y), value, TextAnchor::LeftBaseline, canvas::BLACK);
        }
    }

    fn draw_fields(
        &self,
        card: &mut RgbaImage,
        fonts: &FontSet,
        scale: Scale,
        record: &MemberRecord,
    ) {
        let layout = &self.layout;
        let x = scale.pos(layout.left_value_x);
        let text = |value: &Option<String>| value.clone().unwrap_or_default();

        let name = record.name.to_uppercase();
        draw_text(
            card,
            &fonts.bold,
            (x, scale.pos(layout.name_y)),
            &name,
            TextAnchor::LeftBaseline,
            canvas::BLACK,
        );

        let fields = [
            (layout.profession_y, text(&record.profession)),
            (layout.designation_y, text(&record.designation)),
            (layout.mandal_y, text(&record.mandal)),
            (layout.dob_y, text(&record.dob)),
            (layout.blood_y, text(&record.blood_group)),
            (layout.contact_y, record.contact_no.clone()),
        ];
        for (y, value) in fields {
            draw_text(
                card,
                &fonts.text,
                (x, scale.pos(y)),
                &value,
                TextAnchor::LeftBaseline,
                canvas::BLACK,
            );
        }

        let address = text(&record.address);
        let address_y = scale.pos(layout.address_y);
        let line_gap = scale.pos(layout.address_line_gap);
        for (i, line) in wrap_text(&address, layout.address_wrap_chars)
            .iter()
            .take(layout.address_max_lines)
            .enumerate()
        {
            draw_text(
                card,
                &fonts.text,
                (x, address_y + i as i32 * line_gap),
                line,
                TextAnchor::LeftBaseline,
                canvas::BLACK,
            );
        }
    }

    fn draw_photo(
        &self,
        card: &mut RgbaImage,
        fonts: &FontSet,
        scale: Scale,
        photo_path: Option<&str>,
    ) -> PhotoOutcome {
        let photo_box = scale.photo_box(&self.layout.photo_box);

        let path = match photo_path.map(Path::new).filter(|p| p.exists()) {
            Some(path) => path,
            None => {
                tracing::debug!(path = ?photo_path, "Member photo not found, drawing placeholder");
                draw_placeholder(card, fonts, photo_box, "PHOTO\nNOT FOUND");
                return PhotoOutcome::Missing;
            }
        };

        match image::open(path) {
            Ok(photo) => {
                let resized = imageops::resize(
                    &photo.to_rgba8(),
                    photo_box.width,
                    photo_box.height,
                    FilterType::Lanczos3,
                );
                imageops::overlay(card, &resized, photo_box.x as i64, photo_box.y as i64);
                PhotoOutcome::Pasted
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Photo error, drawing placeholder"
                );
                draw_placeholder(card, fonts, photo_box, "PHOTO\nERROR");
                PhotoOutcome::Failed(e.to_string())
            }
        }
    }

    fn draw_overlay(&self, card: &mut RgbaImage, scale: Scale) -> OverlayOutcome {
        if !self.overlay_path.is_file() {
            tracing::warn!(
                path = %self.overlay_path.display(),
                "Signature overlay not found; skipping overlay composite"
            );
            return OverlayOutcome::Absent;
        }

        let overlay = match image::open(&self.overlay_path) {
            Ok(img) => img.to_rgba8(),
            Err(e) => {
                tracing::warn!(error = %e, "Signature overlay error");
                return OverlayOutcome::Failed(e.to_string());
            }
        };

        let (width, height) = scale.dimensions(overlay.dimensions());
        if width == 0 || height == 0 {
            return OverlayOutcome::Failed(format!("overlay scales to {}x{}", width, height));
        }

        let resized = imageops::resize(&overlay, width, height, FilterType::Lanczos3);
        let (x, y) = scale.point(self.layout.signature_overlay_xy);
        imageops::overlay(card, &resized, x as i64, y as i64);
        OverlayOutcome::Composited
    }
}

/// Silver box with a gray outline and a centered label
fn draw_placeholder(
    card: &mut RgbaImage,
    fonts: &FontSet,
    photo_box: super::PhotoBox,
    label: &str,
) {
    let (x0, y0) = (photo_box.x as i32, photo_box.y as i32);
    let (x1, y1) = (x0 + photo_box.width as i32, y0 + photo_box.height as i32);

    fill_rect(card, x0, y0, x1, y1, canvas::SILVER);
    outline_rect(card, x0, y0, x1, y1, canvas::OUTLINE, 2);

    let center = (
        x0 + photo_box.width as i32 / 2,
        y0 + photo_box.height as i32 / 2,
    );
    draw_text(card, &fonts.small, center, label, TextAnchor::Center, canvas::GRAY);
}

/// File name for a member's card: membership number, or an id-based fallback
pub fn card_file_name(record: &MemberRecord) -> String {
    let stub = match record.membership_no.as_deref().filter(|v| !v.is_empty()) {
        Some(number) => number.to_string(),
        None => match record.known_id() {
            Some(id) => format!("id-{}", id),
            None => "id-unknown".to_string(),
        },
    };
    format!("{}{}.png", CARD_FILE_PREFIX, sanitize_file_stub(&stub))
}

/// Replace characters that are unsafe in a file name
fn sanitize_file_stub(stub: &str) -> String {
    stub.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect()
}
