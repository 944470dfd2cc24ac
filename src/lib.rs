//! photocard composites a personal photo underneath a PNG template on a square canvas.
//!
//! - Load a photo and a template into an [`Editor`]
//! - Drive placement, rotation, zoom, filters, background and blend with [`Command`]s
//! - [`Editor::confirm`] the guide-free composite and hand it to an [`Exporter`]
#![forbid(unsafe_code)]

pub mod assets;
pub mod config;
pub mod controller;
pub mod edit;
pub mod export;
pub mod foundation;
pub mod geometry;
pub mod render;
pub mod session;

pub use crate::assets::catalog::{TemplateCatalog, TemplateEntry, scan_template_dir};
pub use crate::assets::decode::{ImageRole, MediaType, PreparedImage};
pub use crate::assets::slot::{DecodeJob, DecodeOutcome, SlotUpdate};
pub use crate::config::EditorConfig;
pub use crate::controller::{Command, Direction, DragState, Key, KeyInput};
pub use crate::edit::history::History;
pub use crate::edit::state::{BlendMode, EditState, FilterSettings};
pub use crate::export::{
    EncodedImage, ExportArtifact, ExportFormat, ExportJob, ExportRequest, ExportScale, Exporter,
};
pub use crate::foundation::core::{Canvas, Position, Rgb8};
pub use crate::foundation::error::{PhotocardError, PhotocardResult};
pub use crate::render::{CpuRenderer, FrameRGBA, RenderInputs};
pub use crate::session::{Confirmation, Editor};
