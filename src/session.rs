use std::sync::Arc;

use crate::assets::decode::{ImageRole, PreparedImage, validate_input};
use crate::assets::slot::{DecodeJob, DecodeOutcome, ImageSlot, SlotUpdate};
use crate::config::EditorConfig;
use crate::controller::{Command, Controller, KeyInput, command_for_key, command_for_key_release};
use crate::edit::history::History;
use crate::edit::state::{BlendMode, EditState, FilterSettings};
use crate::export::{EncodedImage, encode_png};
use crate::foundation::core::Rgb8;
use crate::foundation::error::{PhotocardError, PhotocardResult};
use crate::render::{CpuRenderer, FrameRGBA, RenderInputs};

/// What the editor hands over when the user confirms a composition.
#[derive(Clone, Debug, PartialEq)]
pub struct Confirmation {
    /// Guide-free PNG at canvas resolution.
    pub image: EncodedImage,
    pub filters: FilterSettings,
    pub background: Rgb8,
    pub blend: BlendMode,
}

/// One editing session: the two image slots, the single [`EditState`], its history, and the
/// painted canvas.
pub struct Editor {
    config: EditorConfig,
    photo: ImageSlot,
    template: ImageSlot,
    state: EditState,
    history: History,
    controller: Controller,
    renderer: CpuRenderer,
    guides: bool,
    painted: bool,
}

impl Editor {
    pub fn new(config: EditorConfig) -> PhotocardResult<Self> {
        config.validate()?;
        let renderer = CpuRenderer::new(config.canvas)?;
        Ok(Self {
            photo: ImageSlot::new(ImageRole::Photo),
            template: ImageSlot::new(ImageRole::Template),
            state: EditState::centered(config.canvas),
            history: History::new(),
            controller: Controller::new(&config),
            renderer,
            guides: false,
            painted: false,
            config,
        })
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// The pristine state undo falls back to once history is exhausted.
    pub fn baseline(&self) -> EditState {
        EditState::centered(self.config.canvas)
    }

    pub fn photo(&self) -> Option<&Arc<PreparedImage>> {
        self.photo.get()
    }

    pub fn template(&self) -> Option<&Arc<PreparedImage>> {
        self.template.get()
    }

    /// Both images decoded; commands and rendering are live.
    pub fn is_ready(&self) -> bool {
        self.photo.get().is_some() && self.template.get().is_some()
    }

    pub fn guides_visible(&self) -> bool {
        self.guides
    }

    pub fn set_guides(&mut self, on: bool) -> PhotocardResult<()> {
        if self.guides != on {
            self.guides = on;
            self.repaint()?;
        }
        Ok(())
    }

    pub fn toggle_guides(&mut self) -> PhotocardResult<()> {
        self.set_guides(!self.guides)
    }

    /// Validate a photo upload and hand back the decode work. Nothing changes if validation fails.
    pub fn request_photo(
        &mut self,
        bytes: Vec<u8>,
        declared_mime: Option<&str>,
    ) -> PhotocardResult<DecodeJob> {
        self.request(ImageRole::Photo, bytes, declared_mime)
    }

    /// Same as [`Editor::request_photo`], PNG only.
    pub fn request_template(
        &mut self,
        bytes: Vec<u8>,
        declared_mime: Option<&str>,
    ) -> PhotocardResult<DecodeJob> {
        self.request(ImageRole::Template, bytes, declared_mime)
    }

    fn request(
        &mut self,
        role: ImageRole,
        bytes: Vec<u8>,
        declared_mime: Option<&str>,
    ) -> PhotocardResult<DecodeJob> {
        let media = validate_input(role, &bytes, declared_mime, self.config.max_upload_bytes)
            .inspect_err(|err| tracing::warn!(%role, %err, "upload rejected"))?;
        self.painted = false;
        let job = match role {
            ImageRole::Photo => self.photo.request(bytes, media),
            ImageRole::Template => self.template.request(bytes, media),
        };
        Ok(job)
    }

    /// Apply a finished decode. Stale results are dropped; a fresh photo records a baseline step.
    pub fn complete_decode(&mut self, outcome: DecodeOutcome) -> PhotocardResult<SlotUpdate> {
        let role = outcome.ticket.role();
        let update = match role {
            ImageRole::Photo => self.photo.resolve(outcome)?,
            ImageRole::Template => self.template.resolve(outcome)?,
        };
        if update == SlotUpdate::Loaded {
            if role == ImageRole::Photo {
                // A flushed nudge batch already recorded the current state as the baseline.
                if !self.controller.flush_pending(&self.state, &mut self.history) {
                    self.history.snapshot(&self.state);
                }
                self.controller.reset();
            }
            self.repaint()?;
        }
        Ok(update)
    }

    /// Validate, decode and install a photo on the calling thread.
    pub fn load_photo(&mut self, bytes: Vec<u8>, declared_mime: Option<&str>) -> PhotocardResult<()> {
        let job = self.request_photo(bytes, declared_mime)?;
        self.complete_decode(job.run()).map(|_| ())
    }

    pub fn load_template(
        &mut self,
        bytes: Vec<u8>,
        declared_mime: Option<&str>,
    ) -> PhotocardResult<()> {
        let job = self.request_template(bytes, declared_mime)?;
        self.complete_decode(job.run()).map(|_| ())
    }

    /// Feed one command to the controller. Inert until both images are ready.
    ///
    /// Returns whether the edit state changed; the canvas has been repainted when it did.
    pub fn dispatch(&mut self, cmd: Command) -> PhotocardResult<bool> {
        if !self.is_ready() {
            return Ok(false);
        }
        let fallback = self.baseline();
        let changed = self
            .controller
            .apply(cmd, &mut self.state, &mut self.history, &fallback);
        if changed {
            self.repaint()?;
        }
        Ok(changed)
    }

    pub fn handle_key(&mut self, input: KeyInput) -> PhotocardResult<bool> {
        match command_for_key(input) {
            Some(cmd) => self.dispatch(cmd),
            None => Ok(false),
        }
    }

    pub fn handle_key_release(&mut self, input: KeyInput) -> PhotocardResult<bool> {
        match command_for_key_release(input) {
            Some(cmd) => self.dispatch(cmd),
            None => Ok(false),
        }
    }

    /// The current painted canvas, if both images are loaded.
    pub fn frame(&self) -> Option<&FrameRGBA> {
        self.painted.then(|| self.renderer.frame())
    }

    /// Scale back to 1 and filters to neutral, as one undoable step.
    pub fn reset_adjustments(&mut self) -> PhotocardResult<bool> {
        if !self.is_ready() {
            return Ok(false);
        }
        if self.state.scale == 1.0 && self.state.filters.is_neutral() {
            return Ok(false);
        }
        self.controller.flush_pending(&self.state, &mut self.history);
        self.controller.reset();
        self.state.scale = 1.0;
        self.state.filters = FilterSettings::NEUTRAL;
        self.history.snapshot(&self.state);
        self.repaint()?;
        Ok(true)
    }

    /// Replace the whole edit state (for example a saved one), as one undoable step.
    pub fn set_state(&mut self, state: EditState) -> PhotocardResult<()> {
        let state = state.normalized(self.config.min_scale, self.config.max_scale)?;
        self.controller.flush_pending(&self.state, &mut self.history);
        self.controller.reset();
        self.state = state;
        self.history.snapshot(&self.state);
        self.repaint()
    }

    /// Drop both images, the edit state, history and guides.
    pub fn new_card(&mut self) {
        self.photo.clear();
        self.template.clear();
        self.state = self.baseline();
        self.history.clear();
        self.controller.reset();
        self.guides = false;
        self.painted = false;
        tracing::debug!("new card");
    }

    /// Render without guides and encode the result as PNG at canvas resolution.
    ///
    /// The interactive frame is repainted afterwards with the current guide setting.
    #[tracing::instrument(skip(self))]
    pub fn confirm(&mut self) -> PhotocardResult<Confirmation> {
        let (Some(photo), Some(template)) = (self.photo.get(), self.template.get()) else {
            return Err(PhotocardError::validation(
                "a photo and a template must be loaded before confirming",
            ));
        };
        let frame = self.renderer.render(&RenderInputs {
            photo,
            template,
            state: &self.state,
            guides: false,
        })?;
        let image = encode_png(frame)?;
        if self.guides {
            self.repaint()?;
        }
        Ok(Confirmation {
            image,
            filters: self.state.filters,
            background: self.state.background,
            blend: self.state.blend,
        })
    }

    fn repaint(&mut self) -> PhotocardResult<()> {
        let (Some(photo), Some(template)) = (self.photo.get(), self.template.get()) else {
            self.painted = false;
            return Ok(());
        };
        self.renderer.render(&RenderInputs {
            photo,
            template,
            state: &self.state,
            guides: self.guides,
        })?;
        self.painted = true;
        Ok(())
    }
}
