use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::api::{ApiError, EditOutcome, EditRequest, ImageBlob};
use super::chat::{ChatError, ChatState};
use super::download::{suggested_name, DownloadError};
use super::tool::ToolMode;
use super::upload::ImageFile;

pub const MIN_BLUR_STRENGTH: u8 = 0;
pub const MAX_BLUR_STRENGTH: u8 = 10;
pub const DEFAULT_BLUR_STRENGTH: u8 = 5;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Choose a tool first.")]
    NoTool,

    #[error("Please select an image first.")]
    NoFile,

    #[error("Still working on the previous image.")]
    Busy,

    #[error(transparent)]
    Chat(#[from] ChatError),
}

/// An upload that has been handed out but not yet answered.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub id: u64,
    pub request: EditRequest,
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone)]
struct InFlight {
    id: u64,
    tool: ToolMode,
    source_stem: String,
    /// Strength a blur request was sent with.
    strength: Option<u8>,
    cancel: CancellationToken,
}

/// Everything the views show: the active tool, the chosen image, the last
/// result and the one error message.
#[derive(Debug, Clone)]
pub struct EditorSession {
    pub mode: ToolMode,
    pub selected_file: Option<ImageFile>,
    /// Cutout from the latest background removal, reused by blur.
    pub subject_cutout: Option<ImageBlob>,
    pub result: Option<ImageBlob>,
    pub saved_path: Option<PathBuf>,
    pub error: Option<String>,
    pub blur_strength: u8,
    pub chat: ChatState,
    result_name: Option<String>,
    in_flight: Option<InFlight>,
    next_request_id: u64,
    blur_revision: u64,
}

impl Default for EditorSession {
    fn default() -> Self {
        EditorSession::new(DEFAULT_BLUR_STRENGTH)
    }
}

impl EditorSession {
    pub fn new(blur_strength: u8) -> Self {
        EditorSession {
            mode: ToolMode::Home,
            selected_file: None,
            subject_cutout: None,
            result: None,
            saved_path: None,
            error: None,
            blur_strength: blur_strength.clamp(MIN_BLUR_STRENGTH, MAX_BLUR_STRENGTH),
            chat: ChatState::default(),
            result_name: None,
            in_flight: None,
            next_request_id: 0,
            blur_revision: 0,
        }
    }

    /// Shows another view. Whatever belonged to the previous one is dropped,
    /// including a request still on the wire.
    pub fn switch_mode(&mut self, mode: ToolMode) {
        if mode == self.mode {
            return;
        }
        tracing::debug!(from = %self.mode, to = %mode, "switching tool");
        self.reset();
        self.mode = mode;
    }

    pub fn reset(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.cancel.cancel();
        }
        self.selected_file = None;
        self.subject_cutout = None;
        self.result = None;
        self.result_name = None;
        self.saved_path = None;
        self.error = None;
        self.chat.clear();
    }

    /// Loads and validates the file at `path`. A rejected file leaves nothing
    /// selected and the reason in `error`. While a request is running the
    /// current selection is kept and nothing is read.
    pub fn select_file(&mut self, path: &Path) -> bool {
        if self.is_processing() {
            tracing::info!(path = %path.display(), "selection refused while processing");
            self.error = Some(SessionError::Busy.to_string());
            return false;
        }
        match ImageFile::from_path(path) {
            Ok(file) => self.attach(file).is_ok(),
            Err(err) => {
                tracing::info!(path = %path.display(), error = %err, "rejected file");
                if self.mode == ToolMode::AiBackground {
                    self.chat.reject(err.to_string());
                } else {
                    self.selected_file = None;
                }
                self.error = Some(err.to_string());
                false
            }
        }
    }

    /// Makes `file` the image the next request works on. The answer to a
    /// running request belongs to the current image, so this waits for it.
    pub fn attach(&mut self, file: ImageFile) -> Result<(), SessionError> {
        if self.is_processing() {
            return Err(SessionError::Busy);
        }
        self.error = None;
        if self.mode == ToolMode::AiBackground {
            self.chat.attach(file);
            return Ok(());
        }
        self.selected_file = Some(file);
        self.subject_cutout = None;
        self.result = None;
        self.result_name = None;
        self.saved_path = None;
        Ok(())
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.chat.set_prompt(prompt);
    }

    pub fn is_processing(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn can_process(&self) -> bool {
        if self.is_processing() {
            return false;
        }
        match self.mode {
            ToolMode::Home => false,
            ToolMode::AiBackground => self.chat.can_submit(),
            ToolMode::RemoveBackground | ToolMode::Blur => self.selected_file.is_some(),
        }
    }

    /// Moves the blur strength by `delta`. A held blur result no longer
    /// matches the new strength and is dropped. Returns whether it moved.
    pub fn adjust_blur(&mut self, delta: i16) -> bool {
        let strength = (self.blur_strength as i16 + delta)
            .clamp(MIN_BLUR_STRENGTH as i16, MAX_BLUR_STRENGTH as i16) as u8;
        if strength == self.blur_strength {
            return false;
        }
        self.blur_strength = strength;
        self.blur_revision += 1;
        if self.mode == ToolMode::Blur {
            self.result = None;
            self.result_name = None;
            self.saved_path = None;
            self.error = None;
        }
        true
    }

    /// Bumped on every strength change; a delayed refresh only runs if the
    /// revision it was scheduled for is still current.
    pub fn blur_revision(&self) -> u64 {
        self.blur_revision
    }

    /// A cutout is cached but the blur for the current strength is missing.
    pub fn needs_blur_refresh(&self) -> bool {
        self.mode == ToolMode::Blur
            && !self.is_processing()
            && self.selected_file.is_some()
            && self.subject_cutout.is_some()
            && self.result.is_none()
            && self.error.is_none()
    }

    /// Hands out the next upload and marks the session busy until
    /// [`EditorSession::finish_request`] sees the same id.
    pub fn begin_request(&mut self) -> Result<PendingRequest, SessionError> {
        if self.is_processing() {
            return Err(SessionError::Busy);
        }

        let request = match self.mode {
            ToolMode::Home => return Err(SessionError::NoTool),
            ToolMode::RemoveBackground => EditRequest::RemoveBackground {
                image: self.selected_file.clone().ok_or(SessionError::NoFile)?,
            },
            ToolMode::Blur => EditRequest::Blur {
                original: self.selected_file.clone().ok_or(SessionError::NoFile)?,
                subject: self.subject_cutout.clone(),
                strength: self.blur_strength,
            },
            ToolMode::AiBackground => self.chat.submit()?,
        };

        self.next_request_id += 1;
        let pending = PendingRequest {
            id: self.next_request_id,
            request,
            cancel: CancellationToken::new(),
        };
        self.in_flight = Some(InFlight {
            id: pending.id,
            tool: self.mode,
            source_stem: pending.request.source().stem().to_string(),
            strength: match &pending.request {
                EditRequest::Blur { strength, .. } => Some(*strength),
                _ => None,
            },
            cancel: pending.cancel.clone(),
        });
        self.error = None;

        tracing::info!(id = pending.id, tool = %self.mode, "request started");
        Ok(pending)
    }

    pub fn cancel_request(&self) {
        if let Some(in_flight) = &self.in_flight {
            in_flight.cancel.cancel();
        }
    }

    /// Applies the answer to request `id`. Answers to requests that were
    /// superseded (mode switch, reset) are ignored; returns whether it applied.
    pub fn finish_request(&mut self, id: u64, outcome: Result<EditOutcome, ApiError>) -> bool {
        let in_flight = match self.in_flight.take() {
            Some(in_flight) if in_flight.id == id => in_flight,
            other => {
                tracing::debug!(id, "ignoring stale response");
                self.in_flight = other;
                return false;
            }
        };

        match outcome {
            Ok(outcome) if in_flight.tool == ToolMode::Blur
                && in_flight.strength != Some(self.blur_strength) =>
            {
                tracing::debug!(id, "blur strength moved while processing");
                if outcome.subject.is_some() {
                    self.subject_cutout = outcome.subject;
                }
            }
            Ok(outcome) => {
                let name = suggested_name(in_flight.tool, &in_flight.source_stem, &outcome.result);
                if in_flight.tool == ToolMode::AiBackground {
                    self.chat.receive(Ok(&outcome.result), Some(name.clone()));
                }
                if outcome.subject.is_some() {
                    self.subject_cutout = outcome.subject;
                }
                self.result = Some(outcome.result);
                self.result_name = Some(name);
                self.saved_path = None;
                self.error = None;
            }
            Err(ApiError::Cancelled) => {
                if in_flight.tool == ToolMode::AiBackground {
                    self.chat.abandon();
                }
                self.error = Some(ApiError::Cancelled.to_string());
            }
            Err(err) => {
                tracing::error!(id, error = %err, "request failed");
                if in_flight.tool == ToolMode::AiBackground {
                    self.chat.receive(Err(err.to_string()), None);
                }
                self.error = Some(err.to_string());
            }
        }
        true
    }

    /// The held result and the file name it should be saved under.
    pub fn download_target(&self) -> Result<(&ImageBlob, &str), DownloadError> {
        match (&self.result, &self.result_name) {
            (Some(result), Some(name)) => Ok((result, name.as_str())),
            _ => Err(DownloadError::NothingToSave),
        }
    }

    pub fn record_saved(&mut self, path: PathBuf) {
        self.saved_path = Some(path);
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }
}
