//! State of the admin post form.
//!
//! The editor owns the form fields, the image selection and the request
//! lifecycle as one value so that every transition can be checked against the
//! current state. Side effects (HTTP calls, deleting orphaned uploads) stay
//! with the caller; methods only report what the caller must do.

use serde_json::{Value, json};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::{ImageRef, PostRecord};
use crate::domain::posts::{ValidationError, validate_post};
use crate::domain::types::PostStatus;

const DEFAULT_READ_TIME: &str = "5";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
    #[error("an image upload is still in progress")]
    UploadInProgress,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("could not load post: {0}")]
    LoadFailed(String),
    #[error("could not save post: {0}")]
    SubmitFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorState {
    Loading,
    Idle,
    Submitting,
    Error(EditorError),
}

impl EditorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditorState::Loading => "loading",
            EditorState::Idle => "idle",
            EditorState::Submitting => "submitting",
            EditorState::Error(_) => "showing an error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSelection {
    /// Keep whatever the stored post has.
    Unchanged,
    Removed,
    Uploading {
        file_name: String,
        progress: u8,
        /// Earlier upload from this session that the new one will supersede.
        replacing: Option<ImageRef>,
    },
    Uploaded(ImageRef),
    UploadFailed {
        file_name: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSlot {
    pub persisted: Option<ImageRef>,
    pub selection: ImageSelection,
}

impl ImageSlot {
    fn persisted(image: Option<ImageRef>) -> Self {
        Self {
            persisted: image,
            selection: ImageSelection::Unchanged,
        }
    }

    /// Image the post will carry if the form is saved now.
    pub fn effective(&self) -> Option<&ImageRef> {
        match &self.selection {
            ImageSelection::Removed => None,
            ImageSelection::Uploaded(image) => Some(image),
            ImageSelection::Unchanged
            | ImageSelection::Uploading { .. }
            | ImageSelection::UploadFailed { .. } => self.persisted.as_ref(),
        }
    }

    pub fn is_uploading(&self) -> bool {
        matches!(self.selection, ImageSelection::Uploading { .. })
    }

    /// Uploaded in this session and not yet saved to any post.
    fn unsaved(&self) -> Option<&ImageRef> {
        match &self.selection {
            ImageSelection::Uploaded(image) => Some(image),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostForm {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    /// Raw text as typed; coerced during validation.
    pub read_time: String,
    pub status: PostStatus,
    pub image: ImageSlot,
}

impl Default for PostForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            excerpt: String::new(),
            content: String::new(),
            read_time: DEFAULT_READ_TIME.to_string(),
            status: PostStatus::Draft,
            image: ImageSlot::persisted(None),
        }
    }
}

impl PostForm {
    fn from_record(record: &PostRecord) -> Self {
        Self {
            title: record.title.clone(),
            excerpt: record.excerpt.clone(),
            content: record.content.clone(),
            read_time: record.read_time.to_string(),
            status: record.status,
            image: ImageSlot::persisted(record.image.clone()),
        }
    }

    /// JSON body for `POST /posts` or `PUT /posts/{id}`.
    pub fn to_payload(&self) -> Value {
        let image = self.image.effective();
        json!({
            "title": self.title,
            "excerpt": self.excerpt,
            "content": self.content,
            "readTime": self.read_time,
            "status": self.status.as_str(),
            "imageUrl": image.map(|i| i.url.as_str()),
            "imagePublicId": image.map(|i| i.public_id.as_str()),
        })
    }
}

#[derive(Debug, Clone)]
pub struct PostEditor {
    post_id: Option<Uuid>,
    form: PostForm,
    state: EditorState,
}

impl PostEditor {
    /// Blank form for a post that does not exist yet.
    pub fn new_post() -> Self {
        Self {
            post_id: None,
            form: PostForm::default(),
            state: EditorState::Idle,
        }
    }

    /// Form for an existing post, waiting for [`PostEditor::loaded`].
    pub fn editing(id: Uuid) -> Self {
        Self {
            post_id: Some(id),
            form: PostForm::default(),
            state: EditorState::Loading,
        }
    }

    pub fn post_id(&self) -> Option<Uuid> {
        self.post_id
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn form(&self) -> &PostForm {
        &self.form
    }

    /// Field edits are allowed only while idle.
    pub fn form_mut(&mut self) -> Result<&mut PostForm, EditorError> {
        self.expect_idle("edit the form")?;
        Ok(&mut self.form)
    }

    pub fn loaded(&mut self, record: &PostRecord) -> Result<(), EditorError> {
        self.expect_loading("apply loaded post")?;
        self.post_id = Some(record.id);
        self.form = PostForm::from_record(record);
        self.state = EditorState::Idle;
        Ok(())
    }

    pub fn load_failed(&mut self, reason: impl Into<String>) -> Result<(), EditorError> {
        self.expect_loading("report a load failure")?;
        self.state = EditorState::Error(EditorError::LoadFailed(reason.into()));
        Ok(())
    }

    pub fn begin_upload(&mut self, file_name: impl Into<String>) -> Result<(), EditorError> {
        self.expect_idle("start an upload")?;
        if self.form.image.is_uploading() {
            return Err(EditorError::UploadInProgress);
        }
        let replacing = self.form.image.unsaved().cloned();
        self.form.image.selection = ImageSelection::Uploading {
            file_name: file_name.into(),
            progress: 0,
            replacing,
        };
        Ok(())
    }

    pub fn report_progress(&mut self, sent: u64, total: u64) -> Result<(), EditorError> {
        match &mut self.form.image.selection {
            ImageSelection::Uploading { progress, .. } => {
                *progress = percent(sent, total);
                Ok(())
            }
            _ => Err(self.invalid("report upload progress")),
        }
    }

    /// Returns an earlier unsaved upload that this one supersedes; the caller
    /// should discard it.
    pub fn upload_succeeded(&mut self, image: ImageRef) -> Result<Option<ImageRef>, EditorError> {
        let ImageSelection::Uploading { replacing, .. } = &self.form.image.selection else {
            return Err(self.invalid("complete an upload"));
        };
        let orphan = replacing.clone();
        self.form.image.selection = ImageSelection::Uploaded(image);
        Ok(orphan)
    }

    /// Returns an earlier unsaved upload dropped along with the failed one.
    pub fn upload_failed(
        &mut self,
        reason: impl Into<String>,
    ) -> Result<Option<ImageRef>, EditorError> {
        let ImageSelection::Uploading {
            file_name,
            replacing,
            ..
        } = &self.form.image.selection
        else {
            return Err(self.invalid("fail an upload"));
        };
        let orphan = replacing.clone();
        self.form.image.selection = ImageSelection::UploadFailed {
            file_name: file_name.clone(),
            reason: reason.into(),
        };
        Ok(orphan)
    }

    /// Returns an unsaved upload the caller should discard. A persisted image
    /// is left for the server to delete once the post is saved without it.
    pub fn remove_image(&mut self) -> Result<Option<ImageRef>, EditorError> {
        self.expect_idle("remove the image")?;
        if self.form.image.is_uploading() {
            return Err(EditorError::UploadInProgress);
        }
        let orphan = self.form.image.unsaved().cloned();
        self.form.image.selection = ImageSelection::Removed;
        Ok(orphan)
    }

    /// Validate the form and move to `Submitting`. On validation failure the
    /// editor shows the violations and stays off the network.
    pub fn submit(&mut self) -> Result<Value, EditorError> {
        self.expect_idle("submit")?;
        if self.form.image.is_uploading() {
            return Err(EditorError::UploadInProgress);
        }

        let payload = self.form.to_payload();
        if let Err(err) = validate_post(&payload) {
            let err = EditorError::Validation(err);
            self.state = EditorState::Error(err.clone());
            return Err(err);
        }

        self.state = EditorState::Submitting;
        Ok(payload)
    }

    pub fn submit_succeeded(&mut self, record: &PostRecord) -> Result<(), EditorError> {
        if self.state != EditorState::Submitting {
            return Err(self.invalid("finish a submission"));
        }
        self.post_id = Some(record.id);
        self.form = PostForm::from_record(record);
        self.state = EditorState::Idle;
        Ok(())
    }

    pub fn submit_failed(&mut self, reason: impl Into<String>) -> Result<(), EditorError> {
        if self.state != EditorState::Submitting {
            return Err(self.invalid("fail a submission"));
        }
        self.state = EditorState::Error(EditorError::SubmitFailed(reason.into()));
        Ok(())
    }

    /// After a failed load the editor returns to `Loading` for another fetch.
    pub fn dismiss_error(&mut self) -> Result<(), EditorError> {
        self.state = match &self.state {
            EditorState::Error(EditorError::LoadFailed(_)) => EditorState::Loading,
            EditorState::Error(_) => EditorState::Idle,
            _ => return Err(self.invalid("dismiss an error")),
        };
        Ok(())
    }

    fn expect_idle(&self, action: &'static str) -> Result<(), EditorError> {
        if self.state == EditorState::Idle {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    fn expect_loading(&self, action: &'static str) -> Result<(), EditorError> {
        if self.state == EditorState::Loading {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    fn invalid(&self, action: &'static str) -> EditorError {
        EditorError::InvalidTransition {
            action,
            state: self.state.as_str(),
        }
    }
}

fn percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let ratio = sent.min(total).saturating_mul(100) / total;
    u8::try_from(ratio).unwrap_or(100)
}
