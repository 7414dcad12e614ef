use std::sync::Arc;

use crate::application::images::ImageStore;
use crate::application::posts::PostService;
use crate::application::repos::HealthRepo;
use crate::application::sessions::SessionService;

#[derive(Clone)]
pub struct ApiState {
    pub posts: Arc<PostService>,
    pub sessions: Arc<SessionService>,
    pub images: Arc<dyn ImageStore>,
    pub health: Arc<dyn HealthRepo>,
    /// Cookie consulted when no `Authorization` header is sent.
    pub cookie_name: Arc<str>,
}
