//! In-memory backends and request helpers shared by the router tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use postdesk::application::images::{
    ImageDeleteError, ImageStore, ImageUpload, ImageUploadError, UploadedImage,
};
use postdesk::application::posts::PostService;
use postdesk::application::repos::{
    AuthorsRepo, CreateAuthorParams, CreatePostParams, CreateSessionParams, HealthRepo,
    PostListScope, PostUpdate, PostsRepo, PostsWriteRepo, RepoError, SessionsRepo,
    UpdatePostParams,
};
use postdesk::application::sessions::SessionService;
use postdesk::domain::entities::{
    AuthorRecord, AuthorSummary, ImageRef, PostRecord, PostWithAuthor, SessionRecord,
};
use postdesk::domain::types::PostStatus;
use postdesk::infra::http::{ApiState, build_router};
use serde_json::Value;
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

pub const COOKIE_NAME: &str = "postdesk_session";
pub const UPLOAD_LIMIT: usize = 64 * 1024;
pub const BOUNDARY: &str = "postdesk-test-boundary";

#[derive(Default)]
pub struct MemoryBackend {
    posts: Mutex<Vec<PostRecord>>,
    authors: Mutex<Vec<AuthorRecord>>,
    sessions: Mutex<Vec<SessionRecord>>,
    unhealthy: AtomicBool,
    sessions_down: AtomicBool,
}

impl MemoryBackend {
    pub fn insert_post(&self, post: PostRecord) {
        self.posts.lock().unwrap().push(post);
    }

    pub fn post(&self, id: Uuid) -> Option<PostRecord> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .find(|post| post.id == id)
            .cloned()
    }

    pub fn post_count(&self) -> usize {
        self.posts.lock().unwrap().len()
    }

    pub fn set_unhealthy(&self) {
        self.unhealthy.store(true, Ordering::SeqCst);
    }

    pub fn fail_session_lookups(&self) {
        self.sessions_down.store(true, Ordering::SeqCst);
    }

    fn summary(&self, author_id: Uuid) -> AuthorSummary {
        self.authors
            .lock()
            .unwrap()
            .iter()
            .find(|author| author.id == author_id)
            .map(|author| AuthorSummary {
                name: author.name.clone(),
                image: author.image.clone(),
            })
            .unwrap_or(AuthorSummary {
                name: "unknown".into(),
                image: None,
            })
    }
}

#[async_trait]
impl PostsRepo for MemoryBackend {
    async fn list_posts(&self, scope: PostListScope) -> Result<Vec<PostWithAuthor>, RepoError> {
        let mut posts: Vec<PostRecord> = self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|post| scope.admits(post.status))
            .cloned()
            .collect();
        posts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(posts
            .into_iter()
            .map(|post| PostWithAuthor {
                author: self.summary(post.author_id),
                post,
            })
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostWithAuthor>, RepoError> {
        Ok(self.post(id).map(|post| PostWithAuthor {
            author: self.summary(post.author_id),
            post,
        }))
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryBackend {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let post = PostRecord {
            id: Uuid::new_v4(),
            title: params.title,
            excerpt: params.excerpt,
            content: params.content,
            read_time: params.read_time,
            status: params.status,
            image: params.image,
            author_id: params.author_id,
            created_at: now,
            updated_at: now,
        };
        self.insert_post(post.clone());
        Ok(post)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostUpdate, RepoError> {
        let mut posts = self.posts.lock().unwrap();
        let slot = posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        let before = slot.clone();
        let after = PostRecord {
            title: params.title,
            excerpt: params.excerpt,
            content: params.content,
            read_time: params.read_time,
            status: params.status,
            image: params.image,
            updated_at: OffsetDateTime::now_utc(),
            ..before.clone()
        };
        *slot = after.clone();
        Ok(PostUpdate { before, after })
    }

    async fn delete_post(&self, id: Uuid) -> Result<PostRecord, RepoError> {
        let mut posts = self.posts.lock().unwrap();
        let index = posts
            .iter()
            .position(|post| post.id == id)
            .ok_or(RepoError::NotFound)?;
        Ok(posts.remove(index))
    }
}

#[async_trait]
impl AuthorsRepo for MemoryBackend {
    async fn create_author(&self, params: CreateAuthorParams) -> Result<AuthorRecord, RepoError> {
        let author = AuthorRecord {
            id: Uuid::new_v4(),
            name: params.name,
            image: params.image,
            created_at: OffsetDateTime::now_utc(),
        };
        self.authors.lock().unwrap().push(author.clone());
        Ok(author)
    }

    async fn find_author(&self, id: Uuid) -> Result<Option<AuthorRecord>, RepoError> {
        Ok(self
            .authors
            .lock()
            .unwrap()
            .iter()
            .find(|author| author.id == id)
            .cloned())
    }
}

#[async_trait]
impl SessionsRepo for MemoryBackend {
    async fn create_session(
        &self,
        params: CreateSessionParams,
    ) -> Result<SessionRecord, RepoError> {
        let record = SessionRecord {
            id: Uuid::new_v4(),
            author_id: params.author_id,
            prefix: params.prefix,
            hashed_secret: params.hashed_secret,
            expires_at: params.expires_at,
            revoked_at: None,
            created_at: OffsetDateTime::now_utc(),
        };
        self.sessions.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn find_by_prefix(&self, prefix: &str) -> Result<Option<SessionRecord>, RepoError> {
        if self.sessions_down.load(Ordering::SeqCst) {
            return Err(RepoError::Timeout);
        }
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .find(|session| session.prefix == prefix)
            .cloned())
    }

    async fn revoke_session(&self, id: Uuid, revoked_at: OffsetDateTime) -> Result<(), RepoError> {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .iter_mut()
            .find(|session| session.id == id)
            .ok_or(RepoError::NotFound)?;
        session.revoked_at.get_or_insert(revoked_at);
        Ok(())
    }
}

#[async_trait]
impl HealthRepo for MemoryBackend {
    async fn ping(&self) -> Result<(), RepoError> {
        if self.unhealthy.load(Ordering::SeqCst) {
            Err(RepoError::Timeout)
        } else {
            Ok(())
        }
    }
}

/// Image host double that records every call.
#[derive(Default)]
pub struct FakeImages {
    deleted: Mutex<Vec<String>>,
    uploaded: Mutex<Vec<String>>,
    fail_deletes: AtomicBool,
    next_id: AtomicUsize,
}

impl FakeImages {
    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn uploaded(&self) -> Vec<String> {
        self.uploaded.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageStore for FakeImages {
    fn folder(&self) -> &str {
        "blog-posts"
    }

    async fn upload(&self, upload: ImageUpload) -> Result<UploadedImage, ImageUploadError> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let public_id = format!("blog-posts/img-{n}");
        self.uploaded.lock().unwrap().push(upload.file_name);
        Ok(UploadedImage {
            image: ImageRef::new(format!("https://img.test/{public_id}.png"), public_id),
            width: Some(1200),
            height: Some(630),
            format: Some("png".into()),
        })
    }

    async fn delete(&self, public_id: &str) -> Result<(), ImageDeleteError> {
        self.deleted.lock().unwrap().push(public_id.to_string());
        if self.fail_deletes.load(Ordering::SeqCst) {
            Err(ImageDeleteError::Transport(
                "connect timeout to internal-host:443".into(),
            ))
        } else {
            Ok(())
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub backend: Arc<MemoryBackend>,
    pub images: Arc<FakeImages>,
    pub sessions: Arc<SessionService>,
    pub author_id: Uuid,
    pub session_id: Uuid,
    pub token: String,
}

impl TestApp {
    pub async fn new() -> Self {
        let backend = Arc::new(MemoryBackend::default());
        let images = Arc::new(FakeImages::default());

        let author = backend
            .create_author(CreateAuthorParams {
                name: "Ada Lovelace".into(),
                image: Some("https://img.test/ada.png".into()),
            })
            .await
            .unwrap();

        let sessions = Arc::new(SessionService::new(backend.clone(), backend.clone()));
        let issued = sessions
            .issue(author.id, time::Duration::hours(1))
            .await
            .unwrap();

        let state = ApiState {
            posts: Arc::new(PostService::new(
                backend.clone(),
                backend.clone(),
                images.clone(),
            )),
            sessions: sessions.clone(),
            images: images.clone(),
            health: backend.clone(),
            cookie_name: Arc::from(COOKIE_NAME),
        };

        Self {
            router: build_router(state, UPLOAD_LIMIT),
            backend,
            images,
            sessions,
            author_id: author.id,
            session_id: issued.record.id,
            token: issued.token,
        }
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Stores a post directly, bypassing the HTTP surface.
    pub fn seed_post(&self, status: PostStatus, image: Option<ImageRef>) -> PostRecord {
        let now = OffsetDateTime::now_utc();
        let post = PostRecord {
            id: Uuid::new_v4(),
            title: "Seeded title".into(),
            excerpt: "Seeded excerpt text".into(),
            content: "s".repeat(80),
            read_time: 4,
            status,
            image,
            author_id: self.author_id,
            created_at: now,
            updated_at: now,
        };
        self.backend.insert_post(post.clone());
        post
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }
}

pub fn json_request(method: &str, uri: &str, auth: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: &str, uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::empty()).unwrap()
}

/// Multipart body with a single part named `field`.
pub fn multipart_request(
    auth: Option<&str>,
    field: &str,
    file_name: &str,
    content: &[u8],
) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body)).unwrap()
}

pub fn valid_payload() -> Value {
    serde_json::json!({
        "title": "Hello World!",
        "excerpt": "A short intro text",
        "content": "x".repeat(60),
        "readTime": 5,
        "status": "draft",
    })
}
