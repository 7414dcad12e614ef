//! Image store backed by the Cloudinary upload API.

use std::time::Duration;

use async_trait::async_trait;
use mime_guess::mime::Mime;
use reqwest::{
    Client, Response,
    multipart::{Form, Part},
};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use url::Url;

use crate::application::images::{
    ImageDeleteError, ImageStore, ImageUpload, ImageUploadError, UploadedImage,
};
use crate::config::ImagesSettings;
use crate::domain::entities::ImageRef;

use super::error::InfraError;

const SIGNATURE_ALGORITHM: &str = "sha256";
const DESTROY_OK: &str = "ok";

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub base_url: Url,
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: String,
    pub timeout: Duration,
}

impl From<&ImagesSettings> for CloudinaryConfig {
    fn from(settings: &ImagesSettings) -> Self {
        Self {
            base_url: settings.base_url.clone(),
            cloud_name: settings.cloud_name.clone(),
            api_key: settings.api_key.clone(),
            api_secret: settings.api_secret.clone(),
            folder: settings.folder.clone(),
            timeout: settings.timeout,
        }
    }
}

#[derive(Clone)]
pub struct CloudinaryImageStore {
    client: Client,
    config: CloudinaryConfig,
}

#[derive(Debug, Deserialize)]
struct UploadBody {
    secure_url: String,
    public_id: String,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    format: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DestroyBody {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl CloudinaryImageStore {
    pub fn new(config: CloudinaryConfig) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(concat!("postdesk/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(InfraError::ImageHost)?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, resource_type: &str, action: &str) -> String {
        format!(
            "{}/v1_1/{}/{resource_type}/{action}",
            self.config.base_url.as_str().trim_end_matches('/'),
            self.config.cloud_name
        )
    }

    /// Form carrying `params`, the api key and their signature.
    fn signed_form(&self, params: Vec<(&'static str, String)>) -> Form {
        let signature = sign(&params, &self.config.api_secret);
        params
            .into_iter()
            .fold(Form::new(), |form, (key, value)| form.text(key, value))
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", SIGNATURE_ALGORITHM)
    }

    async fn error_message(response: Response) -> String {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => body.error.message,
            Err(_) if text.is_empty() => status.to_string(),
            Err(_) => text,
        }
    }
}

#[async_trait]
impl ImageStore for CloudinaryImageStore {
    fn folder(&self) -> &str {
        &self.config.folder
    }

    async fn upload(&self, upload: ImageUpload) -> Result<UploadedImage, ImageUploadError> {
        let timestamp = OffsetDateTime::now_utc().unix_timestamp().to_string();
        // A content type that does not parse is replaced by a guess from the name.
        let mime = upload
            .content_type
            .as_deref()
            .and_then(|raw| raw.parse::<Mime>().ok())
            .or_else(|| mime_guess::from_path(&upload.file_name).first());
        let mut file = Part::bytes(upload.bytes.to_vec()).file_name(upload.file_name);
        if let Some(mime) = mime {
            file = file
                .mime_str(mime.as_ref())
                .map_err(|err| ImageUploadError::Transport(err.to_string()))?;
        }

        let form = self
            .signed_form(vec![
                ("folder", self.config.folder.clone()),
                ("timestamp", timestamp),
            ])
            .part("file", file);

        let response = self
            .client
            .post(self.endpoint("auto", "upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|err| ImageUploadError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageUploadError::Rejected {
                status: status.as_u16(),
                message: Self::error_message(response).await,
            });
        }

        let body: UploadBody = response
            .json()
            .await
            .map_err(|err| ImageUploadError::InvalidResponse(err.to_string()))?;

        Ok(UploadedImage {
            image: ImageRef::new(body.secure_url, body.public_id),
            width: body.width,
            height: body.height,
            format: body.format,
        })
    }

    async fn delete(&self, public_id: &str) -> Result<(), ImageDeleteError> {
        let timestamp = OffsetDateTime::now_utc().unix_timestamp().to_string();
        let form = self.signed_form(vec![
            ("public_id", public_id.to_string()),
            ("timestamp", timestamp),
        ]);

        let response = self
            .client
            .post(self.endpoint("image", "destroy"))
            .multipart(form)
            .send()
            .await
            .map_err(|err| ImageDeleteError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            return Err(ImageDeleteError::Rejected {
                result: Self::error_message(response).await,
            });
        }

        let body: DestroyBody = response
            .json()
            .await
            .map_err(|err| ImageDeleteError::InvalidResponse(err.to_string()))?;

        if body.result == DESTROY_OK {
            Ok(())
        } else {
            Err(ImageDeleteError::Rejected {
                result: body.result,
            })
        }
    }
}

/// `sha256("k1=v1&k2=v2" + secret)` over the parameters sorted by name.
fn sign(params: &[(&str, String)], secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize().to_vec())
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use httpmock::MockServer;

    use super::*;

    fn store(server: &MockServer) -> CloudinaryImageStore {
        CloudinaryImageStore::new(CloudinaryConfig {
            base_url: Url::parse(&server.base_url()).expect("mock url"),
            cloud_name: "demo".into(),
            api_key: "key-123".into(),
            api_secret: "secret".into(),
            folder: "blog-posts".into(),
            timeout: Duration::from_secs(5),
        })
        .expect("client")
    }

    fn png() -> ImageUpload {
        ImageUpload {
            file_name: "hero.png".into(),
            content_type: Some("image/png".into()),
            bytes: Bytes::from_static(b"\x89PNG fake"),
        }
    }

    #[test]
    fn signature_sorts_params_and_appends_secret() {
        let signature = sign(
            &[
                ("timestamp", "1700000000".to_string()),
                ("folder", "blog-posts".to_string()),
            ],
            "secret",
        );
        assert_eq!(
            signature,
            "c6a5ece97acf05f0ba1d7cb43526040eeb257a7da6d1efb1b42375b5ee923a8f"
        );

        let signature = sign(
            &[
                ("public_id", "blog-posts/hero".to_string()),
                ("timestamp", "1700000000".to_string()),
            ],
            "secret",
        );
        assert_eq!(
            signature,
            "6f4ecd013689d71e6f306c57cfc4e6f270ff52b67ba59a23f93e8aa84bc99838"
        );
    }

    #[tokio::test]
    async fn upload_posts_signed_multipart_and_maps_response() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("POST")
                .path("/v1_1/demo/auto/upload")
                .body_includes("name=\"folder\"")
                .body_includes("blog-posts")
                .body_includes("name=\"api_key\"")
                .body_includes("key-123")
                .body_includes("name=\"signature\"")
                .body_includes("name=\"signature_algorithm\"")
                .body_includes("name=\"file\"; filename=\"hero.png\"");
            then.status(200)
                .header("content-type", "application/json")
                .body(
                    r#"{"secure_url":"https://res.cloudinary.com/demo/image/upload/v1/blog-posts/abc.png","public_id":"blog-posts/abc","width":1200,"height":630,"format":"png","resource_type":"image"}"#,
                );
        });

        let uploaded = store(&server).upload(png()).await.expect("upload");

        mock.assert();
        assert_eq!(uploaded.image.public_id, "blog-posts/abc");
        assert_eq!(
            uploaded.image.url,
            "https://res.cloudinary.com/demo/image/upload/v1/blog-posts/abc.png"
        );
        assert_eq!(uploaded.width, Some(1200));
        assert_eq!(uploaded.height, Some(630));
        assert_eq!(uploaded.format.as_deref(), Some("png"));
    }

    #[tokio::test]
    async fn unparsable_content_type_falls_back_to_file_name() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("POST")
                .path("/v1_1/demo/auto/upload")
                .body_includes("Content-Type: image/png");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"secure_url":"https://img.test/blog-posts/abc.png","public_id":"blog-posts/abc"}"#);
        });

        let upload = ImageUpload {
            content_type: Some("definitely not a mime".into()),
            ..png()
        };
        let uploaded = store(&server).upload(upload).await.expect("upload");

        mock.assert();
        assert_eq!(uploaded.image.public_id, "blog-posts/abc");
        assert_eq!(uploaded.width, None);
    }

    #[tokio::test]
    async fn upload_surfaces_host_error_message() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("POST").path("/v1_1/demo/auto/upload");
            then.status(400)
                .header("content-type", "application/json")
                .body(r#"{"error":{"message":"Invalid image file"}}"#);
        });

        let err = store(&server).upload(png()).await.unwrap_err();

        match err {
            ImageUploadError::Rejected { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid image file");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn upload_rejects_unreadable_success_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("POST").path("/v1_1/demo/auto/upload");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"unexpected":true}"#);
        });

        let err = store(&server).upload(png()).await.unwrap_err();
        assert!(matches!(err, ImageUploadError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn delete_accepts_ok_result() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("POST")
                .path("/v1_1/demo/image/destroy")
                .body_includes("name=\"public_id\"")
                .body_includes("blog-posts/abc")
                .body_includes("name=\"signature\"");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"result":"ok"}"#);
        });

        store(&server).delete("blog-posts/abc").await.expect("delete");
        mock.assert();
    }

    #[tokio::test]
    async fn delete_maps_not_found_result_to_rejection() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("POST").path("/v1_1/demo/image/destroy");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"result":"not found"}"#);
        });

        let err = store(&server).delete("blog-posts/gone").await.unwrap_err();
        match err {
            ImageDeleteError::Rejected { result } => assert_eq!(result, "not found"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_reports_transport_failures() {
        let config = CloudinaryConfig {
            base_url: Url::parse("http://127.0.0.1:1").expect("url"),
            cloud_name: "demo".into(),
            api_key: "key".into(),
            api_secret: "secret".into(),
            folder: "blog-posts".into(),
            timeout: Duration::from_secs(2),
        };
        let store = CloudinaryImageStore::new(config).expect("client");

        let err = store.delete("blog-posts/abc").await.unwrap_err();
        assert!(matches!(err, ImageDeleteError::Transport(_)));
    }
}
