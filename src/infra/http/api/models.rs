//! Conversions from domain records to the wire types in `postdesk-api-types`.

use postdesk_api_types as wire;
use serde::Deserialize;

use crate::application::images::UploadedImage;
use crate::domain::entities::{PostRecord, PostWithAuthor};
use crate::domain::posts::ValidationError;
use crate::domain::types::PostStatus;

#[derive(Debug, Default, Deserialize)]
pub struct PostListQuery {
    pub status: Option<PostStatus>,
}

pub fn post_response(post: PostRecord) -> wire::PostResponse {
    let (image_url, image_public_id) = match post.image {
        Some(image) => (Some(image.url), Some(image.public_id)),
        None => (None, None),
    };
    wire::PostResponse {
        id: post.id,
        title: post.title,
        excerpt: post.excerpt,
        content: post.content,
        read_time: post.read_time,
        status: post.status.into(),
        image_url,
        image_public_id,
        author_id: post.author_id,
        author: None,
        created_at: post.created_at,
        updated_at: post.updated_at,
    }
}

pub fn post_with_author_response(found: PostWithAuthor) -> wire::PostResponse {
    let PostWithAuthor { post, author } = found;
    wire::PostResponse {
        author: Some(wire::AuthorSummary {
            name: author.name,
            image: author.image,
        }),
        ..post_response(post)
    }
}

pub fn upload_response(uploaded: UploadedImage) -> wire::UploadResponse {
    wire::UploadResponse {
        url: uploaded.image.url,
        public_id: uploaded.image.public_id,
        width: uploaded.width,
        height: uploaded.height,
        format: uploaded.format,
    }
}

pub fn violations(err: &ValidationError) -> Vec<wire::FieldViolation> {
    err.violations()
        .iter()
        .map(|violation| wire::FieldViolation {
            field: violation.field.to_string(),
            message: violation.message.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;
    use uuid::Uuid;

    use super::*;
    use crate::domain::entities::{AuthorSummary, ImageRef};

    fn record(image: Option<ImageRef>) -> PostRecord {
        PostRecord {
            id: Uuid::new_v4(),
            title: "Hello World!".into(),
            excerpt: "A short intro text".into(),
            content: "x".repeat(60),
            read_time: 5,
            status: PostStatus::Published,
            image,
            author_id: Uuid::new_v4(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn image_splits_into_url_and_public_id() {
        let response = post_response(record(Some(ImageRef::new(
            "https://img.test/a.png",
            "blog-posts/a",
        ))));

        assert_eq!(response.image_url.as_deref(), Some("https://img.test/a.png"));
        assert_eq!(response.image_public_id.as_deref(), Some("blog-posts/a"));
        assert!(response.author.is_none());
    }

    #[test]
    fn author_summary_is_joined_on_reads() {
        let response = post_with_author_response(PostWithAuthor {
            post: record(None),
            author: AuthorSummary {
                name: "Ada".into(),
                image: None,
            },
        });

        assert_eq!(response.author.map(|a| a.name).as_deref(), Some("Ada"));
        assert!(response.image_url.is_none());
        assert_eq!(response.status, wire::PostStatus::Published);
    }
}
