//! Shared domain enumerations aligned with persisted database enums.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "post_status", rename_all = "snake_case")]
pub enum PostStatus {
    Draft,
    Published,
}

impl PostStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }
}

impl Display for PostStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            _ => Err(()),
        }
    }
}

impl From<PostStatus> for postdesk_api_types::PostStatus {
    fn from(status: PostStatus) -> Self {
        match status {
            PostStatus::Draft => postdesk_api_types::PostStatus::Draft,
            PostStatus::Published => postdesk_api_types::PostStatus::Published,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_match_database_labels() {
        for status in [PostStatus::Draft, PostStatus::Published] {
            assert_eq!(status.as_str().parse::<PostStatus>(), Ok(status));
        }
        assert!("archived".parse::<PostStatus>().is_err());
        assert!("Draft".parse::<PostStatus>().is_err());
    }
}
