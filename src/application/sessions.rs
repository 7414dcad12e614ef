use std::sync::Arc;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::application::repos::{AuthorsRepo, CreateSessionParams, RepoError, SessionsRepo};
use crate::domain::entities::SessionRecord;

const TOKEN_PREFIX: &str = "ps";
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("author not found")]
    UnknownAuthor,
    #[error("session lifetime must be positive")]
    InvalidTtl,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionAuthError {
    #[error("invalid session token")]
    Invalid,
    #[error("expired session")]
    Expired,
    #[error("revoked session")]
    Revoked,
    /// The session store could not be asked; says nothing about the token.
    #[error("session lookup failed: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct SessionIssued {
    pub record: SessionRecord,
    pub token: String,
}

/// Author resolved from a valid session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPrincipal {
    pub session_id: Uuid,
    pub author_id: Uuid,
}

#[derive(Clone)]
pub struct SessionService {
    repo: Arc<dyn SessionsRepo>,
    authors: Arc<dyn AuthorsRepo>,
}

impl SessionService {
    pub fn new(repo: Arc<dyn SessionsRepo>, authors: Arc<dyn AuthorsRepo>) -> Self {
        Self { repo, authors }
    }

    pub async fn issue(&self, author_id: Uuid, ttl: Duration) -> Result<SessionIssued, SessionError> {
        if ttl <= Duration::ZERO {
            return Err(SessionError::InvalidTtl);
        }
        if self.authors.find_author(author_id).await?.is_none() {
            return Err(SessionError::UnknownAuthor);
        }

        let prefix = Self::generate_prefix();
        let secret = Self::generate_secret();
        let token = format!("{TOKEN_PREFIX}_{prefix}_{secret}");
        let hashed_secret = Self::hash_secret(&secret);

        let record = self
            .repo
            .create_session(CreateSessionParams {
                author_id,
                prefix,
                hashed_secret,
                expires_at: OffsetDateTime::now_utc() + ttl,
            })
            .await?;

        Ok(SessionIssued { record, token })
    }

    pub async fn revoke(&self, id: Uuid) -> Result<(), SessionError> {
        self.repo
            .revoke_session(id, OffsetDateTime::now_utc())
            .await?;
        Ok(())
    }

    pub async fn authenticate(&self, token: &str) -> Result<SessionPrincipal, SessionAuthError> {
        let parsed = Self::parse_token(token).ok_or(SessionAuthError::Invalid)?;
        let record = self
            .repo
            .find_by_prefix(&parsed.prefix)
            .await
            .map_err(|err| SessionAuthError::Unavailable(err.to_string()))?
            .ok_or(SessionAuthError::Invalid)?;

        // Session state is only revealed to holders of the secret.
        let hashed_input = Self::hash_secret(&parsed.secret);
        if record.hashed_secret.ct_eq(&hashed_input).unwrap_u8() == 0 {
            return Err(SessionAuthError::Invalid);
        }

        let now = OffsetDateTime::now_utc();
        if let Some(revoked_at) = record.revoked_at
            && revoked_at <= now
        {
            return Err(SessionAuthError::Revoked);
        }
        if record.expires_at <= now {
            return Err(SessionAuthError::Expired);
        }

        Ok(SessionPrincipal {
            session_id: record.id,
            author_id: record.author_id,
        })
    }

    fn hash_secret(secret: &str) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        hasher.finalize().to_vec()
    }

    fn generate_prefix() -> String {
        Uuid::new_v4().simple().to_string()[..12].to_string()
    }

    fn generate_secret() -> String {
        format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
    }

    fn parse_token(token: &str) -> Option<ParsedToken> {
        let mut parts = token.splitn(3, '_');
        if parts.next()? != TOKEN_PREFIX {
            return None;
        }
        let prefix = parts.next()?;
        let secret = parts.next()?;
        if secret.len() < MIN_SECRET_LEN || prefix.is_empty() {
            return None;
        }
        Some(ParsedToken {
            prefix: prefix.to_string(),
            secret: secret.to_string(),
        })
    }
}

struct ParsedToken {
    prefix: String,
    secret: String,
}
