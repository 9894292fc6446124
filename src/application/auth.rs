use async_trait::async_trait;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::domain::entities::QuestionAggregate;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    Missing,
    #[error("invalid bearer token")]
    Invalid,
    #[error("caller is not the author of question {question_id}")]
    NotAuthor { question_id: i32 },
}

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub user_name: String,
}

impl Principal {
    /// Authorization policy for editing or deleting a question.
    pub fn require_author(&self, question: &QuestionAggregate) -> Result<(), AuthError> {
        if question.is_authored_by(&self.user_id) {
            Ok(())
        } else {
            Err(AuthError::NotAuthor {
                question_id: question.question_id,
            })
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<Principal, AuthError>;
}

/// Configured credential: a principal and the SHA-256 digest of its token.
#[derive(Debug, Clone)]
pub struct TokenCredential {
    pub user_id: String,
    pub user_name: String,
    pub token_sha256: [u8; 32],
}

/// Identity provider backed by a fixed list of hashed bearer tokens.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenProvider {
    credentials: Vec<TokenCredential>,
}

impl StaticTokenProvider {
    pub fn new(credentials: Vec<TokenCredential>) -> Self {
        Self { credentials }
    }

    pub fn hash_token(token: &str) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&hasher.finalize());
        digest
    }

    pub fn hash_token_hex(token: &str) -> String {
        hex::encode(Self::hash_token(token))
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenProvider {
    async fn authenticate(&self, token: &str) -> Result<Principal, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::Missing);
        }

        let presented = Self::hash_token(token);
        // Compare against every credential so timing does not reveal position.
        let mut matched: Option<&TokenCredential> = None;
        for credential in &self.credentials {
            if bool::from(credential.token_sha256[..].ct_eq(&presented[..])) {
                matched = Some(credential);
            }
        }

        matched
            .map(|credential| Principal {
                user_id: credential.user_id.clone(),
                user_name: credential.user_name.clone(),
            })
            .ok_or(AuthError::Invalid)
    }
}
