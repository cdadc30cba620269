use std::sync::Arc;

use huddle_store::ObjectStorage;
use huddle_types::AuthUser;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Result, SyncError};

pub const DEFAULT_BUCKET: &str = "resources";

/// A stored attachment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadedResource {
    pub path: String,
    pub public_url: String,
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
}

/// Uploads attachments under the signed-in user's folder
pub struct ResourceLibrary {
    storage: Arc<dyn ObjectStorage>,
    bucket: String,
    user: Option<AuthUser>,
}

impl ResourceLibrary {
    pub fn new(storage: Arc<dyn ObjectStorage>, bucket: impl Into<String>, user: Option<AuthUser>) -> Self {
        Self {
            storage,
            bucket: bucket.into(),
            user,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Store `bytes` at `<user_id>/<uuid>-<file_name>`
    pub async fn upload(&self, file_name: &str, bytes: Vec<u8>, content_type: &str) -> Result<UploadedResource> {
        let file_name = sanitize_file_name(file_name);
        if file_name.is_empty() {
            return Err(SyncError::MissingName("file name"));
        }
        let user = self.user.as_ref().ok_or(SyncError::NotAuthenticated)?;

        let path = format!("{}/{}-{}", user.id, Uuid::new_v4(), file_name);
        let size = bytes.len();
        let stored = self
            .storage
            .upload(&self.bucket, &path, bytes, content_type)
            .await
            .map_err(|e| {
                tracing::error!("Error uploading {}: {}", file_name, e);
                SyncError::from(e)
            })?;

        tracing::info!("Uploaded resource {} ({} bytes)", stored, size);
        Ok(UploadedResource {
            public_url: self.storage.public_url(&self.bucket, &stored),
            path: stored,
            file_name,
            content_type: content_type.to_string(),
            size,
        })
    }

    pub fn public_url(&self, path: &str) -> String {
        self.storage.public_url(&self.bucket, path)
    }
}

/// Keep the object key one level deep under the user folder
fn sanitize_file_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_separators() {
        assert_eq!(sanitize_file_name(" ../notes/q3.pdf "), ".._notes_q3.pdf");
        assert_eq!(sanitize_file_name("   "), "");
    }
}
