use std::path::{Path as FsPath, PathBuf};

use axum::extract::{Multipart, State};
use backoffice_api::{ApiError, ApiResponse};
use backoffice_dao::IMAGE_DOMAIN_KEY;
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{error, info};

use crate::state::AppState;

const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub name: String,
    pub path: String,
    pub url: String,
}

/// Stored file name: 32 hex chars of `sha256(original name + unix nanos)`
/// plus the original extension.
pub fn stored_name(original: &str, nanos: i64) -> String {
    let digest = Sha256::digest(format!("{original}{nanos}").as_bytes());
    let mut name = hex::encode(digest);
    name.truncate(32);
    match FsPath::new(original).extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() => format!("{name}.{}", ext.to_ascii_lowercase()),
        _ => name,
    }
}

/// `POST /upload/local`: save the multipart `file` field under
/// `<upload dir>/YYYY-MM-DD/`.
pub async fn local(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<ApiResponse<UploadResponse>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?
    {
        if field.name() == Some(FILE_FIELD) {
            let name = field.file_name().unwrap_or_default().to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?;
            upload = Some((name, data));
            break;
        }
    }

    let (original, data) = upload.ok_or_else(|| ApiError::bad_request("missing 'file' field"))?;
    if data.is_empty() {
        return Err(ApiError::bad_request("uploaded file is empty"));
    }
    if data.len() > state.upload.max_bytes {
        return Err(ApiError::bad_request(format!(
            "file exceeds {} bytes",
            state.upload.max_bytes
        )));
    }

    let now = Utc::now();
    let date = now.format("%Y-%m-%d").to_string();
    let file_name = stored_name(&original, now.timestamp_nanos_opt().unwrap_or_default());

    let dir: PathBuf = PathBuf::from(&state.upload.dir).join(&date);
    let write = async {
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&file_name), &data).await
    };
    if let Err(e) = write.await {
        error!(dir = %dir.display(), error = %e, "failed to store upload");
        return Err(ApiError::internal("internal server error"));
    }

    let path = format!("/uploads/{date}/{file_name}");
    let url = state.daos.config.make_path(&path, IMAGE_DOMAIN_KEY).await;
    info!(original = %original, path = %path, bytes = data.len(), "file uploaded");

    Ok(ApiResponse::ok(UploadResponse {
        name: original,
        path,
        url,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_name_keeps_extension() {
        let name = stored_name("avatar.PNG", 42);
        assert_eq!(name.len(), 32 + 4);
        assert!(name.ends_with(".png"));
        assert!(name[..32].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_stored_name_varies_with_time() {
        assert_ne!(stored_name("a.txt", 1), stored_name("a.txt", 2));
        assert_eq!(stored_name("a.txt", 1), stored_name("a.txt", 1));
        assert_eq!(stored_name("README", 1).len(), 32);
    }
}
