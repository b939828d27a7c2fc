//! Chunked file upload
//!
//! Files larger than [`CHUNK_SIZE`] are sent as consecutive multipart
//! requests, each carrying a `content-range` header. The server assigns the
//! upload id with the first chunk; later chunks repeat it in `x-appwrite-id`.

use std::collections::BTreeMap;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    client::Client,
    config::MULTIPART_FORM_DATA,
    error::{ClientError, Result},
    params::{ParamValue, Params},
};

/// Size of each uploaded chunk
pub const CHUNK_SIZE: usize = 5 * 1024 * 1024;

/// Id placeholder asking the server to generate one
const UNIQUE_ID: &str = "unique()";

/// Progress reported after every uploaded chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadProgress {
    pub id: String,
    /// Percentage, 0 to 100
    pub progress: f64,
    pub size_uploaded: usize,
    pub chunks_total: u64,
    pub chunks_uploaded: u64,
}

impl Client {
    /// Upload the file in `params[param_name]`, in chunks when it is large.
    ///
    /// If `id_param_name` names a parameter holding an existing id (anything
    /// but `unique()`), the upload resumes after the chunks the server already
    /// has. Returns the JSON of the last response.
    #[allow(clippy::too_many_arguments)]
    pub async fn chunked_upload<F>(
        &self,
        path: &str,
        headers: &BTreeMap<String, String>,
        mut params: Params,
        param_name: &str,
        id_param_name: Option<&str>,
        mut on_progress: F,
        cancel: &CancellationToken,
    ) -> Result<Value>
    where
        F: FnMut(UploadProgress) + Send,
    {
        let file = match params.get(param_name) {
            Some(ParamValue::File(file)) => file.clone(),
            _ => {
                return Err(ClientError::Serialization(format!(
                    "parameter `{param_name}` must be a file"
                )))
            }
        };
        let size = file.len();

        let mut headers = headers.clone();
        headers.insert("content-type".to_string(), MULTIPART_FORM_DATA.to_string());

        if size <= CHUNK_SIZE {
            let result: Value = self
                .call_json(Method::POST, path, &headers, &params, cancel)
                .await?;
            on_progress(progress_from(&result, size, size));
            return Ok(result);
        }

        let mut offset = 0;
        let mut result = None;

        if let Some(id) = existing_id(&params, id_param_name) {
            let lookup = self
                .call_json::<Value>(
                    Method::GET,
                    &format!("{path}/{id}"),
                    &headers,
                    &Params::new(),
                    cancel,
                )
                .await;
            match lookup {
                Ok(current) => {
                    let uploaded = current["chunksUploaded"].as_u64().unwrap_or(0);
                    offset = (uploaded as usize).saturating_mul(CHUNK_SIZE).min(size);
                    debug!("Resuming upload {} at byte {}", id, offset);
                    headers.insert("x-appwrite-id".to_string(), id);
                    result = Some(current);
                }
                Err(ClientError::Http(e)) => {
                    debug!("No resumable upload {} ({}), starting over", id, e.code);
                }
                Err(e) => return Err(e),
            }
        }

        while offset < size {
            let end = (offset + CHUNK_SIZE).min(size);
            params.insert(param_name.to_string(), file.slice(offset, end).into());
            headers.insert(
                "content-range".to_string(),
                format!("bytes {}-{}/{}", offset, end - 1, size),
            );

            let chunk: Value = self
                .call_json(Method::POST, path, &headers, &params, cancel)
                .await?;
            offset = end;

            if let Some(id) = chunk["$id"].as_str() {
                headers.insert("x-appwrite-id".to_string(), id.to_string());
            }
            on_progress(progress_from(&chunk, offset, size));
            result = Some(chunk);
        }

        result.ok_or_else(|| ClientError::Serialization("upload produced no response".to_string()))
    }
}

fn existing_id(params: &Params, id_param_name: Option<&str>) -> Option<String> {
    let name = id_param_name.filter(|n| !n.is_empty())?;
    match params.get(name)? {
        ParamValue::Scalar(Value::String(id)) if id != UNIQUE_ID => Some(id.clone()),
        _ => None,
    }
}

fn progress_from(response: &Value, uploaded: usize, size: usize) -> UploadProgress {
    let progress = if size == 0 {
        100.0
    } else {
        uploaded as f64 / size as f64 * 100.0
    };
    UploadProgress {
        id: response["$id"].as_str().unwrap_or_default().to_string(),
        progress,
        size_uploaded: uploaded,
        chunks_total: response["chunksTotal"].as_u64().unwrap_or(1),
        chunks_uploaded: response["chunksUploaded"].as_u64().unwrap_or(1),
    }
}
