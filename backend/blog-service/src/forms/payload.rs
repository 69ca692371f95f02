/// Form body decoding
///
/// Browsers submit forms either url-encoded or as `multipart/form-data`
/// (needed for file uploads). Both are reduced to the same `FormPayload`.
use actix_multipart::Multipart;
use actix_web::{
    dev::{Payload, UrlEncoded},
    http::header::{self, ContentDisposition},
    FromRequest, HttpMessage, HttpRequest,
};
use futures_util::future::LocalBoxFuture;
use futures_util::StreamExt;
use std::collections::HashMap;

use crate::error::AppError;

/// Largest accepted uploaded file
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Largest url-encoded body, and the budget for the text parts of a multipart body
pub const MAX_FORM_BYTES: usize = 2_621_440;

/// Largest multipart body, summed over every part
pub const MAX_MULTIPART_BYTES: usize = MAX_UPLOAD_BYTES + MAX_FORM_BYTES;

/// A file part of a multipart form
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Decoded form fields and uploaded files
#[derive(Debug, Clone, Default)]
pub struct FormPayload {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl FormPayload {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut payload = Self::default();
        for (name, value) in pairs {
            // first occurrence wins
            payload.fields.entry(name).or_insert(value);
        }
        payload
    }

    pub fn with_file(mut self, name: impl Into<String>, file: UploadedFile) -> Self {
        self.files.insert(name.into(), file);
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Field value or the empty string
    pub fn text(&self, name: &str) -> String {
        self.field(name).unwrap_or_default().to_string()
    }

    /// Checkbox semantics: present and not an explicit false value
    pub fn flag(&self, name: &str) -> bool {
        match self.field(name) {
            Some(value) => !matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "" | "0" | "false" | "off"
            ),
            None => false,
        }
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }

    async fn from_multipart(mut multipart: Multipart, limit: usize) -> Result<Self, AppError> {
        let mut payload = Self::default();
        let mut total = 0usize;

        while let Some(item) = multipart.next().await {
            let mut field = item.map_err(|e| AppError::BadRequest(e.to_string()))?;

            let disposition = field
                .headers()
                .get(header::CONTENT_DISPOSITION)
                .and_then(|value| ContentDisposition::from_raw(value).ok());
            let Some(disposition) = disposition else {
                continue;
            };
            let Some(name) = disposition.get_name().map(str::to_string) else {
                continue;
            };
            let filename = disposition.get_filename().map(str::to_string);

            let mut bytes = Vec::new();
            while let Some(chunk) = field.next().await {
                let chunk = chunk.map_err(|e| AppError::BadRequest(e.to_string()))?;
                if bytes.len() + chunk.len() > MAX_UPLOAD_BYTES {
                    return Err(AppError::BadRequest(format!(
                        "field '{}' exceeds {} bytes",
                        name, MAX_UPLOAD_BYTES
                    )));
                }
                total += chunk.len();
                if total > limit {
                    return Err(AppError::BadRequest(format!(
                        "form body exceeds {} bytes",
                        limit
                    )));
                }
                bytes.extend_from_slice(&chunk);
            }

            match filename {
                // an unselected file input arrives as an empty part
                Some(filename) if filename.is_empty() && bytes.is_empty() => {}
                Some(filename) => {
                    payload.files.insert(name, UploadedFile { filename, bytes });
                }
                None => {
                    let value = String::from_utf8(bytes).map_err(|_| {
                        AppError::BadRequest(format!("field '{}' is not valid UTF-8", name))
                    })?;
                    payload.fields.entry(name).or_insert(value);
                }
            }
        }

        Ok(payload)
    }
}

impl FromRequest for FormPayload {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let content_type = req.content_type().to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::new(req.headers(), payload.take());
            Box::pin(Self::from_multipart(multipart, MAX_MULTIPART_BYTES))
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            // FormConfig would default to 16 KiB
            let form =
                UrlEncoded::<Vec<(String, String)>>::new(req, payload).limit(MAX_FORM_BYTES);
            Box::pin(async move {
                let pairs = form
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                Ok(FormPayload::from_pairs(pairs))
            })
        } else {
            Box::pin(async { Ok(FormPayload::default()) })
        }
    }
}
