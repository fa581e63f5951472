//! Multipart form collection shared by the form-based endpoints

use std::collections::HashMap;
use std::path::Path;

use axum::body::Bytes;
use axum::extract::Multipart;

use crate::error::{AppError, Result};

/// An uploaded file field
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub data: Bytes,
}

/// All fields of a multipart request: text fields and file fields by name
#[derive(Debug, Default)]
pub struct FormData {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, UploadedFile>,
}

impl FormData {
    /// Drain a multipart body. Fields with a file name are kept as files.
    pub async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = FormData::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or("").to_string();

            match field.file_name().map(|s| s.to_string()) {
                Some(file_name) => {
                    let data = field.bytes().await?;
                    tracing::debug!(
                        field = %name,
                        file_name = %file_name,
                        bytes = data.len(),
                        "Received file field"
                    );
                    form.files.insert(name, UploadedFile { file_name, data });
                }
                None => {
                    let value = field.text().await?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    /// A non-blank text field, trimmed
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// A required non-blank text field
    pub fn require_text(&self, name: &str) -> Result<&str> {
        self.text(name)
            .ok_or_else(|| AppError::BadRequest(format!("Field '{}' is required", name)))
    }

    /// A required, non-empty file field
    pub fn require_file(&self, name: &str) -> Result<&UploadedFile> {
        self.files
            .get(name)
            .filter(|f| !f.data.is_empty())
            .ok_or_else(|| AppError::BadRequest(format!("File '{}' is required", name)))
    }

    /// An optional integer field; blank counts as absent
    pub fn integer(&self, name: &str) -> Result<Option<i64>> {
        self.text(name)
            .map(|v| {
                v.parse::<i64>().map_err(|_| {
                    AppError::BadRequest(format!("Field '{}' must be an integer", name))
                })
            })
            .transpose()
    }

    /// An optional text field as an owned value
    pub fn owned(&self, name: &str) -> Option<String> {
        self.text(name).map(str::to_string)
    }
}

/// Final path component of a client-supplied file name, safe to join onto a directory
pub fn safe_file_name(name: &str) -> String {
    let base = Path::new(name.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");
    // Windows clients may send backslash paths
    let base = base.rsplit('\\').next().unwrap_or(base);

    if base.is_empty() || base == "." || base == ".." {
        "upload".to_string()
    } else {
        base.to_string()
    }
}
