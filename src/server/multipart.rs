//! Multipart form collection
//!
//! warp exposes multipart bodies as a stream of parts; handlers want the
//! whole form up front, so this module drains the stream into a small
//! field list with helpers for the patterns the endpoints share (one file,
//! repeated files, optional text fields).

use crate::error::{RemovalError, Result};
use bytes::BufMut;
use futures_util::TryStreamExt;
use warp::multipart::{FormData, Part};

/// One decoded multipart field.
#[derive(Debug)]
pub struct FormField {
    /// Field name from the content-disposition header
    pub name: String,
    /// Client-supplied file name, when the field is a file upload
    pub filename: Option<String>,
    /// Raw field bytes
    pub data: Vec<u8>,
}

/// Collected multipart form.
#[derive(Debug, Default)]
pub struct CollectedForm {
    fields: Vec<FormField>,
}

impl CollectedForm {
    /// Drain a warp multipart stream into memory.
    ///
    /// # Errors
    /// - `InvalidRequest` if the body stream cannot be read
    pub async fn read(mut form: FormData) -> Result<Self> {
        let mut fields = Vec::new();
        while let Some(part) = form
            .try_next()
            .await
            .map_err(|e| RemovalError::invalid_request(format!("multipart read failed: {e}")))?
        {
            fields.push(Self::read_part(part).await?);
        }
        Ok(Self { fields })
    }

    async fn read_part(part: Part) -> Result<FormField> {
        let name = part.name().to_string();
        let filename = part.filename().map(ToString::to_string);
        let data = part
            .stream()
            .try_fold(Vec::new(), |mut acc, buf| {
                acc.put(buf);
                async move { Ok(acc) }
            })
            .await
            .map_err(|e| {
                RemovalError::invalid_request(format!("failed to read field '{name}': {e}"))
            })?;
        Ok(FormField {
            name,
            filename,
            data,
        })
    }

    /// First field with the given name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// All fields with the given name, in submission order.
    #[must_use]
    pub fn fields(&self, name: &str) -> Vec<&FormField> {
        self.fields.iter().filter(|f| f.name == name).collect()
    }

    /// Required file field.
    ///
    /// # Errors
    /// - `InvalidRequest` if the field is missing or empty
    pub fn require_file(&self, name: &str) -> Result<&FormField> {
        self.field(name)
            .filter(|f| !f.data.is_empty())
            .ok_or_else(|| {
                RemovalError::invalid_request(format!("missing required file field '{name}'"))
            })
    }

    /// Optional text field; empty strings count as absent.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<String> {
        self.field(name)
            .map(|f| String::from_utf8_lossy(&f.data).trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Optional file field; empty uploads count as absent.
    #[must_use]
    pub fn file(&self, name: &str) -> Option<&FormField> {
        self.field(name).filter(|f| !f.data.is_empty())
    }
}

impl FormField {
    /// File name stem for output naming, defaulting to `image`.
    #[must_use]
    pub fn stem(&self) -> String {
        self.filename
            .as_deref()
            .and_then(|name| {
                std::path::Path::new(name)
                    .file_stem()
                    .and_then(std::ffi::OsStr::to_str)
                    .map(ToString::to_string)
            })
            .unwrap_or_else(|| "image".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form_with(fields: Vec<FormField>) -> CollectedForm {
        CollectedForm { fields }
    }

    fn text_field(name: &str, value: &str) -> FormField {
        FormField {
            name: name.to_string(),
            filename: None,
            data: value.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_empty_text_counts_as_absent() {
        let form = form_with(vec![text_field("bg_color", "  ")]);
        assert!(form.text("bg_color").is_none());

        let form = form_with(vec![text_field("bg_color", "#fff000")]);
        assert_eq!(form.text("bg_color").as_deref(), Some("#fff000"));
    }

    #[test]
    fn test_require_file() {
        let form = form_with(vec![]);
        assert!(matches!(
            form.require_file("file"),
            Err(RemovalError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_repeated_fields_keep_order() {
        let form = form_with(vec![
            text_field("files", "a"),
            text_field("files", "b"),
            text_field("model", "rembg"),
        ]);
        let files = form.fields("files");
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].data, b"a");
    }

    #[test]
    fn test_stem() {
        let field = FormField {
            name: "file".to_string(),
            filename: Some("holiday photo.final.PNG".to_string()),
            data: vec![1],
        };
        assert_eq!(field.stem(), "holiday photo.final");

        let field = FormField {
            name: "file".to_string(),
            filename: None,
            data: vec![1],
        };
        assert_eq!(field.stem(), "image");
    }
}
