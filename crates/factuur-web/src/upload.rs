use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use std::path::Path;

use factuur_core::is_supported_extension;

use crate::error::ApiError;

/// An uploaded document with its data and metadata.
pub struct UploadedFile {
    pub filename: String,
    /// Lower-cased, with the leading dot (e.g. `.pdf`).
    pub extension: String,
    pub data: Vec<u8>,
}

/// Parsed form fields from the multipart upload.
pub struct FormFields {
    pub file: UploadedFile,
    pub notes: String,
}

/// Parse the extract form. The extension is checked before the file body is
/// read; the body is read in chunks and rejected once it exceeds `max_bytes`.
pub async fn parse_multipart(
    mut multipart: Multipart,
    max_bytes: usize,
) -> Result<FormFields, ApiError> {
    let mut file: Option<UploadedFile> = None;
    let mut notes = String::new();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Failed to read form field", e))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let filename = sanitize_filename(field.file_name().unwrap_or(""));
                let extension = extension_of(&filename);
                if !is_supported_extension(&extension) {
                    let shown = if extension.is_empty() {
                        "unknown"
                    } else {
                        extension.as_str()
                    };
                    return Err(ApiError::bad_request(format!(
                        "Unsupported file type: {}",
                        shown
                    )));
                }

                let mut data = Vec::new();
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| multipart_error("Failed to read file data", e))?
                {
                    if data.len() + chunk.len() > max_bytes {
                        return Err(ApiError::new(
                            StatusCode::PAYLOAD_TOO_LARGE,
                            format!("File too large (max {} MiB)", max_bytes / (1024 * 1024)),
                        ));
                    }
                    data.extend_from_slice(&chunk);
                }

                file = Some(UploadedFile {
                    filename,
                    extension,
                    data,
                });
            }
            "notes" => {
                notes = field
                    .text()
                    .await
                    .map_err(|e| multipart_error("Failed to read notes", e))?;
            }
            _ => {
                // Unknown fields are drained and ignored.
                field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error("Failed to read form field", e))?;
            }
        }
    }

    let file = file.ok_or_else(|| ApiError::bad_request("No file uploaded"))?;

    Ok(FormFields { file, notes })
}

fn multipart_error(context: &str, e: MultipartError) -> ApiError {
    ApiError::new(e.status(), format!("{}: {}", context, e.body_text()))
}

/// Reduce a client-supplied name to a safe ASCII base name.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = base
        .trim()
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();
    cleaned.trim_start_matches(['.', '_']).to_string()
}

/// Lower-cased extension with its leading dot, or `""`.
fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_directories_and_unsafe_chars() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\scans\\factuur 03.PDF"), "factuur_03.PDF");
        assert_eq!(sanitize_filename(".hidden.pdf"), "hidden.pdf");
        assert_eq!(sanitize_filename("Rechnung März.pdf"), "Rechnung_Mrz.pdf");
        assert_eq!(sanitize_filename(""), "");
    }

    #[test]
    fn extension_is_lowercased_with_dot() {
        assert_eq!(extension_of("scan.JPG"), ".jpg");
        assert_eq!(extension_of("factuur.tar.pdf"), ".pdf");
        assert_eq!(extension_of("README"), "");
        assert_eq!(extension_of(""), "");
    }
}
