// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Text extraction from uploaded files.
//!
//! Plain text is returned as uploaded. PDFs go through `pdf-extract` on a
//! blocking thread, images through the gateway's vision model.

use crate::error::AppError;
use crate::services::ai_gateway::AiGatewayClient;

/// Pages of a PDF that are read.
pub const MAX_PDF_PAGES: usize = 50;

/// Shortest useful extraction result, in characters.
pub const MIN_TEXT_CHARS: usize = 10;

pub const NO_TEXT_MESSAGE: &str = "No meaningful text could be extracted from the file.";
pub const PDF_PARSE_MESSAGE: &str =
    "Failed to parse PDF. The file might be corrupted or password-protected.";
pub const OFFICE_MESSAGE: &str = "Word and Excel files are not yet supported. Please convert your document to PDF or TXT format and try again.";
pub const UNSUPPORTED_MESSAGE: &str = "Unsupported file type. Please upload PDF, TXT or image files.";

const OFFICE_TYPES: [&str; 4] = [
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

/// How an upload is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    PlainText,
    Pdf,
    /// Image with its MIME type
    Image(&'static str),
    Office,
    Unsupported,
}

impl UploadKind {
    /// Classify by MIME type, falling back to the file extension when the
    /// type is missing or generic.
    pub fn classify(content_type: Option<&str>, filename: Option<&str>) -> Self {
        let mime = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .filter(|ct| !ct.is_empty() && ct != "application/octet-stream")
            .or_else(|| filename.and_then(mime_from_extension).map(str::to_string));

        match mime.as_deref() {
            Some("text/plain") => UploadKind::PlainText,
            Some("application/pdf") => UploadKind::Pdf,
            Some("image/png") => UploadKind::Image("image/png"),
            Some("image/jpeg") | Some("image/jpg") => UploadKind::Image("image/jpeg"),
            Some("image/webp") => UploadKind::Image("image/webp"),
            Some("image/gif") => UploadKind::Image("image/gif"),
            Some(m) if OFFICE_TYPES.contains(&m) => UploadKind::Office,
            _ => UploadKind::Unsupported,
        }
    }
}

fn mime_from_extension(filename: &str) -> Option<&'static str> {
    let (_, ext) = filename.rsplit_once('.')?;
    let mime = match ext.to_ascii_lowercase().as_str() {
        "txt" | "text" | "md" => "text/plain",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => return None,
    };
    Some(mime)
}

/// Collapse runs of whitespace to single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn ensure_meaningful(text: String) -> Result<String, AppError> {
    if text.trim().chars().count() < MIN_TEXT_CHARS {
        return Err(AppError::BadRequest(NO_TEXT_MESSAGE.to_string()));
    }
    Ok(text)
}

/// Extracts text from uploads.
#[derive(Clone)]
pub struct TextExtractor {
    gateway: AiGatewayClient,
}

impl TextExtractor {
    pub fn new(gateway: AiGatewayClient) -> Self {
        Self { gateway }
    }

    /// Extract text from an uploaded file.
    pub async fn extract(
        &self,
        content_type: Option<&str>,
        filename: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<String, AppError> {
        let kind = UploadKind::classify(content_type, filename);
        tracing::info!(?kind, size = bytes.len(), "Extracting text from upload");

        let text = match kind {
            UploadKind::PlainText => String::from_utf8(bytes).map_err(|_| {
                AppError::BadRequest("Text files must be UTF-8 encoded.".to_string())
            })?,
            UploadKind::Pdf => collapse_whitespace(&extract_pdf_text(bytes).await?),
            UploadKind::Image(mime) => {
                collapse_whitespace(&self.gateway.extract_image_text(mime, &bytes).await?)
            }
            UploadKind::Office => return Err(AppError::BadRequest(OFFICE_MESSAGE.to_string())),
            UploadKind::Unsupported => {
                return Err(AppError::UnsupportedMediaType(
                    UNSUPPORTED_MESSAGE.to_string(),
                ))
            }
        };

        ensure_meaningful(text)
    }
}

/// Text of the first [`MAX_PDF_PAGES`] pages.
///
/// `pdf-extract` can panic on malformed input, so it runs on a blocking
/// task; a panic surfaces as a join error and is reported like any other
/// parse failure.
pub async fn extract_pdf_text(bytes: Vec<u8>) -> Result<String, AppError> {
    let result =
        tokio::task::spawn_blocking(move || extract_first_pages(&bytes, MAX_PDF_PAGES)).await;

    match result {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "PDF parsing failed");
            Err(AppError::BadRequest(PDF_PARSE_MESSAGE.to_string()))
        }
        Err(e) => {
            tracing::warn!(error = %e, "PDF extractor panicked");
            Err(AppError::BadRequest(PDF_PARSE_MESSAGE.to_string()))
        }
    }
}

/// Extract page by page, stopping after `max` pages.
fn extract_first_pages(bytes: &[u8], max: usize) -> Result<String, pdf_extract::OutputError> {
    let mut doc = pdf_extract::Document::load_mem(bytes)?;
    if doc.is_encrypted() {
        // Owner-password-only PDFs open with an empty user password
        doc.decrypt("")?;
    }

    let mut pages = Vec::new();
    for &page_num in doc.get_pages().keys().take(max) {
        let mut text = String::new();
        {
            let mut output = pdf_extract::PlainTextOutput::new(&mut text);
            pdf_extract::output_doc_page(&doc, &mut output, page_num)?;
        }
        pages.push(text);
    }

    tracing::debug!(pages = pages.len(), "PDF pages extracted");
    Ok(pages.join("\n\n"))
}
