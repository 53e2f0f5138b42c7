//! Document → plain text.
//!
//! Plain text is decoded leniently. PDFs go through the embedded text layer first and
//! fall back to OCR (`pdftoppm` + `tesseract`) when the layer is empty, which is the
//! usual case for scanned resumes. Word documents are converted by LibreOffice in a
//! scratch directory. External tools are looked up on `PATH`; a missing tool is
//! reported as such instead of a generic failure.

use std::path::Path;
use std::process::Output;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// File extensions accepted for upload, lower-case without the dot.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["pdf", "docx", "doc", "txt"];

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file format: '{0}'")]
    UnsupportedFormat(String),

    #[error("Required tool '{0}' is not installed")]
    ToolMissing(&'static str),

    #[error("Conversion failed: {0}")]
    Conversion(String),

    #[error("PDF parse error: {0}")]
    Pdf(String),

    #[error("Extraction I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Lower-cased extension of `file_name`, if it has one.
pub fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Checks the extension against `SUPPORTED_EXTENSIONS`.
pub fn ensure_supported(file_name: &str) -> Result<(), ExtractionError> {
    match extension_of(file_name) {
        Some(ext) if SUPPORTED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        Some(ext) => Err(ExtractionError::UnsupportedFormat(format!(".{ext}"))),
        None => Err(ExtractionError::UnsupportedFormat(file_name.to_string())),
    }
}

#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, file_name: &str, bytes: Bytes) -> Result<String, ExtractionError>;
}

/// Extractor backed by `pdf-extract` and the command-line tools above.
#[derive(Debug, Clone)]
pub struct DocumentExtractor {
    pub ocr_dpi: u32,
}

impl Default for DocumentExtractor {
    fn default() -> Self {
        Self { ocr_dpi: 300 }
    }
}

#[async_trait]
impl TextExtractor for DocumentExtractor {
    async fn extract(&self, file_name: &str, bytes: Bytes) -> Result<String, ExtractionError> {
        ensure_supported(file_name)?;
        let ext = extension_of(file_name).unwrap_or_default();

        let text = match ext.as_str() {
            "txt" => String::from_utf8_lossy(&bytes).into_owned(),
            "pdf" => self.extract_pdf(bytes).await?,
            "doc" | "docx" => convert_office(&ext, &bytes).await?,
            other => return Err(ExtractionError::UnsupportedFormat(format!(".{other}"))),
        };

        if text.trim().is_empty() {
            warn!("No text extracted from {file_name}");
        } else {
            debug!("Extracted {} chars from {file_name}", text.len());
        }
        Ok(text)
    }
}

impl DocumentExtractor {
    async fn extract_pdf(&self, bytes: Bytes) -> Result<String, ExtractionError> {
        let layer = text_layer(bytes.clone()).await;
        match layer {
            Ok(text) if !text.trim().is_empty() => return Ok(text),
            Ok(_) => info!("PDF has no text layer; running OCR"),
            Err(e) => warn!("PDF text layer unreadable ({e}); running OCR"),
        }
        self.ocr_pdf(&bytes).await
    }

    /// Rasterizes every page and runs tesseract over each, in page order.
    async fn ocr_pdf(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let scratch = tempfile::Builder::new().prefix("ranker-ocr-").tempdir()?;
        let input = scratch.path().join("input.pdf");
        tokio::fs::write(&input, bytes).await?;

        let page_prefix = scratch.path().join("page");
        let mut rasterize = Command::new("pdftoppm");
        rasterize
            .arg("-r")
            .arg(self.ocr_dpi.to_string())
            .arg("-png")
            .arg(&input)
            .arg(&page_prefix);
        run_tool("pdftoppm", &mut rasterize).await?;

        let mut pages = Vec::new();
        let mut entries = tokio::fs::read_dir(scratch.path()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "png") {
                pages.push(path);
            }
        }
        // pdftoppm zero-pads page numbers to a fixed width, so name order is page order.
        pages.sort();

        let mut text = String::new();
        for page in &pages {
            let mut ocr = Command::new("tesseract");
            ocr.arg(page).arg("stdout");
            let output = run_tool("tesseract", &mut ocr).await?;
            text.push_str(&String::from_utf8_lossy(&output.stdout));
            text.push('\n');
        }
        info!("OCR extracted {} pages", pages.len());
        Ok(text)
    }
}

/// Reads the embedded text layer. The parser can panic on malformed input, so it runs
/// on the blocking pool where a panic surfaces as a join error.
async fn text_layer(bytes: Bytes) -> Result<String, ExtractionError> {
    tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| ExtractionError::Pdf(format!("parser aborted: {e}")))?
        .map_err(|e| ExtractionError::Pdf(e.to_string()))
}

/// Converts a Word document to UTF-8 text with `soffice --convert-to txt`.
async fn convert_office(ext: &str, bytes: &[u8]) -> Result<String, ExtractionError> {
    let scratch = tempfile::Builder::new().prefix("ranker-doc-").tempdir()?;
    let input = scratch.path().join(format!("input.{ext}"));
    tokio::fs::write(&input, bytes).await?;

    let mut convert = Command::new("soffice");
    convert
        .arg("--headless")
        .arg("--convert-to")
        .arg("txt:Text (encoded):UTF8")
        .arg("--outdir")
        .arg(scratch.path())
        .arg(&input);
    run_tool("soffice", &mut convert).await?;

    let output = scratch.path().join("input.txt");
    match tokio::fs::read(&output).await {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ExtractionError::Conversion(
            format!("soffice produced no output for .{ext} document"),
        )),
        Err(e) => Err(e.into()),
    }
}

async fn run_tool(tool: &'static str, command: &mut Command) -> Result<Output, ExtractionError> {
    let output = command.kill_on_drop(true).output().await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ExtractionError::ToolMissing(tool)
        } else {
            ExtractionError::Io(e)
        }
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExtractionError::Conversion(format!(
            "{tool} exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_is_case_insensitive() {
        assert_eq!(extension_of("CV.PDF").as_deref(), Some("pdf"));
        assert_eq!(extension_of("resume.final.Docx").as_deref(), Some("docx"));
        assert_eq!(extension_of("README"), None);
    }

    #[test]
    fn test_ensure_supported() {
        assert!(ensure_supported("a.pdf").is_ok());
        assert!(ensure_supported("a.TXT").is_ok());
        assert!(ensure_supported("a.doc").is_ok());
        assert!(matches!(
            ensure_supported("a.png"),
            Err(ExtractionError::UnsupportedFormat(ref e)) if e == ".png"
        ));
        assert!(ensure_supported("no_extension").is_err());
    }

    #[tokio::test]
    async fn test_txt_is_decoded_lossily() {
        let extractor = DocumentExtractor::default();
        let bytes = Bytes::from_static(b"Rust engineer \xff with Kafka");

        let text = extractor.extract("cv.txt", bytes).await.unwrap();
        assert!(text.starts_with("Rust engineer "));
        assert!(text.ends_with(" with Kafka"));
    }

    #[tokio::test]
    async fn test_unsupported_extension_is_rejected() {
        let extractor = DocumentExtractor::default();
        let err = extractor
            .extract("photo.jpg", Bytes::from_static(b"\xff\xd8"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn test_missing_tool_is_reported_by_name() {
        let mut command = Command::new("definitely-not-an-installed-tool-7f3a");
        let err = run_tool("pdftoppm", &mut command).await.unwrap_err();
        assert!(matches!(err, ExtractionError::ToolMissing("pdftoppm")));
    }

    #[tokio::test]
    async fn test_garbage_pdf_text_layer_is_an_error_not_a_panic() {
        let result = text_layer(Bytes::from_static(b"%PDF-1.4 not really a pdf")).await;
        assert!(matches!(result, Err(ExtractionError::Pdf(_))));
    }
}
