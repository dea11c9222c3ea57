//! Export dispatcher: filenames, downloads, PDF fallback.
//!
//! Raster payloads are downloaded straight from their data URL. PDF
//! payloads are wrapped in a temporary object URL that must outlive the
//! download, so the dispatcher keeps a ledger of pending URLs and
//! releases each one exactly once, when the host reports the matching
//! download as complete.

use chrono::{Local, NaiveDateTime};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::capture::data_url::{self, DataUrlError};
use crate::capture::{ExportFormat, ImagePdfWriter, PdfError, PdfWriter};
use crate::host::{DownloadDelta, DownloadId, DownloadRequest, Downloads, HostError, Notice, Notifications};

/// `screenshot_<YYYYMMDD>_<HHMMSS>` for the given local time.
pub fn filename_stem(at: &NaiveDateTime) -> String {
    format!("screenshot_{}", at.format("%Y%m%d_%H%M%S"))
}

pub fn screenshot_filename(at: &NaiveDateTime, format: ExportFormat) -> String {
    format!("{}.{}", filename_stem(at), format.extension())
}

/// An encoded crop handed over by a content script.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    /// Data URL of the transfer raster (PNG for PDF exports).
    pub image_data: String,
    pub format: ExportFormat,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub download: DownloadId,
    pub filename: String,
    /// Format actually written, after any fallback.
    pub format: ExportFormat,
    pub downgraded: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Screenshot payload is invalid: {0}")]
    Payload(#[from] DataUrlError),

    #[error("Download failed: {0}")]
    Download(#[from] HostError),
}

/// Pending object URLs keyed by the download that uses them.
#[derive(Debug, Default)]
struct ObjectUrlLedger {
    pending: HashMap<DownloadId, String>,
}

impl ObjectUrlLedger {
    fn register(&mut self, id: DownloadId, url: String) {
        if let Some(previous) = self.pending.insert(id, url) {
            log::warn!("[EXPORT] Download {:?} re-registered; dropping {}", id, previous);
        }
    }

    fn take(&mut self, id: DownloadId) -> Option<String> {
        self.pending.remove(&id)
    }
}

pub struct ExportDispatcher<W: PdfWriter = ImagePdfWriter> {
    pdf_writer: W,
    save_as: bool,
    ledger: Mutex<ObjectUrlLedger>,
}

impl Default for ExportDispatcher<ImagePdfWriter> {
    fn default() -> Self {
        Self::new(ImagePdfWriter::default(), true)
    }
}

impl<W: PdfWriter> ExportDispatcher<W> {
    pub fn new(pdf_writer: W, save_as: bool) -> Self {
        Self {
            pdf_writer,
            save_as,
            ledger: Mutex::new(ObjectUrlLedger::default()),
        }
    }

    /// Export using the current local time for the filename.
    pub async fn dispatch<H>(&self, host: &H, request: ExportRequest) -> Result<ExportOutcome, ExportError>
    where
        H: Downloads + Notifications,
    {
        self.dispatch_at(host, request, Local::now().naive_local()).await
    }

    pub async fn dispatch_at<H>(
        &self,
        host: &H,
        request: ExportRequest,
        at: NaiveDateTime,
    ) -> Result<ExportOutcome, ExportError>
    where
        H: Downloads + Notifications,
    {
        if request.format != ExportFormat::Pdf {
            return self.save_data_url(host, &request.image_data, request.format, &at, false).await;
        }

        let payload = data_url::decode(&request.image_data)?;
        match self.pdf_writer.write_pdf(&payload.bytes, request.width, request.height) {
            Ok(pdf) => self.save_pdf(host, pdf, &at).await,
            Err(e) => self.fall_back_to_png(host, &request, &at, e).await,
        }
    }

    /// Release the object URL of a finished PDF download.
    ///
    /// Returns true if this delta released a URL. An interrupted download
    /// keeps its URL only while the host says it can be resumed.
    pub fn on_download_changed<H: Downloads>(&self, host: &H, delta: DownloadDelta) -> bool {
        if !delta.is_final() {
            return false;
        }

        let released = self.ledger().take(delta.id);
        match released {
            Some(url) => {
                host.revoke_object_url(&url);
                log::debug!("[EXPORT] Released object URL for download {:?}", delta.id);
                true
            }
            None => false,
        }
    }

    /// Number of object URLs still waiting for their download to finish.
    pub fn pending_releases(&self) -> usize {
        self.ledger().pending.len()
    }

    async fn save_data_url<H>(
        &self,
        host: &H,
        url: &str,
        format: ExportFormat,
        at: &NaiveDateTime,
        downgraded: bool,
    ) -> Result<ExportOutcome, ExportError>
    where
        H: Downloads + Notifications,
    {
        let filename = screenshot_filename(at, format);
        let download = host
            .download(DownloadRequest {
                url: url.to_string(),
                filename: filename.clone(),
                save_as: self.save_as,
            })
            .await?;

        log::info!("[EXPORT] Saved {} (download {:?})", filename, download);

        Ok(ExportOutcome {
            download,
            filename,
            format,
            downgraded,
        })
    }

    async fn save_pdf<H>(&self, host: &H, pdf: Vec<u8>, at: &NaiveDateTime) -> Result<ExportOutcome, ExportError>
    where
        H: Downloads + Notifications,
    {
        let size = pdf.len();
        let url = host.create_object_url(pdf, ExportFormat::Pdf.mime());
        let filename = screenshot_filename(at, ExportFormat::Pdf);

        let download = match host
            .download(DownloadRequest {
                url: url.clone(),
                filename: filename.clone(),
                save_as: self.save_as,
            })
            .await
        {
            Ok(id) => id,
            Err(e) => {
                // Nothing is reading the URL, release it now
                host.revoke_object_url(&url);
                return Err(e.into());
            }
        };

        self.ledger().register(download, url);
        log::info!("[EXPORT] Saved {} ({} bytes, download {:?})", filename, size, download);

        Ok(ExportOutcome {
            download,
            filename,
            format: ExportFormat::Pdf,
            downgraded: false,
        })
    }

    async fn fall_back_to_png<H>(
        &self,
        host: &H,
        request: &ExportRequest,
        at: &NaiveDateTime,
        cause: PdfError,
    ) -> Result<ExportOutcome, ExportError>
    where
        H: Downloads + Notifications,
    {
        log::warn!("[EXPORT] PDF generation failed, saving PNG instead: {}", cause);
        host.notify(&Notice::new(
            "Saved as PNG",
            format!("PDF export failed ({}). Your screenshot was saved as PNG instead.", cause),
        ));
        self.save_data_url(host, &request.image_data, ExportFormat::Png, at, true)
            .await
    }

    fn ledger(&self) -> MutexGuard<'_, ObjectUrlLedger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
