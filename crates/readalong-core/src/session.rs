use crate::error::ReadAlongError;
use crate::extraction::ocr::OcrFallback;
use crate::extraction::PdfExtractor;
use crate::highlight::HighlightPort;
use crate::model::{Document, ReaderSettings};
use crate::scheduler::{Playback, PlaybackHandle, PlaybackReport, PlaybackState, StopSignal};
use crate::speech::SpeechPort;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// Owns the loaded document and at most one active playback. Starting,
/// opening another document and closing all cancel the active run first.
pub struct ReaderSession {
    document: Option<Arc<Document>>,
    playback: Option<PlaybackHandle>,
    settings: watch::Sender<ReaderSettings>,
    speech: Arc<dyn SpeechPort>,
    highlight: Arc<dyn HighlightPort>,
}

impl ReaderSession {
    pub fn new(
        settings: ReaderSettings,
        speech: Arc<dyn SpeechPort>,
        highlight: Arc<dyn HighlightPort>,
    ) -> Self {
        let (settings, _) = watch::channel(settings.clamped());
        ReaderSession {
            document: None,
            playback: None,
            settings,
            speech,
            highlight,
        }
    }

    pub fn document(&self) -> Option<&Arc<Document>> {
        self.document.as_ref()
    }

    pub fn settings(&self) -> ReaderSettings {
        *self.settings.borrow()
    }

    /// Replace the settings. A running playback picks the change up at its
    /// next unit; the per-word delay stays as computed at run start.
    pub fn update_settings(&self, settings: ReaderSettings) {
        self.settings.send_replace(settings.clamped());
    }

    pub fn state(&self) -> PlaybackState {
        match &self.playback {
            Some(handle) if !handle.is_finished() => handle.state(),
            _ => PlaybackState::Idle,
        }
    }

    /// Extract a document off the async runtime and make it current.
    ///
    /// Any active playback is cancelled and the previous document dropped
    /// before extraction starts. On failure no document is loaded.
    pub async fn open(
        &mut self,
        pdf_bytes: Vec<u8>,
        extractor: Arc<dyn PdfExtractor>,
        ocr: Option<Arc<OcrFallback>>,
    ) -> Result<Arc<Document>, ReadAlongError> {
        self.close().await;

        let document = tokio::task::spawn_blocking(move || {
            crate::analyze_pdf(&pdf_bytes, extractor.as_ref(), ocr.as_deref())
        })
        .await
        .map_err(|e| ReadAlongError::Extraction(format!("extraction task failed: {e}")))??;

        Ok(self.publish(document))
    }

    /// Make an already analyzed document current.
    pub async fn load(&mut self, document: Document) -> Arc<Document> {
        self.close().await;
        self.publish(document)
    }

    fn publish(&mut self, document: Document) -> Arc<Document> {
        info!(
            pages = document.page_count,
            sentences = document.sentences.len(),
            word_boxes = document.word_boxes.len(),
            source = %document.geometry_source,
            "document loaded"
        );
        let document = Arc::new(document);
        self.document = Some(Arc::clone(&document));
        document
    }

    /// Stop playback and drop the current document.
    pub async fn close(&mut self) {
        self.stop().await;
        self.document = None;
    }

    /// Start reading from the first sentence, cancelling any active run.
    pub async fn start(&mut self) -> Result<StopSignal, ReadAlongError> {
        let document = self.document.clone().ok_or(ReadAlongError::NoDocument)?;
        self.stop().await;

        let handle = Playback::new(
            document,
            self.settings.subscribe(),
            Arc::clone(&self.speech),
            Arc::clone(&self.highlight),
        )
        .start();
        let stop = handle.stop_signal();
        self.playback = Some(handle);
        Ok(stop)
    }

    /// Cancel the active run and wait for it to wind down.
    pub async fn stop(&mut self) -> Option<PlaybackReport> {
        let handle = self.playback.take()?;
        match handle.cancel().await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(error = %e, "playback ended abnormally");
                None
            }
        }
    }

    /// Wait for the active run to end by itself.
    pub async fn wait(&mut self) -> Option<Result<PlaybackReport, ReadAlongError>> {
        let handle = self.playback.take()?;
        Some(handle.wait().await)
    }
}
