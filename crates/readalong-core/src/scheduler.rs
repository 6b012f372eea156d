//! Playback loop: walks the sentences of a document, aligns each unit
//! against the word boxes, emits highlight events and paces itself either
//! on speech completion or on a fixed timer.
//!
//! A run goes `Idle -> Running -> Idle`. There is no pause: a stop request
//! ends the run, and starting again begins from the first sentence.

use crate::align::{AlignCursor, Alignment};
use crate::error::ReadAlongError;
use crate::highlight::{HighlightEvent, HighlightPort};
use crate::model::{Document, FollowMode, HighlightMode, ReaderSettings};
use crate::speech::SpeechPort;
use crate::text::{tokenize, word_count, words_with_tokens};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How often the speech port is polled for completion.
pub const SPEECH_POLL_INTERVAL: Duration = Duration::from_millis(80);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackOutcome {
    Completed,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackReport {
    pub outcome: PlaybackOutcome,
    pub sentences_started: usize,
    /// Units dispatched (sentences or words).
    pub units: usize,
    pub highlights: usize,
    /// Units that aligned to no box and were paced without a highlight.
    pub misses: usize,
    /// Alignment cursor position when the run ended.
    pub cursor_position: usize,
}

enum Flow {
    Continue,
    Stop,
}

/// A configured playback run, not yet started.
pub struct Playback {
    document: Arc<Document>,
    settings: watch::Receiver<ReaderSettings>,
    speech: Arc<dyn SpeechPort>,
    highlight: Arc<dyn HighlightPort>,
}

impl Playback {
    /// Settings are read live from `settings`: highlight mode once per
    /// sentence, follow mode and zoom once per unit.
    pub fn new(
        document: Arc<Document>,
        settings: watch::Receiver<ReaderSettings>,
        speech: Arc<dyn SpeechPort>,
        highlight: Arc<dyn HighlightPort>,
    ) -> Self {
        Playback {
            document,
            settings,
            speech,
            highlight,
        }
    }

    /// Playback with a fixed settings snapshot.
    pub fn with_settings(
        document: Arc<Document>,
        settings: ReaderSettings,
        speech: Arc<dyn SpeechPort>,
        highlight: Arc<dyn HighlightPort>,
    ) -> Self {
        let (_tx, rx) = watch::channel(settings);
        Self::new(document, rx, speech, highlight)
    }

    /// Spawn the run on the current tokio runtime.
    pub fn start(self) -> PlaybackHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(PlaybackState::Running);

        let task = tokio::spawn(async move {
            let report = self.run(stop_rx).await;
            state_tx.send_replace(PlaybackState::Idle);
            report
        });

        PlaybackHandle {
            stop: StopSignal {
                tx: Arc::new(stop_tx),
            },
            state: state_rx,
            task,
        }
    }

    /// Drive the run to completion or until `stop` turns true (or its
    /// sender is dropped).
    pub async fn run(self, stop: watch::Receiver<bool>) -> PlaybackReport {
        let settings = *self.settings.borrow();
        let word_delay = settings.per_word_delay();
        let speech_available = self.speech.is_available();

        info!(
            sentences = self.document.sentences.len(),
            word_boxes = self.document.word_boxes.len(),
            mode = %settings.highlight_mode,
            follow = %settings.follow_mode,
            word_delay_ms = word_delay.as_millis() as u64,
            "playback started"
        );

        let run = Run {
            document: self.document,
            settings: self.settings,
            speech: self.speech,
            highlight: self.highlight,
            stop,
            cursor: AlignCursor::new(),
            word_delay,
            speech_available,
            warned_no_speech: false,
            sentences_started: 0,
            units: 0,
            highlights: 0,
            misses: 0,
        };
        run.execute().await
    }
}

/// Cloneable stop trigger for a running playback, e.g. for a Ctrl-C task.
#[derive(Debug, Clone)]
pub struct StopSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl StopSignal {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }
}

/// Control over a spawned playback run.
pub struct PlaybackHandle {
    stop: StopSignal,
    state: watch::Receiver<PlaybackState>,
    task: JoinHandle<PlaybackReport>,
}

impl PlaybackHandle {
    /// Request a stop. Takes effect at the next suspension point.
    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn state(&self) -> PlaybackState {
        *self.state.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the run to end on its own (or after [`stop`](Self::stop)).
    pub async fn wait(self) -> Result<PlaybackReport, ReadAlongError> {
        // Dropping the stop sender would end the run early.
        let PlaybackHandle {
            stop: _stop, task, ..
        } = self;
        task.await.map_err(|e| ReadAlongError::Playback(e.to_string()))
    }

    /// Stop and wait until the run is fully wound down.
    pub async fn cancel(self) -> Result<PlaybackReport, ReadAlongError> {
        self.stop();
        self.wait().await
    }
}

struct Run {
    document: Arc<Document>,
    settings: watch::Receiver<ReaderSettings>,
    speech: Arc<dyn SpeechPort>,
    highlight: Arc<dyn HighlightPort>,
    stop: watch::Receiver<bool>,
    cursor: AlignCursor,
    word_delay: Duration,
    speech_available: bool,
    warned_no_speech: bool,
    sentences_started: usize,
    units: usize,
    highlights: usize,
    misses: usize,
}

async fn stop_signal(stop: &mut watch::Receiver<bool>) {
    // A dropped sender counts as a stop: nobody can end the run otherwise.
    let _ = stop.wait_for(|stopped| *stopped).await;
}

impl Run {
    async fn execute(mut self) -> PlaybackReport {
        let document = Arc::clone(&self.document);
        let outcome = self.walk(&document).await;

        if outcome == PlaybackOutcome::Stopped {
            self.speech.stop();
        }
        self.highlight.on_finished();

        let report = PlaybackReport {
            outcome,
            sentences_started: self.sentences_started,
            units: self.units,
            highlights: self.highlights,
            misses: self.misses,
            cursor_position: self.cursor.position(),
        };
        info!(
            outcome = ?report.outcome,
            units = report.units,
            highlights = report.highlights,
            misses = report.misses,
            "playback finished"
        );
        report
    }

    async fn walk(&mut self, document: &Document) -> PlaybackOutcome {
        for (sentence_index, sentence) in document.sentences.iter().enumerate() {
            if self.stop_requested() {
                return PlaybackOutcome::Stopped;
            }
            self.sentences_started += 1;

            let mode = self.settings.borrow().highlight_mode;
            let flow = match mode {
                HighlightMode::Sentence => {
                    self.read_sentence(document, sentence_index, sentence)
                        .await
                }
                HighlightMode::Word => self.read_words(document, sentence_index, sentence).await,
            };
            if let Flow::Stop = flow {
                return PlaybackOutcome::Stopped;
            }
        }
        PlaybackOutcome::Completed
    }

    async fn read_sentence(
        &mut self,
        document: &Document,
        sentence_index: usize,
        sentence: &str,
    ) -> Flow {
        let tokens = tokenize(sentence);
        let alignment = self.cursor.align(&tokens, &document.word_boxes);
        self.dispatch(sentence_index, sentence, alignment);

        match self.follow_mode() {
            FollowMode::SpeechDriven => self.speak_and_wait(sentence).await,
            FollowMode::FixedTimer => {
                let words = u32::try_from(word_count(sentence)).unwrap_or(u32::MAX);
                let delay = self.word_delay.saturating_mul(words);
                self.pause(delay).await
            }
        }
    }

    async fn read_words(&mut self, document: &Document, sentence_index: usize, sentence: &str) -> Flow {
        for (word, token) in words_with_tokens(sentence) {
            if self.stop_requested() {
                return Flow::Stop;
            }

            let alignment = self
                .cursor
                .align(std::slice::from_ref(&token), &document.word_boxes);
            self.dispatch(sentence_index, word, alignment);

            let flow = match self.follow_mode() {
                FollowMode::SpeechDriven => self.speak_and_wait(word).await,
                FollowMode::FixedTimer => {
                    let delay = self.word_delay;
                    self.pause(delay).await
                }
            };
            if let Flow::Stop = flow {
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    /// Emit a highlight for a hit; a miss only counts.
    fn dispatch(&mut self, sentence_index: usize, text: &str, alignment: Alignment) {
        let unit_index = self.units;
        self.units += 1;

        let (page, bounds) = match (alignment.page, alignment.bounds()) {
            (Some(page), Some(bounds)) => (page, bounds),
            _ => {
                self.misses += 1;
                debug!(unit_index, sentence_index, text, "no word boxes matched");
                return;
            }
        };

        let recommended_zoom = self.settings.borrow().target_zoom;
        let event = HighlightEvent {
            unit_index,
            sentence_index,
            page,
            text: text.to_string(),
            rects: alignment.rects,
            bounds,
            recommended_zoom,
        };
        debug!(
            unit_index,
            page,
            rects = event.rects.len(),
            cursor = self.cursor.position(),
            "highlight"
        );
        self.highlight.on_highlight(&event);
        self.highlights += 1;
    }

    fn follow_mode(&mut self) -> FollowMode {
        let requested = self.settings.borrow().follow_mode;
        if requested == FollowMode::SpeechDriven && !self.speech_available {
            if !self.warned_no_speech {
                warn!("speech output unavailable, pacing with the fixed timer instead");
                self.warned_no_speech = true;
            }
            return FollowMode::FixedTimer;
        }
        requested
    }

    fn stop_requested(&self) -> bool {
        *self.stop.borrow() || self.stop.has_changed().is_err()
    }

    async fn pause(&mut self, delay: Duration) -> Flow {
        tokio::select! {
            biased;
            _ = stop_signal(&mut self.stop) => Flow::Stop,
            _ = tokio::time::sleep(delay) => Flow::Continue,
        }
    }

    /// Speak and poll until the engine goes quiet. The first poll waits one
    /// interval so the engine has time to report that it started.
    async fn speak_and_wait(&mut self, text: &str) -> Flow {
        self.speech.speak(text);
        loop {
            if let Flow::Stop = self.pause(SPEECH_POLL_INTERVAL).await {
                return Flow::Stop;
            }
            if !self.speech.is_speaking() {
                return Flow::Continue;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::model::{GeometrySource, WordBox};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<HighlightEvent>>,
        finished: Mutex<bool>,
    }

    impl HighlightPort for Recorder {
        fn on_highlight(&self, event: &HighlightEvent) {
            self.events.lock().unwrap().push(event.clone());
        }

        fn on_finished(&self) {
            *self.finished.lock().unwrap() = true;
        }
    }

    fn document(sentences: &[&str], words: &[&str]) -> Arc<Document> {
        let word_boxes = words
            .iter()
            .enumerate()
            .map(|(i, w)| WordBox {
                page: 0,
                text: w.to_string(),
                rect: Rect::new(i as f32 * 10.0, 0.0, i as f32 * 10.0 + 8.0, 10.0),
            })
            .collect();
        Arc::new(Document {
            page_count: 1,
            full_text: sentences.join(" "),
            sentences: sentences.iter().map(|s| s.to_string()).collect(),
            word_boxes,
            geometry_source: GeometrySource::TextLayer,
        })
    }

    fn timer(mode: HighlightMode) -> ReaderSettings {
        ReaderSettings {
            highlight_mode: mode,
            follow_mode: FollowMode::FixedTimer,
            words_per_minute: 120,
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sentence_mode_timer_pacing() {
        let doc = document(&["One two.", "Three four five."], &["One", "two.", "Three", "four", "five."]);
        let recorder = Arc::new(Recorder::default());
        let started = tokio::time::Instant::now();

        let report = Playback::with_settings(
            doc,
            timer(HighlightMode::Sentence),
            Arc::new(crate::speech::NullSpeech),
            recorder.clone(),
        )
        .start()
        .wait()
        .await
        .unwrap();

        // 500 ms per word at 120 wpm, five words.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(2500), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(2520), "{elapsed:?}");
        assert_eq!(report.outcome, PlaybackOutcome::Completed);
        assert_eq!(report.highlights, 2);
        assert_eq!(report.cursor_position, 5);

        let events = recorder.events.lock().unwrap();
        assert_eq!(events[0].rects.len(), 2);
        assert_eq!(events[1].rects.len(), 3);
        assert_eq!(events[1].bounds, Rect::new(20.0, 0.0, 48.0, 10.0));
        assert!(*recorder.finished.lock().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_miss_still_paces() {
        let doc = document(&["Unknown words here.", "Known."], &["Known."]);
        let recorder = Arc::new(Recorder::default());
        let started = tokio::time::Instant::now();

        let report = Playback::with_settings(
            doc,
            timer(HighlightMode::Word),
            Arc::new(crate::speech::NullSpeech),
            recorder.clone(),
        )
        .start()
        .wait()
        .await
        .unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(2000), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(2020), "{elapsed:?}");
        assert_eq!(report.units, 4);
        assert_eq!(report.misses, 3);
        assert_eq!(report.highlights, 1);
        let events = recorder.events.lock().unwrap();
        assert_eq!(events[0].unit_index, 3);
        assert_eq!(events[0].text, "Known.");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_timer_wait() {
        let doc = document(&["First sentence here.", "Second one."], &["First", "sentence", "here.", "Second", "one."]);
        let recorder = Arc::new(Recorder::default());
        let handle = Playback::with_settings(
            doc,
            timer(HighlightMode::Sentence),
            Arc::new(crate::speech::NullSpeech),
            recorder.clone(),
        )
        .start();

        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(handle.state(), PlaybackState::Running);
        let report = handle.cancel().await.unwrap();

        assert_eq!(report.outcome, PlaybackOutcome::Stopped);
        assert_eq!(recorder.events.lock().unwrap().len(), 1);
    }

    /// Speaks for 200 ms per word on the tokio clock.
    #[derive(Default)]
    struct FakeSpeech {
        spoken: Mutex<Vec<String>>,
        until: Mutex<Option<tokio::time::Instant>>,
        stopped: Mutex<bool>,
        unavailable: bool,
    }

    impl SpeechPort for FakeSpeech {
        fn speak(&self, text: &str) {
            self.spoken.lock().unwrap().push(text.to_string());
            let length = Duration::from_millis(200) * word_count(text) as u32;
            *self.until.lock().unwrap() = Some(tokio::time::Instant::now() + length);
        }

        fn is_speaking(&self) -> bool {
            self.until
                .lock()
                .unwrap()
                .is_some_and(|until| tokio::time::Instant::now() < until)
        }

        fn stop(&self) {
            *self.until.lock().unwrap() = None;
            *self.stopped.lock().unwrap() = true;
        }

        fn is_available(&self) -> bool {
            !self.unavailable
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_speech_driven_word_mode() {
        let doc = document(&["Hello — world."], &["Hello", "world."]);
        let recorder = Arc::new(Recorder::default());
        let speech = Arc::new(FakeSpeech::default());
        let settings = ReaderSettings {
            highlight_mode: HighlightMode::Word,
            follow_mode: FollowMode::SpeechDriven,
            ..Default::default()
        };

        let report = Playback::with_settings(doc, settings, speech.clone(), recorder.clone())
            .start()
            .wait()
            .await
            .unwrap();

        assert_eq!(report.outcome, PlaybackOutcome::Completed);
        assert_eq!(*speech.spoken.lock().unwrap(), vec!["Hello", "world."]);
        let events = recorder.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].rects, vec![Rect::new(10.0, 0.0, 18.0, 10.0)]);
        assert!(!*speech.stopped.lock().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_speech() {
        let doc = document(&["A long sentence to speak.", "Next."], &["A", "long", "sentence", "to", "speak.", "Next."]);
        let recorder = Arc::new(Recorder::default());
        let speech = Arc::new(FakeSpeech::default());
        let settings = ReaderSettings {
            highlight_mode: HighlightMode::Sentence,
            follow_mode: FollowMode::SpeechDriven,
            ..Default::default()
        };

        let handle = Playback::with_settings(doc, settings, speech.clone(), recorder.clone()).start();
        let stopper = handle.stop_signal();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            stopper.stop();
        });

        let report = handle.wait().await.unwrap();
        assert_eq!(report.outcome, PlaybackOutcome::Stopped);
        assert!(*speech.stopped.lock().unwrap());
        assert_eq!(speech.spoken.lock().unwrap().len(), 1);
        assert_eq!(recorder.events.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_speech_falls_back_to_timer() {
        let doc = document(&["Two words."], &["Two", "words."]);
        let speech = Arc::new(FakeSpeech {
            unavailable: true,
            ..Default::default()
        });
        let settings = ReaderSettings {
            highlight_mode: HighlightMode::Sentence,
            follow_mode: FollowMode::SpeechDriven,
            words_per_minute: 240,
            ..Default::default()
        };
        let started = tokio::time::Instant::now();

        let report = Playback::with_settings(doc, settings, speech.clone(), Arc::new(Recorder::default()))
            .start()
            .wait()
            .await
            .unwrap();

        assert_eq!(report.outcome, PlaybackOutcome::Completed);
        assert!(speech.spoken.lock().unwrap().is_empty());
        assert!(started.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_settings_switch_granularity_per_sentence() {
        let doc = document(&["First one.", "Then two."], &["First", "one.", "Then", "two."]);
        let recorder = Arc::new(Recorder::default());
        let (tx, rx) = watch::channel(timer(HighlightMode::Sentence));

        let handle = Playback::new(doc, rx, Arc::new(crate::speech::NullSpeech), recorder.clone()).start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send_replace(timer(HighlightMode::Word));
        let report = handle.wait().await.unwrap();

        // One sentence unit, then two word units.
        assert_eq!(report.units, 3);
        let events = recorder.events.lock().unwrap();
        assert_eq!(events[0].rects.len(), 2);
        assert_eq!(events[1].text, "Then");
        assert_eq!(events[2].text, "two.");
    }
}
