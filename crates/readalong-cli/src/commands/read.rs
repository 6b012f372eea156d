use readalong_core::config;
use readalong_core::error::ReadAlongError;
use readalong_core::highlight::HighlightEvent;
use readalong_core::model::{FollowMode, HighlightMode, ReaderSettings};
use readalong_core::scheduler::PlaybackOutcome;
use readalong_core::session::ReaderSession;
use readalong_core::speech::{CommandSpeech, SpeechPort};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::output;
use crate::OcrArgs;

/// Command-line values that take precedence over the settings file.
pub struct Overrides {
    pub mode: Option<String>,
    pub follow: Option<String>,
    pub wpm: Option<u32>,
    pub zoom: Option<f32>,
}

impl Overrides {
    fn apply(self, settings: &mut ReaderSettings) -> Result<(), ReadAlongError> {
        if let Some(mode) = self.mode {
            settings.highlight_mode = HighlightMode::from_str_loose(&mode).ok_or_else(|| {
                ReadAlongError::SettingsInvalid(format!(
                    "unknown highlight mode '{mode}' (word, sentence)"
                ))
            })?;
        }
        if let Some(follow) = self.follow {
            settings.follow_mode = FollowMode::from_str_loose(&follow).ok_or_else(|| {
                ReadAlongError::SettingsInvalid(format!("unknown follow mode '{follow}' (speech, timer)"))
            })?;
        }
        if let Some(wpm) = self.wpm {
            settings.words_per_minute = wpm;
        }
        if let Some(zoom) = self.zoom {
            settings.target_zoom = zoom;
        }
        Ok(())
    }
}

pub async fn run(
    pdf_file: PathBuf,
    settings_file: Option<PathBuf>,
    overrides: Overrides,
    speech_cmd: Option<String>,
    json: bool,
    ocr: OcrArgs,
) -> Result<(), ReadAlongError> {
    let mut settings = match settings_file {
        Some(path) => config::load_settings(&path)?,
        None => ReaderSettings::default(),
    };
    overrides.apply(&mut settings)?;
    config::validate_settings(&settings)?;

    let speech: Arc<dyn SpeechPort> = match speech_cmd {
        Some(program) => {
            let speech = CommandSpeech::new(program, Vec::new());
            // An explicitly requested program must exist; the default may silently degrade.
            if !speech.is_available() && settings.follow_mode == FollowMode::SpeechDriven {
                return Err(ReadAlongError::SpeechUnavailable(format!(
                    "{} could not be started",
                    speech.program()
                )));
            }
            Arc::new(speech)
        }
        None => Arc::new(CommandSpeech::espeak(settings.words_per_minute)),
    };

    let extractor = super::extractor()?;
    let pdf_bytes = std::fs::read(&pdf_file)?;
    let ocr = super::ocr_fallback(&pdf_bytes, ocr)?.map(Arc::new);

    let (tx, mut rx) = mpsc::unbounded_channel::<HighlightEvent>();
    let mut session = ReaderSession::new(settings, speech, Arc::new(tx));
    let document = session
        .open(pdf_bytes, Arc::new(extractor), ocr)
        .await?;
    eprintln!(
        "Reading {} sentence(s) from {} page(s) ({} geometry, {} mode, {} pacing)",
        document.sentences.len(),
        document.page_count,
        document.geometry_source,
        settings.highlight_mode,
        settings.follow_mode
    );
    if document.sentences.is_empty() {
        eprintln!("  nothing to read");
        return Ok(());
    }

    let stop = session.start().await?;
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.stop();
        }
    });

    let mut viewport = output::table::Viewport::default();
    let finished = {
        let wait = session.wait();
        tokio::pin!(wait);
        loop {
            tokio::select! {
                Some(event) = rx.recv() => show(&event, json, &mut viewport)?,
                finished = &mut wait => break finished,
            }
        }
    };
    ctrl_c.abort();
    while let Ok(event) = rx.try_recv() {
        show(&event, json, &mut viewport)?;
    }

    let Some(report) = finished.transpose()? else {
        return Ok(());
    };
    let verb = match report.outcome {
        PlaybackOutcome::Completed => "Finished",
        PlaybackOutcome::Stopped => "Stopped",
    };
    eprintln!(
        "{verb} after {} unit(s): {} highlighted, {} without matching geometry",
        report.units, report.highlights, report.misses
    );
    Ok(())
}

fn show(
    event: &HighlightEvent,
    json: bool,
    viewport: &mut output::table::Viewport,
) -> Result<(), ReadAlongError> {
    if json {
        println!("{}", serde_json::to_string(event)?);
    } else {
        println!("{}", viewport.follow(event));
    }
    Ok(())
}
