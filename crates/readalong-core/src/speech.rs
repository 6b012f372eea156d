use std::process::{Child, Command, Stdio};
use std::sync::Mutex;
use tracing::{debug, warn};

pub trait SpeechPort: Send + Sync {
    /// Start speaking `text`, interrupting any utterance in progress.
    fn speak(&self, text: &str);

    fn is_speaking(&self) -> bool;

    /// Halt the current utterance, if any.
    fn stop(&self);

    /// False when the backend cannot produce speech at all.
    fn is_available(&self) -> bool {
        true
    }
}

/// Speech port that never speaks. Playback degrades to timer pacing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSpeech;

impl SpeechPort for NullSpeech {
    fn speak(&self, _text: &str) {}

    fn is_speaking(&self) -> bool {
        false
    }

    fn stop(&self) {}

    fn is_available(&self) -> bool {
        false
    }
}

/// Speech through an external TTS program, one process per utterance.
///
/// The utterance is passed as the last argument, e.g. `espeak-ng -s 170 "text"`.
pub struct CommandSpeech {
    program: String,
    args: Vec<String>,
    available: bool,
    child: Mutex<Option<Child>>,
}

impl CommandSpeech {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        let program = program.into();
        let available = probe(&program);
        if !available {
            warn!(program = %program, "speech program not found");
        }
        CommandSpeech {
            program,
            args,
            available,
            child: Mutex::new(None),
        }
    }

    /// `espeak-ng` at the given speaking rate.
    pub fn espeak(words_per_minute: u32) -> Self {
        Self::new("espeak-ng", vec!["-s".into(), words_per_minute.to_string()])
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn halt(slot: &mut Option<Child>) {
        if let Some(mut child) = slot.take() {
            // Already exited is fine.
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

fn probe(program: &str) -> bool {
    match Command::new(program)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(_) => true,
        Err(e) => {
            debug!(program, error = %e, "speech program probe failed");
            false
        }
    }
}

impl SpeechPort for CommandSpeech {
    fn speak(&self, text: &str) {
        let mut slot = self.child.lock().unwrap_or_else(|e| e.into_inner());
        Self::halt(&mut slot);

        match Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => {
                debug!(program = %self.program, chars = text.len(), "utterance started");
                *slot = Some(child);
            }
            Err(e) => warn!(program = %self.program, error = %e, "failed to start speech"),
        }
    }

    fn is_speaking(&self) -> bool {
        let mut slot = self.child.lock().unwrap_or_else(|e| e.into_inner());
        let running = match slot.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        };
        if !running {
            // Reap the finished process.
            Self::halt(&mut slot);
        }
        running
    }

    fn stop(&self) {
        let mut slot = self.child.lock().unwrap_or_else(|e| e.into_inner());
        Self::halt(&mut slot);
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

impl Drop for CommandSpeech {
    fn drop(&mut self) {
        let slot = self.child.get_mut().unwrap_or_else(|e| e.into_inner());
        Self::halt(slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_speech_is_unavailable() {
        let s = NullSpeech;
        s.speak("hello");
        assert!(!s.is_speaking());
        assert!(!s.is_available());
    }

    #[test]
    fn test_missing_program_is_unavailable() {
        let s = CommandSpeech::new("definitely-not-a-tts-binary-7f3a", vec![]);
        assert!(!s.is_available());
        s.speak("hello");
        assert!(!s.is_speaking());
        s.stop();
    }

    #[test]
    fn test_unexecutable_program_is_unavailable() {
        // A plain file without the execute bit fails to spawn with PermissionDenied.
        let file = tempfile::NamedTempFile::new().unwrap();
        let s = CommandSpeech::new(file.path().to_string_lossy(), vec![]);
        assert!(!s.is_available());
    }
}
