//! Speech-repetition drill: say each target word, the therapist marks the
//! clear ones. Audio capture is done by the collaborator bridge; this module
//! only tracks whether a take is open.

use super::{record_success, ActivityError, ActivityHost, ActivityModule, AttemptTally, Meter};
use crate::session::{ActivityKind, Advance};

#[derive(Debug, Clone)]
pub struct SpeechDrill {
    words: Vec<String>,
    index: usize,
    tally: AttemptTally,
    power: Meter,
    recording: bool,
    complete: bool,
}

impl SpeechDrill {
    pub fn new<I, S>(words: I) -> Result<Self, ActivityError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let words: Vec<String> = words.into_iter().map(Into::into).collect();
        if words.is_empty() {
            return Err(ActivityError::NoItems("speech drill"));
        }
        Ok(Self {
            words,
            index: 0,
            tally: AttemptTally::default(),
            power: Meter::default(),
            recording: false,
            complete: false,
        })
    }

    pub fn current_word(&self) -> &str {
        &self.words[self.index]
    }

    pub fn word_index(&self) -> usize {
        self.index
    }

    pub fn power(&self) -> f64 {
        self.power.value()
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn start_recording(&mut self) -> Result<(), ActivityError> {
        self.ensure_open()?;
        if self.recording {
            return Err(ActivityError::AlreadyRecording);
        }
        self.recording = true;
        Ok(())
    }

    /// Closing a take counts as one attempt.
    pub fn stop_recording(&mut self, host: &mut dyn ActivityHost) -> Result<(), ActivityError> {
        self.ensure_open()?;
        if !self.recording {
            return Err(ActivityError::NotRecording);
        }
        host.on_attempt()?;
        self.recording = false;
        self.tally.attempts += 1;
        Ok(())
    }

    pub fn mark_success(&mut self, host: &mut dyn ActivityHost) -> Result<(), ActivityError> {
        self.ensure_open()?;
        let step = 100.0 / self.words.len() as f64;
        record_success(host, &mut self.tally, &mut self.power, step)
    }

    /// Move to the next word. After the last word the drill completes and
    /// reports its success rate; the host's advance outcome is returned.
    pub fn next_word(&mut self, host: &mut dyn ActivityHost) -> Result<Option<Advance>, ActivityError> {
        self.ensure_open()?;
        if self.index + 1 < self.words.len() {
            self.index += 1;
            return Ok(None);
        }
        let advance = host.on_complete(self.tally.success_rate())?;
        self.complete = true;
        self.recording = false;
        Ok(Some(advance))
    }

    fn ensure_open(&self) -> Result<(), ActivityError> {
        if self.complete {
            Err(ActivityError::AlreadyComplete)
        } else {
            Ok(())
        }
    }
}

impl ActivityModule for SpeechDrill {
    fn kind(&self) -> ActivityKind {
        ActivityKind::Speech
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn tally(&self) -> AttemptTally {
        self.tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activities::testing::RecordingHost;

    #[test]
    fn empty_word_list_is_rejected() {
        assert_eq!(
            SpeechDrill::new(Vec::<String>::new()).unwrap_err(),
            ActivityError::NoItems("speech drill")
        );
    }

    #[test]
    fn recording_counts_attempts() {
        let mut host = RecordingHost::default();
        let mut drill = SpeechDrill::new(["cat", "dog"]).unwrap();
        assert_eq!(
            drill.stop_recording(&mut host).unwrap_err(),
            ActivityError::NotRecording
        );
        drill.start_recording().unwrap();
        assert_eq!(drill.start_recording().unwrap_err(), ActivityError::AlreadyRecording);
        drill.stop_recording(&mut host).unwrap();
        assert_eq!(drill.tally().attempts, 1);
        assert_eq!(host.attempts, 1);
    }

    #[test]
    fn awards_token_on_each_quarter_of_power() {
        let mut host = RecordingHost::default();
        let mut drill = SpeechDrill::new(["a", "b", "c", "d", "e", "f", "g", "h"]).unwrap();
        for _ in 0..8 {
            drill.mark_success(&mut host).unwrap();
        }
        assert_eq!(drill.power(), 100.0);
        assert_eq!(host.tokens, 4);
        assert_eq!(host.outcomes.len(), 8);
    }

    #[test]
    fn completes_after_last_word_with_rate() {
        let mut host = RecordingHost::default();
        let mut drill = SpeechDrill::new(["cat", "dog"]).unwrap();
        for _ in 0..2 {
            drill.start_recording().unwrap();
            drill.stop_recording(&mut host).unwrap();
        }
        drill.mark_success(&mut host).unwrap();

        assert_eq!(drill.next_word(&mut host).unwrap(), None);
        assert_eq!(drill.current_word(), "dog");
        assert!(drill.next_word(&mut host).unwrap().is_some());
        assert!(drill.is_complete());
        assert_eq!(host.completed_with, [Some(50.0)]);
        assert_eq!(
            drill.mark_success(&mut host).unwrap_err(),
            ActivityError::AlreadyComplete
        );
    }

    #[test]
    fn completing_without_attempts_reports_zero() {
        let mut host = RecordingHost::default();
        let mut drill = SpeechDrill::new(["cat"]).unwrap();
        drill.next_word(&mut host).unwrap();
        assert_eq!(host.completed_with, [Some(0.0)]);
    }
}
