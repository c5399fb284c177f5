//! Audio settings and cue routing.
//!
//! There is no playback backend; this tracks the volumes and tune the
//! options screen edits and records the cues the simulation emits, so the
//! UI can surface them and a backend could be wired in later.

pub const NUM_TUNES: usize = 4;
pub const MAX_VOLUME: u32 = 100;
pub const VOLUME_STEP: u32 = 10;

#[derive(Debug, Clone)]
pub struct AudioState {
    pub music_volume: u32,
    pub sound_volume: u32,
    pub current_tune: usize,
    /// Most recent sound cue, for the UI.
    pub last_cue: Option<&'static str>,
}

impl Default for AudioState {
    fn default() -> Self {
        Self {
            music_volume: 70,
            sound_volume: 70,
            current_tune: 0,
            last_cue: None,
        }
    }
}

impl AudioState {
    pub fn tune_up(&mut self) {
        self.current_tune = (self.current_tune + 1) % NUM_TUNES;
    }

    pub fn tune_down(&mut self) {
        self.current_tune = (self.current_tune + NUM_TUNES - 1) % NUM_TUNES;
    }

    pub fn set_tune(&mut self, tune: usize) {
        self.current_tune = tune % NUM_TUNES;
    }

    pub fn music_volume_up(&mut self) {
        self.music_volume = (self.music_volume + VOLUME_STEP).min(MAX_VOLUME);
    }

    pub fn music_volume_down(&mut self) {
        self.music_volume = self.music_volume.saturating_sub(VOLUME_STEP);
    }

    pub fn sound_volume_up(&mut self) {
        self.sound_volume = (self.sound_volume + VOLUME_STEP).min(MAX_VOLUME);
    }

    pub fn sound_volume_down(&mut self) {
        self.sound_volume = self.sound_volume.saturating_sub(VOLUME_STEP);
    }

    /// A cue is dropped entirely when sounds are muted.
    pub fn play_cue(&mut self, name: &'static str) {
        if self.sound_volume > 0 {
            self.last_cue = Some(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_clamps_at_both_ends() {
        let mut a = AudioState::default();
        for _ in 0..20 {
            a.music_volume_up();
        }
        assert_eq!(a.music_volume, MAX_VOLUME);
        for _ in 0..20 {
            a.music_volume_down();
        }
        assert_eq!(a.music_volume, 0);
    }

    #[test]
    fn tune_selection_wraps() {
        let mut a = AudioState::default();
        a.tune_down();
        assert_eq!(a.current_tune, NUM_TUNES - 1);
        a.tune_up();
        assert_eq!(a.current_tune, 0);
    }

    #[test]
    fn muted_sounds_drop_cues() {
        let mut a = AudioState::default();
        a.sound_volume = 0;
        a.play_cue("break1");
        assert_eq!(a.last_cue, None);
        a.sound_volume = 50;
        a.play_cue("break2");
        assert_eq!(a.last_cue, Some("break2"));
    }
}
