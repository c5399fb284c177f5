//! App: terminal init, main loop, screen state machine and key handling.

use crate::audio::AudioState;
use crate::board::{GameBoard, GameEvent};
use crate::grid::NUM_KINDS;
use crate::input::{key_to_action, Action};
use crate::theme::Theme;
use crate::GameConfig;
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use rand::Rng;
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// Full duration of a screen wipe: half covering, half revealing.
const TRANSITION_MS: f64 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Title,
    Options,
    Playing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransitionPhase {
    Covering,
    Revealing,
}

/// Two-phase wipe between screens: the curtain closes over the old screen,
/// the target screen swaps in underneath, then the curtain opens again.
#[derive(Debug)]
pub struct Transition {
    phase: TransitionPhase,
    elapsed: f64,
    target: Screen,
}

impl Transition {
    fn new(target: Screen) -> Self {
        Self {
            phase: TransitionPhase::Covering,
            elapsed: 0.0,
            target,
        }
    }

    /// Fraction of the screen the curtain covers right now, 0..=1.
    pub fn cover_fraction(&self) -> f64 {
        let half = TRANSITION_MS / 2.0;
        let t = (self.elapsed / half).clamp(0.0, 1.0);
        match self.phase {
            TransitionPhase::Covering => t,
            TransitionPhase::Revealing => 1.0 - t,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleChoice {
    Start,
    Options,
    Quit,
}

/// One decorative gem drifting behind the title, in unit space.
#[derive(Debug, Clone)]
pub struct FloatingGem {
    pub x: f64,
    pub y: f64,
    /// Unit-space velocity per millisecond.
    vx: f64,
    vy: f64,
    pub kind: u8,
}

#[derive(Debug)]
pub struct TitleState {
    pub choice: TitleChoice,
    pub gems: Vec<FloatingGem>,
}

impl TitleState {
    fn new(rng: &mut impl Rng) -> Self {
        let gems = (0..12)
            .map(|_| FloatingGem {
                x: rng.gen_range(0.0..1.0),
                y: rng.gen_range(0.0..1.0),
                vx: rng.gen_range(-0.0002..0.0002),
                vy: rng.gen_range(-0.0002..0.0002),
                kind: rng.gen_range(0..NUM_KINDS),
            })
            .collect();
        Self {
            choice: TitleChoice::Start,
            gems,
        }
    }

    /// Drift and bounce the background gems inside the unit square.
    fn tick(&mut self, delta: f64) {
        for gem in &mut self.gems {
            gem.x += gem.vx * delta;
            gem.y += gem.vy * delta;
            if gem.x <= 0.0 || gem.x >= 1.0 {
                gem.vx = -gem.vx;
                gem.x = gem.x.clamp(0.0, 1.0);
            }
            if gem.y <= 0.0 || gem.y >= 1.0 {
                gem.vy = -gem.vy;
                gem.y = gem.y.clamp(0.0, 1.0);
            }
        }
    }

    fn choice_up(&mut self) {
        self.choice = match self.choice {
            TitleChoice::Start => TitleChoice::Quit,
            TitleChoice::Options => TitleChoice::Start,
            TitleChoice::Quit => TitleChoice::Options,
        };
    }

    fn choice_down(&mut self) {
        self.choice = match self.choice {
            TitleChoice::Start => TitleChoice::Options,
            TitleChoice::Options => TitleChoice::Quit,
            TitleChoice::Quit => TitleChoice::Start,
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionsRow {
    Tune,
    MusicVolume,
    SoundVolume,
    Back,
}

#[derive(Debug)]
pub struct OptionsState {
    pub row: OptionsRow,
}

impl Default for OptionsState {
    fn default() -> Self {
        Self {
            row: OptionsRow::Tune,
        }
    }
}

impl OptionsState {
    fn row_up(&mut self) {
        self.row = match self.row {
            OptionsRow::Tune => OptionsRow::Back,
            OptionsRow::MusicVolume => OptionsRow::Tune,
            OptionsRow::SoundVolume => OptionsRow::MusicVolume,
            OptionsRow::Back => OptionsRow::SoundVolume,
        };
    }

    fn row_down(&mut self) {
        self.row = match self.row {
            OptionsRow::Tune => OptionsRow::MusicVolume,
            OptionsRow::MusicVolume => OptionsRow::SoundVolume,
            OptionsRow::SoundVolume => OptionsRow::Back,
            OptionsRow::Back => OptionsRow::Tune,
        };
    }
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    board: GameBoard,
    audio: AudioState,
    screen: Screen,
    transition: Option<Transition>,
    title: TitleState,
    options: OptionsState,
    last_frame: Instant,
    /// TachyonFX fade effect over the cells of a committed clear.
    clear_effect: Option<Effect>,
    /// Last time the clear effect was processed (for delta).
    clear_effect_process_time: Option<Instant>,
}

impl App {
    pub fn new(config: GameConfig, theme: Theme) -> Self {
        let mut board = GameBoard::new(config.initial_level, config.seed);
        let title = TitleState::new(&mut board.rng);
        let screen = if config.no_menu {
            Screen::Playing
        } else {
            Screen::Title
        };
        Self {
            config,
            theme,
            board,
            audio: AudioState::default(),
            screen,
            transition: None,
            title,
            options: OptionsState::default(),
            last_frame: Instant::now(),
            clear_effect: None,
            clear_effect_process_time: None,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;
        result
    }

    fn begin_transition(&mut self, target: Screen) {
        if self.transition.is_none() && target != self.screen {
            self.transition = Some(Transition::new(target));
        }
    }

    /// Advance the wipe; the screen swap happens exactly once, at the
    /// moment the curtain is fully closed.
    fn tick_transition(&mut self, delta: f64) {
        let Some(t) = &mut self.transition else { return };
        t.elapsed += delta;
        let half = TRANSITION_MS / 2.0;
        match t.phase {
            TransitionPhase::Covering if t.elapsed >= half => {
                let target = t.target;
                t.phase = TransitionPhase::Revealing;
                t.elapsed = 0.0;
                if target == Screen::Playing {
                    self.board = GameBoard::new(self.config.initial_level, self.config.seed);
                }
                self.screen = target;
            }
            TransitionPhase::Revealing if t.elapsed >= half => {
                self.transition = None;
            }
            _ => {}
        }
    }

    /// React to side effects the simulation emitted this frame.
    fn route_events(&mut self) {
        for ev in self.board.drain_events() {
            match ev {
                GameEvent::Sound(cue) => self.audio.play_cue(cue),
                GameEvent::Music(tune) => self.audio.set_tune(tune),
                GameEvent::ReturnToTitle => {
                    self.title.choice = TitleChoice::Start;
                    self.begin_transition(Screen::Title);
                }
            }
        }
    }

    fn handle_title_key(&mut self, action: Action) -> Option<Result<()>> {
        match action {
            Action::Quit | Action::Back => return Some(Ok(())),
            Action::Move(crate::board::Direction::Up) => self.title.choice_up(),
            Action::Move(crate::board::Direction::Down) => self.title.choice_down(),
            Action::Confirm => match self.title.choice {
                TitleChoice::Start => self.begin_transition(Screen::Playing),
                TitleChoice::Options => self.begin_transition(Screen::Options),
                TitleChoice::Quit => return Some(Ok(())),
            },
            _ => {}
        }
        None
    }

    fn handle_options_key(&mut self, action: Action) -> Option<Result<()>> {
        use crate::board::Direction::{Down, Left, Right, Up};
        match action {
            Action::Quit => return Some(Ok(())),
            Action::Back => self.begin_transition(Screen::Title),
            Action::Move(Up) => self.options.row_up(),
            Action::Move(Down) => self.options.row_down(),
            Action::Move(Left) => match self.options.row {
                OptionsRow::Tune => self.audio.tune_down(),
                OptionsRow::MusicVolume => self.audio.music_volume_down(),
                OptionsRow::SoundVolume => self.audio.sound_volume_down(),
                OptionsRow::Back => {}
            },
            Action::Move(Right) => match self.options.row {
                OptionsRow::Tune => self.audio.tune_up(),
                OptionsRow::MusicVolume => self.audio.music_volume_up(),
                OptionsRow::SoundVolume => self.audio.sound_volume_up(),
                OptionsRow::Back => {}
            },
            Action::Confirm => {
                if self.options.row == OptionsRow::Back {
                    self.begin_transition(Screen::Title);
                }
            }
            Action::None => {}
        }
        None
    }

    fn handle_playing_key(&mut self, action: Action) -> Option<Result<()>> {
        match action {
            Action::Quit => return Some(Ok(())),
            Action::Back => {
                self.title.choice = TitleChoice::Start;
                self.begin_transition(Screen::Title);
            }
            Action::Move(dir) => self.board.handle_input(dir),
            Action::Confirm | Action::None => {}
        }
        None
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.config.frame_rate);
        loop {
            let now = Instant::now();
            let delta = now.duration_since(self.last_frame).as_secs_f64() * 1000.0;
            self.last_frame = now;

            self.tick_transition(delta);
            match self.screen {
                Screen::Playing => {
                    self.board.update(delta);
                    self.route_events();
                }
                Screen::Title | Screen::Options => self.title.tick(delta),
            }

            // Arm the clear flash when a commit just happened; drop it once
            // the pause is over or the animation is disabled.
            if self.config.no_animation
                || !self.board.clear_pausing()
                || self.board.recent_cleared().is_empty()
            {
                self.clear_effect = None;
                self.clear_effect_process_time = None;
            }

            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    self.screen,
                    &self.board,
                    &self.theme,
                    &self.audio,
                    &self.title,
                    &self.options,
                    self.transition.as_ref(),
                    &mut self.clear_effect,
                    &mut self.clear_effect_process_time,
                    now,
                    self.config.no_animation,
                )
            })?;

            let timeout = frame_duration.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        let action = key_to_action(key);
                        // Screen changes mid-wipe would double-switch.
                        if self.transition.is_some() && action != Action::Quit {
                            continue;
                        }
                        let outcome = match self.screen {
                            Screen::Title => self.handle_title_key(action),
                            Screen::Options => self.handle_options_key(action),
                            Screen::Playing => self.handle_playing_key(action),
                        };
                        if let Some(result) = outcome {
                            return result;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn transition_covers_then_reveals() {
        let mut t = Transition::new(Screen::Playing);
        assert_eq!(t.cover_fraction(), 0.0);
        t.elapsed = TRANSITION_MS / 4.0;
        assert!((t.cover_fraction() - 0.5).abs() < 1e-9);
        t.phase = TransitionPhase::Revealing;
        t.elapsed = 0.0;
        assert_eq!(t.cover_fraction(), 1.0);
        t.elapsed = TRANSITION_MS / 2.0;
        assert_eq!(t.cover_fraction(), 0.0);
    }

    #[test]
    fn floating_gems_stay_in_unit_space() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut title = TitleState::new(&mut rng);
        for _ in 0..10_000 {
            title.tick(16.0);
        }
        for gem in &title.gems {
            assert!((0.0..=1.0).contains(&gem.x));
            assert!((0.0..=1.0).contains(&gem.y));
        }
    }

    #[test]
    fn title_choice_cycles_both_ways() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut title = TitleState::new(&mut rng);
        title.choice_down();
        assert_eq!(title.choice, TitleChoice::Options);
        title.choice_down();
        title.choice_down();
        assert_eq!(title.choice, TitleChoice::Start);
        title.choice_up();
        assert_eq!(title.choice, TitleChoice::Quit);
    }

    #[test]
    fn options_rows_cycle() {
        let mut o = OptionsState::default();
        o.row_up();
        assert_eq!(o.row, OptionsRow::Back);
        o.row_down();
        assert_eq!(o.row, OptionsRow::Tune);
    }
}
