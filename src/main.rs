//! Gemfall — falling-block match-3 puzzle game in the terminal.

mod app;
mod audio;
mod board;
mod grid;
mod input;
mod score;
mod theme;
mod timer;
mod ui;

use anyhow::Result;
use app::App;
use clap::{Parser, ValueEnum};

/// Options derived from CLI that affect game behaviour.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub initial_level: u32,
    pub seed: Option<u64>,
    pub frame_rate: f64,
    pub no_menu: bool,
    pub no_animation: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_default();
    let config = GameConfig {
        initial_level: args.initial_level,
        seed: args.seed,
        frame_rate: args.frame_rate,
        no_menu: args.no_menu,
        no_animation: args.no_animation,
    };
    let mut app = App::new(config, theme);
    app.run()?;
    Ok(())
}

/// Falling-block match-3 puzzle game in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "gemfall",
    version,
    about = "Falling-block match-3 puzzle in the terminal. Line up three or more gems of one colour to clear them.",
    long_about = "Gemfall is a terminal puzzle game.\n\n\
        Steer each falling gem into the five-column well. Three or more settled gems of one \
        colour in a straight line (vertical, horizontal or diagonal) shatter and score. \
        Rainbow gems take the colour of whatever they land on; gray blocks only leave the \
        board when the de-gray counter runs out. Fill a column and the session is over.\n\n\
        CONTROLS:\n  Left/Right  Move    Down       Drop faster\n  Enter       Confirm    Esc     Back    Q    Quit\n\n\
        Vim keys (hjkl) work everywhere. Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Initial level (1..=10). Higher levels fall faster.
    #[arg(long, default_value = "1", value_name = "N")]
    pub initial_level: u32,

    /// Fix the RNG seed (for practice runs and demos).
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Target render frames per second.
    #[arg(long, default_value = "60.0", value_name = "RATE", value_parser = parse_frame_rate)]
    pub frame_rate: f64,

    /// Skip the title screen and start playing immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Disable the clear-flash animation.
    #[arg(long)]
    pub no_animation: bool,
}

/// The frame rate becomes a frame `Duration`, so it must be a positive
/// finite number.
fn parse_frame_rate(s: &str) -> Result<f64, String> {
    let rate: f64 = s.parse().map_err(|_| format!("invalid frame rate: {s}"))?;
    if rate.is_finite() && rate > 0.0 {
        Ok(rate)
    } else {
        Err("frame rate must be a positive number".to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
