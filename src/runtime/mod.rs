use std::env;
use std::path::Path;

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::app::App;
use crate::audio::{AnalysisHandle, AudioPlayer};
use crate::library::{Playlist, scan};
use crate::visualizer::Sampler;

mod event_loop;
mod logging;
mod settings;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (settings, warning) = settings::load_settings();
    let log_path = logging::init_logging(&settings.logging);
    log::info!("soundwave starting up (logging to {})", log_path.display());
    if let Some(warning) = warning {
        log::warn!("{warning}");
    }

    // Optional directory to seed the playlist with.
    let dir = env::args().nth(1);
    let tracks = match &dir {
        Some(d) => scan(Path::new(d), &settings.library),
        None => Vec::new(),
    };

    let playlist = Playlist::new(tracks).into_handle();
    let analysis = AnalysisHandle::new(&settings.analysis);
    let audio_player = AudioPlayer::new(playlist.clone(), analysis.clone(), &settings);

    let mut app = App::new(playlist);
    app.set_playback_handle(audio_player.playback_handle());
    if let Some(d) = dir {
        app.set_current_dir(d);
    }

    let mut sampler = Sampler::new(&settings.visualizer);
    let visual_rx = sampler.subscribe();

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut state = event_loop::EventLoopState::new(sampler, visual_rx, analysis);
    let run_result = event_loop::run(&mut terminal, &settings, &mut app, &audio_player, &mut state);
    state.shutdown();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = &run_result {
        log::error!("event loop failed: {e}");
    }
    log::info!("soundwave shut down");
    run_result
}
