use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::app::{App, PromptKind};
use crate::audio::{AnalysisHandle, AudioCmd, AudioEvent, AudioPlayer};
use crate::config;
use crate::error::Error;
use crate::library::{track_from_file, track_from_url};
use crate::ui;
use crate::visualizer::{Sampler, VisualSnapshot};

/// Longest the loop sleeps waiting for a key while nothing is scheduled.
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Where key handlers send their commands.
pub(super) trait AudioControl {
    fn command(&self, cmd: AudioCmd);
    fn quit(&self, fade_out: Duration);
}

impl AudioControl for AudioPlayer {
    fn command(&self, cmd: AudioCmd) {
        if self.send(cmd).is_err() {
            log::warn!("audio thread is gone; command dropped");
        }
    }

    fn quit(&self, fade_out: Duration) {
        self.quit_softly(fade_out);
    }
}

/// State tracked by the runtime event loop across iterations.
pub struct EventLoopState {
    /// Internal two-key prefix state used for `gg` handling.
    pub pending_gg: bool,
    sampler: Sampler,
    visual_rx: Receiver<Arc<VisualSnapshot>>,
    analysis: AnalysisHandle,
}

impl EventLoopState {
    pub fn new(
        sampler: Sampler,
        visual_rx: Receiver<Arc<VisualSnapshot>>,
        analysis: AnalysisHandle,
    ) -> Self {
        Self {
            pending_gg: false,
            sampler,
            visual_rx,
            analysis,
        }
    }

    /// Stop sampling. Safe to call more than once.
    pub fn shutdown(&mut self) {
        self.sampler.shutdown();
    }

    fn sample(&mut self, app: &mut App) {
        let now = Instant::now();
        self.sampler.set_active(app.should_analyze(), now);
        self.sampler.advance(now, &mut self.analysis);
        while let Ok(snapshot) = self.visual_rx.try_recv() {
            app.set_visual(snapshot);
        }
    }

    fn poll_timeout(&self) -> Duration {
        self.sampler
            .time_until_next(Instant::now())
            .map_or(IDLE_POLL, |d| d.min(IDLE_POLL))
    }
}

/// Main terminal event loop: syncs with the audio thread, samples the
/// analyser, draws, and handles input. Returns `Ok(())` when the user quits.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    app: &mut App,
    audio_player: &AudioPlayer,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        app.sync_playback();
        for event in audio_player.drain_events() {
            handle_audio_event(event, app);
        }

        state.sample(app);

        let tracks = app.tracks();
        terminal.draw(|f| {
            ui::draw(
                f,
                app,
                &tracks,
                &settings.ui,
                &settings.controls,
                &settings.visualizer,
            )
        })?;

        if event::poll(state.poll_timeout())? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key_event(key, settings, app, audio_player, state)? {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn handle_audio_event(event: AudioEvent, app: &mut App) {
    match event {
        AudioEvent::Failed(e @ Error::PermissionDenied(_)) => {
            app.show_alert(format!("{e}. Check microphone permissions and try again."));
        }
        AudioEvent::Failed(e) => app.set_status(e.to_string()),
        AudioEvent::MetadataLoaded { title, duration } => {
            log::debug!("metadata loaded for {title:?}: {duration:?}");
            app.status = None;
        }
    }
}

pub(super) fn handle_key_event(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut App,
    audio: &impl AudioControl,
    state: &mut EventLoopState,
) -> Result<bool, Box<dyn std::error::Error>> {
    handle_key(key, settings, app, audio, &mut state.pending_gg)
}

fn handle_key(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut App,
    audio: &impl AudioControl,
    pending_gg: &mut bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    // The alert is modal.
    if app.alert.is_some() {
        *pending_gg = false;
        if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
            app.dismiss_alert();
        }
        return Ok(false);
    }

    if app.prompt.is_some() {
        *pending_gg = false;
        match key.code {
            KeyCode::Esc => app.cancel_prompt(),
            KeyCode::Backspace => app.pop_prompt_char(),
            KeyCode::Enter => submit_prompt(settings, app, audio),
            KeyCode::Char(c) => {
                if !c.is_control() {
                    app.push_prompt_char(c);
                }
            }
            _ => {}
        }
        return Ok(false);
    }

    if key.code != KeyCode::Char('g') {
        *pending_gg = false;
    }

    let scrub = settings.controls.scrub_seconds as i64;
    let step = settings.controls.volume_step;

    match key.code {
        KeyCode::Char('q') => {
            audio.quit(Duration::from_millis(settings.audio.quit_fade_out_ms));
            return Ok(true);
        }
        KeyCode::Char(' ') | KeyCode::Char('p') => {
            app.follow_playback_on();
            audio.command(AudioCmd::TogglePlay);
        }
        KeyCode::Char('l') => {
            app.follow_playback_on();
            audio.command(AudioCmd::Next);
        }
        KeyCode::Char('h') => {
            app.follow_playback_on();
            audio.command(AudioCmd::Prev);
        }
        KeyCode::Char('j') => {
            app.follow_playback_off();
            app.next();
        }
        KeyCode::Char('k') => {
            app.follow_playback_off();
            app.prev();
        }
        KeyCode::Char('g') => {
            if *pending_gg {
                *pending_gg = false;
                app.follow_playback_off();
                app.select_first();
            } else {
                *pending_gg = true;
            }
        }
        KeyCode::Char('G') => {
            app.follow_playback_off();
            app.select_last();
        }
        KeyCode::Enter => {
            if app.has_tracks() {
                app.follow_playback_on();
                audio.command(AudioCmd::Select(app.selected));
            }
        }
        KeyCode::Char('H') => audio.command(AudioCmd::SeekBy(-scrub)),
        KeyCode::Char('L') => audio.command(AudioCmd::SeekBy(scrub)),
        KeyCode::Char(c @ '0'..='9') => {
            let tenth = c.to_digit(10).unwrap_or(0) as f32;
            audio.command(AudioCmd::Seek(tenth * 10.0));
        }
        KeyCode::Char('+') | KeyCode::Char('=') => {
            let volume = app.volume_up(step);
            app.playback.volume = volume;
            audio.command(AudioCmd::SetVolume(volume));
        }
        KeyCode::Char('-') => {
            let volume = app.volume_down(step);
            app.playback.volume = volume;
            audio.command(AudioCmd::SetVolume(volume));
        }
        KeyCode::Char('m') => {
            if app.playback.using_microphone {
                audio.command(AudioCmd::StopMicrophone);
            } else {
                audio.command(AudioCmd::StartMicrophone);
            }
        }
        KeyCode::Char('o') => app.open_prompt(PromptKind::File),
        KeyCode::Char('u') => app.open_prompt(PromptKind::Url),
        KeyCode::Char('f') => app.toggle_like(),
        KeyCode::Char('s') => app.toggle_shuffle(),
        KeyCode::Char('r') => app.toggle_repeat(),
        KeyCode::Esc => app.status = None,
        _ => {}
    }

    Ok(false)
}

/// Turn the prompt text into a track. Non-audio files are ignored.
fn submit_prompt(settings: &config::Settings, app: &mut App, audio: &impl AudioControl) {
    let Some((kind, text)) = app.take_prompt() else {
        return;
    };
    let track = match kind {
        PromptKind::File => match track_from_file(&expand_home(&text), &settings.library) {
            Ok(track) => track,
            Err(e) => {
                log::debug!("intake: ignoring {text:?}: {e}");
                return;
            }
        },
        PromptKind::Url => track_from_url(&text),
    };
    app.follow_playback_on();
    app.select_first();
    audio.command(AudioCmd::AddTrack(track));
}

fn expand_home(text: &str) -> PathBuf {
    match (text.strip_prefix("~/"), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(text),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use crossterm::event::KeyModifiers;

    use crate::library::{Playlist, Track, TrackSource};

    use super::*;

    #[derive(Default)]
    struct Recorder {
        cmds: RefCell<Vec<AudioCmd>>,
        quit: RefCell<Option<Duration>>,
    }

    impl AudioControl for Recorder {
        fn command(&self, cmd: AudioCmd) {
            self.cmds.borrow_mut().push(cmd);
        }

        fn quit(&self, fade_out: Duration) {
            *self.quit.borrow_mut() = Some(fade_out);
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app_with(n: usize) -> App {
        let tracks = (0..n)
            .map(|i| {
                Track::new(
                    format!("Song {i}"),
                    "Artist".into(),
                    TrackSource::File(PathBuf::from(format!("/music/{i}.mp3"))),
                )
            })
            .collect();
        App::new(Playlist::new(tracks).into_handle())
    }

    fn press(app: &mut App, audio: &Recorder, code: KeyCode, gg: &mut bool) -> bool {
        handle_key(key(code), &config::Settings::default(), app, audio, gg).unwrap()
    }

    #[test]
    fn transport_keys_send_commands() {
        let mut app = app_with(3);
        let audio = Recorder::default();
        let mut gg = false;

        press(&mut app, &audio, KeyCode::Char(' '), &mut gg);
        press(&mut app, &audio, KeyCode::Char('l'), &mut gg);
        press(&mut app, &audio, KeyCode::Char('h'), &mut gg);
        press(&mut app, &audio, KeyCode::Char('L'), &mut gg);
        press(&mut app, &audio, KeyCode::Char('H'), &mut gg);
        press(&mut app, &audio, KeyCode::Char('5'), &mut gg);

        let cmds = audio.cmds.borrow();
        assert!(matches!(cmds[0], AudioCmd::TogglePlay));
        assert!(matches!(cmds[1], AudioCmd::Next));
        assert!(matches!(cmds[2], AudioCmd::Prev));
        assert!(matches!(cmds[3], AudioCmd::SeekBy(5)));
        assert!(matches!(cmds[4], AudioCmd::SeekBy(-5)));
        assert!(matches!(cmds[5], AudioCmd::Seek(p) if (p - 50.0).abs() < f32::EPSILON));
    }

    #[test]
    fn gg_and_capital_g_jump_the_cursor() {
        let mut app = app_with(4);
        let audio = Recorder::default();
        let mut gg = false;

        press(&mut app, &audio, KeyCode::Char('G'), &mut gg);
        assert_eq!(app.selected, 3);
        assert!(!app.follow_playback);

        press(&mut app, &audio, KeyCode::Char('g'), &mut gg);
        assert_eq!(app.selected, 3);
        press(&mut app, &audio, KeyCode::Char('g'), &mut gg);
        assert_eq!(app.selected, 0);

        // An intervening key cancels the prefix.
        press(&mut app, &audio, KeyCode::Char('j'), &mut gg);
        press(&mut app, &audio, KeyCode::Char('g'), &mut gg);
        press(&mut app, &audio, KeyCode::Char('j'), &mut gg);
        press(&mut app, &audio, KeyCode::Char('g'), &mut gg);
        assert_eq!(app.selected, 2);
    }

    #[test]
    fn enter_selects_only_when_tracks_exist() {
        let audio = Recorder::default();
        let mut gg = false;

        let mut empty = app_with(0);
        press(&mut empty, &audio, KeyCode::Enter, &mut gg);
        assert!(audio.cmds.borrow().is_empty());

        let mut app = app_with(3);
        press(&mut app, &audio, KeyCode::Char('j'), &mut gg);
        press(&mut app, &audio, KeyCode::Enter, &mut gg);
        assert!(matches!(audio.cmds.borrow()[0], AudioCmd::Select(1)));
        assert!(app.follow_playback);
    }

    #[test]
    fn microphone_key_follows_published_state() {
        let mut app = app_with(1);
        let audio = Recorder::default();
        let mut gg = false;

        press(&mut app, &audio, KeyCode::Char('m'), &mut gg);
        app.playback.using_microphone = true;
        press(&mut app, &audio, KeyCode::Char('m'), &mut gg);

        let cmds = audio.cmds.borrow();
        assert!(matches!(cmds[0], AudioCmd::StartMicrophone));
        assert!(matches!(cmds[1], AudioCmd::StopMicrophone));
    }

    #[test]
    fn volume_keys_step_and_clamp() {
        let mut app = app_with(1);
        let audio = Recorder::default();
        let mut gg = false;
        app.playback.volume = 98;

        press(&mut app, &audio, KeyCode::Char('+'), &mut gg);
        assert_eq!(app.playback.volume, 100);
        press(&mut app, &audio, KeyCode::Char('-'), &mut gg);
        assert_eq!(app.playback.volume, 95);
        assert!(matches!(audio.cmds.borrow()[1], AudioCmd::SetVolume(95)));
    }

    #[test]
    fn alert_swallows_keys_until_dismissed() {
        let mut app = app_with(2);
        let audio = Recorder::default();
        let mut gg = false;
        app.show_alert("denied");

        press(&mut app, &audio, KeyCode::Char('q'), &mut gg);
        assert!(audio.quit.borrow().is_none());
        assert!(app.alert.is_some());

        press(&mut app, &audio, KeyCode::Esc, &mut gg);
        assert!(app.alert.is_none());

        assert!(press(&mut app, &audio, KeyCode::Char('q'), &mut gg));
        assert_eq!(*audio.quit.borrow(), Some(Duration::from_millis(300)));
    }

    #[test]
    fn url_prompt_adds_a_track_at_the_top() {
        let mut app = app_with(2);
        let audio = Recorder::default();
        let mut gg = false;
        app.selected = 1;

        press(&mut app, &audio, KeyCode::Char('u'), &mut gg);
        for c in "http://radio.example/live".chars() {
            press(&mut app, &audio, KeyCode::Char(c), &mut gg);
        }
        press(&mut app, &audio, KeyCode::Enter, &mut gg);

        assert!(app.prompt.is_none());
        assert_eq!(app.selected, 0);
        let cmds = audio.cmds.borrow();
        assert_eq!(cmds.len(), 1);
        match &cmds[0] {
            AudioCmd::AddTrack(track) => {
                assert_eq!(
                    track.source,
                    TrackSource::Url("http://radio.example/live".into())
                );
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn file_prompt_ignores_non_audio_files() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, b"not audio").unwrap();

        let mut app = app_with(1);
        let audio = Recorder::default();
        let mut gg = false;

        press(&mut app, &audio, KeyCode::Char('o'), &mut gg);
        for c in notes.to_string_lossy().chars() {
            press(&mut app, &audio, KeyCode::Char(c), &mut gg);
        }
        press(&mut app, &audio, KeyCode::Enter, &mut gg);

        assert!(app.prompt.is_none());
        assert!(audio.cmds.borrow().is_empty());
    }

    #[test]
    fn prompt_typing_does_not_trigger_shortcuts() {
        let mut app = app_with(1);
        let audio = Recorder::default();
        let mut gg = false;

        press(&mut app, &audio, KeyCode::Char('o'), &mut gg);
        assert!(!press(&mut app, &audio, KeyCode::Char('q'), &mut gg));
        press(&mut app, &audio, KeyCode::Char('x'), &mut gg);
        press(&mut app, &audio, KeyCode::Backspace, &mut gg);
        assert_eq!(app.prompt.as_ref().map(|p| p.buffer.as_str()), Some("q"));

        press(&mut app, &audio, KeyCode::Esc, &mut gg);
        assert!(app.prompt.is_none());
        assert!(audio.quit.borrow().is_none());
    }

    #[test]
    fn permission_denied_raises_an_alert_and_other_failures_a_status() {
        let mut app = app_with(1);

        handle_audio_event(
            AudioEvent::Failed(Error::PlaybackFailure("boom".into())),
            &mut app,
        );
        assert!(app.alert.is_none());
        assert!(app.status.as_deref().is_some_and(|s| s.contains("boom")));

        handle_audio_event(
            AudioEvent::Failed(Error::PermissionDenied("no device".into())),
            &mut app,
        );
        assert!(app.alert.is_some());

        handle_audio_event(
            AudioEvent::MetadataLoaded {
                title: "Song 0".into(),
                duration: Duration::from_secs(10),
            },
            &mut app,
        );
        assert!(app.status.is_none());
    }

    #[test]
    fn home_prefix_expands() {
        assert_eq!(expand_home("/abs/x.mp3"), PathBuf::from("/abs/x.mp3"));
        if let Some(home) = std::env::var_os("HOME") {
            assert_eq!(expand_home("~/a.mp3"), PathBuf::from(home).join("a.mp3"));
        }
    }
}
