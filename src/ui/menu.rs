use super::events::{MenuChoice, Selection};
use crate::audio::{PlaybackError, PlaybackSession, PlaybackState, SessionNotice, SessionStatus, Track};
use crate::catalog::{search_tracks, Catalog};
use crate::shutdown::ShutdownSignal;
use anyhow::Result;
use crossterm::style::Stylize;
use std::io::Write;
use tokio::io::{AsyncBufRead, Lines};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Why the menu loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuExit {
    User,
    EndOfInput,
    Signal(ShutdownSignal),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Started(Track),
    NoResults,
    Cancelled,
    Rejected(PlaybackError),
    Interrupted(MenuExit),
}

enum Input {
    Line(String),
    Exit(MenuExit),
}

/// The interactive front end.
///
/// Owns the session and keeps feeding it process and timer events while it
/// waits on the user or the catalog, so auto-advance keeps working mid-prompt.
pub struct Menu<R> {
    session: PlaybackSession,
    catalog: Box<dyn Catalog>,
    input: Lines<R>,
    shutdown: mpsc::UnboundedReceiver<ShutdownSignal>,
}

impl<R: AsyncBufRead + Unpin> Menu<R> {
    pub fn new(
        session: PlaybackSession,
        catalog: Box<dyn Catalog>,
        input: Lines<R>,
        shutdown: mpsc::UnboundedReceiver<ShutdownSignal>,
    ) -> Self {
        Self {
            session,
            catalog,
            input,
            shutdown,
        }
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut PlaybackSession {
        &mut self.session
    }

    pub async fn run(&mut self) -> Result<MenuExit> {
        loop {
            print_main_menu();

            let line = match self.next_input().await? {
                Input::Line(line) => line,
                Input::Exit(exit) => return Ok(exit),
            };

            let Some(choice) = MenuChoice::parse(&line) else {
                if !line.is_empty() {
                    println!("{}", format!("Unknown choice: {}", line).yellow());
                }
                continue;
            };
            debug!(?choice, "Menu selection");

            match choice {
                MenuChoice::Search => {
                    if let SearchOutcome::Interrupted(exit) = self.search_and_play().await? {
                        return Ok(exit);
                    }
                }
                MenuChoice::ShowPlaylist => display_playlist(&self.session.status()),
                MenuChoice::NowPlaying => display_now_playing(&self.session.status()),
                MenuChoice::NextTrack => report_play(self.session.play_next()),
                MenuChoice::PreviousTrack => report_play(self.session.play_previous()),
                MenuChoice::Stop => {
                    self.session.stop();
                    println!("{}", "Playback stopped".yellow());
                }
                MenuChoice::Exit => {
                    self.session.stop();
                    return Ok(MenuExit::User);
                }
            }
        }
    }

    /// Ask for a query, let the user pick a result, and play it.
    ///
    /// The playlist is only replaced once a result is picked.
    pub async fn search_and_play(&mut self) -> Result<SearchOutcome> {
        print!("{} ", "Enter search query:".cyan());
        let query = match self.next_input().await? {
            Input::Line(query) => query,
            Input::Exit(exit) => return Ok(SearchOutcome::Interrupted(exit)),
        };

        let results = if query.is_empty() {
            Vec::new()
        } else {
            match self.search(&query).await {
                Ok(results) => results,
                Err(exit) => return Ok(SearchOutcome::Interrupted(exit)),
            }
        };

        if results.is_empty() {
            println!("{}", "\nNo results found".red());
            return Ok(SearchOutcome::NoResults);
        }

        println!("{}", "\nSelect a track to play:".cyan());
        for (i, track) in results.iter().enumerate() {
            println!("  {:>2}) {}", i + 1, track.display_line());
        }
        println!("  {:>2}) Cancel", 0);

        let index = loop {
            print!("{} ", ">".cyan());
            let answer = match self.next_input().await? {
                Input::Line(answer) => answer,
                Input::Exit(exit) => return Ok(SearchOutcome::Interrupted(exit)),
            };

            match Selection::parse(&answer, results.len()) {
                Some(Selection::Track(index)) => break index,
                Some(Selection::Cancel) => return Ok(SearchOutcome::Cancelled),
                None => println!(
                    "{}",
                    format!("Please pick a number between 0 and {}", results.len()).yellow()
                ),
            }
        };

        info!("Selected result {} for '{}'", index, query);
        self.session.load_playlist(results, index);

        match self.session.play(index) {
            Ok(track) => {
                display_now_playing_banner(&track);
                Ok(SearchOutcome::Started(track))
            }
            Err(e) => {
                display_playback_error(&e);
                Ok(SearchOutcome::Rejected(e))
            }
        }
    }

    async fn search(&mut self, query: &str) -> std::result::Result<Vec<Track>, MenuExit> {
        println!("{}", format!("Searching for '{}'...", query).dark_grey());

        let search = search_tracks(self.catalog.as_ref(), query);
        tokio::pin!(search);

        loop {
            tokio::select! {
                tracks = &mut search => return Ok(tracks),
                Some(signal) = self.shutdown.recv() => return Err(MenuExit::Signal(signal)),
                Some(event) = self.session.next_event() => {
                    if let Some(notice) = self.session.handle_event(event) {
                        display_notice(&notice);
                    }
                }
            }
        }
    }

    async fn next_input(&mut self) -> Result<Input> {
        std::io::stdout().flush()?;

        loop {
            tokio::select! {
                line = self.input.next_line() => {
                    return Ok(match line? {
                        Some(line) => Input::Line(line.trim().to_string()),
                        None => Input::Exit(MenuExit::EndOfInput),
                    });
                }
                Some(signal) = self.shutdown.recv() => return Ok(Input::Exit(MenuExit::Signal(signal))),
                Some(event) = self.session.next_event() => {
                    if let Some(notice) = self.session.handle_event(event) {
                        display_notice(&notice);
                    }
                }
            }
        }
    }
}

fn print_main_menu() {
    println!("{}", "\nMusic Player Menu".blue().bold());
    for (i, choice) in MenuChoice::ALL.iter().enumerate() {
        println!("  {}) {}", i + 1, choice.label());
    }
    print!("{} ", ">".cyan());
}

fn report_play(result: std::result::Result<Track, PlaybackError>) {
    match result {
        Ok(track) => display_now_playing_banner(&track),
        Err(e) => display_playback_error(&e),
    }
}

fn display_now_playing_banner(track: &Track) {
    println!("{} {}", "\nNow Playing:".yellow().bold(), track.display_title().white());
    println!("{}", format!("Duration: {}", track.duration_display).dark_grey());
}

fn display_playback_error(error: &PlaybackError) {
    match error {
        PlaybackError::SpawnFailed(_) => println!("{} {}", "MPV Error:".red(), error),
        _ => println!("{}", error.to_string().yellow()),
    }
}

fn display_notice(notice: &SessionNotice) {
    match notice {
        SessionNotice::NowPlaying(track) => display_now_playing_banner(track),
        SessionNotice::TrackFinished => println!("{}", "\nTrack finished playing".dark_grey()),
        SessionNotice::StoppedWithCode(code) => {
            println!("{}", format!("\nTrack stopped with code: {}", code).red())
        }
        SessionNotice::AdvanceSkipped(e) => display_playback_error(e),
    }
}

fn display_playlist(status: &SessionStatus) {
    if status.playlist.is_empty() {
        println!("{}", "\nPlaylist is empty".yellow());
        return;
    }

    println!("{}", "\nCurrent Playlist:".blue().bold());
    for (i, track) in status.playlist.iter().enumerate() {
        let line = format!("{} - {}", track.title, track.artist);
        let duration = format!("({})", track.duration_display).dark_grey();
        if status.current_index == Some(i) {
            println!("{}{} {}", "▶ ".green().bold(), line, duration);
        } else {
            println!("  {} {}", line, duration);
        }
    }
}

fn display_now_playing(status: &SessionStatus) {
    let track = match (&status.current_track, status.state) {
        (Some(track), PlaybackState::Playing) => track,
        _ => {
            println!("{}", "\nNo track is currently playing".yellow());
            return;
        }
    };

    println!("{}", "\nNow Playing:".green().bold());
    println!("Title: {}", track.title);
    println!("Artist: {}", track.artist);
    println!("Duration: {}", track.duration_display);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::{sample_tracks, FakeLauncher};
    use crate::audio::SessionEvent;
    use crate::catalog::CatalogError;
    use crate::config::PlaybackConfig;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    struct StaticCatalog(Vec<Track>);

    #[async_trait]
    impl Catalog for StaticCatalog {
        async fn search(&self, _query: &str) -> Result<Vec<Track>, CatalogError> {
            Ok(self.0.clone())
        }
    }

    fn menu(
        results: Vec<Track>,
        script: &'static str,
        launcher: &Arc<FakeLauncher>,
    ) -> (Menu<&'static [u8]>, mpsc::UnboundedSender<ShutdownSignal>) {
        let session = PlaybackSession::new(launcher.clone(), PlaybackConfig::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let menu = Menu::new(session, Box::new(StaticCatalog(results)), script.as_bytes().lines(), rx);
        (menu, tx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_and_play_picks_result() {
        let launcher = FakeLauncher::new();
        let (mut menu, _tx) = menu(sample_tracks(3), "daft punk\n2\n", &launcher);

        let outcome = menu.search_and_play().await.unwrap();
        match outcome {
            SearchOutcome::Started(track) => assert_eq!(track.id, "id1"),
            other => panic!("unexpected outcome: {:?}", other),
        }

        let status = menu.session().status();
        assert_eq!(status.playlist.len(), 3);
        assert_eq!(status.current_index, Some(1));
        assert_eq!(status.state, PlaybackState::Playing);
        assert_eq!(launcher.launched_ids(), vec!["id1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_results_leaves_playlist_alone() {
        let launcher = FakeLauncher::new();
        let (mut menu, _tx) = menu(Vec::new(), "nothing matches this\n", &launcher);
        menu.session_mut().load_playlist(sample_tracks(2), 1);

        let outcome = menu.search_and_play().await.unwrap();
        assert_eq!(outcome, SearchOutcome::NoResults);

        let status = menu.session().status();
        assert_eq!(status.playlist, sample_tracks(2));
        assert_eq!(status.current_index, Some(1));
        assert_eq!(launcher.launch_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_leaves_playlist_alone() {
        let launcher = FakeLauncher::new();
        let (mut menu, _tx) = menu(sample_tracks(3), "query\n0\n", &launcher);

        let outcome = menu.search_and_play().await.unwrap();
        assert_eq!(outcome, SearchOutcome::Cancelled);
        assert!(menu.session().status().playlist.is_empty());
        assert_eq!(launcher.launch_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_selection_asks_again() {
        let launcher = FakeLauncher::new();
        let (mut menu, _tx) = menu(sample_tracks(3), "query\n9\nabc\n3\n", &launcher);

        let outcome = menu.search_and_play().await.unwrap();
        assert!(matches!(outcome, SearchOutcome::Started(ref t) if t.id == "id2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_exit_stops_playback() {
        let launcher = FakeLauncher::new();
        let (mut menu, _tx) = menu(sample_tracks(3), "1\nquery\n1\n2\n3\nbogus\n7\n", &launcher);

        let exit = menu.run().await.unwrap();
        assert_eq!(exit, MenuExit::User);
        assert_eq!(menu.session().state(), PlaybackState::Idle);
        assert!(menu.session().live_process().is_empty());
        assert_eq!(launcher.launched_ids(), vec!["id0"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_of_input_ends_loop() {
        let launcher = FakeLauncher::new();
        let (mut menu, _tx) = menu(Vec::new(), "", &launcher);

        assert_eq!(menu.run().await.unwrap(), MenuExit::EndOfInput);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_signal_interrupts_prompt() {
        let launcher = FakeLauncher::new();
        let session = PlaybackSession::new(launcher.clone(), PlaybackConfig::default());
        let (_keyboard, stdin) = tokio::io::duplex(64);
        let (tx, rx) = mpsc::unbounded_channel();
        let mut menu = Menu::new(session, Box::new(StaticCatalog(Vec::new())), BufReader::new(stdin).lines(), rx);

        tx.send(ShutdownSignal::Terminate).unwrap();
        assert_eq!(menu.run().await.unwrap(), MenuExit::Signal(ShutdownSignal::Terminate));
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_advance_happens_while_waiting_for_input() {
        let launcher = FakeLauncher::new();
        let session = PlaybackSession::new(launcher.clone(), PlaybackConfig::default());
        let (mut keyboard, stdin) = tokio::io::duplex(64);
        let (_tx, rx) = mpsc::unbounded_channel();
        let mut menu = Menu::new(session, Box::new(StaticCatalog(Vec::new())), BufReader::new(stdin).lines(), rx);

        menu.session_mut().load_playlist(sample_tracks(3), 0);
        menu.session_mut().play(0).unwrap();
        menu.session()
            .event_sender()
            .send(SessionEvent::ProcessExited { generation: 1, code: Some(0) })
            .unwrap();

        let typing = async {
            tokio::time::sleep(std::time::Duration::from_secs(3)).await;
            keyboard.write_all(b"7\n").await.unwrap();
        };
        let (exit, ()) = tokio::join!(menu.run(), typing);

        assert_eq!(exit.unwrap(), MenuExit::User);
        assert_eq!(launcher.launched_ids(), vec!["id0", "id1"]);
    }
}
