/// Top-level menu entries, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Search,
    ShowPlaylist,
    NowPlaying,
    NextTrack,
    PreviousTrack,
    Stop,
    Exit,
}

impl MenuChoice {
    pub const ALL: [MenuChoice; 7] = [
        MenuChoice::Search,
        MenuChoice::ShowPlaylist,
        MenuChoice::NowPlaying,
        MenuChoice::NextTrack,
        MenuChoice::PreviousTrack,
        MenuChoice::Stop,
        MenuChoice::Exit,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MenuChoice::Search => "Search and play music",
            MenuChoice::ShowPlaylist => "Show current playlist",
            MenuChoice::NowPlaying => "Now playing",
            MenuChoice::NextTrack => "Play next track",
            MenuChoice::PreviousTrack => "Play previous track",
            MenuChoice::Stop => "Stop playback",
            MenuChoice::Exit => "Exit",
        }
    }

    /// Accepts the entry number or a short keyword
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim().to_lowercase();

        if let Ok(number) = input.parse::<usize>() {
            return number.checked_sub(1).and_then(|i| Self::ALL.get(i)).copied();
        }

        match input.as_str() {
            "search" | "/" => Some(MenuChoice::Search),
            "list" | "playlist" | "l" => Some(MenuChoice::ShowPlaylist),
            "now" | "i" => Some(MenuChoice::NowPlaying),
            "next" | "n" => Some(MenuChoice::NextTrack),
            "prev" | "previous" | "b" => Some(MenuChoice::PreviousTrack),
            "stop" | "s" => Some(MenuChoice::Stop),
            "exit" | "quit" | "q" => Some(MenuChoice::Exit),
            _ => None,
        }
    }
}

/// Answer to the result chooser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Track(usize),
    Cancel,
}

impl Selection {
    /// `0` cancels, `1..=count` picks a result
    pub fn parse(input: &str, count: usize) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "c" | "cancel" => return Some(Selection::Cancel),
            _ => {}
        }

        match input.trim().parse::<usize>().ok()? {
            0 => Some(Selection::Cancel),
            n if n <= count => Some(Selection::Track(n - 1)),
            _ => None,
        }
    }
}
