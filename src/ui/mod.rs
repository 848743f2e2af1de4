// Terminal UI - line-based menu on stdin/stdout
// Colors come from crossterm; there is no full-screen mode.

pub mod events; // menu choices and result selection parsing
pub mod menu;   // the interactive loop

pub use events::{MenuChoice, Selection};
pub use menu::{Menu, MenuExit, SearchOutcome};
