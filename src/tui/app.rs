use std::path::PathBuf;

use crate::monitor::MonitorState;

#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Main,
    /// Directory prompt, the terminal's stand-in for the consent dialog.
    Prompt,
    About,
}

pub struct App {
    pub state: MonitorState,
    pub view: View,
    pub input: String,
    pub selected: usize,
    pub scroll_offset: usize,
    /// First song card shown in the media row.
    pub song_offset: usize,
    pub media_enabled: bool,
    pub should_quit: bool,
    /// Visible height of the file table (updated each frame by the renderer)
    pub visible_rows: usize,
}

impl App {
    pub fn new(media_enabled: bool) -> Self {
        Self {
            state: MonitorState::new(),
            view: View::Main,
            input: String::new(),
            selected: 0,
            scroll_offset: 0,
            song_offset: 0,
            media_enabled,
            should_quit: false,
            visible_rows: 10,
        }
    }

    /// Switch to the directory prompt, prefilled with the last granted directory.
    pub fn open_prompt(&mut self) {
        self.input = match self.state.directory() {
            Some(handle) => handle.path().display().to_string(),
            None => std::env::current_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        };
        self.view = View::Prompt;
    }

    /// Path typed into the prompt, if any.
    pub fn requested_path(&self) -> Option<PathBuf> {
        let trimmed = self.input.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(PathBuf::from(trimmed))
        }
    }

    /// Reset the per-scan view positions after a new grant.
    pub fn reset_for_scan(&mut self) {
        self.selected = 0;
        self.scroll_offset = 0;
        self.song_offset = 0;
        self.view = View::Main;
    }

    pub fn select_next(&mut self) {
        if !self.state.files().is_empty() {
            self.selected = (self.selected + 1).min(self.state.files().len() - 1);
            self.ensure_visible();
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
        self.ensure_visible();
    }

    /// Adjust scroll_offset so that self.selected is within the visible window.
    fn ensure_visible(&mut self) {
        if self.visible_rows == 0 {
            return;
        }
        if self.selected < self.scroll_offset {
            self.scroll_offset = self.selected;
        } else if self.selected >= self.scroll_offset + self.visible_rows {
            self.scroll_offset = self.selected - self.visible_rows + 1;
        }
    }

    pub fn songs_visible(&self) -> bool {
        self.media_enabled && !self.state.songs().is_empty()
    }

    pub fn scroll_songs_right(&mut self) {
        if self.song_offset + 1 < self.state.songs().len() {
            self.song_offset += 1;
        }
    }

    pub fn scroll_songs_left(&mut self) {
        self.song_offset = self.song_offset.saturating_sub(1);
    }

    /// Keep the media row in range when a newer result has fewer songs.
    pub fn clamp_song_offset(&mut self) {
        let len = self.state.songs().len();
        if self.song_offset >= len {
            self.song_offset = len.saturating_sub(1);
        }
    }
}
