//! App state and core application logic
//!
//! Three-level menu state machine: series, then seasons of a series, then
//! episodes of a season. [`App::apply`] performs one transition and returns
//! an [`Effect`] for the event loop to carry out (scan, play, quit), so the
//! machine itself never touches the terminal, the player or the filesystem.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::catalog::{Catalog, CatalogError};
use crate::models::LibraryItem;

/// Rows moved by page keys until the renderer reports the real height
const DEFAULT_VIEWPORT: usize = 10;

// =============================================================================
// Levels & Items
// =============================================================================

/// Current menu level
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Level {
    #[default]
    Series,
    Seasons {
        series: String,
    },
    Episodes {
        series: String,
        season: u32,
    },
}

impl Level {
    /// Heading shown in the title bar
    pub fn title(&self) -> &'static str {
        match self {
            Level::Series => "Series",
            Level::Seasons { .. } => "Seasons",
            Level::Episodes { .. } => "Episodes",
        }
    }

    /// Path from the root level, e.g. `Series › Show › Season 1`
    pub fn breadcrumb(&self) -> Vec<String> {
        let mut crumbs = vec!["Series".to_string()];
        match self {
            Level::Series => {}
            Level::Seasons { series } => crumbs.push(series.clone()),
            Level::Episodes { series, season } => {
                crumbs.push(series.clone());
                crumbs.push(format!("Season {}", season));
            }
        }
        crumbs
    }

    /// Enclosing level, `None` at the root
    pub fn parent(&self) -> Option<Level> {
        match self {
            Level::Series => None,
            Level::Seasons { .. } => Some(Level::Series),
            Level::Episodes { series, .. } => Some(Level::Seasons {
                series: series.clone(),
            }),
        }
    }
}

/// One selectable menu row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuItem {
    Series(String),
    Season(u32),
    Episode(LibraryItem),
}

impl MenuItem {
    pub fn label(&self) -> String {
        match self {
            MenuItem::Series(name) => name.clone(),
            MenuItem::Season(season) => format!("Season {}", season),
            MenuItem::Episode(item) => match item.episode_tag() {
                Some(tag) => format!("{}  {}", tag, item.file_name),
                None => item.file_name.clone(),
            },
        }
    }
}

// =============================================================================
// Menu Source
// =============================================================================

/// Data behind the three menu levels
pub trait MenuSource {
    type Error: std::fmt::Display;

    fn series(&self) -> Result<Vec<String>, Self::Error>;
    fn seasons(&self, series: &str) -> Result<Vec<u32>, Self::Error>;
    fn episodes(&self, series: &str, season: u32) -> Result<Vec<LibraryItem>, Self::Error>;
}

impl MenuSource for Catalog {
    type Error = CatalogError;

    fn series(&self) -> Result<Vec<String>, CatalogError> {
        self.find_series()
    }

    fn seasons(&self, series: &str) -> Result<Vec<u32>, CatalogError> {
        self.find_seasons(series)
    }

    fn episodes(&self, series: &str, season: u32) -> Result<Vec<LibraryItem>, CatalogError> {
        self.find_episodes(series, season)
    }
}

fn load<S: MenuSource>(level: &Level, source: &S) -> Result<Vec<MenuItem>, S::Error> {
    Ok(match level {
        Level::Series => source.series()?.into_iter().map(MenuItem::Series).collect(),
        Level::Seasons { series } => source
            .seasons(series)?
            .into_iter()
            .map(MenuItem::Season)
            .collect(),
        Level::Episodes { series, season } => source
            .episodes(series, *season)?
            .into_iter()
            .map(MenuItem::Episode)
            .collect(),
    })
}

// =============================================================================
// Selection State
// =============================================================================

/// Cursor and viewport over a list, wrapping at both ends
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListState {
    pub selected: usize,
    /// First row drawn
    pub offset: usize,
    pub len: usize,
}

impl ListState {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            ..Self::default()
        }
    }

    /// Move `by` rows forward or back, modulo the list length
    fn wrap(&mut self, by: usize, forward: bool) {
        let len = self.len;
        if len == 0 {
            return;
        }
        let by = by % len;
        self.selected = if forward {
            (self.selected + by) % len
        } else {
            (self.selected + len - by) % len
        };
    }

    pub fn up(&mut self) {
        self.wrap(1, false);
    }

    pub fn down(&mut self) {
        self.wrap(1, true);
    }

    pub fn page_up(&mut self, rows: usize) {
        self.wrap(rows.max(1), false);
    }

    pub fn page_down(&mut self, rows: usize) {
        self.wrap(rows.max(1), true);
    }

    /// Adjust `offset` so the cursor is one of the `rows` visible rows
    pub fn scroll_into_view(&mut self, rows: usize) {
        let lowest = (self.selected + 1).saturating_sub(rows.max(1));
        self.offset = lowest.max(self.offset.min(self.selected));
    }

    /// Resize after a reload; the cursor stays put unless it fell off the end
    pub fn set_len(&mut self, len: usize) {
        self.len = len;
        self.selected = self.selected.min(len.saturating_sub(1));
        if len == 0 {
            self.offset = 0;
        }
    }
}

// =============================================================================
// Actions & Effects
// =============================================================================

/// User intent, decoupled from the key that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveUp,
    MoveDown,
    PageUp,
    PageDown,
    Confirm,
    Back,
    Refresh,
    Quit,
}

impl Action {
    pub fn from_key(key: KeyEvent) -> Option<Action> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(Action::Quit);
        }
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => Some(Action::MoveDown),
            KeyCode::Up | KeyCode::Char('k') => Some(Action::MoveUp),
            KeyCode::PageDown => Some(Action::PageDown),
            KeyCode::PageUp => Some(Action::PageUp),
            KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => Some(Action::Confirm),
            KeyCode::Backspace | KeyCode::Left | KeyCode::Char('h') | KeyCode::Esc => {
                Some(Action::Back)
            }
            KeyCode::Char('u') | KeyCode::Char('r') => Some(Action::Refresh),
            KeyCode::Char('q') => Some(Action::Quit),
            _ => None,
        }
    }
}

/// Work the event loop must do after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    Play(LibraryItem),
    Refresh,
    Quit,
}

// =============================================================================
// Main Application State
// =============================================================================

/// Main application state
#[derive(Debug)]
pub struct App {
    pub level: Level,
    pub items: Vec<MenuItem>,
    pub list: ListState,
    /// Cursor of each ancestor level, innermost last
    parents: Vec<usize>,
    /// Visible list rows, as last reported by the renderer
    pub viewport: usize,
    /// Last status message (scan summary, playback notes, errors)
    pub status: Option<String>,
    pub running: bool,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: Level::Series,
            items: Vec::new(),
            list: ListState::default(),
            parents: Vec::new(),
            viewport: DEFAULT_VIEWPORT,
            status: None,
            running: true,
        }
    }
}

impl App {
    /// Start at the series list
    pub fn new<S: MenuSource>(source: &S) -> Self {
        let mut app = Self::default();
        app.reload(source);
        app
    }

    pub fn selected(&self) -> Option<&MenuItem> {
        self.items.get(self.list.selected)
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status = Some(msg.into());
    }

    /// Record the list height available on screen
    pub fn set_viewport(&mut self, height: usize) {
        self.viewport = height.max(1);
        self.list.scroll_into_view(self.viewport);
    }

    /// Map a key press to an action and apply it
    pub fn handle_key<S: MenuSource>(&mut self, key: KeyEvent, source: &S) -> Effect {
        match Action::from_key(key) {
            Some(action) => self.apply(action, source),
            None => Effect::None,
        }
    }

    /// Perform one transition
    pub fn apply<S: MenuSource>(&mut self, action: Action, source: &S) -> Effect {
        let effect = match action {
            Action::MoveUp => {
                self.list.up();
                Effect::None
            }
            Action::MoveDown => {
                self.list.down();
                Effect::None
            }
            Action::PageUp => {
                self.list.page_up(self.viewport);
                Effect::None
            }
            Action::PageDown => {
                self.list.page_down(self.viewport);
                Effect::None
            }
            Action::Confirm => self.confirm(source),
            Action::Back => {
                self.back(source);
                Effect::None
            }
            Action::Refresh => Effect::Refresh,
            Action::Quit => {
                self.running = false;
                Effect::Quit
            }
        };
        self.list.scroll_into_view(self.viewport);
        effect
    }

    /// Re-query the current level, keeping the cursor where it still fits
    pub fn reload<S: MenuSource>(&mut self, source: &S) {
        match load(&self.level, source) {
            Ok(items) => {
                self.list.set_len(items.len());
                self.items = items;
            }
            Err(e) => {
                self.items.clear();
                self.list.set_len(0);
                self.set_status(format!("error: {}", e));
            }
        }
        self.list.scroll_into_view(self.viewport);
    }

    fn confirm<S: MenuSource>(&mut self, source: &S) -> Effect {
        let child = match (self.selected(), &self.level) {
            (None, _) => return Effect::None,
            (Some(MenuItem::Episode(item)), _) => return Effect::Play(item.clone()),
            (Some(MenuItem::Series(name)), Level::Series) => Level::Seasons {
                series: name.clone(),
            },
            (Some(MenuItem::Season(season)), Level::Seasons { series }) => Level::Episodes {
                series: series.clone(),
                season: *season,
            },
            _ => return Effect::None,
        };

        match load(&child, source) {
            Ok(items) => {
                self.parents.push(self.list.selected);
                self.level = child;
                self.list = ListState::new(items.len());
                self.items = items;
            }
            Err(e) => self.set_status(format!("error: {}", e)),
        }
        Effect::None
    }

    fn back<S: MenuSource>(&mut self, source: &S) {
        let Some(parent) = self.level.parent() else {
            return;
        };
        let cursor = self.parents.pop().unwrap_or(0);

        self.level = parent;
        self.list = ListState {
            selected: cursor,
            offset: 0,
            len: 0,
        };
        self.reload(source);
    }
}
