//! View state carried by page models: theme and sidebar.
//!
//! Both are plain values updated through `reduce`, never mutated in place.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "system" => Ok(Theme::System),
            other => Err(format!("unknown theme: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "theme", rename_all = "snake_case")]
pub enum ThemeAction {
    Set(Theme),
    /// Light and dark swap; `system` resolves to dark.
    Toggle,
}

pub fn reduce_theme(state: Theme, action: ThemeAction) -> Theme {
    match action {
        ThemeAction::Set(theme) => theme,
        ThemeAction::Toggle => match state {
            Theme::Dark => Theme::Light,
            Theme::Light | Theme::System => Theme::Dark,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidebarState {
    pub open: bool,
    pub collapsed: bool,
}

impl Default for SidebarState {
    fn default() -> Self {
        Self {
            open: true,
            collapsed: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SidebarAction {
    Open,
    Close,
    Toggle,
    Collapse,
    Expand,
}

pub fn reduce_sidebar(state: SidebarState, action: SidebarAction) -> SidebarState {
    match action {
        SidebarAction::Open => SidebarState { open: true, ..state },
        SidebarAction::Close => SidebarState { open: false, ..state },
        SidebarAction::Toggle => SidebarState {
            open: !state.open,
            ..state
        },
        SidebarAction::Collapse => SidebarState {
            collapsed: true,
            ..state
        },
        SidebarAction::Expand => SidebarState {
            collapsed: false,
            ..state
        },
    }
}
