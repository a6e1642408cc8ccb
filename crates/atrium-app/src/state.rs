// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{AppMode, Section};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub mode: AppMode,
    pub section: Section,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            mode: AppMode::Nav,
            section: Section::Dashboard,
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    NextSection,
    PrevSection,
    OpenSection(Section),
    EditFilter,
    OpenDialog,
    OpenConfirm,
    ExitToNav,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ModeChanged(AppMode),
    SectionChanged(Section),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::NextSection => self.rotate_section(1),
            AppCommand::PrevSection => self.rotate_section(-1),
            AppCommand::OpenSection(section) => {
                if self.mode != AppMode::Nav || self.section == section {
                    return Vec::new();
                }
                self.section = section;
                vec![AppEvent::SectionChanged(section)]
            }
            AppCommand::EditFilter => self.enter_mode(AppMode::Filter),
            AppCommand::OpenDialog => self.enter_mode(AppMode::Dialog),
            AppCommand::OpenConfirm => self.enter_mode(AppMode::Confirm),
            AppCommand::ExitToNav => {
                self.mode = AppMode::Nav;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn enter_mode(&mut self, mode: AppMode) -> Vec<AppEvent> {
        if self.section != Section::Projects || self.mode != AppMode::Nav {
            return Vec::new();
        }
        self.mode = mode;
        vec![AppEvent::ModeChanged(mode)]
    }

    fn rotate_section(&mut self, delta: isize) -> Vec<AppEvent> {
        if self.mode != AppMode::Nav {
            return Vec::new();
        }
        let sections = Section::ALL;
        let current = sections
            .iter()
            .position(|section| *section == self.section)
            .unwrap_or(0) as isize;
        let len = sections.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.section = sections[next];
        vec![AppEvent::SectionChanged(self.section)]
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::{AppCommand, AppEvent, AppState};
    use crate::{AppMode, Section};

    #[test]
    fn section_rotation_wraps() {
        let mut state = AppState {
            section: Section::Projects,
            ..AppState::default()
        };

        let events = state.dispatch(AppCommand::NextSection);
        assert_eq!(state.section, Section::Dashboard);
        assert_eq!(events, vec![AppEvent::SectionChanged(Section::Dashboard)]);
    }

    #[test]
    fn modes_only_open_on_projects() {
        let mut state = AppState::default();
        assert!(state.dispatch(AppCommand::OpenDialog).is_empty());
        assert_eq!(state.mode, AppMode::Nav);

        state.dispatch(AppCommand::OpenSection(Section::Projects));
        let events = state.dispatch(AppCommand::OpenDialog);
        assert_eq!(events, vec![AppEvent::ModeChanged(AppMode::Dialog)]);

        assert!(state.dispatch(AppCommand::NextSection).is_empty());
        assert!(state.dispatch(AppCommand::EditFilter).is_empty());

        state.dispatch(AppCommand::ExitToNav);
        assert_eq!(state.mode, AppMode::Nav);
    }

    #[test]
    fn status_set_and_clear() {
        let mut state = AppState::default();
        let events = state.dispatch(AppCommand::SetStatus("Project has been created".to_owned()));
        assert_eq!(
            events,
            vec![AppEvent::StatusUpdated("Project has been created".to_owned())]
        );
        assert_eq!(state.status_line.as_deref(), Some("Project has been created"));

        state.dispatch(AppCommand::ClearStatus);
        assert!(state.status_line.is_none());
    }
}
