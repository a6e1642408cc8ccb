// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use atrium_app::{Notifier, Project, ProjectDraft, ProjectId, Repository, RepositoryError};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::thread;
use time::{Duration, OffsetDateTime};

const NAMES: [&str; 8] = [
    "Garden",
    "Kitchen",
    "Roof",
    "Garage",
    "Porch",
    "Basement",
    "Attic",
    "Fence",
];

const VERBS: [&str; 4] = ["Remodel", "Repair", "Inspect", "Repaint"];

pub fn epoch() -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH + Duration::days(20_000)
}

pub fn project(id: &str, name: &str, description: &str) -> Project {
    Project {
        id: ProjectId::new(id),
        name: name.to_owned(),
        description: description.to_owned(),
        created_at: epoch(),
        updated_at: epoch(),
    }
}

/// Deterministic project rows with ids "1".."n".
pub fn projects(count: usize) -> Vec<Project> {
    (0..count)
        .map(|index| {
            let name = NAMES[index % NAMES.len()];
            let verb = VERBS[index % VERBS.len()];
            let mut row = project(
                &(index + 1).to_string(),
                &format!("{name} {}", index + 1),
                &format!("{verb} the {}", name.to_lowercase()),
            );
            row.updated_at = epoch() + Duration::hours(index as i64);
            row
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List,
    Get(ProjectId),
    Create(ProjectDraft),
    Update(ProjectId, ProjectDraft),
    Delete(ProjectId),
}

#[derive(Debug, Default)]
struct ScriptState {
    rows: Vec<Project>,
    next_id: u64,
    calls: Vec<Call>,
    failures: VecDeque<RepositoryError>,
    list_delay: Option<std::time::Duration>,
}

/// In-memory repository that records every call and fails on demand.
#[derive(Debug, Default)]
pub struct ScriptedRepository {
    state: Mutex<ScriptState>,
}

impl ScriptedRepository {
    pub fn with_rows(rows: Vec<Project>) -> Self {
        let next_id = rows.len() as u64 + 1;
        Self {
            state: Mutex::new(ScriptState {
                rows,
                next_id,
                ..ScriptState::default()
            }),
        }
    }

    /// Queues an error returned by the next call, whatever it is.
    pub fn fail_next(&self, error: RepositoryError) {
        self.lock().failures.push_back(error);
    }

    /// Makes every later `list` sleep first, like a slow server.
    pub fn delay_lists(&self, delay: std::time::Duration) {
        self.lock().list_delay = Some(delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn rows(&self) -> Vec<Project> {
        self.lock().rows.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn record(&self, call: Call) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        state.calls.push(call);
        match state.failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Repository<Project> for ScriptedRepository {
    fn list(&self) -> Result<Vec<Project>, RepositoryError> {
        let delay = self.lock().list_delay;
        if let Some(delay) = delay {
            thread::sleep(delay);
        }
        self.record(Call::List)?;
        Ok(self.rows())
    }

    fn get(&self, id: &ProjectId) -> Result<Project, RepositoryError> {
        self.record(Call::Get(id.clone()))?;
        self.rows()
            .into_iter()
            .find(|row| row.id == *id)
            .ok_or_else(|| RepositoryError::NotFound(format!("project {id} not found")))
    }

    fn create(&self, draft: &ProjectDraft) -> Result<Project, RepositoryError> {
        self.record(Call::Create(draft.clone()))?;
        let mut state = self.lock();
        let id = state.next_id.to_string();
        state.next_id += 1;
        let created = project(&id, &draft.name, &draft.description);
        state.rows.push(created.clone());
        Ok(created)
    }

    fn update(&self, id: &ProjectId, draft: &ProjectDraft) -> Result<Project, RepositoryError> {
        self.record(Call::Update(id.clone(), draft.clone()))?;
        let mut state = self.lock();
        let row = state
            .rows
            .iter_mut()
            .find(|row| row.id == *id)
            .ok_or_else(|| RepositoryError::NotFound(format!("project {id} not found")))?;
        row.name = draft.name.clone();
        row.description = draft.description.clone();
        row.updated_at += Duration::minutes(1);
        Ok(row.clone())
    }

    fn delete(&self, id: &ProjectId) -> Result<(), RepositoryError> {
        self.record(Call::Delete(id.clone()))?;
        let mut state = self.lock();
        let before = state.rows.len();
        state.rows.retain(|row| row.id != *id);
        if state.rows.len() == before {
            return Err(RepositoryError::NotFound(format!("project {id} not found")));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingNotifier {
    pub successes: Vec<String>,
    pub errors: Vec<String>,
}

impl Notifier for RecordingNotifier {
    fn success(&mut self, text: &str) {
        self.successes.push(text.to_owned());
    }

    fn error(&mut self, text: &str) {
        self.errors.push(text.to_owned());
    }
}
