// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use atrium_app::{Project, ProjectDraft, ProjectId, Repository, RepositoryError};
use std::sync::{Mutex, MutexGuard};
use time::OffsetDateTime;
use tracing::debug;

const DEMO_PROJECTS: [(&str, &str); 7] = [
    ("Kitchen remodel", "New cabinets and countertops"),
    ("Roof repair", "Replace flashing around the chimney"),
    ("Garden beds", "Build three raised cedar beds"),
    ("Garage door", "Swap the opener and weather seal"),
    ("Basement damp", "Find the leak behind the water heater"),
    ("Porch paint", "Scrape, prime and repaint the railings"),
    ("Attic insulation", "Blow in cellulose to R-49"),
];

#[derive(Debug)]
struct MemoryState {
    rows: Vec<Project>,
    next_id: u64,
}

/// Project store living in process memory, behaving like the REST backend.
#[derive(Debug)]
pub struct MemoryProjectRepository {
    state: Mutex<MemoryState>,
}

impl Default for MemoryProjectRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProjectRepository {
    pub fn new() -> Self {
        Self::with_rows(Vec::new())
    }

    pub fn with_rows(rows: Vec<Project>) -> Self {
        let next_id = rows
            .iter()
            .filter_map(|row| row.id.as_str().parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        Self {
            state: Mutex::new(MemoryState { rows, next_id }),
        }
    }

    /// A handful of sample projects for `--demo`.
    pub fn demo() -> Self {
        let repository = Self::new();
        {
            let mut state = repository.lock();
            for (name, description) in DEMO_PROJECTS {
                state.insert(ProjectDraft::new(name, description));
            }
        }
        repository
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl MemoryState {
    fn insert(&mut self, draft: ProjectDraft) -> Project {
        let now = OffsetDateTime::now_utc();
        let project = Project {
            id: ProjectId::new(self.next_id.to_string()),
            name: draft.name,
            description: draft.description,
            created_at: now,
            updated_at: now,
        };
        self.next_id += 1;
        self.rows.push(project.clone());
        project
    }

    fn find_mut(&mut self, id: &ProjectId) -> Result<&mut Project, RepositoryError> {
        self.rows
            .iter_mut()
            .find(|row| row.id == *id)
            .ok_or_else(|| not_found(id))
    }
}

fn not_found(id: &ProjectId) -> RepositoryError {
    RepositoryError::NotFound(format!("Project {id} not found"))
}

fn validate(draft: &ProjectDraft) -> Result<(), RepositoryError> {
    if draft.name.is_empty() {
        return Err(RepositoryError::Validation("Name is required".to_owned()));
    }
    if draft.description.is_empty() {
        return Err(RepositoryError::Validation(
            "Description is required".to_owned(),
        ));
    }
    Ok(())
}

impl Repository<Project> for MemoryProjectRepository {
    fn list(&self) -> Result<Vec<Project>, RepositoryError> {
        Ok(self.lock().rows.clone())
    }

    fn get(&self, id: &ProjectId) -> Result<Project, RepositoryError> {
        let mut state = self.lock();
        state.find_mut(id).map(|row| row.clone())
    }

    fn create(&self, draft: &ProjectDraft) -> Result<Project, RepositoryError> {
        validate(draft)?;
        let created = self.lock().insert(draft.clone());
        debug!(id = %created.id, "memory project created");
        Ok(created)
    }

    fn update(&self, id: &ProjectId, draft: &ProjectDraft) -> Result<Project, RepositoryError> {
        validate(draft)?;
        let mut state = self.lock();
        let row = state.find_mut(id)?;
        row.name = draft.name.clone();
        row.description = draft.description.clone();
        row.updated_at = OffsetDateTime::now_utc().max(row.updated_at);
        Ok(row.clone())
    }

    fn delete(&self, id: &ProjectId) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        let before = state.rows.len();
        state.rows.retain(|row| row.id != *id);
        if state.rows.len() == before {
            return Err(not_found(id));
        }
        debug!(%id, "memory project deleted");
        Ok(())
    }
}
