// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tracing::info;

use crate::dialog::{ConfirmDialog, DialogAction, DialogContext, MutationDialog};
use crate::notify::Notifier;
use crate::query::{EntityQuery, Invalidate, QueryKey};
use crate::repository::{Repository, RepositoryError};
use crate::table::{ACTION_COLUMN, ColumnDef, PageSize, SELECT_COLUMN, TableEngine};
use crate::{Entity, Project};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    Update,
    Delete,
}

impl RowAction {
    pub const ALL: [Self; 2] = [Self::Update, Self::Delete];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Update => "Update",
            Self::Delete => "Delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Failed(RepositoryError),
}

pub fn project_columns() -> Vec<ColumnDef> {
    vec![
        ColumnDef::display(SELECT_COLUMN, ""),
        ColumnDef::data("name", "Name"),
        ColumnDef::data("description", "Description"),
        ColumnDef::display(ACTION_COLUMN, ""),
    ]
}

/// Table over a cached entity collection plus the row-level actions that
/// mutate it through the repository.
#[derive(Debug, Clone)]
pub struct EntityList<E: Entity> {
    query: EntityQuery<E>,
    table: TableEngine<E>,
    form_key: String,
}

impl EntityList<Project> {
    pub fn projects(page_size: PageSize) -> Self {
        Self::new(project_columns(), page_size)
    }
}

impl<E: Entity> EntityList<E> {
    pub fn new(columns: Vec<ColumnDef>, page_size: PageSize) -> Self {
        Self {
            query: EntityQuery::new(E::RESOURCE),
            table: TableEngine::new(columns).with_page_size(page_size),
            form_key: E::LABEL.to_owned(),
        }
    }

    pub fn query(&self) -> &EntityQuery<E> {
        &self.query
    }

    pub fn table(&self) -> &TableEngine<E> {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut TableEngine<E> {
        &mut self.table
    }

    pub fn invalidation_keys(&self) -> Vec<QueryKey> {
        vec![self.query.key().to_owned()]
    }

    /// Refetches when invalidated and hands the snapshot to the table.
    pub fn sync(&mut self, repository: &dyn Repository<E>) -> Result<bool, RepositoryError> {
        let refreshed = self.query.refresh(repository)?;
        if refreshed {
            self.table.set_data(self.query.data().to_vec());
        }
        Ok(refreshed)
    }

    /// Starts a background refresh when the query is stale and idle.
    pub fn begin_sync(&mut self) -> bool {
        self.query.begin_fetch()
    }

    /// Applies a background refresh and hands the snapshot to the table.
    pub fn finish_sync(
        &mut self,
        outcome: Result<Vec<E>, RepositoryError>,
        attempts: usize,
    ) -> Result<(), RepositoryError> {
        self.query.finish_fetch(outcome, attempts)?;
        self.table.set_data(self.query.data().to_vec());
        Ok(())
    }

    pub fn open_create(&self) -> MutationDialog<E> {
        MutationDialog::create(
            self.form_key.clone(),
            DialogContext::for_action::<E>(DialogAction::Create),
        )
    }

    pub fn open_update(&self, entity: &E) -> MutationDialog<E> {
        MutationDialog::update(
            self.form_key.clone(),
            DialogContext::for_action::<E>(DialogAction::Update),
            entity.clone(),
        )
    }

    pub fn request_delete(&self, name: &str) -> ConfirmDialog {
        ConfirmDialog::delete::<E>(name)
    }

    /// Deletes after confirmation. The row stays until the refetch.
    pub fn delete(
        &mut self,
        id: &E::Key,
        repository: &dyn Repository<E>,
        notifier: &mut dyn Notifier,
    ) -> DeleteOutcome {
        let outcome = repository.delete(id);
        self.finish_delete(outcome, notifier)
    }

    pub fn finish_delete(
        &mut self,
        outcome: Result<(), RepositoryError>,
        notifier: &mut dyn Notifier,
    ) -> DeleteOutcome {
        match outcome {
            Ok(()) => {
                let keys = self.invalidation_keys();
                self.query.invalidate(&keys);
                notifier.success(&format!("{} has been deleted", E::LABEL));
                info!(entity = E::LABEL, "entity deleted");
                DeleteOutcome::Deleted
            }
            Err(error) => {
                notifier.error(&format!("Failed to delete {}", E::LABEL.to_lowercase()));
                DeleteOutcome::Failed(error)
            }
        }
    }
}

impl<E: Entity> Invalidate for EntityList<E> {
    fn invalidate(&mut self, keys: &[QueryKey]) {
        self.query.invalidate(keys);
    }
}
