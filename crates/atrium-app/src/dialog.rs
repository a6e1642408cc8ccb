// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::sync::Arc;
use tracing::debug;

use crate::forms::{DialogForm, FormGroup};
use crate::notify::Notifier;
use crate::query::{Invalidate, QueryKey};
use crate::repository::{Repository, RepositoryError};
use crate::Entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogAction {
    Create,
    Update,
}

impl DialogAction {
    pub const fn past_tense(self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Update => "updated",
        }
    }

    pub const fn verb(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogPhase {
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogContext {
    pub title: String,
    pub description: String,
    pub icon: &'static str,
}

impl DialogContext {
    pub fn for_action<E: Entity>(action: DialogAction) -> Self {
        match action {
            DialogAction::Create => Self {
                title: format!("Add {}", E::LABEL),
                description: format!(
                    "Fill in the {} details below to create a new entry.",
                    E::LABEL.to_lowercase()
                ),
                icon: "folder",
            },
            DialogAction::Update => Self {
                title: format!("Update {}", E::LABEL),
                description: format!(
                    "Update the {} information as needed and save your changes.",
                    E::LABEL.to_lowercase()
                ),
                icon: "folder",
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRequest<E: Entity> {
    Create(E::Draft),
    Update { id: E::Key, draft: E::Draft },
}

/// The per-entity half of a dialog: how to submit and what to invalidate.
pub trait Mutation<E: Entity>: Send + Sync {
    fn submit(&self, request: MutationRequest<E>) -> Result<E, RepositoryError>;

    fn invalidation_keys(&self) -> Vec<QueryKey>;
}

/// Submits through any repository and invalidates the entity's resource key.
pub struct RepositoryMutation<E: Entity> {
    repository: Arc<dyn Repository<E>>,
    keys: Vec<QueryKey>,
}

impl<E: Entity> RepositoryMutation<E> {
    pub fn new(repository: Arc<dyn Repository<E>>) -> Self {
        Self {
            repository,
            keys: vec![E::RESOURCE.to_owned()],
        }
    }

    pub fn with_keys(mut self, keys: Vec<QueryKey>) -> Self {
        self.keys = keys;
        self
    }
}

impl<E: Entity> Mutation<E> for RepositoryMutation<E> {
    fn submit(&self, request: MutationRequest<E>) -> Result<E, RepositoryError> {
        match request {
            MutationRequest::Create(draft) => self.repository.create(&draft),
            MutationRequest::Update { id, draft } => self.repository.update(&id, &draft),
        }
    }

    fn invalidation_keys(&self) -> Vec<QueryKey> {
        self.keys.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStep<E: Entity> {
    /// Client validation failed; every field is now touched.
    Invalid,
    /// A submission is already in flight.
    Busy,
    Submit(MutationRequest<E>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogStatus<E> {
    Open,
    Closed(Option<E>),
}

/// Shared create/update dialog state machine over one entity form group.
#[derive(Debug, Clone)]
pub struct MutationDialog<E: Entity> {
    action: DialogAction,
    context: DialogContext,
    form_key: String,
    form: DialogForm,
    bound: Option<E>,
    phase: DialogPhase,
    result: Option<E>,
    last_failure: Option<String>,
    patched: bool,
}

impl<E: Entity> MutationDialog<E> {
    pub fn create(form_key: impl Into<String>, context: DialogContext) -> Self {
        Self::open(DialogAction::Create, form_key.into(), context, None)
    }

    pub fn update(form_key: impl Into<String>, context: DialogContext, entity: E) -> Self {
        Self::open(DialogAction::Update, form_key.into(), context, Some(entity))
    }

    fn open(
        action: DialogAction,
        form_key: String,
        context: DialogContext,
        bound: Option<E>,
    ) -> Self {
        let form = DialogForm::with_group(&form_key, E::form_template());
        debug!(entity = E::LABEL, action = action.verb(), "dialog opened");
        Self {
            action,
            context,
            form_key,
            form,
            bound,
            phase: DialogPhase::Idle,
            result: None,
            last_failure: None,
            patched: false,
        }
    }

    pub fn action(&self) -> DialogAction {
        self.action
    }

    pub fn context(&self) -> &DialogContext {
        &self.context
    }

    pub fn form_key(&self) -> &str {
        &self.form_key
    }

    pub fn form(&self) -> &DialogForm {
        &self.form
    }

    pub fn bound(&self) -> Option<&E> {
        self.bound.as_ref()
    }

    pub fn phase(&self) -> DialogPhase {
        self.phase
    }

    pub fn is_pending(&self) -> bool {
        self.phase == DialogPhase::Submitting
    }

    pub fn result(&self) -> Option<&E> {
        self.result.as_ref()
    }

    pub fn last_failure(&self) -> Option<&str> {
        self.last_failure.as_deref()
    }

    pub fn group(&self) -> Option<&FormGroup> {
        self.form.group(&self.form_key)
    }

    pub fn set_field(&mut self, name: &str, value: impl Into<String>) -> bool {
        if self.is_pending() {
            return false;
        }
        self.clear_failure();
        self.form
            .group_mut(&self.form_key)
            .is_some_and(|group| group.set_value(name, value))
    }

    fn clear_failure(&mut self) {
        if self.phase == DialogPhase::Failed {
            self.phase = DialogPhase::Idle;
        }
    }

    /// Copies the bound entity into the form the first time the dialog is shown.
    pub fn on_display(&mut self) {
        if self.patched {
            return;
        }
        self.patched = true;
        if let (Some(entity), Some(group)) =
            (self.bound.as_ref(), self.form.group_mut(&self.form_key))
        {
            entity.patch_form(group);
        }
    }

    pub fn begin_save(&mut self) -> SaveStep<E> {
        if self.is_pending() {
            return SaveStep::Busy;
        }
        self.clear_failure();
        if !self.form.is_valid() {
            self.form.mark_all_as_touched();
            return SaveStep::Invalid;
        }

        let Some(group) = self.form.raw_value(&self.form_key) else {
            return SaveStep::Invalid;
        };
        let draft = E::draft_from_form(group);
        let request = match (&self.action, &self.bound) {
            (DialogAction::Update, Some(entity)) => MutationRequest::Update {
                id: entity.id().clone(),
                draft,
            },
            _ => MutationRequest::Create(draft),
        };
        self.phase = DialogPhase::Submitting;
        debug!(entity = E::LABEL, action = self.action.verb(), "dialog submitting");
        SaveStep::Submit(request)
    }

    pub fn finish_save(
        &mut self,
        outcome: Result<E, RepositoryError>,
        keys: &[QueryKey],
        cache: &mut dyn Invalidate,
        notifier: &mut dyn Notifier,
    ) -> DialogStatus<E> {
        if !self.is_pending() {
            return DialogStatus::Open;
        }
        match outcome {
            Ok(entity) => {
                cache.invalidate(keys);
                notifier.success(&format!(
                    "{} has been {}",
                    E::LABEL,
                    self.action.past_tense()
                ));
                self.phase = DialogPhase::Succeeded;
                self.result = Some(entity.clone());
                self.last_failure = None;
                self.form.detach(&self.form_key);
                DialogStatus::Closed(Some(entity))
            }
            Err(error) => {
                notifier.error(&format!(
                    "Failed to {} {}",
                    self.action.verb(),
                    E::LABEL.to_lowercase()
                ));
                self.last_failure = Some(error.message().to_owned());
                self.phase = DialogPhase::Failed;
                DialogStatus::Open
            }
        }
    }

    pub fn save(
        &mut self,
        mutation: &dyn Mutation<E>,
        cache: &mut dyn Invalidate,
        notifier: &mut dyn Notifier,
    ) -> DialogStatus<E> {
        match self.begin_save() {
            SaveStep::Submit(request) => {
                let outcome = mutation.submit(request);
                let keys = mutation.invalidation_keys();
                self.finish_save(outcome, &keys, cache, notifier)
            }
            SaveStep::Invalid | SaveStep::Busy => DialogStatus::Open,
        }
    }

    pub fn cancel(&mut self) -> DialogStatus<E> {
        self.form.detach(&self.form_key);
        DialogStatus::Closed(None)
    }
}

/// Destructive-action confirmation prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmDialog {
    pub title: String,
    pub description: String,
    pub proceed_text: String,
    pub cancel_text: String,
}

impl ConfirmDialog {
    pub fn delete<E: Entity>(name: &str) -> Self {
        Self {
            title: "Are you absolutely sure?".to_owned(),
            description: format!(
                "This action cannot be undone. This will permanently delete {}: \"{name}\".",
                E::LABEL.to_lowercase()
            ),
            proceed_text: "Delete".to_owned(),
            cancel_text: "Cancel".to_owned(),
        }
    }
}
