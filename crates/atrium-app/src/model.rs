// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

use crate::forms::FormGroup;
use crate::ids::*;
use crate::table::{CellValue, TableRow};

/// A server-owned record kind managed through a repository, a table and the
/// create/update dialogs.
///
/// The row key doubles as the entity id.
pub trait Entity:
    TableRow + Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    type Draft: Clone + fmt::Debug + PartialEq + Eq + Serialize + Send + Sync + 'static;

    /// Human label used in dialog titles and notifications, e.g. "Project".
    const LABEL: &'static str;
    /// REST collection segment and default cache key, e.g. "projects".
    const RESOURCE: &'static str;

    fn id(&self) -> &Self::Key;

    fn form_template() -> FormGroup;

    fn patch_form(&self, group: &mut FormGroup);

    fn draft_from_form(group: &FormGroup) -> Self::Draft;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDraft {
    pub name: String,
    pub description: String,
}

impl ProjectDraft {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

impl TableRow for Project {
    type Key = ProjectId;

    fn row_key(&self) -> ProjectId {
        self.id.clone()
    }

    fn cell(&self, accessor: &str) -> CellValue {
        match accessor {
            "id" => CellValue::Text(self.id.to_string()),
            "name" => CellValue::Text(self.name.clone()),
            "description" => CellValue::Text(self.description.clone()),
            "createdAt" => CellValue::Timestamp(self.created_at),
            "updatedAt" => CellValue::Timestamp(self.updated_at),
            _ => CellValue::Empty,
        }
    }
}

impl Entity for Project {
    type Draft = ProjectDraft;

    const LABEL: &'static str = "Project";
    const RESOURCE: &'static str = "projects";

    fn id(&self) -> &ProjectId {
        &self.id
    }

    fn form_template() -> FormGroup {
        FormGroup::new()
            .hidden("id")
            .required("name", "Name")
            .required("description", "Description")
            .hidden("createdAt")
            .hidden("updatedAt")
    }

    fn patch_form(&self, group: &mut FormGroup) {
        group.patch([
            ("id", self.id.to_string()),
            ("name", self.name.clone()),
            ("description", self.description.clone()),
            ("createdAt", format_timestamp(self.created_at)),
            ("updatedAt", format_timestamp(self.updated_at)),
        ]);
    }

    fn draft_from_form(group: &FormGroup) -> ProjectDraft {
        ProjectDraft {
            name: group.value("name").to_owned(),
            description: group.value("description").to_owned(),
        }
    }
}

pub fn format_timestamp(value: OffsetDateTime) -> String {
    value
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| value.unix_timestamp().to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Section {
    Dashboard,
    Projects,
}

impl Section {
    pub const ALL: [Self; 2] = [Self::Dashboard, Self::Projects];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::Projects => "Projects",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppMode {
    Nav,
    Filter,
    Dialog,
    Confirm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}
