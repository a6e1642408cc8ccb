// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::config::Config;
use anyhow::{Context, Result};
use atrium_api::{HttpRepository, MemoryProjectRepository};
use atrium_app::{PageSize, Project, Repository};
use std::sync::Arc;
use tracing::info;

pub struct ApiRuntime {
    projects: Arc<dyn Repository<Project>>,
    page_size: PageSize,
    show_dashboard: bool,
}

impl ApiRuntime {
    pub fn new(projects: Arc<dyn Repository<Project>>, config: &Config) -> Self {
        Self {
            projects,
            page_size: config.page_size(),
            show_dashboard: config.show_dashboard(),
        }
    }

    pub fn http(config: &Config) -> Result<Self> {
        let base_url = config.api_base_url();
        let repository = HttpRepository::<Project>::new(&base_url, config.api_timeout()?)
            .with_context(|| {
                format!("invalid [api] config; fix base_url/timeout or ATRIUM_API_URL ({base_url})")
            })?;
        info!(base_url, "using REST backend");
        Ok(Self::new(Arc::new(repository), config))
    }

    pub fn demo(config: &Config) -> Self {
        info!("using in-memory demo backend");
        Self::new(Arc::new(MemoryProjectRepository::demo()), config)
    }

    /// Lists projects once so `--check` proves the backend answers.
    pub fn check(&self) -> Result<usize> {
        let projects = self
            .projects
            .list()
            .context("list projects from the configured backend")?;
        Ok(projects.len())
    }
}

impl atrium_tui::AppRuntime for ApiRuntime {
    fn projects(&self) -> Arc<dyn Repository<Project>> {
        Arc::clone(&self.projects)
    }

    fn page_size(&self) -> PageSize {
        self.page_size
    }

    fn show_dashboard(&self) -> bool {
        self.show_dashboard
    }
}
