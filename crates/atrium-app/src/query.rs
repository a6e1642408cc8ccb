// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tracing::{debug, warn};

use crate::Entity;
use crate::repository::{Repository, RepositoryError};

pub type QueryKey = String;

/// Marks cached queries stale so they are refetched before next use.
pub trait Invalidate {
    fn invalidate(&mut self, keys: &[QueryKey]);
}

const FETCH_ATTEMPTS: usize = 2;

/// Lists through `repository`, retrying once. Returns the outcome and the
/// number of attempts made. Safe to run off the UI thread.
pub fn fetch_with_retry<E: Entity>(
    key: &str,
    repository: &dyn Repository<E>,
) -> (Result<Vec<E>, RepositoryError>, usize) {
    let mut last_error = None;
    for attempt in 1..=FETCH_ATTEMPTS {
        match repository.list() {
            Ok(data) => {
                debug!(key, rows = data.len(), attempt, "query fetched");
                return (Ok(data), attempt);
            }
            Err(error) => {
                warn!(key, attempt, %error, "query fetch failed");
                last_error = Some(error);
            }
        }
    }
    let error = last_error
        .unwrap_or_else(|| RepositoryError::Transport("no fetch attempted".to_owned()));
    (Err(error), FETCH_ATTEMPTS)
}

/// Cached entity collection keyed by `key`. Starts empty and stale.
///
/// Every invalidation bumps a generation counter. A background fetch records
/// the generation it started under, and its result only clears the stale
/// flag if nothing was invalidated while it ran.
#[derive(Debug, Clone)]
pub struct EntityQuery<E: Entity> {
    key: QueryKey,
    data: Vec<E>,
    stale: bool,
    fetch_count: usize,
    generation: u64,
    in_flight: Option<u64>,
}

impl<E: Entity> EntityQuery<E> {
    pub fn new(key: impl Into<QueryKey>) -> Self {
        Self {
            key: key.into(),
            data: Vec::new(),
            stale: true,
            fetch_count: 0,
            generation: 0,
            in_flight: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn data(&self) -> &[E] {
        &self.data
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Fetches when stale. Returns whether the data changed hands. On failure
    /// the previous snapshot is kept and the query stays stale.
    pub fn refresh(&mut self, repository: &dyn Repository<E>) -> Result<bool, RepositoryError> {
        if !self.stale {
            return Ok(false);
        }
        self.refetch(repository)?;
        Ok(true)
    }

    pub fn refetch(&mut self, repository: &dyn Repository<E>) -> Result<(), RepositoryError> {
        let (outcome, attempts) = fetch_with_retry(&self.key, repository);
        self.fetch_count += attempts;
        self.data = outcome?;
        self.stale = false;
        Ok(())
    }

    /// Claims the next background fetch. False when fresh or already fetching.
    pub fn begin_fetch(&mut self) -> bool {
        if !self.stale || self.in_flight.is_some() {
            return false;
        }
        self.in_flight = Some(self.generation);
        true
    }

    /// Applies a background fetch. Data is replaced on success, but the query
    /// stays stale if it was invalidated after the fetch began.
    pub fn finish_fetch(
        &mut self,
        outcome: Result<Vec<E>, RepositoryError>,
        attempts: usize,
    ) -> Result<(), RepositoryError> {
        let started = self.in_flight.take();
        self.fetch_count += attempts;
        self.data = outcome?;
        self.stale = started.is_some_and(|generation| generation != self.generation);
        debug!(key = %self.key, rows = self.data.len(), stale = self.stale, "query refreshed");
        Ok(())
    }
}

impl<E: Entity> Invalidate for EntityQuery<E> {
    fn invalidate(&mut self, keys: &[QueryKey]) {
        if keys.iter().any(|key| *key == self.key) {
            self.stale = true;
            self.generation += 1;
        }
    }
}

/// Records requested keys; useful where no cache is mounted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationLog {
    pub requested: Vec<QueryKey>,
}

impl Invalidate for InvalidationLog {
    fn invalidate(&mut self, keys: &[QueryKey]) {
        self.requested.extend(keys.iter().cloned());
    }
}
