// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod memory;

pub use memory::MemoryProjectRepository;

use anyhow::{Context, Result, bail};
use atrium_app::{Entity, Repository, RepositoryError};
use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// REST repository for one entity kind, rooted at `{base_url}/{E::RESOURCE}`.
pub struct HttpRepository<E> {
    base_url: String,
    timeout: Duration,
    http: HttpClient,
    entity: PhantomData<fn() -> E>,
}

impl<E> Clone for HttpRepository<E> {
    fn clone(&self) -> Self {
        Self {
            base_url: self.base_url.clone(),
            timeout: self.timeout,
            http: self.http.clone(),
            entity: PhantomData,
        }
    }
}

impl<E> fmt::Debug for HttpRepository<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRepository")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl<E: Entity> HttpRepository<E> {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("api.base_url must not be empty");
        }
        let parsed = Url::parse(&base_url)
            .with_context(|| format!("api.base_url {base_url:?} is not a valid URL"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "api.base_url must use http or https, got {:?}",
                parsed.scheme()
            );
        }
        if timeout.is_zero() {
            bail!("api.timeout must be positive");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
            entity: PhantomData,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn collection_url(&self) -> String {
        resolve_url(&self.base_url, E::RESOURCE)
    }

    /// The id is pushed as a single path segment, so `/`, `?` and `#` in an
    /// id are percent-encoded instead of reshaping the request target.
    fn item_url(&self, id: &E::Key) -> Result<String, RepositoryError> {
        let collection = self.collection_url();
        let mut url = Url::parse(&collection).map_err(|error| {
            RepositoryError::Transport(format!("invalid request url {collection:?}: {error}"))
        })?;
        url.path_segments_mut()
            .map_err(|()| {
                RepositoryError::Transport(format!("{collection:?} cannot take path segments"))
            })?
            .push(&id.to_string());
        Ok(url.into())
    }

    fn send<B: serde::Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<Response, RepositoryError> {
        debug!(%method, url, "repository request");
        let mut request = self.http.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().map_err(|error| {
            let error = connection_error(url, error);
            warn!(%method, url, %error, "repository request failed");
            error
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let error = clean_error_response(status, &body);
            warn!(%method, url, status = status.as_u16(), %error, "repository request rejected");
            return Err(error);
        }
        Ok(response)
    }

    fn send_empty(&self, method: Method, url: &str) -> Result<Response, RepositoryError> {
        self.send::<()>(method, url, None)
    }
}

impl<E: Entity> Repository<E> for HttpRepository<E> {
    fn list(&self) -> Result<Vec<E>, RepositoryError> {
        let response = self.send_empty(Method::GET, &self.collection_url())?;
        decode(response, E::RESOURCE)
    }

    fn get(&self, id: &E::Key) -> Result<E, RepositoryError> {
        let response = self.send_empty(Method::GET, &self.item_url(id)?)?;
        decode(response, E::LABEL)
    }

    fn create(&self, draft: &E::Draft) -> Result<E, RepositoryError> {
        let response = self.send(Method::POST, &self.collection_url(), Some(draft))?;
        decode(response, E::LABEL)
    }

    fn update(&self, id: &E::Key, draft: &E::Draft) -> Result<E, RepositoryError> {
        let response = self.send(Method::PUT, &self.item_url(id)?, Some(draft))?;
        decode(response, E::LABEL)
    }

    fn delete(&self, id: &E::Key) -> Result<(), RepositoryError> {
        self.send_empty(Method::DELETE, &self.item_url(id)?)?;
        Ok(())
    }
}

/// Joins a request path onto the base URL. Absolute http(s) URLs pass
/// through untouched.
pub fn resolve_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_owned();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    message: Option<String>,
}

/// First line of a `{"message": ...}` error body, if there is one.
pub fn extract_error_message(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok()?;
    let message = parsed.message?;
    let first = message.trim().lines().next()?.trim();
    if first.is_empty() {
        return None;
    }
    Some(first.to_owned())
}

fn clean_error_response(status: StatusCode, body: &str) -> RepositoryError {
    RepositoryError::from_status(status.as_u16(), extract_error_message(body))
}

fn connection_error(url: &str, error: reqwest::Error) -> RepositoryError {
    if error.is_timeout() {
        return RepositoryError::Transport(format!("request to {url} timed out"));
    }
    RepositoryError::Transport(format!("cannot reach {url} ({error})"))
}

fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, RepositoryError> {
    response
        .json()
        .map_err(|error| RepositoryError::Transport(format!("decode {what} response: {error}")))
}

#[cfg(test)]
mod tests {
    use super::{HttpRepository, clean_error_response, extract_error_message, resolve_url};
    use atrium_app::{Project, RepositoryError};
    use reqwest::StatusCode;
    use std::time::Duration;

    #[test]
    fn resolve_url_joins_relative_paths() {
        assert_eq!(
            resolve_url("http://api.test/", "/projects"),
            "http://api.test/projects"
        );
        assert_eq!(
            resolve_url("http://api.test", "projects/7"),
            "http://api.test/projects/7"
        );
    }

    #[test]
    fn resolve_url_passes_absolute_urls_through() {
        assert_eq!(
            resolve_url("http://api.test", "https://other.test/projects"),
            "https://other.test/projects"
        );
    }

    #[test]
    fn extract_error_message_takes_first_trimmed_line() {
        assert_eq!(
            extract_error_message(r#"{"message":"  Name taken\nstack trace"}"#).as_deref(),
            Some("Name taken")
        );
        assert_eq!(extract_error_message(r#"{"message":"   "}"#), None);
        assert_eq!(extract_error_message(r#"{"message":42}"#), None);
        assert_eq!(extract_error_message("<html>bad gateway</html>"), None);
        assert_eq!(extract_error_message(""), None);
    }

    #[test]
    fn status_bands_map_to_error_kinds() {
        assert_eq!(
            clean_error_response(StatusCode::UNPROCESSABLE_ENTITY, r#"{"message":"bad"}"#),
            RepositoryError::Validation("bad".to_owned())
        );
        assert_eq!(
            clean_error_response(StatusCode::NOT_FOUND, ""),
            RepositoryError::NotFound("request failed with status 404".to_owned())
        );
        assert_eq!(
            clean_error_response(StatusCode::BAD_GATEWAY, "oops"),
            RepositoryError::Network {
                status: 502,
                message: "request failed with status 502".to_owned(),
            }
        );
    }

    #[test]
    fn new_rejects_bad_base_urls() {
        let timeout = Duration::from_secs(1);
        assert!(HttpRepository::<Project>::new("", timeout).is_err());
        assert!(HttpRepository::<Project>::new("ftp://files.test", timeout).is_err());
        assert!(HttpRepository::<Project>::new("not a url", timeout).is_err());
        assert!(HttpRepository::<Project>::new("http://api.test", Duration::ZERO).is_err());

        let repository = HttpRepository::<Project>::new("http://api.test/v1/", timeout)
            .expect("valid base url");
        assert_eq!(repository.base_url(), "http://api.test/v1");
    }
}
