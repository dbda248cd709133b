//! GitHub profile lookups and public IP.

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::constants::constants;
use crate::error::RemoteError;

/// Raw HTTP response as far as this module cares.
#[derive(Debug, Clone)]
pub struct HttpResponse {
  pub status: u16,
  pub body: String,
}

/// GET-only transport so the client can be driven by a fake in tests.
pub trait Transport {
  async fn get(&self, url: &str) -> Result<HttpResponse, RemoteError>;
}

pub struct HttpTransport {
  client: Client,
}

impl HttpTransport {
  pub fn new() -> Result<Self, RemoteError> {
    let client = Client::builder()
      .user_agent(&constants().user_agent)
      .timeout(Duration::from_secs(10))
      .build()
      .map_err(|e| RemoteError::Network(e.to_string()))?;
    Ok(Self { client })
  }
}

impl Transport for HttpTransport {
  async fn get(&self, url: &str) -> Result<HttpResponse, RemoteError> {
    let response = self.client.get(url).send().await.map_err(|e| RemoteError::Network(e.to_string()))?;
    let status = response.status().as_u16();
    let body = response.text().await.map_err(|e| RemoteError::Network(e.to_string()))?;
    Ok(HttpResponse { status, body })
  }
}

// --- Payloads ---

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Profile {
  pub avatar_url: Option<String>,
  pub name: Option<String>,
  pub followers: Option<u64>,
  pub following: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Repository {
  pub name: Option<String>,
  pub html_url: Option<String>,
  pub fork: Option<bool>,
  pub stargazers_count: Option<u64>,
  pub forks_count: Option<u64>,
}

/// Drop forks, order by stars (missing = 0, ties keep input order), keep `limit`.
pub fn rank_repositories(repos: &[Repository], limit: usize) -> Vec<Repository> {
  let mut top: Vec<Repository> = repos.iter().filter(|r| r.fork != Some(true)).cloned().collect();
  top.sort_by_key(|r| std::cmp::Reverse(r.stargazers_count.unwrap_or(0)));
  top.truncate(limit);
  top
}

// --- Client ---

/// Fetches and caches the profile owner's GitHub data.
///
/// Only validated bodies are cached, keyed by URL. Two lookups of the same
/// URL that are in flight at once both hit the network.
pub struct ProfileClient<T: Transport> {
  transport: T,
  api_base: String,
  api_user: String,
  users: RefCell<HashMap<String, Profile>>,
  repos: RefCell<HashMap<String, Vec<Repository>>>,
}

impl<T: Transport> ProfileClient<T> {
  pub fn new(transport: T, api_base: impl Into<String>, api_user: impl Into<String>) -> Self {
    Self {
      transport,
      api_base: api_base.into(),
      api_user: api_user.into(),
      users: RefCell::new(HashMap::new()),
      repos: RefCell::new(HashMap::new()),
    }
  }

  #[cfg(test)]
  pub fn transport(&self) -> &T {
    &self.transport
  }

  fn user_url(&self) -> String {
    format!("{}/users/{}", self.api_base, self.api_user)
  }

  fn repos_url(&self) -> String {
    format!("{}/users/{}/repos?per_page=12&sort=updated", self.api_base, self.api_user)
  }

  async fn fetch<P: DeserializeOwned>(&self, url: &str) -> Result<P, RemoteError> {
    debug!(url = %url, "remote: GET");
    let response = self.transport.get(url).await?;
    if !(200..300).contains(&response.status) {
      warn!(url = %url, status = response.status, "remote: non-success status");
      return Err(RemoteError::Status { url: url.to_string(), status: response.status });
    }
    serde_json::from_str(&response.body).map_err(|e| {
      warn!(url = %url, err = %e, "remote: response failed validation");
      RemoteError::Schema { url: url.to_string(), reason: e.to_string() }
    })
  }

  pub async fn user(&self) -> Result<Profile, RemoteError> {
    let url = self.user_url();
    if let Some(hit) = self.users.borrow().get(&url) {
      return Ok(hit.clone());
    }
    let profile: Profile = self.fetch(&url).await?;
    info!(user = %self.api_user, "remote: profile cached");
    self.users.borrow_mut().insert(url, profile.clone());
    Ok(profile)
  }

  pub async fn top_repositories(&self, limit: usize) -> Result<Vec<Repository>, RemoteError> {
    let url = self.repos_url();
    let cached = self.repos.borrow().get(&url).cloned();
    let repos = match cached {
      Some(repos) => repos,
      None => {
        let repos: Vec<Repository> = self.fetch(&url).await?;
        info!(user = %self.api_user, count = repos.len(), "remote: repositories cached");
        self.repos.borrow_mut().insert(url, repos.clone());
        repos
      }
    };
    Ok(rank_repositories(&repos, limit))
  }

  /// Public IPv4 of this machine. Never cached.
  pub async fn public_ip(&self) -> Result<String, RemoteError> {
    let url = &constants().ip_lookup_url;
    let response = self.transport.get(url).await?;
    if !(200..300).contains(&response.status) {
      return Err(RemoteError::Status { url: url.clone(), status: response.status });
    }
    let ip = response.body.trim();
    if ip.is_empty() {
      return Err(RemoteError::Schema { url: url.clone(), reason: "empty body".to_string() });
    }
    Ok(ip.to_string())
  }
}
