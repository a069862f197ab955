//! Resource handles: users, repositories, and issues.
//!
//! Handles borrow the client, carry only identifying fields, and cache
//! nothing. Every accessor issues a fresh request and returns the parsed
//! JSON as-is.

use std::fmt;

use bbkit_core::{Credentials, Result};
use serde_json::Value;

use crate::client::BitBucket;
use crate::query::{smart_encode, with_query};

// =============================================================================
// User
// =============================================================================

/// A Bitbucket user.
#[derive(Debug, Clone)]
pub struct User<'a> {
    client: &'a BitBucket,
    name: String,
}

impl<'a> User<'a> {
    pub fn new(client: &'a BitBucket, name: impl Into<String>) -> Self {
        Self {
            client,
            name: name.into(),
        }
    }

    /// The user's account name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle for one of this user's repositories.
    pub fn repository(&self, slug: impl Into<String>) -> Repository<'a> {
        Repository::new(self.client, self.name.as_str(), slug)
    }

    /// Profile of the user, including their repositories.
    pub fn get(&self) -> Result<Value> {
        let url = format!("{}users/{}/", self.client.api_base(), self.name);
        self.client.load_json(&url, false)
    }

    /// The `repositories` field of [`User::get`].
    ///
    /// Yields an empty list when the payload has no such field, which is
    /// also what a masked failure looks like.
    pub fn repositories(&self) -> Result<Value> {
        let mut user_data = self.get()?;
        Ok(user_data
            .get_mut("repositories")
            .map(Value::take)
            .unwrap_or_else(|| Value::Array(Vec::new())))
    }

    /// Recent events for the user.
    pub fn events(&self) -> Result<Value> {
        let url = format!("{}users/{}/events/", self.client.api_base(), self.name);
        self.client.load_json(&url, false)
    }
}

impl Credentials for User<'_> {
    fn username(&self) -> &str {
        self.client.username()
    }

    fn password(&self) -> &str {
        self.client.password()
    }
}

impl fmt::Display for User<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<User: {}>", self.name)
    }
}

// =============================================================================
// Repository
// =============================================================================

/// A repository, identified by owner and slug.
#[derive(Debug, Clone)]
pub struct Repository<'a> {
    client: &'a BitBucket,
    owner: String,
    slug: String,
    base_url: String,
}

impl<'a> Repository<'a> {
    pub fn new(client: &'a BitBucket, owner: impl Into<String>, slug: impl Into<String>) -> Self {
        let owner = owner.into();
        let slug = slug.into();
        let base_url = format!("{}repositories/{}/{}/", client.api_base(), owner, slug);
        Self {
            client,
            owner,
            slug,
            base_url,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// `{api_base}repositories/{owner}/{slug}/`
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get(&self) -> Result<Value> {
        self.client.load_json(&self.base_url, false)
    }

    /// One changeset by revision.
    pub fn changeset(&self, revision: &str) -> Result<Value> {
        let url = self.url(&format!("changesets/{}/", revision));
        self.client.load_json(&url, false)
    }

    /// Recent changesets. Failures are not logged.
    pub fn changesets(&self, limit: Option<u32>) -> Result<Value> {
        let url = with_query(self.url("changesets/"), &smart_encode(&[("limit", limit)]));
        self.client.load_json(&url, true)
    }

    pub fn tags(&self) -> Result<Value> {
        self.client.load_json(&self.url("tags/"), false)
    }

    pub fn branches(&self) -> Result<Value> {
        self.client.load_json(&self.url("branches/"), false)
    }

    /// Handle for an issue in this repository.
    pub fn issue(&self, number: u64) -> Issue<'a> {
        Issue::new(self.client, self.owner.as_str(), self.slug.as_str(), number)
    }

    /// Issue listing, paged with `start` and `limit`.
    pub fn issues(&self, start: Option<u32>, limit: Option<u32>) -> Result<Value> {
        let query = smart_encode(&[("start", start), ("limit", limit)]);
        let url = with_query(self.url("issues/"), &query);
        self.client.load_json(&url, false)
    }

    pub fn events(&self) -> Result<Value> {
        self.client.load_json(&self.url("events/"), false)
    }

    pub fn followers(&self) -> Result<Value> {
        self.client.load_json(&self.url("followers/"), false)
    }
}

impl Credentials for Repository<'_> {
    fn username(&self) -> &str {
        self.client.username()
    }

    fn password(&self) -> &str {
        self.client.password()
    }
}

impl fmt::Display for Repository<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Repository: {}'s {}>", self.owner, self.slug)
    }
}

// =============================================================================
// Issue
// =============================================================================

/// An issue in a repository's tracker.
#[derive(Debug, Clone)]
pub struct Issue<'a> {
    client: &'a BitBucket,
    owner: String,
    slug: String,
    number: u64,
    base_url: String,
}

impl<'a> Issue<'a> {
    pub fn new(
        client: &'a BitBucket,
        owner: impl Into<String>,
        slug: impl Into<String>,
        number: u64,
    ) -> Self {
        let owner = owner.into();
        let slug = slug.into();
        let base_url = format!(
            "{}repositories/{}/{}/issues/{}/",
            client.api_base(),
            owner,
            slug,
            number
        );
        Self {
            client,
            owner,
            slug,
            number,
            base_url,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    /// `{api_base}repositories/{owner}/{slug}/issues/{number}/`
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn get(&self) -> Result<Value> {
        self.client.load_json(&self.base_url, false)
    }

    pub fn followers(&self) -> Result<Value> {
        let url = format!("{}followers/", self.base_url);
        self.client.load_json(&url, false)
    }
}

impl Credentials for Issue<'_> {
    fn username(&self) -> &str {
        self.client.username()
    }

    fn password(&self) -> &str {
        self.client.password()
    }
}

impl fmt::Display for Issue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Issue #{} on {}'s {}>", self.number, self.owner, self.slug)
    }
}
