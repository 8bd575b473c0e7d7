//! Remote content access.

use std::io::Read;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use marklist_core::{RepoMeta, RepoMetaOverride, SourceConfig};

use crate::error::FetchError;

pub const GITHUB_API_URL: &str = "https://api.github.com";
pub const GITHUB_RAW_URL: &str = "https://raw.githubusercontent.com";

const USER_AGENT: &str = concat!("marklist/", env!("CARGO_PKG_VERSION"));
const TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches document bodies and repository metadata for a source.
pub trait ContentFetcher {
    /// Raw bytes of `path` in `source`. `branch` selects the ref when known.
    fn fetch_body(
        &self,
        source: &SourceConfig,
        path: &str,
        branch: Option<&str>,
    ) -> Result<Vec<u8>, FetchError>;

    /// Repository metadata with `overrides` applied.
    fn fetch_repo_meta(
        &self,
        source: &SourceConfig,
        overrides: &RepoMetaOverride,
    ) -> Result<RepoMeta, FetchError>;
}

/// [`ContentFetcher`] over the GitHub REST API and raw content host.
pub struct GitHubFetcher {
    agent: ureq::Agent,
    api_url: String,
    raw_url: String,
    token: Option<String>,
}

impl GitHubFetcher {
    pub fn new(token: Option<String>) -> Self {
        Self::with_base_urls(GITHUB_API_URL, GITHUB_RAW_URL, token)
    }

    /// Reads `GITHUB_TOKEN`; an empty value counts as unset.
    pub fn from_env() -> Self {
        let token = std::env::var("GITHUB_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        Self::new(token)
    }

    pub fn with_base_urls(
        api_url: impl Into<String>,
        raw_url: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(TIMEOUT)
            .user_agent(USER_AGENT)
            .build();
        Self {
            agent,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            raw_url: raw_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    /// URL for a document body: the raw host when the branch is known,
    /// otherwise the contents API (default branch).
    pub fn body_url(
        &self,
        identifier: &str,
        path: &str,
        branch: Option<&str>,
    ) -> Result<String, FetchError> {
        let identifier = checked_identifier(identifier)?;
        let path = path.split('/').filter(|s| !s.is_empty());
        match branch {
            Some(branch) => join_segments(
                &self.raw_url,
                identifier.split('/').chain(branch.split('/')).chain(path),
            ),
            None => join_segments(
                &self.api_url,
                ["repos"]
                    .into_iter()
                    .chain(identifier.split('/'))
                    .chain(["contents"])
                    .chain(path),
            ),
        }
    }

    pub fn repo_url(&self, identifier: &str) -> Result<String, FetchError> {
        let identifier = checked_identifier(identifier)?;
        join_segments(&self.api_url, ["repos"].into_iter().chain(identifier.split('/')))
    }

    fn get(&self, url: &str, accept: &str) -> Result<ureq::Response, FetchError> {
        debug!(url = %url, "GET");
        let mut request = self.agent.get(url).set("Accept", accept);
        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }
        request.call().map_err(|err| match err {
            ureq::Error::Status(status, _) => FetchError::Http {
                url: url.to_string(),
                status,
            },
            ureq::Error::Transport(transport) => FetchError::Transport {
                url: url.to_string(),
                message: transport.to_string(),
            },
        })
    }
}

impl ContentFetcher for GitHubFetcher {
    fn fetch_body(
        &self,
        source: &SourceConfig,
        path: &str,
        branch: Option<&str>,
    ) -> Result<Vec<u8>, FetchError> {
        let url = self.body_url(&source.identifier, path, branch)?;
        let response = self.get(&url, "application/vnd.github.raw")?;
        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|source| FetchError::Body {
                url: url.clone(),
                source,
            })?;
        Ok(body)
    }

    fn fetch_repo_meta(
        &self,
        source: &SourceConfig,
        overrides: &RepoMetaOverride,
    ) -> Result<RepoMeta, FetchError> {
        let url = self.repo_url(&source.identifier)?;
        let repo: GhRepo = self
            .get(&url, "application/vnd.github+json")?
            .into_json()
            .map_err(|source| FetchError::Body {
                url: url.clone(),
                source,
            })?;
        Ok(repo.into_meta().with_overrides(overrides))
    }
}

/// Subset of `GET /repos/{owner}/{repo}`.
#[derive(Debug, Deserialize)]
struct GhRepo {
    #[serde(default)]
    default_branch: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    pushed_at: Option<DateTime<Utc>>,
}

impl GhRepo {
    fn into_meta(self) -> RepoMeta {
        RepoMeta {
            default_branch: self.default_branch,
            stars: self.stargazers_count,
            description: self.description,
            html_url: self.html_url,
            topics: self.topics,
            pushed_at: self.pushed_at,
        }
    }
}

fn checked_identifier(identifier: &str) -> Result<&str, FetchError> {
    let mut parts = identifier.split('/');
    let valid = matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(owner), Some(repo), None)
            if is_name(owner) && is_name(repo)
    );
    if valid {
        Ok(identifier)
    } else {
        Err(FetchError::InvalidIdentifier {
            identifier: identifier.to_string(),
        })
    }
}

fn is_name(part: &str) -> bool {
    !part.is_empty()
        && part != "."
        && part != ".."
        && part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Append `segments` to `base`, percent-encoding each one.
fn join_segments<'s>(
    base: &str,
    segments: impl IntoIterator<Item = &'s str>,
) -> Result<String, FetchError> {
    let invalid = || FetchError::InvalidBaseUrl {
        url: base.to_string(),
    };
    let mut url = Url::parse(base).map_err(|_| invalid())?;
    url.path_segments_mut()
        .map_err(|_| invalid())?
        .pop_if_empty()
        .extend(segments);
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn fetcher() -> GitHubFetcher {
        GitHubFetcher::with_base_urls("https://api.test/", "https://raw.test", None)
    }

    #[test]
    fn body_url_uses_raw_host_when_branch_known() {
        let url = fetcher()
            .body_url("sindresorhus/awesome", "readme.md", Some("main"))
            .unwrap();
        assert_eq!(url, "https://raw.test/sindresorhus/awesome/main/readme.md");
    }

    #[test]
    fn body_url_uses_contents_api_without_branch() {
        let url = fetcher()
            .body_url("rust-unofficial/awesome-rust", "/docs/My List.md", None)
            .unwrap();
        assert_eq!(
            url,
            "https://api.test/repos/rust-unofficial/awesome-rust/contents/docs/My%20List.md"
        );
    }

    #[test]
    fn body_url_escapes_reserved_characters_per_segment() {
        let url = fetcher()
            .body_url("o/r", "docs/New list?#1.md", Some("release/v2"))
            .unwrap();
        assert_eq!(
            url,
            "https://raw.test/o/r/release/v2/docs/New%20list%3F%231.md"
        );
    }

    #[test]
    fn base_url_with_path_keeps_its_prefix() {
        let fetcher = GitHubFetcher::with_base_urls(
            "http://127.0.0.1:9/api/v3/",
            "http://127.0.0.1:9/raw",
            None,
        );
        assert_eq!(
            fetcher.repo_url("o/r").unwrap(),
            "http://127.0.0.1:9/api/v3/repos/o/r"
        );
        assert_eq!(
            fetcher.body_url("o/r", "README.md", Some("main")).unwrap(),
            "http://127.0.0.1:9/raw/o/r/main/README.md"
        );
    }

    #[test]
    fn unusable_base_url_is_rejected() {
        let fetcher = GitHubFetcher::with_base_urls("not a url", "mailto:x@y", None);
        assert!(matches!(
            fetcher.repo_url("o/r").unwrap_err(),
            FetchError::InvalidBaseUrl { .. }
        ));
        assert!(matches!(
            fetcher.body_url("o/r", "README.md", Some("main")).unwrap_err(),
            FetchError::InvalidBaseUrl { .. }
        ));
    }

    #[test]
    fn repo_url_targets_repos_endpoint() {
        assert_eq!(
            fetcher().repo_url("owner/repo.rs").unwrap(),
            "https://api.test/repos/owner/repo.rs"
        );
    }

    #[rstest]
    #[case("")]
    #[case("owner")]
    #[case("owner/")]
    #[case("owner/repo/extra")]
    #[case("../repo")]
    #[case("own er/repo")]
    fn malformed_identifier_is_rejected(#[case] identifier: &str) {
        let err = fetcher().repo_url(identifier).unwrap_err();
        assert!(matches!(err, FetchError::InvalidIdentifier { .. }));
    }

    #[test]
    fn repo_payload_maps_to_meta() {
        let json = r#"{
            "default_branch": "master",
            "stargazers_count": 1200,
            "description": "A curated list",
            "html_url": "https://github.com/o/r",
            "topics": ["awesome", "lists"],
            "pushed_at": "2024-05-01T10:00:00Z",
            "forks": 3
        }"#;
        let repo: GhRepo = serde_json::from_str(json).unwrap();
        let meta = repo.into_meta().with_overrides(&RepoMetaOverride {
            default_branch: Some("main".into()),
        });
        assert_eq!(meta.stars, 1200);
        assert_eq!(meta.default_branch.as_deref(), Some("main"));
        assert_eq!(meta.topics, vec!["awesome", "lists"]);
        assert!(meta.pushed_at.is_some());
    }
}
