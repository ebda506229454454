//! Discord REST client acting as a bot in one guild.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use tokengate_types::{RoleId, SubjectId};

use crate::{MembershipDirectory, MembershipError};

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct DiscordConfig {
    pub api_base: String,
    pub guild_id: String,
    pub bot_token: String,
    pub timeout: Duration,
}

pub struct DiscordDirectory {
    http_client: reqwest::Client,
    config: DiscordConfig,
}

#[derive(Deserialize)]
struct GuildMember {
    #[serde(default)]
    roles: Vec<String>,
}

#[derive(Deserialize)]
struct GuildRole {
    id: String,
}

impl DiscordDirectory {
    pub fn new(config: DiscordConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/guilds/{}{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.guild_id,
            path
        )
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        reason: Option<&str>,
    ) -> Result<reqwest::Response, MembershipError> {
        let mut request = self
            .http_client
            .request(method, self.url(path))
            .header("Authorization", format!("Bot {}", self.config.bot_token));
        if let Some(reason) = reason {
            request = request.header("X-Audit-Log-Reason", reason);
        }
        let response = request.send().await.map_err(|e| {
            tracing::debug!(path, error = %e, "discord request failed");
            if e.is_timeout() {
                MembershipError::Transient(format!("request timed out: {e}"))
            } else {
                MembershipError::Transient(e.to_string())
            }
        })?;
        check_status(path, response)
    }

    async fn mutate(
        &self,
        method: Method,
        subject: &SubjectId,
        roles: &BTreeSet<RoleId>,
        reason: &str,
    ) -> Result<(), MembershipError> {
        // Discord has no bulk endpoint that leaves other roles alone.
        for role in roles {
            let path = format!("/members/{subject}/roles/{role}");
            if let Err(e) = self.send(method.clone(), &path, Some(reason)).await {
                tracing::warn!(%method, %subject, %role, error = %e, "role mutation rejected");
                return Err(e);
            }
            tracing::debug!(%method, %subject, %role, "role mutation applied");
        }
        Ok(())
    }
}

fn check_status(
    path: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, MembershipError> {
    let status = response.status();
    if !status.is_success() {
        tracing::debug!(path, %status, "discord returned non-success status");
    }
    match status {
        s if s.is_success() => Ok(response),
        StatusCode::NOT_FOUND => Err(MembershipError::NotFound(path.to_string())),
        StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
            Err(MembershipError::Forbidden(format!("{path}: HTTP status {status}")))
        }
        _ => Err(MembershipError::Transient(format!(
            "{path}: HTTP status {status}"
        ))),
    }
}

fn parse_role(raw: &str) -> Result<RoleId, MembershipError> {
    raw.parse()
        .map_err(|_| MembershipError::InvalidResponse(format!("bad role id {raw:?}")))
}

#[async_trait]
impl MembershipDirectory for DiscordDirectory {
    async fn member_roles(
        &self,
        subject: &SubjectId,
    ) -> Result<Option<BTreeSet<RoleId>>, MembershipError> {
        let response = match self
            .send(Method::GET, &format!("/members/{subject}"), None)
            .await
        {
            Ok(response) => response,
            Err(MembershipError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let member: GuildMember = response
            .json()
            .await
            .map_err(|e| MembershipError::InvalidResponse(e.to_string()))?;
        member
            .roles
            .iter()
            .map(|r| parse_role(r))
            .collect::<Result<_, _>>()
            .map(Some)
    }

    async fn add_roles(
        &self,
        subject: &SubjectId,
        roles: &BTreeSet<RoleId>,
        reason: &str,
    ) -> Result<(), MembershipError> {
        self.mutate(Method::PUT, subject, roles, reason).await
    }

    async fn remove_roles(
        &self,
        subject: &SubjectId,
        roles: &BTreeSet<RoleId>,
        reason: &str,
    ) -> Result<(), MembershipError> {
        self.mutate(Method::DELETE, subject, roles, reason).await
    }

    async fn guild_roles(&self) -> Result<BTreeSet<RoleId>, MembershipError> {
        let roles: Vec<GuildRole> = self
            .send(Method::GET, "/roles", None)
            .await?
            .json()
            .await
            .map_err(|e| MembershipError::InvalidResponse(e.to_string()))?;
        roles.iter().map(|r| parse_role(&r.id)).collect()
    }
}
