use std::time::Duration;

use chrono::SecondsFormat;
use reqwest::{Client, RequestBuilder, Response, header};
use serde::Deserialize;

use crate::config::Config;
use crate::error::BackendError;
use crate::models::{Event, EventRow, Profile, UserIdentity};

use super::{EventBackend, EventOrder, EventQuery, Scope};

const EVENTS_TABLE: &str = "events";
const PROFILES_TABLE: &str = "profiles";
const ORGANIZATION_COLUMN: &str = "university";

/// 托管后端（GoTrue 认证 + PostgREST 数据接口）的 HTTP 客户端
#[derive(Clone)]
pub struct RestBackend {
    client: Client,
    base_url: String,
    anon_key: String,
}

#[derive(Deserialize)]
struct ProfileRow {
    id: String,
    #[serde(default)]
    university: Option<String>,
}

impl RestBackend {
    pub fn new(base_url: &str, anon_key: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, BackendError> {
        Self::new(&config.baas_url, &config.baas_anon_key, config.request_timeout())
    }

    // 未登录时以匿名 key 作为 bearer
    fn get(&self, path: &str, access_token: Option<&str>) -> RequestBuilder {
        let bearer = access_token.unwrap_or(&self.anon_key);
        self.client
            .get(format!("{}{}", self.base_url, path))
            .header("apikey", &self.anon_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", bearer))
            .header(header::ACCEPT, "application/json")
    }

    async fn send(request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(BackendError::Unauthorized);
        }
        let message = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Failed to read backend error body ({}): {}", status, e);
                format!("<unreadable body: {}>", e)
            }
        };
        Err(BackendError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

/// 把查询条件翻译成 PostgREST 的查询参数
pub(crate) fn event_query_params(query: &EventQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("select", "*".to_string()),
        (
            "start_time",
            format!(
                "gte.{}",
                query.starts_after.to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
        ),
    ];

    match &query.scope {
        Scope::Organization(org) => params.push((ORGANIZATION_COLUMN, format!("eq.{}", org))),
        Scope::Public => params.push((ORGANIZATION_COLUMN, "is.null".to_string())),
    }

    if let Some(category) = query.category {
        params.push(("category", format!("eq.{}", category)));
    }

    let order = match query.order {
        EventOrder::StartTimeAsc => "start_time.asc",
        EventOrder::StartTimeDesc => "start_time.desc",
        EventOrder::CreatedAtAsc => "created_at.asc",
        EventOrder::CreatedAtDesc => "created_at.desc",
    };
    params.push(("order", order.to_string()));

    params
}

/// 逐行解析；坏行跳过，不影响整批结果
pub(crate) fn decode_event_rows(rows: Vec<serde_json::Value>) -> Vec<Event> {
    rows.into_iter()
        .filter_map(|value| {
            let row = match serde_json::from_value::<EventRow>(value) {
                Ok(row) => row,
                Err(e) => {
                    tracing::warn!("Skipping undecodable event row: {}", e);
                    return None;
                }
            };
            match Event::try_from(row) {
                Ok(event) => Some(event),
                Err(e) => {
                    tracing::warn!("Skipping malformed event row: {}", e);
                    None
                }
            }
        })
        .collect()
}

impl EventBackend for RestBackend {
    async fn current_user(&self, access_token: &str) -> Result<UserIdentity, BackendError> {
        let response = Self::send(self.get("/auth/v1/user", Some(access_token))).await?;
        response
            .json::<UserIdentity>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn profile(&self, access_token: &str, user_id: &str) -> Result<Profile, BackendError> {
        let request = self
            .get(&format!("/rest/v1/{}", PROFILES_TABLE), Some(access_token))
            .query(&[
                ("select", format!("id,{}", ORGANIZATION_COLUMN)),
                ("id", format!("eq.{}", user_id)),
            ]);
        let rows = Self::send(request)
            .await?
            .json::<Vec<ProfileRow>>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        rows.into_iter()
            .next()
            .map(|row| Profile {
                user_id: row.id,
                organization: row.university,
            })
            .ok_or_else(|| BackendError::NotFound(format!("profile {}", user_id)))
    }

    async fn query_events(
        &self,
        access_token: Option<&str>,
        query: &EventQuery,
    ) -> Result<Vec<Event>, BackendError> {
        let request = self
            .get(&format!("/rest/v1/{}", EVENTS_TABLE), access_token)
            .query(&event_query_params(query));
        let rows = Self::send(request)
            .await?
            .json::<Vec<serde_json::Value>>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        let events = decode_event_rows(rows);
        tracing::debug!("Fetched {} events for scope {:?}", events.len(), query.scope);
        Ok(events)
    }
}
