// Typed per-request authorization context, built once by the HTTP layer

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Already-authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub organization_id: Uuid,
}

/// App scope declared by a request, if any
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeSelector {
    pub app_id: Option<i32>,
    pub app_slug: Option<String>,
}

const APP_ID_KEYS: [&str; 2] = ["appId", "app_id"];
const APP_SLUG_KEYS: [&str; 2] = ["appSlug", "app_slug"];

impl ScopeSelector {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn app_id(app_id: i32) -> Self {
        Self {
            app_id: Some(app_id),
            app_slug: None,
        }
    }

    pub fn app_slug(slug: impl Into<String>) -> Self {
        Self {
            app_id: None,
            app_slug: Some(slug.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.app_id.is_none() && self.app_slug.is_none()
    }

    /// Collect scope hints from path params, then query params, then a JSON body.
    /// The first source carrying a usable value wins for each of id and slug.
    pub fn from_sources(
        path: &HashMap<String, String>,
        query: &HashMap<String, String>,
        body: Option<&serde_json::Value>,
    ) -> Self {
        let app_id = lookup_map(path, &APP_ID_KEYS)
            .and_then(|v| v.trim().parse().ok())
            .or_else(|| lookup_map(query, &APP_ID_KEYS).and_then(|v| v.trim().parse().ok()))
            .or_else(|| body.and_then(body_app_id));

        let app_slug = lookup_map(path, &APP_SLUG_KEYS)
            .or_else(|| lookup_map(query, &APP_SLUG_KEYS))
            .map(str::to_string)
            .or_else(|| body.and_then(|b| body_str(b, &APP_SLUG_KEYS)));

        Self { app_id, app_slug }
    }
}

fn lookup_map<'a>(map: &'a HashMap<String, String>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .map(|v| v.as_str())
        .find(|v| !v.trim().is_empty())
}

fn body_app_id(body: &serde_json::Value) -> Option<i32> {
    APP_ID_KEYS.iter().find_map(|key| match body.get(*key)? {
        serde_json::Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn body_str(body: &serde_json::Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        body.get(*key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
    })
}

/// Request metadata recorded on denial
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMeta {
    pub endpoint: String,
    pub method: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub principal: Option<Principal>,
    pub scope: ScopeSelector,
    pub meta: RequestMeta,
}

impl RequestContext {
    pub fn new(principal: Option<Principal>) -> Self {
        Self {
            principal,
            scope: ScopeSelector::none(),
            meta: RequestMeta::default(),
        }
    }

    pub fn with_scope(mut self, scope: ScopeSelector) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_meta(mut self, meta: RequestMeta) -> Self {
        self.meta = meta;
        self
    }
}
