//! # Request Interceptor
//!
//! A stateless guard chain run once per inbound request. Order is fixed and
//! the first guard that returns a [`Verdict`] wins:
//!
//! 1. log the request (no control flow)
//! 2. exact-path redirect table
//! 3. session gate on the protected prefix
//! 4. user-agent deny list
//! 5. pass through, then decorate the response with security headers and
//!    a last-visited cookie
//!
//! Deciding ([`Interceptor::evaluate`]) and decorating
//! ([`Interceptor::decorate`]) are separate so each can be tested without a
//! running router.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::{COOKIE, SET_COOKIE, USER_AGENT};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use chrono::{DateTime, SecondsFormat, Utc};
use configs::InterceptorSettings;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

pub const DENIED_BODY: &str = "Access denied.";
pub const VISIT_COOKIE_MAX_AGE: i64 = 60 * 60 * 24;

/// Headers attached to every response that passes the chain.
pub const SECURITY_HEADERS: [(&str, &str); 4] = [
    ("x-frame-options", "DENY"),
    ("x-content-type-options", "nosniff"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    ("x-middleware-cache", "no-cache"),
];

/// What the chain needs to know about a request.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub method: Method,
    pub path: String,
    pub user_agent: String,
    pub client_ip: String,
    pub cookies: HashMap<String, String>,
}

impl RequestMeta {
    pub fn from_request(request: &Request) -> Self {
        let headers = request.headers();
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Self {
            method: request.method().clone(),
            path: request.uri().path().to_owned(),
            user_agent: headers
                .get(USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_owned(),
            client_ip: forwarded_for(headers)
                .or(peer)
                .unwrap_or_else(|| "unknown".to_owned()),
            cookies: parse_cookies(headers),
        }
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_owned)
}

/// Collects every `name=value` pair across all `Cookie` headers.
pub fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            Some((name.trim().to_owned(), value.trim().to_owned()))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// 307 to the given location.
    Redirect(String),
    /// Fixed-status denial with a fixed body.
    Deny(StatusCode, &'static str),
}

impl IntoResponse for Verdict {
    fn into_response(self) -> Response {
        match self {
            Self::Redirect(location) => Redirect::temporary(&location).into_response(),
            Self::Deny(status, body) => (status, body).into_response(),
        }
    }
}

/// One link of the chain.
pub trait Guard: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, request: &RequestMeta) -> Option<Verdict>;
}

pub struct RedirectTable {
    routes: HashMap<String, String>,
}

impl Guard for RedirectTable {
    fn name(&self) -> &'static str {
        "redirect"
    }

    fn check(&self, request: &RequestMeta) -> Option<Verdict> {
        self.routes
            .get(&request.path)
            .map(|to| Verdict::Redirect(to.clone()))
    }
}

/// Cookie name, sentinel value and the paths they govern.
pub struct Session {
    pub cookie: String,
    pub token: SecretString,
    pub protected_prefix: String,
    pub login_path: String,
}

impl Session {
    pub fn is_valid(&self, presented: Option<&str>) -> bool {
        presented.is_some_and(|value| value == self.token.expose_secret())
    }
}

pub struct SessionGate {
    session: Arc<Session>,
}

impl Guard for SessionGate {
    fn name(&self) -> &'static str {
        "session"
    }

    fn check(&self, request: &RequestMeta) -> Option<Verdict> {
        if !request.path.starts_with(&self.session.protected_prefix) {
            return None;
        }
        if self.session.is_valid(request.cookie(&self.session.cookie)) {
            None
        } else {
            Some(Verdict::Redirect(self.session.login_path.clone()))
        }
    }
}

pub struct UserAgentDenyList {
    needles: Vec<String>,
}

impl Guard for UserAgentDenyList {
    fn name(&self) -> &'static str {
        "deny-list"
    }

    fn check(&self, request: &RequestMeta) -> Option<Verdict> {
        self.needles
            .iter()
            .any(|needle| !needle.is_empty() && request.user_agent.contains(needle.as_str()))
            .then_some(Verdict::Deny(StatusCode::FORBIDDEN, DENIED_BODY))
    }
}

pub struct Interceptor {
    guards: Vec<Box<dyn Guard>>,
    excluded_prefixes: Vec<String>,
    session: Arc<Session>,
    visit_cookie: String,
    secure_cookies: bool,
}

impl Interceptor {
    pub fn from_settings(settings: &InterceptorSettings, secure_cookies: bool) -> Self {
        let session = Arc::new(Session {
            cookie: settings.session_cookie.clone(),
            token: SecretString::from(settings.session_token.expose_secret().to_owned()),
            protected_prefix: settings.protected_prefix.clone(),
            login_path: settings.login_path.clone(),
        });

        let guards: Vec<Box<dyn Guard>> = vec![
            Box::new(RedirectTable {
                routes: settings
                    .redirects
                    .iter()
                    .map(|r| (r.from.clone(), r.to.clone()))
                    .collect(),
            }),
            Box::new(SessionGate {
                session: Arc::clone(&session),
            }),
            Box::new(UserAgentDenyList {
                needles: settings.deny_user_agents.clone(),
            }),
        ];

        Self {
            guards,
            excluded_prefixes: settings.excluded_prefixes.clone(),
            session,
            visit_cookie: settings.visit_cookie.clone(),
            secure_cookies,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }

    /// Whether the chain runs for `path` at all.
    pub fn applies_to(&self, path: &str) -> bool {
        !self
            .excluded_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Runs the guards in order; `None` means the request may continue.
    pub fn evaluate(&self, request: &RequestMeta) -> Option<Verdict> {
        self.guards.iter().find_map(|guard| {
            let verdict = guard.check(request)?;
            debug!(guard = guard.name(), ?verdict, path = %request.path, "guard matched");
            Some(verdict)
        })
    }

    /// Attaches the security headers and the last-visited cookie.
    pub fn decorate(&self, headers: &mut HeaderMap, now: DateTime<Utc>) {
        for (name, value) in SECURITY_HEADERS {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }

        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
            self.visit_cookie,
            now.to_rfc3339_opts(SecondsFormat::Millis, true),
            VISIT_COOKIE_MAX_AGE,
            if self.secure_cookies { "; Secure" } else { "" },
        );
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                headers.append(SET_COOKIE, value);
            }
            Err(error) => warn!(%error, "could not encode visit cookie"),
        }
    }
}

/// axum middleware entry point; install with `from_fn_with_state`.
pub async fn intercept(
    State(interceptor): State<Arc<Interceptor>>,
    request: Request,
    next: Next,
) -> Response {
    if !interceptor.applies_to(request.uri().path()) {
        return next.run(request).await;
    }

    let meta = RequestMeta::from_request(&request);
    info!(
        method = %meta.method,
        path = %meta.path,
        user_agent = %meta.user_agent,
        ip = %meta.client_ip,
        "request intercepted"
    );

    if let Some(verdict) = interceptor.evaluate(&meta) {
        return verdict.into_response();
    }

    let mut response = next.run(request).await;
    interceptor.decorate(response.headers_mut(), Utc::now());
    response
}
