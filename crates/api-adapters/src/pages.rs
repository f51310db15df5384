//! Minimal HTML pages that make the interceptor chain observable from a
//! browser: a redirect source and target, a login flow, a protected page.

use askama::Template;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{AppendHeaders, Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use secrecy::ExposeSecret;
use tracing::{info, warn};

use crate::interceptor::parse_cookies;
use crate::AppState;

pub const DASHBOARD_PATH: &str = "/protected/dashboard";
pub const SESSION_MAX_AGE: i64 = 60 * 60;

const HOME_LINKS: &[(&str, &str)] = &[
    ("/old-page", "redirects"),
    (DASHBOARD_PATH, "needs login"),
    ("/headers-test", ""),
    ("/cookie-test", ""),
    ("/login", ""),
];

#[derive(Template)]
#[template(path = "home.html")]
struct HomePage {
    title: &'static str,
    links: &'static [(&'static str, &'static str)],
}

#[derive(Template)]
#[template(path = "notice.html")]
struct NoticePage {
    title: &'static str,
    message: &'static str,
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginPage {
    title: &'static str,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardPage {
    title: &'static str,
}

#[derive(Template)]
#[template(path = "headers_test.html")]
struct HeadersTestPage {
    title: &'static str,
    headers: Vec<(String, String)>,
}

#[derive(Template)]
#[template(path = "cookie_test.html")]
struct CookieTestPage {
    title: &'static str,
    cookies: Vec<(String, String)>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/healthz", get(healthz))
        .route("/old-page", get(old_page))
        .route("/new-page", get(new_page))
        .route("/login", get(login_page).post(login))
        .route("/logout", axum::routing::post(logout))
        .route(DASHBOARD_PATH, get(dashboard))
        .route("/headers-test", get(headers_test))
        .route("/cookie-test", get(cookie_test))
}

/// Renders `page`, turning a template failure into a bare 500.
fn render(page: &impl Template) -> Response {
    match page.render() {
        Ok(html) => Html(html).into_response(),
        Err(error) => {
            warn!(%error, "page failed to render");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn home() -> Response {
    render(&HomePage {
        title: "actionboard",
        links: HOME_LINKS,
    })
}

async fn healthz() -> &'static str {
    "ok"
}

async fn old_page() -> Response {
    render(&NoticePage {
        title: "Old page",
        message: "The interceptor normally redirects this path.",
    })
}

async fn new_page() -> Response {
    render(&NoticePage {
        title: "New page",
        message: "Redirect target for /old-page.",
    })
}

async fn login_page() -> Response {
    render(&LoginPage { title: "Login" })
}

fn session_cookie(state: &AppState, value: &str, max_age: i64) -> String {
    let session = state.interceptor.session();
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
        session.cookie,
        value,
        max_age,
        if state.interceptor.secure_cookies() { "; Secure" } else { "" },
    )
}

/// Issues the session cookie and sends the browser to the dashboard.
async fn login(State(state): State<AppState>) -> Response {
    let token = state.interceptor.session().token.expose_secret().to_owned();
    let cookie = session_cookie(&state, &token, SESSION_MAX_AGE);
    info!("session issued");
    (
        AppendHeaders([(SET_COOKIE, cookie)]),
        Redirect::to(DASHBOARD_PATH),
    )
        .into_response()
}

async fn logout(State(state): State<AppState>) -> Response {
    let cookie = session_cookie(&state, "", 0);
    (AppendHeaders([(SET_COOKIE, cookie)]), Redirect::to("/")).into_response()
}

async fn dashboard() -> Response {
    render(&DashboardPage { title: "Dashboard" })
}

async fn headers_test(headers: HeaderMap) -> Response {
    let headers = headers
        .iter()
        .map(|(name, value)| {
            let value = value.to_str().unwrap_or("<binary>");
            (name.as_str().to_owned(), value.to_owned())
        })
        .collect();
    render(&HeadersTestPage {
        title: "Headers test",
        headers,
    })
}

async fn cookie_test(headers: HeaderMap) -> Response {
    let mut cookies: Vec<_> = parse_cookies(&headers).into_iter().collect();
    cookies.sort();
    render(&CookieTestPage {
        title: "Cookie test",
        cookies,
    })
}
