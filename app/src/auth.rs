//! Session-cookie authentication.
//!
//! Handlers that take an [`Authenticated`] argument are only reachable by a
//! logged in, active cook; anyone else is sent to the login page with a
//! `next` parameter pointing back at what they asked for.

use std::future::Future;
use std::pin::Pin;

use actix_web::cookie::{time, Cookie, SameSite};
use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest, HttpResponse};
use log::*;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use postgres::GenericClient;
use serde::{Deserialize, Serialize};
use tera::Context;

use infra::ids::Id;
use infra::passwords;
use infra::sessions::{Session, SessionStore};

use crate::cooks::{self, Cook};
use crate::error::{Error, Result};
use crate::forms::{FormData, FormErrors, REQUIRED};
use crate::services::{blocking, with_conn};
use crate::templates;
use crate::Kitchen;

pub const LOGIN_URL: &str = "/accounts/login/";
pub const LOGOUT_URL: &str = "/accounts/logout/";
pub const LOGIN_REDIRECT_URL: &str = "/";
pub const SESSION_USER_KEY: &str = "_auth_user_id";

const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

/// Characters escaped in the `next` parameter; path separators stay readable.
const NEXT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~');

#[derive(Debug)]
pub struct Authenticated {
    pub cook: Cook,
    pub session: Session,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NextParam {
    next: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
struct LoginForm {
    username: String,
    next: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource(LOGIN_URL)
            .route(web::get().to(login_form))
            .route(web::post().to(login)),
    )
    .service(web::resource(LOGOUT_URL).route(web::post().to(logout)));
}

pub fn login_url(next: &str) -> String {
    format!(
        "{}?next={}",
        LOGIN_URL,
        utf8_percent_encode(next, NEXT_ENCODE_SET)
    )
}

/// Only same-site absolute paths may be redirected to after login.
pub fn is_safe_next(next: &str) -> bool {
    next.starts_with('/')
        && !next.starts_with("//")
        && !next.starts_with("/\\")
        && !next.chars().any(|c| c.is_control())
}

impl Authenticated {
    /// A template context already carrying the logged in cook.
    pub fn context(&self) -> Context {
        let mut context = Context::new();
        context.insert("user", &self.cook);
        context
    }
}

impl FromRequest for Authenticated {
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self>>>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let kitchen = req.app_data::<web::Data<Kitchen>>().cloned();
        let key = kitchen
            .as_ref()
            .and_then(|k| req.cookie(&k.cookie().name))
            .map(|c| c.value().to_string());
        let target = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.path().to_string());

        Box::pin(async move {
            let kitchen = kitchen.ok_or(Error::MissingState)?;
            let key = match key {
                Some(key) => key,
                None => return Err(Error::LoginRequired(login_url(&target))),
            };
            let found = blocking(move || {
                with_conn(kitchen.db(), |conn| {
                    load_authenticated(conn, kitchen.sessions(), &key)
                })
            })
            .await?;
            found.ok_or_else(|| Error::LoginRequired(login_url(&target)))
        })
    }
}

fn load_authenticated<C: GenericClient>(
    conn: &mut C,
    store: &SessionStore,
    key: &str,
) -> Result<Option<Authenticated>> {
    let session = match store.load(conn, key)? {
        Some(session) => session,
        None => {
            debug!("No live session for presented key");
            return Ok(None);
        }
    };
    let id = match session.get::<i64>(SESSION_USER_KEY) {
        Some(id) => Id::<Cook>::new(id),
        None => return Ok(None),
    };
    let cook = cooks::load_active(conn, id)?;
    Ok(cook.map(|cook| Authenticated { cook, session }))
}

/// Check credentials, then bind the cook to a session under a fresh key.
fn log_in<C: GenericClient>(
    conn: &mut C,
    store: &SessionStore,
    previous: Option<&str>,
    username: &str,
    password: &str,
) -> Result<Option<Session>> {
    let (id, hash) = match cooks::credentials(conn, username)? {
        Some(found) => found,
        None => {
            info!("Login attempt for unknown or inactive {:?}", username);
            return Ok(None);
        }
    };
    if !passwords::verify(password, &hash) {
        info!("Failed login for {:?}", username);
        return Ok(None);
    }

    let existing = match previous {
        Some(key) => store.load(conn, key)?,
        None => None,
    };
    let mut session = match existing {
        Some(mut session) if session.get::<i64>(SESSION_USER_KEY) == Some(id.get()) => {
            store.cycle_key(conn, &mut session)?;
            session
        }
        Some(session) => {
            store.delete(conn, session.key())?;
            store.create(conn)?
        }
        None => store.create(conn)?,
    };
    session.insert(SESSION_USER_KEY, id.get())?;
    store.save(conn, &mut session)?;
    cooks::touch_last_login(conn, id)?;
    info!("Cook {} logged in", id);
    Ok(Some(session))
}

fn session_cookie(kitchen: &Kitchen, value: String) -> Cookie<'static> {
    let settings = kitchen.cookie();
    Cookie::build(settings.name.clone(), value)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(settings.secure)
        .max_age(time::Duration::seconds(settings.max_age_secs))
        .finish()
}

fn render_login(form: &LoginForm, errors: &FormErrors) -> Result<HttpResponse> {
    let mut context = Context::new();
    context.insert("form", form);
    context.insert("errors", errors);
    templates::render("login.html", &context)
}

async fn login_form(query: web::Query<NextParam>) -> Result<HttpResponse> {
    let form = LoginForm {
        username: String::new(),
        next: query.into_inner().next.unwrap_or_default(),
    };
    render_login(&form, &FormErrors::default())
}

async fn login(
    req: HttpRequest,
    kitchen: web::Data<Kitchen>,
    query: web::Query<NextParam>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let data = FormData::parse(&body);
    let form = LoginForm {
        username: data.text("username"),
        next: data
            .get("next")
            .map(str::to_string)
            .or_else(|| query.into_inner().next)
            .unwrap_or_default(),
    };
    let password = data.raw("password");

    let mut errors = FormErrors::default();
    if form.username.is_empty() {
        errors.add("username", REQUIRED);
    }
    if password.is_empty() {
        errors.add("password", REQUIRED);
    }
    if !errors.is_empty() {
        return render_login(&form, &errors);
    }

    let previous = req
        .cookie(&kitchen.cookie().name)
        .map(|c| c.value().to_string());
    let username = form.username.clone();
    let state = kitchen.clone();
    let session = blocking(move || {
        with_conn(state.db(), |conn| {
            log_in(
                conn,
                state.sessions(),
                previous.as_deref(),
                &username,
                &password,
            )
        })
    })
    .await?;

    let session = match session {
        Some(session) => session,
        None => {
            errors.add_non_field(INVALID_LOGIN);
            return render_login(&form, &errors);
        }
    };

    let location = if is_safe_next(&form.next) {
        form.next.as_str()
    } else {
        LOGIN_REDIRECT_URL
    };
    debug!("Login succeeded; redirect to {}", location);
    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .cookie(session_cookie(&kitchen, session.key().to_string()))
        .finish())
}

async fn logout(req: HttpRequest, kitchen: web::Data<Kitchen>) -> Result<HttpResponse> {
    if let Some(cookie) = req.cookie(&kitchen.cookie().name) {
        let key = cookie.value().to_string();
        let state = kitchen.clone();
        blocking(move || {
            with_conn(state.db(), |conn| {
                state.sessions().delete(conn, &key)?;
                Ok(())
            })
        })
        .await?;
    }

    let mut removal = session_cookie(&kitchen, String::new());
    removal.make_removal();
    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, LOGIN_URL))
        .cookie(removal)
        .finish())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn next_keeps_slashes_literal() {
        assert_eq!(login_url("/cooks/"), "/accounts/login/?next=/cooks/");
        assert_eq!(login_url("/dish-types/"), "/accounts/login/?next=/dish-types/");
    }

    #[test]
    fn next_encodes_the_query_string() {
        assert_eq!(
            login_url("/cooks/?page=2&search=a b"),
            "/accounts/login/?next=/cooks/%3Fpage%3D2%26search%3Da%20b"
        );
    }

    #[test]
    fn only_local_paths_are_safe() {
        assert!(is_safe_next("/dishes/3"));
        assert!(!is_safe_next(""));
        assert!(!is_safe_next("https://example.com/"));
        assert!(!is_safe_next("//example.com/"));
        assert!(!is_safe_next("/\\example.com"));
    }
}
