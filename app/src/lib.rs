use actix_web::http::header;
use actix_web::{web, HttpResponse};
use log::*;

use infra::persistence::{self, DbPool};
use infra::sessions::{self, SessionStore};

pub mod auth;
pub mod config;
pub mod cooks;
pub mod dish_types;
pub mod dishes;
pub mod error;
pub mod forms;
pub mod formsets;
mod index;
pub mod ingredients;
pub mod listing;
pub mod services;
mod templates;

#[cfg(test)]
mod test;

pub use crate::error::{Error, Result};

const SCHEMA_SQL: &str = include_str!("schema.sql");

#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub secure: bool,
    pub max_age_secs: i64,
}

#[derive(Debug, Clone)]
pub struct Kitchen {
    db: DbPool,
    sessions: SessionStore,
    cookie: CookieSettings,
}

impl Kitchen {
    pub fn new(config: &config::Config) -> anyhow::Result<Self> {
        let db = config.postgres.build()?;
        Ok(Kitchen::with_pool(db, &config.sessions))
    }

    pub fn with_pool(db: DbPool, sessions: &config::SessionConfig) -> Self {
        let cookie = CookieSettings {
            name: sessions.cookie_name.clone(),
            secure: sessions.secure,
            max_age_secs: sessions.max_age_secs,
        };
        let sessions = SessionStore::new(sessions.max_age());
        Kitchen {
            db,
            sessions,
            cookie,
        }
    }

    /// Create or upgrade the schema. Safe to run repeatedly.
    pub fn setup(&self) -> Result<()> {
        debug!("Init schema");
        let mut conn = self.db.get()?;
        persistence::setup(&mut *conn, SCHEMA_SQL)?;
        persistence::setup(&mut *conn, sessions::SETUP_SQL)?;
        Ok(())
    }

    /// Register the application state and every route.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        info!("Booting kitchen");
        cfg.app_data(web::Data::new(self.clone()));
        index::configure(cfg);
        auth::configure(cfg);
        cooks::configure(cfg);
        dishes::configure(cfg);
        dish_types::configure(cfg);
        ingredients::configure(cfg);
    }

    pub fn db(&self) -> &DbPool {
        &self.db
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn cookie(&self) -> &CookieSettings {
        &self.cookie
    }

    pub fn cooks(&self) -> cooks::Cooks {
        cooks::Cooks::new(self.db.clone())
    }

    pub fn dishes(&self) -> dishes::Dishes {
        dishes::Dishes::new(self.db.clone())
    }

    pub fn dish_types(&self) -> dish_types::DishTypes {
        dish_types::DishTypes::new(self.db.clone())
    }

    pub fn ingredients(&self) -> ingredients::Ingredients {
        ingredients::Ingredients::new(self.db.clone())
    }
}

/// The post/redirect/get response after a successful submission.
pub(crate) fn see_other(location: &str) -> HttpResponse {
    debug!("Redirect to {}", location);
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}
