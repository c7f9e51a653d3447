//! Server-side sessions kept in postgres.
//!
//! The browser only ever sees an opaque key; everything else lives in the
//! `kitchen_session` table as a JSON object. Nothing here is ambient: a
//! handler loads a [`Session`], mutates it, and hands it back to
//! [`SessionStore::save`] itself.

use chrono::{DateTime, Duration, Utc};
use log::*;
use postgres::GenericClient;
use rand::Rng;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

pub const SETUP_SQL: &str = include_str!("sessions.sql");

const KEY_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const KEY_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    key: String,
    data: Map<String, Value>,
    modified: bool,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    max_age: Duration,
}

impl Session {
    fn new(key: String, data: Map<String, Value>) -> Self {
        Session {
            key,
            data,
            modified: false,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Returns `None` both when the entry is absent and when it holds
    /// something that does not decode as `T`.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let value = self.data.get(name)?;
        match serde_json::from_value(value.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Session entry {:?} is malformed: {}", name, e);
                None
            }
        }
    }

    pub fn insert<T: Serialize>(&mut self, name: &str, value: T) -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(value)?;
        self.data.insert(name.to_string(), value);
        self.modified = true;
        Ok(())
    }
}

pub fn generate_key() -> String {
    let mut rng = rand::thread_rng();
    (0..KEY_LEN)
        .map(|_| KEY_CHARS[rng.gen_range(0..KEY_CHARS.len())] as char)
        .collect()
}

impl SessionStore {
    pub fn new(max_age: Duration) -> Self {
        SessionStore { max_age }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    fn expiry(&self) -> DateTime<Utc> {
        Utc::now() + self.max_age
    }

    /// Expired rows are treated as missing; `clear_expired` reaps them.
    pub fn load<C: GenericClient>(
        &self,
        conn: &mut C,
        key: &str,
    ) -> Result<Option<Session>, postgres::Error> {
        const LOAD_SQL: &str = "SELECT session_data FROM kitchen_session \
                                WHERE session_key = $1 AND expire_date > now()";
        let row = conn.query_opt(LOAD_SQL, &[&key])?;
        let session = row.map(|row| {
            let data = match row.get::<_, Value>(0) {
                Value::Object(map) => map,
                other => {
                    warn!("Discarding non-object session data: {:?}", other);
                    Map::new()
                }
            };
            Session::new(key.to_string(), data)
        });
        trace!("Load session {} -> {:?}", key, session);
        Ok(session)
    }

    /// Start a fresh, empty session under a new key.
    pub fn create<C: GenericClient>(&self, conn: &mut C) -> Result<Session, postgres::Error> {
        const INSERT_SQL: &str = "INSERT INTO kitchen_session (session_key, session_data, expire_date) \
                                  VALUES ($1, '{}'::jsonb, $2) \
                                  ON CONFLICT (session_key) DO NOTHING";
        loop {
            let key = generate_key();
            let nrows = conn.execute(INSERT_SQL, &[&key, &self.expiry()])?;
            if nrows == 1 {
                debug!("Created session {}", key);
                return Ok(Session::new(key, Map::new()));
            }
            warn!("Session key collision on {}; retrying", key);
        }
    }

    /// Write the session back and push its expiry forward. Sessions nobody
    /// changed since they were loaded are left alone.
    pub fn save<C: GenericClient>(&self, conn: &mut C, session: &mut Session) -> Result<(), postgres::Error> {
        const SAVE_SQL: &str = "INSERT INTO kitchen_session (session_key, session_data, expire_date) \
                                VALUES ($1, $2, $3) \
                                ON CONFLICT (session_key) DO UPDATE \
                                SET session_data = EXCLUDED.session_data, expire_date = EXCLUDED.expire_date";
        if !session.is_modified() {
            trace!("Session {} unchanged; not saving", session.key);
            return Ok(());
        }
        let data = Value::Object(session.data.clone());
        conn.execute(SAVE_SQL, &[&session.key, &data, &self.expiry()])?;
        session.modified = false;
        Ok(())
    }

    /// Move the session's contents to a new key and drop the old one, so a
    /// key observed before login is useless afterwards.
    pub fn cycle_key<C: GenericClient>(&self, conn: &mut C, session: &mut Session) -> Result<(), postgres::Error> {
        let old = std::mem::replace(&mut session.key, generate_key());
        self.delete(conn, &old)?;
        session.modified = true;
        self.save(conn, session)
    }

    pub fn delete<C: GenericClient>(&self, conn: &mut C, key: &str) -> Result<(), postgres::Error> {
        conn.execute("DELETE FROM kitchen_session WHERE session_key = $1", &[&key])?;
        Ok(())
    }

    pub fn clear_expired<C: GenericClient>(&self, conn: &mut C) -> Result<u64, postgres::Error> {
        let nrows = conn.execute("DELETE FROM kitchen_session WHERE expire_date <= now()", &[])?;
        info!("Cleared {} expired sessions", nrows);
        Ok(nrows)
    }
}
