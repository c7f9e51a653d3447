use std::collections::HashMap;
use std::hash::Hash;

use log::*;
use postgres::error::SqlState;
use postgres::{GenericClient, NoTls};
use r2d2::Pool;
use r2d2_postgres::PostgresConnectionManager;

use crate::ids::{Entity, Id};

pub type Manager = PostgresConnectionManager<NoTls>;
pub type DbPool = Pool<Manager>;

pub fn manager(url: &str) -> Result<Manager, postgres::Error> {
    let config = url.parse::<postgres::Config>()?;
    debug!("Connection config: {:?}", config);
    Ok(PostgresConnectionManager::new(config, NoTls))
}

/// Apply a batch of (idempotent) DDL statements in one transaction.
pub fn setup<C: GenericClient>(conn: &mut C, ddl: &str) -> Result<(), postgres::Error> {
    let mut t = conn.transaction()?;
    t.batch_execute(ddl)?;
    t.commit()?;
    Ok(())
}

pub fn count<T: Entity, C: GenericClient>(conn: &mut C) -> Result<i64, postgres::Error> {
    let sql = format!("SELECT count(*) FROM {}", T::TABLE);
    let row = conn.query_one(sql.as_str(), &[])?;
    Ok(row.get(0))
}

/// Delete by primary key, returning whether a row went away. Dependent rows
/// are removed by the schema's `ON DELETE CASCADE` clauses.
pub fn delete<T: Entity, C: GenericClient>(conn: &mut C, id: Id<T>) -> Result<bool, postgres::Error> {
    let sql = format!("DELETE FROM {} WHERE id = $1", T::TABLE);
    let nrows = conn.execute(sql.as_str(), &[&id.get()])?;
    debug!("Delete {} {} removed {} rows", T::TABLE, id, nrows);
    Ok(nrows == 1)
}

/// Build an `ILIKE` pattern matching `term` anywhere, with the wildcard
/// characters in `term` itself escaped.
pub fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if c == '%' || c == '_' || c == '\\' {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub fn is_unique_violation(err: &postgres::Error, constraint: &str) -> bool {
    if err.code() != Some(&SqlState::UNIQUE_VIOLATION) {
        return false;
    }
    err.as_db_error()
        .and_then(|db| db.constraint())
        .map(|c| c == constraint)
        .unwrap_or(false)
}

/// The constraint a foreign key violation tripped, if that is what `err` is.
pub fn foreign_key_violation(err: &postgres::Error) -> Option<&str> {
    if err.code() != Some(&SqlState::FOREIGN_KEY_VIOLATION) {
        return None;
    }
    err.as_db_error().and_then(|db| db.constraint())
}

/// Bucket `(key, value)` pairs, preserving the order values arrive in. This
/// is how prefetched relations get stitched back onto their owners.
pub fn group_by<K: Hash + Eq, V, I: IntoIterator<Item = (K, V)>>(pairs: I) -> HashMap<K, Vec<V>> {
    let mut map: HashMap<K, Vec<V>> = HashMap::new();
    for (k, v) in pairs {
        map.entry(k).or_default().push(v);
    }
    map
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn contains_pattern_wraps_term() {
        assert_eq!(contains_pattern("sal"), "%sal%");
    }

    #[test]
    fn contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn group_by_keeps_arrival_order() {
        let grouped = group_by(vec![(1, "a"), (2, "b"), (1, "c")]);
        assert_eq!(grouped[&1], vec!["a", "c"]);
        assert_eq!(grouped[&2], vec!["b"]);
    }
}
