use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use err_derive::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A primary key for rows of `T`, backed by a postgres `bigserial`.
pub struct Id<T> {
    val: i64,
    phantom: PhantomData<T>,
}

#[derive(Debug, Clone, Error)]
pub enum IdParseError {
    #[error(display = "Unparseable Id: {:?}", _0)]
    Unparseable(String),
    #[error(display = "Id must be positive: {}", _0)]
    NotPositive(i64),
}

pub trait Entity {
    /// Table holding rows of this entity.
    const TABLE: &'static str;
    /// Human readable name, used in not-found messages.
    const VERBOSE_NAME: &'static str;
}

impl<T> Id<T> {
    pub fn new(val: i64) -> Self {
        Id {
            val,
            phantom: PhantomData,
        }
    }

    pub fn get(&self) -> i64 {
        self.val
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", self.val)
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_tuple("Id").field(&self.val).finish()
    }
}

impl<T> std::str::FromStr for Id<T> {
    type Err = IdParseError;
    fn from_str(src: &str) -> Result<Self, Self::Err> {
        let val = src
            .trim()
            .parse::<i64>()
            .map_err(|_| IdParseError::Unparseable(src.to_string()))?;
        if val < 1 {
            return Err(IdParseError::NotPositive(val));
        }
        Ok(Id::new(val))
    }
}

impl<T> From<i64> for Id<T> {
    fn from(val: i64) -> Self {
        Id::new(val)
    }
}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.val.hash(state)
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.val == other.val
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.val.cmp(&other.val)
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        Id::new(self.val)
    }
}

impl<T> Copy for Id<T> {}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.val)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i64::deserialize(deserializer).map(Id::new)
    }
}

/// Collect the raw keys of a set of ids, for `= ANY($1)` style queries.
pub fn raw_ids<'a, T: 'a, I: IntoIterator<Item = &'a Id<T>>>(ids: I) -> Vec<i64> {
    ids.into_iter().map(|id| id.get()).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug)]
    struct Canary;

    impl Entity for Canary {
        const TABLE: &'static str = "canary";
        const VERBOSE_NAME: &'static str = "canary";
    }

    #[test]
    fn round_trips_via_to_from_str() {
        let id = Id::<Canary>::new(42);
        let s = id.to_string();
        assert_eq!(s, "42");
        let id2 = s.parse::<Id<Canary>>().expect("parse id");
        assert_eq!(id, id2);
    }

    #[test]
    fn serializes_as_a_number() {
        let id = Id::<Canary>::new(7);

        let json = serde_json::to_string(&id).expect("serde_json::to_string");
        assert_eq!(json, "7");
        let id2: Id<Canary> = serde_json::from_str(&json).expect("serde_json::from_str");
        assert_eq!(id, id2);
    }

    #[test]
    fn should_allow_ordering() {
        let a = Id::<Canary>::new(1);
        let b = Id::<Canary>::new(2);
        assert!(a < b);
    }

    #[test]
    fn should_yield_useful_error_when_not_a_number() {
        let s = "create";
        let result = s.parse::<Id<Canary>>();

        assert!(
            result.is_err(),
            "Parsing {:?} should return error; got {:?}",
            s,
            result,
        )
    }

    #[test]
    fn should_reject_non_positive_keys() {
        let result = "0".parse::<Id<Canary>>();
        assert!(result.is_err(), "got {:?}", result);
    }
}
