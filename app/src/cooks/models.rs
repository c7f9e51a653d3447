use std::fmt;

use chrono::{DateTime, Utc};
use postgres::Row;
use serde::ser::{Serialize, SerializeStruct, Serializer};

use infra::ids::{Entity, Id};

use crate::dishes::Dish;

/// Selected as `c.*`-style columns so the same list works in joins.
pub const COLUMNS: &str = "c.id, c.username, c.first_name, c.last_name, c.email, \
                           c.is_staff, c.is_superuser, c.is_active, c.date_joined, \
                           c.last_login, c.years_of_experience";

/// A staff account. The password hash never leaves the database layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Cook {
    pub id: Id<Cook>,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub years_of_experience: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CookWithDishes {
    #[serde(flatten)]
    pub cook: Cook,
    pub dishes: Vec<Dish>,
}

impl Entity for Cook {
    const TABLE: &'static str = "kitchen_cook";
    const VERBOSE_NAME: &'static str = "cook";
}

impl Cook {
    pub fn from_row(row: &Row) -> Self {
        Cook {
            id: Id::new(row.get("id")),
            username: row.get("username"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            email: row.get("email"),
            is_staff: row.get("is_staff"),
            is_superuser: row.get("is_superuser"),
            is_active: row.get("is_active"),
            date_joined: row.get("date_joined"),
            last_login: row.get("last_login"),
            years_of_experience: row.get("years_of_experience"),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn absolute_url(&self) -> String {
        format!("/cooks/{}/", self.id)
    }
}

impl fmt::Display for Cook {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.years_of_experience {
            Some(years) => write!(f, "{} ({} years of experience)", self.username, years),
            None => write!(f, "{} (None years of experience)", self.username),
        }
    }
}

// Templates want the derived values alongside the stored ones.
impl Serialize for Cook {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Cook", 14)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("username", &self.username)?;
        s.serialize_field("first_name", &self.first_name)?;
        s.serialize_field("last_name", &self.last_name)?;
        s.serialize_field("email", &self.email)?;
        s.serialize_field("is_staff", &self.is_staff)?;
        s.serialize_field("is_superuser", &self.is_superuser)?;
        s.serialize_field("is_active", &self.is_active)?;
        s.serialize_field("date_joined", &self.date_joined)?;
        s.serialize_field("last_login", &self.last_login)?;
        s.serialize_field("years_of_experience", &self.years_of_experience)?;
        s.serialize_field("full_name", &self.full_name())?;
        s.serialize_field("absolute_url", &self.absolute_url())?;
        s.serialize_field("display", &self.to_string())?;
        s.end()
    }
}

#[cfg(test)]
pub(crate) fn sample(id: i64, username: &str, years: Option<i32>) -> Cook {
    Cook {
        id: Id::new(id),
        username: username.into(),
        first_name: String::new(),
        last_name: String::new(),
        email: String::new(),
        is_staff: false,
        is_superuser: false,
        is_active: true,
        date_joined: Utc::now(),
        last_login: None,
        years_of_experience: years,
    }
}
