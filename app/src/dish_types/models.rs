use std::fmt;

use postgres::Row;
use serde::Serialize;

use infra::ids::{Entity, Id};

use crate::dishes::DishRef;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DishType {
    pub id: Id<DishType>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DishTypeWithDishes {
    #[serde(flatten)]
    pub dish_type: DishType,
    pub dishes: Vec<DishRef>,
}

impl Entity for DishType {
    const TABLE: &'static str = "kitchen_dishtype";
    const VERBOSE_NAME: &'static str = "dish type";
}

impl DishType {
    pub fn from_row(row: &Row) -> Self {
        DishType {
            id: Id::new(row.get("id")),
            name: row.get("name"),
        }
    }
}

impl fmt::Display for DishType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn displays_its_name() {
        let salad = DishType {
            id: Id::new(1),
            name: "Salad".into(),
        };
        assert_eq!(salad.to_string(), "Salad");
    }
}
