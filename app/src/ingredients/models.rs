use std::fmt;

use postgres::Row;
use serde::Serialize;

use infra::ids::{Entity, Id};

use crate::dishes::Dish;

pub const DUPLICATE_NAME: &str = "Ingredient with this Name already exists.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ingredient {
    pub id: Id<Ingredient>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngredientWithDishes {
    #[serde(flatten)]
    pub ingredient: Ingredient,
    pub dishes: Vec<Dish>,
}

impl Entity for Ingredient {
    const TABLE: &'static str = "kitchen_ingredient";
    const VERBOSE_NAME: &'static str = "ingredient";
}

impl Ingredient {
    pub fn from_row(row: &Row) -> Self {
        Ingredient {
            id: Id::new(row.get("id")),
            name: row.get("name"),
        }
    }
}

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.name)
    }
}
