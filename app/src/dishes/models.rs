use std::fmt;

use postgres::Row;
use rust_decimal::Decimal;
use serde::Serialize;

use infra::ids::{Entity, Id};

use crate::cooks::Cook;
use crate::dish_types::DishType;
use crate::ingredients::Ingredient;

/// Dish columns with the owning dish type joined in as `t`.
pub const COLUMNS: &str = "d.id, d.name, d.description, d.price, \
                           t.id AS dish_type_id, t.name AS dish_type_name";
pub const FROM: &str = "kitchen_dish d JOIN kitchen_dishtype t ON t.id = d.dish_type_id";

pub const MAX_DIGITS: u32 = 10;
pub const DECIMAL_PLACES: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dish {
    pub id: Id<Dish>,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub dish_type: DishType,
}

/// Just enough of a dish to link to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DishRef {
    pub id: Id<Dish>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DishWithCooks {
    #[serde(flatten)]
    pub dish: Dish,
    pub cooks: Vec<Cook>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DishDetail {
    pub dish: Dish,
    pub cooks: Vec<Cook>,
    pub ingredients: Vec<Ingredient>,
}

impl Entity for Dish {
    const TABLE: &'static str = "kitchen_dish";
    const VERBOSE_NAME: &'static str = "dish";
}

impl Dish {
    pub fn from_row(row: &Row) -> Self {
        Dish {
            id: Id::new(row.get("id")),
            name: row.get("name"),
            description: row.get("description"),
            price: row.get("price"),
            dish_type: DishType {
                id: Id::new(row.get("dish_type_id")),
                name: row.get("dish_type_name"),
            },
        }
    }

    pub fn absolute_url(&self) -> String {
        format!("/dishes/{}", self.id)
    }
}

impl DishRef {
    pub fn from_row(row: &Row) -> Self {
        DishRef {
            id: Id::new(row.get("id")),
            name: row.get("name"),
        }
    }
}

impl fmt::Display for Dish {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn displays_its_name() {
        let dish = Dish {
            id: Id::new(4),
            name: "Borscht".into(),
            description: "Beetroot soup".into(),
            price: Decimal::new(1250, 2),
            dish_type: DishType {
                id: Id::new(1),
                name: "Soup".into(),
            },
        };
        assert_eq!(dish.to_string(), "Borscht");
        assert_eq!(dish.absolute_url(), "/dishes/4");
    }

    #[test]
    fn price_keeps_its_scale_when_serialized() {
        let json = serde_json::to_value(Decimal::new(1250, 2)).expect("to_value");
        assert_eq!(json, "12.50");
    }
}
