use std::collections::HashMap;

use log::*;
use postgres::{GenericClient, Transaction};

use infra::ids::{raw_ids, Entity, Id};
use infra::pagination::Page;
use infra::persistence::{self, foreign_key_violation, group_by, DbPool};

use crate::cooks::{self, Cook};
use crate::dish_types;
use crate::error::{Error, Result};
use crate::forms::INVALID_CHOICE;
use crate::ingredients::{self, Ingredient};
use crate::listing::{ListQuery, Listing};
use crate::services::{with_conn, Commandable, Queryable, Request};

pub mod forms;
mod models;
mod resources;

pub use self::forms::{DishChoices, DishForm, DishInput};
pub use self::models::*;
pub use self::resources::configure;

const LISTING: Listing = Listing {
    columns: COLUMNS,
    from: FROM,
    search_column: "d.name",
    order_by: "d.id",
    per_page: 10,
};

#[derive(Debug, Clone)]
pub struct Dishes {
    db: DbPool,
}

#[derive(Debug, Clone)]
pub struct ListDishes(pub ListQuery);
#[derive(Debug, Clone, Copy)]
pub struct ShowDish(pub Id<Dish>);
#[derive(Debug, Clone, Copy)]
pub struct LoadDishChoices;
#[derive(Debug, Clone)]
pub struct CreateDish(pub DishInput);
#[derive(Debug, Clone)]
pub struct UpdateDish {
    pub id: Id<Dish>,
    pub input: DishInput,
}
#[derive(Debug, Clone, Copy)]
pub struct DeleteDish(pub Id<Dish>);

impl Request for ListDishes {
    type Resp = Page<DishWithCooks>;
}
impl Request for ShowDish {
    type Resp = DishDetail;
}
impl Request for LoadDishChoices {
    type Resp = DishChoices;
}
impl Request for CreateDish {
    type Resp = Id<Dish>;
}
impl Request for UpdateDish {
    type Resp = ();
}
impl Request for DeleteDish {
    type Resp = ();
}

impl Dishes {
    pub fn new(db: DbPool) -> Self {
        Dishes { db }
    }
}

pub fn load<C: GenericClient>(conn: &mut C, id: Id<Dish>) -> Result<Dish> {
    let sql = format!("SELECT {} FROM {} WHERE d.id = $1", COLUMNS, FROM);
    let row = conn.query_opt(sql.as_str(), &[&id.get()])?;
    row.map(|row| Dish::from_row(&row))
        .ok_or(Error::NotFound(Dish::VERBOSE_NAME))
}

fn cooks_by_dish<C: GenericClient>(conn: &mut C, ids: &[i64]) -> Result<HashMap<i64, Vec<Cook>>> {
    let sql = format!(
        "SELECT dc.dish_id, {} FROM kitchen_dish_cooks dc \
         JOIN kitchen_cook c ON c.id = dc.cook_id \
         WHERE dc.dish_id = ANY($1) ORDER BY c.id",
        cooks::COLUMNS
    );
    let rows = conn.query(sql.as_str(), &[&ids])?;
    Ok(group_by(
        rows.iter()
            .map(|row| (row.get::<_, i64>("dish_id"), Cook::from_row(row))),
    ))
}

fn ingredients_of<C: GenericClient>(conn: &mut C, id: Id<Dish>) -> Result<Vec<Ingredient>> {
    let rows = conn.query(
        "SELECT i.id, i.name FROM kitchen_ingredient_dishes idn \
         JOIN kitchen_ingredient i ON i.id = idn.ingredient_id \
         WHERE idn.dish_id = $1 ORDER BY i.id",
        &[&id.get()],
    )?;
    Ok(rows.iter().map(Ingredient::from_row).collect())
}

pub fn detail<C: GenericClient>(conn: &mut C, id: Id<Dish>) -> Result<DishDetail> {
    let dish = load(conn, id)?;
    let cooks = cooks_by_dish(conn, &[id.get()])?
        .remove(&id.get())
        .unwrap_or_default();
    let ingredients = ingredients_of(conn, id)?;
    Ok(DishDetail {
        dish,
        cooks,
        ingredients,
    })
}

pub fn choices<C: GenericClient>(conn: &mut C) -> Result<DishChoices> {
    Ok(DishChoices {
        dish_types: dish_types::choices(conn)?,
        cooks: cooks::choices(conn)?,
        ingredients: ingredients::choices(conn)?,
    })
}

/// Choices that vanish between form validation and the write surface as
/// foreign key violations; report them against the field that offered them.
fn stale_choice(err: postgres::Error) -> Error {
    let field = match foreign_key_violation(&err) {
        Some("kitchen_dish_dish_type_id_fkey") => "dish_type",
        Some("kitchen_dish_cooks_cook_id_fkey") => "cooks",
        Some("kitchen_ingredient_dishes_ingredient_id_fkey") => "ingredients",
        _ => return err.into(),
    };
    warn!("Dish {} choice went away: {}", field, err);
    Error::invalid_field(field, INVALID_CHOICE)
}

/// Replace both link sets of a dish.
fn set_links(t: &mut Transaction<'_>, id: Id<Dish>, input: &DishInput) -> Result<()> {
    t.execute("DELETE FROM kitchen_dish_cooks WHERE dish_id = $1", &[&id.get()])?;
    t.execute(
        "INSERT INTO kitchen_dish_cooks (dish_id, cook_id) SELECT $1::bigint, unnest($2::bigint[])",
        &[&id.get(), &raw_ids(&input.cooks)],
    )
    .map_err(stale_choice)?;
    t.execute(
        "DELETE FROM kitchen_ingredient_dishes WHERE dish_id = $1",
        &[&id.get()],
    )?;
    t.execute(
        "INSERT INTO kitchen_ingredient_dishes (ingredient_id, dish_id) \
         SELECT unnest($2::bigint[]), $1::bigint",
        &[&id.get(), &raw_ids(&input.ingredients)],
    )
    .map_err(stale_choice)?;
    Ok(())
}

pub fn insert<C: GenericClient>(conn: &mut C, input: &DishInput) -> Result<Id<Dish>> {
    let mut t = conn.transaction()?;
    let row = t.query_one(
        "INSERT INTO kitchen_dish (name, description, price, dish_type_id) \
         VALUES ($1, $2, $3, $4) RETURNING id",
        &[
            &input.name,
            &input.description,
            &input.price,
            &input.dish_type.get(),
        ],
    )
    .map_err(stale_choice)?;
    let id = Id::new(row.get(0));
    set_links(&mut t, id, input)?;
    t.commit()?;
    info!("Created dish {} ({:?})", id, input.name);
    Ok(id)
}

pub fn update<C: GenericClient>(conn: &mut C, id: Id<Dish>, input: &DishInput) -> Result<()> {
    let mut t = conn.transaction()?;
    let nrows = t.execute(
        "UPDATE kitchen_dish SET name = $2, description = $3, price = $4, dish_type_id = $5 \
         WHERE id = $1",
        &[
            &id.get(),
            &input.name,
            &input.description,
            &input.price,
            &input.dish_type.get(),
        ],
    )
    .map_err(stale_choice)?;
    if nrows == 0 {
        return Err(Error::NotFound(Dish::VERBOSE_NAME));
    }
    set_links(&mut t, id, input)?;
    t.commit()?;
    debug!("Updated dish {}", id);
    Ok(())
}

impl Queryable<ListDishes> for Dishes {
    fn query(&self, req: ListDishes) -> Result<Page<DishWithCooks>> {
        with_conn(&self.db, |conn| {
            let page = LISTING.fetch(conn, &req.0, Dish::from_row)?;
            let ids = raw_ids(page.iter().map(|d| &d.id));
            let mut cooks = cooks_by_dish(conn, &ids)?;
            Ok(page.map(|dish| DishWithCooks {
                cooks: cooks.remove(&dish.id.get()).unwrap_or_default(),
                dish,
            }))
        })
    }
}

impl Queryable<ShowDish> for Dishes {
    fn query(&self, req: ShowDish) -> Result<DishDetail> {
        with_conn(&self.db, |conn| detail(conn, req.0))
    }
}

impl Queryable<LoadDishChoices> for Dishes {
    fn query(&self, _: LoadDishChoices) -> Result<DishChoices> {
        with_conn(&self.db, |conn| choices(conn))
    }
}

impl Commandable<CreateDish> for Dishes {
    fn execute(&self, req: CreateDish) -> Result<Id<Dish>> {
        with_conn(&self.db, |conn| insert(conn, &req.0))
    }
}

impl Commandable<UpdateDish> for Dishes {
    fn execute(&self, req: UpdateDish) -> Result<()> {
        with_conn(&self.db, |conn| update(conn, req.id, &req.input))
    }
}

impl Commandable<DeleteDish> for Dishes {
    fn execute(&self, req: DeleteDish) -> Result<()> {
        with_conn(&self.db, |conn| {
            if persistence::delete(conn, req.0)? {
                Ok(())
            } else {
                Err(Error::NotFound(Dish::VERBOSE_NAME))
            }
        })
    }
}
