use log::*;
use postgres::GenericClient;

use infra::ids::{raw_ids, Entity, Id};
use infra::pagination::Page;
use infra::persistence::{self, group_by, DbPool};

use crate::dishes::DishRef;
use crate::error::{Error, Result};
use crate::forms::Choice;
use crate::listing::{ListQuery, Listing};
use crate::services::{with_conn, Commandable, Queryable, Request};

mod models;
mod resources;

pub use self::models::*;
pub use self::resources::configure;

pub const NAME_MAX_LENGTH: usize = 255;

const LISTING: Listing = Listing {
    columns: "t.id, t.name",
    from: "kitchen_dishtype t",
    search_column: "t.name",
    order_by: "t.id",
    per_page: 10,
};

#[derive(Debug, Clone)]
pub struct DishTypes {
    db: DbPool,
}

#[derive(Debug, Clone)]
pub struct ListDishTypes(pub ListQuery);
#[derive(Debug, Clone, Copy)]
pub struct LoadDishType(pub Id<DishType>);
#[derive(Debug, Clone)]
pub struct BulkCreateDishTypes(pub Vec<String>);
#[derive(Debug, Clone)]
pub struct RenameDishType {
    pub id: Id<DishType>,
    pub name: String,
}
#[derive(Debug, Clone, Copy)]
pub struct DeleteDishType(pub Id<DishType>);

impl Request for ListDishTypes {
    type Resp = Page<DishTypeWithDishes>;
}
impl Request for LoadDishType {
    type Resp = DishType;
}
impl Request for BulkCreateDishTypes {
    type Resp = Vec<Id<DishType>>;
}
impl Request for RenameDishType {
    type Resp = ();
}
impl Request for DeleteDishType {
    type Resp = ();
}

impl DishTypes {
    pub fn new(db: DbPool) -> Self {
        DishTypes { db }
    }
}

pub fn load<C: GenericClient>(conn: &mut C, id: Id<DishType>) -> Result<DishType> {
    let row = conn.query_opt(
        "SELECT id, name FROM kitchen_dishtype WHERE id = $1",
        &[&id.get()],
    )?;
    row.map(|row| DishType::from_row(&row))
        .ok_or(Error::NotFound(DishType::VERBOSE_NAME))
}

pub fn choices<C: GenericClient>(conn: &mut C) -> Result<Vec<Choice<DishType>>> {
    let rows = conn.query("SELECT id, name FROM kitchen_dishtype ORDER BY id", &[])?;
    Ok(rows
        .iter()
        .map(|row| Choice {
            id: Id::new(row.get("id")),
            label: row.get("name"),
        })
        .collect())
}

pub fn insert_all<C: GenericClient>(conn: &mut C, names: &[String]) -> Result<Vec<Id<DishType>>> {
    let mut t = conn.transaction()?;
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        let row = t.query_one(
            "INSERT INTO kitchen_dishtype (name) VALUES ($1) RETURNING id",
            &[name],
        )?;
        ids.push(Id::new(row.get(0)));
    }
    t.commit()?;
    info!("Created {} dish types: {:?}", ids.len(), ids);
    Ok(ids)
}

/// The dishes of each listed type, in id order.
fn prefetch_dishes<C: GenericClient>(
    conn: &mut C,
    page: Page<DishType>,
) -> Result<Page<DishTypeWithDishes>> {
    let ids = raw_ids(page.iter().map(|t| &t.id));
    let rows = conn.query(
        "SELECT d.dish_type_id, d.id, d.name FROM kitchen_dish d \
         WHERE d.dish_type_id = ANY($1) ORDER BY d.id",
        &[&ids],
    )?;
    let mut dishes = group_by(
        rows.iter()
            .map(|row| (row.get::<_, i64>("dish_type_id"), DishRef::from_row(row))),
    );
    Ok(page.map(|dish_type| DishTypeWithDishes {
        dishes: dishes.remove(&dish_type.id.get()).unwrap_or_default(),
        dish_type,
    }))
}

impl Queryable<ListDishTypes> for DishTypes {
    fn query(&self, req: ListDishTypes) -> Result<Page<DishTypeWithDishes>> {
        with_conn(&self.db, |conn| {
            let page = LISTING.fetch(conn, &req.0, DishType::from_row)?;
            prefetch_dishes(conn, page)
        })
    }
}

impl Queryable<LoadDishType> for DishTypes {
    fn query(&self, req: LoadDishType) -> Result<DishType> {
        with_conn(&self.db, |conn| load(conn, req.0))
    }
}

impl Commandable<BulkCreateDishTypes> for DishTypes {
    fn execute(&self, req: BulkCreateDishTypes) -> Result<Vec<Id<DishType>>> {
        with_conn(&self.db, |conn| insert_all(conn, &req.0))
    }
}

impl Commandable<RenameDishType> for DishTypes {
    fn execute(&self, req: RenameDishType) -> Result<()> {
        with_conn(&self.db, |conn| {
            let nrows = conn.execute(
                "UPDATE kitchen_dishtype SET name = $2 WHERE id = $1",
                &[&req.id.get(), &req.name],
            )?;
            if nrows == 0 {
                return Err(Error::NotFound(DishType::VERBOSE_NAME));
            }
            debug!("Renamed dish type {} to {:?}", req.id, req.name);
            Ok(())
        })
    }
}

impl Commandable<DeleteDishType> for DishTypes {
    fn execute(&self, req: DeleteDishType) -> Result<()> {
        with_conn(&self.db, |conn| {
            if persistence::delete(conn, req.0)? {
                Ok(())
            } else {
                Err(Error::NotFound(DishType::VERBOSE_NAME))
            }
        })
    }
}
