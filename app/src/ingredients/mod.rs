use log::*;
use postgres::GenericClient;

use infra::ids::{raw_ids, Entity, Id};
use infra::pagination::Page;
use infra::persistence::{self, group_by, is_unique_violation, DbPool};

use crate::dishes::{self, Dish};
use crate::error::{Error, Result};
use crate::forms::Choice;
use crate::formsets::NameFormset;
use crate::listing::{ListQuery, Listing};
use crate::services::{with_conn, Commandable, Queryable, Request};

mod models;
mod resources;

pub use self::models::*;
pub use self::resources::configure;

pub const NAME_MAX_LENGTH: usize = 255;

const NAME_CONSTRAINT: &str = "kitchen_ingredient_name_key";

const LISTING: Listing = Listing {
    columns: "i.id, i.name",
    from: "kitchen_ingredient i",
    search_column: "i.name",
    order_by: "i.id",
    per_page: 15,
};

#[derive(Debug, Clone)]
pub struct Ingredients {
    db: DbPool,
}

#[derive(Debug, Clone)]
pub struct ListIngredients(pub ListQuery);
#[derive(Debug, Clone, Copy)]
pub struct LoadIngredient(pub Id<Ingredient>);
/// Saves every named row, or hands the formset back with errors marked.
#[derive(Debug, Clone)]
pub struct BulkCreateIngredients(pub NameFormset);
#[derive(Debug, Clone)]
pub struct RenameIngredient {
    pub id: Id<Ingredient>,
    pub name: String,
}
#[derive(Debug, Clone, Copy)]
pub struct DeleteIngredient(pub Id<Ingredient>);

impl Request for ListIngredients {
    type Resp = Page<IngredientWithDishes>;
}
impl Request for LoadIngredient {
    type Resp = Ingredient;
}
impl Request for BulkCreateIngredients {
    type Resp = std::result::Result<Vec<Id<Ingredient>>, NameFormset>;
}
impl Request for RenameIngredient {
    type Resp = ();
}
impl Request for DeleteIngredient {
    type Resp = ();
}

impl Ingredients {
    pub fn new(db: DbPool) -> Self {
        Ingredients { db }
    }
}

pub fn load<C: GenericClient>(conn: &mut C, id: Id<Ingredient>) -> Result<Ingredient> {
    let row = conn.query_opt(
        "SELECT id, name FROM kitchen_ingredient WHERE id = $1",
        &[&id.get()],
    )?;
    row.map(|row| Ingredient::from_row(&row))
        .ok_or(Error::NotFound(Ingredient::VERBOSE_NAME))
}

pub fn choices<C: GenericClient>(conn: &mut C) -> Result<Vec<Choice<Ingredient>>> {
    let rows = conn.query("SELECT id, name FROM kitchen_ingredient ORDER BY id", &[])?;
    Ok(rows
        .iter()
        .map(|row| Choice {
            id: Id::new(row.get("id")),
            label: row.get("name"),
        })
        .collect())
}

fn taken_names<C: GenericClient>(conn: &mut C, names: &[String]) -> Result<Vec<String>> {
    let rows = conn.query(
        "SELECT name FROM kitchen_ingredient WHERE name = ANY($1)",
        &[&names],
    )?;
    Ok(rows.iter().map(|row| row.get("name")).collect())
}

pub fn insert_all<C: GenericClient>(
    conn: &mut C,
    mut formset: NameFormset,
) -> Result<std::result::Result<Vec<Id<Ingredient>>, NameFormset>> {
    formset.require_unique_names();
    let names = formset.names();

    let mut t = conn.transaction()?;
    let taken = taken_names(&mut t, &names)?;
    formset.mark_taken(&taken, DUPLICATE_NAME);
    if !formset.is_valid() {
        debug!("Rejected ingredient batch; taken: {:?}", taken);
        return Ok(Err(formset));
    }

    let mut ids = Vec::with_capacity(names.len());
    for name in names.iter() {
        let inserted = t.query_one(
            "INSERT INTO kitchen_ingredient (name) VALUES ($1) RETURNING id",
            &[name],
        );
        match inserted {
            Ok(row) => ids.push(Id::new(row.get(0))),
            Err(e) if is_unique_violation(&e, NAME_CONSTRAINT) => {
                warn!("Ingredient {:?} was created concurrently", name);
                formset.mark_taken(&[name.clone()], DUPLICATE_NAME);
                return Ok(Err(formset));
            }
            Err(e) => return Err(e.into()),
        }
    }
    t.commit()?;
    info!("Created {} ingredients: {:?}", ids.len(), ids);
    Ok(Ok(ids))
}

/// Rename, keeping names unique across all other ingredients.
pub fn rename<C: GenericClient>(conn: &mut C, id: Id<Ingredient>, name: &str) -> Result<()> {
    let mut t = conn.transaction()?;
    let clash = t
        .query_opt(
            "SELECT 1 FROM kitchen_ingredient WHERE name = $1 AND id <> $2",
            &[&name, &id.get()],
        )?
        .is_some();
    if clash {
        return Err(Error::invalid_field("name", DUPLICATE_NAME));
    }
    let updated = t.execute(
        "UPDATE kitchen_ingredient SET name = $2 WHERE id = $1",
        &[&id.get(), &name],
    );
    match updated {
        Ok(0) => return Err(Error::NotFound(Ingredient::VERBOSE_NAME)),
        Ok(_) => {}
        Err(e) if is_unique_violation(&e, NAME_CONSTRAINT) => {
            return Err(Error::invalid_field("name", DUPLICATE_NAME))
        }
        Err(e) => return Err(e.into()),
    }
    t.commit()?;
    debug!("Renamed ingredient {} to {:?}", id, name);
    Ok(())
}

impl Queryable<ListIngredients> for Ingredients {
    fn query(&self, req: ListIngredients) -> Result<Page<IngredientWithDishes>> {
        with_conn(&self.db, |conn| {
            let page = LISTING.fetch(conn, &req.0, Ingredient::from_row)?;
            let ids = raw_ids(page.iter().map(|i| &i.id));
            let sql = format!(
                "SELECT idn.ingredient_id, {} FROM kitchen_ingredient_dishes idn \
                 JOIN {} ON d.id = idn.dish_id \
                 WHERE idn.ingredient_id = ANY($1) ORDER BY d.id",
                dishes::COLUMNS,
                dishes::FROM
            );
            let rows = conn.query(sql.as_str(), &[&ids])?;
            let mut dishes = group_by(rows.iter().map(|row| {
                (row.get::<_, i64>("ingredient_id"), Dish::from_row(row))
            }));
            Ok(page.map(|ingredient| IngredientWithDishes {
                dishes: dishes.remove(&ingredient.id.get()).unwrap_or_default(),
                ingredient,
            }))
        })
    }
}

impl Queryable<LoadIngredient> for Ingredients {
    fn query(&self, req: LoadIngredient) -> Result<Ingredient> {
        with_conn(&self.db, |conn| load(conn, req.0))
    }
}

impl Commandable<BulkCreateIngredients> for Ingredients {
    fn execute(
        &self,
        req: BulkCreateIngredients,
    ) -> Result<std::result::Result<Vec<Id<Ingredient>>, NameFormset>> {
        with_conn(&self.db, |conn| insert_all(conn, req.0))
    }
}

impl Commandable<RenameIngredient> for Ingredients {
    fn execute(&self, req: RenameIngredient) -> Result<()> {
        with_conn(&self.db, |conn| rename(conn, req.id, &req.name))
    }
}

impl Commandable<DeleteIngredient> for Ingredients {
    fn execute(&self, req: DeleteIngredient) -> Result<()> {
        with_conn(&self.db, |conn| {
            if persistence::delete(conn, req.0)? {
                Ok(())
            } else {
                Err(Error::NotFound(Ingredient::VERBOSE_NAME))
            }
        })
    }
}
