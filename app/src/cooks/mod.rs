use log::*;
use postgres::GenericClient;

use infra::ids::{raw_ids, Entity, Id};
use infra::pagination::Page;
use infra::passwords;
use infra::persistence::{self, group_by, is_unique_violation, DbPool};

use crate::dishes::{self, Dish};
use crate::error::{Error, Result};
use crate::forms::Choice;
use crate::listing::{ListQuery, Listing};
use crate::services::{with_conn, Commandable, Queryable, Request};

pub mod forms;
mod models;
mod resources;

pub use self::forms::{CookCreationForm, ExperienceForm, NewCook};
pub use self::models::*;
pub use self::resources::configure;

const LISTING: Listing = Listing {
    columns: COLUMNS,
    from: "kitchen_cook c",
    search_column: "c.username",
    order_by: "c.id",
    per_page: 5,
};

const USERNAME_CONSTRAINT: &str = "kitchen_cook_username_key";

#[derive(Debug, Clone)]
pub struct Cooks {
    db: DbPool,
}

#[derive(Debug, Clone)]
pub struct ListCooks(pub ListQuery);
#[derive(Debug, Clone, Copy)]
pub struct LoadCook(pub Id<Cook>);
#[derive(Debug, Clone, Copy)]
pub struct CookDetail(pub Id<Cook>);
#[derive(Debug, Clone)]
pub struct CreateCook(pub NewCook);
#[derive(Debug, Clone, Copy)]
pub struct UpdateExperience {
    pub id: Id<Cook>,
    pub years_of_experience: Option<i32>,
}
#[derive(Debug, Clone, Copy)]
pub struct DeleteCook(pub Id<Cook>);

impl Request for ListCooks {
    type Resp = Page<CookWithDishes>;
}
impl Request for LoadCook {
    type Resp = Cook;
}
impl Request for CookDetail {
    type Resp = CookWithDishes;
}
impl Request for CreateCook {
    type Resp = Id<Cook>;
}
impl Request for UpdateExperience {
    type Resp = ();
}
impl Request for DeleteCook {
    type Resp = ();
}

impl Cooks {
    pub fn new(db: DbPool) -> Self {
        Cooks { db }
    }
}

pub fn load<C: GenericClient>(conn: &mut C, id: Id<Cook>) -> Result<Cook> {
    let sql = format!("SELECT {} FROM kitchen_cook c WHERE c.id = $1", COLUMNS);
    let row = conn.query_opt(sql.as_str(), &[&id.get()])?;
    row.map(|row| Cook::from_row(&row))
        .ok_or(Error::NotFound(Cook::VERBOSE_NAME))
}

/// The cook behind a session, provided they may still log in.
pub fn load_active<C: GenericClient>(conn: &mut C, id: Id<Cook>) -> Result<Option<Cook>> {
    let sql = format!(
        "SELECT {} FROM kitchen_cook c WHERE c.id = $1 AND c.is_active",
        COLUMNS
    );
    let row = conn.query_opt(sql.as_str(), &[&id.get()])?;
    Ok(row.map(|row| Cook::from_row(&row)))
}

/// Id and password hash of an active cook.
pub fn credentials<C: GenericClient>(
    conn: &mut C,
    username: &str,
) -> Result<Option<(Id<Cook>, String)>> {
    let row = conn.query_opt(
        "SELECT id, password FROM kitchen_cook WHERE username = $1 AND is_active",
        &[&username],
    )?;
    Ok(row.map(|row| (Id::new(row.get("id")), row.get("password"))))
}

pub fn touch_last_login<C: GenericClient>(conn: &mut C, id: Id<Cook>) -> Result<()> {
    conn.execute(
        "UPDATE kitchen_cook SET last_login = now() WHERE id = $1",
        &[&id.get()],
    )?;
    Ok(())
}

pub fn choices<C: GenericClient>(conn: &mut C) -> Result<Vec<Choice<Cook>>> {
    let sql = format!("SELECT {} FROM kitchen_cook c ORDER BY c.id", COLUMNS);
    let rows = conn.query(sql.as_str(), &[])?;
    Ok(rows
        .iter()
        .map(|row| {
            let cook = Cook::from_row(row);
            Choice {
                id: cook.id,
                label: cook.to_string(),
            }
        })
        .collect())
}

/// Store a validated registration. A taken username is reported against
/// the form field, whether we spot it first or the unique index does.
pub fn insert<C: GenericClient>(conn: &mut C, cook: &NewCook) -> Result<Id<Cook>> {
    let hash = passwords::hash(&cook.password)?;
    let mut t = conn.transaction()?;

    let taken = t
        .query_opt(
            "SELECT 1 FROM kitchen_cook WHERE username = $1",
            &[&cook.username],
        )?
        .is_some();
    if taken {
        return Err(Error::invalid_field("username", forms::DUPLICATE_USERNAME));
    }

    let inserted = t.query_one(
        "INSERT INTO kitchen_cook \
         (password, username, first_name, last_name, is_staff, years_of_experience) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        &[
            &hash,
            &cook.username,
            &cook.first_name,
            &cook.last_name,
            &cook.is_staff,
            &cook.years_of_experience,
        ],
    );
    let row = match inserted {
        Ok(row) => row,
        Err(e) if is_unique_violation(&e, USERNAME_CONSTRAINT) => {
            return Err(Error::invalid_field("username", forms::DUPLICATE_USERNAME))
        }
        Err(e) => return Err(e.into()),
    };
    t.commit()?;

    let id = Id::new(row.get(0));
    info!("Registered cook {} as {}", cook.username, id);
    Ok(id)
}

/// Dishes (with their types) for each cook, keyed by raw cook id.
fn dishes_by_cook<C: GenericClient>(
    conn: &mut C,
    ids: &[i64],
) -> Result<std::collections::HashMap<i64, Vec<Dish>>> {
    let sql = format!(
        "SELECT dc.cook_id, {} FROM kitchen_dish_cooks dc \
         JOIN {} ON d.id = dc.dish_id \
         WHERE dc.cook_id = ANY($1) ORDER BY d.id",
        dishes::COLUMNS,
        dishes::FROM
    );
    let rows = conn.query(sql.as_str(), &[&ids])?;
    Ok(group_by(
        rows.iter()
            .map(|row| (row.get::<_, i64>("cook_id"), Dish::from_row(row))),
    ))
}

impl Queryable<ListCooks> for Cooks {
    fn query(&self, req: ListCooks) -> Result<Page<CookWithDishes>> {
        with_conn(&self.db, |conn| {
            let page = LISTING.fetch(conn, &req.0, Cook::from_row)?;
            let ids = raw_ids(page.iter().map(|c| &c.id));
            let mut dishes = dishes_by_cook(conn, &ids)?;
            Ok(page.map(|cook| CookWithDishes {
                dishes: dishes.remove(&cook.id.get()).unwrap_or_default(),
                cook,
            }))
        })
    }
}

impl Queryable<LoadCook> for Cooks {
    fn query(&self, req: LoadCook) -> Result<Cook> {
        with_conn(&self.db, |conn| load(conn, req.0))
    }
}

impl Queryable<CookDetail> for Cooks {
    fn query(&self, req: CookDetail) -> Result<CookWithDishes> {
        with_conn(&self.db, |conn| {
            let cook = load(conn, req.0)?;
            let dishes = dishes_by_cook(conn, &[cook.id.get()])?
                .remove(&cook.id.get())
                .unwrap_or_default();
            Ok(CookWithDishes { cook, dishes })
        })
    }
}

impl Commandable<CreateCook> for Cooks {
    fn execute(&self, req: CreateCook) -> Result<Id<Cook>> {
        with_conn(&self.db, |conn| insert(conn, &req.0))
    }
}

impl Commandable<UpdateExperience> for Cooks {
    fn execute(&self, req: UpdateExperience) -> Result<()> {
        with_conn(&self.db, |conn| {
            let nrows = conn.execute(
                "UPDATE kitchen_cook SET years_of_experience = $2 WHERE id = $1",
                &[&req.id.get(), &req.years_of_experience],
            )?;
            if nrows == 0 {
                return Err(Error::NotFound(Cook::VERBOSE_NAME));
            }
            debug!("Cook {} now has {:?} years", req.id, req.years_of_experience);
            Ok(())
        })
    }
}

impl Commandable<DeleteCook> for Cooks {
    fn execute(&self, req: DeleteCook) -> Result<()> {
        with_conn(&self.db, |conn| {
            if persistence::delete(conn, req.0)? {
                Ok(())
            } else {
                Err(Error::NotFound(Cook::VERBOSE_NAME))
            }
        })
    }
}
