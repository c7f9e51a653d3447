//! Guarded with `#[cfg(test)]` from `lib.rs`. Each test works in its own
//! schema and quietly passes when `$POSTGRES_URL` is unset.

use anyhow::Result;
use rust_decimal::Decimal;

use infra::ids::Id;
use infra::pagination::PageRequest;
use infra::persistence;

use crate::cooks::{forms::NewCook, Cook, CookDetail, CreateCook, DeleteCook, UpdateExperience};
use crate::dish_types::{BulkCreateDishTypes, DeleteDishType, DishType, ListDishTypes};
use crate::dishes::{CreateDish, Dish, DishInput, ListDishes, ShowDish, UpdateDish};
use crate::error::Error;
use crate::forms::{FormData, INVALID_CHOICE};
use crate::formsets::NameFormset;
use crate::ingredients::{
    BulkCreateIngredients, Ingredient, ListIngredients, RenameIngredient, DUPLICATE_NAME,
    NAME_MAX_LENGTH,
};
use crate::listing::ListQuery;
use crate::services::{with_conn, Commandable, Queryable};
use crate::Kitchen;


macro_rules! kitchen_or_skip {
    ($schema: expr) => {
        match junk_drawer::kitchen($schema)? {
            Some(kitchen) => kitchen,
            None => return Ok(()),
        }
    };
}

fn new_cook(username: &str, years: i32) -> NewCook {
    NewCook {
        username: username.into(),
        first_name: "Ada".into(),
        last_name: "Byron".into(),
        years_of_experience: years,
        password: "correct horse battery".into(),
        is_staff: true,
    }
}

fn names(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn name_rows(rows: &[&str]) -> NameFormset {
    let mut pairs = vec![
        ("form-TOTAL_FORMS".to_string(), rows.len().to_string()),
        ("form-INITIAL_FORMS".to_string(), "0".to_string()),
    ];
    for (i, name) in rows.iter().enumerate() {
        pairs.push((format!("form-{}-name", i), name.to_string()));
    }
    NameFormset::bind(&FormData::from_pairs(pairs), NAME_MAX_LENGTH)
}

fn search(term: &str) -> ListQuery {
    ListQuery {
        search: Some(term.into()),
        ..ListQuery::default()
    }
}

/// A dish of the given type, cooked by `cook`.
fn create_dish(
    kitchen: &Kitchen,
    name: &str,
    dish_type: Id<DishType>,
    cook: Id<Cook>,
) -> Result<Id<Dish>> {
    let input = DishInput {
        name: name.into(),
        description: format!("{}, as served", name),
        price: Decimal::new(1250, 2),
        dish_type,
        cooks: vec![cook],
        ingredients: vec![],
    };
    Ok(kitchen.dishes().execute(CreateDish(input))?)
}

#[test]
fn twelve_dish_types_span_two_pages() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let kitchen = kitchen_or_skip!("twelve_dish_types_span_two_pages");

    let all: Vec<String> = (1..=12).map(|i| format!("Type {}", i)).collect();
    kitchen.dish_types().execute(BulkCreateDishTypes(all))?;

    let first = kitchen
        .dish_types()
        .query(ListDishTypes(ListQuery::default()))?;
    assert!(first.is_paginated);
    assert_eq!(first.len(), 10);
    assert_eq!(first.object_list[0].dish_type.name, "Type 1");

    let last = kitchen.dish_types().query(ListDishTypes(ListQuery {
        page: PageRequest::Last,
        ..ListQuery::default()
    }))?;
    assert_eq!(last.number, 2);
    assert_eq!(last.len(), 2);

    let beyond = kitchen.dish_types().query(ListDishTypes(ListQuery {
        page: PageRequest::Number(3),
        ..ListQuery::default()
    }));
    assert!(matches!(beyond, Err(Error::InvalidPage(_))), "{:?}", beyond);
    Ok(())
}

#[test]
fn deleting_a_dish_type_deletes_its_dishes() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let kitchen = kitchen_or_skip!("deleting_a_dish_type_deletes_its_dishes");

    let cook = kitchen.cooks().execute(CreateCook(new_cook("chef", 5)))?;
    let types = kitchen
        .dish_types()
        .execute(BulkCreateDishTypes(names(&["Soup", "Dessert"])))?;
    create_dish(&kitchen, "Borscht", types[0], cook)?;
    create_dish(&kitchen, "Gazpacho", types[0], cook)?;
    let cake = create_dish(&kitchen, "Cake", types[1], cook)?;

    kitchen.dish_types().execute(DeleteDishType(types[0]))?;

    let left = kitchen.dishes().query(ListDishes(ListQuery::default()))?;
    let ids: Vec<Id<Dish>> = left.iter().map(|d| d.dish.id).collect();
    assert_eq!(ids, vec![cake]);

    let again = kitchen.dish_types().execute(DeleteDishType(types[0]));
    assert!(matches!(again, Err(Error::NotFound(_))), "{:?}", again);
    Ok(())
}

#[test]
fn search_treats_wildcards_literally() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let kitchen = kitchen_or_skip!("search_treats_wildcards_literally");

    kitchen.dish_types().execute(BulkCreateDishTypes(names(&[
        "100% beef",
        "1000 beef",
        "snake_case",
        "snakes",
    ])))?;

    let found = |term: &str| -> Result<Vec<String>> {
        let page = kitchen.dish_types().query(ListDishTypes(search(term)))?;
        Ok(page.iter().map(|t| t.dish_type.name.clone()).collect())
    };
    assert_eq!(found("%")?, vec!["100% beef"]);
    assert_eq!(found("_")?, vec!["snake_case"]);
    assert_eq!(found("BEEF")?, vec!["100% beef", "1000 beef"]);
    assert!(found("pork")?.is_empty());
    Ok(())
}

#[test]
fn ingredient_batches_are_all_or_nothing() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let kitchen = kitchen_or_skip!("ingredient_batches_are_all_or_nothing");

    let created = kitchen
        .ingredients()
        .execute(BulkCreateIngredients(name_rows(&["Salt", ""])))?;
    assert_eq!(created.map(|ids| ids.len()), Ok(1));

    let rejected = kitchen
        .ingredients()
        .execute(BulkCreateIngredients(name_rows(&["Pepper", "Salt"])))?
        .expect_err("Salt is taken");
    assert!(rejected.rows[0].errors.is_empty());
    assert_eq!(rejected.rows[1].errors.field("name"), &[DUPLICATE_NAME.to_string()]);

    let repeated = kitchen
        .ingredients()
        .execute(BulkCreateIngredients(name_rows(&["Dill", "Dill"])))?
        .expect_err("repeated name");
    assert_eq!(
        repeated.non_form_errors,
        vec!["Please correct the duplicate data for name, which must be unique.".to_string()]
    );

    let count = with_conn(kitchen.db(), |conn| {
        Ok(persistence::count::<Ingredient, _>(conn)?)
    })?;
    assert_eq!(count, 1);
    Ok(())
}

#[test]
fn ingredient_rename_checks_other_names_only() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let kitchen = kitchen_or_skip!("ingredient_rename_checks_other_names_only");

    let ids = kitchen
        .ingredients()
        .execute(BulkCreateIngredients(name_rows(&["Salt", "Pepper"])))?
        .expect("fresh names");

    kitchen.ingredients().execute(RenameIngredient {
        id: ids[0],
        name: "Salt".into(),
    })?;

    let clash = kitchen.ingredients().execute(RenameIngredient {
        id: ids[0],
        name: "Pepper".into(),
    });
    match clash {
        Err(Error::Invalid(errors)) => {
            assert_eq!(errors.field("name"), &[DUPLICATE_NAME.to_string()])
        }
        other => panic!("Expected a form error, got {:?}", other),
    }
    Ok(())
}

#[test]
fn ingredients_list_their_dishes_with_types() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let kitchen = kitchen_or_skip!("ingredients_list_their_dishes_with_types");

    let cook = kitchen.cooks().execute(CreateCook(new_cook("chef", 5)))?;
    let soup = kitchen
        .dish_types()
        .execute(BulkCreateDishTypes(names(&["Soup"])))?[0];
    let beet = kitchen
        .ingredients()
        .execute(BulkCreateIngredients(name_rows(&["Beetroot"])))?
        .expect("fresh names")[0];
    let dish = kitchen.dishes().execute(CreateDish(DishInput {
        name: "Borscht".into(),
        description: "Beetroot soup".into(),
        price: Decimal::new(950, 2),
        dish_type: soup,
        cooks: vec![cook],
        ingredients: vec![beet],
    }))?;

    let page = kitchen
        .ingredients()
        .query(ListIngredients(ListQuery::default()))?;
    let listed = &page.object_list[0];
    assert_eq!(listed.ingredient.id, beet);
    assert_eq!(listed.dishes.len(), 1);
    assert_eq!(listed.dishes[0].id, dish);
    assert_eq!(listed.dishes[0].dish_type.name, "Soup");
    Ok(())
}

#[test]
fn dish_update_replaces_links() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let kitchen = kitchen_or_skip!("dish_update_replaces_links");

    let chef = kitchen.cooks().execute(CreateCook(new_cook("chef", 5)))?;
    let sous = kitchen.cooks().execute(CreateCook(new_cook("sous", 3)))?;
    let soup = kitchen
        .dish_types()
        .execute(BulkCreateDishTypes(names(&["Soup"])))?[0];
    let ingredients = kitchen
        .ingredients()
        .execute(BulkCreateIngredients(name_rows(&["Beetroot", "Dill"])))?
        .expect("fresh names");
    let id = create_dish(&kitchen, "Borscht", soup, chef)?;

    kitchen.dishes().execute(UpdateDish {
        id,
        input: DishInput {
            name: "Cold borscht".into(),
            description: "Served chilled".into(),
            price: Decimal::new(1100, 2),
            dish_type: soup,
            cooks: vec![sous],
            ingredients: ingredients.clone(),
        },
    })?;

    let detail = kitchen.dishes().query(ShowDish(id))?;
    assert_eq!(detail.dish.name, "Cold borscht");
    assert_eq!(detail.dish.price, Decimal::new(1100, 2));
    assert_eq!(detail.cooks.iter().map(|c| c.id).collect::<Vec<_>>(), vec![sous]);
    assert_eq!(
        detail.ingredients.iter().map(|i| i.id).collect::<Vec<_>>(),
        ingredients
    );

    let chef_detail = kitchen.cooks().query(CookDetail(chef))?;
    assert!(chef_detail.dishes.is_empty());
    Ok(())
}

#[test]
fn duplicate_usernames_are_a_form_error() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let kitchen = kitchen_or_skip!("duplicate_usernames_are_a_form_error");

    let id = kitchen.cooks().execute(CreateCook(new_cook("chef", 5)))?;
    let again = kitchen.cooks().execute(CreateCook(new_cook("chef", 7)));
    match again {
        Err(Error::Invalid(errors)) => assert_eq!(
            errors.field("username"),
            &["A user with that username already exists.".to_string()]
        ),
        other => panic!("Expected a form error, got {:?}", other),
    }

    let cook = kitchen.cooks().query(CookDetail(id))?.cook;
    assert_eq!(cook.to_string(), "chef (5 years of experience)");
    assert_eq!(cook.full_name(), "Ada Byron");
    Ok(())
}

#[test]
fn experience_can_be_cleared_but_not_lowered() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let kitchen = kitchen_or_skip!("experience_can_be_cleared_but_not_lowered");

    let id = kitchen.cooks().execute(CreateCook(new_cook("chef", 5)))?;
    kitchen.cooks().execute(UpdateExperience {
        id,
        years_of_experience: None,
    })?;
    let cook = kitchen.cooks().query(CookDetail(id))?.cook;
    assert_eq!(cook.to_string(), "chef (None years of experience)");

    let lowered = kitchen.cooks().execute(UpdateExperience {
        id,
        years_of_experience: Some(1),
    });
    assert!(lowered.is_err(), "storage should refuse {:?}", lowered);

    kitchen.cooks().execute(DeleteCook(id))?;
    let gone = kitchen.cooks().query(CookDetail(id));
    assert!(matches!(gone, Err(Error::NotFound(_))), "{:?}", gone);
    Ok(())
}

#[test]
fn sessions_round_trip_through_the_store() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let kitchen = kitchen_or_skip!("sessions_round_trip_through_the_store");
    let store = kitchen.sessions().clone();

    let loaded = with_conn(kitchen.db(), |conn| {
        let mut session = store.create(conn)?;
        session.insert("num_visits", 3u64)?;
        store.save(conn, &mut session)?;
        let loaded = store.load(conn, session.key())?;
        store.delete(conn, session.key())?;
        let gone = store.load(conn, session.key())?;
        Ok((loaded, gone))
    })?;

    let (loaded, gone) = loaded;
    assert_eq!(loaded.and_then(|s| s.get::<u64>("num_visits")), Some(3));
    assert!(gone.is_none());
    Ok(())
}

#[test]
fn unchanged_sessions_are_not_written_back() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let kitchen = kitchen_or_skip!("unchanged_sessions_are_not_written_back");
    let store = kitchen.sessions().clone();

    let (skipped, saved) = with_conn(kitchen.db(), |conn| {
        let mut session = store.create(conn)?;
        store.delete(conn, session.key())?;
        store.save(conn, &mut session)?;
        let skipped = store.load(conn, session.key())?;

        session.insert("num_visits", 1u64)?;
        store.save(conn, &mut session)?;
        let saved = store.load(conn, session.key())?;
        Ok((skipped, saved))
    })?;

    assert!(skipped.is_none(), "unmodified session was saved: {:?}", skipped);
    let saved = saved.expect("modified session is stored");
    assert_eq!(saved.get::<u64>("num_visits"), Some(1));
    assert!(!saved.is_modified());
    Ok(())
}

#[test]
fn vanished_choices_are_a_form_error() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let kitchen = kitchen_or_skip!("vanished_choices_are_a_form_error");

    let chef = kitchen.cooks().execute(CreateCook(new_cook("chef", 5)))?;
    let gone = kitchen.cooks().execute(CreateCook(new_cook("gone", 5)))?;
    let types = kitchen
        .dish_types()
        .execute(BulkCreateDishTypes(names(&["Soup", "Dessert"])))?;
    let borscht = create_dish(&kitchen, "Borscht", types[0], chef)?;
    kitchen.cooks().execute(DeleteCook(gone))?;
    kitchen.dish_types().execute(DeleteDishType(types[1]))?;

    match create_dish(&kitchen, "Gazpacho", types[0], gone) {
        Err(e) => match e.downcast::<Error>() {
            Ok(Error::Invalid(errors)) => {
                assert_eq!(errors.field("cooks"), &[INVALID_CHOICE.to_string()])
            }
            other => panic!("Expected a cooks error, got {:?}", other),
        },
        Ok(id) => panic!("Dish {} was linked to a deleted cook", id),
    }

    let moved = kitchen.dishes().execute(UpdateDish {
        id: borscht,
        input: DishInput {
            name: "Borscht".into(),
            description: "Now a dessert".into(),
            price: Decimal::new(900, 2),
            dish_type: types[1],
            cooks: vec![chef],
            ingredients: vec![],
        },
    });
    match moved {
        Err(Error::Invalid(errors)) => {
            assert_eq!(errors.field("dish_type"), &[INVALID_CHOICE.to_string()])
        }
        other => panic!("Expected a dish type error, got {:?}", other),
    }

    let detail = kitchen.dishes().query(ShowDish(borscht))?;
    assert_eq!(detail.dish.description, "Borscht, as served");
    assert_eq!(
        detail.cooks.iter().map(|c| c.id).collect::<Vec<_>>(),
        vec![chef]
    );
    Ok(())
}
