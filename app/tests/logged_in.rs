//! Requests made by a logged in cook against a real database. Each test
//! works in its own schema and quietly passes when `$POSTGRES_URL` is unset.

use std::env;

use actix_web::dev::ServiceResponse;
use actix_web::http::{header, StatusCode};
use actix_web::{test, App};
use anyhow::{Context, Result};
use log::*;
use postgres::Client;
use rust_decimal::Decimal;

use infra::persistence;
use kitchen::config::SessionConfig;
use kitchen::cooks::{forms::NewCook, CreateCook};
use kitchen::dish_types::BulkCreateDishTypes;
use kitchen::dishes::{CreateDish, DishInput};
use kitchen::forms::FormData;
use kitchen::formsets::NameFormset;
use kitchen::ingredients::{BulkCreateIngredients, NAME_MAX_LENGTH};
use kitchen::services::Commandable;
use kitchen::Kitchen;

const PASSWORD: &str = "correct horse battery";

#[derive(Debug)]
struct UseTempSchema(String);

impl r2d2::CustomizeConnection<Client, postgres::Error> for UseTempSchema {
    fn on_acquire(&self, conn: &mut Client) -> Result<(), postgres::Error> {
        conn.batch_execute(&format!(
            "CREATE SCHEMA IF NOT EXISTS \"{0}\"; SET search_path TO \"{0}\"",
            self.0
        ))?;
        Ok(())
    }
}

/// A set up kitchen in a freshly emptied schema.
fn kitchen(schema: &str) -> Result<Option<Kitchen>> {
    let url = match env::var("POSTGRES_URL") {
        Ok(url) => url,
        Err(_) => {
            warn!("$POSTGRES_URL unset; skipping {}", schema);
            return Ok(None);
        }
    };
    let manager = persistence::manager(&url).context("$POSTGRES_URL")?;
    let pool = r2d2::Pool::builder()
        .max_size(2)
        .connection_customizer(Box::new(UseTempSchema(schema.to_string())))
        .build(manager)?;
    pool.get()?.batch_execute(&format!(
        "DROP SCHEMA \"{0}\" CASCADE; CREATE SCHEMA \"{0}\"",
        schema
    ))?;
    let kitchen = Kitchen::with_pool(pool, &SessionConfig::default());
    kitchen.setup()?;
    Ok(Some(kitchen))
}

#[derive(Debug, Clone, Copy)]
struct Fixture {
    cook: i64,
    dish: i64,
    dish_type: i64,
    ingredient: i64,
}

fn fixture(kitchen: &Kitchen) -> Result<Fixture> {
    let cook = kitchen.cooks().execute(CreateCook(NewCook {
        username: "chef".into(),
        first_name: "Ada".into(),
        last_name: "Byron".into(),
        years_of_experience: 5,
        password: PASSWORD.into(),
        is_staff: true,
    }))?;
    let dish_type = kitchen
        .dish_types()
        .execute(BulkCreateDishTypes(vec!["Soup".to_string()]))?[0];
    let rows = FormData::from_pairs(vec![
        ("form-TOTAL_FORMS", "1"),
        ("form-INITIAL_FORMS", "0"),
        ("form-0-name", "Beetroot"),
    ]);
    let ingredients = kitchen
        .ingredients()
        .execute(BulkCreateIngredients(NameFormset::bind(&rows, NAME_MAX_LENGTH)))?
        .map_err(|formset| anyhow::anyhow!("Rejected: {:?}", formset))?;
    let dish = kitchen.dishes().execute(CreateDish(DishInput {
        name: "Borscht".into(),
        description: "Beetroot soup".into(),
        price: Decimal::new(1250, 2),
        dish_type,
        cooks: vec![cook],
        ingredients: ingredients.clone(),
    }))?;
    Ok(Fixture {
        cook: cook.get(),
        dish: dish.get(),
        dish_type: dish_type.get(),
        ingredient: ingredients[0].get(),
    })
}

fn form_post(uri: &str, body: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri(uri)
        .insert_header((header::CONTENT_TYPE, "application/x-www-form-urlencoded"))
        .set_payload(body.to_string())
}

async fn body_text(resp: ServiceResponse) -> String {
    let body = test::read_body(resp).await;
    String::from_utf8_lossy(&body).into_owned()
}

#[core::prelude::v1::test]
fn logged_in_cook_sees_every_page() -> Result<()> {
    let _ = env_logger::try_init();
    let kitchen = match kitchen("logged_in_cook_sees_every_page")? {
        Some(kitchen) => kitchen,
        None => return Ok(()),
    };
    let ids = fixture(&kitchen)?;

    let state = kitchen.clone();
    actix_web::rt::System::new().block_on(async move {
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;
        let req = form_post(
            "/accounts/login/",
            &format!("username=chef&password={}&next=/", PASSWORD.replace(' ', "+")),
        )
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        let cookie = resp
            .response()
            .cookies()
            .find(|c| c.name() == state.cookie().name)
            .map(|c| c.into_owned())
            .expect("login sets the session cookie");

        for expected in &["1 time.", "2 times."] {
            let req = test::TestRequest::get()
                .uri("/")
                .cookie(cookie.clone())
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
            let html = body_text(resp).await;
            assert!(
                html.contains(&format!("You have visited this page {}", expected)),
                "{}",
                html
            );
        }

        let pages = vec![
            "/cooks/".to_string(),
            "/cooks/create/".to_string(),
            format!("/cooks/{}/", ids.cook),
            format!("/cooks/{}/update/", ids.cook),
            format!("/cooks/{}/delete/", ids.cook),
            "/dishes/".to_string(),
            "/dishes/create".to_string(),
            format!("/dishes/{}", ids.dish),
            format!("/dishes/{}/update/", ids.dish),
            format!("/dishes/{}/delete/", ids.dish),
            "/dish-types/".to_string(),
            "/dish-types/bulk-create/".to_string(),
            format!("/dish-types/{}/update/", ids.dish_type),
            format!("/dish-types/{}/delete/", ids.dish_type),
            "/ingredients/".to_string(),
            "/ingredients/bulk-create/".to_string(),
            format!("/ingredients/{}/update/", ids.ingredient),
            format!("/ingredients/{}/delete/", ids.ingredient),
        ];
        for page in pages.iter() {
            let req = test::TestRequest::get()
                .uri(page)
                .cookie(cookie.clone())
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK, "{}", page);
        }

        let req = form_post(
            "/dishes/create",
            &format!(
                "name=Gazpacho&description=Cold&price=7.50&dish_type={}",
                ids.dish_type
            ),
        )
        .cookie(cookie.clone())
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_text(resp).await;
        assert!(html.contains("This field is required."), "{}", html);
    });
    Ok(())
}
