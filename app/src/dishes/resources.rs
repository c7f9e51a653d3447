use actix_web::{web, HttpResponse};
use log::*;

use infra::ids::Id;

use crate::auth::Authenticated;
use crate::error::{Error, Result};
use crate::forms::{FormData, FormErrors};
use crate::listing::{insert_page, ListParams, ListQuery};
use crate::services::{blocking, Commandable, Queryable};
use crate::templates;
use crate::{see_other, Kitchen};

use super::*;

const PREFIX: &str = "/dishes";

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope(PREFIX)
            .route("/", web::get().to(list))
            .service(
                web::resource("/create")
                    .route(web::get().to(create_form))
                    .route(web::post().to(create)),
            )
            .route("/{id}", web::get().to(detail))
            .service(
                web::resource("/{id}/update/")
                    .route(web::get().to(edit))
                    .route(web::post().to(update)),
            )
            .service(
                web::resource("/{id}/delete/")
                    .route(web::get().to(confirm_delete))
                    .route(web::post().to(delete)),
            ),
    );
}

fn list_url() -> String {
    format!("{}/", PREFIX)
}

fn render_form(
    auth: &Authenticated,
    object: Option<&Dish>,
    form: &DishForm,
    choices: &DishChoices,
    errors: &FormErrors,
) -> Result<HttpResponse> {
    let mut context = auth.context();
    context.insert("object", &object);
    context.insert("form", form);
    context.insert("options", &choices.options(form));
    context.insert("errors", errors);
    templates::render("dish_form.html", &context)
}

async fn list(
    auth: Authenticated,
    kitchen: web::Data<Kitchen>,
    params: web::Query<ListParams>,
) -> Result<HttpResponse> {
    let query = ListQuery::from_params(params.into_inner())?;
    let search = query.search_state();
    let dishes = kitchen.dishes();
    let page = blocking(move || dishes.query(ListDishes(query))).await?;

    let mut context = auth.context();
    insert_page(&mut context, "dish_list", &page, &search);
    templates::render("dish_list.html", &context)
}

async fn create_form(auth: Authenticated, kitchen: web::Data<Kitchen>) -> Result<HttpResponse> {
    let dishes = kitchen.dishes();
    let choices = blocking(move || dishes.query(LoadDishChoices)).await?;
    render_form(
        &auth,
        None,
        &DishForm::default(),
        &choices,
        &FormErrors::default(),
    )
}

async fn create(
    auth: Authenticated,
    kitchen: web::Data<Kitchen>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let form = DishForm::from_data(&FormData::parse(&body));
    let dishes = kitchen.dishes();
    let choices = blocking(move || dishes.query(LoadDishChoices)).await?;

    let input = match form.clean(&choices) {
        Ok(input) => input,
        Err(errors) => return render_form(&auth, None, &form, &choices, &errors),
    };
    let dishes = kitchen.dishes();
    match blocking(move || dishes.execute(CreateDish(input))).await {
        Ok(id) => {
            debug!("Created dish {}", id);
            Ok(see_other(&list_url()))
        }
        Err(Error::Invalid(errors)) => render_form(&auth, None, &form, &choices, &errors),
        Err(e) => Err(e),
    }
}

async fn detail(
    auth: Authenticated,
    kitchen: web::Data<Kitchen>,
    id: web::Path<Id<Dish>>,
) -> Result<HttpResponse> {
    let id = id.into_inner();
    let dishes = kitchen.dishes();
    let detail = blocking(move || dishes.query(ShowDish(id))).await?;

    let mut context = auth.context();
    context.insert("dish", &detail.dish);
    context.insert("cooks", &detail.cooks);
    context.insert("ingredients", &detail.ingredients);
    templates::render("dish_detail.html", &context)
}

async fn edit(
    auth: Authenticated,
    kitchen: web::Data<Kitchen>,
    id: web::Path<Id<Dish>>,
) -> Result<HttpResponse> {
    let id = id.into_inner();
    let dishes = kitchen.dishes();
    let (detail, choices) = blocking(move || {
        let detail = dishes.query(ShowDish(id))?;
        let choices = dishes.query(LoadDishChoices)?;
        Ok((detail, choices))
    })
    .await?;
    render_form(
        &auth,
        Some(&detail.dish),
        &DishForm::from_detail(&detail),
        &choices,
        &FormErrors::default(),
    )
}

async fn update(
    auth: Authenticated,
    kitchen: web::Data<Kitchen>,
    id: web::Path<Id<Dish>>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let id = id.into_inner();
    let form = DishForm::from_data(&FormData::parse(&body));
    let dishes = kitchen.dishes();
    let (dish, choices) = blocking(move || {
        let dish = dishes.query(ShowDish(id))?.dish;
        let choices = dishes.query(LoadDishChoices)?;
        Ok((dish, choices))
    })
    .await?;

    let input = match form.clean(&choices) {
        Ok(input) => input,
        Err(errors) => return render_form(&auth, Some(&dish), &form, &choices, &errors),
    };
    let dishes = kitchen.dishes();
    match blocking(move || dishes.execute(UpdateDish { id, input })).await {
        Ok(()) => Ok(see_other(&dish.absolute_url())),
        Err(Error::Invalid(errors)) => render_form(&auth, Some(&dish), &form, &choices, &errors),
        Err(e) => Err(e),
    }
}

async fn confirm_delete(
    auth: Authenticated,
    kitchen: web::Data<Kitchen>,
    id: web::Path<Id<Dish>>,
) -> Result<HttpResponse> {
    let id = id.into_inner();
    let dishes = kitchen.dishes();
    let detail = blocking(move || dishes.query(ShowDish(id))).await?;

    let mut context = auth.context();
    context.insert("object", &detail.dish);
    context.insert("cancel_url", &list_url());
    templates::render("dish_confirm_delete.html", &context)
}

async fn delete(
    _auth: Authenticated,
    kitchen: web::Data<Kitchen>,
    id: web::Path<Id<Dish>>,
) -> Result<HttpResponse> {
    let id = id.into_inner();
    let dishes = kitchen.dishes();
    blocking(move || dishes.execute(DeleteDish(id))).await?;
    info!("Deleted dish {}", id);
    Ok(see_other(&list_url()))
}
