use actix_web::{web, HttpResponse};
use log::*;

use infra::ids::Id;

use crate::auth::Authenticated;
use crate::error::{Error, Result};
use crate::forms::{FormData, FormErrors, NameForm};
use crate::formsets::NameFormset;
use crate::listing::{insert_page, ListParams, ListQuery};
use crate::services::{blocking, Commandable, Queryable};
use crate::templates;
use crate::{see_other, Kitchen};

use super::*;

const PREFIX: &str = "/ingredients";

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope(PREFIX)
            .route("/", web::get().to(list))
            .service(
                web::resource("/bulk-create/")
                    .route(web::get().to(bulk_create_form))
                    .route(web::post().to(bulk_create)),
            )
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

fn render_formset(auth: &Authenticated, formset: &NameFormset) -> Result<HttpResponse> {
    let mut context = auth.context();
    context.insert("formset", formset);
    templates::render("ingredient_bulk_create.html", &context)
}

fn render_form(
    auth: &Authenticated,
    object: &Ingredient,
    form: &NameForm,
    errors: &FormErrors,
) -> Result<HttpResponse> {
    let mut context = auth.context();
    context.insert("object", object);
    context.insert("form", form);
    context.insert("errors", errors);
    templates::render("ingredient_form.html", &context)
}

async fn list(
    auth: Authenticated,
    kitchen: web::Data<Kitchen>,
    params: web::Query<ListParams>,
) -> Result<HttpResponse> {
    let query = ListQuery::from_params(params.into_inner())?;
    let search = query.search_state();
    let ingredients = kitchen.ingredients();
    let page = blocking(move || ingredients.query(ListIngredients(query))).await?;

    let mut context = auth.context();
    insert_page(&mut context, "ingredient_list", &page, &search);
    templates::render("ingredient_list.html", &context)
}

async fn bulk_create_form(auth: Authenticated) -> Result<HttpResponse> {
    render_formset(&auth, &NameFormset::blank(1))
}

async fn bulk_create(
    auth: Authenticated,
    kitchen: web::Data<Kitchen>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let formset = NameFormset::bind(&FormData::parse(&body), NAME_MAX_LENGTH);
    if !formset.is_valid() {
        return render_formset(&auth, &formset);
    }

    let ingredients = kitchen.ingredients();
    match blocking(move || ingredients.execute(BulkCreateIngredients(formset))).await? {
        Ok(ids) => {
            debug!("Bulk created ingredients {:?}", ids);
            Ok(see_other(&list_url()))
        }
        Err(rejected) => render_formset(&auth, &rejected),
    }
}

async fn edit(
    auth: Authenticated,
    kitchen: web::Data<Kitchen>,
    id: web::Path<Id<Ingredient>>,
) -> Result<HttpResponse> {
    let id = id.into_inner();
    let ingredients = kitchen.ingredients();
    let ingredient = blocking(move || ingredients.query(LoadIngredient(id))).await?;
    let form = NameForm {
        name: ingredient.name.clone(),
    };
    render_form(&auth, &ingredient, &form, &FormErrors::default())
}

async fn update(
    auth: Authenticated,
    kitchen: web::Data<Kitchen>,
    id: web::Path<Id<Ingredient>>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let id = id.into_inner();
    let form = NameForm::from_data(&FormData::parse(&body));
    let errors = match form.clean() {
        Ok(name) => {
            let ingredients = kitchen.ingredients();
            match blocking(move || ingredients.execute(RenameIngredient { id, name })).await {
                Ok(()) => return Ok(see_other(&list_url())),
                Err(Error::Invalid(errors)) => errors,
                Err(e) => return Err(e),
            }
        }
        Err(errors) => errors,
    };

    let ingredients = kitchen.ingredients();
    let ingredient = blocking(move || ingredients.query(LoadIngredient(id))).await?;
    render_form(&auth, &ingredient, &form, &errors)
}

async fn confirm_delete(
    auth: Authenticated,
    kitchen: web::Data<Kitchen>,
    id: web::Path<Id<Ingredient>>,
) -> Result<HttpResponse> {
    let id = id.into_inner();
    let ingredients = kitchen.ingredients();
    let ingredient = blocking(move || ingredients.query(LoadIngredient(id))).await?;

    let mut context = auth.context();
    context.insert("object", &ingredient);
    templates::render("ingredient_confirm_delete.html", &context)
}

async fn delete(
    _auth: Authenticated,
    kitchen: web::Data<Kitchen>,
    id: web::Path<Id<Ingredient>>,
) -> Result<HttpResponse> {
    let id = id.into_inner();
    let ingredients = kitchen.ingredients();
    blocking(move || ingredients.execute(DeleteIngredient(id))).await?;
    info!("Deleted ingredient {}", id);
    Ok(see_other(&list_url()))
}
