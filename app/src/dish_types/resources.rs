use actix_web::{web, HttpResponse};
use log::*;

use infra::ids::Id;

use crate::auth::Authenticated;
use crate::error::Result;
use crate::forms::{FormData, FormErrors, NameForm};
use crate::formsets::NameFormset;
use crate::listing::{insert_page, ListParams, ListQuery};
use crate::services::{blocking, Commandable, Queryable};
use crate::templates;
use crate::{see_other, Kitchen};

use super::*;

const PREFIX: &str = "/dish-types";

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
    templates::render("dish_type_bulk_create.html", &context)
}

fn render_form(
    auth: &Authenticated,
    object: &DishType,
    form: &NameForm,
    errors: &FormErrors,
) -> Result<HttpResponse> {
    let mut context = auth.context();
    context.insert("object", object);
    context.insert("form", form);
    context.insert("errors", errors);
    templates::render("dish_type_form.html", &context)
}

async fn list(
    auth: Authenticated,
    kitchen: web::Data<Kitchen>,
    params: web::Query<ListParams>,
) -> Result<HttpResponse> {
    let query = ListQuery::from_params(params.into_inner())?;
    let search = query.search_state();
    let dish_types = kitchen.dish_types();
    let page = blocking(move || dish_types.query(ListDishTypes(query))).await?;

    let mut context = auth.context();
    insert_page(&mut context, "dish_type_list", &page, &search);
    templates::render("dish_type_list.html", &context)
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

    let names = formset.names();
    let dish_types = kitchen.dish_types();
    let ids = blocking(move || dish_types.execute(BulkCreateDishTypes(names))).await?;
    debug!("Bulk created dish types {:?}", ids);
    Ok(see_other(&list_url()))
}

async fn edit(
    auth: Authenticated,
    kitchen: web::Data<Kitchen>,
    id: web::Path<Id<DishType>>,
) -> Result<HttpResponse> {
    let id = id.into_inner();
    let dish_types = kitchen.dish_types();
    let dish_type = blocking(move || dish_types.query(LoadDishType(id))).await?;
    let form = NameForm {
        name: dish_type.name.clone(),
    };
    render_form(&auth, &dish_type, &form, &FormErrors::default())
}

async fn update(
    auth: Authenticated,
    kitchen: web::Data<Kitchen>,
    id: web::Path<Id<DishType>>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let id = id.into_inner();
    let form = NameForm::from_data(&FormData::parse(&body));
    let dish_types = kitchen.dish_types();
    match form.clean() {
        Ok(name) => {
            blocking(move || dish_types.execute(RenameDishType { id, name })).await?;
            Ok(see_other(&list_url()))
        }
        Err(errors) => {
            let dish_type = blocking(move || dish_types.query(LoadDishType(id))).await?;
            render_form(&auth, &dish_type, &form, &errors)
        }
    }
}

async fn confirm_delete(
    auth: Authenticated,
    kitchen: web::Data<Kitchen>,
    id: web::Path<Id<DishType>>,
) -> Result<HttpResponse> {
    let id = id.into_inner();
    let dish_types = kitchen.dish_types();
    let dish_type = blocking(move || dish_types.query(LoadDishType(id))).await?;

    let mut context = auth.context();
    context.insert("object", &dish_type);
    templates::render("dish_type_confirm_delete.html", &context)
}

async fn delete(
    _auth: Authenticated,
    kitchen: web::Data<Kitchen>,
    id: web::Path<Id<DishType>>,
) -> Result<HttpResponse> {
    let id = id.into_inner();
    let dish_types = kitchen.dish_types();
    blocking(move || dish_types.execute(DeleteDishType(id))).await?;
    info!("Deleted dish type {} and its dishes", id);
    Ok(see_other(&list_url()))
}
