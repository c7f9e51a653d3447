use actix_web::{web, HttpResponse};
use log::*;
use serde::Serialize;

use infra::ids::Id;

use crate::auth::Authenticated;
use crate::error::{Error, Result};
use crate::forms::{FormData, FormErrors};
use crate::listing::{insert_page, ListParams, ListQuery};
use crate::services::{blocking, Commandable, Queryable};
use crate::templates;
use crate::{see_other, Kitchen};

use super::*;

const PREFIX: &str = "/cooks";

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope(PREFIX)
            .route("/", web::get().to(list))
            .service(
                web::resource("/create/")
                    .route(web::get().to(create_form))
                    .route(web::post().to(create)),
            )
            .route("/{id}/", web::get().to(detail))
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

fn render_form<F: Serialize>(
    auth: &Authenticated,
    object: Option<&Cook>,
    form: &F,
    errors: &FormErrors,
) -> Result<HttpResponse> {
    let mut context = auth.context();
    context.insert("object", &object);
    context.insert("form", form);
    context.insert("errors", errors);
    templates::render("cook_form.html", &context)
}

async fn list(
    auth: Authenticated,
    kitchen: web::Data<Kitchen>,
    params: web::Query<ListParams>,
) -> Result<HttpResponse> {
    let query = ListQuery::from_params(params.into_inner())?;
    let search = query.search_state();
    let cooks = kitchen.cooks();
    let page = blocking(move || cooks.query(ListCooks(query))).await?;

    let mut context = auth.context();
    insert_page(&mut context, "cook_list", &page, &search);
    templates::render("cook_list.html", &context)
}

async fn create_form(auth: Authenticated) -> Result<HttpResponse> {
    render_form(
        &auth,
        None,
        &CookCreationForm::default(),
        &FormErrors::default(),
    )
}

async fn create(
    auth: Authenticated,
    kitchen: web::Data<Kitchen>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let form = CookCreationForm::from_data(&FormData::parse(&body));
    let new_cook = match form.clean() {
        Ok(new_cook) => new_cook,
        Err(errors) => return render_form(&auth, None, &form, &errors),
    };

    let cooks = kitchen.cooks();
    match blocking(move || cooks.execute(CreateCook(new_cook))).await {
        Ok(id) => {
            debug!("Created cook {}", id);
            Ok(see_other(&list_url()))
        }
        Err(Error::Invalid(errors)) => render_form(&auth, None, &form, &errors),
        Err(e) => Err(e),
    }
}

async fn detail(
    auth: Authenticated,
    kitchen: web::Data<Kitchen>,
    id: web::Path<Id<Cook>>,
) -> Result<HttpResponse> {
    let id = id.into_inner();
    let cooks = kitchen.cooks();
    let cook = blocking(move || cooks.query(CookDetail(id))).await?;

    let mut context = auth.context();
    context.insert("cook", &cook);
    templates::render("cook_detail.html", &context)
}

async fn edit(
    auth: Authenticated,
    kitchen: web::Data<Kitchen>,
    id: web::Path<Id<Cook>>,
) -> Result<HttpResponse> {
    let id = id.into_inner();
    let cooks = kitchen.cooks();
    let cook = blocking(move || cooks.query(LoadCook(id))).await?;
    render_form(
        &auth,
        Some(&cook),
        &ExperienceForm::from_cook(&cook),
        &FormErrors::default(),
    )
}

async fn update(
    auth: Authenticated,
    kitchen: web::Data<Kitchen>,
    id: web::Path<Id<Cook>>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let id = id.into_inner();
    let form = ExperienceForm::from_data(&FormData::parse(&body));
    let cooks = kitchen.cooks();
    match form.clean() {
        Ok(years_of_experience) => {
            blocking(move || {
                cooks.execute(UpdateExperience {
                    id,
                    years_of_experience,
                })
            })
            .await?;
            Ok(see_other(&format!("{}/{}/", PREFIX, id)))
        }
        Err(errors) => {
            let cook = blocking(move || cooks.query(LoadCook(id))).await?;
            render_form(&auth, Some(&cook), &form, &errors)
        }
    }
}

async fn confirm_delete(
    auth: Authenticated,
    kitchen: web::Data<Kitchen>,
    id: web::Path<Id<Cook>>,
) -> Result<HttpResponse> {
    let id = id.into_inner();
    let cooks = kitchen.cooks();
    let cook = blocking(move || cooks.query(LoadCook(id))).await?;

    let mut context = auth.context();
    context.insert("object", &cook);
    templates::render("cook_confirm_delete.html", &context)
}

async fn delete(
    _auth: Authenticated,
    kitchen: web::Data<Kitchen>,
    id: web::Path<Id<Cook>>,
) -> Result<HttpResponse> {
    let id = id.into_inner();
    let cooks = kitchen.cooks();
    blocking(move || cooks.execute(DeleteCook(id))).await?;
    info!("Deleted cook {}", id);
    Ok(see_other(&list_url()))
}
