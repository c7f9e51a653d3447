use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use lazy_static::lazy_static;
use log::*;
use tera::{Context, Tera};

use crate::error::Result;

const TEXT_HTML: &str = "text/html; charset=utf-8";

macro_rules! static_templates {
    ($tera: expr, $($fname: expr),+ $(,)?) => {
        $tera.add_raw_templates(vec![
            $(($fname, include_str!(concat!("../templates/", $fname)))),+
        ])
    }
}

lazy_static! {
    pub static ref TERA: Tera = {
        let mut tera = Tera::default();
        static_templates!(
            tera,
            "base.html",
            "pagination.html",
            "error.html",
            "index.html",
            "login.html",
            "cook_list.html",
            "cook_detail.html",
            "cook_form.html",
            "cook_confirm_delete.html",
            "dish_list.html",
            "dish_detail.html",
            "dish_form.html",
            "dish_confirm_delete.html",
            "dish_type_list.html",
            "dish_type_form.html",
            "dish_type_bulk_create.html",
            "dish_type_confirm_delete.html",
            "ingredient_list.html",
            "ingredient_form.html",
            "ingredient_bulk_create.html",
            "ingredient_confirm_delete.html",
        )
        .expect("built-in templates should parse");
        tera
    };
}

pub fn render(name: &str, context: &Context) -> Result<HttpResponse> {
    let html = TERA.render(name, context)?;
    trace!("Render {} -> {} bytes", name, html.len());
    Ok(HttpResponse::Ok().content_type(TEXT_HTML).body(html))
}

/// Error pages must not fail in turn, so fall back to plain text.
pub fn error_page(status: StatusCode, message: &str) -> HttpResponse {
    let mut context = Context::new();
    context.insert("status", &status.as_u16());
    context.insert("reason", &status.canonical_reason().unwrap_or("Error"));
    if status.is_client_error() {
        context.insert("message", message);
    }
    match TERA.render("error.html", &context) {
        Ok(html) => HttpResponse::build(status).content_type(TEXT_HTML).body(html),
        Err(e) => {
            error!("Could not render error page: {}", e);
            HttpResponse::build(status).body(status.to_string())
        }
    }
}
