use actix_web::{web, HttpResponse};
use log::*;
use tera::Context;

use infra::persistence;

use crate::auth::Authenticated;
use crate::cooks::Cook;
use crate::dishes::Dish;
use crate::error::Result;
use crate::services::{blocking, with_conn};
use crate::templates;
use crate::Kitchen;

const NUM_VISITS: &str = "num_visits";

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index));
}

#[derive(Debug, Clone, Copy)]
struct Counts {
    num_cooks: i64,
    num_dishes: i64,
    num_visits: u64,
}

async fn index(auth: Authenticated, kitchen: web::Data<Kitchen>) -> Result<HttpResponse> {
    let Authenticated { cook, mut session } = auth;
    let state = kitchen.clone();
    let counts = blocking(move || {
        with_conn(state.db(), |conn| {
            let num_visits = session.get::<u64>(NUM_VISITS).unwrap_or(0) + 1;
            session.insert(NUM_VISITS, num_visits)?;
            state.sessions().save(conn, &mut session)?;
            Ok(Counts {
                num_cooks: persistence::count::<Cook, _>(conn)?,
                num_dishes: persistence::count::<Dish, _>(conn)?,
                num_visits,
            })
        })
    })
    .await?;
    debug!("Index for cook {}: {:?}", cook.id, counts);

    let mut context = Context::new();
    context.insert("user", &cook);
    context.insert("num_cooks", &counts.num_cooks);
    context.insert("num_dishes", &counts.num_dishes);
    context.insert("num_visits", &counts.num_visits);
    templates::render("index.html", &context)
}
