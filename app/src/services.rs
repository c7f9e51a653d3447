//! Every page is backed by a request object handled by one of the entity
//! services. Handlers run on the async workers, while services talk to
//! postgres synchronously, so handlers hand each request to [`blocking`].

use actix_web::web;
use log::*;

use postgres::Client;

use infra::persistence::DbPool;

use crate::error::Result;

pub trait Request {
    type Resp;
}

pub trait Queryable<Req>
where
    Req: Request,
{
    fn query(&self, req: Req) -> Result<Req::Resp>;
}

pub trait Commandable<Req>
where
    Req: Request,
{
    fn execute(&self, req: Req) -> Result<Req::Resp>;
}

/// Check out a connection for the duration of `f`.
pub fn with_conn<R, F>(db: &DbPool, f: F) -> Result<R>
where
    F: FnOnce(&mut Client) -> Result<R>,
{
    let mut conn = db.get()?;
    trace!("Checked out connection; pool state: {:?}", db.state());
    f(&mut *conn)
}

/// Move a synchronous unit of work onto the blocking thread pool.
pub async fn blocking<R, F>(f: F) -> Result<R>
where
    R: Send + 'static,
    F: FnOnce() -> Result<R> + Send + 'static,
{
    web::block(f).await?
}
