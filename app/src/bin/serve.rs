use std::path::PathBuf;

use actix_web::{middleware, App, HttpServer};
use anyhow::{Context, Result};
use log::*;
use serde::Deserialize;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "serve", about = "Serve the kitchen back-office.")]
struct Opt {
    /// Input file
    #[structopt(parse(from_os_str))]
    config: PathBuf,
}

#[derive(Deserialize, Debug)]
struct Config {
    #[serde(flatten)]
    kitchen: kitchen::config::Config,
    #[serde(default)]
    env_logger: kitchen::config::EnvLogger,
    listener: Listener,
}

#[derive(Deserialize, Debug)]
struct Listener {
    addr: std::net::SocketAddr,
}

fn main() -> Result<()> {
    let opt = Opt::from_args();
    let mut config: Config = kitchen::config::load(&opt.config)?;
    config.kitchen.apply_env()?;

    config.env_logger.builder().init();
    debug!("Options: {:?}", opt);

    let app = kitchen::Kitchen::new(&config.kitchen)?;
    app.setup().context("setup schema")?;

    let addr = config.listener.addr;
    actix_web::rt::System::new().block_on(async move {
        let srv = HttpServer::new(move || {
            let app = app.clone();
            App::new()
                .wrap(middleware::Logger::default())
                .configure(move |cfg| app.configure(cfg))
        })
        .bind(addr)
        .with_context(|| format!("bind {}", addr))?;
        info!("Listening on: {:?}", srv.addrs());
        srv.run().await?;
        Ok(())
    })
}
