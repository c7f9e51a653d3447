use std::path::PathBuf;

use anyhow::{bail, Result};
use serde::Deserialize;
use structopt::StructOpt;

use infra::persistence;
use kitchen::cooks::{forms::CookCreationForm, Cook, CreateCook};
use kitchen::dish_types::DishType;
use kitchen::dishes::Dish;
use kitchen::ingredients::Ingredient;
use kitchen::services::{with_conn, Commandable};

#[derive(Debug, StructOpt)]
#[structopt(name = "kitchen", about = "Kitchen back-office CLI")]
struct Opt {
    /// Input file
    #[structopt(parse(from_os_str))]
    config: PathBuf,
    #[structopt(subcommand)]
    command: Commands,
}

#[derive(Debug, StructOpt)]
enum Commands {
    #[structopt(name = "setup", about = "Create or upgrade the schema")]
    Setup,
    #[structopt(name = "create-cook", about = "Register a staff cook")]
    CreateCook {
        username: String,
        password: String,
        #[structopt(long = "first-name", default_value = "")]
        first_name: String,
        #[structopt(long = "last-name", default_value = "")]
        last_name: String,
        #[structopt(long = "years", default_value = "2")]
        years: i32,
        /// Mark the cook as staff
        #[structopt(long = "staff")]
        staff: bool,
    },
    #[structopt(name = "stats", about = "Show row counts")]
    Stats,
    #[structopt(name = "clear-sessions", about = "Remove expired sessions")]
    ClearSessions,
}

#[derive(Deserialize, Debug)]
struct Config {
    #[serde(flatten)]
    kitchen: kitchen::config::Config,
    #[serde(default)]
    env_logger: kitchen::config::EnvLogger,
}

fn main() -> Result<()> {
    let opt = Opt::from_args();
    let mut config: Config = kitchen::config::load(&opt.config)?;
    config.kitchen.apply_env()?;

    config.env_logger.builder().init();

    let app = kitchen::Kitchen::new(&config.kitchen)?;

    match opt.command {
        Commands::Setup => {
            app.setup()?;
        }
        Commands::CreateCook {
            username,
            password,
            first_name,
            last_name,
            years,
            staff,
        } => {
            let form = CookCreationForm {
                username,
                first_name,
                last_name,
                years_of_experience: years.to_string(),
                password1: password.clone(),
                password2: password,
            };
            let mut cook = match form.clean() {
                Ok(cook) => cook,
                Err(errors) => bail!("Invalid cook: {:?}", errors),
            };
            cook.is_staff = staff;
            let id = app.cooks().execute(CreateCook(cook))?;
            println!("{}", id);
        }
        Commands::Stats => {
            let counts = with_conn(app.db(), |conn| {
                Ok([
                    ("cooks", persistence::count::<Cook, _>(conn)?),
                    ("dishes", persistence::count::<Dish, _>(conn)?),
                    ("dish types", persistence::count::<DishType, _>(conn)?),
                    ("ingredients", persistence::count::<Ingredient, _>(conn)?),
                ])
            })?;
            for (name, count) in counts.iter() {
                println!("{}: {}", name, count);
            }
        }
        Commands::ClearSessions => {
            let store = app.sessions().clone();
            let removed = with_conn(app.db(), |conn| Ok(store.clear_expired(conn)?))?;
            println!("Removed {} expired sessions", removed);
        }
    }

    Ok(())
}
