// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};

use monthbook::app::App;
use monthbook::config::{Backend, Config};
use monthbook::models::YearMonth;
use monthbook::store::{RemoteStore, RestStore, SqliteStore};
use monthbook::{cli, commands, db};

fn main() -> Result<()> {
    let matches = cli::build_cli().get_matches();
    monthbook::init_tracing(matches.get_flag("verbose"));

    let config = Config::from_env(matches.get_one::<String>("backend").map(String::as_str))?;

    // the month a subcommand asks for is loaded up front
    let month = selected_month(&matches)?.unwrap_or_else(YearMonth::current);

    match &config.backend {
        Backend::Local => {
            let path = db::db_path(&config.data_dir)?;
            let store = SqliteStore::open(&path)
                .with_context(|| format!("Open local store at {}", path.display()))?;
            tracing::debug!(path = %path.display(), "using local store");
            run(App::start(store, month), &matches, &config)
        }
        Backend::Remote { url, anon_key } => {
            let store = RestStore::new(url, anon_key, Some(config.session_file()))
                .context("Create backend client")?;
            if let Err(e) = store.verify_session() {
                tracing::warn!(error = %e, "could not verify stored session");
            }
            tracing::debug!(%url, "using hosted store");
            run(App::start(store, month), &matches, &config)
        }
    }
}

fn selected_month(matches: &clap::ArgMatches) -> Result<Option<YearMonth>> {
    let mut m = matches;
    while let Some((_, sub)) = m.subcommand() {
        m = sub;
    }
    commands::month_arg(m)
}

fn run<S: RemoteStore>(mut app: App<S>, matches: &clap::ArgMatches, config: &Config) -> Result<()> {
    let symbol = config.currency_symbol.as_str();
    let res = match matches.subcommand() {
        Some(("signup", sub)) => commands::session::signup(&mut app, sub),
        Some(("login", sub)) => commands::session::login(&mut app, sub),
        Some(("logout", _)) => commands::session::logout(&mut app),
        Some(("whoami", _)) => commands::session::whoami(&app),
        Some(("summary", sub)) => commands::dashboard::summary(&app, sub, symbol),
        Some(("categories", sub)) => commands::dashboard::categories(&app, sub, symbol),
        Some(("tx", sub)) => commands::transactions::handle(&mut app, sub, symbol),
        _ => {
            cli::build_cli().print_help()?;
            println!();
            Ok(())
        }
    };
    commands::print_notices(&mut app);
    res
}
