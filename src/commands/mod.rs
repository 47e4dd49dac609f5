// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod dashboard;
pub mod session;
pub mod transactions;

use crate::app::App;
use crate::ledger::LoadState;
use crate::models::YearMonth;
use crate::notify::Level;
use crate::store::RemoteStore;
use crate::utils::parse_month;
use anyhow::{Result, bail};

/// `--month` of the given subcommand, if present.
pub fn month_arg(m: &clap::ArgMatches) -> Result<Option<YearMonth>> {
    match m.try_get_one::<String>("month") {
        Ok(Some(s)) => Ok(Some(parse_month(s)?)),
        _ => Ok(None),
    }
}

/// Prints and clears pending notices on stderr.
pub fn print_notices<S: RemoteStore>(app: &mut App<S>) {
    for n in app.ledger_mut().drain_notices() {
        match n.level {
            Level::Success => eprintln!("✔ {}", n.message),
            Level::Error => eprintln!("✖ {}", n.message),
        }
    }
}

/// Fails unless the selected month is loaded and current.
pub fn ensure_loaded<S: RemoteStore>(app: &App<S>) -> Result<()> {
    if !app.session().is_signed_in() {
        bail!("Not signed in. Run `monthbook login --email <address>` first.");
    }
    let ledger = app.ledger();
    match ledger.state() {
        LoadState::Ready if ledger.loaded_month() == Some(ledger.month()) => Ok(()),
        LoadState::Error => bail!("Could not load transactions for {}", ledger.month()),
        _ => bail!("Transactions for {} are not loaded", ledger.month()),
    }
}
