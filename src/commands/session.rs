// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::app::App;
use crate::store::{Credentials, RemoteStore};
use crate::utils::required;
use anyhow::Result;

fn credentials(sub: &clap::ArgMatches) -> Result<Credentials> {
    Ok(Credentials {
        email: required(sub, "email")?.to_string(),
        password: sub
            .get_one::<String>("password")
            .cloned()
            .unwrap_or_default(),
    })
}

pub fn signup<S: RemoteStore>(app: &mut App<S>, sub: &clap::ArgMatches) -> Result<()> {
    let credentials = credentials(sub)?;
    match app.sign_up(&credentials)? {
        Some(me) => println!("Created account and signed in as {}", me.email),
        None => println!(
            "Created account for {}; confirm the address from your inbox, then log in",
            credentials.email.trim()
        ),
    }
    Ok(())
}

pub fn login<S: RemoteStore>(app: &mut App<S>, sub: &clap::ArgMatches) -> Result<()> {
    let me = app.sign_in(&credentials(sub)?)?;
    println!("Signed in as {}", me.email);
    Ok(())
}

pub fn logout<S: RemoteStore>(app: &mut App<S>) -> Result<()> {
    app.sign_out()?;
    println!("Signed out");
    Ok(())
}

pub fn whoami<S: RemoteStore>(app: &App<S>) -> Result<()> {
    match app.session().current() {
        Some(p) => println!("{} ({})", p.email, p.id),
        None => println!("Not signed in"),
    }
    Ok(())
}
