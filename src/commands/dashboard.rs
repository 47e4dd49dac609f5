// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::ensure_loaded;
use crate::aggregate::Aggregates;
use crate::app::App;
use crate::store::RemoteStore;
use crate::utils::{fmt_money, maybe_print_json, pretty_table};
use anyhow::Result;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

const BAR_WIDTH: usize = 24;

pub fn summary<S: RemoteStore>(app: &App<S>, sub: &clap::ArgMatches, symbol: &str) -> Result<()> {
    ensure_loaded(app)?;
    let agg = app.ledger().aggregates();
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &agg)? {
        return Ok(());
    }
    println!("{}", app.ledger().month());
    println!(
        "{}",
        pretty_table(
            &["Total Balance", "Total Income", "Total Expenses"],
            vec![vec![
                fmt_money(agg.balance, symbol),
                fmt_money(agg.income, symbol),
                fmt_money(agg.expenses, symbol),
            ]],
        )
    );
    Ok(())
}

pub fn categories<S: RemoteStore>(
    app: &App<S>,
    sub: &clap::ArgMatches,
    symbol: &str,
) -> Result<()> {
    ensure_loaded(app)?;
    let agg = app.ledger().aggregates();
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    if json_flag || jsonl_flag {
        let items: Vec<serde_json::Value> = agg
            .categories_by_spend()
            .into_iter()
            .map(|(c, amt)| serde_json::json!({ "category": c, "spent": amt }))
            .collect();
        maybe_print_json(json_flag, jsonl_flag, &items)?;
        return Ok(());
    }
    if agg.category_totals.is_empty() {
        println!("No expenses in {}", app.ledger().month());
        return Ok(());
    }
    println!(
        "{}",
        pretty_table(&["Category", "Spent", "Share", ""], category_rows(&agg, symbol))
    );
    Ok(())
}

pub fn category_rows(agg: &Aggregates, symbol: &str) -> Vec<Vec<String>> {
    agg.categories_by_spend()
        .into_iter()
        .map(|(cat, amt)| {
            let share = if agg.expenses.is_zero() {
                Decimal::ZERO
            } else {
                amt / agg.expenses
            };
            let cells = (share * Decimal::from(BAR_WIDTH))
                .round()
                .to_usize()
                .unwrap_or(0);
            vec![
                cat.to_string(),
                fmt_money(amt, symbol),
                format!("{:.1}%", share * Decimal::ONE_HUNDRED),
                "█".repeat(cells),
            ]
        })
        .collect()
}
