// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::ensure_loaded;
use crate::app::App;
use crate::ledger::AddTransaction;
use crate::models::{Category, Transaction, TxKind};
use crate::store::RemoteStore;
use crate::utils::{fmt_money, maybe_print_json, parse_date, parse_decimal, pretty_table, required};
use anyhow::{Context, Result, anyhow, bail};
use serde::Serialize;
use std::path::Path;

pub fn handle<S: RemoteStore>(app: &mut App<S>, m: &clap::ArgMatches, symbol: &str) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(app, sub, symbol)?,
        Some(("list", sub)) => list(app, sub, symbol)?,
        Some(("rm", sub)) => remove(app, sub)?,
        Some(("export", sub)) => export(app, sub)?,
        _ => {}
    }
    Ok(())
}

/// Reads the add form from CLI arguments.
pub fn parse_add(sub: &clap::ArgMatches) -> Result<AddTransaction> {
    let amount = parse_decimal(required(sub, "amount")?)?;
    let description = required(sub, "description")?.to_string();
    let category = required(sub, "category")?
        .parse::<Category>()
        .map_err(|e| anyhow!(e))?;
    let kind = required(sub, "type")?
        .parse::<TxKind>()
        .map_err(|e| anyhow!(e))?;
    let date = match sub.get_one::<String>("date") {
        Some(d) => Some(parse_date(d)?),
        None => None,
    };
    Ok(AddTransaction {
        amount,
        description,
        category: category.as_str().to_string(),
        kind,
        date,
    })
}

fn add<S: RemoteStore>(app: &mut App<S>, sub: &clap::ArgMatches, symbol: &str) -> Result<()> {
    let input = parse_add(sub)?;
    let shown = fmt_money(input.kind.signed(input.amount), symbol);
    let (description, category) = (input.description.clone(), input.category.clone());
    app.add(input)?;
    println!("Recorded {} '{}' ({})", shown, description, category);
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct TransactionRow {
    pub id: String,
    pub date: String,
    pub description: String,
    pub category: String,
    pub r#type: String,
    pub amount: String,
}

pub fn rows(transactions: &[Transaction], symbol: &str) -> Vec<TransactionRow> {
    transactions
        .iter()
        .map(|t| TransactionRow {
            id: t.id.clone(),
            date: t.date.format("%b %-d, %Y").to_string(),
            description: t.description.clone(),
            category: t.category.clone().unwrap_or_default(),
            r#type: t.r#type.to_string(),
            amount: fmt_money(t.amount, symbol),
        })
        .collect()
}

fn list<S: RemoteStore>(app: &App<S>, sub: &clap::ArgMatches, symbol: &str) -> Result<()> {
    ensure_loaded(app)?;
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let mut txs = app.ledger().transactions();
    if let Some(limit) = sub.get_one::<usize>("limit") {
        txs = &txs[..txs.len().min(*limit)];
    }
    if maybe_print_json(json_flag, jsonl_flag, &txs)? {
        return Ok(());
    }
    if txs.is_empty() {
        println!("No transactions yet");
        return Ok(());
    }
    let data: Vec<Vec<String>> = rows(txs, symbol)
        .into_iter()
        .map(|r| vec![r.id, r.date, r.description, r.category, r.r#type, r.amount])
        .collect();
    println!(
        "{}",
        pretty_table(
            &["Id", "Date", "Description", "Category", "Type", "Amount"],
            data
        )
    );
    Ok(())
}

fn remove<S: RemoteStore>(app: &mut App<S>, sub: &clap::ArgMatches) -> Result<()> {
    let id = required(sub, "id")?;
    if !app.delete(id)? {
        bail!("No transaction '{}' found for the signed-in user", id);
    }
    println!("Deleted {}", id);
    Ok(())
}

fn export<S: RemoteStore>(app: &App<S>, sub: &clap::ArgMatches) -> Result<()> {
    ensure_loaded(app)?;
    let fmt = required(sub, "format")?.to_lowercase();
    let out = required(sub, "out")?.trim();
    write_export(app.ledger().transactions(), &fmt, Path::new(out))?;
    println!(
        "Exported {} transactions for {} to {}",
        app.ledger().transactions().len(),
        app.ledger().month(),
        out
    );
    Ok(())
}

pub fn write_export(transactions: &[Transaction], fmt: &str, out: &Path) -> Result<()> {
    match fmt {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)
                .with_context(|| format!("Create {}", out.display()))?;
            wtr.write_record(["id", "date", "description", "category", "type", "amount"])?;
            for t in transactions {
                wtr.write_record([
                    t.id.clone(),
                    t.date.to_string(),
                    t.description.clone(),
                    t.category.clone().unwrap_or_default(),
                    t.r#type.to_string(),
                    t.amount.to_string(),
                ])?;
            }
            wtr.flush()?;
        }
        "json" => {
            std::fs::write(out, serde_json::to_string_pretty(transactions)?)
                .with_context(|| format!("Write {}", out.display()))?;
        }
        other => bail!("Unknown format: {} (use csv|json)", other),
    }
    Ok(())
}
