// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::Transaction;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Dashboard figures for one set of transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Aggregates {
    pub balance: Decimal,
    pub income: Decimal,
    /// Positive magnitude of all outflows.
    pub expenses: Decimal,
    /// Expense magnitude per category; income never appears here.
    pub category_totals: BTreeMap<String, Decimal>,
}

impl Aggregates {
    /// Category totals sorted by amount spent, largest first.
    pub fn categories_by_spend(&self) -> Vec<(&str, Decimal)> {
        let mut items: Vec<(&str, Decimal)> = self
            .category_totals
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .collect();
        items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        items
    }
}

pub fn derive(transactions: &[Transaction]) -> Aggregates {
    let mut balance = Decimal::ZERO;
    let mut income = Decimal::ZERO;
    let mut expenses = Decimal::ZERO;
    let mut category_totals: BTreeMap<String, Decimal> = BTreeMap::new();

    // sums saturate at Decimal::MAX rather than overflow
    for t in transactions {
        balance = balance.saturating_add(t.amount);
        if t.amount > Decimal::ZERO {
            income = income.saturating_add(t.amount);
        } else if t.amount < Decimal::ZERO {
            let out = t.amount.abs();
            expenses = expenses.saturating_add(out);
            let total = category_totals
                .entry(t.category_label().to_string())
                .or_insert(Decimal::ZERO);
            *total = total.saturating_add(out);
        }
    }

    Aggregates {
        balance,
        income,
        expenses,
        category_totals,
    }
}
