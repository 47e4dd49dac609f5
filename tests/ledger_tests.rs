// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use monthbook::error::{LedgerError, StoreError};
use monthbook::ledger::{AddTransaction, Ledger, LoadState};
use monthbook::models::{NewTransaction, Principal, Transaction, TxKind, YearMonth};
use monthbook::notify::Level;
use monthbook::store::{
    AuthEvent, Credentials, DeleteFilter, RemoteStore, SqliteStore, TransactionFilter,
};
use rusqlite::params;
use rust_decimal::Decimal;
use std::cell::Cell;
use std::sync::mpsc::Receiver;

/// Wraps the local store and fails on demand.
struct FlakyStore {
    inner: SqliteStore,
    fail_queries: Cell<bool>,
    fail_writes: Cell<bool>,
    queries: Cell<usize>,
}

impl FlakyStore {
    fn new(inner: SqliteStore) -> Self {
        FlakyStore {
            inner,
            fail_queries: Cell::new(false),
            fail_writes: Cell::new(false),
            queries: Cell::new(0),
        }
    }

    fn boom() -> StoreError {
        StoreError::Rejected {
            status: 503,
            message: "service unavailable".into(),
        }
    }
}

impl RemoteStore for FlakyStore {
    fn current_principal(&self) -> Option<Principal> {
        self.inner.current_principal()
    }
    fn subscribe(&self) -> Receiver<AuthEvent> {
        self.inner.subscribe()
    }
    fn sign_up(&self, c: &Credentials) -> Result<Option<Principal>, StoreError> {
        self.inner.sign_up(c)
    }
    fn sign_in(&self, c: &Credentials) -> Result<Principal, StoreError> {
        self.inner.sign_in(c)
    }
    fn sign_out(&self) -> Result<(), StoreError> {
        self.inner.sign_out()
    }
    fn query(&self, f: &TransactionFilter) -> Result<Vec<Transaction>, StoreError> {
        self.queries.set(self.queries.get() + 1);
        if self.fail_queries.get() {
            return Err(Self::boom());
        }
        self.inner.query(f)
    }
    fn insert(&self, r: &NewTransaction) -> Result<(), StoreError> {
        if self.fail_writes.get() {
            return Err(Self::boom());
        }
        self.inner.insert(r)
    }
    fn delete(&self, f: &DeleteFilter) -> Result<usize, StoreError> {
        if self.fail_writes.get() {
            return Err(Self::boom());
        }
        self.inner.delete(f)
    }
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn jan() -> YearMonth {
    YearMonth::new(2025, 1).unwrap()
}

fn feb() -> YearMonth {
    YearMonth::new(2025, 2).unwrap()
}

fn signed_in_store() -> (FlakyStore, Principal) {
    let store = SqliteStore::open_in_memory().unwrap();
    let me = store
        .sign_in(&Credentials {
            email: "alice@example.com".into(),
            password: String::new(),
        })
        .unwrap();
    (FlakyStore::new(store), me)
}

fn seed(store: &FlakyStore, owner: &str, amount: i64, category: &str, date: NaiveDate) {
    store
        .insert(&NewTransaction {
            amount: Decimal::new(amount, 2),
            description: format!("{} on {}", category, date),
            category: category.into(),
            r#type: if amount < 0 { TxKind::Expense } else { TxKind::Income },
            owner: owner.into(),
            date: Some(date),
        })
        .unwrap();
}

/// Writes a row for a different user straight into the database.
fn seed_foreign(store: &FlakyStore, id: &str, date: NaiveDate) {
    let conn = store.inner.connection();
    conn.execute(
        "INSERT OR IGNORE INTO users(id, email) VALUES ('bob', 'bob@example.com')",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO transactions(id, amount, description, category, type, date, user_id, created_at)
         VALUES (?1, '-99.00', 'bob lunch', 'Food', 'expense', ?2, 'bob', '2025-01-01 00:00:00+00:00')",
        params![id, date.to_string()],
    )
    .unwrap();
}

fn expense(amount: &str, description: &str, category: &str, date: NaiveDate) -> AddTransaction {
    AddTransaction {
        amount: amount.parse().unwrap(),
        description: description.into(),
        category: category.into(),
        kind: TxKind::Expense,
        date: Some(date),
    }
}

#[test]
fn load_scopes_to_month_and_owner_newest_first() {
    let (store, me) = signed_in_store();
    seed(&store, &me.id, -500, "Food", d(2025, 1, 1));
    seed(&store, &me.id, -700, "Bills", d(2025, 1, 31));
    seed(&store, &me.id, 20000, "Income", d(2025, 1, 15));
    seed(&store, &me.id, -100, "Food", d(2024, 12, 31));
    seed(&store, &me.id, -100, "Food", d(2025, 2, 1));
    seed_foreign(&store, "bob-1", d(2025, 1, 10));

    let mut ledger = Ledger::new(jan());
    ledger.load(&store, jan()).unwrap();

    let dates: Vec<NaiveDate> = ledger.transactions().iter().map(|t| t.date).collect();
    assert_eq!(dates, vec![d(2025, 1, 31), d(2025, 1, 15), d(2025, 1, 1)]);
    assert!(ledger.transactions().iter().all(|t| t.owner == me.id));
    assert_eq!(ledger.state(), LoadState::Ready);
    assert!(!ledger.is_loading());
    assert_eq!(ledger.loaded_month(), Some(jan()));
    assert!(ledger.notices().is_empty());
}

#[test]
fn same_day_rows_come_back_newest_insert_first() {
    let (store, me) = signed_in_store();
    seed(&store, &me.id, -100, "Food", d(2025, 1, 5));
    seed(&store, &me.id, -200, "Transport", d(2025, 1, 5));

    let mut ledger = Ledger::new(jan());
    ledger.load(&store, jan()).unwrap();
    let cats: Vec<&str> = ledger.transactions().iter().map(|t| t.category_label()).collect();
    assert_eq!(cats, vec!["Transport", "Food"]);
}

#[test]
fn empty_month_loads_cleanly() {
    let (store, me) = signed_in_store();
    seed(&store, &me.id, -100, "Food", d(2025, 1, 5));

    let mut ledger = Ledger::new(feb());
    ledger.load(&store, feb()).unwrap();
    assert!(ledger.transactions().is_empty());
    assert_eq!(ledger.state(), LoadState::Ready);
    assert!(ledger.notices().is_empty());
}

#[test]
fn load_without_session_is_unauthenticated_and_keeps_cache() {
    let (store, me) = signed_in_store();
    seed(&store, &me.id, -100, "Food", d(2025, 1, 5));
    let mut ledger = Ledger::new(jan());
    ledger.load(&store, jan()).unwrap();
    let before = ledger.transactions().to_vec();

    store.sign_out().unwrap();
    let err = ledger.load(&store, jan()).unwrap_err();
    assert!(matches!(err, LedgerError::Unauthenticated));
    assert_eq!(ledger.transactions(), before.as_slice());
    assert_eq!(store.queries.get(), 1);
}

#[test]
fn failed_load_keeps_previous_rows_and_notifies_once() {
    let (store, me) = signed_in_store();
    seed(&store, &me.id, -100, "Food", d(2025, 1, 5));
    let mut ledger = Ledger::new(jan());
    ledger.load(&store, jan()).unwrap();
    let before = ledger.transactions().to_vec();

    store.fail_queries.set(true);
    let err = ledger.load(&store, jan()).unwrap_err();
    assert!(matches!(err, LedgerError::RemoteFailure(_)));
    assert_eq!(ledger.transactions(), before.as_slice());
    assert_eq!(ledger.state(), LoadState::Error);
    assert!(!ledger.is_loading());

    let notices = ledger.drain_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, Level::Error);
    assert_eq!(notices[0].message, "Failed to load transactions");
}

#[test]
fn add_derives_sign_from_type_and_reloads() {
    let (store, _me) = signed_in_store();
    let mut ledger = Ledger::new(jan());

    ledger
        .add(&store, expense("42.50", "Groceries", "Food", d(2025, 1, 3)))
        .unwrap();
    ledger
        .add(
            &store,
            AddTransaction {
                amount: "-42.50".parse().unwrap(),
                description: "Refund".into(),
                category: "Income".into(),
                kind: TxKind::Income,
                date: Some(d(2025, 1, 4)),
            },
        )
        .unwrap();

    let conn = store.inner.connection();
    let mut stored: Vec<String> = conn
        .prepare("SELECT amount FROM transactions ORDER BY seq")
        .unwrap()
        .query_map([], |r| r.get(0))
        .unwrap()
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(stored.remove(0), "-42.50");
    assert_eq!(stored.remove(0), "42.50");

    // no optimistic insert: the cache comes from the reload after each add
    assert_eq!(store.queries.get(), 2);
    assert_eq!(ledger.transactions().len(), 2);
    assert_eq!(ledger.transactions()[0].description, "Refund");
    let messages: Vec<String> = ledger.drain_notices().into_iter().map(|n| n.message).collect();
    assert_eq!(messages, vec!["Transaction added successfully"; 2]);
}

#[test]
fn add_rejects_blank_fields_without_touching_store() {
    let (store, _me) = signed_in_store();
    let mut ledger = Ledger::new(jan());

    let err = ledger
        .add(&store, expense("5", "   ", "Food", d(2025, 1, 3)))
        .unwrap_err();
    assert!(matches!(err, LedgerError::ValidationFailure(_)));
    let err = ledger
        .add(&store, expense("5", "Bus", "", d(2025, 1, 3)))
        .unwrap_err();
    assert!(matches!(err, LedgerError::ValidationFailure(_)));

    let n: i64 = store
        .inner
        .connection()
        .query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(n, 0);
    assert_eq!(ledger.drain_notices().len(), 2);
}

#[test]
fn add_rejects_amounts_beyond_the_limit() {
    let (store, _me) = signed_in_store();
    let mut ledger = Ledger::new(jan());

    for _ in 0..2 {
        let err = ledger
            .add(
                &store,
                expense("79228162514264337593543950335", "Yacht", "Shopping", d(2025, 1, 4)),
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::ValidationFailure(_)));
    }
    ledger
        .add(&store, expense("999999999999.99", "House", "Bills", d(2025, 1, 4)))
        .unwrap();

    assert_eq!(ledger.transactions().len(), 1);
    let agg = ledger.aggregates();
    assert_eq!(agg.expenses, Decimal::new(99_999_999_999_999, 2));
    let levels: Vec<Level> = ledger.drain_notices().into_iter().map(|n| n.level).collect();
    assert_eq!(levels, vec![Level::Error, Level::Error, Level::Success]);
}

#[test]
fn add_failure_leaves_cache_alone() {
    let (store, me) = signed_in_store();
    seed(&store, &me.id, -100, "Food", d(2025, 1, 5));
    let mut ledger = Ledger::new(jan());
    ledger.load(&store, jan()).unwrap();

    store.fail_writes.set(true);
    let err = ledger
        .add(&store, expense("9.99", "Cinema", "Entertainment", d(2025, 1, 6)))
        .unwrap_err();
    assert!(matches!(err, LedgerError::RemoteFailure(_)));
    assert_eq!(ledger.transactions().len(), 1);
    assert_eq!(store.queries.get(), 1);
    let notices = ledger.drain_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message, "Failed to add transaction");
}

#[test]
fn add_requires_session() {
    let store = FlakyStore::new(SqliteStore::open_in_memory().unwrap());
    let mut ledger = Ledger::new(jan());
    let err = ledger
        .add(&store, expense("1", "Coffee", "Food", d(2025, 1, 2)))
        .unwrap_err();
    assert!(matches!(err, LedgerError::Unauthenticated));
}

#[test]
fn delete_ignores_rows_owned_by_someone_else() {
    let (store, me) = signed_in_store();
    seed(&store, &me.id, -100, "Food", d(2025, 1, 5));
    seed_foreign(&store, "bob-1", d(2025, 1, 10));
    let mut ledger = Ledger::new(jan());
    ledger.load(&store, jan()).unwrap();
    let before = ledger.transactions().to_vec();
    let queries = store.queries.get();

    assert!(!ledger.delete(&store, "bob-1").unwrap());

    let still_there: i64 = store
        .inner
        .connection()
        .query_row("SELECT COUNT(*) FROM transactions WHERE id='bob-1'", [], |r| r.get(0))
        .unwrap();
    assert_eq!(still_there, 1);
    assert_eq!(ledger.transactions(), before.as_slice());
    assert_eq!(store.queries.get(), queries);
}

#[test]
fn delete_removes_own_row_and_reloads() {
    let (store, me) = signed_in_store();
    seed(&store, &me.id, -100, "Food", d(2025, 1, 5));
    seed(&store, &me.id, -300, "Bills", d(2025, 1, 6));
    let mut ledger = Ledger::new(jan());
    ledger.load(&store, jan()).unwrap();
    let victim = ledger.transactions()[0].id.clone();

    assert!(ledger.delete(&store, &victim).unwrap());
    assert_eq!(ledger.transactions().len(), 1);
    assert!(ledger.transactions().iter().all(|t| t.id != victim));
    assert_eq!(ledger.drain_notices()[0].message, "Transaction deleted");
}

#[test]
fn delete_failure_reports_and_keeps_cache() {
    let (store, me) = signed_in_store();
    seed(&store, &me.id, -100, "Food", d(2025, 1, 5));
    let mut ledger = Ledger::new(jan());
    ledger.load(&store, jan()).unwrap();
    let id = ledger.transactions()[0].id.clone();

    store.fail_writes.set(true);
    assert!(ledger.delete(&store, &id).is_err());
    assert_eq!(ledger.transactions().len(), 1);
    assert_eq!(ledger.drain_notices()[0].message, "Failed to delete transaction");
}

#[test]
fn only_latest_load_lands() {
    let (store, me) = signed_in_store();
    seed(&store, &me.id, -100, "Food", d(2025, 1, 5));
    seed(&store, &me.id, -200, "Bills", d(2025, 2, 5));
    let mut ledger = Ledger::new(feb());

    let first = ledger.begin_load(&store, jan()).unwrap();
    let second = ledger.begin_load(&store, feb()).unwrap();
    assert!(second.generation() > first.generation());
    let jan_rows = store.query(first.filter());
    let feb_rows = store.query(second.filter());

    ledger.finish_load(second, feb_rows).unwrap();
    assert_eq!(ledger.state(), LoadState::Ready);
    // the earlier request resolves last and must not win
    ledger.finish_load(first, jan_rows).unwrap();

    assert_eq!(ledger.loaded_month(), Some(feb()));
    assert_eq!(ledger.transactions().len(), 1);
    assert_eq!(ledger.transactions()[0].date, d(2025, 2, 5));
}

#[test]
fn stale_failure_is_not_reported() {
    let (store, _me) = signed_in_store();
    let mut ledger = Ledger::new(jan());
    let first = ledger.begin_load(&store, jan()).unwrap();
    let second = ledger.begin_load(&store, jan()).unwrap();
    ledger.finish_load(second, Ok(Vec::new())).unwrap();
    ledger.finish_load(first, Err(FlakyStore::boom())).unwrap();
    assert_eq!(ledger.state(), LoadState::Ready);
    assert!(ledger.notices().is_empty());
}

#[test]
fn aggregates_follow_the_cache() {
    let (store, _me) = signed_in_store();
    let mut ledger = Ledger::new(jan());
    ledger.add(&store, expense("20", "Lunch", "Food", d(2025, 1, 2))).unwrap();
    ledger.add(&store, expense("10", "Snacks", "Food", d(2025, 1, 3))).unwrap();
    ledger
        .add(
            &store,
            AddTransaction {
                amount: "100".parse().unwrap(),
                description: "Salary".into(),
                category: "Income".into(),
                kind: TxKind::Income,
                date: Some(d(2025, 1, 4)),
            },
        )
        .unwrap();

    let a = ledger.aggregates();
    assert_eq!(a.balance, Decimal::new(70, 0));
    assert_eq!(a.income, Decimal::new(100, 0));
    assert_eq!(a.expenses, Decimal::new(30, 0));
    assert_eq!(a.category_totals.len(), 1);
    assert_eq!(a.category_totals["Food"], Decimal::new(30, 0));
    assert_eq!(a, ledger.aggregates());
}

#[test]
fn select_month_switches_and_loads() {
    let (store, me) = signed_in_store();
    seed(&store, &me.id, -100, "Food", d(2025, 1, 5));
    seed(&store, &me.id, -200, "Bills", d(2025, 2, 5));
    let mut ledger = Ledger::new(jan());
    ledger.reload(&store).unwrap();
    assert_eq!(ledger.transactions()[0].category_label(), "Food");

    ledger.select_month(&store, feb()).unwrap();
    assert_eq!(ledger.month(), feb());
    assert_eq!(ledger.transactions()[0].category_label(), "Bills");
}
