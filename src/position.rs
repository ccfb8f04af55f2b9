use rusqlite::Connection;

use crate::db::active_accounts_for;
use crate::error::Result;
use crate::fmt::round_cents;
use crate::models::Account;

/// Transactions are read from the store in pages of this size so a large
/// statement history never materializes in one query.
const PAGE_SIZE: i64 = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct DailyPosition {
    pub date: String,
    pub cash_in: f64,
    pub cash_out: f64,
    pub net: f64,
    pub running_balance: f64,
    pub txn_count: usize,
}

/// Derived view, never persisted.
#[derive(Debug, Clone)]
pub struct CashPosition {
    pub opening_balance: f64,
    pub opening_date: Option<String>,
    /// Sparse: days with no transactions are absent, not zero-filled.
    pub days: Vec<DailyPosition>,
    pub total_in: f64,
    pub total_out: f64,
    pub net_movement: f64,
    pub closing_balance: f64,
}

impl CashPosition {
    fn empty(opening_balance: f64, opening_date: Option<String>) -> Self {
        Self {
            opening_balance,
            opening_date,
            days: Vec::new(),
            total_in: 0.0,
            total_out: 0.0,
            net_movement: 0.0,
            closing_balance: opening_balance,
        }
    }
}

pub struct CompanyPosition {
    pub accounts: Vec<(Account, CashPosition)>,
    pub total_in: f64,
    pub total_out: f64,
    pub net_movement: f64,
    pub closing_balance: f64,
}

/// The user-asserted starting balance in force at `as_of`. Defaults to
/// zero with no date when none has been recorded yet.
pub fn opening_balance_for(
    conn: &Connection,
    account_id: i64,
    owner: &str,
    as_of: &str,
) -> Result<(f64, Option<String>)> {
    let found: Option<(f64, String)> = conn
        .query_row(
            "SELECT amount, effective_date FROM opening_balances \
             WHERE account_id = ?1 AND owner = ?2 AND effective_date <= ?3 \
             ORDER BY effective_date DESC LIMIT 1",
            rusqlite::params![account_id, owner, as_of],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;
    match found {
        Some((amount, date)) => Ok((amount, Some(date))),
        None => Ok((0.0, None)),
    }
}

fn fetch_day_rows(
    conn: &Connection,
    account_id: i64,
    from: &str,
    to: &str,
) -> Result<Vec<(String, f64, f64)>> {
    let mut rows = Vec::new();
    let mut offset = 0i64;
    loop {
        let mut stmt = conn.prepare_cached(
            "SELECT date, withdrawal, deposit FROM transactions \
             WHERE account_id = ?1 AND date BETWEEN ?2 AND ?3 \
             ORDER BY date, id LIMIT ?4 OFFSET ?5",
        )?;
        let page: Vec<(String, f64, f64)> = stmt
            .query_map(
                rusqlite::params![account_id, from, to, PAGE_SIZE, offset],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let fetched = page.len() as i64;
        rows.extend(page);
        if fetched < PAGE_SIZE {
            break;
        }
        offset += PAGE_SIZE;
    }
    Ok(rows)
}

/// Daily cash movement and running balance for one account over a date
/// range, seeded from the opening balance in force at the range start.
pub fn cash_position(
    conn: &Connection,
    account: &Account,
    owner: &str,
    from: &str,
    to: &str,
) -> Result<CashPosition> {
    let (opening_balance, opening_date) = opening_balance_for(conn, account.id, owner, from)?;
    let rows = fetch_day_rows(conn, account.id, from, to)?;
    if rows.is_empty() {
        return Ok(CashPosition::empty(opening_balance, opening_date));
    }

    // Rows arrive date-ordered, so each day's bucket closes when the date
    // changes.
    let mut days: Vec<DailyPosition> = Vec::new();
    let mut running = opening_balance;
    let mut total_in = 0.0;
    let mut total_out = 0.0;
    for (date, withdrawal, deposit) in rows {
        match days.last_mut() {
            Some(day) if day.date == date => {
                day.cash_in += deposit;
                day.cash_out += withdrawal;
                day.txn_count += 1;
            }
            _ => days.push(DailyPosition {
                date,
                cash_in: deposit,
                cash_out: withdrawal,
                net: 0.0,
                running_balance: running,
                txn_count: 1,
            }),
        }
    }
    for day in &mut days {
        day.cash_in = round_cents(day.cash_in);
        day.cash_out = round_cents(day.cash_out);
        day.net = round_cents(day.cash_in - day.cash_out);
        running = round_cents(running + day.net);
        day.running_balance = running;
        total_in += day.cash_in;
        total_out += day.cash_out;
    }

    let total_in = round_cents(total_in);
    let total_out = round_cents(total_out);
    Ok(CashPosition {
        opening_balance,
        opening_date,
        days,
        total_in,
        total_out,
        net_movement: round_cents(total_in - total_out),
        closing_balance: running,
    })
}

/// All active accounts for a user, summed. One account failing to compute
/// is skipped rather than sinking the whole view; a user with no accounts
/// gets a zeroed result.
pub fn company_position(
    conn: &Connection,
    user: &str,
    from: &str,
    to: &str,
) -> Result<CompanyPosition> {
    let mut accounts = Vec::new();
    let mut total_in = 0.0;
    let mut total_out = 0.0;
    let mut closing = 0.0;
    for account in active_accounts_for(conn, user)? {
        match cash_position(conn, &account, user, from, to) {
            Ok(position) => {
                total_in += position.total_in;
                total_out += position.total_out;
                closing += position.closing_balance;
                accounts.push((account, position));
            }
            Err(e) => {
                eprintln!("skipping account {}: {e}", account.name);
            }
        }
    }
    let total_in = round_cents(total_in);
    let total_out = round_cents(total_out);
    Ok(CompanyPosition {
        accounts,
        total_in,
        total_out,
        net_movement: round_cents(total_in - total_out),
        closing_balance: round_cents(closing),
    })
}
