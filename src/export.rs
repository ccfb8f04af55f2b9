use rusqlite::Connection;

use crate::error::{CashupError, Result};
use crate::fmt::round_cents;
use crate::models::Account;
use crate::position::opening_balance_for;

const PAGE_SIZE: i64 = 1000;

struct ExportRow {
    date: String,
    description: String,
    withdrawal: f64,
    deposit: f64,
    balance: Option<f64>,
    channel: Option<String>,
    reference: Option<String>,
    created_at: String,
}

fn fetch_rows(
    conn: &Connection,
    account_id: i64,
    from: &str,
    to: &str,
) -> Result<Vec<ExportRow>> {
    let mut rows = Vec::new();
    let mut offset = 0i64;
    loop {
        let mut stmt = conn.prepare_cached(
            "SELECT date, description, withdrawal, deposit, balance, channel, reference, \
             created_at FROM transactions \
             WHERE account_id = ?1 AND date BETWEEN ?2 AND ?3 \
             ORDER BY date, id LIMIT ?4 OFFSET ?5",
        )?;
        let page: Vec<ExportRow> = stmt
            .query_map(
                rusqlite::params![account_id, from, to, PAGE_SIZE, offset],
                |row| {
                    Ok(ExportRow {
                        date: row.get(0)?,
                        description: row.get(1)?,
                        withdrawal: row.get(2)?,
                        deposit: row.get(3)?,
                        balance: row.get(4)?,
                        channel: row.get(5)?,
                        reference: row.get(6)?,
                        created_at: row.get(7)?,
                    })
                },
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

/// Render the account's transactions over a range as CSV. The running
/// balance column is seeded from the same opening-balance lookup the
/// position view uses, so the export always agrees with what the position
/// command shows.
pub fn export_csv(
    conn: &Connection,
    account: &Account,
    owner: &str,
    from: &str,
    to: &str,
) -> Result<String> {
    let (opening, opening_date) = opening_balance_for(conn, account.id, owner, from)?;
    let opening_note = match &opening_date {
        Some(date) => format!("as of {date}"),
        None => "default".to_string(),
    };
    let mut out = format!(
        "# Opening Balance: {opening:.2} {} ({opening_note})\n",
        account.currency
    );

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "Date",
            "Description",
            "Withdrawal",
            "Deposit",
            "Balance",
            "Running Balance",
            "Channel",
            "Reference ID",
            "Created At",
        ])
        .map_err(CashupError::Csv)?;

    let mut running = opening;
    for row in fetch_rows(conn, account.id, from, to)? {
        running = round_cents(running + row.deposit - row.withdrawal);
        writer
            .write_record([
                row.date.as_str(),
                row.description.as_str(),
                &format!("{:.2}", row.withdrawal),
                &format!("{:.2}", row.deposit),
                &row.balance.map(|b| format!("{b:.2}")).unwrap_or_default(),
                &format!("{running:.2}"),
                row.channel.as_deref().unwrap_or(""),
                row.reference.as_deref().unwrap_or(""),
                row.created_at.as_str(),
            ])
            .map_err(CashupError::Csv)?;
    }

    let body = writer
        .into_inner()
        .map_err(|e| CashupError::Other(e.to_string()))?;
    out.push_str(&String::from_utf8(body).map_err(|e| CashupError::Other(e.to_string()))?);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn seed_account(conn: &Connection) -> Account {
        conn.execute("INSERT INTO accounts (name, owner) VALUES ('Checking', 'alice')", [])
            .unwrap();
        crate::db::get_account(conn, "Checking").unwrap()
    }

    #[test]
    fn test_export_layout_and_running_balance() {
        let (_dir, conn) = test_db();
        let account = seed_account(&conn);
        conn.execute(
            "INSERT INTO opening_balances (account_id, owner, amount, effective_date) \
             VALUES (?1, 'alice', 1000.0, '2026-01-01')",
            [account.id],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO transactions (account_id, date, description, deposit, balance, \
             channel, reference, content_hash, created_at) \
             VALUES (?1, '2026-01-02', 'STRIPE PAYOUT', 500.0, 1500.0, 'ACH', 'ref-1', 'h1', \
             '2026-01-10 08:00:00')",
            [account.id],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO transactions (account_id, date, description, withdrawal, content_hash) \
             VALUES (?1, '2026-01-03', 'RENT', 200.0, 'h2')",
            [account.id],
        )
        .unwrap();

        let csv = export_csv(&conn, &account, "alice", "2026-01-01", "2026-01-31").unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "# Opening Balance: 1000.00 USD (as of 2026-01-01)");
        assert_eq!(
            lines[1],
            "Date,Description,Withdrawal,Deposit,Balance,Running Balance,Channel,Reference ID,Created At"
        );
        assert_eq!(
            lines[2],
            "2026-01-02,STRIPE PAYOUT,0.00,500.00,1500.00,1500.00,ACH,ref-1,2026-01-10 08:00:00"
        );
        assert!(lines[3].starts_with("2026-01-03,RENT,200.00,0.00,,1300.00,"));
    }

    #[test]
    fn test_export_without_opening_uses_default() {
        let (_dir, conn) = test_db();
        let account = seed_account(&conn);
        let csv = export_csv(&conn, &account, "alice", "2026-01-01", "2026-01-31").unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "# Opening Balance: 0.00 USD (default)");
        assert_eq!(lines.len(), 2); // comment + header, no rows
    }

    #[test]
    fn test_export_quotes_embedded_commas() {
        let (_dir, conn) = test_db();
        let account = seed_account(&conn);
        conn.execute(
            "INSERT INTO transactions (account_id, date, description, deposit, content_hash) \
             VALUES (?1, '2026-01-02', 'ACME, INC PAYROLL', 100.0, 'h1')",
            [account.id],
        )
        .unwrap();
        let csv = export_csv(&conn, &account, "alice", "2026-01-01", "2026-01-31").unwrap();
        assert!(csv.contains("\"ACME, INC PAYROLL\""));
    }

    #[test]
    fn test_export_agrees_with_position_view() {
        let (_dir, conn) = test_db();
        let account = seed_account(&conn);
        conn.execute(
            "INSERT INTO opening_balances (account_id, owner, amount, effective_date) \
             VALUES (?1, 'alice', 42.42, '2026-01-01')",
            [account.id],
        )
        .unwrap();
        for (i, (date, w, d)) in [
            ("2026-01-02", 10.11, 0.0),
            ("2026-01-02", 0.0, 55.55),
            ("2026-01-09", 7.07, 0.0),
        ]
        .iter()
        .enumerate()
        {
            conn.execute(
                "INSERT INTO transactions (account_id, date, withdrawal, deposit, content_hash) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![account.id, date, w, d, format!("h{i}")],
            )
            .unwrap();
        }
        let csv = export_csv(&conn, &account, "alice", "2026-01-01", "2026-01-31").unwrap();
        let last_running: f64 = csv
            .lines()
            .last()
            .unwrap()
            .split(',')
            .nth(5)
            .unwrap()
            .parse()
            .unwrap();
        let pos = crate::position::cash_position(
            &conn, &account, "alice", "2026-01-01", "2026-01-31",
        )
        .unwrap();
        assert!((last_running - pos.closing_balance).abs() < 0.005);
    }
}
