use super::{date_column, AnalysisStore, CALENDAR_DATASET, RETURNS_DATASET, SALES_DATASET};
use crate::{
    error::{AnalysisError, AnalysisResult},
    ingest::CalendarDay,
    transaction::{ReturnTransaction, SalesTransaction},
    types::CustomerId,
};
use rusqlite::params;

impl AnalysisStore {
    // ── Sales ──────────────────────────────────────────────────

    /// Replace the published sales dataset.
    pub fn replace_sales(&self, sales: &[SalesTransaction]) -> AnalysisResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM sales_transaction", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO sales_transaction (
                    invoice_no, stock_code, description, quantity, invoice_date,
                    unit_price, customer_id, country, total_revenue
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for t in sales {
                stmt.execute(params![
                    t.invoice_no,
                    t.stock_code,
                    t.description,
                    t.quantity,
                    t.invoice_date.to_string(),
                    t.unit_price,
                    t.customer_id.0,
                    t.country,
                    t.total_revenue,
                ])?;
            }
        }
        self.register_dataset(SALES_DATASET, sales.len())?;
        tx.commit()?;
        Ok(())
    }

    /// Load the validated sales table. Fails with `MissingInput` if no
    /// sales dataset was ever published.
    pub fn load_sales(&self) -> AnalysisResult<Vec<SalesTransaction>> {
        if self.dataset_row_count(SALES_DATASET)?.is_none() {
            return Err(AnalysisError::MissingInput {
                location: self.dataset_location(SALES_DATASET),
            });
        }

        let mut stmt = self.conn.prepare(
            "SELECT invoice_no, stock_code, description, quantity, invoice_date,
                    unit_price, customer_id, country, total_revenue
             FROM sales_transaction ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(SalesTransaction {
                    invoice_no:    row.get(0)?,
                    stock_code:    row.get(1)?,
                    description:   row.get(2)?,
                    quantity:      row.get(3)?,
                    invoice_date:  date_column(row, 4)?,
                    unit_price:    row.get(5)?,
                    customer_id:   CustomerId(row.get(6)?),
                    country:       row.get(7)?,
                    total_revenue: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── Returns ────────────────────────────────────────────────

    pub fn replace_returns(&self, returns: &[ReturnTransaction]) -> AnalysisResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM return_transaction", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO return_transaction (
                    invoice_no, stock_code, description, quantity, invoice_date,
                    unit_price, customer_id, country
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for r in returns {
                stmt.execute(params![
                    r.invoice_no,
                    r.stock_code,
                    r.description,
                    r.quantity,
                    r.invoice_date.to_string(),
                    r.unit_price,
                    r.customer_id.map(|c| c.0),
                    r.country,
                ])?;
            }
        }
        self.register_dataset(RETURNS_DATASET, returns.len())?;
        tx.commit()?;
        Ok(())
    }

    /// Load the returns table. Fails with `MissingOptionalInput` if no
    /// returns dataset was published; callers degrade to zero returns.
    pub fn load_returns(&self) -> AnalysisResult<Vec<ReturnTransaction>> {
        if self.dataset_row_count(RETURNS_DATASET)?.is_none() {
            return Err(AnalysisError::MissingOptionalInput {
                location: self.dataset_location(RETURNS_DATASET),
            });
        }

        let mut stmt = self.conn.prepare(
            "SELECT invoice_no, stock_code, description, quantity, invoice_date,
                    unit_price, customer_id, country
             FROM return_transaction ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ReturnTransaction {
                    invoice_no:   row.get(0)?,
                    stock_code:   row.get(1)?,
                    description:  row.get(2)?,
                    quantity:     row.get(3)?,
                    invoice_date: date_column(row, 4)?,
                    unit_price:   row.get(5)?,
                    customer_id:  row.get::<_, Option<i64>>(6)?.map(CustomerId),
                    country:      row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── Calendar ───────────────────────────────────────────────

    pub fn replace_calendar(&self, days: &[CalendarDay]) -> AnalysisResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM calendar_day", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO calendar_day (
                    date, year, quarter, month, month_name, week, day_of_week, day_name
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for d in days {
                stmt.execute(params![
                    d.date.to_string(),
                    d.year,
                    d.quarter,
                    d.month,
                    d.month_name,
                    d.week,
                    d.day_of_week,
                    d.day_name,
                ])?;
            }
        }
        self.register_dataset(CALENDAR_DATASET, days.len())?;
        tx.commit()?;
        Ok(())
    }

    pub fn load_calendar(&self) -> AnalysisResult<Vec<CalendarDay>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, year, quarter, month, month_name, week, day_of_week, day_name
             FROM calendar_day ORDER BY date ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(CalendarDay {
                    date:        date_column(row, 0)?,
                    year:        row.get(1)?,
                    quarter:     row.get(2)?,
                    month:       row.get(3)?,
                    month_name:  row.get(4)?,
                    week:        row.get(5)?,
                    day_of_week: row.get(6)?,
                    day_name:    row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
