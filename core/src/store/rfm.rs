use super::{insert_run_row, AnalysisStore};
use crate::{
    error::AnalysisResult,
    rfm_engine::{CustomerRfm, RfmTable},
    types::{CustomerId, Segment},
};
use rusqlite::{params, Connection};

impl AnalysisStore {
    // ── Customer RFM records ───────────────────────────────────

    /// Record a run and its RFM table in one transaction. A failed insert
    /// leaves neither the run nor any of its rows behind.
    pub fn save_run(&self, run_id: &str, version: &str, table: &RfmTable) -> AnalysisResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        insert_run_row(&tx, run_id, table.snapshot_date, version)?;
        insert_rfm_rows(&tx, run_id, table)?;
        tx.commit()?;
        log::debug!("store: saved run {run_id} with {} rfm rows", table.records.len());
        Ok(())
    }

    /// Persist an RFM table against an existing run. All rows land or none do.
    pub fn save_rfm_table(&self, run_id: &str, table: &RfmTable) -> AnalysisResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        insert_rfm_rows(&tx, run_id, table)?;
        tx.commit()?;
        log::debug!("store: saved {} rfm rows for {run_id}", table.records.len());
        Ok(())
    }

    /// Read a run's RFM table back, ordered by customer id.
    pub fn load_rfm_table(&self, run_id: &str) -> AnalysisResult<Option<RfmTable>> {
        let Some(snapshot_date) = self.run_snapshot_date(run_id)? else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT customer_id, recency, frequency, monetary,
                    r_score, f_score, m_score, segment
             FROM customer_rfm
             WHERE run_id = ?1
             ORDER BY customer_id ASC",
        )?;
        let records = stmt
            .query_map(params![run_id], |row| {
                let label: String = row.get(7)?;
                let segment = label.parse::<Segment>().map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        7,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok(CustomerRfm {
                    customer_id: CustomerId(row.get(0)?),
                    recency:     row.get(1)?,
                    frequency:   row.get(2)?,
                    monetary:    row.get(3)?,
                    r_score:     row.get(4)?,
                    f_score:     row.get(5)?,
                    m_score:     row.get(6)?,
                    segment,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(RfmTable {
            snapshot_date,
            records,
        }))
    }

    pub fn rfm_row_count(&self, run_id: &str) -> AnalysisResult<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM customer_rfm WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }
}

fn insert_rfm_rows(conn: &Connection, run_id: &str, table: &RfmTable) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO customer_rfm (
            run_id, customer_id, recency, frequency, monetary,
            r_score, f_score, m_score, segment
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )?;
    for r in &table.records {
        stmt.execute(params![
            run_id,
            r.customer_id.0,
            r.recency,
            r.frequency,
            r.monetary,
            r.r_score,
            r.f_score,
            r.m_score,
            r.segment.as_str(),
        ])?;
    }
    Ok(())
}
