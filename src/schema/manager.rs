use rusqlite::Connection;
use tracing::info;

use crate::error::{EtlError, Result};
use crate::schema::catalog::StarSchema;

/// Create the star-schema tables and fact indexes if absent. Safe to call on an
/// existing warehouse. All or nothing.
#[tracing::instrument(level = "info", skip_all)]
pub fn ensure_schema(conn: &mut Connection, star: &StarSchema) -> Result<()> {
    let tx = conn.transaction().map_err(EtlError::SchemaCreationFailed)?;
    for table in star.tables() {
        tx.execute_batch(&table.create_table_sql())
            .map_err(EtlError::SchemaCreationFailed)?;
        for sql in table.create_index_sql() {
            tx.execute_batch(&sql).map_err(EtlError::SchemaCreationFailed)?;
        }
    }
    tx.commit().map_err(EtlError::SchemaCreationFailed)?;
    info!("schema ready");
    Ok(())
}

/// Delete every row from the three tables, fact first, keeping the schema.
#[tracing::instrument(level = "info", skip_all)]
pub fn reset(conn: &mut Connection, star: &StarSchema) -> Result<()> {
    let tx = conn.transaction().map_err(EtlError::SchemaCreationFailed)?;
    for table in star.tables().iter().rev() {
        let deleted = tx
            .execute(&format!("DELETE FROM {}", table.name), [])
            .map_err(EtlError::SchemaCreationFailed)?;
        info!(table = %table.name, deleted, "cleared");
    }
    tx.commit().map_err(EtlError::SchemaCreationFailed)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::Warehouse;
    use anyhow::Result;

    fn index_names(conn: &Connection) -> rusqlite::Result<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = 'fact_sales' \
             AND name LIKE 'idx_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    #[test]
    fn ensure_schema_is_idempotent() -> Result<()> {
        let mut wh = Warehouse::open_in_memory()?;
        let star = StarSchema::default();
        ensure_schema(wh.conn_mut(), &star)?;
        ensure_schema(wh.conn_mut(), &star)?;

        for t in ["dim_customer", "dim_product", "fact_sales"] {
            assert_eq!(wh.row_count(t)?, 0);
        }
        assert_eq!(
            index_names(wh.conn())?,
            vec![
                "idx_fact_sales_customer",
                "idx_fact_sales_product",
                "idx_fact_sales_store"
            ]
        );
        Ok(())
    }

    #[test]
    fn reset_keeps_tables_and_drops_rows() -> Result<()> {
        let mut wh = Warehouse::open_in_memory()?;
        let star = StarSchema::default();
        ensure_schema(wh.conn_mut(), &star)?;
        wh.conn().execute_batch(
            "INSERT INTO dim_customer (CustomerID, Name) VALUES (1, 'Ann');
             INSERT INTO dim_product (ProductID, ProductName) VALUES (10, 'Widget');
             INSERT INTO fact_sales (TransactionID, SaleDate, CustomerID, ProductID)
                 VALUES (100, '2024-05-01', 1, 10);",
        )?;

        reset(wh.conn_mut(), &star)?;

        for t in ["dim_customer", "dim_product", "fact_sales"] {
            assert_eq!(wh.row_count(t)?, 0);
        }
        Ok(())
    }

    #[test]
    fn conflicting_table_fails_schema_creation() -> Result<()> {
        let mut wh = Warehouse::open_in_memory()?;
        // a view squatting on a table name cannot be replaced by CREATE TABLE IF NOT EXISTS,
        // and the index on it then fails
        wh.conn()
            .execute_batch("CREATE VIEW fact_sales AS SELECT 1 AS CustomerID")?;
        let err = ensure_schema(wh.conn_mut(), &StarSchema::default()).unwrap_err();
        assert_eq!(err.kind(), "SchemaCreationFailed");
        // nothing from the failed attempt is left behind
        let tables: i64 = wh.conn().query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
            [],
            |r| r.get(0),
        )?;
        assert_eq!(tables, 0);
        Ok(())
    }
}
