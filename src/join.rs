//! Materialization of the side-by-side join table

use crate::backend::{Database, ExecMeta};
use crate::error::{CompareError, Result};
use crate::matcher::IndexColumn;
use crate::run::join_table_base;
use crate::sql::{aliased_column, quote_ident, quote_qualified, side_column, Side};

/// Issues the DDL that builds a comparison's join table
pub struct JoinMaterializer<'a> {
    db: &'a dyn Database,
}

impl<'a> JoinMaterializer<'a> {
    pub fn new(db: &'a dyn Database) -> Self {
        Self { db }
    }

    /// Create the target schema if needed. Failure is logged, never returned.
    pub fn ensure_schema(&self, schema: &str) {
        let sql = format!("CREATE SCHEMA IF NOT EXISTS {}", quote_qualified(schema));
        let first_error = match self.db.execute(&sql) {
            Ok(_) => return,
            Err(e) => e,
        };
        log::debug!("Schema creation failed, retrying qualified: {}", first_error);

        let fallback = match self.db.current_catalog() {
            Some(catalog) if !schema.contains('.') => format!(
                "CREATE SCHEMA IF NOT EXISTS {}.{}",
                quote_ident(&catalog),
                quote_qualified(schema)
            ),
            _ => {
                warn_schema(schema, &first_error);
                return;
            }
        };

        if let Err(e) = self.db.execute(&fallback) {
            warn_schema(schema, &e);
        }
    }

    /// Fully qualified, quoted join table name for a run
    pub fn join_table_name(&self, schema: &str, run_id: &str) -> String {
        let base = quote_ident(&join_table_base(run_id));
        if schema.contains('.') {
            return format!("{}.{}", quote_qualified(schema), base);
        }
        match self.db.current_catalog() {
            Some(catalog) => format!(
                "{}.{}.{}",
                quote_ident(&catalog),
                quote_qualified(schema),
                base
            ),
            None => format!("{}.{}", quote_qualified(schema), base),
        }
    }

    /// Column names of a table, from a query that returns no rows
    pub fn introspect(&self, table: &str) -> Result<Vec<String>> {
        let sql = format!("SELECT * FROM {} WHERE 1 = 0", quote_qualified(table));
        let result = self.db.query(&sql)?;
        if result.columns.is_empty() {
            return Err(CompareError::backend(sql, "query returned no columns"));
        }
        Ok(result.columns)
    }

    /// Drop a table if it exists, ignoring any error
    pub fn drop_table(&self, table: &str) {
        if let Err(e) = self.db.execute(&format!("DROP TABLE IF EXISTS {}", table)) {
            log::debug!("Could not drop {}: {}", table, e);
        }
    }

    /// Drop any stale table of the same name, then build the join
    pub fn materialize(
        &self,
        join_table: &str,
        previous: &str,
        new: &str,
        columns_previous: &[String],
        columns_new: &[String],
        index: &[IndexColumn],
    ) -> Result<ExecMeta> {
        self.drop_table(join_table);
        let sql = create_join_sql(join_table, previous, new, columns_previous, columns_new, index);
        let meta = self.db.execute(&sql)?;
        log::debug!("Created join table {} in {} ms", join_table, meta.elapsed_ms);
        Ok(meta)
    }
}

fn warn_schema(schema: &str, err: &CompareError) {
    let err = CompareError::SchemaCreation {
        schema: schema.to_string(),
        message: err.to_string(),
    };
    log::warn!("{}", err);
}

/// `CREATE TABLE .. AS` full outer join of the two inputs on the index columns
pub fn create_join_sql(
    join_table: &str,
    previous: &str,
    new: &str,
    columns_previous: &[String],
    columns_new: &[String],
    index: &[IndexColumn],
) -> String {
    let projection: Vec<String> = columns_previous
        .iter()
        .map(|c| format!("{} AS {}", aliased_column(c, Side::Previous), side_column(c, Side::Previous)))
        .chain(
            columns_new
                .iter()
                .map(|c| format!("{} AS {}", aliased_column(c, Side::New), side_column(c, Side::New))),
        )
        .collect();

    let on: Vec<String> = index
        .iter()
        .map(|idx| {
            format!(
                "{} = {}",
                aliased_column(&idx.new, Side::New),
                aliased_column(&idx.previous, Side::Previous)
            )
        })
        .collect();

    format!(
        "CREATE TABLE {} AS SELECT {} FROM {} AS {} FULL OUTER JOIN {} AS {} ON {}",
        join_table,
        projection.join(", "),
        quote_qualified(new),
        Side::New.alias(),
        quote_qualified(previous),
        Side::Previous.alias(),
        on.join(" AND ")
    )
}
