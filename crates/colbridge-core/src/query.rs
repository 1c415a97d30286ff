//! Literal SQL front-end.

use crate::driver::Handle;
use crate::error::Result;
use crate::materialize::{MaterializedResult, RowMaterializer};
use crate::types::SemanticType;

/// Run `sql` exactly as written and materialize every row against `expected_types`.
///
/// The text is handed to [`Handle::query`] untouched: no parameter binding, placeholder
/// expansion or escaping happens here, so `<`, `:name` or `?` inside literals reach the engine
/// as written.
pub fn run_query(
    handle: &mut dyn Handle,
    sql: &str,
    expected_types: &[SemanticType],
) -> Result<MaterializedResult> {
    let materializer = RowMaterializer::new(expected_types.to_vec())?;
    log::debug!("executing query: {sql}");

    let mut results = handle.query(sql)?;
    // Checked against metadata first so empty results are validated too.
    materializer.check_column_count(results.column_count())?;

    let mut rows = Vec::new();
    while let Some(cursor) = results.next_row()? {
        rows.push(materializer.materialize_row(cursor)?);
    }
    log::debug!("query returned {} rows", rows.len());
    Ok(MaterializedResult::new(expected_types.to_vec(), rows))
}
