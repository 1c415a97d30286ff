use colbridge_core::{
    BridgeError, ColumnMetadata, HostZone, InMemoryRecordSet, InternalValue, MaterializedValue,
    SemanticType, TableMetadata,
};
use colbridge_sqlite::{RunnerError, SqliteConfig, SqliteQueryRunner};
use pretty_assertions::assert_eq;

const ORDERS_DDL: &str = "CREATE TABLE orders (
    orderkey BIGINT PRIMARY KEY,
    orderstatus CHAR(1),
    totalprice DOUBLE,
    comment VARCHAR(79)
)";

fn orders_table() -> TableMetadata {
    TableMetadata::new(
        "orders",
        vec![
            ColumnMetadata::new("orderkey", SemanticType::BigInt),
            ColumnMetadata::new("orderstatus", SemanticType::char(1)),
            ColumnMetadata::new("totalprice", SemanticType::Double),
            ColumnMetadata::hidden("row_number", SemanticType::BigInt),
            ColumnMetadata::new("comment", SemanticType::varchar(79)),
        ],
    )
}

fn orders(count: i64) -> InMemoryRecordSet {
    let mut records = InMemoryRecordSet::new(
        orders_table()
            .columns
            .iter()
            .map(|c| c.semantic_type.clone())
            .collect(),
    );
    for key in 1..=count {
        let status = if key % 2 == 0 { "O" } else { "F" };
        records
            .push_row(vec![
                Some(InternalValue::Long(key)),
                Some(status.into()),
                Some(InternalValue::Double(key as f64 * 1.5)),
                Some(InternalValue::Long(-key)),
                (key % 10 != 0).then(|| InternalValue::text(format!("order {key}"))),
            ])
            .unwrap();
    }
    records
}

fn runner() -> SqliteQueryRunner {
    let mut runner = SqliteQueryRunner::open(&SqliteConfig::in_memory(HostZone::Utc)).unwrap();
    runner.execute_ddl(ORDERS_DDL).unwrap();
    runner
}

#[test]
fn loads_in_thousand_row_batches() {
    let mut runner = runner();
    let records = orders(2500);
    let summary = runner
        .load_table(&orders_table(), &mut records.cursor())
        .unwrap();
    assert_eq!(summary.rows, 2500);
    assert_eq!(summary.batch_sizes, vec![1000, 1000, 500]);

    let count = runner
        .execute("SELECT COUNT(*) FROM orders", &[SemanticType::BigInt])
        .unwrap();
    assert_eq!(count.only_value(), Some(&MaterializedValue::BigInt(2500)));

    let nulls = runner
        .execute(
            "SELECT COUNT(*) FROM orders WHERE comment IS NULL",
            &[SemanticType::BigInt],
        )
        .unwrap();
    assert_eq!(nulls.only_value(), Some(&MaterializedValue::BigInt(250)));
}

#[test]
fn exact_multiple_loads_without_trailing_batch() {
    let mut runner = runner();
    let records = orders(2000);
    let summary = runner
        .load_table(&orders_table(), &mut records.cursor())
        .unwrap();
    assert_eq!(summary.batch_sizes, vec![1000, 1000]);
}

#[test]
fn loaded_rows_read_back() {
    let mut runner = runner();
    let records = orders(3);
    runner
        .load_table(&orders_table(), &mut records.cursor())
        .unwrap();

    let result = runner
        .execute(
            "SELECT orderkey, orderstatus, totalprice, comment FROM orders ORDER BY orderkey",
            &[
                SemanticType::BigInt,
                SemanticType::char(1),
                SemanticType::Double,
                SemanticType::varchar(79),
            ],
        )
        .unwrap();
    assert_eq!(
        result.to_string(),
        "1, F, 1.5, order 1\n2, O, 3, order 2\n3, F, 4.5, order 3\n"
    );
}

#[test]
fn unsupported_column_leaves_table_empty() {
    let mut runner = runner();
    let table = TableMetadata::new(
        "orders",
        vec![
            ColumnMetadata::new("orderkey", SemanticType::BigInt),
            ColumnMetadata::new("comment", SemanticType::TimeWithTimeZone),
        ],
    );
    let mut records =
        InMemoryRecordSet::new(vec![SemanticType::BigInt, SemanticType::TimeWithTimeZone]);
    records
        .push_row(vec![Some(InternalValue::Long(1)), None])
        .unwrap();

    let err = runner
        .load_table(&table, &mut records.cursor())
        .unwrap_err();
    assert!(matches!(
        err,
        RunnerError::Bridge(BridgeError::UnsupportedColumnType { ref column, .. }) if column == "comment"
    ));

    let count = runner
        .execute("SELECT COUNT(*) FROM orders", &[SemanticType::BigInt])
        .unwrap();
    assert_eq!(count.only_value(), Some(&MaterializedValue::BigInt(0)));
}
