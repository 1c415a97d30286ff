//! decode(encode(v)) == v through an in-memory driver row.

use colbridge_core::temporal::MILLIS_PER_DAY;
use colbridge_core::{
    read_mapping, write_mapping, DriverValue, HostZone, InternalValue, SemanticType, ValueRow,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use proptest::test_runner::{Config, RngAlgorithm, TestRng, TestRunner};

const CASES: u32 = 256;
const ROUND_TRIP_SEED: [u8; 32] = [0x5a; 32];

fn round_trip(
    ty: &SemanticType,
    value: Option<&InternalValue>,
    zone: HostZone,
) -> Option<InternalValue> {
    let encoded = write_mapping(ty).unwrap().encode(value, zone).unwrap();
    let mut row = ValueRow::new(vec![encoded], zone);
    read_mapping(ty).unwrap().read(&mut row, 0).unwrap()
}

fn zones() -> Vec<HostZone> {
    ["utc", "+14:00", "-12:00", "+05:45", "-03:30"]
        .iter()
        .map(|z| z.parse().unwrap())
        .collect()
}

fn runner() -> TestRunner {
    TestRunner::new_with_rng(
        Config {
            cases: CASES,
            failure_persistence: None,
            ..Config::default()
        },
        TestRng::from_seed(RngAlgorithm::ChaCha, &ROUND_TRIP_SEED),
    )
}

fn arb_scalar() -> impl Strategy<Value = (SemanticType, InternalValue)> {
    prop_oneof![
        any::<bool>().prop_map(|v| (SemanticType::Boolean, InternalValue::boolean(v))),
        any::<i8>().prop_map(|v| (SemanticType::TinyInt, InternalValue::Long(v.into()))),
        any::<i16>().prop_map(|v| (SemanticType::SmallInt, InternalValue::Long(v.into()))),
        any::<i32>().prop_map(|v| (SemanticType::Integer, InternalValue::Long(v.into()))),
        any::<i64>().prop_map(|v| (SemanticType::BigInt, InternalValue::Long(v))),
        any::<f32>().prop_map(|v| (SemanticType::Real, InternalValue::real(v))),
        any::<f64>().prop_map(|v| (SemanticType::Double, InternalValue::Double(v))),
    ]
}

fn arb_structured() -> impl Strategy<Value = (SemanticType, InternalValue)> {
    prop_oneof![
        (-999_999_999_999_i64..=999_999_999_999).prop_map(|v| {
            (SemanticType::decimal(12, 2).unwrap(), InternalValue::Long(v))
        }),
        any::<i64>().prop_map(|v| {
            let unscaled = i128::from(v) * 1_000_000_007;
            (
                SemanticType::decimal(38, 9).unwrap(),
                InternalValue::Slice(unscaled.to_le_bytes().to_vec()),
            )
        }),
        "[a-z ]{0,8}[a-z]?".prop_map(|v| {
            let text = v.trim_end_matches(' ').to_string();
            (SemanticType::char(10), InternalValue::text(text))
        }),
    ]
}

fn arb_text_and_time() -> impl Strategy<Value = (SemanticType, InternalValue)> {
    prop_oneof![
        ".{0,24}".prop_map(|v| (SemanticType::unbounded_varchar(), InternalValue::text(v))),
        proptest::collection::vec(any::<u8>(), 0..32)
            .prop_map(|v| (SemanticType::Varbinary, InternalValue::Slice(v))),
        (-719_162_i64..2_932_896).prop_map(|v| (SemanticType::Date, InternalValue::Long(v))),
        (0..MILLIS_PER_DAY).prop_map(|v| (SemanticType::Time, InternalValue::Long(v))),
        (-62_135_596_800_000_i64..253_402_300_799_999)
            .prop_map(|v| (SemanticType::Timestamp, InternalValue::Long(v))),
        proptest::collection::vec(proptest::option::of(any::<i32>()), 0..6).prop_map(|v| {
            (
                SemanticType::array(SemanticType::Integer),
                InternalValue::Array(
                    v.into_iter()
                        .map(|x| x.map(|x| InternalValue::Long(x.into())))
                        .collect(),
                ),
            )
        }),
    ]
}

fn arb_typed_value() -> impl Strategy<Value = (SemanticType, InternalValue)> {
    prop_oneof![arb_scalar(), arb_structured(), arb_text_and_time()]
}

/// Bitwise equality so NaN payloads and -0.0 count.
fn same(a: &InternalValue, b: &InternalValue) -> bool {
    match (a, b) {
        (InternalValue::Double(x), InternalValue::Double(y)) => x.to_bits() == y.to_bits(),
        _ => a == b,
    }
}

#[test]
fn proptest_encode_decode_is_identity() {
    runner()
        .run(&arb_typed_value(), |(ty, value)| {
            for zone in zones() {
                let back = round_trip(&ty, Some(&value), zone);
                prop_assert!(
                    back.as_ref().is_some_and(|back| same(back, &value)),
                    "{ty} in {zone}: {value:?} came back as {back:?}"
                );
            }
            Ok(())
        })
        .unwrap();
}

#[test]
fn null_survives_every_supported_type() {
    for signature in [
        "boolean",
        "tinyint",
        "smallint",
        "integer",
        "bigint",
        "real",
        "double",
        "decimal(12,2)",
        "decimal(38,0)",
        "char(3)",
        "varchar(3)",
        "varbinary",
        "date",
        "time",
        "timestamp",
        "array(date)",
        "unknown",
    ] {
        let ty: SemanticType = signature.parse().unwrap();
        for zone in zones() {
            assert_eq!(round_trip(&ty, None, zone), None, "{signature} in {zone}");
        }
    }
}

#[test]
fn dates_round_trip_identically_across_zones() {
    let days = [-719_162_i64, -1, 0, 1, 11_016, 19_782, 2_932_895];
    for zone in zones() {
        let decoded: Vec<i64> = days
            .iter()
            .map(|d| {
                round_trip(&SemanticType::Date, Some(&InternalValue::Long(*d)), zone)
                    .and_then(|v| v.as_long())
                    .unwrap()
            })
            .collect();
        assert_eq!(decoded, days.to_vec(), "zone {zone}");
    }
}

#[test]
fn array_elements_round_trip_with_nulls() {
    let ty = SemanticType::array(SemanticType::array(SemanticType::unbounded_varchar()));
    let value = InternalValue::Array(vec![
        Some(InternalValue::Array(vec![Some("a".into()), None])),
        None,
        Some(InternalValue::Array(vec![])),
    ]);
    assert_eq!(round_trip(&ty, Some(&value), HostZone::Utc), Some(value));
}

#[test]
fn encoded_date_is_local_midnight_of_the_session_zone() {
    let zone: HostZone = "+05:30".parse().unwrap();
    let encoded = write_mapping(&SemanticType::Date)
        .unwrap()
        .encode(Some(&InternalValue::Long(0)), zone)
        .unwrap();
    assert_eq!(encoded, DriverValue::Date(-(5 * 3600 + 30 * 60) * 1000));
}
