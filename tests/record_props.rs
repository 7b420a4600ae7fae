use annotator_core::core::types::{Candidate, Record};
use annotator_core::persistence::{load_records, save_records};
use proptest::prelude::*;

fn candidate() -> impl Strategy<Value = Candidate> {
    (
        "[0-9a-z]{1,6}",
        prop::collection::vec("\\PC{0,12}", 1..4),
        -1.0e6f64..1.0e6,
    )
        .prop_map(|(id, names, distance)| Candidate { id, names, distance })
}

fn record() -> impl Strategy<Value = Record> {
    (
        prop::option::of("[A-Za-z0-9:-]{1,10}"),
        "\\PC{0,20}",
        prop::collection::vec(candidate(), 0..4),
        prop_oneof![Just(String::new()), Just("?".to_string()), "[0-9a-z]{1,6}"],
        prop::option::of(prop_oneof![Just("pers".to_string()), Just("corp".to_string())]),
        prop::option::of("[a-z]{1,8}"),
        any::<bool>(),
    )
        .prop_map(|(id, input, candidates, golden, kind, method, restricted)| Record {
            id,
            input,
            candidates,
            golden,
            kind,
            method,
            restricted,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn save_then_load_returns_the_same_records(
        records in prop::collection::vec(record(), 0..20),
        gzip in any::<bool>(),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(if gzip { "records.jsonl.gz" } else { "records.jsonl" });
        save_records(&path, &records).unwrap();
        prop_assert_eq!(load_records(&path).unwrap(), records);
    }
}
