use mcat_core::{Guid, NdArray, ParamSpec, ParamType, RunDescription, RunId, Scalar, Value};
use mcat_store::testing::FixtureDb;
use mcat_store::{MeasurementStore, SqliteStore, StoreError};
use tempfile::tempdir;

const GUID_A: &str = "aaaaaaaa-0000-0000-0000-000000000001";
const GUID_B: &str = "aaaaaaaa-0000-0000-0000-000000000002";

fn spec(name: &str, param_type: ParamType, depends_on: &[&str]) -> ParamSpec {
    ParamSpec {
        name: name.to_string(),
        param_type,
        label: String::new(),
        unit: String::new(),
        inferred_from: Vec::new(),
        depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
    }
}

fn sweep_description() -> RunDescription {
    RunDescription::new(vec![
        spec("x", ParamType::Numeric, &[]),
        spec("y", ParamType::Numeric, &["x"]),
        spec("trace", ParamType::Array, &["x"]),
        spec("note", ParamType::Text, &[]),
    ])
}

#[test]
fn scan_and_lookup_runs() {
    let dir = tempdir().expect("failed to create temp dir");
    let db_path = dir.path().join("experiments.db");
    let fixture = FixtureDb::create(&db_path).expect("failed to create fixture db");
    let exp = fixture
        .add_experiment("cooldown", "chip-7")
        .expect("failed to add experiment");
    let run_a = fixture
        .add_run(exp, GUID_A, &sweep_description(), Some(1_600_000_000.0), Some(1_600_000_060.0))
        .expect("failed to add run");
    let run_b = fixture
        .add_run(exp, GUID_B, &sweep_description(), Some(1_600_000_100.0), None)
        .expect("failed to add run");

    let store = SqliteStore::open(&db_path).expect("failed to open store");

    let runs = store.runs().expect("failed to scan runs");
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].run_id, run_a.run_id);
    assert_eq!(runs[1].guid.as_str(), GUID_B);
    assert_eq!(runs[0].result_table_name, run_a.table_name);
    assert!(runs[1].completed_timestamp.is_none());

    let experiments = store.experiments().expect("failed to read experiments");
    assert_eq!(experiments[&exp].name, "cooldown");
    assert_eq!(experiments[&exp].sample_name, "chip-7");

    let guid_b = Guid::parse(GUID_B).unwrap();
    assert_eq!(store.run_id_from_guid(&guid_b).unwrap(), run_b.run_id);
    assert_eq!(store.guid_from_run_id(run_a.run_id).unwrap().as_str(), GUID_A);

    let layout = store.run_layout(run_b.run_id).expect("failed to load layout");
    assert_eq!(layout.table_name, run_b.table_name);
    assert_eq!(layout.description.dependent_names(), vec!["y", "trace"]);
}

#[test]
fn missing_runs_are_reported() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("empty.db");
    FixtureDb::create(&db_path).unwrap();
    let store = SqliteStore::open(&db_path).unwrap();

    let err = store.run(RunId::new(99)).unwrap_err();
    assert!(matches!(err, StoreError::RunIdNotFound { .. }));

    let guid = Guid::parse(GUID_A).unwrap();
    let err = store.run_id_from_guid(&guid).unwrap_err();
    assert!(matches!(err, StoreError::GuidNotFound { .. }));
}

#[test]
fn missing_file_is_not_created() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("absent.db");
    let err = SqliteStore::open(&db_path).unwrap_err();
    assert!(matches!(err, StoreError::DatabaseNotFound { .. }));
    assert!(!db_path.exists());
}

#[test]
fn parameter_tree_values_skip_null_rows_and_decode_cells() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("cells.db");
    let fixture = FixtureDb::create(&db_path).unwrap();
    let exp = fixture.add_experiment("e", "s").unwrap();
    let run = fixture
        .add_run(exp, GUID_A, &sweep_description(), None, None)
        .unwrap();

    for i in 0..3 {
        let x = i as f64;
        fixture
            .insert_row(&run.table_name, &[("x", x.into()), ("y", (x * 2.0).into())])
            .unwrap();
        fixture
            .insert_row(
                &run.table_name,
                &[
                    ("x", x.into()),
                    ("trace", NdArray::from_floats(vec![x, x + 0.5]).into()),
                ],
            )
            .unwrap();
    }
    fixture
        .insert_row(&run.table_name, &[("note", "hello".into())])
        .unwrap();

    let store = SqliteStore::open(&db_path).unwrap();

    let rows = store
        .parameter_tree_values(&run.table_name, &["y", "x"])
        .unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2], vec![Value::from(4.0), Value::from(2.0)]);

    let rows = store
        .parameter_tree_values(&run.table_name, &["trace", "x"])
        .unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(
        rows[1][0],
        Value::Array(NdArray::from_floats(vec![1.0, 1.5]))
    );

    let rows = store
        .parameter_tree_values(&run.table_name, &["note"])
        .unwrap();
    assert_eq!(rows, vec![vec![Value::Scalar(Scalar::from("hello"))]]);

    let err = store
        .parameter_tree_values(&run.table_name, &["nope"])
        .unwrap_err();
    assert!(matches!(err, StoreError::UnknownColumn { .. }));
}

#[test]
fn dataset_info_reports_counts_metadata_and_snapshot() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("meta.db");
    let fixture = FixtureDb::create(&db_path).unwrap();
    let exp = fixture.add_experiment("e", "s").unwrap();
    let run = fixture
        .add_run(exp, GUID_A, &sweep_description(), None, None)
        .unwrap();
    for i in 0..4 {
        fixture
            .insert_row(&run.table_name, &[("x", (i as f64).into())])
            .unwrap();
    }
    fixture
        .add_run_metadata(run.run_id, "operator", "ada")
        .unwrap();
    fixture
        .set_snapshot(run.run_id, &serde_json::json!({"station": {"instruments": {}}}))
        .unwrap();

    let store = SqliteStore::open(&db_path).unwrap();
    let info = store.dataset_info(run.run_id).unwrap();
    assert_eq!(info.number_of_results, 4);
    assert_eq!(info.metadata.get("operator"), Some(&serde_json::json!("ada")));
    assert!(!info.metadata.contains_key("guid"));
    assert_eq!(
        info.snapshot,
        Some(serde_json::json!({"station": {"instruments": {}}}))
    );
}
