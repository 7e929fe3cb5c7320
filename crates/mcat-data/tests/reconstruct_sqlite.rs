use mcat_core::{NdArray, ParamSpec, ParamType, RunDescription, Scalar, Value};
use mcat_data::{DuplicatePolicy, fetch_parameter_data, to_labeled_array, to_table};
use mcat_store::testing::FixtureDb;
use mcat_store::{MeasurementStore, SqliteStore};
use tempfile::tempdir;

const GUID: &str = "0c9fb2a4-5e8e-4a67-9f4c-3b1d2e7f8a90";

fn spec(name: &str, param_type: ParamType, unit: &str, depends_on: &[&str]) -> ParamSpec {
    ParamSpec {
        name: name.to_string(),
        param_type,
        label: String::new(),
        unit: unit.to_string(),
        inferred_from: Vec::new(),
        depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
    }
}

#[test]
fn scalar_sweep_round_trips_through_the_table() {
    let dir = tempdir().expect("failed to create temp dir");
    let db_path = dir.path().join("sweep.db");
    let fixture = FixtureDb::create(&db_path).expect("failed to create fixture db");
    let exp = fixture.add_experiment("sweep", "s").unwrap();
    let description = RunDescription::new(vec![
        spec("x", ParamType::Numeric, "V", &[]),
        spec("y", ParamType::Numeric, "A", &["x"]),
    ]);
    let run = fixture.add_run(exp, GUID, &description, None, None).unwrap();
    for i in 0..5 {
        let x = i as f64;
        fixture
            .insert_row(&run.table_name, &[("x", x.into()), ("y", (x * x).into())])
            .unwrap();
    }

    let store = SqliteStore::open(&db_path).expect("failed to open store");
    let layout = store.run_layout(run.run_id).unwrap();
    let data =
        fetch_parameter_data(&store, &layout.table_name, &layout.description, &[]).unwrap();

    let tree = data.get("y").expect("y was fetched");
    assert_eq!(tree.names(), vec!["y", "x"]);
    assert_eq!(tree.len(), 5);

    let table = to_table(&data).unwrap();
    assert_eq!(table.len(), 5);
    assert_eq!(table.index().names(), &[Some("x".to_string())]);
    assert_eq!(
        table.column("y").unwrap(),
        &[0.0, 1.0, 4.0, 9.0, 16.0].map(Scalar::Numeric)[..]
    );
}

#[test]
fn array_parameters_broadcast_their_setpoints() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("traces.db");
    let fixture = FixtureDb::create(&db_path).unwrap();
    let exp = fixture.add_experiment("traces", "s").unwrap();
    let description = RunDescription::new(vec![
        spec("gate", ParamType::Numeric, "V", &[]),
        spec("time", ParamType::Array, "s", &[]),
        spec("signal", ParamType::Array, "V", &["time", "gate"]),
    ]);
    let run = fixture.add_run(exp, GUID, &description, None, None).unwrap();
    let time = NdArray::from_floats(vec![0.0, 0.5, 1.0]);
    for g in [1.0, 2.0] {
        fixture
            .insert_row(
                &run.table_name,
                &[
                    ("gate", g.into()),
                    ("time", time.clone().into()),
                    ("signal", NdArray::from_floats(vec![g, 2.0 * g, 3.0 * g]).into()),
                ],
            )
            .unwrap();
    }

    let store = SqliteStore::open(&db_path).unwrap();
    let layout = store.run_layout(run.run_id).unwrap();
    let data = fetch_parameter_data(
        &store,
        &layout.table_name,
        &layout.description,
        &["signal".to_string()],
    )
    .unwrap();

    let tree = data.get("signal").unwrap();
    let gate = tree.column("gate").unwrap();
    assert_eq!(gate.values[1], Value::Array(NdArray::full_float(&[3], 2.0)));
    assert_eq!(tree.column("time").unwrap().values[0], Value::Array(time));

    let array = to_labeled_array(&data, DuplicatePolicy::KeepFirst)
        .unwrap()
        .with_labels(&layout.description);
    assert_eq!(array.shape(), vec![3, 2]);
    assert_eq!(array.dims()[0].name, "time");
    assert_eq!(array.dims()[1].label.as_deref(), Some("gate (V)"));
    assert_eq!(
        array.get("signal", &[Scalar::Numeric(1.0), Scalar::Numeric(2.0)]),
        Some(&Scalar::Numeric(6.0))
    );
}

#[test]
fn duplicate_setpoints_keep_the_first_measurement() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("dupes.db");
    let fixture = FixtureDb::create(&db_path).unwrap();
    let exp = fixture.add_experiment("dupes", "s").unwrap();
    let description = RunDescription::new(vec![
        spec("x", ParamType::Numeric, "", &[]),
        spec("y", ParamType::Numeric, "", &[]),
        spec("z", ParamType::Numeric, "", &["x", "y"]),
    ]);
    let run = fixture.add_run(exp, GUID, &description, None, None).unwrap();
    for z in [10.0, 20.0] {
        fixture
            .insert_row(
                &run.table_name,
                &[("x", 1.0.into()), ("y", 2.0.into()), ("z", z.into())],
            )
            .unwrap();
    }

    let store = SqliteStore::open(&db_path).unwrap();
    let layout = store.run_layout(run.run_id).unwrap();
    let data =
        fetch_parameter_data(&store, &layout.table_name, &layout.description, &[]).unwrap();

    assert_eq!(to_table(&data).unwrap().len(), 2);
    let array = to_labeled_array(&data, DuplicatePolicy::default()).unwrap();
    assert_eq!(
        array.get("z", &[Scalar::Numeric(1.0), Scalar::Numeric(2.0)]),
        Some(&Scalar::Numeric(10.0))
    );
}
