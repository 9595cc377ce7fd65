use std::path::{Path, PathBuf};

use fuzzy_cleanse::config::CriteriaFile;
use fuzzy_cleanse::data::export::{edited_file_name, save_table, write_csv};
use fuzzy_cleanse::data::filter::{Criteria, FilterCriterion, Threshold, apply_filters};
use fuzzy_cleanse::data::join::perform_join;
use fuzzy_cleanse::data::loader::load_file;
use fuzzy_cleanse::data::model::{Table, Value};
use fuzzy_cleanse::state::{CombineMode, Session, SourceTable};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_fixture(name: &str) -> SourceTable {
    let path = fixtures_dir().join(name);
    let table = load_file(&path).unwrap_or_else(|e| panic!("cannot load {}: {e:#}", path.display()));
    SourceTable::from_path(&path, table)
}

fn ids(table: &Table) -> Vec<i64> {
    table
        .column("customer_id")
        .unwrap()
        .into_iter()
        .map(|v| match v {
            Value::Integer(i) => *i,
            other => panic!("unexpected id {other:?}"),
        })
        .collect()
}

// -------------------------------------------------------------------------
// Loading
// -------------------------------------------------------------------------

#[test]
fn csv_and_json_fixtures_load_typed() {
    let customers = load_fixture("customers.csv");
    assert_eq!(customers.name, "customers");
    assert_eq!(customers.table.columns(), &["customer_id", "name", "city"]);
    assert_eq!(customers.table.value(0, "customer_id"), Some(&Value::Integer(1)));

    let orders = load_fixture("orders.json");
    // Columns follow the key order of the JSON objects.
    assert_eq!(orders.table.columns(), &["order_id", "customer_id", "status"]);
    assert_eq!(orders.table.row_count(), 4);
    assert_eq!(orders.table.value(1, "status"), Some(&Value::from("cancelled")));
}

#[test]
fn xlsx_fixture_loads_headers_ids_and_dates() {
    let accounts = load_fixture("accounts.xlsx");
    assert_eq!(accounts.name, "accounts");
    let table = &accounts.table;
    assert_eq!(
        table.columns(),
        &["customer_id", "tier", "Unnamed: 2", "tier.1", "since"]
    );
    // The blank sheet row is skipped.
    assert_eq!(table.row_count(), 3);
    assert_eq!(ids(table), vec![1, 2, 4]);
    assert_eq!(table.value(0, "tier.1"), Some(&Value::from("a")));
    assert_eq!(
        table.value(0, "since"),
        Some(&Value::Date("2024-01-05".into()))
    );
    assert_eq!(
        table.value(2, "since"),
        Some(&Value::Date("2022-12-31".into()))
    );
}

#[test]
fn csv_keeps_text_that_only_looks_numeric() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("codes.csv");
    let text = "code,name\n007,Nan\nA12,Infinity\n1e3,bob\n";
    std::fs::write(&path, text).unwrap();

    let table = load_file(&path).unwrap();
    assert_eq!(table.value(0, "code"), Some(&Value::from("007")));
    assert_eq!(table.value(1, "name"), Some(&Value::from("Infinity")));

    let mut out = Vec::new();
    write_csv(&table, &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), text);

    for (field, term) in [("code", "007"), ("code", "1e3"), ("name", "Nan")] {
        let mut criteria = Criteria::new();
        criteria.insert(
            field.into(),
            FilterCriterion::new(Threshold::DEFAULT).include_exact([term]),
        );
        assert_eq!(apply_filters(&table, &criteria).unwrap().row_count(), 1, "{term}");
    }
}

// -------------------------------------------------------------------------
// Join + filter
// -------------------------------------------------------------------------

#[test]
fn outer_join_of_fixtures() {
    let customers = load_fixture("customers.csv").table;
    let orders = load_fixture("orders.json").table;

    let res = perform_join(&[customers, orders]);
    assert!(res.ok());
    assert_eq!(res.meta.input_count, 2);
    assert_eq!(res.meta.output_rows, 6);

    let joined = res.data().unwrap();
    assert_eq!(
        joined.columns(),
        &["customer_id", "name", "city", "order_id", "status"]
    );
    assert_eq!(ids(joined), vec![1, 2, 2, 3, 4, 5]);
    // Customer 5 only has an order.
    assert_eq!(joined.value(5, "name"), Some(&Value::Null));
    assert_eq!(joined.value(5, "order_id"), Some(&Value::Integer(103)));
}

#[test]
fn xlsx_and_csv_join_on_integer_ids() {
    let customers = load_fixture("customers.csv").table;
    let accounts = load_fixture("accounts.xlsx").table;

    let res = perform_join(&[customers, accounts.clone()]);
    assert!(res.ok(), "{:?}", res.reason());
    let joined = res.data().unwrap();
    assert_eq!(ids(joined), vec![1, 2, 3, 4]);
    assert_eq!(joined.value(0, "name"), Some(&Value::from("John Smith")));
    assert_eq!(joined.value(0, "tier"), Some(&Value::from("gold")));
    assert_eq!(joined.value(2, "tier"), Some(&Value::Null));
    assert_eq!(joined.value(3, "tier"), Some(&Value::from("bronze")));

    // Exact matching sees "1", not "1.0".
    let mut criteria = Criteria::new();
    criteria.insert(
        "customer_id".into(),
        FilterCriterion::new(Threshold::DEFAULT).include_exact(["1"]),
    );
    assert_eq!(ids(&apply_filters(&accounts, &criteria).unwrap()), vec![1]);
}

#[test]
fn criteria_file_drives_join_and_filter() {
    let criteria = CriteriaFile::load(&fixtures_dir().join("criteria.json"))
        .unwrap()
        .into_criteria();

    let mut session = Session::new(CombineMode::Join);
    session.add_table(load_fixture("customers.csv"));
    session.add_table(load_fixture("orders.json"));
    assert!(session.set_criteria(criteria));

    let out = session.run().unwrap();
    assert_eq!(out.len(), 1);
    // "Jon" fuzzily matches John, Jon and Jones; the cancelled order is dropped.
    assert_eq!(ids(&out[0].table), vec![1, 2, 3]);
    assert_eq!(
        out[0].table.value(1, "status"),
        Some(&Value::from("shipped"))
    );
}

#[test]
fn filter_then_export_and_reload() {
    let customers = load_fixture("customers.csv").table;
    let mut criteria = Criteria::new();
    criteria.insert(
        "city".into(),
        FilterCriterion::new(Threshold::DEFAULT).include_exact(["Paris", "Rome"]),
    );
    let filtered = apply_filters(&customers, &criteria).unwrap();
    assert_eq!(ids(&filtered), vec![1, 2, 4]);

    let dir = tempfile::tempdir().unwrap();
    for ext in ["csv", "parquet"] {
        let path = dir.path().join(format!("cleaned_data.{ext}"));
        save_table(&filtered, &path).unwrap();
        let reloaded = load_file(&path).unwrap();
        assert_eq!(reloaded, filtered, "round trip through .{ext}");
    }
}

#[test]
fn separate_mode_writes_edited_files() {
    let mut session = Session::new(CombineMode::Separate);
    session.add_table(load_fixture("customers.csv"));
    session.add_table(load_fixture("orders.json"));

    let mut criteria = Criteria::new();
    criteria.insert(
        "customer_id".into(),
        FilterCriterion::new(Threshold::DEFAULT).include_exact(["1", "2"]),
    );
    session.set_criteria(criteria);

    let out = session.run().unwrap();
    assert_eq!(out[0].table.row_count(), 2);
    assert_eq!(out[1].table.row_count(), 3);

    let dir = tempfile::tempdir().unwrap();
    let sources = [Path::new("customers.csv"), Path::new("orders.json")];
    for (source, result) in sources.iter().zip(&out) {
        let path = dir.path().join(edited_file_name(source));
        save_table(&result.table, &path).unwrap();
    }
    assert!(dir.path().join("customers-edited.csv").exists());
    assert!(dir.path().join("orders-edited.csv").exists());

    let reloaded = load_file(&dir.path().join("orders-edited.csv")).unwrap();
    assert_eq!(reloaded.row_count(), 3);
}

#[test]
fn undo_reverts_to_previous_results() {
    let mut session = Session::new(CombineMode::Join);
    session.add_table(load_fixture("customers.csv"));

    let by_city = |city: &str| {
        let mut c = Criteria::new();
        c.insert(
            "city".into(),
            FilterCriterion::new(Threshold::DEFAULT).include_exact([city]),
        );
        c
    };

    session.set_criteria(by_city("Paris"));
    let paris = session.run().unwrap();
    session.set_criteria(by_city("Rome"));
    assert_eq!(ids(&session.run().unwrap()[0].table), vec![4]);

    assert!(session.undo());
    assert_eq!(session.run().unwrap(), paris);
}
