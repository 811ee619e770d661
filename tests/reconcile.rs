use snapshot_merge::error::Side;
use snapshot_merge::{
    KeyColumns, KeyPolicy, NullKeyPolicy, Reconciler, Table, ToolError, merge, resolve_key_columns,
};

fn table(records: Vec<Vec<(&str, Option<&str>)>>) -> Table {
    Table::from_records(records)
}

fn keys(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}

fn shirts_old() -> Table {
    table(vec![
        vec![
            ("Handle", Some("shirt")),
            ("Option1 Value", Some("S")),
            ("Price", Some("10")),
        ],
        vec![
            ("Handle", Some("shirt")),
            ("Option1 Value", Some("M")),
            ("Price", Some("12")),
        ],
    ])
}

fn shirts_new() -> Table {
    table(vec![vec![
        ("Handle", Some("shirt")),
        ("Option1 Value", Some("M")),
        ("Price", Some("15")),
    ]])
}

fn key_values(table: &Table, columns: &[&str]) -> Vec<Vec<Option<String>>> {
    table
        .records()
        .map(|record| {
            columns
                .iter()
                .map(|c| record.get(c).map(str::to_string))
                .collect()
        })
        .collect()
}

#[test]
fn new_variant_replaces_matching_old_variant() {
    let merged = merge(
        &shirts_old(),
        &shirts_new(),
        &keys(&["Handle", "Option1 Value"]),
    )
    .expect("merge succeeds");

    let expected = table(vec![
        vec![
            ("Handle", Some("shirt")),
            ("Option1 Value", Some("S")),
            ("Price", Some("10")),
        ],
        vec![
            ("Handle", Some("shirt")),
            ("Option1 Value", Some("M")),
            ("Price", Some("15")),
        ],
    ]);
    assert_eq!(merged, expected);
}

#[test]
fn handle_only_key_drops_every_old_variant() {
    let merged = merge(&shirts_old(), &shirts_new(), &keys(&["Handle"])).expect("merge succeeds");

    assert_eq!(merged.len(), 1);
    let record = merged.record(0).expect("one record");
    assert_eq!(record.get("Price"), Some("15"));
}

#[test]
fn every_new_record_survives_and_matched_old_records_do_not() {
    let old = table(vec![
        vec![("Handle", Some("a")), ("Title", Some("old a"))],
        vec![("Handle", Some("b")), ("Title", Some("old b"))],
        vec![("Handle", Some("c")), ("Title", Some("old c"))],
        vec![("Handle", Some("b")), ("Title", Some("old b again"))],
    ]);
    let new = table(vec![
        vec![("Handle", Some("b")), ("Title", Some("new b"))],
        vec![("Handle", Some("d")), ("Title", Some("new d"))],
    ]);

    let merged = merge(&old, &new, &keys(&["Handle"])).expect("merge succeeds");
    let titles: Vec<&str> = merged
        .records()
        .map(|r| r.get("Title").expect("title present"))
        .collect();

    assert_eq!(titles, vec!["old a", "old c", "new b", "new d"]);
}

#[test]
fn row_count_is_conserved() {
    let old = table(vec![
        vec![("Handle", Some("a"))],
        vec![("Handle", Some("b"))],
        vec![("Handle", Some("b"))],
        vec![("Handle", Some("c"))],
    ]);
    let new = table(vec![
        vec![("Handle", Some("b"))],
        vec![("Handle", Some("x"))],
        vec![("Handle", Some("x"))],
    ]);

    let outcome = Reconciler::new()
        .reconcile(&old, &new, &keys(&["Handle"]))
        .expect("merge succeeds");

    let superseded = 2;
    assert_eq!(outcome.table.len(), new.len() + (old.len() - superseded));
    assert_eq!(outcome.summary.superseded_rows, superseded);
    assert_eq!(outcome.summary.retained_rows, 2);
    assert_eq!(outcome.summary.output_rows, 5);
}

#[test]
fn duplicate_new_records_are_all_kept() {
    let old = table(vec![vec![("Handle", Some("a")), ("Price", Some("1"))]]);
    let new = table(vec![
        vec![("Handle", Some("a")), ("Price", Some("2"))],
        vec![("Handle", Some("a")), ("Price", Some("3"))],
    ]);

    let merged = merge(&old, &new, &keys(&["Handle"])).expect("merge succeeds");
    let prices: Vec<Option<&str>> = merged.records().map(|r| r.get("Price")).collect();

    assert_eq!(prices, vec![Some("2"), Some("3")]);
}

#[test]
fn merging_again_with_same_new_data_keeps_the_same_keys() {
    let key = keys(&["Handle", "Option1 Value"]);
    let new = shirts_new();
    let once = merge(&shirts_old(), &new, &key).expect("first merge");
    let twice = merge(&once, &new, &key).expect("second merge");

    let columns = ["Handle", "Option1 Value"];
    assert_eq!(key_values(&once, &columns), key_values(&twice, &columns));
    assert_eq!(once, twice);
}

#[test]
fn empty_old_yields_new() {
    let old = Table::new(["Handle", "Option1 Value", "Price"]);
    let new = shirts_new();

    let merged = merge(&old, &new, &keys(&["Handle"])).expect("merge succeeds");
    assert_eq!(merged, new);
}

#[test]
fn empty_new_yields_old() {
    let old = shirts_old();
    let new = Table::new(["Handle", "Option1 Value", "Price"]);

    let merged = merge(&old, &new, &keys(&["Handle"])).expect("merge succeeds");
    assert_eq!(merged, old);
}

#[test]
fn missing_key_column_reports_both_headers() {
    let old = table(vec![vec![("Title", Some("a")), ("Price", Some("1"))]]);
    let new = table(vec![vec![("Title", Some("b")), ("SKU", Some("x"))]]);

    let error = merge(&old, &new, &keys(&["Handle"])).expect_err("schema error");
    let schema = match error {
        ToolError::Schema(schema) => schema,
        other => panic!("expected a schema error, got {other:?}"),
    };

    assert_eq!(schema.missing_names(), vec!["Handle"]);
    assert_eq!(schema.missing[0].missing_from, Side::Both);
    assert_eq!(schema.old_columns, vec!["Title", "Price"]);
    assert_eq!(schema.new_columns, vec!["Title", "SKU"]);

    let message = schema.to_string();
    assert!(message.contains("'Handle'"));
    assert!(message.contains("\"Price\""));
    assert!(message.contains("\"SKU\""));
}

#[test]
fn key_missing_from_one_side_names_that_side() {
    let old = shirts_old();
    let new = table(vec![vec![("Handle", Some("shirt")), ("Price", Some("9"))]]);

    let error = merge(&old, &new, &keys(&["Handle", "Option1 Value"])).expect_err("schema error");
    match error {
        ToolError::Schema(schema) => {
            assert_eq!(schema.missing_names(), vec!["Option1 Value"]);
            assert_eq!(schema.missing[0].missing_from, Side::New);
        }
        other => panic!("expected a schema error, got {other:?}"),
    }
}

#[test]
fn header_whitespace_is_ignored() {
    let old = Table::from_rows(
        [" Handle ", "Price"],
        vec![vec![Some("a".into()), Some("1".into())]],
    );
    let new = Table::from_rows(
        ["Handle", " Price"],
        vec![vec![Some("a".into()), Some("2".into())]],
    );

    let merged = merge(&old, &new, &keys(&["Handle  "])).expect("merge succeeds");
    assert_eq!(merged.columns(), &["Handle".to_string(), "Price".to_string()]);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged.record(0).and_then(|r| r.get("Price")), Some("2"));
}

#[test]
fn cell_values_compare_literally() {
    let old = table(vec![
        vec![("Handle", Some("Shirt"))],
        vec![("Handle", Some("007"))],
        vec![("Handle", Some("shirt "))],
    ]);
    let new = table(vec![
        vec![("Handle", Some("shirt"))],
        vec![("Handle", Some("7"))],
    ]);

    let merged = merge(&old, &new, &keys(&["Handle"])).expect("merge succeeds");
    assert_eq!(merged.len(), 5);
}

#[test]
fn absent_key_cells_match_each_other_by_default() {
    let old = table(vec![
        vec![("Handle", Some("a")), ("Option1 Value", None)],
        vec![("Handle", Some("a")), ("Option1 Value", Some("S"))],
    ]);
    let new = table(vec![vec![("Handle", Some("a")), ("Option1 Value", None)]]);

    let merged = merge(&old, &new, &keys(&["Handle", "Option1 Value"])).expect("merge succeeds");
    let options: Vec<Option<&str>> = merged.records().map(|r| r.get("Option1 Value")).collect();

    assert_eq!(options, vec![Some("S"), None]);
}

#[test]
fn never_match_policy_keeps_rows_with_absent_keys() {
    let old = table(vec![
        vec![("Handle", Some("a")), ("Option1 Value", None)],
        vec![("Handle", Some("a")), ("Option1 Value", Some("S"))],
    ]);
    let new = table(vec![
        vec![("Handle", Some("a")), ("Option1 Value", None)],
        vec![("Handle", Some("a")), ("Option1 Value", Some("S"))],
    ]);

    let outcome = Reconciler::new()
        .with_null_keys(NullKeyPolicy::NeverMatch)
        .reconcile(&old, &new, &keys(&["Handle", "Option1 Value"]))
        .expect("merge succeeds");

    assert_eq!(outcome.summary.superseded_rows, 1);
    assert_eq!(outcome.table.len(), 3);
    assert_eq!(outcome.summary.null_keys, NullKeyPolicy::NeverMatch);
}

#[test]
fn output_columns_are_the_union_in_encounter_order() {
    let old = table(vec![vec![("Handle", Some("a")), ("Old Only", Some("x"))]]);
    let new = table(vec![vec![("New Only", Some("y")), ("Handle", Some("b"))]]);

    let outcome = Reconciler::new()
        .reconcile(&old, &new, &keys(&["Handle"]))
        .expect("merge succeeds");
    let merged = &outcome.table;

    assert_eq!(merged.columns(), &["Handle", "Old Only", "New Only"]);
    assert_eq!(outcome.summary.added_columns, vec!["New Only".to_string()]);
    assert_eq!(
        merged.rows(),
        &[
            vec![Some("a".to_string()), Some("x".to_string()), None],
            vec![Some("b".to_string()), None, Some("y".to_string())],
        ]
    );
}

#[test]
fn inputs_are_left_untouched() {
    let old = shirts_old();
    let new = shirts_new();
    let old_before = old.clone();
    let new_before = new.clone();

    merge(&old, &new, &keys(&["Handle", "Option1 Value"])).expect("merge succeeds");

    assert_eq!(old, old_before);
    assert_eq!(new, new_before);
}

#[test]
fn secondary_key_used_only_when_old_has_it() {
    let policy = KeyPolicy::default();

    let with_variant = shirts_old();
    assert_eq!(
        policy.resolve(with_variant.columns()),
        KeyColumns::Composite {
            primary: "Handle".to_string(),
            secondary: "Option1 Value".to_string(),
        }
    );

    let without_variant = Table::new(["Handle", "Price"]);
    assert_eq!(
        resolve_key_columns(without_variant.columns(), &policy),
        vec!["Handle".to_string()]
    );

    let primary_only = KeyPolicy::new("Handle", None);
    assert_eq!(
        primary_only.resolve(with_variant.columns()),
        KeyColumns::Single("Handle".to_string())
    );
}

#[test]
fn empty_key_list_is_rejected() {
    let old = table(vec![vec![("Handle", Some("a"))], vec![("Handle", Some("b"))]]);
    let new = table(vec![vec![("Handle", Some("z"))]]);

    let error = merge(&old, &new, &[]).expect_err("empty key list");
    assert!(matches!(error, ToolError::EmptyKey));

    let error = Reconciler::new()
        .reconcile(&old, &new, &keys(&[]))
        .expect_err("empty key list");
    assert!(matches!(error, ToolError::EmptyKey));
}

#[test]
fn reconciler_reports_its_null_key_policy() {
    assert_eq!(Reconciler::new().null_keys(), NullKeyPolicy::Match);
    let strict = Reconciler::new().with_null_keys(NullKeyPolicy::NeverMatch);
    assert_eq!(strict.null_keys(), NullKeyPolicy::NeverMatch);
}

#[test]
fn column_lookup_trims_the_requested_name() {
    let old = shirts_old();

    assert!(old.has_column("Handle"));
    assert!(old.has_column(" Option1 Value "));
    assert!(!old.has_column("handle"));
}
