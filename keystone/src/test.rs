use crate::{parse_column, parse_schema, TextFormat, TextPartition};
use keystone_base::{ColumnDescriptor, ColumnId, ColumnKind, Result};
use std::io::Write;
use test_log::test;

mod commands;

fn ids(col: &ColumnDescriptor) -> Vec<String> {
    let schema = keystone_base::Schema::new(vec![col.clone()]);
    schema
        .dictionary_columns()
        .iter()
        .map(|c| c.id.to_string())
        .collect()
}

#[test]
fn test_parse_primitive_columns() {
    let c = parse_column("city=dict").unwrap();
    assert_eq!(c, ColumnDescriptor::dictionary("city"));
    let c = parse_column(" amount = plain ").unwrap();
    assert_eq!(c, ColumnDescriptor::plain("amount"));
}

#[test]
fn test_parse_nested_column_ids() {
    let c = parse_column("addr=struct<dict, plain, array<dict>>").unwrap();
    assert_eq!(ids(&c), vec!["addr.0", "addr.2.item"]);
    let ColumnKind::Struct(fields) = &c.kind else {
        panic!("expected a struct, got {:?}", c.kind);
    };
    assert_eq!(fields.len(), 3);
    assert_eq!(fields[1].id, ColumnId::new("addr.1"));

    let c = parse_column("m=array<array<struct<dict,dict>>>").unwrap();
    assert_eq!(ids(&c), vec!["m.item.item.0", "m.item.item.1"]);
}

#[test]
fn test_parse_rejects_bad_declarations() {
    for bad in [
        "city",
        "=dict",
        "a.b=dict",
        "c=text",
        "c=array<dict",
        "c=array<>",
        "c=struct<dict,>",
        "c=dict extra",
        "c=",
    ] {
        assert!(parse_column(bad).is_err(), "accepted {:?}", bad);
    }
    assert!(parse_schema(&["a=dict", "a=plain"]).is_err());
}

#[test]
fn test_parse_schema_keeps_row_order() {
    let schema = parse_schema(&["b=dict", "a=plain", "c=array<dict>"]).unwrap();
    let names: Vec<&str> = schema.columns().iter().map(|c| c.id.as_str()).collect();
    assert_eq!(names, vec!["b", "a", "c"]);
}

#[test]
fn test_text_row_split() {
    let fmt = TextFormat::default();
    assert_eq!(
        fmt.split_row("lima,\\N,,x$y\r"),
        vec![
            Some("lima".to_string()),
            None,
            Some(String::new()),
            Some("x$y".to_string())
        ]
    );
    let fmt = TextFormat {
        field_delimiter: "|".to_string(),
        null_marker: "NULL".to_string(),
    };
    assert_eq!(
        fmt.split_row("a|NULL|"),
        vec![Some("a".to_string()), None, Some(String::new())]
    );
}

#[test]
fn test_text_partition_rows() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("part-0.csv");
    let mut f = std::fs::File::create(&path)?;
    writeln!(f, "oslo,1")?;
    writeln!(f, "\\N,2")?;
    drop(f);
    let rows = TextPartition::new(&path, TextFormat::default())
        .into_iter()
        .collect::<Result<Vec<_>>>()?;
    assert_eq!(
        rows,
        vec![
            vec![Some("oslo".to_string()), Some("1".to_string())],
            vec![None, Some("2".to_string())],
        ]
    );
    Ok(())
}

#[test]
fn test_missing_text_partition_fails_on_first_row() {
    let mut rows = TextPartition::new("/no/such/partition.csv", TextFormat::default()).into_iter();
    assert!(matches!(rows.next(), Some(Err(_))));
    assert!(rows.next().is_none());
}

#[test]
fn test_empty_field_delimiter_rejected() {
    assert!(TextFormat::new("", "\\N").is_err());
    assert!(TextFormat::new("|", "").is_ok());
    let fmt = TextFormat {
        field_delimiter: String::new(),
        null_marker: "\\N".to_string(),
    };
    assert!(fmt.check().is_err());
    assert_eq!(fmt.split_row("zürich,x"), vec![Some("zürich,x".to_string())]);
}
