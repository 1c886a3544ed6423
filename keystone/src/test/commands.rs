use crate::commands::{inspect, load, verify, LoadOptions};
use keystone_base::Result;
use keystone_dict::TableIdentifier;
use std::{fs, path::Path};
use test_log::test;

fn table() -> TableIdentifier {
    TableIdentifier::new("retail", "sales")
}

fn write_partition(dir: &Path, name: &str, lines: &[&str]) -> Result<std::path::PathBuf> {
    let path = dir.join(name);
    fs::write(&path, lines.join("\n"))?;
    Ok(path)
}

fn output(buf: Vec<u8>) -> String {
    String::from_utf8(buf).unwrap()
}

#[test]
fn test_load_inspect_verify() -> Result<()> {
    let input = tempfile::tempdir()?;
    let store = tempfile::tempdir()?;
    let p0 = write_partition(input.path(), "p0.csv", &["oslo,1,red:blue", "lima,2,\\N"])?;
    let p1 = write_partition(input.path(), "p1.csv", &["oslo,3,green:"])?;

    let opts = LoadOptions {
        columns: vec![
            "city=dict".to_string(),
            "amount=plain".to_string(),
            "tags=array<dict>".to_string(),
        ],
        delimiters: vec![":".to_string()],
        files: vec![p0, p1],
        ..LoadOptions::default()
    };
    let mut out = Vec::new();
    assert!(load(store.path(), table(), opts, &mut out)?);
    let out = output(out);
    assert!(out.contains("city: ok, 2 new values, keys 1..=2"), "{}", out);
    assert!(out.contains("tags.item: ok, 4 new values, keys 1..=4"), "{}", out);

    let dict = store.path().join("retail/sales/Metadata/city.dict");
    assert!(dict.is_file());
    assert!(store.path().join("retail/sales/Metadata/tags.item.dictmeta").is_file());

    let mut out = Vec::new();
    inspect(store.path(), table(), "tags.item", true, &mut out)?;
    let out = output(out);
    assert!(out.contains("state: consistent"), "{}", out);
    assert!(out.contains("session 0: keys 1..=4"), "{}", out);
    assert!(out.contains("1\t\n"), "{}", out);
    assert!(out.contains("2\tblue\n"), "{}", out);
    assert!(out.contains("chunk.0.payload"), "{}", out);
    assert!(!out.contains("ERROR"), "{}", out);

    let mut out = Vec::new();
    assert!(verify(store.path(), table(), "city", &mut out)?);
    assert!(output(out).starts_with("city: consistent"));
    Ok(())
}

#[test]
fn test_verify_reports_without_repairing() -> Result<()> {
    let input = tempfile::tempdir()?;
    let store = tempfile::tempdir()?;
    let p0 = write_partition(input.path(), "p0.csv", &["oslo", "lima"])?;
    let opts = LoadOptions {
        columns: vec!["city=dict".to_string()],
        files: vec![p0],
        ..LoadOptions::default()
    };
    assert!(load(store.path(), table(), opts, &mut std::io::sink())?);

    let dict = store.path().join("retail/sales/Metadata/city.dict");
    let len = fs::metadata(&dict)?.len();
    let mut f = fs::OpenOptions::new().append(true).open(&dict)?;
    std::io::Write::write_all(&mut f, b"junk")?;
    drop(f);

    let mut out = Vec::new();
    assert!(verify(store.path(), table(), "city", &mut out)?);
    assert!(output(out).contains("torn tail: 4 bytes"));
    assert_eq!(fs::metadata(&dict)?.len(), len + 4);

    fs::OpenOptions::new().write(true).open(&dict)?.set_len(len - 1)?;
    let mut out = Vec::new();
    assert!(!verify(store.path(), table(), "city", &mut out)?);
    assert!(output(out).contains("shrunk"));
    Ok(())
}

#[test]
fn test_load_reads_chunk_size_from_config_file() -> Result<()> {
    let input = tempfile::tempdir()?;
    let store = tempfile::tempdir()?;
    let p0 = write_partition(input.path(), "p0.csv", &["a", "b", "c"])?;
    let config = input.path().join("keystone.properties");
    fs::write(&config, "# tiny chunks\nkeystone.dictionary.chunk.size = 1\n")?;
    let opts = LoadOptions {
        columns: vec!["k=dict".to_string()],
        files: vec![p0],
        config: Some(config),
        ..LoadOptions::default()
    };
    assert!(load(store.path(), table(), opts, &mut std::io::sink())?);

    let mut out = Vec::new();
    inspect(store.path(), table(), "k", false, &mut out)?;
    assert!(output(out).contains("chunks 3"));
    Ok(())
}

#[test]
fn test_load_missing_partition_file_fails_under_fail_policy() -> Result<()> {
    let input = tempfile::tempdir()?;
    let store = tempfile::tempdir()?;
    let config = input.path().join("keystone.properties");
    fs::write(&config, "keystone.dictionary.collect.failure.policy=fail\n")?;
    let opts = LoadOptions {
        columns: vec!["k=dict".to_string()],
        files: vec![input.path().join("absent.csv")],
        config: Some(config),
        ..LoadOptions::default()
    };
    let mut out = Vec::new();
    assert!(!load(store.path(), table(), opts, &mut out)?);
    assert!(output(out).contains("k: failed"));
    Ok(())
}

#[test]
fn test_load_rejects_empty_field_delimiter() -> Result<()> {
    let input = tempfile::tempdir()?;
    let store = tempfile::tempdir()?;
    let p0 = write_partition(input.path(), "p0.csv", &["zürich,x"])?;
    let mut opts = LoadOptions {
        columns: vec!["city=dict".to_string(), "code=dict".to_string()],
        files: vec![p0],
        ..LoadOptions::default()
    };
    opts.format.field_delimiter = String::new();
    let e = load(store.path(), table(), opts, &mut std::io::sink()).unwrap_err();
    assert!(e.message().contains("field delimiter is empty"));
    assert!(!store.path().join("retail").exists());
    Ok(())
}
