mod common;

use common::{convert, converter, fixtures, init_test_tracing};
use indexmap::IndexMap;
use std::collections::BTreeSet;
use tsql2pg::{CollationMapping, Converter, ConverterOptions, TypeMapping};

#[test]
fn test_second_conversion_changes_nothing() {
    init_test_tracing();

    for script in [fixtures::CREATE_USERS, fixtures::BRACKETS, fixtures::DROP_ALL] {
        let once = convert(script);
        let twice = convert(&once);
        assert_eq!(twice, once, "conversion of {:?} is not stable", script);
    }
}

#[test]
fn test_simple_table_output() {
    let out = convert(fixtures::CREATE_USERS);
    assert_eq!(
        out,
        "create table \"Users\" (\n    \"Id\" integer not null,\n    \"Name\" varchar(50) NULL\n);"
    );
}

#[test]
fn test_always_true_condition_is_eliminated() {
    let result = converter().convert(fixtures::DROP_ALL);
    let out = result.sql().to_lowercase();

    assert!(out.contains("drop table if exists t cascade;"), "got: {}", out);
    assert!(!out.contains("declare"));
    assert!(!out.contains("begin"));
    assert!(!out.contains("do $$"));
    assert!(!out.contains("@x"));
    assert!(result
        .log()
        .iter()
        .any(|entry| entry.starts_with("[OK] DECLARE + IF")));
}

#[test]
fn test_existence_guard_is_preserved() {
    let out = convert(fixtures::GUARDED_DELETE).to_lowercase();
    assert_eq!(
        out,
        "do $$\nbegin\n    if exists (select 1 from sys.foo) then\n        delete from orders;\n    end if;\nend $$;"
    );
}

#[test]
fn test_every_mapped_type_is_rewritten() {
    let types = TypeMapping::defaults();

    for (source, target) in types.iter() {
        let sql = format!(
            "CREATE TABLE t (\n    c {},\n    {}_value INTEGER\n);",
            source.to_uppercase(),
            source
        );
        let out = convert(&sql);
        let lowered = out.to_lowercase();

        assert!(
            lowered.contains(&format!("c {},", target.to_lowercase())),
            "{} was not rewritten to {}: {}",
            source,
            target,
            out
        );
        assert!(
            out.contains(&format!("{}_value", source)),
            "identifier {}_value was altered: {}",
            source,
            out
        );
    }
}

#[test]
fn test_int_value_column_untouched() {
    let out = convert("CREATE TABLE t (\n    id INT,\n    int_value INT\n);");
    assert!(out.contains("int_value integer"));
    assert!(!out.contains("integer_value"));
}

#[test]
fn test_bracket_identifiers_keep_inner_text() {
    assert_eq!(
        convert(fixtures::BRACKETS),
        "SELECT \"My Column\" FROM \"Some Table\";"
    );
}

fn collation_converter(available: &[&str]) -> Converter {
    let mut entries = IndexMap::new();
    entries.insert(
        "Custom_CI_AS".to_string(),
        vec!["first".to_string(), "second".to_string(), "third".to_string()],
    );
    let options = ConverterOptions {
        available_collations: Some(available.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>()),
        ..ConverterOptions::default()
    };
    Converter::new(TypeMapping::defaults(), CollationMapping::new(entries), options).unwrap()
}

#[test]
fn test_collation_falls_through_to_first_available() {
    let sql = "CREATE TABLE t (\n    name VARCHAR(10) COLLATE Custom_CI_AS\n);";

    let out = collation_converter(&["third"]).convert(sql);
    assert!(out.sql().contains("COLLATE \"third\""), "got: {}", out.sql());

    let out = collation_converter(&[]).convert(sql);
    assert!(!out.sql().contains("COLLATE"), "got: {}", out.sql());
    assert!(out.sql().contains("name varchar(10)"));
}

#[test]
fn test_default_tables_convert_a_full_table() {
    let out = convert(fixtures::CREATE_ORDERS);

    assert!(out.starts_with("create table \"Orders\" ("), "got: {}", out);
    assert!(out.contains("\"OrderId\" integer generated always as identity not null,"));
    assert!(out.contains("\"Note\" text COLLATE \"de-DE-x-icu\" NULL,"));
    assert!(out.to_lowercase().contains("\"created\" timestamptz not null default current_timestamp"));
    assert!(out.ends_with(");"));
    assert!(!out.contains('['));
    assert!(!out.contains("dbo."));
}

#[test]
fn test_one_converter_serves_many_threads() {
    let converter = converter();
    let expected = converter.convert(fixtures::CREATE_USERS).sql().to_string();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| converter.convert(fixtures::CREATE_USERS).sql().to_string()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}
