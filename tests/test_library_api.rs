mod common;

use common::{fixtures, ScriptDirs};
use std::fs;
use tsql2pg::commands::{execute_convert, execute_init, execute_shorten};
use tsql2pg::mapping::collations::COLLATIONS_FILE;
use tsql2pg::mapping::types::TYPE_MAPPINGS_FILE;
use tsql2pg::output::{LibraryOutputHandler, OutputLevel};
use tsql2pg::{
    shorten, ColumnMapping, ConvertError, EnsureOutcome, IdentityMode, SourceColumn,
    TableRenderer, ToolConfig, TypeMapping,
};

fn config_for(dirs: &ScriptDirs) -> ToolConfig {
    ToolConfig {
        type_mappings_file: Some(dirs.root().join(TYPE_MAPPINGS_FILE)),
        collations_file: Some(dirs.root().join(COLLATIONS_FILE)),
        column_mapping_file: Some(dirs.root().join("logs").join("column_mapping.json")),
        ..ToolConfig::default()
    }
}

#[test]
fn test_init_then_convert_with_custom_type_mapping() {
    let dirs = ScriptDirs::new();
    let config = config_for(&dirs);

    let init = execute_init(&config, dirs.root()).unwrap();
    assert_eq!(init.type_mappings.1, EnsureOutcome::Created);

    // the resource file drives the conversion
    fs::write(
        dirs.root().join(TYPE_MAPPINGS_FILE),
        r#"{ "type_mappings": { "money": "NUMERIC(12,2)" } }"#,
    )
    .unwrap();
    dirs.write_script("V1__prices.sql", "CREATE TABLE p (\n    price MONEY\n);");

    let handler = LibraryOutputHandler::new();
    let result = execute_convert(&dirs.source, &dirs.target, &config, &handler).unwrap();

    assert_eq!(result.batch.converted, 1);
    assert!(dirs.read_output("V1__prices.sql").contains("numeric(12,2)"));
    assert!(handler
        .get_messages()
        .iter()
        .all(|(level, _)| *level != OutputLevel::Error));
}

#[test]
fn test_corrupt_type_resource_falls_back_to_defaults() {
    let dirs = ScriptDirs::new();
    let config = config_for(&dirs);
    fs::write(dirs.root().join(TYPE_MAPPINGS_FILE), "{ broken").unwrap();

    assert_eq!(config.type_store().load(), TypeMapping::defaults());
}

#[test]
fn test_config_file_selects_identity_mode() {
    let dirs = ScriptDirs::new();
    let path = dirs.root().join("tsql2pg.toml");
    fs::write(&path, "identity = \"by_default\"\nskip_collations = true\n").unwrap();

    let config = ToolConfig::load_from_path(&path).unwrap().unwrap();
    let converter = config.build_converter().unwrap();
    let out = converter.convert(fixtures::CREATE_ORDERS);

    assert!(out.sql().contains("generated by default as identity"));
    assert!(out.sql().contains("COLLATE SQL_Latin1_General_CP1_CI_AS"));
}

#[test]
fn test_shortening_boundaries() {
    let at_limit = "a".repeat(63);
    assert_eq!(shorten(&at_limit, 63), at_limit);

    let over_limit = "b".repeat(64);
    assert_ne!(shorten(&over_limit, 63), over_limit);

    let seventy: String = (0..70).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
    let mut mapping = ColumnMapping::new();
    let short = mapping.shorten_column("dbo", "Orders", &seventy, 63).unwrap();

    assert_eq!(short, format!("{}{}", &seventy[..40], &seventy[50..]));
    assert_eq!(mapping.get("dbo", "Orders", &seventy), Some(short.as_str()));
    assert_eq!(mapping.table("dbo.Orders").map(|t| t.len()), Some(1));
}

#[test]
fn test_shorten_command_detects_collisions() {
    let dirs = ScriptDirs::new();
    let config = config_for(&dirs);
    let first = format!("{}first_part{}", "x".repeat(40), "y".repeat(20));
    let second = format!("{}other_part{}", "x".repeat(40), "y".repeat(20));

    execute_shorten("dbo.Orders", &[first], &config).unwrap();
    let err = execute_shorten("dbo.Orders", &[second], &config).unwrap_err();
    assert!(matches!(err, ConvertError::IdentifierCollision { .. }));

    // the first run's mapping survived
    let saved = ColumnMapping::load(&config.column_mapping_path());
    assert_eq!(saved.len(), 1);
}

#[test]
fn test_table_ddl_shares_the_column_mapping() {
    let types = TypeMapping::defaults();
    let renderer = TableRenderer::new(&types).with_identity(IdentityMode::ByDefault);
    let mut mapping = ColumnMapping::new();
    let long = format!("{}_customer_id", "reference_to_the_customer_account_".repeat(2));

    let columns = vec![
        SourceColumn::new("Id", "bigint").identity(),
        SourceColumn::new(long.as_str(), "int").not_null(),
        SourceColumn::new("Status", "varchar").with_length(-1).with_default("('new')"),
    ];
    let sql = renderer.create_table("dbo", "Orders", &columns, &mut mapping).unwrap();

    let short = mapping.resolve("dbo", "Orders", &long).to_string();
    assert!(short.ends_with("_customer_id"));
    assert!(sql.contains("\"Id\" BIGINT GENERATED BY DEFAULT AS IDENTITY NOT NULL"));
    assert!(sql.contains(&format!("\"{}\" INTEGER NOT NULL", short)));
    assert!(sql.contains("\"Status\" TEXT DEFAULT 'new'"));
}
