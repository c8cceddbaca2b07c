use std::error::Error;
use std::fs;

use csvtable::{
    ColumnDefinition, DataType, Database, EngineConfig, JoinOptions, JoinStrategy, MemoryCatalog,
    TableDescription, Template,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    println!("CSV Table Engine Demo\n");

    // Write the backing files
    let dir = std::env::temp_dir().join("csvtable-demo");
    fs::create_dir_all(&dir)?;
    let people_path = dir.join("people.csv");
    let batting_path = dir.join("batting.csv");
    fs::write(
        &people_path,
        "playerID,nameLast,nameFirst,birthCity\n\
         willite01,Williams,Ted,San Diego\n\
         ruthba01,Ruth,Babe,Baltimore\n\
         aaronha01,Aaron,Hank,Mobile\n",
    )?;
    fs::write(
        &batting_path,
        "playerID,yearID,teamID,H\n\
         willite01,1941,BOS,185\n\
         willite01,1942,BOS,186\n\
         ruthba01,1927,NYA,192\n",
    )?;

    // Describe the tables
    let mut catalog = MemoryCatalog::new();
    catalog.create_table(
        TableDescription::new("people", &people_path)
            .with_column(ColumnDefinition::new("playerID", DataType::Text, true))
            .with_column(ColumnDefinition::text("nameLast"))
            .with_column(ColumnDefinition::text("nameFirst")),
    )?;
    catalog.define_primary_key("people", ["playerID"])?;
    catalog.create_table(
        TableDescription::new("batting", &batting_path)
            .with_column(ColumnDefinition::text("playerID"))
            .with_column(ColumnDefinition::text("yearID"))
            .with_column(ColumnDefinition::number("H")),
    )?;
    catalog.define_primary_key("batting", ["playerID", "yearID"])?;
    println!("Tables in catalog: {:?}\n", catalog.list_tables());

    let mut db = Database::open(catalog, EngineConfig::default());

    // Select and project
    let people = db.load_table("people")?;
    let template = Template::new().with("playerID", "ruthba01");
    println!("Access path: {}", people.access_path(Some(&template)));
    let fields = ["nameFirst", "nameLast"];
    for row in people.find_by_template(Some(&template), Some(&fields[..]), None, None)? {
        println!("  {row}");
    }
    println!();

    // Join
    let options = JoinOptions::on(["playerID"])
        .with_where(Template::new().with("nameLast", "Williams"))
        .with_projection(["nameLast", "yearID", "H"])
        .with_strategy(JoinStrategy::IndexProbe);
    let joined = db.join("people", "batting", &options)?;
    println!("{} ({} rows):", joined.name(), joined.len());
    println!("{}", serde_json::to_string_pretty(joined.rows())?);

    Ok(())
}
