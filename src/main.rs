use std::env;
use std::process;

use cdf_reader::{CdfReader, Value};

fn main() {
    let path = match env::args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("Usage: cdfdump <file.cdf>");
            process::exit(2);
        }
    };

    let reader = CdfReader::open(&path).expect("Failed to open CDF file");
    let cdr = reader.cdr();
    println!(
        "{}: CDF v{}.{} ({}-major)",
        path,
        cdr.version,
        cdr.release,
        if cdr.row_major() { "row" } else { "column" }
    );

    let content = reader.read_content().expect("Failed to read CDF content");

    println!("\nGlobal attributes:");
    for att in content.global_attributes() {
        let entries: Vec<String> = att
            .entries()
            .iter()
            .map(|entry| match entry {
                Some(Value::Text(text)) => text.clone(),
                Some(value) => format!("{:?}", value),
                None => "<null>".to_string(),
            })
            .collect();
        println!("  {} = {}", att.name(), entries.join(", "));
    }

    println!("\nVariables:");
    for var in content.variables() {
        println!(
            "  {} {} ({} records)",
            var.name(),
            var.summary(),
            var.record_count()
        );
        for att in content.variable_attributes() {
            if let Some(entry) = att.entry(var) {
                println!("    {} = {:?}", att.name(), entry);
            }
        }
    }
}
