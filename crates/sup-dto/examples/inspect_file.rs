//! Simple decoder to inspect SUP-DTO files.
//!
//! Binary blobs are recognized by their leading type token; anything else is
//! read as the reversible JSON form.

use std::fs;

use sup_dto::{any_value_from_binary, any_value_from_json_string, AnyValue, TypeKind};

fn describe(value: &AnyValue, depth: usize, out: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    match value.kind() {
        TypeKind::Struct => {
            out.push(format!(
                "{}struct '{}' ({} members)",
                indent,
                value.type_name(),
                value.number_of_members()
            ));
            if let Some(sv) = value.as_struct() {
                for (name, member) in sv.members() {
                    out.push(format!("{}  .{}", indent, name));
                    describe(member, depth + 2, out);
                }
            }
        }
        TypeKind::Array => {
            out.push(format!(
                "{}array '{}' ({} elements)",
                indent,
                value.type_name(),
                value.number_of_elements()
            ));
            if let Some(first) = value.as_array().and_then(|a| a.elements().first()) {
                describe(first, depth + 1, out);
            }
        }
        kind => {
            let text = value.to_string();
            let preview: String = text.chars().take(80).collect();
            if text.chars().count() > 80 {
                out.push(format!("{}{}: {}...", indent, kind, preview));
            } else {
                out.push(format!("{}{}: {}", indent, kind, preview));
            }
        }
    }
}

fn main() {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "value.json".to_string());

    println!("Reading: {}", path);

    let data = fs::read(&path).expect("Failed to read file");
    println!("File size: {} bytes", data.len());

    let value = if data.first() == Some(&0xE1) {
        println!("Format: binary");
        any_value_from_binary(&data).expect("Failed to decode")
    } else {
        println!("Format: JSON");
        let text = String::from_utf8(data).expect("File is not UTF-8");
        any_value_from_json_string(&text, None).expect("Failed to decode")
    };

    println!("\n=== Type ===");
    println!("{}", value.get_type());

    println!("\n=== Structure ===");
    let mut lines = Vec::new();
    describe(&value, 0, &mut lines);
    for line in lines {
        println!("{}", line);
    }
}
