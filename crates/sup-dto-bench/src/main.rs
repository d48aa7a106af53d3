//! Benchmark for SUP-DTO binary and JSON codecs.
//!
//! Builds a table of sensor records with the composer API and times encoding
//! and decoding in both formats.

use std::time::{Duration, Instant};

use sup_dto::{
    any_value_from_binary, any_value_from_json_string, any_value_to_binary,
    any_value_to_json_string, typed_value_from_json_string, values_to_json_string, AnyType,
    AnyValue, AnyValueComposer,
};

const DEFAULT_RECORDS: usize = 50_000;
const DECODE_ITERS: u32 = 5;

fn record_type() -> AnyType {
    AnyType::struct_from(
        "Reading",
        [
            ("id", AnyType::STRING),
            ("seq", AnyType::UINT64),
            ("position", AnyType::array(3, AnyType::FLOAT64, "Vec3").expect("valid array type")),
            ("status", AnyType::UINT8),
            ("valid", AnyType::BOOL),
        ],
    )
    .expect("valid record type")
}

fn build_table(count: usize) -> AnyValue {
    let mut composer = AnyValueComposer::new();
    composer
        .start_struct("Table")
        .expect("start table")
        .add_member("source", "bench".into())
        .expect("source")
        .start_member("rows")
        .expect("rows")
        .start_unbounded_array(record_type(), "Rows")
        .expect("rows array");

    for i in 0..count {
        let t = i as f64 * 0.001;
        composer
            .start_struct("Reading")
            .expect("record")
            .add_member("id", format!("SENSOR-{:06}", i % 997).into())
            .expect("id")
            .add_member("seq", (i as u64).into())
            .expect("seq")
            .start_member("position")
            .expect("position")
            .start_array("Vec3")
            .expect("vec3");
        for coord in [t.sin(), t.cos(), t] {
            composer.add_value(coord.into()).expect("coordinate");
        }
        composer
            .end_array()
            .expect("end vec3")
            .end_member()
            .expect("end position")
            .add_member("status", ((i % 7) as u8).into())
            .expect("status")
            .add_member("valid", (i % 13 != 0).into())
            .expect("valid")
            .end_struct()
            .expect("end record");
    }

    composer
        .end_array()
        .expect("end rows")
        .end_member()
        .expect("end rows member")
        .end_struct()
        .expect("end table");
    composer.finish().expect("complete table")
}

fn throughput(bytes: usize, time: Duration) -> f64 {
    (bytes as f64 / 1_000_000.0) / time.as_secs_f64()
}

fn time_decode<T>(mut decode: impl FnMut() -> T) -> (T, Duration) {
    // Warmup
    let _ = decode();
    let start = Instant::now();
    let mut last = None;
    for _ in 0..DECODE_ITERS {
        last = Some(decode());
    }
    let elapsed = start.elapsed() / DECODE_ITERS;
    (last.expect("at least one iteration"), elapsed)
}

fn main() {
    let count = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(DEFAULT_RECORDS);

    let build_start = Instant::now();
    let table = build_table(count);
    let build_time = build_start.elapsed();
    println!("Built {} records in {:?}", count, build_time);

    // Binary
    let encode_start = Instant::now();
    let binary = any_value_to_binary(&table);
    let encode_time = encode_start.elapsed();
    println!("\nBinary encode: {} bytes in {:?}", binary.len(), encode_time);
    println!("  Throughput: {:.2} MB/s", throughput(binary.len(), encode_time));

    let (decoded, decode_time) =
        time_decode(|| any_value_from_binary(&binary).expect("Failed to decode binary"));
    println!(
        "Binary decode: {:?} (avg of {} iterations)",
        decode_time, DECODE_ITERS
    );
    println!("  Throughput: {:.2} MB/s", throughput(binary.len(), decode_time));
    assert_eq!(decoded, table);

    // Reversible JSON
    let encode_start = Instant::now();
    let json = any_value_to_json_string(&table, false).expect("Failed to encode JSON");
    let encode_time = encode_start.elapsed();
    println!("\nJSON encode: {} bytes in {:?}", json.len(), encode_time);
    println!("  Throughput: {:.2} MB/s", throughput(json.len(), encode_time));

    let (decoded, decode_time) = time_decode(|| {
        any_value_from_json_string(&json, None).expect("Failed to decode JSON")
    });
    println!(
        "JSON decode: {:?} (avg of {} iterations)",
        decode_time, DECODE_ITERS
    );
    println!("  Throughput: {:.2} MB/s", throughput(json.len(), decode_time));
    assert_eq!(decoded, table);

    // Values-only JSON against a known type
    let ty = table.get_type();
    let values = values_to_json_string(&table, false).expect("Failed to encode values");
    let (decoded, decode_time) = time_decode(|| {
        typed_value_from_json_string(&ty, &values).expect("Failed to decode values")
    });
    println!(
        "\nTyped JSON decode: {} bytes in {:?} (avg of {} iterations)",
        values.len(),
        decode_time,
        DECODE_ITERS
    );
    assert_eq!(decoded, table);

    println!("\n=== Summary ===");
    println!("Records: {}", count);
    println!(
        "Binary: {} bytes ({:.1}% of JSON)",
        binary.len(),
        binary.len() as f64 * 100.0 / json.len() as f64
    );
}
