//! Memory accounting for loaded datasets

use arrow::record_batch::RecordBatch;

/// Estimate memory usage of a RecordBatch
pub fn estimate_batch_memory(batch: &RecordBatch) -> usize {
    let columns: usize = batch
        .columns()
        .iter()
        .map(|column| column.get_array_memory_size())
        .sum();

    // Field metadata is small but not free
    columns + std::mem::size_of::<RecordBatch>() + batch.schema().fields().len() * 64
}

/// Human readable byte count for log lines
pub fn format_bytes(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
