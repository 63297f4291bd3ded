//! NDJSON output: one `{"kind": ..., "record": ...}` object per line.

use std::io::{self, Write};

use serde::Serialize;

use crate::kind::TapKind;

#[derive(Serialize)]
struct Line<'a> {
    kind: &'a str,
    record: &'a serde_json::Value,
}

/// Write one record as a single JSON line and flush.
pub fn write_record<W: Write>(
    out: &mut W,
    kind: TapKind,
    record: &serde_json::Value,
) -> io::Result<()> {
    serde_json::to_writer(
        &mut *out,
        &Line {
            kind: kind.as_str(),
            record,
        },
    )?;
    out.write_all(b"\n")?;
    out.flush()
}
