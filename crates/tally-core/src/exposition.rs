//! Prometheus text exposition (format 0.0.4).
//!
//! Rendering is a pure function of the snapshot: metric order and series order
//! come from the registry, so identical snapshots produce identical bytes.

use std::fmt::Write;

use bytes::Bytes;

use crate::registry::{FamilySnapshot, Snapshot};

/// Content type served on the scrape endpoint.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Escape help text: backslash and newline.
fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Escape label values: backslash, double quote, and newline.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

/// Shortest round-trip decimal. Integral values carry no fraction, non-finite
/// values use the exposition sentinels.
pub fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "+Inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        // `Display` for f64 is locale-independent and never uses exponents.
        format!("{v}")
    }
}

fn render_family(family: &FamilySnapshot, out: &mut String) {
    let desc = &family.descriptor;
    let _ = writeln!(out, "# HELP {} {}", desc.name, escape_help(&desc.help));
    let _ = writeln!(out, "# TYPE {} {}", desc.name, desc.kind);
    for sample in &family.samples {
        out.push_str(&desc.name);
        if !sample.labels.is_empty() {
            let label_str = sample
                .labels
                .pairs(desc)
                .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
                .collect::<Vec<_>>()
                .join(",");
            let _ = write!(out, "{{{}}}", label_str);
        }
        let _ = writeln!(out, " {}", format_value(sample.value));
    }
}

/// Render a snapshot into the text wire format.
pub fn render(snapshot: &Snapshot) -> Bytes {
    let mut out = String::new();
    for family in &snapshot.families {
        render_family(family, &mut out);
    }
    Bytes::from(out)
}
