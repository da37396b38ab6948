//! Text exposition of [`MetricsSnapshot`] for `GET /metrics`.

use std::fmt::Write;

use crate::observability::metrics::MetricsSnapshot;

/// Content type of the rendered body.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Render a snapshot in the Prometheus text format.
///
/// Four families are emitted: per-queue length, put requests, errors and
/// index hits.
pub fn render(prefix: &str, snapshot: &MetricsSnapshot) -> String {
    let mut out = String::new();

    family(&mut out, prefix, "channel_len", "Last checked Redis channel length");
    for (channel, length) in &snapshot.queue_lengths {
        let _ = writeln!(
            out,
            "{}_channel_len{{channel=\"{}\"}} {}",
            prefix,
            escape_label(channel),
            length
        );
    }

    family(&mut out, prefix, "requests", "Number of the requests to the publisher by type");
    let _ = writeln!(out, "{}_requests{{method=\"put\"}} {}", prefix, snapshot.put_requests);

    family(&mut out, prefix, "errors", "Number of the raised errors");
    let _ = writeln!(out, "{}_errors {}", prefix, snapshot.errors);

    family(&mut out, prefix, "index", "Number of the requests to /");
    let _ = writeln!(out, "{}_index {}", prefix, snapshot.index_hits);

    out
}

fn family(out: &mut String, prefix: &str, name: &str, help: &str) {
    let _ = writeln!(out, "# HELP {}_{} {}", prefix, name, help);
    let _ = writeln!(out, "# TYPE {}_{} counter", prefix, name);
}

fn escape_label(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::metrics::Metrics;

    #[test]
    fn test_render_counters() {
        let metrics = Metrics::new();
        metrics.incr_put();
        metrics.incr_index();
        metrics.incr_index();
        metrics.set_queue_length("jobs", 5);

        let body = render("taskq_publisher", &metrics.snapshot());

        assert!(body.contains("taskq_publisher_channel_len{channel=\"jobs\"} 5\n"));
        assert!(body.contains("taskq_publisher_requests{method=\"put\"} 1\n"));
        assert!(body.contains("taskq_publisher_errors 0\n"));
        assert!(body.contains("taskq_publisher_index 2\n"));
        assert!(body.contains("# TYPE taskq_publisher_errors counter\n"));
    }

    #[test]
    fn test_render_escapes_label_values() {
        let metrics = Metrics::new();
        metrics.set_queue_length("a\"b\\c\nd", 1);

        let body = render("p", &metrics.snapshot());
        assert!(body.contains("p_channel_len{channel=\"a\\\"b\\\\c\\nd\"} 1\n"));
    }

    #[test]
    fn test_channels_render_sorted() {
        let metrics = Metrics::new();
        metrics.set_queue_length("zeta", 1);
        metrics.set_queue_length("alpha", 2);

        let body = render("p", &metrics.snapshot());
        let alpha = body.find("channel=\"alpha\"").unwrap();
        let zeta = body.find("channel=\"zeta\"").unwrap();
        assert!(alpha < zeta);
    }
}
