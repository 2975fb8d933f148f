use std::io::Write;

use parking_lot::Mutex;

use crate::metrics::desc::MetricKind;
use crate::metrics::registry::MetricFamily;
use crate::metrics::snapshot::CacheMetricsSnapshot;
use crate::metrics::traits::MetricsExporter;

/// Prometheus text exporter for gathered metric families and cache snapshots.
///
/// This exporter writes in the Prometheus text exposition format so it can be
/// scraped by Prometheus or forwarded to an OpenTelemetry collector. An
/// optional prefix (e.g. `parca_agent`) namespaces every metric name.
#[derive(Debug)]
pub struct PrometheusTextExporter<W: Write + Send> {
    prefix: String,
    writer: Mutex<W>,
}

impl<W: Write + Send> PrometheusTextExporter<W> {
    pub fn new(prefix: impl Into<String>, writer: W) -> Self {
        Self {
            prefix: prefix.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn metric_name(&self, suffix: &str) -> String {
        if self.prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{}_{}", self.prefix, suffix)
        }
    }

    fn write_family(&self, w: &mut W, family: &MetricFamily) -> std::io::Result<()> {
        let name = self.metric_name(&family.name);
        writeln!(w, "# HELP {} {}", name, escape_help(&family.help))?;
        writeln!(w, "# TYPE {} {}", name, family.kind)?;
        for sample in &family.samples {
            if sample.labels().is_empty() {
                writeln!(w, "{} {}", name, sample.value())?;
            } else {
                let labels: Vec<String> = sample
                    .labels()
                    .iter()
                    .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
                    .collect();
                writeln!(w, "{}{{{}}} {}", name, labels.join(","), sample.value())?;
            }
        }
        Ok(())
    }

    fn write_single(
        &self,
        w: &mut W,
        kind: MetricKind,
        suffix: &str,
        value: u64,
    ) -> std::io::Result<()> {
        let name = self.metric_name(suffix);
        writeln!(w, "# TYPE {} {}", name, kind)?;
        writeln!(w, "{} {}", name, value)
    }
}

impl<W: Write + Send> MetricsExporter<[MetricFamily]> for PrometheusTextExporter<W> {
    fn export(&self, families: &[MetricFamily]) -> std::io::Result<()> {
        let mut writer = self.writer.lock();
        for family in families {
            self.write_family(&mut writer, family)?;
        }
        writer.flush()
    }
}

impl<W: Write + Send> MetricsExporter<CacheMetricsSnapshot> for PrometheusTextExporter<W> {
    fn export(&self, snapshot: &CacheMetricsSnapshot) -> std::io::Result<()> {
        let mut w = self.writer.lock();
        self.write_single(&mut w, MetricKind::Counter, "cache_hits_total", snapshot.hits)?;
        self.write_single(&mut w, MetricKind::Counter, "cache_misses_total", snapshot.misses)?;
        self.write_single(
            &mut w,
            MetricKind::Counter,
            "cache_evictions_total",
            snapshot.evictions,
        )?;
        self.write_single(&mut w, MetricKind::Gauge, "cache_len", snapshot.cache_len as u64)?;
        self.write_single(&mut w, MetricKind::Gauge, "capacity", snapshot.capacity as u64)?;
        w.flush()
    }
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
