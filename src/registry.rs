use std::collections::BTreeMap;
use std::fmt::Write;

use parking_lot::Mutex;
use thiserror::Error;

// ─── Public types ────────────────────────────────────────────────

/// Thread-safe set of currently published gauges.
/// The update loop registers, withdraws and updates values; the scrape
/// handler calls `render()`. One lock guards the whole map, so a render
/// is always a consistent snapshot.
pub struct GaugeRegistry {
    inner: Mutex<BTreeMap<String, Gauge>>,
}

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    /// Two probes claimed the same metric name — a configuration defect,
    /// fatal at the call site.
    #[error("gauge `{0}` is already registered")]
    AlreadyRegistered(String),
}

// ─── Internal state ──────────────────────────────────────────────

/// Help text plus the latest sample. `value` is `None` between
/// registration and the first `set_value`; such gauges are not rendered.
struct Gauge {
    help: String,
    value: Option<f64>,
}

// ─── GaugeRegistry impl ──────────────────────────────────────────

impl GaugeRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BTreeMap::new()),
        }
    }

    /// Claim `name` in the servable set. The gauge stays invisible to
    /// `render()` until its first `set_value` call.
    pub fn register(&self, name: &str, help: &str) -> Result<(), RegistryError> {
        let mut gauges = self.inner.lock();
        if gauges.contains_key(name) {
            return Err(RegistryError::AlreadyRegistered(name.to_string()));
        }
        gauges.insert(
            name.to_string(),
            Gauge {
                help: help.to_string(),
                value: None,
            },
        );
        Ok(())
    }

    /// Drop `name` from the servable set; subsequent renders omit it
    /// entirely. Unknown names are a no-op.
    pub fn unregister(&self, name: &str) {
        self.inner.lock().remove(name);
    }

    /// Update the latest sample of a registered gauge. Registration state
    /// is untouched; names that were never registered are ignored.
    pub fn set_value(&self, name: &str, value: f64) {
        if let Some(gauge) = self.inner.lock().get_mut(name) {
            gauge.value = Some(value);
        }
    }

    /// Render every published gauge in the Prometheus text exposition
    /// format, sorted by name.
    pub fn render(&self) -> String {
        let gauges = self.inner.lock();

        let mut out = String::new();
        for (name, gauge) in gauges.iter() {
            if let Some(value) = gauge.value {
                let _ = writeln!(out, "# HELP {} {}", name, escape_help(&gauge.help));
                let _ = writeln!(out, "# TYPE {} gauge", name);
                let _ = writeln!(out, "{} {}", name, value);
            }
        }
        out
    }
}

impl Default for GaugeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Help lines may not span lines or end the comment early.
fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

// ─── Tests ───────────────────────────────────────────────────────
