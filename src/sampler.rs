use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, error};

use crate::config::ProbeDefinition;
use crate::registry::{GaugeRegistry, RegistryError};

// ─── Probe entries ───────────────────────────────────────────────

/// Publication state for one configured probe. Created once at startup;
/// `published` tracks whether its gauge currently lives in the registry.
pub struct ProbeEntry {
    definition: ProbeDefinition,
    published: bool,
}

impl ProbeEntry {
    pub fn new(definition: ProbeDefinition) -> Self {
        Self {
            definition,
            published: false,
        }
    }
}

// ─── Update loop ─────────────────────────────────────────────────

/// Drive every probe once per period, forever.
///
/// Entries are sampled sequentially in configuration order; the pause
/// starts only after a full pass completes, so a slow command delays the
/// rest of its pass and the start of the next one. Probe failures are
/// absorbed per-entry — the only way out of this loop is a registry
/// collision, which is fatal.
pub async fn run(
    mut entries: Vec<ProbeEntry>,
    period: Duration,
    registry: Arc<GaugeRegistry>,
) -> Result<(), RegistryError> {
    loop {
        for entry in entries.iter_mut() {
            sample(entry, &registry).await?;
        }
        tokio::time::sleep(period).await;
    }
}

// ─── Sampling one probe ──────────────────────────────────────────

/// Run one probe command and reconcile its gauge with the outcome.
///
/// Success with numeric output publishes (or refreshes) the gauge; a
/// non-zero exit, spawn error or non-numeric output withdraws it so the
/// scrape shows nothing rather than a stale or sentinel value.
pub async fn sample(
    entry: &mut ProbeEntry,
    registry: &GaugeRegistry,
) -> Result<(), RegistryError> {
    let def = &entry.definition;

    let output = Command::new("sh").arg("-c").arg(&def.cmd).output().await;

    let stdout = match output {
        Ok(out) if out.status.success() => out.stdout,
        Ok(out) => {
            error!(
                "probe `{}`: `{}` exited with {}",
                def.name, def.cmd, out.status
            );
            withdraw(entry, registry);
            return Ok(());
        }
        Err(err) => {
            error!("probe `{}`: cannot run `{}`: {}", def.name, def.cmd, err);
            withdraw(entry, registry);
            return Ok(());
        }
    };

    // Exactly one trailing newline is stripped; anything else the
    // command prints (including a second newline) must parse as a float.
    let text = String::from_utf8_lossy(&stdout);
    let text = text.strip_suffix('\n').unwrap_or(&text);
    debug!("{} = {}", def.name, text);

    match text.parse::<f64>() {
        Ok(value) => {
            if !entry.published {
                registry.register(&def.name, &def.help)?;
                entry.published = true;
            }
            registry.set_value(&def.name, value);
        }
        Err(_) => {
            error!(
                "probe `{}`: `{}` printed non-numeric output `{}`",
                def.name, def.cmd, text
            );
            withdraw(entry, registry);
        }
    }

    Ok(())
}

/// Take a probe's gauge out of the exposition after a failed sample.
fn withdraw(entry: &mut ProbeEntry, registry: &GaugeRegistry) {
    if entry.published {
        registry.unregister(&entry.definition.name);
        entry.published = false;
    }
}

// ─── Tests ───────────────────────────────────────────────────────
