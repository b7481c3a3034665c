//! `replay`: feed a newline-delimited frame capture through the hub.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use gatewatch_config::{Config, EntityConfig};
use gatewatch_core::{
    ActionEntity, AvailabilityFlag, BleScannerEntity, BleStatsEntity, CoreConfig, Entity,
    GatewayStatsEntity, Payload, PlatformEvent, ProductTable, SensorEntity, SnapshotBus,
    StateSnapshot, StaticRegistry, StatsSubscriptionHub, ZclClusters, ZigbeeStatsEntity,
};

use crate::cli::{GlobalOpts, OutputFormat, ReplayArgs};
use crate::error::CliError;
use crate::output::{self, SnapshotRow};

/// Extra wait after the last frame so pending action resets land.
const SETTLE_MARGIN: Duration = Duration::from_millis(20);

/// One capture line.
#[derive(Debug, Deserialize)]
struct CaptureLine {
    key: String,
    frame: Payload,
}

// ── Entity construction ─────────────────────────────────────────────

/// Config entities plus flag entities, first occurrence wins.
fn entity_specs(config: &Config, args: &ReplayArgs) -> Vec<EntityConfig> {
    let flags = args
        .zigbee
        .iter()
        .map(|did| EntityConfig::Zigbee { did: did.clone() })
        .chain(args.ble.iter().map(|mac| EntityConfig::Ble { mac: mac.clone() }))
        .chain(args.action.iter().map(|key| EntityConfig::Action { key: key.clone() }))
        .chain(args.gateway.iter().map(|did| EntityConfig::Gateway { did: did.clone() }))
        .chain(args.sensor.iter().map(|(key, attr)| EntityConfig::Sensor {
            key: key.clone(),
            attr: attr.clone(),
        }))
        .chain(args.scanner.then_some(EntityConfig::Scanner));

    let mut specs: Vec<EntityConfig> = Vec::new();
    for spec in config.entities.iter().cloned().chain(flags) {
        if !specs.contains(&spec) {
            specs.push(spec);
        }
    }
    specs
}

struct EntityFactory {
    core: CoreConfig,
    bus: Arc<SnapshotBus>,
    registry: Arc<StaticRegistry>,
    products: Arc<ProductTable>,
    availability: AvailabilityFlag,
}

impl EntityFactory {
    fn build(&self, spec: &EntityConfig) -> Result<Arc<dyn Entity>, CliError> {
        let entity: Arc<dyn Entity> = match spec {
            EntityConfig::Zigbee { did } => Arc::new(ZigbeeStatsEntity::new(
                did,
                Arc::new(ZclClusters),
                self.bus.clone(),
            )?),
            EntityConfig::Ble { mac } => Arc::new(BleStatsEntity::new(mac, self.bus.clone())?),
            EntityConfig::Action { key } => {
                Arc::new(ActionEntity::new(key, &self.core, self.bus.clone())?)
            }
            EntityConfig::Scanner => Arc::new(BleScannerEntity::new(
                self.registry.clone(),
                self.products.clone(),
                self.bus.clone(),
            )),
            EntityConfig::Gateway { did } => Arc::new(GatewayStatsEntity::new(
                did,
                Arc::new(self.availability.clone()),
                self.bus.clone(),
            )),
            EntityConfig::Sensor { key, attr } => {
                Arc::new(SensorEntity::new(key, attr, self.bus.clone()))
            }
        };
        Ok(entity)
    }
}

// ── Follow stream ───────────────────────────────────────────────────

struct Follow {
    snapshots: broadcast::Receiver<Arc<StateSnapshot>>,
    events: broadcast::Receiver<Arc<PlatformEvent>>,
    format: OutputFormat,
    quiet: bool,
}

impl Follow {
    fn new(bus: &SnapshotBus, global: &GlobalOpts) -> Self {
        Self {
            snapshots: bus.subscribe_snapshots(),
            events: bus.subscribe_events(),
            format: global.output,
            quiet: global.quiet,
        }
    }

    /// Print everything published since the last drain.
    fn drain(&mut self) -> Result<(), CliError> {
        loop {
            match self.snapshots.try_recv() {
                Ok(snapshot) => {
                    let line = output::render_snapshot_line(self.format, &snapshot)?;
                    output::print_output(&line, self.quiet);
                }
                Err(TryRecvError::Lagged(missed)) => warn!(missed, "follow output fell behind"),
                Err(_) => break,
            }
        }
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    let line = output::render_event_line(self.format, &event)?;
                    output::print_output(&line, self.quiet);
                }
                Err(TryRecvError::Lagged(missed)) => warn!(missed, "follow output fell behind"),
                Err(_) => break,
            }
        }
        Ok(())
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    args: ReplayArgs,
    mut config: Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if let Some(ms) = args.pulse_delay_ms {
        config.pulse_delay_ms = ms;
    }
    let specs = entity_specs(&config, &args);
    if specs.is_empty() {
        return Err(CliError::NoEntities {
            path: super::config_file(global).display().to_string(),
        });
    }

    let hub = Arc::new(StatsSubscriptionHub::new());
    let bus = Arc::new(SnapshotBus::new());
    let mut follow = args.follow.then(|| Follow::new(&bus, global));

    let factory = EntityFactory {
        core: config.to_core_config()?,
        bus: Arc::clone(&bus),
        registry: Arc::new(config.registry()?),
        products: Arc::new(config.product_table()?),
        availability: AvailabilityFlag::new(!args.gateway_offline),
    };
    let attachments = specs
        .iter()
        .map(|spec| {
            factory
                .build(spec)
                .map(|entity| StatsSubscriptionHub::attach(&hub, entity))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let has_actions = specs
        .iter()
        .any(|spec| matches!(spec, EntityConfig::Action { .. }));

    if let Some(follow) = follow.as_mut() {
        follow.drain()?;
    }

    let reader = open_input(args.input.as_deref()).await?;
    let mut lines = reader.lines();
    let (mut line_no, mut delivered, mut skipped) = (0_usize, 0_usize, 0_usize);

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<CaptureLine>(&line) {
            Ok(capture) => {
                if hub.notify(&capture.key, &capture.frame) == 0 {
                    debug!(line = line_no, key = %capture.key, "no entity attached for key");
                }
                delivered += 1;
            }
            Err(err) if args.strict => {
                return Err(CliError::MalformedLine {
                    line: line_no,
                    reason: err.to_string(),
                });
            }
            Err(err) => {
                warn!(line = line_no, error = %err, "skipping malformed line");
                skipped += 1;
            }
        }

        if let Some(follow) = follow.as_mut() {
            follow.drain()?;
        }
    }

    if has_actions {
        tokio::time::sleep(factory.core.pulse_delay + SETTLE_MARGIN).await;
    }
    if let Some(follow) = follow.as_mut() {
        follow.drain()?;
    }

    info!(
        lines = line_no,
        delivered,
        skipped,
        entities = attachments.len(),
        "replay finished"
    );

    let snapshots = bus.all_latest();
    let out = output::render_list(global.output, &snapshots, |s| SnapshotRow::from(s.as_ref()))?;
    output::print_output(&out, global.quiet);

    drop(attachments);
    Ok(())
}

async fn open_input(path: Option<&Path>) -> Result<Box<dyn AsyncBufRead + Unpin + Send>, CliError> {
    match path {
        Some(path) if path != Path::new("-") => {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|source| CliError::OpenInput {
                    path: path.display().to_string(),
                    source,
                })?;
            Ok(Box::new(BufReader::new(file)))
        }
        _ => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
    }
}
