//! Diagnostics: JSON snapshots of the world and captured log output.
//!
//! Enabled by the `diagnostics` feature flag (on by default). A tool calls
//! [`snapshot`] once per frame, or as often as it likes, and gets the
//! archetype layout, entity pool statistics, the last frame's timings and any
//! log lines captured since the previous snapshot. Archetypes listed in
//! `expanded` (by index in the snapshot) also carry per-entity detail.
//!
//! Log capture needs [`init_logger`] instead of `env_logger::init()`.

use std::sync::Mutex;
use std::time::Instant;

use serde::Serialize;

use crate::ecs::World;
use crate::frame::FrameReport;
use crate::time::Time;

// ── Snapshot types (wire format) ────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct WorldSnapshot {
    pub fps: f32,
    pub delta_ms: f32,
    pub frame_count: u64,
    pub elapsed_secs: f32,
    pub entity_count: usize,
    pub archetype_count: usize,
    pub archetypes: Vec<ArchetypeInfo>,
    pub entity_pool: EntityPoolSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_budget: Option<FrameBudgetSnapshot>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<LogEntrySnapshot>,
}

#[derive(Debug, Serialize)]
pub struct ArchetypeInfo {
    pub(crate) entity_count: usize,
    pub(crate) component_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) entities: Option<Vec<EntityInfo>>,
}

#[derive(Debug, Serialize)]
pub struct EntityInfo {
    pub(crate) id: u32,
    pub(crate) generation: u32,
    pub(crate) name: String,
    /// `None` only for the root.
    pub(crate) parent_id: Option<u32>,
    pub(crate) components: Vec<ComponentInfo>,
}

#[derive(Debug, Serialize)]
pub struct ComponentInfo {
    pub(crate) name: String,
    pub(crate) debug_value: String,
}

#[derive(Debug, Serialize)]
pub struct EntityPoolSnapshot {
    pub(crate) total_slots: usize,
    pub(crate) free_count: usize,
    pub(crate) alive_count: usize,
    pub(crate) spawned_this_frame: u32,
    pub(crate) destroyed_this_frame: u32,
}

impl EntityPoolSnapshot {
    /// Share of slots sitting on the free list, in percent.
    pub fn fragmentation_pct(&self) -> f32 {
        if self.total_slots == 0 {
            0.0
        } else {
            self.free_count as f32 / self.total_slots as f32 * 100.0
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FrameBudgetSnapshot {
    pub scripts_run: usize,
    pub draw_calls: usize,
    pub script_us: f64,
    pub render_us: f64,
}

impl From<&FrameReport> for FrameBudgetSnapshot {
    fn from(report: &FrameReport) -> Self {
        Self {
            scripts_run: report.scripts_run,
            draw_calls: report.draw_calls,
            script_us: report.script_us,
            render_us: report.render_us,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LogEntrySnapshot {
    pub level: String,
    pub target: String,
    pub message: String,
    pub timestamp_secs: f32,
}

// ── Log Capture ──────────────────────────────────────────────────────────

const LOG_CAPACITY: usize = 500;
const LOGS_PER_SNAPSHOT: usize = 50;

struct CapturedLog {
    level: log::Level,
    target: String,
    message: String,
    timestamp_secs: f32,
}

/// Ring buffer for captured logs (capped at 500).
struct LogRing {
    entries: std::collections::VecDeque<CapturedLog>,
    start: Instant,
}

impl LogRing {
    fn new() -> Self {
        Self {
            entries: std::collections::VecDeque::with_capacity(LOG_CAPACITY),
            start: Instant::now(),
        }
    }

    fn push(&mut self, level: log::Level, target: &str, message: String) {
        if self.entries.len() >= LOG_CAPACITY {
            self.entries.pop_front();
        }
        let timestamp_secs = self.start.elapsed().as_secs_f32();
        self.entries.push_back(CapturedLog {
            level,
            target: target.to_string(),
            message,
            timestamp_secs,
        });
    }

    fn drain(&mut self, max: usize) -> Vec<CapturedLog> {
        let n = self.entries.len().min(max);
        self.entries.drain(..n).collect()
    }
}

static LOG_RING: Mutex<Option<LogRing>> = Mutex::new(None);

/// Captures every message into the ring buffer and forwards to env_logger
/// for stderr output.
struct DiagLogger {
    inner: env_logger::Logger,
}

impl log::Log for DiagLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata) || metadata.level() <= log::Level::Info
    }

    fn log(&self, record: &log::Record) {
        if self.inner.enabled(record.metadata()) {
            self.inner.log(record);
        }
        if let Ok(mut guard) = LOG_RING.lock() {
            if let Some(ring) = guard.as_mut() {
                ring.push(record.level(), record.target(), record.args().to_string());
            }
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

static DIAG_LOGGER: std::sync::OnceLock<DiagLogger> = std::sync::OnceLock::new();

/// Install the capturing logger. `RUST_LOG` controls what reaches stderr;
/// Info and above is always captured.
///
/// Call this early (before any log messages) to capture everything. Returns
/// `false` if another logger was installed first.
pub fn init_logger() -> bool {
    if let Ok(mut ring) = LOG_RING.lock() {
        *ring = Some(LogRing::new());
    }

    let inner = env_logger::Builder::new().parse_default_env().build();
    let max_level = inner.filter();
    let logger = DIAG_LOGGER.get_or_init(|| DiagLogger { inner });

    if log::set_logger(logger).is_err() {
        eprintln!("[mundos] a logger is already set, log capture disabled");
        return false;
    }
    log::set_max_level(max_level.max(log::LevelFilter::Info));
    true
}

fn drain_captured_logs(max: usize) -> Vec<LogEntrySnapshot> {
    let Ok(mut guard) = LOG_RING.lock() else {
        return Vec::new();
    };
    let Some(ring) = guard.as_mut() else {
        return Vec::new();
    };
    ring.drain(max)
        .into_iter()
        .map(|e| LogEntrySnapshot {
            level: e.level.to_string(),
            target: e.target,
            message: e.message,
            timestamp_secs: e.timestamp_secs,
        })
        .collect()
}

// ── Snapshots ────────────────────────────────────────────────────────────

/// Gather a snapshot. Resets the world's per-frame spawn/destroy counters.
pub fn snapshot(world: &mut World, time: &Time, last_frame: Option<&FrameReport>, expanded: &[usize]) -> WorldSnapshot {
    let archetypes = world.diagnostics_archetypes(expanded);
    WorldSnapshot {
        fps: time.fps(),
        delta_ms: time.delta().as_secs_f32() * 1000.0,
        frame_count: time.frame_count(),
        elapsed_secs: time.elapsed_secs(),
        entity_count: world.entity_count(),
        archetype_count: archetypes.len(),
        archetypes,
        entity_pool: world.diagnostics_entity_stats(),
        frame_budget: last_frame.map(FrameBudgetSnapshot::from),
        logs: drain_captured_logs(LOGS_PER_SNAPSHOT),
    }
}

pub fn snapshot_json(
    world: &mut World,
    time: &Time,
    last_frame: Option<&FrameReport>,
    expanded: &[usize],
) -> Result<String, serde_json::Error> {
    serde_json::to_string(&snapshot(world, time, last_frame, expanded))
}
