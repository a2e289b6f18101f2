use clap::Parser;
use pacsnake_core::constants::{trail_ttl_ticks, TICK_MS, TICK_RATE};
use pacsnake_core::engine::{EngineOptions, GameEngine};
use pacsnake_core::grid::Grid;
use pacsnake_core::rng::Rng;
use pacsnake_core::types::{Direction, GameConfig, GhostMode, RuntimeEvent, Snapshot, Vec2};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Run a single scenario instead of the default battery.
    #[arg(long)]
    single: bool,
    #[arg(long)]
    ticks: Option<u64>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    run_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum EndReason {
    GameOver,
    TickLimit,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    #[serde(rename = "maxTicks")]
    max_ticks: u64,
    seed: u32,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u32,
    reason: EndReason,
    #[serde(rename = "ticksRun")]
    ticks_run: u64,
    #[serde(rename = "finalScore")]
    final_score: u32,
    #[serde(rename = "finalWave")]
    final_wave: u32,
    #[serde(rename = "pelletsEaten")]
    pellets_eaten: i32,
    #[serde(rename = "powerPelletsEaten")]
    power_pellets_eaten: i32,
    #[serde(rename = "ghostsEaten")]
    ghosts_eaten: i32,
    #[serde(rename = "livesLost")]
    lives_lost: i32,
    #[serde(rename = "wavesCleared")]
    waves_cleared: i32,
    #[serde(rename = "phaseChanges")]
    phase_changes: i32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioRunResult {
    #[serde(flatten)]
    result: ScenarioResultLine,
    #[serde(rename = "anomalyRecords")]
    anomaly_records: Vec<AnomalyRecord>,
    #[serde(rename = "finishedTick")]
    finished_tick: u64,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "reasonCounts")]
    reason_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine {
    #[serde(rename = "timestampMs")]
    timestamp_ms: u64,
    level: String,
    event: String,
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    scenario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tick: Option<u64>,
    details: Value,
}

fn main() {
    let cli = Cli::parse();
    let scenarios = resolve_scenarios(&cli);
    let run_started_at_ms = now_ms();
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let run_id = cli
        .run_id
        .clone()
        .unwrap_or_else(|| default_run_id(seed_hint, run_started_at_ms));
    let mut has_anomaly = false;
    let mut scenario_results = Vec::new();
    let mut reason_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        emit_log(
            "info",
            "scenario_started",
            &run_id,
            Some(&scenario.name),
            Some(scenario.seed),
            None,
            json!({
                "maxTicks": scenario.max_ticks,
            }),
        );
        let scenario_run = run_scenario(&scenario);

        for anomaly in &scenario_run.anomaly_records {
            emit_log(
                "warn",
                "anomaly_detected",
                &run_id,
                Some(&scenario.name),
                Some(scenario.seed),
                Some(anomaly.tick),
                json!({
                    "message": anomaly.message,
                }),
            );
        }

        if !scenario_run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += scenario_run.anomaly_records.len();
        *reason_counts
            .entry(end_reason_key(scenario_run.result.reason))
            .or_insert(0) += 1;

        emit_log(
            "info",
            "scenario_finished",
            &run_id,
            Some(&scenario.name),
            Some(scenario.seed),
            Some(scenario_run.finished_tick),
            json!({
                "reason": scenario_run.result.reason,
                "finalScore": scenario_run.result.final_score,
                "finalWave": scenario_run.result.final_wave,
                "anomalyCount": scenario_run.anomaly_records.len(),
            }),
        );

        println!(
            "{}",
            serde_json::to_string(&scenario_run.result).expect("scenario result should serialize")
        );
        scenario_results.push(scenario_run.result);
    }

    let run_finished_at_ms = now_ms();
    let summary = build_run_summary(
        run_id.clone(),
        run_started_at_ms,
        run_finished_at_ms,
        scenario_results,
        reason_counts,
        total_anomalies,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            emit_log(
                "error",
                "summary_write_failed",
                &run_id,
                None,
                None,
                None,
                json!({
                    "path": path.to_string_lossy(),
                    "error": error.to_string(),
                }),
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    emit_log(
        "info",
        "run_finished",
        &run_id,
        None,
        None,
        None,
        json!({
            "scenarioCount": summary.scenario_count,
            "anomalyCount": summary.anomaly_count,
            "reasonCounts": summary.reason_counts,
            "summaryOut": summary_out_written,
        }),
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn run_scenario(scenario: &Scenario) -> ScenarioRunResult {
    let mut engine = GameEngine::new(Grid::bundled(), scenario.seed, EngineOptions::default());
    let config = engine.config();
    let level = engine.level_init();
    let initial_pellets = level.pellets.len() as u32;
    let mut remaining_pellets: BTreeSet<(i32, i32)> = level.pellets.iter().copied().collect();
    let mut bot_rng = Rng::new(scenario.seed.wrapping_mul(31).wrapping_add(7));

    let mut pellets_eaten = 0;
    let mut power_pellets_eaten = 0;
    let mut ghosts_eaten = 0;
    let mut lives_lost = 0;
    let mut waves_cleared = 0;
    let mut phase_changes = 0;
    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();
    let mut last_tick = 0u64;
    let mut reason = EndReason::TickLimit;

    for tick in 0..scenario.max_ticks {
        if tick % 5 == 0 {
            let snapshot = engine.build_snapshot(false);
            let dir = choose_bot_direction(&engine, &snapshot, &remaining_pellets, &mut bot_rng);
            engine.set_direction(dir);
        }
        engine.step(TICK_MS);
        let snapshot = engine.build_snapshot(true);
        last_tick = snapshot.tick;

        for message in
            collect_snapshot_anomalies(&snapshot, engine.grid(), &config, initial_pellets)
        {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                message,
            );
        }

        for event in &snapshot.events {
            match event {
                RuntimeEvent::PelletEaten { x, y } => {
                    pellets_eaten += 1;
                    remaining_pellets.remove(&(*x, *y));
                }
                RuntimeEvent::PowerPelletEaten { .. } => power_pellets_eaten += 1,
                RuntimeEvent::GhostEaten { .. } => ghosts_eaten += 1,
                RuntimeEvent::LifeLost { .. } => lives_lost += 1,
                RuntimeEvent::WaveCleared { .. } => {
                    waves_cleared += 1;
                    remaining_pellets = level.pellets.iter().copied().collect();
                }
                RuntimeEvent::PhaseChanged { .. } => phase_changes += 1,
                RuntimeEvent::GameOver { .. } => {}
            }
        }

        if engine.is_ended() {
            reason = EndReason::GameOver;
            break;
        }
    }

    let final_snapshot = engine.build_snapshot(false);
    ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: scenario.name.clone(),
            seed: scenario.seed,
            reason,
            ticks_run: last_tick,
            final_score: final_snapshot.score,
            final_wave: final_snapshot.wave,
            pellets_eaten,
            power_pellets_eaten,
            ghosts_eaten,
            lives_lost,
            waves_cleared,
            phase_changes,
            anomalies,
        },
        anomaly_records,
        finished_tick: last_tick,
    }
}

/// Greedy stand-in for a human: head for the nearest pellet, refuse moves
/// onto trail cells or next to a hunting ghost, wander when boxed in.
fn choose_bot_direction(
    engine: &GameEngine,
    snapshot: &Snapshot,
    pellets: &BTreeSet<(i32, i32)>,
    rng: &mut Rng,
) -> Direction {
    let grid = engine.grid();
    let (px, py) = (snapshot.player.x, snapshot.player.y);
    let hazards: BTreeSet<(i32, i32)> = snapshot.hazards.iter().map(|h| (h.x, h.y)).collect();
    let hunters: Vec<(i32, i32)> = snapshot
        .ghosts
        .iter()
        .filter(|ghost| matches!(ghost.mode, GhostMode::Chase | GhostMode::Scatter))
        .map(|ghost| (ghost.x, ghost.y))
        .collect();

    let mut legal = Vec::new();
    let mut safe = Vec::new();
    for dir in Direction::PRIORITY {
        let Some(cell) = grid.step_from(Vec2 { x: px, y: py }, dir) else {
            continue;
        };
        legal.push((dir, cell));
        let near_hunter = hunters
            .iter()
            .any(|&(gx, gy)| manhattan(cell.x, cell.y, gx, gy) <= 2);
        if !hazards.contains(&(cell.x, cell.y)) && !near_hunter {
            safe.push((dir, cell));
        }
    }
    if legal.is_empty() {
        return Direction::None;
    }
    let candidates = if safe.is_empty() { &legal } else { &safe };
    if pellets.is_empty() {
        return candidates[rng.pick_index(candidates.len())].0;
    }

    candidates
        .iter()
        .min_by_key(|(_, cell)| {
            pellets
                .iter()
                .map(|&(fx, fy)| manhattan(cell.x, cell.y, fx, fy))
                .min()
                .unwrap_or(i32::MAX)
        })
        .map(|&(dir, _)| dir)
        .unwrap_or(Direction::None)
}

fn collect_snapshot_anomalies(
    snapshot: &Snapshot,
    grid: &Grid,
    config: &GameConfig,
    initial_pellets: u32,
) -> Vec<String> {
    let mut anomalies = Vec::new();

    if !grid.is_walkable(snapshot.player.x, snapshot.player.y) {
        anomalies.push(format!(
            "player off the walkable grid: ({}, {})",
            snapshot.player.x, snapshot.player.y
        ));
    }
    if snapshot.ghosts.len() != 4 {
        anomalies.push(format!("ghost count is {}, expected 4", snapshot.ghosts.len()));
    }
    for ghost in &snapshot.ghosts {
        if !grid.is_walkable(ghost.x, ghost.y) {
            anomalies.push(format!(
                "ghost {:?} off the walkable grid: ({}, {})",
                ghost.name, ghost.x, ghost.y
            ));
        }
    }

    let max_ttl = trail_ttl_ticks(
        config.trail_base_ttl_ticks,
        config.trail_wave_bonus_ticks,
        snapshot.wave,
    );
    for hazard in &snapshot.hazards {
        if hazard.ttl == 0 || hazard.ttl > max_ttl {
            anomalies.push(format!(
                "hazard lifetime out of range at ({}, {}): {} of max {}",
                hazard.x, hazard.y, hazard.ttl, max_ttl
            ));
        }
    }

    if snapshot.lives > config.starting_lives {
        anomalies.push(format!("lives grew to {}", snapshot.lives));
    }
    if snapshot.power_ticks > config.frightened_ticks {
        anomalies.push(format!("power timer overflow: {}", snapshot.power_ticks));
    }
    if snapshot.pellets_left > initial_pellets {
        anomalies.push(format!(
            "pellet count grew: {} of {}",
            snapshot.pellets_left, initial_pellets
        ));
    }
    anomalies
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = normalize_seed(cli.seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }));
    let default_ticks = (TICK_RATE as u64) * 60 * 3;

    if cli.single || cli.ticks.is_some() {
        let max_ticks = cli.ticks.unwrap_or(default_ticks).clamp(1, 20 * 60 * 60);
        return vec![Scenario {
            name: format!("custom-{max_ticks}t"),
            max_ticks,
            seed,
        }];
    }

    vec![
        Scenario {
            name: "quick-check".to_string(),
            max_ticks: (TICK_RATE as u64) * 60,
            seed,
        },
        Scenario {
            name: "endurance-check".to_string(),
            max_ticks: default_ticks,
            seed: normalize_seed(seed as u64 + 1),
        },
    ]
}

fn manhattan(ax: i32, ay: i32, bx: i32, by: i32) -> i32 {
    (ax - bx).abs() + (ay - by).abs()
}

fn normalize_seed(seed: u64) -> u32 {
    seed as u32
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_run_id(seed: u32, timestamp_ms: u64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn build_run_summary(
    run_id: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    scenarios: Vec<ScenarioResultLine>,
    reason_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
) -> RunSummary {
    RunSummary {
        run_id,
        started_at_ms,
        finished_at_ms,
        scenario_count: scenarios.len(),
        anomaly_count,
        reason_counts,
        scenarios,
    }
}

fn emit_log(
    level: &str,
    event: &str,
    run_id: &str,
    scenario: Option<&str>,
    seed: Option<u32>,
    tick: Option<u64>,
    details: Value,
) {
    let log_line = StructuredLogLine {
        timestamp_ms: now_ms(),
        level: level.to_string(),
        event: event.to_string(),
        run_id: run_id.to_string(),
        scenario: scenario.map(|value| value.to_string()),
        seed,
        tick,
        details,
    };
    eprintln!(
        "{}",
        serde_json::to_string(&log_line).expect("structured log should serialize")
    );
}

fn end_reason_key(reason: EndReason) -> String {
    match reason {
        EndReason::GameOver => "game_over",
        EndReason::TickLimit => "tick_limit",
    }
    .to_string()
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).expect("run summary should serialize");
    std::fs::write(path, summary_text)
}
