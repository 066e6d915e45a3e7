use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use buffer::{EntityKind, FloatMatrix, Matrix};
use clap::Parser;
use codec::{
    flatten, parse, CommandBuilder, EntityId, Frame, QuantizationInfo, UpdateTracker,
};
use serde::Serialize;
use tools::inspect_container;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wire::Limits;

#[derive(Parser)]
#[command(
    name = "demo-sim",
    version,
    about = "Deterministic animated-scene capture generator"
)]
struct Cli {
    /// Number of frames to simulate.
    #[arg(long, default_value_t = 60)]
    frames: u32,
    /// Vertices per side of the jelly grid.
    #[arg(long, default_value_t = 16)]
    grid: u32,
    /// Number of marble instances.
    #[arg(long, default_value_t = 32)]
    marbles: u32,
    /// Number of frame layers.
    #[arg(long, default_value_t = 4)]
    layers: u32,
    /// RNG seed for deterministic results.
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Absolute quantization tolerance; the scene is stored unquantized if omitted.
    #[arg(long)]
    tolerance: Option<f32>,
    /// Output directory for the capture.
    #[arg(long, default_value = "captures")]
    out_dir: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if cli.frames == 0 {
        anyhow::bail!("--frames must be at least 1");
    }
    fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("create output dir {}", cli.out_dir.display()))?;

    let scene = Scene::new(&cli)?;
    let mut tracker = UpdateTracker::new();
    for frame in 0..cli.frames {
        scene.record_frame(&mut tracker, frame)?;
    }
    let original_size = tracker.total_size();
    let original_frames = replay_all(&tracker)?;
    info!(
        entities = tracker.len(),
        frames = cli.frames,
        logical_size = original_size,
        "recorded scene"
    );

    let quantization = match cli.tolerance {
        Some(tolerance) => {
            let infos = tracker.quantize(tolerance).context("quantize scene")?;
            for info in infos.values() {
                if !info.within_tolerance() {
                    warn!(entity = %info.entity_id, max_error = info.max_error, "tolerance not met");
                }
            }
            infos
        }
        None => BTreeMap::new(),
    };

    let bytes = flatten(&tracker).context("flatten scene")?;
    let parsed = parse(&bytes).context("re-parse scene")?;
    if parsed.measure() != tracker.measure() {
        anyhow::bail!("parsed container measures differently from the recorded scene");
    }
    let max_error = validate_reconstruction(&original_frames, &parsed)?;
    let bound = quantization
        .values()
        .map(|info| info.max_error)
        .fold(cli.tolerance.unwrap_or(0.0), f32::max);
    if max_error > bound {
        anyhow::bail!("reconstruction error {max_error} exceeds {bound}");
    }

    let report = inspect_container(&bytes, &Limits::default()).context("inspect container")?;
    let path = cli.out_dir.join("scene.spk");
    fs::write(&path, &bytes).with_context(|| format!("write {}", path.display()))?;

    let summary = Summary::new(&cli, original_size, &tracker, &bytes, max_error, &quantization, &report);
    write_summary_json(&cli.out_dir, &summary)?;
    info!(
        container_bytes = bytes.len(),
        logical_size = summary.quantized_logical_size,
        max_error,
        out = %cli.out_dir.display(),
        "wrote capture"
    );
    Ok(())
}

fn replay_all(tracker: &UpdateTracker) -> Result<BTreeMap<EntityId, Vec<Frame>>> {
    tracker
        .histories()
        .map(|history| {
            let frames = history
                .replay()
                .with_context(|| format!("replay {}", history.entity_id()))?;
            Ok((history.entity_id().clone(), frames))
        })
        .collect()
}

/// Largest per-element difference between the recorded frames and the parsed scene.
fn validate_reconstruction(
    original: &BTreeMap<EntityId, Vec<Frame>>,
    parsed: &UpdateTracker,
) -> Result<f32> {
    let replayed = replay_all(parsed)?;
    let mut max_error = 0.0f32;
    for (id, frames) in original {
        let other = replayed
            .get(id)
            .with_context(|| format!("entity {id} missing after parse"))?;
        if other.len() != frames.len() {
            anyhow::bail!("entity {id}: {} frames after parse, {} recorded", other.len(), frames.len());
        }
        for (a, b) in frames.iter().zip(other) {
            max_error = max_error.max(a.max_abs_diff(b)?);
        }
    }
    Ok(max_error)
}

fn write_summary_json(out_dir: &Path, summary: &Summary) -> Result<()> {
    let path = out_dir.join("summary.json");
    let contents = serde_json::to_string_pretty(summary).context("serialize summary")?;
    fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// The animated demo scene: a jelly grid, bobbing marbles and fading layers.
struct Scene {
    grid: usize,
    layers: usize,
    marble_base: Vec<[f32; 3]>,
    marble_phase: Vec<f32>,
    marble_colors: Vec<([f32; 3], [f32; 3])>,
    jelly: EntityId,
    marbles: EntityId,
    frame_layers: EntityId,
}

impl Scene {
    fn new(cli: &Cli) -> Result<Self> {
        let mut rng = Rng::new(cli.seed);
        let count = cli.marbles.max(1) as usize;
        let mut marble_base = Vec::with_capacity(count);
        let mut marble_phase = Vec::with_capacity(count);
        let mut marble_colors = Vec::with_capacity(count);
        for _ in 0..count {
            marble_base.push([rng.range(-4.0, 4.0), 0.0, rng.range(-4.0, 4.0)]);
            marble_phase.push(rng.range(0.0, std::f32::consts::TAU));
            marble_colors.push((
                [rng.unit(), rng.unit(), rng.unit()],
                [rng.unit(), rng.unit(), rng.unit()],
            ));
        }
        Ok(Self {
            grid: cli.grid.max(2) as usize,
            layers: cli.layers.max(1) as usize,
            marble_base,
            marble_phase,
            marble_colors,
            jelly: EntityId::new("jelly_base")?,
            marbles: EntityId::new("marbles_base")?,
            frame_layers: EntityId::new("frame_layers")?,
        })
    }

    fn record_frame(&self, tracker: &mut UpdateTracker, frame: u32) -> Result<()> {
        let t = frame as f32 / 30.0;
        let first = frame == 0;

        let jelly = builder(&self.jelly, EntityKind::Mesh, first).positions(self.jelly_positions(t)?);
        tracker.record(jelly.build()?)?;

        let mut marbles = builder(&self.marbles, EntityKind::InstancedMesh, first)
            .positions(self.marble_positions(t)?);
        // Colors blend slowly; record them every tenth frame.
        if first || frame % 10 == 0 {
            marbles = marbles.colors(self.marble_colors(t)?);
        }
        if first {
            marbles = marbles.rotations(self.marble_rotations()?);
        }
        tracker.record(marbles.build()?)?;

        let mut layers = builder(&self.frame_layers, EntityKind::Frame, first)
            .opacity(self.layer_opacity(t)?);
        if first {
            layers = layers.visibility(Matrix::new(self.layers, 1, vec![1.0; self.layers])?);
        }
        tracker.record(layers.build()?)?;
        Ok(())
    }

    fn jelly_positions(&self, t: f32) -> Result<FloatMatrix> {
        let n = self.grid;
        let mut data = Vec::with_capacity(n * n * 3);
        for row in 0..n {
            for col in 0..n {
                let x = col as f32 / (n - 1) as f32 * 2.0 - 1.0;
                let z = row as f32 / (n - 1) as f32 * 2.0 - 1.0;
                let y = 0.1 * (4.0 * x - 3.0 * t).sin() * (2.0 * z + t).cos();
                data.extend_from_slice(&[x, y, z]);
            }
        }
        Ok(Matrix::new(n * n, 3, data)?)
    }

    fn marble_positions(&self, t: f32) -> Result<FloatMatrix> {
        let mut data = Vec::with_capacity(self.marble_base.len() * 3);
        for (base, phase) in self.marble_base.iter().zip(&self.marble_phase) {
            let bob = 0.25 * (2.0 * t + phase).sin().abs();
            data.extend_from_slice(&[base[0], base[1] + bob, base[2]]);
        }
        Ok(Matrix::new(self.marble_base.len(), 3, data)?)
    }

    fn marble_colors(&self, t: f32) -> Result<FloatMatrix> {
        let blend = 0.5 + 0.5 * (0.5 * t).sin();
        let mut data = Vec::with_capacity(self.marble_colors.len() * 3);
        for (from, to) in &self.marble_colors {
            for channel in 0..3 {
                data.push(from[channel] + (to[channel] - from[channel]) * blend);
            }
        }
        Ok(Matrix::new(self.marble_colors.len(), 3, data)?)
    }

    fn marble_rotations(&self) -> Result<FloatMatrix> {
        let count = self.marble_base.len();
        let data = (0..count).flat_map(|_| [0.0, 0.0, 0.0, 1.0]).collect();
        Ok(Matrix::new(count, 4, data)?)
    }

    fn layer_opacity(&self, t: f32) -> Result<FloatMatrix> {
        let data = (0..self.layers)
            .map(|layer| 0.5 + 0.5 * (t + layer as f32 * 0.7).cos())
            .collect();
        Ok(Matrix::new(self.layers, 1, data)?)
    }
}

fn builder(id: &EntityId, kind: EntityKind, create: bool) -> CommandBuilder {
    if create {
        CommandBuilder::create(id.clone(), kind)
    } else {
        CommandBuilder::update(id.clone(), kind)
    }
}

struct Rng {
    state: u64,
}

impl Rng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.state >> 32) as u32
    }

    fn unit(&mut self) -> f32 {
        self.next_u32() as f32 / u32::MAX as f32
    }

    fn range(&mut self, min: f32, max: f32) -> f32 {
        min + (max - min) * self.unit()
    }
}

#[derive(Debug, Serialize)]
struct EntitySummary {
    logical_size: usize,
    compressed_bytes: u32,
    commands: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    quantization: Option<QuantizationSummary>,
}

#[derive(Debug, Serialize)]
struct QuantizationSummary {
    granularity: f32,
    original_size: usize,
    quantized_size: usize,
    ratio: f64,
    max_error: f32,
    mean_error: f32,
    within_tolerance: bool,
    channels: BTreeMap<String, f32>,
}

impl From<&QuantizationInfo> for QuantizationSummary {
    fn from(info: &QuantizationInfo) -> Self {
        Self {
            granularity: info.granularity,
            original_size: info.original_size,
            quantized_size: info.quantized_size,
            ratio: info.ratio(),
            max_error: info.max_error,
            mean_error: info.mean_error,
            within_tolerance: info.within_tolerance(),
            channels: info
                .channels
                .iter()
                .map(|channel| (channel.channel.name().to_string(), channel.step))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Summary {
    frames: u32,
    seed: u64,
    tolerance: Option<f32>,
    original_logical_size: usize,
    quantized_logical_size: usize,
    container_bytes: usize,
    max_reconstruction_error: f32,
    entities: BTreeMap<String, EntitySummary>,
}

impl Summary {
    fn new(
        cli: &Cli,
        original_logical_size: usize,
        tracker: &UpdateTracker,
        bytes: &[u8],
        max_error: f32,
        quantization: &BTreeMap<EntityId, QuantizationInfo>,
        report: &tools::InspectReport,
    ) -> Self {
        let entities = report
            .blocks
            .iter()
            .map(|block| {
                let quantization = quantization
                    .iter()
                    .find(|(id, _)| id.as_str() == block.name)
                    .map(|(_, info)| QuantizationSummary::from(info));
                (
                    block.name.clone(),
                    EntitySummary {
                        logical_size: block.logical_size,
                        compressed_bytes: block.compressed_len,
                        commands: block.commands,
                        quantization,
                    },
                )
            })
            .collect();
        Self {
            frames: cli.frames,
            seed: cli.seed,
            tolerance: cli.tolerance,
            original_logical_size,
            quantized_logical_size: tracker.total_size(),
            container_bytes: bytes.len(),
            max_reconstruction_error: max_error,
            entities,
        }
    }
}
