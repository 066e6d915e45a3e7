//! Inspection and measurement tools for scenepack containers.
//!
//! This crate explains what a container holds and where its bytes go:
//!
//! - Container header and manifest layout
//! - Per-entity compression ratio and digest
//! - Per-entity command counts and logical size
//!
//! # Design Principles
//!
//! - **First-class tooling** - These tools are part of the product, not afterthoughts.
//! - **Human-readable output** - Make it easy to see what quantization bought.

use anyhow::{Context, Result};
use buffer::EntityKind;
use serde::Serialize;
use wire::{decode_container, Limits};

/// Container-level summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeaderReport {
    pub version: u16,
    pub flags: u16,
    pub block_count: u32,
    pub container_bytes: usize,
}

/// One entity block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockReport {
    pub name: String,
    pub entity_kind: EntityKind,
    pub offset: u32,
    pub uncompressed_len: u32,
    pub compressed_len: u32,
    /// `uncompressed_len / compressed_len`; zero for an empty block.
    pub compression_ratio: f64,
    pub digest: String,
    pub commands: usize,
    pub creates: usize,
    pub updates: usize,
    pub quantized_commands: usize,
    pub logical_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectReport {
    pub header: HeaderReport,
    pub blocks: Vec<BlockReport>,
    pub total_logical_size: usize,
}

impl InspectReport {
    /// Blocks sorted by compressed size, largest first.
    #[must_use]
    pub fn largest_blocks(&self) -> Vec<&BlockReport> {
        let mut blocks: Vec<&BlockReport> = self.blocks.iter().collect();
        blocks.sort_by(|a, b| {
            b.compressed_len
                .cmp(&a.compressed_len)
                .then_with(|| a.name.cmp(&b.name))
        });
        blocks
    }
}

/// Decodes a container and reports its layout and per-entity contents.
pub fn inspect_container(bytes: &[u8], limits: &Limits) -> Result<InspectReport> {
    let container = decode_container(bytes, limits).context("decode container framing")?;
    let tracker = codec::parse_with_limits(bytes, limits).context("parse entity blocks")?;

    let mut blocks = Vec::with_capacity(container.manifest.len());
    for entry in &container.manifest.entries {
        let id = codec::EntityId::new(entry.name.as_str())
            .with_context(|| format!("entity id {:?}", entry.name))?;
        let history = tracker
            .history(&id)
            .with_context(|| format!("missing history for {id}"))?;
        let creates = history.commands().iter().filter(|c| c.is_create()).count();
        let quantized_commands = history
            .commands()
            .iter()
            .filter(|c| c.channels().iter().any(|(_, data)| data.is_quantized()))
            .count();
        blocks.push(BlockReport {
            name: entry.name.clone(),
            entity_kind: history.entity_kind(),
            offset: entry.offset,
            uncompressed_len: entry.uncompressed_len,
            compressed_len: entry.compressed_len,
            compression_ratio: ratio(entry.uncompressed_len, entry.compressed_len),
            digest: format!("{:016x}", entry.digest),
            commands: history.len(),
            creates,
            updates: history.len() - creates,
            quantized_commands,
            logical_size: history.logical_size(),
        });
    }

    Ok(InspectReport {
        header: HeaderReport {
            version: container.header.version,
            flags: container.header.flags,
            block_count: container.header.block_count,
            container_bytes: bytes.len(),
        },
        blocks,
        total_logical_size: tracker.total_size(),
    })
}

/// Per-entity logical sizes, in first-created-first order.
pub fn measure_container(bytes: &[u8], limits: &Limits) -> Result<Vec<(String, usize)>> {
    let tracker = codec::parse_with_limits(bytes, limits).context("parse container")?;
    Ok(tracker
        .histories()
        .map(|history| (history.entity_id().to_string(), history.logical_size()))
        .collect())
}

fn ratio(uncompressed: u32, compressed: u32) -> f64 {
    if compressed == 0 {
        0.0
    } else {
        f64::from(uncompressed) / f64::from(compressed)
    }
}

/// Renders a report for terminals.
#[must_use]
pub fn format_report(report: &InspectReport) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    let header = report.header;
    let _ = writeln!(
        out,
        "version: {} flags: 0x{:04x} blocks: {} size: {} bytes",
        header.version, header.flags, header.block_count, header.container_bytes
    );
    let _ = writeln!(out, "logical size: {} bytes", report.total_logical_size);
    out.push_str("blocks:\n");
    for block in &report.blocks {
        let _ = writeln!(
            out,
            "  {} ({}): {} commands ({} quantized), logical {} bytes, stored {} -> {} bytes ({:.2}x) @{} digest {}",
            block.name,
            block.entity_kind.name(),
            block.commands,
            block.quantized_commands,
            block.logical_size,
            block.uncompressed_len,
            block.compressed_len,
            block.compression_ratio,
            block.offset,
            block.digest
        );
    }
    out
}
