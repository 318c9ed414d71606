// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! sparcvp trace runner
//!
//! Builds the platform from a TOML configuration, optionally preloads a
//! memory image and replays a transaction trace through the cache
//! front-end, then reports the statistics.

use clap::{Parser, ValueEnum};
use sparcvp::core::config::PlatformConfig;
use sparcvp::core::platform::{load_trace, Platform, TransportMode};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Blocking transport, one access after the other
    Atomic,
    /// Pipelined request/response phases per channel
    SplitPhase,
}

impl From<Mode> for TransportMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Atomic => TransportMode::Atomic,
            Mode::SplitPhase => TransportMode::SplitPhase,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "sparcvp",
    version,
    about = "Replay a transaction trace through a LEON3 cache model"
)]
struct Cli {
    /// Transaction trace to replay
    trace: PathBuf,

    /// Platform configuration (TOML); defaults are used if omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Binary image preloaded into memory
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Load address of the image (defaults to the RAM base)
    #[arg(long, value_parser = parse_address)]
    image_address: Option<u32>,

    /// Transport mode
    #[arg(short, long, value_enum, default_value_t = Mode::Atomic)]
    mode: Mode,

    /// Write the statistics report as JSON
    #[arg(long)]
    report_json: Option<PathBuf>,
}

fn parse_address(text: &str) -> Result<u32, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse::<u32>(),
    };
    parsed.map_err(|e| format!("invalid address '{}': {}", text, e))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env, if present, before the logger reads the environment
    dotenvy::dotenv().ok();

    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    log::info!("Starting sparcvp...");

    let config = match &cli.config {
        Some(path) => PlatformConfig::load(path)?,
        None => {
            log::info!("No configuration given, using defaults");
            PlatformConfig::default()
        }
    };

    let image_address = cli.image_address.unwrap_or(config.memory.ram_start);
    let mut platform = Platform::new(config)?;

    if let Some(image) = &cli.image {
        platform.load_image(image, image_address)?;
    }

    let trace = load_trace(&cli.trace)?;
    let mode = TransportMode::from(cli.mode);
    let summary = platform.run(&trace, mode);

    platform.report();
    println!(
        "{} transactions, {} errors, {} snoop invalidations, finished at cycle {}",
        summary.transactions, summary.errors, summary.snoop_invalidations, summary.end_cycle
    );

    if let Some(path) = &cli.report_json {
        std::fs::write(path, platform.report_json(mode, summary)?)?;
        log::info!("Statistics written to {}", path.display());
    }

    Ok(())
}
