//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了CLI命令行接口。

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tiercache")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(short, long, default_value = "tiercache.toml", help = "Path to TOML config")]
    pub config: PathBuf,

    #[arg(long, default_value = "warn", help = "Log filter used when RUST_LOG is unset")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(name = "check", about = "Validate the config and list caches and tiers")]
    Check,

    #[command(name = "get", about = "Waterfall read of a key")]
    Get(KeyArgs),

    #[command(name = "set", about = "Write a value to every tier")]
    Set(SetArgs),

    #[command(name = "delete", about = "Delete a key from every tier")]
    Delete(KeyArgs),

    #[command(name = "metrics", about = "Print metrics collected by this process")]
    Metrics,
}

#[derive(Parser, Debug)]
pub struct KeyArgs {
    #[arg(short = 'n', long, help = "Cache name")]
    pub cache: String,

    #[arg(short, long, help = "Cache key")]
    pub key: String,
}

#[derive(Parser, Debug)]
pub struct SetArgs {
    #[command(flatten)]
    pub target: KeyArgs,

    #[arg(short, long, help = "Value, stored as raw UTF-8 bytes")]
    pub value: String,

    #[arg(short, long, help = "TTL override in milliseconds for every tier, 0 means no expiry")]
    pub ttl_ms: Option<u64>,
}

mod ops;

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    crate::telemetry::init_tracing("tiercache", &cli.log_level);
    ops::execute(&cli).await
}
