//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了CLI各子命令的实现。

use super::{Cli, Commands};
use crate::config::{Config, TierConfig};
use crate::manager::{get_cache, CacheManager};
use crate::metrics::get_metrics_string;
use anyhow::{Context, Result};
use std::time::Duration;

pub async fn execute(cli: &Cli) -> Result<()> {
    let config = Config::from_file(&cli.config)
        .with_context(|| format!("Failed to load config {}", cli.config.display()))?;

    if let Commands::Check = cli.command {
        config.validate().map_err(anyhow::Error::msg)?;
        print_config(&config);
        return Ok(());
    }

    CacheManager::init(config)
        .await
        .context("Failed to initialize caches")?;

    match &cli.command {
        Commands::Get(args) => {
            let cache = get_cache(&args.cache)?;
            match cache.get_bytes(&args.key).await? {
                Some(bytes) => println!("{}", String::from_utf8_lossy(&bytes)),
                None => println!("(miss)"),
            }
        }
        Commands::Set(args) => {
            let cache = get_cache(&args.target.cache)?;
            let ttl = args.ttl_ms.map(Duration::from_millis);
            cache
                .set_bytes(&args.target.key, args.value.as_bytes().to_vec(), ttl)
                .await?;
            println!("OK");
        }
        Commands::Delete(args) => {
            let cache = get_cache(&args.cache)?;
            cache.delete(&args.key).await?;
            println!("OK");
        }
        Commands::Metrics => {
            print!("{}", get_metrics_string());
        }
        Commands::Check => {}
    }
    Ok(())
}

fn print_config(config: &Config) {
    println!("=== Caches ===");
    let mut names: Vec<&String> = config.caches.keys().collect();
    names.sort();
    for name in names {
        let cache = &config.caches[name];
        println!(
            "{} (write_policy={:?}, coalesce_wrap={})",
            name, cache.write_policy, cache.coalesce_wrap
        );
        for (index, tier) in cache.tiers.iter().enumerate() {
            let kind = match tier {
                TierConfig::Memory(_) => "memory",
                TierConfig::Redis(_) => "redis",
            };
            println!(
                "  [{}] {} ({}) ttl={:?}",
                index,
                tier.name(),
                kind,
                tier.default_ttl(&config.global)
            );
        }
    }
}
