use anyhow::Context;
use clap::Parser;
use tsunami_evac::core::ConfigProvider;
use tsunami_evac::utils::{logger, validation::Validate};
use tsunami_evac::{AnalysisRunner, FilePipeline, LocalStorage, TomlConfig};

#[derive(Parser)]
#[command(name = "toml-impact")]
#[command(about = "Tsunami evacuation impact analysis driven by a TOML file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "impact-config.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Override performance.worker_threads
    #[arg(long)]
    workers: Option<usize>,

    /// Validate inputs and print the plan without computing anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 載入 TOML 配置
    let mut config = TomlConfig::from_file(&args.config)
        .with_context(|| format!("failed to load config file '{}'", args.config))?;

    // 初始化日誌
    logger::init_logger(args.verbose, config.json_logs());

    tracing::info!("🚀 Starting TOML-based impact analysis");
    tracing::info!("📁 Configuration loaded from: {}", args.config);

    // 應用命令列覆蓋設定
    if let Some(workers) = args.workers {
        config.performance.worker_threads = Some(workers);
        tracing::info!("🔧 Worker threads overridden to: {}", workers);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    tracing::info!("✅ Configuration loaded and validated successfully");

    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        perform_dry_run(&config).await?;
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(".");
    let pipeline = FilePipeline::new(storage, config);
    let runner = AnalysisRunner::new_with_monitoring(pipeline, monitor_enabled);

    match runner.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Impact analysis completed successfully!");
            println!("✅ Impact analysis completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Impact analysis failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            let exit_code = e.exit_code();
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!("  Analysis: {}", config.analysis.name);
    if !config.analysis.description.is_empty() {
        println!("  Description: {}", config.analysis.description);
    }
    println!("  Hazard: {} ({})", config.hazard.path, config.hazard.unit);
    println!("  Exposure: {}", config.exposure.path);
    println!("  Output: {}", config.output_path());
    println!("  Worker Threads: {}", config.worker_threads());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

async fn perform_dry_run(config: &TomlConfig) -> anyhow::Result<()> {
    println!("🔍 Dry Run Analysis:");
    println!();

    // 輸入檔案檢查
    println!("📡 Inputs:");
    for (label, path) in [("Hazard", &config.hazard.path), ("Exposure", &config.exposure.path)] {
        let exists = tokio::fs::try_exists(path)
            .await
            .with_context(|| format!("cannot access {} raster '{}'", label, path))?;
        let status = if exists { "✅ found" } else { "❌ missing" };
        println!("  {}: {} ({})", label, path, status);
    }

    // 門檻分析
    println!();
    println!("🌊 Thresholds (metres):");
    let thresholds = config.thresholds();
    if let Some((evacuation, bands)) = thresholds.split_last() {
        for pair in thresholds.windows(2) {
            println!("  Band: {} - {} m", pair[0], pair[1]);
        }
        if bands.is_empty() {
            println!("  No intermediate bands");
        }
        println!("  Evacuation threshold: {} m", evacuation);
    }

    // 最低需求
    println!();
    println!("🍚 Minimum Needs ({}):", config.minimum_needs.name);
    for need in &config.minimum_needs.needs {
        println!(
            "  {}: {} {} per person ({}, rounding {:?})",
            need.name, need.per_person, need.unit, need.frequency, need.rounding
        );
    }

    // 後處理
    println!();
    println!("🛠️ Postprocessors:");
    let post = config.postprocessors();
    if post.gender.is_none() && post.age.is_none() {
        println!("  None");
    }
    if let Some(gender) = post.gender {
        println!("  ✅ Gender (female ratio {})", gender.female);
    }
    if let Some(age) = post.age {
        println!(
            "  ✅ Age (youth {}, adult {}, elderly {})",
            age.youth, age.adult, age.elderly
        );
    }

    println!();
    println!("💾 Output Configuration:");
    println!("  Path: {}", config.output_path());
    println!("  Raster format: {}", config.raster_format());
    println!("  Tile rows: {}", config.tile_rows());

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");

    Ok(())
}
