use clap::Parser;
use tsunami_evac::utils::{logger, validation::Validate};
use tsunami_evac::{AnalysisRunner, CliConfig, FilePipeline, LocalStorage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let parsed = CliConfig::parse();

    // 初始化日誌
    logger::init_logger(parsed.verbose, parsed.json_logs);

    tracing::info!("Starting tsunami-evac CLI");

    // 載入需求設定檔並整理後處理選項
    let config = match parsed.resolve() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Failed to resolve configuration: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    };
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    // 輸入與輸出路徑皆相對於目前目錄
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
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ Impact analysis failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = e.exit_code();
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
