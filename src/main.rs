use anyhow::Result;
use clap::Parser;

use worksheet_vision_eval::cli::Cli;
use worksheet_vision_eval::config::Config;
use worksheet_vision_eval::logger;
use worksheet_vision_eval::orchestrator::App;

#[tokio::main]
async fn main() -> Result<()> {
    // 读入 .env（不存在时忽略）
    let _ = dotenvy::dotenv();

    // 初始化日志
    logger::init();

    // 解析命令行并加载配置
    let cli = Cli::parse();
    let config = Config::resolve(cli).await?;

    // 初始化并运行应用
    App::initialize(config)?.run().await?;

    Ok(())
}
