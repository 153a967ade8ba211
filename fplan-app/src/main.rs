use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use fplan_config::{AppConfig, ConfigError, ReportFormat};
use fplan_frontend::{CliOptions, FrontendError};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// 解析 DXF / 二进制 CAD 平面图，推断房间并输出报告。
#[derive(Debug, Parser)]
#[command(name = "fplan", version)]
struct Args {
    /// 配置文件路径（默认读取 FPLAN_CONFIG 或 ./config/default.toml）
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// 以 JSON 输出推断结果
    #[arg(long)]
    json: bool,

    /// 额外渲染一份 SVG 到指定路径
    #[arg(long, value_name = "OUT")]
    svg: Option<PathBuf>,

    /// 图纸文件；省略时尝试 FPLAN_SAMPLE_DRAWING，再回退到内置示例
    input: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();
    let loaded = load_configuration(args.config.as_deref());
    let config = loaded.as_ref().cloned().unwrap_or_default();
    init_logging(&config);
    if let Err(err) = &loaded {
        report_config_error(err);
    }
    info!("启动 fplan");

    if let Err(err) = run(args, &config) {
        error!(error = %err, "执行失败");
        eprintln!("错误：{err:#}");
        if err
            .downcast_ref::<FrontendError>()
            .is_some_and(FrontendError::suggests_conversion)
        {
            eprintln!("提示：无法识别该图纸，请转换为 DXF 格式后重试。");
        }
        std::process::exit(1);
    }
}

fn run(args: Args, config: &AppConfig) -> Result<()> {
    let options = CliOptions {
        input: args.input,
        format: args.json.then_some(ReportFormat::Json),
        svg: args.svg,
    };
    fplan_frontend::run_cli(&options, config).context("处理平面图失败")?;
    Ok(())
}

/// 显式路径优先，否则自动发现；出错时由调用方在日志初始化后报告并回退到默认值。
fn load_configuration(override_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match override_path {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::discover(),
    }
}

fn report_config_error(err: &ConfigError) {
    match err {
        ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
            warn!(path = %path.display(), error = %err, "加载配置失败，使用默认配置");
        }
        ConfigError::Context { .. } => {
            warn!(error = %err, "加载配置失败，使用默认配置");
        }
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
