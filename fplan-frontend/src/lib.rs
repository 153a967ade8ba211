pub mod canvas;
pub mod cli;
pub mod errors;
pub mod loader;
pub mod svg_surface;

pub use canvas::{
    CanvasOptions, CanvasRenderer, DrawCommand, DrawSurface, LayerStyle, RecordingSurface,
    RenderFailure, RenderReport, StrokeStyle, SurfaceError,
};
pub use cli::CliOptions;
pub use errors::FrontendError;
pub use svg_surface::SvgSurface;

use fplan_config::AppConfig;
use tracing::info;

/// 执行一次 CLI 调用。
pub fn run_cli(options: &CliOptions, config: &AppConfig) -> Result<(), FrontendError> {
    info!(input = ?options.input, "启动 CLI 前端");
    cli::run(options, config)
}
