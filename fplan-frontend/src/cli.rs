use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use fplan_config::{AppConfig, ReportFormat};
use fplan_core::geometry::Bounds2D;
use fplan_engine::FloorStructure;
use fplan_io::{BinaryLayout, CadFacade, DrawingOrigin};
use serde::Serialize;
use tracing::{info, warn};

use crate::canvas::{CanvasOptions, CanvasRenderer, RenderReport};
use crate::errors::FrontendError;
use crate::loader::{DrawingSource, LoadedPlan, load_plan_from_env_or_demo, load_plan_from_path};
use crate::svg_surface::SvgSurface;

/// 一次 CLI 调用的参数。`format` 为空时使用配置中的默认格式。
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub input: Option<PathBuf>,
    pub format: Option<ReportFormat>,
    pub svg: Option<PathBuf>,
}

/// 加载图纸、推断房间并输出报告；指定 `svg` 时额外渲染一份 SVG。
pub fn run(options: &CliOptions, config: &AppConfig) -> Result<(), FrontendError> {
    let loader = CadFacade::new();
    let plan = match &options.input {
        Some(path) => load_plan_from_path(path, &loader)?,
        None => load_plan_from_env_or_demo(&loader),
    };

    let format = options.format.unwrap_or(config.frontend.default_format);
    match format {
        ReportFormat::Summary => print!("{}", summary_report(&plan)),
        ReportFormat::Json => println!("{}", json_report(&plan)?),
    }

    if let Some(path) = &options.svg {
        let report = write_svg(&plan, config, path)?;
        if !report.is_complete() {
            warn!(failures = report.failures.len(), "部分图元未能渲染");
        }
        if format == ReportFormat::Summary {
            println!(
                "已写入 SVG：{}（绘制 {} 个图元，失败 {} 个）",
                path.display(),
                report.drawn,
                report.failures.len()
            );
        }
    }
    Ok(())
}

/// 人类可读的概要：来源、范围、要素数量与逐个房间信息。
pub fn summary_report(plan: &LoadedPlan) -> String {
    Summary(plan).to_string()
}

struct Summary<'a>(&'a LoadedPlan);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plan = self.0;
        let structure = &plan.structure;
        writeln!(f, "平面图推断结果")?;
        match &plan.source {
            DrawingSource::File(path) => writeln!(f, "来源文件：{}", path.display())?,
            DrawingSource::Demo => writeln!(f, "来源文件：<内置示例>")?,
        }
        writeln!(f, "解析方式：{}", describe_origin(&plan.origin))?;
        writeln!(f, "图纸范围：{}", format_bounds(&structure.bounds))?;
        writeln!(
            f,
            "图元 {} 个，墙体 {} 段，门 {} 扇，窗 {} 扇",
            plan.entities.len(),
            structure.walls.len(),
            structure.doors.len(),
            structure.windows.len()
        )?;
        writeln!(f, "房间 {} 个：", structure.rooms.len())?;
        for room in &structure.rooms {
            writeln!(
                f,
                "  - {} {} [{}] 面积={:.2} 墙={} 门={} 窗={}",
                room.id,
                room.name,
                room.kind,
                room.area,
                room.walls.len(),
                room.doors.len(),
                room.windows.len()
            )?;
        }
        Ok(())
    }
}

/// JSON 输出的外层结构：启发式重建的结果通过 `approximate` 显式标注。
#[derive(Serialize)]
struct JsonReport<'a> {
    origin: &'a DrawingOrigin,
    approximate: bool,
    structure: &'a FloorStructure,
}

/// 推断结果的 JSON 表示，附带图纸来源与是否为近似结果。
pub fn json_report(plan: &LoadedPlan) -> Result<String, FrontendError> {
    let report = JsonReport {
        origin: &plan.origin,
        approximate: plan.origin.is_approximate(),
        structure: &plan.structure,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

/// 按配置的画布尺寸渲染图元并写入 SVG 文件。
pub fn write_svg(
    plan: &LoadedPlan,
    config: &AppConfig,
    path: &Path,
) -> Result<RenderReport, FrontendError> {
    let mut surface = SvgSurface::new(config.canvas.width, config.canvas.height);
    let renderer = CanvasRenderer::new(CanvasOptions {
        margin: config.canvas.margin,
    });
    let report = renderer.render(&plan.entities, &mut surface);
    fs::write(path, surface.to_svg()).map_err(|source| FrontendError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        path = %path.display(),
        drawn = report.drawn,
        failures = report.failures.len(),
        "SVG 已写入"
    );
    Ok(report)
}

fn describe_origin(origin: &DrawingOrigin) -> String {
    match origin {
        DrawingOrigin::Vector => "DXF 矢量解析".to_string(),
        DrawingOrigin::Heuristic { layout, version } => {
            let layout = match layout {
                BinaryLayout::Triangular => "三角形布局",
                BinaryLayout::Synthesized => "按文件大小合成",
            };
            format!(
                "二进制图纸启发式重建（近似结果，版本 {}，{}）",
                version.as_deref().unwrap_or("未知"),
                layout
            )
        }
    }
}

fn format_bounds(bounds: &Bounds2D) -> String {
    format!(
        "({:.2}, {:.2}) - ({:.2}, {:.2})",
        bounds.min_x(),
        bounds.min_y(),
        bounds.max_x(),
        bounds.max_y()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_lists_every_room() {
        let plan = LoadedPlan::demo();
        let summary = summary_report(&plan);
        assert!(summary.contains("<内置示例>"));
        assert!(summary.contains("DXF 矢量解析"));
        assert!(summary.contains("(0.00, -20.00) - (400.00, 300.00)"));
        for room in &plan.structure.rooms {
            assert!(summary.contains(&format!("{} {}", room.id, room.name)));
        }
    }

    #[test]
    fn json_report_is_valid_json() {
        let plan = LoadedPlan::demo();
        let json = json_report(&plan).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value["structure"]["rooms"].as_array().map(Vec::len),
            Some(plan.structure.rooms.len())
        );
        assert_eq!(value["origin"], "Vector");
        assert_eq!(value["approximate"], false);
    }

    #[test]
    fn json_report_labels_heuristic_reconstruction() {
        let mut plan = LoadedPlan::demo();
        plan.origin = DrawingOrigin::Heuristic {
            layout: BinaryLayout::Synthesized,
            version: Some("AC1032".to_string()),
        };
        let json = json_report(&plan).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["approximate"], true);
        assert_eq!(value["origin"]["Heuristic"]["layout"], "Synthesized");
        assert_eq!(value["origin"]["Heuristic"]["version"], "AC1032");
    }

    #[test]
    fn heuristic_origin_is_labelled_approximate() {
        let origin = DrawingOrigin::Heuristic {
            layout: BinaryLayout::Triangular,
            version: Some("AC1032".to_string()),
        };
        let text = describe_origin(&origin);
        assert!(text.contains("近似"));
        assert!(text.contains("AC1032"));
    }

    #[test]
    fn write_svg_reports_io_errors() {
        let plan = LoadedPlan::demo();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.svg");
        let report = write_svg(&plan, &AppConfig::default(), &path).unwrap();
        assert!(report.is_complete());
        assert!(fs::read_to_string(&path).unwrap().contains("<svg"));

        let missing = dir.path().join("missing").join("plan.svg");
        let err = write_svg(&plan, &AppConfig::default(), &missing).unwrap_err();
        assert!(matches!(err, FrontendError::Write { .. }));
    }
}
