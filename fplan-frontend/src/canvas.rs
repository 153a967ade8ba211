//! 与具体 UI 框架无关的平面图渲染。
//!
//! 渲染器只负责坐标变换、图层排序与几何离散化，所有实际绘制都通过
//! [`DrawSurface`] 完成，单个图元失败只记录在 [`RenderReport`] 中而不中断渲染。

use std::f64::consts::TAU;

use fplan_core::document::{Entity, EntityKind, compute_bounds};
use fplan_core::geometry::{Bounds2D, Point2, Vector2};
use fplan_core::layers;
use glam::DVec2;
use thiserror::Error;
use tracing::{debug, warn};

/// 绘制顺序，靠前的先画（位于底层）。不在表中的图层按首次出现顺序排在最后。
pub const LAYER_ORDER: [&str; 7] = [
    layers::DIMENSIONS,
    layers::FURNITURE,
    layers::TEXT,
    layers::WINDOWS,
    layers::DOORS,
    layers::WALLS,
    layers::DEFAULT,
];

/// 空图纸时在画布中心显示的提示。
pub const EMPTY_PLACEHOLDER: &str = "暂无可显示的图元";

const PLACEHOLDER_FONT_SIZE: f64 = 14.0;
const MIN_FONT_SIZE: f64 = 6.0;
const DIMENSION_FONT_SIZE: f64 = 10.0;
const INSERT_MARKER_HALF: f64 = 6.0;
const ARC_MIN_SEGMENTS: usize = 16;
const ELLIPSE_MIN_SEGMENTS: usize = 32;
const CIRCLE_SEGMENTS_PER_TURN: f64 = 64.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub color: &'static str,
    pub width: f64,
}

/// 图层到线条样式的固定映射。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerStyle {
    pub color: &'static str,
    pub line_width: f64,
}

impl LayerStyle {
    pub const UNKNOWN: LayerStyle = LayerStyle {
        color: "#999999",
        line_width: 1.0,
    };

    pub fn for_layer(name: &str) -> LayerStyle {
        let (color, line_width) = match name {
            layers::WALLS => ("#2c3e50", 3.0),
            layers::DOORS => ("#e67e22", 2.0),
            layers::WINDOWS => ("#3498db", 2.0),
            layers::FURNITURE => ("#95a5a6", 1.0),
            layers::TEXT => ("#34495e", 1.0),
            layers::DIMENSIONS => ("#bdc3c7", 0.5),
            layers::DEFAULT => ("#333333", 1.0),
            _ => return Self::UNKNOWN,
        };
        LayerStyle { color, line_width }
    }

    #[inline]
    pub fn stroke(&self) -> StrokeStyle {
        StrokeStyle {
            color: self.color,
            width: self.line_width,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SurfaceError {
    #[error("绘制坐标包含非有限值")]
    NonFinite,
    #[error("绘制后端错误: {0}")]
    Backend(String),
}

/// 渲染目标。坐标均为屏幕像素，原点在左上角，y 轴向下。
pub trait DrawSurface {
    /// 画布尺寸 `(宽, 高)`。
    fn size(&self) -> (f64, f64);

    fn clear(&mut self);

    fn stroke_path(
        &mut self,
        points: &[Point2],
        closed: bool,
        style: &StrokeStyle,
    ) -> Result<(), SurfaceError>;

    fn stroke_circle(
        &mut self,
        center: Point2,
        radius: f64,
        style: &StrokeStyle,
    ) -> Result<(), SurfaceError>;

    fn fill_text(
        &mut self,
        position: Point2,
        text: &str,
        size: f64,
        color: &str,
    ) -> Result<(), SurfaceError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasOptions {
    /// 四周留白（像素）。
    pub margin: f64,
}

impl Default for CanvasOptions {
    fn default() -> Self {
        Self { margin: 20.0 }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RenderError {
    #[error("几何数据包含非有限坐标")]
    NonFinite,
    #[error("顶点数量不足（{0} 个），至少需要 2 个")]
    TooFewPoints(usize),
    #[error("半径必须为正数，实际为 {0}")]
    NonPositiveRadius(f64),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

/// 单个图元的渲染失败记录。
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFailure {
    /// 图元在输入列表中的下标。
    pub index: usize,
    pub kind: EntityKind,
    pub layer: String,
    pub error: RenderError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderReport {
    pub drawn: usize,
    pub failures: Vec<RenderFailure>,
}

impl RenderReport {
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// 世界坐标（y 向上）到屏幕坐标（y 向下）的等比变换。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub scale: f64,
    origin: DVec2,
    offset: DVec2,
}

impl ViewTransform {
    /// 按边界框与画布尺寸求缩放，使图纸在留白内居中。
    pub fn fit(bounds: &Bounds2D, size: (f64, f64), margin: f64) -> Self {
        let bounds = Bounds2D::or_fallback(Some(*bounds));
        let margin = margin.max(0.0);
        let available = DVec2::new(
            (size.0 - 2.0 * margin).max(1.0),
            (size.1 - 2.0 * margin).max(1.0),
        );
        let scale = (available.x / bounds.width()).min(available.y / bounds.height());
        let drawn = DVec2::new(bounds.width(), bounds.height()) * scale;
        Self {
            scale,
            origin: DVec2::new(bounds.min_x(), bounds.max_y()),
            offset: DVec2::splat(margin) + (available - drawn) * 0.5,
        }
    }

    #[inline]
    pub fn to_screen(&self, point: Point2) -> Point2 {
        let local = DVec2::new(point.x() - self.origin.x, self.origin.y - point.y());
        Point2::from_vec(self.offset + local * self.scale)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CanvasRenderer {
    options: CanvasOptions,
}

impl CanvasRenderer {
    pub fn new(options: CanvasOptions) -> Self {
        Self { options }
    }

    pub fn render(&self, entities: &[Entity], surface: &mut dyn DrawSurface) -> RenderReport {
        surface.clear();
        let mut report = RenderReport::default();
        let size = surface.size();

        if entities.is_empty() {
            let center = Point2::new(size.0 / 2.0, size.1 / 2.0);
            let style = LayerStyle::for_layer(layers::TEXT);
            if let Err(err) =
                surface.fill_text(center, EMPTY_PLACEHOLDER, PLACEHOLDER_FONT_SIZE, style.color)
            {
                warn!(error = %err, "绘制空图纸提示失败");
            }
            debug!("图元列表为空，仅绘制提示文字");
            return report;
        }

        let bounds = Bounds2D::or_fallback(compute_bounds(entities));
        let transform = ViewTransform::fit(&bounds, size, self.options.margin);

        for layer in layer_draw_order(entities) {
            let style = LayerStyle::for_layer(layer);
            for (index, entity) in entities
                .iter()
                .enumerate()
                .filter(|(_, entity)| entity.layer_name() == layer)
            {
                match draw_entity(entity, &transform, &style, surface) {
                    Ok(()) => report.drawn += 1,
                    Err(error) => {
                        warn!(
                            index,
                            kind = %entity.kind(),
                            layer,
                            error = %error,
                            "图元渲染失败，已跳过"
                        );
                        report.failures.push(RenderFailure {
                            index,
                            kind: entity.kind(),
                            layer: layer.to_string(),
                            error,
                        });
                    }
                }
            }
        }

        debug!(
            drawn = report.drawn,
            failures = report.failures.len(),
            scale = transform.scale,
            "平面图渲染完成"
        );
        report
    }
}

/// 已知图层按固定顺序，其余图层按首次出现顺序。只返回实际出现的图层。
pub fn layer_draw_order(entities: &[Entity]) -> Vec<&str> {
    let mut order: Vec<&str> = LAYER_ORDER
        .iter()
        .copied()
        .filter(|layer| entities.iter().any(|entity| entity.layer_name() == *layer))
        .collect();
    for entity in entities {
        let layer = entity.layer_name();
        if !order.contains(&layer) {
            order.push(layer);
        }
    }
    order
}

fn draw_entity(
    entity: &Entity,
    transform: &ViewTransform,
    style: &LayerStyle,
    surface: &mut dyn DrawSurface,
) -> Result<(), RenderError> {
    let stroke = style.stroke();
    match entity {
        Entity::Line(line) => {
            stroke_world_path(surface, transform, &[line.start, line.end], false, &stroke)
        }
        Entity::Polyline(polyline) => stroke_world_path(
            surface,
            transform,
            &polyline.vertices,
            polyline.is_closed,
            &stroke,
        ),
        Entity::Circle(circle) => {
            ensure_radius(circle.radius)?;
            ensure_finite(&[circle.center])?;
            let center = transform.to_screen(circle.center);
            surface.stroke_circle(center, circle.radius * transform.scale, &stroke)?;
            Ok(())
        }
        Entity::Arc(arc) => {
            ensure_radius(arc.radius)?;
            let points = sample_arc(arc.center, arc.radius, arc.start_angle, arc.end_angle);
            stroke_world_path(surface, transform, &points, false, &stroke)
        }
        Entity::Ellipse(ellipse) => {
            let major = ellipse.major_axis.length();
            ensure_radius(major)?;
            ensure_radius(ellipse.ratio)?;
            let points = sample_ellipse(
                ellipse.center,
                ellipse.major_axis,
                ellipse.ratio,
                ellipse.start_parameter,
                ellipse.end_parameter,
            );
            stroke_world_path(surface, transform, &points, false, &stroke)
        }
        Entity::Spline(spline) => {
            let points = spline_path(&spline.control_points, &spline.fit_points);
            stroke_world_path(surface, transform, &points, spline.is_closed, &stroke)
        }
        Entity::Insert(insert) => {
            ensure_finite(&[insert.position])?;
            let center = transform.to_screen(insert.position);
            for dy in [INSERT_MARKER_HALF, -INSERT_MARKER_HALF] {
                let from = center.translate(Vector2::new(-INSERT_MARKER_HALF, -dy));
                let to = center.translate(Vector2::new(INSERT_MARKER_HALF, dy));
                surface.stroke_path(&[from, to], false, &stroke)?;
            }
            Ok(())
        }
        Entity::Text(text) => {
            ensure_finite(&[text.position])?;
            let size = font_size(text.height, transform.scale);
            surface.fill_text(
                transform.to_screen(text.position),
                &text.content,
                size,
                style.color,
            )?;
            Ok(())
        }
        Entity::Dimension(dimension) => {
            let (start, end) = match (dimension.first_point, dimension.second_point) {
                (Some(first), Some(second)) => (first, second),
                _ => (dimension.definition_point, dimension.text_midpoint),
            };
            stroke_world_path(surface, transform, &[start, end], false, &stroke)?;
            if let Some(label) = dimension.label() {
                ensure_finite(&[dimension.text_midpoint])?;
                surface.fill_text(
                    transform.to_screen(dimension.text_midpoint),
                    &label,
                    DIMENSION_FONT_SIZE,
                    style.color,
                )?;
            }
            Ok(())
        }
    }
}

fn stroke_world_path(
    surface: &mut dyn DrawSurface,
    transform: &ViewTransform,
    points: &[Point2],
    closed: bool,
    stroke: &StrokeStyle,
) -> Result<(), RenderError> {
    if points.len() < 2 {
        return Err(RenderError::TooFewPoints(points.len()));
    }
    ensure_finite(points)?;
    let screen: Vec<Point2> = points.iter().map(|p| transform.to_screen(*p)).collect();
    surface.stroke_path(&screen, closed, stroke)?;
    Ok(())
}

fn ensure_finite(points: &[Point2]) -> Result<(), RenderError> {
    if points.iter().all(|point| point.is_finite()) {
        Ok(())
    } else {
        Err(RenderError::NonFinite)
    }
}

fn ensure_radius(radius: f64) -> Result<(), RenderError> {
    if !radius.is_finite() {
        Err(RenderError::NonFinite)
    } else if radius <= 0.0 {
        Err(RenderError::NonPositiveRadius(radius))
    } else {
        Ok(())
    }
}

fn font_size(height: f64, scale: f64) -> f64 {
    let size = height * scale;
    if size.is_finite() {
        size.max(MIN_FONT_SIZE)
    } else {
        MIN_FONT_SIZE
    }
}

/// 逆时针角度区间；起止相同视为整圆。
fn ccw_range(start: f64, end: f64) -> (f64, f64) {
    let start = start.rem_euclid(TAU);
    let mut end = end.rem_euclid(TAU);
    if (end - start).abs() < 1e-9 {
        end = start + TAU;
    } else if end < start {
        end += TAU;
    }
    (start, end)
}

fn segment_count(span: f64, min_segments: usize) -> usize {
    let segments = (span.abs() / (TAU / CIRCLE_SEGMENTS_PER_TURN)).ceil();
    if segments.is_finite() {
        (segments as usize).max(min_segments)
    } else {
        min_segments
    }
}

fn sample_arc(center: Point2, radius: f64, start_angle: f64, end_angle: f64) -> Vec<Point2> {
    let (start, end) = ccw_range(start_angle, end_angle);
    let span = end - start;
    let segments = segment_count(span, ARC_MIN_SEGMENTS);
    (0..=segments)
        .map(|i| {
            let angle = start + span * (i as f64 / segments as f64);
            center.translate(Vector2::new(radius * angle.cos(), radius * angle.sin()))
        })
        .collect()
}

fn sample_ellipse(
    center: Point2,
    major_axis: Vector2,
    ratio: f64,
    start_parameter: f64,
    end_parameter: f64,
) -> Vec<Point2> {
    let major = major_axis.as_vec2();
    let minor = DVec2::new(-major.y, major.x) * ratio;
    let (start, end) = ccw_range(start_parameter, end_parameter);
    let span = end - start;
    let segments = segment_count(span, ELLIPSE_MIN_SEGMENTS);
    (0..=segments)
        .map(|i| {
            let t = start + span * (i as f64 / segments as f64);
            Point2::from_vec(center.as_vec2() + major * t.cos() + minor * t.sin())
        })
        .collect()
}

/// 控制点折线，后接与末控制点不重合的拟合点；只有拟合点时直接使用拟合点。
fn spline_path(control_points: &[Point2], fit_points: &[Point2]) -> Vec<Point2> {
    if control_points.is_empty() {
        return fit_points.to_vec();
    }
    let mut points = control_points.to_vec();
    let mut fits = fit_points.iter().copied().peekable();
    if let (Some(last), Some(first)) = (points.last().copied(), fits.peek().copied()) {
        if points_close(last, first) {
            fits.next();
        }
    }
    points.extend(fits);
    points
}

fn points_close(a: Point2, b: Point2) -> bool {
    (a.x() - b.x()).abs() < 1e-6 && (a.y() - b.y()).abs() < 1e-6
}

/// 记录下来的一次绘制调用。
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear,
    Path {
        points: Vec<Point2>,
        closed: bool,
        style: StrokeStyle,
    },
    Circle {
        center: Point2,
        radius: f64,
        style: StrokeStyle,
    },
    Text {
        position: Point2,
        text: String,
        size: f64,
        color: String,
    },
}

/// 只记录绘制调用的画布，供无界面调用方与测试使用。
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    width: f64,
    height: f64,
    commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    #[inline]
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }
}

impl DrawSurface for RecordingSurface {
    fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.commands.clear();
        self.commands.push(DrawCommand::Clear);
    }

    fn stroke_path(
        &mut self,
        points: &[Point2],
        closed: bool,
        style: &StrokeStyle,
    ) -> Result<(), SurfaceError> {
        if !points.iter().all(|point| point.is_finite()) {
            return Err(SurfaceError::NonFinite);
        }
        self.commands.push(DrawCommand::Path {
            points: points.to_vec(),
            closed,
            style: *style,
        });
        Ok(())
    }

    fn stroke_circle(
        &mut self,
        center: Point2,
        radius: f64,
        style: &StrokeStyle,
    ) -> Result<(), SurfaceError> {
        if !center.is_finite() || !radius.is_finite() {
            return Err(SurfaceError::NonFinite);
        }
        self.commands.push(DrawCommand::Circle {
            center,
            radius,
            style: *style,
        });
        Ok(())
    }

    fn fill_text(
        &mut self,
        position: Point2,
        text: &str,
        size: f64,
        color: &str,
    ) -> Result<(), SurfaceError> {
        if !position.is_finite() {
            return Err(SurfaceError::NonFinite);
        }
        self.commands.push(DrawCommand::Text {
            position,
            text: text.to_string(),
            size,
            color: color.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use fplan_core::document::{Arc, Circle, Dimension, Insert, Line, Polyline, Text};

    use super::*;

    fn line(layer: &str, ax: f64, ay: f64, bx: f64, by: f64) -> Entity {
        Entity::Line(Line {
            start: Point2::new(ax, ay),
            end: Point2::new(bx, by),
            layer: layer.to_string(),
        })
    }

    fn render(entities: &[Entity]) -> (RecordingSurface, RenderReport) {
        let mut surface = RecordingSurface::new(800.0, 600.0);
        let renderer = CanvasRenderer::new(CanvasOptions { margin: 20.0 });
        let report = renderer.render(entities, &mut surface);
        (surface, report)
    }

    fn path_colors(surface: &RecordingSurface) -> Vec<&'static str> {
        surface
            .commands()
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Path { style, .. } => Some(style.color),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn empty_list_draws_only_placeholder() {
        let (surface, report) = render(&[]);
        assert_eq!(report, RenderReport::default());
        assert_eq!(surface.commands().len(), 2);
        assert_eq!(surface.commands()[0], DrawCommand::Clear);
        match &surface.commands()[1] {
            DrawCommand::Text { position, text, .. } => {
                assert_eq!(*position, Point2::new(400.0, 300.0));
                assert_eq!(text, EMPTY_PLACEHOLDER);
            }
            other => panic!("期望提示文字，实际 {other:?}"),
        }
    }

    #[test]
    fn drawing_is_scaled_centered_and_flipped() {
        let (surface, report) = render(&[line(layers::WALLS, 0.0, 0.0, 100.0, 50.0)]);
        assert_eq!(report.drawn, 1);
        let DrawCommand::Path { points, style, .. } = &surface.commands()[1] else {
            panic!("期望线段路径");
        };
        assert_eq!(*style, LayerStyle::for_layer(layers::WALLS).stroke());
        // 可用区域 760×560，缩放 7.6，竖直方向居中后上边距为 110
        assert!((points[0].x() - 20.0).abs() < 1e-9);
        assert!((points[0].y() - 490.0).abs() < 1e-9);
        assert!((points[1].x() - 780.0).abs() < 1e-9);
        assert!((points[1].y() - 110.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_bounds_use_fallback_extent() {
        let transform = ViewTransform::fit(
            &Bounds2D::from_extents(0.0, 5.0, 100.0, 5.0),
            (800.0, 600.0),
            20.0,
        );
        let fallback = ViewTransform::fit(&Bounds2D::FALLBACK, (800.0, 600.0), 20.0);
        assert_eq!(transform, fallback);
        let center = transform.to_screen(Point2::new(0.0, 0.0));
        assert!((center.x() - 400.0).abs() < 1e-9);
        assert!((center.y() - 300.0).abs() < 1e-9);
    }

    #[test]
    fn layers_follow_fixed_order_then_first_appearance() {
        let entities = vec![
            line(layers::WALLS, 0.0, 0.0, 10.0, 0.0),
            line(layers::DOORS, 0.0, 1.0, 10.0, 1.0),
            line("CUSTOM", 0.0, 2.0, 10.0, 2.0),
            line(layers::DIMENSIONS, 0.0, 3.0, 10.0, 3.0),
            line(layers::DEFAULT, 0.0, 4.0, 10.0, 4.0),
            line("OTHER", 0.0, 5.0, 10.0, 5.0),
            line("CUSTOM", 0.0, 6.0, 10.0, 6.0),
        ];
        assert_eq!(
            layer_draw_order(&entities),
            vec![
                layers::DIMENSIONS,
                layers::DOORS,
                layers::WALLS,
                layers::DEFAULT,
                "CUSTOM",
                "OTHER"
            ]
        );
        let (surface, report) = render(&entities);
        assert_eq!(report.drawn, 7);
        assert_eq!(
            path_colors(&surface),
            vec!["#bdc3c7", "#e67e22", "#2c3e50", "#333333", "#999999", "#999999", "#999999"]
        );
    }

    #[test]
    fn layer_style_table() {
        assert_eq!(
            LayerStyle::for_layer(layers::WALLS),
            LayerStyle {
                color: "#2c3e50",
                line_width: 3.0
            }
        );
        assert!((LayerStyle::for_layer(layers::DIMENSIONS).line_width - 0.5).abs() < 1e-12);
        assert_eq!(LayerStyle::for_layer("walls"), LayerStyle::UNKNOWN);
    }

    #[test]
    fn invalid_entities_are_reported_and_skipped() {
        let entities = vec![
            Entity::Circle(Circle {
                center: Point2::new(0.0, 0.0),
                radius: 0.0,
                layer: layers::FURNITURE.to_string(),
            }),
            Entity::Polyline(Polyline {
                vertices: vec![Point2::new(1.0, 1.0)],
                is_closed: false,
                layer: layers::WALLS.to_string(),
            }),
            line(layers::WALLS, f64::NAN, 0.0, 10.0, 10.0),
            line(layers::WALLS, 0.0, 0.0, 10.0, 10.0),
        ];
        let (surface, report) = render(&entities);
        assert_eq!(report.drawn, 1);
        assert_eq!(report.failures.len(), 3);
        assert!(!report.is_complete());
        assert_eq!(report.failures[0].index, 0);
        assert_eq!(report.failures[0].error, RenderError::NonPositiveRadius(0.0));
        assert_eq!(report.failures[1].error, RenderError::TooFewPoints(1));
        assert_eq!(report.failures[2].error, RenderError::NonFinite);
        assert_eq!(path_colors(&surface).len(), 1);
    }

    struct FailingCircles(RecordingSurface);

    impl DrawSurface for FailingCircles {
        fn size(&self) -> (f64, f64) {
            self.0.size()
        }

        fn clear(&mut self) {
            self.0.clear();
        }

        fn stroke_path(
            &mut self,
            points: &[Point2],
            closed: bool,
            style: &StrokeStyle,
        ) -> Result<(), SurfaceError> {
            self.0.stroke_path(points, closed, style)
        }

        fn stroke_circle(&mut self, _: Point2, _: f64, _: &StrokeStyle) -> Result<(), SurfaceError> {
            Err(SurfaceError::Backend("circle unsupported".to_string()))
        }

        fn fill_text(
            &mut self,
            position: Point2,
            text: &str,
            size: f64,
            color: &str,
        ) -> Result<(), SurfaceError> {
            self.0.fill_text(position, text, size, color)
        }
    }

    #[test]
    fn surface_errors_do_not_stop_rendering() {
        let entities = vec![
            Entity::Circle(Circle {
                center: Point2::new(5.0, 5.0),
                radius: 2.0,
                layer: layers::FURNITURE.to_string(),
            }),
            line(layers::WALLS, 0.0, 0.0, 10.0, 10.0),
        ];
        let mut surface = FailingCircles(RecordingSurface::new(400.0, 300.0));
        let report = CanvasRenderer::default().render(&entities, &mut surface);
        assert_eq!(report.drawn, 1);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0].error, RenderError::Surface(SurfaceError::Backend(_))));
        assert_eq!(report.failures[0].kind, EntityKind::Circle);
    }

    #[test]
    fn curves_inserts_and_dimensions_are_drawn() {
        let entities = vec![
            line(layers::WALLS, 0.0, 0.0, 100.0, 100.0),
            Entity::Arc(Arc {
                center: Point2::new(50.0, 50.0),
                radius: 10.0,
                start_angle: 0.0,
                end_angle: std::f64::consts::FRAC_PI_2,
                layer: layers::DOORS.to_string(),
            }),
            Entity::Insert(Insert {
                name: "DOOR".to_string(),
                position: Point2::new(20.0, 20.0),
                scale: Vector2::new(1.0, 1.0),
                rotation: 0.0,
                attributes: BTreeMap::new(),
                layer: layers::DOORS.to_string(),
            }),
            Entity::Dimension(Dimension {
                definition_point: Point2::new(0.0, -10.0),
                text_midpoint: Point2::new(50.0, -10.0),
                first_point: Some(Point2::new(0.0, 0.0)),
                second_point: Some(Point2::new(100.0, 0.0)),
                text: None,
                measurement: None,
                layer: layers::DIMENSIONS.to_string(),
            }),
            Entity::Text(Text {
                position: Point2::new(10.0, 90.0),
                content: "BED".to_string(),
                height: 0.1,
                rotation: 0.0,
                layer: layers::TEXT.to_string(),
            }),
        ];
        let (surface, report) = render(&entities);
        assert!(report.is_complete());
        assert_eq!(report.drawn, 5);

        let texts: Vec<(&str, f64)> = surface
            .commands()
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Text { text, size, .. } => Some((text.as_str(), *size)),
                _ => None,
            })
            .collect();
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0].0, "100.00");
        assert_eq!(texts[1].0, "BED");
        assert!((texts[1].1 - MIN_FONT_SIZE).abs() < 1e-12);

        let door_paths: Vec<usize> = surface
            .commands()
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Path { points, style, .. } if style.color == "#e67e22" => {
                    Some(points.len())
                }
                _ => None,
            })
            .collect();
        // 圆弧离散为多点折线，块参照画成两段交叉线
        assert_eq!(door_paths.len(), 3);
        assert!(door_paths[0] > ARC_MIN_SEGMENTS);
        assert_eq!(&door_paths[1..], &[2, 2]);
    }

    #[test]
    fn arc_samples_stay_on_radius() {
        let points = sample_arc(Point2::new(1.0, 2.0), 3.0, 1.5 * std::f64::consts::PI, 0.0);
        assert!(points.len() > 2);
        for point in &points {
            let r = Point2::new(1.0, 2.0).vector_to(*point).length();
            assert!((r - 3.0).abs() < 1e-9);
        }
        let last = points.last().copied().unwrap();
        assert!((last.x() - 4.0).abs() < 1e-9);
        assert!((last.y() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn spline_path_merges_touching_fit_points() {
        let control = [Point2::new(0.0, 0.0), Point2::new(1.0, 1.0)];
        let fit = [Point2::new(1.0, 1.0), Point2::new(2.0, 0.0)];
        assert_eq!(spline_path(&control, &fit).len(), 3);
        assert_eq!(spline_path(&[], &fit).len(), 2);
    }
}
