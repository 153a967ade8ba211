use std::fmt::Write as _;

use fplan_core::geometry::Point2;

use crate::canvas::{DrawSurface, StrokeStyle, SurfaceError};

/// 把绘制调用序列化为 SVG 文档的画布。
#[derive(Debug, Clone)]
pub struct SvgSurface {
    width: f64,
    height: f64,
    body: String,
}

impl SvgSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            body: String::new(),
        }
    }

    /// 生成完整的 SVG 文本。
    pub fn to_svg(&self) -> String {
        let mut svg = String::with_capacity(self.body.len() + 256);
        svg.push_str(&format!(
            r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">
<rect width="100%" height="100%" fill="#ffffff"/>
"##,
            w = fmt_num(self.width),
            h = fmt_num(self.height)
        ));
        svg.push_str(&self.body);
        svg.push_str("</svg>\n");
        svg
    }
}

impl DrawSurface for SvgSurface {
    fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.body.clear();
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
        let coords: Vec<String> = points
            .iter()
            .map(|p| format!("{},{}", fmt_num(p.x()), fmt_num(p.y())))
            .collect();
        let element = if closed { "polygon" } else { "polyline" };
        writeln!(
            self.body,
            r#"  <{element} points="{}" fill="none" stroke="{}" stroke-width="{}" stroke-linecap="round" stroke-linejoin="round"/>"#,
            coords.join(" "),
            style.color,
            fmt_num(style.width)
        )
        .map_err(|err| SurfaceError::Backend(err.to_string()))
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
        writeln!(
            self.body,
            r#"  <circle cx="{}" cy="{}" r="{}" fill="none" stroke="{}" stroke-width="{}"/>"#,
            fmt_num(center.x()),
            fmt_num(center.y()),
            fmt_num(radius),
            style.color,
            fmt_num(style.width)
        )
        .map_err(|err| SurfaceError::Backend(err.to_string()))
    }

    fn fill_text(
        &mut self,
        position: Point2,
        text: &str,
        size: f64,
        color: &str,
    ) -> Result<(), SurfaceError> {
        if !position.is_finite() || !size.is_finite() {
            return Err(SurfaceError::NonFinite);
        }
        writeln!(
            self.body,
            r#"  <text x="{}" y="{}" font-size="{}" fill="{}" text-anchor="middle" font-family="sans-serif">{}</text>"#,
            fmt_num(position.x()),
            fmt_num(position.y()),
            fmt_num(size),
            escape_xml(color),
            escape_xml(text)
        )
        .map_err(|err| SurfaceError::Backend(err.to_string()))
    }
}

/// 保留两位小数并去掉多余的零。
fn fmt_num(value: f64) -> String {
    let text = format!("{value:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
