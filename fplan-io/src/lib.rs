mod binary;
mod dxf;

use std::fs;
use std::path::{Path, PathBuf};

use fplan_core::document::Entity;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use binary::{BinaryLayout, BinaryReconstruction, parse_binary_document};
pub use dxf::parse_vector_document;

/// 二进制 CAD 载荷（类 DWG）的魔数前缀。
pub const BINARY_SIGNATURE: &[u8; 2] = b"AC";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed document: {0}")]
    MalformedDocument(String),
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("failed to read file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 错误类别，便于上层决定提示文案（例如"请转换为 DXF"）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    MalformedDocument,
    UnsupportedFormat,
    Read,
}

impl ParseError {
    pub fn kind(&self) -> ParseErrorKind {
        match self {
            ParseError::MalformedDocument(_) => ParseErrorKind::MalformedDocument,
            ParseError::UnsupportedFormat(_) => ParseErrorKind::UnsupportedFormat,
            ParseError::Read { .. } => ParseErrorKind::Read,
        }
    }

    /// 是否建议用户将文件转换为 DXF 后重试。
    pub fn needs_conversion(&self) -> bool {
        !matches!(self, ParseError::Read { .. })
    }
}

/// 图纸来源。启发式重建的结果必须显式标注，不能伪装成普通解析成功。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DrawingOrigin {
    Vector,
    Heuristic {
        layout: BinaryLayout,
        version: Option<String>,
    },
}

impl DrawingOrigin {
    #[inline]
    pub fn is_approximate(&self) -> bool {
        matches!(self, DrawingOrigin::Heuristic { .. })
    }
}

/// 加载结果：规范化实体与来源标注。
#[derive(Debug, Clone)]
pub struct LoadedDrawing {
    pub entities: Vec<Entity>,
    pub origin: DrawingOrigin,
}

impl LoadedDrawing {
    /// 按内容嗅探格式：`AC` 前缀或非文本内容走二进制路径，否则按 DXF 文本解析。
    ///
    /// 非文本内容若缺少 `AC` 签名，由二进制路径报告 `UnsupportedFormat`。
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        let text = match std::str::from_utf8(bytes) {
            Ok(text) if !bytes.starts_with(BINARY_SIGNATURE) && !text.contains('\0') => text,
            _ => return Self::from_binary(bytes),
        };
        Ok(Self {
            entities: parse_vector_document(text)?,
            origin: DrawingOrigin::Vector,
        })
    }

    fn from_binary(bytes: &[u8]) -> Result<Self, ParseError> {
        let reconstruction = parse_binary_document(bytes)?;
        Ok(Self {
            origin: DrawingOrigin::Heuristic {
                layout: reconstruction.layout,
                version: reconstruction.version,
            },
            entities: reconstruction.entities,
        })
    }
}

pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<LoadedDrawing, ParseError>;
}

pub struct CadFacade;

impl CadFacade {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CadFacade {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentLoader for CadFacade {
    fn load(&self, path: &Path) -> Result<LoadedDrawing, ParseError> {
        let data = fs::read(path).map_err(|source| ParseError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), size = data.len(), "读取图纸文件");
        let drawing = LoadedDrawing::from_bytes(&data)?;
        match &drawing.origin {
            DrawingOrigin::Vector => {
                info!(
                    path = %path.display(),
                    entities = drawing.entities.len(),
                    "DXF 解析完成"
                );
            }
            DrawingOrigin::Heuristic { layout, version } => {
                warn!(
                    path = %path.display(),
                    ?layout,
                    version = version.as_deref().unwrap_or("未知"),
                    entities = drawing.entities.len(),
                    "二进制图纸仅做启发式重建，几何结果为近似值"
                );
            }
        }
        Ok(drawing)
    }
}
