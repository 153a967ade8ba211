use std::path::PathBuf;

use fplan_io::ParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("加载图纸失败: {0}")]
    Load(#[from] ParseError),
    #[error("写入文件 {path:?} 失败: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("序列化平面结构失败: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl FrontendError {
    /// 图纸本身无法识别时，调用方可提示用户转换为 DXF 后重试。
    pub fn suggests_conversion(&self) -> bool {
        matches!(self, FrontendError::Load(err) if err.needs_conversion())
    }
}
