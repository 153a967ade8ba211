use std::env;
use std::path::{Path, PathBuf};

use fplan_core::document::Entity;
use fplan_engine::FloorStructure;
use fplan_engine::demo::sample_floor_plan;
use fplan_io::{DocumentLoader, DrawingOrigin, LoadedDrawing};
use tracing::{info, warn};

use crate::errors::FrontendError;

/// 未显式指定输入时尝试读取的图纸路径。
pub const SAMPLE_DRAWING_ENV: &str = "FPLAN_SAMPLE_DRAWING";

/// 图纸来源，便于前端呈现加载信息。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawingSource {
    File(PathBuf),
    Demo,
}

/// 加载后的实体与推断结果。
#[derive(Debug, Clone)]
pub struct LoadedPlan {
    pub source: DrawingSource,
    pub origin: DrawingOrigin,
    pub entities: Vec<Entity>,
    pub structure: FloorStructure,
}

impl LoadedPlan {
    fn new(source: DrawingSource, origin: DrawingOrigin, entities: Vec<Entity>) -> Self {
        let structure = FloorStructure::from_entities(&entities);
        Self {
            source,
            origin,
            entities,
            structure,
        }
    }

    fn from_drawing(path: &Path, drawing: LoadedDrawing) -> Self {
        Self::new(
            DrawingSource::File(path.to_path_buf()),
            drawing.origin,
            drawing.entities,
        )
    }

    /// 内置示例平面。
    pub fn demo() -> Self {
        Self::new(DrawingSource::Demo, DrawingOrigin::Vector, sample_floor_plan())
    }
}

/// 加载显式指定的图纸，失败时直接返回错误。
pub fn load_plan_from_path(
    path: &Path,
    loader: &dyn DocumentLoader,
) -> Result<LoadedPlan, FrontendError> {
    let drawing = loader.load(path)?;
    info!(
        path = %path.display(),
        entities = drawing.entities.len(),
        approximate = drawing.origin.is_approximate(),
        "图纸加载成功"
    );
    Ok(LoadedPlan::from_drawing(path, drawing))
}

/// 从环境变量 `FPLAN_SAMPLE_DRAWING` 指定的路径加载图纸，
/// 若未设置或加载失败则回退到内置示例。
pub fn load_plan_from_env_or_demo(loader: &dyn DocumentLoader) -> LoadedPlan {
    if let Some(path) = env::var_os(SAMPLE_DRAWING_ENV) {
        let path = PathBuf::from(path);
        match load_plan_from_path(&path, loader) {
            Ok(plan) => return plan,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "加载示例图纸失败，回退到内置示例");
            }
        }
    }
    info!("使用内置示例平面");
    LoadedPlan::demo()
}
