pub mod loader;
pub mod models;

pub use loader::{AssetLoader, LoadResult};
pub use models::{GltfSource, ModelAsset, ModelNode, ModelPrimitive, ModelSource};
