use std::{io, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Failed to read asset {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid glTF asset {}: {source}", path.display())]
    Gltf {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },

    #[error("Primitive in mesh '{mesh}' has no {attribute} data")]
    MissingAttribute { mesh: String, attribute: &'static str },

    #[error("Asset {} contains no scene", .0.display())]
    EmptyScene(PathBuf),

    #[error("Failed to start asset loader threads: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Couldn't determine project directory")]
    NoProjectDir,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Shader compilation failed: {0}")]
    Compilation(String),

    #[error("Program linking failed: {0}")]
    Linking(String),

    #[error("Failed to create GL object: {0}")]
    Resource(String),

    #[error("Framebuffer incomplete (status {0:#x})")]
    IncompleteFramebuffer(u32),
}

/// Top-level error for everything the library can report.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Audio(#[from] crate::utils::audio::AudioError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
