use glam::{Quat, Vec3};
use log::{debug, warn};
use std::path::{Path, PathBuf};

use crate::render::{mesh::Material, scene::Transform, MeshData};
use crate::utils::error::AssetError;

/// One drawable part of a model node, with its own material.
#[derive(Debug, Clone)]
pub struct ModelPrimitive {
    pub mesh: MeshData,
    pub material: Material,
}

#[derive(Debug, Clone)]
pub struct ModelNode {
    pub name: String,
    pub transform: Transform,
    pub primitives: Vec<ModelPrimitive>,
    pub children: Vec<ModelNode>,
}

impl ModelNode {
    pub fn primitive_count(&self) -> usize {
        self.primitives.len()
            + self
                .children
                .iter()
                .map(ModelNode::primitive_count)
                .sum::<usize>()
    }
}

/// CPU-side model data, independent of any scene or GPU state so it can be
/// built on a worker thread.
#[derive(Debug, Clone)]
pub struct ModelAsset {
    pub path: PathBuf,
    pub roots: Vec<ModelNode>,
}

impl ModelAsset {
    pub fn primitive_count(&self) -> usize {
        self.roots.iter().map(ModelNode::primitive_count).sum()
    }
}

/// Where model assets come from.
pub trait ModelSource: Send + Sync {
    fn load(&self, path: &Path) -> Result<ModelAsset, AssetError>;
}

/// Reads glTF 2.0 files (`.gltf` with external buffers, or `.glb`).
#[derive(Debug, Default, Clone, Copy)]
pub struct GltfSource;

impl ModelSource for GltfSource {
    fn load(&self, path: &Path) -> Result<ModelAsset, AssetError> {
        let (document, buffers, _images) =
            gltf::import(path).map_err(|source| AssetError::Gltf {
                path: path.to_path_buf(),
                source,
            })?;

        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or_else(|| AssetError::EmptyScene(path.to_path_buf()))?;

        let roots = scene
            .nodes()
            .map(|node| read_node(&node, &buffers))
            .collect::<Result<Vec<_>, _>>()?;

        let asset = ModelAsset {
            path: path.to_path_buf(),
            roots,
        };
        debug!(
            "Loaded {} ({} primitives)",
            path.display(),
            asset.primitive_count()
        );
        Ok(asset)
    }
}

fn read_node(
    node: &gltf::Node<'_>,
    buffers: &[gltf::buffer::Data],
) -> Result<ModelNode, AssetError> {
    let (translation, rotation, scale) = node.transform().decomposed();
    let transform = Transform {
        translation: Vec3::from(translation),
        rotation: Quat::from_array(rotation),
        scale: Vec3::from(scale),
    };

    let name = node
        .name()
        .map(str::to_owned)
        .unwrap_or_else(|| format!("node{}", node.index()));

    let mut primitives = Vec::new();
    if let Some(mesh) = node.mesh() {
        let mesh_name = mesh.name().unwrap_or(&name).to_owned();
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                warn!(
                    "Skipping non-triangle primitive in mesh '{}' ({:?})",
                    mesh_name,
                    primitive.mode()
                );
                continue;
            }
            primitives.push(read_primitive(&mesh_name, &primitive, buffers)?);
        }
    }

    let children = node
        .children()
        .map(|child| read_node(&child, buffers))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ModelNode {
        name,
        transform,
        primitives,
        children,
    })
}

fn read_primitive(
    mesh_name: &str,
    primitive: &gltf::Primitive<'_>,
    buffers: &[gltf::buffer::Data],
) -> Result<ModelPrimitive, AssetError> {
    let reader =
        primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

    let vertices: Vec<Vec3> = reader
        .read_positions()
        .ok_or_else(|| AssetError::MissingAttribute {
            mesh: mesh_name.to_owned(),
            attribute: "POSITION",
        })?
        .map(Vec3::from)
        .collect();

    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertices.len() as u32).collect(),
    };

    let mut mesh = MeshData {
        vertices,
        normals: Vec::new(),
        indices,
    };
    match reader.read_normals() {
        Some(normals) => mesh.normals = normals.map(Vec3::from).collect(),
        None => mesh.compute_normals(),
    }

    let pbr = primitive.material().pbr_metallic_roughness();
    let [r, g, b, a] = pbr.base_color_factor();
    let material = Material {
        color: [r, g, b],
        opacity: a,
        metalness: pbr.metallic_factor(),
        roughness: pbr.roughness_factor(),
        wireframe: false,
    };

    Ok(ModelPrimitive { mesh, material })
}
