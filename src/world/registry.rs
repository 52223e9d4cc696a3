use glam::{Quat, Vec3};
use log::debug;
use std::collections::HashMap;
use std::f32::consts::FRAC_PI_2;
use std::path::PathBuf;

use crate::assets::{ModelAsset, ModelNode};
use crate::config::{RenderConfig, SpawnConfig};
use crate::physics::{BodyDesc, BoxShape, ContactMaterial};
use crate::render::{
    mesh::{Material, MeshData, MeshLibrary},
    scene::{Prefab, Transform},
};

const WIREFRAME_COLOR: &str = "#ff0000";

/// Shared templates every spawn is cloned from: the debug wireframe, the
/// compound body layout, the floor, and one prefab per loaded model path.
pub struct ResourceRegistry {
    scale: f32,
    body: BoxShape,
    plug: BoxShape,
    mass: f32,
    wireframe: Prefab,
    floor: Prefab,
    models: HashMap<PathBuf, Prefab>,
}

impl ResourceRegistry {
    pub fn new(spawn: &SpawnConfig, rendering: &RenderConfig, library: &mut MeshLibrary) -> Self {
        let body_size = Vec3::from(spawn.body_size);
        let plug_size = Vec3::from(spawn.plug_size);
        let body_offset = Vec3::new(0.0, spawn.body_offset, 0.0);
        let plug_offset = Vec3::new(0.0, spawn.plug_offset, 0.0);

        // The wireframe lives in template units; spawns scale the whole group.
        let wire_material = library.add_material(Material {
            wireframe: true,
            ..Material::from_hex(WIREFRAME_COLOR)
        });
        let body_mesh = library.add_mesh(MeshData::cuboid(body_size));
        let plug_mesh = library.add_mesh(MeshData::cuboid(plug_size));
        let wireframe = Prefab::group("debugWireframe")
            .with_child(
                Prefab::mesh("debugBody", body_mesh, wire_material)
                    .with_transform(Transform::from_translation(body_offset)),
            )
            .with_child(
                Prefab::mesh("debugPlug", plug_mesh, wire_material)
                    .with_transform(Transform::from_translation(plug_offset)),
            );

        let floor_material = library.add_material(Material {
            metalness: rendering.floor_metalness,
            roughness: rendering.floor_roughness,
            ..Material::from_hex(&rendering.floor_color)
        });
        let floor_mesh =
            library.add_mesh(MeshData::plane(rendering.floor_size, rendering.floor_size));
        let mut floor = Prefab::mesh("floor", floor_mesh, floor_material).with_transform(Transform {
            rotation: Quat::from_rotation_x(-FRAC_PI_2),
            ..Transform::default()
        });
        floor.receive_shadow = true;

        let scale = spawn.scale;
        Self {
            scale,
            body: BoxShape::new(body_size * scale * 0.5, body_offset * scale),
            plug: BoxShape::new(plug_size * scale * 0.5, plug_offset * scale),
            mass: spawn.mass,
            wireframe,
            floor,
            models: HashMap::new(),
        }
    }

    /// Uniform scale applied to model and wireframe instances.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn wireframe_prefab(&self) -> &Prefab {
        &self.wireframe
    }

    pub fn floor_prefab(&self) -> &Prefab {
        &self.floor
    }

    /// Unpositioned description of the two-box body every spawn gets.
    pub fn body_template(&self, material: ContactMaterial) -> BodyDesc {
        BodyDesc::new(vec![self.body, self.plug], self.mass, material)
    }

    /// Returns the prefab for a loaded model, uploading its meshes into the
    /// library the first time the model's path is seen.
    pub fn model_prefab(&mut self, asset: &ModelAsset, library: &mut MeshLibrary) -> &Prefab {
        self.models.entry(asset.path.clone()).or_insert_with(|| {
            debug!("Building prefab for {}", asset.path.display());
            let name = asset
                .path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "model".to_owned());
            asset
                .roots
                .iter()
                .fold(Prefab::group(name), |group, node| {
                    group.with_child(node_prefab(node, library))
                })
        })
    }

    pub fn cached_models(&self) -> usize {
        self.models.len()
    }
}

fn node_prefab(node: &ModelNode, library: &mut MeshLibrary) -> Prefab {
    let mut prefab = Prefab::group(node.name.clone()).with_transform(node.transform);
    for (i, primitive) in node.primitives.iter().enumerate() {
        let mesh = library.add_mesh(primitive.mesh.clone());
        let material = library.add_material(primitive.material.clone());
        prefab = prefab.with_child(Prefab::mesh(format!("{}#{}", node.name, i), mesh, material));
    }
    for child in &node.children {
        prefab = prefab.with_child(node_prefab(child, library));
    }
    prefab
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::models::tests::box_model;

    fn registry() -> (ResourceRegistry, MeshLibrary) {
        let mut library = MeshLibrary::new();
        let registry = ResourceRegistry::new(
            &SpawnConfig::default(),
            &RenderConfig::default(),
            &mut library,
        );
        (registry, library)
    }

    #[test]
    fn test_body_template_is_scaled() {
        let (registry, _) = registry();
        let desc = registry.body_template(ContactMaterial::default());
        assert_eq!(desc.shapes.len(), 2);
        assert!(desc.shapes[0]
            .half_extents
            .abs_diff_eq(Vec3::new(0.05, 0.06, 0.0325), 1e-6));
        assert!(desc.shapes[0].offset.abs_diff_eq(Vec3::new(0.0, -0.018, 0.0), 1e-6));
        assert!(desc.shapes[1]
            .half_extents
            .abs_diff_eq(Vec3::new(0.0425, 0.0125, 0.0175), 1e-6));
        assert!(desc.shapes[1].offset.abs_diff_eq(Vec3::new(0.0, 0.055, 0.0), 1e-6));
        assert!((desc.mass - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_wireframe_matches_body_layout() {
        let (registry, library) = registry();
        let wireframe = registry.wireframe_prefab();
        assert_eq!(wireframe.children.len(), 2);
        for child in &wireframe.children {
            let material = library.material(child.material.unwrap()).unwrap();
            assert!(material.wireframe);
            assert!(!child.cast_shadow);
        }
        assert_eq!(wireframe.children[1].transform.translation.y, 5.5);
    }

    #[test]
    fn test_floor_faces_up_and_receives_shadows() {
        let (registry, library) = registry();
        let floor = registry.floor_prefab();
        assert!(floor.receive_shadow);
        let normal = floor.transform.rotation * Vec3::Z;
        assert!(normal.abs_diff_eq(Vec3::Y, 1e-6));
        let material = library.material(floor.material.unwrap()).unwrap();
        assert!((material.roughness - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_model_prefab_is_cached_per_path() {
        let (mut registry, mut library) = registry();
        let asset = box_model(PathBuf::from("obd.gltf"));
        let nodes = registry.model_prefab(&asset, &mut library).node_count();
        let meshes = library.mesh_count();
        registry.model_prefab(&asset, &mut library);
        assert_eq!(library.mesh_count(), meshes);
        assert_eq!(registry.cached_models(), 1);
        // group + obd + (body + primitive) + (plug + primitive)
        assert_eq!(nodes, 6);
    }
}
