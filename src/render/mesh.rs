use glam::{Vec2, Vec3};
use std::sync::Arc;

use crate::utils::math::parse_hex_color;

/// Indexed triangle list with per-vertex normals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Box centred on the origin with the given full edge lengths.
    pub fn cuboid(size: Vec3) -> Self {
        let h = size * 0.5;
        let faces: [(Vec3, Vec3, Vec3); 6] = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];

        let mut mesh = Self::new();
        for (normal, u, v) in faces {
            let base = mesh.vertices.len() as u32;
            let corners = [
                Vec2::new(-1.0, -1.0),
                Vec2::new(1.0, -1.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(-1.0, 1.0),
            ];
            for corner in corners {
                let p = normal + u * corner.x + v * corner.y;
                mesh.vertices.push(p * h);
                mesh.normals.push(normal);
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh
    }

    /// Single quad in the XY plane facing +Z.
    pub fn plane(width: f32, height: f32) -> Self {
        let (hw, hh) = (width * 0.5, height * 0.5);
        Self {
            vertices: vec![
                Vec3::new(-hw, -hh, 0.0),
                Vec3::new(hw, -hh, 0.0),
                Vec3::new(hw, hh, 0.0),
                Vec3::new(-hw, hh, 0.0),
            ],
            normals: vec![Vec3::Z; 4],
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Fills in flat normals when a source mesh came without any.
    pub fn compute_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.vertices.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if a >= self.vertices.len() || b >= self.vertices.len() || c >= self.vertices.len() {
                continue;
            }
            let [va, vb, vc] = [self.vertices[a], self.vertices[b], self.vertices[c]];
            let n = (vb - va).cross(vc - va);
            normals[a] += n;
            normals[b] += n;
            normals[c] += n;
        }
        self.normals = normals
            .into_iter()
            .map(|n| n.try_normalize().unwrap_or(Vec3::Y))
            .collect();
    }

    /// Interleaved position + normal floats, the layout the GL renderer uploads.
    pub fn interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.vertices.len() * 6);
        for (i, v) in self.vertices.iter().enumerate() {
            let n = self.normals.get(i).copied().unwrap_or(Vec3::Y);
            out.extend_from_slice(&[v.x, v.y, v.z, n.x, n.y, n.z]);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub color: [f32; 3],
    pub opacity: f32,
    pub metalness: f32,
    pub roughness: f32,
    pub wireframe: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            opacity: 1.0,
            metalness: 0.0,
            roughness: 1.0,
            wireframe: false,
        }
    }
}

impl Material {
    pub fn from_hex(hex: &str) -> Self {
        Self {
            color: parse_hex_color(hex).unwrap_or([1.0, 1.0, 1.0]),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub(crate) usize);

/// Append-only store of geometry and materials referenced by scene nodes.
#[derive(Debug, Default)]
pub struct MeshLibrary {
    meshes: Vec<Arc<MeshData>>,
    materials: Vec<Material>,
}

impl MeshLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mesh(&mut self, mesh: MeshData) -> MeshId {
        self.meshes.push(Arc::new(mesh));
        MeshId(self.meshes.len() - 1)
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    pub fn mesh(&self, id: MeshId) -> Option<&Arc<MeshData>> {
        self.meshes.get(id.0)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cuboid_extents() {
        let mesh = MeshData::cuboid(Vec3::new(10.0, 12.0, 6.5));
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.triangle_count(), 12);
        let max = mesh.vertices.iter().fold(Vec3::splat(f32::MIN), |a, v| a.max(*v));
        assert!(max.abs_diff_eq(Vec3::new(5.0, 6.0, 3.25), 1e-6));
    }

    #[test]
    fn test_cuboid_winding_matches_normals() {
        let mesh = MeshData::cuboid(Vec3::ONE);
        for (face, tri) in mesh.indices.chunks_exact(3).enumerate() {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| mesh.vertices[i as usize]);
            let n = (b - a).cross(c - a).normalize();
            let expected = mesh.normals[tri[0] as usize];
            assert!(n.abs_diff_eq(expected, 1e-5), "face {face}: {n} vs {expected}");
        }
    }

    #[test]
    fn test_compute_normals_for_plane() {
        let mut mesh = MeshData::plane(2.0, 2.0);
        mesh.normals.clear();
        mesh.compute_normals();
        assert!(mesh.normals.iter().all(|n| n.abs_diff_eq(Vec3::Z, 1e-6)));
    }

    #[test]
    fn test_library_ids() {
        let mut library = MeshLibrary::new();
        let a = library.add_mesh(MeshData::plane(1.0, 1.0));
        let b = library.add_mesh(MeshData::cuboid(Vec3::ONE));
        assert_ne!(a, b);
        assert_eq!(library.mesh(b).unwrap().triangle_count(), 12);
        let m = library.add_material(Material::from_hex("#444444"));
        assert!((library.material(m).unwrap().color[0] - 0x44 as f32 / 255.0).abs() < 1e-6);
    }
}
