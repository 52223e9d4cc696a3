use glam::{Mat4, Quat, Vec3};
use std::collections::HashMap;

use super::mesh::{MaterialId, MeshId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::default()
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub mesh: Option<MeshId>,
    pub material: Option<MaterialId>,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    pub visible: bool,
    children: Vec<NodeId>,
}

impl Node {
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_renderable(&self) -> bool {
        self.mesh.is_some()
    }
}

/// Template for a node subtree. Cloned into the scene by [`Scene::instantiate`].
#[derive(Debug, Clone)]
pub struct Prefab {
    pub name: String,
    pub transform: Transform,
    pub mesh: Option<MeshId>,
    pub material: Option<MaterialId>,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    pub visible: bool,
    pub children: Vec<Prefab>,
}

impl Prefab {
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            mesh: None,
            material: None,
            cast_shadow: false,
            receive_shadow: false,
            visible: true,
            children: Vec::new(),
        }
    }

    pub fn mesh(name: impl Into<String>, mesh: MeshId, material: MaterialId) -> Self {
        Self {
            mesh: Some(mesh),
            material: Some(material),
            ..Self::group(name)
        }
    }

    pub fn with_child(mut self, child: Prefab) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Prefab::node_count).sum::<usize>()
    }
}

/// Node arena plus the ordered list of nodes attached at the top level.
/// Only attached subtrees are drawn.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: HashMap<NodeId, Node>,
    roots: Vec<NodeId>,
    next_id: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deep-copies a prefab into the arena. The copy starts detached.
    pub fn instantiate(&mut self, prefab: &Prefab) -> NodeId {
        let children = prefab
            .children
            .iter()
            .map(|child| self.instantiate(child))
            .collect();
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            Node {
                name: prefab.name.clone(),
                transform: prefab.transform,
                mesh: prefab.mesh,
                material: prefab.material,
                cast_shadow: prefab.cast_shadow,
                receive_shadow: prefab.receive_shadow,
                visible: prefab.visible,
                children,
            },
        );
        id
    }

    /// Attaches a node at the top level. Attaching twice is a no-op.
    pub fn add(&mut self, id: NodeId) -> bool {
        if !self.nodes.contains_key(&id) || self.roots.contains(&id) {
            return false;
        }
        self.roots.push(id);
        true
    }

    /// Detaches a top-level node, keeping it in the arena. Returns `false`
    /// if it was not attached.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let before = self.roots.len();
        self.roots.retain(|root| *root != id);
        self.roots.len() != before
    }

    /// Detaches a node and frees it together with its whole subtree.
    pub fn destroy(&mut self, id: NodeId) -> bool {
        self.remove(id);
        let Some(node) = self.nodes.remove(&id) else {
            return false;
        };
        for child in node.children {
            self.destroy(child);
        }
        true
    }

    /// Whether the node is attached at the top level.
    pub fn contains(&self, id: NodeId) -> bool {
        self.roots.contains(&id)
    }

    pub fn exists(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Sets position and orientation, leaving scale alone.
    pub fn set_pose(&mut self, id: NodeId, translation: Vec3, rotation: Quat) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.transform.translation = translation;
            node.transform.rotation = rotation;
        }
    }

    /// Applies `f` to the node and every descendant.
    pub fn traverse_mut(&mut self, id: NodeId, f: &mut impl FnMut(&mut Node)) {
        let children = match self.nodes.get_mut(&id) {
            Some(node) => {
                f(node);
                node.children.clone()
            }
            None => return,
        };
        for child in children {
            self.traverse_mut(child, f);
        }
    }

    /// Visits every visible node reachable from the top level along with
    /// its world matrix. Hidden nodes hide their subtree.
    pub fn visit_visible(&self, mut f: impl FnMut(&Node, Mat4)) {
        for root in &self.roots {
            self.visit_node(*root, Mat4::IDENTITY, &mut f);
        }
    }

    fn visit_node(&self, id: NodeId, parent: Mat4, f: &mut impl FnMut(&Node, Mat4)) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        if !node.visible {
            return;
        }
        let world = parent * node.transform.matrix();
        f(node, world);
        for child in &node.children {
            self.visit_node(*child, world, f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_level_prefab() -> Prefab {
        Prefab::group("root")
            .with_child(Prefab::mesh("a", MeshId(0), MaterialId(0)).with_transform(
                Transform::from_translation(Vec3::new(0.0, 2.0, 0.0)),
            ))
            .with_child(Prefab::mesh("b", MeshId(1), MaterialId(0)))
    }

    #[test]
    fn test_instantiate_copies_subtree_detached() {
        let mut scene = Scene::new();
        let id = scene.instantiate(&two_level_prefab());
        assert_eq!(scene.node_count(), 3);
        assert!(!scene.contains(id));
        assert_eq!(scene.node(id).unwrap().children().len(), 2);
    }

    #[test]
    fn test_add_remove_idempotent() {
        let mut scene = Scene::new();
        let id = scene.instantiate(&two_level_prefab());
        assert!(scene.add(id));
        assert!(!scene.add(id));
        assert_eq!(scene.roots().len(), 1);
        assert!(scene.remove(id));
        assert!(!scene.remove(id));
        assert!(scene.exists(id));
    }

    #[test]
    fn test_destroy_frees_subtree() {
        let mut scene = Scene::new();
        let id = scene.instantiate(&two_level_prefab());
        scene.add(id);
        assert!(scene.destroy(id));
        assert_eq!(scene.node_count(), 0);
        assert!(!scene.destroy(id));
    }

    #[test]
    fn test_world_matrices_compose() {
        let mut scene = Scene::new();
        let id = scene.instantiate(&two_level_prefab());
        scene.add(id);
        scene.node_mut(id).unwrap().transform.scale = Vec3::splat(0.5);
        scene.set_pose(id, Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY);

        let mut seen = Vec::new();
        scene.visit_visible(|node, world| seen.push((node.name.clone(), world.w_axis.truncate())));
        let a = seen.iter().find(|(name, _)| name == "a").unwrap();
        assert!(a.1.abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-6));
        assert_eq!(scene.node(id).unwrap().transform.scale, Vec3::splat(0.5));
    }

    #[test]
    fn test_hidden_nodes_are_skipped() {
        let mut scene = Scene::new();
        let id = scene.instantiate(&two_level_prefab());
        scene.add(id);
        scene.traverse_mut(id, &mut |node: &mut Node| node.visible = false);
        let mut count = 0;
        scene.visit_visible(|_, _| count += 1);
        assert_eq!(count, 0);
    }

    #[test]
    fn test_detached_nodes_are_not_visited() {
        let mut scene = Scene::new();
        scene.instantiate(&two_level_prefab());
        let mut count = 0;
        scene.visit_visible(|_, _| count += 1);
        assert_eq!(count, 0);
    }
}
