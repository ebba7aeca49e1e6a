/// Scene graph: every visual element the engine owns, plus camera and the
/// global fade.
///
/// Elements form an explicit ownership tree. A child's position is local
/// to its parent (scaled by the parent's scale) and its effective opacity
/// and visibility are multiplied through the parent. Disposing an element
/// disposes its whole subtree exactly once; disposing an id that is already
/// gone is a no-op.

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::math::{Rgb, Vec3};
use crate::domain::story::Side;
use crate::domain::surface::Surface;
use crate::sim::assets::Texture;

pub const CAMERA_Z: f32 = 5.0;
pub const CAMERA_FOV_DEG: f32 = 75.0;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ElementId(u64);

#[derive(Clone, Debug)]
pub struct PanelVisual {
    pub side: Side,
    pub texture: Texture,
    pub end_texture: Option<Texture>,
    pub border_width: f32,
    /// Border brightness in [0.2, 1.0].
    pub border_pulse: f32,
    pub interactive: bool,
    pub selected: bool,
    pub title: Option<ElementId>,
}

impl PanelVisual {
    /// Swap in the end thumbnail. Returns false if there is none.
    pub fn swap_to_end(&mut self) -> bool {
        match self.end_texture.take() {
            Some(tex) => {
                self.texture = tex;
                true
            }
            None => false,
        }
    }
}

#[derive(Clone, Debug)]
pub enum ElementKind {
    Panel(PanelVisual),
    TimerBar { color: Rgb },
    Label { text: String, color: Rgb },
}

#[derive(Clone, Debug)]
pub struct Element {
    pub kind: ElementKind,
    pub position: Vec3,
    pub scale: Vec3,
    pub opacity: f32,
    /// False while pre-built and hidden.
    pub in_scene: bool,
    pub surface: Surface,
    pub parent: Option<ElementId>,
    pub children: Vec<ElementId>,
}

impl Element {
    pub fn new(kind: ElementKind, surface: Surface, position: Vec3) -> Self {
        Element {
            kind,
            position,
            scale: Vec3::ONE,
            opacity: 1.0,
            in_scene: true,
            surface,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn hidden(mut self) -> Self {
        self.in_scene = false;
        self.opacity = 0.0;
        self
    }

    pub fn panel(&self) -> Option<&PanelVisual> {
        match &self.kind {
            ElementKind::Panel(p) => Some(p),
            _ => None,
        }
    }

    pub fn panel_mut(&mut self) -> Option<&mut PanelVisual> {
        match &mut self.kind {
            ElementKind::Panel(p) => Some(p),
            _ => None,
        }
    }
}

/// World-space placement of an element after walking its parents.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct WorldTransform {
    pub position: Vec3,
    pub scale: Vec3,
    pub opacity: f32,
    pub visible: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub position: Vec3,
    pub home: Vec3,
    pub fov_deg: f32,
    /// Width / height of the view, set by the renderer.
    pub aspect: f32,
}

impl Camera {
    pub fn new() -> Self {
        let home = Vec3::new(0.0, 0.0, CAMERA_Z);
        Camera { position: home, home, fov_deg: CAMERA_FOV_DEG, aspect: 16.0 / 9.0 }
    }

    /// Visible (width, height) of the plane `distance` in front of the camera.
    pub fn frustum_at(&self, distance: f32) -> (f32, f32) {
        let vfov = self.fov_deg.to_radians();
        let height = 2.0 * (vfov / 2.0).tan() * distance;
        (height * self.aspect, height)
    }
}

pub struct Scene {
    elements: BTreeMap<ElementId, Element>,
    next_id: u64,
    pub camera: Camera,
    /// Global fade: 0 = fully visible, 1 = black.
    pub fade: f32,
}

impl Scene {
    pub fn new() -> Self {
        Scene { elements: BTreeMap::new(), next_id: 1, camera: Camera::new(), fade: 0.0 }
    }

    pub fn insert(&mut self, element: Element) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        self.elements.insert(id, element);
        id
    }

    /// Insert `element` as an owned child of `parent`.
    pub fn insert_child(&mut self, parent: ElementId, mut element: Element) -> Option<ElementId> {
        if !self.elements.contains_key(&parent) {
            return None;
        }
        element.parent = Some(parent);
        let id = self.insert(element);
        if let Some(p) = self.elements.get_mut(&parent) {
            p.children.push(id);
        }
        Some(id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ElementId, &Element)> {
        self.elements.iter().map(|(id, e)| (*id, e))
    }

    /// Remove an element and its whole subtree. Returns false if it was
    /// already gone.
    pub fn dispose(&mut self, id: ElementId) -> bool {
        let Some(element) = self.elements.remove(&id) else {
            return false;
        };
        if let Some(parent) = element.parent.and_then(|p| self.elements.get_mut(&p)) {
            parent.children.retain(|c| *c != id);
            if let Some(panel) = parent.panel_mut() {
                if panel.title == Some(id) {
                    panel.title = None;
                }
            }
        }
        let mut stack = element.children;
        while let Some(child) = stack.pop() {
            if let Some(e) = self.elements.remove(&child) {
                stack.extend(e.children);
            }
        }
        debug!(?id, "element disposed");
        true
    }

    pub fn world_transform(&self, id: ElementId) -> Option<WorldTransform> {
        let e = self.elements.get(&id)?;
        let local = WorldTransform {
            position: e.position,
            scale: e.scale,
            opacity: e.opacity,
            visible: e.in_scene,
        };
        match e.parent.and_then(|p| self.world_transform(p)) {
            Some(parent) => Some(WorldTransform {
                position: parent.position + e.position.scale_by(parent.scale),
                scale: e.scale.scale_by(parent.scale),
                opacity: parent.opacity * e.opacity,
                visible: parent.visible && e.in_scene,
            }),
            None => Some(local),
        }
    }
}
