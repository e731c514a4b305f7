use std::collections::HashMap;

use slotmap::SlotMap;

use crate::{
    core::{ElementId, Property, PropertyMap, Rect},
    error::{RevealError, RevealResult},
};

/// The retained scene the animation core drives.
///
/// The core only reads geometry and only writes named numeric properties; it never
/// reads styles back.
pub trait RenderLayer {
    /// Document-space bounds of `id`, or `None` if the element is not mounted.
    fn geometry(&self, id: ElementId) -> Option<Rect>;

    fn set_property(&mut self, id: ElementId, prop: Property, value: f64);
}

#[derive(Clone, Debug)]
struct Element {
    name: String,
    rect: Rect,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    props: PropertyMap,
}

/// In-memory retained scene graph: named elements with bounds, children, and the
/// properties written into them.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    elements: SlotMap<ElementId, Element>,
    by_name: HashMap<String, ElementId>,
    mutations: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_root(&mut self, name: impl Into<String>, rect: Rect) -> RevealResult<ElementId> {
        self.insert(name.into(), rect, None)
    }

    pub fn add_child(
        &mut self,
        parent: ElementId,
        name: impl Into<String>,
        rect: Rect,
    ) -> RevealResult<ElementId> {
        if self.get(parent).is_none() {
            return Err(RevealError::missing_target(format!(
                "parent element {parent} is not mounted"
            )));
        }
        self.insert(name.into(), rect, Some(parent))
    }

    fn insert(
        &mut self,
        name: String,
        rect: Rect,
        parent: Option<ElementId>,
    ) -> RevealResult<ElementId> {
        if self.by_name.contains_key(&name) {
            return Err(RevealError::validation(format!(
                "element name '{name}' is already mounted"
            )));
        }
        let id = self.elements.insert(Element {
            name: name.clone(),
            rect,
            parent,
            children: Vec::new(),
            props: PropertyMap::new(),
        });
        self.by_name.insert(name, id);
        if let Some(p) = parent.and_then(|p| self.get_mut(p)) {
            p.children.push(id);
        }
        Ok(id)
    }

    fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(id)
    }

    pub fn find(&self, name: &str) -> Option<ElementId> {
        self.by_name.get(name).copied()
    }

    /// Like [`Scene::find`], failing with `MissingTarget` when absent.
    pub fn require(&self, name: &str) -> RevealResult<ElementId> {
        self.find(name)
            .ok_or_else(|| RevealError::missing_target(format!("no element named '{name}'")))
    }

    pub fn name(&self, id: ElementId) -> Option<&str> {
        self.get(id).map(|e| e.name.as_str())
    }

    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.get(id).map(|e| e.children.as_slice()).unwrap_or(&[])
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn set_rect(&mut self, id: ElementId, rect: Rect) -> RevealResult<()> {
        let el = self
            .get_mut(id)
            .ok_or_else(|| RevealError::missing_target(format!("element {id} is not mounted")))?;
        el.rect = rect;
        Ok(())
    }

    /// Last value written for `prop`, if any.
    pub fn property(&self, id: ElementId, prop: Property) -> Option<f64> {
        self.get(id).and_then(|e| e.props.get(&prop).copied())
    }

    pub fn properties(&self, id: ElementId) -> Option<&PropertyMap> {
        self.get(id).map(|e| &e.props)
    }

    /// Total number of property writes accepted so far.
    pub fn mutation_count(&self) -> u64 {
        self.mutations
    }

    /// Unmounts `id` and its whole subtree. Unknown ids are ignored.
    pub fn remove(&mut self, id: ElementId) {
        let Some(el) = self.elements.remove(id) else {
            return;
        };
        self.by_name.remove(&el.name);
        if let Some(p) = el.parent.and_then(|p| self.get_mut(p)) {
            p.children.retain(|c| *c != id);
        }
        for child in el.children {
            self.remove(child);
        }
    }
}

impl RenderLayer for Scene {
    fn geometry(&self, id: ElementId) -> Option<Rect> {
        self.get(id).map(|e| e.rect)
    }

    fn set_property(&mut self, id: ElementId, prop: Property, value: f64) {
        let Some(el) = self.get_mut(id) else {
            tracing::warn!(%id, %prop, "write to unmounted element dropped");
            return;
        };
        el.props.insert(prop, value);
        self.mutations += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(y: f64, h: f64) -> Rect {
        Rect::new(0.0, y, 100.0, y + h)
    }

    #[test]
    fn names_resolve_and_must_be_unique() {
        let mut scene = Scene::new();
        let a = scene.add_root("about", rect(0.0, 10.0)).unwrap();
        assert_eq!(scene.find("about"), Some(a));
        assert!(scene.add_root("about", rect(0.0, 10.0)).is_err());
        assert!(matches!(
            scene.require("missing"),
            Err(RevealError::MissingTarget(_))
        ));
    }

    #[test]
    fn remove_unmounts_subtree() {
        let mut scene = Scene::new();
        let root = scene.add_root("section", rect(0.0, 100.0)).unwrap();
        let child = scene.add_child(root, "section.title", rect(0.0, 10.0)).unwrap();
        let grandchild = scene.add_child(child, "section.title.word", rect(0.0, 5.0)).unwrap();

        scene.remove(child);
        assert!(scene.contains(root));
        assert!(!scene.contains(child));
        assert!(!scene.contains(grandchild));
        assert!(scene.children(root).is_empty());
        assert_eq!(scene.find("section.title.word"), None);

        // Idempotent.
        scene.remove(child);
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn removed_ids_stay_dead_after_slot_reuse() {
        let mut scene = Scene::new();
        let old = scene.add_root("card", rect(0.0, 10.0)).unwrap();
        scene.remove(old);
        let new = scene.add_root("card", rect(20.0, 10.0)).unwrap();
        assert_ne!(old, new);
        assert!(!scene.contains(old));
        assert_eq!(scene.geometry(old), None);
        assert_eq!(scene.geometry(new), Some(rect(20.0, 10.0)));
        assert_eq!(scene.find("card"), Some(new));
        assert!(!scene.contains(ElementId::default()));
    }

    #[test]
    fn writes_to_unmounted_elements_are_dropped() {
        let mut scene = Scene::new();
        let id = scene.add_root("x", rect(0.0, 1.0)).unwrap();
        scene.set_property(id, Property::Opacity, 0.5);
        assert_eq!(scene.property(id, Property::Opacity), Some(0.5));
        scene.remove(id);
        scene.set_property(id, Property::Opacity, 1.0);
        assert_eq!(scene.mutation_count(), 1);
        assert_eq!(scene.geometry(id), None);
    }
}
