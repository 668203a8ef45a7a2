use std::collections::BTreeMap;

use crate::editor::EditorInstance;
use crate::types::EditorId;

/// Explicit owner of every editor on a page, keyed by id.
#[derive(Debug, Default)]
pub struct EditorRegistry {
    editors: BTreeMap<EditorId, EditorInstance>,
}

impl EditorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an editor. An editor already registered under the same id is
    /// destroyed and returned.
    pub fn insert(&mut self, editor: EditorInstance) -> Option<EditorInstance> {
        let mut replaced = self.editors.insert(editor.id().clone(), editor);
        if let Some(old) = replaced.as_mut() {
            tracing::debug!(editor = %old.id(), "replacing registered editor");
            old.destroy();
        }
        replaced
    }

    pub fn get(&self, id: &EditorId) -> Option<&EditorInstance> {
        self.editors.get(id)
    }

    pub fn get_mut(&mut self, id: &EditorId) -> Option<&mut EditorInstance> {
        self.editors.get_mut(id)
    }

    pub fn contains(&self, id: &EditorId) -> bool {
        self.editors.contains_key(id)
    }

    /// Current text of an editor, `None` if it is not registered.
    pub fn value(&self, id: &EditorId) -> Option<&str> {
        self.editors.get(id).map(EditorInstance::value)
    }

    pub fn remove(&mut self, id: &EditorId) -> Option<EditorInstance> {
        self.editors.remove(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &EditorId> {
        self.editors.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EditorInstance> {
        self.editors.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut EditorInstance> {
        self.editors.values_mut()
    }

    pub fn len(&self) -> usize {
        self.editors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.editors.is_empty()
    }

    /// Destroy and drop every editor.
    pub fn clear(&mut self) {
        for editor in self.editors.values_mut() {
            editor.destroy();
        }
        self.editors.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;
    use std::time::Duration;

    use solvebook_renderer::Renderer;

    use super::*;
    use crate::memory::MemoryMount;
    use crate::platform::MountRequest;
    use crate::types::EngineKind;

    fn editor(mount: &mut MemoryMount, id: EditorId) -> EditorInstance {
        let request = MountRequest {
            container: id.container(),
            id,
            placeholder: String::new(),
            engine: EngineKind::Buffer,
        };
        EditorInstance::create(
            mount,
            request,
            Rc::new(Renderer::default()),
            Duration::from_millis(500),
        )
    }

    #[test]
    fn editors_are_independent() {
        let mut mount = MemoryMount::solution_page();
        let mut registry = EditorRegistry::new();
        registry.insert(editor(&mut mount, EditorId::SUMMARY));
        registry.insert(editor(&mut mount, EditorId::CODE));

        registry
            .get_mut(&EditorId::CODE)
            .unwrap()
            .set_value("int main() {}");
        assert_eq!(registry.value(&EditorId::CODE), Some("int main() {}"));
        assert_eq!(registry.value(&EditorId::SUMMARY), Some(""));
        assert_eq!(
            registry.ids().cloned().collect::<Vec<_>>(),
            vec![EditorId::CODE, EditorId::SUMMARY]
        );
    }

    #[test]
    fn reinserting_destroys_the_old_editor() {
        let mut mount = MemoryMount::solution_page();
        let mut registry = EditorRegistry::new();
        registry.insert(editor(&mut mount, EditorId::CODE));
        let old = registry.insert(editor(&mut mount, EditorId::CODE)).unwrap();
        assert!(old.is_destroyed());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn clear_destroys_everything() {
        let mut mount = MemoryMount::solution_page();
        let mut registry = EditorRegistry::new();
        registry.insert(editor(&mut mount, EditorId::CODE));
        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.value(&EditorId::CODE), None);
    }
}
