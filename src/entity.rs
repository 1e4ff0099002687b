//! Entity/Component Registry
//!
//! A deliberately small registry next to the asset layer: entities are
//! reference-counted slots carrying a 32-bit component bitmask, components
//! are opaque boxed payloads, and a per-type map links entity to component.
//!
//! Queries are a linear scan over live entities — O(entities) with a mask
//! test each, which is fine at the few-hundred-entity scale this layer
//! targets.

use std::any::Any;

use rustc_hash::FxHashMap;
use slotmap::new_key_type;

use crate::error::{EngineError, Result};
use crate::registry::{RefRegistry, Release};

/// Number of distinct component type bits.
pub const COMPONENT_TYPE_COUNT: u32 = 32;

new_key_type! {
    /// Handle to a live entity.
    pub struct EntityHandle;
    /// Handle to a component payload.
    pub struct ComponentHandle;
}

#[derive(Default)]
struct EntityData {
    mask: u32,
}

/// Entities, components, and the per-type attachment maps.
pub struct EntityWorld {
    entities: RefRegistry<EntityHandle, EntityData>,
    components: RefRegistry<ComponentHandle, Box<dyn Any + Send>>,
    attachments: [FxHashMap<EntityHandle, ComponentHandle>; COMPONENT_TYPE_COUNT as usize],
}

impl EntityWorld {
    #[must_use]
    pub fn new(max_entities: usize, max_components: usize) -> Self {
        Self {
            entities: RefRegistry::new("entity", max_entities),
            components: RefRegistry::new("component", max_components),
            attachments: std::array::from_fn(|_| FxHashMap::default()),
        }
    }

    /// Creates an entity with an empty component mask and refcount 1.
    pub fn create_entity(&mut self) -> Result<EntityHandle> {
        self.entities.insert_unkeyed(EntityData::default())
    }

    /// Takes ownership of a component payload.
    pub fn create_component(&mut self, payload: Box<dyn Any + Send>) -> Result<ComponentHandle> {
        self.components.insert_unkeyed(payload)
    }

    /// Component bitmask of an entity.
    #[must_use]
    pub fn mask(&self, entity: EntityHandle) -> Option<u32> {
        self.entities.get(entity).map(|e| e.mask)
    }

    /// Attaches a component of type `bit` to an entity.
    ///
    /// Attaching a second component of the same type to the same entity is
    /// an error, never a silent overwrite.
    pub fn add_component(
        &mut self,
        entity: EntityHandle,
        bit: u32,
        component: ComponentHandle,
    ) -> Result<()> {
        if bit >= COMPONENT_TYPE_COUNT {
            return Err(EngineError::InvalidComponentType { bit });
        }
        if self.components.get(component).is_none() {
            return Err(EngineError::InvalidHandle { kind: "component" });
        }
        let Some(data) = self.entities.get_mut(entity) else {
            return Err(EngineError::InvalidHandle { kind: "entity" });
        };
        let flag = 1u32 << bit;
        if data.mask & flag != 0 {
            return Err(EngineError::ComponentAlreadyAttached { bit });
        }
        data.mask |= flag;
        self.attachments[bit as usize].insert(entity, component);
        Ok(())
    }

    /// The component of type `bit` attached to an entity, if any.
    #[must_use]
    pub fn component_data(&self, entity: EntityHandle, bit: u32) -> Option<&dyn Any> {
        if bit >= COMPONENT_TYPE_COUNT {
            return None;
        }
        let handle = *self.attachments[bit as usize].get(&entity)?;
        self.components
            .get(handle)
            .map(|payload| payload.as_ref() as &dyn Any)
    }

    /// Typed accessor over [`component_data`](Self::component_data).
    #[must_use]
    pub fn component<T: Any>(&self, entity: EntityHandle, bit: u32) -> Option<&T> {
        self.component_data(entity, bit)?.downcast_ref::<T>()
    }

    /// Destroys a component payload. If the component is still attached,
    /// the attachment record is removed and the owning entity's mask bit
    /// cleared, so queries stop matching it. Stale handles log and no-op.
    pub fn destroy_component(&mut self, component: ComponentHandle) {
        match self.components.release(component) {
            Release::Invalid => log::warn!("destroy_component: stale component handle"),
            Release::Retained(_) => {}
            Release::Freed(_) => self.detach_everywhere(component),
        }
    }

    /// Removes every attachment record pointing at a freed component.
    fn detach_everywhere(&mut self, component: ComponentHandle) {
        for bit in 0..COMPONENT_TYPE_COUNT as usize {
            let map = &mut self.attachments[bit];
            let owners: Vec<EntityHandle> = map
                .iter()
                .filter(|&(_, &c)| c == component)
                .map(|(&entity, _)| entity)
                .collect();
            for entity in owners {
                map.remove(&entity);
                if let Some(data) = self.entities.get_mut(entity) {
                    data.mask &= !(1u32 << bit);
                }
            }
        }
    }

    /// Decrements an entity's refcount; at zero every attached component is
    /// destroyed and the slot queued for the end-of-frame free.
    pub fn destroy_entity(&mut self, entity: EntityHandle) {
        let Some(refs) = self.entities.refs(entity) else {
            log::warn!("destroy_entity: stale entity handle");
            return;
        };
        if refs == 1 {
            // Last reference: tear down every attached component first.
            for bit in 0..COMPONENT_TYPE_COUNT {
                if let Some(component) = self.attachments[bit as usize].remove(&entity) {
                    self.destroy_component(component);
                }
            }
        }
        match self.entities.release(entity) {
            Release::Invalid => log::warn!("destroy_entity: stale entity handle"),
            Release::Retained(_) | Release::Freed(_) => {}
        }
    }

    /// Every live entity whose mask contains *at least* the requested bits.
    #[must_use]
    pub fn query(&self, mask: u32) -> Vec<EntityHandle> {
        self.entities
            .iter()
            .filter(|(_, _, _, data)| data.mask & mask == mask)
            .map(|(handle, _, _, _)| handle)
            .collect()
    }

    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn drain_deferred(&mut self) -> usize {
        self.entities.drain_deferred() + self.components.drain_deferred()
    }

    /// Drops everything. Shutdown only.
    pub fn drain_all(&mut self) -> usize {
        for map in &mut self.attachments {
            map.clear();
        }
        self.entities.drain_all().len() + self.components.drain_all().len()
    }
}
