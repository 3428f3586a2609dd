use std::any::TypeId;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use tokio::sync::OnceCell;

use crate::database::Database;
use crate::entity::Entity;
use crate::error::DataError;
use crate::link::Link;
use crate::link_meta::{LinkDescriptor, LinkShape};
use crate::meta::{Descriptor, Shape};

type Slot<T> = Arc<OnceCell<Arc<T>>>;
type RegistryKey = (String, TypeId);

/// Memoized descriptors keyed by `(connection target, type)`.
///
/// Each descriptor is built at most once per key, even under concurrent
/// first use: racing callers wait on the same cell. A failed build leaves
/// the cell empty so the next caller retries.
#[derive(Default)]
pub struct Registry {
    entities: DashMap<RegistryKey, Slot<Descriptor>>,
    links: DashMap<RegistryKey, Slot<LinkDescriptor>>,
    builds: AtomicUsize,
}

static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by [`Database::new`].
    pub fn global() -> Arc<Registry> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Registry::new())))
    }

    /// Number of descriptors successfully built through this registry.
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    /// Number of descriptors currently held (entities and links).
    pub fn len(&self) -> usize {
        self.entities
            .iter()
            .filter(|e| e.value().initialized())
            .count()
            + self
                .links
                .iter()
                .filter(|e| e.value().initialized())
                .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entity_slot(&self, key: RegistryKey) -> Slot<Descriptor> {
        Arc::clone(self.entities.entry(key).or_default().value())
    }

    fn link_slot(&self, key: RegistryKey) -> Slot<LinkDescriptor> {
        Arc::clone(self.links.entry(key).or_default().value())
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("entities", &self.entities.len())
            .field("links", &self.links.len())
            .field("builds", &self.builds())
            .finish()
    }
}

impl Database {
    /// Descriptor of entity type `E` for this connection's target, built on
    /// first use.
    pub async fn descriptor<E: Entity>(&mut self) -> Result<Arc<Descriptor>, DataError> {
        let registry = self.registry();
        let slot = registry.entity_slot((self.target().to_string(), TypeId::of::<E>()));
        let db = self;
        let descriptor = slot
            .get_or_try_init(move || async move {
                let schema = E::schema();
                let manual = schema
                    .manual
                    .iter()
                    .map(|p| crate::column::column_name(p))
                    .collect();
                let built = Descriptor::introspect(
                    db,
                    Shape {
                        table: schema.table,
                        key: Some(schema.key),
                        properties: schema.properties,
                        manual,
                        queries: schema.queries,
                        link: None,
                    },
                )
                .await?;
                registry.builds.fetch_add(1, Ordering::SeqCst);
                Ok::<_, DataError>(Arc::new(built))
            })
            .await?;
        Ok(Arc::clone(descriptor))
    }

    /// Descriptor of link type `L` for this connection's target, built on
    /// first use.
    pub async fn link_descriptor<L: Link>(&mut self) -> Result<Arc<LinkDescriptor>, DataError> {
        let registry = self.registry();
        let slot = registry.link_slot((self.target().to_string(), TypeId::of::<L>()));
        let db = self;
        let descriptor = slot
            .get_or_try_init(move || async move {
                let schema = L::schema();
                let built = LinkDescriptor::introspect(
                    db,
                    LinkShape {
                        table: schema.table,
                        from_table: <L::From as Entity>::schema().table,
                        to_table: <L::To as Entity>::schema().table,
                        from_key: schema.from_key,
                        to_key: schema.to_key,
                        properties: schema.properties,
                        additional_key: schema.additional_key,
                        manual: schema.manual,
                        queries: schema.queries,
                        order_from: schema.order_from,
                        order_to: schema.order_to,
                    },
                )
                .await?;
                registry.builds.fetch_add(1, Ordering::SeqCst);
                Ok::<_, DataError>(Arc::new(built))
            })
            .await?;
        Ok(Arc::clone(descriptor))
    }
}
