/// Per-tenant record collections
///
/// A [`WorkingSet`] is the in-process mirror of one tenant's business
/// records: plain keyed collections with no validation and no persistence.
/// Durability and staleness are someone else's job (`db::retry` and the
/// hydrator respectively); mutations here apply synchronously and are
/// visible to the very next read in the same process.

use uuid::Uuid;

use crate::models::records::{BomLine, NonConformance, StockItem, Supplier};

/// A record type that lives in a named working-set collection.
///
/// The associated accessors let [`TenantHandle`](super::TenantHandle) and the
/// hydrator address "the collection for `T`" generically instead of
/// duplicating find/append/replace/remove per record type.
pub trait WorkingRecord: Clone + Send + Sync + 'static {
    /// Collection name, used for logging and durable table addressing
    const COLLECTION: &'static str;

    /// Primary key of this record
    fn id(&self) -> Uuid;

    /// The collection holding records of this type
    fn collection(ws: &WorkingSet) -> &Collection<Self>
    where
        Self: Sized;

    /// Mutable access to the collection holding records of this type
    fn collection_mut(ws: &mut WorkingSet) -> &mut Collection<Self>
    where
        Self: Sized;
}

/// An ordered list of records keyed by id
#[derive(Debug, Clone)]
pub struct Collection<T> {
    items: Vec<T>,
}

impl<T: WorkingRecord> Collection<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Finds a record by id
    pub fn find(&self, id: Uuid) -> Option<&T> {
        self.items.iter().find(|r| r.id() == id)
    }

    /// Appends a record, preserving insertion order
    pub fn append(&mut self, record: T) {
        self.items.push(record);
    }

    /// Replaces the record with the same id in place; returns whether a
    /// record was found to replace
    pub fn replace(&mut self, id: Uuid, record: T) -> bool {
        match self.items.iter_mut().find(|r| r.id() == id) {
            Some(slot) => {
                *slot = record;
                true
            }
            None => false,
        }
    }

    /// Removes a record by id; returns whether anything was removed
    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|r| r.id() != id);
        self.items.len() != before
    }

    /// Wholesale replacement. Only the hydrator does this; all other
    /// mutation is incremental, which is what makes the write-ordering
    /// invariant sufficient.
    pub fn replace_all(&mut self, items: Vec<T>) {
        self.items = items;
    }
}

impl<T: WorkingRecord> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// One tenant's in-process record collections
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    pub suppliers: Collection<Supplier>,
    pub bom_lines: Collection<BomLine>,
    pub stock_items: Collection<StockItem>,
    pub non_conformances: Collection<NonConformance>,
}

impl WorkingSet {
    /// An empty skeleton, as created on first access for a tenant
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkingRecord for Supplier {
    const COLLECTION: &'static str = "suppliers";

    fn id(&self) -> Uuid {
        self.id
    }

    fn collection(ws: &WorkingSet) -> &Collection<Self> {
        &ws.suppliers
    }

    fn collection_mut(ws: &mut WorkingSet) -> &mut Collection<Self> {
        &mut ws.suppliers
    }
}

impl WorkingRecord for BomLine {
    const COLLECTION: &'static str = "bom_lines";

    fn id(&self) -> Uuid {
        self.id
    }

    fn collection(ws: &WorkingSet) -> &Collection<Self> {
        &ws.bom_lines
    }

    fn collection_mut(ws: &mut WorkingSet) -> &mut Collection<Self> {
        &mut ws.bom_lines
    }
}

impl WorkingRecord for StockItem {
    const COLLECTION: &'static str = "stock_items";

    fn id(&self) -> Uuid {
        self.id
    }

    fn collection(ws: &WorkingSet) -> &Collection<Self> {
        &ws.stock_items
    }

    fn collection_mut(ws: &mut WorkingSet) -> &mut Collection<Self> {
        &mut ws.stock_items
    }
}

impl WorkingRecord for NonConformance {
    const COLLECTION: &'static str = "non_conformances";

    fn id(&self) -> Uuid {
        self.id
    }

    fn collection(ws: &WorkingSet) -> &Collection<Self> {
        &ws.non_conformances
    }

    fn collection_mut(ws: &mut WorkingSet) -> &mut Collection<Self> {
        &mut ws.non_conformances
    }
}
