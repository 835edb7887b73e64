// Search session: keeps one canonical `FilterState` in sync with the
// address bar and the listings endpoint.
//
// Every mutation rewrites the address-bar query in place, and `refresh`
// carries a generation ticket so a slow response never overwrites the
// results of a later search.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::client::StayfinderClient;
use crate::filters::{FilterState, FilterUpdate};
use crate::models::ListingPage;
use crate::transport::{ApiError, HttpBackend};

// Where the canonical query-string projection is published. Rewrites
// replace the previous value; no history entry is stacked.
pub trait AddressBar: Send + Sync {
    fn replace_query(&self, query: &str);
}

// Plain in-memory address bar.
#[derive(Debug, Default)]
pub struct MemoryAddressBar {
    query: Mutex<String>,
}

impl MemoryAddressBar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> String {
        self.query.lock().clone()
    }
}

impl AddressBar for MemoryAddressBar {
    fn replace_query(&self, query: &str) {
        *self.query.lock() = query.to_string();
    }
}

pub struct SearchSession<B: HttpBackend, A: AddressBar = MemoryAddressBar> {
    client: Arc<StayfinderClient<B>>,
    address_bar: A,
    filters: Mutex<FilterState>,
    generation: AtomicU64,
}

impl<B: HttpBackend, A: AddressBar> SearchSession<B, A> {
    pub fn new(client: Arc<StayfinderClient<B>>, address_bar: A) -> Self {
        let session = Self {
            client,
            address_bar,
            filters: Mutex::new(FilterState::default()),
            generation: AtomicU64::new(0),
        };
        session.sync_address_bar();
        session
    }

    // Start from an address-bar query, e.g. when a shared link is opened.
    // The bar is rewritten with the canonical form of what was parsed.
    pub fn from_query_string(
        client: Arc<StayfinderClient<B>>,
        address_bar: A,
        query: &str,
    ) -> Self {
        let session = Self {
            client,
            address_bar,
            filters: Mutex::new(FilterState::from_query_string(query)),
            generation: AtomicU64::new(0),
        };
        session.sync_address_bar();
        session
    }

    pub fn filters(&self) -> FilterState {
        self.filters.lock().clone()
    }

    pub fn update_filter(&self, change: FilterUpdate) {
        self.filters.lock().update(change);
        self.sync_address_bar();
    }

    pub fn toggle_amenity(&self, id: &str) {
        self.filters.lock().toggle_amenity(id);
        self.sync_address_bar();
    }

    pub fn set_page(&self, page: u32) {
        self.filters.lock().set_page(page);
        self.sync_address_bar();
    }

    pub fn clear_filters(&self) {
        self.filters.lock().clear();
        self.sync_address_bar();
    }

    // Fetch listings for the current filters. Returns `Ok(None)` when a
    // newer refresh started while this one was in flight; the stale
    // result (or its error) is discarded.
    pub async fn refresh(&self) -> Result<Option<ListingPage>, ApiError> {
        let snapshot = self.filters();
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(ticket, query = %snapshot.to_query_string(), "search dispatched");

        let result = self.client.search_listings(&snapshot).await;

        if self.generation.load(Ordering::SeqCst) != ticket {
            tracing::debug!(ticket, "search superseded, result dropped");
            return Ok(None);
        }
        result.map(Some)
    }

    fn sync_address_bar(&self) {
        let query = self.filters.lock().to_query_string();
        self.address_bar.replace_query(&query);
    }
}
