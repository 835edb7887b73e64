// Typed client for the StayFinder REST API.
//
// Wraps an `HttpBackend` with the session store, the search cache and
// request counters. Network and API failures surface to the caller as
// `ApiError`; the core never retries.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::cache::{CacheConfig, SearchCache};
use crate::filters::FilterState;
use crate::models::{
    ApiEnvelope, AuthPayload, Booking, BookingStatus, Credentials, Listing, ListingDraft,
    ListingPage, NewBooking, Registration, User,
};
use crate::session::{Session, SessionStore};
use crate::transport::{ApiError, ApiRequest, ClientConfig, HttpBackend, Method, ReqwestBackend};

#[derive(Debug, Default)]
struct ClientStats {
    requests_sent: AtomicUsize,
    requests_succeeded: AtomicUsize,
    requests_failed: AtomicUsize,
    cache_hits: AtomicUsize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClientStatsReport {
    pub requests_sent: usize,
    pub requests_succeeded: usize,
    pub requests_failed: usize,
    pub cache_hits: usize,
}

// Inner payload shapes under the response envelope.
#[derive(Deserialize)]
struct UserPayload {
    user: User,
}

#[derive(Deserialize)]
struct ListingPayload {
    listing: Listing,
}

#[derive(Deserialize)]
struct BookingPayload {
    booking: Booking,
}

#[derive(Deserialize)]
struct BookingsPayload {
    bookings: Vec<Booking>,
}

pub struct StayfinderClient<B: HttpBackend = ReqwestBackend> {
    backend: Arc<B>,
    session: SessionStore,
    cache: SearchCache,
    // One gate per cache key; concurrent identical searches coalesce on it.
    in_flight: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
    stats: ClientStats,
}

impl StayfinderClient<ReqwestBackend> {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let backend = ReqwestBackend::new(&config)?;
        Ok(Self::with_backend(Arc::new(backend), CacheConfig::default()))
    }
}

impl<B: HttpBackend> StayfinderClient<B> {
    pub fn with_backend(backend: Arc<B>, cache_config: CacheConfig) -> Self {
        Self {
            backend,
            session: SessionStore::new(),
            cache: SearchCache::new(cache_config),
            in_flight: DashMap::new(),
            stats: ClientStats::default(),
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn cache(&self) -> &SearchCache {
        &self.cache
    }

    pub fn stats(&self) -> ClientStatsReport {
        ClientStatsReport {
            requests_sent: self.stats.requests_sent.load(Ordering::SeqCst),
            requests_succeeded: self.stats.requests_succeeded.load(Ordering::SeqCst),
            requests_failed: self.stats.requests_failed.load(Ordering::SeqCst),
            cache_hits: self.stats.cache_hits.load(Ordering::SeqCst),
        }
    }

    // -- Request plumbing --------------------------------------------------

    async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.stats.requests_sent.fetch_add(1, Ordering::SeqCst);

        let response = match self.backend.execute(request).await {
            Ok(response) => response,
            Err(err) => {
                self.stats.requests_failed.fetch_add(1, Ordering::SeqCst);
                return Err(err);
            }
        };

        if !response.is_success() {
            self.stats.requests_failed.fetch_add(1, Ordering::SeqCst);
            let message = extract_message(&response.body);
            tracing::warn!(status = response.status, %message, "API request failed");
            return Err(ApiError::Api {
                status: response.status,
                message,
            });
        }

        self.stats.requests_succeeded.fetch_add(1, Ordering::SeqCst);
        let envelope: ApiEnvelope<T> = serde_json::from_slice(&response.body)?;
        Ok(envelope.data)
    }

    fn bearer(&self) -> Result<Option<String>, ApiError> {
        match self.session.token() {
            Some(token) => Ok(Some(token)),
            None => Err(ApiError::Unauthorized),
        }
    }

    // -- Auth --------------------------------------------------------------

    pub async fn register(&self, registration: &Registration) -> Result<Session, ApiError> {
        let request = ApiRequest::new(Method::POST, "/auth/register")
            .json(serde_json::to_value(registration)?);
        let payload: AuthPayload = self.send(request).await?;
        let session = Session {
            user: payload.user,
            token: payload.token,
        };
        self.session.open(session.clone());
        Ok(session)
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<Session, ApiError> {
        let request =
            ApiRequest::new(Method::POST, "/auth/login").json(serde_json::to_value(credentials)?);
        let payload: AuthPayload = self.send(request).await?;
        let session = Session {
            user: payload.user,
            token: payload.token,
        };
        self.session.open(session.clone());
        Ok(session)
    }

    // Re-validate a stored token on startup; opens a session when the
    // server still accepts it.
    pub async fn restore_session(&self, token: &str) -> Result<Session, ApiError> {
        let request =
            ApiRequest::new(Method::GET, "/auth/me").bearer(Some(token.to_string()));
        let payload: UserPayload = self.send(request).await?;
        let session = Session {
            user: payload.user,
            token: token.to_string(),
        };
        self.session.open(session.clone());
        Ok(session)
    }

    // Local teardown; the bearer token simply stops being sent.
    pub fn logout(&self) {
        self.session.close();
    }

    pub async fn profile(&self) -> Result<User, ApiError> {
        let request = ApiRequest::new(Method::GET, "/auth/me").bearer(self.bearer()?);
        let payload: UserPayload = self.send(request).await?;
        Ok(payload.user)
    }

    pub async fn update_profile(&self, updates: &serde_json::Value) -> Result<User, ApiError> {
        let request = ApiRequest::new(Method::PUT, "/auth/profile")
            .json(updates.clone())
            .bearer(self.bearer()?);
        let payload: UserPayload = self.send(request).await?;
        self.refresh_session_user(payload.user.clone());
        Ok(payload.user)
    }

    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        let request = ApiRequest::new(Method::PUT, "/auth/password")
            .json(json!({
                "currentPassword": current_password,
                "newPassword": new_password,
            }))
            .bearer(self.bearer()?);
        let _: serde_json::Value = self.send(request).await?;
        Ok(())
    }

    pub async fn become_host(&self) -> Result<User, ApiError> {
        let request =
            ApiRequest::new(Method::POST, "/auth/become-host").bearer(self.bearer()?);
        let payload: UserPayload = self.send(request).await?;
        self.refresh_session_user(payload.user.clone());
        Ok(payload.user)
    }

    fn refresh_session_user(&self, user: User) {
        if let Some(session) = self.session.current() {
            self.session.open(Session { user, ..session });
        }
    }

    // -- Listings ----------------------------------------------------------

    // Filtered search. The omit-empty query projection doubles as the cache
    // key, deduplicating identical searches: repeats within the TTL are
    // served from the cache, and concurrent identical searches coalesce
    // onto a single in-flight request.
    pub async fn search_listings(&self, filters: &FilterState) -> Result<ListingPage, ApiError> {
        let key = filters.to_query_string();
        if let Some(page) = self.cache.get(&key) {
            self.stats.cache_hits.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(%key, "search served from cache");
            return Ok(page);
        }

        let gate = Arc::clone(&self.in_flight.entry(key.clone()).or_default());
        let result = {
            let _guard = gate.lock().await;
            // An identical search may have landed while we waited.
            match self.cache.get(&key) {
                Some(page) => {
                    self.stats.cache_hits.fetch_add(1, Ordering::SeqCst);
                    tracing::debug!(%key, "search coalesced onto in-flight request");
                    Ok(page)
                }
                None => {
                    let query = filters
                        .to_query_params()
                        .into_iter()
                        .map(|(k, v)| (k.to_string(), v))
                        .collect();
                    let request = ApiRequest::new(Method::GET, "/listings").query(query);
                    let fetched: Result<ListingPage, ApiError> = self.send(request).await;
                    if let Ok(page) = &fetched {
                        self.cache.store(&key, page.clone(), None);
                    }
                    fetched
                }
            }
        };
        self.in_flight.remove(&key);
        result
    }

    // Warm the cache for a set of expected searches, fetched concurrently.
    // Returns how many completed successfully.
    pub async fn warm_cache(&self, searches: &[FilterState]) -> usize {
        let fetches = searches.iter().map(|filters| self.search_listings(filters));
        join_all(fetches)
            .await
            .into_iter()
            .filter(Result::is_ok)
            .count()
    }

    pub async fn listing(&self, id: &str) -> Result<Listing, ApiError> {
        let request = ApiRequest::new(Method::GET, format!("/listings/{id}"));
        let payload: ListingPayload = self.send(request).await?;
        Ok(payload.listing)
    }

    pub async fn create_listing(&self, draft: &ListingDraft) -> Result<Listing, ApiError> {
        let request = ApiRequest::new(Method::POST, "/listings")
            .json(serde_json::to_value(draft)?)
            .bearer(self.bearer()?);
        let payload: ListingPayload = self.send(request).await?;
        self.cache.invalidate_all();
        Ok(payload.listing)
    }

    pub async fn update_listing(
        &self,
        id: &str,
        draft: &ListingDraft,
    ) -> Result<Listing, ApiError> {
        let request = ApiRequest::new(Method::PUT, format!("/listings/{id}"))
            .json(serde_json::to_value(draft)?)
            .bearer(self.bearer()?);
        let payload: ListingPayload = self.send(request).await?;
        self.cache.invalidate_all();
        Ok(payload.listing)
    }

    pub async fn delete_listing(&self, id: &str) -> Result<(), ApiError> {
        let request =
            ApiRequest::new(Method::DELETE, format!("/listings/{id}")).bearer(self.bearer()?);
        let _: serde_json::Value = self.send(request).await?;
        self.cache.invalidate_all();
        Ok(())
    }

    pub async fn my_listings(&self) -> Result<ListingPage, ApiError> {
        let request = ApiRequest::new(Method::GET, "/listings/host/my-listings")
            .bearer(self.bearer()?);
        self.send(request).await
    }

    // -- Bookings ----------------------------------------------------------

    pub async fn create_booking(&self, booking: &NewBooking) -> Result<Booking, ApiError> {
        let request = ApiRequest::new(Method::POST, "/bookings")
            .json(serde_json::to_value(booking)?)
            .bearer(self.bearer()?);
        let payload: BookingPayload = self.send(request).await?;
        // Availability changed; cached searches may now be wrong.
        self.cache.invalidate_all();
        Ok(payload.booking)
    }

    pub async fn booking(&self, id: &str) -> Result<Booking, ApiError> {
        let request =
            ApiRequest::new(Method::GET, format!("/bookings/{id}")).bearer(self.bearer()?);
        let payload: BookingPayload = self.send(request).await?;
        Ok(payload.booking)
    }

    pub async fn my_bookings(&self) -> Result<Vec<Booking>, ApiError> {
        let request =
            ApiRequest::new(Method::GET, "/bookings/my-bookings").bearer(self.bearer()?);
        let payload: BookingsPayload = self.send(request).await?;
        Ok(payload.bookings)
    }

    pub async fn host_bookings(&self) -> Result<Vec<Booking>, ApiError> {
        let request =
            ApiRequest::new(Method::GET, "/bookings/host-bookings").bearer(self.bearer()?);
        let payload: BookingsPayload = self.send(request).await?;
        Ok(payload.bookings)
    }

    pub async fn update_booking_status(
        &self,
        id: &str,
        status: BookingStatus,
    ) -> Result<Booking, ApiError> {
        let request = ApiRequest::new(Method::PUT, format!("/bookings/{id}/status"))
            .json(json!({ "status": status }))
            .bearer(self.bearer()?);
        let payload: BookingPayload = self.send(request).await?;
        Ok(payload.booking)
    }

    pub async fn add_booking_message(&self, id: &str, message: &str) -> Result<Booking, ApiError> {
        let request = ApiRequest::new(Method::POST, format!("/bookings/{id}/messages"))
            .json(json!({ "message": message }))
            .bearer(self.bearer()?);
        let payload: BookingPayload = self.send(request).await?;
        Ok(payload.booking)
    }
}

// Best-effort extraction of the server's error message from a failure body.
fn extract_message(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| "An unexpected error occurred".to_string())
}
