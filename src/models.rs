// Wire types for the StayFinder REST API.
//
// Field names follow the API's camelCase JSON. Every response body arrives
// wrapped in the `{ success, message, data }` envelope.

use serde::{Deserialize, Serialize};

// Generic response envelope used by every endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub images: Vec<ListingImage>,
    pub location: Location,
    pub capacity: Capacity,
    pub pricing: ListingPricing,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub property_type: Option<String>,
    #[serde(default)]
    pub room_type: Option<String>,
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub featured: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListingImage {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Location {
    #[serde(default)]
    pub address: Option<String>,
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub country: String,
    // [longitude, latitude], GeoJSON order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<[f64; 2]>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct Capacity {
    pub guests: u32,
    pub bedrooms: u32,
    #[serde(default)]
    pub bathrooms: f64,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPricing {
    pub base_price: i64,
    #[serde(default)]
    pub cleaning_fee: i64,
}

// Host-authored listing content, sent on create and update. The server
// assigns the id and the derived fields (rating, featured flag).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub images: Vec<ListingImage>,
    pub location: Location,
    pub capacity: Capacity,
    pub pricing: ListingPricing,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_type: Option<String>,
}

// One page of search results plus its pagination envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListingPage {
    pub listings: Vec<Listing>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_listings: u64,
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub has_prev_page: bool,
}

// ---------------------------------------------------------------------------
// Bookings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct GuestCount {
    pub adults: u32,
    #[serde(default)]
    pub children: u32,
    #[serde(default)]
    pub infants: u32,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPricing {
    pub base_price: i64,
    pub cleaning_fee: i64,
    pub service_fee: i64,
    pub taxes: i64,
    pub total_price: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: String,
    pub listing: BookingListing,
    pub check_in: String,
    pub check_out: String,
    pub guests: GuestCount,
    pub status: BookingStatus,
    pub pricing: BookingPricing,
    #[serde(default)]
    pub messages: Vec<BookingMessage>,
}

// The listing summary embedded in a booking payload.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BookingListing {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub location: Location,
    #[serde(default)]
    pub images: Vec<ListingImage>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingMessage {
    pub sender: String,
    pub message: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

// Payload for `POST /bookings`. `payment.method` is indicative only; real
// card data never passes through this client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub listing: String,
    pub check_in: String,
    pub check_out: String,
    pub guests: GuestCount,
    pub payment: PaymentMethod,
    pub pricing: BookingPricing,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentMethod {
    pub method: String,
}

// ---------------------------------------------------------------------------
// Users and auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_info: Option<HostInfo>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostInfo {
    #[serde(default)]
    pub is_host: bool,
}

// `POST /auth/login` and `POST /auth/register` both return the user plus a
// bearer token.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthPayload {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}
