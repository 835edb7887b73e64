// Search filter state and its query-string projection.
//
// One canonical FilterState backs the search page. Every mutation goes
// through `update`, `set_page`, `toggle_amenity` or `clear`, and the state
// projects losslessly to and from the address-bar query string. Fields at
// their empty value are never serialized and never sent to the fetch layer.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use chrono::NaiveDate;
use url::form_urlencoded;

// Bounds the original UI enforced through its input widgets. Values outside
// these ranges are clamped, never rejected.
pub const MIN_GUESTS: u32 = 1;
pub const MAX_GUESTS: u32 = 20;
pub const MAX_BEDROOMS: u32 = 10;
pub const MAX_BATHROOMS: f64 = 10.0;
pub const FIRST_PAGE: u32 = 1;

const DATE_FORMAT: &str = "%Y-%m-%d";

// Canonical search criteria for the listings endpoint.
//
// Empty values per field: "" for strings, None for dates, 0 for counts and
// prices, 1 for guests and page, empty set for amenities.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    pub search: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub guests: u32,
    pub bedrooms: u32,
    pub bathrooms: f64,
    pub min_price: u32,
    pub max_price: u32,
    pub property_type: String,
    pub room_type: String,
    pub amenities: BTreeSet<String>,
    pub sort_by: String,
    pub page: u32,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            search: String::new(),
            city: String::new(),
            state: String::new(),
            country: String::new(),
            check_in: None,
            check_out: None,
            guests: MIN_GUESTS,
            bedrooms: 0,
            bathrooms: 0.0,
            min_price: 0,
            max_price: 0,
            property_type: String::new(),
            room_type: String::new(),
            amenities: BTreeSet::new(),
            sort_by: String::new(),
            page: FIRST_PAGE,
        }
    }
}

// A single criteria edit. Page navigation is deliberately not a variant:
// criteria edits always restart pagination, page moves go through
// `FilterState::set_page`.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterUpdate {
    Search(String),
    City(String),
    State(String),
    Country(String),
    CheckIn(Option<NaiveDate>),
    CheckOut(Option<NaiveDate>),
    Guests(u32),
    Bedrooms(u32),
    Bathrooms(f64),
    MinPrice(u32),
    MaxPrice(u32),
    PropertyType(String),
    RoomType(String),
    Amenities(BTreeSet<String>),
    SortBy(String),
}

impl FilterState {
    // Apply one criteria edit. Unconditionally resets the page to the first
    // page so any criteria change restarts pagination. Never fails;
    // out-of-range numeric input is clamped.
    pub fn update(&mut self, change: FilterUpdate) {
        match change {
            FilterUpdate::Search(v) => self.search = v,
            FilterUpdate::City(v) => self.city = v,
            FilterUpdate::State(v) => self.state = v,
            FilterUpdate::Country(v) => self.country = v,
            FilterUpdate::CheckIn(v) => self.check_in = v,
            FilterUpdate::CheckOut(v) => self.check_out = v,
            FilterUpdate::Guests(v) => self.guests = v.clamp(MIN_GUESTS, MAX_GUESTS),
            FilterUpdate::Bedrooms(v) => self.bedrooms = v.min(MAX_BEDROOMS),
            FilterUpdate::Bathrooms(v) => self.bathrooms = clamp_bathrooms(v),
            FilterUpdate::MinPrice(v) => self.min_price = v,
            FilterUpdate::MaxPrice(v) => self.max_price = v,
            FilterUpdate::PropertyType(v) => self.property_type = v,
            FilterUpdate::RoomType(v) => self.room_type = v,
            FilterUpdate::Amenities(v) => {
                self.amenities = v
                    .into_iter()
                    .filter_map(|id| clean_amenity(&id))
                    .collect()
            }
            FilterUpdate::SortBy(v) => self.sort_by = v,
        }
        self.page = FIRST_PAGE;
    }

    // Move to a different result page without touching the criteria.
    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(FIRST_PAGE);
    }

    // Add the amenity if absent, remove it if present. Resets pagination
    // like any other criteria change. Toggling twice is the identity.
    // Commas are stripped from the id; the projection joins amenities on
    // them, so an id containing one could not round-trip.
    pub fn toggle_amenity(&mut self, id: &str) {
        let Some(id) = clean_amenity(id) else {
            return;
        };
        if !self.amenities.remove(id.as_str()) {
            self.amenities.insert(id);
        }
        self.page = FIRST_PAGE;
    }

    // Reset every field to its empty value in one step.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    // Outbound parameter projection: every field at its empty value is
    // omitted, amenities flatten to a comma-joined string. Pure and
    // idempotent; also serves as the cache key for deduplicating searches.
    pub fn to_query_params(&self) -> BTreeMap<&'static str, String> {
        let mut params = BTreeMap::new();

        push_str(&mut params, "search", &self.search);
        push_str(&mut params, "city", &self.city);
        push_str(&mut params, "state", &self.state);
        push_str(&mut params, "country", &self.country);

        if let Some(d) = self.check_in {
            params.insert("checkIn", d.format(DATE_FORMAT).to_string());
        }
        if let Some(d) = self.check_out {
            params.insert("checkOut", d.format(DATE_FORMAT).to_string());
        }

        if self.guests != MIN_GUESTS {
            params.insert("guests", self.guests.to_string());
        }
        if self.bedrooms != 0 {
            params.insert("bedrooms", self.bedrooms.to_string());
        }
        if self.bathrooms != 0.0 {
            params.insert("bathrooms", self.bathrooms.to_string());
        }
        if self.min_price != 0 {
            params.insert("minPrice", self.min_price.to_string());
        }
        if self.max_price != 0 {
            params.insert("maxPrice", self.max_price.to_string());
        }

        push_str(&mut params, "propertyType", &self.property_type);
        push_str(&mut params, "roomType", &self.room_type);

        if !self.amenities.is_empty() {
            let joined: Vec<&str> = self.amenities.iter().map(String::as_str).collect();
            params.insert("amenities", joined.join(","));
        }

        push_str(&mut params, "sortBy", &self.sort_by);

        if self.page != FIRST_PAGE {
            params.insert("page", self.page.to_string());
        }

        params
    }

    // Percent-encoded query string for the address bar, built from the same
    // omit-empty projection as the fetch parameters.
    pub fn to_query_string(&self) -> String {
        let mut ser = form_urlencoded::Serializer::new(String::new());
        for (key, value) in self.to_query_params() {
            ser.append_pair(key, &value);
        }
        ser.finish()
    }

    // Reconstruct the state from an address-bar query string, e.g. on
    // navigation entry or page reload. Unknown keys are ignored; malformed
    // numeric or date values silently coerce to the field's empty value.
    pub fn from_query_string(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut state = Self::default();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let value = value.into_owned();
            match key.as_ref() {
                "search" => state.search = value,
                "city" => state.city = value,
                "state" => state.state = value,
                "country" => state.country = value,
                "checkIn" => state.check_in = parse_date(&value),
                "checkOut" => state.check_out = parse_date(&value),
                "guests" => {
                    state.guests = value
                        .parse()
                        .unwrap_or(MIN_GUESTS)
                        .clamp(MIN_GUESTS, MAX_GUESTS)
                }
                "bedrooms" => state.bedrooms = value.parse().unwrap_or(0).min(MAX_BEDROOMS),
                "bathrooms" => {
                    state.bathrooms = clamp_bathrooms(value.parse().unwrap_or(0.0))
                }
                "minPrice" => state.min_price = value.parse().unwrap_or(0),
                "maxPrice" => state.max_price = value.parse().unwrap_or(0),
                "propertyType" => state.property_type = value,
                "roomType" => state.room_type = value,
                "amenities" => {
                    state.amenities = value
                        .split(',')
                        .filter(|a| !a.is_empty())
                        .map(str::to_string)
                        .collect()
                }
                "sortBy" => state.sort_by = value,
                "page" => state.page = value.parse().unwrap_or(FIRST_PAGE).max(FIRST_PAGE),
                _ => {}
            }
        }

        state
    }
}

fn push_str(params: &mut BTreeMap<&'static str, String>, key: &'static str, value: &str) {
    if !value.is_empty() {
        params.insert(key, value.to_string());
    }
}

// Comma is the amenity separator on the wire, so it is stripped out of
// ids; an id that is nothing but separators vanishes.
fn clean_amenity(id: &str) -> Option<String> {
    let cleaned: String = id.chars().filter(|&c| c != ',').collect();
    (!cleaned.is_empty()).then_some(cleaned)
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

fn clamp_bathrooms(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, MAX_BATHROOMS)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn date(s: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
    }

    fn full_state() -> FilterState {
        FilterState {
            search: "beach house".to_string(),
            city: "San Diego".to_string(),
            state: "CA".to_string(),
            country: "USA".to_string(),
            check_in: date("2025-07-01"),
            check_out: date("2025-07-08"),
            guests: 4,
            bedrooms: 2,
            bathrooms: 1.5,
            min_price: 50,
            max_price: 400,
            property_type: "villa".to_string(),
            room_type: "entire_place".to_string(),
            amenities: ["wifi", "pool", "parking"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            sort_by: "price_low".to_string(),
            page: 3,
        }
    }

    #[test]
    fn round_trip_preserves_all_non_empty_fields() {
        let state = full_state();
        let parsed = FilterState::from_query_string(&state.to_query_string());
        assert_eq!(parsed, state);
    }

    #[test]
    fn round_trip_of_default_state_is_empty() {
        let state = FilterState::default();
        assert_eq!(state.to_query_string(), "");
        assert_eq!(FilterState::from_query_string(""), state);
    }

    #[test]
    fn query_params_omit_every_empty_value() {
        let params = FilterState::default().to_query_params();
        assert!(params.is_empty());

        let mut state = FilterState::default();
        state.update(FilterUpdate::City("Austin".to_string()));
        let params = state.to_query_params();
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("city").map(String::as_str), Some("Austin"));
    }

    #[test]
    fn projection_is_idempotent() {
        let state = full_state();
        assert_eq!(state.to_query_params(), state.to_query_params());
        assert_eq!(state.to_query_string(), state.to_query_string());
    }

    #[test_case(FilterUpdate::Search("cabin".to_string()); "search")]
    #[test_case(FilterUpdate::City("Denver".to_string()); "city")]
    #[test_case(FilterUpdate::Guests(2); "guests")]
    #[test_case(FilterUpdate::Bedrooms(3); "bedrooms")]
    #[test_case(FilterUpdate::Bathrooms(2.5); "bathrooms")]
    #[test_case(FilterUpdate::MinPrice(100); "min price")]
    #[test_case(FilterUpdate::MaxPrice(500); "max price")]
    #[test_case(FilterUpdate::PropertyType("loft".to_string()); "property type")]
    #[test_case(FilterUpdate::SortBy("rating".to_string()); "sort key")]
    fn update_resets_page_to_first(change: FilterUpdate) {
        let mut state = full_state();
        assert_eq!(state.page, 3);
        state.update(change);
        assert_eq!(state.page, FIRST_PAGE);
    }

    #[test]
    fn toggle_amenity_resets_page_and_double_toggle_is_identity() {
        let mut state = full_state();
        let original = state.amenities.clone();

        state.toggle_amenity("gym");
        assert!(state.amenities.contains("gym"));
        assert_eq!(state.page, FIRST_PAGE);

        state.set_page(5);
        state.toggle_amenity("gym");
        assert_eq!(state.amenities, original);
        assert_eq!(state.page, FIRST_PAGE);
    }

    #[test]
    fn set_page_keeps_criteria_and_clamps_to_first() {
        let mut state = full_state();
        state.set_page(7);
        assert_eq!(state.page, 7);
        assert_eq!(state.city, "San Diego");

        state.set_page(0);
        assert_eq!(state.page, FIRST_PAGE);
    }

    #[test]
    fn clear_resets_everything_to_empty() {
        let mut state = full_state();
        state.clear();
        assert_eq!(state, FilterState::default());
        assert!(state.to_query_params().is_empty());
    }

    #[test_case("guests=abc", 1; "non-numeric guests")]
    #[test_case("guests=-4", 1; "negative guests")]
    #[test_case("guests=99", 20; "guests above widget max")]
    #[test_case("guests=7", 7; "valid guests")]
    fn malformed_guests_coerce_and_clamp(query: &str, expected: u32) {
        assert_eq!(FilterState::from_query_string(query).guests, expected);
    }

    #[test]
    fn malformed_dates_and_counts_fall_back_to_empty() {
        let state =
            FilterState::from_query_string("checkIn=tomorrow&bedrooms=lots&minPrice=cheap");
        assert_eq!(state.check_in, None);
        assert_eq!(state.bedrooms, 0);
        assert_eq!(state.min_price, 0);
    }

    #[test]
    fn amenities_comma_join_and_split() {
        let mut state = FilterState::default();
        state.toggle_amenity("wifi");
        state.toggle_amenity("air_conditioning");

        let params = state.to_query_params();
        assert_eq!(
            params.get("amenities").map(String::as_str),
            Some("air_conditioning,wifi")
        );

        let parsed = FilterState::from_query_string(&state.to_query_string());
        assert_eq!(parsed.amenities, state.amenities);
    }

    #[test]
    fn amenity_ids_cannot_carry_the_wire_separator() {
        let mut state = FilterState::default();
        state.toggle_amenity("pool,wifi");
        assert!(state.amenities.contains("poolwifi"));
        assert_eq!(state.amenities.len(), 1);

        // Still one amenity after the round trip, not two.
        let parsed = FilterState::from_query_string(&state.to_query_string());
        assert_eq!(parsed, state);

        // An id that is only separators is dropped entirely.
        let mut empty = FilterState::default();
        empty.set_page(4);
        empty.toggle_amenity(",,");
        assert!(empty.amenities.is_empty());
        assert_eq!(empty.page, 4);

        let via_update = {
            let mut s = FilterState::default();
            s.update(FilterUpdate::Amenities(
                ["gym", "a,b", ","].iter().map(|s| s.to_string()).collect(),
            ));
            s.amenities
        };
        let expected: BTreeSet<String> = ["ab", "gym"].iter().map(|s| s.to_string()).collect();
        assert_eq!(via_update, expected);
    }

    #[test]
    fn leading_question_mark_and_unknown_keys_are_tolerated() {
        let state = FilterState::from_query_string("?city=Oslo&viewMode=map");
        assert_eq!(state.city, "Oslo");
        assert_eq!(state.to_query_params().len(), 1);
    }

    #[test]
    fn encoded_values_survive_the_round_trip() {
        let mut state = FilterState::default();
        state.update(FilterUpdate::Search("café & sea view".to_string()));
        state.update(FilterUpdate::City("São Paulo".to_string()));

        let parsed = FilterState::from_query_string(&state.to_query_string());
        assert_eq!(parsed.search, "café & sea view");
        assert_eq!(parsed.city, "São Paulo");
    }
}
