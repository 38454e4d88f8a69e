//! Google Geocoding API response types
//!
//! Reference: https://developers.google.com/maps/documentation/geocoding/requests-geocoding

use serde::Deserialize;

use super::GeocodeResult;

/// Top-level API response
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<GoogleResult>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleResult {
    #[serde(default)]
    pub address_components: Vec<AddressComponent>,
    #[serde(default)]
    pub formatted_address: String,
    pub geometry: Geometry,
    #[serde(default)]
    pub partial_match: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddressComponent {
    pub long_name: String,
    pub short_name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Geometry {
    pub location: LatLng,
    #[serde(default)]
    pub location_type: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Rooftop is the only location type precise enough for a street address
pub const PRECISE_LOCATION_TYPE: &str = "ROOFTOP";

impl AddressComponent {
    /// First type that is not the generic "political" tag
    fn primary_type(&self) -> Option<&str> {
        self.types
            .iter()
            .map(String::as_str)
            .find(|t| *t != "political")
    }
}

impl GoogleResult {
    /// Flatten the typed component list into our field set.
    ///
    /// States and countries carry their long name as `name` and short name as
    /// `code`; every other component uses the short name.
    pub fn flatten(&self) -> GeocodeResult {
        let mut result = GeocodeResult {
            formatted_address: self.formatted_address.clone(),
            latitude: Some(self.geometry.location.lat),
            longitude: Some(self.geometry.location.lng),
            partial_match: self.partial_match,
            ..Default::default()
        };
        let mut sublocality = None;

        for component in &self.address_components {
            let short = Some(component.short_name.clone()).filter(|s| !s.is_empty());
            let long = Some(component.long_name.clone()).filter(|s| !s.is_empty());
            match component.primary_type() {
                Some("street_number") => result.street_number = short,
                Some("route") => result.route = short,
                Some("subpremise") => result.subpremise = short,
                Some("locality") => result.locality = short,
                Some("sublocality") | Some("sublocality_level_1") => sublocality = short,
                Some("postal_code") => result.postal_code = short,
                Some("administrative_area_level_1") => {
                    result.state = long;
                    result.state_code = short;
                }
                Some("country") => {
                    result.country = long;
                    result.country_code = short;
                }
                _ => {}
            }
        }

        if result.locality.is_none() {
            result.locality = sublocality;
        }
        result
    }
}
