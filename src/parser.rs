//! JSON parser for TransLoc `vehicles.json` responses.

use serde::Deserialize;
use std::collections::HashMap;

use crate::error::FetchError;

/// Top-level `vehicles.json` body. Fields we do not use (rate limits,
/// API version, ...) are ignored.
#[derive(Debug, Deserialize)]
pub struct VehiclesResponse {
    pub generated_on: String,
    pub data: AgencyData,
}

/// TransLoc sends `"data": []` instead of an empty object when no agency
/// has vehicles on the road.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AgencyData {
    ByAgency(HashMap<String, Vec<VehicleRecord>>),
    Empty(Vec<serde_json::Value>),
}

impl VehiclesResponse {
    /// Vehicles reported for `agency`, or none if the agency is absent.
    pub fn vehicles(&self, agency: &str) -> &[VehicleRecord] {
        match &self.data {
            AgencyData::ByAgency(map) => map.get(agency).map(Vec::as_slice).unwrap_or(&[]),
            AgencyData::Empty(_) => &[],
        }
    }

    pub fn has_agency(&self, agency: &str) -> bool {
        matches!(&self.data, AgencyData::ByAgency(map) if map.contains_key(agency))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VehicleRecord {
    pub standing_capacity: Option<u32>,
    pub description: Option<String>,
    pub seating_capacity: Option<u32>,
    pub last_updated_on: String,
    pub call_name: Option<String>,
    pub speed: Option<f64>,
    pub vehicle_id: String,
    pub segment_id: Option<String>,
    pub passenger_load: Option<f64>,
    pub route_id: Option<String>,
    pub tracking_status: Option<String>,
    pub location: Location,
    pub heading: Option<f64>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

/// Decodes a `vehicles.json` body.
///
/// # Errors
///
/// Returns [`FetchError::Payload`] if the body is not JSON or lacks the
/// `generated_on`/`data` members.
pub fn parse_vehicles(bytes: &[u8]) -> Result<VehiclesResponse, FetchError> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "rate_limit": 1,
        "expires_in": 5,
        "api_latest_version": "1.2",
        "generated_on": "2018-11-01T12:00:03+00:00",
        "data": {
            "12": [{
                "standing_capacity": null,
                "description": null,
                "seating_capacity": null,
                "last_updated_on": "2018-11-01T08:00:01-04:00",
                "call_name": "2306",
                "speed": 17.2,
                "vehicle_id": "4008242",
                "segment_id": "4064282",
                "passenger_load": null,
                "route_id": "4005134",
                "tracking_status": "up",
                "location": {"lat": 35.99, "lng": -78.90},
                "heading": 88
            }]
        },
        "api_version": "1.2"
    }"#;

    #[test]
    fn test_parse_vehicles_for_agency() {
        let resp = parse_vehicles(BODY.as_bytes()).unwrap();

        assert_eq!(resp.generated_on, "2018-11-01T12:00:03+00:00");
        assert!(resp.has_agency("12"));
        let vehicles = resp.vehicles("12");
        assert_eq!(vehicles.len(), 1);
        assert_eq!(vehicles[0].vehicle_id, "4008242");
        assert_eq!(vehicles[0].heading, Some(88.0));
        assert_eq!(vehicles[0].location.lng, -78.90);
        assert!(vehicles[0].standing_capacity.is_none());
    }

    #[test]
    fn test_missing_agency_has_no_vehicles() {
        let resp = parse_vehicles(BODY.as_bytes()).unwrap();
        assert!(!resp.has_agency("16"));
        assert!(resp.vehicles("16").is_empty());
    }

    #[test]
    fn test_empty_data_array() {
        let body = r#"{"generated_on": "2018-11-01T03:00:00+00:00", "data": []}"#;
        let resp = parse_vehicles(body.as_bytes()).unwrap();
        assert!(resp.vehicles("12").is_empty());
    }

    #[test]
    fn test_parse_invalid_bytes() {
        let result = parse_vehicles(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(FetchError::Payload(_))));
    }

    #[test]
    fn test_missing_data_is_payload_error() {
        let result = parse_vehicles(br#"{"generated_on": "x"}"#);
        assert!(matches!(result, Err(FetchError::Payload(_))));
    }
}
