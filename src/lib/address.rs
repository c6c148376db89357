/// A position on the globe in degrees (WGS84).
///
/// The geocoding service delivers positions as a `[longitude, latitude]` pair.
/// The pair is converted into this struct exactly once, when a response is parsed,
/// so nothing downstream ever has to guess the order.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub longitude: f64,
    pub latitude: f64,
}

impl Coordinates {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Builds coordinates from a GeoJSON position, which is longitude first.
    pub fn from_lon_lat(position: [f64; 2]) -> Self {
        Self::new(position[0], position[1])
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "lon {:.6}, lat {:.6}", self.longitude, self.latitude)
    }
}

/// One proposed address match returned by a geocoding query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressCandidate {
    pub house_number: Option<String>,
    pub street: String,
    pub city: String,
    pub postcode: String,
    pub coordinates: Coordinates,
}

impl AddressCandidate {
    pub fn new(
        house_number: Option<String>,
        street: impl Into<String>,
        city: impl Into<String>,
        postcode: impl Into<String>,
        coordinates: Coordinates,
    ) -> Self {
        Self {
            house_number,
            street: street.into(),
            city: city.into(),
            postcode: postcode.into(),
            coordinates,
        }
    }
}

#[test]
fn geojson_position_is_longitude_first() {
    let coordinates = Coordinates::from_lon_lat([2.331_09, 48.869_11]);
    assert_eq!(coordinates.longitude, 2.331_09);
    assert_eq!(coordinates.latitude, 48.869_11);
}
