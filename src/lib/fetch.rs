use super::*;

/// Resolves free-text addresses into candidates.
///
/// Implementations block until the lookup is done; the search field runs them on
/// loader threads.
pub trait Geocoder: Send + Sync + 'static {
    fn search(&self, query: &str) -> Result<Vec<AddressCandidate>, SearchError>;
}

/// Client for a geocoding service answering with a GeoJSON feature collection
/// (the French `geocodage/search` API and other addok/photon style services).
#[derive(Debug, Clone)]
pub struct GeocodeClient {
    endpoint: String,
    timeout: std::time::Duration,
    limit: Option<u32>,
    user_agent: String,
}

impl GeocodeClient {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            timeout: config.timeout(),
            limit: config.limit,
            user_agent: config.user_agent.clone(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn fetch(&self, query: &str) -> Result<String, SearchError> {
        let mut request = ureq::get(&self.endpoint);
        request
            .query("q", query)
            .set("User-Agent", &self.user_agent)
            .timeout(self.timeout);
        if let Some(limit) = self.limit {
            request.query("limit", &limit.to_string());
        }

        let response = request.call();
        if let Some(e) = response.synthetic_error() {
            return Err(SearchError::Network(e.to_string()));
        }
        if !response.ok() {
            log::warn!(
                "Geocoding request for {:?} answered with {} {}.",
                query,
                response.status(),
                response.status_text()
            );
            return Err(SearchError::Network(format!(
                "status {} {}",
                response.status(),
                response.status_text()
            )));
        }

        response
            .into_string()
            .map_err(|e| SearchError::Network(e.to_string()))
    }
}

impl Geocoder for GeocodeClient {
    fn search(&self, query: &str) -> Result<Vec<AddressCandidate>, SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let result = self
            .fetch(query)
            .and_then(|body| parse_feature_collection(&body));
        if let Err(e) = &result {
            log::error!("Unable to geocode {:?}. Reason:\r\n{}", query, e);
        }
        result
    }
}

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    properties: Properties,
    geometry: Geometry,
}

#[derive(Deserialize)]
struct Properties {
    housenumber: Option<String>,
    street: Option<String>,
    city: Option<String>,
    postcode: Option<String>,
}

#[derive(Deserialize)]
struct Geometry {
    coordinates: Vec<f64>,
}

/// Maps a GeoJSON feature collection onto address candidates, keeping the
/// order of the features.
pub fn parse_feature_collection(body: &str) -> Result<Vec<AddressCandidate>, SearchError> {
    let collection: FeatureCollection = serde_json::from_str(body)
        .map_err(|e| SearchError::MalformedResponse(e.to_string()))?;

    collection
        .features
        .into_iter()
        .map(|feature| {
            let position = match feature.geometry.coordinates[..] {
                [longitude, latitude, ..] => [longitude, latitude],
                _ => {
                    return Err(SearchError::MalformedResponse(format!(
                        "expected a [longitude, latitude] position, got {:?}",
                        feature.geometry.coordinates
                    )))
                }
            };
            let properties = feature.properties;
            Ok(AddressCandidate::new(
                properties.housenumber,
                properties.street.unwrap_or_default(),
                properties.city.unwrap_or_default(),
                properties.postcode.unwrap_or_default(),
                Coordinates::from_lon_lat(position),
            ))
        })
        .collect()
}

#[cfg(test)]
const RUE_DE_LA_PAIX: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [2.331091, 48.869114] },
            "properties": {
                "label": "12 Rue de la Paix 75002 Paris",
                "housenumber": "12",
                "street": "Rue de la Paix",
                "postcode": "75002",
                "city": "Paris"
            }
        },
        {
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [2.331379, 48.868741] },
            "properties": {
                "label": "Rue de la Paix 75002 Paris",
                "street": "Rue de la Paix",
                "postcode": "75002",
                "city": "Paris"
            }
        }
    ]
}"#;

/// Serves a single canned HTTP response and hands back the request line it received.
#[cfg(test)]
fn serve_once(
    status_line: &'static str,
    body: &'static str,
) -> (String, std::thread::JoinHandle<String>) {
    use std::io::{BufRead, BufReader, Write};

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}/search", listener.local_addr().unwrap());
    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();
        loop {
            let mut header = String::new();
            reader.read_line(&mut header).unwrap();
            if header == "\r\n" || header.is_empty() {
                break;
            }
        }
        write!(
            stream,
            "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        )
        .unwrap();
        request_line
    });
    (endpoint, handle)
}

#[cfg(test)]
fn client_for(endpoint: String) -> GeocodeClient {
    GeocodeClient::new(&SearchConfig {
        endpoint,
        timeout_ms: 2_000,
        ..SearchConfig::default()
    })
}

#[test]
fn parses_features_in_response_order() {
    let candidates = parse_feature_collection(RUE_DE_LA_PAIX).unwrap();

    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].house_number.as_deref(), Some("12"));
    assert_eq!(candidates[0].coordinates, Coordinates::new(2.331091, 48.869114));
    assert_eq!(candidates[1].house_number, None);
    assert_eq!(candidates[1].street, "Rue de la Paix");
    assert_eq!(candidates[1].coordinates.latitude, 48.868741);
}

#[test]
fn missing_address_parts_become_empty() {
    let body = r#"{"features":[{"geometry":{"coordinates":[5.0,45.0,210.0]},"properties":{"city":"Lyon"}}]}"#;
    let candidates = parse_feature_collection(body).unwrap();

    assert_eq!(candidates[0].street, "");
    assert_eq!(candidates[0].city, "Lyon");
    assert_eq!(candidates[0].coordinates, Coordinates::new(5.0, 45.0));
}

#[test]
fn null_address_parts_become_empty() {
    let body = r#"{"features":[{"geometry":{"coordinates":[5.0,45.0]},"properties":{"housenumber":null,"street":null,"city":"Lyon","postcode":null}}]}"#;
    let candidates = parse_feature_collection(body).unwrap();

    assert_eq!(candidates[0].house_number, None);
    assert_eq!(candidates[0].street, "");
    assert_eq!(candidates[0].postcode, "");
    assert_eq!(candidates[0].city, "Lyon");
}

#[test]
fn rejects_unexpected_shapes() {
    assert!(matches!(
        parse_feature_collection("<html>busy</html>"),
        Err(SearchError::MalformedResponse(_))
    ));
    assert!(matches!(
        parse_feature_collection(r#"{"features":[{"geometry":{"coordinates":[2.3]},"properties":{}}]}"#),
        Err(SearchError::MalformedResponse(_))
    ));
}

#[test]
fn blank_query_is_not_sent() {
    let client = client_for("http://127.0.0.1:9/search".to_string());
    assert_eq!(client.search("   "), Err(SearchError::EmptyQuery));
}

#[test]
fn search_sends_query_and_parses_answer() {
    let (endpoint, server) = serve_once("HTTP/1.1 200 OK", RUE_DE_LA_PAIX);
    let candidates = client_for(endpoint).search("12 rue de la paix").unwrap();
    let request_line = server.join().unwrap();

    assert!(request_line.starts_with("GET /search?q=12"));
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].city, "Paris");
}

#[test]
fn error_status_is_a_network_failure() {
    let (endpoint, server) = serve_once("HTTP/1.1 503 Service Unavailable", "{}");
    let result = client_for(endpoint).search("Paris");
    server.join().unwrap();

    assert!(matches!(result, Err(SearchError::Network(_))));
}

#[test]
fn garbage_body_is_a_malformed_response() {
    let (endpoint, server) = serve_once("HTTP/1.1 200 OK", "not json at all");
    let result = client_for(endpoint).search("Paris");
    server.join().unwrap();

    assert!(matches!(result, Err(SearchError::MalformedResponse(_))));
}

#[test]
fn refused_connection_is_a_network_failure() {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let client = client_for(format!("http://127.0.0.1:{}/search", port));

    assert!(matches!(client.search("Paris"), Err(SearchError::Network(_))));
}
