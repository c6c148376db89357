use thiserror::Error;

/// Everything that can go wrong while looking up or picking an address.
///
/// None of these ever escape a [`SearchField`](crate::SearchField) as a panic.
/// A failed lookup shows up as an empty proposal list plus a
/// [`SearchEvent::Failed`](crate::SearchEvent::Failed).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    /// The search text was blank. Nothing was sent.
    #[error("the search text is empty")]
    EmptyQuery,
    /// The request failed or the service answered with a non-2xx status.
    #[error("the geocoding request failed: {0}")]
    Network(String),
    /// The service answered, but not with a feature collection we understand.
    #[error("the geocoding response could not be parsed: {0}")]
    MalformedResponse(String),
    /// A proposal index outside the current result set was selected.
    #[error("there is no address proposal with index {0}")]
    UnknownCandidate(usize),
}
