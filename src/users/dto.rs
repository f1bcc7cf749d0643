use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Movie snapshot as the upstream hands it out. Stored verbatim in the
/// liked list; the gateway neither validates nor enriches it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub poster_path: Option<String>,
}

/// One search the user has made, newest entries first in the stored list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub query: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct AvatarRequest {
    /// Empty string means "use the computed default": clients derive a
    /// placeholder from the username instead of us storing a URL.
    pub avatar: String,
}

#[derive(Debug, Deserialize)]
pub struct LikeRequest {
    pub movie: Movie,
}

#[derive(Debug, Deserialize)]
pub struct HistoryRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
