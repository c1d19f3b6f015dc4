use serde::{Deserialize, Serialize};

/// A movie genre
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Genre {
    pub id: u64,
    pub name: String,
}

impl Genre {
    pub fn new<S: Into<String>>(id: u64, name: S) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Envelope returned by the upstream genre listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreList {
    pub genres: Vec<Genre>,
}
