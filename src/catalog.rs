//! Location catalog built from `expressvpn list all`
//!
//! The listing is a fixed-width table padded with tabs. The first three lines
//! are a description and a header; every other row starts with one or more
//! alias/country columns separated by tabs, followed by the location name and
//! an optional "recommended" marker.
//!
//! ```text
//! ALIAS	COUNTRY			LOCATION			RECOMMENDED
//! smart	Smart Location		USA - New Jersey - 1		Y
//! nl	Netherlands (NL)		Netherlands - The Hague		Y
//! ```

use crate::status::Status;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use tracing::warn;

/// Wire form of [`Location::None`]
pub const NONE_OPTION: &str = "None";

const HEADER_LINES: usize = 3;

// Tried in order; the first match wins.
static ROW_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"\t{2,}(.*)").expect("valid regex"),
        Regex::new(r"\t{1,}(.*)\t{2,}").expect("valid regex"),
        Regex::new(r"\t{1,}(.*)").expect("valid regex"),
    ]
});

/// A target location, or the sentinel meaning "disconnected"
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    None,
    Named(String),
}

impl Location {
    pub fn is_none(&self) -> bool {
        matches!(self, Location::None)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::None => f.write_str(NONE_OPTION),
            Location::Named(name) => f.write_str(name),
        }
    }
}

/// Ordered, duplicate-free list of known locations with favorites first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationCatalog {
    locations: Vec<String>,
}

impl LocationCatalog {
    /// Parse a raw provider listing
    ///
    /// Favorites always come first, in the given order, whether or not they
    /// appear in the listing. Rows that yield no location are reported in a
    /// single warning and skipped.
    pub fn parse(raw: &str, favorites: &[String]) -> Self {
        let mut parsed = Vec::new();
        let mut unparsable = Vec::new();

        for line in raw.split('\n').skip(HEADER_LINES) {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            match parse_row(line) {
                Some(location) => parsed.push(location),
                None => unparsable.push(line),
            }
        }

        if !unparsable.is_empty() {
            warn!(
                "Cannot parse {} location rows: {:?}",
                unparsable.len(),
                unparsable
            );
        }

        Self::from_locations(favorites.iter().cloned().chain(parsed))
    }

    /// Build a catalog from already-known names, dropping duplicates
    pub fn from_locations<I>(locations: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for location in locations {
            if !unique.contains(&location) {
                unique.push(location);
            }
        }
        Self { locations: unique }
    }

    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.locations.iter().any(|l| l == name)
    }

    /// Validate a requested location
    ///
    /// The sentinel `"None"` is always valid. Returns `None` for names the
    /// catalog does not know.
    pub fn lookup(&self, query: &str) -> Option<Location> {
        if query == NONE_OPTION {
            Some(Location::None)
        } else if self.contains(query) {
            Some(Location::Named(query.to_string()))
        } else {
            None
        }
    }

    /// Location implied by a status; never a name outside the catalog
    pub fn resolve(&self, status: &Status) -> Location {
        match status {
            Status::ConnectedTo(name) if self.contains(name) => Location::Named(name.clone()),
            _ => Location::None,
        }
    }

    /// Option list for the Home Assistant input_select: sentinel first
    pub fn options(&self) -> Vec<String> {
        std::iter::once(NONE_OPTION.to_string())
            .chain(self.locations.iter().cloned())
            .collect()
    }
}

fn parse_row(line: &str) -> Option<String> {
    let field = ROW_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(line))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or_default();

    let location = match field.find('\t') {
        Some(idx) => &field[..idx],
        None => field,
    };

    if location.is_empty() {
        None
    } else {
        Some(location.to_string())
    }
}
