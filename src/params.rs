//! Request parameter handling
//!
//! HTTP parameters arrive as a flat string map. Keys are lowercased on
//! ingest since there is no point in case-sensitive GET/POST requests.

use std::collections::HashMap;

use chrono::NaiveDate;

/// Case-insensitive request parameter map
///
/// GET pairs are inserted first keeping the first value per key; a later
/// POST merge overwrites, matching the original join order.
#[derive(Debug, Clone, Default)]
pub struct Params {
    map: HashMap<String, String>,
}

impl Params {
    /// Creates an empty parameter map
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from query pairs, keeping the first value per key
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut params = Self::new();
        for (key, value) in pairs {
            params.map.entry(key.to_lowercase()).or_insert(value);
        }
        params
    }

    /// Merges form pairs over the existing map; later pairs win
    pub fn merge<I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in pairs {
            self.map.insert(key.to_lowercase(), value);
        }
    }

    /// Looks a parameter up by case-insensitive key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(&key.to_lowercase()).map(String::as_str)
    }

    /// Returns whether a parameter is present
    pub fn has(&self, key: &str) -> bool {
        self.map.contains_key(&key.to_lowercase())
    }

    /// Parses a parameter as a float
    pub fn float(&self, key: &str) -> Option<std::result::Result<f64, String>> {
        self.get(key).map(|raw| {
            raw.trim()
                .parse::<f64>()
                .map_err(|_| format!("{} is not a number: {:?}", key, raw))
        })
    }
}

/// Checks that a string is a valid YYYY-MM-DD date
///
/// Single-digit month and day are accepted ("2018-1-1"), out-of-range
/// components are not ("2018-01-41").
pub fn isdate(date: &str) -> bool {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_keys_lowercased() {
        let params = Params::from_pairs(pairs(&[("LAT", "55.95"), ("Lon", "-3.35")]));
        assert_eq!(params.get("lat"), Some("55.95"));
        assert_eq!(params.get("LON"), Some("-3.35"));
        assert!(params.has("Lat"));
    }

    #[test]
    fn test_first_query_value_wins() {
        let params = Params::from_pairs(pairs(&[("type", "ndvi_transect"), ("type", "other")]));
        assert_eq!(params.get("type"), Some("ndvi_transect"));
    }

    #[test]
    fn test_merge_overwrites() {
        let mut params = Params::from_pairs(pairs(&[("selection", "line")]));
        params.merge(pairs(&[("Selection", "rectangle"), ("type", "time_series")]));
        assert_eq!(params.get("selection"), Some("rectangle"));
        assert_eq!(params.get("type"), Some("time_series"));
    }

    #[test]
    fn test_float_parsing() {
        let params = Params::from_pairs(pairs(&[("xmin", "-4.03"), ("xmax", "east")]));
        assert_eq!(params.float("xmin"), Some(Ok(-4.03)));
        assert!(params.float("xmax").unwrap().is_err());
        assert_eq!(params.float("ymin"), None);
    }

    #[test]
    fn test_isdate() {
        assert!(isdate("2018-01-01"));
        assert!(isdate("2018-1-1"));
        assert!(!isdate("2018-01-41"));
        assert!(!isdate("January 1st"));
        assert!(!isdate("2018/01/01"));
    }
}
