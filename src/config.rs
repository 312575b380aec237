use std::str::FromStr;

use tracing::warn;

use crate::hierarchy::HierarchyShape;
use crate::limits::DEFAULT_HISTORY_CAP;

/// Server settings, read once from `PARKD_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub max_connections: usize,
    pub queue_depth: usize,
    pub history_cap: usize,
    pub shape: HierarchyShape,
    pub metrics_port: Option<u16>,
    /// Serve a single session over stdin/stdout instead of TCP.
    pub stdio: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 7878,
            max_connections: 256,
            queue_depth: 1024,
            history_cap: DEFAULT_HISTORY_CAP,
            shape: HierarchyShape::default(),
            metrics_port: None,
            stdio: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values fall back to
    /// the default with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        Self {
            bind: lookup("PARKD_BIND").unwrap_or(d.bind),
            port: parse_or(&lookup, "PARKD_PORT", d.port),
            max_connections: parse_or(&lookup, "PARKD_MAX_CONNECTIONS", d.max_connections),
            queue_depth: parse_or(&lookup, "PARKD_QUEUE_DEPTH", d.queue_depth),
            history_cap: parse_or(&lookup, "PARKD_HISTORY_CAP", d.history_cap),
            shape: HierarchyShape {
                zones: parse_or(&lookup, "PARKD_ZONES", d.shape.zones),
                areas_per_zone: parse_or(&lookup, "PARKD_AREAS_PER_ZONE", d.shape.areas_per_zone),
                car_slots_per_area: parse_or(&lookup, "PARKD_CAR_SLOTS", d.shape.car_slots_per_area),
                bike_slots_per_area: parse_or(&lookup, "PARKD_BIKE_SLOTS", d.shape.bike_slots_per_area),
            },
            metrics_port: lookup("PARKD_METRICS_PORT").and_then(|s| match s.parse() {
                Ok(p) => Some(p),
                Err(_) => {
                    warn!("ignoring PARKD_METRICS_PORT={s:?}: not a port");
                    None
                }
            }),
            stdio: lookup("PARKD_STDIO").is_some_and(|s| parse_flag(&s)),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

fn parse_or<T: FromStr + Copy>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("ignoring {key}={raw:?}: not a valid value");
            default
        }),
    }
}

fn parse_flag(raw: &str) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "" | "0" | "false" | "no" | "off" => false,
        _ => {
            warn!("ignoring PARKD_STDIO={raw:?}: not a boolean");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let c = config(&[]);
        assert_eq!(c, Config::default());
        assert_eq!(c.addr(), "0.0.0.0:7878");
        assert_eq!(c.shape.total_slots(), 900);
    }

    #[test]
    fn reads_overrides() {
        let c = config(&[
            ("PARKD_BIND", "127.0.0.1"),
            ("PARKD_PORT", "9000"),
            ("PARKD_ZONES", "2"),
            ("PARKD_AREAS_PER_ZONE", "1"),
            ("PARKD_CAR_SLOTS", "2"),
            ("PARKD_BIKE_SLOTS", "0"),
            ("PARKD_HISTORY_CAP", "50"),
            ("PARKD_METRICS_PORT", "9100"),
        ]);
        assert_eq!(c.addr(), "127.0.0.1:9000");
        assert_eq!(c.shape.total_slots(), 4);
        assert_eq!(c.history_cap, 50);
        assert_eq!(c.metrics_port, Some(9100));
        assert!(!c.stdio);
    }

    #[test]
    fn oversized_shape_from_env_is_refused_at_build() {
        use crate::hierarchy::{Hierarchy, ShapeError};
        let c = config(&[("PARKD_CAR_SLOTS", "4294967295"), ("PARKD_BIKE_SLOTS", "1")]);
        assert_eq!(c.shape.slots_per_area(), 1 << 32);
        assert!(matches!(Hierarchy::new(c.shape), Err(ShapeError::TooLarge(_))));
    }

    #[test]
    fn stdio_flag() {
        assert!(config(&[("PARKD_STDIO", "1")]).stdio);
        assert!(config(&[("PARKD_STDIO", "TRUE")]).stdio);
        assert!(!config(&[("PARKD_STDIO", "0")]).stdio);
        assert!(!config(&[("PARKD_STDIO", "maybe")]).stdio);
    }

    #[test]
    fn invalid_values_fall_back() {
        let c = config(&[
            ("PARKD_PORT", "not-a-port"),
            ("PARKD_ZONES", "-3"),
            ("PARKD_METRICS_PORT", "99999"),
        ]);
        assert_eq!(c.port, 7878);
        assert_eq!(c.shape.zones, 15);
        assert_eq!(c.metrics_port, None);
    }
}
