use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Tunables for the client-side detection session.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Side of the centered square sampled for color challenges, in pixels.
    pub center_sample_size: u32,

    /// Detections scoring below this are ignored for object challenges.
    pub object_confidence_threshold: f32,

    /// Delay between detection ticks (one display frame).
    pub frame_interval: Duration,

    /// Applied to every backend request.
    pub request_timeout: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            center_sample_size: 50,
            object_confidence_threshold: 0.6,
            frame_interval: Duration::from_millis(16),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl GameConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            center_sample_size: env_parse("STICKERHUNT_SAMPLE_SIZE")
                .filter(|size: &u32| *size > 0)
                .unwrap_or(defaults.center_sample_size),
            object_confidence_threshold: env_parse("STICKERHUNT_CONFIDENCE")
                .filter(|score: &f32| (0.0..=1.0).contains(score))
                .unwrap_or(defaults.object_confidence_threshold),
            frame_interval: env_parse("STICKERHUNT_FRAME_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.frame_interval),
            request_timeout: env_parse("STICKERHUNT_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
        }
    }
}

/// Where the backend listens and keeps its store.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    /// Seed the default challenge catalog when the store has none.
    pub seed_catalog: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8787)),
            db_path: PathBuf::from("stickerhunt.sqlite3"),
            seed_catalog: true,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            addr: env_parse("STICKERHUNT_ADDR").unwrap_or(defaults.addr),
            db_path: std::env::var("STICKERHUNT_DB")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            seed_catalog: std::env::var("STICKERHUNT_SEED")
                .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.seed_catalog),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("ignoring unparsable {key}={raw}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_detection_constants() {
        let config = GameConfig::default();
        assert_eq!(config.center_sample_size, 50);
        assert!((config.object_confidence_threshold - 0.6).abs() < f32::EPSILON);

        let server = ServerConfig::default();
        assert_eq!(server.addr.port(), 8787);
        assert!(server.seed_catalog);
    }
}
