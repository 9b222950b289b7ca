use std::env;

use crate::batch_driver::DEFAULT_BATCH_SIZE;
use crate::collage_types::{AspectRatio, QualityPreset};

#[derive(Debug, Clone)]
pub struct Config {
    pub batch_size: usize,
    pub aspect_ratio: AspectRatio,
    pub quality: QualityPreset,
    pub decode_workers: usize,
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            batch_size: DEFAULT_BATCH_SIZE,
            aspect_ratio: AspectRatio::default(),
            quality: QualityPreset::default(),
            decode_workers: num_cpus::get().max(1),
            seed: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Box<dyn std::error::Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let config = Config {
            batch_size: lookup("COLLAGE_PRO_BATCH_SIZE")
                .map(|v| v.trim().parse::<usize>())
                .transpose()?
                .unwrap_or(defaults.batch_size),
            aspect_ratio: lookup("COLLAGE_PRO_ASPECT_RATIO")
                .map(|v| v.parse::<AspectRatio>())
                .transpose()?
                .unwrap_or(defaults.aspect_ratio),
            quality: lookup("COLLAGE_PRO_QUALITY")
                .map(|v| v.parse::<QualityPreset>())
                .transpose()?
                .unwrap_or(defaults.quality),
            decode_workers: lookup("COLLAGE_PRO_DECODE_WORKERS")
                .map(|v| v.trim().parse::<usize>())
                .transpose()?
                .unwrap_or(defaults.decode_workers),
            seed: lookup("COLLAGE_PRO_SEED")
                .map(|v| v.trim().parse::<u64>())
                .transpose()?,
        };

        if config.batch_size == 0 {
            return Err("COLLAGE_PRO_BATCH_SIZE must be at least 1".into());
        }
        if config.decode_workers == 0 {
            return Err("COLLAGE_PRO_DECODE_WORKERS must be at least 1".into());
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.batch_size, 20);
        assert_eq!(config.aspect_ratio, AspectRatio::Square);
        assert_eq!(config.quality, QualityPreset::TwoK);
        assert!(config.decode_workers >= 1);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_reads_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("COLLAGE_PRO_BATCH_SIZE", "5"),
            ("COLLAGE_PRO_ASPECT_RATIO", "9:16"),
            ("COLLAGE_PRO_QUALITY", "4K"),
            ("COLLAGE_PRO_DECODE_WORKERS", "2"),
            ("COLLAGE_PRO_SEED", "1234"),
        ]))
        .unwrap();

        assert_eq!(config.batch_size, 5);
        assert_eq!(config.aspect_ratio, AspectRatio::Portrait9x16);
        assert_eq!(config.quality, QualityPreset::FourK);
        assert_eq!(config.decode_workers, 2);
        assert_eq!(config.seed, Some(1234));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Config::from_lookup(lookup_from(&[("COLLAGE_PRO_BATCH_SIZE", "0")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("COLLAGE_PRO_BATCH_SIZE", "lots")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("COLLAGE_PRO_QUALITY", "8K")])).is_err());
        assert!(
            Config::from_lookup(lookup_from(&[("COLLAGE_PRO_ASPECT_RATIO", "2:1")])).is_err()
        );
    }
}
