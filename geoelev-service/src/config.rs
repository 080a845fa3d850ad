//! Service configuration from environment variables.

use std::path::PathBuf;

use geoelev::{ElevationError, ElevationServiceBuilder};

use crate::AppState;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8080;

/// A named tile folder.
#[derive(Debug, Clone, PartialEq)]
pub struct TierSource {
    pub name: String,
    pub folder: PathBuf,
    /// Catalog document override; only settable for the single-folder setup.
    pub summary_file: Option<PathBuf>,
}

/// Everything the binary needs to start.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub tiers: Vec<TierSource>,
    pub default_tier: Option<String>,
    pub port: u16,
}

impl ServiceConfig {
    /// Read the configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `GEOELEV_TIERS` | `name=folder,name=folder` | Unset |
    /// | `GEOELEV_DATA_DIR` | Single folder, served as tier `default` | `.` |
    /// | `GEOELEV_SUMMARY_FILE` | Catalog path for `GEOELEV_DATA_DIR` | `<folder>/summary.json` |
    /// | `GEOELEV_DEFAULT_TIER` | Tier behind `/api/v1/lookup` | Last tier |
    /// | `GEOELEV_PORT` | HTTP server port | 8080 |
    ///
    /// # Errors
    ///
    /// Returns an error if `GEOELEV_TIERS` is set but malformed.
    pub fn from_env() -> Result<Self, ElevationError> {
        let tiers = match std::env::var("GEOELEV_TIERS") {
            Ok(value) => parse_tiers(&value)?,
            Err(_) => {
                let folder = std::env::var("GEOELEV_DATA_DIR").unwrap_or_else(|_| {
                    tracing::warn!("GEOELEV_DATA_DIR not set, using current directory");
                    ".".to_string()
                });
                vec![TierSource {
                    name: "default".to_string(),
                    folder: PathBuf::from(folder),
                    summary_file: std::env::var("GEOELEV_SUMMARY_FILE").ok().map(PathBuf::from),
                }]
            }
        };

        let port = std::env::var("GEOELEV_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Ok(Self {
            tiers,
            default_tier: std::env::var("GEOELEV_DEFAULT_TIER").ok(),
            port,
        })
    }

    /// Build every tier's service and the shared state.
    ///
    /// Tiers are built one after the other; the shared `GEOELEV_OPEN_HANDLES`,
    /// `GEOELEV_ALWAYS_REBUILD` and `GEOELEV_CACHE_ALL` variables apply to all.
    pub fn build_state(&self) -> Result<AppState, ElevationError> {
        let mut services = Vec::with_capacity(self.tiers.len());
        for tier in &self.tiers {
            let mut builder = ElevationServiceBuilder::new(&tier.folder).apply_env();
            if let Some(summary) = &tier.summary_file {
                builder = builder.summary_file(summary);
            }
            let service = builder.build()?;

            tracing::info!(
                tier = %tier.name,
                folder = %service.tiles_folder().display(),
                tiles = service.catalog().len(),
                resident = service.is_resident(),
                cache_capacity = ?service.cache_capacity(),
                "Tier ready"
            );
            services.push((tier.name.clone(), service));
        }
        AppState::new(services, self.default_tier.as_deref())
    }
}

/// Parse `name=folder` pairs separated by commas.
///
/// # Errors
///
/// Returns an error if a pair has no `=`, an empty side, or a repeated name,
/// or if no pair is given.
pub fn parse_tiers(value: &str) -> Result<Vec<TierSource>, ElevationError> {
    let mut tiers: Vec<TierSource> = Vec::new();

    for pair in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, folder) = pair
            .split_once('=')
            .map(|(n, f)| (n.trim(), f.trim()))
            .filter(|(n, f)| !n.is_empty() && !f.is_empty())
            .ok_or_else(|| {
                ElevationError::InvalidConfig(format!(
                    "bad tier \"{}\", expected name=folder",
                    pair
                ))
            })?;

        if tiers.iter().any(|t| t.name == name) {
            return Err(ElevationError::InvalidConfig(format!(
                "tier \"{}\" configured twice",
                name
            )));
        }
        tiers.push(TierSource {
            name: name.to_string(),
            folder: PathBuf::from(folder),
            summary_file: None,
        });
    }

    if tiers.is_empty() {
        return Err(ElevationError::InvalidConfig(
            "GEOELEV_TIERS lists no tiers".into(),
        ));
    }
    Ok(tiers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_tiers() {
        let tiers = parse_tiers("30=/data/30, 120=/data/120,240=/data/240").unwrap();
        assert_eq!(tiers.len(), 3);
        assert_eq!(tiers[0].name, "30");
        assert_eq!(tiers[1].folder, PathBuf::from("/data/120"));
        assert_eq!(tiers[2].name, "240");
        assert!(tiers.iter().all(|t| t.summary_file.is_none()));
    }

    #[test]
    fn test_parse_tiers_trailing_comma() {
        let tiers = parse_tiers("dem=./tiles,").unwrap();
        assert_eq!(tiers.len(), 1);
        assert_eq!(tiers[0].folder, PathBuf::from("./tiles"));
    }

    #[test]
    fn test_parse_tiers_errors() {
        for bad in ["", ",", "30", "=/data", "30=", "a=/x,a=/y"] {
            assert!(
                matches!(parse_tiers(bad), Err(ElevationError::InvalidConfig(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_from_env() {
        let vars = [
            "GEOELEV_TIERS",
            "GEOELEV_DATA_DIR",
            "GEOELEV_SUMMARY_FILE",
            "GEOELEV_DEFAULT_TIER",
            "GEOELEV_PORT",
        ];
        let saved: Vec<Option<String>> = vars.iter().map(|v| std::env::var(v).ok()).collect();
        for var in &vars {
            std::env::remove_var(var);
        }

        // Single folder, served as "default"
        std::env::set_var("GEOELEV_DATA_DIR", "/data/240");
        std::env::set_var("GEOELEV_SUMMARY_FILE", "/data/catalog.json");
        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(
            config.tiers,
            vec![TierSource {
                name: "default".to_string(),
                folder: PathBuf::from("/data/240"),
                summary_file: Some(PathBuf::from("/data/catalog.json")),
            }]
        );
        assert_eq!(config.default_tier, None);
        assert_eq!(config.port, DEFAULT_PORT);

        // Named tiers take precedence and ignore the summary override
        std::env::set_var("GEOELEV_TIERS", "30=/data/30,240=/data/240");
        std::env::set_var("GEOELEV_DEFAULT_TIER", "30");
        std::env::set_var("GEOELEV_PORT", "9000");
        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.tiers.len(), 2);
        assert!(config.tiers.iter().all(|t| t.summary_file.is_none()));
        assert_eq!(config.default_tier.as_deref(), Some("30"));
        assert_eq!(config.port, 9000);

        std::env::set_var("GEOELEV_TIERS", "30");
        assert!(ServiceConfig::from_env().is_err());

        for (var, value) in vars.iter().zip(saved) {
            match value {
                Some(v) => std::env::set_var(var, v),
                None => std::env::remove_var(var),
            }
        }
    }

    #[test]
    fn test_build_state_uses_summary_override() {
        let tiles = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let summary = other.path().join("catalog.json");

        let config = ServiceConfig {
            tiers: vec![TierSource {
                name: "default".to_string(),
                folder: tiles.path().to_path_buf(),
                summary_file: Some(summary.clone()),
            }],
            default_tier: None,
            port: DEFAULT_PORT,
        };
        let state = config.build_state().unwrap();

        assert_eq!(state.default_tier().name, "default");
        assert!(summary.exists());
        assert!(!tiles.path().join(geoelev::SUMMARY_FILE_NAME).exists());
    }

    #[test]
    fn test_build_state_default_tier() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let tier = |name: &str, dir: &TempDir| TierSource {
            name: name.to_string(),
            folder: dir.path().to_path_buf(),
            summary_file: None,
        };

        let mut config = ServiceConfig {
            tiers: vec![tier("30", &a), tier("240", &b)],
            default_tier: None,
            port: DEFAULT_PORT,
        };
        assert_eq!(config.build_state().unwrap().default_tier().name, "240");
        assert!(a.path().join(geoelev::SUMMARY_FILE_NAME).exists());

        config.default_tier = Some("30".to_string());
        assert_eq!(config.build_state().unwrap().default_tier().name, "30");

        config.default_tier = Some("90".to_string());
        assert!(matches!(
            config.build_state(),
            Err(ElevationError::InvalidConfig(_))
        ));
    }
}
