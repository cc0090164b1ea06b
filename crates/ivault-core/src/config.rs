use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{IvaultError, IvaultResult};
use crate::types::ChunkingParams;

/// Top-level configuration (loaded from ivault.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IvaultConfig {
    pub logging: LoggingConfig,
    pub chunking: ChunkingParams,
    pub scanner: ScannerConfig,
    pub crypto: CryptoConfig,
    pub storage: StorageConfig,
}

impl IvaultConfig {
    /// Load a config file, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> IvaultResult<Self> {
        if !path.exists() {
            tracing::warn!(
                "config file not found: {}  (using defaults)",
                path.display()
            );
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| IvaultError::Config(format!("parsing {}: {e}", path.display())))?;
        config.chunking.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or EnvFilter directive (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Scan worker thread count (0 = cpu_count)
    pub workers: usize,
    /// Glob patterns (matched against entry names) to leave out of snapshots
    pub exclude_patterns: Vec<String>,
}

/// Passphrase-derived secret configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Argon2id memory cost in KiB (default: 65536 = 64 MiB)
    pub argon2_mem_cost_kib: u32,
    /// Argon2id time cost (iterations, default: 3)
    pub argon2_time_cost: u32,
    /// Argon2id parallelism (default: 4)
    pub argon2_parallelism: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Encrypted chunk objects, keyed by ciphertext hash
    pub chunk_dir: PathBuf,
    /// Encoded inode records, keyed by inode hash
    pub inode_dir: PathBuf,
    /// Encoded snapshot records, one per revision
    pub snapshot_dir: PathBuf,
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    match s.strip_prefix("~/") {
        Some(rest) => {
            let home = std::env::var("HOME").unwrap_or_default();
            PathBuf::from(home).join(rest)
        }
        None => path.to_path_buf(),
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            argon2_mem_cost_kib: 65536,
            argon2_time_cost: 3,
            argon2_parallelism: 4,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            chunk_dir: PathBuf::from("~/.local/share/ivault/chunks"),
            inode_dir: PathBuf::from("~/.local/share/ivault/inodes"),
            snapshot_dir: PathBuf::from("~/.local/share/ivault/snapshots"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[logging]
level = "debug"
format = "json"

[chunking]
min_chunksize = 65536
max_chunksize = 524288
avg_bits = 17

[scanner]
workers = 4
exclude_patterns = ["*.tmp", ".DS_Store"]

[crypto]
argon2_mem_cost_kib = 131072
argon2_time_cost = 4
argon2_parallelism = 8

[storage]
chunk_dir = "/var/lib/ivault/chunks"
inode_dir = "/var/lib/ivault/inodes"
snapshot_dir = "/var/lib/ivault/snapshots"
"#;
        let config: IvaultConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.chunking.min_chunksize, 65536);
        assert_eq!(config.chunking.max_chunksize, 524288);
        assert_eq!(config.chunking.avg_bits, 17);
        // Unset chunking fields keep their defaults
        assert_eq!(config.chunking.polynomial, ChunkingParams::DEFAULT_POLYNOMIAL);
        assert_eq!(config.scanner.workers, 4);
        assert_eq!(config.scanner.exclude_patterns.len(), 2);
        assert_eq!(config.crypto.argon2_mem_cost_kib, 131072);
        assert_eq!(config.storage.chunk_dir, PathBuf::from("/var/lib/ivault/chunks"));
        config.chunking.validate().unwrap();
    }

    #[test]
    fn test_parse_defaults() {
        let config: IvaultConfig = toml::from_str("").unwrap();

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "text");
        assert_eq!(config.chunking, ChunkingParams::default());
        assert_eq!(config.scanner.workers, 0);
        assert!(config.scanner.exclude_patterns.is_empty());
        assert_eq!(config.crypto.argon2_mem_cost_kib, 65536);
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = IvaultConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: IvaultConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.chunking, parsed.chunking);
        assert_eq!(config.storage.inode_dir, parsed.storage.inode_dir);
        assert_eq!(config.logging.format, parsed.logging.format);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = IvaultConfig::load(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.chunking, ChunkingParams::default());
    }

    #[test]
    fn test_load_rejects_invalid_chunking() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("ivault.toml");
        std::fs::write(&path, "[chunking]\nmin_chunksize = 10\nmax_chunksize = 5\n").unwrap();

        assert!(IvaultConfig::load(&path).is_err());
    }

    #[test]
    fn test_expand_tilde() {
        let absolute = Path::new("/var/lib/ivault");
        assert_eq!(expand_tilde(absolute), absolute);

        let expanded = expand_tilde(Path::new("~/.local/share/ivault"));
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.ends_with(".local/share/ivault"));
    }
}
