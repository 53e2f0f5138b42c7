//! Category weights: the fixed category set, the default weight table and the
//! file-backed weight configuration.
//!
//! Weights are configuration, not derived values: they are validated (finite,
//! non-negative, known category) but never normalized to sum to one.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// One facet of a resume / job description, used as the unit of weighting and matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Education,
    WorkExperience,
    Skills,
    Certifications,
    Projects,
    AdditionalInfo,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Education,
        Category::WorkExperience,
        Category::Skills,
        Category::Certifications,
        Category::Projects,
        Category::AdditionalInfo,
    ];

    /// Key used by the tag store and the model payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Education => "education",
            Category::WorkExperience => "work_experience",
            Category::Skills => "skills",
            Category::Certifications => "certifications",
            Category::Projects => "projects",
            Category::AdditionalInfo => "additional_info",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = WeightsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| WeightsError::UnknownCategory(s.to_string()))
    }
}

/// Category → weight. Ordered so score breakdowns and files are stable.
pub type CategoryWeights = BTreeMap<Category, f64>;

/// The one documented default table, used whenever no weight file exists.
pub fn default_weights() -> CategoryWeights {
    BTreeMap::from([
        (Category::Education, 0.15),
        (Category::WorkExperience, 0.30),
        (Category::Skills, 0.25),
        (Category::Certifications, 0.10),
        (Category::Projects, 0.10),
        (Category::AdditionalInfo, 0.10),
    ])
}

#[derive(Debug, Error)]
pub enum WeightsError {
    #[error("Unknown category '{0}'")]
    UnknownCategory(String),

    #[error("Weight for '{category}' must be a finite, non-negative number (got {value})")]
    InvalidWeight { category: String, value: f64 },

    #[error("Malformed weight file {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Weight file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Validates a raw `{name: weight}` mapping into typed weights.
pub fn parse_weights(raw: &BTreeMap<String, f64>) -> Result<CategoryWeights, WeightsError> {
    raw.iter()
        .map(|(name, &value)| {
            let category: Category = name.parse()?;
            if !value.is_finite() || value < 0.0 {
                return Err(WeightsError::InvalidWeight {
                    category: name.clone(),
                    value,
                });
            }
            Ok((category, value))
        })
        .collect()
}

/// Where the active weights came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightSource {
    File,
    Default,
}

/// JSON-file weight configuration.
///
/// Last write wins. `save` writes a sibling temp file and renames it into place, so a
/// reader sees either the old or the new table, never a partial file; a reader racing a
/// writer may still observe the older table.
#[derive(Debug, Clone)]
pub struct WeightConfig {
    path: PathBuf,
}

impl WeightConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the weight file, falling back to `default_weights()` when it does not exist.
    pub async fn load(&self) -> Result<(CategoryWeights, WeightSource), WeightsError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok((default_weights(), WeightSource::Default));
            }
            Err(e) => return Err(e.into()),
        };

        let raw: BTreeMap<String, f64> =
            serde_json::from_slice(&bytes).map_err(|source| WeightsError::Malformed {
                path: self.path.clone(),
                source,
            })?;
        let weights = parse_weights(&raw)?;
        if weights.is_empty() {
            warn!("Weight file {} is empty; every score will be 0", self.path.display());
        }
        Ok((weights, WeightSource::File))
    }

    pub async fn save(&self, weights: &CategoryWeights) -> Result<(), WeightsError> {
        let raw: BTreeMap<&str, f64> = weights.iter().map(|(c, w)| (c.as_str(), *w)).collect();
        let json = serde_json::to_vec_pretty(&raw).map_err(|source| WeightsError::Malformed {
            path: self.path.clone(),
            source,
        })?;

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;

        // Each save gets its own temp file, so concurrent writers never rename each
        // other's file away.
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(&json)?;
            tmp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(std::io::Error::other)??;

        info!("Saved {} category weights to {}", weights.len(), self.path.display());
        Ok(())
    }
}
