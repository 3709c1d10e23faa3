use log::warn;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

pub mod catalog;
pub mod eligibility;
pub mod icon;
pub mod obscurity;
pub mod repair;
pub mod rng;
pub mod selection;

pub use catalog::{Catalog, CatalogError, GeneDef, GeneId, INBRED};
pub use eligibility::{is_allowed, Override, Overrides};
pub use icon::resolve_icon;
pub use repair::{RepairReport, Violation};
pub use rng::RandomSource;
pub use selection::Selection;

use repair::{fallback, repair, validate};
use selection::selection_pass;

/// Repair iterations allowed per generation before the selection is dropped.
pub const DEFAULT_REPAIR_BUDGET: usize = 1000;

const SEED_SALT: u64 = 0x6E3E_70C7_u64;

#[derive(Debug, Error)]
pub enum RandomiserError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("no gene without a prerequisite can be used, even ignoring the disallowed list")]
    NoEligibleGene,
}

pub type Result<T> = std::result::Result<T, RandomiserError>;

/// Inclusive integer bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRange {
    pub min: i32,
    pub max: i32,
}

impl IntRange {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: i32) -> bool {
        self.min <= value && value <= self.max
    }
}

impl Default for IntRange {
    fn default() -> Self {
        Self::new(-5, 5)
    }
}

/// User configuration. Generation only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomiserSettings {
    pub allow_nonviolent: bool,
    pub allow_inbred: bool,
    pub disallowed: BTreeSet<GeneId>,
    /// Negative or absent means no cap.
    pub max_complexity: Option<i32>,
    pub metabolism: IntRange,
    pub repair_budget: usize,
}

impl Default for RandomiserSettings {
    fn default() -> Self {
        Self {
            allow_nonviolent: true,
            allow_inbred: false,
            disallowed: BTreeSet::from([GeneId::new(INBRED)]),
            max_complexity: None,
            metabolism: IntRange::default(),
            repair_budget: DEFAULT_REPAIR_BUDGET,
        }
    }
}

impl RandomiserSettings {
    /// Missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(data) => Ok(serde_json::from_str(&data)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn complexity_cap(&self) -> Option<u32> {
        self.max_complexity.and_then(|cap| u32::try_from(cap).ok())
    }

    pub fn is_disallowed(&self, id: &str) -> bool {
        self.disallowed.contains(id)
    }

    pub fn set_allowed(&mut self, id: &str, allowed: bool) {
        if allowed {
            self.disallowed.remove(id);
        } else {
            self.disallowed.insert(GeneId::new(id));
        }
    }

    pub fn allow_all(&mut self) {
        self.disallowed.clear();
    }

    pub fn disallow_all(&mut self, catalog: &Catalog) {
        self.disallowed
            .extend(catalog.pool(None).map(|g| g.def_name.clone()));
    }

    pub fn disallow_nonviolent(&mut self, catalog: &Catalog) {
        self.disallowed.extend(
            catalog
                .pool(None)
                .filter(|g| g.nonviolent)
                .map(|g| g.def_name.clone()),
        );
    }

    /// Folds the persisted allow switches into the disallow-set; run after
    /// loading.
    pub fn apply_persisted_switches(&mut self, catalog: &Catalog) {
        if !self.allow_nonviolent {
            self.disallow_nonviolent(catalog);
        }
        if self.allow_inbred {
            self.disallowed.remove(INBRED);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.metabolism.min > self.metabolism.max {
            return Err(RandomiserError::Config(format!(
                "metabolism range {}..={} is empty",
                self.metabolism.min, self.metabolism.max
            )));
        }
        if self.repair_budget == 0 {
            return Err(RandomiserError::Config(
                "repair budget must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of one generation call. Non-empty `warnings` means the selection is
/// best-effort and breaks at least one constraint.
#[derive(Debug, Clone)]
pub struct Generation<'a> {
    pub selection: Selection<'a>,
    pub icon: &'static str,
    pub warnings: Vec<Violation>,
    pub report: RepairReport,
}

impl Generation<'_> {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Builds one random xenotype from `catalog`.
pub fn generate<'a, R>(
    catalog: &'a Catalog,
    settings: &RandomiserSettings,
    overrides: Overrides,
    rng: &mut R,
) -> Result<Generation<'a>>
where
    R: RandomSource + ?Sized,
{
    settings.validate()?;

    let mut selection = selection_pass(catalog, settings, overrides, rng);
    let report = repair(&mut selection, catalog, settings, rng);
    if selection.is_empty() {
        fallback(&mut selection, catalog, settings, overrides, rng)?;
    }

    let warnings = validate(&selection, settings, overrides);
    for violation in &warnings {
        warn!("generated xenotype breaks a constraint: {violation}");
    }

    let icon = resolve_icon(&selection);
    Ok(Generation {
        selection,
        icon,
        warnings,
        report,
    })
}

pub fn generate_seeded<'a>(
    catalog: &'a Catalog,
    settings: &RandomiserSettings,
    overrides: Overrides,
    seed: u64,
) -> Result<Generation<'a>> {
    let mut rng = StdRng::seed_from_u64(seed ^ SEED_SALT);
    generate(catalog, settings, overrides, &mut rng)
}
