use serde::{Deserialize, Serialize};

use crate::catalog::GeneDef;
use crate::RandomiserSettings;

/// Per-call override for one gene category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Override {
    /// Defer to the disallow-set.
    #[default]
    Inherit,
    ForceAllow,
    ForceDisallow,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overrides {
    /// Applies to genes that disable violent work.
    #[serde(default)]
    pub nonviolent: Override,
    /// Applies to the Inbred gene only.
    #[serde(default)]
    pub inbred: Override,
}

impl Overrides {
    pub fn new(nonviolent: Override, inbred: Override) -> Self {
        Self { nonviolent, inbred }
    }

    fn applicable(&self, gene: &GeneDef) -> [Override; 2] {
        [
            if gene.nonviolent { self.nonviolent } else { Override::Inherit },
            if gene.is_inbred() { self.inbred } else { Override::Inherit },
        ]
    }
}

/// Whether `gene` may be used. A force-allow on any channel covering the gene
/// wins, then a force-disallow; otherwise the disallow-set decides, and
/// desperate mode skips the disallow-set.
pub fn is_allowed(
    gene: &GeneDef,
    settings: &RandomiserSettings,
    overrides: Overrides,
    desperate: bool,
) -> bool {
    let channels = overrides.applicable(gene);
    if channels.contains(&Override::ForceAllow) {
        return true;
    }
    if channels.contains(&Override::ForceDisallow) {
        return false;
    }
    desperate || !settings.disallowed.contains(gene.def_name.as_str())
}
