use serde::Serialize;

use crate::{
    flags::{HAS_INTERACTED_PROFILE, HAS_INTERACTED_SOCIAL, HAS_INTERACTED_TITLE},
    models::UnlockableItem,
};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ItemCategory {
    Interaction,
    Achievement,
    Skill,
    Project,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub item: UnlockableItem,
    pub category: ItemCategory,
    /// Flag that keeps the reward claimed across reloads, if any.
    pub persisted_as: Option<&'static str>,
}

/// Every rewardable thing on the site.
#[derive(Debug, Clone)]
pub struct RewardCatalog {
    entries: Vec<CatalogEntry>,
}

const BUILTIN: &[(&str, u64, ItemCategory, Option<&str>)] = &[
    ("hero-avatar", 5, ItemCategory::Interaction, Some(HAS_INTERACTED_PROFILE)),
    ("hero-title", 5, ItemCategory::Interaction, Some(HAS_INTERACTED_TITLE)),
    ("hero-social", 5, ItemCategory::Interaction, Some(HAS_INTERACTED_SOCIAL)),
    ("education", 20, ItemCategory::Achievement, None),
    ("events", 15, ItemCategory::Achievement, None),
    ("volunteer", 15, ItemCategory::Achievement, None),
    ("hobbies", 10, ItemCategory::Achievement, None),
    ("skill-gamedev", 15, ItemCategory::Skill, None),
    ("skill-ai", 15, ItemCategory::Skill, None),
    ("skill-programming", 15, ItemCategory::Skill, None),
    ("skill-entrepreneurship", 15, ItemCategory::Skill, None),
    ("skill-core", 15, ItemCategory::Skill, None),
    ("hypernova-prompt", 100, ItemCategory::Project, None),
    ("cyberpong", 100, ItemCategory::Project, None),
    ("emotional-platformer", 100, ItemCategory::Project, None),
    ("location-finder", 100, ItemCategory::Project, None),
];

impl Default for RewardCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RewardCatalog {
    pub fn builtin() -> Self {
        Self::new(
            BUILTIN
                .iter()
                .map(|&(key, reward, category, persisted_as)| CatalogEntry {
                    item: UnlockableItem::new(key, reward),
                    category,
                    persisted_as,
                })
                .collect(),
        )
    }

    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| entry.item.key == key)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn persisted(&self) -> impl Iterator<Item = (&CatalogEntry, &'static str)> {
        self.entries
            .iter()
            .filter_map(|entry| entry.persisted_as.map(|flag| (entry, flag)))
    }
}
