//! The seven canonical taxonomic ranks and their string conventions.

use crate::error::{Result, TaxonError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A taxonomic rank, ordered from shallowest (domain) to deepest (species).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Domain,
    Phylum,
    Class,
    Order,
    Family,
    Genus,
    Species,
}

impl Rank {
    /// All ranks in depth order.
    pub const ALL: [Rank; 7] = [
        Rank::Domain,
        Rank::Phylum,
        Rank::Class,
        Rank::Order,
        Rank::Family,
        Rank::Genus,
        Rank::Species,
    ];

    /// Parse a free-form rank name.
    ///
    /// Accepts full names, the `kingdom`/`genera` synonyms and single-letter
    /// abbreviations, in any case.
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "domain" | "kingdom" | "d" | "k" => Ok(Rank::Domain),
            "phylum" | "p" => Ok(Rank::Phylum),
            "class" | "c" => Ok(Rank::Class),
            "order" | "o" => Ok(Rank::Order),
            "family" | "f" => Ok(Rank::Family),
            "genus" | "genera" | "g" => Ok(Rank::Genus),
            "species" | "s" => Ok(Rank::Species),
            _ => Err(TaxonError::InvalidRank(name.to_string())),
        }
    }

    /// Look up a rank by its lineage prefix token (e.g. `g__`).
    pub fn from_prefix(token: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|rank| rank.prefix() == token)
            .ok_or_else(|| TaxonError::InvalidRank(token.to_string()))
    }

    /// Lineage prefix token.
    pub fn prefix(&self) -> &'static str {
        match self {
            Rank::Domain => "d__",
            Rank::Phylum => "p__",
            Rank::Class => "c__",
            Rank::Order => "o__",
            Rank::Family => "f__",
            Rank::Genus => "g__",
            Rank::Species => "s__",
        }
    }

    /// Name used inside synthesized placeholder labels.
    pub fn display_name(&self) -> &'static str {
        match self {
            Rank::Domain => "domain",
            Rank::Phylum => "phylum",
            Rank::Class => "class",
            Rank::Order => "order",
            Rank::Family => "family",
            Rank::Genus => "genus",
            Rank::Species => "species",
        }
    }

    /// Capitalized plural, used for chart and legend titles.
    pub fn plural_name(&self) -> &'static str {
        match self {
            Rank::Domain => "Domains",
            Rank::Phylum => "Phyla",
            Rank::Class => "Classes",
            Rank::Order => "Orders",
            Rank::Family => "Families",
            Rank::Genus => "Genera",
            Rank::Species => "Species",
        }
    }

    /// Label of the catch-all row for this rank.
    pub fn other_bucket_name(&self) -> &'static str {
        match self {
            Rank::Domain => "Other_domains",
            Rank::Phylum => "Other_phyla",
            Rank::Class => "Other_classes",
            Rank::Order => "Other_orders",
            Rank::Family => "Other_families",
            Rank::Genus => "Other_genera",
            Rank::Species => "Other_species",
        }
    }

    /// Depth index, 0 for domain through 6 for species.
    #[inline]
    pub fn order(&self) -> usize {
        *self as usize
    }

    /// The rank one step shallower, if any.
    pub fn parent(&self) -> Option<Rank> {
        match self.order() {
            0 => None,
            i => Some(Self::ALL[i - 1]),
        }
    }

    /// Ranks shallower than this one, closest first.
    pub fn shallower(&self) -> impl Iterator<Item = Rank> {
        Self::ALL[..self.order()].iter().rev().copied()
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Rank {
    type Err = TaxonError;

    fn from_str(s: &str) -> Result<Self> {
        Rank::parse(s)
    }
}
