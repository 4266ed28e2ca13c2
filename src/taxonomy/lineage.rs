//! Resolve the label of one rank from a semicolon-delimited lineage string.
//!
//! A lineage looks like `d__Bacteria;p__Firmicutes;c__Bacilli;s__`. Each
//! segment is a rank prefix token followed by a name. When the requested rank
//! is missing or empty, the nearest shallower rank that carries a name anchors
//! a numbered placeholder such as `unidentified_species_1_at_Bacilli_class`.

use crate::data::Rank;
use crate::error::{Result, TaxonError};
use regex::Regex;

/// Serial numbers for placeholder labels within one resolution pass.
///
/// Every placeholder takes the next number, starting at 1, so two rows that
/// fall back to the same ancestor never share a label. Create a fresh counter
/// per pass; counters are never shared between runs.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderSerial {
    issued: usize,
}

impl PlaceholderSerial {
    /// A counter that will issue 1 next.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next serial.
    pub fn next_serial(&mut self) -> usize {
        self.issued += 1;
        self.issued
    }

    /// How many serials have been issued.
    pub fn issued(&self) -> usize {
        self.issued
    }
}

/// Format a placeholder label for a row whose `target` rank is unnamed.
pub fn placeholder_label(target: Rank, serial: usize, found_text: &str, found_rank: Rank) -> String {
    format!(
        "unidentified_{}_{}_at_{}_{}",
        target.display_name(),
        serial,
        found_text,
        found_rank.display_name()
    )
}

/// Resolver for one target rank.
#[derive(Debug, Clone)]
pub struct LineageResolver {
    target: Rank,
    /// Target first, then shallower ranks closest first.
    patterns: Vec<(Rank, Regex)>,
}

impl LineageResolver {
    /// Build a resolver for `target`.
    pub fn new(target: Rank) -> Result<Self> {
        let patterns = std::iter::once(target)
            .chain(target.shallower())
            .map(|rank| Ok((rank, segment_pattern(rank)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { target, patterns })
    }

    /// The rank this resolver extracts.
    pub fn target(&self) -> Rank {
        self.target
    }

    /// Resolve one lineage.
    ///
    /// Returns the target rank's name when present, otherwise a placeholder
    /// anchored at the closest named ancestor (consuming one serial), otherwise
    /// an empty string.
    pub fn resolve(&self, lineage: Option<&str>, serial: &mut PlaceholderSerial) -> String {
        let Some(lineage) = lineage else {
            return String::new();
        };

        let mut ranks = self.patterns.iter();
        if let Some((_, re)) = ranks.next() {
            if let Some(name) = capture_name(re, lineage) {
                return name.to_string();
            }
        }

        for (rank, re) in ranks {
            if let Some(name) = capture_name(re, lineage) {
                return placeholder_label(self.target, serial.next_serial(), name, *rank);
            }
        }
        String::new()
    }

    /// Resolve every lineage of one pass in order, with a fresh serial counter.
    pub fn resolve_all<'a, I>(&self, lineages: I) -> (Vec<String>, PlaceholderSerial)
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let mut serial = PlaceholderSerial::new();
        let labels = lineages
            .into_iter()
            .map(|lineage| self.resolve(lineage, &mut serial))
            .collect();
        (labels, serial)
    }
}

/// Pattern matching `<token><name>` at the start of a segment.
fn segment_pattern(rank: Rank) -> Result<Regex> {
    let pattern = format!(r"(?:^|;)\s*{}([^;]*)", regex::escape(rank.prefix()));
    Regex::new(&pattern).map_err(|e| {
        TaxonError::InvalidParameter(format!("bad lineage pattern for {}: {}", rank, e))
    })
}

/// Trimmed name of the last segment carrying the token, if it is non-empty.
fn capture_name<'a>(re: &Regex, lineage: &'a str) -> Option<&'a str> {
    re.captures_iter(lineage)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|name| !name.is_empty())
}
