//! Static zone code -> regulation document mapping

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::types::{DocumentRef, ZoneCode};

const UNITARY_PLAN_BASE: &str =
    "https://unitaryplan.aucklandcouncil.govt.nz/images/Auckland%20Unitary%20Plan%20Operative";

/// Built-in zones: (code, path below the unitary plan image root)
const BUILTIN_ZONES: &[(&str, &str)] = &[
    // Chapter H zones
    ("H1", "Chapter%20H%20Zones/H1%20Residential%20-%20Large%20Lot%20Zone.pdf"),
    ("H2", "Chapter%20H%20Zones/H2%20Residential%20-%20Rural%20and%20Coastal%20Settlement%20Zone.pdf"),
    ("H3", "Chapter%20H%20Zones/H3%20Residential%20-%20Single%20House%20Zone.pdf"),
    ("H4", "Chapter%20H%20Zones/H4%20Residential%20-%20Mixed%20Housing%20Suburban%20Zone.pdf"),
    ("H5", "Chapter%20H%20Zones/H5%20Residential%20-%20Mixed%20Housing%20Urban%20Zone.pdf"),
    ("H6", "Chapter%20H%20Zones/H6%20Residential%20-%20Terrace%20Housing%20and%20Apartment%20Buildings%20Zone.pdf"),
    ("H7", "Chapter%20H%20Zones/H7%20Open%20Space%20zones.pdf"),
    ("H8", "Chapter%20H%20Zones/H8%20Business%20-%20City%20Centre%20Zone.pdf"),
    ("H9", "Chapter%20H%20Zones/H9%20Business%20-%20Metropolitan%20Centre%20Zone.pdf"),
    ("H10", "Chapter%20H%20Zones/H10%20Business%20-%20Town%20Centre%20Zone.pdf"),
    ("H11", "Chapter%20H%20Zones/H11%20Business%20-%20Local%20Centre%20Zone.pdf"),
    ("H12", "Chapter%20H%20Zones/H12%20Business%20-%20Neighbourhood%20Centre%20Zone.pdf"),
    ("H13", "Chapter%20H%20Zones/H13%20Business%20-%20Mixed%20Use%20Zone.pdf"),
    ("H14", "Chapter%20H%20Zones/H14%20Business%20-%20General%20Business%20Zone.pdf"),
    ("H15", "Chapter%20H%20Zones/H15%20Business%20-%20Business%20Park%20Zone.pdf"),
    ("H16", "Chapter%20H%20Zones/H16%20Business%20-%20Heavy%20Industry%20Zone.pdf"),
    ("H17", "Chapter%20H%20Zones/H17%20Business%20-%20Light%20Industry%20Zone.pdf"),
    ("H18", "Chapter%20H%20Zones/H18%20Future%20Urban%20Zone.pdf"),
    ("H19", "Chapter%20H%20Zones/H19%20Rural%20zones.pdf"),
    // Chapter D overlays (historic heritage and special character)
    ("D17", "Chapter%20D%20Overlays/3.%20Built%20Heritage%20and%20Character/D17%20Historic%20Heritage%20Overlay.pdf"),
    ("D18", "Chapter%20D%20Overlays/3.%20Built%20Heritage%20and%20Character/D18%20Special%20Character%20Areas%20Overlay%20-%20Residential%20and%20Business.pdf"),
    ("D19", "Chapter%20D%20Overlays/3.%20Built%20Heritage%20and%20Character/D19%20Auckland%20War%20Memorial%20Museum%20Viewshaft%20Overlay.pdf"),
    ("D20A", "Chapter%20D%20Overlays/3.%20Built%20Heritage%20and%20Character/D20A%20Stockade%20Hill%20Viewshaft%20Overlay.pdf"),
];

/// Lookup table from zone codes to document references
#[derive(Debug, Clone, Default)]
pub struct ZoneRegistry {
    entries: BTreeMap<ZoneCode, DocumentRef>,
}

impl ZoneRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in unitary plan zones
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for (code, path) in BUILTIN_ZONES {
            registry.insert(*code, format!("{}/{}", UNITARY_PLAN_BASE, path));
        }
        registry
    }

    /// Built-in zones with `overrides` added on top (same code replaces the URL)
    pub fn with_overrides<'a, I>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut registry = Self::builtin();
        for (code, url) in overrides {
            registry.insert(code.as_str(), url.clone());
        }
        registry
    }

    /// Add or replace a zone
    pub fn insert(&mut self, code: impl Into<ZoneCode>, url: impl Into<String>) {
        let zone = code.into();
        let doc = DocumentRef::new(zone.clone(), url);
        self.entries.insert(zone, doc);
    }

    /// Resolve a zone code to its document. Never touches the network.
    pub fn resolve(&self, zone: &ZoneCode) -> Result<DocumentRef> {
        self.entries
            .get(zone)
            .cloned()
            .ok_or_else(|| Error::UnknownZone(zone.to_string()))
    }

    pub fn contains(&self, zone: &ZoneCode) -> bool {
        self.entries.contains_key(zone)
    }

    /// All registered documents, ordered by zone code
    pub fn iter(&self) -> impl Iterator<Item = &DocumentRef> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_builtin_zone_resolves_to_https_pdf() {
        let registry = ZoneRegistry::builtin();
        assert_eq!(registry.len(), BUILTIN_ZONES.len());

        for doc in registry.iter() {
            let resolved = registry.resolve(&doc.zone).unwrap();
            assert!(resolved.url.starts_with("https://"), "{}", resolved.url);
            assert!(resolved.url.ends_with(".pdf"), "{}", resolved.url);
            assert!(!resolved.url.contains(' '), "{}", resolved.url);
            assert_eq!(resolved.zone, doc.zone);
        }
    }

    #[test]
    fn test_unknown_zone() {
        let registry = ZoneRegistry::builtin();
        match registry.resolve(&ZoneCode::new("ZZZ")) {
            Err(Error::UnknownZone(code)) => assert_eq!(code, "ZZZ"),
            other => panic!("expected UnknownZone, got {:?}", other),
        }
    }

    #[test]
    fn test_codes_are_case_sensitive() {
        let registry = ZoneRegistry::builtin();
        assert!(registry.contains(&ZoneCode::new("H3")));
        assert!(!registry.contains(&ZoneCode::new("h3")));
    }

    #[test]
    fn test_overrides_extend_and_replace() {
        let mut overrides = BTreeMap::new();
        overrides.insert("X1".to_string(), "https://example.org/x1.pdf".to_string());
        overrides.insert("H3".to_string(), "https://example.org/h3.pdf".to_string());

        let registry = ZoneRegistry::with_overrides(&overrides);
        assert_eq!(registry.len(), BUILTIN_ZONES.len() + 1);
        assert_eq!(
            registry.resolve(&ZoneCode::new("H3")).unwrap().url,
            "https://example.org/h3.pdf"
        );
        assert!(registry.contains(&ZoneCode::new("X1")));
    }
}
