use serde::{Deserialize, Serialize};

use super::Library;

/// Category codes under which the server groups library locations.
///
/// `All` is synthetic: it never appears on the wire and is always derived by
/// flattening the concrete categories in [`LibraryCategory::CONCRETE`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LibraryCategory {
    #[serde(rename = "ALL")]
    All,
    #[serde(rename = "ALLBIBS")]
    Allbibs,
    #[serde(rename = "FBIB")]
    Fbib,
    #[serde(rename = "LAFAS")]
    Lafas,
    #[serde(rename = "BIBN")]
    Bibn,
    #[serde(rename = "KITBIBS_A")]
    KitbibsA,
    #[serde(rename = "KITBIBS_N")]
    KitbibsN,
    #[serde(rename = "INFOKOM")]
    Infokom,
    #[serde(rename = "BLBIB")]
    Blbib,
}

impl LibraryCategory {
    /// All concrete categories, in snapshot enumeration order.
    pub const CONCRETE: [LibraryCategory; 8] = [
        LibraryCategory::Allbibs,
        LibraryCategory::Fbib,
        LibraryCategory::Lafas,
        LibraryCategory::Bibn,
        LibraryCategory::KitbibsA,
        LibraryCategory::KitbibsN,
        LibraryCategory::Infokom,
        LibraryCategory::Blbib,
    ];

    /// The wire code for this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            LibraryCategory::All => "ALL",
            LibraryCategory::Allbibs => "ALLBIBS",
            LibraryCategory::Fbib => "FBIB",
            LibraryCategory::Lafas => "LAFAS",
            LibraryCategory::Bibn => "BIBN",
            LibraryCategory::KitbibsA => "KITBIBS_A",
            LibraryCategory::KitbibsN => "KITBIBS_N",
            LibraryCategory::Infokom => "INFOKOM",
            LibraryCategory::Blbib => "BLBIB",
        }
    }

    /// Human-readable name shown in category selectors.
    pub fn display_name(&self) -> &'static str {
        match self {
            LibraryCategory::All => "Alle Bibliotheken",
            LibraryCategory::Allbibs => "Sonstige",
            LibraryCategory::Fbib => "Fachbibliotheken",
            LibraryCategory::Lafas => "Lernzentrum Fasanenschlösschen",
            LibraryCategory::Bibn => "KIT-Bibliothek Nord",
            LibraryCategory::KitbibsA => "KIT-Bibliothek Süd (Altbau)",
            LibraryCategory::KitbibsN => "KIT-Bibliothek Süd (Neubau)",
            LibraryCategory::Infokom => "InformatiKOM",
            LibraryCategory::Blbib => "Badische Landesbibliothek",
        }
    }
}

/// A complete dataset: every location the server knows about, grouped by
/// category.
///
/// Snapshots are replaced wholesale on each successful refresh and shared
/// immutably between readers; nothing ever updates one in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibraryData {
    #[serde(rename = "ALLBIBS", default)]
    pub allbibs: Vec<Library>,
    #[serde(rename = "FBIB", default)]
    pub fbib: Vec<Library>,
    #[serde(rename = "LAFAS", default)]
    pub lafas: Vec<Library>,
    #[serde(rename = "BIBN", default)]
    pub bibn: Vec<Library>,
    #[serde(rename = "KITBIBS_A", default)]
    pub kitbibs_a: Vec<Library>,
    #[serde(rename = "KITBIBS_N", default)]
    pub kitbibs_n: Vec<Library>,
    #[serde(rename = "INFOKOM", default)]
    pub infokom: Vec<Library>,
    #[serde(rename = "BLBIB", default)]
    pub blbib: Vec<Library>,
}

impl LibraryData {
    /// The locations in a single concrete category.
    ///
    /// Returns an empty slice for `All`; use [`LibraryData::flatten`] or
    /// [`LibraryData::libraries_for`] to get the union.
    pub fn category_slice(&self, category: LibraryCategory) -> &[Library] {
        match category {
            LibraryCategory::All => &[],
            LibraryCategory::Allbibs => &self.allbibs,
            LibraryCategory::Fbib => &self.fbib,
            LibraryCategory::Lafas => &self.lafas,
            LibraryCategory::Bibn => &self.bibn,
            LibraryCategory::KitbibsA => &self.kitbibs_a,
            LibraryCategory::KitbibsN => &self.kitbibs_n,
            LibraryCategory::Infokom => &self.infokom,
            LibraryCategory::Blbib => &self.blbib,
        }
    }

    /// Every location across all categories, in enumeration order then
    /// per-category order.
    pub fn flatten(&self) -> Vec<Library> {
        LibraryCategory::CONCRETE
            .iter()
            .flat_map(|c| self.category_slice(*c).iter().cloned())
            .collect()
    }

    /// The locations for a category, flattening the union for `All`.
    pub fn libraries_for(&self, category: LibraryCategory) -> Vec<Library> {
        match category {
            LibraryCategory::All => self.flatten(),
            concrete => self.category_slice(concrete).to_vec(),
        }
    }

    /// Total number of locations across all categories.
    pub fn total_len(&self) -> usize {
        LibraryCategory::CONCRETE
            .iter()
            .map(|c| self.category_slice(*c).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lib(name: &str) -> Library {
        serde_json::from_str(&format!(
            r#"{{"long_name":"{name}","url":null,"building":null,"level":null,"room":null,
                "geo_coordinates":"49.0,8.4","available_seats":10,"opening_hours":{{}},
                "free_seats_currently":5}}"#
        ))
        .unwrap()
    }

    #[test]
    fn test_flatten_preserves_enumeration_and_category_order() {
        let data = LibraryData {
            fbib: vec![lib("f1"), lib("f2")],
            allbibs: vec![lib("a1")],
            blbib: vec![lib("b1")],
            ..Default::default()
        };

        let names: Vec<String> = data.flatten().into_iter().map(|l| l.long_name).collect();
        // ALLBIBS comes before FBIB in enumeration order, BLBIB last
        assert_eq!(names, vec!["a1", "f1", "f2", "b1"]);
        assert_eq!(data.total_len(), 4);
    }

    #[test]
    fn test_libraries_for_all_equals_flatten() {
        let data = LibraryData {
            lafas: vec![lib("l1")],
            infokom: vec![lib("i1")],
            ..Default::default()
        };

        let all = data.libraries_for(LibraryCategory::All);
        let flat = data.flatten();
        assert_eq!(all.len(), flat.len());
        for (a, f) in all.iter().zip(flat.iter()) {
            assert!(a.same_location(f));
        }
    }

    #[test]
    fn test_libraries_for_concrete_category() {
        let data = LibraryData {
            bibn: vec![lib("north")],
            ..Default::default()
        };
        assert_eq!(data.libraries_for(LibraryCategory::Bibn).len(), 1);
        assert!(data.libraries_for(LibraryCategory::Fbib).is_empty());
    }

    #[test]
    fn test_parse_snapshot_with_missing_categories() {
        // The client tolerates a payload that omits categories entirely
        let json = r#"{"FBIB": [], "BIBN": []}"#;
        let data: LibraryData = serde_json::from_str(json).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_category_codes_round_trip() {
        for category in LibraryCategory::CONCRETE {
            let encoded = serde_json::to_string(&category).unwrap();
            assert_eq!(encoded, format!("\"{}\"", category.as_str()));
            let decoded: LibraryCategory = serde_json::from_str(&encoded).unwrap();
            assert_eq!(decoded, category);
        }
    }
}
