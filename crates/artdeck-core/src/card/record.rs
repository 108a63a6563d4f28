//! Card records as found in the Scryfall bulk-data export.
//!
//! Only the fields the tagger reads are modeled; everything else in the
//! export is ignored on deserialization.

use serde::{Deserialize, Serialize};

/// The taggable part of a card: either a whole single-faced card or one
/// entry of `card_faces`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardFace {
    /// Printed name
    pub name: String,

    /// Type line, e.g. "Creature — Human Wizard"
    #[serde(default)]
    pub type_line: String,

    /// Rules text
    #[serde(default)]
    pub oracle_text: String,

    /// Color codes (W, U, B, R, G)
    #[serde(default)]
    pub colors: Vec<String>,

    /// Illustrator
    #[serde(default)]
    pub artist: String,

    /// Keyword abilities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,

    /// Promo treatments (e.g. "boosterfun")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promo_types: Option<Vec<String>>,
}

/// One entry of the bulk export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardRecord {
    /// Stable card identifier, used as the output file stem
    pub id: String,

    /// Face fields of the record itself (used for single-faced layouts)
    #[serde(flatten)]
    pub face: CardFace,

    /// Layout kind ("normal", "transform", "token", ...)
    pub layout: String,

    /// Rarity ("common", "rare", ...)
    pub rarity: String,

    /// Full set name
    pub set_name: String,

    /// Per-face records for multi-faced layouts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_faces: Option<Vec<CardFace>>,

    /// Human-facing card page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scryfall_uri: Option<String>,
}

/// Which side of a multi-faced card an output belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceSide {
    Front,
    Back,
}

impl FaceSide {
    /// Query-string value understood by the image API.
    pub fn as_str(&self) -> &'static str {
        match self {
            FaceSide::Front => "front",
            FaceSide::Back => "back",
        }
    }

    /// Index into `card_faces`.
    pub fn index(&self) -> usize {
        match self {
            FaceSide::Front => 0,
            FaceSide::Back => 1,
        }
    }

    /// Face-qualified output stem, e.g. `<id>_front`.
    pub fn stem(&self, id: &str) -> String {
        format!("{id}_{}", self.as_str())
    }
}

impl std::fmt::Display for FaceSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_single_faced() {
        let json = r#"{
            "id": "abc",
            "name": "Bolt",
            "layout": "normal",
            "rarity": "common",
            "set_name": "Alpha",
            "artist": "Jane Doe",
            "colors": ["R"],
            "type_line": "Instant",
            "oracle_text": "Deal 3 damage.",
            "keywords": [],
            "cmc": 1.0,
            "flavor_text": "ignored"
        }"#;
        let record: CardRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, "abc");
        assert_eq!(record.face.name, "Bolt");
        assert_eq!(record.face.colors, vec!["R"]);
        assert_eq!(record.face.keywords, Some(vec![]));
        assert!(record.face.promo_types.is_none());
        assert!(record.card_faces.is_none());
    }

    #[test]
    fn test_deserialize_multi_faced_without_top_level_text() {
        let json = r#"{
            "id": "dfc",
            "name": "Day // Night",
            "layout": "transform",
            "rarity": "rare",
            "set_name": "Innistrad",
            "card_faces": [
                {"name": "Day", "type_line": "Creature — Human", "oracle_text": "", "colors": ["W"], "artist": "A"},
                {"name": "Night", "type_line": "Creature — Werewolf", "oracle_text": "", "colors": ["R"], "artist": "B"}
            ]
        }"#;
        let record: CardRecord = serde_json::from_str(json).unwrap();
        assert!(record.face.oracle_text.is_empty());
        assert!(record.face.colors.is_empty());
        let faces = record.card_faces.unwrap();
        assert_eq!(faces.len(), 2);
        assert_eq!(faces[1].name, "Night");
    }

    #[test]
    fn test_face_side_stems() {
        assert_eq!(FaceSide::Front.stem("abc"), "abc_front");
        assert_eq!(FaceSide::Back.stem("abc"), "abc_back");
        assert_eq!(FaceSide::Back.index(), 1);
    }
}
