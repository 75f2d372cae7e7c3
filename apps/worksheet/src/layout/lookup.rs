//! Character data — pinyin and stroke progressions for practice characters.
//!
//! Pagination never reads these tables directly. The worksheet builder resolves
//! progressions up front and the renderer asks for pinyin per cell, so coverage can
//! grow (or come from a real dictionary) without touching layout code.
//!
//! `AppState` holds an `Arc<dyn CharacterData>`; `StaticCharacterTable` is the default.

/// Read-only lookup of per-character practice data.
pub trait CharacterData: Send + Sync {
    /// Toned pinyin for `c`, if known.
    fn pinyin(&self, c: char) -> Option<&str>;

    /// Partial glyphs showing how `c` is built up stroke group by stroke group,
    /// ending with the full character.
    fn stroke_progression(&self, c: char) -> Option<&[&str]>;
}

/// Built-in tables covering the characters used by the sample sheets.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticCharacterTable;

static STROKE_PROGRESSIONS: &[(char, &[&str])] = &[
    ('人', &["丿", "人"]),
    ('大', &["一", "大", "大"]),
    ('小', &["丨", "八", "小"]),
    ('上', &["卜", "上"]),
    ('下', &["一", "下", "下"]),
    ('中', &["丨", "口", "中"]),
    ('木', &["一", "十", "木", "木"]),
    ('火', &["丶", "人", "火", "火"]),
    ('水', &["丿", "水", "水", "水"]),
    ('土', &["一", "十", "土"]),
    ('口', &["丨", "日", "口"]),
    ('日', &["丨", "日", "日", "日"]),
    ('月', &["丿", "月", "月", "月"]),
    ('山', &["丨", "山", "山"]),
    ('手', &["一", "手", "手", "手"]),
    ('心', &["丶", "心", "心", "心"]),
];

static PINYIN: &[(char, &str)] = &[
    ('汉', "hàn"),
    ('字', "zì"),
    ('练', "liàn"),
    ('习', "xí"),
    ('书', "shū"),
    ('法', "fǎ"),
    ('中', "zhōng"),
    ('国', "guó"),
    ('文', "wén"),
    ('化', "huà"),
];

impl CharacterData for StaticCharacterTable {
    fn pinyin(&self, c: char) -> Option<&str> {
        PINYIN.iter().find(|(k, _)| *k == c).map(|(_, p)| *p)
    }

    fn stroke_progression(&self, c: char) -> Option<&[&str]> {
        STROKE_PROGRESSIONS
            .iter()
            .find(|(k, _)| *k == c)
            .map(|(_, steps)| *steps)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_pinyin() {
        let table = StaticCharacterTable;
        assert_eq!(table.pinyin('汉'), Some("hàn"));
        assert_eq!(table.pinyin('化'), Some("huà"));
        assert_eq!(table.pinyin('龙'), None);
    }

    #[test]
    fn test_progressions_end_with_full_character() {
        for (c, steps) in STROKE_PROGRESSIONS {
            let last = steps.last().copied().unwrap_or_default();
            assert_eq!(last, c.to_string(), "progression for {c} must end on it");
        }
    }

    #[test]
    fn test_unknown_character_has_no_progression() {
        assert!(StaticCharacterTable.stroke_progression('龙').is_none());
        assert_eq!(
            StaticCharacterTable.stroke_progression('人'),
            Some(&["丿", "人"][..])
        );
    }
}
