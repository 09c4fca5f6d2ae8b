use rand::Rng;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::template::{AUDIO_FIELD, FIELD_NAMES};
use crate::vocab::VocabRecord;

/// Lower bound (inclusive) of generated deck and note type ids.
pub const ID_RANGE_START: i64 = 1 << 30;
/// Upper bound (exclusive) of generated deck and note type ids.
pub const ID_RANGE_END: i64 = 1 << 31;

const BASE91_TABLE: &[u8; 91] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!#$%&()*+,-./:;<=>?@[]^_`{|}~";

/// How deck and note type ids are chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdStrategy {
    /// Fresh random ids on every run.
    #[default]
    Random,
    /// Ids derived from the deck/note type name, identical across runs.
    Stable,
}

impl IdStrategy {
    pub fn id_for(self, name: &str) -> i64 {
        match self {
            IdStrategy::Random => rand::rng().random_range(ID_RANGE_START..ID_RANGE_END),
            IdStrategy::Stable => {
                let digest = Sha256::digest(name.as_bytes());
                let hash = u64::from_be_bytes(first_eight(&digest));
                ID_RANGE_START + (hash % (ID_RANGE_END - ID_RANGE_START) as u64) as i64
            }
        }
    }
}

fn first_eight(digest: &[u8]) -> [u8; 8] {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    bytes
}

/// Content-derived note GUID, rendered in Anki's base91 alphabet.
pub fn guid_for(values: &[String]) -> String {
    let digest = Sha256::digest(values.join("__").as_bytes());
    let mut n = u64::from_be_bytes(first_eight(&digest));
    let mut out = Vec::new();
    while n > 0 {
        out.push(BASE91_TABLE[(n % 91) as usize]);
        n /= 91;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// One flashcard note: field values in note type order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub guid: String,
    pub fields: Vec<String>,
    pub tags: Vec<String>,
}

impl Note {
    pub fn new(fields: Vec<String>, tags: Vec<String>) -> Self {
        Self {
            guid: guid_for(&fields),
            fields,
            tags,
        }
    }

    /// Build the note for `record`. `sound_tag` fills the `Audio` field and may be empty.
    pub fn from_record(record: &VocabRecord, sound_tag: &str) -> Self {
        let mut fields = vec![String::new(); FIELD_NAMES.len()];
        fields[0] = record.japanese.clone();
        fields[1] = record.reading.clone();
        fields[2] = record.english.clone();
        fields[3] = record.part_of_speech.clone();
        fields[4] = record.example_japanese.clone();
        fields[5] = record.example_translation.clone();
        fields[6] = record.jlpt_level.clone();
        fields[AUDIO_FIELD] = sound_tag.to_string();

        let tags = match record.jlpt_level.trim() {
            "" => Vec::new(),
            level => vec![level.replace(' ', "_")],
        };
        Self::new(fields, tags)
    }

    /// First field; Anki sorts and checks duplicates on it.
    pub fn sort_field(&self) -> &str {
        self.fields.first().map(String::as_str).unwrap_or("")
    }

    /// Tags in collection format: space separated, padded with spaces.
    pub fn tag_string(&self) -> String {
        if self.tags.is_empty() {
            String::new()
        } else {
            format!(" {} ", self.tags.join(" "))
        }
    }
}

/// The study set: an ordered list of notes sharing one id.
#[derive(Debug, Clone)]
pub struct Deck {
    pub id: i64,
    pub name: String,
    pub description: String,
    notes: Vec<Note>,
}

impl Deck {
    pub fn new(id: i64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            description: String::new(),
            notes: Vec::new(),
        }
    }

    pub fn add_note(&mut self, note: Note) {
        self.notes.push(note);
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Collection JSON for this deck, as stored in `col.decks`.
    pub fn to_json(&self, modified: i64) -> Value {
        deck_json(self.id, &self.name, &self.description, modified)
    }
}

pub(crate) fn deck_json(id: i64, name: &str, description: &str, modified: i64) -> Value {
    json!({
        "id": id,
        "name": name,
        "desc": description,
        "mod": modified,
        "usn": -1,
        "collapsed": false,
        "browserCollapsed": false,
        "conf": 1,
        "dyn": 0,
        "extendNew": 10,
        "extendRev": 50,
        "lrnToday": [0, 0],
        "newToday": [0, 0],
        "revToday": [0, 0],
        "timeToday": [0, 0],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_ids_fall_in_range() {
        for _ in 0..100 {
            let id = IdStrategy::Random.id_for("deck");
            assert!((ID_RANGE_START..ID_RANGE_END).contains(&id));
        }
    }

    #[test]
    fn stable_ids_depend_only_on_name() {
        let a = IdStrategy::Stable.id_for("JLPT_N5_Vocab");
        assert_eq!(a, IdStrategy::Stable.id_for("JLPT_N5_Vocab"));
        assert_ne!(a, IdStrategy::Stable.id_for("JLPT_N4_Vocab"));
        assert!((ID_RANGE_START..ID_RANGE_END).contains(&a));
    }

    #[test]
    fn guid_is_content_derived_base91() {
        let fields = vec!["水".to_string(), "みず".to_string()];
        let guid = guid_for(&fields);
        assert_eq!(guid, guid_for(&fields));
        assert_ne!(guid, guid_for(&["水".to_string()]));
        assert!(guid.bytes().all(|b| BASE91_TABLE.contains(&b)));
        // 64 bits need at most 10 base91 digits.
        assert!(!guid.is_empty() && guid.len() <= 10);
    }

    #[test]
    fn note_fields_follow_model_order() {
        let record = VocabRecord {
            japanese: "猫".into(),
            reading: "ねこ".into(),
            english: "cat".into(),
            part_of_speech: "noun".into(),
            example_japanese: "猫がいます。".into(),
            example_translation: "There is a cat.".into(),
            jlpt_level: "N5".into(),
        };
        let note = Note::from_record(&record, "[sound:word_3.mp3]");
        assert_eq!(
            note.fields,
            vec![
                "猫",
                "ねこ",
                "cat",
                "noun",
                "猫がいます。",
                "There is a cat.",
                "N5",
                "[sound:word_3.mp3]"
            ]
        );
        assert_eq!(note.sort_field(), "猫");
        assert_eq!(note.tag_string(), " N5 ");
    }

    #[test]
    fn deck_keeps_insertion_order_without_dedup() {
        let mut deck = Deck::new(7, "d");
        let note = Note::from_record(&VocabRecord::default(), "");
        deck.add_note(note.clone());
        deck.add_note(note.clone());
        assert_eq!(deck.len(), 2);
        assert_eq!(deck.notes()[0], deck.notes()[1]);
        assert!(note.tag_string().is_empty());
    }
}
