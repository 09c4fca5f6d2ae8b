use serde_json::{json, Value};

/// Note type field order. Notes store their values in exactly this order.
pub const FIELD_NAMES: [&str; 8] = [
    "Japanese",
    "Reading",
    "English",
    "PartOfSpeech",
    "ExampleJP",
    "ExampleCN",
    "JLPT",
    "Audio",
];

pub const AUDIO_FIELD: usize = 7;

const CARD_CSS: &str = ".card {
 font-family: arial;
 font-size: 20px;
 text-align: center;
 color: black;
 background-color: white;
}
.japanese { font-size: 40px; }
.reading { color: #555; }
.example .cn { color: #666; }
.badge { padding: 0 6px; border-radius: 4px; background: #eef; }
";

const FORWARD_QUESTION: &str = r#"
<div class="card-front">
  <div class="japanese">{{Japanese}}</div>
  <div class="reading">{{Reading}}</div>
  <div class="audio">{{Audio}}</div>
</div>
"#;

const FORWARD_ANSWER: &str = r#"
{{FrontSide}}<hr>
<div class="card-back">
  <div class="meaning"><b>释义:</b> {{English}}</div>
  <div class="pos"><b>词性:</b> {{PartOfSpeech}}</div>
  <div class="example">
    <b>例句:</b> <span class="jp">{{ExampleJP}}</span><br>
    <span class="cn">→ {{ExampleCN}}</span>
  </div>
  <div class="jlpt">JLPT: <span class="badge">{{JLPT}}</span></div>
</div>
"#;

const REVERSE_QUESTION: &str = r#"
<div class="card-front">
  <div class="meaning"><b>释义:</b> {{English}}</div>
</div>
"#;

const REVERSE_ANSWER: &str = r#"
{{FrontSide}}<hr>
<div class="card-back">
  <div class="japanese">{{Japanese}}</div>
  <div class="reading">{{Reading}}</div>
  <div class="pos"><b>词性:</b> {{PartOfSpeech}}</div>
  <div class="example">
    <b>例句:</b> <span class="jp">{{ExampleJP}}</span><br>
    <span class="cn">→ {{ExampleCN}}</span>
  </div>
  <div class="jlpt">JLPT: <span class="badge">{{JLPT}}</span></div>
  <div class="audio">{{Audio}}</div>
</div>
"#;

/// One card layout of a note type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardTemplate {
    pub name: String,
    /// Question side markup.
    pub question: String,
    /// Answer side markup.
    pub answer: String,
}

impl CardTemplate {
    pub fn new(name: &str, question: &str, answer: &str) -> Self {
        Self {
            name: name.to_string(),
            question: question.to_string(),
            answer: answer.to_string(),
        }
    }

    /// Indexes into `fields` of every field the question side references.
    ///
    /// Section markers (`{{#F}}`, `{{^F}}`, `{{/F}}`) and filters
    /// (`{{type:F}}`) count as references; `{{FrontSide}}` does not.
    pub fn referenced_fields(&self, fields: &[&str]) -> Vec<usize> {
        let mut indexes = Vec::new();
        for name in placeholders(&self.question) {
            if let Some(idx) = fields.iter().position(|f| *f == name) {
                if !indexes.contains(&idx) {
                    indexes.push(idx);
                }
            }
        }
        indexes.sort_unstable();
        indexes
    }

    /// Whether a note with these field values produces this card.
    ///
    /// Anki generates a card when any field on its question side is non-empty.
    pub fn renders_for(&self, fields: &[&str], values: &[String]) -> bool {
        self.referenced_fields(fields)
            .into_iter()
            .any(|idx| values.get(idx).is_some_and(|v| !v.trim().is_empty()))
    }
}

fn placeholders(markup: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = markup;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            break;
        };
        let tag = after[..end].trim();
        let tag = tag.trim_start_matches(['#', '^', '/']);
        // Filters come first: `{{type:Field}}`, `{{hint:text:Field}}`.
        let name = tag.rsplit(':').next().unwrap_or(tag).trim();
        if !name.is_empty() && name != "FrontSide" {
            names.push(name);
        }
        rest = &after[end + 2..];
    }
    names
}

/// The note type ("model") shared by every note of the deck.
#[derive(Debug, Clone)]
pub struct NoteModel {
    pub id: i64,
    pub name: String,
    pub fields: Vec<&'static str>,
    pub templates: Vec<CardTemplate>,
    pub css: String,
}

impl NoteModel {
    /// The bidirectional vocabulary note type: term → meaning and meaning → term.
    pub fn vocabulary(id: i64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            fields: FIELD_NAMES.to_vec(),
            templates: vec![
                CardTemplate::new("Card 1", FORWARD_QUESTION, FORWARD_ANSWER),
                CardTemplate::new("Card 2", REVERSE_QUESTION, REVERSE_ANSWER),
            ],
            css: CARD_CSS.to_string(),
        }
    }

    /// Ordinals of the cards a note with these values generates.
    pub fn card_ordinals(&self, values: &[String]) -> Vec<usize> {
        self.templates
            .iter()
            .enumerate()
            .filter(|(_, t)| t.renders_for(&self.fields, values))
            .map(|(ord, _)| ord)
            .collect()
    }

    /// Collection JSON for this note type, as stored in `col.models`.
    pub fn to_json(&self, deck_id: i64, modified: i64) -> Value {
        let flds: Vec<Value> = self
            .fields
            .iter()
            .enumerate()
            .map(|(ord, name)| {
                json!({
                    "name": name,
                    "ord": ord,
                    "sticky": false,
                    "rtl": false,
                    "font": "Arial",
                    "size": 20,
                    "media": [],
                })
            })
            .collect();

        let tmpls: Vec<Value> = self
            .templates
            .iter()
            .enumerate()
            .map(|(ord, t)| {
                json!({
                    "name": t.name,
                    "ord": ord,
                    "qfmt": t.question,
                    "afmt": t.answer,
                    "bqfmt": "",
                    "bafmt": "",
                    "did": null,
                })
            })
            .collect();

        let req: Vec<Value> = self
            .templates
            .iter()
            .enumerate()
            .map(|(ord, t)| json!([ord, "any", t.referenced_fields(&self.fields)]))
            .collect();

        json!({
            "id": self.id,
            "name": self.name,
            "type": 0,
            "mod": modified,
            "usn": -1,
            "sortf": 0,
            "did": deck_id,
            "flds": flds,
            "tmpls": tmpls,
            "req": req,
            "css": self.css,
            "latexPre": "\\documentclass[12pt]{article}\n\\special{papersize=3in,5in}\n\\usepackage[utf8]{inputenc}\n\\usepackage{amssymb,amsmath}\n\\pagestyle{empty}\n\\setlength{\\parindent}{0in}\n\\begin{document}\n",
            "latexPost": "\\end{document}",
            "latexsvg": false,
            "tags": [],
            "vers": [],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(japanese: &str, english: &str, audio: &str) -> Vec<String> {
        let mut v = vec![String::new(); FIELD_NAMES.len()];
        v[0] = japanese.to_string();
        v[2] = english.to_string();
        v[AUDIO_FIELD] = audio.to_string();
        v
    }

    #[test]
    fn forward_card_references_term_reading_and_audio() {
        let model = NoteModel::vocabulary(1, "m");
        assert_eq!(
            model.templates[0].referenced_fields(&model.fields),
            vec![0, 1, AUDIO_FIELD]
        );
        assert_eq!(model.templates[1].referenced_fields(&model.fields), vec![2]);
    }

    #[test]
    fn front_side_and_filters_are_handled() {
        let t = CardTemplate::new("x", "{{FrontSide}} {{type:English}} {{#Reading}}r{{/Reading}}", "");
        assert_eq!(t.referenced_fields(&FIELD_NAMES), vec![1, 2]);
    }

    #[test]
    fn both_cards_generated_for_a_full_note() {
        let model = NoteModel::vocabulary(1, "m");
        assert_eq!(
            model.card_ordinals(&values("水", "water", "[sound:word_0.mp3]")),
            vec![0, 1]
        );
    }

    #[test]
    fn reverse_card_needs_a_gloss() {
        let model = NoteModel::vocabulary(1, "m");
        assert_eq!(model.card_ordinals(&values("水", "", "[sound:a.mp3]")), vec![0]);
        // Empty term still gets its forward card through the audio field.
        assert_eq!(model.card_ordinals(&values("", "", "[sound:a.mp3]")), vec![0]);
        assert!(model.card_ordinals(&values("", "", "")).is_empty());
    }

    #[test]
    fn model_json_lists_fields_and_templates() {
        let model = NoteModel::vocabulary(1_234_567_890, "JLPT_N5_Model");
        let json = model.to_json(42, 1000);
        assert_eq!(json["id"], 1_234_567_890_i64);
        assert_eq!(json["flds"].as_array().unwrap().len(), 8);
        assert_eq!(json["flds"][7]["name"], "Audio");
        assert_eq!(json["tmpls"][1]["name"], "Card 2");
        assert_eq!(json["req"][1], json!([1, "any", [2]]));
        assert_eq!(json["did"], 42);
    }
}
