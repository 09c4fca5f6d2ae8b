//! `.apkg` writer.
//!
//! An Anki package is a zip archive holding:
//! - `collection.anki2`: a SQLite collection (schema version 11)
//! - one entry per media file, named by its ordinal (`0`, `1`, ...)
//! - `media`: a JSON object mapping each ordinal to the original file name

use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, Connection};
use serde_json::{json, Value};
use sha1::{Digest, Sha1};
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::deck::{deck_json, Deck};
use crate::error::DeckError;
use crate::template::NoteModel;

const COLLECTION_ENTRY: &str = "collection.anki2";
const MEDIA_ENTRY: &str = "media";
const DEFAULT_DECK_ID: i64 = 1;
/// Collection creation time used by every generated package (2014-09-19).
const COLLECTION_CREATED: i64 = 1_411_124_400;

const SCHEMA: &str = "
CREATE TABLE col (
    id              integer primary key,
    crt             integer not null,
    mod             integer not null,
    scm             integer not null,
    ver             integer not null,
    dty             integer not null,
    usn             integer not null,
    ls              integer not null,
    conf            text not null,
    models          text not null,
    decks           text not null,
    dconf           text not null,
    tags            text not null
);
CREATE TABLE notes (
    id              integer primary key,
    guid            text not null,
    mid             integer not null,
    mod             integer not null,
    usn             integer not null,
    tags            text not null,
    flds            text not null,
    sfld            integer not null,
    csum            integer not null,
    flags           integer not null,
    data            text not null
);
CREATE TABLE cards (
    id              integer primary key,
    nid             integer not null,
    did             integer not null,
    ord             integer not null,
    mod             integer not null,
    usn             integer not null,
    type            integer not null,
    queue           integer not null,
    due             integer not null,
    ivl             integer not null,
    factor          integer not null,
    reps            integer not null,
    lapses          integer not null,
    left            integer not null,
    odue            integer not null,
    odid            integer not null,
    flags           integer not null,
    data            text not null
);
CREATE TABLE revlog (
    id              integer primary key,
    cid             integer not null,
    usn             integer not null,
    ease            integer not null,
    ivl             integer not null,
    lastIvl         integer not null,
    factor          integer not null,
    time            integer not null,
    type            integer not null
);
CREATE TABLE graves (
    usn             integer not null,
    oid             integer not null,
    type            integer not null
);
CREATE INDEX ix_notes_usn on notes (usn);
CREATE INDEX ix_cards_usn on cards (usn);
CREATE INDEX ix_revlog_usn on revlog (usn);
CREATE INDEX ix_cards_nid on cards (nid);
CREATE INDEX ix_cards_sched on cards (did, queue, due);
CREATE INDEX ix_revlog_cid on revlog (cid);
CREATE INDEX ix_notes_csum on notes (csum);
";

/// What ended up in a written package.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackageStats {
    pub notes: usize,
    pub cards: usize,
    pub media: usize,
}

/// Serialize `deck` (notes of type `model`) and the `media` files into one
/// `.apkg` at `out_path`.
pub fn write_package(
    deck: &Deck,
    model: &NoteModel,
    media: &[PathBuf],
    out_path: &Path,
) -> Result<PackageStats, DeckError> {
    let media = unique_media(media)?;

    let scratch = tempfile::Builder::new().suffix(".anki2").tempfile()?;
    let cards = {
        let mut conn = Connection::open(scratch.path())?;
        write_collection(&mut conn, deck, model)?
    };
    let mut collection = Vec::new();
    File::open(scratch.path())?.read_to_end(&mut collection)?;

    persist_archive(out_path, |zip| {
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        zip.start_file(COLLECTION_ENTRY, options)?;
        zip.write_all(&collection)?;

        let mut manifest = BTreeMap::new();
        for (ordinal, (path, name)) in media.iter().enumerate() {
            zip.start_file(ordinal.to_string(), options)?;
            zip.write_all(&fs::read(path)?)?;
            manifest.insert(ordinal.to_string(), name.clone());
        }

        zip.start_file(MEDIA_ENTRY, options)?;
        zip.write_all(serde_json::to_string(&manifest)?.as_bytes())?;
        Ok(())
    })?;

    let stats = PackageStats {
        notes: deck.len(),
        cards,
        media: media.len(),
    };
    log::info!(
        "Wrote {} ({} notes, {} cards, {} media files)",
        out_path.display(),
        stats.notes,
        stats.cards,
        stats.media
    );
    Ok(stats)
}

/// Build a zip next to `out_path` and move it into place once it is complete.
///
/// On any failure the partial archive is removed and an existing file at
/// `out_path` is left as it was.
fn persist_archive<F>(out_path: &Path, fill: F) -> Result<(), DeckError>
where
    F: FnOnce(&mut ZipWriter<NamedTempFile>) -> Result<(), DeckError>,
{
    let parent = match out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            fs::create_dir_all(parent)?;
            parent
        }
        None => Path::new("."),
    };
    let partial = tempfile::Builder::new()
        .prefix(".tts-deck")
        .suffix(".apkg.part")
        .tempfile_in(parent)?;

    let mut zip = ZipWriter::new(partial);
    fill(&mut zip)?;
    let partial = zip.finish()?;
    partial.persist(out_path).map_err(|e| e.error)?;
    Ok(())
}

/// Existing media paths paired with their file names, first occurrence of a name wins.
fn unique_media(media: &[PathBuf]) -> Result<Vec<(PathBuf, String)>, DeckError> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(media.len());
    for path in media {
        if !path.is_file() {
            return Err(DeckError::MissingMedia(path.clone()));
        }
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return Err(DeckError::MissingMedia(path.clone()));
        };
        if seen.insert(name.clone()) {
            out.push((path.clone(), name));
        } else {
            log::debug!("Skipping duplicate media file {}", path.display());
        }
    }
    Ok(out)
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

fn write_collection(
    conn: &mut Connection,
    deck: &Deck,
    model: &NoteModel,
) -> Result<usize, DeckError> {
    let now_ms = now_millis();
    let now_s = now_ms / 1000;

    conn.execute_batch(SCHEMA)?;
    let tx = conn.transaction()?;

    let models = json!({ model.id.to_string(): model.to_json(deck.id, now_s) });
    let decks = json!({
        DEFAULT_DECK_ID.to_string(): deck_json(DEFAULT_DECK_ID, "Default", "", 0),
        deck.id.to_string(): deck.to_json(now_s),
    });
    tx.execute(
        "INSERT INTO col VALUES (1, ?1, ?2, ?3, 11, 0, 0, 0, ?4, ?5, ?6, ?7, '{}')",
        params![
            COLLECTION_CREATED,
            now_ms,
            now_ms,
            collection_conf(model.id, deck.id, deck.len() + 1).to_string(),
            models.to_string(),
            decks.to_string(),
            deck_options().to_string(),
        ],
    )?;

    let mut cards = 0;
    {
        let mut insert_note = tx.prepare(
            "INSERT INTO notes VALUES (?1, ?2, ?3, ?4, -1, ?5, ?6, ?7, ?8, 0, '')",
        )?;
        let mut insert_card = tx.prepare(
            "INSERT INTO cards VALUES (?1, ?2, ?3, ?4, ?5, -1, 0, 0, ?6, 0, 0, 0, 0, 0, 0, 0, 0, '')",
        )?;

        for (position, note) in deck.notes().iter().enumerate() {
            let note_id = now_ms + position as i64;
            insert_note.execute(params![
                note_id,
                note.guid,
                model.id,
                now_s,
                note.tag_string(),
                note.fields.join("\x1f"),
                note.sort_field(),
                checksum(note.sort_field()),
            ])?;

            for ord in model.card_ordinals(&note.fields) {
                let card_id = now_ms + cards as i64;
                insert_card.execute(params![
                    card_id,
                    note_id,
                    deck.id,
                    ord as i64,
                    now_s,
                    position as i64 + 1,
                ])?;
                cards += 1;
            }
        }
    }

    tx.commit()?;
    log::debug!("Collection holds {} notes and {cards} cards", deck.len());
    Ok(cards)
}

/// Duplicate-check checksum: first 32 bits of the SHA-1 of the tag-stripped sort field.
fn checksum(field: &str) -> i64 {
    let digest = Sha1::digest(strip_html(field).as_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) as i64
}

fn strip_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.trim().to_string()
}

/// `next_pos` is the due position the next added new card will get.
fn collection_conf(model_id: i64, deck_id: i64, next_pos: usize) -> Value {
    json!({
        "activeDecks": [deck_id],
        "addToCur": true,
        "collapseTime": 1200,
        "curDeck": deck_id,
        "curModel": model_id.to_string(),
        "dueCounts": true,
        "estTimes": true,
        "newBury": true,
        "newSpread": 0,
        "nextPos": next_pos,
        "sortBackwards": false,
        "sortType": "noteFld",
        "timeLim": 0,
    })
}

fn deck_options() -> Value {
    json!({
        "1": {
            "id": 1,
            "name": "Default",
            "mod": 0,
            "usn": 0,
            "maxTaken": 60,
            "autoplay": true,
            "replayq": true,
            "timer": 0,
            "dyn": false,
            "new": {
                "bury": true,
                "delays": [1, 10],
                "initialFactor": 2500,
                "ints": [1, 4, 7],
                "order": 1,
                "perDay": 20,
                "separate": true,
            },
            "lapse": {
                "delays": [10],
                "leechAction": 0,
                "leechFails": 8,
                "minInt": 1,
                "mult": 0,
            },
            "rev": {
                "bury": true,
                "ease4": 1.3,
                "fuzz": 0.05,
                "ivlFct": 1,
                "maxIvl": 36500,
                "minSpace": 1,
                "perDay": 100,
            },
        }
    })
}

/// Notes, cards and media of an existing package, as read back from disk.
#[derive(Debug, Clone, Default)]
pub struct PackageContents {
    pub deck_id: i64,
    pub deck_name: String,
    pub model_id: i64,
    /// Field values of each note, in insertion order.
    pub notes: Vec<Vec<String>>,
    pub cards: usize,
    /// Ordinal → original file name.
    pub media: BTreeMap<String, String>,
}

/// Read back a package written by [`write_package`].
pub fn read_package(path: &Path) -> Result<PackageContents, DeckError> {
    let mut archive = ZipArchive::new(File::open(path)?)?;

    let mut collection = Vec::new();
    archive
        .by_name(COLLECTION_ENTRY)?
        .read_to_end(&mut collection)?;
    let mut manifest = String::new();
    archive.by_name(MEDIA_ENTRY)?.read_to_string(&mut manifest)?;
    let media: BTreeMap<String, String> = serde_json::from_str(&manifest)?;

    let mut scratch = tempfile::Builder::new().suffix(".anki2").tempfile()?;
    scratch.write_all(&collection)?;
    scratch.flush()?;
    let conn = Connection::open(scratch.path())?;

    let (models, decks): (String, String) =
        conn.query_row("SELECT models, decks FROM col", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?;
    let models: BTreeMap<String, Value> = serde_json::from_str(&models)?;
    let decks: BTreeMap<String, Value> = serde_json::from_str(&decks)?;

    let model_id = models
        .keys()
        .next()
        .and_then(|k| k.parse().ok())
        .unwrap_or_default();
    let (deck_id, deck_name) = decks
        .values()
        .filter_map(|d| Some((d["id"].as_i64()?, d["name"].as_str()?.to_string())))
        .find(|(id, _)| *id != DEFAULT_DECK_ID)
        .unwrap_or_default();

    let mut stmt = conn.prepare("SELECT flds FROM notes ORDER BY id")?;
    let notes = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .map(|flds| flds.map(|f| f.split('\x1f').map(str::to_string).collect()))
        .collect::<Result<Vec<Vec<String>>, _>>()?;
    let cards: i64 = conn.query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))?;

    Ok(PackageContents {
        deck_id,
        deck_name,
        model_id,
        notes,
        cards: cards as usize,
        media,
    })
}
