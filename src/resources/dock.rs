//! Dock tiles: typed codec over the persisted `persistent-*` arrays and the
//! purge-then-upsert reconciliation applied to a whole array.
use std::fmt;

use plist::{Dictionary, Value};

use super::{Drift, Probed, Resource, ResourceChange, ResourceError, ValueDrift};
use crate::config::units::{
    Arrangement, DisplayAs, DockEntry, DockSection, ShowAs, TileKind, is_ghost_url, url_identity,
};
use crate::system::DockStore;

const TILE_DATA: &str = "tile-data";
const TILE_TYPE: &str = "tile-type";
const FILE_DATA: &str = "file-data";
const URL_DATA: &str = "url";
const URL_STRING: &str = "_CFURLString";
const URL_STRING_TYPE: &str = "_CFURLStringType";
/// `kCFURLPOSIXPathStyle`-style absolute URL string.
const URL_TYPE_ABSOLUTE: i64 = 15;

const fn arrangement_code(a: Arrangement) -> i64 {
    match a {
        Arrangement::Name => 1,
        Arrangement::DateAdded => 2,
        Arrangement::DateModified => 3,
        Arrangement::DateCreated => 4,
        Arrangement::Kind => 5,
    }
}

const fn arrangement_from(code: i64) -> Arrangement {
    match code {
        2 => Arrangement::DateAdded,
        3 => Arrangement::DateModified,
        4 => Arrangement::DateCreated,
        5 => Arrangement::Kind,
        _ => Arrangement::Name,
    }
}

const fn display_code(d: DisplayAs) -> i64 {
    match d {
        DisplayAs::Stack => 0,
        DisplayAs::Folder => 1,
    }
}

const fn show_code(s: ShowAs) -> i64 {
    match s {
        ShowAs::Automatic => 0,
        ShowAs::Fan => 1,
        ShowAs::Grid => 2,
        ShowAs::List => 3,
    }
}

const fn show_from(code: i64) -> ShowAs {
    match code {
        1 => ShowAs::Fan,
        2 => ShowAs::Grid,
        3 => ShowAs::List,
        _ => ShowAs::Automatic,
    }
}

const fn tile_type(kind: TileKind) -> &'static str {
    match kind {
        TileKind::Directory => "directory-tile",
        TileKind::File => "file-tile",
    }
}

/// Encode a tile into its persisted dictionary form.
#[must_use]
pub fn encode(entry: &DockEntry) -> Value {
    let label = url_identity(&entry.url)
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();

    let mut file_data = Dictionary::new();
    file_data.insert(URL_STRING.to_string(), Value::String(entry.url.clone()));
    file_data.insert(URL_STRING_TYPE.to_string(), Value::from(URL_TYPE_ABSOLUTE));

    let mut tile = Dictionary::new();
    tile.insert(FILE_DATA.to_string(), Value::Dictionary(file_data));
    tile.insert("file-label".to_string(), Value::String(label));
    tile.insert(
        "file-type".to_string(),
        Value::from(match entry.tile {
            TileKind::Directory => 2_i64,
            TileKind::File => 41_i64,
        }),
    );
    insert_settings(&mut tile, entry);

    let mut root = Dictionary::new();
    root.insert(TILE_DATA.to_string(), Value::Dictionary(tile));
    root.insert(
        TILE_TYPE.to_string(),
        Value::String(tile_type(entry.tile).to_string()),
    );
    Value::Dictionary(root)
}

fn insert_settings(tile: &mut Dictionary, entry: &DockEntry) {
    tile.insert(
        "arrangement".to_string(),
        Value::from(arrangement_code(entry.arrangement)),
    );
    tile.insert(
        "displayas".to_string(),
        Value::from(display_code(entry.display_as)),
    );
    tile.insert("showas".to_string(), Value::from(show_code(entry.show_as)));
}

fn tile_data(value: &Value) -> Option<&Dictionary> {
    value
        .as_dictionary()?
        .get(TILE_DATA)
        .and_then(Value::as_dictionary)
}

fn tile_type_of(value: &Value) -> Option<&str> {
    value
        .as_dictionary()?
        .get(TILE_TYPE)
        .and_then(Value::as_string)
}

/// Key of the `tile-data` dictionary holding the tile's URL, for tile types
/// that are defined by one.
///
/// Spacers, the recent-applications tile, and tile types this module does not
/// know carry no URL of their own.
fn url_key(value: &Value) -> Option<&'static str> {
    match tile_type_of(value) {
        None | Some("file-tile" | "directory-tile") => Some(FILE_DATA),
        Some("url-tile") => Some(URL_DATA),
        Some(_) => None,
    }
}

/// The raw URL string of a persisted tile, if it has one.
#[must_use]
pub fn raw_url(value: &Value) -> Option<&str> {
    tile_data(value)?
        .get(url_key(value)?)
        .and_then(Value::as_dictionary)?
        .get(URL_STRING)
        .and_then(Value::as_string)
}

/// URL of a file or directory tile; `None` for every other tile type.
fn file_tile_url(value: &Value) -> Option<&str> {
    if url_key(value) == Some(FILE_DATA) {
        raw_url(value)
    } else {
        None
    }
}

/// Whether a persisted tile is a ghost: a URL-defined tile whose URL is
/// missing or degenerate.
#[must_use]
pub fn is_ghost(value: &Value) -> bool {
    url_key(value).is_some() && raw_url(value).is_none_or(is_ghost_url)
}

/// Decode the meaningful fields of a persisted tile.
///
/// Returns `None` for ghosts and for anything that is not a file or
/// directory tile.  Everything not modelled by [`DockEntry`] (GUIDs,
/// bookmarks, labels) is ignored.
#[must_use]
pub fn decode(value: &Value) -> Option<DockEntry> {
    if is_ghost(value) {
        return None;
    }
    let url = file_tile_url(value)?.to_string();
    let tile = tile_data(value)?;
    let int = |key: &str| tile.get(key).and_then(Value::as_signed_integer);
    let kind = match tile_type_of(value) {
        Some("file-tile") => TileKind::File,
        _ => TileKind::Directory,
    };
    Some(DockEntry {
        url,
        tile: kind,
        arrangement: int("arrangement").map_or(Arrangement::Name, arrangement_from),
        display_as: if int("displayas") == Some(1) {
            DisplayAs::Folder
        } else {
            DisplayAs::Stack
        },
        show_as: int("showas").map_or(ShowAs::Automatic, show_from),
    })
}

/// What happened to the desired tile during [`reconcile_entries`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TargetEdit {
    /// Already present with the same settings.
    #[default]
    Unchanged,
    /// Present with different settings; updated in place.
    Updated,
    /// Not present; appended.
    Appended,
}

/// Summary of the edits [`reconcile_entries`] made.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DockEdit {
    /// Ghost tiles removed.
    pub purged_ghosts: usize,
    /// Extra tiles with the desired identity removed.
    pub dropped_duplicates: usize,
    /// Edit made to the desired tile.
    pub target: TargetEdit,
}

impl DockEdit {
    /// Whether the array differs from the input.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.purged_ghosts > 0 || self.dropped_duplicates > 0 || self.target != TargetEdit::Unchanged
    }
}

/// Reconcile a whole persisted array against one desired tile.
///
/// Ghosts are purged first.  The first tile with the desired identity is
/// kept at its position (its settings are rewritten when they differ),
/// later tiles with the same identity are dropped, and the tile is appended
/// when no match exists.  Unrelated tiles keep their order and content.
#[must_use]
pub fn reconcile_entries(entries: Vec<Value>, desired: &DockEntry) -> (Vec<Value>, DockEdit) {
    let identity = desired.identity();
    let mut edit = DockEdit::default();
    let mut out = Vec::with_capacity(entries.len() + 1);
    let mut seen = false;

    for mut value in entries {
        if is_ghost(&value) {
            edit.purged_ghosts += 1;
            continue;
        }
        let matches = file_tile_url(&value).is_some_and(|u| url_identity(u) == identity);
        if !matches {
            out.push(value);
            continue;
        }
        if seen {
            edit.dropped_duplicates += 1;
            continue;
        }
        seen = true;
        if !decode(&value).is_some_and(|current| current.same_settings(desired)) {
            update_settings(&mut value, desired);
            edit.target = TargetEdit::Updated;
        }
        out.push(value);
    }

    if !seen {
        out.push(encode(desired));
        edit.target = TargetEdit::Appended;
    }
    (out, edit)
}

fn update_settings(value: &mut Value, desired: &DockEntry) {
    let tile = value
        .as_dictionary_mut()
        .and_then(|d| d.get_mut(TILE_DATA))
        .and_then(Value::as_dictionary_mut);
    match tile {
        Some(tile) => insert_settings(tile, desired),
        None => *value = encode(desired),
    }
}

/// What was observed in one Dock section for the desired tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockObservation {
    /// First tile with the desired identity, if any.
    pub entry: Option<DockEntry>,
    /// Ghost tiles in the section.
    pub ghosts: usize,
    /// Extra tiles with the desired identity.
    pub duplicates: usize,
}

/// Differ output for a Dock tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockDrift {
    /// State of the desired tile itself.
    pub target: ValueDrift,
    /// Ghosts to purge.
    pub ghosts: usize,
    /// Duplicates to drop.
    pub duplicates: usize,
    url: String,
}

impl Drift for DockDrift {
    fn needs_change(&self) -> bool {
        self.target.needs_change() || self.ghosts > 0 || self.duplicates > 0
    }
}

impl fmt::Display for DockDrift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        match &self.target {
            ValueDrift::InSync => {}
            ValueDrift::Missing => parts.push(format!("add {}", self.url)),
            ValueDrift::Differs { current } => {
                parts.push(format!("update {} (currently {current})", self.url));
            }
        }
        if self.ghosts > 0 {
            parts.push(format!("purge {} ghost tile(s)", self.ghosts));
        }
        if self.duplicates > 0 {
            parts.push(format!("drop {} duplicate tile(s)", self.duplicates));
        }
        if parts.is_empty() {
            f.write_str("in sync")
        } else {
            f.write_str(&parts.join("; "))
        }
    }
}

/// A Dock tile that should be present exactly once with given settings.
pub struct DockResource<'a> {
    entry: DockEntry,
    section: DockSection,
    store: &'a dyn DockStore,
}

impl std::fmt::Debug for DockResource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DockResource")
            .field("entry", &self.entry)
            .field("section", &self.section)
            .finish_non_exhaustive()
    }
}

impl<'a> DockResource<'a> {
    /// Create a Dock resource for `entry` in `section`.
    #[must_use]
    pub const fn new(entry: DockEntry, section: DockSection, store: &'a dyn DockStore) -> Self {
        Self {
            entry,
            section,
            store,
        }
    }
}

fn settings_label(entry: &DockEntry) -> String {
    format!(
        "{:?}, {:?}, {:?}",
        entry.arrangement, entry.display_as, entry.show_as
    )
}

impl Resource for DockResource<'_> {
    type State = DockObservation;
    type Drift = DockDrift;

    fn description(&self) -> String {
        format!("dock {} {}", self.section.plist_key(), self.entry.url)
    }

    fn probe(&self) -> Result<Probed<DockObservation>, ResourceError> {
        let entries = self.store.read_section(self.section)?;
        let identity = self.entry.identity();
        let ghosts = entries.iter().filter(|v| is_ghost(v)).count();
        let mut matching = entries
            .iter()
            .filter_map(decode)
            .filter(|e| e.identity() == identity);
        let entry = matching.next();
        if entry.is_none() && ghosts == 0 {
            return Ok(Probed::Absent);
        }
        Ok(Probed::Present(DockObservation {
            entry,
            ghosts,
            duplicates: matching.count(),
        }))
    }

    fn diff(&self, current: &Probed<DockObservation>) -> DockDrift {
        let url = self.entry.url.clone();
        match current {
            Probed::Absent => DockDrift {
                target: ValueDrift::Missing,
                ghosts: 0,
                duplicates: 0,
                url,
            },
            Probed::Present(obs) => DockDrift {
                target: match &obs.entry {
                    None => ValueDrift::Missing,
                    Some(found) if found.same_settings(&self.entry) => ValueDrift::InSync,
                    Some(found) => ValueDrift::Differs {
                        current: settings_label(found),
                    },
                },
                ghosts: obs.ghosts,
                duplicates: obs.duplicates,
                url,
            },
        }
    }

    fn apply(&self, drift: &DockDrift) -> Result<ResourceChange, ResourceError> {
        if !drift.needs_change() {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        let entries = self.store.read_section(self.section)?;
        let (entries, edit) = reconcile_entries(entries, &self.entry);
        if !edit.changed() {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        self.store.write_section(self.section, entries)?;
        Ok(ResourceChange::Applied)
    }
}
