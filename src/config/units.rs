//! Catalog data model: one [`ConfigUnit`] per declarative target.
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One declarative, independently reconcilable configuration target.
///
/// Constructed once when the catalog is loaded and never mutated.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigUnit {
    /// Stable identifier (e.g. `dock.downloads-stack`).
    pub id: String,
    /// Catalog grouping label; defaults to the id prefix before the first `.`.
    #[serde(default)]
    pub group: Option<String>,
    /// Downgrade privilege refusals to a warning instead of failing the run.
    #[serde(default)]
    pub requires_privilege: bool,
    /// Service to restart once after any unit naming it has changed.
    #[serde(default)]
    pub restarts: Option<String>,
    /// Earlier units that must be applied or satisfied before this one runs.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Domain-specific target.
    #[serde(flatten)]
    pub spec: UnitSpec,
}

impl ConfigUnit {
    /// The OS subsystem this unit belongs to.
    #[must_use]
    pub const fn domain(&self) -> Domain {
        match self.spec {
            UnitSpec::Preference(_) => Domain::Preferences,
            UnitSpec::DockEntry(_) => Domain::DockEntries,
            UnitSpec::PluginVersions(_) => Domain::PluginVersions,
            UnitSpec::LoginItem(_) => Domain::LoginItem,
            UnitSpec::PackageManifest(_) => Domain::PackageManifest,
            UnitSpec::Installer(_) => Domain::Installer,
            UnitSpec::File(_) => Domain::File,
        }
    }

    /// The unit's group label.
    #[must_use]
    pub fn group(&self) -> &str {
        self.group
            .as_deref()
            .unwrap_or_else(|| self.id.split('.').next().unwrap_or(&self.id))
    }

    /// Whether a privilege refusal is downgraded to a warning.
    ///
    /// Login items always qualify: they depend on an Automation grant only a
    /// human can give.
    #[must_use]
    pub fn tolerates_privilege_failure(&self) -> bool {
        self.requires_privilege || self.domain() == Domain::LoginItem
    }

    /// Whether `selector` names this unit by id, id prefix, or group.
    #[must_use]
    pub fn matches_selector(&self, selector: &str) -> bool {
        let selector = selector.trim().to_lowercase();
        let id = self.id.to_lowercase();
        id == selector
            || id
                .strip_prefix(selector.as_str())
                .is_some_and(|rest| rest.starts_with('.'))
            || self.group().to_lowercase() == selector
    }
}

/// OS subsystem a unit reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Domain {
    /// Flat `defaults` key-value preferences.
    Preferences,
    /// Dock persisted-entry arrays.
    DockEntries,
    /// Version-manager plugins and runtime versions.
    PluginVersions,
    /// Login items.
    LoginItem,
    /// Package bundle manifest.
    PackageManifest,
    /// Opaque third-party installer.
    Installer,
    /// Whole-file overwrite.
    File,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Preferences => "preferences",
            Self::DockEntries => "dock-entries",
            Self::PluginVersions => "plugin-versions",
            Self::LoginItem => "login-item",
            Self::PackageManifest => "package-manifest",
            Self::Installer => "installer",
            Self::File => "file",
        };
        f.write_str(name)
    }
}

/// Domain-specific target of a unit, selected by the `kind` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum UnitSpec {
    /// A single preference key.
    Preference(PreferenceSpec),
    /// A Dock tile.
    DockEntry(DockEntrySpec),
    /// A version-manager plugin and its versions.
    PluginVersions(PluginVersionSet),
    /// A login item.
    LoginItem(LoginItemSpec),
    /// A package bundle manifest.
    PackageManifest(ManifestSpec),
    /// An opaque installer step.
    Installer(InstallerSpec),
    /// A whole-file overwrite.
    File(FileSpec),
}

/// Target for a `defaults` preference key.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PreferenceSpec {
    /// Preference domain (e.g. `NSGlobalDomain`, `com.apple.finder`).
    pub domain: String,
    /// Key inside the domain.
    pub key: String,
    /// Desired value.
    pub value: PrefValue,
    /// Write to the by-host preferences (`defaults -currentHost`).
    #[serde(default)]
    pub current_host: bool,
}

/// A scalar preference value.
///
/// Variant order matters for deserialization: integers must be tried
/// before floats.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PrefValue {
    /// Boolean (`-bool`).
    Bool(bool),
    /// Integer (`-int`).
    Int(i64),
    /// Floating point (`-float`).
    Float(f64),
    /// String (`-string`).
    String(String),
}

impl PrefValue {
    /// The `defaults write` type flag for this value.
    #[must_use]
    pub const fn type_flag(&self) -> &'static str {
        match self {
            Self::Bool(_) => "-bool",
            Self::Int(_) => "-int",
            Self::Float(_) => "-float",
            Self::String(_) => "-string",
        }
    }

    /// Compare against the text printed by `defaults read`.
    ///
    /// `defaults` prints booleans as `1`/`0` and floats without trailing
    /// zeros, so comparison is done on parsed values rather than text.
    #[must_use]
    pub fn matches_raw(&self, raw: &str) -> bool {
        let raw = raw.trim();
        match self {
            Self::Bool(b) => match raw.to_lowercase().as_str() {
                "1" | "true" | "yes" => *b,
                "0" | "false" | "no" => !*b,
                _ => false,
            },
            Self::Int(i) => raw.parse::<i64>().is_ok_and(|v| v == *i),
            Self::Float(f) => raw
                .parse::<f64>()
                .is_ok_and(|v| (v - *f).abs() < f64::EPSILON * 16.0),
            Self::String(s) => raw == s,
        }
    }
}

impl fmt::Display for PrefValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// Which persisted Dock array a tile lives in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DockSection {
    /// `persistent-others` (right of the separator).
    #[default]
    Others,
    /// `persistent-apps`.
    Apps,
}

impl DockSection {
    /// Key of the array in the `com.apple.dock` domain.
    #[must_use]
    pub const fn plist_key(self) -> &'static str {
        match self {
            Self::Others => "persistent-others",
            Self::Apps => "persistent-apps",
        }
    }
}

/// Tile type of a Dock entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TileKind {
    /// A folder or stack.
    #[default]
    Directory,
    /// A single file or application.
    File,
}

/// Sort order of a Dock stack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Arrangement {
    /// Sort by name.
    #[default]
    Name,
    /// Sort by date added.
    DateAdded,
    /// Sort by date modified.
    DateModified,
    /// Sort by date created.
    DateCreated,
    /// Sort by kind.
    Kind,
}

/// Whether a directory tile shows as a stack or a folder icon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayAs {
    /// Stack of file icons.
    #[default]
    Stack,
    /// Plain folder icon.
    Folder,
}

/// How a stack expands when clicked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShowAs {
    /// Let the Dock decide.
    #[default]
    Automatic,
    /// Fan.
    Fan,
    /// Grid.
    Grid,
    /// List.
    List,
}

/// One Dock tile.
///
/// Two entries describe the same tile when their identity URLs match; see
/// [`DockEntry::identity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DockEntry {
    /// Resource URL (e.g. `file:///Users/x/Downloads/`).
    pub url: String,
    /// Tile type.
    pub tile: TileKind,
    /// Stack sort order.
    pub arrangement: Arrangement,
    /// Stack or folder.
    pub display_as: DisplayAs,
    /// Expansion style.
    pub show_as: ShowAs,
}

impl DockEntry {
    /// Normalised identity used to match tiles regardless of how the URL was
    /// written (percent-encoding, trailing slash, scheme case).
    #[must_use]
    pub fn identity(&self) -> String {
        url_identity(&self.url)
    }

    /// Whether two entries are the same logical tile with the same settings.
    ///
    /// Incidental metadata (GUIDs, bookmark blobs, labels) is not part of the
    /// model and therefore never compared.
    #[must_use]
    pub fn same_settings(&self, other: &Self) -> bool {
        self.identity() == other.identity()
            && self.arrangement == other.arrangement
            && self.display_as == other.display_as
            && self.show_as == other.show_as
    }
}

/// Normalise a tile URL for identity comparison.
///
/// A URL whose percent-escapes do not decode to UTF-8 is compared as
/// written, so two distinct malformed URLs never collapse into one identity.
#[must_use]
pub fn url_identity(url: &str) -> String {
    let url = url.trim();
    let decoded = percent_decode(url).unwrap_or_else(|| url.to_string());
    let (scheme, rest) = decoded
        .split_once("://")
        .map_or((String::new(), decoded.as_str()), |(s, r)| {
            (s.to_lowercase(), r)
        });
    let rest = rest.trim_end_matches('/');
    if scheme.is_empty() {
        rest.to_string()
    } else {
        format!("{scheme}://{rest}")
    }
}

/// Whether every `%` in `url` starts a two-digit hex escape and the decoded
/// bytes are UTF-8.
#[must_use]
pub fn has_valid_percent_encoding(url: &str) -> bool {
    percent_decode(url.trim()).is_some()
}

/// Whether a URL is degenerate: empty, or a bare scheme with no path.
#[must_use]
pub fn is_ghost_url(url: &str) -> bool {
    let url = url.trim();
    url.is_empty()
        || url
            .split_once("://")
            .is_some_and(|(_, rest)| rest.trim_matches('/').is_empty())
}

/// Convert an absolute filesystem path to a `file://` URL.
#[must_use]
pub fn file_url(path: &Path, directory: bool) -> String {
    let mut url = String::from("file://");
    for ch in path.to_string_lossy().chars() {
        match ch {
            ' ' => url.push_str("%20"),
            '%' => url.push_str("%25"),
            '#' => url.push_str("%23"),
            '?' => url.push_str("%3F"),
            c => url.push(c),
        }
    }
    if directory && !url.ends_with('/') {
        url.push('/');
    }
    url
}

fn percent_decode(s: &str) -> Option<String> {
    let mut out = Vec::with_capacity(s.len());
    let mut rest = s.as_bytes();
    while let Some((&b, tail)) = rest.split_first() {
        if b == b'%' {
            let hex = tail.get(..2)?;
            let hex = std::str::from_utf8(hex).ok()?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            rest = tail.get(2..)?;
        } else {
            out.push(b);
            rest = tail;
        }
    }
    String::from_utf8(out).ok()
}

/// Target for a Dock tile as written in the catalog.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DockEntrySpec {
    /// Tile URL; mutually exclusive with `path`.
    #[serde(default)]
    pub url: Option<String>,
    /// Filesystem path, converted to a `file://` URL.
    #[serde(default)]
    pub path: Option<String>,
    /// Tile type.
    #[serde(default)]
    pub tile: TileKind,
    /// Stack sort order.
    #[serde(default)]
    pub arrangement: Arrangement,
    /// Stack or folder.
    #[serde(default)]
    pub display_as: DisplayAs,
    /// Expansion style.
    #[serde(default)]
    pub show_as: ShowAs,
    /// Persisted array the tile belongs to.
    #[serde(default)]
    pub section: DockSection,
}

impl DockEntrySpec {
    /// Build the desired [`DockEntry`], expanding `~` against `home`.
    #[must_use]
    pub fn entry(&self, home: &Path) -> DockEntry {
        let url = match (&self.url, &self.path) {
            (Some(url), _) => url.clone(),
            (None, Some(path)) => {
                file_url(&expand_home(path, home), self.tile == TileKind::Directory)
            }
            (None, None) => String::new(),
        };
        DockEntry {
            url,
            tile: self.tile,
            arrangement: self.arrangement,
            display_as: self.display_as,
            show_as: self.show_as,
        }
    }
}

/// Version-manager plugin with the runtime versions it should provide.
///
/// The last element of `versions` is the desired global default.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PluginVersionSet {
    /// Runtime identifier (e.g. `nodejs`).
    pub name: String,
    /// Plugin repository URL.
    pub source: String,
    /// Versions to install, in order; never empty in a valid catalog.
    pub versions: Vec<String>,
}

impl PluginVersionSet {
    /// The version that should be the global default.
    #[must_use]
    pub fn global_version(&self) -> Option<&str> {
        self.versions.last().map(String::as_str)
    }
}

/// Target for a login item.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoginItemSpec {
    /// Display name the item is registered under.
    pub name: String,
    /// Application bundle path.
    pub path: String,
    /// Launch hidden.
    #[serde(default)]
    pub hidden: bool,
}

/// A package bundle manifest (Brewfile).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ManifestSpec {
    /// Manifest path; relative paths resolve against the catalog directory.
    pub manifest: PathBuf,
}

/// How an installer decides whether its product is already present.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallerCheck {
    /// Present when the program is on `PATH`.
    Program(String),
    /// Present when the path exists.
    Path(String),
}

/// An opaque installer step.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InstallerSpec {
    /// Presence check.
    pub check: InstallerCheck,
    /// Program and arguments run when the check fails.
    pub command: Vec<String>,
}

/// A file whose whole content is overwritten from a source file or inline text.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FileSpec {
    /// Source file; relative paths resolve against the catalog directory.
    #[serde(default)]
    pub source: Option<PathBuf>,
    /// Inline content; mutually exclusive with `source`.
    #[serde(default)]
    pub content: Option<String>,
    /// Target path; `~` expands to the home directory.
    pub target: String,
}

/// Expand a leading `~` to `home`.
#[must_use]
pub fn expand_home(path: &str, home: &Path) -> PathBuf {
    if path == "~" {
        home.to_path_buf()
    } else if let Some(rest) = path.strip_prefix("~/") {
        home.join(rest)
    } else {
        PathBuf::from(path)
    }
}
