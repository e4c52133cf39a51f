//! The usage file: which definitions and aspects have ever shipped, which
//! were retired, and the stable ids handed out to aspects.
//!
//! One entry per line: `[-]<keyword> <Definition>[.<aspect>][ <id>]`. Blank
//! lines and `#` lines are kept and written back above the entry that follows
//! them.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use sd_parser::is_identifier;
use tracing::{debug, info};

use crate::UsageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UsageKeyword {
    Action,
    Thing,
    Value,
    Enum,
}

impl UsageKeyword {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::Thing => "thing",
            Self::Value => "value",
            Self::Enum => "enum",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "action" => Self::Action,
            "thing" => Self::Thing,
            "value" => Self::Value,
            "enum" => Self::Enum,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UsageKey {
    pub keyword: UsageKeyword,
    pub definition: String,
    pub aspect: Option<String>,
}

impl UsageKey {
    pub fn definition(keyword: UsageKeyword, definition: impl Into<String>) -> Self {
        Self {
            keyword,
            definition: definition.into(),
            aspect: None,
        }
    }

    pub fn aspect(
        keyword: UsageKeyword,
        definition: impl Into<String>,
        aspect: impl Into<String>,
    ) -> Self {
        Self {
            keyword,
            definition: definition.into(),
            aspect: Some(aspect.into()),
        }
    }

    pub fn is_aspect(&self) -> bool {
        self.aspect.is_some()
    }

    /// The definition entry an aspect belongs to.
    pub fn owner(&self) -> UsageKey {
        Self::definition(self.keyword, self.definition.clone())
    }
}

impl fmt::Display for UsageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.keyword.as_str(), self.definition)?;
        if let Some(aspect) = &self.aspect {
            write!(f, ".{}", aspect)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryState {
    Included,
    Excluded,
}

#[derive(Debug, Clone)]
struct Entry {
    state: EntryState,
    id: Option<u32>,
    comments: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct UsageStore {
    path: PathBuf,
    entries: BTreeMap<UsageKey, Entry>,
    trailing_comments: Vec<String>,
}

impl UsageStore {
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
            trailing_comments: Vec::new(),
        }
    }

    /// Loads the store behind `path`; a missing file is an empty store.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, UsageError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "usage file missing, starting empty");
            return Ok(Self::empty(path));
        }
        let text = fs::read_to_string(path).map_err(|source| UsageError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    pub fn parse(text: &str, path: impl Into<PathBuf>) -> Result<Self, UsageError> {
        let mut store = Self::empty(path);
        let mut comments = Vec::new();
        let mut needs_id = Vec::new();

        for (index, raw_line) in text.lines().enumerate() {
            let line_number = index + 1;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                comments.push(line.to_string());
                continue;
            }

            let (state, key, id) = parse_line(line)
                .map_err(|reason| store.corrupt(line_number, raw_line, reason))?;

            if let Some(existing) = store.entries.get(&key) {
                let reason = if existing.state == state {
                    "duplicate entry"
                } else {
                    "entry is both included and excluded"
                };
                return Err(store.corrupt(line_number, raw_line, reason));
            }
            if let Some(id) = id {
                if store.id_in_use(&key, id) {
                    return Err(store.corrupt(
                        line_number,
                        raw_line,
                        format!("id {} is already used by {}", id, key.owner()),
                    ));
                }
            }
            if state == EntryState::Included && key.is_aspect() && id.is_none() {
                needs_id.push((line_number, raw_line, key.clone()));
            }

            store.entries.insert(
                key,
                Entry {
                    state,
                    id,
                    comments: std::mem::take(&mut comments),
                },
            );
        }
        store.trailing_comments = comments;

        for (line_number, raw_line, key) in needs_id {
            let id = store.next_id(&key).ok_or_else(|| {
                store.corrupt(line_number, raw_line, "no id left for this definition")
            })?;
            if let Some(entry) = store.entries.get_mut(&key) {
                entry.id = Some(id);
            }
        }

        debug!(
            path = %store.path.display(),
            entries = store.entries.len(),
            "loaded usage file"
        );
        Ok(store)
    }

    fn corrupt(&self, line: usize, text: &str, reason: impl Into<String>) -> UsageError {
        UsageError::Corrupt {
            path: self.path.clone(),
            line,
            text: text.to_string(),
            reason: reason.into(),
        }
    }

    fn siblings<'a>(&'a self, key: &'a UsageKey) -> impl Iterator<Item = &'a Entry> + 'a {
        self.entries
            .iter()
            .filter(move |(other, _)| {
                other.keyword == key.keyword && other.definition == key.definition
            })
            .map(|(_, entry)| entry)
    }

    fn id_in_use(&self, key: &UsageKey, id: u32) -> bool {
        self.siblings(key).any(|entry| entry.id == Some(id))
    }

    /// One past the highest id any aspect of the same definition ever held;
    /// `None` once the id space is used up.
    fn next_id(&self, key: &UsageKey) -> Option<u32> {
        match self.siblings(key).filter_map(|entry| entry.id).max() {
            Some(max) => max.checked_add(1),
            None => Some(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &UsageKey> {
        self.entries.keys()
    }

    pub fn included(&self, key: &UsageKey) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| entry.state == EntryState::Included)
    }

    /// Aspects of an excluded definition count as excluded too.
    pub fn excluded(&self, key: &UsageKey) -> bool {
        let own = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.state == EntryState::Excluded);
        own || (key.is_aspect() && self.excluded(&key.owner()))
    }

    pub fn id(&self, key: &UsageKey) -> Result<u32, UsageError> {
        match self.entries.get(key) {
            Some(Entry {
                state: EntryState::Included,
                id: Some(id),
                ..
            }) => Ok(*id),
            _ => Err(UsageError::MissingId {
                key: key.to_string(),
            }),
        }
    }

    /// Records `key` as in use. Returns whether the entry is new.
    pub fn include(&mut self, key: UsageKey) -> Result<bool, UsageError> {
        if self.included(&key) {
            return Ok(false);
        }
        if self.excluded(&key) {
            return Err(UsageError::Conflict {
                key: key.to_string(),
                state: "excluded",
            });
        }
        let id = if key.is_aspect() {
            let id = self.next_id(&key).ok_or_else(|| UsageError::IdsExhausted {
                key: key.to_string(),
            })?;
            Some(id)
        } else {
            None
        };
        debug!(entry = %key, id, "including usage entry");
        self.entries.insert(
            key,
            Entry {
                state: EntryState::Included,
                id,
                comments: Vec::new(),
            },
        );
        Ok(true)
    }

    /// Records `key` as retired. Returns whether the entry is new.
    pub fn exclude(&mut self, key: UsageKey) -> Result<bool, UsageError> {
        match self.entries.get(&key).map(|entry| entry.state) {
            Some(EntryState::Excluded) => Ok(false),
            Some(EntryState::Included) => Err(UsageError::Conflict {
                key: key.to_string(),
                state: "included",
            }),
            None => {
                debug!(entry = %key, "excluding usage entry");
                self.entries.insert(
                    key,
                    Entry {
                        state: EntryState::Excluded,
                        id: None,
                        comments: Vec::new(),
                    },
                );
                Ok(true)
            }
        }
    }

    /// Included entries first, then excluded ones, each sorted by key.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for state in [EntryState::Included, EntryState::Excluded] {
            for (key, entry) in self.entries.iter().filter(|(_, entry)| entry.state == state) {
                for comment in &entry.comments {
                    out.push_str(comment);
                    out.push('\n');
                }
                if state == EntryState::Excluded {
                    out.push('-');
                }
                out.push_str(&key.to_string());
                if let Some(id) = entry.id {
                    out.push_str(&format!(" {}", id));
                }
                out.push('\n');
            }
        }
        for comment in &self.trailing_comments {
            out.push_str(comment);
            out.push('\n');
        }
        out
    }

    pub fn commit(&self) -> Result<(), UsageError> {
        let write_error = |source| UsageError::Write {
            path: self.path.clone(),
            source,
        };
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(write_error)?;
        fs::write(&self.path, self.render()).map_err(write_error)?;
        info!(
            path = %self.path.display(),
            entries = self.entries.len(),
            "committed usage file"
        );
        Ok(())
    }
}

fn parse_line(line: &str) -> Result<(EntryState, UsageKey, Option<u32>), String> {
    let (state, rest) = match line.strip_prefix('-') {
        Some(rest) => (EntryState::Excluded, rest),
        None => (EntryState::Included, line),
    };

    let tokens = rest.split_whitespace().collect::<Vec<_>>();
    let (keyword, name, id) = match tokens.as_slice() {
        [keyword, name] => (*keyword, *name, None),
        [keyword, name, id] => (*keyword, *name, Some(*id)),
        _ => return Err("expected `<keyword> <definition>[.<aspect>][ <id>]`".to_string()),
    };

    let keyword = UsageKeyword::from_name(keyword)
        .ok_or_else(|| format!("unknown keyword \"{}\"", keyword))?;

    let key = match name.split_once('.') {
        Some((definition, aspect)) => UsageKey::aspect(keyword, definition, aspect),
        None => UsageKey::definition(keyword, name),
    };
    let names_valid = is_identifier(&key.definition)
        && key.aspect.as_deref().map_or(true, is_identifier);
    if !names_valid {
        return Err(format!("invalid entry name \"{}\"", name));
    }

    let id = match id {
        None => None,
        Some(_) if !key.is_aspect() => {
            return Err("only aspect entries carry ids".to_string());
        }
        Some(text) => match text.parse::<u32>() {
            Ok(id) if id > 0 => Some(id),
            _ => return Err(format!("invalid id \"{}\"", text)),
        },
    };

    Ok((state, key, id))
}
