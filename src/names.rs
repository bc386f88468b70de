//! The name table: a bidirectional mapping between identifier strings and the
//! compact integer IDs used throughout the compiler and simulator.
//!
//! Every identifier read from a definition file is interned exactly once; all
//! later stages (scanner symbols, device registries, connections, monitors)
//! refer to names by ID only. The table also hands out the unique error codes
//! used by [`ErrorBus`], [`Devices`], [`Network`] and [`Monitors`]: error
//! codes and name IDs are drawn from the same monotonic counter, so an ID is
//! classified by membership in the per-category message maps rather than by
//! its numeric range.
//!
//! [`ErrorBus`]: crate::errors::ErrorBus
//! [`Devices`]: crate::device::Devices
//! [`Network`]: crate::network::Network
//! [`Monitors`]: crate::monitor::Monitors

use std::collections::HashMap;
use std::ops::Range;

/// Compact integer ID of an interned name.
pub type NameId = usize;

/// ID of a reserved diagnostic code. Error codes share the ID space with
/// names but never resolve back to a string.
pub type ErrorCode = usize;

/// Grow-only interner of identifier strings.
///
/// The ID of a name is the index of its slot; slots taken by reserved error
/// codes hold no string and [`NameTable::stringify`] answers `None` for them.
/// Interning never rejects a string on lexical grounds: deciding what counts
/// as a valid name is the scanner's and parser's job.
///
/// # Examples
///
/// ```
/// use logsim::names::NameTable;
///
/// let mut names = NameTable::new();
/// let a = names.intern("and1");
/// assert_eq!(names.intern("and1"), a);
/// assert_eq!(names.query("and1"), Some(a));
/// assert_eq!(names.stringify(a), Some("and1"));
/// assert_eq!(names.query("xor2"), None);
/// ```
pub struct NameTable {
    ids: HashMap<String, NameId>,
    entries: Vec<Option<String>>,
}

impl NameTable {
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            entries: Vec::new(),
        }
    }

    /// Returns the ID of `name`, inserting it if absent.
    pub fn intern(&mut self, name: &str) -> NameId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.entries.len();
        self.entries.push(Some(name.to_string()));
        self.ids.insert(name.to_string(), id);
        id
    }

    /// Interns every string in `names`, preserving order.
    pub fn intern_all(&mut self, names: &[&str]) -> Vec<NameId> {
        names.iter().map(|name| self.intern(name)).collect()
    }

    /// Returns the ID of `name` without inserting it.
    pub fn query(&self, name: &str) -> Option<NameId> {
        self.ids.get(name).copied()
    }

    /// Returns the string for `id`, or `None` for unknown IDs and reserved
    /// error codes.
    pub fn stringify(&self, id: NameId) -> Option<&str> {
        self.entries.get(id)?.as_deref()
    }

    /// Reserves `count` fresh, contiguous error codes.
    ///
    /// The reserved slots consume IDs from the shared counter, so a later
    /// [`NameTable::intern`] can never collide with an error code.
    pub fn reserve_error_codes(&mut self, count: usize) -> Range<ErrorCode> {
        let start = self.entries.len();
        self.entries.resize(start + count, None);
        start..start + count
    }

    /// Number of allocated IDs, names and error codes together.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for NameTable {
    fn default() -> Self {
        Self::new()
    }
}
