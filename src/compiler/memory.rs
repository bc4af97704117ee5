/*!
  The memory entry table records where the value of each identifier declared in a scope lives
  in the linear memory of the VM.

  Allocation is a flat bump allocator: every definition takes the next `ENTRY_SIZE` bytes and
  slots are never reused. One table is created per compiled scope and discarded once the
  assembly for that scope has been emitted.

  Redefining an identifier allocates a new slot and shadows the old mapping. The old slot
  stays allocated, and code already emitted against it is unaffected.
*/

use std::collections::HashMap;

use string_cache::DefaultAtom;
use thiserror::Error;

use crate::bytecode::WORD_SIZE;

/// Every value occupies one machine word of storage, regardless of its logical type.
pub const ENTRY_SIZE: usize = WORD_SIZE;

#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("`{id}` is not defined")]
pub struct EntryError {
  pub id: String,
}

/// The location of one allocated storage slot.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct MemEntry {
  /// Byte offset from the start of linear memory.
  pub offset : usize,
  pub size   : usize,
}

#[derive(Clone, Debug, Default)]
pub struct MemEntryTable {
  entries : HashMap<DefaultAtom, MemEntry>,
  cursor  : usize, // The next free offset
}

impl MemEntryTable {

  pub fn new() -> MemEntryTable {
    MemEntryTable::default()
  }

  /// Allocates a new entry for `id` at the cursor. If `id` was already defined, the new entry
  /// replaces the old one for lookups.
  pub fn define(&mut self, id: &str) -> MemEntry {
    let entry = MemEntry {
      offset : self.cursor,
      size   : ENTRY_SIZE,
    };

    self.cursor += ENTRY_SIZE;
    self.entries.insert(DefaultAtom::from(id), entry);

    entry
  }

  pub fn get_entry(&self, id: &str) -> Result<MemEntry, EntryError> {
    self.entries
        .get(&DefaultAtom::from(id))
        .copied()
        .ok_or_else(|| EntryError { id: id.to_string() })
  }

  pub fn is_defined(&self, id: &str) -> bool {
    self.entries.contains_key(&DefaultAtom::from(id))
  }

  pub fn cursor(&self) -> usize {
    self.cursor
  }

  /// The number of identifiers that currently resolve to an entry.
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// The visible entries, ordered by offset.
  pub fn entries(&self) -> Vec<(DefaultAtom, MemEntry)> {
    let mut entries: Vec<(DefaultAtom, MemEntry)> =
      self.entries
          .iter()
          .map(|(id, entry)| (id.clone(), *entry))
          .collect();
    entries.sort_by_key(|(_, entry)| entry.offset);
    entries
  }
}
