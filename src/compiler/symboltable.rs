use bimap::BiMap;
use string_cache::DefaultAtom;

/// The value `LoadFunc` yields for a call to the corresponding function.
pub type Selector = u32;

/**
  A symbol table for a contract is a mapping between function names and the selectors the
  dispatcher compares against the requested function. Selectors are handed out in declaration
  order, so a function's selector is also its index in the ABI. A symbol table is really just a
  convenience wrapper around a BiMap.
*/
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
  table: BiMap<DefaultAtom, Selector>
}

impl SymbolTable {

  pub fn new() -> SymbolTable {
    SymbolTable {
      table: BiMap::new()
    }
  }

  pub fn get_name(&self, selector: Selector) -> Option<&DefaultAtom> {
    self.table.get_by_right(&selector)
  }

  pub fn get_selector(&self, name: &str) -> Option<Selector> {
    self.table.get_by_left(&DefaultAtom::from(name)).copied()
  }

  /// Assigns the next selector to `name`, or returns `None` if `name` already has one.
  pub fn insert(&mut self, name: DefaultAtom) -> Option<Selector> {
    let selector = self.table.len() as Selector;
    self.table.insert_no_overwrite(name, selector).ok().map(|_| selector)
  }

  pub fn len(&self) -> usize {
    self.table.len()
  }

  pub fn is_empty(&self) -> bool {
    self.table.is_empty()
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn selectors_follow_declaration_order() {
    let mut symbols = SymbolTable::new();
    assert_eq!(symbols.insert(DefaultAtom::from("deposit")), Some(0));
    assert_eq!(symbols.insert(DefaultAtom::from("withdraw")), Some(1));

    assert_eq!(symbols.get_selector("withdraw"), Some(1));
    assert_eq!(symbols.get_name(0).map(|name| name.to_string()), Some("deposit".to_string()));
    assert_eq!(symbols.get_selector("balance"), None);
  }

  #[test]
  fn refuses_duplicate_names() {
    let mut symbols = SymbolTable::new();
    symbols.insert(DefaultAtom::from("deposit"));
    assert_eq!(symbols.insert(DefaultAtom::from("deposit")), None);
    assert_eq!(symbols.len(), 1);
  }
}
