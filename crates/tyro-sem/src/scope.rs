//! Stacked symbol environments mapping names to their static type.

use std::collections::HashMap;

use tyro_par::DataType;

/// A stack of name-to-type maps. Lookups search innermost-to-outermost;
/// declarations only ever land in the top environment.
#[derive(Debug, Default)]
pub struct SymbolTable {
    environments: Vec<HashMap<String, DataType>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            environments: Vec::new(),
        }
    }

    pub fn push_environment(&mut self) {
        self.environments.push(HashMap::new());
    }

    pub fn pop_environment(&mut self) {
        self.environments.pop();
    }

    pub fn empty(&self) -> bool {
        self.environments.is_empty()
    }

    pub fn add(&mut self, name: impl Into<String>, info: DataType) {
        if let Some(env) = self.environments.last_mut() {
            env.insert(name.into(), info);
        }
    }

    pub fn name_exists(&self, name: &str) -> bool {
        self.environments.iter().rev().any(|e| e.contains_key(name))
    }

    pub fn name_exists_in_curr_env(&self, name: &str) -> bool {
        self.environments
            .last()
            .map(|e| e.contains_key(name))
            .unwrap_or(false)
    }

    pub fn get(&self, name: &str) -> Option<DataType> {
        self.environments
            .iter()
            .rev()
            .find_map(|e| e.get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(name: &str) -> DataType {
        DataType {
            is_array: false,
            type_name: name.to_string(),
        }
    }

    #[test]
    fn inner_scope_shadows_outer() {
        let mut t = SymbolTable::new();
        t.push_environment();
        t.add("x", ty("int"));
        t.push_environment();
        t.add("x", ty("string"));
        assert_eq!(t.get("x"), Some(ty("string")));
        t.pop_environment();
        assert_eq!(t.get("x"), Some(ty("int")));
    }

    #[test]
    fn name_exists_in_curr_env_only_checks_top() {
        let mut t = SymbolTable::new();
        t.push_environment();
        t.add("x", ty("int"));
        t.push_environment();
        assert!(!t.name_exists_in_curr_env("x"));
        assert!(t.name_exists("x"));
    }

    #[test]
    fn pop_on_empty_is_a_no_op() {
        let mut t = SymbolTable::new();
        t.pop_environment();
        assert!(t.empty());
    }
}
