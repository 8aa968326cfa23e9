use std::collections::BTreeMap;
use std::fmt;

/// Zero-argument constructor stored in a [`Registry`].
pub type Factory<T> = Box<dyn Fn() -> T>;

/// Name-to-factory map. Registering an existing name replaces its factory;
/// there is no removal.
pub struct Registry<T> {
    factories: BTreeMap<String, Factory<T>>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `factory` under `name`. Returns `true` if it replaced one.
    pub fn register(&mut self, name: impl Into<String>, factory: impl Fn() -> T + 'static) -> bool {
        let name = name.into();
        let replaced = self.factories.insert(name.clone(), Box::new(factory)).is_some();
        tracing::trace!(%name, replaced, "factory registered");
        replaced
    }

    /// Factory registered under exactly `name`.
    pub fn lookup(&self, name: &str) -> Option<&dyn Fn() -> T> {
        self.factories.get(name).map(|f| f.as_ref())
    }

    /// Look up `name` and call its factory.
    pub fn create(&self, name: &str) -> Option<T> {
        self.lookup(name).map(|factory| factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl<T> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_registration_wins() {
        let mut registry: Registry<&'static str> = Registry::new();
        assert!(!registry.register("svg", || "first"));
        assert!(registry.register("svg", || "second"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.create("svg"), Some("second"));
        let factory = registry.lookup("svg").unwrap();
        assert_eq!(factory(), "second");
    }

    #[test]
    fn lookup_is_exact() {
        let mut registry: Registry<u32> = Registry::new();
        registry.register("default", || 1);
        assert!(registry.lookup("Default").is_none());
        assert!(registry.lookup("default ").is_none());
        assert!(registry.create("missing").is_none());
        assert!(registry.contains("default"));
    }

    #[test]
    fn factories_build_fresh_values() {
        let mut registry: Registry<Vec<u8>> = Registry::new();
        registry.register("buf", Vec::new);
        let mut a = registry.create("buf").unwrap();
        a.push(1);
        assert!(registry.create("buf").unwrap().is_empty());
    }

    #[test]
    fn names_are_sorted() {
        let mut registry: Registry<()> = Registry::new();
        registry.register("svg", || ());
        registry.register("debug", || ());
        registry.register("default", || ());
        assert_eq!(registry.names().collect::<Vec<_>>(), ["debug", "default", "svg"]);
        assert!(!registry.is_empty());
    }
}
