//! The object database: loaded packages indexed by id and technical name.

use std::collections::HashMap;
use std::rc::Rc;

use crate::cloneable::{CloneableObject, Shared};
use crate::config::DatabaseConfig;
use crate::id::{ArticyId, CloneId, parse_compound};
use crate::object::{ArticyObject, Duplicate};
use crate::package::ArticyPackage;
use crate::shadow::{PopCallback, PopHandle, ShadowState, ShadowStateManager};
use crate::types::TypeSystem;

/// All clones and shadow copies of one loaded object.
pub type ObjectEntry = CloneableObject<ArticyObject>;

/// A handle to one object instance.
pub type ObjectRef = Shared<ArticyObject>;

/// The authoritative collection of loaded narrative objects.
///
/// Lookups return `None`/empty rather than failing. Package operations log
/// and leave state unchanged when their preconditions do not hold.
#[derive(Debug)]
pub struct ArticyDatabase {
    config: DatabaseConfig,
    imported: Vec<ArticyPackage>,
    loaded: Vec<String>,
    types: TypeSystem,
    shadow: ShadowState,

    // Indexes
    by_id: HashMap<ArticyId, Rc<ObjectEntry>>,
    by_name: HashMap<String, Vec<Rc<ObjectEntry>>>,
}

impl Default for ArticyDatabase {
    fn default() -> Self {
        Self::new(Vec::new(), DatabaseConfig::default())
    }
}

impl ArticyDatabase {
    /// Create a database over the imported packages, loading default
    /// packages when the config asks for it.
    pub fn new(packages: Vec<ArticyPackage>, config: DatabaseConfig) -> Self {
        let mut db = Self {
            config,
            imported: packages,
            loaded: Vec::new(),
            types: TypeSystem::new(),
            shadow: ShadowState::new(),
            by_id: HashMap::new(),
            by_name: HashMap::new(),
        };
        if db.config.load_default_packages {
            db.load_default_packages();
        }
        db
    }

    /// Attach object type definitions.
    pub fn with_type_system(mut self, types: TypeSystem) -> Self {
        self.types = types;
        self
    }

    /// The configuration this database was created with.
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Object type definitions.
    pub fn type_system(&self) -> &TypeSystem {
        &self.types
    }

    /// Replace the object type definitions.
    pub fn set_type_system(&mut self, types: TypeSystem) {
        self.types = types;
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// The instance of `id`/`clone_id` at the current shadow level.
    pub fn get_object(&self, id: ArticyId, clone_id: CloneId) -> Option<ObjectRef> {
        self.by_id.get(&id)?.get(self, clone_id, false)
    }

    /// The level-0 instance of `id`/`clone_id`, whatever the shadow level.
    pub fn get_object_unshadowed(&self, id: ArticyId, clone_id: CloneId) -> Option<ObjectRef> {
        self.by_id.get(&id)?.get(self, clone_id, true)
    }

    /// Look up by technical name. When several objects share the name, the
    /// first one indexed wins.
    pub fn get_object_by_name(&self, name: &str, clone_id: CloneId) -> Option<ObjectRef> {
        self.by_name.get(name)?.first()?.get(self, clone_id, false)
    }

    /// Resolve a `"<id>_<clone>"` handle.
    pub fn get_object_from_string_representation(&self, handle: &str) -> Option<ObjectRef> {
        let (id, clone_id) = parse_compound(handle)?;
        self.get_object(id, clone_id)
    }

    /// Every object indexed under `name` that has `clone_id`.
    pub fn get_objects(&self, name: &str, clone_id: CloneId) -> Vec<ObjectRef> {
        self.by_name
            .get(name)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|e| e.get(self, clone_id, false))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Level-0 instances of `clone_id` whose type is or inherits from
    /// `type_name`, ordered by id.
    pub fn objects_of_type(&self, type_name: &str, clone_id: CloneId) -> Vec<ObjectRef> {
        self.sorted_entries()
            .into_iter()
            .filter_map(|(_, e)| e.get(self, clone_id, true))
            .filter(|o| self.types.is_a(&o.borrow().type_name, type_name))
            .collect()
    }

    /// Level-0 canonical clones of every loaded object, ordered by id.
    pub fn all_objects(&self) -> Vec<ObjectRef> {
        self.sorted_entries()
            .into_iter()
            .filter_map(|(_, e)| e.get(self, 0, true))
            .collect()
    }

    /// Number of loaded objects.
    pub fn object_count(&self) -> usize {
        self.by_id.len()
    }

    /// Clone ids that exist for `id`.
    pub fn clone_ids(&self, id: ArticyId) -> Vec<CloneId> {
        self.by_id
            .get(&id)
            .map(|e| e.clone_ids())
            .unwrap_or_default()
    }

    fn sorted_entries(&self) -> Vec<(ArticyId, &Rc<ObjectEntry>)> {
        let mut entries: Vec<_> = self.by_id.iter().map(|(id, e)| (*id, e)).collect();
        entries.sort_by_key(|(id, _)| *id);
        entries
    }

    // -----------------------------------------------------------------------
    // Cloning
    // -----------------------------------------------------------------------

    /// Create a new clone of `id`. Fails when the clone already exists.
    pub fn clone_from(&self, id: ArticyId, new_clone_id: CloneId) -> Option<ObjectRef> {
        self.clone_entry(self.by_id.get(&id), new_clone_id, true)
    }

    /// Create a new clone of the object named `name`.
    pub fn clone_from_by_name(&self, name: &str, new_clone_id: CloneId) -> Option<ObjectRef> {
        self.clone_entry(self.first_named(name), new_clone_id, true)
    }

    /// Return clone `clone_id` of `id`, creating it if needed.
    pub fn get_or_clone(&self, id: ArticyId, clone_id: CloneId) -> Option<ObjectRef> {
        self.clone_entry(self.by_id.get(&id), clone_id, false)
    }

    /// Return clone `clone_id` of the object named `name`, creating it if needed.
    pub fn get_or_clone_by_name(&self, name: &str, clone_id: CloneId) -> Option<ObjectRef> {
        self.clone_entry(self.first_named(name), clone_id, false)
    }

    fn first_named(&self, name: &str) -> Option<&Rc<ObjectEntry>> {
        self.by_name.get(name).and_then(|entries| entries.first())
    }

    fn clone_entry(
        &self,
        entry: Option<&Rc<ObjectEntry>>,
        clone_id: CloneId,
        fail_if_exists: bool,
    ) -> Option<ObjectRef> {
        match entry {
            Some(entry) => entry.clone_object(self, clone_id, fail_if_exists),
            None => {
                tracing::warn!(clone_id, "cannot clone an object that is not loaded");
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // Shadow states
    // -----------------------------------------------------------------------

    /// Enter a speculative shadow level.
    pub fn push_state(&self) {
        self.shadow.push_state();
    }

    /// Leave the current shadow level, discarding its shadow copies.
    pub fn pop_state(&self) {
        self.shadow.pop_state();
    }

    // -----------------------------------------------------------------------
    // Package lifecycle
    // -----------------------------------------------------------------------

    /// Load every object of an imported package.
    ///
    /// Objects whose id is already loaded are logged and skipped. Returns
    /// `false` when the package is unknown or already loaded.
    #[tracing::instrument(skip(self))]
    pub fn load_package(&mut self, name: &str) -> bool {
        if self.is_package_loaded(name) {
            tracing::warn!("package already loaded");
            return false;
        }
        let Some(package) = self.imported.iter().find(|p| p.name == name) else {
            tracing::error!("package is not imported");
            return false;
        };

        let mut added = 0usize;
        for asset in &package.objects {
            if self.by_id.contains_key(&asset.id) {
                tracing::error!(id = %asset.id, name = %asset.technical_name, "object already loaded, skipping");
                continue;
            }
            let entry = Rc::new(CloneableObject::init(asset.duplicate()));
            self.by_id.insert(asset.id, Rc::clone(&entry));
            if !asset.technical_name.is_empty() {
                self.by_name
                    .entry(asset.technical_name.clone())
                    .or_default()
                    .push(entry);
            }
            added += 1;
        }

        self.loaded.push(name.to_string());
        tracing::info!(objects = added, "loaded package");
        true
    }

    /// Unload the objects a package contributed.
    ///
    /// A quick unload removes every object unconditionally. Otherwise an
    /// object is kept when another loaded package also contains its id or
    /// its technical name. Returns `false` when the package is not loaded.
    #[tracing::instrument(skip(self))]
    pub fn unload_package(&mut self, name: &str, quick: bool) -> bool {
        if !self.is_package_loaded(name) {
            tracing::warn!("package is not loaded");
            return false;
        }
        let Some(package) = self.imported.iter().find(|p| p.name == name) else {
            tracing::error!("package is not imported");
            return false;
        };

        let mut removed = 0usize;
        let mut retained = 0usize;
        for asset in &package.objects {
            if !quick {
                let shared = self
                    .imported
                    .iter()
                    .filter(|p| p.name != name && self.loaded.contains(&p.name))
                    .any(|p| {
                        p.contains_id(asset.id)
                            || (!asset.technical_name.is_empty()
                                && p.contains_name(&asset.technical_name))
                    });
                if shared {
                    retained += 1;
                    continue;
                }
            }

            if let Some(entry) = self.by_id.remove(&asset.id) {
                remove_from_name_index(&mut self.by_name, &entry);
                removed += 1;
            }
        }

        self.loaded.retain(|n| n != name);
        tracing::info!(removed, retained, remaining = self.by_id.len(), "unloaded package");
        true
    }

    /// Load every imported package, or only the default ones.
    pub fn load_all_packages(&mut self, default_only: bool) {
        let names: Vec<String> = self
            .imported
            .iter()
            .filter(|p| !default_only || p.is_default)
            .filter(|p| !self.loaded.contains(&p.name))
            .map(|p| p.name.clone())
            .collect();
        for name in names {
            self.load_package(&name);
        }
    }

    /// Load every package flagged as default.
    pub fn load_default_packages(&mut self) {
        self.load_all_packages(true);
    }

    /// Drop every loaded object and package.
    pub fn unload_all_packages(&mut self) {
        self.by_id.clear();
        self.by_name.clear();
        self.loaded.clear();
        tracing::info!("unloaded all packages");
    }

    /// Replace the imported package set. Everything loaded is dropped first.
    pub fn set_imported_packages(&mut self, packages: Vec<ArticyPackage>) {
        self.unload_all_packages();
        self.imported = packages;
    }

    /// Names of every imported package, in import order.
    pub fn imported_package_names(&self) -> Vec<&str> {
        self.imported.iter().map(|p| p.name.as_str()).collect()
    }

    /// Names of loaded packages, in load order.
    pub fn loaded_package_names(&self) -> Vec<&str> {
        self.loaded.iter().map(String::as_str).collect()
    }

    /// An imported package by name.
    pub fn package(&self, name: &str) -> Option<&ArticyPackage> {
        self.imported.iter().find(|p| p.name == name)
    }

    /// Whether the named package is loaded.
    pub fn is_package_loaded(&self, name: &str) -> bool {
        self.loaded.iter().any(|n| n == name)
    }

    /// Whether the named package is flagged default. Unknown packages are not.
    pub fn is_package_default_package(&self, name: &str) -> bool {
        self.package(name).is_some_and(|p| p.is_default)
    }

    /// Change a package's default flag. Returns `false` for unknown packages.
    pub fn change_package_default(&mut self, name: &str, is_default: bool) -> bool {
        match self.imported.iter_mut().find(|p| p.name == name) {
            Some(package) => {
                package.is_default = is_default;
                true
            }
            None => {
                tracing::warn!(package = name, "cannot change default flag of unknown package");
                false
            }
        }
    }
}

fn remove_from_name_index(by_name: &mut HashMap<String, Vec<Rc<ObjectEntry>>>, entry: &Rc<ObjectEntry>) {
    by_name.retain(|_, entries| {
        entries.retain(|e| !Rc::ptr_eq(e, entry));
        !entries.is_empty()
    });
}

impl ShadowStateManager for ArticyDatabase {
    fn shadow_level(&self) -> u32 {
        self.shadow.shadow_level()
    }

    fn register_on_pop_state(&self, callback: PopCallback) -> PopHandle {
        self.shadow.register_on_pop_state(callback)
    }

    fn unregister_on_pop_state(&self, handle: PopHandle) -> bool {
        self.shadow.unregister_on_pop_state(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::NEXT_FREE_CLONE;
    use crate::property::PropertyValue;
    use crate::types::ArticyType;
    use crate::value::ExpressoValue;

    fn door(id: u64, name: &str) -> ArticyObject {
        ArticyObject::new(ArticyId::from(id), "Door", name)
            .with_property("IsOpen", PropertyValue::Bool(false))
            .with_property("Uses", PropertyValue::Int32(0))
    }

    fn test_db() -> ArticyDatabase {
        let pkg1 = ArticyPackage::new("Pkg1")
            .with_default(true)
            .with_object(door(0xAAAA, "Door"))
            .with_object(door(0xCCCC, "Gate"));
        let pkg2 = ArticyPackage::new("Pkg2").with_object(door(0xBBBB, "Door2"));
        ArticyDatabase::new(vec![pkg1, pkg2], DatabaseConfig::default())
    }

    fn is_open(obj: &ObjectRef) -> ExpressoValue {
        obj.borrow().get_value("IsOpen")
    }

    #[test]
    fn default_packages_load_on_creation() {
        let db = test_db();
        assert_eq!(db.loaded_package_names(), vec!["Pkg1"]);
        assert_eq!(db.object_count(), 2);
        assert!(db.get_object(ArticyId::from(0xBBBB), 0).is_none());
    }

    #[test]
    fn auto_load_can_be_disabled() {
        let db = ArticyDatabase::new(
            vec![ArticyPackage::new("Pkg1").with_default(true)],
            DatabaseConfig::default().with_load_default_packages(false),
        );
        assert!(db.loaded_package_names().is_empty());
    }

    #[test]
    fn loaded_objects_are_reachable_by_id() {
        let db = test_db();
        for id in [0xAAAA, 0xCCCC] {
            let obj = db.get_object(ArticyId::from(id), 0).unwrap();
            assert_eq!(obj.borrow().id.get(), id);
        }
    }

    #[test]
    fn lookup_by_name() {
        let db = test_db();
        let door = db.get_object_by_name("Door", 0).unwrap();
        assert_eq!(door.borrow().id.get(), 0xAAAA);
        assert!(db.get_object_by_name("Nope", 0).is_none());
        assert!(db.get_object_by_name("Door", 1).is_none());
    }

    #[test]
    fn clone_isolation() {
        let db = test_db();
        let id = ArticyId::from(0xAAAA);
        let clone = db.clone_from(id, 1).unwrap();
        clone.borrow_mut().set_value("IsOpen", &ExpressoValue::Bool(true));

        assert_eq!(is_open(&db.get_object(id, 0).unwrap()), ExpressoValue::Bool(false));
        assert_eq!(is_open(&db.get_object(id, 1).unwrap()), ExpressoValue::Bool(true));
    }

    #[test]
    fn shadow_mutation_is_discarded() {
        let db = test_db();
        let id = ArticyId::from(0xAAAA);
        let before = db.get_object(id, 0).unwrap();

        db.push_state();
        let shadow = db.get_object(id, 0).unwrap();
        shadow.borrow_mut().set_value("IsOpen", &ExpressoValue::Bool(true));
        assert_eq!(is_open(&db.get_object(id, 0).unwrap()), ExpressoValue::Bool(true));
        db.pop_state();

        let after = db.get_object(id, 0).unwrap();
        assert!(Rc::ptr_eq(&before, &after));
        assert_eq!(is_open(&after), ExpressoValue::Bool(false));
    }

    #[test]
    fn unshadowed_ignores_level() {
        let db = test_db();
        let id = ArticyId::from(0xAAAA);
        let base = db.get_object(id, 0).unwrap();
        db.push_state();
        db.push_state();
        assert!(!Rc::ptr_eq(&base, &db.get_object(id, 0).unwrap()));
        assert!(Rc::ptr_eq(&base, &db.get_object_unshadowed(id, 0).unwrap()));
        db.pop_state();
        db.pop_state();
    }

    #[test]
    fn repeated_get_returns_same_instance() {
        let db = test_db();
        let id = ArticyId::from(0xAAAA);
        let a = db.get_object(id, 0).unwrap();
        let b = db.get_object(id, 0).unwrap();
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn string_representation() {
        let db = test_db();
        let id = ArticyId::from(0xAAAA);
        db.clone_from(id, 1).unwrap();
        let via_string = db.get_object_from_string_representation("43690_1").unwrap();
        assert!(Rc::ptr_eq(&via_string, &db.get_object(id, 1).unwrap()));
        assert!(db.get_object_from_string_representation("Door").is_none());
    }

    #[test]
    fn next_free_clone_id() {
        let db = test_db();
        let id = ArticyId::from(0xAAAA);
        db.clone_from(id, 1).unwrap();
        db.clone_from(id, 2).unwrap();
        let next = db.clone_from(id, NEXT_FREE_CLONE).unwrap();
        assert_eq!(next.borrow().clone_id, 3);
        assert_eq!(db.clone_ids(id), vec![0, 1, 2, 3]);
    }

    #[test]
    fn clone_from_vs_get_or_clone() {
        let db = test_db();
        let first = db.clone_from_by_name("Door", 1).unwrap();
        assert!(db.clone_from_by_name("Door", 1).is_none());
        let again = db.get_or_clone_by_name("Door", 1).unwrap();
        assert!(Rc::ptr_eq(&first, &again));
        let fresh = db.get_or_clone(ArticyId::from(0xAAAA), 4).unwrap();
        assert_eq!(fresh.borrow().clone_id, 4);
        assert!(db.clone_from(ArticyId::from(0x9999), 1).is_none());
    }

    #[test]
    fn load_rejects_unknown_and_repeated() {
        let mut db = test_db();
        assert!(!db.load_package("Nope"));
        assert!(!db.load_package("Pkg1"));
        assert!(db.load_package("Pkg2"));
        assert_eq!(db.object_count(), 3);
    }

    #[test]
    fn duplicate_ids_are_skipped() {
        let pkg1 = ArticyPackage::new("Pkg1").with_object(door(1, "A"));
        let pkg2 = ArticyPackage::new("Pkg2")
            .with_object(door(1, "A copy"))
            .with_object(door(2, "B"));
        let mut db = ArticyDatabase::new(vec![pkg1, pkg2], DatabaseConfig::default());
        assert!(db.load_package("Pkg1"));
        assert!(db.load_package("Pkg2"));
        assert_eq!(db.object_count(), 2);
        assert!(db.get_object_by_name("A copy", 0).is_none());
        assert!(db.get_object_by_name("A", 0).is_some());
    }

    #[test]
    fn unload_requires_loaded() {
        let mut db = test_db();
        assert!(!db.unload_package("Pkg2", false));
        assert!(!db.unload_package("Nope", true));
        assert!(db.unload_package("Pkg1", false));
        assert_eq!(db.object_count(), 0);
        assert!(db.get_object_by_name("Door", 0).is_none());
    }

    #[test]
    fn slow_unload_keeps_names_shared_with_loaded_packages() {
        let pkg1 = ArticyPackage::new("Pkg1").with_object(door(0x10, "Door"));
        let pkg2 = ArticyPackage::new("Pkg2").with_object(door(0x20, "Door"));
        let mut db = ArticyDatabase::new(vec![pkg1, pkg2], DatabaseConfig::default());
        db.load_package("Pkg1");
        db.load_package("Pkg2");

        assert!(db.unload_package("Pkg1", false));
        let door = db.get_object_by_name("Door", 0).unwrap();
        assert_eq!(door.borrow().id.get(), 0x10);
        assert!(db.get_object(ArticyId::from(0x10), 0).is_some());
        assert_eq!(db.get_objects("Door", 0).len(), 2);
    }

    #[test]
    fn slow_unload_keeps_ids_shared_with_loaded_packages() {
        let pkg1 = ArticyPackage::new("Pkg1").with_object(door(0x10, "Old name"));
        let pkg2 = ArticyPackage::new("Pkg2").with_object(door(0x10, "New name"));
        let mut db = ArticyDatabase::new(vec![pkg1, pkg2], DatabaseConfig::default());
        db.load_package("Pkg1");
        db.load_package("Pkg2");

        assert!(db.unload_package("Pkg1", false));
        assert!(db.get_object(ArticyId::from(0x10), 0).is_some());
    }

    #[test]
    fn quick_unload_removes_only_own_name_entries() {
        let pkg1 = ArticyPackage::new("Pkg1").with_object(door(0x10, "Door"));
        let pkg2 = ArticyPackage::new("Pkg2").with_object(door(0x20, "Door"));
        let mut db = ArticyDatabase::new(vec![pkg1, pkg2], DatabaseConfig::default());
        db.load_package("Pkg1");
        db.load_package("Pkg2");

        assert!(db.unload_package("Pkg1", true));
        assert!(db.get_object(ArticyId::from(0x10), 0).is_none());
        let door = db.get_object_by_name("Door", 0).unwrap();
        assert_eq!(door.borrow().id.get(), 0x20);
        assert_eq!(db.loaded_package_names(), vec!["Pkg2"]);
    }

    #[test]
    fn unload_then_reload_restores_state() {
        let mut db = test_db();
        let snapshot: Vec<ArticyObject> = db.all_objects().iter().map(|o| o.borrow().clone()).collect();

        db.get_object(ArticyId::from(0xAAAA), 0)
            .unwrap()
            .borrow_mut()
            .set_value("Uses", &ExpressoValue::Int(3));
        assert!(db.unload_package("Pkg1", false));
        assert!(db.load_package("Pkg1"));

        let restored: Vec<ArticyObject> = db.all_objects().iter().map(|o| o.borrow().clone()).collect();
        assert_eq!(snapshot, restored);
    }

    #[test]
    fn unload_all_and_reimport() {
        let mut db = test_db();
        db.load_all_packages(false);
        assert_eq!(db.loaded_package_names(), vec!["Pkg1", "Pkg2"]);
        db.unload_all_packages();
        assert_eq!(db.object_count(), 0);
        assert!(db.loaded_package_names().is_empty());

        db.set_imported_packages(vec![ArticyPackage::new("Other")]);
        assert_eq!(db.imported_package_names(), vec!["Other"]);
    }

    #[test]
    fn default_flags() {
        let mut db = test_db();
        assert!(db.is_package_default_package("Pkg1"));
        assert!(!db.is_package_default_package("Pkg2"));
        assert!(!db.is_package_default_package("Nope"));
        assert!(db.change_package_default("Pkg2", true));
        assert!(!db.change_package_default("Nope", true));
        db.unload_all_packages();
        db.load_default_packages();
        assert_eq!(db.loaded_package_names(), vec!["Pkg1", "Pkg2"]);
    }

    #[test]
    fn objects_of_type_follow_inheritance() {
        let mut types = TypeSystem::new();
        types.add(ArticyType::new("Entity"));
        types.add(ArticyType::new("Door").with_parent("Entity"));
        let pkg = ArticyPackage::new("Pkg")
            .with_default(true)
            .with_object(door(2, "Door"))
            .with_object(ArticyObject::new(ArticyId::from(1), "Entity", "Hero"))
            .with_object(ArticyObject::new(ArticyId::from(3), "Location", "Town"));
        let db = ArticyDatabase::new(vec![pkg], DatabaseConfig::default()).with_type_system(types);

        let ids: Vec<u64> = db
            .objects_of_type("Entity", 0)
            .iter()
            .map(|o| o.borrow().id.get())
            .collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(db.objects_of_type("Door", 0).len(), 1);
        assert!(db.objects_of_type("Door", 1).is_empty());
        assert_eq!(db.all_objects().len(), 3);
    }

    #[test]
    fn shadow_level_is_shared() {
        let db = test_db();
        db.push_state();
        assert_eq!(db.shadow_level(), 1);
        db.pop_state();
        assert_eq!(db.shadow_level(), 0);
    }
}
