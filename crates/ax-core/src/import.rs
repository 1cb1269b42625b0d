//! Reading an unpacked export: manifest, packages, type and variable
//! definitions, and the script fragments they carry.
//!
//! The binary archive container is not handled here. Anything that can hand
//! out files by name implements [`Archive`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{AxError, AxResult};
use crate::id::ArticyId;
use crate::object::ArticyObject;
use crate::package::ArticyPackage;
use crate::property::{self, PropertyBag, PropertyKind, PropertyValue};
use crate::types::{ArticyType, PropertyInfo, TypeSystem};
use crate::value::ExpressoValue;

/// Name of the export's entry file.
pub const MANIFEST: &str = "manifest.json";

/// A source of export files addressed by name.
pub trait Archive {
    /// Read a whole file as text.
    fn read_file(&self, name: &str) -> AxResult<String>;

    /// Fetch the JSON file referenced by `root[field]`, which holds
    /// `{ "FileName": ..., "Hash": ... }`.
    ///
    /// Returns `Ok(None)` when the reference's hash equals `hash`, meaning
    /// the file is unchanged. Otherwise `hash` is updated and the parsed
    /// file is returned.
    fn fetch_json(&self, root: &Value, field: &str, hash: &mut String) -> AxResult<Option<Value>> {
        let info = root
            .get(field)
            .ok_or_else(|| AxError::Malformed(format!("missing file reference \"{field}\"")))?;
        let file_name = info
            .get("FileName")
            .and_then(Value::as_str)
            .ok_or_else(|| AxError::Malformed(format!("\"{field}\" has no FileName")))?;
        let new_hash = info.get("Hash").and_then(Value::as_str).unwrap_or_default();

        if !new_hash.is_empty() && new_hash == hash.as_str() {
            tracing::debug!(field, file_name, "file unchanged");
            return Ok(None);
        }
        *hash = new_hash.to_string();
        read_json(self, file_name).map(Some)
    }
}

/// Read and parse a JSON file from an archive.
pub fn read_json<A: Archive + ?Sized>(archive: &A, name: &str) -> AxResult<Value> {
    let text = archive.read_file(name)?;
    serde_json::from_str(&text).map_err(|source| AxError::Json {
        name: name.to_string(),
        source,
    })
}

/// An export unpacked into a directory.
#[derive(Debug, Clone)]
pub struct DirectoryArchive {
    root: PathBuf,
}

impl DirectoryArchive {
    /// Serve files from `root`.
    pub fn open(root: impl AsRef<Path>) -> AxResult<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.join(MANIFEST).is_file() {
            return Err(AxError::MissingFile(root.join(MANIFEST).display().to_string()));
        }
        Ok(Self { root })
    }

    /// The directory files are served from.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Archive for DirectoryArchive {
    fn read_file(&self, name: &str) -> AxResult<String> {
        let path = self.root.join(name);
        std::fs::read_to_string(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                AxError::MissingFile(name.to_string())
            } else {
                AxError::Io {
                    name: name.to_string(),
                    source,
                }
            }
        })
    }
}

/// An export held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    files: HashMap<String, String>,
}

impl MemoryArchive {
    /// Create an empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file.
    pub fn with_file(mut self, name: impl Into<String>, contents: impl Into<String>) -> Self {
        self.insert(name, contents);
        self
    }

    /// Add or replace a file in place.
    pub fn insert(&mut self, name: impl Into<String>, contents: impl Into<String>) {
        self.files.insert(name.into(), contents.into());
    }
}

impl Archive for MemoryArchive {
    fn read_file(&self, name: &str) -> AxResult<String> {
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| AxError::MissingFile(name.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Export data
// ---------------------------------------------------------------------------

/// Whether a script fragment is a condition or an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptKind {
    /// Evaluates to a boolean.
    Condition,
    /// Runs for its side effects.
    Instruction,
}

/// A script fragment found in an exported object.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptSource {
    /// Package the owning object belongs to.
    pub package: String,
    /// Object (or pin owner) the fragment was found on.
    pub owner: ArticyId,
    /// Condition or instruction.
    pub kind: ScriptKind,
    /// Source text.
    pub text: String,
}

/// Declared type of a global variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum VariableKind {
    /// Boolean variable.
    #[serde(alias = "Bool", alias = "bool", alias = "boolean")]
    Boolean,
    /// Integer variable.
    #[serde(alias = "Int", alias = "int", alias = "integer")]
    Integer,
    /// String variable.
    #[serde(alias = "string")]
    String,
}

/// One global variable definition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VariableDef {
    /// Variable name within its namespace.
    pub variable: String,
    /// Declared type.
    #[serde(rename = "Type")]
    pub kind: VariableKind,
    /// Initial value, as exported.
    #[serde(default)]
    pub value: Value,
    /// Designer description.
    #[serde(default)]
    pub description: String,
}

/// A namespace of global variables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NamespaceDef {
    /// Namespace name.
    pub namespace: String,
    /// Designer description.
    #[serde(default)]
    pub description: String,
    /// Variables in declaration order.
    #[serde(default)]
    pub variables: Vec<VariableDef>,
}

#[derive(Debug, Clone, Default)]
struct ExportHashes {
    object_definitions: String,
    global_variables: String,
    packages: HashMap<String, String>,
}

/// Everything the runtime needs from an export.
#[derive(Debug, Clone, Default)]
pub struct ProjectExport {
    /// Project name from the manifest, if present.
    pub project_name: String,
    /// Included packages, in manifest order.
    pub packages: Vec<ArticyPackage>,
    /// Object type definitions.
    pub types: TypeSystem,
    /// Global variable namespaces.
    pub global_variables: Vec<NamespaceDef>,
    /// Script fragments from every package.
    pub scripts: Vec<ScriptSource>,
    hashes: ExportHashes,
}

impl ProjectExport {
    /// Read a complete export.
    pub fn load<A: Archive + ?Sized>(archive: &A) -> AxResult<Self> {
        let mut export = Self::default();
        export.refresh(archive)?;
        Ok(export)
    }

    /// Re-read the manifest and reload only the files whose hash changed.
    /// Returns whether anything was reloaded.
    #[tracing::instrument(skip_all)]
    pub fn refresh<A: Archive + ?Sized>(&mut self, archive: &A) -> AxResult<bool> {
        let manifest = read_json(archive, MANIFEST)?;
        let mut changed = false;

        if let Some(name) = manifest.pointer("/Project/Name").and_then(Value::as_str) {
            self.project_name = name.to_string();
        }

        if manifest.get("ObjectDefinitions").is_some() {
            if let Some(json) =
                archive.fetch_json(&manifest, "ObjectDefinitions", &mut self.hashes.object_definitions)?
            {
                self.types = parse_object_definitions(&json)?;
                // Objects are parsed against the types; re-read every package.
                self.hashes.packages.clear();
                changed = true;
            }
        }

        if manifest.get("GlobalVariables").is_some() {
            if let Some(json) =
                archive.fetch_json(&manifest, "GlobalVariables", &mut self.hashes.global_variables)?
            {
                self.global_variables = parse_global_variables(json)?;
                changed = true;
            }
        }

        let package_defs: Vec<PackageDef> = match manifest.get("Packages") {
            Some(json) => serde_json::from_value(json.clone()).map_err(|source| AxError::Json {
                name: MANIFEST.to_string(),
                source,
            })?,
            None => Vec::new(),
        };

        let included: Vec<PackageDef> = package_defs.into_iter().filter(|d| d.is_included).collect();
        self.hashes
            .packages
            .retain(|name, _| included.iter().any(|d| &d.name == name));

        let mut packages = Vec::new();
        let mut scripts = Vec::new();
        for def in included {
            let has_previous = self.packages.iter().any(|p| p.name == def.name);
            let hash = self.hashes.packages.entry(def.name.clone()).or_default();
            if !has_previous {
                hash.clear();
            }
            let fetched = match &def.files {
                Some(files) => archive.fetch_json(files, "Objects", hash)?,
                None => Some(Value::Object(Map::new())),
            };

            let (objects, package_scripts) = match fetched {
                Some(json) => {
                    changed = true;
                    parse_objects(&def.name, json, &self.types)?
                }
                None => {
                    // Unchanged: keep what the previous read produced.
                    let previous = self.packages.iter().find(|p| p.name == def.name);
                    let objects = previous.map(|p| p.objects.clone()).unwrap_or_default();
                    let kept = self
                        .scripts
                        .iter()
                        .filter(|s| s.package == def.name)
                        .cloned()
                        .collect();
                    (objects, kept)
                }
            };

            packages.push(ArticyPackage {
                id: def.id.unwrap_or_default(),
                name: def.name,
                description: def.description,
                is_default: def.is_default_package,
                objects,
            });
            scripts.extend(package_scripts);
        }

        if packages.len() != self.packages.len() {
            changed = true;
        }
        link_children(&mut packages);
        self.packages = packages;
        self.scripts = scripts;

        tracing::info!(
            packages = self.packages.len(),
            types = self.types.len(),
            namespaces = self.global_variables.len(),
            scripts = self.scripts.len(),
            changed,
            "read export"
        );
        Ok(changed)
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn included_by_default() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PackageDef {
    #[serde(default)]
    id: Option<ArticyId>,
    #[serde(default = "included_by_default")]
    is_included: bool,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    is_default_package: bool,
    #[serde(default)]
    files: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ModelDef {
    #[serde(rename = "Type")]
    type_name: String,
    #[serde(default)]
    properties: Map<String, Value>,
    #[serde(default)]
    template: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ObjectsFile {
    #[serde(default)]
    objects: Vec<ModelDef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TypeDef {
    #[serde(rename = "Type")]
    type_name: String,
    #[serde(default)]
    inherits_from: Option<String>,
    #[serde(default)]
    properties: Vec<PropertyDef>,
    #[serde(default)]
    features: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PropertyDef {
    property: String,
    #[serde(rename = "Type")]
    type_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ObjectDefinitionsFile {
    #[serde(default)]
    object_definitions: Vec<TypeDef>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GlobalVariablesFile {
    Wrapped {
        #[serde(rename = "GlobalVariables")]
        global_variables: Vec<NamespaceDef>,
    },
    Bare(Vec<NamespaceDef>),
}

fn malformed(name: &str) -> impl FnOnce(serde_json::Error) -> AxError + '_ {
    move |source| AxError::Json {
        name: name.to_string(),
        source,
    }
}

fn parse_object_definitions(json: &Value) -> AxResult<TypeSystem> {
    let file: ObjectDefinitionsFile =
        serde_json::from_value(json.clone()).map_err(malformed("ObjectDefinitions"))?;
    let mut types = TypeSystem::new();
    for def in file.object_definitions {
        let properties = def
            .properties
            .into_iter()
            .filter_map(|p| match PropertyKind::from_type_name(&p.type_name) {
                Some(kind) => Some(PropertyInfo { name: p.property, kind }),
                None => {
                    tracing::debug!(property = %p.property, type_name = %p.type_name, "skipping property of unsupported type");
                    None
                }
            })
            .collect();
        types.add(ArticyType {
            technical_name: def.type_name,
            parent: def.inherits_from,
            properties,
            features: def.features,
        });
    }
    Ok(types)
}

fn parse_global_variables(json: Value) -> AxResult<Vec<NamespaceDef>> {
    let file: GlobalVariablesFile =
        serde_json::from_value(json).map_err(malformed("GlobalVariables"))?;
    Ok(match file {
        GlobalVariablesFile::Wrapped { global_variables } => global_variables,
        GlobalVariablesFile::Bare(namespaces) => namespaces,
    })
}

/// Keys consumed by the object model rather than stored as properties.
const RESERVED_KEYS: [&str; 5] = ["Id", "Parent", "TechnicalName", "InputPins", "OutputPins"];

fn parse_objects(
    package: &str,
    json: Value,
    types: &TypeSystem,
) -> AxResult<(Vec<ArticyObject>, Vec<ScriptSource>)> {
    let file: ObjectsFile = serde_json::from_value(json).map_err(malformed(package))?;
    let mut objects = Vec::with_capacity(file.objects.len());
    let mut scripts = Vec::new();

    for model in file.objects {
        let Some(id) = model
            .properties
            .get("Id")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<ArticyId>().ok())
        else {
            tracing::warn!(package, type_name = %model.type_name, "skipping model without a valid id");
            continue;
        };
        let parent = model
            .properties
            .get("Parent")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<ArticyId>().ok())
            .unwrap_or_default();
        let technical_name = model
            .properties
            .get("TechnicalName")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let mut object = ArticyObject::new(id, model.type_name.clone(), technical_name).with_parent(parent);
        for (name, value) in &model.properties {
            if RESERVED_KEYS.contains(&name.as_str()) {
                continue;
            }
            let declared = types.property_kind(&model.type_name, name);
            if let Some(prop) = json_to_property(value, declared) {
                object.properties.insert(name.clone(), prop);
            }
        }
        for (feature, value) in &model.template {
            if let Value::Object(map) = value {
                object
                    .properties
                    .insert(feature.clone(), PropertyValue::Feature(bag_from_json(map)));
            }
        }

        collect_scripts(package, id, &model, &mut scripts);
        objects.push(object);
    }

    Ok((objects, scripts))
}

fn collect_scripts(package: &str, owner: ArticyId, model: &ModelDef, out: &mut Vec<ScriptSource>) {
    let mut push = |owner: ArticyId, kind: ScriptKind, text: &str| {
        if !text.trim().is_empty() {
            out.push(ScriptSource {
                package: package.to_string(),
                owner,
                kind,
                text: text.to_string(),
            });
        }
    };

    if let Some(expression) = model.properties.get("Expression").and_then(Value::as_str) {
        if model.type_name.contains("Instruction") {
            push(owner, ScriptKind::Instruction, expression);
        } else if model.type_name.contains("Condition") {
            push(owner, ScriptKind::Condition, expression);
        }
    }

    for (key, kind) in [
        ("InputPins", ScriptKind::Condition),
        ("OutputPins", ScriptKind::Instruction),
    ] {
        let Some(pins) = model.properties.get(key).and_then(Value::as_array) else {
            continue;
        };
        for pin in pins {
            if let Some(text) = pin.get("Text").and_then(Value::as_str) {
                push(owner, kind, text);
            }
        }
    }
}

fn link_children(packages: &mut [ArticyPackage]) {
    let mut children: HashMap<ArticyId, Vec<ArticyId>> = HashMap::new();
    for object in packages.iter().flat_map(|p| p.objects.iter()) {
        if !object.parent.is_null() {
            children.entry(object.parent).or_default().push(object.id);
        }
    }
    for object in packages.iter_mut().flat_map(|p| p.objects.iter_mut()) {
        object.children = children.get(&object.id).cloned().unwrap_or_default();
    }
}

fn bag_from_json(map: &Map<String, Value>) -> PropertyBag {
    let mut bag = PropertyBag::new();
    for (name, value) in map {
        if let Some(prop) = json_to_property(value, None) {
            bag.insert(name.clone(), prop);
        }
    }
    bag
}

fn looks_like_id(s: &str) -> bool {
    s.len() == 18
        && (s.starts_with("0x") || s.starts_with("0X"))
        && s[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Convert an exported JSON value, honouring a declared kind when known.
pub fn json_to_property(value: &Value, declared: Option<PropertyKind>) -> Option<PropertyValue> {
    let Some(kind) = declared else {
        return infer_property(value);
    };
    let converted = match (kind, value) {
        (PropertyKind::Feature, Value::Object(map)) => PropertyValue::Feature(bag_from_json(map)),
        (PropertyKind::String, Value::String(s)) => PropertyValue::String(s.clone()),
        (PropertyKind::Text, Value::String(s)) => PropertyValue::Text(s.clone()),
        (PropertyKind::Name, Value::String(s)) => PropertyValue::Name(s.clone()),
        (PropertyKind::Id, Value::String(s)) => PropertyValue::Id(s.parse().ok()?),
        (PropertyKind::Id, Value::Number(n)) => PropertyValue::Id(ArticyId::from(n.as_u64()?)),
        (_, other) => {
            let inferred = infer_property(other)?;
            let mut slot = PropertyValue::default_for(kind);
            let accessor = property::accessor(kind)?;
            (accessor.setter)(&mut slot, &ExpressoValue::from(&inferred));
            slot
        }
    };
    Some(converted)
}

fn infer_property(value: &Value) -> Option<PropertyValue> {
    match value {
        Value::Bool(b) => Some(PropertyValue::Bool(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(match i32::try_from(i) {
                    Ok(small) => PropertyValue::Int32(small),
                    Err(_) => PropertyValue::Int64(i),
                })
            } else if let Some(u) = n.as_u64() {
                Some(PropertyValue::UInt64(u))
            } else {
                n.as_f64().map(PropertyValue::Float64)
            }
        }
        Value::String(s) if looks_like_id(s) => ArticyId::from_hex(s).ok().map(PropertyValue::Id),
        Value::String(s) => Some(PropertyValue::String(s.clone())),
        Value::Object(map) => Some(PropertyValue::Feature(bag_from_json(map))),
        Value::Array(_) | Value::Null => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(objects_hash: &str) -> String {
        format!(
            r#"{{
                "Project": {{ "Name": "Demo" }},
                "ObjectDefinitions": {{ "FileName": "object_definitions.json", "Hash": "t1" }},
                "GlobalVariables": {{ "FileName": "global_variables.json", "Hash": "g1" }},
                "Packages": [
                    {{
                        "Id": "0x0100000000000001",
                        "Name": "Main",
                        "IsDefaultPackage": true,
                        "Files": {{ "Objects": {{ "FileName": "main_objects.json", "Hash": "{objects_hash}" }} }}
                    }},
                    {{ "Name": "Hidden", "IsIncluded": false }}
                ]
            }}"#
        )
    }

    const OBJECTS: &str = r#"{
        "Objects": [
            {
                "Type": "Door",
                "Properties": {
                    "TechnicalName": "Door",
                    "Id": "0x000000000000AAAA",
                    "Parent": "0x0000000000000001",
                    "IsOpen": false,
                    "Weight": 3,
                    "Target": "0x000000000000BBBB",
                    "Label": "Front door",
                    "OutputPins": [ { "Text": "GameState.awake = true;" } ]
                },
                "Template": { "Lock": { "Code": 1234 } }
            },
            {
                "Type": "Condition",
                "Properties": {
                    "TechnicalName": "Check",
                    "Id": "0x000000000000BBBB",
                    "Parent": "0x0000000000000001",
                    "Expression": "GameState.awake == true"
                }
            },
            { "Type": "Broken", "Properties": { "TechnicalName": "NoId" } }
        ]
    }"#;

    const TYPES: &str = r#"{
        "ObjectDefinitions": [
            { "Type": "Entity", "Properties": [ { "Property": "Label", "Type": "Text" } ] },
            {
                "Type": "Door",
                "InheritsFrom": "Entity",
                "Properties": [ { "Property": "Weight", "Type": "float" }, { "Property": "Shape", "Type": "Vector" } ]
            }
        ]
    }"#;

    const VARIABLES: &str = r#"{
        "GlobalVariables": [
            {
                "Namespace": "GameState",
                "Variables": [
                    { "Variable": "awake", "Type": "Boolean", "Value": "False" },
                    { "Variable": "gold", "Type": "Integer", "Value": 10 }
                ]
            }
        ]
    }"#;

    fn archive(objects_hash: &str) -> MemoryArchive {
        MemoryArchive::new()
            .with_file(MANIFEST, manifest(objects_hash))
            .with_file("main_objects.json", OBJECTS)
            .with_file("object_definitions.json", TYPES)
            .with_file("global_variables.json", VARIABLES)
    }

    #[test]
    fn load_export() {
        let export = ProjectExport::load(&archive("o1")).unwrap();
        assert_eq!(export.project_name, "Demo");
        assert_eq!(export.packages.len(), 1);

        let main = &export.packages[0];
        assert_eq!(main.name, "Main");
        assert!(main.is_default);
        assert_eq!(main.objects.len(), 2);

        let door = &main.objects[0];
        assert_eq!(door.id.get(), 0xAAAA);
        assert_eq!(door.technical_name, "Door");
        assert_eq!(door.parent.get(), 1);
        assert_eq!(door.property("IsOpen"), Some(&PropertyValue::Bool(false)));
        assert_eq!(door.property("Weight"), Some(&PropertyValue::Float32(3.0)));
        assert_eq!(door.property("Label"), Some(&PropertyValue::Text("Front door".into())));
        assert_eq!(
            door.property("Target"),
            Some(&PropertyValue::Id(ArticyId::from(0xBBBB)))
        );
        assert_eq!(door.property("Lock.Code"), Some(&PropertyValue::Int32(1234)));
        assert!(door.property("OutputPins").is_none());
    }

    #[test]
    fn scripts_are_collected() {
        let export = ProjectExport::load(&archive("o1")).unwrap();
        assert_eq!(export.scripts.len(), 2);
        assert!(export.scripts.iter().any(|s| s.kind == ScriptKind::Instruction
            && s.text == "GameState.awake = true;"
            && s.owner.get() == 0xAAAA));
        assert!(export.scripts.iter().any(|s| s.kind == ScriptKind::Condition
            && s.text == "GameState.awake == true"));
    }

    #[test]
    fn types_and_variables() {
        let export = ProjectExport::load(&archive("o1")).unwrap();
        assert!(export.types.is_a("Door", "Entity"));
        assert_eq!(export.types.property_kind("Door", "Shape"), None);
        assert_eq!(export.global_variables.len(), 1);
        let ns = &export.global_variables[0];
        assert_eq!(ns.namespace, "GameState");
        assert_eq!(ns.variables[1].kind, VariableKind::Integer);
    }

    #[test]
    fn refresh_skips_unchanged_files() {
        let mut export = ProjectExport::load(&archive("o1")).unwrap();
        assert!(!export.refresh(&archive("o1")).unwrap());
        assert_eq!(export.packages[0].objects.len(), 2);
        assert_eq!(export.scripts.len(), 2);

        let changed = archive("o2").with_file("main_objects.json", r#"{ "Objects": [] }"#);
        assert!(export.refresh(&changed).unwrap());
        assert!(export.packages[0].objects.is_empty());
        assert!(export.scripts.is_empty());
    }

    #[test]
    fn reincluded_package_is_read_again() {
        let mut export = ProjectExport::load(&archive("o1")).unwrap();
        assert_eq!(export.packages[0].objects.len(), 2);

        let excluded = manifest("o1").replace(r#""Name": "Main","#, r#""Name": "Main", "IsIncluded": false,"#);
        assert!(export.refresh(&archive("o1").with_file(MANIFEST, excluded)).unwrap());
        assert!(export.packages.is_empty());
        assert!(export.scripts.is_empty());

        assert!(export.refresh(&archive("o1")).unwrap());
        assert_eq!(export.packages.len(), 1);
        assert_eq!(export.packages[0].objects.len(), 2);
        assert_eq!(export.scripts.len(), 2);
    }

    #[test]
    fn type_changes_reparse_unchanged_packages() {
        let mut export = ProjectExport::load(&archive("o1")).unwrap();
        let door = &export.packages[0].objects[0];
        assert_eq!(door.property("Weight"), Some(&PropertyValue::Float32(3.0)));

        let retyped = archive("o1")
            .with_file(MANIFEST, manifest("o1").replace(r#""t1""#, r#""t2""#))
            .with_file("object_definitions.json", r#"{ "ObjectDefinitions": [] }"#);
        assert!(export.refresh(&retyped).unwrap());
        let door = &export.packages[0].objects[0];
        assert_eq!(door.property("Weight"), Some(&PropertyValue::Int32(3)));
    }

    #[test]
    fn fetch_json_reports_changes() {
        let archive = MemoryArchive::new().with_file("a.json", "{\"x\": 1}");
        let root: Value = serde_json::json!({ "A": { "FileName": "a.json", "Hash": "h1" } });
        let mut hash = String::new();
        let first = archive.fetch_json(&root, "A", &mut hash).unwrap();
        assert_eq!(first, Some(serde_json::json!({ "x": 1 })));
        assert_eq!(hash, "h1");
        assert!(archive.fetch_json(&root, "A", &mut hash).unwrap().is_none());
        assert!(archive.fetch_json(&root, "B", &mut hash).is_err());
    }

    #[test]
    fn missing_files_are_errors() {
        let err = ProjectExport::load(&MemoryArchive::new()).unwrap_err();
        assert!(matches!(err, AxError::MissingFile(_)));
    }

    #[test]
    fn parents_link_children() {
        let mut parent = ArticyPackage::new("P")
            .with_object(ArticyObject::new(ArticyId::from(1), "Folder", "Root"))
            .with_object(ArticyObject::new(ArticyId::from(2), "Door", "A").with_parent(ArticyId::from(1)));
        link_children(std::slice::from_mut(&mut parent));
        assert_eq!(parent.objects[0].children, vec![ArticyId::from(2)]);
        assert!(parent.objects[1].children.is_empty());
    }

    #[test]
    fn directory_archive_reads_files() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(DirectoryArchive::open(dir.path()).is_err());

        std::fs::write(dir.path().join(MANIFEST), "{}").unwrap();
        let archive = DirectoryArchive::open(dir.path()).unwrap();
        assert_eq!(archive.read_file(MANIFEST).unwrap(), "{}");
        assert!(matches!(archive.read_file("nope.json"), Err(AxError::MissingFile(_))));
        let export = ProjectExport::load(&archive).unwrap();
        assert!(export.packages.is_empty());
    }
}
