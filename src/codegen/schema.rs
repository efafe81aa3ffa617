//! Loading and indexing of SDL schemas.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use async_graphql_parser::types::{
    BaseType, FieldDefinition, InputValueDefinition, OperationType, Type, TypeKind,
    TypeSystemDefinition,
};
use async_graphql_parser::Positioned;
use tracing::debug;

use super::CodegenError;

pub const DEFAULT_SCHEMA_SYMBOL: &str = "schema";

#[derive(Debug, Clone)]
pub struct SchemaField {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone)]
pub enum SchemaType {
    Scalar,
    Object { fields: Vec<SchemaField>, implements: Vec<String> },
    Interface { fields: Vec<SchemaField> },
    Union { members: Vec<String> },
    Enum { values: Vec<String> },
    InputObject { fields: Vec<SchemaField> },
}

/// An indexed service schema.
#[derive(Debug, Clone)]
pub struct Schema {
    types: HashMap<String, SchemaType>,
    query_type: Option<String>,
    mutation_type: Option<String>,
    subscription_type: Option<String>,
}

fn field_from_definition(def: &Positioned<FieldDefinition>) -> SchemaField {
    SchemaField {
        name: def.node.name.node.to_string(),
        ty: def.node.ty.node.clone(),
    }
}

fn field_from_input(def: &Positioned<InputValueDefinition>) -> SchemaField {
    SchemaField {
        name: def.node.name.node.to_string(),
        ty: def.node.ty.node.clone(),
    }
}

/// The named type at the bottom of any list/non-null wrapping.
pub fn base_name(ty: &Type) -> &str {
    match &ty.base {
        BaseType::Named(name) => name.as_str(),
        BaseType::List(inner) => base_name(inner),
    }
}

impl Schema {
    pub fn parse(sdl: &str) -> Result<Self, CodegenError> {
        let document = async_graphql_parser::parse_schema(sdl).map_err(CodegenError::SchemaParse)?;

        let mut schema = Schema {
            types: HashMap::new(),
            query_type: None,
            mutation_type: None,
            subscription_type: None,
        };
        let mut explicit_roots = false;

        for definition in document.definitions {
            match definition {
                TypeSystemDefinition::Schema(def) => {
                    explicit_roots = true;
                    let def = def.node;
                    if let Some(query) = def.query {
                        schema.query_type = Some(query.node.to_string());
                    }
                    if let Some(mutation) = def.mutation {
                        schema.mutation_type = Some(mutation.node.to_string());
                    }
                    if let Some(subscription) = def.subscription {
                        schema.subscription_type = Some(subscription.node.to_string());
                    }
                }
                TypeSystemDefinition::Type(def) => {
                    let def = def.node;
                    let name = def.name.node.to_string();
                    let incoming = match def.kind {
                        TypeKind::Scalar => SchemaType::Scalar,
                        TypeKind::Object(object) => SchemaType::Object {
                            fields: object.fields.iter().map(field_from_definition).collect(),
                            implements: object
                                .implements
                                .iter()
                                .map(|i| i.node.to_string())
                                .collect(),
                        },
                        TypeKind::Interface(interface) => SchemaType::Interface {
                            fields: interface.fields.iter().map(field_from_definition).collect(),
                        },
                        TypeKind::Union(union) => SchemaType::Union {
                            members: union.members.iter().map(|m| m.node.to_string()).collect(),
                        },
                        TypeKind::Enum(enum_type) => SchemaType::Enum {
                            values: enum_type
                                .values
                                .iter()
                                .map(|v| v.node.value.node.to_string())
                                .collect(),
                        },
                        TypeKind::InputObject(input) => SchemaType::InputObject {
                            fields: input.fields.iter().map(field_from_input).collect(),
                        },
                    };
                    schema.merge_type(name, incoming);
                }
                TypeSystemDefinition::Directive(_) => {}
            }
        }

        if !explicit_roots {
            for (slot, name) in [
                (&mut schema.query_type, "Query"),
                (&mut schema.mutation_type, "Mutation"),
                (&mut schema.subscription_type, "Subscription"),
            ] {
                if schema.types.contains_key(name) {
                    *slot = Some(name.to_string());
                }
            }
        }

        Ok(schema)
    }

    // `extend type` definitions add to what is already there.
    fn merge_type(&mut self, name: String, incoming: SchemaType) {
        let Some(existing) = self.types.get_mut(&name) else {
            self.types.insert(name, incoming);
            return;
        };

        match (existing, incoming) {
            (
                SchemaType::Object { fields, implements },
                SchemaType::Object {
                    fields: more_fields,
                    implements: more_implements,
                },
            ) => {
                fields.extend(more_fields);
                implements.extend(more_implements);
            }
            (SchemaType::Interface { fields }, SchemaType::Interface { fields: more })
            | (SchemaType::InputObject { fields }, SchemaType::InputObject { fields: more }) => {
                fields.extend(more)
            }
            (SchemaType::Union { members }, SchemaType::Union { members: more }) => {
                members.extend(more)
            }
            (SchemaType::Enum { values }, SchemaType::Enum { values: more }) => values.extend(more),
            (existing, incoming) => *existing = incoming,
        }
    }

    /// Loads the schema named by `locator` (`module[:symbol]`) from `app_dir`.
    ///
    /// Dots in the module name become directories. The symbol names a
    /// `.graphql` file inside the module directory; when the symbol is left
    /// at its default the module may also be a single `<module>.graphql`
    /// file.
    pub fn load(locator: &str, app_dir: &Path) -> Result<Self, CodegenError> {
        let (module, symbol) = match locator.split_once(':') {
            Some((module, symbol)) => (module, symbol),
            None => (locator, DEFAULT_SCHEMA_SYMBOL),
        };

        if module.is_empty() || symbol.is_empty() {
            return Err(CodegenError::InvalidSchemaLocator(locator.to_string()));
        }

        let module_path: PathBuf = app_dir.join(module.split('.').collect::<PathBuf>());
        let mut candidates = vec![module_path.join(format!("{symbol}.graphql"))];
        if symbol == DEFAULT_SCHEMA_SYMBOL {
            candidates.push(module_path.with_extension("graphql"));
        }

        let path = candidates
            .iter()
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| CodegenError::SchemaNotFound {
                locator: locator.to_string(),
                app_dir: app_dir.to_path_buf(),
            })?;

        debug!(path = %path.display(), "loading schema");
        let sdl = std::fs::read_to_string(path).map_err(|source| CodegenError::Io {
            path: path.clone(),
            source,
        })?;
        Self::parse(&sdl)
    }

    pub fn get(&self, name: &str) -> Option<&SchemaType> {
        self.types.get(name)
    }

    pub fn root_type(&self, operation: OperationType) -> Option<&str> {
        match operation {
            OperationType::Query => self.query_type.as_deref(),
            OperationType::Mutation => self.mutation_type.as_deref(),
            OperationType::Subscription => self.subscription_type.as_deref(),
        }
    }

    /// Field definition of an object or interface type.
    pub fn field(&self, type_name: &str, field_name: &str) -> Option<&SchemaField> {
        match self.types.get(type_name)? {
            SchemaType::Object { fields, .. } | SchemaType::Interface { fields } => {
                fields.iter().find(|f| f.name == field_name)
            }
            _ => None,
        }
    }

    pub fn is_abstract(&self, type_name: &str) -> bool {
        matches!(
            self.types.get(type_name),
            Some(SchemaType::Interface { .. } | SchemaType::Union { .. })
        )
    }

    /// Whether an object of type `object` may appear where `abstract_type`
    /// is expected.
    pub fn is_possible_type(&self, abstract_type: &str, object: &str) -> bool {
        match self.types.get(abstract_type) {
            Some(SchemaType::Union { members }) => members.iter().any(|m| m == object),
            Some(SchemaType::Interface { .. }) => matches!(
                self.types.get(object),
                Some(SchemaType::Object { implements, .. })
                    if implements.iter().any(|i| i == abstract_type)
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SDL: &str = r#"
        type Query {
            user(id: ID!): User
        }

        type User {
            id: ID!
        }

        extend type User {
            name: String
        }
    "#;

    #[test]
    fn default_roots_and_extensions() {
        let schema = Schema::parse(SDL).unwrap();
        assert_eq!(schema.root_type(OperationType::Query), Some("Query"));
        assert_eq!(schema.root_type(OperationType::Mutation), None);
        assert!(schema.field("User", "id").is_some());
        assert!(schema.field("User", "name").is_some());
    }

    #[test]
    fn explicit_schema_definition_wins() {
        let schema = Schema::parse(
            "schema { query: RootQuery } type RootQuery { ok: Boolean } type Query { no: Int }",
        )
        .unwrap();
        assert_eq!(schema.root_type(OperationType::Query), Some("RootQuery"));
    }

    #[test]
    fn loads_module_directory_symbol() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("app")).unwrap();
        std::fs::write(dir.path().join("app").join("schema.graphql"), SDL).unwrap();

        let schema = Schema::load("app:schema", dir.path()).unwrap();
        assert!(schema.field("Query", "user").is_some());

        let schema = Schema::load("app", dir.path()).unwrap();
        assert!(schema.field("Query", "user").is_some());
    }

    #[test]
    fn loads_dotted_module_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("app")).unwrap();
        std::fs::write(dir.path().join("app").join("api.graphql"), SDL).unwrap();

        assert!(Schema::load("app.api", dir.path()).is_ok());
        // A non-default symbol never falls back to the module file.
        assert!(matches!(
            Schema::load("app.api:other", dir.path()),
            Err(CodegenError::SchemaNotFound { .. })
        ));
    }

    #[test]
    fn rejects_empty_locator_parts() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Schema::load("app:", dir.path()),
            Err(CodegenError::InvalidSchemaLocator(_))
        ));
    }
}
