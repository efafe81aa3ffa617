//! Typed description of an operation, handed to plugins.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinScalar {
    String,
    Int,
    Float,
    Boolean,
    Id,
}

impl BuiltinScalar {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "String" => Some(BuiltinScalar::String),
            "Int" => Some(BuiltinScalar::Int),
            "Float" => Some(BuiltinScalar::Float),
            "Boolean" => Some(BuiltinScalar::Boolean),
            "ID" => Some(BuiltinScalar::Id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Builtin(BuiltinScalar),
    /// A type listed in the generated type list.
    Named(String),
    List(Box<FieldType>),
    Optional(Box<FieldType>),
}

impl FieldType {
    pub fn optional(inner: FieldType) -> Self {
        FieldType::Optional(Box::new(inner))
    }

    pub fn list(inner: FieldType) -> Self {
        FieldType::List(Box::new(inner))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphQLField {
    pub name: String,
    pub ty: FieldType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphQLObjectType {
    pub name: String,
    pub fields: Vec<GraphQLField>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphQLEnum {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphQLUnion {
    pub name: String,
    pub types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphQLScalar {
    pub name: String,
}

/// Generated types, listed so that every type comes after the types it
/// refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphQLType {
    Object(GraphQLObjectType),
    Enum(GraphQLEnum),
    Union(GraphQLUnion),
    Scalar(GraphQLScalar),
}

impl GraphQLType {
    pub fn name(&self) -> &str {
        match self {
            GraphQLType::Object(t) => &t.name,
            GraphQLType::Enum(t) => &t.name,
            GraphQLType::Union(t) => &t.name,
            GraphQLType::Scalar(t) => &t.name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Query => write!(f, "query"),
            OperationKind::Mutation => write!(f, "mutation"),
            OperationKind::Subscription => write!(f, "subscription"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphQLOperation {
    pub name: String,
    pub kind: OperationKind,
    pub result_type: String,
    pub variables_type: Option<String>,
}
