//! Lowers a parsed operation into the plugin-facing type list.

use std::collections::HashSet;

use async_graphql_parser::types::{
    BaseType, DocumentOperations, ExecutableDocument, Field, OperationDefinition, OperationType,
    Selection, SelectionSet, Type,
};

use super::{
    CodegenError,
    schema::{Schema, SchemaType, base_name},
    types::{
        BuiltinScalar, FieldType, GraphQLEnum, GraphQLField, GraphQLObjectType, GraphQLOperation,
        GraphQLScalar, GraphQLType, GraphQLUnion, OperationKind,
    },
};

const TYPENAME: &str = "__typename";

fn pascal_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Wraps `leaf` in the list/optional layers of `ty`.
fn wrap(ty: &Type, leaf: FieldType) -> FieldType {
    let inner = match &ty.base {
        BaseType::Named(_) => leaf,
        BaseType::List(inner) => FieldType::list(wrap(inner, leaf)),
    };
    if ty.nullable {
        FieldType::optional(inner)
    } else {
        inner
    }
}

fn single_operation(
    document: &ExecutableDocument,
) -> Result<(&str, &OperationDefinition), CodegenError> {
    match &document.operations {
        DocumentOperations::Single(_) => Err(CodegenError::AnonymousOperation),
        DocumentOperations::Multiple(operations) => {
            if operations.len() != 1 {
                return Err(CodegenError::MultipleOperations(operations.len()));
            }
            operations
                .iter()
                .next()
                .map(|(name, op)| (name.as_str(), &op.node))
                .ok_or(CodegenError::NoOperation)
        }
    }
}

pub(crate) fn build(
    schema: &Schema,
    document: &ExecutableDocument,
) -> Result<(Vec<GraphQLType>, GraphQLOperation), CodegenError> {
    let (name, operation) = single_operation(document)?;

    let kind = match operation.ty {
        OperationType::Query => OperationKind::Query,
        OperationType::Mutation => OperationKind::Mutation,
        OperationType::Subscription => OperationKind::Subscription,
    };
    let root = schema
        .root_type(operation.ty)
        .ok_or(CodegenError::MissingRootType(kind))?;

    let mut builder = Builder {
        schema,
        document,
        types: Vec::new(),
        emitted: HashSet::new(),
        reserved: HashSet::new(),
    };

    let result_type = builder.fresh_name(format!("{name}Result"));
    builder.selection(&result_type, root, &[&operation.selection_set.node])?;

    let variables_type = if operation.variable_definitions.is_empty() {
        None
    } else {
        let mut fields = Vec::with_capacity(operation.variable_definitions.len());
        for variable in &operation.variable_definitions {
            let ty = &variable.node.var_type.node;
            let leaf = builder.input_leaf(base_name(ty))?;
            fields.push(GraphQLField {
                name: variable.node.name.node.to_string(),
                ty: wrap(ty, leaf),
            });
        }
        let variables_type = builder.fresh_name(format!("{name}Variables"));
        builder.emit(GraphQLType::Object(GraphQLObjectType {
            name: variables_type.clone(),
            fields,
        }));
        Some(variables_type)
    };

    Ok((
        builder.types,
        GraphQLOperation {
            name: name.to_string(),
            kind,
            result_type,
            variables_type,
        },
    ))
}

struct Builder<'d> {
    schema: &'d Schema,
    document: &'d ExecutableDocument,
    types: Vec<GraphQLType>,
    emitted: HashSet<String>,
    /// Generated names handed out so far, emitted or not yet.
    reserved: HashSet<String>,
}

impl<'d> Builder<'d> {
    /// `base`, or `base` with the smallest numeric suffix that names neither
    /// another generated type nor a schema type that may be emitted.
    fn fresh_name(&mut self, base: String) -> String {
        let schema = self.schema;
        let taken = |name: &str| {
            self.reserved.contains(name)
                || self.emitted.contains(name)
                || matches!(
                    schema.get(name),
                    Some(
                        SchemaType::Scalar
                            | SchemaType::Enum { .. }
                            | SchemaType::InputObject { .. }
                    )
                )
        };

        let mut name = base.clone();
        let mut suffix = 1;
        while taken(&name) {
            suffix += 1;
            name = format!("{base}{suffix}");
        }
        self.reserved.insert(name.clone());
        name
    }

    fn emit(&mut self, ty: GraphQLType) {
        if self.emitted.insert(ty.name().to_string()) {
            self.types.push(ty);
        }
    }

    /// Splits selections on `type_name` into fields that always apply and
    /// fragments conditioned on some other type.
    fn flatten(
        &self,
        type_name: &str,
        set: &'d SelectionSet,
        fields: &mut Vec<&'d Field>,
        branches: &mut Vec<(&'d str, &'d SelectionSet)>,
    ) -> Result<(), CodegenError> {
        for item in &set.items {
            match &item.node {
                Selection::Field(field) => fields.push(&field.node),
                Selection::FragmentSpread(spread) => {
                    let name = &spread.node.fragment_name.node;
                    let document = self.document;
                    let fragment = document
                        .fragments
                        .get(name)
                        .ok_or_else(|| CodegenError::UnknownFragment(name.to_string()))?;
                    let condition = fragment.node.type_condition.node.on.node.as_str();
                    self.branch(
                        type_name,
                        condition,
                        &fragment.node.selection_set.node,
                        fields,
                        branches,
                    )?;
                }
                Selection::InlineFragment(inline) => match &inline.node.type_condition {
                    None => {
                        self.flatten(type_name, &inline.node.selection_set.node, fields, branches)?
                    }
                    Some(condition) => self.branch(
                        type_name,
                        condition.node.on.node.as_str(),
                        &inline.node.selection_set.node,
                        fields,
                        branches,
                    )?,
                },
            }
        }
        Ok(())
    }

    fn branch(
        &self,
        type_name: &str,
        condition: &'d str,
        set: &'d SelectionSet,
        fields: &mut Vec<&'d Field>,
        branches: &mut Vec<(&'d str, &'d SelectionSet)>,
    ) -> Result<(), CodegenError> {
        if condition == type_name || self.schema.is_possible_type(condition, type_name) {
            return self.flatten(type_name, set, fields, branches);
        }
        if !self.schema.is_abstract(type_name) {
            return Err(CodegenError::InvalidFragment {
                condition: condition.to_string(),
                parent: type_name.to_string(),
            });
        }
        if !matches!(self.schema.get(condition), Some(SchemaType::Object { .. })) {
            return Err(CodegenError::UnsupportedFragment(condition.to_string()));
        }
        branches.push((condition, set));
        Ok(())
    }

    /// Emits the type(s) for a selection on `type_name` and returns the
    /// generated name to refer to.
    fn selection(
        &mut self,
        generated: &str,
        type_name: &str,
        sets: &[&'d SelectionSet],
    ) -> Result<String, CodegenError> {
        let mut fields = Vec::new();
        let mut branches = Vec::new();
        for &set in sets {
            self.flatten(type_name, set, &mut fields, &mut branches)?;
        }

        if branches.is_empty() {
            let object = self.object(generated, type_name, &fields)?;
            self.emit(GraphQLType::Object(object));
            return Ok(generated.to_string());
        }

        let mut grouped: Vec<(&'d str, Vec<&'d SelectionSet>)> = Vec::new();
        for (condition, set) in branches {
            match grouped.iter_mut().find(|(c, _)| *c == condition) {
                Some((_, sets)) => sets.push(set),
                None => grouped.push((condition, vec![set])),
            }
        }

        let mut members = Vec::with_capacity(grouped.len());
        for (condition, sets) in grouped {
            let mut member_fields = fields.clone();
            let mut nested = Vec::new();
            for set in sets {
                self.flatten(condition, set, &mut member_fields, &mut nested)?;
            }
            let member_name = self.fresh_name(format!("{generated}{condition}"));
            let object = self.object(&member_name, condition, &member_fields)?;
            self.emit(GraphQLType::Object(object));
            members.push(member_name);
        }

        self.emit(GraphQLType::Union(GraphQLUnion {
            name: generated.to_string(),
            types: members,
        }));
        Ok(generated.to_string())
    }

    fn object(
        &mut self,
        generated: &str,
        type_name: &str,
        fields: &[&'d Field],
    ) -> Result<GraphQLObjectType, CodegenError> {
        let schema = self.schema;

        // Fields sharing a response key are merged, keeping first-seen order.
        let mut by_key: Vec<(&'d str, Vec<&'d Field>)> = Vec::new();
        for &field in fields {
            let key = field.response_key().node.as_str();
            match by_key.iter_mut().find(|(k, _)| *k == key) {
                Some((_, same)) => same.push(field),
                None => by_key.push((key, vec![field])),
            }
        }

        let mut out = Vec::with_capacity(by_key.len());
        for (key, same) in by_key {
            let field = same[0];
            let field_name = field.name.node.as_str();

            if field_name == TYPENAME {
                out.push(GraphQLField {
                    name: key.to_string(),
                    ty: FieldType::Builtin(BuiltinScalar::String),
                });
                continue;
            }

            let definition =
                schema
                    .field(type_name, field_name)
                    .ok_or_else(|| CodegenError::UnknownField {
                        type_name: type_name.to_string(),
                        field: field_name.to_string(),
                    })?;
            let target = base_name(&definition.ty);

            let sub_selections: Vec<&'d SelectionSet> = same
                .iter()
                .map(|&f| &f.selection_set.node)
                .filter(|set| !set.items.is_empty())
                .collect();

            let leaf = if sub_selections.is_empty() {
                self.output_leaf(target, type_name, field_name)?
            } else {
                let nested = self.fresh_name(format!("{generated}{}", pascal_case(key)));
                FieldType::Named(self.selection(&nested, target, &sub_selections)?)
            };

            out.push(GraphQLField {
                name: key.to_string(),
                ty: wrap(&definition.ty, leaf),
            });
        }

        Ok(GraphQLObjectType {
            name: generated.to_string(),
            fields: out,
        })
    }

    fn output_leaf(
        &mut self,
        target: &str,
        type_name: &str,
        field_name: &str,
    ) -> Result<FieldType, CodegenError> {
        if let Some(builtin) = BuiltinScalar::from_name(target) {
            return Ok(FieldType::Builtin(builtin));
        }
        let schema = self.schema;
        match schema.get(target) {
            Some(SchemaType::Scalar) => {
                self.emit(GraphQLType::Scalar(GraphQLScalar {
                    name: target.to_string(),
                }));
                Ok(FieldType::Named(target.to_string()))
            }
            Some(SchemaType::Enum { values }) => {
                self.emit(GraphQLType::Enum(GraphQLEnum {
                    name: target.to_string(),
                    values: values.clone(),
                }));
                Ok(FieldType::Named(target.to_string()))
            }
            Some(_) => Err(CodegenError::MissingSelection {
                type_name: type_name.to_string(),
                field: field_name.to_string(),
            }),
            None => Err(CodegenError::UnknownType(target.to_string())),
        }
    }

    /// Resolves a variable's named type, emitting input objects recursively.
    fn input_leaf(&mut self, target: &str) -> Result<FieldType, CodegenError> {
        if let Some(builtin) = BuiltinScalar::from_name(target) {
            return Ok(FieldType::Builtin(builtin));
        }
        let schema = self.schema;
        match schema.get(target) {
            Some(SchemaType::Scalar) => {
                self.emit(GraphQLType::Scalar(GraphQLScalar {
                    name: target.to_string(),
                }));
            }
            Some(SchemaType::Enum { values }) => {
                self.emit(GraphQLType::Enum(GraphQLEnum {
                    name: target.to_string(),
                    values: values.clone(),
                }));
            }
            Some(SchemaType::InputObject { fields }) => {
                if self.emitted.contains(target) {
                    return Ok(FieldType::Named(target.to_string()));
                }
                // Claim the name first so self-referencing inputs terminate.
                self.emitted.insert(target.to_string());
                let mut out = Vec::with_capacity(fields.len());
                for field in fields {
                    let leaf = self.input_leaf(base_name(&field.ty))?;
                    out.push(GraphQLField {
                        name: field.name.clone(),
                        ty: wrap(&field.ty, leaf),
                    });
                }
                self.types.push(GraphQLType::Object(GraphQLObjectType {
                    name: target.to_string(),
                    fields: out,
                }));
            }
            Some(_) => return Err(CodegenError::InvalidInputType(target.to_string())),
            None => return Err(CodegenError::UnknownType(target.to_string())),
        }
        Ok(FieldType::Named(target.to_string()))
    }
}
