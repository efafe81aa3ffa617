use std::{
    fmt::Write as _,
    path::{Path, PathBuf},
};

use crate::codegen::{
    BuiltinScalar, CodegenFile, FieldType, GraphQLOperation, GraphQLType, PluginContext,
    QueryCodegenPlugin,
};

const DEFAULT_OUTFILE: &str = "types.ts";

/// Emits TypeScript type aliases and enums for an operation.
pub struct TypeScriptPlugin {
    query: PathBuf,
    outfile_name: String,
}

impl TypeScriptPlugin {
    pub fn new(context: &PluginContext) -> Self {
        Self {
            query: context.query.clone(),
            outfile_name: DEFAULT_OUTFILE.to_string(),
        }
    }

    pub fn outfile_name(&self) -> &str {
        &self.outfile_name
    }

    fn type_annotation(ty: &FieldType) -> String {
        match ty {
            FieldType::Builtin(scalar) => match scalar {
                BuiltinScalar::String | BuiltinScalar::Id => "string",
                BuiltinScalar::Int | BuiltinScalar::Float => "number",
                BuiltinScalar::Boolean => "boolean",
            }
            .to_string(),
            FieldType::Named(name) => name.clone(),
            FieldType::List(inner) => match inner.as_ref() {
                FieldType::Optional(_) => format!("({})[]", Self::type_annotation(inner)),
                _ => format!("{}[]", Self::type_annotation(inner)),
            },
            FieldType::Optional(inner) => format!("{} | undefined", Self::type_annotation(inner)),
        }
    }

    fn render(types: &[GraphQLType]) -> String {
        let mut blocks = Vec::with_capacity(types.len());

        for ty in types {
            let mut block = String::new();
            match ty {
                GraphQLType::Scalar(scalar) => {
                    let _ = write!(block, "type {} = string", scalar.name);
                }
                GraphQLType::Enum(enum_type) => {
                    let _ = writeln!(block, "enum {} {{", enum_type.name);
                    for value in &enum_type.values {
                        let _ = writeln!(block, "    {value} = \"{value}\",");
                    }
                    block.push('}');
                }
                GraphQLType::Union(union) => {
                    let _ = write!(block, "type {} = {}", union.name, union.types.join(" | "));
                }
                GraphQLType::Object(object) => {
                    let _ = writeln!(block, "type {} = {{", object.name);
                    for field in &object.fields {
                        let _ = writeln!(
                            block,
                            "    {}: {}",
                            field.name,
                            Self::type_annotation(&field.ty)
                        );
                    }
                    block.push('}');
                }
            }
            blocks.push(block);
        }

        format!("{}\n", blocks.join("\n\n"))
    }
}

impl QueryCodegenPlugin for TypeScriptPlugin {
    fn name(&self) -> &str {
        "TypeScriptPlugin"
    }

    fn query(&self) -> &Path {
        &self.query
    }

    fn generate_code(
        &self,
        types: &[GraphQLType],
        _operation: &GraphQLOperation,
    ) -> Vec<CodegenFile> {
        vec![CodegenFile {
            path: PathBuf::from(&self.outfile_name),
            content: Self::render(types),
        }]
    }

    fn set_output_file_stem(&mut self, stem: &str) {
        self.outfile_name = format!("{stem}.ts");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::{GraphQLEnum, GraphQLField, GraphQLObjectType, GraphQLUnion};

    #[test]
    fn renders_objects_enums_and_unions() {
        let types = vec![
            GraphQLType::Enum(GraphQLEnum {
                name: "Role".into(),
                values: vec!["ADMIN".into()],
            }),
            GraphQLType::Object(GraphQLObjectType {
                name: "Result".into(),
                fields: vec![
                    GraphQLField {
                        name: "count".into(),
                        ty: FieldType::Builtin(BuiltinScalar::Int),
                    },
                    GraphQLField {
                        name: "names".into(),
                        ty: FieldType::list(FieldType::optional(FieldType::Builtin(
                            BuiltinScalar::String,
                        ))),
                    },
                    GraphQLField {
                        name: "role".into(),
                        ty: FieldType::optional(FieldType::Named("Role".into())),
                    },
                ],
            }),
            GraphQLType::Union(GraphQLUnion {
                name: "Either".into(),
                types: vec!["A".into(), "B".into()],
            }),
        ];

        let expected = "\
enum Role {
    ADMIN = \"ADMIN\",
}

type Result = {
    count: number
    names: (string | undefined)[]
    role: Role | undefined
}

type Either = A | B
";
        assert_eq!(TypeScriptPlugin::render(&types), expected);
    }

    #[test]
    fn output_stem_override() {
        let mut plugin = TypeScriptPlugin::new(&PluginContext::new("a.graphql"));
        assert_eq!(plugin.outfile_name(), "types.ts");
        plugin.set_output_file_stem("a");
        assert_eq!(plugin.outfile_name(), "a.ts");
    }
}
