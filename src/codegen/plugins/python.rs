use std::{
    collections::BTreeSet,
    fmt::Write as _,
    path::{Path, PathBuf},
};

use crate::codegen::{
    BuiltinScalar, CodegenFile, FieldType, GraphQLOperation, GraphQLType, PluginContext,
    QueryCodegenPlugin,
};

const DEFAULT_OUTFILE: &str = "types.py";

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

/// Keywords cannot be attribute names; they get a trailing underscore.
fn attribute_name(name: &str) -> String {
    if KEYWORDS.contains(&name) {
        format!("{name}_")
    } else {
        name.to_string()
    }
}

/// Emits plain Python classes and type aliases for an operation.
pub struct PythonPlugin {
    query: PathBuf,
    outfile_name: String,
}

impl PythonPlugin {
    pub fn new(context: &PluginContext) -> Self {
        Self {
            query: context.query.clone(),
            outfile_name: DEFAULT_OUTFILE.to_string(),
        }
    }

    pub fn outfile_name(&self) -> &str {
        &self.outfile_name
    }

    fn type_hint(ty: &FieldType, imports: &mut BTreeSet<&'static str>) -> String {
        match ty {
            FieldType::Builtin(scalar) => match scalar {
                BuiltinScalar::String | BuiltinScalar::Id => "str",
                BuiltinScalar::Int => "int",
                BuiltinScalar::Float => "float",
                BuiltinScalar::Boolean => "bool",
            }
            .to_string(),
            FieldType::Named(name) => name.clone(),
            FieldType::List(inner) => {
                imports.insert("List");
                format!("List[{}]", Self::type_hint(inner, imports))
            }
            FieldType::Optional(inner) => {
                imports.insert("Optional");
                format!("Optional[{}]", Self::type_hint(inner, imports))
            }
        }
    }

    fn render(types: &[GraphQLType]) -> String {
        let mut imports = BTreeSet::new();
        let mut uses_enum = false;
        let mut blocks = Vec::with_capacity(types.len());

        for ty in types {
            let mut block = String::new();
            match ty {
                GraphQLType::Scalar(scalar) => {
                    imports.insert("NewType");
                    let _ = write!(block, "{0} = NewType(\"{0}\", str)", scalar.name);
                }
                GraphQLType::Enum(enum_type) => {
                    uses_enum = true;
                    let _ = writeln!(block, "class {}(Enum):", enum_type.name);
                    for value in &enum_type.values {
                        let _ = writeln!(block, "    {} = \"{value}\"", attribute_name(value));
                    }
                }
                GraphQLType::Union(union) => {
                    imports.insert("Union");
                    let _ = write!(block, "{} = Union[{}]", union.name, union.types.join(", "));
                }
                GraphQLType::Object(object) => {
                    let _ = writeln!(block, "class {}:", object.name);
                    if object.fields.is_empty() {
                        let _ = writeln!(block, "    pass");
                    }
                    for field in &object.fields {
                        let hint = Self::type_hint(&field.ty, &mut imports);
                        let _ = writeln!(block, "    {}: {}", attribute_name(&field.name), hint);
                    }
                }
            }
            blocks.push(block.trim_end().to_string());
        }

        let mut header = Vec::new();
        if uses_enum {
            header.push("from enum import Enum".to_string());
        }
        if !imports.is_empty() {
            let names: Vec<&str> = imports.into_iter().collect();
            header.push(format!("from typing import {}", names.join(", ")));
        }

        let mut sections = Vec::new();
        if !header.is_empty() {
            sections.push(header.join("\n"));
        }
        sections.extend(blocks);
        format!("{}\n", sections.join("\n\n\n"))
    }
}

impl QueryCodegenPlugin for PythonPlugin {
    fn name(&self) -> &str {
        "PythonPlugin"
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
        self.outfile_name = format!("{stem}.py");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::{
        GraphQLEnum, GraphQLField, GraphQLObjectType, GraphQLScalar, GraphQLUnion, OperationKind,
    };

    fn operation() -> GraphQLOperation {
        GraphQLOperation {
            name: "GetUser".into(),
            kind: OperationKind::Query,
            result_type: "GetUserResult".into(),
            variables_type: None,
        }
    }

    #[test]
    fn renders_classes_enums_and_aliases() {
        let types = vec![
            GraphQLType::Scalar(GraphQLScalar {
                name: "DateTime".into(),
            }),
            GraphQLType::Enum(GraphQLEnum {
                name: "Role".into(),
                values: vec!["ADMIN".into(), "MEMBER".into()],
            }),
            GraphQLType::Object(GraphQLObjectType {
                name: "GetUserResultUser".into(),
                fields: vec![
                    GraphQLField {
                        name: "id".into(),
                        ty: FieldType::Builtin(BuiltinScalar::Id),
                    },
                    GraphQLField {
                        name: "tags".into(),
                        ty: FieldType::optional(FieldType::list(FieldType::Builtin(
                            BuiltinScalar::String,
                        ))),
                    },
                    GraphQLField {
                        name: "role".into(),
                        ty: FieldType::Named("Role".into()),
                    },
                ],
            }),
            GraphQLType::Union(GraphQLUnion {
                name: "Thing".into(),
                types: vec!["A".into(), "B".into()],
            }),
        ];

        let plugin = PythonPlugin::new(&PluginContext::new("q.graphql"));
        let files = plugin.generate_code(&types, &operation());
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, PathBuf::from("types.py"));

        let expected = "\
from enum import Enum
from typing import List, NewType, Optional, Union


DateTime = NewType(\"DateTime\", str)


class Role(Enum):
    ADMIN = \"ADMIN\"
    MEMBER = \"MEMBER\"


class GetUserResultUser:
    id: str
    tags: Optional[List[str]]
    role: Role


Thing = Union[A, B]
";
        assert_eq!(files[0].content, expected);
    }

    #[test]
    fn output_stem_override() {
        let mut plugin = PythonPlugin::new(&PluginContext::new("queries/user.graphql"));
        plugin.set_output_file_stem("user");
        assert_eq!(plugin.outfile_name(), "user.py");
    }

    #[test]
    fn keyword_names_get_trailing_underscore() {
        let types = vec![
            GraphQLType::Enum(GraphQLEnum {
                name: "Flag".into(),
                values: vec!["None".into(), "SOME".into()],
            }),
            GraphQLType::Object(GraphQLObjectType {
                name: "Range".into(),
                fields: vec![
                    GraphQLField {
                        name: "from".into(),
                        ty: FieldType::Builtin(BuiltinScalar::Int),
                    },
                    GraphQLField {
                        name: "to".into(),
                        ty: FieldType::Builtin(BuiltinScalar::Int),
                    },
                ],
            }),
        ];

        let rendered = PythonPlugin::render(&types);
        assert!(rendered.contains("    None_ = \"None\"\n"));
        assert!(rendered.contains("    SOME = \"SOME\"\n"));
        assert!(rendered.contains("    from_: int\n"));
        assert!(rendered.contains("    to: int\n"));
    }

    #[test]
    fn empty_object_gets_pass() {
        let types = vec![GraphQLType::Object(GraphQLObjectType {
            name: "Empty".into(),
            fields: vec![],
        })];
        assert_eq!(PythonPlugin::render(&types), "class Empty:\n    pass\n");
    }
}
