//! The validated schema: user types with interface fields resolved and directives typed.

use std::{collections::HashSet, fmt};

use async_graphql_parser::{
    types::{BaseType, ConstDirective, FieldDefinition, ServiceDocument, Type, TypeKind as ParsedTypeKind, TypeSystemDefinition},
    Pos, Positioned,
};
use indexmap::IndexMap;

use crate::rules::{
    auth_directive::AuthDirective,
    custom_directive::CustomDirective,
    directive::SchemaDirective,
    generate_directive::GenerateDirective,
    id_directive::IdDirective,
    search_directive::SearchDirective,
    secret_directive::SecretDirective,
    visitor::{DirectiveOwner, RuleError, VisitorContext},
};

pub const ID_SCALAR: &str = "ID";
pub const STRING_SCALAR: &str = "String";
pub const INT_SCALAR: &str = "Int";
pub const INT64_SCALAR: &str = "Int64";
pub const FLOAT_SCALAR: &str = "Float";
pub const BOOLEAN_SCALAR: &str = "Boolean";
pub const DATETIME_SCALAR: &str = "DateTime";

pub const SCALARS: [&str; 7] = [
    ID_SCALAR,
    STRING_SCALAR,
    INT_SCALAR,
    INT64_SCALAR,
    FLOAT_SCALAR,
    BOOLEAN_SCALAR,
    DATETIME_SCALAR,
];

/// What a field holds, as far as indexing and generation are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    Id,
    String,
    Int,
    Int64,
    Float,
    Boolean,
    DateTime,
    Enum,
    /// An edge to an object or interface.
    Object,
    Unknown,
}

impl FieldClass {
    pub fn is_scalar(self) -> bool {
        !matches!(self, FieldClass::Object | FieldClass::Unknown)
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, FieldClass::Int | FieldClass::Int64 | FieldClass::Float)
    }

    /// Fields that can be ordered and carry min/max aggregates.
    pub fn is_orderable(self) -> bool {
        matches!(
            self,
            FieldClass::String | FieldClass::Int | FieldClass::Int64 | FieldClass::Float | FieldClass::DateTime
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Object,
    Interface,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldType {
    pub name: String,
    pub nullable: bool,
    /// `Some(item_nullable)` for lists.
    pub list: Option<bool>,
}

impl FieldType {
    pub(crate) fn from_parsed(ty: &Type) -> Self {
        match &ty.base {
            BaseType::Named(name) => FieldType {
                name: name.to_string(),
                nullable: ty.nullable,
                list: None,
            },
            // nested lists are rejected while validating type references
            BaseType::List(item) => FieldType {
                name: match &item.base {
                    BaseType::Named(name) => name.to_string(),
                    BaseType::List(_) => item.base.to_string(),
                },
                nullable: ty.nullable,
                list: Some(item.nullable),
            },
        }
    }

    pub fn is_list(&self) -> bool {
        self.list.is_some()
    }

    /// The same type wrapped differently, keeping the named type.
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        FieldType {
            name: name.into(),
            ..self.clone()
        }
    }

    pub fn optional(&self) -> Self {
        FieldType {
            nullable: true,
            ..self.clone()
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.list {
            Some(item_nullable) => {
                write!(f, "[{}{}]", self.name, if item_nullable { "" } else { "!" })?;
            }
            None => f.write_str(&self.name)?,
        }
        if !self.nullable {
            f.write_str("!")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: FieldType,
    /// The type that declared the field: an interface for inherited fields.
    pub owner: String,
    /// Storage predicate name.
    pub predicate: String,
    pub pos: Pos,
    pub description: Option<String>,
    pub directives: Vec<Positioned<SchemaDirective>>,
    pub(crate) source: Positioned<FieldDefinition>,
}

impl Field {
    pub fn is_id(&self) -> bool {
        self.ty.name == ID_SCALAR
    }

    pub fn id_directive(&self) -> Option<&IdDirective> {
        self.directives.iter().find_map(|directive| match &directive.node {
            SchemaDirective::Id(id) => Some(id),
            _ => None,
        })
    }

    pub fn is_xid(&self) -> bool {
        self.id_directive().is_some()
    }

    pub fn search(&self) -> Option<&Positioned<SchemaDirective>> {
        self.directives
            .iter()
            .find(|directive| matches!(directive.node, SchemaDirective::Search(_)))
    }

    pub fn search_directive(&self) -> Option<&SearchDirective> {
        self.directives.iter().find_map(|directive| match &directive.node {
            SchemaDirective::Search(search) => Some(search),
            _ => None,
        })
    }

    pub fn has_inverse(&self) -> Option<&str> {
        self.directives.iter().find_map(|directive| match &directive.node {
            SchemaDirective::HasInverse(inverse) => Some(inverse.field.as_str()),
            _ => None,
        })
    }

    pub fn custom(&self) -> Option<&CustomDirective> {
        self.directives.iter().find_map(|directive| match &directive.node {
            SchemaDirective::Custom(custom) => Some(custom),
            _ => None,
        })
    }

    /// Resolved outside of storage, by `@custom` or `@lambda`.
    pub fn is_custom(&self) -> bool {
        self.directives
            .iter()
            .any(|directive| matches!(directive.node, SchemaDirective::Custom(_) | SchemaDirective::Lambda))
    }

    pub(crate) fn source_directives(&self) -> impl Iterator<Item = &ConstDirective> + '_ {
        self.source.node.directives.iter().map(|directive| &directive.node)
    }
}

#[derive(Debug, Clone)]
pub struct ObjectType {
    pub name: String,
    pub kind: TypeKind,
    /// Directly implemented interfaces.
    pub implements: Vec<String>,
    /// Inherited fields first, in interface order.
    pub fields: Vec<Field>,
    pub pos: Pos,
    pub description: Option<String>,
    pub directives: Vec<Positioned<SchemaDirective>>,
    pub(crate) source_directives: Vec<ConstDirective>,
}

impl ObjectType {
    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn id_field(&self) -> Option<&Field> {
        self.fields.iter().find(|field| field.is_id())
    }

    pub fn xid_fields(&self) -> impl Iterator<Item = &Field> + '_ {
        self.fields.iter().filter(|field| field.is_xid())
    }

    /// Fields backed by a storage predicate.
    pub fn stored_fields(&self) -> impl Iterator<Item = &Field> + '_ {
        self.fields.iter().filter(|field| !field.is_custom())
    }

    pub fn auth(&self) -> Option<(Pos, &AuthDirective)> {
        self.directives.iter().find_map(|directive| match &directive.node {
            SchemaDirective::Auth(auth) => Some((directive.pos, auth)),
            _ => None,
        })
    }

    pub fn generate(&self) -> GenerateDirective {
        self.directives
            .iter()
            .find_map(|directive| match &directive.node {
                SchemaDirective::Generate(generate) => Some(generate.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }

    pub fn secret(&self) -> Option<&SecretDirective> {
        self.directives.iter().find_map(|directive| match &directive.node {
            SchemaDirective::Secret(secret) => Some(secret),
            _ => None,
        })
    }

    /// Storage predicate holding the secret digest.
    pub fn secret_predicate(&self) -> Option<String> {
        self.secret().map(|secret| {
            secret
                .pred
                .clone()
                .unwrap_or_else(|| format!("{}.{}", self.storage_name(), secret.field))
        })
    }

    pub fn is_remote(&self) -> bool {
        self.directives
            .iter()
            .any(|directive| matches!(directive.node, SchemaDirective::Remote))
    }

    pub fn with_subscription(&self) -> bool {
        self.generate().subscription.unwrap_or_else(|| {
            self.directives
                .iter()
                .any(|directive| matches!(directive.node, SchemaDirective::WithSubscription))
        })
    }

    /// Name of the type in storage, `@dgraph(type: ...)` when given.
    pub fn storage_name(&self) -> &str {
        self.directives
            .iter()
            .find_map(|directive| match &directive.node {
                SchemaDirective::Dgraph(dgraph) => dgraph.r#type.as_deref(),
                _ => None,
            })
            .unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone)]
pub struct EnumType {
    pub name: String,
    pub values: Vec<String>,
    pub pos: Pos,
    pub(crate) source_directives: Vec<ConstDirective>,
}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    /// Objects and interfaces in declaration order.
    pub types: IndexMap<String, ObjectType>,
    pub enums: IndexMap<String, EnumType>,
}

impl Schema {
    pub fn get(&self, name: &str) -> Option<&ObjectType> {
        self.types.get(name)
    }

    pub fn is_enum(&self, name: &str) -> bool {
        self.enums.contains_key(name)
    }

    pub fn is_scalar(&self, name: &str) -> bool {
        SCALARS.contains(&name)
    }

    pub fn classify(&self, ty: &FieldType) -> FieldClass {
        match ty.name.as_str() {
            ID_SCALAR => FieldClass::Id,
            STRING_SCALAR => FieldClass::String,
            INT_SCALAR => FieldClass::Int,
            INT64_SCALAR => FieldClass::Int64,
            FLOAT_SCALAR => FieldClass::Float,
            BOOLEAN_SCALAR => FieldClass::Boolean,
            DATETIME_SCALAR => FieldClass::DateTime,
            name if self.is_enum(name) => FieldClass::Enum,
            name if self.types.contains_key(name) => FieldClass::Object,
            _ => FieldClass::Unknown,
        }
    }

    /// Interfaces the type implements, directly or not, nearest first.
    pub fn ancestors(&self, type_name: &str) -> Vec<&ObjectType> {
        let mut ancestors: Vec<&ObjectType> = Vec::new();
        let mut pending: Vec<&str> = self
            .get(type_name)
            .map(|ty| ty.implements.iter().map(String::as_str).collect())
            .unwrap_or_default();

        while !pending.is_empty() {
            let mut next = Vec::new();
            for name in pending {
                let Some(interface) = self.get(name) else { continue };
                if ancestors.iter().any(|known| known.name == interface.name) {
                    continue;
                }
                ancestors.push(interface);
                next.extend(interface.implements.iter().map(String::as_str));
            }
            pending = next;
        }

        ancestors
    }

    /// Object types implementing the interface, directly or not. An object type is its only
    /// implementer.
    pub fn implementers(&self, type_name: &str) -> Vec<&ObjectType> {
        match self.get(type_name) {
            Some(ty) if !ty.is_interface() => vec![ty],
            Some(_) => self
                .types
                .values()
                .filter(|ty| !ty.is_interface())
                .filter(|ty| self.ancestors(&ty.name).iter().any(|ancestor| ancestor.name == type_name))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Types stored in the graph, `@remote` ones excluded.
    pub fn stored_types(&self) -> impl Iterator<Item = &ObjectType> + '_ {
        self.types.values().filter(|ty| !ty.is_remote())
    }

    pub(crate) fn build(document: &ServiceDocument, ctx: &mut VisitorContext<'_>) -> Result<Self, Vec<RuleError>> {
        let mut schema = Schema::default();
        let mut take = |type_name: &str, field: Option<&str>| {
            ctx.directives
                .remove(&DirectiveOwner {
                    type_name: type_name.to_string(),
                    field: field.map(str::to_string),
                })
                .unwrap_or_default()
        };

        // Own fields first; inheritance is resolved once every type is known.
        let mut own_fields: IndexMap<String, Vec<Field>> = IndexMap::new();

        for definition in &document.definitions {
            let TypeSystemDefinition::Type(ty) = definition else {
                continue;
            };
            let name = ty.node.name.node.to_string();

            let (kind, implements, fields) = match &ty.node.kind {
                ParsedTypeKind::Object(object) => (TypeKind::Object, &object.implements, &object.fields),
                ParsedTypeKind::Interface(interface) => (TypeKind::Interface, &interface.implements, &interface.fields),
                ParsedTypeKind::Enum(enum_type) => {
                    schema.enums.insert(
                        name.clone(),
                        EnumType {
                            name,
                            values: enum_type.values.iter().map(|value| value.node.value.node.to_string()).collect(),
                            pos: ty.pos,
                            source_directives: ty.node.directives.iter().map(|d| d.node.clone()).collect(),
                        },
                    );
                    continue;
                }
                _ => continue,
            };

            let directives = take(&name, None);
            let storage_name = directives
                .iter()
                .find_map(|directive| match &directive.node {
                    SchemaDirective::Dgraph(dgraph) => dgraph.r#type.clone(),
                    _ => None,
                })
                .unwrap_or_else(|| name.clone());

            let fields = fields
                .iter()
                .map(|field| {
                    let field_name = field.node.name.node.to_string();
                    let directives = take(&name, Some(&field_name));
                    let predicate = directives
                        .iter()
                        .find_map(|directive| match &directive.node {
                            SchemaDirective::Dgraph(dgraph) => dgraph.pred.clone(),
                            _ => None,
                        })
                        .unwrap_or_else(|| format!("{storage_name}.{field_name}"));

                    Field {
                        ty: FieldType::from_parsed(&field.node.ty.node),
                        owner: name.clone(),
                        predicate,
                        pos: field.pos,
                        description: field.node.description.as_ref().map(|d| d.node.clone()),
                        directives,
                        source: field.clone(),
                        name: field_name,
                    }
                })
                .collect();

            own_fields.insert(name.clone(), fields);
            schema.types.insert(
                name.clone(),
                ObjectType {
                    name,
                    kind,
                    implements: implements.iter().map(|name| name.node.to_string()).collect(),
                    fields: Vec::new(),
                    pos: ty.pos,
                    description: ty.node.description.as_ref().map(|d| d.node.clone()),
                    directives,
                    source_directives: ty.node.directives.iter().map(|d| d.node.clone()).collect(),
                },
            );
        }

        let errors = schema.resolve_inheritance(own_fields);
        if errors.is_empty() {
            Ok(schema)
        } else {
            Err(errors)
        }
    }

    fn resolve_inheritance(&mut self, own_fields: IndexMap<String, Vec<Field>>) -> Vec<RuleError> {
        let mut errors = Vec::new();

        for ty in self.types.values() {
            for interface in &ty.implements {
                match self.types.get(interface) {
                    Some(target) if target.is_interface() => {}
                    Some(_) => errors.push(RuleError::at(
                        ty.pos,
                        format!("Type {} implements {interface}, which is not an interface.", ty.name),
                    )),
                    None => errors.push(RuleError::at(
                        ty.pos,
                        format!("Type {} implements unknown interface {interface}.", ty.name),
                    )),
                }
            }
        }

        if let Some(cycle) = self.types.values().find(|ty| self.implements_itself(&ty.name)) {
            errors.push(RuleError::at(
                cycle.pos,
                format!("Interface {} implements itself.", cycle.name),
            ));
        }

        if !errors.is_empty() {
            return errors;
        }

        let names: Vec<String> = self.types.keys().cloned().collect();
        for name in names {
            let mut fields: Vec<Field> = Vec::new();

            // Ancestors are listed nearest first; fields of the furthest interface come first.
            for ancestor in self.ancestors(&name).into_iter().rev() {
                for field in own_fields.get(&ancestor.name).into_iter().flatten() {
                    if !fields.iter().any(|known| known.name == field.name) {
                        fields.push(field.clone());
                    }
                }
            }

            for field in own_fields.get(&name).into_iter().flatten().cloned() {
                match fields.iter().find(|inherited| inherited.name == field.name) {
                    Some(inherited) if inherited.ty != field.ty => errors.push(RuleError::new(
                        vec![field.pos, inherited.pos],
                        format!(
                            "Field {name}.{} is declared as {} but {} declares it as {}.",
                            field.name, field.ty, inherited.owner, inherited.ty
                        ),
                    )),
                    Some(_) => {}
                    None => fields.push(field),
                }
            }

            if let Some(ty) = self.types.get_mut(&name) {
                ty.fields = fields;
            }
        }

        errors
    }

    fn implements_itself(&self, name: &str) -> bool {
        let mut seen = HashSet::new();
        let mut pending: Vec<&str> = self
            .get(name)
            .map(|ty| ty.implements.iter().map(String::as_str).collect())
            .unwrap_or_default();

        while let Some(current) = pending.pop() {
            if current == name {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            if let Some(ty) = self.get(current) {
                pending.extend(ty.implements.iter().map(String::as_str));
            }
        }

        false
    }
}
