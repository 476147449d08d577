use std::collections::BTreeMap;

use itertools::Itertools;

use super::{
    builtins,
    names::*,
    render::{self, Block, Definition, Section},
    search::FieldFilter,
};
use crate::{
    model::{Field, FieldClass, FieldType, ObjectType, Schema, FLOAT_SCALAR, ID_SCALAR, STRING_SCALAR},
    rules::visitor::{MUTATION_TYPE, QUERY_TYPE, SUBSCRIPTION_TYPE},
};

/// What a generated root field does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, strum::Display)]
#[strum(serialize_all = "camelCase")]
pub enum RootFieldKind {
    Get,
    Query,
    Aggregate,
    CheckPassword,
    Add,
    Update,
    Delete,
}

impl RootFieldKind {
    pub fn is_mutation(self) -> bool {
        matches!(self, RootFieldKind::Add | RootFieldKind::Update | RootFieldKind::Delete)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct RootField {
    pub type_name: String,
    pub kind: RootFieldKind,
}

/// The generated schema text and the query and mutation root fields it declares.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GeneratedSchema {
    pub sdl: String,
    pub root_fields: BTreeMap<String, RootField>,
}

impl GeneratedSchema {
    pub fn root_field(&self, name: &str) -> Option<&RootField> {
        self.root_fields.get(name)
    }
}

pub(crate) fn generate(schema: &Schema) -> GeneratedSchema {
    let mut generator = Generator {
        schema,
        types: BTreeMap::new(),
        enums: BTreeMap::new(),
        inputs: BTreeMap::new(),
        query: Block::new("type", QUERY_TYPE),
        mutation: Block::new("type", MUTATION_TYPE),
        subscription: Block::new("type", SUBSCRIPTION_TYPE),
        root_fields: BTreeMap::new(),
    };

    for ty in schema.stored_types() {
        generator.add_type(ty);
    }

    let Generator {
        types,
        enums,
        inputs,
        query,
        mutation,
        subscription,
        root_fields,
        ..
    } = generator;

    let mut sections = vec![
        Section::in_order("Input Schema", input_schema(schema)),
        Section::sorted("Extended Definitions", builtins::definitions()),
        Section::sorted("Generated Types", types.into_values()),
        Section::sorted("Generated Enums", enums.into_values()),
        Section::sorted("Generated Inputs", inputs.into_values()),
        Section::sorted("Generated Query", non_empty(query)),
        Section::sorted("Generated Mutations", non_empty(mutation)),
    ];
    if !subscription.is_empty() {
        sections.push(Section::sorted("Generated Subscriptions", non_empty(subscription)));
    }

    GeneratedSchema {
        sdl: render::render(sections),
        root_fields,
    }
}

fn non_empty(block: Block) -> Option<Definition> {
    (!block.is_empty()).then(|| block.finish())
}

struct Generator<'a> {
    schema: &'a Schema,
    types: BTreeMap<String, Definition>,
    enums: BTreeMap<String, Definition>,
    inputs: BTreeMap<String, Definition>,
    query: Block,
    mutation: Block,
    subscription: Block,
    root_fields: BTreeMap<String, RootField>,
}

impl<'a> Generator<'a> {
    fn add_type(&mut self, ty: &'a ObjectType) {
        let name = ty.name.as_str();
        let generate = ty.generate();
        let data_fields: Vec<&Field> = ty.stored_fields().filter(|field| !field.is_id()).collect();
        let orderable = orderable_fields(self.schema, ty);

        self.add_filter(ty, &data_fields);

        if !orderable.is_empty() {
            let mut order = Block::new("input", MetaNames::order_input(name));
            order.field(INPUT_FIELD_ORDER_ASC, &[], MetaNames::orderable_enum(name));
            order.field(INPUT_FIELD_ORDER_DESC, &[], MetaNames::orderable_enum(name));
            order.field(INPUT_FIELD_ORDER_THEN, &[], MetaNames::order_input(name));
            self.insert_input(order);

            let mut orderable_enum = Block::new("enum", MetaNames::orderable_enum(name));
            for field in &orderable {
                orderable_enum.member(field.name.as_str());
            }
            self.insert_enum(orderable_enum);
        }

        self.add_aggregate_result(ty, &orderable);

        if !ty.is_interface() {
            let mut add = Block::new("input", MetaNames::add_input(name));
            for field in &data_fields {
                if let Some(input) = self.input_type(field) {
                    add.field(&field.name, &[], input);
                }
            }
            if let Some(secret) = ty.secret() {
                add.field(&secret.field, &[], format!("{STRING_SCALAR}!"));
            }
            self.insert_input(add);
        }

        let mut patch = Block::new("input", MetaNames::patch_input(name));
        for field in &data_fields {
            if let Some(input) = self.input_type(field) {
                patch.field(&field.name, &[], input.optional());
            }
        }
        if let Some(secret) = ty.secret() {
            patch.field(&secret.field, &[], STRING_SCALAR);
        }
        let has_patch = !patch.is_empty();
        if has_patch {
            self.insert_input(patch);
        }

        if has_reference(ty) {
            let mut reference = Block::new("input", MetaNames::ref_input(name));
            if ty.id_field().is_some() {
                reference.field(INPUT_FIELD_ID, &[], ID_SCALAR);
            }
            // References to an interface only identify an existing implementer.
            let fields: Vec<&Field> = if ty.is_interface() {
                ty.xid_fields().collect()
            } else {
                data_fields.clone()
            };
            for field in fields {
                if let Some(input) = self.input_type(field) {
                    reference.field(&field.name, &[], input.optional());
                }
            }
            self.insert_input(reference);
        }

        if generate.mutation.update {
            let mut update = Block::new("input", MetaNames::update_input(name));
            update.field(INPUT_ARG_FILTER, &[], format!("{}!", MetaNames::filter_input(name)));
            if has_patch {
                update.field(INPUT_FIELD_SET, &[], MetaNames::patch_input(name));
                update.field(INPUT_FIELD_REMOVE, &[], MetaNames::patch_input(name));
            }
            self.insert_input(update);
        }

        self.add_root_fields(ty);
    }

    fn add_filter(&mut self, ty: &ObjectType, data_fields: &[&Field]) {
        let name = ty.name.as_str();
        let mut filter = Block::new("input", MetaNames::filter_input(name));

        if ty.id_field().is_some() {
            filter.field(INPUT_FIELD_ID, &[], format!("[{ID_SCALAR}!]"));
        }

        for field in ty.stored_fields() {
            let Some(field_filter) = FieldFilter::for_field(self.schema, field) else {
                continue;
            };
            filter.field(&field.name, &[], &field_filter.name);
            if !field_filter.is_builtin() {
                self.inputs.insert(field_filter.name.clone(), field_filter.definition());
            }
        }

        if !data_fields.is_empty() {
            let mut has = Block::new("enum", MetaNames::has_filter_enum(name));
            for field in data_fields {
                has.member(field.name.as_str());
            }
            self.insert_enum(has);
            filter.field(INPUT_FIELD_HAS, &[], format!("[{}]", MetaNames::has_filter_enum(name)));
        }

        filter.field(INPUT_FIELD_AND, &[], format!("[{}]", MetaNames::filter_input(name)));
        filter.field(INPUT_FIELD_OR, &[], format!("[{}]", MetaNames::filter_input(name)));
        filter.field(INPUT_FIELD_NOT, &[], MetaNames::filter_input(name));

        self.insert_input(filter);
    }

    fn add_aggregate_result(&mut self, ty: &ObjectType, orderable: &[&Field]) {
        let mut result = Block::new("type", MetaNames::aggregate_result(&ty.name));
        result.field(OUTPUT_FIELD_COUNT, &[], "Int");

        for field in orderable {
            result.field(&MetaNames::aggregate_min(&field.name), &[], &field.ty.name);
            result.field(&MetaNames::aggregate_max(&field.name), &[], &field.ty.name);
            if self.schema.classify(&field.ty).is_numeric() {
                result.field(&MetaNames::aggregate_sum(&field.name), &[], &field.ty.name);
                result.field(&MetaNames::aggregate_avg(&field.name), &[], FLOAT_SCALAR);
            }
        }

        self.insert_type(result);
    }

    fn add_root_fields(&mut self, ty: &ObjectType) {
        let name = ty.name.as_str();
        let generate = ty.generate();
        let identifiers = identifier_arguments(self.schema, ty);
        let collection = collection_arguments(self.schema, ty);
        let filter_only = vec![(INPUT_ARG_FILTER.to_string(), MetaNames::filter_input(name))];

        let mut readers = Vec::new();
        if generate.query.get && !identifiers.is_empty() {
            readers.push((RootFieldKind::Get, MetaNames::query_get(name), identifiers.clone(), name.to_string()));
        }
        if generate.query.query {
            readers.push((
                RootFieldKind::Query,
                MetaNames::query_collection(name),
                collection.clone(),
                format!("[{name}]"),
            ));
        }
        if generate.query.aggregate {
            readers.push((
                RootFieldKind::Aggregate,
                MetaNames::query_aggregate(name),
                filter_only.clone(),
                MetaNames::aggregate_result(name),
            ));
        }

        for (kind, field_name, arguments, output) in &readers {
            self.query.field(field_name, arguments, output);
            if ty.with_subscription() {
                self.subscription.field(field_name, arguments, output);
            }
            self.register(field_name.clone(), ty, *kind);
        }

        if let Some(secret) = ty.secret() {
            if generate.query.password && !identifiers.is_empty() {
                let field_name = MetaNames::query_check_password(name);
                let mut arguments = identifiers.clone();
                arguments.push((secret.field.clone(), format!("{STRING_SCALAR}!")));
                self.query.field(&field_name, &arguments, name);
                self.register(field_name, ty, RootFieldKind::CheckPassword);
            }
        }

        if !ty.is_interface() && generate.mutation.add {
            let field_name = MetaNames::mutation_add(name);
            let mut arguments = vec![(INPUT_ARG_INPUT.to_string(), format!("[{}!]!", MetaNames::add_input(name)))];
            if ty.xid_fields().next().is_some() {
                arguments.push((INPUT_ARG_UPSERT.to_string(), "Boolean".to_string()));
            }
            self.mutation.field(&field_name, &arguments, MetaNames::add_payload(name));
            self.insert_payload(ty, MetaNames::add_payload(name), false);
            self.register(field_name, ty, RootFieldKind::Add);
        }

        if generate.mutation.update {
            let field_name = MetaNames::mutation_update(name);
            let arguments = [(INPUT_ARG_INPUT.to_string(), format!("{}!", MetaNames::update_input(name)))];
            self.mutation.field(&field_name, &arguments, MetaNames::update_payload(name));
            self.insert_payload(ty, MetaNames::update_payload(name), false);
            self.register(field_name, ty, RootFieldKind::Update);
        }

        if generate.mutation.delete {
            let field_name = MetaNames::mutation_delete(name);
            let arguments = [(INPUT_ARG_FILTER.to_string(), format!("{}!", MetaNames::filter_input(name)))];
            self.mutation.field(&field_name, &arguments, MetaNames::delete_payload(name));
            self.insert_payload(ty, MetaNames::delete_payload(name), true);
            self.register(field_name, ty, RootFieldKind::Delete);
        }
    }

    fn insert_payload(&mut self, ty: &ObjectType, payload_name: String, with_message: bool) {
        let mut payload = Block::new("type", payload_name);
        payload.field(
            &MetaNames::entity_field(&ty.name),
            &collection_arguments(self.schema, ty),
            format!("[{}]", ty.name),
        );
        if with_message {
            payload.field(OUTPUT_FIELD_MSG, &[], STRING_SCALAR);
        }
        payload.field(OUTPUT_FIELD_NUM_UIDS, &[], "Int");
        self.insert_type(payload);
    }

    fn register(&mut self, field_name: String, ty: &ObjectType, kind: RootFieldKind) {
        self.root_fields.insert(
            field_name,
            RootField {
                type_name: ty.name.clone(),
                kind,
            },
        );
    }

    /// Type of a field inside add, patch and reference inputs; edges take a reference input.
    fn input_type(&self, field: &Field) -> Option<FieldType> {
        match self.schema.classify(&field.ty) {
            FieldClass::Object => self
                .schema
                .get(&field.ty.name)
                .filter(|target| has_reference(target))
                .map(|target| field.ty.with_name(MetaNames::ref_input(&target.name))),
            FieldClass::Unknown => None,
            _ => Some(field.ty.clone()),
        }
    }

    fn insert_type(&mut self, block: Block) {
        let definition = block.finish();
        self.types.insert(definition.name.clone(), definition);
    }

    fn insert_enum(&mut self, block: Block) {
        let definition = block.finish();
        self.enums.insert(definition.name.clone(), definition);
    }

    fn insert_input(&mut self, block: Block) {
        let definition = block.finish();
        self.inputs.insert(definition.name.clone(), definition);
    }
}

/// Interfaces without identifying fields cannot be referenced.
fn has_reference(ty: &ObjectType) -> bool {
    !ty.is_remote() && (!ty.is_interface() || ty.id_field().is_some() || ty.xid_fields().next().is_some())
}

fn orderable_fields<'a>(schema: &Schema, ty: &'a ObjectType) -> Vec<&'a Field> {
    ty.stored_fields()
        .filter(|field| !field.ty.is_list() && schema.classify(&field.ty).is_orderable())
        .collect()
}

/// `getT` arguments: the `ID` field and every `@id` field, required only when alone.
fn identifier_arguments(schema: &Schema, ty: &ObjectType) -> Vec<(String, String)> {
    let identifiers: Vec<&Field> = ty
        .fields
        .iter()
        .filter(|field| !field.ty.is_list() && (field.is_id() || (field.is_xid() && !field.is_custom())))
        .collect();
    let required = if identifiers.len() == 1 { "!" } else { "" };

    identifiers
        .into_iter()
        .map(|field| {
            let scalar = match schema.classify(&field.ty) {
                FieldClass::Id => ID_SCALAR,
                _ => field.ty.name.as_str(),
            };
            (field.name.clone(), format!("{scalar}{required}"))
        })
        .collect()
}

fn collection_arguments(schema: &Schema, ty: &ObjectType) -> Vec<(String, String)> {
    let mut arguments = vec![(INPUT_ARG_FILTER.to_string(), MetaNames::filter_input(&ty.name))];
    if !orderable_fields(schema, ty).is_empty() {
        arguments.push((INPUT_ARG_ORDER.to_string(), MetaNames::order_input(&ty.name)));
    }
    arguments.push((INPUT_ARG_FIRST.to_string(), "Int".to_string()));
    arguments.push((INPUT_ARG_OFFSET.to_string(), "Int".to_string()));
    arguments
}

/// The user types as declared, with inherited fields listed and edge arguments added.
fn input_schema(schema: &Schema) -> Vec<Definition> {
    let mut definitions = Vec::new();

    for ty in schema.types.values() {
        let keyword = if ty.is_interface() { "interface" } else { "type" };
        let mut block = Block::new(keyword, ty.name.as_str())
            .description(ty.description.as_deref())
            .implements(&ty.implements)
            .directives(&ty.source_directives);

        for field in &ty.fields {
            let target = schema
                .get(&field.ty.name)
                .filter(|target| !ty.is_remote() && !target.is_remote() && !field.is_custom());

            let arguments = match target {
                Some(target) if field.ty.is_list() => collection_arguments(schema, target),
                Some(target) => vec![(INPUT_ARG_FILTER.to_string(), MetaNames::filter_input(&target.name))],
                None => field
                    .source
                    .node
                    .arguments
                    .iter()
                    .map(|argument| (argument.node.name.node.to_string(), argument.node.ty.node.to_string()))
                    .collect(),
            };
            let directives = field.source_directives().map(render::directive).collect_vec();

            block.described_field(
                field.description.as_deref(),
                render::field(&field.name, &arguments, &field.ty, &directives),
            );

            if let Some(target) = target.filter(|_| field.ty.is_list()) {
                block.field(
                    &MetaNames::aggregate_field(&field.name),
                    &[(INPUT_ARG_FILTER.to_string(), MetaNames::filter_input(&target.name))],
                    MetaNames::aggregate_result(&target.name),
                );
            }
        }

        definitions.push(block.finish());
    }

    for enum_type in schema.enums.values() {
        let mut block = Block::new("enum", enum_type.name.as_str()).directives(&enum_type.source_directives);
        for value in &enum_type.values {
            block.member(value.as_str());
        }
        definitions.push(block.finish());
    }

    definitions
}
