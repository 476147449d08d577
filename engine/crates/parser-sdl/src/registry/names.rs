pub const INPUT_ARG_FILTER: &str = "filter";
pub const INPUT_ARG_ORDER: &str = "order";
pub const INPUT_ARG_FIRST: &str = "first";
pub const INPUT_ARG_OFFSET: &str = "offset";
pub const INPUT_ARG_INPUT: &str = "input";
pub const INPUT_ARG_UPSERT: &str = "upsert";

pub const INPUT_FIELD_ID: &str = "id";
pub const INPUT_FIELD_HAS: &str = "has";
pub const INPUT_FIELD_AND: &str = "and";
pub const INPUT_FIELD_OR: &str = "or";
pub const INPUT_FIELD_NOT: &str = "not";
pub const INPUT_FIELD_SET: &str = "set";
pub const INPUT_FIELD_REMOVE: &str = "remove";

pub const INPUT_FIELD_ORDER_ASC: &str = "asc";
pub const INPUT_FIELD_ORDER_DESC: &str = "desc";
pub const INPUT_FIELD_ORDER_THEN: &str = "then";

pub const INPUT_FIELD_RANGE_MIN: &str = "min";
pub const INPUT_FIELD_RANGE_MAX: &str = "max";

pub const OUTPUT_FIELD_NUM_UIDS: &str = "numUids";
pub const OUTPUT_FIELD_MSG: &str = "msg";
pub const OUTPUT_FIELD_COUNT: &str = "count";

pub const DELETE_MESSAGE: &str = "Deleted";

pub struct MetaNames;

/// CONVENTIONS:
///     - Generated types, inputs and enums use the type name as prefix or suffix,
///       `Add`/`Update`/`Delete` inputs and payloads take it in the middle.
///     - Root fields are camelCase: the operation verb followed by the type name.
impl MetaNames {
    /// `Author.posts` is exposed on results as `posts`, the type itself as `author`.
    pub fn entity_field(type_name: &str) -> String {
        let mut chars = type_name.chars();
        match chars.next() {
            Some(first) => first.to_lowercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    pub fn query_get(type_name: &str) -> String {
        format!("get{type_name}")
    }

    pub fn query_collection(type_name: &str) -> String {
        format!("query{type_name}")
    }

    pub fn query_aggregate(type_name: &str) -> String {
        format!("aggregate{type_name}")
    }

    pub fn query_check_password(type_name: &str) -> String {
        format!("check{type_name}Password")
    }

    pub fn mutation_add(type_name: &str) -> String {
        format!("add{type_name}")
    }

    pub fn mutation_update(type_name: &str) -> String {
        format!("update{type_name}")
    }

    pub fn mutation_delete(type_name: &str) -> String {
        format!("delete{type_name}")
    }

    pub fn add_input(type_name: &str) -> String {
        format!("Add{type_name}Input")
    }

    pub fn update_input(type_name: &str) -> String {
        format!("Update{type_name}Input")
    }

    pub fn patch_input(type_name: &str) -> String {
        format!("{type_name}Patch")
    }

    pub fn ref_input(type_name: &str) -> String {
        format!("{type_name}Ref")
    }

    pub fn filter_input(type_name: &str) -> String {
        format!("{type_name}Filter")
    }

    pub fn order_input(type_name: &str) -> String {
        format!("{type_name}Order")
    }

    pub fn orderable_enum(type_name: &str) -> String {
        format!("{type_name}Orderable")
    }

    pub fn has_filter_enum(type_name: &str) -> String {
        format!("{type_name}HasFilter")
    }

    pub fn aggregate_result(type_name: &str) -> String {
        format!("{type_name}AggregateResult")
    }

    pub fn add_payload(type_name: &str) -> String {
        format!("Add{type_name}Payload")
    }

    pub fn update_payload(type_name: &str) -> String {
        format!("Update{type_name}Payload")
    }

    pub fn delete_payload(type_name: &str) -> String {
        format!("Delete{type_name}Payload")
    }

    pub fn range_input(scalar: &str) -> String {
        format!("{scalar}Range")
    }

    /// `postsAggregate` next to a `posts` list of objects.
    pub fn aggregate_field(field_name: &str) -> String {
        format!("{field_name}Aggregate")
    }

    pub fn aggregate_min(field_name: &str) -> String {
        format!("{field_name}Min")
    }

    pub fn aggregate_max(field_name: &str) -> String {
        format!("{field_name}Max")
    }

    pub fn aggregate_sum(field_name: &str) -> String {
        format!("{field_name}Sum")
    }

    pub fn aggregate_avg(field_name: &str) -> String {
        format!("{field_name}Avg")
    }
}
