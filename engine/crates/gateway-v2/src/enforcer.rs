use common_types::{auth::AuthOperation, Claims};
use gateway_v2_auth_config::EnforcementMode;
use parser_sdl::model::ObjectType;
use runtime::Predicate;

use crate::{rules, snapshot::SchemaSnapshot, Error};

/// The rules of one snapshot, evaluated for one caller.
///
/// Both enforcement modes compute the same predicates. They only differ in what a rejection
/// turns into: nothing at all, or an error in the response.
pub(crate) struct Enforcer<'a> {
    snapshot: &'a SchemaSnapshot,
    claims: &'a Claims,
    mode: EnforcementMode,
}

impl<'a> Enforcer<'a> {
    pub(crate) fn new(snapshot: &'a SchemaSnapshot, claims: &'a Claims, mode: EnforcementMode) -> Self {
        Enforcer { snapshot, claims, mode }
    }

    pub(crate) fn mode(&self) -> EnforcementMode {
        self.mode
    }

    /// The predicate entities of `ty` must satisfy for `operation`. Entities reached through an
    /// interface are checked against the rule of their concrete type.
    pub(crate) fn rule(&self, ty: &ObjectType, operation: AuthOperation) -> Predicate {
        if !ty.is_interface() {
            return self.own_rule(ty, operation);
        }

        if !self.is_restricted(ty, operation) {
            return Predicate::True;
        }

        Predicate::or(self.snapshot.schema.implementers(&ty.name).into_iter().map(|implementer| {
            Predicate::and([
                Predicate::Type(implementer.storage_name().to_string()),
                self.own_rule(implementer, operation),
            ])
        }))
    }

    fn own_rule(&self, ty: &ObjectType, operation: AuthOperation) -> Predicate {
        match self.snapshot.auth.rule(&ty.name, operation) {
            Some(rule) => rules::lower(self.snapshot, rule, self.claims),
            None => Predicate::True,
        }
    }

    pub(crate) fn is_restricted(&self, ty: &ObjectType, operation: AuthOperation) -> bool {
        self.snapshot
            .schema
            .implementers(&ty.name)
            .into_iter()
            .any(|implementer| self.snapshot.auth.is_restricted(&implementer.name, operation))
    }

    /// Applies the policy to a rejected operation: `Some` when the caller must be told.
    pub(crate) fn reject(&self, error: Error) -> Option<Error> {
        match self.mode {
            EnforcementMode::Silent => {
                tracing::debug!("rejected silently: {error}");
                None
            }
            EnforcementMode::Diagnostic => {
                tracing::debug!("rejected: {error}");
                Some(error)
            }
        }
    }
}
