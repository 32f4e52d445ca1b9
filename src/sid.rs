//! Resolution of subject field values into [`Subject`]s.

use std::convert::Infallible;
use std::sync::Arc;

use tracing::debug;

use crate::cache::PublishOnceCache;
use crate::error::AclError;
use crate::metadata::SubjectFieldRule;
use crate::schema::{FieldMarker, SchemaRegistry};
use crate::types::{Record, Subject, SubjectKind, Value, ValueShape};

/// The field of a nested type that holds the ultimate subject identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectMarker {
    pub field: String,
    pub kind: SubjectKind,
}

/// Turns the runtime value behind a [`SubjectFieldRule`] into a list of subjects.
///
/// Nested subject-marker lookups are cached per type tag.
#[derive(Debug)]
pub struct SidResolver {
    registry: Arc<SchemaRegistry>,
    markers: PublishOnceCache<Option<SubjectMarker>>,
}

impl SidResolver {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            markers: PublishOnceCache::new(),
        }
    }

    /// Resolve the subjects named by `rule` on `record`.
    ///
    /// An absent or null value yields no subjects.
    pub fn resolve(
        &self,
        record: &Record,
        rule: &SubjectFieldRule,
    ) -> Result<Vec<Subject>, AclError> {
        let field = rule.locator.describe();
        let ctx = Context {
            type_tag: record.type_tag(),
            field: &field,
        };

        let located = rule.locator.locate(record).map_err(|found| {
            ctx.unresolvable(format!("path passes through a {} value", found.kind()))
        })?;
        let Some(value) = located.filter(|v| !v.is_null()) else {
            return Ok(Vec::new());
        };

        let shape = match rule.shape {
            Some(shape) => shape,
            None => ValueShape::classify(value).ok_or_else(|| {
                ctx.unresolvable(format!("a {} value cannot name a subject", value.kind()))
            })?,
        };

        let subjects: Vec<Subject> = match (shape, value) {
            (ValueShape::Scalar, value) if value.is_scalar() => {
                let kind = rule.subject_kind.ok_or_else(|| ctx.ambiguous())?;
                vec![Subject::new(kind, ctx.scalar(value)?)]
            }
            (ValueShape::Sequence, Value::Sequence(items))
            | (ValueShape::Array, Value::Array(items)) => {
                self.resolve_elements(&ctx, items, rule.subject_kind)?
            }
            (ValueShape::Nested, Value::Record(nested)) => {
                let marker = self.marker_for(&ctx, nested.type_tag())?;
                self.resolve_marked(&ctx, nested, &marker)?
                    .into_iter()
                    .collect::<Vec<_>>()
            }
            (shape, value) => {
                return Err(ctx.unresolvable(format!(
                    "expected a {} value, found {}",
                    shape.to_string().to_lowercase(),
                    value.kind()
                )));
            }
        };

        debug!(
            event = "Sid",
            phase = "Resolved",
            type_tag = ctx.type_tag,
            field = ctx.field,
            shape = %shape,
            subjects = subjects.len()
        );

        Ok(subjects)
    }

    /// Number of element types whose subject marker has been looked up.
    pub fn cached_markers(&self) -> usize {
        self.markers.len()
    }

    /// Sequence and array elements. The first element decides the strategy for all.
    fn resolve_elements(
        &self,
        ctx: &Context<'_>,
        items: &[Value],
        kind: Option<SubjectKind>,
    ) -> Result<Vec<Subject>, AclError> {
        let Some(first) = items.iter().find(|v| !v.is_null()) else {
            return Ok(Vec::new());
        };

        if first.is_scalar() {
            let kind = kind.ok_or_else(|| ctx.ambiguous())?;
            return items
                .iter()
                .filter(|v| !v.is_null())
                .map(|item| ctx.scalar(item).map(|name| Subject::new(kind, name)))
                .collect();
        }

        let Some(first_record) = first.as_record() else {
            return Err(ctx.unresolvable(format!(
                "collection elements of kind {} cannot name a subject",
                first.kind()
            )));
        };
        let marker = self.marker_for(ctx, first_record.type_tag())?;

        let mut subjects = Vec::with_capacity(items.len());
        for item in items.iter().filter(|v| !v.is_null()) {
            let element = item.as_record().ok_or_else(|| {
                ctx.unresolvable(format!(
                    "expected every element to be a record, found {}",
                    item.kind()
                ))
            })?;
            subjects.extend(self.resolve_marked(ctx, element, &marker)?);
        }
        Ok(subjects)
    }

    fn resolve_marked(
        &self,
        ctx: &Context<'_>,
        record: &Record,
        marker: &SubjectMarker,
    ) -> Result<Option<Subject>, AclError> {
        match record.get(&marker.field) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(Subject::new(marker.kind, ctx.scalar(value)?))),
        }
    }

    fn marker_for(&self, ctx: &Context<'_>, type_tag: &str) -> Result<SubjectMarker, AclError> {
        let marker = self
            .markers
            .get_or_try_insert_with(type_tag, || {
                let marker = self.find_marker(type_tag);
                debug!(
                    event = "Sid",
                    phase = "MarkerPublished",
                    type_tag,
                    found = marker.is_some()
                );
                Ok::<_, Infallible>(marker)
            })
            .unwrap_or_else(|never| match never {});

        marker.ok_or_else(|| {
            ctx.unresolvable(format!("no subject marker field on type '{type_tag}'"))
        })
    }

    fn find_marker(&self, type_tag: &str) -> Option<SubjectMarker> {
        self.registry
            .fields(type_tag)?
            .into_iter()
            .find_map(|field| {
                field.markers.iter().find_map(|marker| match marker {
                    FieldMarker::SubjectMarker { subject_kind } => Some(SubjectMarker {
                        field: field.name.clone(),
                        kind: *subject_kind,
                    }),
                    _ => None,
                })
            })
    }
}

struct Context<'a> {
    type_tag: &'a str,
    field: &'a str,
}

impl Context<'_> {
    fn unresolvable(&self, reason: String) -> AclError {
        AclError::unresolvable(self.type_tag, self.field, reason)
    }

    fn ambiguous(&self) -> AclError {
        AclError::AmbiguousSubjectKind {
            type_tag: self.type_tag.to_string(),
            field: self.field.to_string(),
        }
    }

    fn scalar(&self, value: &Value) -> Result<String, AclError> {
        value.scalar_text().ok_or_else(|| {
            self.unresolvable(format!(
                "subject identifier must be a scalar, found {}",
                value.kind()
            ))
        })
    }
}
