//! Surrogate synthesis: one target type in, one [`GenerationUnit`] out.
//!
//! The surrogate mirrors the target's visible fields verbatim. All value
//! transformation lives in the serializers attached to those fields; the two
//! conversions only move fields across by name.
use indexmap::IndexSet;
use tracing::debug;

use crate::ir::{
    AsPlan, Conversion, FieldDecl, GenerationUnit, MappedSerializerSpec, SerializerRef, SurrogateField,
    SurrogateType, TypeExpr, TypeName,
};
use crate::resolve::{builtins, ResolutionContext};

/// Build the unit for `target`, or `None` if it has no eligible fields.
pub fn synthesize(ctx: &ResolutionContext<'_>, target: &TypeName, fields: &[FieldDecl]) -> Option<GenerationUnit> {
    let (eligible, omitted): (Vec<&FieldDecl>, Vec<&FieldDecl>) =
        fields.iter().partition(|f| f.visibility.is_eligible());
    if eligible.is_empty() {
        return None;
    }

    let mut used_on_properties = IndexSet::<SerializerRef>::new();
    let mut needed_in_file = IndexSet::<SerializerRef>::new();
    let mut surrogate_fields = Vec::with_capacity(eligible.len());

    for field in &eligible {
        let attached = ctx.resolve(&field.ty, Some((target, field.name.as_str())));
        if let Some(found) = &attached {
            used_on_properties.insert(found.clone());
        }
        needed_in_file.extend(ctx.collect_all(&field.ty));

        let plan = plan_field(ctx, &field.ty, attached.as_ref());
        surrogate_fields.push(SurrogateField {
            name: field.name.clone(),
            ty: field.ty.clone(),
            attached,
            plan,
        });
    }

    let file_scope = needed_in_file
        .iter()
        .filter(|found| !used_on_properties.contains(*found))
        .cloned()
        .collect::<Vec<_>>();
    let imports = used_on_properties.union(&needed_in_file).cloned().collect::<Vec<_>>();

    let surrogate_name = ctx.surrogate_name(target);
    let field_names = surrogate_fields.iter().map(|f| f.name.clone()).collect::<Vec<_>>();
    let serializer = MappedSerializerSpec {
        name: ctx.derived_ref(target).name,
        to_surrogate: Conversion {
            from: target.clone(),
            to: surrogate_name.clone(),
            fields: field_names.clone(),
        },
        from_surrogate: Conversion {
            from: surrogate_name.clone(),
            to: target.clone(),
            fields: field_names,
        },
        omitted: omitted.iter().map(|f| f.name.clone()).collect(),
        imports,
    };

    debug!(
        %target,
        fields = surrogate_fields.len(),
        omitted = serializer.omitted.len(),
        file_scope = file_scope.len(),
        "synthesized surrogate"
    );

    Some(GenerationUnit {
        target: target.clone(),
        surrogate: SurrogateType { name: surrogate_name, fields: surrogate_fields, file_scope },
        serializer,
    })
}

/// Serializer plan for a field: the attached serializer at the root, class or
/// derived serializers below it.
pub fn plan_field(ctx: &ResolutionContext<'_>, ty: &TypeExpr, attached: Option<&SerializerRef>) -> AsPlan {
    let core = match attached {
        Some(found) => AsPlan::Use { serializer: found.clone() },
        None => plan_args(ctx, ty),
    };
    core.wrap_nullable(ty.nullable)
}

fn plan_nested(ctx: &ResolutionContext<'_>, ty: &TypeExpr) -> AsPlan {
    let core = match ctx.resolve(ty, None) {
        Some(found) => AsPlan::Use { serializer: found },
        None => plan_args(ctx, ty),
    };
    core.wrap_nullable(ty.nullable)
}

/// Only built-in containers get a generic adapter; a native user generic is
/// handed to serde whole, so its arguments cannot carry serializers.
fn plan_args(ctx: &ResolutionContext<'_>, ty: &TypeExpr) -> AsPlan {
    if builtins::container_kind(&ty.name).is_none() {
        return AsPlan::Native;
    }
    let args = ty.args.iter().map(|arg| plan_nested(ctx, arg)).collect::<Vec<_>>();
    if args.iter().all(AsPlan::is_native) {
        AsPlan::Native
    } else {
        AsPlan::Generic { name: ty.name.clone(), args }
    }
}
