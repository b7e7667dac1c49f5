//! Generation driver: runs configuration entries through resolution,
//! synthesis and aggregation.
//!
//! One [`Generator`] is one build run. It remembers which targets have been
//! synthesized so a type listed by several entries (or seen again in a later
//! pass) is generated once and only re-registered afterwards.
//!
//! Per pass:
//! 1. every entry gets its own [`ResolutionContext`] with its overrides;
//! 2. entries whose fields reference types the oracle does not know are set
//!    aside as [`DeferredEntry`]s;
//! 3. the rest run in dependency order (an entry after the entries whose
//!    targets it needs serializers for), then get their module aggregated.
//!
//! A derived serializer that no ready entry generates is still referenced;
//! it is reported as a [`DiagnosticKind::MissingSurrogate`] warning.
use std::fmt;

use indexmap::IndexSet;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::TypeQuery;
use crate::config::{ConfigEntry, GeneratorOptions};
use crate::error::{Error, Result};
use crate::ir::{FieldDecl, GenerationUnit, ModuleEntry, ModuleSpec, SerializerRef, TypeExpr, TypeName};
use crate::resolve::{builtins, DuplicateOverride, Naming, ResolutionContext};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Target type unknown to the type oracle; that target is skipped.
    UnresolvedType { target: TypeName },
    /// Nothing visible to mirror; the target is skipped and left out of the module.
    NoEligibleFields { target: TypeName },
    /// Second class override for one type; the whole entry is skipped.
    DuplicateClassOverride { ty: TypeName },
    /// Second field override for one field; the whole entry is skipped.
    DuplicateFieldOverride { owner: TypeName, field: String },
    /// A field relies on the derived serializer of a type this run does not
    /// generate; it has to come from elsewhere.
    MissingSurrogate { owner: TypeName, field: String, ty: TypeName },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub entry: String,
    pub severity: Severity,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

/// Why an entry can't be generated yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeferralReason {
    /// Neither built in nor known to the oracle, and not covered by an override.
    UnknownType { owner: TypeName, field: String, ty: TypeName },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeferredEntry {
    pub entry: String,
    pub reasons: Vec<DeferralReason>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PassReport {
    pub pass: usize,
    pub units: Vec<GenerationUnit>,
    pub modules: Vec<ModuleSpec>,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deferred: Vec<DeferredEntry>,
}

/// Everything one run produced, including entries still waiting.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Generation {
    pub passes: usize,
    pub units: Vec<GenerationUnit>,
    pub modules: Vec<ModuleSpec>,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deferred: Vec<DeferredEntry>,
}

pub struct Generator {
    options: GeneratorOptions,
    synthesized: IndexSet<TypeName>,
}

/// An entry with no unknown types, with what it needs from other entries.
struct Ready<'e, 'o> {
    entry: &'e ConfigEntry,
    ctx: ResolutionContext<'o>,
    needs: IndexSet<TypeName>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Generator {
    pub fn new(options: GeneratorOptions) -> Self {
        Self { options, synthesized: IndexSet::new() }
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    pub fn is_synthesized(&self, target: &TypeName) -> bool {
        self.synthesized.contains(target)
    }

    /// One pass over every entry. Entries waiting on unknown types come back
    /// in [`Generation::deferred`] next to what the other entries produced;
    /// hand them to [`Generator::run_pass`] once the oracle knows more.
    pub fn run(&mut self, oracle: &dyn TypeQuery, entries: &[ConfigEntry]) -> Generation {
        let entries = entries.iter().collect::<Vec<_>>();
        let mut generation = Generation::default();
        generation.absorb(self.run_pass(oracle, 1, &entries));
        generation
    }

    /// One pass over `entries`. Deferred entries are returned, not retried.
    pub fn run_pass(&mut self, oracle: &dyn TypeQuery, pass: usize, entries: &[&ConfigEntry]) -> PassReport {
        info!(pass, entries = entries.len(), "generation pass");
        let mut report = PassReport { pass, ..PassReport::default() };

        let mut ready = Vec::new();
        for &entry in entries {
            let ctx = match self.context_for(oracle, entry) {
                Ok(ctx) => ctx,
                Err(diagnostics) => {
                    for diagnostic in &diagnostics {
                        warn!(entry = %entry.name, kind = %diagnostic.kind, "entry skipped");
                    }
                    report.diagnostics.extend(diagnostics);
                    continue;
                }
            };
            match self.unknown_types(&ctx, entry) {
                Ok(()) => ready.push(Ready { entry, ctx, needs: IndexSet::new() }),
                Err(reasons) => {
                    warn!(entry = %entry.name, reasons = reasons.len(), "entry deferred");
                    report.deferred.push(DeferredEntry { entry: entry.name.clone(), reasons });
                }
            }
        }

        // only targets that get a unit in this pass count as available
        let produced = ready
            .iter()
            .flat_map(|r| r.entry.targets.iter())
            .filter(|target| has_eligible_fields(oracle, target))
            .cloned()
            .collect::<IndexSet<_>>();
        for r in &mut ready {
            let (needs, missing) = self.dependencies(&r.ctx, r.entry, &produced);
            r.needs = needs;
            for kind in missing {
                warn!(entry = %r.entry.name, %kind, "derived serializer not generated in this run");
                report.diagnostics.push(Diagnostic { entry: r.entry.name.clone(), severity: Severity::Warning, kind });
            }
        }

        for index in schedule(&ready) {
            let Ready { entry, ctx, .. } = &ready[index];
            self.process_entry(ctx, entry, &mut report);
        }
        report
    }

    /// Fresh context holding only this entry's overrides.
    fn context_for<'o>(
        &self,
        oracle: &'o dyn TypeQuery,
        entry: &ConfigEntry,
    ) -> std::result::Result<ResolutionContext<'o>, Vec<Diagnostic>> {
        let mut ctx = ResolutionContext::new(oracle, Naming::from(&self.options));
        let mut duplicates = Vec::new();

        for decl in &entry.class_overrides {
            if let Err(dup) = ctx.add_class_override(decl.ty.clone(), decl.serializer.clone()) {
                duplicates.push(dup);
            }
        }
        for group in &entry.field_overrides {
            for decl in &group.fields {
                if let Err(dup) = ctx.add_field_override(group.ty.clone(), decl.field.clone(), decl.serializer.clone()) {
                    duplicates.push(dup);
                }
            }
        }

        if duplicates.is_empty() {
            return Ok(ctx);
        }
        Err(duplicates
            .into_iter()
            .map(|dup| Diagnostic {
                entry: entry.name.clone(),
                severity: Severity::Error,
                kind: match dup {
                    DuplicateOverride::Class { ty } => DiagnosticKind::DuplicateClassOverride { ty },
                    DuplicateOverride::Field { owner, field } => {
                        DiagnosticKind::DuplicateFieldOverride { owner, field }
                    }
                },
            })
            .collect())
    }

    /// Every node of every eligible field of the entry's pending targets,
    /// with what it resolves to.
    fn visit_field_types(
        &self,
        ctx: &ResolutionContext<'_>,
        entry: &ConfigEntry,
        mut visit: impl FnMut(&TypeName, &FieldDecl, &TypeExpr, Option<SerializerRef>),
    ) {
        for target in &entry.targets {
            if self.synthesized.contains(target) {
                continue;
            }
            // missing targets are reported when processed
            let Some(fields) = ctx.oracle().fields(target) else { continue };

            for field in fields.iter().filter(|f| f.visibility.is_eligible()) {
                visit(target, field, &field.ty, ctx.resolve(&field.ty, Some((target, field.name.as_str()))));
                for arg in &field.ty.args {
                    arg.walk(&mut |node| visit(target, field, node, ctx.resolve(node, None)));
                }
            }
        }
    }

    /// Field types that are neither built in, known to the oracle, nor
    /// covered by an override.
    fn unknown_types(&self, ctx: &ResolutionContext<'_>, entry: &ConfigEntry) -> std::result::Result<(), Vec<DeferralReason>> {
        let oracle = ctx.oracle();
        let mut reasons = Vec::new();
        self.visit_field_types(ctx, entry, |owner, field, node, resolved| {
            if resolved.is_none() && !builtins::is_builtin(&node.name) && !oracle.exists(&node.name) {
                reasons.push(DeferralReason::UnknownType {
                    owner: owner.clone(),
                    field: field.name.clone(),
                    ty: node.name.clone(),
                });
            }
        });
        if reasons.is_empty() { Ok(()) } else { Err(reasons) }
    }

    /// Targets of other entries this entry needs derived serializers from,
    /// and the derived serializers nothing in this run generates.
    fn dependencies(
        &self,
        ctx: &ResolutionContext<'_>,
        entry: &ConfigEntry,
        produced: &IndexSet<TypeName>,
    ) -> (IndexSet<TypeName>, Vec<DiagnosticKind>) {
        let mut needs = IndexSet::new();
        let mut missing = Vec::new();
        self.visit_field_types(ctx, entry, |owner, field, node, resolved| {
            if !resolved.is_some_and(|found| found.is_derived()) || self.synthesized.contains(&node.name) {
                return;
            }
            if !produced.contains(&node.name) {
                missing.push(DiagnosticKind::MissingSurrogate {
                    owner: owner.clone(),
                    field: field.name.clone(),
                    ty: node.name.clone(),
                });
            } else if !entry.targets.contains(&node.name) {
                needs.insert(node.name.clone());
            }
        });
        (needs, missing)
    }

    /// SynthesizeAll + Aggregate for one ready entry.
    fn process_entry(&mut self, ctx: &ResolutionContext<'_>, entry: &ConfigEntry, report: &mut PassReport) {
        info!(entry = %entry.name, targets = entry.targets.len(), "processing configuration entry");
        let oracle = ctx.oracle();
        let mut seen = IndexSet::new();
        let mut pairs = Vec::new();

        for target in &entry.targets {
            if !seen.insert(target) {
                continue;
            }
            if self.synthesized.contains(target) {
                debug!(%target, "already synthesized; registering only");
                pairs.push(ModuleEntry { target: target.clone(), serializer: ctx.derived_ref(target) });
                continue;
            }
            if !oracle.exists(target) {
                warn!(entry = %entry.name, %target, "target type not found");
                report.diagnostics.push(Diagnostic {
                    entry: entry.name.clone(),
                    severity: Severity::Error,
                    kind: DiagnosticKind::UnresolvedType { target: target.clone() },
                });
                continue;
            }

            let fields = oracle.fields(target).unwrap_or_default();
            match crate::synth::synthesize(ctx, target, fields) {
                Some(unit) => {
                    self.synthesized.insert(target.clone());
                    pairs.push(ModuleEntry { target: target.clone(), serializer: ctx.derived_ref(target) });
                    report.units.push(unit);
                }
                None => {
                    warn!(entry = %entry.name, %target, "no eligible fields; skipped");
                    report.diagnostics.push(Diagnostic {
                        entry: entry.name.clone(),
                        severity: Severity::Warning,
                        kind: DiagnosticKind::NoEligibleFields { target: target.clone() },
                    });
                }
            }
        }

        // contextual registrations for class overrides
        pairs.extend(ctx.class_overrides().map(|(ty, serializer)| ModuleEntry {
            target: ty.clone(),
            serializer: serializer.clone(),
        }));

        let module_name = format!("{}{}", entry.name, self.options.module_suffix);
        if let Some(module) = crate::registry::aggregate(module_name, &entry.name, pairs, &entry.exclude_from_module) {
            info!(module = %module.name, pairs = module.entries.len(), "module ready");
            report.modules.push(module);
        }
    }
}

impl Generation {
    /// Fold a later pass in; its deferred entries replace the current ones.
    pub fn absorb(&mut self, report: PassReport) {
        self.passes = self.passes.max(report.pass);
        self.units.extend(report.units);
        self.modules.extend(report.modules);
        self.diagnostics.extend(report.diagnostics);
        self.deferred = report.deferred;
    }

    /// The configuration entries still deferred, for another pass.
    pub fn pending<'e>(&self, entries: &'e [ConfigEntry]) -> Vec<&'e ConfigEntry> {
        entries
            .iter()
            .filter(|entry| self.deferred.iter().any(|d| d.entry == entry.name))
            .collect()
    }

    pub fn ensure_resolved(&self) -> Result<()> {
        if self.deferred.is_empty() {
            Ok(())
        } else {
            Err(Error::Unresolved { entries: self.deferred.clone() })
        }
    }
}

fn has_eligible_fields(oracle: &dyn TypeQuery, target: &TypeName) -> bool {
    oracle.fields(target).is_some_and(|fields| fields.iter().any(|f| f.visibility.is_eligible()))
}

/// Stable topological order over ready entries. An entry waits for entries
/// targeting a type it needs; cycles fall back to declaration order.
fn schedule(ready: &[Ready<'_, '_>]) -> Vec<usize> {
    let providers = |index: usize| -> Vec<usize> {
        let needs = &ready[index].needs;
        (0..ready.len())
            .filter(|&other| other != index)
            .filter(|&other| ready[other].entry.targets.iter().any(|t| needs.contains(t)))
            .collect()
    };
    let deps = (0..ready.len()).map(providers).collect::<Vec<_>>();

    let mut done = vec![false; ready.len()];
    let mut order = Vec::with_capacity(ready.len());
    while order.len() < ready.len() {
        let next = (0..ready.len())
            .find(|&i| !done[i] && deps[i].iter().all(|&d| done[d]))
            .or_else(|| (0..ready.len()).find(|&i| !done[i]));
        let Some(next) = next else { break };
        done[next] = true;
        order.push(next);
    }
    order
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::UnresolvedType { target } => write!(f, "target type `{target}` not found"),
            DiagnosticKind::NoEligibleFields { target } => {
                write!(f, "`{target}` has no public fields; no surrogate generated")
            }
            DiagnosticKind::DuplicateClassOverride { ty } => write!(f, "`{ty}` is overridden more than once"),
            DiagnosticKind::DuplicateFieldOverride { owner, field } => {
                write!(f, "field `{owner}.{field}` is overridden more than once")
            }
            DiagnosticKind::MissingSurrogate { owner, field, ty } => {
                write!(f, "`{owner}.{field}` uses the derived serializer of `{ty}`, which no entry generates")
            }
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.entry, self.kind)
    }
}

impl fmt::Display for DeferralReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeferralReason::UnknownType { owner, field, ty } => {
                write!(f, "`{owner}.{field}` uses unknown type `{ty}`")
            }
        }
    }
}

impl fmt::Display for DeferredEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reasons = self.reasons.iter().map(|r| r.to_string()).collect::<Vec<_>>();
        write!(f, "{} ({})", self.entry, reasons.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::fixtures;
    use crate::ir::AsPlan;

    fn run(catalog: &Catalog, entries: &[ConfigEntry]) -> Result<Generation> {
        let generation = Generator::new(GeneratorOptions::default()).run(catalog, entries);
        generation.ensure_resolved()?;
        Ok(generation)
    }

    fn event_catalog() -> Catalog {
        let mut catalog = fixtures::hr_catalog();
        catalog.merge(
            Catalog::from_json_str(
                "inline",
                r#"{"types":[{"name":"crate::Event","fields":[{"name":"at","type":"chrono::NaiveDate"}]}]}"#,
            )
            .unwrap(),
        );
        catalog
    }

    fn missing_surrogates(generation: &Generation) -> Vec<&str> {
        generation
            .diagnostics
            .iter()
            .filter_map(|d| match &d.kind {
                DiagnosticKind::MissingSurrogate { ty, .. } => Some(ty.as_str()),
                _ => None,
            })
            .collect()
    }

    fn hr_entry() -> ConfigEntry {
        ConfigEntry::new("Hr")
            .target("crate::hr::Company")
            .target("crate::hr::Employee")
            .target("crate::hr::Position")
    }

    fn unit<'g>(generation: &'g Generation, target: &str) -> &'g GenerationUnit {
        generation.units.iter().find(|u| u.target.as_str() == target).unwrap()
    }

    fn module_targets(module: &ModuleSpec) -> Vec<&str> {
        module.entries.iter().map(|e| e.target.as_str()).collect()
    }

    #[test]
    fn generates_units_and_module() {
        let catalog = fixtures::hr_catalog();
        let generation = run(&catalog, &[hr_entry()]).unwrap();

        assert_eq!(generation.passes, 1);
        assert_eq!(generation.units.len(), 3);
        assert!(generation.diagnostics.is_empty());
        let module = &generation.modules[0];
        assert_eq!(module.name, "HrModule");
        assert_eq!(module_targets(module), ["crate::hr::Company", "crate::hr::Employee", "crate::hr::Position"]);
        assert_eq!(module.entries[0].serializer.name.as_str(), "crate::hr::CompanySerializer");
    }

    #[test]
    fn targets_are_synthesized_once_per_run() {
        let catalog = fixtures::hr_catalog();
        let entries = [
            hr_entry(),
            ConfigEntry::new("Payroll").target("crate::hr::Position").target("crate::hr::Employee"),
        ];
        let generation = run(&catalog, &entries).unwrap();

        assert_eq!(generation.units.len(), 3);
        let payroll = generation.modules.iter().find(|m| m.entry == "Payroll").unwrap();
        assert_eq!(module_targets(payroll), ["crate::hr::Position", "crate::hr::Employee"]);
    }

    #[test]
    fn skip_path_survives_later_passes() {
        let catalog = fixtures::hr_catalog();
        let mut generator = Generator::new(GeneratorOptions::default());
        let entry = ConfigEntry::new("Jobs").target("crate::hr::Position");
        let first = generator.run_pass(&catalog, 1, &[&entry]);
        let second = generator.run_pass(&catalog, 2, &[&entry]);

        assert_eq!(first.units.len(), 1);
        assert!(second.units.is_empty());
        assert_eq!(first.modules, second.modules);
        assert!(generator.is_synthesized(&TypeName::new("crate::hr::Position")));
    }

    #[test]
    fn overrides_do_not_leak_between_entries() {
        let catalog = fixtures::hr_catalog();
        let entries = [
            ConfigEntry::new("Scaled")
                .target("crate::hr::Position")
                .class_override("i32", "crate::ser::AddHundred"),
            ConfigEntry::new("Plain").target("crate::hr::Company").target("crate::hr::Employee"),
        ];
        let generation = run(&catalog, &entries).unwrap();

        let position = unit(&generation, "crate::hr::Position");
        assert_eq!(position.surrogate.fields[1].attached.as_ref().unwrap().name.as_str(), "crate::ser::AddHundred");
        let company = unit(&generation, "crate::hr::Company");
        assert!(company.surrogate.fields[2].attached.is_none());
    }

    #[test]
    fn field_override_wins_over_class_override() {
        let catalog = fixtures::hr_catalog();
        let entry = ConfigEntry::new("Hr")
            .target("crate::hr::Position")
            .class_override("i32", "crate::ser::AddHundred")
            .field_override("crate::hr::Position", "experience", "crate::ser::Years");
        let generation = run(&catalog, &[entry]).unwrap();
        let experience = &generation.units[0].surrogate.fields[1];
        assert_eq!(experience.attached.as_ref().unwrap().name.as_str(), "crate::ser::Years");
    }

    #[test]
    fn nested_field_override_targets_only_that_field() {
        let catalog = fixtures::hr_catalog();
        let entry = hr_entry().field_override("crate::hr::Position", "experience", "crate::ser::AddHundred");
        let generation = run(&catalog, &[entry]).unwrap();

        let position = unit(&generation, "crate::hr::Position");
        assert!(position.surrogate.fields[0].attached.is_none());
        assert_eq!(position.surrogate.fields[1].attached.as_ref().unwrap().name.as_str(), "crate::ser::AddHundred");

        // the list still reaches positions through the derived serializers only
        let company = unit(&generation, "crate::hr::Company");
        assert!(matches!(company.surrogate.fields[1].plan, AsPlan::Generic { .. }));
        assert!(company.serializer.imports.iter().all(|r| r.is_derived()));
        assert!(company.surrogate.fields[2].attached.is_none());
    }

    #[test]
    fn class_overrides_are_registered_unless_excluded() {
        let catalog = fixtures::hr_catalog();
        let entry = ConfigEntry::new("Hr")
            .target("crate::hr::Position")
            .class_override("i32", "crate::ser::AddHundred");

        let registered = run(&catalog, &[entry.clone()]).unwrap();
        assert_eq!(module_targets(&registered.modules[0]), ["crate::hr::Position", "i32"]);

        let excluded = run(&catalog, &[entry.exclude("i32")]).unwrap();
        assert_eq!(module_targets(&excluded.modules[0]), ["crate::hr::Position"]);
        // still applied locally
        let experience = &excluded.units[0].surrogate.fields[1];
        assert_eq!(experience.attached.as_ref().unwrap().name.as_str(), "crate::ser::AddHundred");
    }

    #[test]
    fn missing_target_is_an_error_but_others_proceed() {
        let catalog = fixtures::hr_catalog();
        let entry = ConfigEntry::new("Hr").target("crate::hr::Ghost").target("crate::hr::Position");
        let generation = run(&catalog, &[entry]).unwrap();

        assert_eq!(generation.units.len(), 1);
        assert_eq!(generation.diagnostics.len(), 1);
        assert_eq!(generation.diagnostics[0].severity, Severity::Error);
        assert!(matches!(
            &generation.diagnostics[0].kind,
            DiagnosticKind::UnresolvedType { target } if target.as_str() == "crate::hr::Ghost"
        ));
        assert_eq!(module_targets(&generation.modules[0]), ["crate::hr::Position"]);
    }

    #[test]
    fn no_eligible_fields_is_a_warning_and_left_out_of_module() {
        let catalog = fixtures::hr_catalog();
        let entry = ConfigEntry::new("Vault").target("crate::hr::Secret");
        let generation = run(&catalog, &[entry]).unwrap();

        assert!(generation.units.is_empty());
        assert!(generation.modules.is_empty());
        assert_eq!(generation.diagnostics[0].severity, Severity::Warning);
    }

    #[test]
    fn duplicate_overrides_fail_the_entry() {
        let catalog = fixtures::hr_catalog();
        let entries = [
            ConfigEntry::new("Broken")
                .target("crate::hr::Position")
                .class_override("i32", "crate::ser::A")
                .class_override("i32", "crate::ser::B"),
            ConfigEntry::new("Fine").target("crate::hr::Position"),
        ];
        let generation = run(&catalog, &entries).unwrap();

        assert_eq!(generation.units.len(), 1);
        assert_eq!(generation.modules.len(), 1);
        assert_eq!(generation.modules[0].entry, "Fine");
        assert!(matches!(generation.diagnostics[0].kind, DiagnosticKind::DuplicateClassOverride { .. }));
    }

    #[test]
    fn untargeted_composites_still_use_their_derived_serializer() {
        let catalog = fixtures::hr_catalog();
        // Employee needs PositionSerializer, but nobody targets Position
        let entry = ConfigEntry::new("People").target("crate::hr::Employee");
        let generation = run(&catalog, &[entry]).unwrap();

        let employee = unit(&generation, "crate::hr::Employee");
        let imports = employee.serializer.imports.iter().map(|r| r.name.as_str()).collect::<Vec<_>>();
        assert!(imports.contains(&"crate::hr::PositionSerializer"));
        assert_eq!(module_targets(&generation.modules[0]), ["crate::hr::Employee"]);

        assert_eq!(missing_surrogates(&generation), ["crate::hr::Position", "crate::hr::Position"]);
        assert!(generation.diagnostics.iter().all(|d| d.severity == Severity::Warning));
    }

    #[test]
    fn entries_with_invalid_overrides_do_not_count_as_producers() {
        let catalog = fixtures::hr_catalog();
        let entries = [
            ConfigEntry::new("People").target("crate::hr::Employee"),
            ConfigEntry::new("Jobs")
                .target("crate::hr::Position")
                .field_override("crate::hr::Position", "experience", "crate::ser::A")
                .field_override("crate::hr::Position", "experience", "crate::ser::B"),
        ];
        let generation = run(&catalog, &entries).unwrap();

        assert_eq!(generation.units.len(), 1);
        assert_eq!(generation.modules.len(), 1);
        assert_eq!(generation.modules[0].entry, "People");
        assert_eq!(missing_surrogates(&generation).len(), 2);
        assert!(generation.diagnostics.iter().any(|d| {
            d.entry == "Jobs"
                && d.severity == Severity::Error
                && matches!(d.kind, DiagnosticKind::DuplicateFieldOverride { .. })
        }));
    }

    #[test]
    fn deferred_entries_keep_the_rest_of_the_run() {
        let catalog = event_catalog();
        let entries = [
            ConfigEntry::new("Events").target("crate::Event"),
            ConfigEntry::new("Jobs").target("crate::hr::Position"),
        ];
        let mut generator = Generator::new(GeneratorOptions::default());
        let mut generation = generator.run(&catalog, &entries);

        assert_eq!(generation.units.len(), 1);
        assert_eq!(generation.modules[0].entry, "Jobs");
        assert_eq!(generation.deferred.len(), 1);
        assert_eq!(generation.deferred[0].entry, "Events");
        match generation.ensure_resolved().unwrap_err() {
            Error::Unresolved { entries } => assert_eq!(entries[0].entry, "Events"),
            other => panic!("unexpected error: {other}"),
        }

        let mut catalog = catalog;
        catalog.merge(
            Catalog::from_json_str("inline", r#"{"types":[{"name":"chrono::NaiveDate","native_serializable":true}]}"#)
                .unwrap(),
        );
        let pending = generation.pending(&entries);
        assert_eq!(pending.len(), 1);
        generation.absorb(generator.run_pass(&catalog, 2, &pending));

        assert_eq!(generation.passes, 2);
        assert_eq!(generation.units.len(), 2);
        assert_eq!(generation.modules.iter().map(|m| m.entry.as_str()).collect::<Vec<_>>(), ["Jobs", "Events"]);
        assert!(generation.ensure_resolved().is_ok());
    }

    #[test]
    fn targets_without_eligible_fields_do_not_satisfy_dependents() {
        let catalog = Catalog::from_json_str(
            "inline",
            r#"{"types":[
                {"name":"crate::Vault","fields":[{"name":"secret","type":"crate::Secret"}]},
                {"name":"crate::Secret","fields":[{"name":"token","type":"String","visibility":"private"}]}
            ]}"#,
        )
        .unwrap();
        let entries = [ConfigEntry::new("Outer").target("crate::Vault"), ConfigEntry::new("Inner").target("crate::Secret")];
        let generation = run(&catalog, &entries).unwrap();

        assert_eq!(generation.units.len(), 1);
        assert_eq!(missing_surrogates(&generation), ["crate::Secret"]);
    }

    #[test]
    fn another_entry_targeting_the_dependency_unblocks() {
        let catalog = fixtures::hr_catalog();
        let entries = [
            ConfigEntry::new("People").target("crate::hr::Employee"),
            ConfigEntry::new("Jobs").target("crate::hr::Position"),
        ];
        let generation = run(&catalog, &entries).unwrap();

        // Jobs is scheduled first because People needs its target
        let order = generation.modules.iter().map(|m| m.entry.as_str()).collect::<Vec<_>>();
        assert_eq!(order, ["Jobs", "People"]);
        assert!(missing_surrogates(&generation).is_empty());
    }

    #[test]
    fn overrides_replace_derived_dependencies() {
        let catalog = fixtures::hr_catalog();
        let entry = ConfigEntry::new("People")
            .target("crate::hr::Employee")
            .class_override("crate::hr::Position", "crate::ser::PositionAsId");
        let generation = run(&catalog, &[entry]).unwrap();
        assert_eq!(generation.units.len(), 1);
        assert!(missing_surrogates(&generation).is_empty());
    }

    #[test]
    fn unknown_field_types_defer_and_resolve_on_a_later_pass() {
        let mut catalog = Catalog::from_json_str(
            "inline",
            r#"{"types":[{"name":"crate::Event","fields":[{"name":"at","type":"chrono::NaiveDate"}]}]}"#,
        )
        .unwrap();
        let entry = ConfigEntry::new("Events").target("crate::Event");
        let mut generator = Generator::new(GeneratorOptions::default());

        let first = generator.run_pass(&catalog, 1, &[&entry]);
        assert!(first.units.is_empty());
        assert!(matches!(first.deferred[0].reasons[0], DeferralReason::UnknownType { .. }));

        catalog.merge(
            Catalog::from_json_str("inline", r#"{"types":[{"name":"chrono::NaiveDate","native_serializable":true}]}"#)
                .unwrap(),
        );
        let second = generator.run_pass(&catalog, 2, &[&entry]);
        assert!(second.deferred.is_empty());
        assert_eq!(second.units.len(), 1);
    }

    #[test]
    fn schedule_breaks_cycles_in_declaration_order() {
        let catalog = Catalog::from_json_str(
            "inline",
            r#"{"types":[
                {"name":"crate::A","fields":[{"name":"b","type":"Option<Box<crate::B>>"}]},
                {"name":"crate::B","fields":[{"name":"a","type":"Option<Box<crate::A>>"}]}
            ]}"#,
        )
        .unwrap();
        let entries = [ConfigEntry::new("First").target("crate::A"), ConfigEntry::new("Second").target("crate::B")];
        let generation = run(&catalog, &entries).unwrap();
        let order = generation.modules.iter().map(|m| m.entry.as_str()).collect::<Vec<_>>();
        assert_eq!(order, ["First", "Second"]);
    }
}
