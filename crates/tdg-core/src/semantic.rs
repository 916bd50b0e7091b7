//! Semantic analysis of a parsed schema.
//!
//! The analyzer never mutates the input AST. It registers custom types, checks names,
//! resolves every field type, validates constraints, and derives a [`ValidatedSchema`]
//! for the generation engine. Any error diagnostic halts the pipeline; warnings travel
//! with the validated model.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde_json::Value;
use tracing::{debug, warn};

use crate::ast::{DataType, Field, Literal, Schema, SourceLocation, StrategyKind, Table, TypeDecl};
use crate::constraints::{Constraint, Distribution, ForeignKey};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::domain::ValueDomain;
use crate::error::Error;
use crate::expr::{self, Expr};
use crate::symbols::SymbolTable;
use crate::types::{ResolvedType, TerminalType, TypeRegistry};
use crate::value::GeneratedValue;

/// Schema that passed analysis; read-only input to generation.
#[derive(Debug, Clone)]
pub struct ValidatedSchema {
    pub name: String,
    pub tables: Vec<ValidatedTable>,
    /// Resolved custom types by name.
    pub types: BTreeMap<String, ResolvedType>,
    pub warnings: Vec<Diagnostic>,
}

impl ValidatedSchema {
    pub fn table(&self, name: &str) -> Option<&ValidatedTable> {
        self.tables.iter().find(|table| table.name == name)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|table| table.name.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ValidatedTable {
    pub name: String,
    pub fields: Vec<ValidatedField>,
    pub primary_key: Option<KeyConstraint>,
    pub unique_keys: Vec<KeyConstraint>,
    pub foreign_keys: Vec<ValidatedForeignKey>,
    pub checks: Vec<CompiledCheck>,
    pub directive: ValidatedDirective,
    pub location: Option<SourceLocation>,
}

impl ValidatedTable {
    pub fn field(&self, name: &str) -> Option<&ValidatedField> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    /// Primary key first, then unique constraints in declaration order.
    pub fn key_sets(&self) -> impl Iterator<Item = &KeyConstraint> {
        self.primary_key.iter().chain(self.unique_keys.iter())
    }

    /// Foreign key covering the given field, if any.
    pub fn foreign_key_for(&self, field: &str) -> Option<&ValidatedForeignKey> {
        self.foreign_keys
            .iter()
            .find(|fk| fk.fields.iter().any(|name| name == field))
    }
}

#[derive(Debug, Clone)]
pub struct ValidatedField {
    pub name: String,
    pub terminal: TerminalType,
    /// Custom type name when the field is declared with one.
    pub type_name: Option<String>,
    /// Inline value constraints first, then the type chain's.
    pub constraints: Vec<Constraint>,
    pub domain: ValueDomain,
    pub nullable: bool,
    pub default: Option<GeneratedValue>,
    pub location: Option<SourceLocation>,
}

/// Primary key or unique constraint with a normalized field list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyConstraint {
    pub name: Option<String>,
    pub fields: Vec<String>,
    pub primary: bool,
}

impl KeyConstraint {
    pub fn label(&self) -> String {
        let kind = if self.primary { "primary key" } else { "unique" };
        match &self.name {
            Some(name) => format!("{kind} {name}({})", self.fields.join(", ")),
            None => format!("{kind}({})", self.fields.join(", ")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedForeignKey {
    pub name: Option<String>,
    pub fields: Vec<String>,
    pub target_table: String,
    pub target_fields: Vec<String>,
    pub distribution: Option<Distribution>,
}

#[derive(Debug, Clone)]
pub struct CompiledCheck {
    pub name: Option<String>,
    pub source: String,
    pub expr: Expr,
}

impl CompiledCheck {
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("check {name}({})", self.source),
            None => format!("check({})", self.source),
        }
    }
}

/// Directive after strategy names are checked; option values stay free-form.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDirective {
    pub count: Option<u64>,
    pub strategy: StrategyKind,
    pub options: BTreeMap<String, Value>,
    pub overrides: BTreeMap<String, ValidatedOverride>,
}

impl Default for ValidatedDirective {
    fn default() -> Self {
        Self {
            count: None,
            strategy: StrategyKind::Random,
            options: BTreeMap::new(),
            overrides: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedOverride {
    pub strategy: StrategyKind,
    pub options: BTreeMap<String, Value>,
}

/// Analyze a schema, returning the validated model or every diagnostic on failure.
pub fn analyze(schema: &Schema) -> Result<ValidatedSchema, Diagnostics> {
    SemanticAnalyzer::new(schema).analyze()
}

pub struct SemanticAnalyzer<'a> {
    schema: &'a Schema,
    registry: TypeRegistry,
    symbols: SymbolTable,
    diagnostics: Diagnostics,
    reported_cycles: HashSet<Vec<String>>,
    used_types: BTreeSet<String>,
}

impl<'a> SemanticAnalyzer<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            registry: TypeRegistry::new(),
            symbols: SymbolTable::new(),
            diagnostics: Diagnostics::default(),
            reported_cycles: HashSet::new(),
            used_types: BTreeSet::new(),
        }
    }

    pub fn analyze(mut self) -> Result<ValidatedSchema, Diagnostics> {
        debug!(
            schema = %self.schema.name,
            tables = self.schema.tables.len(),
            "analyzing schema"
        );
        let schema = self.schema;
        self.register_types();
        self.declare_names();
        let types = self.resolve_type_decls();

        let mut tables = Vec::with_capacity(schema.tables.len());
        let mut seen = HashSet::new();
        for table in &schema.tables {
            if !seen.insert(table.name.as_str()) {
                continue;
            }
            if let Some(validated) = self.analyze_table(table) {
                tables.push(validated);
            }
        }

        self.advisory_warnings(&tables);

        for diagnostic in &self.diagnostics.warnings {
            warn!(
                kind = diagnostic.kind.code(),
                table = diagnostic.table.as_deref().unwrap_or(""),
                field = diagnostic.field.as_deref().unwrap_or(""),
                "{}",
                diagnostic.message
            );
        }

        if !self.diagnostics.is_ok() {
            return Err(self.diagnostics);
        }

        Ok(ValidatedSchema {
            name: schema.name.clone(),
            tables,
            types,
            warnings: self.diagnostics.warnings,
        })
    }

    fn register_types(&mut self) {
        let schema = self.schema;
        for decl in schema.type_decls() {
            if let Err(err) = self.registry.define(
                &decl.name,
                decl.base.clone(),
                decl.constraints.clone(),
                decl.location,
            ) {
                self.diagnostics
                    .push_error(error_diagnostic(&err).at(decl.location));
            }
        }
    }

    fn declare_names(&mut self) {
        let schema = self.schema;
        for table in &schema.tables {
            if self.symbols.declare_table(&table.name, table.location).is_err() {
                self.diagnostics.push_error(
                    Diagnostic::error(
                        DiagnosticKind::DuplicateName,
                        format!("table '{}' is declared more than once", table.name),
                    )
                    .in_table(&table.name)
                    .at(table.location),
                );
                continue;
            }
            for field in &table.fields {
                if !self
                    .symbols
                    .declare_field(&table.name, &field.name, field.location)
                {
                    self.diagnostics.push_error(
                        Diagnostic::error(
                            DiagnosticKind::DuplicateName,
                            format!("field '{}' is declared more than once", field.name),
                        )
                        .in_table(&table.name)
                        .on_field(&field.name)
                        .at(field.location),
                    );
                }
            }
        }
    }

    /// Resolve every registered custom type, including unused ones.
    fn resolve_type_decls(&mut self) -> BTreeMap<String, ResolvedType> {
        let schema = self.schema;
        let mut resolved = BTreeMap::new();
        let names: Vec<String> = self.registry.names().map(str::to_string).collect();
        for name in names {
            let Some(decl) = schema.type_decls().find(|decl| decl.name == name) else {
                continue;
            };
            match self.registry.resolve_name(&name) {
                Ok(resolution) => {
                    self.check_type_constraints(decl, &resolution);
                    if let DataType::Custom { name: base } = &decl.base {
                        self.used_types.insert(base.clone());
                    }
                    resolved.insert(name, resolution);
                }
                Err(Error::CircularType { cycle }) => {
                    let mut key = cycle.clone();
                    key.sort();
                    if self.reported_cycles.insert(key) {
                        let err = Error::CircularType { cycle };
                        self.diagnostics
                            .push_error(error_diagnostic(&err).at(decl.location));
                    }
                }
                Err(err) => {
                    let kind = err.kind().unwrap_or(DiagnosticKind::UndefinedType);
                    self.diagnostics.push_error(
                        Diagnostic::error(kind, format!("type '{}': {err}", decl.name))
                            .at(decl.location),
                    );
                }
            }
        }
        resolved
    }

    fn check_type_constraints(&mut self, decl: &TypeDecl, resolution: &ResolvedType) {
        for constraint in &decl.constraints {
            if !constraint.is_value_constraint() {
                self.diagnostics.push_error(
                    Diagnostic::error(
                        DiagnosticKind::ConstraintWellFormedness,
                        format!(
                            "type '{}' may only carry value constraints, found {}",
                            decl.name,
                            constraint.kind_name()
                        ),
                    )
                    .at(decl.location),
                );
            }
        }
        if let Err(err) = ValueDomain::build(resolution.terminal, &resolution.constraints) {
            self.diagnostics.push_error(
                Diagnostic::error(
                    DiagnosticKind::ConstraintWellFormedness,
                    format!("type '{}': {err}", decl.name),
                )
                .at(decl.location),
            );
        }
    }

    fn analyze_table(&mut self, table: &Table) -> Option<ValidatedTable> {
        let errors_before = self.diagnostics.errors.len();

        let mut fields = Vec::with_capacity(table.fields.len());
        let mut seen = HashSet::new();
        for field in &table.fields {
            if !seen.insert(field.name.as_str()) {
                continue;
            }
            if let Some(validated) = self.analyze_field(table, field) {
                fields.push(validated);
            }
        }

        let keys = self.collect_keys(table);
        let checks = self.compile_checks(table);
        let directive = self.validate_directive(table);

        if self.diagnostics.errors.len() > errors_before {
            return None;
        }

        let pk_fields: HashSet<&str> = keys
            .primary_key
            .iter()
            .flat_map(|pk| pk.fields.iter().map(String::as_str))
            .collect();
        for field in &mut fields {
            if pk_fields.contains(field.name.as_str()) {
                field.nullable = false;
            }
        }

        Some(ValidatedTable {
            name: table.name.clone(),
            fields,
            primary_key: keys.primary_key,
            unique_keys: keys.unique_keys,
            foreign_keys: keys.foreign_keys,
            checks,
            directive,
            location: table.location,
        })
    }

    fn analyze_field(&mut self, table: &Table, field: &Field) -> Option<ValidatedField> {
        let field_error = |kind: DiagnosticKind, message: String| {
            Diagnostic::error(kind, message)
                .in_table(&table.name)
                .on_field(&field.name)
                .at(field.location)
        };

        if field.modifiers.nullable && field.modifiers.not_null {
            self.diagnostics.push_error(field_error(
                DiagnosticKind::ConstraintWellFormedness,
                "field is declared both nullable and not null".to_string(),
            ));
        }

        if let DataType::Custom { name } = &field.data_type {
            self.used_types.insert(name.clone());
        }
        let resolution = match self.registry.resolve(&field.data_type) {
            Ok(resolution) => resolution,
            Err(err) => {
                let kind = err.kind().unwrap_or(DiagnosticKind::UndefinedType);
                self.diagnostics
                    .push_error(field_error(kind, format!("cannot resolve type: {err}")));
                return None;
            }
        };

        let mut constraints: Vec<Constraint> = field
            .constraints
            .iter()
            .filter(|constraint| constraint.is_value_constraint())
            .cloned()
            .collect();
        let inline_len = constraints.len();
        constraints.extend(resolution.constraints.iter().cloned());

        let domain = match ValueDomain::build(resolution.terminal, &constraints) {
            Ok(domain) => domain,
            Err(err) => {
                self.diagnostics.push_error(field_error(
                    DiagnosticKind::ConstraintWellFormedness,
                    if inline_len == 0 {
                        format!("type constraints conflict: {err}")
                    } else {
                        err.to_string()
                    },
                ));
                return None;
            }
        };

        let default = match &field.modifiers.default {
            None | Some(Literal::Null) => None,
            Some(literal) => {
                let coerced = match resolution.terminal {
                    TerminalType::Primitive(primitive) => {
                        GeneratedValue::from_literal(literal, primitive)
                    }
                    TerminalType::Array { .. } => None,
                };
                match coerced {
                    Some(value) => {
                        if let Err(violated) = domain.admits(&value) {
                            self.diagnostics.push_error(field_error(
                                DiagnosticKind::ConstraintWellFormedness,
                                format!("default {literal} violates {violated}"),
                            ));
                        }
                        Some(value)
                    }
                    None => {
                        self.diagnostics.push_error(field_error(
                            DiagnosticKind::ConstraintWellFormedness,
                            format!(
                                "default {literal} is not a valid {}",
                                resolution.terminal
                            ),
                        ));
                        None
                    }
                }
            }
        };

        Some(ValidatedField {
            name: field.name.clone(),
            terminal: resolution.terminal,
            type_name: match &field.data_type {
                DataType::Custom { name } => Some(name.clone()),
                _ => None,
            },
            constraints,
            domain,
            nullable: !field.modifiers.not_null,
            default,
            location: field.location,
        })
    }

    /// Normalize key constraints, lifting inline ones to table level.
    fn collect_keys(&mut self, table: &Table) -> TableKeys {
        let mut keys = TableKeys::default();

        for (owner, constraint) in table.all_constraints() {
            let location = owner.and_then(|field| field.location).or(table.location);
            let fields_of = |fields: &[String]| -> Vec<String> {
                match (fields.is_empty(), owner) {
                    (true, Some(field)) => vec![field.name.clone()],
                    _ => fields.to_vec(),
                }
            };
            match constraint {
                Constraint::PrimaryKey(pk) => {
                    let fields = fields_of(&pk.fields);
                    if !self.check_field_list(table, &fields, "primary key", location) {
                        continue;
                    }
                    let inline_marker = owner.is_some() && pk.fields.is_empty();
                    match &mut keys.primary_key {
                        Some(existing) if inline_marker && keys.primary_key_inline => {
                            existing.fields.extend(fields);
                        }
                        Some(_) => self.diagnostics.push_error(
                            Diagnostic::error(
                                DiagnosticKind::ConstraintWellFormedness,
                                "table declares more than one primary key",
                            )
                            .in_table(&table.name)
                            .at(location),
                        ),
                        None => {
                            keys.primary_key_inline = inline_marker;
                            keys.primary_key = Some(KeyConstraint {
                                name: pk.name.clone(),
                                fields,
                                primary: true,
                            });
                        }
                    }
                }
                Constraint::Unique(unique) => {
                    let fields = fields_of(&unique.fields);
                    if self.check_field_list(table, &fields, "unique", location) {
                        keys.unique_keys.push(KeyConstraint {
                            name: unique.name.clone(),
                            fields,
                            primary: false,
                        });
                    }
                }
                Constraint::ForeignKey(fk) => {
                    let fields = fields_of(&fk.fields);
                    if !self.check_field_list(table, &fields, "foreign key", location) {
                        continue;
                    }
                    if self.check_foreign_target(table, &fields, fk, location) {
                        keys.foreign_keys.push(ValidatedForeignKey {
                            name: fk.name.clone(),
                            fields,
                            target_table: fk.target_table.clone(),
                            target_fields: fk.target_fields.clone(),
                            distribution: fk.distribution,
                        });
                    }
                }
                Constraint::Range(_)
                | Constraint::Pattern(_)
                | Constraint::Enum(_)
                | Constraint::Length(_)
                    if owner.is_none() =>
                {
                    self.diagnostics.push_error(
                        Diagnostic::error(
                            DiagnosticKind::ConstraintWellFormedness,
                            format!("{} must be attached to a field or type", constraint.kind_name()),
                        )
                        .in_table(&table.name)
                        .at(location),
                    );
                }
                _ => {}
            }
        }

        keys
    }

    fn check_field_list(
        &mut self,
        table: &Table,
        fields: &[String],
        what: &str,
        location: Option<SourceLocation>,
    ) -> bool {
        if fields.is_empty() {
            self.diagnostics.push_error(
                Diagnostic::error(
                    DiagnosticKind::ConstraintWellFormedness,
                    format!("{what} has no fields"),
                )
                .in_table(&table.name)
                .at(location),
            );
            return false;
        }
        let mut ok = true;
        let mut seen = HashSet::new();
        for name in fields {
            if !seen.insert(name.as_str()) {
                self.diagnostics.push_error(
                    Diagnostic::error(
                        DiagnosticKind::ConstraintWellFormedness,
                        format!("{what} lists field '{name}' twice"),
                    )
                    .in_table(&table.name)
                    .at(location),
                );
                ok = false;
            } else if !self
                .symbols
                .table(&table.name)
                .is_some_and(|symbol| symbol.has_field(name))
            {
                self.diagnostics.push_error(
                    Diagnostic::error(
                        DiagnosticKind::UndefinedField,
                        format!("{what} references unknown field '{name}'"),
                    )
                    .in_table(&table.name)
                    .on_field(name)
                    .at(location),
                );
                ok = false;
            }
        }
        ok
    }

    fn check_foreign_target(
        &mut self,
        table: &Table,
        fields: &[String],
        fk: &ForeignKey,
        location: Option<SourceLocation>,
    ) -> bool {
        let error = |kind: DiagnosticKind, message: String| {
            Diagnostic::error(kind, message)
                .in_table(&table.name)
                .at(location)
        };

        let schema = self.schema;
        let Some(target) = schema.table(&fk.target_table) else {
            self.diagnostics.push_error(error(
                DiagnosticKind::UndefinedTable,
                format!("foreign key references unknown table '{}'", fk.target_table),
            ));
            return false;
        };
        if fk.target_fields.len() != fields.len() {
            self.diagnostics.push_error(error(
                DiagnosticKind::ConstraintWellFormedness,
                format!(
                    "foreign key has {} field(s) but references {} field(s)",
                    fields.len(),
                    fk.target_fields.len()
                ),
            ));
            return false;
        }

        let mut ok = true;
        for (local, remote) in fields.iter().zip(&fk.target_fields) {
            let Some(target_field) = target.field(remote) else {
                self.diagnostics.push_error(
                    error(
                        DiagnosticKind::UndefinedField,
                        format!(
                            "foreign key references unknown field '{}.{remote}'",
                            target.name
                        ),
                    )
                    .on_field(local),
                );
                ok = false;
                continue;
            };
            let local_field = table.field(local);
            let local_terminal = local_field.and_then(|field| self.registry.resolve(&field.data_type).ok());
            let remote_terminal = self.registry.resolve(&target_field.data_type).ok();
            if let (Some(local_type), Some(remote_type)) = (local_terminal, remote_terminal)
                && local_type.terminal != remote_type.terminal
            {
                self.diagnostics.push_error(
                    error(
                        DiagnosticKind::ConstraintWellFormedness,
                        format!(
                            "foreign key field '{local}' is {} but '{}.{remote}' is {}",
                            local_type.terminal, target.name, remote_type.terminal
                        ),
                    )
                    .on_field(local),
                );
                ok = false;
            }
        }
        if !ok {
            return false;
        }

        let wanted: BTreeSet<&str> = fk.target_fields.iter().map(String::as_str).collect();
        let covered = target.all_constraints().any(|(owner, constraint)| {
            let declared: Vec<&str> = match constraint {
                Constraint::PrimaryKey(pk) => key_fields(&pk.fields, owner),
                Constraint::Unique(unique) => key_fields(&unique.fields, owner),
                _ => return false,
            };
            declared.into_iter().collect::<BTreeSet<_>>() == wanted
        }) || inline_primary_key(target).is_some_and(|pk| pk == wanted);
        if !covered {
            self.diagnostics.push_error(error(
                DiagnosticKind::ConstraintWellFormedness,
                format!(
                    "foreign key target {}({}) is not declared unique or primary",
                    target.name,
                    fk.target_fields.join(", ")
                ),
            ));
            return false;
        }
        true
    }

    fn compile_checks(&mut self, table: &Table) -> Vec<CompiledCheck> {
        let mut checks = Vec::new();
        for (owner, constraint) in table.all_constraints() {
            let Constraint::Check(check) = constraint else {
                continue;
            };
            let location = owner.and_then(|field| field.location).or(table.location);
            let parsed = match expr::parse(&check.expression) {
                Ok(parsed) => parsed,
                Err(err) => {
                    self.diagnostics.push_error(
                        Diagnostic::error(
                            DiagnosticKind::ConstraintWellFormedness,
                            format!("invalid check expression '{}': {err}", check.expression),
                        )
                        .in_table(&table.name)
                        .at(location),
                    );
                    continue;
                }
            };
            let mut ok = true;
            for name in parsed.fields() {
                if table.field(&name).is_none() {
                    self.diagnostics.push_error(
                        Diagnostic::error(
                            DiagnosticKind::UndefinedField,
                            format!("check expression references unknown field '{name}'"),
                        )
                        .in_table(&table.name)
                        .on_field(&name)
                        .at(location),
                    );
                    ok = false;
                }
            }
            if ok {
                checks.push(CompiledCheck {
                    name: check.name.clone(),
                    source: check.expression.clone(),
                    expr: parsed,
                });
            }
        }
        checks
    }

    fn validate_directive(&mut self, table: &Table) -> ValidatedDirective {
        let Some(directive) = &table.directive else {
            return ValidatedDirective::default();
        };
        let error = |message: String| {
            Diagnostic::error(DiagnosticKind::InvalidDirective, message)
                .in_table(&table.name)
                .at(directive.location.or(table.location))
        };

        let strategy = match StrategyKind::parse(&directive.strategy) {
            Some(kind) => kind,
            None => {
                self.diagnostics.push_error(error(format!(
                    "unknown strategy '{}'",
                    directive.strategy
                )));
                StrategyKind::Random
            }
        };

        let mut overrides = BTreeMap::new();
        for (field, entry) in &directive.overrides {
            if table.field(field).is_none() {
                self.diagnostics.push_error(
                    Diagnostic::error(
                        DiagnosticKind::UndefinedField,
                        format!("directive overrides unknown field '{field}'"),
                    )
                    .in_table(&table.name)
                    .on_field(field)
                    .at(directive.location),
                );
                continue;
            }
            match StrategyKind::parse(&entry.strategy) {
                Some(kind) => {
                    overrides.insert(
                        field.clone(),
                        ValidatedOverride {
                            strategy: kind,
                            options: entry.options.clone(),
                        },
                    );
                }
                None => self.diagnostics.push_error(
                    error(format!("unknown strategy '{}'", entry.strategy)).on_field(field),
                ),
            }
        }

        if let Some(raw) = directive.options.get("distribution") {
            let parsed = raw.as_str().and_then(Distribution::parse);
            if parsed.is_none() {
                self.diagnostics
                    .push_error(error(format!("unknown distribution {raw}")));
            }
        }

        ValidatedDirective {
            count: directive.count,
            strategy,
            options: directive.options.clone(),
            overrides,
        }
    }

    fn advisory_warnings(&mut self, tables: &[ValidatedTable]) {
        for table in tables {
            if table.primary_key.is_none() && table.unique_keys.is_empty() {
                self.diagnostics.push_warning(
                    Diagnostic::warning(
                        DiagnosticKind::MissingKey,
                        format!(
                            "table '{}' has no primary key or unique constraint; rows are identified by position",
                            table.name
                        ),
                    )
                    .in_table(&table.name)
                    .at(table.location),
                );
            }
        }

        let schema = self.schema;
        for decl in schema.type_decls() {
            if decl.constraints.is_empty() {
                self.diagnostics.push_warning(
                    Diagnostic::warning(
                        DiagnosticKind::RedundantType,
                        format!(
                            "type '{}' adds no constraint to {}",
                            decl.name, decl.base
                        ),
                    )
                    .at(decl.location),
                );
            }
            if !self.used_types.contains(&decl.name) {
                self.diagnostics.push_warning(
                    Diagnostic::warning(
                        DiagnosticKind::UnusedType,
                        format!("type '{}' is never used", decl.name),
                    )
                    .at(decl.location),
                );
            }
        }
    }
}

#[derive(Debug, Default)]
struct TableKeys {
    primary_key: Option<KeyConstraint>,
    primary_key_inline: bool,
    unique_keys: Vec<KeyConstraint>,
    foreign_keys: Vec<ValidatedForeignKey>,
}

fn key_fields<'f>(fields: &'f [String], owner: Option<&'f Field>) -> Vec<&'f str> {
    match (fields.is_empty(), owner) {
        (true, Some(field)) => vec![field.name.as_str()],
        _ => fields.iter().map(String::as_str).collect(),
    }
}

/// Composite key assembled from several inline `primary key` markers.
fn inline_primary_key(table: &Table) -> Option<BTreeSet<&str>> {
    let fields: BTreeSet<&str> = table
        .fields
        .iter()
        .filter(|field| {
            field.constraints.iter().any(|constraint| {
                matches!(constraint, Constraint::PrimaryKey(pk) if pk.fields.is_empty())
            })
        })
        .map(|field| field.name.as_str())
        .collect();
    (fields.len() > 1).then_some(fields)
}

fn error_diagnostic(err: &Error) -> Diagnostic {
    let kind = err
        .kind()
        .unwrap_or(DiagnosticKind::ConstraintWellFormedness);
    Diagnostic::error(kind, err.to_string())
}
