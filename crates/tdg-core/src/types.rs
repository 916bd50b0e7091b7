//! Custom type registry.
//!
//! Custom types form chains of `name -> base` links stored as data. Resolution walks a chain
//! iteratively until it reaches a primitive or array terminal, collecting constraints on the way.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use parking_lot::Mutex;

use crate::ast::{DataType, PrimitiveType, SourceLocation};
use crate::constraints::Constraint;
use crate::error::{Error, Result};

/// Primitive or composite type reached at the end of a resolution chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalType {
    Primitive(PrimitiveType),
    Array {
        item: PrimitiveType,
        length: Option<u32>,
    },
}

impl TerminalType {
    /// Primitive of the value itself, or of the elements for arrays.
    pub fn element(&self) -> PrimitiveType {
        match self {
            TerminalType::Primitive(primitive) => *primitive,
            TerminalType::Array { item, .. } => *item,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TerminalType::Array { .. })
    }
}

impl fmt::Display for TerminalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalType::Primitive(primitive) => write!(f, "{primitive}"),
            TerminalType::Array {
                item,
                length: Some(length),
            } => write!(f, "array<{item}, {length}>"),
            TerminalType::Array { item, length: None } => write!(f, "array<{item}>"),
        }
    }
}

/// Registered custom type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDefinition {
    pub name: String,
    pub base: DataType,
    pub constraints: Vec<Constraint>,
    pub location: Option<SourceLocation>,
}

/// Terminal type plus the effective constraints of a chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedType {
    pub terminal: TerminalType,
    /// Most specific first: the named type's own constraints, then its ancestors'.
    pub constraints: Vec<Constraint>,
    /// Custom type names walked, starting at the referenced one.
    pub chain: Vec<String>,
}

#[derive(Debug, Default)]
pub struct TypeRegistry {
    definitions: BTreeMap<String, TypeDefinition>,
    order: Vec<String>,
    resolved: Mutex<HashMap<String, ResolvedType>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom type. Primitive names are reserved.
    pub fn define(
        &mut self,
        name: &str,
        base: DataType,
        constraints: Vec<Constraint>,
        location: Option<SourceLocation>,
    ) -> Result<()> {
        if PrimitiveType::parse(name).is_some() || self.definitions.contains_key(name) {
            return Err(Error::DuplicateName {
                what: "type",
                name: name.to_string(),
            });
        }
        self.definitions.insert(
            name.to_string(),
            TypeDefinition {
                name: name.to_string(),
                base,
                constraints,
                location,
            },
        );
        self.order.push(name.to_string());
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Custom type names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Resolve any type reference to its terminal and effective constraints.
    pub fn resolve(&self, data_type: &DataType) -> Result<ResolvedType> {
        match data_type {
            DataType::Primitive { name } => Ok(ResolvedType {
                terminal: TerminalType::Primitive(*name),
                constraints: Vec::new(),
                chain: Vec::new(),
            }),
            DataType::Array { item, length } => Ok(ResolvedType {
                terminal: TerminalType::Array {
                    item: *item,
                    length: *length,
                },
                constraints: Vec::new(),
                chain: Vec::new(),
            }),
            DataType::Custom { name } => self.resolve_name(name),
        }
    }

    /// Resolve a custom type by name, memoizing the result.
    pub fn resolve_name(&self, name: &str) -> Result<ResolvedType> {
        if let Some(hit) = self.resolved.lock().get(name) {
            return Ok(hit.clone());
        }

        let mut stack: Vec<String> = Vec::new();
        let mut on_stack: HashSet<String> = HashSet::new();
        let mut constraints = Vec::new();
        let mut current = name.to_string();

        let terminal = loop {
            if on_stack.contains(&current) {
                let start = stack
                    .iter()
                    .position(|entry| *entry == current)
                    .unwrap_or_default();
                return Err(Error::CircularType {
                    cycle: stack[start..].to_vec(),
                });
            }

            let cached = self.resolved.lock().get(&current).cloned();
            if let Some(hit) = cached {
                constraints.extend(hit.constraints);
                stack.extend(hit.chain);
                break hit.terminal;
            }

            let definition =
                self.definitions
                    .get(&current)
                    .ok_or_else(|| Error::UndefinedType {
                        name: current.clone(),
                    })?;
            on_stack.insert(current.clone());
            stack.push(current.clone());
            constraints.extend(definition.constraints.iter().cloned());

            match &definition.base {
                DataType::Primitive { name } => break TerminalType::Primitive(*name),
                DataType::Array { item, length } => {
                    break TerminalType::Array {
                        item: *item,
                        length: *length,
                    };
                }
                DataType::Custom { name } => current = name.clone(),
            }
        };

        let resolved = ResolvedType {
            terminal,
            constraints,
            chain: stack,
        };
        self.resolved
            .lock()
            .insert(name.to_string(), resolved.clone());
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Literal;
    use crate::constraints::{PatternConstraint, RangeConstraint};

    fn range(min: i64, max: i64) -> Constraint {
        Constraint::Range(RangeConstraint {
            min: Some(Literal::Int(min)),
            max: Some(Literal::Int(max)),
        })
    }

    #[test]
    fn resolves_three_level_chain_most_specific_first() {
        let mut registry = TypeRegistry::new();
        registry
            .define("C", DataType::custom("B"), vec![range(20, 30)], None)
            .expect("define C");
        registry
            .define("B", DataType::custom("A"), vec![range(10, 40)], None)
            .expect("define B");
        registry
            .define(
                "A",
                DataType::primitive(PrimitiveType::Integer),
                vec![range(0, 50)],
                None,
            )
            .expect("define A");

        let resolved = registry.resolve(&DataType::custom("C")).expect("resolve C");
        assert_eq!(resolved.terminal, TerminalType::Primitive(PrimitiveType::Integer));
        assert_eq!(resolved.constraints, vec![range(20, 30), range(10, 40), range(0, 50)]);
        assert_eq!(resolved.chain, vec!["C", "B", "A"]);

        let memoized = registry.resolve_name("B").expect("resolve B");
        assert_eq!(memoized.constraints, vec![range(10, 40), range(0, 50)]);
        let again = registry.resolve_name("C").expect("resolve C again");
        assert_eq!(again, resolved);
    }

    #[test]
    fn detects_cycles_on_the_resolution_stack() {
        let mut registry = TypeRegistry::new();
        registry
            .define("Root", DataType::custom("A"), Vec::new(), None)
            .expect("define Root");
        registry
            .define("A", DataType::custom("B"), Vec::new(), None)
            .expect("define A");
        registry
            .define("B", DataType::custom("A"), Vec::new(), None)
            .expect("define B");

        match registry.resolve_name("Root") {
            Err(Error::CircularType { cycle }) => assert_eq!(cycle, vec!["A", "B"]),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn rejects_duplicates_and_primitive_names() {
        let mut registry = TypeRegistry::new();
        let base = DataType::primitive(PrimitiveType::String);
        registry
            .define("Email", base.clone(), Vec::new(), None)
            .expect("define Email");
        assert!(matches!(
            registry.define("Email", base.clone(), Vec::new(), None),
            Err(Error::DuplicateName { .. })
        ));
        assert!(matches!(
            registry.define("integer", base, Vec::new(), None),
            Err(Error::DuplicateName { .. })
        ));
    }

    #[test]
    fn reports_undefined_links() {
        let mut registry = TypeRegistry::new();
        registry
            .define(
                "Code",
                DataType::custom("Missing"),
                vec![Constraint::Pattern(PatternConstraint {
                    regex: "^[A-Z]+$".to_string(),
                })],
                None,
            )
            .expect("define Code");
        assert!(matches!(
            registry.resolve_name("Code"),
            Err(Error::UndefinedType { name }) if name == "Missing"
        ));
    }
}
