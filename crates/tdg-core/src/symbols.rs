use std::collections::BTreeMap;

use crate::ast::SourceLocation;

/// Declared table with its field index.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSymbol {
    pub name: String,
    /// Declaration index within the schema.
    pub index: usize,
    pub location: Option<SourceLocation>,
    fields: BTreeMap<String, FieldSymbol>,
    field_order: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSymbol {
    pub name: String,
    pub index: usize,
    pub location: Option<SourceLocation>,
}

impl TableSymbol {
    pub fn field(&self, name: &str) -> Option<&FieldSymbol> {
        self.fields.get(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> &[String] {
        &self.field_order
    }
}

/// Table and field names of a schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolTable {
    tables: BTreeMap<String, TableSymbol>,
    table_order: Vec<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a table; returns the first declaration when the name is taken.
    pub fn declare_table(
        &mut self,
        name: &str,
        location: Option<SourceLocation>,
    ) -> Result<(), &TableSymbol> {
        if self.tables.contains_key(name) {
            return Err(&self.tables[name]);
        }
        let index = self.table_order.len();
        self.tables.insert(
            name.to_string(),
            TableSymbol {
                name: name.to_string(),
                index,
                location,
                fields: BTreeMap::new(),
                field_order: Vec::new(),
            },
        );
        self.table_order.push(name.to_string());
        Ok(())
    }

    /// Declare a field; returns false when the table is unknown or the field already exists.
    pub fn declare_field(
        &mut self,
        table: &str,
        field: &str,
        location: Option<SourceLocation>,
    ) -> bool {
        let Some(symbol) = self.tables.get_mut(table) else {
            return false;
        };
        if symbol.fields.contains_key(field) {
            return false;
        }
        let index = symbol.field_order.len();
        symbol.fields.insert(
            field.to_string(),
            FieldSymbol {
                name: field.to_string(),
                index,
                location,
            },
        );
        symbol.field_order.push(field.to_string());
        true
    }

    pub fn table(&self, name: &str) -> Option<&TableSymbol> {
        self.tables.get(name)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn field(&self, table: &str, field: &str) -> Option<&FieldSymbol> {
        self.tables.get(table)?.field(field)
    }

    /// Table names in declaration order.
    pub fn table_names(&self) -> &[String] {
        &self.table_order
    }
}
