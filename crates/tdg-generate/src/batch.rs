//! Batch sizing from estimated in-memory record size.

use std::mem::size_of;

use tdg_core::{
    Bounds, GeneratedValue, PrimitiveType, TerminalType, ValidatedField, ValidatedTable,
};

use crate::generators::primitives::{
    DEFAULT_ARRAY_LEN, DEFAULT_BINARY_LEN, DEFAULT_TEXT_LEN, length_range,
};

const UUID_BYTES: u64 = 36;
const JSON_BYTES: u64 = 128;

/// Records per batch: `ceiling / estimated_record_bytes`, clamped to `[1, max_batch_size]`.
pub fn batch_size(table: &ValidatedTable, ceiling_bytes: usize, max_batch_size: usize) -> usize {
    let record_bytes = estimated_record_bytes(table).max(1);
    let fit = usize::try_from(ceiling_bytes as u64 / record_bytes).unwrap_or(usize::MAX);
    fit.clamp(1, max_batch_size.max(1))
}

pub fn estimated_record_bytes(table: &ValidatedTable) -> u64 {
    table
        .fields
        .iter()
        .map(estimated_field_bytes)
        .fold(0, u64::saturating_add)
}

/// Slot size plus the largest heap payload the generators will sample for the field.
pub fn estimated_field_bytes(field: &ValidatedField) -> u64 {
    let slot = size_of::<GeneratedValue>() as u64;
    let length = field.domain.length;
    match field.terminal {
        TerminalType::Primitive(primitive) => {
            slot.saturating_add(payload_bytes(primitive, length))
        }
        TerminalType::Array { item, length: fixed } => {
            let count = fixed
                .map(u64::from)
                .unwrap_or_else(|| length_range(length, DEFAULT_ARRAY_LEN).1);
            let item_bytes = slot.saturating_add(payload_bytes(item, Bounds::default()));
            slot.saturating_add(count.saturating_mul(item_bytes))
        }
    }
}

fn payload_bytes(primitive: PrimitiveType, length: Bounds<u64>) -> u64 {
    match primitive {
        PrimitiveType::String => length_range(length, DEFAULT_TEXT_LEN).1,
        PrimitiveType::Binary => length_range(length, DEFAULT_BINARY_LEN).1,
        PrimitiveType::Uuid => UUID_BYTES,
        PrimitiveType::Json => JSON_BYTES,
        PrimitiveType::Integer
        | PrimitiveType::Decimal
        | PrimitiveType::Boolean
        | PrimitiveType::Date
        | PrimitiveType::Timestamp => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tdg_core::{Constraint, LengthConstraint, ValidatedDirective, ValueDomain};

    fn field(name: &str, terminal: TerminalType, constraints: Vec<Constraint>) -> ValidatedField {
        ValidatedField {
            name: name.to_string(),
            terminal,
            type_name: None,
            domain: ValueDomain::build(terminal, &constraints).expect("domain"),
            constraints,
            nullable: false,
            default: None,
            location: None,
        }
    }

    fn table(fields: Vec<ValidatedField>) -> ValidatedTable {
        ValidatedTable {
            name: "t".to_string(),
            fields,
            primary_key: None,
            unique_keys: Vec::new(),
            foreign_keys: Vec::new(),
            checks: Vec::new(),
            directive: ValidatedDirective::default(),
            location: None,
        }
    }

    #[test]
    fn length_constraints_refine_text_estimates() {
        let short = field(
            "code",
            TerminalType::Primitive(PrimitiveType::String),
            vec![Constraint::Length(LengthConstraint {
                min: None,
                max: Some(4),
            })],
        );
        let long = field(
            "bio",
            TerminalType::Primitive(PrimitiveType::String),
            vec![Constraint::Length(LengthConstraint {
                min: Some(4000),
                max: None,
            })],
        );
        assert!(estimated_field_bytes(&long) > estimated_field_bytes(&short) + 3000);
    }

    #[test]
    fn unbounded_length_constraints_do_not_overflow() {
        let huge = |name: &str, terminal| {
            field(
                name,
                terminal,
                vec![Constraint::Length(LengthConstraint {
                    min: Some(1),
                    max: Some(u64::MAX),
                })],
            )
        };
        let text = huge("notes", TerminalType::Primitive(PrimitiveType::String));
        let tags = huge(
            "tags",
            TerminalType::Array {
                item: PrimitiveType::String,
                length: None,
            },
        );
        let slot = size_of::<GeneratedValue>() as u64;
        assert_eq!(estimated_field_bytes(&text), slot + DEFAULT_TEXT_LEN.1);
        assert_eq!(
            estimated_field_bytes(&tags),
            slot + DEFAULT_ARRAY_LEN.1 * (slot + DEFAULT_TEXT_LEN.1)
        );

        let table = table(vec![text, tags]);
        assert!(batch_size(&table, 8 * 1024 * 1024, 1000) > 1);
    }

    #[test]
    fn batch_size_is_clamped() {
        let table = table(vec![field(
            "id",
            TerminalType::Primitive(PrimitiveType::Integer),
            Vec::new(),
        )]);
        assert_eq!(batch_size(&table, usize::MAX, 500), 500);
        assert_eq!(batch_size(&table, 1, 500), 1);
        let record = estimated_record_bytes(&table) as usize;
        assert_eq!(batch_size(&table, record * 10, 500), 10);
    }
}
