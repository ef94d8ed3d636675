use std::fmt;

use tracing::instrument;

use crate::codec::ValueCodec;
use crate::error::MappingError;
use crate::metadata::Mapped;
use crate::value::TypedValue;

/// Shape of a statement produced from an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Insert,
    Update,
    Delete,
    SelectByKey,
}

impl StatementKind {
    /// Whether the statement addresses rows by primary key.
    pub fn is_keyed(&self) -> bool {
        !matches!(self, StatementKind::Insert)
    }
}

/// A `(column, value)` pair.
pub type Clause = (String, TypedValue);

/// Ordered clauses for one statement, ready for a statement builder.
///
/// `key_clauses` are equality predicates ANDed together; `value_clauses` are
/// the inserted values (insert) or assignments (update). Both are in
/// lexicographic column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    kind: StatementKind,
    table: String,
    key_clauses: Vec<Clause>,
    value_clauses: Vec<Clause>,
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn key_clauses(&self) -> &[Clause] {
        &self.key_clauses
    }

    pub fn value_clauses(&self) -> &[Clause] {
        &self.value_clauses
    }

    /// Column names in value-clause order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.value_clauses.iter().map(|(column, _)| column.as_str())
    }
}

/// Renders in the form of the driver's query builder, e.g.
/// `INSERT INTO car (engine,id) VALUES ({manufacturer:{name:'a good one'}},'1');`
impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            StatementKind::Insert => {
                write!(f, "INSERT INTO {} (", self.table)?;
                write_joined(f, self.value_clauses.iter().map(|(c, _)| c), ",")?;
                f.write_str(") VALUES (")?;
                write_joined(f, self.value_clauses.iter().map(|(_, v)| v), ",")?;
                f.write_str(")")?;
            }
            StatementKind::Update => {
                write!(f, "UPDATE {}", self.table)?;
                if !self.value_clauses.is_empty() {
                    f.write_str(" SET ")?;
                    write_joined(f, self.value_clauses.iter().map(Assignment), ",")?;
                }
                write_where(f, &self.key_clauses)?;
            }
            StatementKind::Delete => {
                write!(f, "DELETE FROM {}", self.table)?;
                write_where(f, &self.key_clauses)?;
            }
            StatementKind::SelectByKey => {
                write!(f, "SELECT * FROM {}", self.table)?;
                write_where(f, &self.key_clauses)?;
            }
        }
        f.write_str(";")
    }
}

struct Assignment<'a>(&'a Clause);

impl fmt::Display for Assignment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.0.0, self.0.1)
    }
}

fn write_where(f: &mut fmt::Formatter<'_>, keys: &[Clause]) -> fmt::Result {
    if keys.is_empty() {
        return Ok(());
    }
    f.write_str(" WHERE ")?;
    write_joined(f, keys.iter().map(Assignment), " AND ")
}

fn write_joined<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = T>,
    separator: &str,
) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Routes an entity's properties into the clauses of a statement.
///
/// Every property is visited in lexicographic order of its persisted name.
/// Unset values are written as explicit nulls, never dropped. Identity
/// properties become key predicates for keyed statements; a user type key
/// contributes one predicate holding the whole nested value.
#[derive(Debug, Clone)]
pub struct StatementAssembler {
    codec: ValueCodec,
}

impl StatementAssembler {
    pub fn new(codec: ValueCodec) -> Self {
        StatementAssembler { codec }
    }

    #[instrument(level = "debug", skip(self, entity), fields(entity = std::any::type_name::<E>()))]
    pub fn assemble<E: Mapped>(&self, entity: &E, kind: StatementKind) -> Result<Statement, MappingError> {
        let descriptor = self.codec.metadata().describe::<E>()?;
        if kind.is_keyed() {
            descriptor.require_identity()?;
        }

        let mut key_clauses = Vec::new();
        let mut value_clauses = Vec::new();
        for property in descriptor.properties() {
            let target = match (kind, property.is_identity()) {
                (StatementKind::Insert, _) => &mut value_clauses,
                (StatementKind::Update, false) => &mut value_clauses,
                (_, true) => &mut key_clauses,
                (StatementKind::Delete | StatementKind::SelectByKey, false) => continue,
            };
            let value = property.get(entity, &self.codec)?;
            target.push((property.name().to_string(), value));
        }

        Ok(Statement {
            kind,
            table: descriptor.name().to_string(),
            key_clauses,
            value_clauses,
        })
    }
}
