//! Binding sections and statement kinds.

use crate::value::SqlValue;

/// Purpose a bound value was staged for.
///
/// Declaration order is the order sections are walked when binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    /// `INSERT ... VALUES` values.
    Insert,
    /// `UPDATE ... SET` values.
    Update,
    /// `WHERE` values, including absorbed sub-select values.
    Where,
    /// `HAVING` values.
    Having,
}

impl Section {
    /// Every section in binding order.
    pub const ALL: [Self; 4] = [Self::Insert, Self::Update, Self::Where, Self::Having];
}

/// Statement a descriptor is compiled into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Exists,
    Insert,
    InsertMany,
    Update,
    Delete,
}

impl StatementKind {
    /// Sections whose values the statement's placeholders consume, in order.
    #[must_use]
    pub const fn sections(self) -> &'static [Section] {
        match self {
            Self::Select | Self::Exists => &[Section::Where, Section::Having],
            Self::Insert | Self::InsertMany => &[Section::Insert],
            Self::Update => &[Section::Update, Section::Where],
            Self::Delete => &[Section::Where],
        }
    }
}

/// Values staged for a descriptor, grouped by [`Section`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    insert: Vec<SqlValue>,
    update: Vec<SqlValue>,
    wheres: Vec<SqlValue>,
    having: Vec<SqlValue>,
}

impl Bindings {
    /// Appends a value to a section.
    pub fn add(&mut self, section: Section, value: SqlValue) {
        self.section_mut(section).push(value);
    }

    /// Appends several values to a section, keeping their order.
    pub fn extend(&mut self, section: Section, values: impl IntoIterator<Item = SqlValue>) {
        self.section_mut(section).extend(values);
    }

    /// Values of one section.
    #[must_use]
    pub fn section(&self, section: Section) -> &[SqlValue] {
        match section {
            Section::Insert => &self.insert,
            Section::Update => &self.update,
            Section::Where => &self.wheres,
            Section::Having => &self.having,
        }
    }

    fn section_mut(&mut self, section: Section) -> &mut Vec<SqlValue> {
        match section {
            Section::Insert => &mut self.insert,
            Section::Update => &mut self.update,
            Section::Where => &mut self.wheres,
            Section::Having => &mut self.having,
        }
    }

    /// Values consumed by `kind`, in placeholder order.
    #[must_use]
    pub fn for_statement(&self, kind: StatementKind) -> Vec<SqlValue> {
        kind.sections()
            .iter()
            .flat_map(|section| self.section(*section).iter().cloned())
            .collect()
    }

    /// Every staged value, sections in declaration order.
    #[must_use]
    pub fn flatten(&self) -> Vec<SqlValue> {
        Section::ALL
            .iter()
            .flat_map(|section| self.section(*section).iter().cloned())
            .collect()
    }

    /// Total number of staged values.
    #[must_use]
    pub fn len(&self) -> usize {
        Section::ALL.iter().map(|s| self.section(*s).len()).sum()
    }

    /// Returns `true` when nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
