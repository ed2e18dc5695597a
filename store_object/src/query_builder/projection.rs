//! Projection directives
//!
//! `include` pulls related records into the result, `select` narrows the returned
//! fields. The two are mutually exclusive; when both are given `include` wins.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub include: Option<Vec<String>>,
    pub select: Option<Vec<String>>,
}

/// Resolved projection handed to the store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Projection {
    #[default]
    Full,
    Include(Vec<String>),
    Select(Vec<String>),
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = Some(relations.into_iter().map(Into::into).collect());
        self
    }

    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn projection(&self) -> Projection {
        match (&self.include, &self.select) {
            (Some(include), _) => Projection::Include(include.clone()),
            (None, Some(select)) => Projection::Select(select.clone()),
            (None, None) => Projection::Full,
        }
    }
}
