//! Lazily loaded relationships between models.
//!
//! A relation matches `local_key` on the related model against the
//! parent's `parent_key` attribute, loads on first access and caches the
//! result until [`HasOne::reset`] / [`HasMany::reset`].
//!
//! ```ignore
//! let mut comments = HasMany::<Comment>::new("id", "post_id");
//! for comment in comments.get(&executor, post.model()).await? {
//!     println!("{}", comment.model().body);
//! }
//!
//! let mut post = HasOne::<Post>::new("post_id", "id");
//! let parent = post.get(&executor, comment.model()).await?;
//! ```

use spork_core::Attributes;

use crate::error::{OrmError, Result};
use crate::executor::Executor;
use crate::model::{Model, Record};
use crate::query::ModelQuery;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Keys {
    parent_key: &'static str,
    local_key: &'static str,
}

impl Keys {
    /// Query for the related rows, or `None` when the parent key is null.
    fn query<M: Model, P: Attributes>(self, parent: &P) -> Result<Option<ModelQuery<M>>> {
        let value = parent
            .attributes()
            .get(self.parent_key)
            .cloned()
            .ok_or_else(|| OrmError::MissingColumn(self.parent_key.to_string()))?;
        if value.is_null() {
            return Ok(None);
        }
        let local_key = self.local_key;
        Ok(Some(ModelQuery::new().filter(|q| q.where_eq(local_key, value))))
    }
}

/// At most one related record.
#[derive(Debug)]
pub struct HasOne<M: Model> {
    keys: Keys,
    loaded: bool,
    record: Option<Record<M>>,
}

impl<M: Model> HasOne<M> {
    #[must_use]
    pub const fn new(parent_key: &'static str, local_key: &'static str) -> Self {
        Self {
            keys: Keys {
                parent_key,
                local_key,
            },
            loaded: false,
            record: None,
        }
    }

    /// The query this relation runs for `parent`.
    ///
    /// # Errors
    ///
    /// [`OrmError::MissingColumn`] if `parent` has no `parent_key` attribute.
    pub fn query<P: Attributes>(&self, parent: &P) -> Result<Option<ModelQuery<M>>> {
        self.keys.query(parent)
    }

    /// The related record, loading it on first call.
    ///
    /// # Errors
    ///
    /// [`OrmError::MissingColumn`] and execution errors.
    pub async fn get<P: Attributes + Sync>(
        &mut self,
        executor: &Executor,
        parent: &P,
    ) -> Result<Option<&Record<M>>> {
        if !self.loaded {
            self.record = match self.keys.query::<M, P>(parent)? {
                Some(query) => query.first(executor).await?,
                None => None,
            };
            self.loaded = true;
        }
        Ok(self.record.as_ref())
    }

    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Drops the cached record.
    pub fn reset(&mut self) {
        self.loaded = false;
        self.record = None;
    }
}

/// Any number of related records.
#[derive(Debug)]
pub struct HasMany<M: Model> {
    keys: Keys,
    loaded: Option<Vec<Record<M>>>,
}

impl<M: Model> HasMany<M> {
    #[must_use]
    pub const fn new(parent_key: &'static str, local_key: &'static str) -> Self {
        Self {
            keys: Keys {
                parent_key,
                local_key,
            },
            loaded: None,
        }
    }

    /// The query this relation runs for `parent`.
    ///
    /// # Errors
    ///
    /// [`OrmError::MissingColumn`] if `parent` has no `parent_key` attribute.
    pub fn query<P: Attributes>(&self, parent: &P) -> Result<Option<ModelQuery<M>>> {
        self.keys.query(parent)
    }

    /// The related records, loading them on first call.
    ///
    /// # Errors
    ///
    /// [`OrmError::MissingColumn`] and execution errors.
    pub async fn get<P: Attributes + Sync>(
        &mut self,
        executor: &Executor,
        parent: &P,
    ) -> Result<&[Record<M>]> {
        if self.loaded.is_none() {
            let records = match self.keys.query::<M, P>(parent)? {
                Some(query) => query.get(executor).await?,
                None => Vec::new(),
            };
            self.loaded = Some(records);
        }
        Ok(self.loaded.as_deref().unwrap_or_default())
    }

    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// Drops the cached records.
    pub fn reset(&mut self) {
        self.loaded = None;
    }
}
