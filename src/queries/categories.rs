use crate::backend::CatalogBackend;
use crate::error::Result;
use crate::models::Category;
use crate::query;

pub struct CategoryQuery<'a> {
    backend: &'a dyn CatalogBackend,
}

impl<'a> CategoryQuery<'a> {
    pub fn new(backend: &'a dyn CatalogBackend) -> Self {
        Self { backend }
    }

    /// Every category, ordered by name.
    pub async fn list(&self) -> Result<Vec<Category>> {
        let rows = self.backend.execute(&query::categories()).await?;
        super::decode_rows(rows)
    }
}
