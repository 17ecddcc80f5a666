use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::admin::ensure_non_empty;
use crate::application::repos::{
    CategoriesRepo, CategoriesWriteRepo, CreateCategoryParams, RepoError, UpdateCategoryParams,
};
use crate::domain::entities::CategoryRecord;
use crate::domain::error::DomainError;

#[derive(Debug, Error)]
pub enum AdminCategoryError {
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error("category {0} not found")]
    NotFound(i64),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct AdminCategoryService {
    reader: Arc<dyn CategoriesRepo>,
    writer: Arc<dyn CategoriesWriteRepo>,
}

impl AdminCategoryService {
    pub fn new(reader: Arc<dyn CategoriesRepo>, writer: Arc<dyn CategoriesWriteRepo>) -> Self {
        Self { reader, writer }
    }

    pub async fn list_categories(&self) -> Result<Vec<CategoryRecord>, AdminCategoryError> {
        self.reader
            .list_categories()
            .await
            .map_err(AdminCategoryError::from)
    }

    pub async fn find_category(&self, id: i64) -> Result<CategoryRecord, AdminCategoryError> {
        self.reader
            .find_category(id)
            .await?
            .ok_or(AdminCategoryError::NotFound(id))
    }

    pub async fn create_category(
        &self,
        actor: &str,
        name: &str,
    ) -> Result<CategoryRecord, AdminCategoryError> {
        ensure_non_empty(name, "name")?;

        let category = self
            .writer
            .create_category(CreateCategoryParams {
                name: name.trim().to_string(),
            })
            .await?;

        info!(
            target = "application::admin::categories",
            actor,
            category_id = category.id,
            "category created"
        );
        Ok(category)
    }

    pub async fn update_category(
        &self,
        actor: &str,
        id: i64,
        name: &str,
    ) -> Result<CategoryRecord, AdminCategoryError> {
        ensure_non_empty(name, "name")?;

        let category = self
            .writer
            .update_category(UpdateCategoryParams {
                id,
                name: name.trim().to_string(),
            })
            .await
            .map_err(|err| not_found_or(err, id))?;

        info!(
            target = "application::admin::categories",
            actor,
            category_id = id,
            "category updated"
        );
        Ok(category)
    }

    pub async fn delete_category(&self, actor: &str, id: i64) -> Result<(), AdminCategoryError> {
        self.writer
            .delete_category(id)
            .await
            .map_err(|err| not_found_or(err, id))?;

        info!(
            target = "application::admin::categories",
            actor,
            category_id = id,
            "category deleted"
        );
        Ok(())
    }
}

fn not_found_or(err: RepoError, id: i64) -> AdminCategoryError {
    match err {
        RepoError::NotFound => AdminCategoryError::NotFound(id),
        other => AdminCategoryError::Repo(other),
    }
}
