// ==========================================
// Site Progress - catalog API
// ==========================================
// Read-only access to the construction-type catalog. Stage lists are
// always returned in build order.
// ==========================================

use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::catalog::{ConstructionStage, ConstructionType};
use crate::repository::catalog_repo::CatalogRepository;

pub struct CatalogApi {
    catalog_repo: Arc<CatalogRepository>,
}

impl CatalogApi {
    pub fn new(catalog_repo: Arc<CatalogRepository>) -> Self {
        Self { catalog_repo }
    }

    pub fn list_construction_types(&self) -> ApiResult<Vec<ConstructionType>> {
        Ok(self.catalog_repo.list_construction_types()?)
    }

    /// Ordered stage list for a construction type
    pub fn list_stages(&self, construction_type_id: &str) -> ApiResult<Vec<ConstructionStage>> {
        if construction_type_id.trim().is_empty() {
            return Err(ApiError::InvalidInput(
                "construction type id must not be empty".to_string(),
            ));
        }
        if self
            .catalog_repo
            .find_construction_type(construction_type_id)?
            .is_none()
        {
            return Err(ApiError::NotFound(format!(
                "construction type {} does not exist",
                construction_type_id
            )));
        }
        Ok(self.catalog_repo.list_stages(construction_type_id)?)
    }
}
