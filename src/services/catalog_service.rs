use crate::{
    error::{EngineError, Result},
    models::common::{FeatureSpec, PackageSpec},
};
use sea_orm::{entity::*, query::*, DatabaseConnection, TransactionTrait};
use tracing::{info, instrument};
use uuid::Uuid;

/// Typed repository over the feature/package catalog. The catalog is
/// data-driven (rows, looked up by string code) so features and packages
/// can be added operationally without redeploying.
pub struct CatalogService {
    db: DatabaseConnection,
}

impl CatalogService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn validate_code(code: &str) -> Result<()> {
        if code.is_empty() || code.chars().any(char::is_whitespace) {
            return Err(EngineError::BadRequest(format!(
                "Invalid catalog code: {:?}",
                code
            )));
        }
        Ok(())
    }

    /// Register a feature. Codes are unique and immutable.
    #[instrument(skip(self))]
    pub async fn create_feature(&self, spec: FeatureSpec) -> Result<entity::features::Model> {
        Self::validate_code(&spec.code)?;

        if self.find_feature(&spec.code).await?.is_some() {
            return Err(EngineError::Conflict(format!(
                "Feature {} already exists",
                spec.code
            )));
        }

        let now = time::OffsetDateTime::now_utc();
        let feature = entity::features::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(spec.code.clone()),
            name: Set(spec.name),
            feature_type: Set(spec.feature_type),
            reset_type: Set(spec.reset_type),
            is_active: Set(true),
            created_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        info!("Registered feature {}", feature.code);
        Ok(feature)
    }

    /// Deactivate a feature. Deactivated features resolve as missing.
    #[instrument(skip(self))]
    pub async fn deactivate_feature(&self, code: &str) -> Result<()> {
        let feature = self
            .find_feature(code)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Feature {} does not exist", code)))?;

        let mut active: entity::features::ActiveModel = feature.into();
        active.is_active = Set(false);
        active.update(&self.db).await?;

        info!("Deactivated feature {}", code);
        Ok(())
    }

    /// Register a package together with its feature grants. Fails loudly
    /// when a grant references an unknown feature code.
    #[instrument(skip(self))]
    pub async fn create_package(&self, spec: PackageSpec) -> Result<entity::packages::Model> {
        Self::validate_code(&spec.code)?;

        if self.find_package(&spec.code).await?.is_some() {
            return Err(EngineError::Conflict(format!(
                "Package {} already exists",
                spec.code
            )));
        }

        // Resolve every granted feature before writing anything.
        let mut grant_rows = Vec::with_capacity(spec.grants.len());
        for grant in &spec.grants {
            let feature = self.find_feature(&grant.feature_code).await?.ok_or_else(|| {
                EngineError::NotFound(format!(
                    "Feature {} granted by package {} does not exist",
                    grant.feature_code, spec.code
                ))
            })?;
            grant_rows.push((feature.id, grant.limit_value));
        }

        let now = time::OffsetDateTime::now_utc();
        let package_id = Uuid::new_v4();

        let txn = self.db.begin().await?;

        let package = entity::packages::ActiveModel {
            id: Set(package_id),
            code: Set(spec.code.clone()),
            name: Set(spec.name),
            is_base_package: Set(spec.is_base_package),
            is_stackable: Set(spec.is_stackable),
            is_active: Set(true),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        for (feature_id, limit_value) in grant_rows {
            entity::package_features::ActiveModel {
                id: Set(Uuid::new_v4()),
                package_id: Set(package_id),
                feature_id: Set(feature_id),
                limit_value: Set(limit_value),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;

        info!(
            "Registered package {} with {} grants",
            package.code,
            spec.grants.len()
        );
        Ok(package)
    }

    pub async fn find_feature(&self, code: &str) -> Result<Option<entity::features::Model>> {
        let feature = entity::features::Entity::find()
            .filter(entity::features::Column::Code.eq(code))
            .one(&self.db)
            .await?;
        Ok(feature)
    }

    pub async fn find_package(&self, code: &str) -> Result<Option<entity::packages::Model>> {
        let package = entity::packages::Entity::find()
            .filter(entity::packages::Column::Code.eq(code))
            .one(&self.db)
            .await?;
        Ok(package)
    }

    /// Feature codes granted by a package, used to scope cache
    /// invalidation after package lifecycle changes.
    pub async fn feature_codes_of_package(&self, package_id: Uuid) -> Result<Vec<String>> {
        let codes = entity::package_features::Entity::find()
            .filter(entity::package_features::Column::PackageId.eq(package_id))
            .find_also_related(entity::features::Entity)
            .all(&self.db)
            .await?
            .into_iter()
            .filter_map(|(_, feature)| feature.map(|f| f.code))
            .collect();
        Ok(codes)
    }
}
