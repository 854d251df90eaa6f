use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Feature catalog
        manager
            .create_table(
                Table::create()
                    .table(Features::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Features::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Features::Code).string().not_null())
                    .col(ColumnDef::new(Features::Name).string().not_null())
                    .col(ColumnDef::new(Features::FeatureType).string().not_null())
                    .col(ColumnDef::new(Features::ResetType).string().not_null())
                    .col(
                        ColumnDef::new(Features::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Features::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_features_code")
                    .table(Features::Table)
                    .col(Features::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Package catalog
        manager
            .create_table(
                Table::create()
                    .table(Packages::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Packages::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Packages::Code).string().not_null())
                    .col(ColumnDef::new(Packages::Name).string().not_null())
                    .col(
                        ColumnDef::new(Packages::IsBasePackage)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Packages::IsStackable)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Packages::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Packages::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_packages_code")
                    .table(Packages::Table)
                    .col(Packages::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Feature grants per package
        manager
            .create_table(
                Table::create()
                    .table(PackageFeatures::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PackageFeatures::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PackageFeatures::PackageId).uuid().not_null())
                    .col(ColumnDef::new(PackageFeatures::FeatureId).uuid().not_null())
                    .col(ColumnDef::new(PackageFeatures::LimitValue).big_integer().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_package_features_package")
                            .from(PackageFeatures::Table, PackageFeatures::PackageId)
                            .to(Packages::Table, Packages::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_package_features_feature")
                            .from(PackageFeatures::Table, PackageFeatures::FeatureId)
                            .to(Features::Table, Features::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_package_features_package_feature")
                    .table(PackageFeatures::Table)
                    .col(PackageFeatures::PackageId)
                    .col(PackageFeatures::FeatureId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Workspace <-> package join with lifecycle status
        manager
            .create_table(
                Table::create()
                    .table(WorkspacePackages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WorkspacePackages::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(WorkspacePackages::WorkspaceId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(WorkspacePackages::PackageId).uuid().not_null())
                    .col(ColumnDef::new(WorkspacePackages::Status).string().not_null())
                    .col(
                        ColumnDef::new(WorkspacePackages::BillingCycleAnchor)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WorkspacePackages::ExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(WorkspacePackages::ExternalServiceId)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(WorkspacePackages::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WorkspacePackages::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_workspace_packages_package")
                            .from(WorkspacePackages::Table, WorkspacePackages::PackageId)
                            .to(Packages::Table, Packages::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_workspace_packages_workspace_status")
                    .table(WorkspacePackages::Table)
                    .col(WorkspacePackages::WorkspaceId)
                    .col(WorkspacePackages::Status)
                    .to_owned(),
            )
            .await?;

        // Temporary limit boosts
        manager
            .create_table(
                Table::create()
                    .table(Boosts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Boosts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Boosts::WorkspaceId).uuid().not_null())
                    .col(ColumnDef::new(Boosts::FeatureCode).string().not_null())
                    .col(ColumnDef::new(Boosts::BoostType).string().not_null())
                    .col(ColumnDef::new(Boosts::DurationType).string().not_null())
                    .col(ColumnDef::new(Boosts::LimitValue).big_integer().null())
                    .col(
                        ColumnDef::new(Boosts::ConsumedQuantity)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Boosts::Status).string().not_null())
                    .col(
                        ColumnDef::new(Boosts::StartsAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Boosts::ExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Boosts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Boosts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_boosts_workspace_feature_status")
                    .table(Boosts::Table)
                    .col(Boosts::WorkspaceId)
                    .col(Boosts::FeatureCode)
                    .col(Boosts::Status)
                    .to_owned(),
            )
            .await?;

        // Append-only usage ledger
        manager
            .create_table(
                Table::create()
                    .table(UsageRecords::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UsageRecords::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(UsageRecords::WorkspaceId).uuid().not_null())
                    .col(ColumnDef::new(UsageRecords::FeatureCode).string().not_null())
                    .col(ColumnDef::new(UsageRecords::Quantity).big_integer().not_null())
                    .col(ColumnDef::new(UsageRecords::UserId).uuid().null())
                    .col(ColumnDef::new(UsageRecords::Metadata).json().null())
                    .col(
                        ColumnDef::new(UsageRecords::RecordedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_usage_records_workspace_feature_recorded")
                    .table(UsageRecords::Table)
                    .col(UsageRecords::WorkspaceId)
                    .col(UsageRecords::FeatureCode)
                    .col(UsageRecords::RecordedAt)
                    .to_owned(),
            )
            .await?;

        // Append-only audit trail
        manager
            .create_table(
                Table::create()
                    .table(EntitlementLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EntitlementLogs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(EntitlementLogs::WorkspaceId).uuid().not_null())
                    .col(ColumnDef::new(EntitlementLogs::Action).string().not_null())
                    .col(ColumnDef::new(EntitlementLogs::Source).string().not_null())
                    .col(ColumnDef::new(EntitlementLogs::Metadata).json().null())
                    .col(
                        ColumnDef::new(EntitlementLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_entitlement_logs_workspace_action")
                    .table(EntitlementLogs::Table)
                    .col(EntitlementLogs::WorkspaceId)
                    .col(EntitlementLogs::Action)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EntitlementLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UsageRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Boosts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WorkspacePackages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PackageFeatures::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Packages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Features::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Features {
    Table,
    Id,
    Code,
    Name,
    FeatureType,
    ResetType,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Packages {
    Table,
    Id,
    Code,
    Name,
    IsBasePackage,
    IsStackable,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
enum PackageFeatures {
    Table,
    Id,
    PackageId,
    FeatureId,
    LimitValue,
}

#[derive(DeriveIden)]
enum WorkspacePackages {
    Table,
    Id,
    WorkspaceId,
    PackageId,
    Status,
    BillingCycleAnchor,
    ExpiresAt,
    ExternalServiceId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Boosts {
    Table,
    Id,
    WorkspaceId,
    FeatureCode,
    BoostType,
    DurationType,
    LimitValue,
    ConsumedQuantity,
    Status,
    StartsAt,
    ExpiresAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum UsageRecords {
    Table,
    Id,
    WorkspaceId,
    FeatureCode,
    Quantity,
    UserId,
    Metadata,
    RecordedAt,
}

#[derive(DeriveIden)]
enum EntitlementLogs {
    Table,
    Id,
    WorkspaceId,
    Action,
    Source,
    Metadata,
    CreatedAt,
}
