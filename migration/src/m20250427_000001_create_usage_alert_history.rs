use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UsageAlertHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UsageAlertHistory::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UsageAlertHistory::WorkspaceId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UsageAlertHistory::FeatureCode)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UsageAlertHistory::Threshold)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(UsageAlertHistory::Metadata).json().null())
                    .col(
                        ColumnDef::new(UsageAlertHistory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UsageAlertHistory::ResolvedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Unresolved-alert lookups are always scoped to workspace + feature.
        manager
            .create_index(
                Index::create()
                    .name("idx_usage_alert_history_workspace_feature")
                    .table(UsageAlertHistory::Table)
                    .col(UsageAlertHistory::WorkspaceId)
                    .col(UsageAlertHistory::FeatureCode)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UsageAlertHistory::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UsageAlertHistory {
    Table,
    Id,
    WorkspaceId,
    FeatureCode,
    Threshold,
    Metadata,
    CreatedAt,
    ResolvedAt,
}
