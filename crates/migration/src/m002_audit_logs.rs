use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m002_audit_logs"
    }
}

#[derive(DeriveIden)]
enum AuditLogs {
    Table,
    Id,
    TenantId,
    ServiceName,
    ProjectId,
    EventType,
    Timestamp,
    EventJson,
    UsedRules,
    UsedActions,
    Language,
    Engine,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AuditLogs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AuditLogs::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(AuditLogs::TenantId).string().not_null())
                    .col(ColumnDef::new(AuditLogs::ServiceName).string().not_null())
                    .col(ColumnDef::new(AuditLogs::ProjectId).string().not_null())
                    .col(ColumnDef::new(AuditLogs::EventType).string().not_null())
                    .col(ColumnDef::new(AuditLogs::Timestamp).string().not_null())
                    .col(ColumnDef::new(AuditLogs::EventJson).text().not_null())
                    .col(ColumnDef::new(AuditLogs::UsedRules).text().not_null())
                    .col(ColumnDef::new(AuditLogs::UsedActions).text().not_null())
                    .col(ColumnDef::new(AuditLogs::Language).string().not_null())
                    .col(ColumnDef::new(AuditLogs::Engine).string().not_null())
                    .col(
                        ColumnDef::new(AuditLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_audit_logs_scope")
                    .table(AuditLogs::Table)
                    .col(AuditLogs::TenantId)
                    .col(AuditLogs::ServiceName)
                    .col(AuditLogs::CreatedAt)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuditLogs::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}
