use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m001_rule_schema"
    }
}

#[derive(DeriveIden)]
enum Services {
    Table,
    Id,
    TenantId,
    ProjectId,
    ServiceName,
}

#[derive(DeriveIden)]
enum Rules {
    Table,
    Id,
    ServiceId,
    TenantId,
    Engine,
    Name,
    Enabled,
    ActionsJson,
    RootNodeJson,
    CreatedAt,
    UpdatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Services::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Services::Id).big_integer().not_null().primary_key())
                    .col(ColumnDef::new(Services::TenantId).string().not_null())
                    .col(ColumnDef::new(Services::ProjectId).string().not_null())
                    .col(ColumnDef::new(Services::ServiceName).string().not_null())
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_services_scope")
                    .table(Services::Table)
                    .col(Services::TenantId)
                    .col(Services::ServiceName)
                    .col(Services::ProjectId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Rules::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Rules::Id).big_integer().not_null().primary_key())
                    .col(ColumnDef::new(Rules::ServiceId).big_integer().not_null())
                    .col(ColumnDef::new(Rules::TenantId).string().not_null())
                    .col(ColumnDef::new(Rules::Engine).string().not_null())
                    .col(ColumnDef::new(Rules::Name).string().not_null())
                    .col(ColumnDef::new(Rules::Enabled).boolean().not_null().default(true))
                    .col(ColumnDef::new(Rules::ActionsJson).text().not_null())
                    .col(ColumnDef::new(Rules::RootNodeJson).text().not_null())
                    .col(
                        ColumnDef::new(Rules::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Rules::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rules_service")
                            .from(Rules::Table, Rules::ServiceId)
                            .to(Services::Table, Services::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_rules_service_engine")
                    .table(Rules::Table)
                    .col(Rules::ServiceId)
                    .col(Rules::Engine)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Rules::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Services::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}
