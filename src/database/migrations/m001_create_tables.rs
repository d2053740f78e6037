use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Projects::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Projects::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Projects::Name).string().not_null())
                    .col(ColumnDef::new(Projects::Description).string())
                    .col(
                        ColumnDef::new(Projects::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Projects::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SchemaTables::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SchemaTables::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SchemaTables::ProjectId).string().not_null())
                    .col(ColumnDef::new(SchemaTables::Name).string().not_null())
                    .col(ColumnDef::new(SchemaTables::Description).string())
                    .col(ColumnDef::new(SchemaTables::PositionX).double().not_null())
                    .col(ColumnDef::new(SchemaTables::PositionY).double().not_null())
                    .col(ColumnDef::new(SchemaTables::Color).string())
                    .col(
                        ColumnDef::new(SchemaTables::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SchemaTables::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-schema_tables-project_id")
                            .from(SchemaTables::Table, SchemaTables::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SchemaColumns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SchemaColumns::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SchemaColumns::TableId).string().not_null())
                    .col(ColumnDef::new(SchemaColumns::Name).string().not_null())
                    .col(ColumnDef::new(SchemaColumns::DataType).string().not_null())
                    .col(ColumnDef::new(SchemaColumns::Length).integer())
                    .col(ColumnDef::new(SchemaColumns::Precision).integer())
                    .col(ColumnDef::new(SchemaColumns::Scale).integer())
                    .col(ColumnDef::new(SchemaColumns::Nullable).boolean().not_null())
                    .col(
                        ColumnDef::new(SchemaColumns::IsPrimaryKey)
                            .boolean()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SchemaColumns::IsUnique).boolean().not_null())
                    .col(
                        ColumnDef::new(SchemaColumns::IsAutoIncrement)
                            .boolean()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SchemaColumns::DefaultValue).string())
                    .col(ColumnDef::new(SchemaColumns::Description).string())
                    .col(
                        ColumnDef::new(SchemaColumns::OrderIndex)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SchemaColumns::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SchemaColumns::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-schema_columns-table_id")
                            .from(SchemaColumns::Table, SchemaColumns::TableId)
                            .to(SchemaTables::Table, SchemaTables::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Relationships::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Relationships::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Relationships::ProjectId).string().not_null())
                    .col(ColumnDef::new(Relationships::Name).string())
                    .col(
                        ColumnDef::new(Relationships::SourceTableId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Relationships::SourceColumnId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Relationships::TargetTableId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Relationships::TargetColumnId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Relationships::OnDelete).string().not_null())
                    .col(ColumnDef::new(Relationships::OnUpdate).string().not_null())
                    .col(
                        ColumnDef::new(Relationships::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Relationships::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-relationships-project_id")
                            .from(Relationships::Table, Relationships::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Viewports::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Viewports::ProjectId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Viewports::Zoom).double().not_null())
                    .col(ColumnDef::new(Viewports::OffsetX).double().not_null())
                    .col(ColumnDef::new(Viewports::OffsetY).double().not_null())
                    .col(
                        ColumnDef::new(Viewports::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-viewports-project_id")
                            .from(Viewports::Table, Viewports::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Indexes for the per-project and per-table lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_schema_tables_project_id")
                    .table(SchemaTables::Table)
                    .col(SchemaTables::ProjectId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_schema_columns_table_id")
                    .table(SchemaColumns::Table)
                    .col(SchemaColumns::TableId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_relationships_project_id")
                    .table(Relationships::Table)
                    .col(Relationships::ProjectId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Viewports::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Relationships::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SchemaColumns::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SchemaTables::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Projects::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(Iden)]
enum Projects {
    Table,
    Id,
    Name,
    Description,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum SchemaTables {
    Table,
    Id,
    ProjectId,
    Name,
    Description,
    PositionX,
    PositionY,
    Color,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum SchemaColumns {
    Table,
    Id,
    TableId,
    Name,
    DataType,
    Length,
    Precision,
    Scale,
    Nullable,
    IsPrimaryKey,
    IsUnique,
    IsAutoIncrement,
    DefaultValue,
    Description,
    OrderIndex,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Relationships {
    Table,
    Id,
    ProjectId,
    Name,
    SourceTableId,
    SourceColumnId,
    TargetTableId,
    TargetColumnId,
    OnDelete,
    OnUpdate,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Viewports {
    Table,
    ProjectId,
    Zoom,
    OffsetX,
    OffsetY,
    UpdatedAt,
}
