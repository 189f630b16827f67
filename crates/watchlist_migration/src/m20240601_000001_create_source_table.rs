use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建视频源表，AUTOINCREMENT 保证删除后的 id 不会被复用
        manager
            .create_table(
                Table::create()
                    .table(Source::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Source::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Source::Name).text().not_null())
                    .col(ColumnDef::new(Source::Image).text().null())
                    .col(ColumnDef::new(Source::Active).boolean().not_null().default(false))
                    .col(ColumnDef::new(Source::Order).integer().not_null().default(0))
                    .to_owned(),
            )
            .await?;

        // 名称唯一，重复插入由数据库拒绝
        manager
            .create_index(
                Index::create()
                    .name("idx_source_name")
                    .if_not_exists()
                    .table(Source::Table)
                    .col(Source::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_source_order")
                    .if_not_exists()
                    .table(Source::Table)
                    .col(Source::Order)
                    .to_owned(),
            )
            .await?;

        // 待写入默认视频源的标记，与默认视频源在同一个事务中删除
        manager
            .create_table(
                Table::create()
                    .table(PendingSeed::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PendingSeed::Id).integer().not_null().primary_key())
                    .to_owned(),
            )
            .await?;

        let mut query = Query::insert()
            .into_table(PendingSeed::Table)
            .columns([PendingSeed::Id])
            .to_owned();
        query.values_panic([1.into()]);
        query.on_conflict(OnConflict::column(PendingSeed::Id).do_nothing().to_owned());
        manager.exec_stmt(query).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PendingSeed::Table).to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_source_order").table(Source::Table).to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_source_name").table(Source::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Source::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Source {
    Table,
    Id,
    Name,
    Image,
    Active,
    Order,
}

#[derive(DeriveIden)]
enum PendingSeed {
    Table,
    Id,
}
