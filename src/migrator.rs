use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_users_table::Migration),
            Box::new(m20240301_000002_create_content_table::Migration),
            Box::new(m20240301_000003_create_engagement_tables::Migration),
            Box::new(m20240301_000004_create_watchlist_items_table::Migration),
            Box::new(m20240301_000005_create_cart_tables::Migration),
            Box::new(m20240301_000006_create_order_tables::Migration),
        ]
    }
}

// Migration implementations

mod m20240301_000001_create_users_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Create users table aligned with entities::user Model
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Users::Username)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Users::DateOfBirth).date().null())
                        .col(ColumnDef::new(Users::Address).string().null())
                        .col(ColumnDef::new(Users::RefreshToken).string().null())
                        .col(ColumnDef::new(Users::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Users::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
        Username,
        PasswordHash,
        DateOfBirth,
        Address,
        RefreshToken,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000002_create_content_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_content_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Create content table aligned with entities::content Model
            manager
                .create_table(
                    Table::create()
                        .table(Content::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Content::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Content::Title).string().not_null())
                        .col(ColumnDef::new(Content::Description).string().null())
                        .col(ColumnDef::new(Content::Category).string().not_null())
                        .col(
                            ColumnDef::new(Content::Price)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Content::StreamUrl).string().null())
                        .col(ColumnDef::new(Content::ThumbnailUrl).string().null())
                        .col(ColumnDef::new(Content::DurationSecs).integer().null())
                        .col(ColumnDef::new(Content::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Content::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            // Useful indexes
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_content_category")
                        .table(Content::Table)
                        .col(Content::Category)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_content_title")
                        .table(Content::Table)
                        .col(Content::Title)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_content_created_at")
                        .table(Content::Table)
                        .col(Content::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Content::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Content {
        Table,
        Id,
        Title,
        Description,
        Category,
        Price,
        StreamUrl,
        ThumbnailUrl,
        DurationSecs,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000003_create_engagement_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_engagement_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Create content_likes table
            manager
                .create_table(
                    Table::create()
                        .table(ContentLikes::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ContentLikes::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ContentLikes::ContentId).uuid().not_null())
                        .col(ColumnDef::new(ContentLikes::UserId).uuid().not_null())
                        .col(
                            ColumnDef::new(ContentLikes::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_content_likes_content_id")
                                .from(ContentLikes::Table, ContentLikes::ContentId)
                                .to(Content::Table, Content::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_content_likes_user_id")
                                .from(ContentLikes::Table, ContentLikes::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // One like per user per content row
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_content_likes_content_user")
                        .table(ContentLikes::Table)
                        .col(ContentLikes::ContentId)
                        .col(ContentLikes::UserId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            // Create content_comments table
            manager
                .create_table(
                    Table::create()
                        .table(ContentComments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ContentComments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ContentComments::ContentId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ContentComments::UserId).uuid().not_null())
                        .col(ColumnDef::new(ContentComments::Body).string().not_null())
                        .col(
                            ColumnDef::new(ContentComments::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_content_comments_content_id")
                                .from(ContentComments::Table, ContentComments::ContentId)
                                .to(Content::Table, Content::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_content_comments_user_id")
                                .from(ContentComments::Table, ContentComments::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_content_comments_content_id")
                        .table(ContentComments::Table)
                        .col(ContentComments::ContentId)
                        .to_owned(),
                )
                .await?;

            // Create content_reviews table
            manager
                .create_table(
                    Table::create()
                        .table(ContentReviews::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ContentReviews::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ContentReviews::ContentId).uuid().not_null())
                        .col(ColumnDef::new(ContentReviews::UserId).uuid().not_null())
                        .col(ColumnDef::new(ContentReviews::Body).text().not_null())
                        .col(
                            ColumnDef::new(ContentReviews::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_content_reviews_content_id")
                                .from(ContentReviews::Table, ContentReviews::ContentId)
                                .to(Content::Table, Content::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_content_reviews_user_id")
                                .from(ContentReviews::Table, ContentReviews::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_content_reviews_content_id")
                        .table(ContentReviews::Table)
                        .col(ContentReviews::ContentId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ContentReviews::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ContentComments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ContentLikes::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ContentLikes {
        Table,
        Id,
        ContentId,
        UserId,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum ContentComments {
        Table,
        Id,
        ContentId,
        UserId,
        Body,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum ContentReviews {
        Table,
        Id,
        ContentId,
        UserId,
        Body,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Content {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
    }
}

mod m20240301_000004_create_watchlist_items_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_watchlist_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(WatchlistItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WatchlistItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WatchlistItems::UserId).uuid().not_null())
                        .col(ColumnDef::new(WatchlistItems::ContentId).uuid().not_null())
                        .col(
                            ColumnDef::new(WatchlistItems::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_watchlist_items_user_id")
                                .from(WatchlistItems::Table, WatchlistItems::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_watchlist_items_content_id")
                                .from(WatchlistItems::Table, WatchlistItems::ContentId)
                                .to(Content::Table, Content::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // One watchlist entry per user per content row
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_watchlist_items_user_content")
                        .table(WatchlistItems::Table)
                        .col(WatchlistItems::UserId)
                        .col(WatchlistItems::ContentId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(WatchlistItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum WatchlistItems {
        Table,
        Id,
        UserId,
        ContentId,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Content {
        Table,
        Id,
    }
}

mod m20240301_000005_create_cart_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000005_create_cart_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Create carts table, one row per user
            manager
                .create_table(
                    Table::create()
                        .table(Carts::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Carts::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Carts::UserId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Carts::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(ColumnDef::new(Carts::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Carts::UpdatedAt).timestamp().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_carts_user_id")
                                .from(Carts::Table, Carts::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // Create cart_items table
            manager
                .create_table(
                    Table::create()
                        .table(CartItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CartItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CartItems::CartId).uuid().not_null())
                        .col(ColumnDef::new(CartItems::ContentId).uuid().not_null())
                        .col(ColumnDef::new(CartItems::Kind).string().not_null())
                        .col(ColumnDef::new(CartItems::PriceAtAdd).decimal().not_null())
                        .col(ColumnDef::new(CartItems::CreatedAt).timestamp().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_cart_items_cart_id")
                                .from(CartItems::Table, CartItems::CartId)
                                .to(Carts::Table, Carts::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_cart_items_content_id")
                                .from(CartItems::Table, CartItems::ContentId)
                                .to(Content::Table, Content::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_cart_items_cart_id")
                        .table(CartItems::Table)
                        .col(CartItems::CartId)
                        .to_owned(),
                )
                .await?;

            // No two items in one cart may share (content, kind)
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_cart_items_cart_content_kind")
                        .table(CartItems::Table)
                        .col(CartItems::CartId)
                        .col(CartItems::ContentId)
                        .col(CartItems::Kind)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CartItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Carts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Carts {
        Table,
        Id,
        UserId,
        Version,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum CartItems {
        Table,
        Id,
        CartId,
        ContentId,
        Kind,
        PriceAtAdd,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Content {
        Table,
        Id,
    }
}

mod m20240301_000006_create_order_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000006_create_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Create orders table aligned with entities::order Model
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Orders::UserId).uuid().not_null())
                        .col(ColumnDef::new(Orders::Status).string().not_null())
                        .col(
                            ColumnDef::new(Orders::TotalAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::Currency).string().not_null())
                        // Unique so a redelivered completion webhook cannot
                        // create a second order for the same payment
                        .col(
                            ColumnDef::new(Orders::PaymentIntentId)
                                .string()
                                .null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Orders::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Orders::UpdatedAt).timestamp().null())
                        .col(
                            ColumnDef::new(Orders::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_user_id")
                                .from(Orders::Table, Orders::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // Useful indexes
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_user_id")
                        .table(Orders::Table)
                        .col(Orders::UserId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_status")
                        .table(Orders::Table)
                        .col(Orders::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_created_at")
                        .table(Orders::Table)
                        .col(Orders::CreatedAt)
                        .to_owned(),
                )
                .await?;

            // Create order_items table
            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::ContentId).uuid().null())
                        .col(ColumnDef::new(OrderItems::Name).string().not_null())
                        .col(ColumnDef::new(OrderItems::Kind).string().null())
                        .col(ColumnDef::new(OrderItems::UnitPrice).decimal().not_null())
                        .col(ColumnDef::new(OrderItems::CreatedAt).timestamp().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order_id")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_order_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        UserId,
        Status,
        TotalAmount,
        Currency,
        PaymentIntentId,
        CreatedAt,
        UpdatedAt,
        Version,
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        ContentId,
        Name,
        Kind,
        UnitPrice,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
    }
}
