//! Schema for the wallet aggregate.
//!
//! - `wallets`: aggregate root, upserted on `id`
//! - `income_records`, `expense_records`: entries owned by one wallet
//! - `transfers`: entries shared by a source and a destination wallet
//!
//! Child tables carry no foreign keys: removing a wallet's rows is done
//! explicitly by the ledger in the same transaction as the header.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Wallets {
    Table,
    Id,
    UserId,
    Name,
    #[iden = "type"]
    Type,
    Currency,
    BalanceAmount,
    BalanceCurrency,
    CreatedAt,
    UpdatedAt,
    Version,
}

#[derive(Iden)]
enum IncomeRecords {
    Table,
}

#[derive(Iden)]
enum ExpenseRecords {
    Table,
}

/// Columns shared by `income_records` and `expense_records`.
#[derive(Iden)]
enum Entry {
    Id,
    WalletId,
    CategoryId,
    Amount,
    Currency,
    Description,
    Date,
    CreatedAt,
}

#[derive(Iden)]
enum Transfers {
    Table,
    Id,
    FromWalletId,
    ToWalletId,
    Amount,
    Currency,
    FeeAmount,
    Description,
    Date,
    CreatedAt,
}

fn entry_table(table: impl IntoTableRef) -> TableCreateStatement {
    Table::create()
        .table(table)
        .if_not_exists()
        .col(ColumnDef::new(Entry::Id).string().not_null().primary_key())
        .col(ColumnDef::new(Entry::WalletId).string().not_null())
        .col(ColumnDef::new(Entry::CategoryId).string().not_null())
        .col(ColumnDef::new(Entry::Amount).big_integer().not_null())
        .col(ColumnDef::new(Entry::Currency).string().not_null())
        .col(
            ColumnDef::new(Entry::Description)
                .string()
                .not_null()
                .default(""),
        )
        .col(ColumnDef::new(Entry::Date).timestamp().not_null())
        .col(ColumnDef::new(Entry::CreatedAt).timestamp().not_null())
        .to_owned()
}

fn entry_index(name: &str, table: impl IntoTableRef) -> IndexCreateStatement {
    Index::create()
        .name(name)
        .table(table)
        .col(Entry::WalletId)
        .col(Entry::Date)
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Wallets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Wallets::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Wallets::UserId).string().not_null())
                    .col(ColumnDef::new(Wallets::Name).string().not_null())
                    .col(ColumnDef::new(Wallets::Type).string().not_null())
                    .col(ColumnDef::new(Wallets::Currency).string().not_null())
                    .col(
                        ColumnDef::new(Wallets::BalanceAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Wallets::BalanceCurrency)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Wallets::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Wallets::UpdatedAt).timestamp().not_null())
                    .col(
                        ColumnDef::new(Wallets::Version)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-wallets-user_id")
                    .table(Wallets::Table)
                    .col(Wallets::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(entry_table(IncomeRecords::Table))
            .await?;
        manager
            .create_index(entry_index(
                "idx-income_records-wallet_id-date",
                IncomeRecords::Table,
            ))
            .await?;

        manager
            .create_table(entry_table(ExpenseRecords::Table))
            .await?;
        manager
            .create_index(entry_index(
                "idx-expense_records-wallet_id-date",
                ExpenseRecords::Table,
            ))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Transfers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transfers::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transfers::FromWalletId).string().not_null())
                    .col(ColumnDef::new(Transfers::ToWalletId).string().not_null())
                    .col(ColumnDef::new(Transfers::Amount).big_integer().not_null())
                    .col(ColumnDef::new(Transfers::Currency).string().not_null())
                    .col(
                        ColumnDef::new(Transfers::FeeAmount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Transfers::Description)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Transfers::Date).timestamp().not_null())
                    .col(ColumnDef::new(Transfers::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transfers-from_wallet_id")
                    .table(Transfers::Table)
                    .col(Transfers::FromWalletId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx-transfers-to_wallet_id")
                    .table(Transfers::Table)
                    .col(Transfers::ToWalletId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transfers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ExpenseRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(IncomeRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Wallets::Table).to_owned())
            .await?;
        Ok(())
    }
}
