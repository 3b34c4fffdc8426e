use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[sea_orm(column_name = "type")]
    pub wallet_type: String,
    pub currency: String,
    pub balance_amount: i64,
    pub balance_currency: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub version: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::income_records::Entity")]
    IncomeRecords,
    #[sea_orm(has_many = "super::expense_records::Entity")]
    ExpenseRecords,
}

impl Related<super::income_records::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IncomeRecords.def()
    }
}

impl Related<super::expense_records::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExpenseRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
