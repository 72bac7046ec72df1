use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "audit_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub tenant_id: String,
    pub service_name: String,
    pub project_id: String,
    pub event_type: String,
    pub timestamp: String,
    #[sea_orm(column_type = "Text")]
    pub event_json: String,
    /// `[{rule_id, rule_name}]`
    #[sea_orm(column_type = "Text")]
    pub used_rules: String,
    #[sea_orm(column_type = "Text")]
    pub used_actions: String,
    pub language: String,
    pub engine: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
