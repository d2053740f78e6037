use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::schema_tables::Entity")]
    SchemaTables,
    #[sea_orm(has_many = "super::relationships::Entity")]
    Relationships,
    #[sea_orm(has_one = "super::viewports::Entity")]
    Viewports,
}

impl Related<super::schema_tables::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SchemaTables.def()
    }
}

impl Related<super::relationships::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Relationships.def()
    }
}

impl Related<super::viewports::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Viewports.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
