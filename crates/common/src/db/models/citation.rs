//! Reporter citation of an opinion cluster (e.g. 22 U.S. 44)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "citations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Cluster the citation refers to
    pub cluster_id: i64,

    pub volume: i32,

    #[sea_orm(column_type = "Text")]
    pub reporter: String,

    /// Pages are not always numeric
    #[sea_orm(column_type = "Text")]
    pub page: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::opinion_cluster::Entity",
        from = "Column::ClusterId",
        to = "super::opinion_cluster::Column::Id",
        on_delete = "Cascade"
    )]
    Cluster,
}

impl Related<super::opinion_cluster::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cluster.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
