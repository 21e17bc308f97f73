//! Opinion cluster entity
//!
//! A cluster groups the opinions (lead, concurrence, dissent) of one decision
//! and carries the aggregate citation count.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "opinion_clusters")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(column_type = "Text")]
    pub slug: String,

    #[sea_orm(column_type = "Text")]
    pub case_name: String,

    /// Number of times this cluster is cited by other opinions
    pub citation_count: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::opinion::Entity")]
    SubOpinions,

    #[sea_orm(has_many = "super::citation::Entity")]
    Citations,
}

impl Related<super::opinion::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SubOpinions.def()
    }
}

impl Related<super::citation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Citations.def()
    }
}

impl Model {
    /// Canonical path of the cluster's case page
    pub fn absolute_url(&self) -> String {
        format!("/opinion/{}/{}/", self.id, self.slug)
    }
}

impl ActiveModelBehavior for ActiveModel {}
