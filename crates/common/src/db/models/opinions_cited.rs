//! Citing opinion -> cited opinion edge

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "opinions_cited")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Opinion that contains the citation
    pub citing_opinion_id: i64,

    /// Opinion that is being cited
    pub cited_opinion_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::opinion::Entity",
        from = "Column::CitingOpinionId",
        to = "super::opinion::Column::Id",
        on_delete = "Cascade"
    )]
    CitingOpinion,

    #[sea_orm(
        belongs_to = "super::opinion::Entity",
        from = "Column::CitedOpinionId",
        to = "super::opinion::Column::Id",
        on_delete = "Cascade"
    )]
    CitedOpinion,
}

impl ActiveModelBehavior for ActiveModel {}
