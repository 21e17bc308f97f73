//! Opinion entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "opinions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub cluster_id: i64,

    /// Text extracted with pdftotext, wpd2txt, etc.
    #[sea_orm(column_type = "Text")]
    pub plain_text: String,

    /// HTML of the document, if available in the original
    #[sea_orm(column_type = "Text", nullable)]
    pub html: Option<String>,

    /// HTML of Lawbox documents
    #[sea_orm(column_type = "Text", nullable)]
    pub html_lawbox: Option<String>,

    /// HTML of the Columbia archive
    #[sea_orm(column_type = "Text", nullable)]
    pub html_columbia: Option<String>,

    /// HTML with citation links and other post-processed markup
    #[sea_orm(column_type = "Text")]
    pub html_with_citations: String,

    pub date_modified: DateTimeWithTimeZone,
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
