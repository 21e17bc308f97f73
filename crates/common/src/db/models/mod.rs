//! SeaORM entity models
//!
//! Database entities for opinions, clusters and the citation graph

mod citation;
mod opinion;
mod opinion_cluster;
mod opinions_cited;

pub use opinion::{
    Entity as OpinionEntity,
    Model as Opinion,
    ActiveModel as OpinionActiveModel,
    Column as OpinionColumn,
};

pub use opinion_cluster::{
    Entity as OpinionClusterEntity,
    Model as OpinionCluster,
    ActiveModel as OpinionClusterActiveModel,
    Column as OpinionClusterColumn,
};

pub use opinions_cited::{
    Entity as OpinionsCitedEntity,
    Model as OpinionsCited,
    ActiveModel as OpinionsCitedActiveModel,
    Column as OpinionsCitedColumn,
};

pub use citation::{
    Entity as CitationEntity,
    Model as Citation,
    ActiveModel as CitationActiveModel,
    Column as CitationColumn,
};
