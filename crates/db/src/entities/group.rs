//! Group entity.
//!
//! A group is a topic that posts may be filed under. Posts reference groups
//! but do not belong to them: deleting a group leaves its posts ungrouped.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Maximum length of a group title, in characters.
pub const TITLE_MAX_LEN: usize = 200;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "group")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Human readable title.
    pub title: String,

    /// URL identifier.
    #[sea_orm(unique)]
    pub slug: String,

    /// Free-form description.
    #[sea_orm(column_type = "Text")]
    pub description: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::post::Entity")]
    Posts,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Posts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
