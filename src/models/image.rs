use async_trait::async_trait;
use serde_json::Value as JsonValue;
use strum::{EnumString, IntoStaticStr};

use crate::database::Executor;
use crate::entity::{ColumnDef, ColumnKind, DefaultValue, Entity, OrderKey, Record, Schema};
use crate::filtering::Direction;
use crate::storage::ImageStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, IntoStaticStr, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ImageColumn {
    ProjectId,
    File,
    Position,
    CreatedAt,
}

pub static IMAGE_SCHEMA: Schema<ImageColumn> = Schema {
    table: "images",
    columns: &[
        ColumnDef::new(ImageColumn::ProjectId, ColumnKind::Integer, DefaultValue::Null),
        ColumnDef::new(ImageColumn::File, ColumnKind::Text, DefaultValue::Null),
        ColumnDef::new(ImageColumn::Position, ColumnKind::Integer, DefaultValue::Int(0)),
        ColumnDef::new(ImageColumn::CreatedAt, ColumnKind::DateTime, DefaultValue::Null),
    ],
    searchable: &[],
    required: &[ImageColumn::ProjectId, ImageColumn::File],
    default_sort: OrderKey::Column(ImageColumn::Position),
    default_direction: Direction::Asc,
    default_limit: 50,
    created_at: Some(ImageColumn::CreatedAt),
    updated_at: None,
};

/// An image file attached to a project, ordered by position
#[derive(Debug, Clone)]
pub struct Image {
    record: Record<ImageColumn>,
}

impl Image {
    #[must_use]
    pub fn for_file(project_id: i64, file: &str, position: i64) -> Self {
        let mut image = Self::new();
        image.record.set(ImageColumn::ProjectId, project_id);
        image.record.set(ImageColumn::File, file);
        image.record.set(ImageColumn::Position, position);
        image
    }

    #[must_use]
    pub fn project_id(&self) -> Option<i64> {
        self.record.int(ImageColumn::ProjectId)
    }

    #[must_use]
    pub fn file(&self) -> Option<&str> {
        self.record.text(ImageColumn::File)
    }

    #[must_use]
    pub fn position(&self) -> i64 {
        self.record.int(ImageColumn::Position).unwrap_or(0)
    }

    pub fn set_position(&mut self, position: i64) {
        self.record.set(ImageColumn::Position, position);
    }

    /// Every image of a project in position order
    pub async fn for_project(db: &dyn Executor, project_id: i64) -> Vec<Self> {
        Self::get_by_column(
            db,
            ImageColumn::ProjectId,
            JsonValue::from(project_id),
            None,
            None,
        )
        .await
        .into_items()
    }

    /// Delete the row, then the stored file if there is one
    pub async fn delete_with_file(&mut self, db: &dyn Executor, store: &ImageStore) -> bool {
        let file = self.file().map(String::from);
        if !self.delete(db).await {
            return false;
        }
        if let Some(file) = file {
            store.remove(&file).await;
        }
        true
    }
}

#[async_trait]
impl Entity for Image {
    type Column = ImageColumn;

    const RESOURCE_NAME_SINGULAR: &'static str = "image";
    const RESOURCE_NAME_PLURAL: &'static str = "images";

    fn schema() -> &'static Schema<ImageColumn> {
        &IMAGE_SCHEMA
    }

    fn from_record(record: Record<ImageColumn>) -> Self {
        Self { record }
    }

    fn record(&self) -> &Record<ImageColumn> {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record<ImageColumn> {
        &mut self.record
    }
}
