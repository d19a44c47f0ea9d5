use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use strum::{EnumString, IntoStaticStr};
use tracing::{debug, error, info, warn};

use super::image::{IMAGE_SCHEMA, Image, ImageColumn};
use crate::database::{Connection, Executor, Transaction, abandon};
use crate::entity::{
    Column, ColumnDef, ColumnKind, ColumnValue, DefaultValue, Entity, OrderKey, Record, Schema,
};
use crate::filtering::{Direction, Query, Where};
use crate::operations::CrudService;
use crate::storage::ImageStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, IntoStaticStr, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ProjectColumn {
    Name,
    Date,
    Link,
    ShortDescription,
    LongDescription,
    Tags,
    Colour,
    CreatedAt,
    UpdatedAt,
}

pub static PROJECT_SCHEMA: Schema<ProjectColumn> = Schema {
    table: "projects",
    columns: &[
        ColumnDef::new(ProjectColumn::Name, ColumnKind::Text, DefaultValue::Null),
        ColumnDef::new(ProjectColumn::Date, ColumnKind::Date, DefaultValue::Null),
        ColumnDef::new(ProjectColumn::Link, ColumnKind::Text, DefaultValue::Null),
        ColumnDef::new(ProjectColumn::ShortDescription, ColumnKind::Text, DefaultValue::Null),
        ColumnDef::new(ProjectColumn::LongDescription, ColumnKind::Text, DefaultValue::Null),
        ColumnDef::new(ProjectColumn::Tags, ColumnKind::List(','), DefaultValue::EmptyList),
        ColumnDef::new(ProjectColumn::Colour, ColumnKind::Text, DefaultValue::Text("#ffffff")),
        ColumnDef::new(ProjectColumn::CreatedAt, ColumnKind::DateTime, DefaultValue::Null),
        ColumnDef::new(ProjectColumn::UpdatedAt, ColumnKind::DateTime, DefaultValue::Null),
    ],
    searchable: &[
        ProjectColumn::Name,
        ProjectColumn::ShortDescription,
        ProjectColumn::LongDescription,
        ProjectColumn::Tags,
    ],
    required: &[ProjectColumn::Name, ProjectColumn::Date],
    default_sort: OrderKey::Column(ProjectColumn::Date),
    default_direction: Direction::Desc,
    default_limit: 10,
    created_at: Some(ProjectColumn::CreatedAt),
    updated_at: Some(ProjectColumn::UpdatedAt),
};

const IMAGES_RELATION: &str = "images";

/// A portfolio project and, once loaded, its images.
///
/// The image collection is loaded on request only and is not kept in sync with the
/// database: after anything that changes it, call [`Project::load_images`] again.
#[derive(Debug, Clone)]
pub struct Project {
    record: Record<ProjectColumn>,
    images: Option<Vec<Image>>,
}

impl Project {
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.record.text(ProjectColumn::Name)
    }

    pub fn set_name(&mut self, name: &str) {
        self.record.set(ProjectColumn::Name, name);
    }

    #[must_use]
    pub fn date(&self) -> Option<NaiveDate> {
        self.record.date(ProjectColumn::Date)
    }

    pub fn set_date(&mut self, date: NaiveDate) {
        self.record
            .set_value(ProjectColumn::Date, &ColumnValue::Date(date));
    }

    #[must_use]
    pub fn link(&self) -> Option<&str> {
        self.record.text(ProjectColumn::Link)
    }

    #[must_use]
    pub fn short_description(&self) -> Option<&str> {
        self.record.text(ProjectColumn::ShortDescription)
    }

    #[must_use]
    pub fn long_description(&self) -> Option<&str> {
        self.record.text(ProjectColumn::LongDescription)
    }

    #[must_use]
    pub fn tags(&self) -> &[String] {
        self.record.list(ProjectColumn::Tags)
    }

    pub fn set_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        self.record.set(ProjectColumn::Tags, tags);
    }

    #[must_use]
    pub fn colour(&self) -> Option<&str> {
        self.record.text(ProjectColumn::Colour)
    }

    /// The loaded images, `None` until [`Project::load_images`] has run
    #[must_use]
    pub fn images(&self) -> Option<&[Image]> {
        self.images.as_deref()
    }

    /// Query this project's images in position order, replacing any loaded collection
    pub async fn load_images(&mut self, db: &dyn Executor) -> &[Image] {
        let images = match self.id() {
            Some(id) => Image::for_project(db, id).await,
            None => Vec::new(),
        };
        self.images.insert(images)
    }

    pub fn invalidate_images(&mut self) {
        self.images = None;
    }

    /// Give the listed images positions 1..N in order.
    ///
    /// Runs in one transaction that first re-reads the project and its images; every listed
    /// id has to belong to this project or nothing changes. The loaded collection is
    /// invalidated afterwards.
    pub async fn reorder_images(&mut self, db: &dyn Executor, image_ids: &[i64]) -> bool {
        let Some(project_id) = self.id() else {
            debug!("Reorder skipped: project was never persisted");
            return false;
        };
        let Some(tx) = open(db).await else {
            return false;
        };

        if Self::get_by_id(&tx, project_id).await.is_none() {
            abandon(tx, "project no longer exists").await;
            return false;
        }

        let owned: BTreeSet<i64> = Image::for_project(&tx, project_id)
            .await
            .iter()
            .filter_map(Entity::id)
            .collect();
        if let Some(stray) = image_ids.iter().find(|id| !owned.contains(*id)) {
            warn!(project_id, image_id = stray, "Image does not belong to project");
            abandon(tx, "image does not belong to project").await;
            return false;
        }

        for (position, image_id) in (1_i64..).zip(image_ids) {
            Query::update(IMAGE_SCHEMA.table)
                .columns([ImageColumn::Position.name()])
                .filter(vec![
                    "id = :id".to_string(),
                    format!("{} = :{0}", ImageColumn::ProjectId.name()),
                ])
                .bind("id", *image_id)
                .bind(ImageColumn::ProjectId.name(), project_id)
                .bind(ImageColumn::Position.name(), position)
                .run_update(&tx)
                .await;
            if tx.last_error().is_some() {
                abandon(tx, "position update failed").await;
                return false;
            }
        }

        if !finish(db, tx).await {
            return false;
        }
        self.invalidate_images();
        info!(project_id, count = image_ids.len(), "Reordered images");
        true
    }

    /// Delete every image row and then the project in one transaction.
    ///
    /// With a store, the image files are removed once the transaction has committed.
    pub async fn delete_cascade(&mut self, db: &dyn Executor, store: Option<&ImageStore>) -> bool {
        let Some(project_id) = self.id() else {
            debug!("Delete skipped: project was never persisted");
            return false;
        };
        let Some(tx) = open(db).await else {
            return false;
        };

        if Self::get_by_id(&tx, project_id).await.is_none() {
            abandon(tx, "project no longer exists").await;
            return false;
        }

        let mut images = Image::for_project(&tx, project_id).await;
        if tx.last_error().is_some() {
            abandon(tx, "could not load images").await;
            return false;
        }

        let mut files = Vec::with_capacity(images.len());
        for image in &mut images {
            let file = image.file().map(String::from);
            if !image.delete(&tx).await {
                abandon(tx, "image delete failed").await;
                return false;
            }
            files.extend(file);
        }

        let removed = Query::delete(PROJECT_SCHEMA.table)
            .filter(Where::Id(project_id))
            .run_delete(&tx)
            .await;
        if removed == 0 {
            abandon(tx, "project delete failed").await;
            return false;
        }
        if !finish(db, tx).await {
            return false;
        }

        self.record.mark_deleted();
        self.invalidate_images();

        if let Some(store) = store {
            for file in &files {
                store.remove(file).await;
            }
        }
        info!(project_id, images = files.len(), "Deleted project");
        true
    }
}

async fn open(db: &dyn Executor) -> Option<Transaction> {
    match db.begin().await {
        Ok(tx) => Some(tx),
        Err(err) => {
            error!(error = %err, "Could not open transaction");
            db.session().record_error(err.to_string());
            None
        }
    }
}

async fn finish(db: &dyn Executor, tx: Transaction) -> bool {
    match tx.commit().await {
        Ok(()) => true,
        Err(err) => {
            error!(error = %err, "Commit failed");
            db.session().record_error(err.to_string());
            false
        }
    }
}

#[async_trait]
impl Entity for Project {
    type Column = ProjectColumn;

    const RESOURCE_NAME_SINGULAR: &'static str = "project";
    const RESOURCE_NAME_PLURAL: &'static str = "projects";

    fn schema() -> &'static Schema<ProjectColumn> {
        &PROJECT_SCHEMA
    }

    fn from_record(record: Record<ProjectColumn>) -> Self {
        Self {
            record,
            images: None,
        }
    }

    fn record(&self) -> &Record<ProjectColumn> {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record<ProjectColumn> {
        &mut self.record
    }

    fn to_json(&self) -> JsonValue {
        let mut map = self.record.to_json();
        if let Some(images) = &self.images {
            map.insert(
                IMAGES_RELATION.to_string(),
                images.iter().map(Image::to_json).collect(),
            );
        }
        JsonValue::Object(map)
    }

    /// Cascades to the image rows; files stay on disk. Use
    /// [`Project::delete_cascade`] with a store to remove them too.
    async fn delete(&mut self, db: &dyn Executor) -> bool {
        self.delete_cascade(db, None).await
    }
}

/// Project CRUD with images loaded on read and removed from disk on delete
pub struct ProjectService {
    connection: Connection,
    images: ImageStore,
}

impl ProjectService {
    #[must_use]
    pub const fn new(connection: Connection, images: ImageStore) -> Self {
        Self { connection, images }
    }

    #[must_use]
    pub const fn image_store(&self) -> &ImageStore {
        &self.images
    }
}

#[async_trait]
impl CrudService for ProjectService {
    type Resource = Project;

    fn executor(&self) -> &dyn Executor {
        &self.connection
    }

    async fn after_read(&self, project: &mut Project) {
        project.load_images(self.executor()).await;
    }

    async fn perform_delete(&self, project: &mut Project) -> bool {
        project
            .delete_cascade(self.executor(), Some(&self.images))
            .await
    }
}
