use crate::config::Config;
use crate::models::catalog::Catalog;
use crate::models::comment::Comment;

pub mod comment_service;
pub mod progress_service;

pub use comment_service::CommentService;
pub use progress_service::ProgressService;

/// Session-scoped state handed to the host. The two engines are independent;
/// neither reaches into the other.
pub struct PlatformState {
    pub config: Config,
    pub progress: ProgressService,
    pub comments: CommentService,
}

impl PlatformState {
    pub fn new(config: Config, catalog: Catalog, comments: Vec<Comment>) -> anyhow::Result<Self> {
        let progress = ProgressService::new(catalog);
        let comments = CommentService::with_comments(comments, config.comments)?;

        Ok(Self {
            config,
            progress,
            comments,
        })
    }

    /// Loads the catalog from `catalog_path` when configured, otherwise uses
    /// the bundled sample course. Starts with an empty discussion.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let catalog = match &config.catalog_path {
            Some(path) => Catalog::load_from_path(path)?,
            None => {
                tracing::info!("No catalog path configured, using sample course");
                Catalog::sample()
            }
        };

        Self::new(config, catalog, Vec::new())
    }
}
