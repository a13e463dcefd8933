//! CLI route: executes parsed commands against the tree view.

use crate::cli::parse::Commands;
use crate::cli::presentation::{format_tree_json, format_tree_text};
use crate::config::{CanopyConfig, ConfigLoader};
use crate::error::TreeError;
use crate::gesture::NoGestures;
use crate::memory::{MemoryModel, ModelSpec};
use crate::object::ObjectId;
use crate::view::TreeView;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct RunContext {
    config: CanopyConfig,
}

impl RunContext {
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, TreeError> {
        let config = ConfigLoader::load(config_path.as_deref())?;
        Ok(Self { config })
    }

    pub fn with_config(config: CanopyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CanopyConfig {
        &self.config
    }

    /// Must run inside a Tokio runtime; resolutions are spawned onto it.
    pub async fn execute(&self, command: &Commands) -> Result<String, TreeError> {
        match command {
            Commands::Render {
                model,
                root,
                select,
                expand,
                format,
                timeout_ms,
            } => {
                self.render(
                    model,
                    root.as_deref(),
                    select.as_deref(),
                    expand,
                    format,
                    Duration::from_millis(*timeout_ms),
                )
                .await
            }
        }
    }

    async fn render(
        &self,
        model_path: &Path,
        root: Option<&str>,
        select: Option<&str>,
        expand: &[String],
        format: &str,
        timeout: Duration,
    ) -> Result<String, TreeError> {
        let spec = ModelSpec::load(model_path)?;
        let model = MemoryModel::from_spec(&spec)?;
        let root_id = root.map(ObjectId::from).unwrap_or_else(|| spec.root.clone());

        let view = TreeView::on_current_runtime(self.config.tree.clone(), Arc::new(NoGestures))?;
        view.set_root(Some(model.object(&root_id)?));
        settle(&view, timeout).await?;

        for id in expand {
            if !view.set_expanded(&ObjectId::from(id.as_str()), true) {
                warn!(node = %id, "Cannot expand: not rendered or not composable");
            }
            settle(&view, timeout).await?;
        }

        if let Some(select) = select {
            view.set_value(Some(model.object(&ObjectId::from(select))?));
            settle(&view, timeout).await?;
        }

        let elements = view.elements();
        info!(root = %root_id, nodes = elements.child_element_count(), "Rendered tree");
        match format {
            "json" => format_tree_json(&elements),
            "text" => Ok(format_tree_text(&elements, &self.config.tree.selected_class)),
            other => Err(TreeError::Config(format!(
                "Invalid output format: {} (must be 'text' or 'json')",
                other
            ))),
        }
    }
}

async fn settle(view: &TreeView, timeout: Duration) -> Result<(), TreeError> {
    tokio::time::timeout(timeout, view.settled())
        .await
        .map_err(|_| TreeError::Timeout(timeout.as_millis() as u64))
}
