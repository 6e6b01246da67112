//! Synchronize `.locus/artifacts/*.md` files to workspace docs (§4.7)

use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::api::{ApiClient, DocGroup, DocRequest};
use crate::domain::Doc;

const ARTIFACTS_RELATIVE_DIR: &str = ".locus/artifacts";
const ARTIFACTS_GROUP_NAME: &str = "Artifacts";
const ARTIFACTS_GROUP_ORDER: i32 = 999;

#[derive(Debug, Error)]
pub enum ArtifactSyncError {
    #[error("failed to read artifacts directory: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Api(#[from] crate::api::ApiError),
}

/// Mirrors markdown files under `.locus/artifacts/` to workspace docs,
/// grouped under a single "Artifacts" doc group created on first use.
pub struct ArtifactSyncer<'a> {
    api: &'a dyn ApiClient,
    project_root: &'a Path,
}

impl<'a> ArtifactSyncer<'a> {
    pub fn new(api: &'a dyn ApiClient, project_root: &'a Path) -> Self {
        Self { api, project_root }
    }

    pub async fn sync(&self) -> Result<(), ArtifactSyncError> {
        let dir = self.project_root.join(ARTIFACTS_RELATIVE_DIR);
        if !dir.is_dir() {
            return Ok(());
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("md") {
                files.push(path);
            }
        }
        if files.is_empty() {
            return Ok(());
        }

        let group = self.find_or_create_group().await?;
        let existing_docs = self.api.list_docs().await?;

        for path in files {
            let title = match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) if !stem.is_empty() => stem.to_string(),
                _ => continue,
            };
            let content = std::fs::read_to_string(&path)?;
            self.sync_one(&title, &content, &group, &existing_docs).await?;
        }

        Ok(())
    }

    async fn find_or_create_group(&self) -> Result<DocGroup, ArtifactSyncError> {
        let groups = self.api.list_doc_groups().await?;
        if let Some(group) = groups.into_iter().find(|g| g.name == ARTIFACTS_GROUP_NAME) {
            return Ok(group);
        }
        debug!("creating Artifacts doc group");
        let group = self
            .api
            .create_doc_group(ARTIFACTS_GROUP_NAME, ARTIFACTS_GROUP_ORDER)
            .await?;
        Ok(group)
    }

    async fn sync_one(
        &self,
        title: &str,
        content: &str,
        group: &DocGroup,
        existing_docs: &[Doc],
    ) -> Result<(), ArtifactSyncError> {
        let req = DocRequest {
            title: title.to_string(),
            content: content.to_string(),
            group_id: group.id.clone(),
        };

        match existing_docs.iter().find(|d| d.title == title) {
            Some(doc) => {
                let changed = doc.content != content || doc.group_id.as_deref() != Some(group.id.as_str());
                if changed {
                    self.api.patch_doc(&doc.id, &req).await?;
                }
            }
            None => {
                self.api.create_doc(&req).await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockApiClient;
    use tempfile::tempdir;

    fn write_artifact(dir: &Path, name: &str, content: &str) {
        let artifacts = dir.join(ARTIFACTS_RELATIVE_DIR);
        std::fs::create_dir_all(&artifacts).unwrap();
        std::fs::write(artifacts.join(name), content).unwrap();
    }

    #[tokio::test]
    async fn no_artifacts_dir_is_a_noop() {
        let dir = tempdir().unwrap();
        let api = MockApiClient::default();
        ArtifactSyncer::new(&api, dir.path()).sync().await.unwrap();
        assert!(api.doc_groups.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn creates_group_once_and_posts_new_doc() {
        let dir = tempdir().unwrap();
        write_artifact(dir.path(), "notes.md", "hello world");
        let api = MockApiClient::default();

        ArtifactSyncer::new(&api, dir.path()).sync().await.unwrap();

        let groups = api.doc_groups.lock().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "Artifacts");
        assert_eq!(groups[0].order, 999);

        let docs = api.docs.lock().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "notes");
        assert_eq!(docs[0].content, "hello world");
    }

    #[tokio::test]
    async fn reuses_existing_group_across_syncs() {
        let dir = tempdir().unwrap();
        write_artifact(dir.path(), "a.md", "one");
        let api = MockApiClient::default();

        ArtifactSyncer::new(&api, dir.path()).sync().await.unwrap();
        write_artifact(dir.path(), "b.md", "two");
        ArtifactSyncer::new(&api, dir.path()).sync().await.unwrap();

        let groups = api.doc_groups.lock().unwrap();
        assert_eq!(groups.len(), 1);
    }

    #[tokio::test]
    async fn patches_doc_when_content_changed() {
        let dir = tempdir().unwrap();
        write_artifact(dir.path(), "notes.md", "v1");
        let api = MockApiClient::default();
        ArtifactSyncer::new(&api, dir.path()).sync().await.unwrap();

        write_artifact(dir.path(), "notes.md", "v2");
        ArtifactSyncer::new(&api, dir.path()).sync().await.unwrap();

        let docs = api.docs.lock().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "v2");
    }

    #[tokio::test]
    async fn unchanged_doc_is_not_repatched() {
        let dir = tempdir().unwrap();
        write_artifact(dir.path(), "notes.md", "same");
        let api = MockApiClient::default();
        ArtifactSyncer::new(&api, dir.path()).sync().await.unwrap();
        ArtifactSyncer::new(&api, dir.path()).sync().await.unwrap();

        let docs = api.docs.lock().unwrap();
        assert_eq!(docs.len(), 1);
    }
}
