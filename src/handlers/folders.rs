use crate::api::{Folder, HubApi, RemoteError};
use std::collections::HashMap;

/// Guards against parent cycles in corrupt folder trees
const MAX_DEPTH: usize = 64;

/// Folder id → folder names from the repository root, owned by a single
/// export run
#[derive(Debug, Default)]
pub struct FolderPathCache {
    paths: HashMap<String, Vec<String>>,
}

impl FolderPathCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the folders leading to `folder_id`, root first. Every folder
    /// visited on the way is cached.
    pub async fn resolve(
        &mut self,
        api: &dyn HubApi,
        folder_id: &str,
    ) -> Result<Vec<String>, RemoteError> {
        if let Some(path) = self.paths.get(folder_id) {
            return Ok(path.clone());
        }

        // Walk up until the root or an already cached ancestor
        let mut chain = Vec::new();
        let mut base = Vec::new();
        let mut next = Some(folder_id.to_string());

        while let Some(id) = next.take() {
            if let Some(cached) = self.paths.get(&id) {
                base = cached.clone();
                break;
            }
            if chain.len() >= MAX_DEPTH {
                log::warn!("Folder {} is nested too deeply, truncating its path", folder_id);
                break;
            }
            let folder = api.get_folder(&id).await?;
            next = folder.parent_id.clone();
            chain.push(folder);
        }

        let mut path = base;
        for folder in chain.into_iter().rev() {
            path.push(folder.name);
            self.paths.insert(folder.id, path.clone());
        }
        Ok(path)
    }
}

/// Destination folders by (parent, name), loaded once per import run.
/// Missing folders are created on first use.
#[derive(Debug, Default)]
pub struct DestinationFolders {
    by_parent: Option<HashMap<(Option<String>, String), String>>,
}

impl DestinationFolders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the folder at `names` (root first), creating what is missing.
    /// An empty path is the repository root.
    pub async fn ensure(
        &mut self,
        api: &dyn HubApi,
        names: &[String],
    ) -> Result<Option<String>, RemoteError> {
        if names.is_empty() {
            return Ok(None);
        }

        if self.by_parent.is_none() {
            let known = api.list_folders().await?.into_iter().map(Self::entry).collect();
            self.by_parent = Some(known);
        }
        let Some(known) = self.by_parent.as_mut() else {
            return Ok(None);
        };

        let mut parent: Option<String> = None;
        for name in names {
            let key = (parent.clone(), name.clone());
            let id = match known.get(&key) {
                Some(id) => id.clone(),
                None => {
                    let created = api.create_folder(name, parent.as_deref()).await?;
                    log::debug!(
                        "Created folder '{}' ({}) on hub {}",
                        name,
                        created.id,
                        api.hub_id()
                    );
                    known.insert(key, created.id.clone());
                    created.id
                }
            };
            parent = Some(id);
        }
        Ok(parent)
    }

    fn entry(folder: Folder) -> ((Option<String>, String), String) {
        ((folder.parent_id, folder.name), folder.id)
    }
}

/// Make a name safe to use as a single path component
pub fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .collect();
    match cleaned.trim_matches('.') {
        "" => "_".to_string(),
        trimmed => trimmed.to_string(),
    }
}
