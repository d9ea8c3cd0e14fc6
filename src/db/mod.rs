use std::collections::HashMap;
use std::path::Path;

use tokio::sync::RwLock;

use crate::auth::ClientSource;
use crate::core::models::Client;
use crate::core::types::ClientId;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read client registry: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed client registry: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Client registry kept in memory, optionally seeded from a JSON file
/// holding an array of `{"id": ..., "name": ...}` objects.
#[derive(Debug, Default)]
pub struct MemoryStore {
    clients: RwLock<HashMap<ClientId, Client>>,
}

impl MemoryStore {
    pub fn from_clients(clients: impl IntoIterator<Item = Client>) -> Self {
        let clients = clients.into_iter().map(|c| (c.id.clone(), c)).collect();
        Self {
            clients: RwLock::new(clients),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let clients: Vec<Client> = serde_json::from_str(json)?;
        Ok(Self::from_clients(clients))
    }

    pub async fn acquire(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let contents = tokio::fs::read_to_string(path).await?;
        Self::from_json(&contents)
    }

    /// Swaps in a new set of registered clients and returns the IDs that
    /// were dropped. Pending transactions naming a dropped client are
    /// rejected the next time they are loaded.
    pub async fn replace_clients(&self, clients: impl IntoIterator<Item = Client>) -> Vec<ClientId> {
        let clients: HashMap<ClientId, Client> =
            clients.into_iter().map(|c| (c.id.clone(), c)).collect();
        let mut current = self.clients.write().await;
        let revoked = current
            .keys()
            .filter(|id| !clients.contains_key(*id))
            .cloned()
            .collect();
        *current = clients;
        revoked
    }

    /// Re-reads the registry file. A malformed or missing file leaves the
    /// current clients in place.
    pub async fn reload(&self, path: impl AsRef<Path>) -> Result<Vec<ClientId>, StoreError> {
        let contents = tokio::fs::read_to_string(path).await?;
        let clients: Vec<Client> = serde_json::from_str(&contents)?;
        Ok(self.replace_clients(clients).await)
    }

    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }
}

#[async_trait::async_trait]
impl ClientSource for MemoryStore {
    type Client = Client;
    type Error = std::convert::Infallible;

    async fn deserialize_client(&self, id: &ClientId) -> Result<Option<Client>, Self::Error> {
        Ok(self.clients.read().await.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ClientId {
        ClientId(s.to_string())
    }

    #[tokio::test]
    async fn resolves_registered_clients() {
        let store = MemoryStore::from_json(r#"[{ "id": "1", "name": "Example" }]"#).unwrap();
        let client = store.deserialize_client(&id("1")).await.unwrap();
        assert_eq!(
            client,
            Some(Client {
                id: id("1"),
                name: "Example".to_string()
            })
        );
        assert_eq!(store.deserialize_client(&id("2")).await.unwrap(), None);
    }

    fn client(i: &str) -> Client {
        Client {
            id: id(i),
            name: format!("Client {}", i),
        }
    }

    #[tokio::test]
    async fn replaced_registry_revokes_missing_clients() {
        let store = MemoryStore::from_clients(vec![client("1"), client("2")]);
        assert_eq!(store.len().await, 2);

        let revoked = store.replace_clients(vec![client("2"), client("3")]).await;

        assert_eq!(revoked, vec![id("1")]);
        assert_eq!(store.deserialize_client(&id("1")).await.unwrap(), None);
        assert_eq!(store.deserialize_client(&id("3")).await.unwrap(), Some(client("3")));
    }

    #[tokio::test]
    async fn failed_reload_keeps_current_clients() {
        let store = MemoryStore::from_clients(vec![client("1")]);
        let result = store.reload("/nonexistent/clients.json").await;
        assert!(matches!(result, Err(StoreError::Io(_))));
        assert_eq!(store.len().await, 1);
    }

    #[test]
    fn rejects_malformed_registry() {
        let result = MemoryStore::from_json(r#"{ "id": "1" }"#);
        assert!(matches!(result, Err(StoreError::Parse(_))));
    }

    #[tokio::test]
    async fn missing_registry_file_is_an_io_error() {
        let result = MemoryStore::acquire("/nonexistent/clients.json").await;
        assert!(matches!(result, Err(StoreError::Io(_))));
    }
}
