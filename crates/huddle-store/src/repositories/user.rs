use std::sync::Arc;

use huddle_types::User;

use super::{decode_all, USERS};
use crate::error::Result;
use crate::query::Query;
use crate::trait_client::RemoteStore;

#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn RemoteStore>,
}

impl UserRepository {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    pub async fn list_all(&self) -> Result<Vec<User>> {
        let rows = self
            .store
            .select(USERS, Query::new().columns("id, name, email, role"))
            .await?;
        decode_all(rows)
    }
}
