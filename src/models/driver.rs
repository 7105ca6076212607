use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct Driver {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
}
