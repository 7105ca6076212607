use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct Vehicle {
    pub id: Uuid,
    pub plate: String,
    pub capacity: u32,
}
